use anyhow::{anyhow, Result};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::frame::Frame;
use crate::geometry::Roi;
use crate::track::backend::{TrackerBackend, TrackerFactory};

#[derive(Debug, Default)]
struct Script {
    outcomes: VecDeque<Option<Roi>>,
    inits: Vec<(u64, Roi)>,
    updates: usize,
}

/// Replays queued outcomes instead of looking at pixels. Used to drive the
/// pipeline deterministically.
///
/// Each queued entry answers one `update`: `Some(roi)` reports the target at
/// `roi`, `None` reports it lost. With an empty queue the backend keeps
/// reporting its last position.
#[derive(Clone, Debug, Default)]
pub struct ScriptedFactory {
    script: Arc<Mutex<Script>>,
    live: Arc<AtomicUsize>,
}

impl ScriptedFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, outcome: Option<Roi>) {
        self.lock().outcomes.push_back(outcome);
    }

    /// `(frame seq, roi)` for every `init` so far.
    pub fn inits(&self) -> Vec<(u64, Roi)> {
        self.lock().inits.clone()
    }

    pub fn updates(&self) -> usize {
        self.lock().updates
    }

    /// Backend instances currently alive.
    pub fn live_instances(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TrackerFactory for ScriptedFactory {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn create(&self) -> Result<Box<dyn TrackerBackend>> {
        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedBackend {
            factory: self.clone(),
            last: None,
        }))
    }
}

pub struct ScriptedBackend {
    factory: ScriptedFactory,
    last: Option<Roi>,
}

impl TrackerBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn init(&mut self, frame: &Frame, roi: Roi) -> Result<()> {
        self.factory.lock().inits.push((frame.seq, roi));
        self.last = Some(roi);
        Ok(())
    }

    fn update(&mut self, _frame: &Frame) -> Result<Option<Roi>> {
        let last = self.last.ok_or_else(|| anyhow!("scripted backend used before init"))?;
        let mut script = self.factory.lock();
        script.updates += 1;
        let outcome = script.outcomes.pop_front().unwrap_or(Some(last));
        if let Some(roi) = outcome {
            self.last = Some(roi);
        }
        Ok(outcome)
    }
}

impl Drop for ScriptedBackend {
    fn drop(&mut self) {
        self.factory.live.fetch_sub(1, Ordering::SeqCst);
    }
}
