mod backend;
pub mod backends;
mod state;

pub use backend::{TrackerBackend, TrackerFactory};
pub use backends::{factory_by_name, ScriptedFactory, TemplateFactory, TemplateParams};
pub use state::{TrackerPhase, TrackerSession, TrackerState};
