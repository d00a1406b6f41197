use anyhow::{anyhow, Result};

pub mod scripted;
pub mod template;

pub use scripted::{ScriptedBackend, ScriptedFactory};
pub use template::{TemplateBackend, TemplateFactory, TemplateParams};

use super::backend::TrackerFactory;

/// Backend factories selectable by name from the command line.
pub const BACKEND_NAMES: &[&str] = &["template"];

/// Build the named factory.
pub fn factory_by_name(name: &str, params: TemplateParams) -> Result<Box<dyn TrackerFactory>> {
    match name {
        "template" => Ok(Box::new(TemplateFactory::new(params))),
        other => Err(anyhow!(
            "unknown tracker backend '{}'; available: {}",
            other,
            BACKEND_NAMES.join(", ")
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_backends_only() {
        let factory = factory_by_name("template", TemplateParams::default()).unwrap();
        assert_eq!(factory.name(), "template");
        assert!(factory_by_name("csrt", TemplateParams::default()).is_err());
    }
}
