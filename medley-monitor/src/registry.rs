//! Step registry
//!
//! Maps each step key of a pipeline type to its handler, and owns the step
//! blueprint. Registry and blueprint derive from the same ordered list so the
//! persisted step schema and the handler set cannot drift apart when steps
//! are added.

use async_trait::async_trait;
use medley_core::domain::pipeline::{Pipeline, StepKey};
use std::sync::Arc;

/// Business logic for one step.
///
/// Handlers may mutate the aggregate's metadata in place; the engine persists
/// those mutations atomically with the step's status transition.
#[async_trait]
pub trait StepHandler: Send + Sync {
    async fn run(&self, pipeline: &mut Pipeline) -> anyhow::Result<()>;
}

struct StepSpec {
    name: &'static str,
    key: StepKey,
    handler: Arc<dyn StepHandler>,
}

/// The step set of one pipeline type: ordered step list plus handler lookup.
///
/// Built once at startup and read-only thereafter.
pub struct StepRegistry {
    pipeline_name: &'static str,
    steps: Vec<StepSpec>,
}

impl StepRegistry {
    pub fn new(pipeline_name: &'static str) -> Self {
        Self {
            pipeline_name,
            steps: Vec::new(),
        }
    }

    /// Append a step. Declaration order is the canonical happy-path order of
    /// the blueprint.
    pub fn with_step(
        mut self,
        name: &'static str,
        key: StepKey,
        handler: Arc<dyn StepHandler>,
    ) -> Self {
        debug_assert!(
            self.steps.iter().all(|s| s.key != key),
            "duplicate step key {key} in registry {}",
            self.pipeline_name
        );
        self.steps.push(StepSpec { name, key, handler });
        self
    }

    pub fn pipeline_name(&self) -> &'static str {
        self.pipeline_name
    }

    pub fn handler(&self, key: StepKey) -> Option<Arc<dyn StepHandler>> {
        self.steps
            .iter()
            .find(|s| s.key == key)
            .map(|s| Arc::clone(&s.handler))
    }

    /// Build a fresh pipeline document with every registered step pending.
    pub fn blueprint(&self, id: impl Into<String>) -> Pipeline {
        let mut pipeline = Pipeline::new(id, self.pipeline_name);
        for spec in &self.steps {
            pipeline.add_step(spec.name, spec.key);
        }
        pipeline
    }

    /// Check that every step of a loaded document has a handler. Returns the
    /// first uncovered key: persisted schema and registry have drifted.
    pub fn validate(&self, pipeline: &Pipeline) -> Result<(), StepKey> {
        for step in &pipeline.steps {
            if self.handler(step.key).is_none() {
                return Err(step.key);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medley_core::domain::pipeline::StepStatus;

    struct Noop;

    #[async_trait]
    impl StepHandler for Noop {
        async fn run(&self, _pipeline: &mut Pipeline) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn registry() -> StepRegistry {
        StepRegistry::new("Media Request")
            .with_step("User Requested", StepKey::Requested, Arc::new(Noop))
            .with_step("Request Imported", StepKey::Imported, Arc::new(Noop))
    }

    #[test]
    fn blueprint_preserves_declaration_order() {
        let pipeline = registry().blueprint("TVo_oFoo");
        let keys: Vec<_> = pipeline.steps.iter().map(|s| s.key).collect();
        assert_eq!(keys, vec![StepKey::Requested, StepKey::Imported]);
        assert!(pipeline.steps.iter().all(|s| s.status == StepStatus::Pending));
    }

    #[test]
    fn validate_flags_uncovered_keys() {
        let reg = registry();
        let mut pipeline = reg.blueprint("TVo_oFoo");
        assert!(reg.validate(&pipeline).is_ok());

        // A document written by a newer schema carries a step this registry
        // does not know.
        pipeline.add_step("Request Downloading", StepKey::Downloading);
        assert_eq!(reg.validate(&pipeline), Err(StepKey::Downloading));
    }
}
