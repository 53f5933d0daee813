use crate::error::{QueryError, Result};
use crate::logic::{AttributeClass, AttributeClassifier};
use crate::model::{AttributePath, ParamKind, ResolutionLimits, Schema};
use crate::registry::SchemaSource;

/// Per-call state threaded through every resolver.
///
/// Holds nothing but the classifier memo and the configured limits, so one is
/// created for each top-level resolution and dropped afterwards.
pub struct ResolutionContext<'r> {
    classifier: AttributeClassifier<'r>,
    limits: ResolutionLimits,
}

impl<'r> ResolutionContext<'r> {
    pub fn new(registry: &'r dyn SchemaSource, limits: ResolutionLimits) -> Self {
        Self {
            classifier: AttributeClassifier::new(registry),
            limits,
        }
    }

    pub fn limits(&self) -> &ResolutionLimits {
        &self.limits
    }

    pub fn classify(&self, schema: &Schema, name: &str) -> AttributeClass {
        self.classifier.classify(schema, name)
    }

    pub fn schema(&self, id: &str, parameter: ParamKind, path: &AttributePath) -> Result<&'r Schema> {
        self.classifier
            .registry()
            .get_schema(id)
            .ok_or_else(|| QueryError::schema_not_found(parameter, path, id))
    }

    /// Fails once `hops` schema hops exceed the configured maximum depth
    pub fn check_depth(&self, hops: usize, parameter: ParamKind, path: &AttributePath) -> Result<()> {
        if hops > self.limits.max_depth {
            return Err(QueryError::depth_exceeded(parameter, path, self.limits.max_depth));
        }
        Ok(())
    }
}
