use crate::model::Schema;

/// Read-only schema lookup consulted during resolution.
///
/// Implementations must be side-effect free and cheap to call; the resolvers
/// look schemas up on every hop through a relation or component.
pub trait SchemaSource: Send + Sync {
    fn get_schema(&self, id: &str) -> Option<&Schema>;

    fn contains(&self, id: &str) -> bool {
        self.get_schema(id).is_some()
    }
}
