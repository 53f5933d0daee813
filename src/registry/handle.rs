use crate::registry::SchemaRegistry;
use log::info;
use parking_lot::RwLock;
use std::sync::Arc;

/// Host-owned holder of the current registry snapshot.
///
/// Resolution borrows an `Arc` snapshot per call, so a reload swaps the
/// pointer without disturbing calls already running against the old one.
#[derive(Debug)]
pub struct RegistryHandle {
    current: RwLock<Arc<SchemaRegistry>>,
}

impl RegistryHandle {
    pub fn new(registry: SchemaRegistry) -> Self {
        Self {
            current: RwLock::new(Arc::new(registry)),
        }
    }

    /// Snapshot to resolve against
    pub fn snapshot(&self) -> Arc<SchemaRegistry> {
        self.current.read().clone()
    }

    /// Replace the registry, returning the previous snapshot
    pub fn swap(&self, registry: SchemaRegistry) -> Arc<SchemaRegistry> {
        let next = Arc::new(registry);
        let previous = std::mem::replace(&mut *self.current.write(), next);
        info!(
            "Schema registry swapped ({} -> {} schemas)",
            previous.len(),
            self.current.read().len()
        );
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Attribute, AttributeKind, Schema, SchemaKind};
    use crate::registry::SchemaSource;

    #[test]
    fn test_swap_leaves_old_snapshot_intact() {
        let handle = RegistryHandle::new(SchemaRegistry::new());
        let before = handle.snapshot();

        let schema = Schema::new(
            "api::tag.tag",
            SchemaKind::ContentType,
            vec![Attribute::scalar("name", AttributeKind::Text)],
        );
        let previous = handle.swap(SchemaRegistry::from_schemas(vec![schema]).unwrap());

        assert!(before.is_empty());
        assert!(previous.is_empty());
        assert!(handle.snapshot().contains("api::tag.tag"));
    }
}
