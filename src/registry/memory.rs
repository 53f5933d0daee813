use crate::error::RegistryError;
use crate::model::{
    Attribute, AttributeKind, AttributeTarget, Schema, SchemaId, UPLOAD_FILE_SCHEMA,
};
use crate::registry::SchemaSource;
use log::debug;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Immutable-after-build, in-memory schema registry
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<SchemaId, Schema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry and check that every attribute target is registered
    pub fn from_schemas(schemas: Vec<Schema>) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for schema in schemas {
            registry.register(schema)?;
        }
        registry.validate_targets()?;
        Ok(registry)
    }

    /// Parse a JSON array of schemas
    pub fn from_json_str(json: &str) -> Result<Self, RegistryError> {
        let schemas: Vec<Schema> = serde_json::from_str(json)?;
        Self::from_schemas(schemas)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let registry = Self::from_json_str(&contents)?;
        debug!(
            "Loaded {} schemas from {}",
            registry.len(),
            path.as_ref().display()
        );
        Ok(registry)
    }

    /// Add one schema after checking its attribute invariants.
    ///
    /// Targets are not checked here so mutually referencing schemas can be
    /// registered in any order; call [`SchemaRegistry::validate_targets`] once
    /// all of them are in.
    pub fn register(&mut self, mut schema: Schema) -> Result<(), RegistryError> {
        if self.schemas.contains_key(&schema.id) {
            return Err(RegistryError::DuplicateSchema(schema.id));
        }

        let mut seen = HashSet::new();
        for attribute in &mut schema.attributes {
            if !seen.insert(attribute.name.clone()) {
                return Err(RegistryError::DuplicateAttribute {
                    schema: schema.id.clone(),
                    attribute: attribute.name.clone(),
                });
            }
            if attribute.kind == AttributeKind::Media && attribute.target.is_none() {
                attribute.target = Some(AttributeTarget::Single(UPLOAD_FILE_SCHEMA.to_string()));
            }
            validate_attribute(&schema.id, attribute)?;
        }

        self.schemas.insert(schema.id.clone(), schema);
        Ok(())
    }

    pub fn validate_targets(&self) -> Result<(), RegistryError> {
        for schema in self.schemas.values() {
            for attribute in &schema.attributes {
                for target in attribute.target_ids() {
                    if !self.schemas.contains_key(target) {
                        return Err(RegistryError::UnknownTarget {
                            schema: schema.id.clone(),
                            attribute: attribute.name.clone(),
                            target: target.to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    pub fn schema_ids(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl SchemaSource for SchemaRegistry {
    fn get_schema(&self, id: &str) -> Option<&Schema> {
        self.schemas.get(id)
    }
}

fn validate_attribute(schema_id: &str, attribute: &Attribute) -> Result<(), RegistryError> {
    let invalid = |reason: &str| RegistryError::InvalidAttribute {
        schema: schema_id.to_string(),
        attribute: attribute.name.clone(),
        reason: reason.to_string(),
    };

    if attribute.is_filterable() {
        match attribute.kind {
            AttributeKind::Password => return Err(invalid("password attributes are never filterable")),
            AttributeKind::DynamicZone => {
                return Err(invalid("dynamic zones are never filterable"))
            }
            kind if kind.is_nested() => {
                return Err(invalid("nested attributes are only filterable through their fields"))
            }
            _ => {}
        }
    }

    if attribute.kind.is_nested() != attribute.is_populatable() {
        return Err(invalid(if attribute.kind.is_nested() {
            "nested attributes must be populatable"
        } else {
            "scalar attributes cannot be populatable"
        }));
    }

    match (&attribute.kind, &attribute.target) {
        (AttributeKind::Relation, Some(AttributeTarget::Many(targets)))
        | (AttributeKind::DynamicZone, Some(AttributeTarget::Many(targets))) => {
            if targets.is_empty() {
                return Err(invalid("target set must not be empty"));
            }
        }
        (AttributeKind::Relation, Some(AttributeTarget::Single(_)))
        | (AttributeKind::Component, Some(AttributeTarget::Single(_)))
        | (AttributeKind::Media, Some(AttributeTarget::Single(_))) => {}
        (AttributeKind::DynamicZone, _) => {
            return Err(invalid("dynamic zones need a set of component targets"))
        }
        (AttributeKind::Component, _) | (AttributeKind::Media, _) => {
            return Err(invalid("a single target schema is required"))
        }
        (AttributeKind::Relation, None) => return Err(invalid("relations need a target")),
        (_, Some(_)) => return Err(invalid("scalar attributes cannot declare a target")),
        (_, None) => {}
    }

    if attribute.enum_values.is_some() && attribute.kind != AttributeKind::Enumeration {
        return Err(invalid("only enumeration attributes may list enum values"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SchemaKind;

    fn user_schema() -> Schema {
        Schema::new(
            "api::user.user",
            SchemaKind::ContentType,
            vec![Attribute::scalar("name", AttributeKind::Text)],
        )
    }

    #[test]
    fn test_registry_rejects_duplicate_schema() {
        let result = SchemaRegistry::from_schemas(vec![user_schema(), user_schema()]);
        assert!(matches!(result, Err(RegistryError::DuplicateSchema(id)) if id == "api::user.user"));
    }

    #[test]
    fn test_registry_rejects_filterable_password() {
        let schema = Schema::new(
            "api::user.user",
            SchemaKind::ContentType,
            vec![Attribute::scalar("password", AttributeKind::Password).with_filterable(true)],
        );
        let err = SchemaRegistry::from_schemas(vec![schema]).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidAttribute { .. }));
    }

    #[test]
    fn test_registry_rejects_unknown_target() {
        let schema = Schema::new(
            "api::article.article",
            SchemaKind::ContentType,
            vec![Attribute::relation("author", "api::user.user", false)],
        );
        let err = SchemaRegistry::from_schemas(vec![schema]).unwrap_err();
        assert!(matches!(err, RegistryError::UnknownTarget { target, .. } if target == "api::user.user"));
    }

    #[test]
    fn test_registry_loads_json_and_defaults_media_target() {
        let json = r#"[
            {"id": "plugin::upload.file", "kind": "content-type", "attributes": [
                {"name": "url", "type": "text"}
            ]},
            {"id": "api::user.user", "kind": "content-type", "attributes": [
                {"name": "name", "type": "text"},
                {"name": "avatar", "type": "media"}
            ]}
        ]"#;
        let registry = SchemaRegistry::from_json_str(json).unwrap();
        assert_eq!(registry.len(), 2);

        let user = registry.get_schema("api::user.user").unwrap();
        assert_eq!(
            user.attribute("avatar").unwrap().target_ids(),
            vec![UPLOAD_FILE_SCHEMA]
        );
    }
}
