use crate::model::SchemaId;
use serde::{Deserialize, Serialize};

/// Schema backing every `media` attribute that does not name its own target
pub const UPLOAD_FILE_SCHEMA: &str = "plugin::upload.file";

/// Attribute names every schema exposes without declaring them
pub const VIRTUAL_ID: &str = "id";
pub const VIRTUAL_DOCUMENT_ID: &str = "documentId";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub id: SchemaId,
    pub kind: SchemaKind,
    /// Ordered attribute definitions; names are unique within the schema
    pub attributes: Vec<Attribute>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchemaKind {
    ContentType,
    Component,
}

impl Schema {
    pub fn new(id: impl Into<SchemaId>, kind: SchemaKind, attributes: Vec<Attribute>) -> Self {
        Self {
            id: id.into(),
            kind,
            attributes,
            description: None,
        }
    }

    /// Find an attribute definition by name
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    /// Names of every declared attribute that is not populatable, in declaration order
    pub fn scalar_attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .iter()
            .filter(|attr| !attr.is_populatable())
            .map(|attr| attr.name.as_str())
    }

    /// Names of every declared populatable attribute, in declaration order
    pub fn populatable_attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .iter()
            .filter(|attr| attr.is_populatable())
            .map(|attr| attr.name.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeKind {
    Numeric,
    Text,
    Boolean,
    Temporal,
    #[serde(alias = "enum")]
    Enumeration,
    Uid,
    Password,
    Json,
    Relation,
    Component,
    #[serde(alias = "dynamic-zone")]
    DynamicZone,
    Media,
}

impl AttributeKind {
    /// Kinds whose values must be expanded through `populate`
    pub fn is_nested(&self) -> bool {
        matches!(
            self,
            AttributeKind::Relation
                | AttributeKind::Component
                | AttributeKind::DynamicZone
                | AttributeKind::Media
        )
    }

    /// Scalar value domain, `None` for password and nested kinds
    pub fn domain(&self) -> Option<ScalarDomain> {
        match self {
            AttributeKind::Numeric => Some(ScalarDomain::Numeric),
            AttributeKind::Text => Some(ScalarDomain::Text),
            AttributeKind::Boolean => Some(ScalarDomain::Boolean),
            AttributeKind::Temporal => Some(ScalarDomain::Temporal),
            AttributeKind::Enumeration => Some(ScalarDomain::Enumeration),
            AttributeKind::Uid => Some(ScalarDomain::Uid),
            AttributeKind::Json => Some(ScalarDomain::Json),
            AttributeKind::Password
            | AttributeKind::Relation
            | AttributeKind::Component
            | AttributeKind::DynamicZone
            | AttributeKind::Media => None,
        }
    }
}

/// Value domain of a filterable scalar attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarDomain {
    Numeric,
    Text,
    Boolean,
    Temporal,
    Enumeration,
    Uid,
    Json,
}

impl ScalarDomain {
    /// Domains with a total order usable by `$gt`/`$lt`/`$between`
    pub fn is_ordered(&self) -> bool {
        matches!(self, ScalarDomain::Numeric | ScalarDomain::Temporal)
    }

    /// Domains holding string values usable by pattern operators
    pub fn is_text_like(&self) -> bool {
        matches!(
            self,
            ScalarDomain::Text | ScalarDomain::Uid | ScalarDomain::Enumeration
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarDomain::Numeric => "numeric",
            ScalarDomain::Text => "text",
            ScalarDomain::Boolean => "boolean",
            ScalarDomain::Temporal => "temporal",
            ScalarDomain::Enumeration => "enumeration",
            ScalarDomain::Uid => "uid",
            ScalarDomain::Json => "json",
        }
    }
}

/// Either one fixed target schema or the set of possible (morph) targets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeTarget {
    Single(SchemaId),
    Many(Vec<SchemaId>),
}

impl AttributeTarget {
    pub fn ids(&self) -> Vec<&str> {
        match self {
            AttributeTarget::Single(id) => vec![id.as_str()],
            AttributeTarget::Many(ids) => ids.iter().map(String::as_str).collect(),
        }
    }

    pub fn is_morph(&self) -> bool {
        matches!(self, AttributeTarget::Many(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AttributeKind,
    /// Defaults by kind when omitted: scalars are filterable except `password`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filterable: Option<bool>,
    /// Defaults by kind when omitted: nested kinds are populatable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub populatable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<AttributeTarget>,
    #[serde(default)]
    pub is_many: bool,
    /// Allowed values of an enumeration attribute
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
}

impl Attribute {
    fn bare(name: &str, kind: AttributeKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            filterable: None,
            populatable: None,
            target: None,
            is_many: false,
            enum_values: None,
        }
    }

    pub fn scalar(name: &str, kind: AttributeKind) -> Self {
        Self::bare(name, kind)
    }

    pub fn enumeration(name: &str, values: &[&str]) -> Self {
        Self {
            enum_values: Some(values.iter().map(|v| v.to_string()).collect()),
            ..Self::bare(name, AttributeKind::Enumeration)
        }
    }

    pub fn relation(name: &str, target: &str, is_many: bool) -> Self {
        Self {
            target: Some(AttributeTarget::Single(target.to_string())),
            is_many,
            ..Self::bare(name, AttributeKind::Relation)
        }
    }

    pub fn morph_relation(name: &str, targets: &[&str], is_many: bool) -> Self {
        Self {
            target: Some(AttributeTarget::Many(
                targets.iter().map(|t| t.to_string()).collect(),
            )),
            is_many,
            ..Self::bare(name, AttributeKind::Relation)
        }
    }

    pub fn component(name: &str, target: &str, repeatable: bool) -> Self {
        Self {
            target: Some(AttributeTarget::Single(target.to_string())),
            is_many: repeatable,
            ..Self::bare(name, AttributeKind::Component)
        }
    }

    pub fn dynamic_zone(name: &str, components: &[&str]) -> Self {
        Self {
            target: Some(AttributeTarget::Many(
                components.iter().map(|c| c.to_string()).collect(),
            )),
            is_many: true,
            ..Self::bare(name, AttributeKind::DynamicZone)
        }
    }

    pub fn media(name: &str, is_many: bool) -> Self {
        Self {
            target: Some(AttributeTarget::Single(UPLOAD_FILE_SCHEMA.to_string())),
            is_many,
            ..Self::bare(name, AttributeKind::Media)
        }
    }

    pub fn with_filterable(mut self, filterable: bool) -> Self {
        self.filterable = Some(filterable);
        self
    }

    pub fn is_filterable(&self) -> bool {
        self.filterable
            .unwrap_or(!self.kind.is_nested() && self.kind != AttributeKind::Password)
    }

    pub fn is_populatable(&self) -> bool {
        self.populatable.unwrap_or(self.kind.is_nested())
    }

    /// Target schema ids, empty for scalar kinds
    pub fn target_ids(&self) -> Vec<&str> {
        self.target.as_ref().map(AttributeTarget::ids).unwrap_or_default()
    }

    pub fn is_relational(&self) -> bool {
        matches!(self.kind, AttributeKind::Relation | AttributeKind::Media)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_defaults_follow_kind() {
        let title = Attribute::scalar("title", AttributeKind::Text);
        assert!(title.is_filterable());
        assert!(!title.is_populatable());

        let secret = Attribute::scalar("secret", AttributeKind::Password);
        assert!(!secret.is_filterable());
        assert!(!secret.is_populatable());

        let author = Attribute::relation("author", "api::user.user", false);
        assert!(!author.is_filterable());
        assert!(author.is_populatable());
        assert_eq!(author.target_ids(), vec!["api::user.user"]);
    }

    #[test]
    fn test_attribute_deserializes_from_registry_json() {
        let json = r#"{
            "name": "blocks",
            "type": "dynamiczone",
            "target": ["blocks.quote", "blocks.rich-text"],
            "isMany": true
        }"#;
        let attr: Attribute = serde_json::from_str(json).unwrap();
        assert_eq!(attr.kind, AttributeKind::DynamicZone);
        assert!(attr.target.as_ref().unwrap().is_morph());
        assert!(attr.is_many);
        assert!(attr.is_populatable());

        let status: Attribute =
            serde_json::from_str(r#"{"name": "status", "type": "enum", "enum": ["a", "b"]}"#)
                .unwrap();
        assert_eq!(status.kind, AttributeKind::Enumeration);
        assert_eq!(status.enum_values, Some(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn test_schema_attribute_partitions() {
        let schema = Schema::new(
            "api::article.article",
            SchemaKind::ContentType,
            vec![
                Attribute::scalar("title", AttributeKind::Text),
                Attribute::relation("author", "api::user.user", false),
                Attribute::scalar("views", AttributeKind::Numeric),
            ],
        );
        assert_eq!(
            schema.scalar_attribute_names().collect::<Vec<_>>(),
            vec!["title", "views"]
        );
        assert_eq!(
            schema.populatable_attribute_names().collect::<Vec<_>>(),
            vec!["author"]
        );
        assert!(schema.attribute("missing").is_none());
    }
}
