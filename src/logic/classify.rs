use crate::model::{
    Attribute, AttributeTarget, ScalarDomain, Schema, SchemaId, UPLOAD_FILE_SCHEMA, VIRTUAL_DOCUMENT_ID,
    VIRTUAL_ID,
};
use crate::registry::SchemaSource;
use log::trace;
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};

/// How an attribute may take part in fields, filters, populate and sort
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeClass {
    /// Filterable and sortable scalar
    Scalar(ScalarDomain),
    /// Populatable attribute with exactly one target schema
    Nested(SchemaId),
    /// Populatable attribute whose target is one of several schemas
    MorphNested(BTreeSet<SchemaId>),
    /// Scalar that can be selected but never filtered or sorted on
    NonFilterable,
    Unknown,
}

impl AttributeClass {
    pub fn is_populatable(&self) -> bool {
        matches!(self, AttributeClass::Nested(_) | AttributeClass::MorphNested(_))
    }

    pub fn is_selectable(&self) -> bool {
        matches!(self, AttributeClass::Scalar(_) | AttributeClass::NonFilterable)
    }
}

/// Memoizing attribute lookup shared by every resolver of one resolution call
pub struct AttributeClassifier<'r> {
    registry: &'r dyn SchemaSource,
    memo: RefCell<HashMap<(SchemaId, String), AttributeClass>>,
}

impl<'r> AttributeClassifier<'r> {
    pub fn new(registry: &'r dyn SchemaSource) -> Self {
        Self {
            registry,
            memo: RefCell::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &'r dyn SchemaSource {
        self.registry
    }

    pub fn classify(&self, schema: &Schema, name: &str) -> AttributeClass {
        let key = (schema.id.clone(), name.to_string());
        if let Some(class) = self.memo.borrow().get(&key) {
            trace!("Classifier hit for {}.{}", schema.id, name);
            return class.clone();
        }

        let class = Self::classify_uncached(schema, name);
        self.memo.borrow_mut().insert(key, class.clone());
        class
    }

    pub fn classify_uncached(schema: &Schema, name: &str) -> AttributeClass {
        match schema.attribute(name) {
            Some(attribute) => Self::classify_attribute(attribute),
            None if name == VIRTUAL_ID => AttributeClass::Scalar(ScalarDomain::Numeric),
            None if name == VIRTUAL_DOCUMENT_ID => AttributeClass::Scalar(ScalarDomain::Uid),
            None => AttributeClass::Unknown,
        }
    }

    fn classify_attribute(attribute: &Attribute) -> AttributeClass {
        if attribute.kind.is_nested() {
            return match &attribute.target {
                Some(AttributeTarget::Single(target)) => AttributeClass::Nested(target.clone()),
                Some(AttributeTarget::Many(targets)) => {
                    AttributeClass::MorphNested(targets.iter().cloned().collect())
                }
                None if attribute.is_relational() => {
                    AttributeClass::Nested(UPLOAD_FILE_SCHEMA.to_string())
                }
                None => AttributeClass::NonFilterable,
            };
        }

        match attribute.kind.domain() {
            Some(domain) if attribute.is_filterable() => AttributeClass::Scalar(domain),
            _ => AttributeClass::NonFilterable,
        }
    }

    /// Number of memoized lookups, exposed for tests
    pub fn memo_len(&self) -> usize {
        self.memo.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::demo_registry;

    #[test]
    fn test_classifies_each_attribute_kind() {
        let registry = demo_registry().unwrap();
        let classifier = AttributeClassifier::new(&registry);
        let article = registry.get_schema("api::article.article").unwrap();

        assert_eq!(
            classifier.classify(article, "title"),
            AttributeClass::Scalar(ScalarDomain::Text)
        );
        assert_eq!(
            classifier.classify(article, "author"),
            AttributeClass::Nested("api::user.user".to_string())
        );
        assert!(matches!(
            classifier.classify(article, "blocks"),
            AttributeClass::MorphNested(targets) if targets.contains("blocks.quote")
        ));
        assert_eq!(
            classifier.classify(article, "cover"),
            AttributeClass::Nested(UPLOAD_FILE_SCHEMA.to_string())
        );
        assert_eq!(classifier.classify(article, "secret"), AttributeClass::NonFilterable);
        assert_eq!(classifier.classify(article, "nope"), AttributeClass::Unknown);
    }

    #[test]
    fn test_virtual_attributes_are_scalars() {
        let registry = demo_registry().unwrap();
        let classifier = AttributeClassifier::new(&registry);
        let tag = registry.get_schema("api::tag.tag").unwrap();

        assert_eq!(
            classifier.classify(tag, "id"),
            AttributeClass::Scalar(ScalarDomain::Numeric)
        );
        assert_eq!(
            classifier.classify(tag, "documentId"),
            AttributeClass::Scalar(ScalarDomain::Uid)
        );
    }

    #[test]
    fn test_lookups_are_memoized_per_schema_and_name() {
        let registry = demo_registry().unwrap();
        let classifier = AttributeClassifier::new(&registry);
        let article = registry.get_schema("api::article.article").unwrap();

        classifier.classify(article, "title");
        classifier.classify(article, "title");
        classifier.classify(article, "author");
        assert_eq!(classifier.memo_len(), 2);
    }
}
