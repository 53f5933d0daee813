use crate::model::{Attribute, AttributeKind, Schema, SchemaKind, UPLOAD_FILE_SCHEMA};
use crate::error::RegistryError;
use crate::registry::SchemaRegistry;
use log::debug;

fn content_type(id: &str, description: &str, attributes: Vec<Attribute>) -> Schema {
    Schema {
        description: Some(description.to_string()),
        ..Schema::new(id, SchemaKind::ContentType, attributes)
    }
}

fn component(id: &str, attributes: Vec<Attribute>) -> Schema {
    Schema::new(id, SchemaKind::Component, attributes)
}

/// Schemas of a small blog: articles with authors, tags, comments, an SEO
/// component, a dynamic zone of content blocks and a morph `related` relation
pub fn demo_schemas() -> Vec<Schema> {
    vec![
        content_type(
            "api::article.article",
            "Blog article",
            vec![
                Attribute::scalar("title", AttributeKind::Text),
                Attribute::scalar("slug", AttributeKind::Uid),
                Attribute::scalar("body", AttributeKind::Text),
                Attribute::scalar("views", AttributeKind::Numeric),
                Attribute::scalar("published", AttributeKind::Boolean),
                Attribute::scalar("publishedDate", AttributeKind::Temporal),
                Attribute::enumeration("category", &["news", "tutorial"]),
                Attribute::scalar("secret", AttributeKind::Password),
                Attribute::scalar("metadata", AttributeKind::Json),
                Attribute::relation("author", "api::user.user", false),
                Attribute::relation("tags", "api::tag.tag", true),
                Attribute::relation("comments", "api::comment.comment", true),
                Attribute::media("cover", false),
                Attribute::component("seo", "default.seo", false),
                Attribute::dynamic_zone(
                    "blocks",
                    &["blocks.rich-text", "blocks.quote", "blocks.gallery"],
                ),
                Attribute::morph_relation(
                    "related",
                    &["api::article.article", "api::page.page"],
                    true,
                ),
            ],
        ),
        content_type(
            "api::user.user",
            "Article author",
            vec![
                Attribute::scalar("name", AttributeKind::Text),
                Attribute::scalar("email", AttributeKind::Text),
                Attribute::scalar("password", AttributeKind::Password),
                Attribute::relation("articles", "api::article.article", true),
                Attribute::media("avatar", false),
            ],
        ),
        content_type(
            "api::tag.tag",
            "Article tag",
            vec![
                Attribute::scalar("name", AttributeKind::Text),
                Attribute::relation("articles", "api::article.article", true),
            ],
        ),
        content_type(
            "api::comment.comment",
            "Reader comment",
            vec![
                Attribute::scalar("body", AttributeKind::Text),
                Attribute::relation("author", "api::user.user", false),
            ],
        ),
        content_type(
            "api::page.page",
            "Standalone page",
            vec![
                Attribute::scalar("title", AttributeKind::Text),
                Attribute::dynamic_zone("blocks", &["blocks.rich-text", "blocks.quote"]),
            ],
        ),
        component(
            "default.seo",
            vec![
                Attribute::scalar("metaTitle", AttributeKind::Text),
                Attribute::scalar("metaDescription", AttributeKind::Text),
                Attribute::media("shareImage", false),
            ],
        ),
        component(
            "blocks.rich-text",
            vec![Attribute::scalar("body", AttributeKind::Text)],
        ),
        component(
            "blocks.quote",
            vec![
                Attribute::scalar("text", AttributeKind::Text),
                Attribute::scalar("author", AttributeKind::Text),
            ],
        ),
        component(
            "blocks.gallery",
            vec![
                Attribute::scalar("caption", AttributeKind::Text),
                Attribute::media("images", true),
            ],
        ),
        content_type(
            UPLOAD_FILE_SCHEMA,
            "Uploaded file",
            vec![
                Attribute::scalar("name", AttributeKind::Text),
                Attribute::scalar("url", AttributeKind::Text),
                Attribute::scalar("size", AttributeKind::Numeric),
                Attribute::scalar("mime", AttributeKind::Text),
            ],
        ),
    ]
}

/// Registry built from [`demo_schemas`]
pub fn demo_registry() -> Result<SchemaRegistry, RegistryError> {
    let registry = SchemaRegistry::from_schemas(demo_schemas())?;
    debug!("Seeded {} demo schemas", registry.len());
    Ok(registry)
}
