use content_query_rust::{
    demo_registry, ErrorKind, FieldsSelection, FilterOperator, FilterTree, Operand, Pagination,
    ParamKind, PopulateEntry, QueryParams, QueryPlanner, RegistryHandle, ResolutionLimits,
    ScalarValue, SchemaRegistry, SchemaSource, SortTerm,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Barrier;

const ARTICLE: &str = "api::article.article";

// Planner fixture over the demo registry
struct Fixture {
    registry: SchemaRegistry,
    limits: ResolutionLimits,
}

impl Fixture {
    fn new() -> Self {
        Self::with_limits(ResolutionLimits::default())
    }

    fn with_limits(limits: ResolutionLimits) -> Self {
        Self {
            registry: demo_registry().unwrap(),
            limits,
        }
    }

    fn planner(&self) -> QueryPlanner<'_> {
        QueryPlanner::new(&self.registry, self.limits)
    }
}

/// `{ author: { populate: { articles: { populate: ... } } } }` with `levels` populate levels
fn alternating_populate(levels: usize) -> Value {
    let names = ["author", "articles"];
    let mut value = Value::Bool(true);
    for level in (0..levels).rev() {
        let name = names[level % 2];
        value = if value == Value::Bool(true) {
            json!({ name: true })
        } else {
            json!({ name: { "populate": value } })
        };
    }
    value
}

#[test]
fn test_fields_round_trip_through_every_notation() {
    let fixture = Fixture::new();
    let planner = fixture.planner();
    let article = fixture.registry.get_schema(ARTICLE).unwrap();

    for raw in [json!("title,views"), json!(["slug"]), json!("*"), json!(["title", "id"])] {
        let selection = planner.resolve_fields(ARTICLE, &raw).unwrap();

        let from_string = planner
            .resolve_fields(ARTICLE, &json!(selection.to_string_notation(article)))
            .unwrap();
        let from_array = planner
            .resolve_fields(ARTICLE, &selection.to_array_notation(article))
            .unwrap();

        assert_eq!(from_string, selection, "string rendering of {}", raw);
        assert_eq!(from_array, selection, "array rendering of {}", raw);
    }
}

#[test]
fn test_fields_wildcard_matches_explicit_list() {
    let fixture = Fixture::new();
    let planner = fixture.planner();
    let article = fixture.registry.get_schema(ARTICLE).unwrap();

    let all: Vec<&str> = article.scalar_attribute_names().collect();
    assert_eq!(
        planner.resolve_fields(ARTICLE, &json!("*")).unwrap(),
        planner.resolve_fields(ARTICLE, &json!(all)).unwrap()
    );
    assert_eq!(planner.resolve_fields(ARTICLE, &json!("*")).unwrap(), FieldsSelection::All);
}

#[test]
fn test_contains_is_rejected_on_every_numeric_attribute_and_accepted_on_text() {
    let fixture = Fixture::new();
    let planner = fixture.planner();

    for schema_id in fixture.registry.schema_ids() {
        let schema = fixture.registry.get_schema(schema_id).unwrap();
        for attribute in &schema.attributes {
            let filters = json!({ attribute.name.as_str(): { "$contains": "x" } });
            let result = planner.resolve_filters(schema_id, &filters);

            match attribute.kind {
                content_query_rust::AttributeKind::Numeric => {
                    assert_eq!(result.unwrap_err().kind, ErrorKind::InvalidFilterOperator);
                }
                content_query_rust::AttributeKind::Text => assert!(result.is_ok()),
                _ => {}
            }
        }
    }
}

#[test]
fn test_pagination_notations_are_exclusive() {
    let fixture = Fixture::new();
    let err = fixture
        .planner()
        .resolve_pagination(&json!({ "page": 1, "pageSize": 10, "start": 0, "limit": 5 }))
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ConflictingPaginationNotation);
}

#[test]
fn test_fragments_only_on_polymorphic_attributes() {
    let fixture = Fixture::new();
    let planner = fixture.planner();

    let err = planner
        .resolve_populate(ARTICLE, &json!({ "author": { "on": { "api::user.user": true } } }))
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidFragmentTarget);

    let tree = planner
        .resolve_populate(
            ARTICLE,
            &json!({ "blocks": { "on": { "blocks.quote": true, "blocks.gallery": { "fields": ["caption"] } } } }),
        )
        .unwrap();
    assert!(matches!(&tree["blocks"], PopulateEntry::Fragments { on } if on.len() == 2));
}

#[test]
fn test_populate_depth_boundary() {
    for max_depth in [2, 3, 5] {
        let fixture = Fixture::with_limits(ResolutionLimits::default().with_max_depth(max_depth));
        let planner = fixture.planner();

        assert!(planner
            .resolve_populate(ARTICLE, &alternating_populate(max_depth - 1))
            .is_ok());
        assert!(planner
            .resolve_populate(ARTICLE, &alternating_populate(max_depth))
            .is_ok());

        let err = planner
            .resolve_populate(ARTICLE, &alternating_populate(max_depth + 1))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::PopulateDepthExceeded);
        assert_eq!(err.parameter, ParamKind::Populate);
    }
}

#[test]
fn test_nested_relation_filter() {
    let fixture = Fixture::new();
    let tree = fixture
        .planner()
        .resolve_filters(ARTICLE, &json!({ "author": { "name": { "$eq": "Ada" } } }))
        .unwrap();

    assert_eq!(
        tree,
        Some(FilterTree::nested(
            "author",
            "api::user.user",
            FilterTree::condition("name", FilterOperator::Eq, Operand::Value(ScalarValue::text("Ada")))
        ))
    );
}

#[test]
fn test_sort_string_with_relation_path() {
    let fixture = Fixture::new();
    let sort = fixture
        .planner()
        .resolve_sort(ARTICLE, &json!("title,author.name:desc"))
        .unwrap();
    assert_eq!(sort, vec![SortTerm::asc("title"), SortTerm::desc("author.name")]);
}

#[test]
fn test_set_cannot_mix_with_connect() {
    let fixture = Fixture::new();
    let err = fixture
        .planner()
        .resolve_relation_mutation(
            ARTICLE,
            "tags",
            &json!({ "connect": [{ "id": 3, "position": { "before": 1 } }], "set": [1, 2] }),
        )
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ConflictingRelationMutation);
}

#[test]
fn test_full_plan_from_json_params() {
    let fixture = Fixture::new();
    let params: QueryParams = serde_json::from_value(json!({
        "fields": "title,slug",
        "filters": { "$or": [{ "views": { "$gte": "100" } }, { "category": "news" }] },
        "populate": { "author": { "fields": ["name"] }, "tags": { "count": true } },
        "sort": ["publishedDate:desc", "title"],
        "pagination": { "page": 2, "pageSize": 10, "withCount": true },
        "status": "published",
        "locale": "en"
    }))
    .unwrap();

    let plan = fixture.planner().plan(ARTICLE, &params).unwrap();
    assert!(!plan.fields().is_all());
    assert!(plan.filters().is_some());
    assert_eq!(plan.populate()["tags"], PopulateEntry::Count);
    assert_eq!(plan.sort().len(), 2);
    assert_eq!(plan.pagination().as_offset_limit(), (10, 10));
    assert_eq!(plan.locale(), Some("en"));

    let json = serde_json::to_value(&plan).unwrap();
    assert_eq!(json["schema"], ARTICLE);
    assert_eq!(json["pagination"]["style"], "page");
    assert_eq!(json["pagination"]["withCount"], true);
}

#[test]
fn test_first_error_aborts_the_plan() {
    let fixture = Fixture::new();
    let params = QueryParams {
        fields: Some(json!("title")),
        filters: Some(json!({ "views": { "$contains": "1" } })),
        sort: Some(json!("nope")),
        ..QueryParams::default()
    };
    let err = fixture.planner().plan(ARTICLE, &params).unwrap_err();
    assert_eq!(err.parameter, ParamKind::Filters);
    assert_eq!(err.path, "views");

    let body = serde_json::to_value(&err).unwrap();
    assert_eq!(body["attributePath"], "views");
    assert_eq!(body["parameterName"], "filters");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_plans_resolve_while_the_registry_is_swapped() {
    const WORKERS: u64 = 8;
    const ROUNDS: u64 = 50;

    let handle = Arc::new(RegistryHandle::new(demo_registry().unwrap()));
    let limits = ResolutionLimits::default();
    let start = Arc::new(Barrier::new(WORKERS as usize + 1));

    let mut tasks = Vec::new();
    for worker in 0..WORKERS {
        let held = handle.snapshot();
        let handle = Arc::clone(&handle);
        let start = Arc::clone(&start);
        tasks.push(tokio::spawn(async move {
            start.wait().await;
            let mut windows = Vec::new();
            for round in 0..ROUNDS {
                let fresh = handle.snapshot();
                let registry: &SchemaRegistry = if round % 2 == 0 { &*held } else { &*fresh };
                let params = QueryParams {
                    filters: Some(json!({ "views": { "$gt": worker } })),
                    populate: Some(json!("author,tags")),
                    pagination: Some(json!({ "page": worker + 1 })),
                    ..QueryParams::default()
                };
                let plan = QueryPlanner::new(registry, limits).plan(ARTICLE, &params)?;
                windows.push(*plan.pagination());
            }
            Ok::<_, content_query_rust::QueryError>((held, windows))
        }));
    }

    start.wait().await;
    let mut previous = Vec::new();
    for _ in 0..ROUNDS {
        previous.push(handle.swap(demo_registry().unwrap()));
    }

    for (worker, task) in tasks.into_iter().enumerate() {
        let (held, windows) = task.await.unwrap().unwrap();
        assert_eq!(windows.len(), ROUNDS as usize);
        assert!(windows
            .iter()
            .all(|window| *window == Pagination::page(worker as u64 + 1, 25)));

        // The snapshot taken before any reload outlives every swap
        assert!(Arc::ptr_eq(&held, &previous[0]));
        assert!(!Arc::ptr_eq(&held, &handle.snapshot()));
        assert!(QueryPlanner::new(&*held, limits)
            .plan(ARTICLE, &QueryParams::default())
            .is_ok());
    }
}
