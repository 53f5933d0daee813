pub mod config;
pub mod error;
pub mod logic;
pub mod model;
pub mod registry;
pub mod seed;

// Export error types
pub use error::{ErrorKind, QueryError, RegistryError, Result};

// Export the resolvers and the planner facade
pub use logic::{
    assemble, AttributeClass, AttributeClassifier, CanonicalNotation, FilterResolver, Normalizer,
    OperandCoercer, PaginationResolver, PopulateResolver, QueryPlanner, RelationMutationResolver,
    ResolutionContext, SortResolver,
};

// Export all model types
pub use model::*;

// Export registry types
pub use registry::{RegistryHandle, SchemaRegistry, SchemaSource};

// Export seed module
pub use seed::demo_registry;
