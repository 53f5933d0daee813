pub mod common;
pub mod fields;
pub mod filter;
pub mod limits;
pub mod pagination;
pub mod plan;
pub mod populate;
pub mod relation;
pub mod schema;
pub mod sort;

pub use common::*;
pub use fields::*;
pub use filter::*;
pub use limits::*;
pub use pagination::*;
pub use plan::*;
pub use populate::*;
pub use relation::*;
pub use schema::*;
pub use sort::*;
