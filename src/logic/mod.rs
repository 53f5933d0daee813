pub mod assemble;
pub mod classify;
pub mod context;
pub mod filter_resolution;
pub mod normalize;
pub mod operand;
pub mod pagination_resolution;
pub mod populate_resolution;
pub mod relation_resolution;
pub mod sort_resolution;

pub use assemble::*;
pub use classify::*;
pub use context::*;
pub use filter_resolution::*;
pub use normalize::*;
pub use operand::*;
pub use pagination_resolution::*;
pub use populate_resolution::*;
pub use relation_resolution::*;
pub use sort_resolution::*;
