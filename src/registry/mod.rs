pub mod handle;
pub mod memory;
pub mod traits;

pub use handle::RegistryHandle;
pub use memory::SchemaRegistry;
pub use traits::SchemaSource;
