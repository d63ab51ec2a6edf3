//! 工具目录：描述符与外部存储

pub mod descriptor;
pub mod store;

pub use descriptor::{InputSchema, PropertySchema, ToolDescriptor};
pub use store::CatalogStore;
