pub mod queries;
pub mod schema;
pub mod store;

pub use store::Store;
