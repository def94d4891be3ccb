pub mod schema;
pub mod store;
pub mod sqlite;
pub mod pool;
pub mod codec;
