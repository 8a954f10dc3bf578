pub mod csv_decoder;
pub mod disk_store;
pub mod dynamodb_store;
pub mod object_source;
pub mod pipeline;
pub mod sqlite_store;
pub mod store;

#[cfg(test)]
pub mod memory;
