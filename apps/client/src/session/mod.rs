pub mod coordinator;
pub mod policy;
pub mod store;
