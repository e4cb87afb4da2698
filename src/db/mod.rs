//! Persistence
//!
//! `FarmStore` is the interface the services use. `MongoStore` is the
//! production backend; `MemoryStore` serves dev mode and tests.

pub mod memory;
pub mod mongo;
pub mod mongo_store;
pub mod schemas;
pub mod store;

pub use memory::MemoryStore;
pub use mongo::{MongoClient, MongoCollection};
pub use mongo_store::MongoStore;
pub use store::{ClaimSwap, FarmStore, IdentityCreation};
