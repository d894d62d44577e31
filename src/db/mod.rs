//! Database module: lifecycle manager for the demo PostgreSQL storage.
//!
//! Layout:
//! - `identifier.rs`: validated, quoted database/table names
//! - `schema.rs`: SQL for catalog lookups, DDL and row access
//! - `models.rs`: row and provisioning types
//! - `postgres.rs`: `DataBase`, owner of the single connection
//! - `actor.rs`: ractor actor serializing access to `DataBase`

pub mod actor;
pub mod identifier;
pub mod models;
pub mod postgres;
pub mod schema;

pub use actor::{DbActorHandle, spawn};
pub use identifier::Identifier;
pub use models::{NameRow, Provisioned};
pub use postgres::{ConnectTarget, DataBase};
