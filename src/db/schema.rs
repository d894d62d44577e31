//! SQL text for catalog lookups, DDL and row access.
//! Identifiers are spliced only in their quoted form; values are always bound.

use super::identifier::Identifier;

/// Database every server session can reach; used when no target database is open.
pub const MAINTENANCE_DB: &str = "postgres";

pub const DATABASE_EXISTS: &str = "SELECT EXISTS (SELECT 1 FROM pg_database WHERE datname = $1)";

pub const TABLE_EXISTS: &str = "SELECT EXISTS (SELECT 1 FROM pg_catalog.pg_tables \
     WHERE schemaname = current_schema() AND tablename = $1)";

pub const SERVER_VERSION: &str = "SHOW server_version";

pub fn create_database(name: &Identifier) -> String {
    format!("CREATE DATABASE {}", name.quoted())
}

pub fn drop_database(name: &Identifier) -> String {
    format!("DROP DATABASE IF EXISTS {}", name.quoted())
}

/// Fixed two-column schema:
/// - `id` SERIAL PRIMARY KEY
/// - `data` VARCHAR NOT NULL
pub fn create_table(name: &Identifier) -> String {
    format!(
        "CREATE TABLE {} (id SERIAL PRIMARY KEY, data VARCHAR NOT NULL)",
        name.quoted()
    )
}

pub fn drop_table(name: &Identifier) -> String {
    format!("DROP TABLE IF EXISTS {}", name.quoted())
}

pub fn insert_row(table: &Identifier) -> String {
    format!("INSERT INTO {} (data) VALUES ($1) RETURNING id", table.quoted())
}

pub fn select_rows(table: &Identifier) -> String {
    format!("SELECT id, data FROM {}", table.quoted())
}
