use axum::{
    Router,
    routing::{get, post},
};

use crate::db::{DbActorHandle, Identifier};
use crate::handlers::{meta, names};

/// Shared application state: the database actor plus the names it provisions.
#[derive(Clone)]
pub struct DemoState {
    pub db: DbActorHandle,
    pub database: Identifier,
    pub table: Identifier,
}

impl DemoState {
    pub fn new(db: DbActorHandle, database: Identifier, table: Identifier) -> Self {
        Self {
            db,
            database,
            table,
        }
    }
}

pub fn demo_router(state: DemoState) -> Router {
    Router::new()
        .route("/", get(meta::root_handler))
        .route("/version", get(meta::version_handler))
        .route("/createdb", post(names::create_db_handler))
        // Older clients still call the original endpoint name.
        .route("/connectdb", post(names::create_db_handler))
        .route("/dropdb", post(names::drop_db_handler))
        .route("/createtable", post(names::create_table_handler))
        .route("/droptable", post(names::drop_table_handler))
        .route("/addname", post(names::add_name_handler))
        .route("/names", get(names::list_names_handler))
        .with_state(state)
}
