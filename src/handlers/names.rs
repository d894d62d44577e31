use std::collections::BTreeMap;

use axum::{Form, Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{DemoError, router::DemoState};

#[derive(Serialize)]
pub struct DatabaseStatus {
    pub database: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dropped: Option<bool>,
}

#[derive(Serialize)]
pub struct TableStatus {
    pub table: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct AddNameForm {
    pub username: String,
}

#[derive(Serialize)]
pub struct AddNameResponse {
    pub username: String,
}

/// Rows keyed by id; JSON renders the keys as strings.
#[derive(Serialize)]
pub struct NamesResponse {
    pub names: BTreeMap<i32, String>,
}

pub async fn create_db_handler(
    State(state): State<DemoState>,
) -> Result<Json<DatabaseStatus>, DemoError> {
    let outcome = state.db.ensure_database(&state.database).await?;
    Ok(Json(DatabaseStatus {
        database: state.database.to_string(),
        created: Some(outcome.created()),
        dropped: None,
    }))
}

pub async fn drop_db_handler(
    State(state): State<DemoState>,
) -> Result<Json<DatabaseStatus>, DemoError> {
    let dropped = state.db.drop_database(&state.database).await?;
    Ok(Json(DatabaseStatus {
        database: state.database.to_string(),
        created: None,
        dropped: Some(dropped),
    }))
}

pub async fn create_table_handler(
    State(state): State<DemoState>,
) -> Result<Json<TableStatus>, DemoError> {
    let outcome = state.db.ensure_table(&state.table).await?;
    Ok(Json(TableStatus {
        table: state.table.to_string(),
        created: Some(outcome.created()),
    }))
}

pub async fn drop_table_handler(
    State(state): State<DemoState>,
) -> Result<Json<TableStatus>, DemoError> {
    state.db.drop_table(&state.table).await?;
    Ok(Json(TableStatus {
        table: state.table.to_string(),
        created: None,
    }))
}

pub async fn add_name_handler(
    State(state): State<DemoState>,
    Form(form): Form<AddNameForm>,
) -> Result<Json<AddNameResponse>, DemoError> {
    let id = state.db.insert_row(&state.table, form.username.as_str()).await?;
    info!(id, table = %state.table, "name added");
    Ok(Json(AddNameResponse {
        username: form.username,
    }))
}

pub async fn list_names_handler(
    State(state): State<DemoState>,
) -> Result<Json<NamesResponse>, DemoError> {
    let rows = state.db.list_rows(&state.table).await?;
    let names = rows.into_iter().map(|row| (row.id, row.data)).collect();
    Ok(Json(NamesResponse { names }))
}
