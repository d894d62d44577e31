use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;
use tracing::error;

/// SQLSTATE `invalid_catalog_name`: connecting to a database that does not exist.
pub const SQLSTATE_INVALID_CATALOG_NAME: &str = "3D000";
/// SQLSTATE `duplicate_database`: lost a `CREATE DATABASE` race.
pub const SQLSTATE_DUPLICATE_DATABASE: &str = "42P04";
/// SQLSTATE `duplicate_table`: lost a `CREATE TABLE` race.
pub const SQLSTATE_DUPLICATE_TABLE: &str = "42P07";
/// SQLSTATE class 57P: the server ended the session (terminate, shutdown, crash).
pub const SQLSTATE_SESSION_ENDED: [&str; 3] = ["57P01", "57P02", "57P03"];

#[derive(Debug, ThisError)]
pub enum DemoError {
    #[error("Connection error: {0}")]
    Connection(#[source] SqlxError),

    #[error("Database \"{0}\" does not exist")]
    DatabaseNotFound(String),

    #[error("Query error: {0}")]
    Query(#[from] SqlxError),

    #[error("Invalid identifier {name:?}: {reason}")]
    InvalidIdentifier { name: String, reason: &'static str },

    #[error("Ractor error: {0}")]
    RactorError(String),

    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),
}

impl DemoError {
    /// Classify a failed connect attempt against `database`.
    pub fn from_connect(err: SqlxError, database: &str) -> Self {
        if has_sqlstate(&err, &[SQLSTATE_INVALID_CATALOG_NAME]) {
            DemoError::DatabaseNotFound(database.to_string())
        } else {
            DemoError::Connection(err)
        }
    }

    /// True when the connection behind the error can no longer be used.
    pub fn is_connection_lost(&self) -> bool {
        match self {
            DemoError::Connection(e) | DemoError::Query(e) => {
                matches!(e, SqlxError::Io(_) | SqlxError::Protocol(_))
                    || has_sqlstate(e, &SQLSTATE_SESSION_ENDED)
            }
            _ => false,
        }
    }

    /// True when the server rejected a `CREATE` because the object already exists.
    pub fn is_duplicate_object(&self) -> bool {
        match self {
            DemoError::Query(e) => {
                has_sqlstate(e, &[SQLSTATE_DUPLICATE_DATABASE, SQLSTATE_DUPLICATE_TABLE])
            }
            _ => false,
        }
    }
}

fn has_sqlstate(err: &SqlxError, codes: &[&str]) -> bool {
    match err {
        SqlxError::Database(db_err) => db_err
            .code()
            .is_some_and(|code| codes.iter().any(|c| *c == code)),
        _ => false,
    }
}

impl IntoResponse for DemoError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_body) = match self {
            invalid @ DemoError::InvalidIdentifier { .. } => {
                let status = StatusCode::BAD_REQUEST;
                let body = ApiErrorBody {
                    code: "INVALID_IDENTIFIER".to_string(),
                    message: invalid.to_string(),
                };
                (status, body)
            }
            other => {
                error!(error = %other, "request failed");
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                let body = ApiErrorBody {
                    code: "INTERNAL_ERROR".to_string(),
                    message: "Internal server error".to_string(),
                };
                (status, body)
            }
        };
        (status, Json(ApiErrorResponse { error: error_body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}
