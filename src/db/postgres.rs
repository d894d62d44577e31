use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{Connection, Executor};
use tracing::{debug, info, warn};

use crate::db::identifier::Identifier;
use crate::db::models::{NameRow, Provisioned};
use crate::db::schema::{self, MAINTENANCE_DB};
use crate::error::DemoError;

/// Server endpoint and credentials, shared by every session the manager opens.
#[derive(Debug, Clone)]
pub struct ConnectTarget {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

impl ConnectTarget {
    fn options(&self, database: &str) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(database)
    }
}

/// The one live connection and the database it is bound to.
struct Session {
    database: String,
    conn: PgConnection,
}

/// Owns a single PostgreSQL connection and provisions the target database and
/// tables on demand.
///
/// The connection is opened lazily and re-bound when an operation needs a
/// different database; there is never more than one open at a time. Outside an
/// explicit transaction every statement runs in autocommit mode, which
/// `CREATE DATABASE` requires.
pub struct DataBase {
    target: ConnectTarget,
    database: Identifier,
    session: Option<Session>,
}

impl DataBase {
    pub fn new(target: ConnectTarget, database: Identifier) -> Self {
        Self {
            target,
            database,
            session: None,
        }
    }

    /// Database that table operations run against.
    pub fn database(&self) -> &Identifier {
        &self.database
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    async fn open(&self, database: &str) -> Result<PgConnection, DemoError> {
        let conn = PgConnection::connect_with(&self.target.options(database))
            .await
            .map_err(|e| DemoError::from_connect(e, database))?;
        info!(
            host = %self.target.host,
            port = self.target.port,
            database,
            "connected to postgres"
        );
        Ok(conn)
    }

    /// Connection bound to `database`, replacing the current session if it is
    /// bound elsewhere.
    async fn session(&mut self, database: &str) -> Result<&mut PgConnection, DemoError> {
        let session = match self.session.take() {
            Some(session) if session.database == database => session,
            stale => {
                if let Some(stale) = stale {
                    Self::close_session(stale).await;
                }
                Session {
                    database: database.to_string(),
                    conn: self.open(database).await?,
                }
            }
        };
        Ok(&mut self.session.insert(session).conn)
    }

    /// Whatever connection is live, or a new one to the maintenance database.
    /// Catalog queries and database DDL work from any session.
    async fn any_conn(&mut self) -> Result<&mut PgConnection, DemoError> {
        let session = match self.session.take() {
            Some(session) => session,
            None => Session {
                database: MAINTENANCE_DB.to_string(),
                conn: self.open(MAINTENANCE_DB).await?,
            },
        };
        Ok(&mut self.session.insert(session).conn)
    }

    /// Connection bound to the target database. A missing database is
    /// provisioned once and the connect is repeated.
    async fn target_conn(&mut self) -> Result<&mut PgConnection, DemoError> {
        let database = self.database.clone();
        match self.session(database.as_str()).await.map(|_| ()) {
            Ok(()) => {}
            Err(DemoError::DatabaseNotFound(_)) => {
                warn!(%database, "database does not exist; trying to create");
                self.ensure_database(&database).await?;
            }
            Err(e) => return Err(e),
        }
        self.session(database.as_str()).await
    }

    async fn try_database_exists(&mut self, name: &Identifier) -> Result<bool, DemoError> {
        let conn = self.any_conn().await?;
        let exists: bool = sqlx::query_scalar(schema::DATABASE_EXISTS)
            .bind(name.as_str())
            .fetch_one(&mut *conn)
            .await?;
        Ok(exists)
    }

    async fn try_ensure_database(&mut self, name: &Identifier) -> Result<Provisioned, DemoError> {
        if self.database_exists(name).await? {
            debug!(database = %name, "database already exists");
            return Ok(Provisioned::AlreadyExists);
        }
        let conn = self.any_conn().await?;
        match conn.execute(schema::create_database(name).as_str()).await {
            Ok(_) => {
                info!(database = %name, "database was created");
                Ok(Provisioned::Created)
            }
            Err(e) => {
                let err = DemoError::from(e);
                if err.is_duplicate_object() {
                    debug!(database = %name, "database created concurrently");
                    Ok(Provisioned::AlreadyExists)
                } else {
                    Err(err)
                }
            }
        }
    }

    async fn try_drop_database(&mut self, name: &Identifier) -> Result<bool, DemoError> {
        // The server refuses to drop a database with open sessions, ours included.
        if self
            .session
            .as_ref()
            .is_some_and(|s| s.database == name.as_str())
        {
            debug!(database = %name, "releasing session bound to database before drop");
            self.close().await;
        }

        let conn = self.any_conn().await?;
        conn.execute(schema::drop_database(name).as_str()).await?;

        let dropped = !self.database_exists(name).await?;
        if dropped {
            info!(database = %name, "database was successfully removed");
        } else {
            warn!(database = %name, "database still exists after drop");
        }
        Ok(dropped)
    }

    async fn try_ensure_table(&mut self, table: &Identifier) -> Result<Provisioned, DemoError> {
        let database = self.database.clone();
        let conn = self.target_conn().await?;

        let exists: bool = sqlx::query_scalar(schema::TABLE_EXISTS)
            .bind(table.as_str())
            .fetch_one(&mut *conn)
            .await?;
        if exists {
            debug!(%table, %database, "table already exists");
            return Ok(Provisioned::AlreadyExists);
        }

        match conn.execute(schema::create_table(table).as_str()).await {
            Ok(_) => {
                info!(%table, %database, "table was created");
                Ok(Provisioned::Created)
            }
            Err(e) => {
                let err = DemoError::from(e);
                if err.is_duplicate_object() {
                    debug!(%table, %database, "table created concurrently");
                    Ok(Provisioned::AlreadyExists)
                } else {
                    Err(err)
                }
            }
        }
    }

    async fn try_drop_table(&mut self, table: &Identifier) -> Result<(), DemoError> {
        let database = self.database.clone();
        let conn = self.target_conn().await?;
        conn.execute(schema::drop_table(table).as_str()).await?;
        info!(%table, %database, "table was deleted");
        Ok(())
    }

    async fn try_insert_row(&mut self, table: &Identifier, value: &str) -> Result<i32, DemoError> {
        self.ensure_table(table).await?;
        let conn = self.target_conn().await?;
        let id: i32 = sqlx::query_scalar(&schema::insert_row(table))
            .bind(value)
            .fetch_one(&mut *conn)
            .await?;
        debug!(%table, id, "row inserted");
        Ok(id)
    }

    async fn try_list_rows(&mut self, table: &Identifier) -> Result<Vec<NameRow>, DemoError> {
        self.ensure_table(table).await?;
        let conn = self.target_conn().await?;
        let rows = sqlx::query_as::<_, NameRow>(&schema::select_rows(table))
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows)
    }

    async fn try_server_version(&mut self) -> Result<String, DemoError> {
        let conn = self.any_conn().await?;
        let version: String = sqlx::query_scalar(schema::SERVER_VERSION)
            .fetch_one(&mut *conn)
            .await?;
        Ok(version)
    }

    fn discard_if_broken<T>(&mut self, result: Result<T, DemoError>) -> Result<T, DemoError> {
        if let Err(e) = &result
            && e.is_connection_lost()
            && let Some(session) = self.session.take()
        {
            warn!(
                database = %session.database,
                error = %e,
                "connection lost; next operation reconnects"
            );
        }
        result
    }

    pub async fn database_exists(&mut self, name: &Identifier) -> Result<bool, DemoError> {
        let result = self.try_database_exists(name).await;
        self.discard_if_broken(result)
    }

    /// Create `name` unless the catalog already lists it.
    pub async fn ensure_database(&mut self, name: &Identifier) -> Result<Provisioned, DemoError> {
        let result = self.try_ensure_database(name).await;
        self.discard_if_broken(result)
    }

    /// Drop `name` if present. Returns `true` once the catalog no longer lists it.
    pub async fn drop_database(&mut self, name: &Identifier) -> Result<bool, DemoError> {
        let result = self.try_drop_database(name).await;
        self.discard_if_broken(result)
    }

    /// Create `table` in the target database unless it already exists.
    pub async fn ensure_table(&mut self, table: &Identifier) -> Result<Provisioned, DemoError> {
        let result = self.try_ensure_table(table).await;
        self.discard_if_broken(result)
    }

    pub async fn drop_table(&mut self, table: &Identifier) -> Result<(), DemoError> {
        let result = self.try_drop_table(table).await;
        self.discard_if_broken(result)
    }

    /// Insert one row into `table`, creating the table first if needed.
    /// Returns the generated id.
    pub async fn insert_row(&mut self, table: &Identifier, value: &str) -> Result<i32, DemoError> {
        let result = self.try_insert_row(table, value).await;
        self.discard_if_broken(result)
    }

    /// All rows of `table`, creating the table first if needed. Order is unspecified.
    pub async fn list_rows(&mut self, table: &Identifier) -> Result<Vec<NameRow>, DemoError> {
        let result = self.try_list_rows(table).await;
        self.discard_if_broken(result)
    }

    pub async fn server_version(&mut self) -> Result<String, DemoError> {
        let result = self.try_server_version().await;
        self.discard_if_broken(result)
    }

    /// Close the live connection, if any. The next operation reconnects.
    pub async fn close(&mut self) {
        if let Some(session) = self.session.take() {
            Self::close_session(session).await;
        }
    }

    async fn close_session(session: Session) {
        let Session { database, conn } = session;
        match conn.close().await {
            Ok(()) => info!(%database, "connection closed"),
            Err(e) => warn!(%database, error = %e, "failed to close connection cleanly"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable() -> DataBase {
        let target = ConnectTarget {
            host: "127.0.0.1".to_string(),
            port: 1,
            user: "postgres".to_string(),
            password: "unused".to_string(),
        };
        DataBase::new(target, Identifier::new("names_db").unwrap())
    }

    #[test]
    fn starts_disconnected() {
        let db = unreachable();
        assert!(!db.is_connected());
        assert_eq!(db.database().as_str(), "names_db");
    }

    #[tokio::test]
    async fn failed_connect_leaves_no_session() {
        let mut db = unreachable();
        let err = db.server_version().await.unwrap_err();
        assert!(matches!(err, DemoError::Connection(_)));
        assert!(!db.is_connected());
    }
}
