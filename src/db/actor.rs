use crate::db::identifier::Identifier;
use crate::db::models::{NameRow, Provisioned};
use crate::db::postgres::DataBase;
use crate::error::DemoError;

use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use tracing::{debug, info, warn};

/// Messages handled by the database actor. Each one maps to a single
/// `DataBase` operation and carries the reply port for its result.
#[derive(Debug)]
pub enum DbActorMessage {
    EnsureDatabase(Identifier, RpcReplyPort<Result<Provisioned, DemoError>>),
    DropDatabase(Identifier, RpcReplyPort<Result<bool, DemoError>>),
    EnsureTable(Identifier, RpcReplyPort<Result<Provisioned, DemoError>>),
    DropTable(Identifier, RpcReplyPort<Result<(), DemoError>>),
    InsertRow(Identifier, String, RpcReplyPort<Result<i32, DemoError>>),
    ListRows(Identifier, RpcReplyPort<Result<Vec<NameRow>, DemoError>>),
    ServerVersion(RpcReplyPort<Result<String, DemoError>>),
}

/// Handle for interacting with the database actor.
///
/// The actor owns the only connection and handles one message at a time, so
/// concurrent requests are serialized instead of sharing connection state.
#[derive(Clone)]
pub struct DbActorHandle {
    actor: ActorRef<DbActorMessage>,
}

impl DbActorHandle {
    pub async fn ensure_database(&self, name: &Identifier) -> Result<Provisioned, DemoError> {
        ractor::call!(self.actor, DbActorMessage::EnsureDatabase, name.clone())
            .map_err(|e| DemoError::RactorError(format!("EnsureDatabase RPC failed: {e}")))?
    }

    pub async fn drop_database(&self, name: &Identifier) -> Result<bool, DemoError> {
        ractor::call!(self.actor, DbActorMessage::DropDatabase, name.clone())
            .map_err(|e| DemoError::RactorError(format!("DropDatabase RPC failed: {e}")))?
    }

    pub async fn ensure_table(&self, table: &Identifier) -> Result<Provisioned, DemoError> {
        ractor::call!(self.actor, DbActorMessage::EnsureTable, table.clone())
            .map_err(|e| DemoError::RactorError(format!("EnsureTable RPC failed: {e}")))?
    }

    pub async fn drop_table(&self, table: &Identifier) -> Result<(), DemoError> {
        ractor::call!(self.actor, DbActorMessage::DropTable, table.clone())
            .map_err(|e| DemoError::RactorError(format!("DropTable RPC failed: {e}")))?
    }

    pub async fn insert_row(
        &self,
        table: &Identifier,
        value: impl Into<String>,
    ) -> Result<i32, DemoError> {
        ractor::call!(
            self.actor,
            DbActorMessage::InsertRow,
            table.clone(),
            value.into()
        )
        .map_err(|e| DemoError::RactorError(format!("InsertRow RPC failed: {e}")))?
    }

    pub async fn list_rows(&self, table: &Identifier) -> Result<Vec<NameRow>, DemoError> {
        ractor::call!(self.actor, DbActorMessage::ListRows, table.clone())
            .map_err(|e| DemoError::RactorError(format!("ListRows RPC failed: {e}")))?
    }

    pub async fn server_version(&self) -> Result<String, DemoError> {
        ractor::call!(self.actor, DbActorMessage::ServerVersion)
            .map_err(|e| DemoError::RactorError(format!("ServerVersion RPC failed: {e}")))?
    }

    /// Stop the actor and wait until its connection has been released.
    pub async fn shutdown(&self) {
        if let Err(e) = self
            .actor
            .stop_and_wait(Some("shutdown".to_string()), None)
            .await
        {
            warn!(error = %e, "database actor did not stop cleanly");
        }
    }
}

/// ractor-based database actor; its state is the lifecycle manager itself.
struct DbActor;

#[ractor::async_trait]
impl Actor for DbActor {
    type Msg = DbActorMessage;
    type State = DataBase;
    type Arguments = DataBase;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        db: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        info!(database = %db.database(), "DbActor started; connecting lazily");
        Ok(db)
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        db: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        db.close().await;
        info!("DbActor stopped");
        Ok(())
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        db: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            DbActorMessage::EnsureDatabase(name, rp) => {
                let _ = rp.send(db.ensure_database(&name).await);
            }
            DbActorMessage::DropDatabase(name, rp) => {
                let _ = rp.send(db.drop_database(&name).await);
            }
            DbActorMessage::EnsureTable(table, rp) => {
                let _ = rp.send(db.ensure_table(&table).await);
            }
            DbActorMessage::DropTable(table, rp) => {
                let _ = rp.send(db.drop_table(&table).await);
            }
            DbActorMessage::InsertRow(table, value, rp) => {
                let _ = rp.send(db.insert_row(&table, &value).await);
            }
            DbActorMessage::ListRows(table, rp) => {
                let result = db.list_rows(&table).await;
                if let Ok(rows) = &result {
                    debug!(%table, count = rows.len(), "rows listed");
                }
                let _ = rp.send(result);
            }
            DbActorMessage::ServerVersion(rp) => {
                let _ = rp.send(db.server_version().await);
            }
        }
        Ok(())
    }
}

/// Spawn the database actor around `db` and return a handle.
pub async fn spawn(db: DataBase) -> Result<DbActorHandle, DemoError> {
    let (actor, _jh) = Actor::spawn(None, DbActor, db)
        .await
        .map_err(|e| DemoError::RactorError(format!("failed to spawn DbActor: {e}")))?;
    Ok(DbActorHandle { actor })
}
