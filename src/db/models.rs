use sqlx::FromRow;

/// One row of a names table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct NameRow {
    pub id: i32,
    pub data: String,
}

/// Outcome of an idempotent ensure-operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioned {
    Created,
    AlreadyExists,
}

impl Provisioned {
    pub fn created(self) -> bool {
        matches!(self, Provisioned::Created)
    }
}
