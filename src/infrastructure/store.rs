use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use uuid::Uuid;

use crate::db::{DbConnection, DbPool};
use crate::domain::errors::DomainError;
use crate::domain::ports::UserDirectory;
use crate::domain::user::UserProfile;
use crate::schema::users;

use super::models::UserRow;

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<DieselError> for DomainError {
    fn from(e: DieselError) -> Self {
        match e {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                DomainError::Conflict(info.message().to_string())
            }
            other => DomainError::Internal(other.to_string()),
        }
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

// ── Store ────────────────────────────────────────────────────────────────────

/// Postgres-backed implementation of every persistence port.
///
/// Each port method checks out one pooled connection; multi-step writes run
/// inside `conn.transaction`.
#[derive(Clone)]
pub struct DieselStore {
    pool: DbPool,
}

impl DieselStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub(crate) fn conn(&self) -> Result<DbConnection, DomainError> {
        Ok(self.pool.get()?)
    }
}

impl UserDirectory for DieselStore {
    fn find_user(&self, user_id: Uuid) -> Result<Option<UserProfile>, DomainError> {
        let mut conn = self.conn()?;
        let row = users::table
            .filter(users::id.eq(user_id))
            .select(UserRow::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(row.map(|u| UserProfile {
            id: u.id,
            is_admin: u.role.eq_ignore_ascii_case("ADMIN"),
            full_name: u.full_name,
            email: u.email,
        }))
    }
}
