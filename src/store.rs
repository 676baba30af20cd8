use thiserror::Error;

use crate::model::{Challenge, SolveRecord};

#[cfg(feature = "ssr")]
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
#[cfg(feature = "ssr")]
use diesel::SqliteConnection;

#[cfg(feature = "ssr")]
pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

/// A failure inside the store, carried as its message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct StoreError(pub String);

#[cfg(feature = "ssr")]
impl From<diesel::result::Error> for StoreError {
    fn from(e: diesel::result::Error) -> Self {
        StoreError(e.to_string())
    }
}

#[cfg(feature = "ssr")]
impl From<diesel::r2d2::PoolError> for StoreError {
    fn from(e: diesel::r2d2::PoolError) -> Self {
        StoreError(e.to_string())
    }
}

/// Result of trying to write a solve record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveWrite {
    /// The record was written and the points were added to the user's score.
    Recorded,
    /// A solved record for this pair already existed. Nothing changed.
    Conflict,
}

/// The operations flag submission needs from the store.
pub trait SolveStore {
    fn challenge(&self, challenge_id: &str) -> Result<Option<Challenge>, StoreError>;

    fn find_solve(
        &self,
        user_id: &str,
        challenge_id: &str,
    ) -> Result<Option<SolveRecord>, StoreError>;

    /// Writes `solve` and credits its points to the user. Must be atomic with respect to other
    /// writers of the same (user, challenge) pair.
    fn record_solve(&self, solve: &SolveRecord) -> Result<SolveWrite, StoreError>;
}

/// The pooled SQLite store. Provided to server functions as context.
#[cfg(feature = "ssr")]
#[derive(Clone)]
pub struct DbStore {
    pool: DbPool,
}

#[cfg(feature = "ssr")]
impl DbStore {
    pub fn new(pool: DbPool) -> Self {
        DbStore { pool }
    }

    pub fn conn(
        &self,
    ) -> Result<PooledConnection<ConnectionManager<SqliteConnection>>, StoreError> {
        Ok(self.pool.get()?)
    }
}

#[cfg(feature = "ssr")]
impl SolveStore for DbStore {
    fn challenge(&self, challenge_id: &str) -> Result<Option<Challenge>, StoreError> {
        let mut conn = self.conn()?;
        Ok(crate::get_challenge(&mut conn, challenge_id)?)
    }

    fn find_solve(
        &self,
        user_id: &str,
        challenge_id: &str,
    ) -> Result<Option<SolveRecord>, StoreError> {
        let mut conn = self.conn()?;
        Ok(crate::find_solve(&mut conn, user_id, challenge_id)?)
    }

    fn record_solve(&self, solve: &SolveRecord) -> Result<SolveWrite, StoreError> {
        let mut conn = self.conn()?;
        Ok(crate::record_solve(&mut conn, solve)?)
    }
}
