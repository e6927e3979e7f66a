//! Database connection utilities.

use crate::LedgerResult;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use tracing::instrument;
use vermeer_error::{LedgerError, LedgerErrorKind};

/// Connection pool for the prompts database.
pub type PgPool = Pool<ConnectionManager<PgConnection>>;

/// Establish a connection to the PostgreSQL database.
///
/// Reads the `DATABASE_URL` environment variable to determine the connection string.
///
/// # Errors
///
/// Returns an error if:
/// - `DATABASE_URL` environment variable is not set
/// - Connection to the database fails
#[instrument(name = "database.establish_connection")]
pub fn establish_connection() -> LedgerResult<PgConnection> {
    let database_url = database_url()?;
    tracing::debug!("Connecting to PostgreSQL database");
    PgConnection::establish(&database_url).map_err(|e| {
        tracing::error!(error = %e, "Failed to establish database connection");
        LedgerError::new(LedgerErrorKind::Connection(e.to_string()))
    })
}

/// Create a connection pool for the PostgreSQL database.
///
/// Reads the `DATABASE_URL` environment variable to determine the connection string.
///
/// # Errors
///
/// Returns an error if:
/// - `DATABASE_URL` environment variable is not set
/// - Pool creation fails
#[instrument(name = "database.create_pool")]
pub fn create_pool() -> LedgerResult<PgPool> {
    let database_url = database_url()?;
    tracing::debug!("Creating PostgreSQL connection pool");
    let manager = ConnectionManager::<PgConnection>::new(database_url);

    Pool::builder().max_size(10).build(manager).map_err(|e| {
        tracing::error!(error = %e, "Failed to create connection pool");
        LedgerError::new(LedgerErrorKind::Connection(e.to_string()))
    })
}

fn database_url() -> LedgerResult<String> {
    std::env::var("DATABASE_URL").map_err(|_| {
        tracing::error!("DATABASE_URL environment variable not set");
        LedgerError::new(LedgerErrorKind::Connection(
            "DATABASE_URL environment variable not set".to_string(),
        ))
    })
}
