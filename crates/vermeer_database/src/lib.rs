//! Prompt ledger and database layer for Vermeer.
//!
//! Diesel-backed storage for the prompts table: row models, connection
//! helpers, embedded migrations, and the [`PromptLedger`] access layer.

mod connection;
mod ledger;
mod models;
pub mod schema;

pub use connection::{PgPool, create_pool, establish_connection};
pub use ledger::{PromptLedger, PromptStats};
pub use models::{NewPromptRow, PromptRow, PromptRowBuilder};

use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use vermeer_error::{LedgerError, LedgerErrorKind};

/// Result type for ledger operations.
pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

/// Migrations compiled into the binary.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

/// Run any pending migrations against the given connection.
///
/// # Errors
///
/// Returns an error if a migration fails to apply.
pub fn run_migrations(conn: &mut diesel::pg::PgConnection) -> LedgerResult<()> {
    conn.run_pending_migrations(MIGRATIONS)
        .map(|applied| {
            if !applied.is_empty() {
                tracing::info!(count = applied.len(), "Applied pending migrations");
            }
        })
        .map_err(|e| LedgerError::new(LedgerErrorKind::Query(format!("Migration failed: {}", e))))
}
