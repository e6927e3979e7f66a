//! Prompt ledger error types.

/// Ledger error conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LedgerErrorKind {
    /// Connection or pool checkout failed
    Connection(String),
    /// Query execution failed
    Query(String),
    /// Insert collided with an existing prompt hash
    DuplicateHash(String),
    /// Record not found
    NotFound,
    /// Thumbnail rendering failed
    Thumbnail(String),
}

impl std::fmt::Display for LedgerErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerErrorKind::Connection(msg) => write!(f, "Ledger connection error: {}", msg),
            LedgerErrorKind::Query(msg) => write!(f, "Ledger query error: {}", msg),
            LedgerErrorKind::DuplicateHash(hash) => {
                write!(f, "Prompt with hash '{}' already exists", hash)
            }
            LedgerErrorKind::NotFound => write!(f, "Prompt not found"),
            LedgerErrorKind::Thumbnail(msg) => write!(f, "Thumbnail error: {}", msg),
        }
    }
}

/// Ledger error with source location tracking.
///
/// # Examples
///
/// ```
/// use vermeer_error::{LedgerError, LedgerErrorKind};
///
/// let err = LedgerError::new(LedgerErrorKind::NotFound);
/// assert!(format!("{}", err).contains("not found"));
/// ```
#[derive(Debug, Clone)]
pub struct LedgerError {
    /// The kind of error that occurred
    pub kind: LedgerErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl LedgerError {
    /// Create a new LedgerError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: LedgerErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

impl std::fmt::Display for LedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Ledger Error: {} at line {} in {}",
            self.kind, self.line, self.file
        )
    }
}

impl std::error::Error for LedgerError {}

// Diesel error conversions (only available with database feature)
#[cfg(feature = "database")]
impl From<diesel::result::Error> for LedgerError {
    fn from(err: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error};
        match err {
            Error::NotFound => LedgerError::new(LedgerErrorKind::NotFound),
            Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                LedgerError::new(LedgerErrorKind::DuplicateHash(info.message().to_string()))
            }
            _ => LedgerError::new(LedgerErrorKind::Query(err.to_string())),
        }
    }
}

#[cfg(feature = "database")]
impl From<diesel::r2d2::PoolError> for LedgerError {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        LedgerError::new(LedgerErrorKind::Connection(err.to_string()))
    }
}

#[cfg(feature = "database")]
impl From<diesel::ConnectionError> for LedgerError {
    fn from(err: diesel::ConnectionError) -> Self {
        LedgerError::new(LedgerErrorKind::Connection(err.to_string()))
    }
}
