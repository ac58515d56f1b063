use thiserror::Error;

/// Failure classes of a sync run. Everything is surfaced through
/// `anyhow::Error`; callers that need to branch on the class (the retry
/// wrapper, the top-level run loop) downcast to this enum.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The report file could not be opened or is not a spreadsheet.
    #[error("failed to parse report: {0}")]
    Parse(String),

    /// A canonical output column is missing after normalization.
    #[error("required column {0:?} missing from report")]
    SchemaMismatch(String),

    /// A required environment variable is absent or unparseable.
    #[error("missing configuration: {0}")]
    ConfigMissing(&'static str),

    /// The remote spreadsheet or worksheet could not be opened.
    #[error("cannot access spreadsheet: {0}")]
    RemoteAccess(String),

    /// A server-side error the Sheets API is expected to recover from.
    #[error("transient remote error (HTTP {status})")]
    Transient { status: u16 },

    /// All retry attempts were spent on transient errors.
    #[error("max retries reached after {attempts} attempts")]
    RetryExhausted { attempts: usize },
}
