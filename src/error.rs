//! Error types shared by the core transforms.

/// Errors raised by the table transforms.
///
/// Every variant is fatal to the single requested operation: the input table is
/// never touched, so the caller can correct its inputs and re-invoke.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// One or more required columns are missing
    #[error("{context}: missing required column(s): {}", .columns.join(", "))]
    MissingColumns {
        /// Operation that performed the check
        context: String,
        /// Every missing column name, in the order they were required
        columns: Vec<String>,
    },

    /// Columns exist but cannot be classified for the requested operation
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Input holds no rows
    #[error("Empty data: {0}")]
    EmptyData(String),

    /// A header name appears more than once
    #[error("Duplicate column header: {0}")]
    DuplicateHeader(String),

    /// A parameter is outside its valid range
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl CoreError {
    /// Build a [`CoreError::MissingColumns`] from any list of names.
    pub fn missing_columns<I, S>(context: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::MissingColumns {
            context: context.into(),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
