use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

/// Whole-run failures of the template engine. Messages from the underlying
/// libraries are carried through unchanged.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Template not found: {0}")]
    TemplateNotFound(String),
    #[error("No rows to write.")]
    EmptyBudget,
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Workbook(String),
}

impl EngineError {
    pub fn workbook(message: impl Into<String>) -> Self {
        Self::Workbook(message.into())
    }
}

#[derive(Debug, Error)]
pub enum LocatorError {
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("Could not read spreadsheet: {0}")]
    Read(String),
}
