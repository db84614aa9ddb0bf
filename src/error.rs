use crate::command::ExitCode;
use crate::external::ExternalError;
use crate::parser::ParsingError;
use thiserror::Error;

/// Everything that can go wrong while processing one script line.
///
/// All variants except [`ExecError::Io`] are recoverable: the runner reports
/// them and moves on to the next line.
#[derive(Debug, Error)]
pub enum ExecError {
    /// Malformed integer or malformed statement.
    #[error(transparent)]
    Parse(#[from] ParsingError),

    #[error("Unsupported language for external code execution: {0}")]
    UnsupportedRuntime(String),

    #[error("Unsupported language for import: {0}")]
    UnsupportedImport(String),

    #[error("Error executing code in {language} (exit status {code})")]
    RunFailed { language: String, code: ExitCode },

    #[error("Error executing code in {language}: {source}")]
    RunError {
        language: String,
        #[source]
        source: ExternalError,
    },

    #[error("Error installing library {module} for {language} (exit status {code})")]
    InstallFailed {
        module: String,
        language: String,
        code: ExitCode,
    },

    #[error("Error installing library {module} for {language}: {source}")]
    InstallError {
        module: String,
        language: String,
        #[source]
        source: ExternalError,
    },

    /// Writing to the output or error stream failed. Aborts the run.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
