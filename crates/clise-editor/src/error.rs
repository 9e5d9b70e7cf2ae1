use clise_core::{EditError, ExportError, ImportError};
use thiserror::Error;

/// Failures surfaced by the canvas engine to its host.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Edit(#[from] EditError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("invalid editor config: {0}")]
    Config(serde_json::Error),

    /// Text editing or tool switches are refused mid-gesture.
    #[error("not available while {0}")]
    Busy(&'static str),
}
