use std::path::PathBuf;

use crate::backend::DeviceError;
use crate::pass_source::SemanticError;
use crate::pipelines::CompileError;
use crate::preprocess::PreprocessError;
use crate::syntax::ParseError;
use crate::validate::ValidationError;

/// Any failure of a frame graph rebuild
///
/// Every variant aborts the rebuild in progress; a previously built frame graph
/// stays valid. Device failures are additionally flagged as unrecoverable by
/// [`FrameGraphError::is_unrecoverable`].
#[derive(Debug, thiserror::Error)]
pub enum FrameGraphError {
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings: {0}")]
    Settings(#[from] serde_norway::Error),
    #[error("no frame graph file (*.{ext}) in '{}'", .dir.display())]
    MissingFrameGraphFile { dir: PathBuf, ext: String },
    #[error("more than one frame graph file in '{}': {files:?}", .dir.display())]
    MultipleFrameGraphFiles { dir: PathBuf, files: Vec<String> },
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),
    #[error("{file}: {source}")]
    Parse {
        file: String,
        #[source]
        source: ParseError,
    },
    #[error("pass '{pass}': {source}")]
    Semantic {
        pass: String,
        #[source]
        source: SemanticError,
    },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("pass '{pass}': {source}")]
    Compile {
        pass: String,
        #[source]
        source: CompileError,
    },
    #[error("pass '{pass}': {source}")]
    Device {
        pass: String,
        #[source]
        source: DeviceError,
    },
    #[error("frame graph references unknown pass '{0}'")]
    UnknownPass(String),
}

impl FrameGraphError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    /// Returns true for failures an in-process retry cannot fix (backend object creation)
    pub fn is_unrecoverable(&self) -> bool {
        matches!(self, Self::Device { .. })
    }
}
