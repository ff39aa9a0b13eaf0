use std::path::PathBuf;

use orca_shader::{ShaderTarget, TranspileError};
use thiserror::Error;

use crate::renderer::{FrameState, RenderBackend};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid renderer state: cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: FrameState,
    },
    #[error("window handle is null")]
    NullWindow,
    #[error("{backend} renderer cannot draw a {found} program (expected {expected})")]
    TargetMismatch {
        backend: RenderBackend,
        expected: ShaderTarget,
        found: ShaderTarget,
    },
    #[error("mesh index {index} is out of range for {vertices} vertices")]
    IndexOutOfRange { index: u32, vertices: usize },
    #[error("failed to transpile {}: {message}", .path.display())]
    Transpile { path: PathBuf, message: String },
    #[error("shader reflection failed: {0}")]
    Reflection(#[from] TranspileError),
    #[error("no shader cache directory is configured")]
    CacheDisabled,
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RenderError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
