use std::io;
use std::path::PathBuf;

use super::catalog::ResourceId;

#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("GPU device does not support any of the provided shader formats (DXIL, MSL, SPIR-V)")]
    NoSupportedFormat,
    #[error("resource {0} cannot be reloaded before the initial load")]
    NotLoaded(ResourceId),
    #[error("failed to stat {}: {source}", .path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{} is empty", .path.display())]
    Empty { path: PathBuf },
    #[error("{} is not valid UTF-8 shader source", .path.display())]
    InvalidSource { path: PathBuf },
    #[error("no shader compiler available to build {}", .path.display())]
    CompilerUnavailable { path: PathBuf },
    #[error("failed to compile {}:\n{message}", .path.display())]
    Compile { path: PathBuf, message: String },
    #[error("GPU device rejected {resource}: {message}")]
    CreateShader {
        resource: ResourceId,
        message: String,
    },
}
