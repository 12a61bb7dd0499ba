use std::path::PathBuf;
use std::time::SystemTime;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PathError {
    #[error("Empty path")]
    Empty,

    #[error("Empty include literal in {}", .includer.display())]
    EmptyInclude { includer: PathBuf },

    #[error("Cannot determine working directory: {0}")]
    WorkingDirectory(#[source] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error(
        "Maximum include depth {max_depth} exceeded, shader files might have circular includes: {}",
        format_chain(.chain)
    )]
    DepthExceeded { max_depth: u32, chain: Vec<PathBuf> },

    #[error("Circular include: {}", format_chain(.chain))]
    CircularInclude { chain: Vec<PathBuf> },
}

impl ScanError {
    /// The include chain from the requested shader to the offending file
    pub fn chain(&self) -> &[PathBuf] {
        match self {
            ScanError::DepthExceeded { chain, .. } | ScanError::CircularInclude { chain } => chain,
        }
    }
}

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("Path error: {0}")]
    Path(#[from] PathError),

    #[error("IO error on {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Dependency scan failed: {0}")]
    DependencyScan(#[from] ScanError),

    #[error("Compilation failed: {}", .path.display())]
    Compile { path: PathBuf, failed_at: SystemTime },

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ShaderError>;

fn format_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}
