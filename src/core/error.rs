use std::path::PathBuf;

#[derive(Debug)]
pub enum RepackError {
    /// The input package was not found and none was picked interactively.
    MissingInput(String),
    /// An expected XML element or attribute is absent.
    StructureNotFound { path: PathBuf, what: String },
    /// A child process could not be spawned or exited unsuccessfully.
    ExternalToolFailure { tool: String, status: String },
    Io { path: PathBuf, source: std::io::Error },
}

impl RepackError {
    pub fn structure_not_found(path: impl Into<PathBuf>, what: impl Into<String>) -> Self {
        Self::StructureNotFound {
            path: path.into(),
            what: what.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl std::fmt::Display for RepackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepackError::MissingInput(msg) => write!(f, "Missing input: {}", msg),
            RepackError::StructureNotFound { path, what } => {
                write!(f, "{} not found in `{}`", what, path.display())
            }
            RepackError::ExternalToolFailure { tool, status } => {
                write!(f, "`{}` failed: {}", tool, status)
            }
            RepackError::Io { path, .. } => write!(f, "I/O error on `{}`", path.display()),
        }
    }
}

impl std::error::Error for RepackError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RepackError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}
