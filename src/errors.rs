use std::io;

#[derive(Debug)]
pub enum CacheError {
    UseAfterClear,
    Entropy(String),
    Io(io::Error),
    InvalidPath(String),
    Exists(String),
    NotFound(String),
    TornRead(String),
}

impl From<io::Error> for CacheError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<getrandom::Error> for CacheError {
    fn from(err: getrandom::Error) -> Self {
        Self::Entropy(err.to_string())
    }
}

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UseAfterClear => write!(f, "Buffer accessed after it was cleared"),
            Self::Entropy(msg) => write!(f, "Entropy source failure: {}", msg),
            Self::Io(e) => write!(f, "IO error: {}", e),
            Self::InvalidPath(msg) => write!(f, "Invalid path: {}", msg),
            Self::Exists(msg) => write!(f, "Entry exists: {}", msg),
            Self::NotFound(msg) => write!(f, "Entry not found: {}", msg),
            Self::TornRead(msg) => write!(f, "Torn read: {}", msg),
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}
