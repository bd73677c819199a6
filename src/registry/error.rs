//! Registry error types

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No connected client has this id
    NotFound(String),
    /// A client with this id is already connected.
    ///
    /// Candidate ids come from the microsecond clock, so a collision
    /// means id generation broke. Callers must treat this as fatal, not
    /// retry with a fresh id.
    DuplicateId(String),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::NotFound(id) => write!(f, "Client not found: {}", id),
            RegistryError::DuplicateId(id) => {
                write!(f, "Client id already connected: {}", id)
            }
        }
    }
}

impl std::error::Error for RegistryError {}
