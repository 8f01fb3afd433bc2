pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised by the cf layer.
///
/// Validation failures are reported at the offending call; nothing is
/// retried and a failed call leaves the in-memory state untouched.
/// Engine failures surface through [`Error::Storage`] with their message
/// unchanged.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A referenced name or path does not exist.
    #[error("no {kind} named {name:?}")]
    NotFound { kind: &'static str, name: String },
    /// Two definitions collide: duplicate name or incompatible redefinition.
    #[error("{0}")]
    Conflict(String),
    /// A tile tuple does not match the dimension count.
    #[error("got {got} tile(s) for {dims} dimension(s)")]
    ShapeMismatch { got: usize, dims: usize },
    /// A name resolves to more than one target where exactly one is required.
    #[error("attribute {name:?} exists in multiple arrays ({arrays:?}); array name required")]
    Ambiguous { name: String, arrays: Vec<String> },
    /// An operation was attempted in a state that does not support it.
    #[error("{0}")]
    State(String),
    /// A schema or argument is structurally invalid.
    #[error("{0}")]
    Schema(String),
    /// A value falls outside the domain of its dimension.
    #[error("dimension {dim:?} has {len} value(s) but its domain allows at most {max}")]
    OutOfRange { dim: String, len: u64, max: u64 },
    /// The requested operation is not supported for this variant.
    #[error("{0}")]
    Unsupported(String),
    #[error(transparent)]
    Metadata(#[from] serde_json::Error),
    /// An opaque failure from the storage engine, surfaced unchanged.
    #[error(transparent)]
    Storage(Box<dyn std::error::Error + Send + Sync>),
    #[cfg(feature = "netcdf")]
    #[error(transparent)]
    NetCdf(#[from] netcdf::Error),
}

impl Error {
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn state(message: impl Into<String>) -> Self {
        Self::State(message.into())
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }

    pub fn storage(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Storage(Box::new(error))
    }
}

impl From<zarrs::storage::StorageError> for Error {
    fn from(error: zarrs::storage::StorageError) -> Self {
        Self::storage(error)
    }
}

impl From<zarrs::array::ArrayCreateError> for Error {
    fn from(error: zarrs::array::ArrayCreateError) -> Self {
        Self::storage(error)
    }
}

impl From<zarrs::group::GroupCreateError> for Error {
    fn from(error: zarrs::group::GroupCreateError) -> Self {
        Self::storage(error)
    }
}

impl From<zarrs::node::NodePathError> for Error {
    fn from(error: zarrs::node::NodePathError) -> Self {
        Self::storage(error)
    }
}
