use ::std::borrow::Cow;

/// Type-erased error returned by a [`DataSource`](crate::DataSource).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T, E = PaginationError> = std::result::Result<T, E>;

/// Every way a pagination request can fail.
///
/// Nothing here is corrected silently: a bad page size or a tampered cursor is
/// reported to the caller as-is. A cursor that decodes fine but points at a
/// record which no longer exists is not an error.
#[derive(Debug, thiserror::Error)]
#[must_use = "pagination errors should be reported to the caller"]
pub enum PaginationError {
    /// The cursor token could not be decoded, is missing a required field, or
    /// holds a value that cannot be coerced to its field's kind.
    #[error("malformed cursor: {0}")]
    MalformedCursor(Cow<'static, str>),

    #[error("invalid page size `{requested}`, must be between 1 and {max}")]
    InvalidPageSize { requested: String, max: usize },

    /// Tuple comparison was requested for an ordering it cannot express.
    #[error("tuple comparison cannot express ordering `{0}`")]
    IncompatibleOrdering(String),

    #[error("invalid ordering: {0}")]
    InvalidOrdering(Cow<'static, str>),

    #[error("record is missing ordering field `{0}`")]
    MissingField(String),

    #[error("invalid pagination configuration: {0}")]
    Config(Cow<'static, str>),

    /// The external fetch failed; the core never retries it.
    #[error("data source error: {0}")]
    DataSource(#[source] BoxError),
}

impl PaginationError {
    pub(crate) fn malformed(reason: impl Into<Cow<'static, str>>) -> Self {
        Self::MalformedCursor(reason.into())
    }

    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedCursor(_) | Self::InvalidPageSize { .. }
        )
    }
}
