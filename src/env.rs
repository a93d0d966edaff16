use crate::{PaginationError, Result};
use ::std::borrow::Cow;
use ::std::str::FromStr;

pub const DEFAULT_PAGE_SIZE: usize = 100;
pub const DEFAULT_MAX_PAGE_SIZE: usize = 1000;
pub const DEFAULT_OFFSET_CUTOFF: usize = 1000;
pub const DEFAULT_CURSOR_QUERY_PARAM: &str = "cursor";

/// Settings for a paginated collection, threaded explicitly into every call.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Page size used when the caller does not ask for one.
    pub page_size: usize,
    pub max_page_size: usize,
    /// Express cursor predicates as a single row comparison.
    pub use_tuple_comparison: bool,
    /// With tuple comparison on, degrade to chained comparison for orderings
    /// that mix directions instead of failing.
    pub tuple_comparison_fallback: bool,
    /// Name of the query parameter carrying the cursor token. Only read by
    /// request bindings.
    pub cursor_query_param: String,
    /// Largest offset a decoded cursor may carry.
    pub offset_cutoff: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            use_tuple_comparison: false,
            tuple_comparison_fallback: false,
            cursor_query_param: DEFAULT_CURSOR_QUERY_PARAM.to_owned(),
            offset_cutoff: DEFAULT_OFFSET_CUTOFF,
        }
    }
}

impl PaginationConfig {
    /// Reads overrides from `PAGINATION_PAGE_SIZE`, `PAGINATION_MAX_PAGE_SIZE`,
    /// `PAGINATION_USE_TUPLE_COMPARISON`, `PAGINATION_TUPLE_COMPARISON_FALLBACK`,
    /// `PAGINATION_CURSOR_QUERY_PARAM` and `PAGINATION_OFFSET_CUTOFF`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(value) = parse_var(&lookup, "PAGINATION_PAGE_SIZE")? {
            config.page_size = value;
        }
        if let Some(value) = parse_var(&lookup, "PAGINATION_MAX_PAGE_SIZE")? {
            config.max_page_size = value;
        }
        if let Some(value) = parse_var(&lookup, "PAGINATION_USE_TUPLE_COMPARISON")? {
            config.use_tuple_comparison = value;
        }
        if let Some(value) = parse_var(&lookup, "PAGINATION_TUPLE_COMPARISON_FALLBACK")? {
            config.tuple_comparison_fallback = value;
        }
        if let Some(value) = lookup("PAGINATION_CURSOR_QUERY_PARAM") {
            config.cursor_query_param = value;
        }
        if let Some(value) = parse_var(&lookup, "PAGINATION_OFFSET_CUTOFF")? {
            config.offset_cutoff = value;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let problem: Option<Cow<'static, str>> = if self.page_size == 0 {
            Some("page_size must be positive".into())
        } else if self.max_page_size == 0 {
            Some("max_page_size must be positive".into())
        } else if self.page_size > self.max_page_size {
            Some(format!("page_size {} exceeds max_page_size {}", self.page_size, self.max_page_size).into())
        } else if self.cursor_query_param.is_empty() {
            Some("cursor_query_param cannot be empty".into())
        } else {
            None
        };
        match problem {
            None => Ok(()),
            Some(problem) => Err(PaginationError::Config(problem)),
        }
    }

    /// The default page size when `requested` is `None`; otherwise `requested`
    /// when it lies within `1..=max_page_size`.
    pub fn resolve_page_size(&self, requested: Option<usize>) -> Result<usize> {
        match requested {
            None => Ok(self.page_size),
            Some(size) if size > 0 && size <= self.max_page_size => Ok(size),
            Some(size) => Err(self.invalid_page_size(size.to_string())),
        }
    }

    /// Parses a page size as sent by a client, e.g. in a query string.
    pub fn parse_page_size(&self, requested: &str) -> Result<usize> {
        let size = requested
            .trim()
            .parse::<usize>()
            .map_err(|_| self.invalid_page_size(requested.to_owned()))?;
        self.resolve_page_size(Some(size))
    }

    fn invalid_page_size(&self, requested: String) -> PaginationError {
        PaginationError::InvalidPageSize {
            requested,
            max: self.max_page_size,
        }
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<T>> {
    lookup(key)
        .map(|value| {
            value
                .trim()
                .parse::<T>()
                .map_err(|_| PaginationError::Config(format!("{key} has an invalid value `{value}`").into()))
        })
        .transpose()
}
