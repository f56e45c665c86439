//! Route identifiers of the geocoding service
//!
//! Routes are a closed set so that every route has a projector and a
//! collection shape decided at compile time.

use std::fmt;

/// A fixture route key, e.g. `/search`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    /// `/search`: GeoJSON feature collection
    Search,
    /// `/reverse`: GeoJSON feature collection
    Reverse,
    /// `/completion`: `{status, results}`
    Completion,
    /// `/`: bare object, wrapped as a single record
    Root,
    /// Any other route, results read from `results`
    Other(String),
}

/// Where the item list lives in a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    /// Under a top-level key
    Key(&'static str),
    /// The whole body is one item
    Whole,
}

impl Route {
    /// Parse a fixture route key. Unknown keys become [`Route::Other`].
    #[must_use]
    pub fn parse(key: &str) -> Self {
        match key {
            "/search" => Self::Search,
            "/reverse" => Self::Reverse,
            "/completion" => Self::Completion,
            "/" => Self::Root,
            other => Self::Other(other.to_string()),
        }
    }

    /// Path segment appended to the base URL.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Search => "/search",
            Self::Reverse => "/reverse",
            Self::Completion => "/completion",
            Self::Root => "/",
            Self::Other(path) => path,
        }
    }

    #[must_use]
    pub const fn collection(&self) -> Collection {
        match self {
            Self::Search | Self::Reverse => Collection::Key("features"),
            Self::Completion | Self::Other(_) => Collection::Key("results"),
            Self::Root => Collection::Whole,
        }
    }

    /// Field compared by the `firstResult` predicate, if the route has one.
    #[must_use]
    pub const fn identity_field(&self) -> Option<&'static str> {
        match self {
            Self::Search | Self::Reverse => Some("id"),
            Self::Completion => Some("fulltext"),
            Self::Root | Self::Other(_) => None,
        }
    }

    /// Full request URL: `<base_url><route><request>`.
    #[must_use]
    pub fn url(&self, base_url: &str, request: &str) -> String {
        format!("{base_url}{}{request}", self.path())
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}
