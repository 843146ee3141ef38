//! Share-link codec.
//!
//! A share token is the percent-encoded entry identifier (or, for legacy
//! links, the display name). Tokens are not stored anywhere; the receiving
//! side decodes them with its ordinary query-string parser.

use serde::Serialize;
use std::borrow::Cow;
use voxlink_common::{CatalogEntry, Error, Result};

/// Query parameter carrying an identifier token.
pub const ID_PARAM: &str = "id";
/// Legacy query parameter carrying a name token.
pub const NAME_PARAM: &str = "n";

/// Percent-encode an identifier or name. Every byte outside the unreserved set
/// is escaped, so non-ASCII names survive any URL-handling client.
pub fn encode(value: &str) -> Cow<'_, str> {
    urlencoding::encode(value)
}

/// Inverse of [`encode`].
pub fn decode(token: &str) -> Result<String> {
    urlencoding::decode(token)
        .map(Cow::into_owned)
        .map_err(|e| Error::invalid_input(format!("share token is not valid UTF-8: {e}")))
}

/// Links handed to an operator for one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareLinks {
    /// `{base}?id={token}`
    pub url: String,
    /// `{base}?n={token-of-name}`
    pub legacy_url: String,
}

/// Builds share links on a fixed public base URL.
#[derive(Debug, Clone)]
pub struct ShareLinkBuilder {
    base_url: String,
}

impl ShareLinkBuilder {
    /// `base_url` may already carry a query string; the parameter is appended
    /// with the matching connector.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    fn with_param(&self, param: &str, value: &str) -> String {
        let base = self.base_url.trim_end_matches(['?', '&']);
        let connector = if base.contains('?') { '&' } else { '?' };
        format!("{base}{connector}{param}={}", encode(value))
    }

    pub fn by_id(&self, id: &str) -> String {
        self.with_param(ID_PARAM, id)
    }

    pub fn by_name(&self, name: &str) -> String {
        self.with_param(NAME_PARAM, name)
    }

    pub fn for_entry(&self, entry: &CatalogEntry) -> ShareLinks {
        ShareLinks {
            url: self.by_id(entry.id.as_str()),
            legacy_url: self.by_name(&entry.name),
        }
    }
}
