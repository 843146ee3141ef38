//! Link variant derivation.
//!
//! Every catalog entry carries one raw storage link. The storage provider
//! serves the same resource differently depending on a `download=1` query
//! marker: with it the raw bytes come back (what an inline player needs),
//! without it the provider's HTML viewer page is shown (what a phone should
//! open directly). All functions here are pure and never fail; a malformed
//! link yields an empty string, which callers treat as "unavailable".
//!
//! # Variants
//!
//! - [`clean`] / `Source`: the link with every download marker removed
//! - [`player`] / `Player`: the clean link plus exactly one download marker
//! - [`mobile`] / `Mobile`: the clean link, opened externally

pub mod provider;

pub use provider::{direct_download_url, Provider};

use serde::Serialize;
use voxlink_common::{CatalogEntry, LinkVariant};

/// Query parameter that makes the provider serve raw bytes.
pub const DOWNLOAD_MARKER: &str = "download=1";

/// A link split into base, query parameters, and fragment.
#[derive(Debug, Clone)]
pub(crate) struct QueryLink<'a> {
    base: &'a str,
    params: Vec<&'a str>,
    fragment: Option<&'a str>,
}

impl<'a> QueryLink<'a> {
    /// Split a link that has already been validated.
    pub(crate) fn split(link: &'a str) -> Self {
        let (rest, fragment) = match link.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment)),
            None => (link, None),
        };
        let (base, params) = match rest.split_once('?') {
            Some((base, query)) => (base, query.split('&').filter(|p| !p.is_empty()).collect()),
            None => (rest, Vec::new()),
        };
        Self {
            base,
            params,
            fragment,
        }
    }

    /// Drop every parameter matching `predicate`.
    pub(crate) fn without(mut self, predicate: impl Fn(&str) -> bool) -> Self {
        self.params.retain(|p| !predicate(p));
        self
    }

    /// Append a parameter after the existing ones.
    pub(crate) fn with(mut self, param: &'a str) -> Self {
        self.params.push(param);
        self
    }

    pub(crate) fn base(&self) -> &'a str {
        self.base
    }

    pub(crate) fn params(&self) -> &[&'a str] {
        &self.params
    }

    pub(crate) fn render(&self) -> String {
        let mut out = String::with_capacity(self.base.len() + 32);
        out.push_str(self.base);
        for (i, param) in self.params.iter().enumerate() {
            out.push(if i == 0 { '?' } else { '&' });
            out.push_str(param);
        }
        if let Some(fragment) = self.fragment {
            out.push('#');
            out.push_str(fragment);
        }
        out
    }
}

/// Trim a raw link and reject anything that is not an absolute http(s) URL.
pub(crate) fn validated(raw: &str) -> Option<&str> {
    let link = raw.trim();
    if link.is_empty() || link.chars().any(char::is_whitespace) {
        return None;
    }
    let url = reqwest::Url::parse(link).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(link)
}

/// Remove any download-forcing marker. Idempotent.
pub fn clean(raw: &str) -> String {
    match validated(raw) {
        Some(link) => QueryLink::split(link)
            .without(|p| p == DOWNLOAD_MARKER)
            .render(),
        None => String::new(),
    }
}

/// Clean link plus exactly one download marker, joined with `?` or `&`
/// depending on whether a query string remains.
pub fn player(raw: &str) -> String {
    match validated(raw) {
        Some(link) => QueryLink::split(link)
            .without(|p| p == DOWNLOAD_MARKER)
            .with(DOWNLOAD_MARKER)
            .render(),
        None => String::new(),
    }
}

/// Link for contexts where the client opens the provider page itself.
pub fn mobile(raw: &str) -> String {
    clean(raw)
}

/// Apply one variant to a raw link.
pub fn derive(raw: &str, variant: LinkVariant) -> String {
    match variant {
        LinkVariant::Source => clean(raw),
        LinkVariant::Player => player(raw),
        LinkVariant::Mobile => mobile(raw),
    }
}

/// All three variants of one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkSet {
    pub source: String,
    pub player: String,
    pub mobile: String,
}

impl LinkSet {
    pub fn for_entry(entry: &CatalogEntry) -> Self {
        Self {
            source: derive(entry.raw_link_for(LinkVariant::Source), LinkVariant::Source),
            player: derive(entry.raw_link_for(LinkVariant::Player), LinkVariant::Player),
            mobile: derive(entry.raw_link_for(LinkVariant::Mobile), LinkVariant::Mobile),
        }
    }

    pub fn get(&self, variant: LinkVariant) -> &str {
        match variant {
            LinkVariant::Source => &self.source,
            LinkVariant::Player => &self.player,
            LinkVariant::Mobile => &self.mobile,
        }
    }
}
