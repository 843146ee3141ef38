//! Core type definitions for catalog entries and link variants.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::EntryId;

/// Placeholder stored in classification fields the catalog leaves empty.
pub const UNCLASSIFIED: &str = "unclassified";

/// One audio sample in the catalog, in canonical shape.
///
/// Built only by the catalog normalizer and never mutated afterwards; a reload
/// replaces the whole list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Stable identifier used in share links.
    pub id: EntryId,
    /// Display name.
    pub name: String,
    /// Raw link as entered in the catalog.
    pub source_link: String,
    /// Raw link used for streaming; equals `source_link` when the catalog has none.
    pub player_link: String,
    /// Voice / gender category.
    pub voice: String,
    /// Primary style.
    pub primary_style: String,
    /// Secondary style.
    pub secondary_style: String,
}

impl CatalogEntry {
    /// Create an entry with unclassified tags and the player link defaulted
    /// to the source link.
    pub fn new(id: EntryId, name: impl Into<String>, source_link: impl Into<String>) -> Self {
        let source_link = source_link.into();
        Self {
            id,
            name: name.into(),
            player_link: source_link.clone(),
            source_link,
            voice: UNCLASSIFIED.to_string(),
            primary_style: UNCLASSIFIED.to_string(),
            secondary_style: UNCLASSIFIED.to_string(),
        }
    }

    #[must_use]
    pub fn with_player_link(mut self, link: impl Into<String>) -> Self {
        self.player_link = link.into();
        self
    }

    #[must_use]
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = voice.into();
        self
    }

    #[must_use]
    pub fn with_styles(mut self, primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        self.primary_style = primary.into();
        self.secondary_style = secondary.into();
        self
    }

    /// Raw link a given variant is derived from.
    pub fn raw_link_for(&self, variant: LinkVariant) -> &str {
        match variant {
            LinkVariant::Player => &self.player_link,
            LinkVariant::Source | LinkVariant::Mobile => &self.source_link,
        }
    }
}

/// Derived form of a raw storage link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkVariant {
    /// Untouched link with any download marker removed.
    Source,
    /// Stream-optimized link that forces raw bytes.
    Player,
    /// Link for opening the provider page directly.
    Mobile,
}

impl fmt::Display for LinkVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => write!(f, "source"),
            Self::Player => write!(f, "player"),
            Self::Mobile => write!(f, "mobile"),
        }
    }
}
