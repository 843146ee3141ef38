//! Per-request choice of presentation path and link variant.
//!
//! Two states, nothing persisted:
//!
//! - **External share**: the request carries a share identifier (or a legacy
//!   name). The viewer gets one entry, an inline download-suppressed player on
//!   the Player variant, and a redirect fallback on the Mobile variant. No
//!   search surface is exposed.
//! - **Internal**: no identifier. Requires a valid session; then the filtered
//!   catalog is listed with a lazily fetched preview per row, a button opening
//!   the Source variant, and share links.
//!
//! Each view carries two independent render instructions, one for the stream
//! channel and one for the redirect channel; which one a client displays is up
//! to the presentation layer.

use serde::Serialize;
use voxlink_common::{CatalogEntry, LinkVariant};

use crate::catalog::{CatalogSnapshot, Facets, SearchFilter};
use crate::fetch::DEFAULT_MIME;
use crate::links::LinkSet;
use crate::share::{self, ShareLinkBuilder, ShareLinks};

/// Where a client goes back to after a failed share lookup.
pub const HOME_PATH: &str = "/";

/// Share reference extracted from the incoming request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum ShareKey {
    Id(String),
    Name(String),
}

/// Parameters of one request, as passed by the presentation layer.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub share_id: Option<String>,
    pub share_name: Option<String>,
    pub filter: SearchFilter,
}

impl RequestContext {
    /// The share reference, preferring `id` over the legacy name. Blank values
    /// count as absent.
    pub fn share_key(&self) -> Option<ShareKey> {
        let present = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        present(&self.share_id)
            .map(ShareKey::Id)
            .or_else(|| present(&self.share_name).map(ShareKey::Name))
    }
}

/// What the presentation layer should render on one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderInstruction {
    /// Inline audio player.
    InlinePlayer {
        /// Player-variant link, empty when unavailable.
        url: String,
        mime: String,
        /// Hide the player's download affordance.
        download_suppressed: bool,
        /// Session-protected endpoint returning the cached inline payload.
        /// Absent on external shares, which embed the payload in the view.
        #[serde(skip_serializing_if = "Option::is_none")]
        fetch_path: Option<String>,
        /// Fetch only on explicit user action.
        lazy: bool,
    },
    /// Button that opens the provider directly.
    Redirect { url: String, variant: LinkVariant },
}

/// One entry in the external share view.
#[derive(Debug, Clone, Serialize)]
pub struct ExternalView {
    pub entry: CatalogEntry,
    pub stream: RenderInstruction,
    pub redirect: RenderInstruction,
    pub search_enabled: bool,
}

/// One row of the internal listing.
#[derive(Debug, Clone, Serialize)]
pub struct EntryCard {
    pub entry: CatalogEntry,
    pub preview: RenderInstruction,
    pub open_source: RenderInstruction,
    pub share: ShareLinks,
}

/// Filtered internal listing.
#[derive(Debug, Clone, Serialize)]
pub struct InternalView {
    pub cards: Vec<EntryCard>,
    pub total: usize,
    pub limit: usize,
    pub has_more: bool,
    pub facets: Facets,
    pub search_enabled: bool,
}

/// Outcome of [`DeliverySelector::select`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Delivery {
    External(ExternalView),
    NotFound { key: ShareKey, back_to: String },
    LoginRequired,
    Internal(InternalView),
}

/// Endpoint serving the inline payload of one entry.
pub fn inline_path(entry: &CatalogEntry) -> String {
    format!("/api/entries/{}/inline", share::encode(entry.id.as_str()))
}

fn player_instruction(links: &LinkSet, fetch_path: Option<String>) -> RenderInstruction {
    RenderInstruction::InlinePlayer {
        url: links.player.clone(),
        mime: DEFAULT_MIME.to_string(),
        download_suppressed: true,
        lazy: fetch_path.is_some(),
        fetch_path,
    }
}

fn redirect_instruction(links: &LinkSet, variant: LinkVariant) -> RenderInstruction {
    RenderInstruction::Redirect {
        url: links.get(variant).to_string(),
        variant,
    }
}

/// Chooses the delivery path for a request.
#[derive(Debug, Clone)]
pub struct DeliverySelector {
    share_links: ShareLinkBuilder,
}

impl DeliverySelector {
    pub fn new(share_links: ShareLinkBuilder) -> Self {
        Self { share_links }
    }

    pub fn share_links(&self) -> &ShareLinkBuilder {
        &self.share_links
    }

    /// Resolve a share key against the snapshot.
    pub fn lookup<'a>(
        &self,
        snapshot: &'a CatalogSnapshot,
        key: &ShareKey,
    ) -> Option<&'a CatalogEntry> {
        match key {
            ShareKey::Id(id) => snapshot.find_by_id(id),
            ShareKey::Name(name) => snapshot.find_by_name(name),
        }
    }

    pub fn select(
        &self,
        snapshot: &CatalogSnapshot,
        ctx: &RequestContext,
        authenticated: bool,
    ) -> Delivery {
        if let Some(key) = ctx.share_key() {
            return match self.lookup(snapshot, &key) {
                Some(entry) => Delivery::External(self.external(entry)),
                None => {
                    tracing::info!(key = ?key, "Share lookup found no entry");
                    Delivery::NotFound {
                        key,
                        back_to: HOME_PATH.to_string(),
                    }
                }
            };
        }

        if !authenticated {
            return Delivery::LoginRequired;
        }

        Delivery::Internal(self.internal(snapshot, &ctx.filter))
    }

    pub fn external(&self, entry: &CatalogEntry) -> ExternalView {
        let links = LinkSet::for_entry(entry);
        ExternalView {
            entry: entry.clone(),
            stream: player_instruction(&links, None),
            redirect: redirect_instruction(&links, LinkVariant::Mobile),
            search_enabled: false,
        }
    }

    pub fn internal(&self, snapshot: &CatalogSnapshot, filter: &SearchFilter) -> InternalView {
        let results = snapshot.search(filter);
        let cards = results
            .entries
            .iter()
            .map(|entry| {
                let links = LinkSet::for_entry(entry);
                EntryCard {
                    entry: (*entry).clone(),
                    preview: player_instruction(&links, Some(inline_path(entry))),
                    open_source: redirect_instruction(&links, LinkVariant::Source),
                    share: self.share_links.for_entry(entry),
                }
            })
            .collect();

        InternalView {
            cards,
            total: results.total,
            limit: results.limit,
            has_more: results.has_more(),
            facets: snapshot.facets(),
            search_enabled: true,
        }
    }
}
