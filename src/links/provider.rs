//! Provider-specific URL massaging applied before a server-side fetch.
//!
//! Share links pasted into the catalog usually point at a viewer page. The
//! fetch cache needs the raw bytes, so each known provider gets rewritten to
//! its direct-download form. The rewritten URL is also the cache key.

use super::{player, validated, QueryLink};

/// Storage provider recognised from a link's host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OneDrive,
    Dropbox,
    GoogleDrive,
    Other,
}

impl Provider {
    /// Detect the provider of an absolute URL.
    pub fn detect(link: &str) -> Option<Self> {
        let url = reqwest::Url::parse(validated(link)?).ok()?;
        let host = url.host_str()?.to_ascii_lowercase();
        let provider = if host == "1drv.ms"
            || host == "onedrive.live.com"
            || host.ends_with(".sharepoint.com")
        {
            Self::OneDrive
        } else if host == "dropbox.com" || host.ends_with(".dropbox.com") {
            Self::Dropbox
        } else if host == "drive.google.com" {
            Self::GoogleDrive
        } else {
            Self::Other
        };
        Some(provider)
    }
}

/// Rewrite a link into the form that returns raw bytes.
///
/// Returns `None` for malformed links.
pub fn direct_download_url(link: &str) -> Option<String> {
    let provider = Provider::detect(link)?;
    let link = validated(link)?;
    let url = match provider {
        Provider::OneDrive => player(link),
        Provider::Dropbox => QueryLink::split(link)
            .without(|p| p.starts_with("dl=") || p.starts_with("raw="))
            .with("dl=1")
            .render(),
        Provider::GoogleDrive => google_drive_download(link).unwrap_or_else(|| link.to_string()),
        Provider::Other => link.to_string(),
    };
    Some(url)
}

fn google_drive_download(link: &str) -> Option<String> {
    let parsed = QueryLink::split(link);
    let path = parsed.base().split_once("drive.google.com")?.1;

    let file_id = if let Some(rest) = path.strip_prefix("/file/d/") {
        rest.split('/').next().filter(|id| !id.is_empty())?
    } else {
        parsed
            .params()
            .iter()
            .find_map(|p| p.strip_prefix("id="))
            .filter(|id| !id.is_empty())?
    };

    Some(format!(
        "https://drive.google.com/uc?export=download&id={file_id}"
    ))
}
