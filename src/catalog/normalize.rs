//! Column detection and row normalization.
//!
//! Catalog spreadsheets are maintained by hand, so header names differ in
//! case, language, and convention between deployments ("Link_Source",
//! "連結", "OneDrive link", ...). Each canonical field has an ordered list of
//! keywords; the first not-yet-claimed column whose lowercased name contains
//! any keyword is assigned to that field.

use voxlink_common::{CatalogEntry, EntryId, UNCLASSIFIED};

use super::{CatalogError, RawTable};
use crate::links;

/// Canonical fields a catalog column can map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Identifier,
    Name,
    SourceLink,
    PlayerLink,
    Voice,
    PrimaryStyle,
    SecondaryStyle,
}

/// Fields in claiming order with their candidate keywords.
///
/// The more specific fields come first so that e.g. a "Link_Player" column is
/// not taken by the generic "link" keyword of the source link.
pub const FIELD_KEYWORDS: &[(Field, &[&str])] = &[
    (Field::PlayerLink, &["link_player", "player", "stream", "播放"]),
    (Field::SourceLink, &["link_source", "link", "url", "連結", "链接"]),
    (Field::Identifier, &["id", "編號", "编号", "序號"]),
    (Field::Name, &["filename", "name", "title", "檔名", "名稱"]),
    (Field::Voice, &["voice", "category", "gender", "聲線", "性別"]),
    (
        Field::SecondaryStyle,
        &["style_2", "style2", "secondary", "sub_style", "副風格", "風格2"],
    ),
    (Field::PrimaryStyle, &["style", "type", "風格"]),
];

/// Column index assigned to each canonical field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    pub identifier: Option<usize>,
    pub name: Option<usize>,
    pub source_link: Option<usize>,
    pub player_link: Option<usize>,
    pub voice: Option<usize>,
    pub primary_style: Option<usize>,
    pub secondary_style: Option<usize>,
}

impl ColumnMap {
    /// Detect columns from header names, preserving source column order.
    pub fn detect(headers: &[String]) -> Self {
        let lowered: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
        let mut claimed = vec![false; headers.len()];
        let mut map = Self::default();

        for (field, keywords) in FIELD_KEYWORDS {
            let found = lowered.iter().enumerate().find(|(i, header)| {
                !claimed[*i] && keywords.iter().any(|k| header.contains(k))
            });
            if let Some((index, _)) = found {
                claimed[index] = true;
                *map.slot(*field) = Some(index);
            }
        }

        map
    }

    fn slot(&mut self, field: Field) -> &mut Option<usize> {
        match field {
            Field::Identifier => &mut self.identifier,
            Field::Name => &mut self.name,
            Field::SourceLink => &mut self.source_link,
            Field::PlayerLink => &mut self.player_link,
            Field::Voice => &mut self.voice,
            Field::PrimaryStyle => &mut self.primary_style,
            Field::SecondaryStyle => &mut self.secondary_style,
        }
    }
}

/// Result of normalizing one table.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub entries: Vec<CatalogEntry>,
    /// Rows discarded for lacking an identifier or a usable source link.
    pub dropped_rows: usize,
}

/// Map a raw table to canonical entries.
///
/// Fails only when no source-link column exists; individual unusable rows are
/// dropped and counted. Deterministic for unchanged input.
pub fn normalize(table: &RawTable) -> Result<Normalized, CatalogError> {
    let columns = ColumnMap::detect(&table.headers);
    let source_col = columns
        .source_link
        .ok_or(CatalogError::MissingColumn("source link"))?;

    let mut out = Normalized::default();
    for row in &table.rows {
        match normalize_row(row, source_col, &columns) {
            Some(entry) => out.entries.push(entry),
            None => out.dropped_rows += 1,
        }
    }

    Ok(out)
}

fn normalize_row(row: &[String], source_col: usize, columns: &ColumnMap) -> Option<CatalogEntry> {
    let cell = |index: Option<usize>| {
        index
            .and_then(|i| row.get(i))
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    };

    let source_link = cell(Some(source_col))?;
    if links::clean(source_link).is_empty() {
        return None;
    }

    let name = cell(columns.name);
    let id = cell(columns.identifier).or(name)?;
    let player_link = cell(columns.player_link)
        .filter(|link| !links::clean(link).is_empty())
        .unwrap_or(source_link);
    let tag = |index: Option<usize>| cell(index).unwrap_or(UNCLASSIFIED).to_string();

    Some(
        CatalogEntry::new(EntryId::from(id), name.unwrap_or(id), source_link)
            .with_player_link(player_link)
            .with_voice(tag(columns.voice))
            .with_styles(tag(columns.primary_style), tag(columns.secondary_style)),
    )
}
