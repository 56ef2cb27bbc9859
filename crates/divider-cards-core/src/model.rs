//! Card-set records and the ordered list the surface is built from.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Error, Result};

/// One catalog card set, printed as a single divider card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRecord {
    /// Set code, always upper case (e.g. "MH3")
    #[serde(deserialize_with = "deserialize_code")]
    pub code: String,
    pub name: String,
    /// ISO calendar date, `YYYY-MM-DD`
    pub released_at: String,
    /// URI of the set's vector icon
    pub icon_svg_uri: String,
    pub set_type: String,
    pub card_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<String>,
}

fn deserialize_code<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    String::deserialize(deserializer).map(|code| normalize_code(&code))
}

fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

impl CardRecord {
    pub fn new(
        code: &str,
        name: impl Into<String>,
        released_at: impl Into<String>,
        icon_svg_uri: impl Into<String>,
        set_type: impl Into<String>,
        card_count: u32,
    ) -> Self {
        Self {
            code: normalize_code(code),
            name: name.into(),
            released_at: released_at.into(),
            icon_svg_uri: icon_svg_uri.into(),
            set_type: set_type.into(),
            card_count,
            block: None,
        }
    }

    #[must_use]
    pub fn with_block(mut self, block: impl Into<String>) -> Self {
        self.block = Some(block.into());
        self
    }

    /// Release month for the card header, `YYYY-MM`.
    pub fn header_date(&self) -> String {
        let mut parts = self.released_at.split('-');
        match (parts.next(), parts.next()) {
            (Some(year), Some(month)) => format!("{year}-{month}"),
            _ => self.released_at.clone(),
        }
    }

    /// Full release date, `DD.MM.YYYY`.
    pub fn full_date(&self) -> String {
        let parts: Vec<&str> = self.released_at.split('-').collect();
        match parts.as_slice() {
            [year, month, day] => format!("{day}.{month}.{year}"),
            _ => self.released_at.clone(),
        }
    }

    /// Display label for the catalog's set-type tag.
    pub fn set_type_label(&self) -> String {
        let label = match self.set_type.as_str() {
            "core" => "Core Set",
            "expansion" => "Expansion",
            "masters" => "Masters",
            "commander" => "Commander",
            "draft_innovation" => "Draft Innovation",
            "funny" => "Un-Set",
            "starter" => "Starter",
            "promo" => "Promo",
            "token" => "Token",
            "memorabilia" => "Memorabilia",
            "alchemy" => "Alchemy",
            "archenemy" => "Archenemy",
            "arsenal" => "Arsenal",
            "box" => "Box Set",
            "duel_deck" => "Duel Deck",
            "from_the_vault" => "From the Vault",
            "masterpiece" => "Masterpiece",
            "planechase" => "Planechase",
            "premium_deck" => "Premium Deck",
            "spellbook" => "Spellbook",
            "treasure_chest" => "Treasure Chest",
            "vanguard" => "Vanguard",
            other => return other.to_string(),
        };
        label.to_string()
    }
}

/// Order of the cards in the grid, and therefore on the printed sheet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    /// Order in which the sets were added
    #[default]
    Added,
    /// Set name, A to Z
    Name,
    /// Newest release first
    DateDesc,
    /// Oldest release first
    DateAsc,
}

impl SortOrder {
    pub const ALL: [Self; 4] = [Self::Added, Self::Name, Self::DateDesc, Self::DateAsc];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Name => "name",
            Self::DateDesc => "date-desc",
            Self::DateAsc => "date-asc",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Added => "Recently added",
            Self::Name => "Name (A-Z)",
            Self::DateDesc => "Newest first",
            Self::DateAsc => "Oldest first",
        }
    }

    /// Compare two records. `Added` treats every pair as equal so a stable
    /// sort falls back to insertion order.
    pub fn compare(self, a: &CardRecord, b: &CardRecord) -> Ordering {
        match self {
            Self::Added => Ordering::Equal,
            Self::Name => a
                .name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name)),
            Self::DateDesc => b.released_at.cmp(&a.released_at),
            Self::DateAsc => a.released_at.cmp(&b.released_at),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|order| order.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::UnknownSortOrder(wanted.to_string()))
    }
}

/// Catalog responses wrap list results in a `data` envelope.
#[derive(Deserialize)]
#[serde(untagged)]
enum CardListFile {
    Bare(Vec<CardRecord>),
    Envelope { data: Vec<CardRecord> },
}

/// Ordered card records with unique codes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardList {
    records: Vec<CardRecord>,
}

impl CardList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON array (or `{ "data": [...] }`), dropping duplicate codes.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: CardListFile =
            serde_json::from_str(json).map_err(|e| Error::CardListLoad(e.to_string()))?;
        let records = match file {
            CardListFile::Bare(records) | CardListFile::Envelope { data: records } => records,
        };

        let mut list = Self::new();
        let skipped = list.extend_unique(records);
        if skipped > 0 {
            tracing::warn!("Skipped {} duplicate card set(s)", skipped);
        }
        Ok(list)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::CardListLoad(format!("failed to read {}: {e}", path.as_ref().display()))
        })?;
        Self::from_json(&json)
    }

    pub fn contains(&self, code: &str) -> bool {
        let code = normalize_code(code);
        self.records.iter().any(|r| r.code == code)
    }

    /// Append a record, rejecting a code that is already present.
    pub fn push(&mut self, record: CardRecord) -> Result<()> {
        if self.contains(&record.code) {
            return Err(Error::DuplicateCard(record.code));
        }
        self.records.push(record);
        Ok(())
    }

    /// Append every record whose code is new. Returns the number skipped.
    pub fn extend_unique(&mut self, records: impl IntoIterator<Item = CardRecord>) -> usize {
        let mut skipped = 0;
        for record in records {
            if self.push(record).is_err() {
                skipped += 1;
            }
        }
        skipped
    }

    /// Remove the record with this code, returning it.
    pub fn remove(&mut self, code: &str) -> Option<CardRecord> {
        let code = normalize_code(code);
        let index = self.records.iter().position(|r| r.code == code)?;
        Some(self.records.remove(index))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CardRecord> {
        self.records.iter()
    }

    /// The records in `order`; ties keep insertion order.
    pub fn sorted(&self, order: SortOrder) -> Vec<&CardRecord> {
        let mut records: Vec<&CardRecord> = self.records.iter().collect();
        records.sort_by(|a, b| order.compare(a, b));
        records
    }
}

impl<'a> IntoIterator for &'a CardList {
    type Item = &'a CardRecord;
    type IntoIter = std::slice::Iter<'a, CardRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
