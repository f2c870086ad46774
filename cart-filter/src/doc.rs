//! The filter document surface.
//!
//! This mirrors what users actually write: camelCase keys, optional
//! everything, category shorthand (`{ "joker": "Blueprint" }` for
//! `{ "type": "Joker", "value": "Blueprint" }`). Normalization resolves the
//! shorthand away; see `normalize`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use cart_core::{fold_name, Deck, Source, Stake};

use crate::error::FilterError;

/// Canonical clause categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClauseKind {
    Voucher,
    Joker,
    SoulJoker,
    TarotCard,
    PlanetCard,
    SpectralCard,
    PlayingCard,
    Tag,
    Boss,
    Event,
    ErraticRank,
    ErraticSuit,
    And,
    Or,
}

impl ClauseKind {
    pub const ALL: &'static [ClauseKind] = &[
        ClauseKind::Voucher,
        ClauseKind::Joker,
        ClauseKind::SoulJoker,
        ClauseKind::TarotCard,
        ClauseKind::PlanetCard,
        ClauseKind::SpectralCard,
        ClauseKind::PlayingCard,
        ClauseKind::Tag,
        ClauseKind::Boss,
        ClauseKind::Event,
        ClauseKind::ErraticRank,
        ClauseKind::ErraticSuit,
        ClauseKind::And,
        ClauseKind::Or,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ClauseKind::Voucher => "Voucher",
            ClauseKind::Joker => "Joker",
            ClauseKind::SoulJoker => "SoulJoker",
            ClauseKind::TarotCard => "TarotCard",
            ClauseKind::PlanetCard => "PlanetCard",
            ClauseKind::SpectralCard => "SpectralCard",
            ClauseKind::PlayingCard => "PlayingCard",
            ClauseKind::Tag => "Tag",
            ClauseKind::Boss => "Boss",
            ClauseKind::Event => "Event",
            ClauseKind::ErraticRank => "ErraticRank",
            ClauseKind::ErraticSuit => "ErraticSuit",
            ClauseKind::And => "And",
            ClauseKind::Or => "Or",
        }
    }

    /// Accepts the canonical tag, case-insensitively, with or without the
    /// "Card" qualifier ("Tarot" == "TarotCard").
    pub fn from_name(s: &str) -> Option<ClauseKind> {
        let want = fold_name(s);
        ClauseKind::ALL.iter().copied().find(|k| {
            let base = fold_name(k.name());
            want == base || base == format!("{want}card")
        })
    }
}

impl std::fmt::Display for ClauseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for ClauseKind {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for ClauseKind {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        ClauseKind::from_name(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown clause type {s:?}")))
    }
}

/// Document-level defaults applied to clauses that omit a field.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Defaults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub antes: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop_slots: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pack_slots: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
}

/// One clause as written. Numeric fields are wide on purpose: range checks
/// happen in `normalize` where they can report a document path.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Clause {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<ClauseKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub antes: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop_slots: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pack_slots: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_mega: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Source>>,
    /// Event roll indices; defaults to `[0]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rolls: Option<Vec<i64>>,
    /// Nested clauses for And/Or.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clauses: Option<Vec<Clause>>,

    // Category shorthand: `{ "joker": "Blueprint" }`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soul_joker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voucher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tarot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spectral: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    /// Rank/suit shorthand for erratic and playing-card clauses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suit: Option<String>,
}

/// The root filter document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FilterDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deck: Option<Deck>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stake: Option<Stake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaults: Option<Defaults>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub must: Vec<Clause>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub should: Vec<Clause>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub must_not: Vec<Clause>,
}

/// On-disk document flavor, chosen by file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocFormat {
    Json,
    Yaml,
}

impl DocFormat {
    pub fn from_path(path: &std::path::Path) -> DocFormat {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => DocFormat::Yaml,
            _ => DocFormat::Json,
        }
    }
}

impl FilterDoc {
    pub fn from_str(text: &str, format: DocFormat) -> Result<FilterDoc, FilterError> {
        match format {
            DocFormat::Json => {
                serde_json::from_str(text).map_err(|e| FilterError::Parse(e.to_string()))
            }
            DocFormat::Yaml => {
                serde_yaml::from_str(text).map_err(|e| FilterError::Parse(e.to_string()))
            }
        }
    }

    /// Deck/stake the document asks for, with the engine defaults.
    pub fn deck_or_default(&self) -> Deck {
        self.deck.unwrap_or(Deck::Red)
    }

    pub fn stake_or_default(&self) -> Stake {
        self.stake.unwrap_or(Stake::White)
    }
}
