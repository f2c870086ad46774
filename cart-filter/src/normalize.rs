//! Document normalization.
//!
//! Turns an as-written document into canonical form: shorthand resolved to
//! `type` + `values`, names replaced by their canonical labels, defaults
//! filled in, lists sorted and deduplicated, every range checked. The result
//! is a fixed point: `normalize(normalize(d)) == normalize(d)`.

use cart_core::{
    fold_name, Boss, Edition, EventCheck, Joker, Planet, Rank, Source, Spectral, Suit, Tag,
    Tarot, Voucher, ANTE_COUNT,
};

use crate::doc::{Clause, ClauseKind, Defaults, FilterDoc};
use crate::error::FilterError;

/// Which clause list a clause sits in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Must,
    Should,
    MustNot,
}

/// Canonical value set marker for "match anything of this category".
pub const ANY: &str = "Any";

pub fn normalize(doc: &FilterDoc) -> Result<FilterDoc, FilterError> {
    let defaults = doc.defaults.clone().unwrap_or_default();
    validate_defaults(&defaults)?;

    let mut out = doc.clone();
    out.must = normalize_list(&doc.must, "must", &defaults, Phase::Must)?;
    out.should = normalize_list(&doc.should, "should", &defaults, Phase::Should)?;
    out.must_not = normalize_list(&doc.must_not, "mustNot", &defaults, Phase::MustNot)?;
    Ok(out)
}

fn validate_defaults(d: &Defaults) -> Result<(), FilterError> {
    if let Some(antes) = &d.antes {
        check_antes(antes, "defaults.antes")?;
    }
    if let Some(slots) = &d.shop_slots {
        check_slots(slots, "defaults.shopSlots")?;
    }
    if let Some(slots) = &d.pack_slots {
        check_slots(slots, "defaults.packSlots")?;
    }
    if let Some(score) = d.score {
        if score < 0 {
            return Err(FilterError::NegativeScore {
                path: "defaults.score".to_string(),
                got: score,
            });
        }
    }
    Ok(())
}

fn normalize_list(
    list: &[Clause],
    phase_name: &str,
    defaults: &Defaults,
    phase: Phase,
) -> Result<Vec<Clause>, FilterError> {
    list.iter()
        .enumerate()
        .map(|(i, c)| normalize_clause(c, &format!("{phase_name}[{i}]"), defaults, phase, false))
        .collect()
}

fn normalize_clause(
    c: &Clause,
    path: &str,
    defaults: &Defaults,
    phase: Phase,
    nested: bool,
) -> Result<Clause, FilterError> {
    let kind = resolve_kind(c, path)?;
    if nested && matches!(kind, ClauseKind::ErraticRank | ClauseKind::ErraticSuit) {
        return Err(FilterError::NestedErratic {
            path: path.to_string(),
        });
    }

    let mut out = Clause {
        kind: Some(kind),
        ..Clause::default()
    };

    // Compounds carry children and nothing else.
    if matches!(kind, ClauseKind::And | ClauseKind::Or) {
        forbid(c.value.is_some() || c.values.is_some(), path, "value", kind)?;
        forbid(c.edition.is_some(), path, "edition", kind)?;
        forbid(c.antes.is_some(), path, "antes", kind)?;
        forbid(c.shop_slots.is_some(), path, "shopSlots", kind)?;
        forbid(c.pack_slots.is_some(), path, "packSlots", kind)?;
        forbid(c.rolls.is_some(), path, "rolls", kind)?;
        forbid(c.require_mega.is_some(), path, "requireMega", kind)?;
        forbid(c.sources.is_some(), path, "sources", kind)?;
        forbid(c.rank.is_some(), path, "rank", kind)?;
        forbid(c.suit.is_some(), path, "suit", kind)?;
        if phase != Phase::Should || nested {
            if c.score.is_some() {
                return Err(FilterError::ScoreOutsidePhase {
                    path: format!("{path}.score"),
                });
            }
        } else {
            out.score = Some(normalize_score(c.score, defaults, path)?);
        }
        let children = c.clauses.as_deref().unwrap_or_default();
        if children.is_empty() {
            return Err(FilterError::EmptyCompound {
                path: path.to_string(),
            });
        }
        let normalized: Vec<Clause> = children
            .iter()
            .enumerate()
            .map(|(i, child)| {
                normalize_clause(child, &format!("{path}.clauses[{i}]"), defaults, phase, true)
            })
            .collect::<Result<_, _>>()?;
        out.clauses = Some(normalized);
        out.min = Some(normalize_min(c.min, path)?);
        return Ok(out);
    }

    out.values = Some(resolve_values(c, kind, path)?);

    // Edition applies to item draws that roll one.
    if let Some(ed) = &c.edition {
        if !kind_has_edition(kind) {
            return Err(FilterError::FieldNotApplicable {
                path: path.to_string(),
                field: "edition",
                kind: kind.name(),
            });
        }
        let canonical = Edition::from_name(ed).ok_or_else(|| FilterError::UnknownEdition {
            path: format!("{path}.edition"),
            got: ed.clone(),
        })?;
        out.edition = Some(canonical.name().to_string());
    }

    // Antes, for the per-ante categories.
    if kind_has_antes(kind) {
        let antes = c
            .antes
            .clone()
            .or_else(|| defaults.antes.clone())
            .unwrap_or_else(|| (1..=ANTE_COUNT as i64).collect());
        check_antes(&antes, &format!("{path}.antes"))?;
        out.antes = Some(sorted_dedup(antes));
    } else {
        forbid(c.antes.is_some(), path, "antes", kind)?;
    }

    // Slot lists, where the category enumerates slots.
    if kind == ClauseKind::Joker {
        let slots = c
            .shop_slots
            .clone()
            .or_else(|| defaults.shop_slots.clone())
            .unwrap_or_else(|| (0..=5).collect());
        check_slots(&slots, &format!("{path}.shopSlots"))?;
        out.shop_slots = Some(sorted_dedup(slots));
    } else {
        forbid(c.shop_slots.is_some(), path, "shopSlots", kind)?;
    }
    if kind_has_pack_slots(kind) {
        let slots = c
            .pack_slots
            .clone()
            .or_else(|| defaults.pack_slots.clone())
            .unwrap_or_else(|| (0..=5).collect());
        check_slots(&slots, &format!("{path}.packSlots"))?;
        out.pack_slots = Some(sorted_dedup(slots));
    } else {
        forbid(c.pack_slots.is_some(), path, "packSlots", kind)?;
    }

    // Joker sources: shop, pack, or both. Canonical order is ordinal.
    if kind == ClauseKind::Joker {
        let given = c
            .sources
            .clone()
            .unwrap_or_else(|| vec![Source::Shop, Source::Pack]);
        if given.is_empty() {
            return Err(FilterError::EmptyField {
                path: path.to_string(),
                field: "sources",
            });
        }
        let mut sources: Vec<Source> = Vec::new();
        for s in Source::ALL {
            if given.contains(s) {
                sources.push(*s);
            }
        }
        out.sources = Some(sources);
    } else {
        forbid(c.sources.is_some(), path, "sources", kind)?;
    }

    if kind == ClauseKind::SoulJoker {
        out.require_mega = Some(c.require_mega.unwrap_or(false));
    } else {
        forbid(c.require_mega.is_some(), path, "requireMega", kind)?;
    }

    if kind == ClauseKind::Event {
        let rolls = c.rolls.clone().unwrap_or_else(|| vec![0]);
        if rolls.is_empty() {
            return Err(FilterError::EmptyField {
                path: path.to_string(),
                field: "rolls",
            });
        }
        for (i, &r) in rolls.iter().enumerate() {
            if r < 0 {
                return Err(FilterError::RollOutOfRange {
                    path: format!("{path}.rolls[{i}]"),
                    got: r,
                });
            }
        }
        let mut seen = Vec::new();
        for r in rolls {
            if !seen.contains(&r) {
                seen.push(r);
            }
        }
        out.rolls = Some(seen);
    } else {
        forbid(c.rolls.is_some(), path, "rolls", kind)?;
    }

    forbid(c.clauses.is_some(), path, "clauses", kind)?;

    out.min = Some(normalize_min(c.min, path)?);

    if phase == Phase::Should && !nested {
        out.score = Some(normalize_score(c.score, defaults, path)?);
    } else if c.score.is_some() {
        return Err(FilterError::ScoreOutsidePhase {
            path: format!("{path}.score"),
        });
    }

    Ok(out)
}

fn normalize_min(min: Option<i64>, path: &str) -> Result<i64, FilterError> {
    let m = min.unwrap_or(1);
    if m < 1 {
        return Err(FilterError::BadMin {
            path: format!("{path}.min"),
            got: m,
        });
    }
    Ok(m)
}

fn normalize_score(
    score: Option<i64>,
    defaults: &Defaults,
    path: &str,
) -> Result<i64, FilterError> {
    let s = score.or(defaults.score).unwrap_or(1);
    if s < 0 {
        return Err(FilterError::NegativeScore {
            path: format!("{path}.score"),
            got: s,
        });
    }
    Ok(s)
}

fn forbid(
    present: bool,
    path: &str,
    field: &'static str,
    kind: ClauseKind,
) -> Result<(), FilterError> {
    if present {
        return Err(FilterError::FieldNotApplicable {
            path: path.to_string(),
            field,
            kind: kind.name(),
        });
    }
    Ok(())
}

/// Which single category does this clause name?
fn resolve_kind(c: &Clause, path: &str) -> Result<ClauseKind, FilterError> {
    let mut found: Vec<&'static str> = Vec::new();
    if let Some(k) = c.kind {
        found.push(k.name());
    }
    let shorthands: [(bool, &'static str); 10] = [
        (c.joker.is_some(), "joker"),
        (c.soul_joker.is_some(), "soulJoker"),
        (c.voucher.is_some(), "voucher"),
        (c.tarot.is_some(), "tarot"),
        (c.planet.is_some(), "planet"),
        (c.spectral.is_some(), "spectral"),
        (c.card.is_some(), "card"),
        (c.tag.is_some(), "tag"),
        (c.boss.is_some(), "boss"),
        (c.event.is_some(), "event"),
    ];
    for (present, name) in shorthands {
        if present {
            found.push(name);
        }
    }
    match found.len() {
        1 => {}
        0 => {
            return Err(FilterError::AmbiguousCategory {
                path: path.to_string(),
                found: "none".to_string(),
            })
        }
        _ => {
            return Err(FilterError::AmbiguousCategory {
                path: path.to_string(),
                found: found.join(", "),
            })
        }
    }
    if let Some(k) = c.kind {
        return Ok(k);
    }
    Ok(if c.joker.is_some() {
        ClauseKind::Joker
    } else if c.soul_joker.is_some() {
        ClauseKind::SoulJoker
    } else if c.voucher.is_some() {
        ClauseKind::Voucher
    } else if c.tarot.is_some() {
        ClauseKind::TarotCard
    } else if c.planet.is_some() {
        ClauseKind::PlanetCard
    } else if c.spectral.is_some() {
        ClauseKind::SpectralCard
    } else if c.card.is_some() {
        ClauseKind::PlayingCard
    } else if c.tag.is_some() {
        ClauseKind::Tag
    } else if c.boss.is_some() {
        ClauseKind::Boss
    } else {
        ClauseKind::Event
    })
}

/// Collect raw value strings from `value`, `values`, the shorthand field,
/// and (for erratic/playing-card clauses) `rank`/`suit`.
fn raw_values(c: &Clause, kind: ClauseKind, path: &str) -> Result<Vec<String>, FilterError> {
    let mut raw = Vec::new();
    let shorthand = [
        &c.joker,
        &c.soul_joker,
        &c.voucher,
        &c.tarot,
        &c.planet,
        &c.spectral,
        &c.card,
        &c.tag,
        &c.boss,
        &c.event,
    ]
    .into_iter()
    .flatten()
    .next();
    if let Some(v) = shorthand {
        raw.push(v.clone());
    }
    if let Some(v) = &c.value {
        raw.push(v.clone());
    }
    if let Some(vs) = &c.values {
        raw.extend(vs.iter().cloned());
    }
    match kind {
        ClauseKind::ErraticRank => {
            if let Some(r) = &c.rank {
                raw.push(r.clone());
            }
            forbid(c.suit.is_some(), path, "suit", kind)?;
        }
        ClauseKind::ErraticSuit => {
            if let Some(s) = &c.suit {
                raw.push(s.clone());
            }
            forbid(c.rank.is_some(), path, "rank", kind)?;
        }
        ClauseKind::PlayingCard => {
            // rank + suit combine into one "R of S" value.
            match (&c.rank, &c.suit) {
                (Some(r), Some(s)) => raw.push(format!("{r} of {s}")),
                (Some(r), None) => raw.push(r.clone()),
                (None, Some(s)) => raw.push(s.clone()),
                (None, None) => {}
            }
        }
        _ => {
            forbid(c.rank.is_some(), path, "rank", kind)?;
            forbid(c.suit.is_some(), path, "suit", kind)?;
        }
    }
    Ok(raw)
}

/// Canonicalize the clause's values for its category.
fn resolve_values(
    c: &Clause,
    kind: ClauseKind,
    path: &str,
) -> Result<Vec<String>, FilterError> {
    let raw = raw_values(c, kind, path)?;
    // SoulJoker and Boss default to Any; everything else must name a value.
    let raw = if raw.is_empty() {
        match kind {
            ClauseKind::SoulJoker => vec![ANY.to_string()],
            _ => {
                return Err(FilterError::EmptyValues {
                    path: path.to_string(),
                })
            }
        }
    } else {
        raw
    };

    if raw.iter().any(|v| fold_name(v) == "any") {
        return Ok(vec![ANY.to_string()]);
    }

    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for v in &raw {
        let canonical = canonical_value(kind, v).ok_or_else(|| FilterError::UnknownValue {
            path: format!("{path}.values"),
            kind: kind.name(),
            got: v.clone(),
        })?;
        if !out.contains(&canonical) {
            out.push(canonical);
        }
    }
    if out.is_empty() {
        return Err(FilterError::EmptyValues {
            path: path.to_string(),
        });
    }
    Ok(out)
}

/// Canonical label for one value string within a category.
pub fn canonical_value(kind: ClauseKind, v: &str) -> Option<String> {
    match kind {
        ClauseKind::Voucher => Voucher::from_name(v).map(|x| x.name().to_string()),
        ClauseKind::Joker => Joker::from_name(v).map(|x| x.name().to_string()),
        ClauseKind::SoulJoker => Joker::from_name(v)
            .filter(|j| j.rarity() == cart_core::Rarity::Legendary)
            .map(|x| x.name().to_string()),
        ClauseKind::TarotCard => Tarot::from_name(v).map(|x| x.name().to_string()),
        ClauseKind::PlanetCard => Planet::from_name(v).map(|x| x.name().to_string()),
        ClauseKind::SpectralCard => Spectral::from_name(v).map(|x| x.name().to_string()),
        ClauseKind::PlayingCard => parse_card_value(v).map(|(r, s)| match (r, s) {
            (Some(r), Some(s)) => format!("{} of {}", r.name(), s.name()),
            (Some(r), None) => r.name().to_string(),
            (None, Some(s)) => s.name().to_string(),
            (None, None) => unreachable!("parse_card_value never returns neither"),
        }),
        ClauseKind::Tag => Tag::from_name(v).map(|x| x.name().to_string()),
        ClauseKind::Boss => Boss::from_name(v).map(|x| x.name().to_string()),
        ClauseKind::Event => EventCheck::from_name(v).map(|x| x.name().to_string()),
        ClauseKind::ErraticRank => Rank::from_name(v).map(|x| x.name().to_string()),
        ClauseKind::ErraticSuit => Suit::from_name(v).map(|x| x.name().to_string()),
        ClauseKind::And | ClauseKind::Or => None,
    }
}

/// "King of Hearts" | "King" | "Hearts" -> rank and/or suit.
pub fn parse_card_value(v: &str) -> Option<(Option<Rank>, Option<Suit>)> {
    if let Some((r, s)) = v.split_once(" of ") {
        let rank = Rank::from_name(r)?;
        let suit = Suit::from_name(s)?;
        return Some((Some(rank), Some(suit)));
    }
    if let Some(rank) = Rank::from_name(v) {
        return Some((Some(rank), None));
    }
    if let Some(suit) = Suit::from_name(v) {
        return Some((None, Some(suit)));
    }
    None
}

fn kind_has_edition(kind: ClauseKind) -> bool {
    matches!(
        kind,
        ClauseKind::Voucher
            | ClauseKind::Joker
            | ClauseKind::SoulJoker
            | ClauseKind::TarotCard
            | ClauseKind::PlanetCard
            | ClauseKind::SpectralCard
            | ClauseKind::PlayingCard
    )
}

fn kind_has_antes(kind: ClauseKind) -> bool {
    matches!(
        kind,
        ClauseKind::Voucher
            | ClauseKind::Joker
            | ClauseKind::SoulJoker
            | ClauseKind::TarotCard
            | ClauseKind::PlanetCard
            | ClauseKind::SpectralCard
            | ClauseKind::PlayingCard
            | ClauseKind::Tag
            | ClauseKind::Boss
    )
}

fn kind_has_pack_slots(kind: ClauseKind) -> bool {
    matches!(
        kind,
        ClauseKind::Joker
            | ClauseKind::SoulJoker
            | ClauseKind::TarotCard
            | ClauseKind::PlanetCard
            | ClauseKind::SpectralCard
            | ClauseKind::PlayingCard
    )
}

fn check_antes(antes: &[i64], path: &str) -> Result<(), FilterError> {
    if antes.is_empty() {
        return Err(FilterError::EmptyField {
            path: path.to_string(),
            field: "antes",
        });
    }
    for (i, &a) in antes.iter().enumerate() {
        if !(1..=ANTE_COUNT as i64).contains(&a) {
            return Err(FilterError::AnteOutOfRange {
                path: format!("{path}[{i}]"),
                got: a,
            });
        }
    }
    Ok(())
}

fn check_slots(slots: &[i64], path: &str) -> Result<(), FilterError> {
    if slots.is_empty() {
        return Err(FilterError::EmptyField {
            path: path.to_string(),
            field: "slots",
        });
    }
    for (i, &s) in slots.iter().enumerate() {
        if !(0..=5).contains(&s) {
            return Err(FilterError::SlotOutOfRange {
                path: format!("{path}[{i}]"),
                got: s,
            });
        }
    }
    Ok(())
}

fn sorted_dedup(mut v: Vec<i64>) -> Vec<i64> {
    v.sort_unstable();
    v.dedup();
    v
}
