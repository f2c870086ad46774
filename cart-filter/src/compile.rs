//! Filter compilation: normalized document → evaluator pipeline.
//!
//! Clauses are grouped by category (cheap categories first), erratic rank
//! and suit clauses are fused into one deck walk, and every stream any
//! evaluator will touch is declared up front so the search driver can build
//! one stream bank per lane group.

use cart_core::{
    Boss, Deck, Edition, EventCheck, Joker, Planet, PoolSet, Rank, Source, Spectral, Stake,
    Suit, Tag, Tarot, Voucher,
};
use cart_core::{
    pack_slots_for, shop_slots_for, BossKeys, CardKeys, ConsumableKeys, ErraticKeys, JokerKeys,
    SoulKeys, TagKeys, VoucherKeys,
};
use cart_core::fold_name;
use cart_rng::{Mask8, StreamBank, StreamPlan, LANES};

use crate::doc::{Clause, ClauseKind, FilterDoc};
use crate::error::FilterError;
use crate::eval::{
    BossNode, CompoundNode, ConsumableCat, ConsumableNode, ErraticClause, ErraticFused, EvalCx,
    EventNode, Hit, ItemSet, JokerNode, Node, PlayingCardNode, SoulNode, TagNode, VoucherNode,
};
use crate::normalize::{normalize, parse_card_value, ANY};

/// Sentinel for "no cutoff": every score clears it.
pub const NO_CUTOFF: i64 = i64::MIN;

/// One should clause ready to score, in evaluation order. `col` is the
/// clause's position in the document, which is where its tally column and
/// result-table slot live.
struct ShouldNode {
    node: Node,
    score: i64,
    col: usize,
}

/// A compiled, immutable filter pipeline.
pub struct CompiledFilter {
    pub name: Option<String>,
    pub deck: Deck,
    pub stake: Stake,
    /// The normalized source document.
    pub doc: FilterDoc,
    pub plan: StreamPlan,
    pub pools: PoolSet,
    /// `["seed", "score", <one per should clause>]`.
    pub columns: Vec<String>,
    musts: Vec<Node>,
    must_nots: Vec<Node>,
    shoulds: Vec<ShouldNode>,
    erratic: Option<ErraticFused>,
    /// `remaining[i]` = best score still reachable from should clause `i` on.
    remaining: Vec<i64>,
}

/// Per-lane outcome of one eight-lane group.
#[derive(Clone, Debug)]
pub struct LaneOutcome {
    /// Lanes that cleared `must` and `mustNot`.
    pub pass: Mask8,
    pub score: [i64; LANES],
    /// One row per should clause.
    pub tallies: Vec<[u16; LANES]>,
}

impl CompiledFilter {
    pub fn should_count(&self) -> usize {
        self.shoulds.len()
    }

    /// Sum of every should clause's maximum gain.
    pub fn max_score(&self) -> i64 {
        self.remaining.first().copied().unwrap_or(0)
    }

    /// Fresh outcome scratch sized for this filter; reuse it across lane
    /// groups via [`CompiledFilter::evaluate_into`].
    pub fn outcome(&self) -> LaneOutcome {
        LaneOutcome {
            pass: Mask8::NONE,
            score: [0; LANES],
            tallies: vec![[0; LANES]; self.shoulds.len()],
        }
    }

    /// Evaluate eight seeds. Lanes outside `active` are never reported.
    /// `cutoff` only prunes: lanes that can no longer reach it stop scoring,
    /// and such lanes always finish below it.
    pub fn evaluate(&self, bank: &StreamBank, active: Mask8, cutoff: i64) -> LaneOutcome {
        let mut out = self.outcome();
        self.evaluate_into(bank, active, cutoff, &mut out);
        out
    }

    /// Allocation-free form of [`CompiledFilter::evaluate`] for the hot
    /// loop; `out` must come from [`CompiledFilter::outcome`].
    pub fn evaluate_into(
        &self,
        bank: &StreamBank,
        active: Mask8,
        cutoff: i64,
        out: &mut LaneOutcome,
    ) {
        debug_assert_eq!(out.tallies.len(), self.shoulds.len());
        out.pass = Mask8::NONE;
        out.score = [0; LANES];
        for t in &mut out.tallies {
            *t = [0; LANES];
        }

        let erratic_hits: Vec<Hit> = match &self.erratic {
            Some(f) => f.walk(bank, &self.pools, active),
            None => Vec::new(),
        };

        // Phase one: gates.
        let mut alive = active;
        for node in &self.musts {
            let cx = EvalCx {
                bank,
                pools: &self.pools,
                alive,
                need_tally: false,
                erratic: &erratic_hits,
            };
            alive = alive.and(node.evaluate(&cx).pass);
            if alive.none() {
                return;
            }
        }
        for node in &self.must_nots {
            let cx = EvalCx {
                bank,
                pools: &self.pools,
                alive,
                need_tally: false,
                erratic: &erratic_hits,
            };
            alive = alive.and(node.evaluate(&cx).pass.not());
            if alive.none() {
                return;
            }
        }

        // Phase two: accumulate score over should clauses.
        let mut scoring = alive;
        for (i, s) in self.shoulds.iter().enumerate() {
            if cutoff != NO_CUTOFF {
                // Drop lanes that cannot reach the cutoff any more; their
                // final score stays below it, so they can never be emitted.
                let remaining = self.remaining[i];
                let score = &out.score;
                scoring = Mask8::from_fn(|k| scoring.get(k) && score[k] + remaining >= cutoff);
                if scoring.none() {
                    break;
                }
            }
            let cx = EvalCx {
                bank,
                pools: &self.pools,
                alive: scoring,
                need_tally: true,
                erratic: &erratic_hits,
            };
            let hit = s.node.evaluate(&cx);
            out.tallies[s.col] = hit.tally;
            for k in scoring.lanes() {
                out.score[k] += hit.tally[k] as i64 * s.score;
            }
        }

        out.pass = alive;
    }
}

/// Compile a document. Normalization runs first, so callers may pass either
/// raw or normalized documents.
pub fn compile(doc: &FilterDoc) -> Result<CompiledFilter, FilterError> {
    let doc = normalize(doc)?;
    let deck = doc.deck_or_default();
    let stake = doc.stake_or_default();
    let pools = PoolSet::for_run(deck, stake);
    let mut plan = StreamPlan::new();

    // Fused erratic clauses collect across all three phases; each phase's
    // node indexes into the shared walk results.
    let mut erratic_clauses: Vec<ErraticClause> = Vec::new();

    let musts: Vec<Node> = build_phase(&doc.must, &mut plan, &mut erratic_clauses)?
        .into_iter()
        .map(|(_, n)| n)
        .collect();
    let must_nots: Vec<Node> = build_phase(&doc.must_not, &mut plan, &mut erratic_clauses)?
        .into_iter()
        .map(|(_, n)| n)
        .collect();
    let should_nodes = build_phase(&doc.should, &mut plan, &mut erratic_clauses)?;

    let erratic = if erratic_clauses.is_empty() {
        None
    } else {
        Some(ErraticFused {
            keys: ErraticKeys::declare(&mut plan)?,
            clauses: erratic_clauses,
            active: deck == Deck::Erratic,
        })
    };

    // Columns follow document order; evaluation order is the sorted one.
    let mut columns = vec!["seed".to_string(), "score".to_string()];
    for (i, clause) in doc.should.iter().enumerate() {
        let column = column_name(clause, i, &columns);
        columns.push(column);
    }
    let mut shoulds = Vec::with_capacity(should_nodes.len());
    let mut max_gains = Vec::with_capacity(should_nodes.len());
    for (col, node) in should_nodes {
        let score = doc.should[col].score.unwrap_or(1);
        max_gains.push(node.max_tally() as i64 * score);
        shoulds.push(ShouldNode { node, score, col });
    }

    // Suffix sums of the best remaining gain (in evaluation order), for
    // cutoff pruning.
    let mut remaining = vec![0i64; shoulds.len()];
    let mut acc = 0i64;
    for i in (0..shoulds.len()).rev() {
        acc += max_gains[i];
        remaining[i] = acc;
    }

    plan.freeze();
    Ok(CompiledFilter {
        name: doc.name.clone(),
        deck,
        stake,
        doc,
        plan,
        pools,
        columns,
        musts,
        must_nots,
        shoulds,
        erratic,
        remaining,
    })
}

/// Evaluation order within a phase: cheap categories first. The soul
/// edition-only class outranks everything because it rejects bulk scans
/// with a single stream read.
fn category_rank(clause: &Clause) -> u8 {
    match clause.kind.expect("normalized clauses carry a kind") {
        ClauseKind::SoulJoker if is_soul_edition_only(clause) => 0,
        ClauseKind::Voucher => 1,
        ClauseKind::Tag => 2,
        ClauseKind::Boss => 3,
        ClauseKind::ErraticRank | ClauseKind::ErraticSuit => 4,
        ClauseKind::Event => 5,
        ClauseKind::TarotCard => 6,
        ClauseKind::PlanetCard => 7,
        ClauseKind::SpectralCard => 8,
        ClauseKind::PlayingCard => 9,
        ClauseKind::Joker => 10,
        ClauseKind::SoulJoker => 11,
        ClauseKind::And => 12,
        ClauseKind::Or => 13,
    }
}

fn is_soul_edition_only(clause: &Clause) -> bool {
    clause.edition.is_some() && is_any(clause.values.as_deref().unwrap_or_default())
}

fn is_any(values: &[String]) -> bool {
    values.len() == 1 && values[0] == ANY
}

/// Build one phase's nodes in evaluation order, each tagged with its
/// document position.
fn build_phase(
    clauses: &[Clause],
    plan: &mut StreamPlan,
    erratic: &mut Vec<ErraticClause>,
) -> Result<Vec<(usize, Node)>, FilterError> {
    // Stable sort: category order decides, document order breaks ties.
    let mut order: Vec<usize> = (0..clauses.len()).collect();
    order.sort_by_key(|&i| category_rank(&clauses[i]));
    order
        .into_iter()
        .map(|i| Ok((i, build_node(&clauses[i], plan, erratic)?)))
        .collect()
}

fn build_node(
    clause: &Clause,
    plan: &mut StreamPlan,
    erratic: &mut Vec<ErraticClause>,
) -> Result<Node, FilterError> {
    let kind = clause.kind.expect("normalized clauses carry a kind");
    let min = clause.min.unwrap_or(1).min(u16::MAX as i64) as u16;
    let antes: Vec<u8> = clause
        .antes
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|&a| a as u8)
        .collect();
    let edition = clause
        .edition
        .as_deref()
        .map(|e| Edition::from_name(e).expect("normalized editions are canonical"));

    Ok(match kind {
        ClauseKind::Voucher => Node::Voucher(VoucherNode {
            min,
            wanted: item_set(clause, Voucher::from_name, Voucher::ordinal),
            edition,
            antes: declare_per_ante(&antes, |a| VoucherKeys::declare(plan, a))?,
        }),
        ClauseKind::Tag => Node::Tag(TagNode {
            min,
            wanted: item_set(clause, Tag::from_name, Tag::ordinal),
            antes: declare_per_ante(&antes, |a| TagKeys::declare(plan, a))?,
        }),
        ClauseKind::Boss => Node::Boss(BossNode {
            min,
            wanted: item_set(clause, Boss::from_name, Boss::ordinal),
            keys: BossKeys::declare(plan)?,
            antes,
        }),
        ClauseKind::Event => {
            let checks = clause
                .values
                .as_deref()
                .unwrap_or_default()
                .iter()
                .map(|v| {
                    let check =
                        EventCheck::from_name(v).expect("normalized event values are canonical");
                    Ok((check, check.declare(plan)?))
                })
                .collect::<Result<Vec<_>, FilterError>>()?;
            Node::Event(EventNode {
                min,
                checks,
                rolls: clause
                    .rolls
                    .as_deref()
                    .unwrap_or(&[0])
                    .iter()
                    .map(|&r| r as u64)
                    .collect(),
            })
        }
        ClauseKind::ErraticRank | ClauseKind::ErraticSuit => {
            let (mut rank_mask, mut suit_mask) = (0u16, 0u8);
            let values = clause.values.as_deref().unwrap_or_default();
            let any = is_any(values);
            if kind == ClauseKind::ErraticRank {
                rank_mask = if any {
                    (1 << Rank::COUNT) - 1
                } else {
                    values
                        .iter()
                        .map(|v| 1u16 << Rank::from_name(v).expect("canonical").ordinal())
                        .fold(0, |a, b| a | b)
                };
            } else {
                suit_mask = if any {
                    (1 << Suit::COUNT) - 1
                } else {
                    values
                        .iter()
                        .map(|v| 1u8 << Suit::from_name(v).expect("canonical").ordinal())
                        .fold(0, |a, b| a | b)
                };
            }
            let idx = erratic.len();
            erratic.push(ErraticClause {
                rank_mask,
                suit_mask,
                min,
            });
            Node::Erratic(idx)
        }
        ClauseKind::TarotCard => Node::Consumable(consumable_node(
            clause,
            ConsumableCat::Tarot,
            min,
            edition,
            &antes,
            item_set(clause, Tarot::from_name, Tarot::ordinal),
            plan,
        )?),
        ClauseKind::PlanetCard => Node::Consumable(consumable_node(
            clause,
            ConsumableCat::Planet,
            min,
            edition,
            &antes,
            item_set(clause, Planet::from_name, Planet::ordinal),
            plan,
        )?),
        ClauseKind::SpectralCard => Node::Consumable(consumable_node(
            clause,
            ConsumableCat::Spectral,
            min,
            edition,
            &antes,
            item_set(clause, Spectral::from_name, Spectral::ordinal),
            plan,
        )?),
        ClauseKind::PlayingCard => {
            let wants = clause
                .values
                .as_deref()
                .unwrap_or_default()
                .iter()
                .map(|v| {
                    if fold_name(v) == "any" {
                        (None, None)
                    } else {
                        parse_card_value(v).expect("normalized card values are canonical")
                    }
                })
                .collect();
            let mut per_ante = Vec::with_capacity(antes.len());
            for &a in &antes {
                per_ante.push((
                    a,
                    CardKeys::declare(plan, a)?,
                    capped_slots(clause.pack_slots.as_deref(), a, pack_slots_for),
                ));
            }
            Node::PlayingCard(PlayingCardNode {
                min,
                wants,
                edition,
                antes: per_ante,
            })
        }
        ClauseKind::Joker => {
            let sources = clause.sources.as_deref().unwrap_or(&[]);
            let mut shop = Vec::new();
            let mut pack = Vec::new();
            for &a in &antes {
                if sources.contains(&Source::Shop) {
                    shop.push((
                        a,
                        JokerKeys::declare(plan, Source::Shop, a)?,
                        capped_slots(clause.shop_slots.as_deref(), a, shop_slots_for),
                    ));
                }
                if sources.contains(&Source::Pack) {
                    pack.push((
                        a,
                        JokerKeys::declare(plan, Source::Pack, a)?,
                        capped_slots(clause.pack_slots.as_deref(), a, pack_slots_for),
                    ));
                }
            }
            Node::Joker(JokerNode {
                min,
                wanted: item_set(clause, Joker::from_name, Joker::ordinal),
                edition,
                shop,
                pack,
            })
        }
        ClauseKind::SoulJoker => {
            let mut per_ante = Vec::with_capacity(antes.len());
            for &a in &antes {
                per_ante.push((
                    a,
                    SoulKeys::declare(plan, a)?,
                    capped_slots(clause.pack_slots.as_deref(), a, pack_slots_for),
                ));
            }
            Node::Soul(SoulNode {
                min,
                wanted: item_set(clause, Joker::from_name, Joker::ordinal),
                edition,
                require_mega: clause.require_mega.unwrap_or(false),
                antes: per_ante,
            })
        }
        ClauseKind::And | ClauseKind::Or => {
            let children = clause
                .clauses
                .as_deref()
                .unwrap_or_default()
                .iter()
                .map(|c| build_node(c, plan, erratic))
                .collect::<Result<Vec<_>, _>>()?;
            let node = CompoundNode { min, children };
            if kind == ClauseKind::And {
                Node::And(node)
            } else {
                Node::Or(node)
            }
        }
    })
}

fn consumable_node(
    clause: &Clause,
    cat: ConsumableCat,
    min: u16,
    edition: Option<Edition>,
    antes: &[u8],
    wanted: ItemSet,
    plan: &mut StreamPlan,
) -> Result<ConsumableNode, FilterError> {
    let mut per_ante = Vec::with_capacity(antes.len());
    for &a in antes {
        let keys = match cat {
            ConsumableCat::Tarot => ConsumableKeys::tarot(plan, a)?,
            ConsumableCat::Planet => ConsumableKeys::planet(plan, a)?,
            ConsumableCat::Spectral => ConsumableKeys::spectral(plan, a)?,
        };
        per_ante.push((
            a,
            keys,
            capped_slots(clause.pack_slots.as_deref(), a, pack_slots_for),
        ));
    }
    Ok(ConsumableNode {
        cat,
        min,
        wanted,
        edition,
        antes: per_ante,
    })
}

/// Clause slots intersected with the ante's available range.
fn capped_slots(
    slots: Option<&[i64]>,
    ante: u8,
    range_for: fn(u8) -> std::ops::Range<u8>,
) -> Vec<u64> {
    let cap = range_for(ante);
    slots
        .unwrap_or(&[0, 1, 2, 3, 4, 5])
        .iter()
        .filter(|&&s| (s as u8) < cap.end)
        .map(|&s| s as u64)
        .collect()
}

fn declare_per_ante<K>(
    antes: &[u8],
    mut declare: impl FnMut(u8) -> Result<K, cart_rng::StreamError>,
) -> Result<Vec<(u8, K)>, FilterError> {
    antes
        .iter()
        .map(|&a| Ok((a, declare(a)?)))
        .collect()
}

/// Membership set from a normalized clause's values.
fn item_set<T: Copy>(
    clause: &Clause,
    from_name: impl Fn(&str) -> Option<T>,
    ordinal: impl Fn(T) -> u8,
) -> ItemSet {
    let values = clause.values.as_deref().unwrap_or_default();
    if is_any(values) {
        return ItemSet::any();
    }
    ItemSet::of(values.iter().map(|v| {
        ordinal(from_name(v).expect("normalized values are canonical"))
    }))
}

/// Stable, human-readable column name for one should clause.
fn column_name(clause: &Clause, index: usize, taken: &[String]) -> String {
    let kind = clause
        .kind
        .map(|k| fold_name(k.name()))
        .unwrap_or_else(|| "clause".to_string());
    let value = clause
        .values
        .as_deref()
        .and_then(|v| v.first())
        .map(|v| fold_name(v))
        .unwrap_or_else(|| "any".to_string());
    let base = format!("{kind}_{value}");
    if taken.contains(&base) {
        format!("{base}_{index}")
    } else {
        base
    }
}
