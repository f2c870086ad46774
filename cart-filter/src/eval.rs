//! Vectorized clause evaluators.
//!
//! One evaluator per category; each produces an eight-lane pass mask plus a
//! per-lane occurrence tally. Dispatch happens once per clause per batch via
//! the `Node` enum; the inner loops are straight-line lane code. Evaluation
//! never fails and never allocates per lane.

use cart_core::{
    BossKeys, CardKeys, ConsumableKeys, Edition, ErraticKeys, EventCheck, JokerKeys, PoolSet,
    Rank, SoulKeys, Suit, TagKeys, VoucherKeys,
};
use cart_rng::{Mask8, StreamBank, StreamId, LANES};

/// Result of one clause over one eight-lane group.
#[derive(Clone, Copy, Debug, Default)]
pub struct Hit {
    pub pass: Mask8,
    pub tally: [u16; LANES],
}

/// Membership set over a category's ordinals (up to 256).
#[derive(Clone, Debug)]
pub struct ItemSet {
    any: bool,
    bits: [u64; 4],
}

impl ItemSet {
    pub fn any() -> Self {
        Self {
            any: true,
            bits: [0; 4],
        }
    }

    pub fn of(ordinals: impl IntoIterator<Item = u8>) -> Self {
        let mut bits = [0u64; 4];
        for ord in ordinals {
            bits[(ord >> 6) as usize] |= 1 << (ord & 63);
        }
        Self { any: false, bits }
    }

    #[inline(always)]
    pub fn contains(&self, ord: u8) -> bool {
        self.any || self.bits[(ord >> 6) as usize] & (1 << (ord & 63)) != 0
    }
}

/// Everything an evaluator needs for one eight-lane group.
pub struct EvalCx<'a> {
    pub bank: &'a StreamBank,
    pub pools: &'a PoolSet,
    /// Lanes still in play; evaluators may skip work for dead lanes.
    pub alive: Mask8,
    /// When false (must/mustNot), evaluators may stop as soon as every live
    /// lane has reached its threshold; the exact tally is not needed.
    pub need_tally: bool,
    /// Precomputed erratic clause hits, one per fused clause.
    pub erratic: &'a [Hit],
}

/// A compiled clause evaluator.
pub enum Node {
    Voucher(VoucherNode),
    Tag(TagNode),
    Boss(BossNode),
    Event(EventNode),
    Erratic(usize),
    Consumable(ConsumableNode),
    PlayingCard(PlayingCardNode),
    Joker(JokerNode),
    Soul(SoulNode),
    And(CompoundNode),
    Or(CompoundNode),
}

impl Node {
    pub fn evaluate(&self, cx: &EvalCx<'_>) -> Hit {
        match self {
            Node::Voucher(n) => n.evaluate(cx),
            Node::Tag(n) => n.evaluate(cx),
            Node::Boss(n) => n.evaluate(cx),
            Node::Event(n) => n.evaluate(cx),
            Node::Erratic(idx) => cx.erratic[*idx],
            Node::Consumable(n) => n.evaluate(cx),
            Node::PlayingCard(n) => n.evaluate(cx),
            Node::Joker(n) => n.evaluate(cx),
            Node::Soul(n) => n.evaluate(cx),
            Node::And(n) => n.evaluate(cx, true),
            Node::Or(n) => n.evaluate(cx, false),
        }
    }

    /// Largest tally any lane could reach; drives cutoff early-exit.
    pub fn max_tally(&self) -> u32 {
        match self {
            Node::Voucher(n) => n.antes.len() as u32,
            Node::Tag(n) => n.antes.len() as u32 * 2,
            Node::Boss(n) => n.antes.len() as u32,
            Node::Event(n) => (n.rolls.len() * n.checks.len()) as u32,
            Node::Erratic(_) => cart_core::ERRATIC_DECK_SIZE as u32,
            Node::Consumable(n) => n.antes.iter().map(|(_, _, s)| s.len() as u32).sum(),
            Node::PlayingCard(n) => n.antes.iter().map(|(_, _, s)| s.len() as u32).sum(),
            Node::Joker(n) => {
                let shop: u32 = n.shop.iter().map(|(_, _, s)| s.len() as u32).sum();
                let pack: u32 = n.pack.iter().map(|(_, _, s)| s.len() as u32).sum();
                shop + pack
            }
            Node::Soul(n) => n.antes.iter().map(|(_, _, s)| s.len() as u32).sum(),
            Node::And(n) => n.children.iter().map(Node::max_tally).min().unwrap_or(0),
            Node::Or(n) => n.children.iter().map(Node::max_tally).sum(),
        }
    }
}

#[inline(always)]
fn finish(tally: [u16; LANES], min: u16, alive: Mask8) -> Hit {
    let pass = Mask8::from_fn(|k| tally[k] >= min).and(alive);
    Hit { pass, tally }
}

/// True once every live lane has reached `min`; lets mask-only phases stop.
#[inline(always)]
fn saturated(tally: &[u16; LANES], min: u16, alive: Mask8) -> bool {
    alive.lanes().all(|k| tally[k] >= min)
}

pub struct VoucherNode {
    pub min: u16,
    pub wanted: ItemSet,
    pub edition: Option<Edition>,
    pub antes: Vec<(u8, VoucherKeys)>,
}

impl VoucherNode {
    fn evaluate(&self, cx: &EvalCx<'_>) -> Hit {
        let mut tally = [0u16; LANES];
        for (_, keys) in &self.antes {
            let (vouchers, editions) = keys.sample(cx.bank, cx.pools);
            for k in cx.alive.lanes() {
                if self.wanted.contains(vouchers[k].ordinal())
                    && edition_ok(self.edition, editions[k])
                {
                    tally[k] += 1;
                }
            }
            if !cx.need_tally && saturated(&tally, self.min, cx.alive) {
                break;
            }
        }
        finish(tally, self.min, cx.alive)
    }
}

pub struct TagNode {
    pub min: u16,
    pub wanted: ItemSet,
    pub antes: Vec<(u8, TagKeys)>,
}

impl TagNode {
    fn evaluate(&self, cx: &EvalCx<'_>) -> Hit {
        let mut tally = [0u16; LANES];
        for (_, keys) in &self.antes {
            let (small, big) = keys.sample(cx.bank, cx.pools);
            for k in cx.alive.lanes() {
                if self.wanted.contains(small[k].ordinal()) {
                    tally[k] += 1;
                }
                if self.wanted.contains(big[k].ordinal()) {
                    tally[k] += 1;
                }
            }
            if !cx.need_tally && saturated(&tally, self.min, cx.alive) {
                break;
            }
        }
        finish(tally, self.min, cx.alive)
    }
}

pub struct BossNode {
    pub min: u16,
    pub wanted: ItemSet,
    pub keys: BossKeys,
    pub antes: Vec<u8>,
}

impl BossNode {
    fn evaluate(&self, cx: &EvalCx<'_>) -> Hit {
        // The schedule walk carries history across antes, so it always runs
        // from ante 1 regardless of which antes the clause asks about.
        let schedule = self.keys.schedule(cx.bank);
        let mut tally = [0u16; LANES];
        for &ante in &self.antes {
            for k in cx.alive.lanes() {
                if self.wanted.contains(schedule.at(ante, k).ordinal()) {
                    tally[k] += 1;
                }
            }
        }
        finish(tally, self.min, cx.alive)
    }
}

pub struct EventNode {
    pub min: u16,
    pub checks: Vec<(EventCheck, StreamId)>,
    pub rolls: Vec<u64>,
}

impl EventNode {
    fn evaluate(&self, cx: &EvalCx<'_>) -> Hit {
        let mut tally = [0u16; LANES];
        for &roll in &self.rolls {
            for &(check, id) in &self.checks {
                let hit = check.matches8(cx.bank.draw(id, roll)).and(cx.alive);
                for k in hit.lanes() {
                    tally[k] += 1;
                }
            }
            if !cx.need_tally && saturated(&tally, self.min, cx.alive) {
                break;
            }
        }
        finish(tally, self.min, cx.alive)
    }
}

/// Which consumable pool a card clause reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsumableCat {
    Tarot,
    Planet,
    Spectral,
}

pub struct ConsumableNode {
    pub cat: ConsumableCat,
    pub min: u16,
    pub wanted: ItemSet,
    pub edition: Option<Edition>,
    pub antes: Vec<(u8, ConsumableKeys, Vec<u64>)>,
}

impl ConsumableNode {
    fn evaluate(&self, cx: &EvalCx<'_>) -> Hit {
        let mut tally = [0u16; LANES];
        'antes: for (_, keys, slots) in &self.antes {
            for &slot in slots {
                let (ordinals, editions) = match self.cat {
                    ConsumableCat::Tarot => {
                        let (v, e) = keys.sample_tarot(cx.bank, cx.pools, slot);
                        (v.map(|x| x.ordinal()), e)
                    }
                    ConsumableCat::Planet => {
                        let (v, e) = keys.sample_planet(cx.bank, cx.pools, slot);
                        (v.map(|x| x.ordinal()), e)
                    }
                    ConsumableCat::Spectral => {
                        let (v, e) = keys.sample_spectral(cx.bank, cx.pools, slot);
                        (v.map(|x| x.ordinal()), e)
                    }
                };
                for k in cx.alive.lanes() {
                    if self.wanted.contains(ordinals[k]) && edition_ok(self.edition, editions[k]) {
                        tally[k] += 1;
                    }
                }
                if !cx.need_tally && saturated(&tally, self.min, cx.alive) {
                    break 'antes;
                }
            }
        }
        finish(tally, self.min, cx.alive)
    }
}

pub struct PlayingCardNode {
    pub min: u16,
    /// Any-of patterns; `None` on a side means "any rank"/"any suit".
    pub wants: Vec<(Option<Rank>, Option<Suit>)>,
    pub edition: Option<Edition>,
    pub antes: Vec<(u8, CardKeys, Vec<u64>)>,
}

impl PlayingCardNode {
    fn evaluate(&self, cx: &EvalCx<'_>) -> Hit {
        let mut tally = [0u16; LANES];
        'antes: for (_, keys, slots) in &self.antes {
            for &slot in slots {
                let d = keys.sample(cx.bank, cx.pools, slot);
                for k in cx.alive.lanes() {
                    let matched = self.wants.iter().any(|&(r, s)| {
                        r.map_or(true, |r| d.rank[k] == r) && s.map_or(true, |s| d.suit[k] == s)
                    });
                    if matched && edition_ok(self.edition, d.edition[k]) {
                        tally[k] += 1;
                    }
                }
                if !cx.need_tally && saturated(&tally, self.min, cx.alive) {
                    break 'antes;
                }
            }
        }
        finish(tally, self.min, cx.alive)
    }
}

pub struct JokerNode {
    pub min: u16,
    pub wanted: ItemSet,
    pub edition: Option<Edition>,
    pub shop: Vec<(u8, JokerKeys, Vec<u64>)>,
    pub pack: Vec<(u8, JokerKeys, Vec<u64>)>,
}

impl JokerNode {
    fn evaluate(&self, cx: &EvalCx<'_>) -> Hit {
        let mut tally = [0u16; LANES];
        let mut done = false;
        for group in [&self.shop, &self.pack] {
            if done {
                break;
            }
            'antes: for (_, keys, slots) in group.iter() {
                for &slot in slots {
                    let d = keys.sample(cx.bank, cx.pools, slot);
                    for k in cx.alive.lanes() {
                        if self.wanted.contains(d.joker[k].ordinal())
                            && edition_ok(self.edition, d.edition[k])
                        {
                            tally[k] += 1;
                        }
                    }
                    if !cx.need_tally && saturated(&tally, self.min, cx.alive) {
                        done = true;
                        break 'antes;
                    }
                }
            }
        }
        finish(tally, self.min, cx.alive)
    }
}

pub struct SoulNode {
    pub min: u16,
    /// `ItemSet::any()` for the edition-only fast path.
    pub wanted: ItemSet,
    pub edition: Option<Edition>,
    pub require_mega: bool,
    pub antes: Vec<(u8, SoulKeys, Vec<u64>)>,
}

impl SoulNode {
    fn evaluate(&self, cx: &EvalCx<'_>) -> Hit {
        let mut tally = [0u16; LANES];
        'antes: for (_, keys, slots) in &self.antes {
            for &slot in slots {
                let d = keys.sample(cx.bank, cx.pools, slot);
                for k in cx.alive.lanes() {
                    if !self.wanted.contains(d.joker[k].ordinal()) {
                        continue;
                    }
                    if !edition_ok(self.edition, d.edition[k]) {
                        continue;
                    }
                    if self.require_mega && !d.mega.get(k) {
                        continue;
                    }
                    tally[k] += 1;
                }
                if !cx.need_tally && saturated(&tally, self.min, cx.alive) {
                    break 'antes;
                }
            }
        }
        finish(tally, self.min, cx.alive)
    }
}

pub struct CompoundNode {
    pub min: u16,
    pub children: Vec<Node>,
}

impl CompoundNode {
    fn evaluate(&self, cx: &EvalCx<'_>, all: bool) -> Hit {
        let mut pass = if all { cx.alive } else { Mask8::NONE };
        let mut tally = if all { [u16::MAX; LANES] } else { [0u16; LANES] };
        for child in &self.children {
            let hit = child.evaluate(cx);
            if all {
                pass = pass.and(hit.pass);
                for k in 0..LANES {
                    tally[k] = tally[k].min(hit.tally[k]);
                }
            } else {
                pass = pass.or(hit.pass);
                for k in 0..LANES {
                    tally[k] = tally[k].saturating_add(hit.tally[k]);
                }
            }
        }
        let own = Mask8::from_fn(|k| tally[k] >= self.min);
        Hit {
            pass: pass.and(own).and(cx.alive),
            tally,
        }
    }
}

/// The fused erratic walker: every rank and suit clause in the document is
/// counted in a single pass over the 52-card starting deck.
pub struct ErraticFused {
    pub keys: ErraticKeys,
    pub clauses: Vec<ErraticClause>,
    /// The erratic generator only runs for the Erratic deck; other decks
    /// produce zero counts.
    pub active: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct ErraticClause {
    /// Bit per rank ordinal; zero means this is a suit clause.
    pub rank_mask: u16,
    /// Bit per suit ordinal; zero means this is a rank clause.
    pub suit_mask: u8,
    pub min: u16,
}

impl ErraticFused {
    pub fn walk(&self, bank: &StreamBank, pools: &PoolSet, alive: Mask8) -> Vec<Hit> {
        let mut tallies = vec![[0u16; LANES]; self.clauses.len()];
        if self.active {
            for i in 0..cart_core::ERRATIC_DECK_SIZE {
                let (ranks, suits) = self.keys.card(bank, pools, i);
                for (c, tally) in self.clauses.iter().zip(tallies.iter_mut()) {
                    for k in alive.lanes() {
                        let hit = if c.rank_mask != 0 {
                            c.rank_mask & (1 << ranks[k].ordinal()) != 0
                        } else {
                            c.suit_mask & (1 << suits[k].ordinal()) != 0
                        };
                        if hit {
                            tally[k] += 1;
                        }
                    }
                }
            }
        }
        self.clauses
            .iter()
            .zip(tallies)
            .map(|(c, tally)| finish(tally, c.min, alive))
            .collect()
    }
}

#[inline(always)]
fn edition_ok(wanted: Option<Edition>, got: Edition) -> bool {
    wanted.map_or(true, |e| e == got)
}
