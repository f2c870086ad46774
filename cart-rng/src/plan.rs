//! Declare-then-freeze stream registry.
//!
//! Clause evaluators declare the stream keys they will consume while the
//! filter pipeline is being compiled; the search driver then builds one
//! `StreamBank` per eight-lane group and every evaluator addresses its
//! streams by dense id. Declaring after freeze, or addressing a stream that
//! was never declared, is a bug and aborts with a diagnostic.

use rustc_hash::FxHashMap;

use crate::lanes::LANES;
use crate::stream::{Stream, StreamError, StreamVec};

/// Dense handle into a [`StreamBank`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StreamId(u32);

/// The set of stream keys a compiled pipeline will consume.
#[derive(Debug, Default)]
pub struct StreamPlan {
    keys: Vec<String>,
    by_key: FxHashMap<String, StreamId>,
    frozen: bool,
}

impl StreamPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a key, deduplicating repeats. Keys are validated here so the
    /// per-batch bank build cannot fail.
    pub fn declare(&mut self, key: &str) -> Result<StreamId, StreamError> {
        assert!(!self.frozen, "stream {key:?} declared after freeze");
        if let Some(&id) = self.by_key.get(key) {
            return Ok(id);
        }
        // Construction validates the key; the throwaway seed is irrelevant.
        Stream::new(key, b"AAAAAAAA")?;
        let id = StreamId(self.keys.len() as u32);
        self.keys.push(key.to_string());
        self.by_key.insert(key.to_string(), id);
        Ok(id)
    }

    /// Seal the plan. After this, only bank construction reads it.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }
}

/// All declared streams, constructed once per eight-lane seed group.
pub struct StreamBank {
    streams: Vec<StreamVec>,
}

impl StreamBank {
    pub fn build(plan: &StreamPlan, seeds: &[&[u8]; LANES]) -> Self {
        let mut bank = Self {
            streams: Vec::with_capacity(plan.len()),
        };
        bank.rebuild(plan, seeds);
        bank
    }

    /// Re-key the bank for a new lane group, reusing the allocation. This is
    /// the per-group path in the search loop.
    pub fn rebuild(&mut self, plan: &StreamPlan, seeds: &[&[u8]; LANES]) {
        assert!(plan.is_frozen(), "stream bank built from an unfrozen plan");
        self.streams.clear();
        self.streams.extend(plan.keys.iter().map(|key| {
            StreamVec::new(key, seeds).expect("plan keys are validated at declare time")
        }));
    }

    /// Stream lookup on the hot path: a bounds-checked array index.
    #[inline(always)]
    pub fn stream(&self, id: StreamId) -> &StreamVec {
        &self.streams[id.0 as usize]
    }

    /// The `i`-th draw of stream `id` for every lane.
    #[inline(always)]
    pub fn draw(&self, id: StreamId, i: u64) -> crate::lanes::F64x8 {
        self.stream(id).draw_at(i)
    }
}
