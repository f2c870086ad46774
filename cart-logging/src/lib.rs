//! cart-logging: append-only NDJSON events for search post-mortems.
//!
//! No global logger; whoever drives a search owns its writer and passes it
//! where needed. Each event is one JSON object per line, so a crashed run
//! leaves at most one partial trailing line.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::Serialize;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Milliseconds since the epoch.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Stable hex content hash (FNV-1a); identifies filter text across runs.
pub fn hash_text(text: &str) -> String {
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    for b in text.bytes() {
        h ^= b as u64;
        h = h.wrapping_mul(0x0000_0100_0000_01b3);
    }
    format!("{h:016x}")
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchStartedV1 {
    pub event: &'static str,
    pub ts_ms: u64,
    pub filter_id: String,
    pub filter_hash: String,
    pub deck: String,
    pub stake: String,
    pub batch_chars: u8,
    pub start_batch: u64,
    pub end_batch: u64,
    pub threads: usize,
    pub resumed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PileReplayV1 {
    pub event: &'static str,
    pub ts_ms: u64,
    pub filter_id: String,
    pub scanned: u64,
    pub hits: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchProgressV1 {
    pub event: &'static str,
    pub ts_ms: u64,
    pub filter_id: String,
    pub batches_done: u64,
    pub batches_total: u64,
    pub checkpoint: i64,
    pub seeds_per_second: u64,
    pub cutoff: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchDoneV1 {
    pub event: &'static str,
    pub ts_ms: u64,
    pub filter_id: String,
    pub batches_done: u64,
    pub seeds_scanned: u64,
    pub results_emitted: u64,
    pub cancelled: bool,
    pub elapsed_ms: u64,
}

#[derive(Debug)]
pub enum NdjsonError {
    Io(io::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for NdjsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NdjsonError::Io(e) => write!(f, "io: {e}"),
            NdjsonError::Json(e) => write!(f, "json: {e}"),
        }
    }
}

impl std::error::Error for NdjsonError {}

impl From<io::Error> for NdjsonError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for NdjsonError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

/// Append-only NDJSON writer.
///
/// Contract: each call writes exactly one JSON object followed by a newline.
pub struct NdjsonWriter {
    w: BufWriter<File>,
    lines_since_flush: u64,
    flush_every_lines: u64,
}

impl NdjsonWriter {
    /// Open a file for append. Creates it if it doesn't exist.
    pub fn open_append(path: impl AsRef<Path>) -> Result<Self, NdjsonError> {
        Self::open_append_with_flush(path, 0)
    }

    /// `flush_every_lines=0` disables periodic flushing.
    pub fn open_append_with_flush(
        path: impl AsRef<Path>,
        flush_every_lines: u64,
    ) -> Result<Self, NdjsonError> {
        let f = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            w: BufWriter::new(f),
            lines_since_flush: 0,
            flush_every_lines,
        })
    }

    pub fn write_event<T: Serialize>(&mut self, event: &T) -> Result<(), NdjsonError> {
        let mut buf = serde_json::to_vec(event)?;
        buf.push(b'\n');
        self.w.write_all(&buf)?;
        self.lines_since_flush += 1;
        if self.flush_every_lines > 0 && self.lines_since_flush >= self.flush_every_lines {
            self.flush()?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), NdjsonError> {
        self.w.flush()?;
        self.lines_since_flush = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn hash_is_stable_and_distinguishes() {
        assert_eq!(hash_text("abc"), hash_text("abc"));
        assert_ne!(hash_text("abc"), hash_text("abd"));
        assert_eq!(hash_text("").len(), 16);
    }

    #[test]
    fn writes_one_json_object_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.ndjson");
        let mut w = NdjsonWriter::open_append(&path).unwrap();
        w.write_event(&SearchDoneV1 {
            event: "search_done",
            ts_ms: 1,
            filter_id: "f".into(),
            batches_done: 2,
            seeds_scanned: 2450,
            results_emitted: 7,
            cancelled: false,
            elapsed_ms: 12,
        })
        .unwrap();
        w.flush().unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 1);
        let v: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(v["event"], "search_done");
        assert_eq!(v["seeds_scanned"], 2450);
    }

    #[test]
    fn append_accumulates_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.ndjson");
        for i in 0..2 {
            let mut w = NdjsonWriter::open_append(&path).unwrap();
            w.write_event(&serde_json::json!({ "event": "tick", "i": i }))
                .unwrap();
            w.flush().unwrap();
        }
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
    }
}
