//! cart-store: durable search state.
//!
//! One SQLite database per search (keyed by the sanitized filter id) holds
//! the top-K result table and the resume checkpoint; the same database
//! carries the fertilizer pile table so cross-table writes share
//! transactions. All writes are transactional; a crash leaves either the
//! old or the new state.
//!
//! The results table has one `tally_<i>` column per should clause, so its
//! shape depends on the filter. Arity changes are detected at open and the
//! table is rebuilt (prior seeds are salvaged into the pile first).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use thiserror::Error;

use cart_core::{Seed, SeedError};

#[cfg(test)]
mod store_tests;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result rows kept per search.
pub const RESULT_CAP: usize = 1000;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored seed is invalid: {0}")]
    BadSeed(#[from] SeedError),
    #[error("result row has {got} tallies, filter has {expected} should clauses")]
    TallyArity { got: usize, expected: usize },
}

/// One scored seed with its per-clause tallies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    pub seed: Seed,
    pub score: i64,
    pub tally: Vec<u16>,
}

/// What `reconcile` decided about prior on-disk state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// Same filter text: results and checkpoint survive.
    Resumed { last_completed_batch: i64 },
    /// Filter text changed (or nothing stored): state was reset; any prior
    /// results were salvaged into the pile.
    Fresh { salvaged: usize },
}

/// Only characters that survive into a filter id.
pub fn sanitize_filter_id(name: &str, deck: &str, stake: &str) -> String {
    let raw = format!("{name}_{deck}_{stake}");
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            out.push(c);
        } else {
            out.push('-');
        }
    }
    out
}

/// Per-search durable store plus the shared pile.
pub struct Store {
    conn: Arc<Mutex<Connection>>,
    tally_len: usize,
    /// Seeds salvaged by an arity rebuild at open, reported by `reconcile`.
    salvaged_at_open: usize,
    insert_sql: String,
    select_sql: String,
}

impl Store {
    /// Open (or create) the store for one filter id under `dir`.
    pub fn open(dir: &Path, filter_id: &str, tally_len: usize) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir)?;
        let path: PathBuf = dir.join(format!("{filter_id}.sqlite"));
        Self::with_connection(Connection::open(path)?, tally_len)
    }

    /// In-memory store for tests.
    pub fn in_memory(tally_len: usize) -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?, tally_len)
    }

    fn with_connection(mut conn: Connection, tally_len: usize) -> Result<Self, StoreError> {
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;",
        )?;

        let tx = conn.transaction()?;
        tx.execute_batch(
            "CREATE TABLE IF NOT EXISTS search_state (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                filter_text TEXT NOT NULL,
                batch_size INTEGER NOT NULL,
                last_completed_batch INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
             );
             CREATE TABLE IF NOT EXISTS seeds (
                seed TEXT PRIMARY KEY
             );",
        )?;
        let salvaged_at_open = ensure_results_table(&tx, tally_len)?;
        tx.commit()?;

        let tally_cols: Vec<String> = (0..tally_len).map(|i| format!("tally_{i}")).collect();
        let insert_sql = format!(
            "INSERT INTO results (seed, score{}) VALUES (?1, ?2{})
             ON CONFLICT(seed) DO UPDATE SET score = excluded.score{}
             WHERE excluded.score > results.score",
            tally_cols.iter().map(|c| format!(", {c}")).collect::<String>(),
            (0..tally_len).map(|i| format!(", ?{}", i + 3)).collect::<String>(),
            tally_cols
                .iter()
                .map(|c| format!(", {c} = excluded.{c}"))
                .collect::<String>(),
        );
        let select_sql = format!(
            "SELECT seed, score{} FROM results ORDER BY score DESC, seed ASC LIMIT ?1",
            tally_cols.iter().map(|c| format!(", {c}")).collect::<String>(),
        );

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            tally_len,
            salvaged_at_open,
            insert_sql,
            select_sql,
        })
    }

    /// Compare the stored filter text against `filter_text`. Unchanged text
    /// resumes from the stored checkpoint; changed text resets the search
    /// state, pushing any prior top results into the pile first.
    pub fn reconcile(&self, filter_text: &str, batch_size: u8) -> Result<Reconciled, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let stored: Option<(String, i64, i64)> = tx
            .query_row(
                "SELECT filter_text, batch_size, last_completed_batch
                 FROM search_state WHERE id = 1",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .optional()?;

        if let Some((text, size, last)) = stored {
            if text == filter_text && size == batch_size as i64 {
                tx.commit()?;
                return Ok(Reconciled::Resumed {
                    last_completed_batch: last,
                });
            }
        }

        // Salvage: prior winners stay interesting even under a new filter.
        let salvaged = tx.execute(
            "INSERT OR IGNORE INTO seeds (seed) SELECT seed FROM results",
            [],
        )?;
        tx.execute("DELETE FROM results", [])?;
        tx.execute("DELETE FROM search_state", [])?;
        tx.execute(
            "INSERT INTO search_state
                (id, filter_text, batch_size, last_completed_batch, updated_at)
             VALUES (1, ?1, ?2, -1, ?3)",
            params![filter_text, batch_size as i64, now_secs()],
        )?;
        tx.commit()?;
        Ok(Reconciled::Fresh {
            salvaged: salvaged + self.salvaged_at_open,
        })
    }

    /// Upsert a batch of rows, keeping the table capped and score-ordered.
    /// On seed conflict the higher score wins.
    pub fn upsert_results(&self, rows: &[ResultRow]) -> Result<(), StoreError> {
        if rows.is_empty() {
            return Ok(());
        }
        for row in rows {
            if row.tally.len() != self.tally_len {
                return Err(StoreError::TallyArity {
                    got: row.tally.len(),
                    expected: self.tally_len,
                });
            }
        }
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(&self.insert_sql)?;
            for row in rows {
                let mut values: Vec<rusqlite::types::Value> =
                    Vec::with_capacity(2 + self.tally_len);
                values.push(row.seed.as_str().to_string().into());
                values.push(row.score.into());
                for &t in &row.tally {
                    values.push((t as i64).into());
                }
                stmt.execute(rusqlite::params_from_iter(values))?;
            }
            // Enforce the cap by dropping the lowest scores.
            tx.execute(
                "DELETE FROM results WHERE seed NOT IN (
                    SELECT seed FROM results ORDER BY score DESC, seed ASC LIMIT ?1
                 )",
                params![RESULT_CAP as i64],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Top rows by score descending (seed ascending breaks ties).
    pub fn top(&self, limit: usize) -> Result<Vec<ResultRow>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(&self.select_sql)?;
        let tally_len = self.tally_len;
        let rows = stmt.query_map(params![limit as i64], |r| {
            let seed: String = r.get(0)?;
            let score: i64 = r.get(1)?;
            let mut tally = Vec::with_capacity(tally_len);
            for i in 0..tally_len {
                tally.push(r.get::<_, i64>(2 + i)? as u16);
            }
            Ok((seed, score, tally))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (seed, score, tally) = row?;
            out.push(ResultRow {
                seed: Seed::parse(&seed)?,
                score,
                tally,
            });
        }
        Ok(out)
    }

    /// The score of the N-th best row, if at least N rows exist.
    pub fn nth_best_score(&self, n: usize) -> Result<Option<i64>, StoreError> {
        let conn = self.conn.lock();
        let score = conn
            .query_row(
                "SELECT score FROM results ORDER BY score DESC, seed ASC LIMIT 1 OFFSET ?1",
                params![n.saturating_sub(1) as i64],
                |r| r.get::<_, i64>(0),
            )
            .optional()?;
        Ok(score)
    }

    /// Persist the resume checkpoint. Monotonic per filter id: regressions
    /// are ignored rather than written.
    pub fn checkpoint(&self, last_completed_batch: i64) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE search_state
             SET last_completed_batch = ?1, updated_at = ?2
             WHERE id = 1 AND last_completed_batch < ?1",
            params![last_completed_batch, now_secs()],
        )?;
        Ok(())
    }

    pub fn last_completed_batch(&self) -> Result<i64, StoreError> {
        let conn = self.conn.lock();
        let last = conn
            .query_row(
                "SELECT last_completed_batch FROM search_state WHERE id = 1",
                [],
                |r| r.get::<_, i64>(0),
            )
            .optional()?;
        Ok(last.unwrap_or(-1))
    }

    /// Append seeds to the pile (deduplicated).
    pub fn pile_insert(&self, seeds: &[Seed]) -> Result<(), StoreError> {
        if seeds.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached("INSERT OR IGNORE INTO seeds (seed) VALUES (?1)")?;
            for seed in seeds {
                stmt.execute(params![seed.as_str()])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Every pile seed, for the pre-search replay scan.
    pub fn pile_seeds(&self) -> Result<Vec<Seed>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached("SELECT seed FROM seeds ORDER BY seed ASC")?;
        let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(Seed::parse(&row?)?);
        }
        Ok(out)
    }

    pub fn result_count(&self) -> Result<usize, StoreError> {
        let conn = self.conn.lock();
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM results", [], |r| r.get(0))?;
        Ok(n as usize)
    }
}

/// Create the results table for `tally_len` should clauses. If a prior table
/// has a different arity, its seeds are salvaged into the pile and the table
/// is rebuilt; returns the salvage count.
fn ensure_results_table(tx: &Transaction<'_>, tally_len: usize) -> Result<usize, StoreError> {
    let existing: Option<i64> = tx
        .query_row(
            "SELECT COUNT(*) FROM pragma_table_info('results')",
            [],
            |r| r.get(0),
        )
        .optional()?;
    let mut salvaged = 0usize;
    match existing {
        Some(cols) if cols > 0 => {
            // seed + score + tallies.
            if cols as usize != 2 + tally_len {
                salvaged = tx.execute(
                    "INSERT OR IGNORE INTO seeds (seed) SELECT seed FROM results",
                    [],
                )?;
                tx.execute_batch("DROP TABLE results;")?;
            } else {
                return Ok(0);
            }
        }
        _ => {}
    }
    let tally_cols: String = (0..tally_len)
        .map(|i| format!(", tally_{i} INTEGER NOT NULL"))
        .collect();
    tx.execute_batch(&format!(
        "CREATE TABLE results (
            seed TEXT PRIMARY KEY,
            score INTEGER NOT NULL{tally_cols}
         );
         CREATE INDEX results_by_score ON results(score DESC);"
    ))?;
    Ok(salvaged)
}

fn now_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
