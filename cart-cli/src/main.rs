//! cart: CLI for the seed searcher.
//!
//! Subcommands:
//! - search: enumerate the lattice against a filter document
//! - analyze: dump everything one seed generates
//! - serve: minimal HTTP front end (one active search)
//!
//! Exit codes: 0 ok, 2 invalid argument, 3 invalid filter document,
//! 4 cancelled, 1 internal error.

use std::env;
use std::path::{Path, PathBuf};
use std::process;

use cart_core::{analyze, Deck, Seed, Stake};
use cart_filter::{compile, CompiledFilter, DocFormat, FilterDoc};
use cart_logging::{
    hash_text, now_ms, NdjsonWriter, PileReplayV1, SearchDoneV1, SearchProgressV1,
    SearchStartedV1,
};
use cart_search::{CancelToken, CutoffMode, Search, SearchConfig, SearchProgress};
use cart_store::{sanitize_filter_id, Store};

mod serve;

const EXIT_BAD_ARG: i32 = 2;
const EXIT_BAD_FILTER: i32 = 3;
const EXIT_CANCELLED: i32 = 4;
const EXIT_INTERNAL: i32 = 1;

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("search") => cmd_search(&args[1..]),
        Some("analyze") => cmd_analyze(&args[1..]),
        Some("serve") => serve::cmd_serve(&args[1..]),
        Some("--help") | Some("-h") | None => {
            print_help();
            if args.is_empty() {
                process::exit(EXIT_BAD_ARG);
            }
        }
        Some("--version") | Some("-V") => println!("cart {}", env!("CARGO_PKG_VERSION")),
        Some(other) => {
            eprintln!("Unknown command: {other}");
            eprintln!("Run `cart --help` for usage.");
            process::exit(EXIT_BAD_ARG);
        }
    }
}

fn print_help() {
    eprintln!(
        r#"cart - seed search engine

USAGE:
    cart <COMMAND> [OPTIONS]

COMMANDS:
    search      Search the seed lattice against a filter document
    analyze     Print everything one seed generates
    serve       Serve the HTTP front end (one active search at a time)

OPTIONS:
    -h, --help          Print this help message
    -V, --version       Print version

Run `cart <COMMAND> --help` for command options.
"#
    );
}

fn require_value<'a>(args: &'a [String], i: usize, flag: &str) -> &'a str {
    match args.get(i + 1) {
        Some(v) => v,
        None => {
            eprintln!("Missing value for {flag}");
            process::exit(EXIT_BAD_ARG);
        }
    }
}

fn parse_or_exit<T: std::str::FromStr>(value: &str, flag: &str) -> T {
    value.parse().unwrap_or_else(|_| {
        eprintln!("Invalid {flag} value: {value}");
        process::exit(EXIT_BAD_ARG);
    })
}

/// Load + compile a filter document; applies deck/stake overrides.
fn load_filter(
    path: &Path,
    deck: Option<Deck>,
    stake: Option<Stake>,
) -> (CompiledFilter, String) {
    let text = std::fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Cannot read filter at {}: {e}", path.display());
        process::exit(EXIT_BAD_ARG);
    });
    let mut doc = FilterDoc::from_str(&text, DocFormat::from_path(path)).unwrap_or_else(|e| {
        eprintln!("Invalid filter document: {e}");
        process::exit(EXIT_BAD_FILTER);
    });
    if deck.is_some() {
        doc.deck = deck;
    }
    if stake.is_some() {
        doc.stake = stake;
    }
    let filter = compile(&doc).unwrap_or_else(|e| {
        eprintln!("Invalid filter document: {e}");
        process::exit(EXIT_BAD_FILTER);
    });
    (filter, text)
}

struct CliProgress {
    filter_id: String,
    log: Option<NdjsonWriter>,
    total: u64,
    seeds_per_batch: u64,
    started: std::time::Instant,
    last_print: std::time::Instant,
}

impl SearchProgress for CliProgress {
    fn on_pile_hits(&mut self, hits: u64, scanned: u64) {
        if scanned == 0 {
            return;
        }
        println!("Fertilizer pile: {hits} instant hits from {scanned} known seeds");
        if let Some(w) = self.log.as_mut() {
            let _ = w.write_event(&PileReplayV1 {
                event: "pile_replay",
                ts_ms: now_ms(),
                filter_id: self.filter_id.clone(),
                scanned,
                hits,
            });
        }
    }

    fn on_batch_done(&mut self, completed: u64, total: u64, checkpoint: i64) {
        // Console + NDJSON progress, rate-limited.
        if self.last_print.elapsed() < std::time::Duration::from_secs(1) {
            return;
        }
        self.last_print = std::time::Instant::now();
        let elapsed = self.started.elapsed().as_secs_f64();
        let speed = if elapsed > 0.0 {
            (completed as f64 * self.seeds_per_batch as f64 / elapsed) as u64
        } else {
            0
        };
        println!(
            "batch {completed}/{total} (checkpoint {checkpoint}), ~{speed} seeds/s"
        );
        if let Some(w) = self.log.as_mut() {
            let _ = w.write_event(&SearchProgressV1 {
                event: "search_progress",
                ts_ms: now_ms(),
                filter_id: self.filter_id.clone(),
                batches_done: completed,
                batches_total: self.total,
                checkpoint,
                seeds_per_second: speed,
                cutoff: 0,
            });
        }
    }

    fn on_cutoff(&mut self, cutoff: i64) {
        println!("cutoff advanced to {cutoff}");
    }
}

fn cmd_search(args: &[String]) {
    let mut filter_path: Option<PathBuf> = None;
    let mut threads: usize = 0;
    let mut batch_chars: u8 = 4;
    let mut start_batch: Option<u64> = None;
    let mut end_batch: Option<u64> = None;
    let mut cutoff = CutoffMode::Fixed(0);
    let mut deck: Option<Deck> = None;
    let mut stake: Option<Stake> = None;
    let mut data_dir = PathBuf::from("cart-data");

    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                println!(
                    r#"cart search

USAGE:
    cart search --filter <path> [OPTIONS]

OPTIONS:
    --filter PATH       Filter document (.json, .yaml) (required)
    --threads N         Worker threads (default: hardware parallelism)
    --batch-size L      Batch character count; one batch covers 35^L seeds (default: 4)
    --start-batch B     First batch index (default: resume checkpoint)
    --end-batch B       Stop before this batch index (default: whole lattice)
    --cutoff N|auto     Minimum score to emit, or adaptive (default: 0)
    --deck DECK         Override the document's deck
    --stake STAKE       Override the document's stake
    --data-dir DIR      Where search state lives (default: cart-data)
"#
                );
                return;
            }
            "--filter" => {
                filter_path = Some(PathBuf::from(require_value(args, i, "--filter")));
                i += 2;
            }
            "--threads" => {
                threads = parse_or_exit(require_value(args, i, "--threads"), "--threads");
                i += 2;
            }
            "--batch-size" => {
                batch_chars = parse_or_exit(require_value(args, i, "--batch-size"), "--batch-size");
                i += 2;
            }
            "--start-batch" => {
                start_batch = Some(parse_or_exit(
                    require_value(args, i, "--start-batch"),
                    "--start-batch",
                ));
                i += 2;
            }
            "--end-batch" => {
                end_batch = Some(parse_or_exit(
                    require_value(args, i, "--end-batch"),
                    "--end-batch",
                ));
                i += 2;
            }
            "--cutoff" => {
                let v = require_value(args, i, "--cutoff");
                cutoff = if v.eq_ignore_ascii_case("auto") {
                    CutoffMode::Auto
                } else {
                    CutoffMode::Fixed(parse_or_exit(v, "--cutoff"))
                };
                i += 2;
            }
            "--deck" => {
                let v = require_value(args, i, "--deck");
                deck = Some(Deck::from_name(v).unwrap_or_else(|| {
                    eprintln!("Unknown deck: {v}");
                    process::exit(EXIT_BAD_ARG);
                }));
                i += 2;
            }
            "--stake" => {
                let v = require_value(args, i, "--stake");
                stake = Some(Stake::from_name(v).unwrap_or_else(|| {
                    eprintln!("Unknown stake: {v}");
                    process::exit(EXIT_BAD_ARG);
                }));
                i += 2;
            }
            "--data-dir" => {
                data_dir = PathBuf::from(require_value(args, i, "--data-dir"));
                i += 2;
            }
            other => {
                eprintln!("Unknown option for `cart search`: {other}");
                eprintln!("Run `cart search --help` for usage.");
                process::exit(EXIT_BAD_ARG);
            }
        }
    }

    let filter_path = filter_path.unwrap_or_else(|| {
        eprintln!("Missing --filter");
        process::exit(EXIT_BAD_ARG);
    });

    let (filter, text) = load_filter(&filter_path, deck, stake);
    let filter_id = sanitize_filter_id(
        filter.name.as_deref().unwrap_or("filter"),
        filter.deck.name(),
        filter.stake.name(),
    );
    let store = Store::open(&data_dir, &filter_id, filter.should_count()).unwrap_or_else(|e| {
        eprintln!("Cannot open store: {e}");
        process::exit(EXIT_INTERNAL);
    });

    let config = SearchConfig {
        filter_text: text.clone(),
        threads,
        batch_chars,
        start_batch,
        end_batch,
        cutoff,
    };
    let search = Search::new(filter, store, config).unwrap_or_else(|e| {
        eprintln!("Invalid search configuration: {e}");
        process::exit(EXIT_BAD_ARG);
    });

    let token = CancelToken::new();
    {
        let token = token.clone();
        ctrlc::set_handler(move || {
            eprintln!("stopping (checkpoint will be persisted)...");
            token.cancel();
        })
        .unwrap_or_else(|e| {
            eprintln!("Cannot install Ctrl-C handler: {e}");
            process::exit(EXIT_INTERNAL);
        });
    }

    let lattice_total = cart_search::Lattice::new(batch_chars)
        .map(|l| l.batch_count())
        .unwrap_or(0);
    let log = NdjsonWriter::open_append_with_flush(
        data_dir.join(format!("{filter_id}.ndjson")),
        20,
    )
    .ok();
    let mut progress = CliProgress {
        filter_id: filter_id.clone(),
        log,
        total: lattice_total,
        seeds_per_batch: cart_search::Lattice::new(batch_chars)
            .map(|l| l.seeds_per_batch())
            .unwrap_or(0),
        started: std::time::Instant::now(),
        last_print: std::time::Instant::now(),
    };
    if let Some(w) = progress.log.as_mut() {
        let _ = w.write_event(&SearchStartedV1 {
            event: "search_started",
            ts_ms: now_ms(),
            filter_id: filter_id.clone(),
            filter_hash: hash_text(&text),
            deck: search.filter().deck.name().to_string(),
            stake: search.filter().stake.name().to_string(),
            batch_chars,
            start_batch: start_batch.unwrap_or(0),
            end_batch: end_batch.unwrap_or(lattice_total),
            threads,
            resumed: start_batch.is_none(),
        });
        let _ = w.flush();
    }

    let summary = search.run(&token, &mut progress).unwrap_or_else(|e| {
        eprintln!("Search failed: {e}");
        process::exit(EXIT_INTERNAL);
    });

    if let Some(w) = progress.log.as_mut() {
        let _ = w.write_event(&SearchDoneV1 {
            event: "search_done",
            ts_ms: now_ms(),
            filter_id: filter_id.clone(),
            batches_done: summary.batches_done,
            seeds_scanned: summary.seeds_scanned,
            results_emitted: summary.results_emitted,
            cancelled: summary.cancelled,
            elapsed_ms: summary.elapsed_ms,
        });
        let _ = w.flush();
    }

    println!();
    println!(
        "Done. batches={} seeds={} emitted={} pile_hits={} elapsed={}ms",
        summary.batches_done,
        summary.seeds_scanned,
        summary.results_emitted,
        summary.pile_hits,
        summary.elapsed_ms
    );
    match search.store().top(10) {
        Ok(top) if !top.is_empty() => {
            println!("Top seeds:");
            for row in top {
                println!("  {}  score={}", row.seed, row.score);
            }
        }
        Ok(_) => println!("No results."),
        Err(e) => {
            eprintln!("Cannot read results: {e}");
            process::exit(EXIT_INTERNAL);
        }
    }

    if summary.cancelled {
        process::exit(EXIT_CANCELLED);
    }
}

fn cmd_analyze(args: &[String]) {
    let mut seed: Option<String> = None;
    let mut deck = Deck::Red;
    let mut stake = Stake::White;

    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                println!(
                    r#"cart analyze

USAGE:
    cart analyze <SEED> [--deck DECK] [--stake STAKE]

Prints the full per-ante dump (vouchers, tags, boss, shop jokers, packs,
events, erratic deck) as JSON.
"#
                );
                return;
            }
            "--deck" => {
                let v = require_value(args, i, "--deck");
                deck = Deck::from_name(v).unwrap_or_else(|| {
                    eprintln!("Unknown deck: {v}");
                    process::exit(EXIT_BAD_ARG);
                });
                i += 2;
            }
            "--stake" => {
                let v = require_value(args, i, "--stake");
                stake = Stake::from_name(v).unwrap_or_else(|| {
                    eprintln!("Unknown stake: {v}");
                    process::exit(EXIT_BAD_ARG);
                });
                i += 2;
            }
            other if !other.starts_with('-') && seed.is_none() => {
                seed = Some(other.to_string());
                i += 1;
            }
            other => {
                eprintln!("Unknown option for `cart analyze`: {other}");
                process::exit(EXIT_BAD_ARG);
            }
        }
    }

    let raw = seed.unwrap_or_else(|| {
        eprintln!("Missing seed argument");
        process::exit(EXIT_BAD_ARG);
    });
    let seed = Seed::parse(&raw).unwrap_or_else(|e| {
        eprintln!("Invalid seed {raw:?}: {e}");
        process::exit(EXIT_BAD_ARG);
    });

    match analyze(seed, deck, stake) {
        Ok(report) => {
            let json = serde_json::to_string_pretty(&report)
                .expect("analysis reports always serialize");
            println!("{json}");
        }
        Err(e) => {
            eprintln!("Analysis failed: {e}");
            process::exit(EXIT_INTERNAL);
        }
    }
}
