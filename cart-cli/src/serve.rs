//! Minimal HTTP front end.
//!
//! Deliberately small: a single accept loop, hand-rolled HTTP/1.1 framing
//! with Content-Length bodies, JSON in and out, connection-per-request. At
//! most one search runs at a time; starting a new one stops and drains the
//! old one first (the engine saturates the CPU, overlap buys nothing).
//!
//! Endpoints:
//! - POST /search        { "filterText": "..." }
//! - GET  /search?id=s1
//! - POST /search/stop   { "searchId": "s1" }
//! - POST /analyze       { "seed": "...", "deck": "...", "stake": "..." }

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use cart_core::{analyze, Deck, Seed, Stake};
use cart_filter::{compile, DocFormat, FilterDoc};
use cart_search::{CancelToken, CutoffMode, Lattice, Search, SearchConfig, SearchProgress};
use cart_store::{sanitize_filter_id, Store};
use serde_json::{json, Value};

use crate::{EXIT_BAD_ARG, EXIT_INTERNAL};

const DEFAULT_PORT: u16 = 8911;
const SERVE_BATCH_CHARS: u8 = 4;

struct Current {
    id: String,
    filter_id: String,
    filter_text: String,
    tally_len: usize,
    columns: Vec<String>,
    cancel: CancelToken,
    done: Arc<AtomicBool>,
    batches_done: Arc<AtomicU64>,
    batches_total: u64,
    seeds_per_batch: u64,
    started: Instant,
    handle: Option<std::thread::JoinHandle<()>>,
}

struct ServerState {
    data_dir: PathBuf,
    threads: usize,
    next_id: u64,
    current: Option<Current>,
}

impl ServerState {
    /// Cancel and drain whatever is running.
    fn stop_running(&mut self) {
        if let Some(mut cur) = self.current.take() {
            cur.cancel.cancel();
            if let Some(handle) = cur.handle.take() {
                let _ = handle.join();
            }
        }
    }
}

struct ServeProgress {
    batches_done: Arc<AtomicU64>,
}

impl SearchProgress for ServeProgress {
    fn on_batch_done(&mut self, completed: u64, _total: u64, _checkpoint: i64) {
        self.batches_done.store(completed, Ordering::Relaxed);
    }
}

struct SilentProgress;
impl SearchProgress for SilentProgress {}

pub fn cmd_serve(args: &[String]) {
    let mut host = "127.0.0.1".to_string();
    let mut port = DEFAULT_PORT;
    let mut threads: usize = 0;
    let mut data_dir = PathBuf::from("cart-data");

    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                println!(
                    r#"cart serve

USAGE:
    cart serve [--host H] [--port P] [--threads N] [--data-dir DIR]

OPTIONS:
    --host H        Bind address (default: 127.0.0.1)
    --port P        Port (default: {DEFAULT_PORT})
    --threads N     Worker threads per search (default: hardware parallelism)
    --data-dir DIR  Where search state lives (default: cart-data)
"#
                );
                return;
            }
            "--host" => {
                host = crate::require_value(args, i, "--host").to_string();
                i += 2;
            }
            "--port" => {
                port = crate::parse_or_exit(crate::require_value(args, i, "--port"), "--port");
                i += 2;
            }
            "--threads" => {
                threads =
                    crate::parse_or_exit(crate::require_value(args, i, "--threads"), "--threads");
                i += 2;
            }
            "--data-dir" => {
                data_dir = PathBuf::from(crate::require_value(args, i, "--data-dir"));
                i += 2;
            }
            other => {
                eprintln!("Unknown option for `cart serve`: {other}");
                process::exit(EXIT_BAD_ARG);
            }
        }
    }

    let listener = TcpListener::bind((host.as_str(), port)).unwrap_or_else(|e| {
        eprintln!("Cannot bind {host}:{port}: {e}");
        process::exit(EXIT_INTERNAL);
    });
    println!("cart serve listening on http://{host}:{port}");

    let state = Arc::new(Mutex::new(ServerState {
        data_dir,
        threads,
        next_id: 0,
        current: None,
    }));

    {
        let state = Arc::clone(&state);
        ctrlc::set_handler(move || {
            state.lock().expect("server state lock").stop_running();
            process::exit(0);
        })
        .expect("Ctrl-C handler installs once");
    }

    for stream in listener.incoming() {
        match stream {
            Ok(conn) => {
                if let Err(e) = handle_conn(conn, &state) {
                    eprintln!("connection error: {e}");
                }
            }
            Err(e) => eprintln!("accept error: {e}"),
        }
    }
}

struct Request {
    method: String,
    path: String,
    query: Option<String>,
    body: Vec<u8>,
}

fn handle_conn(mut conn: TcpStream, state: &Arc<Mutex<ServerState>>) -> std::io::Result<()> {
    let req = match read_request(&mut conn)? {
        Some(req) => req,
        None => return Ok(()),
    };

    let (status, body) = match (req.method.as_str(), req.path.as_str()) {
        ("POST", "/search") => post_search(&req.body, state),
        ("GET", "/search") => get_search(req.query.as_deref(), state),
        ("POST", "/search/stop") => post_stop(&req.body, state),
        ("POST", "/analyze") => post_analyze(&req.body),
        _ => (404, json!({ "error": "not found" })),
    };
    respond_json(&mut conn, status, &body)
}

fn post_search(body: &[u8], state: &Arc<Mutex<ServerState>>) -> (u16, Value) {
    let parsed: Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => return (400, json!({ "error": format!("bad json: {e}") })),
    };
    let Some(filter_text) = parsed.get("filterText").and_then(Value::as_str) else {
        return (400, json!({ "error": "filterText is required" }));
    };

    let doc = match FilterDoc::from_str(filter_text, DocFormat::Json) {
        Ok(d) => d,
        Err(e) => return (400, json!({ "error": e.to_string() })),
    };
    let filter = match compile(&doc) {
        Ok(f) => f,
        Err(e) => return (400, json!({ "error": e.to_string() })),
    };

    let mut st = state.lock().expect("server state lock");
    st.stop_running();

    let filter_id = sanitize_filter_id(
        filter.name.as_deref().unwrap_or("filter"),
        filter.deck.name(),
        filter.stake.name(),
    );
    let tally_len = filter.should_count();
    let columns = filter.columns.clone();

    // Synchronous pile replay: the response carries the instant hits.
    let pile_hits = {
        let store = match Store::open(&st.data_dir, &filter_id, tally_len) {
            Ok(s) => s,
            Err(e) => return (500, json!({ "error": e.to_string() })),
        };
        let pre = match compile(&doc).and_then(|f| {
            Search::new(
                f,
                store,
                SearchConfig {
                    filter_text: filter_text.to_string(),
                    threads: 1,
                    batch_chars: SERVE_BATCH_CHARS,
                    start_batch: Some(0),
                    end_batch: Some(0),
                    cutoff: CutoffMode::Fixed(0),
                },
            )
            .map_err(|e| cart_filter::FilterError::Parse(e.to_string()))
        }) {
            Ok(s) => s,
            Err(e) => return (500, json!({ "error": e.to_string() })),
        };
        match pre.run(&CancelToken::new(), &mut SilentProgress) {
            Ok(summary) => summary.pile_hits,
            Err(e) => return (500, json!({ "error": e.to_string() })),
        }
    };

    // Background enumeration.
    let store = match Store::open(&st.data_dir, &filter_id, tally_len) {
        Ok(s) => s,
        Err(e) => return (500, json!({ "error": e.to_string() })),
    };
    let search = match Search::new(
        filter,
        store,
        SearchConfig {
            filter_text: filter_text.to_string(),
            threads: st.threads,
            batch_chars: SERVE_BATCH_CHARS,
            start_batch: None,
            end_batch: None,
            cutoff: CutoffMode::Auto,
        },
    ) {
        Ok(s) => s,
        Err(e) => return (500, json!({ "error": e.to_string() })),
    };

    st.next_id += 1;
    let id = format!("s{}", st.next_id);
    let cancel = CancelToken::new();
    let done = Arc::new(AtomicBool::new(false));
    let batches_done = Arc::new(AtomicU64::new(0));
    let lattice = Lattice::new(SERVE_BATCH_CHARS).expect("serve batch chars are valid");

    let handle = {
        let cancel = cancel.clone();
        let done = Arc::clone(&done);
        let batches_done = Arc::clone(&batches_done);
        std::thread::spawn(move || {
            let mut progress = ServeProgress { batches_done };
            if let Err(e) = search.run(&cancel, &mut progress) {
                eprintln!("search failed: {e}");
            }
            done.store(true, Ordering::Relaxed);
        })
    };

    let results = read_results(&st.data_dir, &filter_id, tally_len);
    st.current = Some(Current {
        id: id.clone(),
        filter_id,
        filter_text: filter_text.to_string(),
        tally_len,
        columns,
        cancel,
        done,
        batches_done,
        batches_total: lattice.batch_count(),
        seeds_per_batch: lattice.seeds_per_batch(),
        started: Instant::now(),
        handle: Some(handle),
    });

    (
        200,
        json!({ "searchId": id, "pileHits": pile_hits, "results": results }),
    )
}

fn get_search(query: Option<&str>, state: &Arc<Mutex<ServerState>>) -> (u16, Value) {
    let id = query
        .and_then(|q| {
            q.split('&')
                .find_map(|kv| kv.strip_prefix("id="))
                .map(str::to_string)
        })
        .unwrap_or_default();
    let st = state.lock().expect("server state lock");
    let Some(cur) = st.current.as_ref().filter(|c| c.id == id) else {
        return (404, json!({ "error": "no such search" }));
    };

    let running = !cur.done.load(Ordering::Relaxed);
    let batches = cur.batches_done.load(Ordering::Relaxed);
    let elapsed = cur.started.elapsed().as_secs_f64();
    let speed = if elapsed > 0.0 {
        (batches as f64 * cur.seeds_per_batch as f64 / elapsed) as u64
    } else {
        0
    };
    let results = read_results(&st.data_dir, &cur.filter_id, cur.tally_len);
    (
        200,
        json!({
            "searchId": cur.id,
            "running": running,
            "batchesDone": batches,
            "batchesTotal": cur.batches_total,
            "seedsPerSecond": speed,
            "columns": cur.columns,
            "results": results,
            "filterText": cur.filter_text,
        }),
    )
}

fn post_stop(body: &[u8], state: &Arc<Mutex<ServerState>>) -> (u16, Value) {
    let parsed: Value = serde_json::from_slice(body).unwrap_or(Value::Null);
    let id = parsed
        .get("searchId")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let mut st = state.lock().expect("server state lock");
    let matches = st.current.as_ref().is_some_and(|c| c.id == id);
    if matches {
        st.stop_running();
        (200, json!({ "stopped": true }))
    } else {
        (404, json!({ "error": "no such search" }))
    }
}

fn post_analyze(body: &[u8]) -> (u16, Value) {
    let parsed: Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => return (400, json!({ "error": format!("bad json: {e}") })),
    };
    let Some(raw_seed) = parsed.get("seed").and_then(Value::as_str) else {
        return (400, json!({ "error": "seed is required" }));
    };
    let seed = match Seed::parse(raw_seed) {
        Ok(s) => s,
        Err(e) => return (400, json!({ "error": e.to_string() })),
    };
    let deck = match parsed.get("deck").and_then(Value::as_str) {
        Some(d) => match Deck::from_name(d) {
            Some(d) => d,
            None => return (400, json!({ "error": format!("unknown deck {d:?}") })),
        },
        None => Deck::Red,
    };
    let stake = match parsed.get("stake").and_then(Value::as_str) {
        Some(s) => match Stake::from_name(s) {
            Some(s) => s,
            None => return (400, json!({ "error": format!("unknown stake {s:?}") })),
        },
        None => Stake::White,
    };
    match analyze(seed, deck, stake) {
        Ok(report) => match serde_json::to_value(&report) {
            Ok(v) => (200, v),
            Err(e) => (500, json!({ "error": e.to_string() })),
        },
        Err(e) => (500, json!({ "error": e.to_string() })),
    }
}

fn read_results(data_dir: &std::path::Path, filter_id: &str, tally_len: usize) -> Value {
    // A fresh read-only connection; WAL keeps readers out of the writers'
    // way.
    match Store::open(data_dir, filter_id, tally_len).and_then(|s| s.top(1000)) {
        Ok(rows) => Value::Array(
            rows.into_iter()
                .map(|r| {
                    json!({
                        "seed": r.seed.as_str(),
                        "score": r.score,
                        "tally": r.tally,
                    })
                })
                .collect(),
        ),
        Err(_) => Value::Array(Vec::new()),
    }
}

fn read_request(conn: &mut TcpStream) -> std::io::Result<Option<Request>> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let header_end = loop {
        let n = conn.read(&mut chunk)?;
        if n == 0 {
            return Ok(None);
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find_header_end(&buf) {
            break pos;
        }
        if buf.len() > 64 * 1024 {
            return Ok(None);
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.lines();
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default();
    let (path, query) = match target.split_once('?') {
        Some((p, q)) => (p.to_string(), Some(q.to_string())),
        None => (target.to_string(), None),
    };

    let mut content_length = 0usize;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
    }

    let mut body = buf[header_end + 4..].to_vec();
    while body.len() < content_length {
        let n = conn.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(content_length);

    Ok(Some(Request {
        method,
        path,
        query,
        body,
    }))
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn respond_json(conn: &mut TcpStream, status: u16, body: &Value) -> std::io::Result<()> {
    let reason = match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        _ => "Internal Server Error",
    };
    let payload = body.to_string();
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{payload}",
        payload.len()
    );
    conn.write_all(response.as_bytes())
}
