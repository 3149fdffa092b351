//! Minimal HTTP/1.1 JSON API for integration tests.
//!
//! Serves `/v0/item/{id}.json`, `/v0/user/{name}.json` and
//! `/v0/maxitem.json`. Unknown records are answered with the literal body
//! `null`. Every response closes its connection. The server counts requests
//! and the peak number of requests being handled at once, and can drop
//! connections or answer 500 to exercise retries.

use std::collections::{HashMap, HashSet};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct ApiServerOptions {
    /// Close the connection without answering for this many record requests.
    pub drop_first: u32,
    /// Item ids that always get HTTP 500.
    pub fail_ids: HashSet<u64>,
    /// Pause before answering, so overlapping requests are observable.
    pub delay: Duration,
}

#[derive(Default)]
struct State {
    items: HashMap<u64, String>,
    users: HashMap<String, String>,
    max_item: u64,
    requests: AtomicU64,
    active: AtomicUsize,
    peak: AtomicUsize,
    drops_left: AtomicU32,
}

/// Handle to a running server. The server lives until the test process exits.
pub struct ApiServer {
    base: String,
    state: Arc<State>,
}

/// JSON text of item `id` as the API would serve it (`time` = 1.5e9 + id).
pub fn item_json(id: u64) -> String {
    format!(
        "{{\"by\":\"user{}\",\"id\":{},\"text\":\"comment {} with {{braces}}\",\"time\":{},\"type\":\"comment\"}}",
        id % 13,
        id,
        id,
        item_time(id)
    )
}

pub fn item_time(id: u64) -> u64 {
    1_500_000_000 + id
}

pub fn user_json(name: &str, created: u64) -> String {
    format!("{{\"about\":\"\",\"created\":{},\"id\":\"{}\",\"karma\":1}}", created, name)
}

impl ApiServer {
    /// Items for every id in `ids`, highest id as `maxitem`, no users.
    pub fn items(ids: impl IntoIterator<Item = u64>, opts: ApiServerOptions) -> Self {
        let items: HashMap<u64, String> = ids.into_iter().map(|id| (id, item_json(id))).collect();
        let max_item = items.keys().copied().max().unwrap_or(0);
        Self::start(items, HashMap::new(), max_item, opts)
    }

    /// Users with the given `created` times.
    pub fn users(users: &[(&str, u64)], opts: ApiServerOptions) -> Self {
        let users = users
            .iter()
            .map(|(name, created)| (name.to_string(), user_json(name, *created)))
            .collect();
        Self::start(HashMap::new(), users, 0, opts)
    }

    fn start(
        items: HashMap<u64, String>,
        users: HashMap<String, String>,
        max_item: u64,
        opts: ApiServerOptions,
    ) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let state = Arc::new(State {
            items,
            users,
            max_item,
            drops_left: AtomicU32::new(opts.drop_first),
            ..Default::default()
        });
        let shared = Arc::clone(&state);
        let opts = Arc::new(opts);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let state = Arc::clone(&shared);
                let opts = Arc::clone(&opts);
                thread::spawn(move || handle(stream, &state, &opts));
            }
        });
        Self {
            base: format!("http://127.0.0.1:{}/v0/", port),
            state,
        }
    }

    /// API root, e.g. `http://127.0.0.1:12345/v0/`.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Record and maxitem requests received so far (including dropped ones).
    pub fn requests(&self) -> u64 {
        self.state.requests.load(Ordering::SeqCst)
    }

    /// Most requests handled at the same moment.
    pub fn peak_concurrency(&self) -> usize {
        self.state.peak.load(Ordering::SeqCst)
    }
}

fn handle(mut stream: TcpStream, state: &State, opts: &ApiServerOptions) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 4096];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let Ok(request) = std::str::from_utf8(&buf[..n]) else {
        return;
    };
    let path = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("")
        .to_string();

    state.requests.fetch_add(1, Ordering::SeqCst);
    let now = state.active.fetch_add(1, Ordering::SeqCst) + 1;
    state.peak.fetch_max(now, Ordering::SeqCst);
    if !opts.delay.is_zero() {
        thread::sleep(opts.delay);
    }

    let dropped = path != "/v0/maxitem.json"
        && state
            .drops_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
    if !dropped {
        let (status, body) = route(&path, state, opts);
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status,
            body.len()
        );
        let _ = stream.write_all(response.as_bytes());
        let _ = stream.write_all(body.as_bytes());
    }
    state.active.fetch_sub(1, Ordering::SeqCst);
}

fn route(path: &str, state: &State, opts: &ApiServerOptions) -> (&'static str, String) {
    if path == "/v0/maxitem.json" {
        return ("200 OK", state.max_item.to_string());
    }
    if let Some(id) = path
        .strip_prefix("/v0/item/")
        .and_then(|rest| rest.strip_suffix(".json"))
        .and_then(|id| id.parse::<u64>().ok())
    {
        if opts.fail_ids.contains(&id) {
            return ("500 Internal Server Error", "{\"error\":\"boom\"}".to_string());
        }
        let body = state.items.get(&id).cloned().unwrap_or_else(|| "null".to_string());
        return ("200 OK", body);
    }
    if let Some(name) = path
        .strip_prefix("/v0/user/")
        .and_then(|rest| rest.strip_suffix(".json"))
    {
        let body = state.users.get(name).cloned().unwrap_or_else(|| "null".to_string());
        return ("200 OK", body);
    }
    ("404 Not Found", "{\"error\":\"Permission denied\"}".to_string())
}
