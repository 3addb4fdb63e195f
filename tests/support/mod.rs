#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Notify};
use zimage_client::*;

pub fn task(id: &str, status: TaskStatus, progress: i64, result: Option<&str>) -> Task {
    Task {
        id: id.to_string(),
        prompt: format!("prompt for {}", id),
        width: 1024,
        height: 1024,
        seed: 42,
        status,
        progress,
        current_step: None,
        result_url: result.map(str::to_string),
        error_msg: None,
        created_at: "2025-12-12T10:00:00".to_string(),
        prompt_id: None,
    }
}

pub fn completed(id: &str) -> Task {
    task(
        id,
        TaskStatus::Completed,
        100,
        Some(&format!("https://img.example/{}.png", id)),
    )
}

pub fn failed(id: &str, message: Option<&str>) -> Task {
    let mut t = task(id, TaskStatus::Failed, 30, None);
    t.error_msg = message.map(str::to_string);
    t
}

/// Task server fake driven by a script of `get_task` responses.
///
/// The last scripted response repeats once the script runs out.
#[derive(Default)]
pub struct ScriptedTasks {
    script: Mutex<VecDeque<Task>>,
    history: Vec<Task>,
    pub fetches: AtomicUsize,
    pub created: Mutex<Vec<TaskCreate>>,
    pub history_calls: Mutex<Vec<(usize, usize)>>,
}

impl ScriptedTasks {
    pub fn new(script: Vec<Task>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Default::default()
        }
    }

    pub fn with_history(history: Vec<Task>) -> Self {
        Self {
            history,
            ..Default::default()
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn history_calls(&self) -> Vec<(usize, usize)> {
        self.history_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskApi for ScriptedTasks {
    async fn create_task(&self, request: &TaskCreate) -> Result<Task> {
        self.created.lock().unwrap().push(request.clone());
        let mut t = task("created", TaskStatus::Queued, 0, None);
        if let Some(first) = self.script.lock().unwrap().front() {
            t.id = first.id.clone();
        }
        t.prompt = request.prompt.clone();
        Ok(t)
    }

    async fn get_task(&self, id: &str) -> Result<Task> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        let next = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };
        next.ok_or_else(|| GenError::Request {
            status: 404,
            body: format!("task {} not found", id),
        })
    }

    async fn list_history(&self, limit: usize, offset: usize) -> Result<Vec<Task>> {
        self.history_calls.lock().unwrap().push((limit, offset));
        Ok(self.history.iter().skip(offset).take(limit).cloned().collect())
    }
}

/// History fake whose `list_history` waits for `gate` before answering.
pub struct GatedHistory {
    pub inner: ScriptedTasks,
    pub gate: Notify,
}

impl GatedHistory {
    pub fn new(history: Vec<Task>) -> Self {
        Self {
            inner: ScriptedTasks::with_history(history),
            gate: Notify::new(),
        }
    }
}

#[async_trait]
impl TaskApi for GatedHistory {
    async fn create_task(&self, request: &TaskCreate) -> Result<Task> {
        self.inner.create_task(request).await
    }

    async fn get_task(&self, id: &str) -> Result<Task> {
        self.inner.get_task(id).await
    }

    async fn list_history(&self, limit: usize, offset: usize) -> Result<Vec<Task>> {
        self.gate.notified().await;
        self.inner.list_history(limit, offset).await
    }
}

/// In-memory store whose saves can be switched to fail like a full disk.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    pub failing: AtomicBool,
}

impl FlakyStore {
    pub fn failing() -> Self {
        let store = Self::default();
        store.fail_saves(true);
        store
    }

    pub fn fail_saves(&self, fail: bool) {
        self.failing.store(fail, Ordering::SeqCst);
    }
}

impl ImageStore for FlakyStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        self.inner.load(key)
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(GenError::Storage {
                key: key.to_string(),
                source: std::io::Error::other("disk full"),
            });
        }
        self.inner.save(key, value)
    }
}

/// A request captured by [`serve`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

pub struct MockServer {
    pub url: String,
    requests: mpsc::UnboundedReceiver<RecordedRequest>,
}

impl MockServer {
    pub async fn next_request(&mut self) -> RecordedRequest {
        self.requests.recv().await.expect("server closed without a request")
    }
}

/// Serve the given `(status, body)` responses, one connection each, in order.
pub async fn serve(responses: Vec<(u16, &str)>) -> MockServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let (tx, rx) = mpsc::unbounded_channel();
    let responses: Vec<(u16, String)> = responses
        .into_iter()
        .map(|(status, body)| (status, body.to_string()))
        .collect();

    tokio::spawn(async move {
        for (status, body) in responses {
            let (mut socket, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => return,
            };
            let request = read_request(&mut socket).await;
            let _ = tx.send(request);
            let response = format!(
                "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                if status < 400 { "OK" } else { "Error" },
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    MockServer { url, requests: rx }
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> RecordedRequest {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break buf.len();
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    let body_start = (header_end + 4).min(buf.len());
    let mut body = buf[body_start..].to_vec();
    while body.len() < content_length {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    RecordedRequest {
        method,
        path,
        headers,
        body: String::from_utf8_lossy(&body).to_string(),
    }
}
