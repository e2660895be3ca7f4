// SPDX-FileCopyrightText: 2025 RAprogramm
// SPDX-License-Identifier: MIT

#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering}
    },
    time::Duration
};

use async_trait::async_trait;
use sql_query_generator::{
    error::{AppResult, warehouse_error},
    warehouse::{QualifiedName, ResultSet, Warehouse}
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream}
};

/// In-memory warehouse with call counters.
#[derive(Default)]
pub struct FakeWarehouse {
    pub tables:         HashMap<QualifiedName, String>,
    pub describe_error: Option<String>,
    pub execute_result: Option<Result<ResultSet, String>>,
    pub describe_calls: AtomicUsize,
    pub execute_calls:  AtomicUsize,
    pub executed:       Mutex<Vec<String>>
}

impl FakeWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, schema: &str, table: &str, ddl: &str) -> Self {
        self.tables
            .insert(QualifiedName::new(schema, table), ddl.to_string());
        self
    }

    pub fn failing_describe(mut self, message: &str) -> Self {
        self.describe_error = Some(message.to_string());
        self
    }

    pub fn returning(mut self, result: ResultSet) -> Self {
        self.execute_result = Some(Ok(result));
        self
    }

    pub fn failing_execute(mut self, message: &str) -> Self {
        self.execute_result = Some(Err(message.to_string()));
        self
    }

    pub fn describe_count(&self) -> usize {
        self.describe_calls.load(Ordering::SeqCst)
    }

    pub fn execute_count(&self) -> usize {
        self.execute_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Warehouse for FakeWarehouse {
    async fn describe(&self, name: &QualifiedName) -> AppResult<Option<String>> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.describe_error {
            return Err(warehouse_error(message));
        }
        Ok(self.tables.get(name).cloned())
    }

    async fn execute(&self, sql: &str) -> AppResult<ResultSet> {
        self.execute_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut executed) = self.executed.lock() {
            executed.push(sql.to_string());
        }
        match &self.execute_result {
            Some(Ok(result)) => Ok(result.clone()),
            Some(Err(message)) => Err(warehouse_error(message)),
            None => Ok(ResultSet::default())
        }
    }

    async fn list_tables(&self, schema: &str) -> AppResult<Vec<String>> {
        let mut names: Vec<String> = self
            .tables
            .keys()
            .filter(|name| name.schema == schema)
            .map(|name| name.table.clone())
            .collect();
        names.sort();
        Ok(names)
    }
}

/// Canned HTTP response; body parts are written with a pause in between so
/// the client sees them as separate reads.
pub struct MockResponse {
    pub status:     u16,
    pub body_parts: Vec<String>
}

impl MockResponse {
    pub fn ok(body: &str) -> Self {
        Self::status(200, body)
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self {
            status,
            body_parts: vec![body.to_string()]
        }
    }

    pub fn chunks(parts: &[&str]) -> Self {
        Self {
            status:     200,
            body_parts: parts.iter().map(|p| p.to_string()).collect()
        }
    }
}

/// Loopback HTTP/1.1 responder serving one canned response per connection.
pub struct MockServer {
    pub url:  String,
    requests: Arc<Mutex<Vec<String>>>
}

impl MockServer {
    pub async fn start(responses: Vec<MockResponse>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);
        tokio::spawn(async move {
            for response in responses {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let body = read_request(&mut socket).await;
                recorded.lock().unwrap().push(body);
                write_response(&mut socket, response).await;
            }
        });
        Self {
            url,
            requests
        }
    }

    /// Request bodies received so far
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// URL of a port nothing listens on
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    url
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            return String::new();
        }
        buf.extend_from_slice(&chunk[..n]);
        let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let headers = String::from_utf8_lossy(&buf[..end]).to_lowercase();
        let length = headers
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        let body_start = end + 4;
        if buf.len() >= body_start + length {
            return String::from_utf8_lossy(&buf[body_start..body_start + length]).into_owned();
        }
    }
}

async fn write_response(socket: &mut TcpStream, response: MockResponse) {
    let reason = match response.status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        429 => "Too Many Requests",
        _ => "Internal Server Error"
    };
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nConnection: close\r\n\r\n",
        response.status, reason
    );
    let _ = socket.write_all(head.as_bytes()).await;
    for part in response.body_parts {
        let _ = socket.write_all(part.as_bytes()).await;
        let _ = socket.flush().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let _ = socket.shutdown().await;
}
