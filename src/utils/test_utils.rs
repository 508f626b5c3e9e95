//! Test doubles: a throwaway HTTP server for exercising the real transport
//! and a scripted [`Transport`] for the layers above it.

use crate::api::{ChatReply, ChatRequest, KeyIssueRequest, KeyIssueResponse};
use crate::core::error::TransportError;
use crate::core::transport::Transport;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// A request as the test server saw it.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub request_line: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct CannedResponse {
    pub status: u16,
    pub body: String,
}

impl CannedResponse {
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

pub struct TestServer {
    addr: SocketAddr,
    handle: JoinHandle<Result<Vec<CapturedRequest>, String>>,
}

impl TestServer {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Wait until every canned response was served and return what the
    /// server received, in order.
    pub async fn finish(self) -> Vec<CapturedRequest> {
        self.handle
            .await
            .expect("test server task should not panic")
            .expect("test server should serve every response")
    }
}

/// Serve `responses` in order, one connection per request.
pub async fn spawn_http_responder(responses: Vec<CannedResponse>) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let addr = listener.local_addr().expect("local addr should resolve");

    let handle = tokio::spawn(async move {
        let mut captured = Vec::new();
        for canned in responses {
            let (mut stream, _) = listener.accept().await.map_err(|err| err.to_string())?;
            captured.push(read_http_request(&mut stream).await?);

            let response = format!(
                "HTTP/1.1 {} {}\r\ncontent-type: application/json\r\nconnection: close\r\ncontent-length: {}\r\n\r\n{}",
                canned.status,
                reason_phrase(canned.status),
                canned.body.len(),
                canned.body
            );
            stream
                .write_all(response.as_bytes())
                .await
                .map_err(|err| err.to_string())?;
            stream.shutdown().await.map_err(|err| err.to_string())?;
        }
        Ok(captured)
    });

    TestServer { addr, handle }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        401 => "Unauthorized",
        403 => "Forbidden",
        500 => "Internal Server Error",
        _ => "Status",
    }
}

async fn read_http_request(stream: &mut TcpStream) -> Result<CapturedRequest, String> {
    let mut buffer = Vec::new();
    let mut header_end = None;
    while header_end.is_none() {
        let mut chunk = [0_u8; 1024];
        let read = stream
            .read(&mut chunk)
            .await
            .map_err(|err| err.to_string())?;
        if read == 0 {
            return Err("Unexpected EOF while reading HTTP headers".to_string());
        }
        buffer.extend_from_slice(&chunk[..read]);
        header_end = buffer
            .windows(4)
            .position(|window| window == b"\r\n\r\n")
            .map(|index| index + 4);
    }

    let header_end = header_end.unwrap_or(buffer.len());
    let header_text =
        std::str::from_utf8(&buffer[..header_end]).map_err(|err| err.to_string())?;
    let mut lines = header_text.split("\r\n").filter(|line| !line.is_empty());
    let request_line = lines
        .next()
        .ok_or_else(|| "Missing HTTP request line".to_string())?
        .to_string();

    let mut headers = Vec::new();
    let mut content_length = 0_usize;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim().to_string();
        if name.eq_ignore_ascii_case("content-length") {
            content_length = value.parse::<usize>().map_err(|err| err.to_string())?;
        }
        headers.push((name.to_string(), value));
    }

    let mut body = buffer[header_end..].to_vec();
    while body.len() < content_length {
        let mut chunk = vec![0_u8; content_length - body.len()];
        let read = stream
            .read(&mut chunk)
            .await
            .map_err(|err| err.to_string())?;
        if read == 0 {
            return Err("Unexpected EOF while reading HTTP body".to_string());
        }
        body.extend_from_slice(&chunk[..read]);
    }
    body.truncate(content_length);

    Ok(CapturedRequest {
        request_line,
        headers,
        body,
    })
}

/// Scripted backend. Probes succeed only for the accepted master secret;
/// completions are served from a queue in order.
pub struct FakeTransport {
    accepted_master: Option<String>,
    issue_result: Result<KeyIssueResponse, TransportError>,
    issue_delay: Duration,
    completions: Mutex<VecDeque<Result<ChatReply, TransportError>>>,
    complete_delay: Duration,
    probe_calls: AtomicUsize,
    issue_calls: AtomicUsize,
    complete_calls: AtomicUsize,
    issue_requests: Mutex<Vec<KeyIssueRequest>>,
    completion_requests: Mutex<Vec<(String, ChatRequest)>>,
}

impl FakeTransport {
    fn with_master(accepted_master: Option<String>) -> Self {
        Self {
            accepted_master,
            issue_result: Err(TransportError::Network("no key scripted".to_string())),
            issue_delay: Duration::ZERO,
            completions: Mutex::new(VecDeque::new()),
            complete_delay: Duration::ZERO,
            probe_calls: AtomicUsize::new(0),
            issue_calls: AtomicUsize::new(0),
            complete_calls: AtomicUsize::new(0),
            issue_requests: Mutex::new(Vec::new()),
            completion_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn accepting(master: &str) -> Self {
        Self::with_master(Some(master.to_string()))
    }

    pub fn rejecting_all() -> Self {
        Self::with_master(None)
    }

    pub fn with_issued_key(mut self, key: &str, key_id: &str) -> Self {
        self.issue_result = Ok(KeyIssueResponse {
            key: key.to_string(),
            key_id: key_id.to_string(),
        });
        self
    }

    pub fn failing_issuance(mut self, err: TransportError) -> Self {
        self.issue_result = Err(err);
        self
    }

    pub fn with_issue_delay(mut self, delay: Duration) -> Self {
        self.issue_delay = delay;
        self
    }

    pub fn with_completion(self, result: Result<ChatReply, TransportError>) -> Self {
        self.completions
            .lock()
            .expect("completion queue lock")
            .push_back(result);
        self
    }

    pub fn with_reply(self, served_model: &str, text: &str) -> Self {
        self.with_completion(Ok(ChatReply {
            served_model: served_model.to_string(),
            text: text.to_string(),
        }))
    }

    pub fn with_complete_delay(mut self, delay: Duration) -> Self {
        self.complete_delay = delay;
        self
    }

    pub fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }

    pub fn issue_calls(&self) -> usize {
        self.issue_calls.load(Ordering::SeqCst)
    }

    pub fn complete_calls(&self) -> usize {
        self.complete_calls.load(Ordering::SeqCst)
    }

    pub fn last_issue_request(&self) -> Option<KeyIssueRequest> {
        self.issue_requests
            .lock()
            .expect("issue request lock")
            .last()
            .cloned()
    }

    /// Bearer secret and body of the most recent completion call.
    pub fn last_completion(&self) -> Option<(String, ChatRequest)> {
        self.completion_requests
            .lock()
            .expect("completion request lock")
            .last()
            .cloned()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn probe(&self, master_secret: &str) -> Result<(), TransportError> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        match &self.accepted_master {
            Some(accepted) if accepted == master_secret => Ok(()),
            _ => Err(TransportError::Status {
                status: 401,
                detail: "Unauthorized".to_string(),
            }),
        }
    }

    async fn issue_key(
        &self,
        _master_secret: &str,
        request: &KeyIssueRequest,
    ) -> Result<KeyIssueResponse, TransportError> {
        self.issue_calls.fetch_add(1, Ordering::SeqCst);
        self.issue_requests
            .lock()
            .expect("issue request lock")
            .push(request.clone());
        if !self.issue_delay.is_zero() {
            tokio::time::sleep(self.issue_delay).await;
        }
        self.issue_result.clone()
    }

    async fn complete(
        &self,
        api_secret: &str,
        request: &ChatRequest,
    ) -> Result<ChatReply, TransportError> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        self.completion_requests
            .lock()
            .expect("completion request lock")
            .push((api_secret.to_string(), request.clone()));
        if !self.complete_delay.is_zero() {
            tokio::time::sleep(self.complete_delay).await;
        }
        self.completions
            .lock()
            .expect("completion queue lock")
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Network("no completion scripted".to_string())))
    }
}
