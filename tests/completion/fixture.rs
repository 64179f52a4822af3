use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use flipflop::completion::{CompletionConfig, CredentialRef, ReliabilityConfig, SessionConfig};
use serde_json::{Value, json};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn messages(&self) -> Vec<(String, String)> {
        self.body["messages"]
            .as_array()
            .map(|messages| {
                messages
                    .iter()
                    .map(|message| {
                        (
                            message["role"].as_str().unwrap_or_default().to_string(),
                            message["content"].as_str().unwrap_or_default().to_string(),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_summary_request(&self) -> bool {
        self.messages()
            .first()
            .is_some_and(|(role, content)| role == "system" && content.contains("summariser"))
    }

    pub fn last_user_content(&self) -> String {
        self.messages()
            .into_iter()
            .rev()
            .find(|(role, _)| role == "user")
            .map(|(_, content)| content)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct CannedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub delay: Option<Duration>,
}

impl CannedResponse {
    pub fn reply(text: &str) -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            delay: None,
            body: json!({
                "id": "chatcmpl-fixture",
                "choices": [{ "index": 0, "message": { "role": "assistant", "content": text } }],
                "usage": { "prompt_tokens": 11, "completion_tokens": 7, "total_tokens": 18 }
            })
            .to_string(),
        }
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.to_string(),
            delay: None,
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

type Responder = Arc<dyn Fn(&RecordedRequest) -> CannedResponse + Send + Sync>;

/// Minimal HTTP/1.1 stand-in for an OpenAI-compatible backend. Every connection carries
/// one request and is closed after the reply.
pub struct MockChatServer {
    endpoint: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockChatServer {
    /// Replies with `responses` in arrival order, then 500 once the queue is drained.
    pub async fn with_queue(responses: Vec<CannedResponse>) -> Self {
        let queue = Arc::new(Mutex::new(VecDeque::from(responses)));
        Self::with_responder(move |_request| {
            queue
                .lock()
                .expect("fixture queue lock poisoned")
                .pop_front()
                .unwrap_or_else(|| CannedResponse::status(500, "fixture queue exhausted"))
        })
        .await
    }

    pub async fn with_responder(
        responder: impl Fn(&RecordedRequest) -> CannedResponse + Send + Sync + 'static,
    ) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("fixture listener should bind");
        let addr = listener.local_addr().expect("fixture addr should resolve");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let responder: Responder = Arc::new(responder);

        let recorded = requests.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(handle_connection(
                    stream,
                    recorded.clone(),
                    responder.clone(),
                ));
            }
        });

        Self {
            endpoint: format!("http://{}/v1", addr),
            requests,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .expect("fixture request lock poisoned")
            .clone()
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    recorded: Arc<Mutex<Vec<RecordedRequest>>>,
    responder: Responder,
) {
    let Some(request) = read_request(&mut stream).await else {
        return;
    };
    let response = responder(&request);
    recorded
        .lock()
        .expect("fixture request lock poisoned")
        .push(request);
    if let Some(delay) = response.delay {
        tokio::time::sleep(delay).await;
    }

    let mut head = format!(
        "HTTP/1.1 {} Fixture\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n",
        response.status,
        response.body.len()
    );
    for (name, value) in &response.headers {
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    head.push_str("\r\n");

    let _ = stream.write_all(head.as_bytes()).await;
    let _ = stream.write_all(response.body.as_bytes()).await;
    let _ = stream.shutdown().await;
}

async fn read_request(stream: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 4096];

    let header_end = loop {
        let read = stream.read(&mut chunk).await.ok()?;
        if read == 0 {
            return None;
        }
        buffer.extend_from_slice(&chunk[..read]);
        if let Some(position) = buffer.windows(4).position(|window| window == b"\r\n\r\n") {
            break position + 4;
        }
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let path = lines
        .next()?
        .split_whitespace()
        .nth(1)
        .unwrap_or_default()
        .to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect();
    let content_length = headers
        .iter()
        .find(|(name, _)| name == "content-length")
        .and_then(|(_, value)| value.parse::<usize>().ok())
        .unwrap_or(0);

    while buffer.len() < header_end + content_length {
        let read = stream.read(&mut chunk).await.ok()?;
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);
    }

    let body_end = buffer.len().min(header_end + content_length);
    let body = serde_json::from_slice(&buffer[header_end..body_end]).unwrap_or(Value::Null);
    Some(RecordedRequest {
        path,
        headers,
        body,
    })
}

pub fn completion_config(endpoint: &str) -> CompletionConfig {
    CompletionConfig {
        endpoint: endpoint.to_string(),
        model: "m1".to_string(),
        credential: CredentialRef::None,
        instructions: None,
        request_timeout_ms: 5_000,
        max_output_tokens: None,
        reliability: ReliabilityConfig {
            max_retries: 3,
            backoff_base_ms: 1,
            backoff_max_ms: 5,
        },
        session: SessionConfig::default(),
    }
}
