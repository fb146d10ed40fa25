//! Shared test doubles: a scripted in-memory transport and a one-shot loopback server.
#![allow(dead_code)]

use opencloud::api::{
    ClientConfig, HttpRequest, HttpResponse, Transport, TransportError, Universe,
};
use serde_json::Value;
use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

/// Replays queued responses in order and records every request it sees.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, String>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_json(&self, status: u16, body: Value) {
        self.push_response(HttpResponse::new(status, body.to_string()));
    }

    pub fn push_response(&self, response: HttpResponse) {
        self.responses
            .lock()
            .expect("responses lock")
            .push_back(Ok(response));
    }

    pub fn push_failure(&self, message: &str) {
        self.responses
            .lock()
            .expect("responses lock")
            .push_back(Err(message.to_string()));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());
        match self.responses.lock().expect("responses lock").pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(TransportError::new(message)),
            None => Err(TransportError::new("no scripted response left")),
        }
    }
}

pub fn universe_with(config: ClientConfig) -> (Universe, Arc<ScriptedTransport>) {
    let transport = ScriptedTransport::new();
    let universe = Universe::with_transport(config, transport.clone());
    (universe, transport)
}

pub fn test_config() -> ClientConfig {
    ClientConfig::new(4242, "test-key")
        .with_base_url("http://api.test")
        .expect("base url")
}

/// Raw request captured by `LoopbackServer`.
#[derive(Debug)]
pub struct CapturedRequest {
    pub request_line: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Accepts exactly one connection, answers with a canned response, and hands back
/// what it received.
pub struct LoopbackServer {
    pub base_url: String,
    handle: JoinHandle<CapturedRequest>,
}

impl LoopbackServer {
    pub fn respond_once(status_line: &'static str, body: &'static str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
        let addr = listener.local_addr().expect("local addr");
        let handle = std::thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
            let mut request_line = String::new();
            reader.read_line(&mut request_line).expect("request line");

            let mut headers = Vec::new();
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).expect("header line");
                let line = line.trim_end();
                if line.is_empty() {
                    break;
                }
                if let Some((name, value)) = line.split_once(':') {
                    headers.push((name.trim().to_string(), value.trim().to_string()));
                }
            }
            let length = headers
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.parse::<usize>().ok())
                .unwrap_or(0);
            let mut received = vec![0u8; length];
            reader.read_exact(&mut received).expect("body");

            let mut stream = stream;
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).expect("write response");
            stream.flush().expect("flush");

            CapturedRequest {
                request_line: request_line.trim_end().to_string(),
                headers,
                body: received,
            }
        });
        Self {
            base_url: format!("http://{addr}"),
            handle,
        }
    }

    pub fn finish(self) -> CapturedRequest {
        self.handle.join().expect("server thread")
    }
}
