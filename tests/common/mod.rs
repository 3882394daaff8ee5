//! A tiny HTTP/1.1 server on 127.0.0.1 for exercising the network paths.
//!
//! Every request is recorded. Replies come from a handler closure and always
//! close the connection, so each client call arrives on a fresh socket.

#![allow(dead_code)]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Clone, Debug)]
pub struct Request {
    pub method: String,
    /// Path and query exactly as sent.
    pub target: String,
    /// Header names are lowercased.
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Request {
    pub fn path(&self) -> &str {
        self.target.split('?').next().unwrap_or_default()
    }

    pub fn query(&self) -> Vec<(String, String)> {
        let url = url::Url::parse(&format!("http://fake{}", self.target)).expect("request target");
        url.query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("request body is json")
    }
}

pub struct FakeService {
    port: u16,
    requests: Arc<Mutex<Vec<Request>>>,
}

impl FakeService {
    /// Serve `handler` on an ephemeral port until the test process exits.
    pub fn start<F>(handler: F) -> Self
    where
        F: Fn(&Request) -> (u16, String) + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind fake service");
        let port = listener.local_addr().expect("local addr").port();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = Arc::clone(&requests);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                let Ok(request) = read_request(&mut stream) else {
                    continue;
                };
                let (status, body) = handler(&request);
                recorded.lock().expect("request log").push(request);
                let _ = write_response(&mut stream, status, &body);
            }
        });

        Self { port, requests }
    }

    pub fn url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().expect("request log").clone()
    }
}

fn read_request(stream: &mut TcpStream) -> std::io::Result<Request> {
    let mut reader = BufReader::new(stream.try_clone()?);

    let mut line = String::new();
    reader.read_line(&mut line)?;
    let mut parts = line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default().to_string();

    let mut headers = Vec::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            break;
        }
        if let Some((name, value)) = trimmed.split_once(':') {
            headers.push((name.trim().to_ascii_lowercase(), value.trim().to_string()));
        }
    }

    let header = |name: &str| {
        headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    };
    let mut body = Vec::new();
    if header("transfer-encoding").is_some_and(|v| v.eq_ignore_ascii_case("chunked")) {
        loop {
            line.clear();
            reader.read_line(&mut line)?;
            let size_field = line.trim().split(';').next().unwrap_or_default();
            let size = usize::from_str_radix(size_field, 16).unwrap_or(0);
            if size == 0 {
                line.clear();
                reader.read_line(&mut line)?;
                break;
            }
            let start = body.len();
            body.resize(start + size, 0);
            reader.read_exact(&mut body[start..])?;
            let mut crlf = [0u8; 2];
            reader.read_exact(&mut crlf)?;
        }
    } else if let Some(len) = header("content-length").and_then(|v| v.parse::<usize>().ok()) {
        body.resize(len, 0);
        reader.read_exact(&mut body)?;
    }

    Ok(Request {
        method,
        target,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

fn write_response(stream: &mut TcpStream, status: u16, body: &str) -> std::io::Result<()> {
    let reason = match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    };
    write!(
        stream,
        "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )?;
    stream.flush()
}

pub fn ok(body: serde_json::Value) -> (u16, String) {
    (200, body.to_string())
}

pub fn not_found() -> (u16, String) {
    (404, r#"{"error":{"code":"NotFound","message":"not found"}}"#.to_string())
}

/// Accept every image in a `images/urls` body with status `OK`.
pub fn accept_all(request: &Request) -> (u16, String) {
    let images: Vec<serde_json::Value> = request.json()["images"]
        .as_array()
        .expect("images array")
        .iter()
        .map(|image| serde_json::json!({"sourceUrl": image["url"], "status": "OK"}))
        .collect();
    ok(serde_json::json!({"isBatchSuccessful": true, "images": images}))
}

/// A Custom Vision training service with no projects and no tags yet.
///
/// Creates the project `p-new` on demand and hands out tag ids `t-<name>`.
pub fn empty_training_service(request: &Request) -> (u16, String) {
    let path = request.path();
    match (request.method.as_str(), path) {
        ("GET", p) if p.ends_with("/training/projects") => ok(serde_json::json!([])),
        ("GET", p) if p.ends_with("/training/domains") => ok(serde_json::json!([
            {"id": "dom-cls", "name": "General", "type": "Classification"},
            {"id": "dom-det", "name": "General", "type": "ObjectDetection"}
        ])),
        ("POST", p) if p.ends_with("/training/projects") => {
            let name = request
                .query()
                .into_iter()
                .find(|(k, _)| k == "name")
                .map(|(_, v)| v)
                .unwrap_or_default();
            ok(serde_json::json!({"id": "p-new", "name": name}))
        }
        ("GET", p) if p.ends_with("/projects/p-new/tags") => ok(serde_json::json!([])),
        ("POST", p) if p.ends_with("/projects/p-new/tags") => {
            let name = request
                .query()
                .into_iter()
                .find(|(k, _)| k == "name")
                .map(|(_, v)| v)
                .unwrap_or_default();
            ok(serde_json::json!({"id": format!("t-{name}"), "name": name}))
        }
        ("POST", p) if p.ends_with("/projects/p-new/images/urls") => accept_all(request),
        _ => not_found(),
    }
}
