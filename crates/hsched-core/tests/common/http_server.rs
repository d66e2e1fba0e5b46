//! Minimal HTTP/1.1 server for integration tests.
//!
//! Every response carries `Connection: close`. Routes:
//! - `/hello`: 200 with body `hello` and `X-Route: hello`
//! - `/redirect`: 302 to `/hello` with `X-Hop: first`
//! - `/echo`: echoes the request body; request `Content-Type` comes back
//!   as `X-Echo-Type`
//! - `/pragma`: echoes the request `Pragma` header as `X-Echo-Pragma`
//! - `/encoding`: echoes the request `Accept-Encoding` as `X-Echo-Encoding`
//! - `/slow`: like `/hello` after a 100 ms pause
//! - anything else: 404

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

/// Starts a server in a background thread. Returns the base URL
/// (e.g. "http://127.0.0.1:12345"). The server runs until the process exits.
pub fn start() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            thread::spawn(move || handle(stream));
        }
    });
    format!("http://127.0.0.1:{}", port)
}

/// A base URL nothing listens on.
pub fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

struct Parsed {
    method: String,
    path: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Parsed {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

fn handle(mut stream: TcpStream) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let req = match read_request(&mut stream) {
        Some(r) => r,
        None => return,
    };
    let is_head = req.method.eq_ignore_ascii_case("HEAD");
    let (status, extra, body): (&str, String, Vec<u8>) = match req.path.as_str() {
        "/hello" => ("200 OK", "X-Route: hello\r\n".to_string(), b"hello".to_vec()),
        "/redirect" => (
            "302 Found",
            "Location: /hello\r\nX-Hop: first\r\n".to_string(),
            Vec::new(),
        ),
        "/echo" => {
            let extra = match req.header("content-type") {
                Some(t) => format!("X-Echo-Type: {}\r\n", t),
                None => String::new(),
            };
            ("200 OK", extra, req.body.clone())
        }
        "/pragma" => {
            let extra = match req.header("pragma") {
                Some(p) => format!("X-Echo-Pragma: {}\r\n", p),
                None => String::new(),
            };
            ("200 OK", extra, Vec::new())
        }
        "/encoding" => {
            let extra = match req.header("accept-encoding") {
                Some(e) => format!("X-Echo-Encoding: {}\r\n", e),
                None => String::new(),
            };
            ("200 OK", extra, Vec::new())
        }
        "/slow" => {
            thread::sleep(Duration::from_millis(100));
            ("200 OK", "X-Route: slow\r\n".to_string(), b"hello".to_vec())
        }
        _ => ("404 Not Found", String::new(), Vec::new()),
    };
    let head = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n{}\r\n",
        status,
        body.len(),
        extra
    );
    let _ = stream.write_all(head.as_bytes());
    if !is_head {
        let _ = stream.write_all(&body);
    }
}

fn read_request(stream: &mut TcpStream) -> Option<Parsed> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos;
        }
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };
    let head = std::str::from_utf8(&buf[..header_end]).ok()?;
    let mut lines = head.split("\r\n");
    let mut start = lines.next()?.split_whitespace();
    let method = start.next()?.to_string();
    let path = start.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(n, v)| (n.trim().to_string(), v.trim().to_string()))
        .collect();

    let mut body = buf[header_end + 4..].to_vec();
    let want = headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    while body.len() < want {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }
    Some(Parsed {
        method,
        path,
        headers,
        body,
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
