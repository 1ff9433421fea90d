#![allow(dead_code)]

use std::time::Duration;

use rawhttp::http::request::Request;
use rawhttp::http::response::Response;
use rawhttp::http::router::Router;
use tokio::io::{AsyncRead, AsyncReadExt};

/// A response as seen on the wire.
#[derive(Debug)]
pub struct RawResponse {
    pub status: u16,
    pub head: String,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.split("\r\n").skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim())
        })
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Reads exactly one response, byte by byte through the head so that a
/// following response stays unread.
pub async fn read_response<S: AsyncRead + Unpin>(stream: &mut S) -> RawResponse {
    let mut response = read_response_head(stream).await;
    let len: usize = response.header("Content-Length").unwrap().parse().unwrap();
    response.body = vec![0; len];
    stream.read_exact(&mut response.body).await.unwrap();
    response
}

/// Reads a status line and headers only, as sent in reply to HEAD.
pub async fn read_response_head<S: AsyncRead + Unpin>(stream: &mut S) -> RawResponse {
    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        let n = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut byte))
            .await
            .expect("timed out waiting for response")
            .unwrap();
        assert!(n > 0, "connection closed mid-response: {:?}", String::from_utf8_lossy(&head));
        head.push(byte[0]);
    }

    let head = String::from_utf8(head).unwrap();
    let status = head.split(' ').nth(1).unwrap().parse().unwrap();

    RawResponse {
        status,
        head,
        body: Vec::new(),
    }
}

/// Asserts the peer has closed its side.
pub async fn assert_closed<S: AsyncRead + Unpin>(stream: &mut S) {
    let mut byte = [0u8; 1];
    let n = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut byte))
        .await
        .expect("connection was not closed")
        .unwrap_or(0);
    assert_eq!(n, 0, "unexpected data after close");
}

pub fn demo_router() -> Router {
    let mut router = Router::new();
    router
        .get("/ping", |_req: Request| Response::ok("pong"))
        .get("/users/:id", |req: Request| {
            Response::ok(format!("user {}", req.param("id").unwrap_or_default()))
        })
        .get("/search", |req: Request| {
            Response::ok(req.query.get("q").cloned().unwrap_or_default())
        })
        .get("/panic", |_req: Request| -> Response { panic!("boom") })
        .post("/echo", |req: Request| Response::ok(req.raw_body))
        .post("/form", |req: Request| {
            Response::ok(req.body.get("name").cloned().unwrap_or_default())
        });
    router
}
