use rawhttp::http::parser::parse_head;
use rawhttp::http::request::{detect_browser, Method, Request, RequestBuilder};

fn request_from(head: &[u8], body: &[u8]) -> Request {
    Request::from_parts(parse_head(head).unwrap(), body.to_vec())
}

#[test]
fn test_request_header_retrieval() {
    let req = RequestBuilder::new()
        .method(Method::GET)
        .path("/")
        .header("Host", "example.com")
        .header("Content-Type", "application/json")
        .build()
        .unwrap();

    assert_eq!(req.header("Host"), Some("example.com"));
    assert_eq!(req.header("host"), Some("example.com"));
    assert_eq!(req.content_type(), Some("application/json"));
    assert_eq!(req.header("Missing"), None);
}

#[test]
fn test_headers_keep_received_names() {
    let req = request_from(b"GET / HTTP/1.1\r\nX-Trace-Id: abc\r\nHost: a", b"");

    assert!(req.headers.contains("x-trace-id"));
    assert!(!req.headers.contains("Accept"));
    let mut names: Vec<&str> = req.headers.iter().map(|(name, _)| name).collect();
    names.sort();
    assert_eq!(names, vec!["Host", "X-Trace-Id"]);
}

#[test]
fn test_request_from_parts_splits_query() {
    let req = request_from(b"GET /search?q=rust+lang&page=2 HTTP/1.1\r\nHost: a", b"");

    assert_eq!(req.path, "/search");
    assert_eq!(req.query.get("q").map(String::as_str), Some("rust lang"));
    assert_eq!(req.query.get("page").map(String::as_str), Some("2"));
    assert!(req.body.is_empty());
    assert!(req.path_params.is_empty());
}

#[test]
fn test_request_from_parts_decodes_form_body() {
    let req = request_from(
        b"POST /login HTTP/1.1\r\nContent-Type: application/x-www-form-urlencoded",
        b"username=admin&password=secret",
    );

    assert_eq!(req.body.get("username").map(String::as_str), Some("admin"));
    assert_eq!(req.body.get("password").map(String::as_str), Some("secret"));
    assert_eq!(req.raw_body, b"username=admin&password=secret");
}

#[test]
fn test_request_from_parts_decodes_json_body() {
    let req = request_from(
        b"POST /api HTTP/1.1\r\nContent-Type: application/json",
        br#"{"name":"John","age":30}"#,
    );

    assert_eq!(req.body.get("name").map(String::as_str), Some("John"));
    assert_eq!(req.body.get("age").map(String::as_str), Some("30"));
}

#[test]
fn test_request_invalid_json_keeps_raw_body() {
    let req = request_from(
        b"POST /api HTTP/1.1\r\nContent-Type: application/json",
        b"{broken",
    );

    assert!(req.body.is_empty());
    assert_eq!(req.raw_body, b"{broken");
}

#[test]
fn test_request_keep_alive_default() {
    let req = request_from(b"GET / HTTP/1.1\r\nHost: a", b"");
    assert!(req.keep_alive());
    assert!(!req.wants_close());
}

#[test]
fn test_request_connection_close_any_case() {
    for value in ["close", "Close", " CLOSE "] {
        let req = RequestBuilder::new()
            .method("GET")
            .path("/")
            .header("Connection", value)
            .build()
            .unwrap();
        assert!(req.wants_close(), "{value:?} should close");
        assert!(!req.keep_alive());
    }
}

#[test]
fn test_request_param_lookup() {
    let req = RequestBuilder::new()
        .method("GET")
        .path("/users/42")
        .param("id", "42")
        .build()
        .unwrap();

    assert_eq!(req.param("id"), Some("42"));
    assert_eq!(req.param("name"), None);
}

#[test]
fn test_request_builder_requires_method_and_path() {
    assert!(RequestBuilder::new().path("/").build().is_err());
    assert!(RequestBuilder::new().method("GET").build().is_err());

    let req = RequestBuilder::new().method("GET").path("/").build().unwrap();
    assert_eq!(req.version, "HTTP/1.1");
}

#[test]
fn test_browser_detection() {
    let chrome = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";
    assert_eq!(detect_browser(chrome), "Chrome");
    assert_eq!(detect_browser("Mozilla/5.0 Gecko/20100101 Firefox/121.0"), "Firefox");
    assert_eq!(detect_browser("Mozilla/5.0 (Macintosh) Version/17.0 Safari/605.1.15"), "Safari");
    assert_eq!(detect_browser("curl/8.4.0"), "Unknown Browser");

    let req = RequestBuilder::new().method("GET").path("/").build().unwrap();
    assert_eq!(req.browser(), "Unknown Browser");
}

#[test]
fn test_method_display_and_conversion() {
    assert_eq!(Method::POST.to_string(), "POST");
    assert_eq!(Method::from("DELETE"), Method::DELETE);
    assert_eq!(Method::parse("PURGE").as_str(), "PURGE");
}
