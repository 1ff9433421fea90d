use rawhttp::error::DispatchError;
use rawhttp::http::request::{Method, Request, RequestBuilder};
use rawhttp::http::response::Response;
use rawhttp::http::router::{Handler, Router};

fn request(method: &str, path: &str) -> Request {
    RequestBuilder::new().method(method).path(path).build().unwrap()
}

fn body_of(router: &Router, method: Method, path: &str) -> Option<Vec<u8>> {
    let matched = router.resolve(&method, path).ok()?;
    Some(matched.handler.call(request(method.as_str(), path)).body)
}

#[test]
fn test_exact_route() {
    let mut router = Router::new();
    router.get("/ping", |_req: Request| Response::ok("pong"));

    let matched = router.resolve(&Method::GET, "/ping").unwrap();
    assert!(matched.params.is_empty());
    assert_eq!(matched.pattern, "/ping");
    assert_eq!(body_of(&router, Method::GET, "/ping"), Some(b"pong".to_vec()));
}

#[test]
fn test_method_mismatch_is_not_found() {
    let mut router = Router::new();
    router.get("/ping", |_req: Request| Response::ok("pong"));

    let err = router.resolve(&Method::POST, "/ping").err().unwrap();
    match err {
        DispatchError::RouteNotFound { method, path } => {
            assert_eq!(method, "POST");
            assert_eq!(path, "/ping");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_path_params_captured() {
    let mut router = Router::new();
    router.get("/users/:id/posts/:post", |_req: Request| Response::ok(""));

    let matched = router.resolve(&Method::GET, "/users/42/posts/7").unwrap();
    assert_eq!(matched.params.get("id").map(String::as_str), Some("42"));
    assert_eq!(matched.params.get("post").map(String::as_str), Some("7"));
}

#[test]
fn test_segment_count_must_match() {
    let mut router = Router::new();
    router.get("/users/:id", |_req: Request| Response::ok(""));

    assert!(router.resolve(&Method::GET, "/users").is_err());
    assert!(router.resolve(&Method::GET, "/users/1/extra").is_err());
    assert!(router.resolve(&Method::GET, "/accounts/1").is_err());
}

#[test]
fn test_trailing_slash_matches_pattern() {
    let mut router = Router::new();
    router.get("/users/:id", |_req: Request| Response::ok(""));

    let matched = router.resolve(&Method::GET, "/users/9/").unwrap();
    assert_eq!(matched.params.get("id").map(String::as_str), Some("9"));
}

#[test]
fn test_exact_key_beats_pattern() {
    let mut router = Router::new();
    router
        .get("/users/:id", |_req: Request| Response::ok("param"))
        .get("/users/me", |_req: Request| Response::ok("exact"));

    assert_eq!(body_of(&router, Method::GET, "/users/me"), Some(b"exact".to_vec()));
    assert_eq!(body_of(&router, Method::GET, "/users/5"), Some(b"param".to_vec()));
}

#[test]
fn test_overlapping_patterns_resolve_in_registration_order() {
    let mut router = Router::new();
    router
        .get("/files/:name", |_req: Request| Response::ok("first"))
        .get("/:dir/report", |_req: Request| Response::ok("second"));

    assert_eq!(
        body_of(&router, Method::GET, "/files/report"),
        Some(b"first".to_vec())
    );
}

#[test]
fn test_reregistering_replaces_handler() {
    let mut router = Router::new();
    router
        .get("/a/:x", |_req: Request| Response::ok("old"))
        .get("/:y/b", |_req: Request| Response::ok("other"))
        .get("/a/:x", |_req: Request| Response::ok("new"));

    assert_eq!(router.len(), 2);
    assert_eq!(body_of(&router, Method::GET, "/a/b"), Some(b"new".to_vec()));
}

#[test]
fn test_custom_method_routes() {
    let mut router = Router::new();
    router.register("PURGE", "/cache", |_req: Request| Response::ok("purged"));

    assert!(router.resolve(&Method::parse("PURGE"), "/cache").is_ok());
    assert!(router.resolve(&Method::GET, "/cache").is_err());
}

#[test]
fn test_empty_router() {
    let router = Router::new();
    assert!(router.is_empty());
    assert!(router.resolve(&Method::GET, "/").is_err());
}
