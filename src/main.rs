use rawhttp::config::Config;
use rawhttp::http::request::{Method, Request};
use rawhttp::http::response::Response;
use rawhttp::http::router::Router;
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = Config::load()?;

    rawhttp::server::run(&cfg, routes()).await
}

fn routes() -> Router {
    let mut router = Router::new();
    router
        .get("/ping", |_req: Request| Response::ok("pong"))
        .get("/welcome", welcome)
        .get("/hello", |_req: Request| {
            Response::html("<h1>Hello!</h1><p>Served over a raw socket.</p>")
        })
        .get("/login", login)
        .post("/login", login)
        .get("/users/:id", |req: Request| {
            let id = req.param("id").unwrap_or_default();
            Response::json(&json!({ "id": id }))
        });
    router
}

fn welcome(req: Request) -> Response {
    Response::html(format!(
        "<h1>Welcome, John Doe</h1><p>You are browsing with {}.</p>",
        req.browser()
    ))
}

fn login(req: Request) -> Response {
    if req.method != Method::POST {
        return Response::html(
            "<form method=\"POST\" action=\"/login\">\
             <input name=\"username\"><input name=\"password\" type=\"password\">\
             <button>Log in</button></form>",
        );
    }

    let username = req.body.get("username").map(String::as_str).unwrap_or_default();
    let password = req.body.get("password").map(String::as_str).unwrap_or_default();

    if username == "admin" && password == "secret" {
        Response::html(format!(
            "<h1>Login Successful!</h1><p>Welcome {username}!</p>"
        ))
    } else {
        Response::html("<h1>Login Failed</h1><p>Wrong username or password</p>")
    }
}
