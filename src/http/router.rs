//! Method and path-pattern routing.
//!
//! Patterns are `/`-separated segments; a segment starting with `:` captures
//! the corresponding path segment under that name, every other segment must
//! match literally.
//!
//! Resolution first tries the full path as an exact key, then walks the
//! method's patterns in registration order and takes the first structural
//! match. Overlapping patterns are therefore decided by the order they were
//! registered in, not by how specific they are.

use std::collections::HashMap;

use crate::error::DispatchError;
use crate::http::request::{Method, Request};
use crate::http::response::Response;

/// Something that turns a request into a response.
///
/// Implemented for every `Fn(Request) -> Response + Send + Sync + 'static`,
/// so plain closures and functions can be registered directly.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, request: Request) -> Response;
}

impl<F> Handler for F
where
    F: Fn(Request) -> Response + Send + Sync + 'static,
{
    fn call(&self, request: Request) -> Response {
        self(request)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

struct Route {
    pattern: String,
    segments: Vec<Segment>,
    handler: Box<dyn Handler>,
}

impl Route {
    fn new(pattern: String, handler: Box<dyn Handler>) -> Self {
        let segments = split_segments(&pattern)
            .map(|seg| match seg.strip_prefix(':') {
                Some(name) => Segment::Param(name.to_string()),
                None => Segment::Literal(seg.to_string()),
            })
            .collect();

        Self {
            pattern,
            segments,
            handler,
        }
    }

    /// Captured parameters if `path` has the same segment count and every
    /// literal segment matches.
    fn match_path(&self, path: &str) -> Option<HashMap<String, String>> {
        let mut params = HashMap::new();
        let mut parts = split_segments(path);

        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Literal(literal) if literal != part => return None,
                Segment::Literal(_) => {}
                Segment::Param(name) => {
                    params.insert(name.clone(), part.to_string());
                }
            }
        }

        if parts.next().is_some() {
            return None;
        }

        Some(params)
    }
}

fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    path.trim_matches('/').split('/')
}

#[derive(Default)]
struct MethodRoutes {
    /// Pattern text to index in `routes`.
    exact: HashMap<String, usize>,
    /// Registration order.
    routes: Vec<Route>,
}

/// Result of a successful lookup.
pub struct RouteMatch<'a> {
    pub handler: &'a dyn Handler,
    pub params: HashMap<String, String>,
    /// The pattern the route was registered under.
    pub pattern: &'a str,
}

/// The route table.
///
/// Built with `&mut` during setup, then moved into the server, which only
/// ever reads it.
#[derive(Default)]
pub struct Router {
    methods: HashMap<Method, MethodRoutes>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `method` and `pattern`.
    ///
    /// Registering the same method and pattern again replaces the handler
    /// but keeps the route's original position in the resolution order.
    pub fn register<H>(
        &mut self,
        method: impl Into<Method>,
        pattern: impl Into<String>,
        handler: H,
    ) -> &mut Self
    where
        H: Handler,
    {
        let pattern = pattern.into();
        let routes = self.methods.entry(method.into()).or_default();

        match routes.exact.get(&pattern) {
            Some(&index) => routes.routes[index].handler = Box::new(handler),
            None => {
                routes.exact.insert(pattern.clone(), routes.routes.len());
                routes.routes.push(Route::new(pattern, Box::new(handler)));
            }
        }

        self
    }

    pub fn get<H: Handler>(&mut self, pattern: impl Into<String>, handler: H) -> &mut Self {
        self.register(Method::GET, pattern, handler)
    }

    pub fn post<H: Handler>(&mut self, pattern: impl Into<String>, handler: H) -> &mut Self {
        self.register(Method::POST, pattern, handler)
    }

    /// Finds the handler for `method` and `path`.
    pub fn resolve(&self, method: &Method, path: &str) -> Result<RouteMatch<'_>, DispatchError> {
        let not_found = || DispatchError::RouteNotFound {
            method: method.to_string(),
            path: path.to_string(),
        };

        let routes = self.methods.get(method).ok_or_else(not_found)?;

        if let Some(&index) = routes.exact.get(path) {
            let route = &routes.routes[index];
            return Ok(RouteMatch {
                handler: route.handler.as_ref(),
                params: HashMap::new(),
                pattern: &route.pattern,
            });
        }

        routes
            .routes
            .iter()
            .find_map(|route| {
                route.match_path(path).map(|params| RouteMatch {
                    handler: route.handler.as_ref(),
                    params,
                    pattern: &route.pattern,
                })
            })
            .ok_or_else(not_found)
    }

    /// Number of registered routes across all methods.
    pub fn len(&self) -> usize {
        self.methods.values().map(|m| m.routes.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
