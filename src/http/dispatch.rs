//! Turning a parsed request into a response.
//!
//! Order of precedence: static files (when configured), then the route
//! table, then the not-found responder. Handler panics are caught here and
//! never reach the connection task.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tracing::error;

use crate::error::DispatchError;
use crate::http::request::Request;
use crate::http::response::{Response, ResponseBuilder, StatusCode};
use crate::http::router::Router;
use crate::http::static_files::{StaticFiles, StaticLookup};

pub struct Dispatcher {
    router: Router,
    static_files: Option<StaticFiles>,
}

impl Dispatcher {
    pub fn new(router: Router, static_files: Option<StaticFiles>) -> Self {
        Self {
            router,
            static_files,
        }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Produces the response for `request`. Never fails: routing misses and
    /// handler faults become 404 and 500 responses.
    pub async fn dispatch(&self, request: Request) -> Response {
        if let Some(files) = &self.static_files {
            match files.lookup(&request.method, &request.path).await {
                StaticLookup::Found {
                    contents,
                    content_type,
                } => {
                    return ResponseBuilder::new(StatusCode::Ok)
                        .content_type(content_type)
                        .body(contents)
                        .build();
                }
                StaticLookup::Forbidden => return Response::forbidden(),
                StaticLookup::Missing => {}
            }
        }

        match self.route(request) {
            Ok(response) => response,
            Err(DispatchError::RouteNotFound { .. }) => self.not_found().await,
            Err(fault @ DispatchError::HandlerFault { .. }) => {
                error!(error = %fault, "Handler fault, responding with 500");
                Response::internal_error()
            }
        }
    }

    /// Resolves the route and invokes its handler inside a panic boundary.
    pub fn route(&self, mut request: Request) -> Result<Response, DispatchError> {
        let matched = self.router.resolve(&request.method, &request.path)?;
        request.path_params = matched.params;

        let method = request.method.to_string();
        let path = request.path.clone();
        let handler = matched.handler;

        panic::catch_unwind(AssertUnwindSafe(|| handler.call(request))).map_err(|payload| {
            DispatchError::HandlerFault {
                method,
                path,
                message: panic_message(payload.as_ref()),
            }
        })
    }

    /// The built-in 404 responder, preferring the static directory's
    /// `404.html`.
    pub async fn not_found(&self) -> Response {
        if let Some(files) = &self.static_files {
            if let Some(page) = files.not_found_page().await {
                return ResponseBuilder::new(StatusCode::NotFound)
                    .content_type("text/html")
                    .body(page)
                    .build();
            }
        }
        Response::not_found()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
