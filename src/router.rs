//! Exact-match request routing.
//!
//! Routes are keyed by method and then by the literal request path. There are
//! no patterns or wildcards: `/users` and `/users/` are different routes, and
//! a query string is part of the path.

use std::collections::HashMap;
use std::sync::Arc;

use crate::http::request::{Method, Request};
use crate::http::response::Response;

pub type Handler = Arc<dyn Fn(&Request) -> Response + Send + Sync>;

#[derive(Default, Clone)]
pub struct Router {
    routes: HashMap<Method, HashMap<String, Handler>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler, replacing any previous one for the same route.
    pub fn handle<F>(&mut self, method: Method, path: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&Request) -> Response + Send + Sync + 'static,
    {
        self.routes
            .entry(method)
            .or_default()
            .insert(path.into(), Arc::new(handler));
        self
    }

    pub fn get<F>(&mut self, path: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&Request) -> Response + Send + Sync + 'static,
    {
        self.handle(Method::GET, path, handler)
    }

    pub fn post<F>(&mut self, path: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&Request) -> Response + Send + Sync + 'static,
    {
        self.handle(Method::POST, path, handler)
    }

    /// Looks up the handler for an exact (method, path) pair.
    ///
    /// `None` is not an error; the caller answers with a default 404.
    pub fn find_handler(&self, method: &Method, path: &str) -> Option<&Handler> {
        self.routes.get(method)?.get(path)
    }

    /// Runs the matching handler, or returns the default 404 response.
    pub fn dispatch(&self, request: &Request) -> Response {
        match self.find_handler(&request.method, &request.path) {
            Some(handler) => handler(request),
            None => Response::not_found(),
        }
    }

    pub fn route_count(&self) -> usize {
        self.routes.values().map(HashMap::len).sum()
    }
}
