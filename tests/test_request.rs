use keepwire::http::request::{Method, Request, RequestBuilder};
use std::collections::HashMap;

fn request_with(version: &str, headers: &[(&str, &str)]) -> Request {
    Request {
        method: Method::GET,
        path: "/".to_string(),
        version: version.to_string(),
        headers: headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        body: vec![],
    }
}

#[test]
fn test_request_header_retrieval() {
    let req = request_with(
        "HTTP/1.1",
        &[("Host", "example.com"), ("Content-Type", "application/json")],
    );

    assert_eq!(req.header("Host"), Some("example.com"));
    assert_eq!(req.header("Content-Type"), Some("application/json"));
    assert_eq!(req.header("Missing"), None);
}

#[test]
fn test_request_header_lookup_is_exact_by_default() {
    let req = request_with("HTTP/1.1", &[("X-Request-Id", "abc")]);

    assert_eq!(req.header("x-request-id"), None);
    assert_eq!(req.header_ignore_case("x-request-id"), Some("abc"));
}

#[test]
fn test_request_content_length_parsing() {
    let req = request_with("HTTP/1.1", &[("Content-Length", "42")]);
    assert_eq!(req.content_length(), 42);
}

#[test]
fn test_request_content_length_missing() {
    let req = request_with("HTTP/1.1", &[]);
    assert_eq!(req.content_length(), 0);
}

#[test]
fn test_request_content_length_invalid() {
    let req = request_with("HTTP/1.1", &[("Content-Length", "not-a-number")]);
    assert_eq!(req.content_length(), 0);
}

#[test]
fn test_request_keep_alive_http11_default() {
    assert!(request_with("HTTP/1.1", &[]).keep_alive());
}

#[test]
fn test_request_keep_alive_http10_default() {
    assert!(!request_with("HTTP/1.0", &[]).keep_alive());
}

#[test]
fn test_request_keep_alive_http10_explicit() {
    assert!(request_with("HTTP/1.0", &[("Connection", "keep-alive")]).keep_alive());
}

#[test]
fn test_request_keep_alive_close() {
    assert!(!request_with("HTTP/1.1", &[("Connection", "close")]).keep_alive());
}

#[test]
fn test_request_keep_alive_case_insensitive() {
    assert!(request_with("HTTP/1.0", &[("connection", "Keep-Alive")]).keep_alive());
    assert!(!request_with("HTTP/1.1", &[("CONNECTION", "Close")]).keep_alive());
}

#[test]
fn test_request_keep_alive_token_list() {
    assert!(!request_with("HTTP/1.1", &[("Connection", "keep-alive, close")]).keep_alive());
    assert!(request_with("HTTP/1.0", &[("Connection", "Upgrade, keep-alive")]).keep_alive());
}

#[test]
fn test_request_method_from_token() {
    assert_eq!(Method::from_token("GET"), Method::GET);
    assert_eq!(Method::from_token("POST"), Method::POST);
    assert_eq!(Method::from_token("get"), Method::Extension("get".to_string()));
    assert_eq!(Method::from_token("PURGE").as_str(), "PURGE");
    assert_eq!(Method::DELETE.to_string(), "DELETE");
}

#[test]
fn test_request_builder() {
    let req = RequestBuilder::new()
        .method(Method::PUT)
        .path("/items/1")
        .header("Content-Type", "text/plain")
        .body(b"data".to_vec())
        .build()
        .unwrap();

    assert_eq!(req.method, Method::PUT);
    assert_eq!(req.version, "HTTP/1.1");
    assert_eq!(req.header("Content-Type"), Some("text/plain"));
    assert_eq!(req.body, b"data".to_vec());
}

#[test]
fn test_request_builder_requires_method_and_path() {
    assert!(RequestBuilder::new().path("/").build().is_err());
    assert!(RequestBuilder::new().method(Method::GET).build().is_err());
}

#[test]
fn test_request_with_body() {
    let body_content = b"test body content".to_vec();
    let req = Request {
        method: Method::POST,
        path: "/api".to_string(),
        version: "HTTP/1.1".to_string(),
        headers: HashMap::new(),
        body: body_content.clone(),
    };

    assert_eq!(req.body, body_content);
}
