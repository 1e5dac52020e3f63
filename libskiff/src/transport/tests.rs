use super::*;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;

#[test]
fn test_transport_config_defaults() {
    let config = TransportConfig::new();
    assert_eq!(config.timeout_seconds, 30);
    assert_eq!(config.max_idle_per_host, 10);
}

#[test]
fn test_transport_config_builders() {
    let config = TransportConfig::new()
        .with_timeout(5)
        .with_max_idle_per_host(1);
    assert_eq!(config.timeout_seconds, 5);
    assert_eq!(config.max_idle_per_host, 1);
}

#[test]
fn test_request_headers_replace_previous_value() {
    let request = Request::get("https://ghcr.io/v2/")
        .with_header(AUTHORIZATION, "Basic one")
        .with_header(AUTHORIZATION, "Basic two");

    assert_eq!(request.header(AUTHORIZATION), Some("Basic two"));
    assert_eq!(request.headers.len(), 1);
}

#[test]
fn test_request_drops_invalid_header_value() {
    let request = Request::get("https://ghcr.io/v2/").with_header(AUTHORIZATION, "bad\nvalue");
    assert_eq!(request.header(AUTHORIZATION), None);
}

#[test]
fn test_request_clone_is_independent() {
    let original = Request::put("https://ghcr.io/v2/app/manifests/1").with_body(b"{}".to_vec());
    let mut retry = original.clone();
    retry.set_header(AUTHORIZATION, "Bearer token");

    assert_eq!(original.header(AUTHORIZATION), None);
    assert_eq!(retry.body.as_deref(), Some(&b"{}"[..]));
    assert_eq!(retry.method, Method::PUT);
}

#[test]
fn test_response_accessors() {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    let response = Response::new(
        StatusCode::OK,
        "https://ghcr.io/v2/",
        headers,
        br#"{"name":"app"}"#.to_vec(),
    );

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.url(), "https://ghcr.io/v2/");
    assert_eq!(response.header("content-type"), Some("application/json"));
    assert_eq!(response.header(CONTENT_TYPE), Some("application/json"));
    assert_eq!(response.text(), r#"{"name":"app"}"#);
    assert_eq!(response.into_bytes(), br#"{"name":"app"}"#.to_vec());
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

#[test]
fn test_response_json() {
    let response = Response::new(
        StatusCode::OK,
        "https://ghcr.io/v2/",
        HeaderMap::new(),
        br#"{"name":"app"}"#.to_vec(),
    );
    let named: Named = response.json().unwrap();
    assert_eq!(named.name, "app");
}

#[test]
fn test_response_json_invalid_is_validation_error() {
    let response = Response::new(
        StatusCode::OK,
        "https://ghcr.io/v2/",
        HeaderMap::new(),
        b"not json".to_vec(),
    );
    let result: Result<Named> = response.json();
    assert!(matches!(result, Err(SkiffError::Validation { .. })));
}

#[test]
fn test_response_text_is_lossy() {
    let response = Response::new(
        StatusCode::OK,
        "https://ghcr.io/v2/",
        HeaderMap::new(),
        vec![b'o', b'k', 0xff],
    );
    assert_eq!(response.text(), "ok\u{fffd}");
}

#[tokio::test]
async fn test_http_transport_sends_headers() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/v2/")
        .match_header("accept", "application/json")
        .with_status(200)
        .with_header("Docker-Distribution-API-Version", "registry/2.0")
        .with_body("{}")
        .create_async()
        .await;

    let transport = HttpTransport::new().unwrap();
    let response = transport
        .send(Request::get(format!("{}/v2/", server.url())).with_header(ACCEPT, "application/json"))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.header("docker-distribution-api-version"),
        Some("registry/2.0")
    );
    assert_eq!(response.text(), "{}");
}

#[tokio::test]
async fn test_http_transport_returns_error_statuses() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/v2/")
        .with_status(401)
        .with_header("WWW-Authenticate", r#"Basic realm="registry""#)
        .create_async()
        .await;

    let transport = HttpTransport::new().unwrap();
    let response = transport
        .send(Request::get(format!("{}/v2/", server.url())))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.header("www-authenticate"),
        Some(r#"Basic realm="registry""#)
    );
}

#[tokio::test]
async fn test_http_transport_sends_body() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("PUT", "/v2/app/manifests/v1")
        .match_header("content-type", "application/vnd.oci.image.manifest.v1+json")
        .match_body(r#"{"schemaVersion":2}"#)
        .with_status(201)
        .create_async()
        .await;

    let transport = HttpTransport::new().unwrap();
    let request = Request::put(format!("{}/v2/app/manifests/v1", server.url()))
        .with_header(CONTENT_TYPE, "application/vnd.oci.image.manifest.v1+json")
        .with_body(br#"{"schemaVersion":2}"#.to_vec());
    let response = transport.send(request).await.unwrap();

    mock.assert_async().await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_http_transport_follows_redirects() {
    let mut server = mockito::Server::new_async().await;
    let redirect = server
        .mock("GET", "/v2/app/blobs/sha256:abc")
        .with_status(307)
        .with_header("Location", &format!("{}/storage/abc", server.url()))
        .create_async()
        .await;
    let storage = server
        .mock("GET", "/storage/abc")
        .with_status(200)
        .with_body("layer")
        .create_async()
        .await;

    let transport = HttpTransport::new().unwrap();
    let response = transport
        .send(Request::get(format!("{}/v2/app/blobs/sha256:abc", server.url())))
        .await
        .unwrap();

    redirect.assert_async().await;
    storage.assert_async().await;
    assert_eq!(response.text(), "layer");
    assert!(response.url().ends_with("/storage/abc"));
}

#[tokio::test]
async fn test_http_transport_connection_failure_is_network_error() {
    let transport = HttpTransport::with_config(TransportConfig::new().with_timeout(2)).unwrap();
    let result = transport.send(Request::get("http://127.0.0.1:1/v2/")).await;

    assert!(matches!(result, Err(SkiffError::Network { .. })));
}
