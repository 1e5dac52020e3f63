use super::*;
use crate::auth::{
    AnonymousAuthenticator, ManualClock, RegistryAuthentication, StaticAuthenticator,
};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replies with canned responses in order and records every request.
struct ScriptedTransport {
    responses: Mutex<VecDeque<Response>>,
    requests: Mutex<Vec<Request>>,
}

impl ScriptedTransport {
    fn new(responses: Vec<Response>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: Request) -> Result<Response> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| SkiffError::network("no scripted response left"))
    }
}

const MANIFEST_URL: &str = "https://registry.example.com/v2/app/manifests/latest";
const SCOPE: &str = "repository:app:pull";

fn registry() -> Registry {
    Registry::new("registry.example.com", false)
}

fn response(status: u16, headers: &[(&'static str, &str)], body: &str) -> Response {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        map.insert(*name, HeaderValue::from_str(value).unwrap());
    }
    Response::new(
        StatusCode::from_u16(status).unwrap(),
        "https://scripted.invalid/",
        map,
        body.as_bytes().to_vec(),
    )
}

fn ok() -> Response {
    response(200, &[], "manifest")
}

fn bearer_challenge() -> Response {
    response(
        401,
        &[(
            "www-authenticate",
            r#"Bearer realm="https://auth.example.com/token",service="registry.example.com""#,
        )],
        "",
    )
}

fn basic_challenge() -> Response {
    response(401, &[("www-authenticate", r#"Basic realm="registry""#)], "")
}

fn token(body: &str) -> Response {
    response(200, &[], body)
}

fn anonymous(inner: Arc<ScriptedTransport>) -> AuthenticatingTransport {
    AuthenticatingTransport::new(inner, Arc::new(AnonymousAuthenticator))
}

fn with_credentials(inner: Arc<ScriptedTransport>) -> AuthenticatingTransport {
    let authenticator = StaticAuthenticator::new().with_registry(
        "registry.example.com",
        RegistryAuthentication::basic("user", "pass"),
    );
    AuthenticatingTransport::new(inner, Arc::new(authenticator))
}

fn authorization(request: &Request) -> Option<&str> {
    request.header(AUTHORIZATION)
}

#[tokio::test]
async fn test_success_without_challenge_passes_through() {
    let inner = ScriptedTransport::new(vec![ok()]);
    let transport = anonymous(inner.clone());

    let result = transport
        .send(Request::get(MANIFEST_URL), &registry(), &[SCOPE])
        .await
        .unwrap();

    assert_eq!(result.status(), StatusCode::OK);
    let requests = inner.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(authorization(&requests[0]), None);
}

#[tokio::test]
async fn test_non_401_errors_pass_through() {
    let inner = ScriptedTransport::new(vec![response(404, &[], "not found")]);
    let transport = anonymous(inner.clone());

    let result = transport
        .send(Request::get(MANIFEST_URL), &registry(), &[SCOPE])
        .await
        .unwrap();

    assert_eq!(result.status(), StatusCode::NOT_FOUND);
    assert_eq!(inner.requests().len(), 1);
}

#[tokio::test]
async fn test_bearer_challenge_exchanges_token_and_retries_once() {
    let inner = ScriptedTransport::new(vec![
        bearer_challenge(),
        token(r#"{"token":"abc","expires_in":300}"#),
        ok(),
    ]);
    let transport = anonymous(inner.clone());

    let result = transport
        .send(Request::get(MANIFEST_URL), &registry(), &[SCOPE])
        .await
        .unwrap();
    assert_eq!(result.status(), StatusCode::OK);

    let requests = inner.requests();
    assert_eq!(requests.len(), 3);

    let token_url = Url::parse(&requests[1].url).unwrap();
    assert_eq!(token_url.host_str(), Some("auth.example.com"));
    assert_eq!(token_url.path(), "/token");
    let pairs: Vec<(String, String)> = token_url.query_pairs().into_owned().collect();
    assert!(pairs.contains(&("scope".to_string(), SCOPE.to_string())));
    assert!(pairs.contains(&("service".to_string(), "registry.example.com".to_string())));
    assert_eq!(authorization(&requests[1]), None);

    assert_eq!(requests[2].url, MANIFEST_URL);
    assert_eq!(authorization(&requests[2]), Some("Bearer abc"));
}

#[tokio::test]
async fn test_bearer_token_is_cached_for_later_requests() {
    let inner = ScriptedTransport::new(vec![
        bearer_challenge(),
        token(r#"{"access_token":"abc"}"#),
        ok(),
        ok(),
    ]);
    let transport = anonymous(inner.clone());

    transport
        .send(Request::get(MANIFEST_URL), &registry(), &[SCOPE])
        .await
        .unwrap();
    transport
        .send(Request::get(MANIFEST_URL), &registry(), &[SCOPE])
        .await
        .unwrap();

    let requests = inner.requests();
    assert_eq!(requests.len(), 4);
    assert_eq!(authorization(&requests[3]), Some("Bearer abc"));
}

#[tokio::test]
async fn test_negative_expiry_is_used_once_and_not_cached() {
    let clock = Arc::new(ManualClock::new(1_000_000));
    let inner = ScriptedTransport::new(vec![
        bearer_challenge(),
        token(r#"{"token":"stale","expires_in":-10}"#),
        ok(),
    ]);
    let transport = AuthenticatingTransport::with_clock(
        inner.clone(),
        Arc::new(AnonymousAuthenticator),
        clock.clone(),
    );

    let result = transport
        .send(Request::get(MANIFEST_URL), &registry(), &[SCOPE])
        .await
        .unwrap();

    assert_eq!(result.status(), StatusCode::OK);
    assert_eq!(authorization(&inner.requests()[2]), Some("Bearer stale"));
    assert_eq!(transport.cache().get(&registry(), &[SCOPE]), None);

    clock.advance(Duration::from_secs(365 * 24 * 60 * 60));
    assert_eq!(transport.cache().get(&registry(), &[SCOPE]), None);
}

#[tokio::test]
async fn test_bearer_token_expires_from_cache() {
    let clock = Arc::new(ManualClock::new(1_000_000));
    let inner = ScriptedTransport::new(vec![
        bearer_challenge(),
        token(r#"{"token":"first","expires_in":60}"#),
        ok(),
        bearer_challenge(),
        token(r#"{"token":"second","expires_in":60}"#),
        ok(),
    ]);
    let transport = AuthenticatingTransport::with_clock(
        inner.clone(),
        Arc::new(AnonymousAuthenticator),
        clock.clone(),
    );

    transport
        .send(Request::get(MANIFEST_URL), &registry(), &[SCOPE])
        .await
        .unwrap();
    clock.advance(Duration::from_secs(60));
    transport
        .send(Request::get(MANIFEST_URL), &registry(), &[SCOPE])
        .await
        .unwrap();

    let requests = inner.requests();
    assert_eq!(requests.len(), 6);
    assert_eq!(authorization(&requests[3]), None);
    assert_eq!(authorization(&requests[5]), Some("Bearer second"));
}

#[tokio::test]
async fn test_bearer_token_request_carries_provider_credential() {
    let inner = ScriptedTransport::new(vec![bearer_challenge(), token(r#"{"token":"abc"}"#), ok()]);
    let transport = with_credentials(inner.clone());

    transport
        .send(Request::get(MANIFEST_URL), &registry(), &[SCOPE])
        .await
        .unwrap();

    let requests = inner.requests();
    assert_eq!(authorization(&requests[1]), Some("Basic dXNlcjpwYXNz"));
}

#[tokio::test]
async fn test_bearer_service_defaults_to_registry_host() {
    let challenge = response(
        401,
        &[("www-authenticate", r#"Bearer realm="https://auth.example.com/token""#)],
        "",
    );
    let inner = ScriptedTransport::new(vec![challenge, token(r#"{"token":"abc"}"#), ok()]);
    let transport = anonymous(inner.clone());

    transport
        .send(Request::get(MANIFEST_URL), &registry(), &[SCOPE])
        .await
        .unwrap();

    let token_url = Url::parse(&inner.requests()[1].url).unwrap();
    let service = token_url
        .query_pairs()
        .find(|(key, _)| key == "service")
        .map(|(_, value)| value.into_owned());
    assert_eq!(service.as_deref(), Some("registry.example.com"));
}

#[tokio::test]
async fn test_bearer_scopes_are_space_joined_and_replace_realm_params() {
    let challenge = response(
        401,
        &[(
            "www-authenticate",
            r#"Bearer realm="https://auth.example.com/token?scope=stale&client=skiff",service="reg""#,
        )],
        "",
    );
    let inner = ScriptedTransport::new(vec![challenge, token(r#"{"token":"abc"}"#), ok()]);
    let transport = anonymous(inner.clone());

    transport
        .send(
            Request::get(MANIFEST_URL),
            &registry(),
            &["repository:a:pull", "repository:b:pull,push"],
        )
        .await
        .unwrap();

    let token_url = Url::parse(&inner.requests()[1].url).unwrap();
    let pairs: Vec<(String, String)> = token_url.query_pairs().into_owned().collect();
    assert_eq!(
        pairs,
        vec![
            ("client".to_string(), "skiff".to_string()),
            (
                "scope".to_string(),
                "repository:a:pull repository:b:pull,push".to_string()
            ),
            ("service".to_string(), "reg".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_second_401_is_returned_without_another_exchange() {
    let inner = ScriptedTransport::new(vec![
        bearer_challenge(),
        token(r#"{"token":"abc"}"#),
        bearer_challenge(),
    ]);
    let transport = anonymous(inner.clone());

    let result = transport
        .send(Request::get(MANIFEST_URL), &registry(), &[SCOPE])
        .await
        .unwrap();

    assert_eq!(result.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(inner.requests().len(), 3);
}

#[tokio::test]
async fn test_missing_challenge_header_is_protocol_error() {
    let inner = ScriptedTransport::new(vec![response(401, &[], "denied")]);
    let transport = anonymous(inner.clone());

    let err = transport
        .send(Request::get(MANIFEST_URL), &registry(), &[SCOPE])
        .await
        .unwrap_err();

    assert!(matches!(err, SkiffError::Protocol { .. }));
    assert_eq!(err.response().map(|r| r.status()), Some(StatusCode::UNAUTHORIZED));
    assert_eq!(inner.requests().len(), 1);
}

#[tokio::test]
async fn test_malformed_challenge_is_parse_error() {
    let challenge = response(401, &[("www-authenticate", "Bearer realm=")], "");
    let inner = ScriptedTransport::new(vec![challenge]);
    let transport = anonymous(inner.clone());

    let err = transport
        .send(Request::get(MANIFEST_URL), &registry(), &[SCOPE])
        .await
        .unwrap_err();

    assert!(matches!(err, SkiffError::Parse { .. }));
}

#[tokio::test]
async fn test_unknown_scheme_is_protocol_error_without_retry() {
    let challenge = response(401, &[("www-authenticate", r#"Digest realm="x",nonce="y""#)], "");
    let inner = ScriptedTransport::new(vec![challenge]);
    let transport = anonymous(inner.clone());

    let err = transport
        .send(Request::get(MANIFEST_URL), &registry(), &[SCOPE])
        .await
        .unwrap_err();

    assert!(matches!(err, SkiffError::Protocol { .. }));
    assert!(err.to_string().contains("digest"));
    assert!(err.response().is_some());
    assert_eq!(inner.requests().len(), 1);
}

#[tokio::test]
async fn test_bearer_without_realm_is_protocol_error() {
    let challenge = response(401, &[("www-authenticate", r#"Bearer service="reg""#)], "");
    let inner = ScriptedTransport::new(vec![challenge]);
    let transport = anonymous(inner.clone());

    let err = transport
        .send(Request::get(MANIFEST_URL), &registry(), &[SCOPE])
        .await
        .unwrap_err();

    assert!(matches!(err, SkiffError::Protocol { .. }));
    assert_eq!(inner.requests().len(), 1);
}

#[tokio::test]
async fn test_token_endpoint_failure_is_protocol_error() {
    let inner = ScriptedTransport::new(vec![bearer_challenge(), response(403, &[], "nope")]);
    let transport = anonymous(inner.clone());

    let err = transport
        .send(Request::get(MANIFEST_URL), &registry(), &[SCOPE])
        .await
        .unwrap_err();

    assert!(matches!(err, SkiffError::Protocol { .. }));
    assert_eq!(err.response().map(|r| r.status()), Some(StatusCode::FORBIDDEN));
    assert_eq!(inner.requests().len(), 2);
}

#[tokio::test]
async fn test_token_response_without_token_is_protocol_error() {
    let inner = ScriptedTransport::new(vec![
        bearer_challenge(),
        token(r#"{"token":"","expires_in":60}"#),
    ]);
    let transport = anonymous(inner.clone());

    let err = transport
        .send(Request::get(MANIFEST_URL), &registry(), &[SCOPE])
        .await
        .unwrap_err();

    assert!(matches!(err, SkiffError::Protocol { .. }));
    assert_eq!(transport.cache().len(&registry()), 0);
}

#[tokio::test]
async fn test_token_response_invalid_json_is_protocol_error() {
    let inner = ScriptedTransport::new(vec![bearer_challenge(), token("<html>")]);
    let transport = anonymous(inner.clone());

    let err = transport
        .send(Request::get(MANIFEST_URL), &registry(), &[SCOPE])
        .await
        .unwrap_err();

    assert!(matches!(err, SkiffError::Protocol { .. }));
}

#[tokio::test]
async fn test_basic_challenge_with_credentials_retries() {
    let inner = ScriptedTransport::new(vec![basic_challenge(), ok()]);
    let transport = with_credentials(inner.clone());

    let result = transport
        .send(Request::get(MANIFEST_URL), &registry(), &[SCOPE])
        .await
        .unwrap();

    assert_eq!(result.status(), StatusCode::OK);
    let requests = inner.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(authorization(&requests[1]), Some("Basic dXNlcjpwYXNz"));
    assert_eq!(
        transport.cache().get(&registry(), &[SCOPE]),
        Some("Basic dXNlcjpwYXNz".to_string())
    );
}

#[tokio::test]
async fn test_basic_challenge_without_credentials_returns_401() {
    let inner = ScriptedTransport::new(vec![basic_challenge()]);
    let transport = anonymous(inner.clone());

    let result = transport
        .send(Request::get(MANIFEST_URL), &registry(), &[SCOPE])
        .await
        .unwrap();

    assert_eq!(result.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(inner.requests().len(), 1);
}

#[tokio::test]
async fn test_basic_challenge_after_rejected_credential_returns_401() {
    let inner = ScriptedTransport::new(vec![basic_challenge()]);
    let transport = with_credentials(inner.clone());
    transport
        .cache()
        .put(&registry(), "Basic c3RhbGU6c3RhbGU=", &[SCOPE], None);

    let result = transport
        .send(Request::get(MANIFEST_URL), &registry(), &[SCOPE])
        .await
        .unwrap();

    assert_eq!(result.status(), StatusCode::UNAUTHORIZED);
    let requests = inner.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(authorization(&requests[0]), Some("Basic c3RhbGU6c3RhbGU="));
}

#[tokio::test]
async fn test_retry_replays_method_and_body() {
    let inner = ScriptedTransport::new(vec![basic_challenge(), response(201, &[], "")]);
    let transport = with_credentials(inner.clone());

    let request = Request::put(MANIFEST_URL).with_body(b"{}".to_vec());
    let result = transport
        .send(request, &registry(), &["repository:app:push"])
        .await
        .unwrap();

    assert_eq!(result.status(), StatusCode::CREATED);
    let requests = inner.requests();
    assert_eq!(requests[1].method, reqwest::Method::PUT);
    assert_eq!(requests[1].body.as_deref(), Some(&b"{}"[..]));
}

#[tokio::test]
async fn test_network_error_propagates() {
    let inner = ScriptedTransport::new(vec![]);
    let transport = anonymous(inner);

    let err = transport
        .send(Request::get(MANIFEST_URL), &registry(), &[SCOPE])
        .await
        .unwrap_err();

    assert!(matches!(err, SkiffError::Network { .. }));
}

#[test]
fn test_token_url_keeps_realm_path() {
    let url = token_url(
        "https://auth.docker.io/token",
        "repository:library/ubuntu:pull",
        "registry.docker.io",
    )
    .unwrap();
    assert_eq!(
        url.as_str(),
        "https://auth.docker.io/token?scope=repository%3Alibrary%2Fubuntu%3Apull&service=registry.docker.io"
    );
}

#[test]
fn test_token_url_rejects_relative_realm() {
    assert_eq!(
        token_url("/token", "", "reg").unwrap_err(),
        ParseError::RelativeUrlWithoutBase
    );
}

#[tokio::test]
async fn test_relative_realm_is_protocol_error_with_response() {
    let challenge = response(401, &[("www-authenticate", r#"Bearer realm="/token""#)], "");
    let inner = ScriptedTransport::new(vec![challenge]);
    let transport = anonymous(inner.clone());

    let err = transport
        .send(Request::get(MANIFEST_URL), &registry(), &[SCOPE])
        .await
        .unwrap_err();

    assert!(matches!(err, SkiffError::Protocol { .. }));
    assert!(err.to_string().contains("invalid realm"));
    assert_eq!(err.response().map(|r| r.status()), Some(StatusCode::UNAUTHORIZED));
    assert_eq!(inner.requests().len(), 1);
}

#[test]
fn test_token_ttl() {
    let ttl = |body: &str| serde_json::from_str::<TokenResponse>(body).unwrap().ttl();

    assert_eq!(ttl(r#"{"token":"t"}"#), None);
    assert_eq!(ttl(r#"{"token":"t","expires_in":300}"#), Some(Duration::from_secs(300)));
    assert_eq!(ttl(r#"{"token":"t","expires_in":1.5}"#), Some(Duration::from_millis(1500)));
    assert_eq!(ttl(r#"{"token":"t","expires_in":0}"#), Some(Duration::ZERO));
    assert_eq!(ttl(r#"{"token":"t","expires_in":-10}"#), Some(Duration::ZERO));
}

#[tokio::test]
async fn test_reference_target_authenticates_against_its_registry() {
    let reference = crate::reference::Reference::new(
        crate::reference::Repository::new(registry(), "app"),
        crate::reference::Identifier::Tag("latest".to_string()),
    );
    let inner = ScriptedTransport::new(vec![
        bearer_challenge(),
        token(r#"{"token":"abc"}"#),
        ok(),
    ]);
    let transport = anonymous(inner.clone());

    transport
        .send(
            Request::get(reference.manifest_url()),
            &reference,
            &[reference.scope("pull")],
        )
        .await
        .unwrap();

    assert_eq!(
        transport.cache().get(&registry(), &[SCOPE]),
        Some("Bearer abc".to_string())
    );
}
