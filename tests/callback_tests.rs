// Redirect listener tests against a real socket on an ephemeral port

use anyhow::Result;
use calsync::auth::{callback_server::SUCCESS_MESSAGE, AuthError, CallbackServer};
use reqwest::Client;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::task::JoinHandle;

fn http() -> Client {
    Client::builder().no_proxy().build().unwrap()
}

async fn start(expected_state: &str) -> Result<(SocketAddr, JoinHandle<Result<String, AuthError>>)> {
    let server = CallbackServer::bind("127.0.0.1:0").await?;
    let addr = server.local_addr();
    let expected_state = expected_state.to_string();
    let handle = tokio::spawn(async move { server.wait_for_code(&expected_state, None).await });
    Ok((addr, handle))
}

#[tokio::test]
async fn test_matching_redirect_delivers_code() -> Result<()> {
    let (addr, handle) = start("state-token").await?;

    let response = http()
        .get(format!("http://{}/?state=state-token&code=abc123", addr))
        .send()
        .await?;

    assert_eq!(response.status(), 200);
    let body = response.text().await?;
    assert!(body.contains(SUCCESS_MESSAGE));

    let code = tokio::time::timeout(Duration::from_secs(10), handle).await???;
    assert_eq!(code, "abc123");

    Ok(())
}

#[tokio::test]
async fn test_code_is_passed_through_unmodified() -> Result<()> {
    let (addr, handle) = start("state-token").await?;

    // 4/0Ab... style codes contain slashes and need percent-encoding in the query
    let response = http()
        .get(format!("http://{}/", addr))
        .query(&[("state", "state-token"), ("code", "4/0AbCD-ef_gh+ij")])
        .send()
        .await?;
    assert_eq!(response.status(), 200);

    let code = tokio::time::timeout(Duration::from_secs(10), handle).await???;
    assert_eq!(code, "4/0AbCD-ef_gh+ij");

    Ok(())
}

#[tokio::test]
async fn test_wrong_state_is_rejected_and_flow_keeps_waiting() -> Result<()> {
    let (addr, mut handle) = start("state-token").await?;
    let client = http();

    let response = client
        .get(format!("http://{}/?state=wrong&code=abc123", addr))
        .send()
        .await?;
    assert_eq!(response.status(), 400);
    assert!(response.text().await?.contains("State does not match"));

    // Nothing was delivered, the waiter is still blocked
    let pending = tokio::time::timeout(Duration::from_millis(300), &mut handle).await;
    assert!(pending.is_err());

    // A later, correct redirect still completes the flow
    let response = client
        .get(format!("http://{}/?state=state-token&code=def456", addr))
        .send()
        .await?;
    assert_eq!(response.status(), 200);

    let code = tokio::time::timeout(Duration::from_secs(10), handle).await???;
    assert_eq!(code, "def456");

    Ok(())
}

#[tokio::test]
async fn test_provider_error_ends_flow() -> Result<()> {
    let (addr, handle) = start("state-token").await?;

    let response = http()
        .get(format!(
            "http://{}/?state=state-token&error=access_denied&error_description=denied",
            addr
        ))
        .send()
        .await?;
    assert_eq!(response.status(), 400);

    let outcome = tokio::time::timeout(Duration::from_secs(10), handle).await??;
    assert!(matches!(outcome, Err(AuthError::Provider { .. })));

    Ok(())
}

#[tokio::test]
async fn test_only_root_route_is_served() -> Result<()> {
    let (addr, mut handle) = start("state-token").await?;

    let response = http()
        .get(format!("http://{}/favicon.ico", addr))
        .send()
        .await?;
    assert_eq!(response.status(), 404);

    let pending = tokio::time::timeout(Duration::from_millis(200), &mut handle).await;
    assert!(pending.is_err());
    handle.abort();

    Ok(())
}

#[tokio::test]
async fn test_head_request_does_not_complete_flow() -> Result<()> {
    let (addr, mut handle) = start("state-token").await?;
    let client = http();

    let response = client
        .head(format!("http://{}/?state=state-token&code=abc123", addr))
        .send()
        .await?;
    assert_eq!(response.status(), 405);

    let pending = tokio::time::timeout(Duration::from_millis(300), &mut handle).await;
    assert!(pending.is_err());

    let response = client
        .post(format!("http://{}/?state=state-token&code=abc123", addr))
        .send()
        .await?;
    assert_eq!(response.status(), 405);

    // The browser's GET still gets the success page
    let response = client
        .get(format!("http://{}/?state=state-token&code=abc123", addr))
        .send()
        .await?;
    assert_eq!(response.status(), 200);

    let code = tokio::time::timeout(Duration::from_secs(10), handle).await???;
    assert_eq!(code, "abc123");

    Ok(())
}

#[tokio::test]
async fn test_timeout_when_configured() -> Result<()> {
    let server = CallbackServer::bind("127.0.0.1:0").await?;

    let result = server
        .wait_for_code("state-token", Some(Duration::from_millis(200)))
        .await;

    match result {
        Err(err @ AuthError::CallbackTimeout(limit)) => {
            assert_eq!(limit, Duration::from_millis(200));
            assert!(err.to_string().contains("200ms"));
        }
        other => panic!("expected timeout, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_listener_is_released_after_code() -> Result<()> {
    let (addr, handle) = start("state-token").await?;

    http()
        .get(format!("http://{}/?state=state-token&code=abc123", addr))
        .send()
        .await?;
    tokio::time::timeout(Duration::from_secs(10), handle).await???;

    // Same port can be bound again once the flow resumed
    let rebound = CallbackServer::bind(&addr.to_string()).await?;
    assert_eq!(rebound.local_addr(), addr);

    Ok(())
}

#[tokio::test]
async fn test_bind_conflict_is_fatal() -> Result<()> {
    let first = CallbackServer::bind("127.0.0.1:0").await?;
    let addr = first.local_addr().to_string();

    let second = CallbackServer::bind(&addr).await;
    assert!(matches!(second, Err(AuthError::Bind { .. })));

    Ok(())
}
