// Calendar client against a mocked Calendar v3 API

use anyhow::Result;
use calsync::{
    config::CalendarConfig, AuthenticatedClient, CalendarClient, CalendarError, EventPatch,
    TokenRecord,
};
use mockito::Matcher;
use serde_json::json;

fn calendar(base_url: &str) -> Result<CalendarClient> {
    let token = TokenRecord {
        access_token: "ya29.test".to_string(),
        token_type: "bearer".to_string(),
        refresh_token: None,
        expiry: None,
    };
    Ok(CalendarClient::new(AuthenticatedClient::new(token)?, base_url))
}

#[tokio::test]
async fn test_get_event_sends_bearer_token() -> Result<()> {
    let mut api = mockito::Server::new_async().await;
    let mock = api
        .mock("GET", "/calendars/primary/events/evt1")
        .match_header("authorization", "Bearer ya29.test")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "evt1",
                "summary": "Standup",
                "status": "confirmed",
                "start": {"dateTime": "2026-10-19T10:00:00+05:30"}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let event = calendar(&api.url())?.get_event("primary", "evt1").await?;

    mock.assert_async().await;
    assert_eq!(event.id.as_deref(), Some("evt1"));
    assert_eq!(event.summary.as_deref(), Some("Standup"));
    assert_eq!(event.extra["status"], "confirmed");
    Ok(())
}

#[tokio::test]
async fn test_update_event_puts_patched_body() -> Result<()> {
    let mut api = mockito::Server::new_async().await;
    let mock = api
        .mock("PUT", "/calendars/primary/events/evt1")
        .match_header("authorization", "Bearer ya29.test")
        .match_body(Matcher::PartialJson(json!({
            "id": "evt1",
            "summary": "Updated Event Title",
            "location": "Updated Location",
            "description": "Updated Description",
            "start": {"timeZone": "Asia/Kolkata"},
            "end": {"timeZone": "Asia/Kolkata"},
            "status": "confirmed"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "evt1",
                "summary": "Updated Event Title",
                "htmlLink": "https://www.google.com/calendar/event?eid=evt1"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let mut event: calsync::Event = serde_json::from_value(json!({
        "id": "evt1",
        "summary": "Standup",
        "status": "confirmed"
    }))?;
    EventPatch::from_config(&CalendarConfig::default())?.apply(&mut event, chrono::Utc::now())?;

    let updated = calendar(&api.url())?
        .update_event("primary", "evt1", &event)
        .await?;

    mock.assert_async().await;
    assert_eq!(
        updated.html_link.as_deref(),
        Some("https://www.google.com/calendar/event?eid=evt1")
    );
    Ok(())
}

#[tokio::test]
async fn test_delete_event() -> Result<()> {
    let mut api = mockito::Server::new_async().await;
    let mock = api
        .mock("DELETE", "/calendars/team%40group.calendar.google.com/events/evt1")
        .match_header("authorization", "Bearer ya29.test")
        .with_status(204)
        .create_async()
        .await;

    calendar(&api.url())?
        .delete_event("team@group.calendar.google.com", "evt1")
        .await?;

    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_api_error_carries_status_and_body() -> Result<()> {
    let mut api = mockito::Server::new_async().await;
    api.mock("GET", "/calendars/primary/events/missing")
        .with_status(404)
        .with_body(r#"{"error":{"code":404,"message":"Not Found"}}"#)
        .create_async()
        .await;

    let err = calendar(&api.url())?
        .get_event("primary", "missing")
        .await
        .unwrap_err();

    match err {
        CalendarError::Api { status, body } => {
            assert_eq!(status.as_u16(), 404);
            assert!(body.contains("Not Found"));
        }
        other => panic!("unexpected error: {}", other),
    }
    Ok(())
}
