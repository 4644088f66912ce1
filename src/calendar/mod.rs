// Google Calendar v3 events API

pub mod patch;

pub use patch::EventPatch;

use reqwest::StatusCode;
use tracing::debug;

use crate::auth::AuthenticatedClient;
use crate::types::Event;

#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    #[error("Calendar request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Calendar API returned {status}: {body}")]
    Api { status: StatusCode, body: String },

    #[error("Invalid event slot: {0}")]
    InvalidSlot(String),
}

pub struct CalendarClient {
    client: AuthenticatedClient,
    base_url: String,
}

impl CalendarClient {
    pub fn new(client: AuthenticatedClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn event_url(&self, calendar_id: &str, event_id: &str) -> String {
        format!(
            "{}/calendars/{}/events/{}",
            self.base_url,
            urlencoding::encode(calendar_id),
            urlencoding::encode(event_id)
        )
    }

    /// GET /calendars/{calendarId}/events/{eventId}
    pub async fn get_event(&self, calendar_id: &str, event_id: &str) -> Result<Event, CalendarError> {
        let url = self.event_url(calendar_id, event_id);
        debug!("GET {}", url);

        let res = self.client.http().get(&url).send().await?;
        let res = check_status(res).await?;
        Ok(res.json().await?)
    }

    /// PUT /calendars/{calendarId}/events/{eventId}
    pub async fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        event: &Event,
    ) -> Result<Event, CalendarError> {
        let url = self.event_url(calendar_id, event_id);
        debug!("PUT {}", url);

        let res = self.client.http().put(&url).json(event).send().await?;
        let res = check_status(res).await?;
        Ok(res.json().await?)
    }

    /// DELETE /calendars/{calendarId}/events/{eventId}
    pub async fn delete_event(&self, calendar_id: &str, event_id: &str) -> Result<(), CalendarError> {
        let url = self.event_url(calendar_id, event_id);
        debug!("DELETE {}", url);

        let res = self.client.http().delete(&url).send().await?;
        check_status(res).await?;
        Ok(())
    }
}

async fn check_status(res: reqwest::Response) -> Result<reqwest::Response, CalendarError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }

    let body = res.text().await.unwrap_or_default();
    Err(CalendarError::Api { status, body })
}
