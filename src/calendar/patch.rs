use chrono::{DateTime, Duration, SecondsFormat, Utc};

use super::CalendarError;
use crate::config::CalendarConfig;
use crate::types::{Event, EventDateTime};

/// Field changes applied to an event before it is written back
#[derive(Debug, Clone)]
pub struct EventPatch {
    pub summary: String,
    pub location: String,
    pub description: String,
    pub time_zone: String,
    /// Start of the new slot, relative to now
    pub start_offset: Duration,
    pub duration: Duration,
}

impl EventPatch {
    pub fn from_config(config: &CalendarConfig) -> Result<Self, CalendarError> {
        let hours = |name: &str, value: i64| {
            Duration::try_hours(value).ok_or_else(|| {
                CalendarError::InvalidSlot(format!("{} = {} is out of range", name, value))
            })
        };

        Ok(Self {
            summary: config.summary.clone(),
            location: config.location.clone(),
            description: config.description.clone(),
            time_zone: config.time_zone.clone(),
            start_offset: hours("start_offset_hours", config.start_offset_hours)?,
            duration: hours("duration_hours", config.duration_hours)?,
        })
    }

    /// Overwrite the event's text fields and move it to `now + start_offset`.
    /// The event is left untouched on error.
    pub fn apply(&self, event: &mut Event, now: DateTime<Utc>) -> Result<(), CalendarError> {
        if self.duration <= Duration::zero() {
            return Err(CalendarError::InvalidSlot(format!(
                "duration must be positive, got {}",
                self.duration
            )));
        }

        let start = now
            .checked_add_signed(self.start_offset)
            .ok_or_else(|| CalendarError::InvalidSlot("start time is out of range".to_string()))?;
        let end = start
            .checked_add_signed(self.duration)
            .ok_or_else(|| CalendarError::InvalidSlot("end time is out of range".to_string()))?;

        event.summary = Some(self.summary.clone());
        event.location = Some(self.location.clone());
        event.description = Some(self.description.clone());
        event.start = Some(self.slot(start));
        event.end = Some(self.slot(end));
        Ok(())
    }

    fn slot(&self, at: DateTime<Utc>) -> EventDateTime {
        EventDateTime {
            date_time: Some(at.to_rfc3339_opts(SecondsFormat::Secs, true)),
            date: None,
            time_zone: Some(self.time_zone.clone()),
        }
    }
}
