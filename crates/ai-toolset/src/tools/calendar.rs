//! Calendar tools: list, create and update events on a host calendar entity.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime};
use serde_json::{json, Map, Value};
use toolset_core::{HostServices, ServiceCall};
use tracing::debug;

use crate::error::ToolError;
use crate::tool::{Tool, ToolArgs, ToolOutput};

/// Window used when neither an end time nor a duration is given.
const DEFAULT_WINDOW_DAYS: i64 = 7;

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];
const OFFSET_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%dT%H:%M%:z", "%Y-%m-%dT%H:%M%z"];

/// Parse an ISO-8601 date-time.
///
/// Accepts `T` or a space between date and time, optional seconds and
/// fractions, and an optional offset. Naive values take `offset`.
pub fn parse_datetime(
    field: &str,
    value: &str,
    offset: FixedOffset,
) -> Result<DateTime<FixedOffset>, ToolError> {
    let invalid = || ToolError::InvalidFormat {
        field: field.to_string(),
        value: value.to_string(),
    };

    let trimmed = value.trim();
    if trimmed.len() < 16 {
        return Err(invalid());
    }

    let mut normalized = trimmed.to_string();
    if normalized.as_bytes()[10] == b' ' {
        normalized.replace_range(10..11, "T");
    }
    if let Some(stripped) = normalized
        .strip_suffix('Z')
        .or_else(|| normalized.strip_suffix('z'))
    {
        normalized = format!("{}+00:00", stripped);
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(&normalized) {
        return Ok(parsed);
    }

    for format in OFFSET_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(&normalized, format) {
            return Ok(parsed);
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&normalized, format) {
            return naive.and_local_timezone(offset).single().ok_or_else(invalid);
        }
    }

    Err(invalid())
}

/// Parse a duration object such as `{"hours": 24, "days": 7}`.
pub fn parse_duration(value: &Map<String, Value>) -> Result<Duration, ToolError> {
    let invalid = |reason: String| ToolError::InvalidFormat {
        field: "duration".to_string(),
        value: reason,
    };

    let mut micros = 0f64;
    for (key, amount) in value {
        let factor = match key.as_str() {
            "weeks" => 7.0 * 86_400_000_000.0,
            "days" => 86_400_000_000.0,
            "hours" => 3_600_000_000.0,
            "minutes" => 60_000_000.0,
            "seconds" => 1_000_000.0,
            "milliseconds" => 1_000.0,
            "microseconds" => 1.0,
            other => return Err(invalid(format!("unexpected key '{}'", other))),
        };
        let amount = amount
            .as_f64()
            .ok_or_else(|| invalid(format!("'{}' must be a number", key)))?;
        micros += amount * factor;
    }

    if !micros.is_finite() || micros.abs() >= i64::MAX as f64 {
        return Err(invalid("duration out of range".to_string()));
    }

    Ok(Duration::microseconds(micros.round() as i64))
}

/// `start + length`, failing when the end falls outside the representable range.
fn shift(start: DateTime<FixedOffset>, length: Duration) -> Result<DateTime<FixedOffset>, ToolError> {
    start
        .checked_add_signed(length)
        .ok_or_else(|| ToolError::InvalidFormat {
            field: "duration".to_string(),
            value: "end of range out of bounds".to_string(),
        })
}

/// Fail with a validation error unless the calendar entity exists.
async fn ensure_calendar(host: &Arc<dyn HostServices>, entity_id: &str) -> Result<(), ToolError> {
    match host.entity_state(entity_id).await? {
        Some(_) => Ok(()),
        None => Err(ToolError::EntityNotFound {
            kind: "Calendar".to_string(),
            entity_id: entity_id.to_string(),
        }),
    }
}

/// Lists events of a calendar within a time window.
///
/// # Parameters
///
/// - `entity_id` (required): Calendar entity, e.g. `calendar.family`.
/// - `start_date_time` (optional): Window start; defaults to now.
/// - `end_date_time` (optional): Window end.
/// - `duration` (optional): Window length when no end is given, e.g. `{"days": 1}`.
///   Without either the window is seven days.
pub struct CalendarGetEvents;

impl CalendarGetEvents {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CalendarGetEvents {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for CalendarGetEvents {
    fn name(&self) -> &str {
        "calendar_get_events"
    }

    fn description(&self) -> &str {
        "Get events from a calendar for a specific time range. \
         Specify the calendar entity and optionally a start time, end time, or duration. \
         Defaults to the next 7 days."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "entity_id": {"type": "string", "description": "Calendar entity id"},
                "start_date_time": {"type": "string", "description": "ISO-8601 start of the range"},
                "end_date_time": {"type": "string", "description": "ISO-8601 end of the range"},
                "duration": {
                    "type": "object",
                    "description": "Range length when no end is given",
                    "properties": {
                        "weeks": {"type": "number"},
                        "days": {"type": "number"},
                        "hours": {"type": "number"},
                        "minutes": {"type": "number"},
                        "seconds": {"type": "number"}
                    }
                }
            },
            "required": ["entity_id"]
        })
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolOutput, ToolError> {
        let entity_id = args.get_string("entity_id")?;
        let start_raw = args.get_string_opt("start_date_time")?;
        let end_raw = args.get_string_opt("end_date_time")?;
        let duration = args.get_object_opt("duration")?;
        let host = args.require_host(self.name())?;

        ensure_calendar(host, &entity_id).await?;

        let now = host.now();
        let start = match start_raw.as_deref().filter(|s| !s.is_empty()) {
            Some(raw) => parse_datetime("start_date_time", raw, *now.offset())?,
            None => now,
        };

        let end = match (end_raw.as_deref().filter(|s| !s.is_empty()), duration) {
            (Some(raw), _) => parse_datetime("end_date_time", raw, *now.offset())?,
            (None, Some(duration)) if !duration.is_empty() => {
                shift(start, parse_duration(&duration)?)?
            }
            _ => shift(start, Duration::days(DEFAULT_WINDOW_DAYS))?,
        };

        debug!("calendar_get_events: {} from {} to {}", entity_id, start, end);

        let call = ServiceCall::new("calendar", "get_events")
            .with("entity_id", entity_id.as_str())
            .with("start_date_time", start.to_rfc3339())
            .with("end_date_time", end.to_rfc3339())
            .returning_response();

        let response = host.call_service(call).await?;
        let events = response
            .as_ref()
            .and_then(|r| r.get(&entity_id))
            .and_then(|r| r.get("events"))
            .and_then(|e| e.as_array())
            .cloned()
            .unwrap_or_default();

        Ok(ToolOutput::success(json!({
            "entity_id": entity_id,
            "start": start.to_rfc3339(),
            "end": end.to_rfc3339(),
            "event_count": events.len(),
            "events": events,
        })))
    }
}

/// Creates an event on a calendar.
pub struct CalendarAddEvent;

impl CalendarAddEvent {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CalendarAddEvent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for CalendarAddEvent {
    fn name(&self) -> &str {
        "calendar_add_event"
    }

    fn description(&self) -> &str {
        "Add a new event to a calendar. \
         Creates a calendar event with title, start time, end time, and optional description and location."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "entity_id": {"type": "string", "description": "Calendar entity id"},
                "summary": {"type": "string", "description": "Event title"},
                "start_date_time": {"type": "string", "description": "ISO-8601 start"},
                "end_date_time": {"type": "string", "description": "ISO-8601 end"},
                "description": {"type": "string"},
                "location": {"type": "string"}
            },
            "required": ["entity_id", "summary", "start_date_time", "end_date_time"]
        })
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolOutput, ToolError> {
        let entity_id = args.get_string("entity_id")?;
        let summary = args.get_string("summary")?;
        let start_raw = args.get_string("start_date_time")?;
        let end_raw = args.get_string("end_date_time")?;
        let description = args.get_string_opt("description")?.filter(|s| !s.is_empty());
        let location = args.get_string_opt("location")?.filter(|s| !s.is_empty());
        let host = args.require_host(self.name())?;

        ensure_calendar(host, &entity_id).await?;

        let offset = *host.now().offset();
        parse_datetime("start_date_time", &start_raw, offset)?;
        parse_datetime("end_date_time", &end_raw, offset)?;

        debug!("calendar_add_event: '{}' on {}", summary, entity_id);

        let call = ServiceCall::new("calendar", "create_event")
            .with("entity_id", entity_id.as_str())
            .with("summary", summary.as_str())
            .with("start_date_time", start_raw.as_str())
            .with("end_date_time", end_raw.as_str())
            .with_opt("description", description)
            .with_opt("location", location);
        host.call_service(call).await?;

        Ok(ToolOutput::success(json!({
            "entity_id": entity_id,
            "summary": summary,
            "start": start_raw,
            "end": end_raw,
            "message": format!("Event '{}' created successfully", summary),
        })))
    }
}

/// Updates fields of an existing calendar event.
pub struct CalendarUpdateEvent;

impl CalendarUpdateEvent {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CalendarUpdateEvent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for CalendarUpdateEvent {
    fn name(&self) -> &str {
        "calendar_update_event"
    }

    fn description(&self) -> &str {
        "Update an existing calendar event. \
         Modify the title, start time, end time, description, or location of a calendar event. \
         Requires the event UID."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "entity_id": {"type": "string", "description": "Calendar entity id"},
                "uid": {"type": "string", "description": "Unique id of the event"},
                "summary": {"type": "string"},
                "start_date_time": {"type": "string", "description": "ISO-8601 start"},
                "end_date_time": {"type": "string", "description": "ISO-8601 end"},
                "description": {"type": "string"},
                "location": {"type": "string"}
            },
            "required": ["entity_id", "uid"]
        })
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolOutput, ToolError> {
        let entity_id = args.get_string("entity_id")?;
        let uid = args.get_string("uid")?;
        let summary = args.get_string_opt("summary")?;
        let start_raw = args.get_string_opt("start_date_time")?;
        let end_raw = args.get_string_opt("end_date_time")?;
        let description = args.get_string_opt("description")?;
        let location = args.get_string_opt("location")?;
        let host = args.require_host(self.name())?;

        ensure_calendar(host, &entity_id).await?;

        let offset = *host.now().offset();
        if let Some(raw) = &start_raw {
            parse_datetime("start_date_time", raw, offset)?;
        }
        if let Some(raw) = &end_raw {
            parse_datetime("end_date_time", raw, offset)?;
        }

        debug!("calendar_update_event: {} on {}", uid, entity_id);

        let call = ServiceCall::new("calendar", "update_event")
            .with("entity_id", entity_id.as_str())
            .with("uid", uid.as_str())
            .with_opt("summary", summary)
            .with_opt("start_date_time", start_raw)
            .with_opt("end_date_time", end_raw)
            .with_opt("description", description)
            .with_opt("location", location);
        host.call_service(call).await?;

        Ok(ToolOutput::success(json!({
            "entity_id": entity_id,
            "uid": uid,
            "message": format!("Event '{}' updated successfully", uid),
        })))
    }
}
