//! Travel time and distance lookups through the host's routing service.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use toolset_core::{HostServices, ServiceCall};
use tracing::{debug, warn};

use crate::config::TravelConfig;
use crate::error::ToolError;
use crate::tool::{Tool, ToolArgs, ToolOutput};

fn route_parameters() -> Value {
    json!({
        "type": "object",
        "properties": {
            "origin": {"type": "string", "description": "Start address or 'lat,lon'"},
            "destination": {"type": "string", "description": "End address or 'lat,lon'"}
        },
        "required": ["origin", "destination"]
    })
}

/// Ask the routing service for a route and return one field of its response.
async fn lookup_route(
    host: &Arc<dyn HostServices>,
    travel: &TravelConfig,
    origin: &str,
    destination: &str,
    field: &str,
) -> Result<Value, ToolError> {
    let call = ServiceCall::new("waze_travel_time", "get_travel_time")
        .with("origin", origin)
        .with("destination", destination)
        .with("region", travel.region.as_str())
        .with("units", travel.units.as_str())
        .with("vehicle_type", travel.vehicle_type.as_str())
        .with("avoid_tolls", false)
        .returning_response();

    let response = host.call_service(call).await?;
    match response.as_ref().and_then(|r| r.get(field)) {
        Some(value) if !value.is_null() => Ok(value.clone()),
        _ => {
            warn!("Travel service response carried no '{}'", field);
            Err(ToolError::upstream(
                "Travel time lookup",
                format!("response did not include '{}'", field),
            ))
        }
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Estimated travel time between two locations.
pub struct GetTravelTime {
    travel: TravelConfig,
}

impl GetTravelTime {
    pub fn new(travel: TravelConfig) -> Self {
        Self { travel }
    }
}

#[async_trait]
impl Tool for GetTravelTime {
    fn name(&self) -> &str {
        "get_travel_time"
    }

    fn description(&self) -> &str {
        "Get estimated travel time between two locations using Waze navigation data. \
         Provide origin and destination as addresses or GPS coordinates. \
         Returns travel time in minutes based on current traffic conditions."
    }

    fn parameters(&self) -> Value {
        route_parameters()
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolOutput, ToolError> {
        let origin = args.get_string("origin")?;
        let destination = args.get_string("destination")?;
        let host = args.require_host(self.name())?;

        debug!("get_travel_time: '{}' -> '{}'", origin, destination);

        let minutes = lookup_route(host, &self.travel, &origin, &destination, "duration").await?;

        Ok(ToolOutput::success(json!({
            "origin": origin,
            "destination": destination,
            "travel_time_minutes": minutes,
            "message": format!(
                "Travel time from '{}' to '{}' is {} minutes",
                origin,
                destination,
                display(&minutes)
            ),
        })))
    }
}

/// Estimated route distance between two locations.
pub struct GetTravelDistance {
    travel: TravelConfig,
}

impl GetTravelDistance {
    pub fn new(travel: TravelConfig) -> Self {
        Self { travel }
    }

    fn unit_label(&self) -> &'static str {
        if self.travel.units == "metric" {
            "kilometers"
        } else {
            "miles"
        }
    }

    /// Result key for the distance, named after the configured unit.
    fn distance_key(&self) -> String {
        format!("distance_{}", self.unit_label())
    }
}

#[async_trait]
impl Tool for GetTravelDistance {
    fn name(&self) -> &str {
        "get_travel_distance"
    }

    fn description(&self) -> &str {
        "Get estimated travel distance between two locations using Waze navigation data. \
         Provide origin and destination as addresses or GPS coordinates. \
         Returns the distance of the recommended route."
    }

    fn parameters(&self) -> Value {
        route_parameters()
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolOutput, ToolError> {
        let origin = args.get_string("origin")?;
        let destination = args.get_string("destination")?;
        let host = args.require_host(self.name())?;

        debug!("get_travel_distance: '{}' -> '{}'", origin, destination);

        let distance = lookup_route(host, &self.travel, &origin, &destination, "distance").await?;

        let message = format!(
            "Distance from '{}' to '{}' is {} {}",
            origin,
            destination,
            display(&distance),
            self.unit_label()
        );

        Ok(ToolOutput::success(json!({
            "origin": origin,
            "destination": destination,
            "unit": self.unit_label(),
            "message": message,
        }))
        .with(self.distance_key(), distance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::FakeHost;

    fn route() -> Value {
        json!({"duration": 23.5, "distance": 12.1, "route": "I-90 E"})
    }

    #[tokio::test]
    async fn test_travel_time() {
        let (host, args) = FakeHost::new()
            .with_response("waze_travel_time.get_travel_time", route())
            .into_args(json!({"origin": "Home", "destination": "Work"}));

        let output = GetTravelTime::new(TravelConfig::default())
            .execute(args)
            .await
            .unwrap();
        assert_eq!(output.get("travel_time_minutes"), Some(&json!(23.5)));
        assert_eq!(
            output.get("message"),
            Some(&json!("Travel time from 'Home' to 'Work' is 23.5 minutes"))
        );

        let call = &host.calls()[0];
        assert!(call.return_response);
        assert_eq!(call.data["region"], json!("us"));
        assert_eq!(call.data["units"], json!("imperial"));
        assert_eq!(call.data["vehicle_type"], json!("car"));
        assert_eq!(call.data["avoid_tolls"], json!(false));
    }

    #[tokio::test]
    async fn test_travel_distance_uses_configured_region() {
        let travel = TravelConfig {
            region: "eu".to_string(),
            units: "metric".to_string(),
            vehicle_type: "motorcycle".to_string(),
        };
        let (host, args) = FakeHost::new()
            .with_response("waze_travel_time.get_travel_time", route())
            .into_args(json!({"origin": "Berlin", "destination": "Potsdam"}));

        let output = GetTravelDistance::new(travel).execute(args).await.unwrap();
        assert_eq!(output.get("distance_kilometers"), Some(&json!(12.1)));
        assert!(output.get("distance_miles").is_none());
        assert_eq!(output.get("unit"), Some(&json!("kilometers")));
        assert_eq!(
            output.get("message"),
            Some(&json!("Distance from 'Berlin' to 'Potsdam' is 12.1 kilometers"))
        );
        assert_eq!(host.calls()[0].data["region"], json!("eu"));
    }

    #[tokio::test]
    async fn test_travel_distance_imperial() {
        let (_, args) = FakeHost::new()
            .with_response("waze_travel_time.get_travel_time", route())
            .into_args(json!({"origin": "Home", "destination": "Work"}));

        let output = GetTravelDistance::new(TravelConfig::default())
            .execute(args)
            .await
            .unwrap();
        assert_eq!(output.get("distance_miles"), Some(&json!(12.1)));
        assert!(output.get("distance_kilometers").is_none());
        assert_eq!(output.get("unit"), Some(&json!("miles")));
    }

    #[tokio::test]
    async fn test_missing_field_is_upstream_error() {
        let (_, args) = FakeHost::new()
            .with_response("waze_travel_time.get_travel_time", json!({"route": "?"}))
            .into_args(json!({"origin": "Home", "destination": "Work"}));

        let err = GetTravelTime::new(TravelConfig::default())
            .execute(args)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Upstream);
    }

    #[tokio::test]
    async fn test_missing_destination() {
        let (host, args) = FakeHost::new().into_args(json!({"origin": "Home"}));
        let result = GetTravelDistance::new(TravelConfig::default())
            .execute(args)
            .await;
        assert!(matches!(result, Err(ToolError::MissingParameter(_))));
        assert!(host.calls().is_empty());
    }
}
