//! [`HostServices`] over the Home Assistant REST API.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use toolset_core::{EntityState, HostError, HostServices, ServiceCall};
use tracing::{debug, info, warn};

use crate::config::{HassConfig, HassConfigError};

/// Subset of `GET /api/config`.
#[derive(Debug, Deserialize)]
struct CoreConfig {
    #[serde(default)]
    components: Vec<String>,
}

/// Body of a service call made with `?return_response`.
#[derive(Debug, Deserialize)]
struct ServiceResponse {
    #[serde(default)]
    service_response: Option<Value>,
}

/// REST client for one Home Assistant instance.
pub struct HassClient {
    client: Client,
    config: HassConfig,
}

impl HassClient {
    /// Create a client for the configured instance.
    pub fn new(config: HassConfig) -> Result<Self, HostError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| HostError::Unavailable(format!("Failed to create HTTP client: {}", e)))?;

        info!("Home Assistant client initialized for {}", config.url);

        Ok(Self { client, config })
    }

    /// Create a client from environment variables.
    ///
    /// See [`HassConfig::from_env`] for the variables read.
    pub fn from_env() -> Result<Self, HostError> {
        let config = HassConfig::from_env().map_err(config_error)?;
        Self::new(config)
    }

    fn endpoint(&self, path: &str) -> Result<url::Url, HostError> {
        self.config.endpoint(path).map_err(config_error)
    }

    async fn get(&self, path: &str) -> Result<Response, HostError> {
        let url = self.endpoint(path)?;
        debug!("GET {}", url);
        self.client
            .get(url)
            .bearer_auth(&self.config.token)
            .send()
            .await
            .map_err(transport_error)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, HostError> {
        let response = checked(self.get(path).await?, path).await?;
        let body = response.text().await.map_err(transport_error)?;
        Ok(serde_json::from_str(&body)?)
    }
}

fn config_error(error: HassConfigError) -> HostError {
    HostError::Unavailable(error.to_string())
}

fn transport_error(error: reqwest::Error) -> HostError {
    if error.is_connect() || error.is_timeout() {
        HostError::Unavailable(error.to_string())
    } else {
        HostError::Http(error.to_string())
    }
}

/// Whether `id` has the `domain.object_id` shape, lowercase letters, digits
/// and underscores on both sides.
fn is_entity_id(id: &str) -> bool {
    let valid = |part: &str| {
        !part.is_empty()
            && part
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    };

    match id.split_once('.') {
        Some((domain, object_id)) => valid(domain) && valid(object_id),
        None => false,
    }
}

/// Turn non-2xx responses into errors carrying the body text.
async fn checked(response: Response, what: &str) -> Result<Response, HostError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    warn!("{} returned {}: {}", what, status, body);

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(HostError::Unavailable(format!("{} (check the access token)", status)))
        }
        _ => Err(HostError::Http(format!("{} for {}: {}", status, what, body.trim()))),
    }
}

#[async_trait]
impl HostServices for HassClient {
    async fn entity_state(&self, entity_id: &str) -> Result<Option<EntityState>, HostError> {
        if !is_entity_id(entity_id) {
            debug!("'{}' is not an entity id", entity_id);
            return Ok(None);
        }

        let path = format!("api/states/{}", entity_id);
        let response = self.get(&path).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = checked(response, &path).await?;
        let body = response.text().await.map_err(transport_error)?;
        Ok(Some(serde_json::from_str(&body)?))
    }

    async fn has_component(&self, component: &str) -> Result<bool, HostError> {
        let config: CoreConfig = self.get_json("api/config").await?;
        Ok(config.components.iter().any(|c| c == component))
    }

    async fn call_service(&self, call: ServiceCall) -> Result<Option<Value>, HostError> {
        let label = call.label();
        let mut url = self.endpoint(&format!("api/services/{}/{}", call.domain, call.service))?;
        if call.return_response {
            url.set_query(Some("return_response"));
        }

        debug!("POST {} ({} fields)", url, call.data.len());

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.token)
            .json(&call.data)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("{} returned {}: {}", label, status, body);
            let message = if body.trim().is_empty() {
                status.to_string()
            } else {
                body.trim().to_string()
            };
            return Err(HostError::service(&call.domain, &call.service, message));
        }

        if !call.return_response {
            return Ok(None);
        }

        let body = response.text().await.map_err(transport_error)?;
        let parsed: ServiceResponse = serde_json::from_str(&body)?;
        Ok(parsed.service_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client(server: &MockServer) -> HassClient {
        HassClient::new(HassConfig::new(&server.uri(), "secret").unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_entity_state() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/states/calendar.family"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "entity_id": "calendar.family",
                "state": "off",
                "attributes": {"friendly_name": "Family"}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/states/calendar.work"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Entity not found."})))
            .mount(&server)
            .await;

        let client = client(&server).await;
        let state = client.entity_state("calendar.family").await.unwrap().unwrap();
        assert_eq!(state.state, "off");
        assert_eq!(state.domain(), "calendar");
        assert!(client.entity_state("calendar.work").await.unwrap().is_none());
    }

    #[test]
    fn test_entity_id_shape() {
        assert!(is_entity_id("calendar.family"));
        assert!(is_entity_id("media_player.living_room_2"));
        for id in ["../config", "calendar", "calendar.", ".family", "calendar.fam/../x", "Calendar.Family", "a.b.c"] {
            assert!(!is_entity_id(id), "{} accepted", id);
        }
    }

    #[tokio::test]
    async fn test_malformed_entity_id_never_requested() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"components": []})))
            .expect(0)
            .mount(&server)
            .await;

        let client = client(&server).await;
        for id in ["../config", "calendar.family/../../config", "calendar.family?x=1"] {
            assert!(client.entity_state(id).await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn test_components() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/config"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "components": ["automation", "media_source", "http"],
                "time_zone": "Europe/Berlin"
            })))
            .mount(&server)
            .await;

        let client = client(&server).await;
        assert!(client.has_component("automation").await.unwrap());
        assert!(!client.has_component("waze_travel_time").await.unwrap());
    }

    #[tokio::test]
    async fn test_call_service_with_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/services/calendar/get_events"))
            .and(query_param("return_response", ""))
            .and(body_json(json!({"entity_id": "calendar.family"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "changed_states": [],
                "service_response": {"calendar.family": {"events": []}}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let call = ServiceCall::new("calendar", "get_events")
            .with("entity_id", "calendar.family")
            .returning_response();
        let response = client(&server).await.call_service(call).await.unwrap();
        assert_eq!(response, Some(json!({"calendar.family": {"events": []}})));
    }

    #[tokio::test]
    async fn test_call_service_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/services/automation/reload"))
            .respond_with(ResponseTemplate::new(400).set_body_string("Invalid service data"))
            .mount(&server)
            .await;

        let err = client(&server)
            .await
            .call_service(ServiceCall::new("automation", "reload"))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Service automation.reload failed: Invalid service data"
        );
    }

    #[tokio::test]
    async fn test_call_service_without_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/services/media_player/play_media"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let call = ServiceCall::new("media_player", "play_media").with("entity_id", "media_player.den");
        let response = client(&server).await.call_service(call).await.unwrap();
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/config"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client(&server).await.has_component("automation").await.unwrap_err();
        assert!(matches!(err, HostError::Unavailable(_)));
    }
}
