// Transport boundary to the veto backend: trait plus the HTTP implementation.
//
// Every session transition is requested here and answered with the new
// canonical session; callers adopt the response wholesale and never patch
// state locally. Implementations: `HttpTransport` (reqwest, JSON REST) and
// `local::LocalTransport` (in-process, for demo flows and tests).

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::session::model::{
    CreatePoolRequest, CreateSessionRequest, MapPool, NextAction, VetoSession,
};
use crate::veto::rules::VetoRuleError;
use crate::veto::{Side, Team};

/// Failures at the collaborator boundary. Rule violations surface with the
/// backend's own wording so the UI can show them directly.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("server rejected the request ({status}): {message}")]
    Api { status: u16, message: String },
    #[error(transparent)]
    Rule(#[from] VetoRuleError),
}

/// Session collaborator contract.
///
/// Mirrors the backend's REST surface one method per endpoint. Mutating
/// calls return the full updated session; `next_action` is the only
/// read-only query besides the session fetches.
#[async_trait]
pub trait VetoTransport: Send + Sync {
    async fn create_session(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<VetoSession, TransportError>;

    async fn session_by_id(&self, id: u64) -> Result<VetoSession, TransportError>;

    async fn session_by_token(&self, token: &str) -> Result<VetoSession, TransportError>;

    async fn ban_map(
        &self,
        session_id: u64,
        map_id: u64,
        team: Team,
    ) -> Result<VetoSession, TransportError>;

    async fn pick_map(
        &self,
        session_id: u64,
        map_id: u64,
        team: Team,
    ) -> Result<VetoSession, TransportError>;

    async fn select_side(
        &self,
        session_id: u64,
        side: Side,
        team: Team,
    ) -> Result<VetoSession, TransportError>;

    async fn start_session(&self, session_id: u64) -> Result<VetoSession, TransportError>;

    async fn reset_session(&self, session_id: u64) -> Result<VetoSession, TransportError>;

    async fn next_action(&self, session_id: u64) -> Result<NextAction, TransportError>;

    async fn map_pools(&self, game_id: u64) -> Result<Vec<MapPool>, TransportError>;

    async fn create_map_pool(
        &self,
        request: &CreatePoolRequest,
    ) -> Result<MapPool, TransportError>;

    async fn delete_map_pool(&self, pool_id: u64) -> Result<(), TransportError>;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// JSON REST client for the backend's veto and map-pool endpoints.
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(serde::Serialize)]
struct MapActionBody {
    map_id: u64,
    team: Team,
}

#[derive(serde::Serialize)]
struct SideBody {
    side: Side,
    team: Team,
}

impl HttpTransport {
    /// Create a client against `base_url`, e.g. `http://localhost:8080`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            auth_token: None,
        }
    }

    /// Attach a bearer token to every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.authorized(self.http.get(self.url(path)))
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.authorized(self.http.post(self.url(path)))
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn read_json<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, TransportError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status.as_u16(), &body));
        }
        Ok(response.json::<T>().await?)
    }
}

/// Turn a non-2xx response into a typed error, preferring the backend's
/// `{"error": ...}` body over the bare status line.
fn api_error(status: u16, body: &str) -> TransportError {
    let message = match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.error,
        Err(_) if !body.trim().is_empty() => body.trim().to_string(),
        Err(_) => format!("request failed with status {status}"),
    };
    debug!(status, %message, "api error response");
    TransportError::Api { status, message }
}

#[async_trait]
impl VetoTransport for HttpTransport {
    async fn create_session(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<VetoSession, TransportError> {
        let response = self.post("/api/veto/sessions").json(request).send().await?;
        Self::read_json(response).await
    }

    async fn session_by_id(&self, id: u64) -> Result<VetoSession, TransportError> {
        let response = self.get(&format!("/api/veto/sessions/{id}")).send().await?;
        Self::read_json(response).await
    }

    async fn session_by_token(&self, token: &str) -> Result<VetoSession, TransportError> {
        let response = self
            .get(&format!("/api/veto/sessions/share/{token}"))
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn ban_map(
        &self,
        session_id: u64,
        map_id: u64,
        team: Team,
    ) -> Result<VetoSession, TransportError> {
        let response = self
            .post(&format!("/api/veto/sessions/{session_id}/ban"))
            .json(&MapActionBody { map_id, team })
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn pick_map(
        &self,
        session_id: u64,
        map_id: u64,
        team: Team,
    ) -> Result<VetoSession, TransportError> {
        let response = self
            .post(&format!("/api/veto/sessions/{session_id}/pick"))
            .json(&MapActionBody { map_id, team })
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn select_side(
        &self,
        session_id: u64,
        side: Side,
        team: Team,
    ) -> Result<VetoSession, TransportError> {
        let response = self
            .post(&format!("/api/veto/sessions/{session_id}/select-side"))
            .json(&SideBody { side, team })
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn start_session(&self, session_id: u64) -> Result<VetoSession, TransportError> {
        let response = self
            .post(&format!("/api/veto/sessions/{session_id}/start"))
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn reset_session(&self, session_id: u64) -> Result<VetoSession, TransportError> {
        let response = self
            .post(&format!("/api/veto/sessions/{session_id}/reset"))
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn next_action(&self, session_id: u64) -> Result<NextAction, TransportError> {
        let response = self
            .get(&format!("/api/veto/sessions/{session_id}/next-action"))
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn map_pools(&self, game_id: u64) -> Result<Vec<MapPool>, TransportError> {
        let response = self
            .get(&format!("/api/map-pools/games/{game_id}"))
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn create_map_pool(
        &self,
        request: &CreatePoolRequest,
    ) -> Result<MapPool, TransportError> {
        let response = self.post("/api/map-pools").json(request).send().await?;
        Self::read_json(response).await
    }

    async fn delete_map_pool(&self, pool_id: u64) -> Result<(), TransportError> {
        let response = self
            .authorized(self.http.delete(self.url(&format!("/api/map-pools/{pool_id}"))))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status.as_u16(), &body));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_doubling_slashes() {
        let transport = HttpTransport::new("http://localhost:8080/");
        assert_eq!(
            transport.url("/api/veto/sessions/3"),
            "http://localhost:8080/api/veto/sessions/3"
        );
    }

    #[test]
    fn api_error_prefers_backend_error_body() {
        let err = api_error(403, r#"{"error":"not your turn"}"#);
        match err {
            TransportError::Api { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "not your turn");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn api_error_falls_back_to_raw_body_then_status() {
        match api_error(500, "upstream exploded") {
            TransportError::Api { message, .. } => assert_eq!(message, "upstream exploded"),
            other => panic!("unexpected error: {other:?}"),
        }
        match api_error(502, "  ") {
            TransportError::Api { message, .. } => {
                assert_eq!(message, "request failed with status 502")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rule_errors_pass_their_wording_through() {
        let err: TransportError = VetoRuleError::NotYourTurn.into();
        assert_eq!(err.to_string(), "not your turn");
    }
}
