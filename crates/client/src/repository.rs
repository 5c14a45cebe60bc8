//! Scene repository: maps scene intents onto the REST API.
//!
//! Every call is one-shot. Responses are normalized into [`SessionResult`]:
//! transport problems become `Network`, a `success: false` body becomes
//! `Server` (or `NotFound` when loading a scene).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use shared::{
    Capabilities, CreateSceneRequest, ExportRequest, ExportResult, PreviewResponse, Scene, SceneId,
    SceneListResponse, SceneSummary, ValidateRequest, ValidationReport,
};

use crate::error::{SessionError, SessionResult};
use crate::settings::ClientSettings;

/// Stateless access to the scene resource
#[async_trait]
pub trait SceneRepository: Send + Sync {
    /// GET /api/scenes
    async fn list_scenes(&self) -> SessionResult<Vec<SceneSummary>>;

    /// POST /api/scenes. The caller validates `name`.
    async fn create_scene(&self, name: &str, description: &str) -> SessionResult<SceneId>;

    /// GET /api/scenes/{id}
    async fn load_scene(&self, scene_id: &str) -> SessionResult<Scene>;

    /// POST /api/scenes/{id}/preview. The returned URL is not cache-busted.
    async fn generate_preview(&self, scene_id: &str) -> SessionResult<String>;

    /// POST /api/scenes/{id}/export
    async fn export_scene(&self, scene_id: &str, request: &ExportRequest) -> SessionResult<ExportResult>;

    /// POST /api/scenes/{id}/validate
    async fn validate_scene(&self, scene_id: &str, auto_fix: bool) -> SessionResult<ValidationReport>;

    /// GET /api/health
    async fn health(&self) -> SessionResult<Capabilities>;
}

/// [`SceneRepository`] over HTTP
pub struct HttpSceneRepository {
    client: reqwest::Client,
    base: Url,
}

impl HttpSceneRepository {
    pub fn new(settings: &ClientSettings) -> SessionResult<Self> {
        let base = Url::parse(settings.base_url.trim())
            .map_err(|e| SessionError::Validation(format!("Invalid server URL '{}': {e}", settings.base_url)))?;
        if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
            return Err(SessionError::Validation(format!(
                "Server URL must be http(s): '{}'",
                settings.base_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(settings.user_agent.clone())
            .build()?;

        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Build an endpoint URL from path segments (each segment is escaped)
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Resolve a server-supplied URL, which is usually host-relative
    fn resolve(&self, url: &str) -> String {
        self.base
            .join(url)
            .map(String::from)
            .unwrap_or_else(|_| url.to_string())
    }

    async fn get_json(&self, segments: &[&str]) -> SessionResult<Value> {
        let url = self.endpoint(segments);
        tracing::debug!("GET {url}");
        let response = self.client.get(url).send().await?;
        read_envelope(response).await
    }

    async fn post_json<B: Serialize + ?Sized + Sync>(&self, segments: &[&str], body: &B) -> SessionResult<Value> {
        let url = self.endpoint(segments);
        tracing::debug!("POST {url}");
        let response = self.client.post(url).json(body).send().await?;
        read_envelope(response).await
    }
}

/// Check the transport status and the `success` flag of a response body.
///
/// A body without `success` counts as successful on 2xx and as failed
/// otherwise; several backend routes omit the flag.
async fn read_envelope(response: reqwest::Response) -> SessionResult<Value> {
    let status = response.status();
    let text = response.text().await?;

    let body: Value = match serde_json::from_str(&text) {
        Ok(body) => body,
        Err(e) if status.is_success() => {
            return Err(SessionError::Network(format!("Malformed JSON response: {e}")));
        }
        Err(_) => return Err(SessionError::Network(format!("Server returned HTTP {status}"))),
    };

    let success = body
        .get("success")
        .and_then(Value::as_bool)
        .unwrap_or(status.is_success());
    if !success {
        return Err(SessionError::Server(failure_message(&body, status)));
    }
    Ok(body)
}

fn failure_message(body: &Value, status: StatusCode) -> String {
    ["error", "message"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .filter(|msg| !msg.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Request failed (HTTP {status})"))
}

/// A failed scene lookup is `NotFound` only when the server said 404
fn not_found_on_404(err: SessionError, status: StatusCode) -> SessionError {
    match err {
        SessionError::Server(msg) if status == StatusCode::NOT_FOUND => SessionError::NotFound(msg),
        other => other,
    }
}

fn decode<T: DeserializeOwned>(body: Value, what: &str) -> SessionResult<T> {
    serde_json::from_value(body).map_err(|e| SessionError::Network(format!("Malformed {what} response: {e}")))
}

#[async_trait]
impl SceneRepository for HttpSceneRepository {
    async fn list_scenes(&self) -> SessionResult<Vec<SceneSummary>> {
        let body = self.get_json(&["api", "scenes"]).await?;
        let list: SceneListResponse = decode(body, "scene list")?;
        Ok(list.scenes)
    }

    async fn create_scene(&self, name: &str, description: &str) -> SessionResult<SceneId> {
        let request = CreateSceneRequest {
            name: name.to_string(),
            description: description.to_string(),
            objects: Vec::new(),
        };
        let body = self.post_json(&["api", "scenes"], &request).await?;
        let created: SceneSummary = decode(body, "create scene")?;
        Ok(created.scene_id)
    }

    async fn load_scene(&self, scene_id: &str) -> SessionResult<Scene> {
        let url = self.endpoint(&["api", "scenes", scene_id]);
        tracing::debug!("GET {url}");
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = read_envelope(response).await.map_err(|e| not_found_on_404(e, status))?;
        decode(body, "scene")
    }

    async fn generate_preview(&self, scene_id: &str) -> SessionResult<String> {
        let body = self
            .post_json(&["api", "scenes", scene_id, "preview"], &serde_json::json!({}))
            .await?;
        let preview: PreviewResponse = decode(body, "preview")?;
        Ok(self.resolve(&preview.preview_url))
    }

    async fn export_scene(&self, scene_id: &str, request: &ExportRequest) -> SessionResult<ExportResult> {
        let body = self.post_json(&["api", "scenes", scene_id, "export"], request).await?;
        let mut result: ExportResult = decode(body, "export")?;
        if result.download_urls.len() != result.filenames.len() {
            return Err(SessionError::Network(format!(
                "Malformed export response: {} download URLs for {} filenames",
                result.download_urls.len(),
                result.filenames.len()
            )));
        }
        result.download_urls = result.download_urls.iter().map(|u| self.resolve(u)).collect();
        Ok(result)
    }

    async fn validate_scene(&self, scene_id: &str, auto_fix: bool) -> SessionResult<ValidationReport> {
        let body = self
            .post_json(&["api", "scenes", scene_id, "validate"], &ValidateRequest { auto_fix })
            .await?;
        decode(body, "validation")
    }

    async fn health(&self) -> SessionResult<Capabilities> {
        let body = self.get_json(&["api", "health"]).await?;
        decode(body, "health")
    }
}
