use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::validate;
use crate::AppState;
use shared::{
    Capabilities, CreateSceneRequest, ExportRequest, ExportResult, ExportType,
    PreviewResponse, Scene, SceneListResponse, ValidateRequest,
};

pub type ApiResponse = (StatusCode, Json<Value>);

/// Serialize `body` and mark it successful
fn success<T: Serialize>(status: StatusCode, body: &T) -> ApiResponse {
    let mut value = serde_json::to_value(body).unwrap_or_else(|_| json!({}));
    match value.as_object_mut() {
        Some(map) => {
            map.insert("success".into(), Value::Bool(true));
        }
        None => value = json!({ "success": true, "data": value }),
    }
    (status, Json(value))
}

fn failure(status: StatusCode, message: impl Into<String>) -> ApiResponse {
    let message = message.into();
    tracing::warn!(status = status.as_u16(), "{message}");
    (status, Json(json!({ "success": false, "error": message })))
}

fn scene_or_404(state: &AppState, scene_id: &str) -> Result<Scene, ApiResponse> {
    state
        .store
        .get(scene_id)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "Scene not found"))
}

/// Health check with feature flags
pub async fn health(State(state): State<AppState>) -> ApiResponse {
    let caps = Capabilities {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        blender_available: false,
        export_available: state.features.export,
        ai_available: false,
        scene_management_available: true,
        scene_preview_available: state.features.preview,
        scene_export_available: state.features.export,
    };
    success(StatusCode::OK, &caps)
}

pub async fn list_scenes(State(state): State<AppState>) -> ApiResponse {
    let scenes = state.store.list();
    success(StatusCode::OK, &SceneListResponse { scenes })
}

pub async fn create_scene(
    State(state): State<AppState>,
    body: Result<Json<CreateSceneRequest>, JsonRejection>,
) -> ApiResponse {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return failure(StatusCode::BAD_REQUEST, rejection.body_text()),
    };
    if request.name.trim().is_empty() {
        return failure(StatusCode::BAD_REQUEST, "Scene name is required");
    }

    match state.store.create(request) {
        Ok(summary) => success(StatusCode::CREATED, &summary),
        Err(msg) => failure(StatusCode::CONFLICT, msg),
    }
}

pub async fn get_scene(State(state): State<AppState>, Path(scene_id): Path<String>) -> ApiResponse {
    match scene_or_404(&state, &scene_id) {
        Ok(scene) => success(StatusCode::OK, &scene),
        Err(resp) => resp,
    }
}

/// Preview stub: hands back the URL a renderer would write to
pub async fn generate_preview(State(state): State<AppState>, Path(scene_id): Path<String>) -> ApiResponse {
    if !state.features.preview {
        return failure(StatusCode::SERVICE_UNAVAILABLE, "Scene preview is not available");
    }
    if let Err(resp) = scene_or_404(&state, &scene_id) {
        return resp;
    }
    let preview = PreviewResponse {
        preview_url: format!("/api/preview/{scene_id}_scene"),
    };
    success(StatusCode::OK, &preview)
}

pub async fn export_scene(
    State(state): State<AppState>,
    Path(scene_id): Path<String>,
    body: Result<Json<ExportRequest>, JsonRejection>,
) -> ApiResponse {
    if !state.features.export {
        return failure(StatusCode::SERVICE_UNAVAILABLE, "Scene export is not available");
    }
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return failure(StatusCode::BAD_REQUEST, rejection.body_text()),
    };
    let scene = match scene_or_404(&state, &scene_id) {
        Ok(scene) => scene,
        Err(resp) => return resp,
    };

    match plan_export(&scene, &request) {
        Ok(filenames) => {
            let object_count = match request.export_type {
                ExportType::Complete => scene.export_ready_count(),
                ExportType::Individual => 1,
                ExportType::Selective => request.object_ids.as_ref().map_or(0, Vec::len),
            };
            let result = ExportResult {
                download_urls: filenames
                    .iter()
                    .map(|f| format!("/api/scenes/{scene_id}/exports/{f}"))
                    .collect(),
                filenames,
                object_count: object_count as u32,
                format: request.format,
                total_size: 0,
            };
            tracing::info!(
                %scene_id,
                export_type = request.export_type.as_str(),
                files = result.filenames.len(),
                "export planned"
            );
            success(StatusCode::OK, &result)
        }
        Err(resp) => resp,
    }
}

/// Work out the output file names for an export request
fn plan_export(scene: &Scene, request: &ExportRequest) -> Result<Vec<String>, ApiResponse> {
    let ext = request.format.extension();
    let base = request
        .filename
        .as_deref()
        .map(slug)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| scene_base_name(scene));

    match request.export_type {
        ExportType::Complete => {
            if scene.export_ready_count() == 0 {
                return Err(failure(StatusCode::BAD_REQUEST, "No export-ready objects in scene"));
            }
            Ok(vec![format!("{base}.{ext}")])
        }
        ExportType::Individual => {
            let Some(object_id) = request.object_id.as_deref() else {
                return Err(failure(StatusCode::BAD_REQUEST, "object_id required for individual export"));
            };
            let Some(obj) = scene.object(object_id) else {
                return Err(failure(StatusCode::NOT_FOUND, "Object not found in scene"));
            };
            let name = match &request.filename {
                Some(_) => base,
                None => format!("{base}_{}", slug_or(&obj.name, &obj.id)),
            };
            Ok(vec![format!("{name}.{ext}")])
        }
        ExportType::Selective => {
            let ids = request.object_ids.as_deref().unwrap_or_default();
            if ids.is_empty() {
                return Err(failure(StatusCode::BAD_REQUEST, "object_ids required for selective export"));
            }
            let missing: Vec<&str> = ids
                .iter()
                .map(String::as_str)
                .filter(|id| !scene.contains_object(id))
                .collect();
            if !missing.is_empty() {
                return Err(failure(
                    StatusCode::BAD_REQUEST,
                    format!("Objects not found in scene: {}", missing.join(", ")),
                ));
            }
            if request.combined_file.unwrap_or(true) {
                Ok(vec![format!("{base}_selection.{ext}")])
            } else {
                Ok(ids
                    .iter()
                    .map(|id| format!("{base}_{}.{ext}", slug_or(id, id)))
                    .collect())
            }
        }
    }
}

fn scene_base_name(scene: &Scene) -> String {
    slug_or(&scene.name, scene.scene_id())
}

fn slug_or(name: &str, fallback: &str) -> String {
    let s = slug(name);
    if s.is_empty() {
        slug(fallback)
    } else {
        s
    }
}

/// Lowercase, with runs of anything but `[a-z0-9]` collapsed to `_`
fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_end_matches('_').to_string()
}

pub async fn validate_scene(
    State(state): State<AppState>,
    Path(scene_id): Path<String>,
    body: Result<Json<ValidateRequest>, JsonRejection>,
) -> ApiResponse {
    let mut scene = match scene_or_404(&state, &scene_id) {
        Ok(scene) => scene,
        Err(resp) => return resp,
    };
    let auto_fix = body.map(|Json(req)| req.auto_fix).unwrap_or_default();
    let report = validate::validate_scene(&mut scene, auto_fix);
    if report.auto_fixes_applied > 0 {
        state.store.save(scene);
    }
    success(StatusCode::OK, &report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{app, Features};
    use axum::body::Body;
    use axum::http::Request;
    use shared::{ObjectType, SceneObject};
    use tower::ServiceExt;

    async fn call(state: &AppState, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn seeded(state: &AppState, name: &str, objects: Vec<SceneObject>) -> String {
        state
            .store
            .create(CreateSceneRequest {
                name: name.into(),
                description: String::new(),
                objects,
            })
            .unwrap()
            .scene_id
    }

    fn office(state: &AppState) -> String {
        seeded(
            state,
            "Desk Setup",
            vec![
                SceneObject::new("o1", "desk", ObjectType::Cube, 2.0),
                SceneObject::new("o2", "lamp", ObjectType::Cylinder, 0.5),
                SceneObject::new("o3", "chair", ObjectType::Cube, 1.0),
            ],
        )
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug("Desk Setup"), "desk_setup");
        assert_eq!(slug("  a--b!! "), "a_b");
        assert_eq!(slug("***"), "");
    }

    #[tokio::test]
    async fn test_health_reports_features() {
        let state = AppState::new(Features {
            preview: false,
            export: true,
        });
        let (status, body) = call(&state, "GET", "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["scene_preview_available"], false);
        assert_eq!(body["scene_export_available"], true);
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let state = AppState::default();
        let (status, body) = call(
            &state,
            "POST",
            "/api/scenes",
            Some(json!({ "name": "Office", "description": "desk" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["name"], "Office");

        let (_, body) = call(&state, "GET", "/api/scenes", None).await;
        assert_eq!(body["scenes"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_requires_name() {
        let state = AppState::default();
        let (status, body) = call(&state, "POST", "/api/scenes", Some(json!({ "name": "  " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Scene name is required");
    }

    #[tokio::test]
    async fn test_create_duplicate_conflicts() {
        let state = AppState::default();
        seeded(&state, "Office", vec![]);
        let (status, body) = call(&state, "POST", "/api/scenes", Some(json!({ "name": "office" }))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_get_unknown_scene() {
        let state = AppState::default();
        let (status, body) = call(&state, "GET", "/api/scenes/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Scene not found");
    }

    #[tokio::test]
    async fn test_preview_disabled() {
        let state = AppState::new(Features {
            preview: false,
            export: true,
        });
        let id = office(&state);
        let (status, _) = call(&state, "POST", &format!("/api/scenes/{id}/preview"), Some(json!({}))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_preview_url() {
        let state = AppState::default();
        let id = office(&state);
        let (status, body) = call(&state, "POST", &format!("/api/scenes/{id}/preview"), Some(json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["preview_url"], format!("/api/preview/{id}_scene"));
    }

    #[tokio::test]
    async fn test_complete_export_of_empty_scene_rejected() {
        let state = AppState::default();
        let id = seeded(&state, "Bare", vec![]);
        let (status, body) = call(
            &state,
            "POST",
            &format!("/api/scenes/{id}/export"),
            Some(json!({ "export_type": "complete", "format": "obj" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_selective_export_separate_files() {
        let state = AppState::default();
        let id = office(&state);
        let (status, body) = call(
            &state,
            "POST",
            &format!("/api/scenes/{id}/export"),
            Some(json!({
                "export_type": "selective",
                "format": "stl",
                "object_ids": ["o1", "o3"],
                "combined_file": false
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["filenames"], json!(["desk_setup_o1.stl", "desk_setup_o3.stl"]));
        assert_eq!(body["object_count"], 2);
        assert_eq!(
            body["download_urls"][0],
            format!("/api/scenes/{id}/exports/desk_setup_o1.stl")
        );
    }

    #[tokio::test]
    async fn test_selective_export_combined_by_default() {
        let state = AppState::default();
        let id = office(&state);
        let (_, body) = call(
            &state,
            "POST",
            &format!("/api/scenes/{id}/export"),
            Some(json!({ "export_type": "selective", "format": "gltf", "object_ids": ["o2"] })),
        )
        .await;
        assert_eq!(body["filenames"], json!(["desk_setup_selection.gltf"]));
    }

    #[tokio::test]
    async fn test_selective_export_unknown_object() {
        let state = AppState::default();
        let id = office(&state);
        let (status, body) = call(
            &state,
            "POST",
            &format!("/api/scenes/{id}/export"),
            Some(json!({ "export_type": "selective", "format": "obj", "object_ids": ["o9"] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("o9"));
    }

    #[tokio::test]
    async fn test_individual_export_with_filename() {
        let state = AppState::default();
        let id = office(&state);
        let (_, body) = call(
            &state,
            "POST",
            &format!("/api/scenes/{id}/export"),
            Some(json!({
                "export_type": "individual",
                "format": "obj",
                "object_id": "o2",
                "filename": "My Lamp"
            })),
        )
        .await;
        assert_eq!(body["filenames"], json!(["my_lamp.obj"]));

        let (status, _) = call(
            &state,
            "POST",
            &format!("/api/scenes/{id}/export"),
            Some(json!({ "export_type": "individual", "format": "obj", "object_id": "zz" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_validate_auto_fix_persists() {
        let state = AppState::default();
        let id = seeded(
            &state,
            "Room",
            vec![SceneObject::new("o1", "", ObjectType::Sphere, 1.0)],
        );
        let (_, body) = call(
            &state,
            "POST",
            &format!("/api/scenes/{id}/validate"),
            Some(json!({ "auto_fix": true })),
        )
        .await;
        assert_eq!(body["auto_fixes_applied"], 1);
        assert_eq!(state.store.get(&id).unwrap().objects[0].name, "sphere_o1");
    }
}
