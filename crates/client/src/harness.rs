//! Headless test doubles for driving a [`SceneSession`] without a server.
//!
//! `MockRepository` keeps scenes in memory, records every call, can be told
//! to fail a given endpoint, and can hold a scene load open until released
//! (for ordering tests). `RecordingSink` captures notifications.
//!
//! [`SceneSession`]: crate::session::SceneSession

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use shared::{
    Capabilities, ExportRequest, ExportResult, ExportType, IssueSeverity, Scene, SceneId, SceneObject,
    SceneSummary, ValidationIssue, ValidationReport, ValidationStatistics,
};
use tokio::sync::Notify;

use crate::error::{SessionError, SessionResult};
use crate::notify::{NotificationSink, Severity};
use crate::repository::SceneRepository;
use crate::session::SceneSession;

/// Repository endpoints, for failure injection and call counting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    ListScenes,
    CreateScene,
    LoadScene,
    GeneratePreview,
    ExportScene,
    ValidateScene,
    Health,
}

/// One recorded repository call
#[derive(Debug, Clone, PartialEq)]
pub enum RepoCall {
    ListScenes,
    CreateScene { name: String, description: String },
    LoadScene(SceneId),
    GeneratePreview(SceneId),
    ExportScene(SceneId, ExportRequest),
    ValidateScene { scene_id: SceneId, auto_fix: bool },
    Health,
}

impl RepoCall {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            RepoCall::ListScenes => Endpoint::ListScenes,
            RepoCall::CreateScene { .. } => Endpoint::CreateScene,
            RepoCall::LoadScene(_) => Endpoint::LoadScene,
            RepoCall::GeneratePreview(_) => Endpoint::GeneratePreview,
            RepoCall::ExportScene(..) => Endpoint::ExportScene,
            RepoCall::ValidateScene { .. } => Endpoint::ValidateScene,
            RepoCall::Health => Endpoint::Health,
        }
    }
}

/// Handle on a held scene load
#[derive(Clone)]
pub struct LoadGate {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

impl LoadGate {
    /// Wait until the held load has been issued
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Let the held load respond
    pub fn release(&self) {
        self.release.notify_one();
    }
}

#[derive(Default)]
struct MockState {
    scenes: Vec<Scene>,
    calls: Vec<RepoCall>,
    failures: HashMap<Endpoint, SessionError>,
    gates: HashMap<SceneId, LoadGate>,
    validation: Option<ValidationReport>,
    capabilities: Capabilities,
    next_id: u32,
}

/// In-memory [`SceneRepository`]
pub struct MockRepository {
    state: Mutex<MockState>,
}

impl MockRepository {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                capabilities: Capabilities {
                    status: "healthy".into(),
                    scene_management_available: true,
                    scene_preview_available: true,
                    scene_export_available: true,
                    ..Capabilities::default()
                },
                ..MockState::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Setup ─────────────────────────────────────────────────

    /// Add (or replace) a scene
    pub fn insert_scene(&self, scene: Scene) {
        let mut state = self.lock();
        state.scenes.retain(|s| s.scene_id() != scene.scene_id());
        state.scenes.push(scene);
    }

    /// Add a scene with the given objects and return its id
    pub fn seed_scene(&self, scene_id: &str, name: &str, objects: Vec<SceneObject>) -> SceneId {
        self.insert_scene(Scene::new(scene_id, name, "").with_objects(objects));
        scene_id.to_string()
    }

    /// Make every call to `endpoint` fail with `error`
    pub fn fail_with(&self, endpoint: Endpoint, error: SessionError) {
        self.lock().failures.insert(endpoint, error);
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    /// Hold the next load of `scene_id` until the returned gate is released
    pub fn hold_load(&self, scene_id: &str) -> LoadGate {
        let gate = LoadGate {
            entered: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        };
        self.lock().gates.insert(scene_id.to_string(), gate.clone());
        gate
    }

    /// Report returned by `validate_scene` (default: valid, no issues)
    pub fn set_validation(&self, report: ValidationReport) {
        self.lock().validation = Some(report);
    }

    pub fn set_capabilities(&self, capabilities: Capabilities) {
        self.lock().capabilities = capabilities;
    }

    // ── Inspection ────────────────────────────────────────────

    pub fn calls(&self) -> Vec<RepoCall> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, endpoint: Endpoint) -> usize {
        self.lock().calls.iter().filter(|c| c.endpoint() == endpoint).count()
    }

    /// Export requests received so far, in order
    pub fn export_requests(&self) -> Vec<ExportRequest> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                RepoCall::ExportScene(_, req) => Some(req.clone()),
                _ => None,
            })
            .collect()
    }

    /// Record a call and return the injected failure for its endpoint, if any
    fn record(&self, call: RepoCall) -> SessionResult<()> {
        let mut state = self.lock();
        let endpoint = call.endpoint();
        state.calls.push(call);
        match state.failures.get(&endpoint) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn find(&self, scene_id: &str) -> SessionResult<Scene> {
        self.lock()
            .scenes
            .iter()
            .find(|s| s.scene_id() == scene_id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound("Scene not found".into()))
    }
}

impl Default for MockRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SceneRepository for MockRepository {
    async fn list_scenes(&self) -> SessionResult<Vec<SceneSummary>> {
        self.record(RepoCall::ListScenes)?;
        Ok(self.lock().scenes.iter().map(SceneSummary::from).collect())
    }

    async fn create_scene(&self, name: &str, description: &str) -> SessionResult<SceneId> {
        self.record(RepoCall::CreateScene {
            name: name.to_string(),
            description: description.to_string(),
        })?;
        let mut state = self.lock();
        if state.scenes.iter().any(|s| s.name.eq_ignore_ascii_case(name)) {
            return Err(SessionError::Server(format!("A scene named '{name}' already exists")));
        }
        state.next_id += 1;
        let scene_id = format!("scene_{:04}", state.next_id);
        state.scenes.push(Scene::new(scene_id.clone(), name, description));
        Ok(scene_id)
    }

    async fn load_scene(&self, scene_id: &str) -> SessionResult<Scene> {
        self.record(RepoCall::LoadScene(scene_id.to_string()))?;
        let gate = self.lock().gates.remove(scene_id);
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        self.find(scene_id)
    }

    async fn generate_preview(&self, scene_id: &str) -> SessionResult<String> {
        self.record(RepoCall::GeneratePreview(scene_id.to_string()))?;
        self.find(scene_id)?;
        Ok(format!("/api/preview/{scene_id}_scene"))
    }

    async fn export_scene(&self, scene_id: &str, request: &ExportRequest) -> SessionResult<ExportResult> {
        self.record(RepoCall::ExportScene(scene_id.to_string(), request.clone()))?;
        let scene = self.find(scene_id)?;
        let ext = request.format.extension();

        let names: Vec<String> = match request.export_type {
            ExportType::Complete => vec![format!("{}.{ext}", scene.scene_id())],
            ExportType::Individual => request
                .object_id
                .iter()
                .map(|id| format!("{id}.{ext}"))
                .collect(),
            ExportType::Selective => {
                let ids = request.object_ids.clone().unwrap_or_default();
                if ids.is_empty() {
                    return Err(SessionError::Server("object_ids required for selective export".into()));
                }
                if request.combined_file.unwrap_or(true) {
                    vec![format!("{}_selection.{ext}", scene.scene_id())]
                } else {
                    ids.iter().map(|id| format!("{id}.{ext}")).collect()
                }
            }
        };
        let object_count = match request.export_type {
            ExportType::Complete => scene.object_count(),
            ExportType::Individual => 1,
            ExportType::Selective => request.object_ids.as_ref().map_or(0, Vec::len),
        };

        Ok(ExportResult {
            download_urls: names.iter().map(|n| format!("/api/download/{n}")).collect(),
            filenames: names,
            object_count: object_count as u32,
            format: request.format,
            total_size: 0,
        })
    }

    async fn validate_scene(&self, scene_id: &str, auto_fix: bool) -> SessionResult<ValidationReport> {
        self.record(RepoCall::ValidateScene {
            scene_id: scene_id.to_string(),
            auto_fix,
        })?;
        let scene = self.find(scene_id)?;
        let configured = self.lock().validation.clone();
        Ok(configured.unwrap_or_else(|| default_report(&scene)))
    }

    async fn health(&self) -> SessionResult<Capabilities> {
        self.record(RepoCall::Health)?;
        Ok(self.lock().capabilities.clone())
    }
}

fn default_report(scene: &Scene) -> ValidationReport {
    let mut issues = Vec::new();
    if scene.objects.is_empty() {
        issues.push(ValidationIssue {
            severity: IssueSeverity::Error,
            message: "Scene contains no objects".into(),
            suggestion: Some("Add at least one object to the scene".into()),
            auto_fixable: false,
            category: Some("empty_scene".into()),
            object_ids: Vec::new(),
        });
    }
    ValidationReport {
        is_valid: issues.is_empty(),
        issues,
        statistics: ValidationStatistics {
            object_count: scene.object_count() as u32,
            export_ready_objects: scene.export_ready_count() as u32,
        },
        auto_fixes_applied: 0,
    }
}

/// Sink that keeps every notification
#[derive(Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<(String, Severity)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(String, Severity)>> {
        self.messages.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn messages(&self) -> Vec<(String, Severity)> {
        self.lock().clone()
    }

    pub fn last(&self) -> Option<(String, Severity)> {
        self.lock().last().cloned()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.lock().iter().filter(|(_, s)| *s == severity).count()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, message: &str, severity: Severity) {
        self.lock().push((message.to_string(), severity));
    }
}

/// A session wired to fresh test doubles
pub struct SessionHarness {
    pub repo: Arc<MockRepository>,
    pub sink: Arc<RecordingSink>,
    pub session: Arc<SceneSession>,
}

impl SessionHarness {
    pub fn new() -> Self {
        let repo = Arc::new(MockRepository::new());
        let sink = Arc::new(RecordingSink::new());
        let session = Arc::new(SceneSession::new(repo.clone(), sink.clone()));
        Self { repo, sink, session }
    }

    /// Seed a scene and load it
    pub async fn with_loaded_scene(scene_id: &str, objects: Vec<SceneObject>) -> SessionResult<Self> {
        let h = Self::new();
        h.repo.seed_scene(scene_id, scene_id, objects);
        h.session.select_scene(scene_id).await?;
        Ok(h)
    }
}

impl Default for SessionHarness {
    fn default() -> Self {
        Self::new()
    }
}
