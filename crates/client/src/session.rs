//! Scene session controller.
//!
//! Owns the "current scene" and "current selection", sequences the scene
//! workflows (create → select → load, select → export, load → validate) and
//! publishes every state change as a [`SessionSnapshot`] through a
//! `tokio::sync::watch` channel. Renderers subscribe and read; only the
//! controller writes.
//!
//! State is mutated inside the synchronous `send_modify` closures only, so no
//! lock is ever held across a network call. Scene loads carry a ticket; a
//! response whose ticket is no longer the latest is dropped.

use std::sync::Arc;

use shared::{
    Capabilities, ExportFormat, ExportRequest, ExportResult, ObjectId, Scene, SceneId, SceneSummary,
    ValidationReport,
};
use tokio::sync::watch;

use crate::error::{SessionError, SessionResult};
use crate::helpers::cache_bust;
use crate::notify::{NotificationSink, Severity};
use crate::repository::SceneRepository;
use crate::selection::Selection;

/// Where the session is on the "current scene" axis
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SceneStatus {
    #[default]
    Unloaded,
    Loading {
        scene_id: SceneId,
    },
    Loaded(Scene),
}

/// Read-only view of the session handed to renderers
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub status: SceneStatus,
    pub selection: Selection,
    /// Last fetched scene list
    pub scenes: Vec<SceneSummary>,
    /// Server capability flags, once fetched
    pub capabilities: Option<Capabilities>,
    /// Cache-busted URL of the latest preview of the loaded scene
    pub preview_url: Option<String>,
    pub last_export: Option<ExportResult>,
    pub last_validation: Option<ValidationReport>,
    /// Ticket of the most recent load request
    ticket: u64,
}

impl SessionSnapshot {
    pub fn loaded_scene(&self) -> Option<&Scene> {
        match &self.status {
            SceneStatus::Loaded(scene) => Some(scene),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.status, SceneStatus::Loading { .. })
    }

    pub fn selection_count(&self) -> usize {
        self.selection.count()
    }

    /// Selective export is only offered with at least one selected object
    pub fn can_export_selection(&self) -> bool {
        self.loaded_scene().is_some() && !self.selection.is_empty()
    }

    fn reset_scene_data(&mut self) {
        self.selection.clear();
        self.preview_url = None;
        self.last_export = None;
        self.last_validation = None;
    }
}

/// What to export from the loaded scene
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportTarget {
    /// All objects of the scene
    Complete,
    /// One object, named explicitly by the caller
    Individual(ObjectId),
    /// The current selection
    Selective { combined_file: bool },
}

/// Result of a scene load that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The loaded scene is now current
    Applied,
    /// A newer load (or an unload) was issued meanwhile; the response was dropped
    Superseded,
}

/// The scene session controller. Construct one per session and share it
/// (`Arc<SceneSession>`) with whatever drives it.
pub struct SceneSession {
    repo: Arc<dyn SceneRepository>,
    sink: Arc<dyn NotificationSink>,
    state: watch::Sender<SessionSnapshot>,
}

impl SceneSession {
    pub fn new(repo: Arc<dyn SceneRepository>, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            repo,
            sink,
            state: watch::Sender::new(SessionSnapshot::default()),
        }
    }

    // ── State access ──────────────────────────────────────────

    /// Copy of the current state
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    pub fn selection_count(&self) -> usize {
        self.state.borrow().selection.count()
    }

    // ── Scene lifecycle ───────────────────────────────────────

    /// Create a scene and immediately load it. Returns the new scene id.
    pub async fn create_scene(&self, name: &str, description: &str) -> SessionResult<SceneId> {
        let name = name.trim();
        if name.is_empty() {
            return Err(self.fail(SessionError::Validation("Please enter a scene name".into())));
        }

        let scene_id = self
            .repo
            .create_scene(name, description.trim())
            .await
            .map_err(|e| self.fail(e))?;
        tracing::info!(scene_id = %scene_id, "created scene '{name}'");
        self.sink.notify(&format!("Scene '{name}' created"), Severity::Success);

        self.select_scene(&scene_id).await?;
        Ok(scene_id)
    }

    /// Load a scene and make it current. The previous scene and the selection
    /// are discarded before the request is issued.
    pub async fn select_scene(&self, scene_id: &str) -> SessionResult<LoadOutcome> {
        let scene_id = scene_id.trim();
        if scene_id.is_empty() {
            return Err(self.fail(SessionError::Validation("No scene selected".into())));
        }

        let mut ticket = 0;
        self.state.send_modify(|s| {
            s.ticket += 1;
            ticket = s.ticket;
            s.status = SceneStatus::Loading {
                scene_id: scene_id.to_string(),
            };
            s.reset_scene_data();
        });
        tracing::debug!(scene_id, ticket, "loading scene");

        let response = self.repo.load_scene(scene_id).await;

        let mut failure = None;
        let current = self.state.send_if_modified(|s| {
            if s.ticket != ticket {
                return false;
            }
            match response {
                Ok(scene) => {
                    s.selection.clear();
                    s.status = SceneStatus::Loaded(scene);
                }
                Err(e) => {
                    s.status = SceneStatus::Unloaded;
                    failure = Some(e);
                }
            }
            true
        });

        if !current {
            tracing::debug!(scene_id, ticket, "discarding stale scene response");
            return Ok(LoadOutcome::Superseded);
        }
        if let Some(e) = failure {
            return Err(self.fail(e));
        }
        tracing::info!(scene_id, "scene loaded");
        Ok(LoadOutcome::Applied)
    }

    /// Select "no scene". Any load still in flight becomes stale.
    pub fn clear_scene(&self) {
        self.state.send_modify(|s| {
            s.ticket += 1;
            s.status = SceneStatus::Unloaded;
            s.reset_scene_data();
        });
    }

    /// Fetch the scene list into the snapshot
    pub async fn refresh_scenes(&self) -> SessionResult<Vec<SceneSummary>> {
        let scenes = self.repo.list_scenes().await.map_err(|e| self.fail(e))?;
        self.state.send_modify(|s| s.scenes = scenes.clone());
        Ok(scenes)
    }

    /// Fetch server capability flags into the snapshot
    pub async fn refresh_capabilities(&self) -> SessionResult<Capabilities> {
        let caps = self.repo.health().await.map_err(|e| self.fail(e))?;
        self.state.send_modify(|s| s.capabilities = Some(caps.clone()));
        Ok(caps)
    }

    // ── Selection ─────────────────────────────────────────────

    /// Include or exclude an object from the selection. Does nothing unless
    /// a scene is loaded and contains the object. Returns the selection count.
    pub fn toggle_object_selection(&self, object_id: &str, included: bool) -> usize {
        self.state.send_if_modified(|s| {
            let SceneStatus::Loaded(scene) = &s.status else {
                return false;
            };
            if !scene.contains_object(object_id) {
                tracing::debug!(object_id, "ignoring selection of unknown object");
                return false;
            }
            s.selection.set(object_id, included)
        });
        self.selection_count()
    }

    // ── Scene actions ─────────────────────────────────────────

    /// Export the loaded scene (or part of it)
    pub async fn request_export(
        &self,
        target: ExportTarget,
        format: ExportFormat,
        filename: Option<String>,
    ) -> SessionResult<ExportResult> {
        let (scene_id, request) = self
            .with_loaded(|snapshot, scene| {
                ensure_available(snapshot, |c| c.scene_export_available, "Scene export")?;
                build_export_request(scene, &snapshot.selection, target, format)
            })
            .map_err(|e| self.fail(e))?;
        let request = request.with_filename(filename);

        tracing::info!(
            scene_id = %scene_id,
            export_type = request.export_type.as_str(),
            format = format.extension(),
            "exporting scene"
        );
        let result = self
            .repo
            .export_scene(&scene_id, &request)
            .await
            .map_err(|e| self.fail(e))?;

        self.attach(&scene_id, |s| s.last_export = Some(result.clone()));
        self.sink.notify(
            &format!(
                "Exported {} object(s) as {} ({} file(s))",
                result.object_count,
                result.format.extension().to_uppercase(),
                result.filenames.len()
            ),
            Severity::Success,
        );
        Ok(result)
    }

    /// Render a preview of the loaded scene. The returned URL is cache-busted.
    pub async fn request_preview(&self) -> SessionResult<String> {
        let scene_id = self
            .with_loaded(|snapshot, scene| {
                ensure_available(snapshot, |c| c.scene_preview_available, "Scene preview")?;
                Ok(scene.scene_id().to_string())
            })
            .map_err(|e| self.fail(e))?;

        let url = self
            .repo
            .generate_preview(&scene_id)
            .await
            .map_err(|e| self.fail(e))?;
        let url = cache_bust(&url);

        self.attach(&scene_id, |s| s.preview_url = Some(url.clone()));
        Ok(url)
    }

    /// Validate the loaded scene. The report is returned as received; fixes
    /// are applied server-side only when `auto_fix` is set.
    pub async fn request_validation(&self, auto_fix: bool) -> SessionResult<ValidationReport> {
        let scene_id = self
            .with_loaded(|_, scene| Ok(scene.scene_id().to_string()))
            .map_err(|e| self.fail(e))?;

        let report = self
            .repo
            .validate_scene(&scene_id, auto_fix)
            .await
            .map_err(|e| self.fail(e))?;

        self.attach(&scene_id, |s| s.last_validation = Some(report.clone()));
        if report.is_valid {
            self.sink.notify("Scene is valid", Severity::Success);
        } else {
            self.sink.notify(
                &format!("Validation found {} issue(s)", report.issues.len()),
                Severity::Warning,
            );
        }
        Ok(report)
    }

    // ── Internals ─────────────────────────────────────────────

    /// Run `f` against the loaded scene, or fail with `Precondition`.
    /// The state borrow ends before this returns.
    fn with_loaded<T>(
        &self,
        f: impl FnOnce(&SessionSnapshot, &Scene) -> SessionResult<T>,
    ) -> SessionResult<T> {
        let snapshot = self.state.borrow();
        match &snapshot.status {
            SceneStatus::Loaded(scene) => f(&snapshot, scene),
            SceneStatus::Loading { scene_id } => Err(SessionError::Precondition(format!(
                "scene '{scene_id}' is still loading"
            ))),
            SceneStatus::Unloaded => Err(SessionError::Precondition("no scene is loaded".into())),
        }
    }

    /// Apply a transient result only if `scene_id` is still the loaded scene
    fn attach(&self, scene_id: &str, f: impl FnOnce(&mut SessionSnapshot)) {
        let applied = self.state.send_if_modified(|s| {
            let still_loaded = s.loaded_scene().is_some_and(|scene| scene.scene_id() == scene_id);
            if still_loaded {
                f(s);
            }
            still_loaded
        });
        if !applied {
            tracing::debug!(scene_id, "scene changed while request was in flight; result not attached");
        }
    }

    /// Log and report an error to the sink, then hand it back
    fn fail(&self, err: SessionError) -> SessionError {
        match &err {
            SessionError::Precondition(msg) => tracing::error!("session misuse: {msg}"),
            SessionError::Network(msg) => tracing::warn!("network failure: {msg}"),
            other => tracing::warn!(kind = other.kind(), "{other}"),
        }
        self.sink.notify(&err.user_message(), Severity::Error);
        err
    }
}

fn ensure_available(
    snapshot: &SessionSnapshot,
    flag: impl Fn(&Capabilities) -> bool,
    feature: &str,
) -> SessionResult<()> {
    match &snapshot.capabilities {
        Some(caps) if !flag(caps) => Err(SessionError::Precondition(format!(
            "{feature} is not available on this server"
        ))),
        _ => Ok(()),
    }
}

/// Build the export request for `target`, enforcing the local preconditions
fn build_export_request(
    scene: &Scene,
    selection: &Selection,
    target: ExportTarget,
    format: ExportFormat,
) -> SessionResult<(SceneId, ExportRequest)> {
    if scene.export_ready_count() == 0 {
        return Err(SessionError::Validation(format!(
            "Scene '{}' has no objects to export",
            scene.name
        )));
    }

    let request = match target {
        ExportTarget::Complete => ExportRequest::complete(format),
        ExportTarget::Individual(object_id) => {
            if !scene.contains_object(&object_id) {
                return Err(SessionError::Validation(format!(
                    "Object '{object_id}' is not part of this scene"
                )));
            }
            ExportRequest::individual(format, object_id)
        }
        ExportTarget::Selective { combined_file } => {
            if selection.is_empty() {
                return Err(SessionError::Validation(
                    "Select at least one object to export".into(),
                ));
            }
            ExportRequest::selective(format, selection.ordered_for(scene), combined_file)
        }
    };
    Ok((scene.scene_id().to_string(), request))
}
