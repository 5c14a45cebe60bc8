use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use shared::{CreateSceneRequest, Scene, SceneId, SceneObject, SceneSummary};

struct StoredScene {
    scene: Scene,
    /// Insertion order, used to list newest first
    seq: u64,
}

#[derive(Default)]
struct Inner {
    scenes: HashMap<SceneId, StoredScene>,
    next_seq: u64,
}

/// In-memory scene store shared by all handlers
#[derive(Clone, Default)]
pub struct SceneStore {
    inner: Arc<RwLock<Inner>>,
}

impl SceneStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Scene summaries, newest first
    pub fn list(&self) -> Vec<SceneSummary> {
        let inner = self.read();
        let mut stored: Vec<&StoredScene> = inner.scenes.values().collect();
        stored.sort_by(|a, b| b.seq.cmp(&a.seq));
        stored.iter().map(|s| SceneSummary::from(&s.scene)).collect()
    }

    /// Create a scene. Names are unique (case-insensitive).
    pub fn create(&self, request: CreateSceneRequest) -> Result<SceneSummary, String> {
        let name = request.name.trim().to_string();
        let mut inner = self.write();
        if inner
            .scenes
            .values()
            .any(|s| s.scene.name.eq_ignore_ascii_case(&name))
        {
            return Err(format!("A scene named '{name}' already exists"));
        }

        let scene_id = format!("scene_{}", &uuid::Uuid::new_v4().simple().to_string()[..8]);
        let objects = normalize_objects(request.objects);
        let scene = Scene::new(scene_id.clone(), name, request.description.trim()).with_objects(objects);
        let summary = SceneSummary::from(&scene);

        inner.next_seq += 1;
        let seq = inner.next_seq;
        inner.scenes.insert(scene_id, StoredScene { scene, seq });
        tracing::info!(scene_id = %summary.scene_id, "created scene '{}'", summary.name);
        Ok(summary)
    }

    pub fn get(&self, scene_id: &str) -> Option<Scene> {
        self.read().scenes.get(scene_id).map(|s| s.scene.clone())
    }

    /// Replace a stored scene. Returns false if it does not exist.
    pub fn save(&self, scene: Scene) -> bool {
        match self.write().scenes.get_mut(scene.scene_id()) {
            Some(stored) => {
                stored.scene = scene;
                true
            }
            None => false,
        }
    }
}

/// Give every object a non-empty id that is unique within the scene
fn normalize_objects(objects: Vec<SceneObject>) -> Vec<SceneObject> {
    let mut seen = HashSet::new();
    objects
        .into_iter()
        .enumerate()
        .map(|(i, mut obj)| {
            if obj.id.trim().is_empty() {
                obj.id = format!("obj_{}", i + 1);
            }
            if seen.contains(&obj.id) {
                let base = obj.id.clone();
                let mut n = i;
                while seen.contains(&obj.id) {
                    obj.id = format!("{base}_{n}");
                    n += 1;
                }
            }
            seen.insert(obj.id.clone());
            obj
        })
        .collect()
}
