use serde::{Deserialize, Serialize};

/// Идентификатор сцены (выдаётся сервером)
pub type SceneId = String;

/// Уникальный идентификатор объекта внутри сцены
pub type ObjectId = String;

/// Тип примитива
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    Cube,
    Sphere,
    Cylinder,
    Plane,
}

impl ObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Cube => "cube",
            ObjectType::Sphere => "sphere",
            ObjectType::Cylinder => "cylinder",
            ObjectType::Plane => "plane",
        }
    }
}

fn default_true() -> bool {
    true
}

/// Объект сцены (один примитив)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    #[serde(default)]
    pub id: ObjectId,
    pub name: String,
    pub object_type: ObjectType,
    pub size: f64,
    /// Объект готов к экспорту (по умолчанию — да)
    #[serde(default = "default_true")]
    pub export_ready: bool,
}

impl SceneObject {
    pub fn new(id: impl Into<ObjectId>, name: impl Into<String>, object_type: ObjectType, size: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            object_type,
            size,
            export_ready: true,
        }
    }
}

/// Статистика сцены, которую считает сервер
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneStatistics {
    #[serde(default)]
    pub export_ready_objects: u32,
    #[serde(default)]
    pub collisions: u32,
}

/// Сцена — именованный набор объектов.
///
/// `scene_id` назначается сервером и не меняется после создания,
/// поэтому поле закрыто и доступно только на чтение.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    scene_id: SceneId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub objects: Vec<SceneObject>,
    #[serde(default)]
    pub relationship_count: u32,
    #[serde(default)]
    pub statistics: SceneStatistics,
}

impl Scene {
    pub fn new(scene_id: impl Into<SceneId>, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            scene_id: scene_id.into(),
            name: name.into(),
            description: description.into(),
            objects: Vec::new(),
            relationship_count: 0,
            statistics: SceneStatistics::default(),
        }
    }

    pub fn with_objects(mut self, objects: Vec<SceneObject>) -> Self {
        self.objects = objects;
        self.statistics.export_ready_objects = self.export_ready_count() as u32;
        self
    }

    pub fn scene_id(&self) -> &str {
        &self.scene_id
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn export_ready_count(&self) -> usize {
        self.objects.iter().filter(|o| o.export_ready).count()
    }

    pub fn object(&self, id: &str) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn contains_object(&self, id: &str) -> bool {
        self.object(id).is_some()
    }
}

/// Краткое описание сцены для списка
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSummary {
    pub scene_id: SceneId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub object_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl From<&Scene> for SceneSummary {
    fn from(scene: &Scene) -> Self {
        Self {
            scene_id: scene.scene_id.clone(),
            name: scene.name.clone(),
            description: scene.description.clone(),
            object_count: scene.object_count() as u32,
            created_at: None,
        }
    }
}

/// GET /api/scenes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneListResponse {
    #[serde(default)]
    pub scenes: Vec<SceneSummary>,
}

/// POST /api/scenes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateSceneRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Начальные объекты (клиент их не отправляет, нужны для заполнения сцен)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub objects: Vec<SceneObject>,
}

/// POST /api/scenes/{id}/preview
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewResponse {
    pub preview_url: String,
}

/// Вид экспорта
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportType {
    Complete,
    Individual,
    Selective,
}

impl ExportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportType::Complete => "complete",
            ExportType::Individual => "individual",
            ExportType::Selective => "selective",
        }
    }
}

/// Формат файла экспорта
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Obj,
    Gltf,
    Stl,
}

impl ExportFormat {
    /// Расширение файла без точки
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Obj => "obj",
            ExportFormat::Gltf => "gltf",
            ExportFormat::Stl => "stl",
        }
    }
}

/// Запрос на экспорт. Создаётся заново на каждую операцию.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRequest {
    pub export_type: ExportType,
    pub format: ExportFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_ids: Option<Vec<ObjectId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combined_file: Option<bool>,
}

impl ExportRequest {
    pub fn complete(format: ExportFormat) -> Self {
        Self {
            export_type: ExportType::Complete,
            format,
            filename: None,
            object_id: None,
            object_ids: None,
            combined_file: None,
        }
    }

    pub fn individual(format: ExportFormat, object_id: impl Into<ObjectId>) -> Self {
        Self {
            export_type: ExportType::Individual,
            object_id: Some(object_id.into()),
            ..Self::complete(format)
        }
    }

    pub fn selective(format: ExportFormat, object_ids: Vec<ObjectId>, combined_file: bool) -> Self {
        Self {
            export_type: ExportType::Selective,
            object_ids: Some(object_ids),
            combined_file: Some(combined_file),
            ..Self::complete(format)
        }
    }

    pub fn with_filename(mut self, filename: Option<String>) -> Self {
        self.filename = filename.filter(|f| !f.trim().is_empty());
        self
    }
}

/// Результат экспорта. `download_urls` и `filenames` — параллельные массивы.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportResult {
    #[serde(default)]
    pub download_urls: Vec<String>,
    #[serde(default)]
    pub filenames: Vec<String>,
    #[serde(default)]
    pub object_count: u32,
    pub format: ExportFormat,
    #[serde(default)]
    pub total_size: u64,
}

impl ExportResult {
    /// Пары (имя файла, ссылка)
    pub fn files(&self) -> impl Iterator<Item = (&str, &str)> {
        self.filenames
            .iter()
            .map(String::as_str)
            .zip(self.download_urls.iter().map(String::as_str))
    }
}

/// POST /api/scenes/{id}/validate
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidateRequest {
    #[serde(default)]
    pub auto_fix: bool,
}

/// Уровень проблемы валидации
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Error,
    Warning,
    Info,
}

/// Проблема, найденная при валидации сцены
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: IssueSeverity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(default)]
    pub auto_fixable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub object_ids: Vec<ObjectId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationStatistics {
    #[serde(default)]
    pub object_count: u32,
    #[serde(default)]
    pub export_ready_objects: u32,
}

/// Отчёт валидации
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    #[serde(default)]
    pub issues: Vec<ValidationIssue>,
    #[serde(default)]
    pub statistics: ValidationStatistics,
    #[serde(default)]
    pub auto_fixes_applied: u32,
}

impl ValidationReport {
    pub fn count(&self, severity: IssueSeverity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    pub fn has_auto_fixable(&self) -> bool {
        self.issues.iter().any(|i| i.auto_fixable)
    }
}

/// Флаги возможностей сервера (GET /api/health).
/// Отсутствующий флаг считается выключенным.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Capabilities {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub blender_available: bool,
    #[serde(default)]
    pub export_available: bool,
    #[serde(default)]
    pub ai_available: bool,
    #[serde(default)]
    pub scene_management_available: bool,
    #[serde(default)]
    pub scene_preview_available: bool,
    #[serde(default)]
    pub scene_export_available: bool,
}
