//! End-to-end tests: HttpSceneRepository and SceneSession against the
//! in-memory scene server on a loopback port.

use std::sync::Arc;

use scene_client::harness::RecordingSink;
use scene_client::{
    ClientSettings, ExportTarget, HttpSceneRepository, LoadOutcome, SceneRepository, SceneSession,
    SessionError, Severity,
};
use scene_server::{AppState, Features};
use shared::{CreateSceneRequest, ExportFormat, ExportRequest, ObjectType, SceneObject};

struct Server {
    base_url: String,
    state: AppState,
}

async fn spawn_server(features: Features) -> Server {
    let state = AppState::new(features);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = scene_server::app(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Server {
        base_url: format!("http://{addr}"),
        state,
    }
}

fn repo(base_url: &str) -> HttpSceneRepository {
    let settings = ClientSettings {
        base_url: base_url.to_string(),
        timeout_secs: 5,
        ..ClientSettings::default()
    };
    HttpSceneRepository::new(&settings).unwrap()
}

fn session(base_url: &str) -> (SceneSession, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::new());
    (SceneSession::new(Arc::new(repo(base_url)), sink.clone()), sink)
}

/// Seed a scene directly in the server store
fn seed(server: &Server, name: &str) -> String {
    server
        .state
        .store
        .create(CreateSceneRequest {
            name: name.into(),
            description: "corner desk".into(),
            objects: vec![
                SceneObject::new("o1", "desk", ObjectType::Cube, 2.0),
                SceneObject::new("o2", "lamp", ObjectType::Cylinder, 0.5),
                SceneObject::new("o3", "chair", ObjectType::Cube, 1.0),
            ],
        })
        .unwrap()
        .scene_id
}

#[tokio::test]
async fn test_health_round_trip() {
    let server = spawn_server(Features::default()).await;
    let caps = repo(&server.base_url).health().await.unwrap();
    assert_eq!(caps.status, "ok");
    assert!(caps.scene_management_available);
    assert!(caps.scene_preview_available);
    assert!(caps.scene_export_available);
}

#[tokio::test]
async fn test_create_list_and_load() {
    let server = spawn_server(Features::default()).await;
    let repo = repo(&server.base_url);

    let id = repo.create_scene("Office", "desk area").await.unwrap();
    let scenes = repo.list_scenes().await.unwrap();
    assert_eq!(scenes.len(), 1);
    assert_eq!(scenes[0].scene_id, id);

    let scene = repo.load_scene(&id).await.unwrap();
    assert_eq!(scene.scene_id(), id);
    assert_eq!(scene.name, "Office");
    assert_eq!(scene.description, "desk area");
}

#[tokio::test]
async fn test_duplicate_name_is_server_error() {
    let server = spawn_server(Features::default()).await;
    let repo = repo(&server.base_url);

    repo.create_scene("Office", "").await.unwrap();
    let err = repo.create_scene("OFFICE", "").await.unwrap_err();
    match err {
        SessionError::Server(msg) => assert!(msg.contains("already exists")),
        other => panic!("expected Server error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unknown_scene_is_not_found() {
    let server = spawn_server(Features::default()).await;
    let err = repo(&server.base_url).load_scene("scene_missing").await.unwrap_err();
    assert_eq!(err, SessionError::NotFound("Scene not found".into()));
}

#[tokio::test]
async fn test_preview_is_resolved_and_cache_busted() {
    let server = spawn_server(Features::default()).await;
    let id = seed(&server, "Desk Setup");
    let (session, _sink) = session(&server.base_url);

    assert_eq!(session.select_scene(&id).await.unwrap(), LoadOutcome::Applied);
    let first = session.request_preview().await.unwrap();
    let second = session.request_preview().await.unwrap();

    let expected = format!("{}/api/preview/{id}_scene?t=", server.base_url);
    assert!(first.starts_with(&expected), "{first}");
    assert_ne!(first, second);
}

#[tokio::test]
async fn test_selective_export_round_trip() {
    let server = spawn_server(Features::default()).await;
    let id = seed(&server, "Desk Setup");
    let (session, sink) = session(&server.base_url);

    session.select_scene(&id).await.unwrap();
    session.toggle_object_selection("o3", true);
    session.toggle_object_selection("o1", true);
    let result = session
        .request_export(ExportTarget::Selective { combined_file: false }, ExportFormat::Stl, None)
        .await
        .unwrap();

    assert_eq!(result.object_count, 2);
    assert_eq!(result.filenames, vec!["desk_setup_o1.stl", "desk_setup_o3.stl"]);
    assert_eq!(
        result.download_urls[1],
        format!("{}/api/scenes/{id}/exports/desk_setup_o3.stl", server.base_url)
    );
    assert_eq!(sink.last().unwrap().1, Severity::Success);
}

#[tokio::test]
async fn test_server_rejection_of_export() {
    let server = spawn_server(Features::default()).await;
    let id = seed(&server, "Desk Setup");
    let repo = repo(&server.base_url);

    let request = ExportRequest::selective(ExportFormat::Obj, vec!["nope".into()], true);
    let err = repo.export_scene(&id, &request).await.unwrap_err();
    assert!(matches!(err, SessionError::Server(_)));
}

#[tokio::test]
async fn test_disabled_export_reported_by_health() {
    let server = spawn_server(Features {
        preview: true,
        export: false,
    })
    .await;
    let id = seed(&server, "Desk Setup");
    let (session, _sink) = session(&server.base_url);

    session.refresh_capabilities().await.unwrap();
    session.select_scene(&id).await.unwrap();
    let err = session
        .request_export(ExportTarget::Complete, ExportFormat::Obj, None)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Precondition(_)));
}

#[tokio::test]
async fn test_validation_auto_fix_round_trip() {
    let server = spawn_server(Features::default()).await;
    let id = server
        .state
        .store
        .create(CreateSceneRequest {
            name: "Room".into(),
            description: String::new(),
            objects: vec![SceneObject::new("o1", "", ObjectType::Sphere, 1.0)],
        })
        .unwrap()
        .scene_id;
    let repo = repo(&server.base_url);

    let report = repo.validate_scene(&id, false).await.unwrap();
    assert!(report.has_auto_fixable());

    let report = repo.validate_scene(&id, true).await.unwrap();
    assert_eq!(report.auto_fixes_applied, 1);
    let scene = repo.load_scene(&id).await.unwrap();
    assert_eq!(scene.objects[0].name, "sphere_o1");
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (session, sink) = session(&format!("http://{addr}"));
    let err = session.refresh_scenes().await.unwrap_err();
    assert!(matches!(err, SessionError::Network(_)));
    assert!(err.is_retriable());
    assert_eq!(sink.count(Severity::Error), 1);
}
