use scene_server::{app, AppState, Features};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scene_server=info".into()),
        )
        .init();

    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = std::env::var("PORT").unwrap_or_else(|_| "5001".to_string());

    let features = Features::from_env();
    tracing::info!(preview = features.preview, export = features.export, "features");
    let app = app(AppState::new(features));

    let listener = tokio::net::TcpListener::bind(format!("{host}:{port}")).await.unwrap();
    tracing::info!("Scene server running on http://{host}:{port}");
    axum::serve(listener, app).await.unwrap();
}
