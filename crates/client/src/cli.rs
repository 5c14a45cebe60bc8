use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use scene_client::{
    ClientSettings, ExportTarget, HttpSceneRepository, NotificationSink, SceneSession, SessionError,
    SessionResult, Severity,
};
use shared::ExportFormat;

use crate::render::{self, ConsoleSink};

#[derive(Parser)]
#[command(author, version, about = "Command-line client for the scene management API", long_about = None)]
struct Cli {
    /// Server base URL (overrides settings.json and SCENE_API_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List scenes
    List,
    /// Create a scene and show it
    Create {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Load and show a scene
    Show { scene_id: String },
    /// Render a scene preview and print its URL
    Preview { scene_id: String },
    /// Export a scene
    Export {
        scene_id: String,

        #[arg(long, value_enum, default_value_t = FormatArg::Obj)]
        format: FormatArg,

        #[arg(long = "type", value_enum, default_value_t = TypeArg::Complete)]
        export_type: TypeArg,

        /// Object to export (repeat for selective export)
        #[arg(long = "object")]
        objects: Vec<String>,

        /// Put a selective export into a single file
        #[arg(long)]
        combined: bool,

        #[arg(long)]
        filename: Option<String>,
    },
    /// Validate a scene
    Validate {
        scene_id: String,
        #[arg(long)]
        auto_fix: bool,
    },
    /// Show server capabilities
    Health,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Obj,
    Gltf,
    Stl,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Obj => ExportFormat::Obj,
            FormatArg::Gltf => ExportFormat::Gltf,
            FormatArg::Stl => ExportFormat::Stl,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum TypeArg {
    Complete,
    Individual,
    Selective,
}

pub async fn run() -> SessionResult<()> {
    let cli = Cli::parse();

    let mut settings = ClientSettings::load();
    if let Some(url) = cli.base_url {
        settings.base_url = url;
    }
    if let Some(secs) = cli.timeout {
        settings.timeout_secs = secs.max(1);
    }

    let sink = Arc::new(ConsoleSink);
    let repo = HttpSceneRepository::new(&settings).map_err(|e| {
        sink.notify(&e.user_message(), Severity::Error);
        e
    })?;
    tracing::debug!("using server {}", repo.base_url());
    let session = SceneSession::new(Arc::new(repo), sink.clone());

    match cli.command {
        Commands::List => {
            let scenes = session.refresh_scenes().await?;
            print!("{}", render::scene_list(&scenes));
        }
        Commands::Create { name, description } => {
            session.create_scene(&name, &description).await?;
            print!("{}", render::session(&session.snapshot()));
        }
        Commands::Show { scene_id } => {
            session.select_scene(&scene_id).await?;
            print!("{}", render::session(&session.snapshot()));
        }
        Commands::Preview { scene_id } => {
            session.select_scene(&scene_id).await?;
            let url = session.request_preview().await?;
            println!("{url}");
        }
        Commands::Export {
            scene_id,
            format,
            export_type,
            objects,
            combined,
            filename,
        } => {
            session.select_scene(&scene_id).await?;
            let target = match export_type {
                TypeArg::Complete => ExportTarget::Complete,
                TypeArg::Individual => {
                    let Some(object_id) = objects.into_iter().next() else {
                        let err = SessionError::Validation("--object is required for individual export".into());
                        sink.notify(&err.user_message(), Severity::Error);
                        return Err(err);
                    };
                    ExportTarget::Individual(object_id)
                }
                TypeArg::Selective => {
                    for id in &objects {
                        session.toggle_object_selection(id, true);
                    }
                    ExportTarget::Selective { combined_file: combined }
                }
            };
            let result = session.request_export(target, format.into(), filename).await?;
            print!("{}", render::export_result(&result));
        }
        Commands::Validate { scene_id, auto_fix } => {
            session.select_scene(&scene_id).await?;
            let report = session.request_validation(auto_fix).await?;
            print!("{}", render::validation(&report));
        }
        Commands::Health => {
            let caps = session.refresh_capabilities().await?;
            print!("{}", render::capabilities(&caps));
        }
    }
    Ok(())
}
