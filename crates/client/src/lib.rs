// Library crate: the scene repository client, the session controller and
// headless test doubles. The CLI front end lives in the binary crate.

pub mod error;
pub mod harness;
pub mod helpers;
pub mod notify;
pub mod repository;
pub mod selection;
pub mod session;
pub mod settings;

pub use error::{SessionError, SessionResult};
pub use notify::{NotificationSink, Severity, TracingSink};
pub use repository::{HttpSceneRepository, SceneRepository};
pub use selection::Selection;
pub use session::{ExportTarget, LoadOutcome, SceneSession, SceneStatus, SessionSnapshot};
pub use settings::ClientSettings;
