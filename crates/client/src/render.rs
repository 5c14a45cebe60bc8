//! Plain-text renderer for session state. Every function is a pure mapping
//! from data to a `String`; printing happens in `cli`.

use std::fmt::Write;

use scene_client::helpers::short_id;
use scene_client::{NotificationSink, SceneStatus, SessionSnapshot, Severity};
use shared::{Capabilities, ExportResult, IssueSeverity, SceneSummary, ValidationReport};

/// Notification sink printing to stderr
pub struct ConsoleSink;

impl NotificationSink for ConsoleSink {
    fn notify(&self, message: &str, severity: Severity) {
        eprintln!("[{}] {message}", severity.label());
    }
}

pub fn scene_list(scenes: &[SceneSummary]) -> String {
    if scenes.is_empty() {
        return "No scenes yet.\n".to_string();
    }
    let mut out = String::new();
    for s in scenes {
        let _ = writeln!(out, "{:<14} {:<28} {:>3} object(s)", short_id(&s.scene_id), s.name, s.object_count);
    }
    out
}

pub fn session(snapshot: &SessionSnapshot) -> String {
    let mut out = String::new();
    match &snapshot.status {
        SceneStatus::Unloaded => out.push_str("No scene selected.\n"),
        SceneStatus::Loading { scene_id } => {
            let _ = writeln!(out, "Loading scene {scene_id}...");
        }
        SceneStatus::Loaded(scene) => {
            let _ = writeln!(out, "{} ({})", scene.name, scene.scene_id());
            if !scene.description.is_empty() {
                let _ = writeln!(out, "  {}", scene.description);
            }
            let _ = writeln!(
                out,
                "  objects: {}  export-ready: {}  relationships: {}  collisions: {}",
                scene.object_count(),
                scene.statistics.export_ready_objects,
                scene.relationship_count,
                scene.statistics.collisions
            );
            for obj in &scene.objects {
                let mark = if snapshot.selection.is_selected(&obj.id) { "[x]" } else { "[ ]" };
                let _ = writeln!(
                    out,
                    "  {mark} {:<10} {:<20} {:<9} size {}",
                    obj.id,
                    obj.name,
                    obj.object_type.as_str(),
                    obj.size
                );
            }
            if snapshot.can_export_selection() {
                let _ = writeln!(out, "  {} selected for selective export", snapshot.selection_count());
            } else {
                out.push_str("  no objects selected; selective export unavailable\n");
            }
        }
    }
    out
}

pub fn export_result(result: &ExportResult) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Exported {} object(s) as {} ({} bytes)",
        result.object_count,
        result.format.extension(),
        result.total_size
    );
    for (name, url) in result.files() {
        let _ = writeln!(out, "  {name}  {url}");
    }
    out
}

pub fn validation(report: &ValidationReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}: {} object(s), {} error(s), {} warning(s)",
        if report.is_valid { "Valid" } else { "Invalid" },
        report.statistics.object_count,
        report.count(IssueSeverity::Error),
        report.count(IssueSeverity::Warning)
    );
    if report.auto_fixes_applied > 0 {
        let _ = writeln!(out, "Applied {} automatic fix(es)", report.auto_fixes_applied);
    }
    for issue in &report.issues {
        let level = match issue.severity {
            IssueSeverity::Error => "error",
            IssueSeverity::Warning => "warning",
            IssueSeverity::Info => "info",
        };
        let fix = if issue.auto_fixable { " (auto-fixable)" } else { "" };
        let _ = writeln!(out, "  {level}: {}{fix}", issue.message);
        if let Some(suggestion) = &issue.suggestion {
            let _ = writeln!(out, "    → {suggestion}");
        }
    }
    out
}

pub fn capabilities(caps: &Capabilities) -> String {
    let flag = |on: bool| if on { "yes" } else { "no" };
    let mut out = String::new();
    let _ = writeln!(out, "status: {} (version {})", caps.status, caps.version);
    let _ = writeln!(out, "  scene management: {}", flag(caps.scene_management_available));
    let _ = writeln!(out, "  scene preview:    {}", flag(caps.scene_preview_available));
    let _ = writeln!(out, "  scene export:     {}", flag(caps.scene_export_available));
    let _ = writeln!(out, "  blender:          {}", flag(caps.blender_available));
    let _ = writeln!(out, "  ai:               {}", flag(caps.ai_available));
    out
}
