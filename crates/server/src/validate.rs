//! Scene validation rules.
//!
//! A subset of the backend's checks that does not need object positions:
//! empty scene, object count, missing names, invalid sizes, variety.

use std::collections::HashSet;

use shared::{IssueSeverity, Scene, ValidationIssue, ValidationReport, ValidationStatistics};

/// Recommended maximum number of objects per scene
pub const MAX_OBJECTS: usize = 20;

fn issue(severity: IssueSeverity, category: &str, message: String) -> ValidationIssue {
    ValidationIssue {
        severity,
        message,
        suggestion: None,
        auto_fixable: false,
        category: Some(category.to_string()),
        object_ids: Vec::new(),
    }
}

/// Validate `scene`. With `auto_fix`, fixable issues are repaired in place
/// and counted instead of reported.
pub fn validate_scene(scene: &mut Scene, auto_fix: bool) -> ValidationReport {
    let mut issues = Vec::new();
    let mut fixes = 0;

    if scene.objects.is_empty() {
        issues.push(ValidationIssue {
            suggestion: Some("Add at least one object to the scene".into()),
            ..issue(IssueSeverity::Error, "empty_scene", "Scene contains no objects".into())
        });
    } else if scene.object_count() > MAX_OBJECTS {
        issues.push(ValidationIssue {
            suggestion: Some("Consider reducing the number of objects for better performance".into()),
            ..issue(
                IssueSeverity::Warning,
                "too_many_objects",
                format!(
                    "Scene has {} objects (recommended max: {MAX_OBJECTS})",
                    scene.object_count()
                ),
            )
        });
    }

    if scene.name.trim().is_empty() {
        if auto_fix {
            scene.name = format!("Unnamed Scene {}", scene.scene_id());
            fixes += 1;
        } else {
            issues.push(ValidationIssue {
                suggestion: Some("Provide a descriptive name for the scene".into()),
                auto_fixable: true,
                ..issue(IssueSeverity::Warning, "missing_name", "Scene has no name".into())
            });
        }
    }

    for obj in &mut scene.objects {
        if obj.name.trim().is_empty() {
            if auto_fix {
                obj.name = format!("{}_{}", obj.object_type.as_str(), obj.id);
                fixes += 1;
            } else {
                issues.push(ValidationIssue {
                    suggestion: Some("Provide a descriptive name for the object".into()),
                    auto_fixable: true,
                    object_ids: vec![obj.id.clone()],
                    ..issue(
                        IssueSeverity::Warning,
                        "missing_object_name",
                        format!("Object {} has no name", obj.id),
                    )
                });
            }
        }

        if !(obj.size > 0.0) {
            issues.push(ValidationIssue {
                suggestion: Some("Set size to a positive value".into()),
                object_ids: vec![obj.id.clone()],
                ..issue(
                    IssueSeverity::Error,
                    "invalid_size",
                    format!("Object '{}' has invalid size: {}", obj.name, obj.size),
                )
            });
        }
    }

    let types: HashSet<_> = scene.objects.iter().map(|o| o.object_type).collect();
    if types.len() == 1 && scene.object_count() > 3 {
        issues.push(ValidationIssue {
            suggestion: Some("Consider adding different object types for visual interest".into()),
            ..issue(
                IssueSeverity::Info,
                "lack_of_variety",
                "Scene uses only one type of object".into(),
            )
        });
    }

    let is_valid = !issues.iter().any(|i| i.severity == IssueSeverity::Error);
    ValidationReport {
        is_valid,
        issues,
        statistics: ValidationStatistics {
            object_count: scene.object_count() as u32,
            export_ready_objects: scene.export_ready_count() as u32,
        },
        auto_fixes_applied: fixes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{ObjectType, SceneObject};

    fn cube(id: &str, name: &str, size: f64) -> SceneObject {
        SceneObject::new(id, name, ObjectType::Cube, size)
    }

    #[test]
    fn test_empty_scene_is_invalid() {
        let mut scene = Scene::new("s", "Empty", "");
        let report = validate_scene(&mut scene, false);
        assert!(!report.is_valid);
        assert_eq!(report.issues[0].category.as_deref(), Some("empty_scene"));
        assert_eq!(report.statistics.object_count, 0);
    }

    #[test]
    fn test_valid_scene() {
        let mut scene = Scene::new("s", "Office", "").with_objects(vec![
            cube("o1", "desk", 2.0),
            SceneObject::new("o2", "lamp", ObjectType::Cylinder, 0.5),
        ]);
        let report = validate_scene(&mut scene, false);
        assert!(report.is_valid);
        assert!(report.issues.is_empty());
        assert_eq!(report.statistics.object_count, 2);
    }

    #[test]
    fn test_invalid_size_is_error() {
        let mut scene = Scene::new("s", "Office", "").with_objects(vec![cube("o1", "desk", 0.0)]);
        let report = validate_scene(&mut scene, false);
        assert!(!report.is_valid);
        assert_eq!(report.issues[0].object_ids, vec!["o1".to_string()]);
    }

    #[test]
    fn test_missing_object_name_reported_as_fixable() {
        let mut scene = Scene::new("s", "Office", "").with_objects(vec![cube("o1", " ", 1.0)]);
        let report = validate_scene(&mut scene, false);
        assert!(report.is_valid);
        assert!(report.issues[0].auto_fixable);
        assert_eq!(report.auto_fixes_applied, 0);
        assert_eq!(scene.objects[0].name, " ");
    }

    #[test]
    fn test_auto_fix_names() {
        let mut scene = Scene::new("s9", "", "").with_objects(vec![cube("o1", "", 1.0)]);
        let report = validate_scene(&mut scene, true);
        assert_eq!(report.auto_fixes_applied, 2);
        assert!(report.issues.is_empty());
        assert_eq!(scene.name, "Unnamed Scene s9");
        assert_eq!(scene.objects[0].name, "cube_o1");
    }

    #[test]
    fn test_lack_of_variety_is_info() {
        let mut scene = Scene::new("s", "Blocks", "").with_objects(
            (1..=4).map(|i| cube(&format!("o{i}"), "block", 1.0)).collect(),
        );
        let report = validate_scene(&mut scene, false);
        assert!(report.is_valid);
        assert_eq!(report.count(IssueSeverity::Info), 1);
    }

    #[test]
    fn test_too_many_objects_warning() {
        let mut scene = Scene::new("s", "Crowd", "").with_objects(
            (0..=MAX_OBJECTS)
                .map(|i| {
                    let t = if i % 2 == 0 { ObjectType::Cube } else { ObjectType::Sphere };
                    SceneObject::new(format!("o{i}"), "thing", t, 1.0)
                })
                .collect(),
        );
        let report = validate_scene(&mut scene, false);
        assert!(report.is_valid);
        assert_eq!(report.issues[0].category.as_deref(), Some("too_many_objects"));
    }
}
