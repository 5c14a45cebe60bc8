use shared::{ObjectId, Scene};

/// Objects marked for selective export. Scoped to a single loaded scene;
/// the session clears it whenever that scene changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    /// Selected object IDs (in order of selection)
    selected: Vec<ObjectId>,
}

impl Selection {
    /// All selected objects
    pub fn all(&self) -> &[ObjectId] {
        &self.selected
    }

    /// Check if an object is selected
    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.iter().any(|s| s == id)
    }

    /// Number of selected objects
    pub fn count(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Include or exclude an object. Returns true if the selection changed.
    pub fn set(&mut self, id: &str, included: bool) -> bool {
        let pos = self.selected.iter().position(|s| s == id);
        match (pos, included) {
            (None, true) => {
                self.selected.push(id.to_string());
                true
            }
            (Some(pos), false) => {
                self.selected.remove(pos);
                true
            }
            _ => false,
        }
    }

    /// Clear all selection
    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Selected ids in the scene's object order
    pub fn ordered_for(&self, scene: &Scene) -> Vec<ObjectId> {
        scene
            .objects
            .iter()
            .filter(|o| self.is_selected(&o.id))
            .map(|o| o.id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{ObjectType, SceneObject};

    fn scene() -> Scene {
        Scene::new("s1", "Office", "").with_objects(vec![
            SceneObject::new("o1", "desk", ObjectType::Cube, 2.0),
            SceneObject::new("o2", "chair", ObjectType::Cube, 1.0),
            SceneObject::new("o3", "lamp", ObjectType::Cylinder, 0.5),
        ])
    }

    #[test]
    fn test_initial_empty() {
        let s = Selection::default();
        assert!(s.all().is_empty());
        assert!(s.is_empty());
        assert_eq!(s.count(), 0);
    }

    #[test]
    fn test_include() {
        let mut s = Selection::default();
        assert!(s.set("a", true));
        assert_eq!(s.count(), 1);
        assert!(s.is_selected("a"));
    }

    #[test]
    fn test_include_twice_is_noop() {
        let mut s = Selection::default();
        s.set("a", true);
        assert!(!s.set("a", true));
        assert_eq!(s.count(), 1);
    }

    #[test]
    fn test_exclude() {
        let mut s = Selection::default();
        s.set("a", true);
        s.set("b", true);
        assert!(s.set("a", false));
        assert_eq!(s.count(), 1);
        assert!(!s.is_selected("a"));
        assert!(s.is_selected("b"));
    }

    #[test]
    fn test_exclude_missing_is_noop() {
        let mut s = Selection::default();
        assert!(!s.set("a", false));
        assert!(s.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut s = Selection::default();
        s.set("a", true);
        s.set("b", true);
        s.clear();
        assert_eq!(s.count(), 0);
    }

    #[test]
    fn test_all_preserves_order() {
        let mut s = Selection::default();
        s.set("c", true);
        s.set("a", true);
        s.set("b", true);
        assert_eq!(s.all(), &["c".to_string(), "a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_ordered_for_follows_scene_order() {
        let mut s = Selection::default();
        s.set("o3", true);
        s.set("o1", true);
        assert_eq!(s.ordered_for(&scene()), vec!["o1".to_string(), "o3".to_string()]);
    }
}
