//! GraphStore - authoritative in-process cache of points
//!
//! A write-through cache over the persistence backend. Entries are only ever
//! replaced wholesale; there is no eviction.

use std::collections::HashMap;

use crate::point::{Point, PointId};

#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    points: HashMap<PointId, Point>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&Point> {
        self.points.get(id)
    }

    /// Insert or overwrite, returning the previous value.
    pub fn put(&mut self, point: Point) -> Option<Point> {
        tracing::trace!(point_id = %point.id, "GraphStore: put");
        self.points.insert(point.id.clone(), point)
    }

    pub fn has(&self, id: &str) -> bool {
        self.points.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> impl Iterator<Item = &Point> {
        self.points.values()
    }

    /// Root points, sorted by id.
    pub fn roots(&self) -> Vec<&Point> {
        let mut roots: Vec<&Point> = self.points.values().filter(|p| p.is_root()).collect();
        roots.sort_by(|a, b| a.id.cmp(&b.id));
        roots
    }
}

impl FromIterator<Point> for GraphStore {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        let mut store = GraphStore::new();
        for point in iter {
            store.put(point);
        }
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_overwrites_existing_entry() {
        let mut store = GraphStore::new();
        assert!(store.put(Point::root("T001", "first")).is_none());

        let previous = store.put(Point::root("T001", "second"));
        assert_eq!(previous.and_then(|p| p.prompt_content().map(str::to_string)), Some("first".to_string()));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("T001").and_then(Point::prompt_content), Some("second"));
    }

    #[test]
    fn has_and_roots() {
        let store: GraphStore = vec![
            Point::root("T002", "b"),
            Point::root("T001", "a"),
            Point::child("T003", "T001", "c"),
        ]
        .into_iter()
        .collect();

        assert!(store.has("T003"));
        assert!(!store.has("T004"));
        let roots: Vec<&str> = store.roots().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(roots, vec!["T001", "T002"]);
    }
}
