//! Layout provider boundary
//!
//! The core never measures anything itself. Hosts report element bounds in
//! document coordinates through [`LayoutProvider`], and every consumer
//! re-queries it on each evaluation instead of caching geometry across
//! resizes.

use crate::geometry::{Rect, Size};
use crate::target::TargetId;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

/// Source of element geometry
pub trait LayoutProvider {
    /// Bounds of an element in document coordinates
    fn bounds(&self, id: TargetId) -> Option<Rect>;

    /// Current viewport size
    fn viewport(&self) -> Size;

    /// Scrollable content size of an element (defaults to its bounds)
    fn content_size(&self, id: TargetId) -> Option<Size> {
        self.bounds(id).map(|r| r.size)
    }
}

/// In-memory layout for hosts that push geometry, and for tests
#[derive(Clone, Debug, Default)]
pub struct StaticLayout {
    viewport: Size,
    bounds: FxHashMap<TargetId, Rect>,
    content: FxHashMap<TargetId, Size>,
}

impl StaticLayout {
    pub fn new(viewport: Size) -> Self {
        Self {
            viewport,
            ..Default::default()
        }
    }

    pub fn set_viewport(&mut self, viewport: Size) {
        self.viewport = viewport;
    }

    pub fn set_bounds(&mut self, id: TargetId, bounds: Rect) {
        self.bounds.insert(id, bounds);
    }

    /// Builder: set bounds for an element
    pub fn with_bounds(mut self, id: TargetId, bounds: Rect) -> Self {
        self.set_bounds(id, bounds);
        self
    }

    pub fn set_content_size(&mut self, id: TargetId, size: Size) {
        self.content.insert(id, size);
    }

    pub fn remove(&mut self, id: TargetId) {
        self.bounds.remove(&id);
        self.content.remove(&id);
    }
}

impl LayoutProvider for StaticLayout {
    fn bounds(&self, id: TargetId) -> Option<Rect> {
        self.bounds.get(&id).copied()
    }

    fn viewport(&self) -> Size {
        self.viewport
    }

    fn content_size(&self, id: TargetId) -> Option<Size> {
        self.content
            .get(&id)
            .copied()
            .or_else(|| self.bounds(id).map(|r| r.size))
    }
}

impl<L: LayoutProvider> LayoutProvider for Rc<RefCell<L>> {
    fn bounds(&self, id: TargetId) -> Option<Rect> {
        self.borrow().bounds(id)
    }

    fn viewport(&self) -> Size {
        self.borrow().viewport()
    }

    fn content_size(&self, id: TargetId) -> Option<Size> {
        self.borrow().content_size(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::TargetStore;
    use crate::transform::TransformState;

    #[test]
    fn test_content_size_falls_back_to_bounds() {
        let mut store = TargetStore::new();
        let strip = store.insert("strip", TransformState::IDENTITY);
        let mut layout = StaticLayout::new(Size::new(1280.0, 800.0))
            .with_bounds(strip, Rect::new(0.0, 900.0, 1280.0, 800.0));

        assert_eq!(layout.content_size(strip), Some(Size::new(1280.0, 800.0)));
        layout.set_content_size(strip, Size::new(4000.0, 800.0));
        assert_eq!(layout.content_size(strip), Some(Size::new(4000.0, 800.0)));
    }

    #[test]
    fn test_shared_layout_sees_updates() {
        let mut store = TargetStore::new();
        let id = store.insert("section", TransformState::IDENTITY);
        let shared = Rc::new(RefCell::new(StaticLayout::new(Size::new(800.0, 600.0))));
        let provider = shared.clone();

        assert!(provider.bounds(id).is_none());
        shared.borrow_mut().set_bounds(id, Rect::new(0.0, 100.0, 800.0, 400.0));
        assert_eq!(provider.bounds(id).map(|r| r.y()), Some(100.0));
    }
}
