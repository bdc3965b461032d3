// Per-mode render cache

use crate::config::DisplayMode;
use crate::diagram::{Scene, StackLayout};
use rustc_hash::FxHashMap;
use std::rc::Rc;
use tracing::debug;

/// One composed draw
#[derive(Debug, Clone)]
pub struct CachedDraw {
    pub scene: Rc<Scene>,
    /// Stack placement used by the scene, kept for hover hit-testing
    pub stacks: Option<StackLayout>,
}

/// Composed scenes of the current snapshot, one per display mode
#[derive(Debug, Default)]
pub struct RenderCache {
    entries: FxHashMap<DisplayMode, CachedDraw>,
    hits: usize,
    misses: usize,
}

impl RenderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached draw for `mode`, composing and storing it with `compose` on a miss
    pub fn get_or_compose(
        &mut self,
        mode: DisplayMode,
        compose: impl FnOnce() -> CachedDraw,
    ) -> CachedDraw {
        if let Some(entry) = self.entries.get(&mode) {
            self.hits += 1;
            return entry.clone();
        }
        self.misses += 1;
        debug!(?mode, "render cache miss");
        let entry = compose();
        self.entries.insert(mode, entry.clone());
        entry
    }

    pub fn contains(&self, mode: DisplayMode) -> bool {
        self.entries.contains_key(&mode)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::style::Color;

    fn draw() -> CachedDraw {
        CachedDraw {
            scene: Rc::new(Scene {
                width: 1,
                height: 1,
                background: Color::Reset,
                nodes: Vec::new(),
            }),
            stacks: None,
        }
    }

    #[test]
    fn second_lookup_is_a_hit() {
        let mut cache = RenderCache::new();
        let mode = DisplayMode::default();
        let first = cache.get_or_compose(mode, draw);
        let second = cache.get_or_compose(mode, || panic!("should be cached"));
        assert!(Rc::ptr_eq(&first.scene, &second.scene));
        assert_eq!((cache.hits(), cache.misses()), (1, 1));

        cache.clear();
        assert!(!cache.contains(mode));
    }
}
