//! Text layer — owns labels, their shared geometry pool, and the
//! per-frame dirty queue.
//!
//! Labels never hold a back-reference to the layer; they are addressed
//! by [`LabelId`] and the layer records which ones changed. The queue is
//! drained exactly once per frame by [`TextLayer::sync_dirty`], which
//! batches every migration and vertex rewrite that accumulated since the
//! previous frame, in first-marked order, before the renderer uploads.

use std::collections::HashSet;

use thiserror::Error;

use glint_text::layout::{GlyphProvider, LayoutError};

use crate::label::Label;
use crate::pool::{GeometryPool, PoolError};

#[derive(Error, Debug)]
pub enum LayerError {
    #[error("unknown or removed label")]
    UnknownLabel,
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Handle to a label owned by a [`TextLayer`]. Generational: removing a
/// label invalidates every outstanding copy of its id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LabelId {
    index: u32,
    generation: u32,
}

/// Order-preserving, de-duplicating queue of labels needing per-frame
/// work.
pub struct DirtyQueue {
    pending: Vec<LabelId>,
    queued: HashSet<LabelId>,
}

impl DirtyQueue {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            queued: HashSet::new(),
        }
    }

    /// Queue a label. Re-marking an already-queued label is a no-op, so
    /// any number of mutations within a frame cost one sync.
    pub fn mark(&mut self, id: LabelId) {
        if self.queued.insert(id) {
            self.pending.push(id);
        }
    }

    /// Take every queued id, in first-marked order, leaving the queue
    /// empty.
    pub fn drain(&mut self) -> Vec<LabelId> {
        self.queued.clear();
        std::mem::take(&mut self.pending)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl Default for DirtyQueue {
    fn default() -> Self {
        Self::new()
    }
}

struct Slot {
    label: Option<Label>,
    generation: u32,
}

/// A render layer's worth of labels sharing one [`GeometryPool`].
pub struct TextLayer {
    slots: Vec<Slot>,
    free: Vec<u32>,
    dirty: DirtyQueue,
    pool: GeometryPool,
}

impl TextLayer {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            dirty: DirtyQueue::new(),
            pool: GeometryPool::new(),
        }
    }

    /// Add an empty label at the given display font size.
    pub fn create_label(&mut self, font_size: f32) -> LabelId {
        let label = Label::new(font_size);
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.label = Some(label);
            LabelId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                label: Some(label),
                generation: 0,
            });
            LabelId {
                index,
                generation: 0,
            }
        }
    }

    pub fn label(&self, id: LabelId) -> Option<&Label> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.label.as_ref())
    }

    fn label_mut(&mut self, id: LabelId) -> Result<&mut Label, LayerError> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.label.as_mut())
            .ok_or(LayerError::UnknownLabel)
    }

    /// Set a label's text: NFKC normalization and layout run now, the
    /// pool work is deferred to [`sync_dirty`](Self::sync_dirty).
    ///
    /// On layout failure the label keeps its previous geometry and is
    /// not queued.
    pub fn set_text<P: GlyphProvider + ?Sized>(
        &mut self,
        id: LabelId,
        text: &str,
        font: &mut P,
    ) -> Result<(), LayerError> {
        self.label_mut(id)?.set_text(text, font)?;
        self.dirty.mark(id);
        Ok(())
    }

    pub fn set_color(&mut self, id: LabelId, color: [f32; 4]) -> Result<(), LayerError> {
        self.label_mut(id)?.set_color(color);
        self.dirty.mark(id);
        Ok(())
    }

    pub fn set_transform(
        &mut self,
        id: LabelId,
        pos: [f32; 2],
        rotation: f32,
        scale: f32,
    ) -> Result<(), LayerError> {
        self.label_mut(id)?.set_transform(pos, rotation, scale);
        self.dirty.mark(id);
        Ok(())
    }

    /// Remove a label, releasing its pool allocation and recycling the
    /// slot.
    pub fn remove(&mut self, id: LabelId) -> Result<(), LayerError> {
        let slot = self
            .slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .ok_or(LayerError::UnknownLabel)?;
        let mut label = slot.label.take().ok_or(LayerError::UnknownLabel)?;
        slot.generation += 1;
        self.free.push(id.index);
        label.release(&mut self.pool)?;
        Ok(())
    }

    /// Drain the dirty queue once, running each queued label's migration
    /// and vertex rewrite in first-marked order.
    ///
    /// Call once per frame, after all mutations and before the
    /// renderer's upload.
    pub fn sync_dirty(&mut self) -> Result<(), LayerError> {
        let ids = self.dirty.drain();
        if !ids.is_empty() {
            log::debug!("layer sync: {} dirty label(s)", ids.len());
        }
        for id in ids {
            let slot = match self
                .slots
                .get_mut(id.index as usize)
                .filter(|s| s.generation == id.generation)
            {
                Some(s) => s,
                None => continue, // removed after it was marked
            };
            if let Some(label) = slot.label.as_mut() {
                label.sync(&mut self.pool)?;
            }
        }
        Ok(())
    }

    /// The shared geometry pool, for upload and draw.
    pub fn pool(&self) -> &GeometryPool {
        &self.pool
    }

    pub fn pool_mut(&mut self) -> &mut GeometryPool {
        &mut self.pool
    }

    /// Number of labels currently alive.
    pub fn label_count(&self) -> usize {
        self.slots.iter().filter(|s| s.label.is_some()).count()
    }

    /// Number of labels queued for the next sync.
    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }
}

impl Default for TextLayer {
    fn default() -> Self {
        Self::new()
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use glint_text::atlas::{AtlasError, GlyphEntry, TextureId};
    use glint_text::fonts::CharMetrics;

    struct FixedFont {
        texture: TextureId,
    }

    impl FixedFont {
        fn new() -> Self {
            Self {
                texture: TextureId::fresh(),
            }
        }
    }

    impl GlyphProvider for FixedFont {
        fn metrics(&self, text: &str) -> Vec<CharMetrics> {
            text.chars()
                .map(|_| CharMetrics {
                    min_x: 0.0,
                    max_x: 8.0,
                    min_y: 0.0,
                    max_y: 8.0,
                    advance: 10.0,
                })
                .collect()
        }

        fn descent(&self) -> f32 {
            0.0
        }

        fn base_size(&self) -> f32 {
            48.0
        }

        fn texture(&self) -> TextureId {
            self.texture
        }

        fn glyph(&mut self, _ch: char) -> Result<GlyphEntry, AtlasError> {
            Ok(GlyphEntry {
                texture: self.texture,
                uvs: [[0.0, 1.0], [1.0, 1.0], [0.0, 0.0], [1.0, 0.0]],
                verts: [
                    [0.0, 0.0, 1.0],
                    [8.0, 0.0, 1.0],
                    [0.0, 8.0, 1.0],
                    [8.0, 8.0, 1.0],
                ],
            })
        }
    }

    #[test]
    fn test_dirty_queue_dedups_in_order() {
        let mut layer = TextLayer::new();
        let a = layer.create_label(16.0);
        let b = layer.create_label(16.0);

        let mut queue = DirtyQueue::new();
        queue.mark(b);
        queue.mark(a);
        queue.mark(b);
        queue.mark(a);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.drain(), vec![b, a]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_set_text_defers_pool_work() {
        let mut font = FixedFont::new();
        let mut layer = TextLayer::new();
        let id = layer.create_label(48.0);

        layer.set_text(id, "hi", &mut font).unwrap();
        assert_eq!(layer.dirty_count(), 1);
        assert_eq!(layer.pool().live_count(), 0, "no pool work before sync");

        layer.sync_dirty().unwrap();
        assert_eq!(layer.dirty_count(), 0);
        assert_eq!(layer.pool().live_count(), 1);
        assert_eq!(layer.pool().vertices().len(), 8);
    }

    #[test]
    fn test_many_mutations_one_sync() {
        let mut font = FixedFont::new();
        let mut layer = TextLayer::new();
        let id = layer.create_label(48.0);

        layer.set_text(id, "hi", &mut font).unwrap();
        layer.set_color(id, [1.0, 0.0, 0.0, 1.0]).unwrap();
        layer.set_transform(id, [10.0, 10.0], 0.0, 1.0).unwrap();
        assert_eq!(layer.dirty_count(), 1, "mutations de-duplicate");

        layer.sync_dirty().unwrap();
        assert_eq!(layer.pool().vertices()[0].color, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(layer.pool().vertices()[0].position, [10.0, 10.0]);
    }

    #[test]
    fn test_remove_releases_and_invalidates() {
        let mut font = FixedFont::new();
        let mut layer = TextLayer::new();
        let id = layer.create_label(48.0);

        layer.set_text(id, "hi", &mut font).unwrap();
        layer.sync_dirty().unwrap();

        layer.remove(id).unwrap();
        assert_eq!(layer.pool().live_count(), 0);
        assert_eq!(layer.label_count(), 0);
        assert!(matches!(
            layer.set_text(id, "x", &mut font),
            Err(LayerError::UnknownLabel)
        ));
    }

    #[test]
    fn test_slot_reuse_new_generation() {
        let mut layer = TextLayer::new();
        let a = layer.create_label(16.0);
        layer.remove(a).unwrap();
        let b = layer.create_label(16.0);
        assert_ne!(a, b, "recycled slot must mint a new id");
        assert!(layer.label(a).is_none());
        assert!(layer.label(b).is_some());
    }

    #[test]
    fn test_removed_label_skipped_by_sync() {
        let mut font = FixedFont::new();
        let mut layer = TextLayer::new();
        let id = layer.create_label(48.0);

        layer.set_text(id, "hi", &mut font).unwrap();
        layer.remove(id).unwrap();
        // Marked, then removed before the frame: drain must skip it.
        layer.sync_dirty().unwrap();
        assert_eq!(layer.pool().live_count(), 0);
    }

    #[test]
    fn test_two_labels_share_pool() {
        let mut font = FixedFont::new();
        let mut layer = TextLayer::new();
        let a = layer.create_label(48.0);
        let b = layer.create_label(48.0);

        layer.set_text(a, "ab", &mut font).unwrap();
        layer.set_text(b, "cde", &mut font).unwrap();
        layer.sync_dirty().unwrap();

        assert_eq!(layer.pool().live_count(), 2);
        assert_eq!(layer.pool().vertices().len(), 8 + 12);
        assert_eq!(layer.pool().texture(), Some(font.texture));
    }
}
