//! Geometry pool — a shared, growable vertex/index store with
//! sub-allocation.
//!
//! Every label allocated into a pool draws from one texture in one
//! indexed draw call, so the pool owns a single CPU-side vertex array
//! and index array plus the texture binding. Allocations reserve
//! contiguous, non-aliasing regions of both arrays; freeing a region
//! zeroes its indices (degenerate triangles) and returns it to a free
//! list for exact-fit reuse, so no region is ever orphaned.
//!
//! A dirty flag tracks CPU-side changes since the last GPU upload; the
//! renderer consumes it once per frame.

use thiserror::Error;

use glint_text::TextureId;

use crate::vertex::TextVertex;

#[derive(Error, Debug)]
pub enum PoolError {
    /// A write supplied a different element count than the region holds.
    #[error("wrote {got} {kind} into a region sized for {reserved}")]
    AllocationMismatch {
        kind: &'static str,
        reserved: usize,
        got: usize,
    },
    /// The handle was freed or never issued by this pool.
    #[error("stale or unknown pool handle")]
    StaleHandle,
    /// The pool is already bound to a different texture with live
    /// allocations; the caller must migrate to another pool.
    #[error("pool is bound to a different atlas texture")]
    TextureMismatch,
}

/// Handle to one allocation. Generational: freeing invalidates every
/// outstanding copy of the handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolHandle {
    index: u32,
    generation: u32,
}

struct Region {
    v_off: usize,
    v_len: usize,
    i_off: usize,
    i_len: usize,
    generation: u32,
    live: bool,
}

/// Shared vertex/index store for all labels drawing from one texture.
pub struct GeometryPool {
    vertices: Vec<TextVertex>,
    indices: Vec<u32>,
    regions: Vec<Region>,
    /// Region slots awaiting exact-fit reuse.
    free: Vec<u32>,
    texture: Option<TextureId>,
    dirty: bool,
}

impl GeometryPool {
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
            regions: Vec::new(),
            free: Vec::new(),
            texture: None,
            dirty: false,
        }
    }

    /// The texture all allocations sample, if one is bound.
    pub fn texture(&self) -> Option<TextureId> {
        self.texture
    }

    /// Bind the pool to `texture`.
    ///
    /// Rebinding is allowed only while no allocation is live; otherwise a
    /// single pool-wide draw call could not cover existing geometry.
    pub fn bind_texture(&mut self, texture: TextureId) -> Result<(), PoolError> {
        match self.texture {
            Some(t) if t == texture => Ok(()),
            Some(_) if self.live_count() > 0 => Err(PoolError::TextureMismatch),
            _ => {
                self.texture = Some(texture);
                Ok(())
            }
        }
    }

    /// Reserve `vcount` vertices and `icount` indices.
    ///
    /// Reuses a freed region of exactly matching size when one exists,
    /// otherwise appends to the arrays. Returned regions never alias.
    pub fn alloc(&mut self, vcount: usize, icount: usize) -> PoolHandle {
        // Exact-fit reuse from the free list.
        if let Some(pos) = self.free.iter().position(|&slot| {
            let r = &self.regions[slot as usize];
            r.v_len == vcount && r.i_len == icount
        }) {
            let slot = self.free.swap_remove(pos);
            let region = &mut self.regions[slot as usize];
            region.live = true;
            log::trace!("pool: reused region {slot} ({vcount}v/{icount}i)");
            return PoolHandle {
                index: slot,
                generation: region.generation,
            };
        }

        let v_off = self.vertices.len();
        let i_off = self.indices.len();
        self.vertices
            .resize(v_off + vcount, TextVertex::new([0.0; 2], [0.0; 4], [0.0; 2]));
        self.indices.resize(i_off + icount, 0);

        let index = self.regions.len() as u32;
        self.regions.push(Region {
            v_off,
            v_len: vcount,
            i_off,
            i_len: icount,
            generation: 0,
            live: true,
        });
        self.dirty = true;
        log::trace!("pool: new region {index} ({vcount}v/{icount}i)");

        PoolHandle {
            index,
            generation: 0,
        }
    }

    /// Release an allocation.
    ///
    /// The region's indices are zeroed so the pool-wide draw renders it
    /// as degenerate triangles, then the slot joins the free list.
    pub fn free(&mut self, handle: PoolHandle) -> Result<(), PoolError> {
        let region = self.check(handle)?;
        let (i_off, i_len) = (region.i_off, region.i_len);

        let region = &mut self.regions[handle.index as usize];
        region.live = false;
        region.generation += 1;
        self.indices[i_off..i_off + i_len].fill(0);
        self.free.push(handle.index);
        self.dirty = true;
        Ok(())
    }

    /// Overwrite the region's vertices. The slice length must equal the
    /// reserved vertex count.
    pub fn write_vertices(
        &mut self,
        handle: PoolHandle,
        data: &[TextVertex],
    ) -> Result<(), PoolError> {
        let region = self.check(handle)?;
        if data.len() != region.v_len {
            return Err(PoolError::AllocationMismatch {
                kind: "vertices",
                reserved: region.v_len,
                got: data.len(),
            });
        }
        let off = region.v_off;
        self.vertices[off..off + data.len()].copy_from_slice(data);
        self.dirty = true;
        Ok(())
    }

    /// Overwrite the region's indices, rebasing each by the region's base
    /// vertex. The slice length must equal the reserved index count.
    pub fn write_indices(&mut self, handle: PoolHandle, data: &[u32]) -> Result<(), PoolError> {
        let region = self.check(handle)?;
        if data.len() != region.i_len {
            return Err(PoolError::AllocationMismatch {
                kind: "indices",
                reserved: region.i_len,
                got: data.len(),
            });
        }
        let (i_off, base) = (region.i_off, region.v_off as u32);
        for (dst, src) in self.indices[i_off..i_off + data.len()]
            .iter_mut()
            .zip(data)
        {
            *dst = src + base;
        }
        self.dirty = true;
        Ok(())
    }

    /// All vertices, including freed regions (their indices are zeroed).
    pub fn vertices(&self) -> &[TextVertex] {
        &self.vertices
    }

    /// All indices, covering every region in one draw.
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Number of live allocations.
    pub fn live_count(&self) -> usize {
        self.regions.iter().filter(|r| r.live).count()
    }

    /// Consume the dirty flag. Returns whether any region changed since
    /// the previous call.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    fn check(&self, handle: PoolHandle) -> Result<&Region, PoolError> {
        self.regions
            .get(handle.index as usize)
            .filter(|r| r.live && r.generation == handle.generation)
            .ok_or(PoolError::StaleHandle)
    }
}

impl Default for GeometryPool {
    fn default() -> Self {
        Self::new()
    }
}

// ===================================================================
// Tests
// ===================================================================
