//! Render pass attachment descriptors and sub-pass index sets.

use std::ops::{Index, IndexMut};
use std::sync::Arc;

use bitflags::bitflags;

use crate::resources::Texture;

/// Maximum number of color attachments in a raster pass.
pub const MAX_COLOR_ATTACHMENTS: usize = 8;

// ============================================================================
// Attachment Index List
// ============================================================================

/// Fixed-capacity ordered set of attachment slot indices.
///
/// Sub-pass descriptors reference color attachments by position through this
/// list. Storage is a fixed array of [`MAX_COLOR_ATTACHMENTS`] slots, each
/// initialized to `-1` (unset), with an explicit active count. There is no
/// heap allocation and no resize after construction.
///
/// # Panics
///
/// Indexed access checks the hard capacity first and the active count second;
/// violating either is a programmer error and panics with a message naming
/// the violated bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttachmentIndexList {
    slots: [i32; MAX_COLOR_ATTACHMENTS],
    len: usize,
}

impl AttachmentIndexList {
    /// An empty list with active count 0.
    pub const EMPTY: Self = Self {
        slots: [-1; MAX_COLOR_ATTACHMENTS],
        len: 0,
    };

    /// Create a list with `len` active slots, each initialized to `-1`.
    ///
    /// # Panics
    ///
    /// Panics if `len` exceeds [`MAX_COLOR_ATTACHMENTS`].
    pub fn new(len: usize) -> Self {
        assert!(
            len <= MAX_COLOR_ATTACHMENTS,
            "attachment index list length {len} exceeds capacity {MAX_COLOR_ATTACHMENTS}"
        );
        Self {
            slots: [-1; MAX_COLOR_ATTACHMENTS],
            len,
        }
    }

    /// Create a list from a slice of attachment indices.
    ///
    /// # Panics
    ///
    /// Panics if the slice holds more than [`MAX_COLOR_ATTACHMENTS`] entries.
    pub fn from_slice(indices: &[i32]) -> Self {
        let mut list = Self::new(indices.len());
        for (i, &index) in indices.iter().enumerate() {
            list.slots[i] = index;
        }
        list
    }

    /// Number of active slots.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if no slots are active.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Read the attachment index at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is outside the capacity or the active count.
    pub fn get(&self, index: usize) -> i32 {
        self.check_bounds(index);
        self.slots[index]
    }

    /// Write the attachment index at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is outside the capacity or the active count.
    pub fn set(&mut self, index: usize, value: i32) {
        self.check_bounds(index);
        self.slots[index] = value;
    }

    /// Iterate over the active attachment indices.
    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        self.slots[..self.len].iter().copied()
    }

    // Capacity first, active count second. The two panics stay distinct so
    // the message identifies which bound was violated.
    #[inline]
    fn check_bounds(&self, index: usize) {
        assert!(
            index < MAX_COLOR_ATTACHMENTS,
            "attachment slot index {index} out of capacity range [0, {MAX_COLOR_ATTACHMENTS})"
        );
        assert!(
            index < self.len,
            "attachment slot index {index} out of active range [0, {})",
            self.len
        );
    }
}

impl Default for AttachmentIndexList {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Index<usize> for AttachmentIndexList {
    type Output = i32;

    fn index(&self, index: usize) -> &Self::Output {
        self.check_bounds(index);
        &self.slots[index]
    }
}

impl IndexMut<usize> for AttachmentIndexList {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        self.check_bounds(index);
        &mut self.slots[index]
    }
}

// ============================================================================
// Load / Store / Resolve Actions
// ============================================================================

/// What happens to an attachment's contents when a pass begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LoadAction {
    /// Preserve the existing contents.
    #[default]
    Load,
    /// Clear to the attachment's clear value.
    Clear,
    /// Contents are undefined; cheapest when fully overwritten.
    DontCare,
}

/// What happens to an attachment's contents when a pass ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StoreAction {
    /// Write the results back to memory.
    #[default]
    Store,
    /// Discard the results.
    DontCare,
    /// Resolve multisampled results into the attachment's resolve target.
    Resolve,
}

/// How multisampled values collapse into a resolve target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResolveMode {
    /// Average of all samples.
    #[default]
    Average,
    /// Minimum sample value.
    Min,
    /// Maximum sample value.
    Max,
}

// ============================================================================
// Attachment Descriptors
// ============================================================================

/// Color attachment of a raster pass.
#[derive(Debug, Clone)]
pub struct ColorAttachmentDescriptor {
    /// Render target texture.
    pub texture: Arc<Texture>,
    /// Bound mip level.
    pub mip_level: u32,
    /// Bound array slice.
    pub array_slice: u32,
    /// RGBA clear value used with [`LoadAction::Clear`].
    pub clear_color: [f32; 4],
    /// Load action at pass begin.
    pub load_action: LoadAction,
    /// Store action at pass end.
    pub store_action: StoreAction,
    /// Resolve destination, required with [`StoreAction::Resolve`].
    pub resolve_target: Option<Arc<Texture>>,
    /// Mip level of the resolve destination.
    pub resolve_mip_level: u32,
    /// Array slice of the resolve destination.
    pub resolve_array_slice: u32,
}

impl ColorAttachmentDescriptor {
    /// Create an attachment bound to mip 0, slice 0, load-and-store.
    pub fn from_texture(texture: Arc<Texture>) -> Self {
        Self {
            texture,
            mip_level: 0,
            array_slice: 0,
            clear_color: [0.0; 4],
            load_action: LoadAction::Load,
            store_action: StoreAction::Store,
            resolve_target: None,
            resolve_mip_level: 0,
            resolve_array_slice: 0,
        }
    }

    /// Clear to the given color at pass begin.
    pub fn with_clear(mut self, color: [f32; 4]) -> Self {
        self.clear_color = color;
        self.load_action = LoadAction::Clear;
        self
    }

    /// Set the load action.
    pub fn with_load_action(mut self, action: LoadAction) -> Self {
        self.load_action = action;
        self
    }

    /// Set the store action.
    pub fn with_store_action(mut self, action: StoreAction) -> Self {
        self.store_action = action;
        self
    }

    /// Bind a specific mip level and array slice.
    pub fn with_subresource(mut self, mip_level: u32, array_slice: u32) -> Self {
        self.mip_level = mip_level;
        self.array_slice = array_slice;
        self
    }

    /// Resolve into `target` at pass end.
    pub fn with_resolve_target(mut self, target: Arc<Texture>) -> Self {
        self.resolve_target = Some(target);
        self.store_action = StoreAction::Resolve;
        self
    }
}

/// Depth-stencil attachment of a raster pass.
///
/// Depth and stencil planes carry independent load/store actions and clear
/// values.
#[derive(Debug, Clone)]
pub struct DepthStencilAttachmentDescriptor {
    /// Depth-stencil target texture.
    pub texture: Arc<Texture>,
    /// Bound mip level.
    pub mip_level: u32,
    /// Bound array slice.
    pub array_slice: u32,
    /// Depth clear value used with [`LoadAction::Clear`].
    pub depth_clear_value: f32,
    /// Depth plane load action.
    pub depth_load_action: LoadAction,
    /// Depth plane store action.
    pub depth_store_action: StoreAction,
    /// Stencil clear value used with [`LoadAction::Clear`].
    pub stencil_clear_value: u32,
    /// Stencil plane load action.
    pub stencil_load_action: LoadAction,
    /// Stencil plane store action.
    pub stencil_store_action: StoreAction,
    /// Resolve destination, required when either plane resolves.
    pub resolve_target: Option<Arc<Texture>>,
    /// Mip level of the resolve destination.
    pub resolve_mip_level: u32,
    /// Array slice of the resolve destination.
    pub resolve_array_slice: u32,
    /// Sample collapse mode for depth resolves.
    pub resolve_mode: ResolveMode,
}

impl DepthStencilAttachmentDescriptor {
    /// Create an attachment bound to mip 0, slice 0, load-and-store on both
    /// planes.
    pub fn from_texture(texture: Arc<Texture>) -> Self {
        Self {
            texture,
            mip_level: 0,
            array_slice: 0,
            depth_clear_value: 1.0,
            depth_load_action: LoadAction::Load,
            depth_store_action: StoreAction::Store,
            stencil_clear_value: 0,
            stencil_load_action: LoadAction::Load,
            stencil_store_action: StoreAction::Store,
            resolve_target: None,
            resolve_mip_level: 0,
            resolve_array_slice: 0,
            resolve_mode: ResolveMode::Average,
        }
    }

    /// Clear depth to `depth` at pass begin.
    pub fn with_depth_clear(mut self, depth: f32) -> Self {
        self.depth_clear_value = depth;
        self.depth_load_action = LoadAction::Clear;
        self
    }

    /// Clear stencil to `stencil` at pass begin.
    pub fn with_stencil_clear(mut self, stencil: u32) -> Self {
        self.stencil_clear_value = stencil;
        self.stencil_load_action = LoadAction::Clear;
        self
    }

    /// Set the depth plane store action.
    pub fn with_depth_store_action(mut self, action: StoreAction) -> Self {
        self.depth_store_action = action;
        self
    }

    /// Resolve into `target` at pass end using `mode`.
    pub fn with_resolve_target(mut self, target: Arc<Texture>, mode: ResolveMode) -> Self {
        self.resolve_target = Some(target);
        self.resolve_mode = mode;
        self
    }
}

// ============================================================================
// Sub-Passes
// ============================================================================

bitflags! {
    /// Flags modifying how one sub-pass binds its attachments.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SubPassFlags: u32 {
        /// Depth plane is read-only in this sub-pass.
        const READ_ONLY_DEPTH = 1 << 0;
        /// Stencil plane is read-only in this sub-pass.
        const READ_ONLY_STENCIL = 1 << 1;
    }
}

impl Default for SubPassFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// One sub-pass within a raster pass.
///
/// Input and output lists hold positions into the owning pass's color
/// attachment array. Every referenced position must be smaller than the
/// number of declared color attachments; this is validated when the pass
/// begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SubPassDescriptor {
    /// Binding flags for this sub-pass.
    pub flags: SubPassFlags,
    /// Color attachments read as sub-pass inputs.
    pub color_inputs: AttachmentIndexList,
    /// Color attachments written as sub-pass outputs.
    pub color_outputs: AttachmentIndexList,
}

impl SubPassDescriptor {
    /// Create a sub-pass writing the given color attachment positions.
    pub fn with_outputs(outputs: &[i32]) -> Self {
        Self {
            flags: SubPassFlags::empty(),
            color_inputs: AttachmentIndexList::EMPTY,
            color_outputs: AttachmentIndexList::from_slice(outputs),
        }
    }

    /// Set the color attachments read as inputs.
    pub fn with_inputs(mut self, inputs: &[i32]) -> Self {
        self.color_inputs = AttachmentIndexList::from_slice(inputs);
        self
    }

    /// Set the binding flags.
    pub fn with_flags(mut self, flags: SubPassFlags) -> Self {
        self.flags = flags;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_list_roundtrip() {
        let mut list = AttachmentIndexList::new(3);
        for i in 0..3 {
            assert_eq!(list.get(i), -1);
            list.set(i, i as i32 * 2);
        }
        assert_eq!(list.get(0), 0);
        assert_eq!(list.get(1), 2);
        assert_eq!(list.get(2), 4);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_index_list_from_slice() {
        let list = AttachmentIndexList::from_slice(&[3, 1, 4]);
        assert_eq!(list.len(), 3);
        assert_eq!(list[0], 3);
        assert_eq!(list[2], 4);
        assert_eq!(list.iter().collect::<Vec<_>>(), vec![3, 1, 4]);
    }

    #[test]
    fn test_index_list_index_mut() {
        let mut list = AttachmentIndexList::new(2);
        list[1] = 7;
        assert_eq!(list[1], 7);
    }

    #[test]
    fn test_index_list_empty() {
        assert!(AttachmentIndexList::EMPTY.is_empty());
        assert_eq!(AttachmentIndexList::default().len(), 0);
    }

    #[test]
    #[should_panic(expected = "out of capacity range")]
    fn test_index_list_capacity_violation() {
        let list = AttachmentIndexList::new(8);
        let _ = list.get(8);
    }

    #[test]
    #[should_panic(expected = "out of active range")]
    fn test_index_list_active_count_violation() {
        let list = AttachmentIndexList::new(2);
        let _ = list.get(5);
    }

    #[test]
    #[should_panic(expected = "out of active range")]
    fn test_index_list_write_past_active_count() {
        let mut list = AttachmentIndexList::new(0);
        list.set(0, 1);
    }

    #[test]
    #[should_panic(expected = "exceeds capacity")]
    fn test_index_list_oversized_construction() {
        let _ = AttachmentIndexList::new(9);
    }

    #[test]
    fn test_sub_pass_descriptor() {
        let sub_pass = SubPassDescriptor::with_outputs(&[0, 1])
            .with_inputs(&[2])
            .with_flags(SubPassFlags::READ_ONLY_DEPTH);
        assert_eq!(sub_pass.color_outputs.len(), 2);
        assert_eq!(sub_pass.color_inputs[0], 2);
        assert!(sub_pass.flags.contains(SubPassFlags::READ_ONLY_DEPTH));
    }
}
