use glam::{Mat4, Vec3};
use tracing::warn;

use super::animation::BonePose;

/// One entry of the flat per-frame vertex buffer handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// A contiguous run of vertices drawn with one texture. `None` marks an
/// unresolved skin, to be drawn with the renderer's untextured fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawRange {
    pub texture_index: Option<usize>,
    pub first_vertex: usize,
    pub vertex_count: usize,
}

/// Per-frame assembly output. Reused across frames via
/// [`Verified::render_data_into`](crate::Verified::render_data_into);
/// the buffers are overwritten, never incrementally updated.
#[derive(Debug, Clone, Default)]
pub struct RenderData {
    pub vertices: Vec<RenderVertex>,
    pub ranges: Vec<DrawRange>,
}

impl RenderData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn clear(&mut self) {
        self.vertices.clear();
        self.ranges.clear();
    }
}

/// Remaps the source format's right-handed Z-up axes to the renderer's
/// Y-up convention. Applied identically to positions and normals.
pub(crate) fn remap_axes(v: Vec3) -> [f32; 3] {
    [v.x, v.z, -v.y]
}

fn governing_transform(pose: &BonePose, bone_indices: &[u8], index: usize) -> Mat4 {
    let transforms = pose.transforms();
    let bone = bone_indices.get(index).copied().map_or(0, usize::from);

    if let Some(&transform) = transforms.get(bone) {
        transform
    } else {
        warn!(
            "element {} governed by out of range bone {}, defaulting to bone 0",
            index, bone
        );
        transforms.first().copied().unwrap_or(Mat4::IDENTITY)
    }
}

/// Transforms bind pose positions into model space by each vertex's single
/// governing bone.
pub(crate) fn skin_positions(
    positions: &[[f32; 3]],
    bone_indices: &[u8],
    pose: &BonePose,
    skinned: &mut Vec<Vec3>,
) {
    skinned.clear();
    skinned.reserve(positions.len());

    skinned.extend(positions.iter().enumerate().map(|(i, &position)| {
        governing_transform(pose, bone_indices, i).transform_point3(Vec3::from(position))
    }));
}

/// Rotates bind pose normals by each normal's governing bone, ignoring
/// translation, and renormalizes. The format has no non-uniform scale, so
/// no inverse transpose is needed.
pub(crate) fn skin_normals(
    normals: &[[f32; 3]],
    bone_indices: &[u8],
    pose: &BonePose,
    skinned: &mut Vec<Vec3>,
) {
    skinned.clear();
    skinned.reserve(normals.len());

    skinned.extend(normals.iter().enumerate().map(|(i, &normal)| {
        governing_transform(pose, bone_indices, i)
            .transform_vector3(Vec3::from(normal))
            .normalize_or_zero()
    }));
}
