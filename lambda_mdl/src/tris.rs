use std::mem::size_of;

use byteorder::NativeEndian;
use tracing::warn;
use zerocopy::{byteorder::I16, FromBytes, Unaligned};

use super::binary_utils::{parse, parse_slice};
use super::{Error, FileType, Result};

/// A vertex lies on a texture seam when this bit is set in its normal index.
const ON_SEAM: u16 = 0x8000;

/// One entry of a fan/strip triangle command.
#[derive(Debug, Clone, FromBytes, Unaligned)]
#[repr(C)]
struct CommandVertex {
    vertex_index: I16<NativeEndian>,
    normal_index: I16<NativeEndian>,
    s: I16<NativeEndian>,
    t: I16<NativeEndian>,
}

/// Bounds and texture context for expanding one mesh's command stream.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Limits {
    pub vertex_count: usize,
    pub normal_count: usize,
    /// Base added to the mesh-local normal indices in the stream.
    pub normal_base: usize,
    pub texture_width: i32,
    pub texture_height: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct TriangleVertex {
    pub vertex_index: usize,
    pub normal_index: usize,
    pub uv: [f32; 2],
}

pub(crate) type Triangle = [TriangleVertex; 3];

/// Expands a zero-terminated fan/strip command stream into a uniformly
/// wound triangle list. Triangles referencing out-of-range vertices or
/// normals are dropped.
///
/// # Errors
///
/// Returns `Err` if the stream itself runs past the end of the buffer.
pub(crate) fn expand(bytes: &[u8], offset: usize, limits: &Limits) -> Result<Vec<Triangle>> {
    let mut offset = offset;
    let mut triangles = Vec::new();

    loop {
        let count = parse::<I16<NativeEndian>>(bytes, offset)
            .ok_or(Error::Corrupted {
                ty: FileType::Mdl,
                error: "triangle commands out of bounds",
            })?
            .get();
        offset += size_of::<I16<NativeEndian>>();

        if count == 0 {
            break;
        }

        let fan = count < 0;
        let count = usize::from(count.unsigned_abs());

        let vertices: &[CommandVertex] =
            parse_slice(bytes, offset, count).ok_or(Error::Corrupted {
                ty: FileType::Mdl,
                error: "triangle command vertices out of bounds",
            })?;
        offset += count * size_of::<CommandVertex>();

        let decoded: Vec<Option<TriangleVertex>> = vertices
            .iter()
            .map(|vertex| decode_vertex(vertex, limits))
            .collect();

        for i in 2..count {
            let indices = if fan {
                [0, i - 1, i]
            } else if i % 2 == 0 {
                [i - 2, i - 1, i]
            } else {
                [i - 1, i - 2, i]
            };

            match (
                decoded[indices[0]],
                decoded[indices[1]],
                decoded[indices[2]],
            ) {
                (Some(a), Some(b), Some(c)) => triangles.push([a, b, c]),
                _ => warn!("dropping triangle with out of range indices"),
            }
        }
    }

    Ok(triangles)
}

fn decode_vertex(vertex: &CommandVertex, limits: &Limits) -> Option<TriangleVertex> {
    let vertex_index: usize = vertex.vertex_index.get().try_into().ok()?;
    if vertex_index >= limits.vertex_count {
        return None;
    }

    #[allow(clippy::cast_sign_loss)]
    let raw_normal = vertex.normal_index.get() as u16;
    let on_seam = raw_normal & ON_SEAM != 0;

    let normal_index = usize::from(raw_normal & !ON_SEAM) + limits.normal_base;
    if normal_index >= limits.normal_count {
        return None;
    }

    let mut s = i32::from(vertex.s.get());
    if on_seam {
        s += limits.texture_width / 2;
    }
    let t = i32::from(vertex.t.get());

    Some(TriangleVertex {
        vertex_index,
        normal_index,
        uv: [
            normalize_texel(s, limits.texture_width),
            normalize_texel(t, limits.texture_height),
        ],
    })
}

/// Converts a texel coordinate to `[0, 1]`, sampling at the texel center.
fn normalize_texel(texel: i32, dimension: i32) -> f32 {
    if dimension <= 0 {
        return 0.0;
    }

    #[allow(clippy::cast_precision_loss)]
    let normalized = (texel as f32 + 0.5) / dimension as f32;
    normalized.clamp(0.0, 1.0)
}
