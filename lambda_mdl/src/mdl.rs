use std::fmt;
use std::io;
use std::ops::Deref;

use bitflags::bitflags;
use byteorder::NativeEndian;
use maligned::A4;
use zerocopy::{byteorder::I16, FromBytes};

use super::binary_utils::{fixed_str, parse, parse_slice, read_file_aligned};
use super::{Error, FileType, Result};

/// The only studio model version GoldSrc ever shipped.
pub const MDL_VERSION: i32 = 10;

const MDL_SIGNATURE: &[u8; 4] = b"IDST";
const SEQUENCE_GROUP_SIGNATURE: &[u8; 4] = b"IDSQ";

#[derive(Debug, PartialEq, FromBytes)]
#[repr(C)]
struct Header {
    id: [u8; 4],
    version: i32,
    name: [u8; 64],
    data_length: i32,

    eye_position: [f32; 3],
    hull_min: [f32; 3],
    hull_max: [f32; 3],
    view_bb_min: [f32; 3],
    view_bb_max: [f32; 3],

    flags: i32,

    bone_count: i32,
    bone_offset: i32,

    bone_controller_count: i32,
    bone_controller_offset: i32,

    hit_box_count: i32,
    hit_box_offset: i32,

    sequence_count: i32,
    sequence_offset: i32,

    sequence_group_count: i32,
    sequence_group_offset: i32,

    texture_count: i32,
    texture_offset: i32,
    texture_data_offset: i32,

    skin_reference_count: i32,
    skin_family_count: i32,
    skin_offset: i32,

    body_part_count: i32,
    body_part_offset: i32,

    attachment_count: i32,
    attachment_offset: i32,

    sound_table: i32,
    sound_offset: i32,
    sound_group_count: i32,
    sound_group_offset: i32,

    transition_count: i32,
    transition_offset: i32,
}

#[derive(Debug, PartialEq, FromBytes)]
#[repr(C)]
struct SequenceGroupHeader {
    id: [u8; 4],
    version: i32,
    name: [u8; 64],
    data_length: i32,
}

#[derive(Debug, PartialEq, FromBytes)]
#[repr(C)]
pub struct Bone {
    name: [u8; 32],
    pub parent_bone_index: i32,
    pub flags: i32,
    bone_controller_indexes: [i32; 6],

    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub position_scale: [f32; 3],
    pub rotation_scale: [f32; 3],
}

impl Bone {
    #[cfg(test)]
    pub(crate) fn synthetic(position: [f32; 3], rotation: [f32; 3]) -> Self {
        Self {
            name: [0; 32],
            parent_bone_index: -1,
            flags: 0,
            bone_controller_indexes: [-1; 6],
            position,
            rotation,
            position_scale: [1.0; 3],
            rotation_scale: [1.0; 3],
        }
    }

    /// # Errors
    ///
    /// Returns `Err` if the name is not valid utf8.
    pub fn name(&self) -> Result<&str> {
        fixed_str(&self.name).ok_or(Error::Corrupted {
            ty: FileType::Mdl,
            error: "bone name is not valid utf8",
        })
    }
}

#[derive(Debug, PartialEq, FromBytes)]
#[repr(C)]
pub struct BoneController {
    pub bone_index: i32,
    pub kind: i32,
    pub start: f32,
    pub end: f32,
    pub rest: i32,
    pub index: i32,
}

#[derive(Debug, PartialEq, FromBytes)]
#[repr(C)]
pub struct HitBox {
    pub bone_index: i32,
    pub group: i32,
    pub bb_min: [f32; 3],
    pub bb_max: [f32; 3],
}

#[derive(Debug, PartialEq, FromBytes)]
#[repr(C)]
pub struct SequenceDesc {
    label: [u8; 32],

    pub fps: f32,
    flags: i32,

    pub activity: i32,
    pub activity_weight: i32,

    event_count: i32,
    event_offset: i32,

    pub frame_count: i32,

    pivot_count: i32,
    pivot_offset: i32,

    pub motion_type: i32,
    pub motion_bone_index: i32,
    pub linear_movement: [f32; 3],
    auto_move_position_offset: i32,
    auto_move_angle_offset: i32,

    pub bb_min: [f32; 3],
    pub bb_max: [f32; 3],

    pub blend_count: i32,
    anim_offset: i32,
    pub blend_type: [i32; 2],
    pub blend_start: [f32; 2],
    pub blend_end: [f32; 2],
    pub blend_parent: i32,

    pub sequence_group: i32,

    pub entry_node: i32,
    pub exit_node: i32,
    pub node_flags: i32,

    pub next_sequence: i32,
}

impl SequenceDesc {
    /// # Errors
    ///
    /// Returns `Err` if the label is not valid utf8.
    pub fn label(&self) -> Result<&str> {
        fixed_str(&self.label).ok_or(Error::Corrupted {
            ty: FileType::Mdl,
            error: "sequence label is not valid utf8",
        })
    }

    pub fn flags(&self) -> SequenceFlags {
        SequenceFlags::from_bits_truncate(self.flags)
    }

    pub(crate) fn anim_offset(&self) -> i32 {
        self.anim_offset
    }
}

#[derive(Debug, PartialEq, FromBytes)]
#[repr(C)]
pub struct SequenceGroup {
    label: [u8; 32],
    name: [u8; 64],
    unused_1: i32,
    unused_2: i32,
}

impl SequenceGroup {
    /// # Errors
    ///
    /// Returns `Err` if the label is not valid utf8.
    pub fn label(&self) -> Result<&str> {
        fixed_str(&self.label).ok_or(Error::Corrupted {
            ty: FileType::Mdl,
            error: "sequence group label is not valid utf8",
        })
    }

    /// The file name embedded at compile time. Contains build machine paths
    /// in most shipped assets, so companion files are probed by the engine
    /// naming convention instead.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the name is not valid utf8.
    pub fn file_name(&self) -> Result<&str> {
        fixed_str(&self.name).ok_or(Error::Corrupted {
            ty: FileType::Mdl,
            error: "sequence group file name is not valid utf8",
        })
    }
}

#[derive(Debug, PartialEq, FromBytes)]
#[repr(C)]
pub struct Event {
    pub frame: i32,
    pub event: i32,
    pub kind: i32,
    options: [u8; 64],
}

impl Event {
    /// # Errors
    ///
    /// Returns `Err` if the options string is not valid utf8.
    pub fn options(&self) -> Result<&str> {
        fixed_str(&self.options).ok_or(Error::Corrupted {
            ty: FileType::Mdl,
            error: "event options are not valid utf8",
        })
    }
}

#[derive(Debug, PartialEq, FromBytes)]
#[repr(C)]
struct BodyPart {
    name: [u8; 64],
    model_count: i32,
    base: i32,
    model_offset: i32,
}

#[derive(Debug, PartialEq, FromBytes)]
#[repr(C)]
pub struct Model {
    name: [u8; 64],
    pub kind: i32,
    pub bounding_radius: f32,

    mesh_count: i32,
    mesh_offset: i32,

    vertex_count: i32,
    vertex_info_offset: i32,
    vertex_offset: i32,

    normal_count: i32,
    normal_info_offset: i32,
    normal_offset: i32,

    group_count: i32,
    group_offset: i32,
}

#[derive(Debug, PartialEq, FromBytes)]
#[repr(C)]
pub struct Mesh {
    pub triangle_count: i32,
    pub triangle_offset: i32,
    pub skin_reference: i32,
    pub normal_count: i32,
    pub normal_base: i32,
}

#[derive(Debug, PartialEq, FromBytes)]
#[repr(C)]
pub struct Texture {
    name: [u8; 64],
    flags: i32,
    pub width: i32,
    pub height: i32,
    pixel_offset: i32,
}

impl Texture {
    /// # Errors
    ///
    /// Returns `Err` if the name is not valid utf8.
    pub fn name(&self) -> Result<&str> {
        fixed_str(&self.name).ok_or(Error::Corrupted {
            ty: FileType::Mdl,
            error: "texture name is not valid utf8",
        })
    }

    pub fn flags(&self) -> TextureFlags {
        TextureFlags::from_bits_truncate(self.flags)
    }
}

#[derive(Debug, PartialEq, FromBytes)]
#[repr(C)]
pub struct Attachment {
    name: [u8; 32],
    pub kind: i32,
    pub bone_index: i32,
    pub origin: [f32; 3],
    pub vectors: [[f32; 3]; 3],
}

impl Attachment {
    /// # Errors
    ///
    /// Returns `Err` if the name is not valid utf8.
    pub fn name(&self) -> Result<&str> {
        fixed_str(&self.name).ok_or(Error::Corrupted {
            ty: FileType::Mdl,
            error: "attachment name is not valid utf8",
        })
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct HeaderFlags: i32 {
        const ROCKET_TRAIL = 1 << 0;
        const GRENADE_SMOKE = 1 << 1;
        const GIB_BLOOD = 1 << 2;
        const ROTATE = 1 << 3;
        const GREEN_TRAIL = 1 << 4;
        const ZOMBIE_BLOOD = 1 << 5;
        const ORANGE_TRAIL = 1 << 6;
        const PURPLE_TRAIL = 1 << 7;
        const NO_SHADE_LIGHT = 1 << 8;
        const HITBOX_COLLISIONS = 1 << 9;
        const FORCE_SKY_LIGHT = 1 << 10;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SequenceFlags: i32 {
        const LOOPING = 1 << 0;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureFlags: i32 {
        const FLAT_SHADE = 1 << 0;
        const CHROME = 1 << 1;
        const FULL_BRIGHT = 1 << 2;
        const NO_MIPS = 1 << 3;
        const ALPHA = 1 << 4;
        const ADDITIVE = 1 << 5;
        const MASKED = 1 << 6;
    }
}

/// Selects a body part's active model variant from the externally owned
/// bodygroup value. The result is always in `[0, model_count)`.
#[must_use]
pub fn selected_model_index(base: i32, model_count: i32, bodygroup: i32) -> usize {
    if model_count <= 1 || base <= 0 {
        return 0;
    }

    let index = (bodygroup / base).rem_euclid(model_count);
    index as usize
}

#[derive(Clone)]
pub struct Mdl {
    bytes: Vec<u8>,
}

impl Mdl {
    /// # Errors
    ///
    /// Returns `Err` if reading the file fails.
    pub fn read(file: std::fs::File) -> io::Result<Self> {
        let bytes = read_file_aligned::<A4>(file)?;
        Ok(Self { bytes })
    }

    #[cfg(test)]
    pub(crate) fn from_bytes(bytes: &[u8]) -> Self {
        let mut aligned = maligned::align_first::<u8, A4>(bytes.len());
        aligned.extend_from_slice(bytes);
        Self { bytes: aligned }
    }

    /// # Errors
    ///
    /// Returns `Err` if the signature is invalid. A sequence group file
    /// signature yields the distinguished [`Error::SequenceGroupFile`] so
    /// the caller can suggest loading the base model instead.
    pub fn check_signature(&self) -> Result<()> {
        let signature = self.bytes.get(0..4).ok_or(Error::Corrupted {
            ty: FileType::Mdl,
            error: "eof reading signature",
        })?;

        if signature == MDL_SIGNATURE {
            Ok(())
        } else if signature == SEQUENCE_GROUP_SIGNATURE {
            Err(Error::SequenceGroupFile)
        } else {
            Err(Error::InvalidSignature {
                ty: FileType::Mdl,
                signature: String::from_utf8_lossy(signature).into_owned(),
            })
        }
    }

    /// # Errors
    ///
    /// Returns `Err` if the version can't be read.
    pub fn version(&self) -> Result<i32> {
        if self.bytes.len() < 8 {
            return Err(Error::Corrupted {
                ty: FileType::Mdl,
                error: "eof reading version",
            });
        }
        Ok(i32::from_ne_bytes(self.bytes[4..8].try_into().unwrap()))
    }

    /// # Errors
    ///
    /// Returns `Err` if the version is unsupported.
    pub fn check_version(&self) -> Result<i32> {
        let version = self.version()?;

        if version == MDL_VERSION {
            Ok(version)
        } else {
            Err(Error::UnsupportedVersion {
                ty: FileType::Mdl,
                version,
            })
        }
    }

    /// # Errors
    ///
    /// Returns `Err` if the buffer is too short to hold the header.
    pub fn header(&self) -> Result<HeaderRef> {
        let header = parse(&self.bytes, 0).ok_or(Error::Corrupted {
            ty: FileType::Mdl,
            error: "eof reading header",
        })?;

        Ok(HeaderRef {
            header,
            bytes: &self.bytes,
        })
    }
}

impl fmt::Debug for Mdl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mdl").finish_non_exhaustive()
    }
}

/// A companion file holding animation data for sequences with
/// `sequence_group > 0`.
#[derive(Clone)]
pub struct SequenceGroupFile {
    bytes: Vec<u8>,
}

impl SequenceGroupFile {
    /// # Errors
    ///
    /// Returns `Err` if reading the file fails.
    pub fn read(file: std::fs::File) -> io::Result<Self> {
        let bytes = read_file_aligned::<A4>(file)?;
        Ok(Self { bytes })
    }

    #[cfg(test)]
    pub(crate) fn from_bytes(bytes: &[u8]) -> Self {
        let mut aligned = maligned::align_first::<u8, A4>(bytes.len());
        aligned.extend_from_slice(bytes);
        Self { bytes: aligned }
    }

    /// # Errors
    ///
    /// Returns `Err` if the signature is invalid.
    pub fn check_signature(&self) -> Result<()> {
        let signature = self.bytes.get(0..4).ok_or(Error::Corrupted {
            ty: FileType::SequenceGroup,
            error: "eof reading signature",
        })?;

        if signature == SEQUENCE_GROUP_SIGNATURE {
            Ok(())
        } else {
            Err(Error::InvalidSignature {
                ty: FileType::SequenceGroup,
                signature: String::from_utf8_lossy(signature).into_owned(),
            })
        }
    }

    /// # Errors
    ///
    /// Returns `Err` if the version can't be read.
    pub fn version(&self) -> Result<i32> {
        if self.bytes.len() < 8 {
            return Err(Error::Corrupted {
                ty: FileType::SequenceGroup,
                error: "eof reading version",
            });
        }
        Ok(i32::from_ne_bytes(self.bytes[4..8].try_into().unwrap()))
    }

    /// # Errors
    ///
    /// Returns `Err` if the version is unsupported.
    pub fn check_version(&self) -> Result<i32> {
        let version = self.version()?;

        if version == MDL_VERSION {
            Ok(version)
        } else {
            Err(Error::UnsupportedVersion {
                ty: FileType::SequenceGroup,
                version,
            })
        }
    }

    /// # Errors
    ///
    /// Returns `Err` if the name is invalid or the header is truncated.
    pub fn name(&self) -> Result<&str> {
        let header: &SequenceGroupHeader =
            parse(&self.bytes, 0).ok_or(Error::Corrupted {
                ty: FileType::SequenceGroup,
                error: "eof reading header",
            })?;

        fixed_str(&header.name).ok_or(Error::Corrupted {
            ty: FileType::SequenceGroup,
            error: "name is not valid utf8",
        })
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for SequenceGroupFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequenceGroupFile").finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HeaderRef<'a> {
    header: &'a Header,
    bytes: &'a [u8],
}

impl<'a> HeaderRef<'a> {
    /// # Errors
    ///
    /// Returns `Err` if the name is not valid utf8.
    pub fn name(&self) -> Result<&'a str> {
        fixed_str(&self.header.name).ok_or(Error::Corrupted {
            ty: FileType::Mdl,
            error: "header name is not valid utf8",
        })
    }

    pub fn flags(&self) -> HeaderFlags {
        HeaderFlags::from_bits_truncate(self.header.flags)
    }

    pub fn eye_position(&self) -> [f32; 3] {
        self.header.eye_position
    }

    pub fn hull(&self) -> ([f32; 3], [f32; 3]) {
        (self.header.hull_min, self.header.hull_max)
    }

    pub fn view_bounds(&self) -> ([f32; 3], [f32; 3]) {
        (self.header.view_bb_min, self.header.view_bb_max)
    }

    #[must_use]
    pub fn bone_count(&self) -> usize {
        self.header.bone_count.try_into().unwrap_or_default()
    }

    #[must_use]
    pub fn sequence_count(&self) -> usize {
        self.header.sequence_count.try_into().unwrap_or_default()
    }

    #[must_use]
    pub fn sequence_group_count(&self) -> usize {
        self.header
            .sequence_group_count
            .try_into()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn texture_count(&self) -> usize {
        self.header.texture_count.try_into().unwrap_or_default()
    }

    #[must_use]
    pub fn body_part_count(&self) -> usize {
        self.header.body_part_count.try_into().unwrap_or_default()
    }

    pub(crate) fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    fn array<T: FromBytes>(
        &self,
        offset: i32,
        count: i32,
        error: &'static str,
    ) -> Result<&'a [T]> {
        let offset: usize = offset.try_into().map_err(|_| Error::Corrupted {
            ty: FileType::Mdl,
            error,
        })?;
        let count: usize = count.try_into().map_err(|_| Error::Corrupted {
            ty: FileType::Mdl,
            error,
        })?;

        parse_slice(self.bytes, offset, count).ok_or(Error::Corrupted {
            ty: FileType::Mdl,
            error,
        })
    }

    /// # Errors
    ///
    /// Returns `Err` if the bone array is out of bounds.
    pub fn bones(&self) -> Result<&'a [Bone]> {
        self.array(
            self.header.bone_offset,
            self.header.bone_count,
            "bones out of bounds or misaligned",
        )
    }

    /// # Errors
    ///
    /// Returns `Err` if the bone controller array is out of bounds.
    pub fn bone_controllers(&self) -> Result<&'a [BoneController]> {
        self.array(
            self.header.bone_controller_offset,
            self.header.bone_controller_count,
            "bone controllers out of bounds or misaligned",
        )
    }

    /// # Errors
    ///
    /// Returns `Err` if the hitbox array is out of bounds.
    pub fn hit_boxes(&self) -> Result<&'a [HitBox]> {
        self.array(
            self.header.hit_box_offset,
            self.header.hit_box_count,
            "hitboxes out of bounds or misaligned",
        )
    }

    /// # Errors
    ///
    /// Returns `Err` if the attachment array is out of bounds.
    pub fn attachments(&self) -> Result<&'a [Attachment]> {
        self.array(
            self.header.attachment_offset,
            self.header.attachment_count,
            "attachments out of bounds or misaligned",
        )
    }

    /// # Errors
    ///
    /// Returns `Err` if the sequence group array is out of bounds.
    pub fn sequence_groups(&self) -> Result<&'a [SequenceGroup]> {
        self.array(
            self.header.sequence_group_offset,
            self.header.sequence_group_count,
            "sequence groups out of bounds or misaligned",
        )
    }

    /// # Errors
    ///
    /// Returns `Err` if the sequence array is out of bounds.
    pub fn iter_sequences(
        &self,
    ) -> Result<impl Iterator<Item = SequenceRef<'a>> + ExactSizeIterator> {
        let sequences: &[SequenceDesc] = self.array(
            self.header.sequence_offset,
            self.header.sequence_count,
            "sequences out of bounds or misaligned",
        )?;

        let bytes = self.bytes;

        Ok(sequences
            .iter()
            .map(move |sequence| SequenceRef { sequence, bytes }))
    }

    /// # Errors
    ///
    /// Returns `Err` if the sequence index or array is out of bounds.
    pub fn sequence(&self, index: usize) -> Result<SequenceRef<'a>> {
        self.iter_sequences()?
            .nth(index)
            .ok_or(Error::Corrupted {
                ty: FileType::Mdl,
                error: "sequence index out of bounds",
            })
    }

    /// # Errors
    ///
    /// Returns `Err` if the texture array is out of bounds.
    pub fn iter_textures(
        &self,
    ) -> Result<impl Iterator<Item = TextureRef<'a>> + ExactSizeIterator> {
        let textures: &[Texture] = self.array(
            self.header.texture_offset,
            self.header.texture_count,
            "textures out of bounds or misaligned",
        )?;

        let bytes = self.bytes;

        Ok(textures
            .iter()
            .map(move |texture| TextureRef { texture, bytes }))
    }

    /// # Errors
    ///
    /// Returns `Err` if the skin table is out of bounds.
    pub fn skin_table(&self) -> Result<SkinTable<'a>> {
        let reference_count: usize = self
            .header
            .skin_reference_count
            .try_into()
            .map_err(|_| Error::Corrupted {
                ty: FileType::Mdl,
                error: "skin reference count is negative",
            })?;
        let family_count: usize = self
            .header
            .skin_family_count
            .try_into()
            .map_err(|_| Error::Corrupted {
                ty: FileType::Mdl,
                error: "skin family count is negative",
            })?;
        let offset: usize = self
            .header
            .skin_offset
            .try_into()
            .map_err(|_| Error::Corrupted {
                ty: FileType::Mdl,
                error: "skin table offset is negative",
            })?;

        let entries = parse_slice(self.bytes, offset, family_count * reference_count).ok_or(
            Error::Corrupted {
                ty: FileType::Mdl,
                error: "skin table out of bounds",
            },
        )?;

        Ok(SkinTable {
            entries,
            reference_count,
            family_count,
        })
    }

    /// # Errors
    ///
    /// Returns `Err` if the body part array is out of bounds.
    pub fn iter_body_parts(
        &self,
    ) -> Result<impl Iterator<Item = BodyPartRef<'a>> + ExactSizeIterator> {
        let body_parts: &[BodyPart] = self.array(
            self.header.body_part_offset,
            self.header.body_part_count,
            "body parts out of bounds or misaligned",
        )?;

        let bytes = self.bytes;

        Ok(body_parts
            .iter()
            .map(move |body_part| BodyPartRef { body_part, bytes }))
    }
}

/// The skin family table remapping mesh skin references to texture indices.
#[derive(Debug, Clone, Copy)]
pub struct SkinTable<'a> {
    entries: &'a [I16<NativeEndian>],
    reference_count: usize,
    family_count: usize,
}

impl SkinTable<'_> {
    #[must_use]
    pub fn family_count(&self) -> usize {
        self.family_count
    }

    /// Resolves a mesh skin reference through the given family to a texture
    /// index. Out-of-range families fall back to family 0.
    #[must_use]
    pub fn resolve(&self, family: usize, reference: usize) -> Option<usize> {
        if reference >= self.reference_count {
            return None;
        }

        let family = if family < self.family_count { family } else { 0 };

        let entry = self.entries.get(family * self.reference_count + reference)?;
        entry.get().try_into().ok()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SequenceRef<'a> {
    sequence: &'a SequenceDesc,
    bytes: &'a [u8],
}

impl<'a> SequenceRef<'a> {
    /// # Errors
    ///
    /// Returns `Err` if the label is not valid utf8.
    pub fn label(&self) -> Result<&'a str> {
        fixed_str(&self.sequence.label).ok_or(Error::Corrupted {
            ty: FileType::Mdl,
            error: "sequence label is not valid utf8",
        })
    }

    /// # Errors
    ///
    /// Returns `Err` if the event array is out of bounds.
    pub fn events(&self) -> Result<&'a [Event]> {
        let offset: usize =
            self.sequence
                .event_offset
                .try_into()
                .map_err(|_| Error::Corrupted {
                    ty: FileType::Mdl,
                    error: "sequence event offset is negative",
                })?;
        let count: usize =
            self.sequence
                .event_count
                .try_into()
                .map_err(|_| Error::Corrupted {
                    ty: FileType::Mdl,
                    error: "sequence event count is negative",
                })?;

        parse_slice(self.bytes, offset, count).ok_or(Error::Corrupted {
            ty: FileType::Mdl,
            error: "sequence events out of bounds or misaligned",
        })
    }
}

impl Deref for SequenceRef<'_> {
    type Target = SequenceDesc;

    fn deref(&self) -> &Self::Target {
        self.sequence
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TextureRef<'a> {
    texture: &'a Texture,
    bytes: &'a [u8],
}

impl<'a> TextureRef<'a> {
    /// # Errors
    ///
    /// Returns `Err` if the name is not valid utf8.
    pub fn name(&self) -> Result<&'a str> {
        fixed_str(&self.texture.name).ok_or(Error::Corrupted {
            ty: FileType::Mdl,
            error: "texture name is not valid utf8",
        })
    }

    fn pixel_count(&self) -> Result<usize> {
        let width: usize = self
            .texture
            .width
            .try_into()
            .map_err(|_| Error::Corrupted {
                ty: FileType::Mdl,
                error: "texture width is negative",
            })?;
        let height: usize = self
            .texture
            .height
            .try_into()
            .map_err(|_| Error::Corrupted {
                ty: FileType::Mdl,
                error: "texture height is negative",
            })?;

        Ok(width * height)
    }

    /// The 8-bit palette indices, `width × height` bytes.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the pixel data is out of bounds.
    pub fn pixels(&self) -> Result<&'a [u8]> {
        let offset: usize = self
            .texture
            .pixel_offset
            .try_into()
            .map_err(|_| Error::Corrupted {
                ty: FileType::Mdl,
                error: "texture pixel offset is negative",
            })?;

        let count = self.pixel_count()?;

        self.bytes
            .get(offset..offset + count)
            .ok_or(Error::Corrupted {
                ty: FileType::Mdl,
                error: "texture pixels out of bounds",
            })
    }

    /// The 256-entry RGB palette immediately following the pixel block.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the palette is out of bounds.
    pub fn palette(&self) -> Result<&'a [u8]> {
        let offset: usize = self
            .texture
            .pixel_offset
            .try_into()
            .map_err(|_| Error::Corrupted {
                ty: FileType::Mdl,
                error: "texture pixel offset is negative",
            })?;

        let offset = offset + self.pixel_count()?;

        self.bytes
            .get(offset..offset + 256 * 3)
            .ok_or(Error::Corrupted {
                ty: FileType::Mdl,
                error: "texture palette out of bounds",
            })
    }
}

impl Deref for TextureRef<'_> {
    type Target = Texture;

    fn deref(&self) -> &Self::Target {
        self.texture
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BodyPartRef<'a> {
    body_part: &'a BodyPart,
    bytes: &'a [u8],
}

impl<'a> BodyPartRef<'a> {
    /// # Errors
    ///
    /// Returns `Err` if the name is not valid utf8.
    pub fn name(&self) -> Result<&'a str> {
        fixed_str(&self.body_part.name).ok_or(Error::Corrupted {
            ty: FileType::Mdl,
            error: "body part name is not valid utf8",
        })
    }

    #[must_use]
    pub fn model_count(&self) -> usize {
        self.body_part.model_count.try_into().unwrap_or_default()
    }

    fn models(&self) -> Result<&'a [Model]> {
        let offset: usize =
            self.body_part
                .model_offset
                .try_into()
                .map_err(|_| Error::Corrupted {
                    ty: FileType::Mdl,
                    error: "body part model offset is negative",
                })?;
        let count: usize =
            self.body_part
                .model_count
                .try_into()
                .map_err(|_| Error::Corrupted {
                    ty: FileType::Mdl,
                    error: "body part model count is negative",
                })?;

        parse_slice(self.bytes, offset, count).ok_or(Error::Corrupted {
            ty: FileType::Mdl,
            error: "body part models out of bounds or misaligned",
        })
    }

    /// # Errors
    ///
    /// Returns `Err` if the model array is out of bounds.
    pub fn iter_models(
        &self,
    ) -> Result<impl Iterator<Item = ModelRef<'a>> + ExactSizeIterator> {
        let models = self.models()?;
        let bytes = self.bytes;

        Ok(models.iter().map(move |model| ModelRef { model, bytes }))
    }

    /// The model variant selected by the externally owned bodygroup value.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the model array is out of bounds or empty.
    pub fn selected_model(&self, bodygroup: i32) -> Result<ModelRef<'a>> {
        let models = self.models()?;

        let index = selected_model_index(
            self.body_part.base,
            self.body_part.model_count,
            bodygroup,
        );

        models
            .get(index)
            .map(|model| ModelRef {
                model,
                bytes: self.bytes,
            })
            .ok_or(Error::Corrupted {
                ty: FileType::Mdl,
                error: "body part has no models",
            })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ModelRef<'a> {
    model: &'a Model,
    bytes: &'a [u8],
}

impl<'a> ModelRef<'a> {
    /// # Errors
    ///
    /// Returns `Err` if the name is not valid utf8.
    pub fn name(&self) -> Result<&'a str> {
        fixed_str(&self.model.name).ok_or(Error::Corrupted {
            ty: FileType::Mdl,
            error: "model name is not valid utf8",
        })
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.model.vertex_count.try_into().unwrap_or_default()
    }

    #[must_use]
    pub fn normal_count(&self) -> usize {
        self.model.normal_count.try_into().unwrap_or_default()
    }

    fn data_slice<T: FromBytes>(
        &self,
        offset: i32,
        count: i32,
        error: &'static str,
    ) -> Result<&'a [T]> {
        let offset: usize = offset.try_into().map_err(|_| Error::Corrupted {
            ty: FileType::Mdl,
            error,
        })?;
        let count: usize = count.try_into().map_err(|_| Error::Corrupted {
            ty: FileType::Mdl,
            error,
        })?;

        parse_slice(self.bytes, offset, count).ok_or(Error::Corrupted {
            ty: FileType::Mdl,
            error,
        })
    }

    /// Bind pose vertex positions.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the vertex array is out of bounds.
    pub fn vertices(&self) -> Result<&'a [[f32; 3]]> {
        self.data_slice(
            self.model.vertex_offset,
            self.model.vertex_count,
            "model vertices out of bounds or misaligned",
        )
    }

    /// Bind pose normals.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the normal array is out of bounds.
    pub fn normals(&self) -> Result<&'a [[f32; 3]]> {
        self.data_slice(
            self.model.normal_offset,
            self.model.normal_count,
            "model normals out of bounds or misaligned",
        )
    }

    /// The governing bone index of each vertex.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the array is out of bounds.
    pub fn vertex_bone_indices(&self) -> Result<&'a [u8]> {
        self.data_slice(
            self.model.vertex_info_offset,
            self.model.vertex_count,
            "model vertex bone indices out of bounds",
        )
    }

    /// The governing bone index of each normal.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the array is out of bounds.
    pub fn normal_bone_indices(&self) -> Result<&'a [u8]> {
        self.data_slice(
            self.model.normal_info_offset,
            self.model.normal_count,
            "model normal bone indices out of bounds",
        )
    }

    /// # Errors
    ///
    /// Returns `Err` if the mesh array is out of bounds.
    pub fn iter_meshes(
        &self,
    ) -> Result<impl Iterator<Item = MeshRef<'a>> + ExactSizeIterator> {
        let meshes: &[Mesh] = self.data_slice(
            self.model.mesh_offset,
            self.model.mesh_count,
            "model meshes out of bounds or misaligned",
        )?;

        let bytes = self.bytes;

        Ok(meshes.iter().map(move |mesh| MeshRef { mesh, bytes }))
    }
}

impl Deref for ModelRef<'_> {
    type Target = Model;

    fn deref(&self) -> &Self::Target {
        self.model
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MeshRef<'a> {
    mesh: &'a Mesh,
    bytes: &'a [u8],
}

impl<'a> MeshRef<'a> {
    pub(crate) fn bytes(&self) -> &'a [u8] {
        self.bytes
    }
}

impl Deref for MeshRef<'_> {
    type Target = Mesh;

    fn deref(&self) -> &Self::Target {
        self.mesh
    }
}
