#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod animation;
mod binary_utils;
mod mdl;
mod render;
mod tris;

#[cfg(test)]
mod test_utils;

use std::{
    fmt::{self, Display},
    fs::File,
    io,
    path::{Path, PathBuf},
    result,
};

use itertools::Itertools;
use thiserror::Error;
use tracing::warn;

pub use animation::{AnimationState, BonePose, SequenceInfo};
pub use mdl::{
    selected_model_index, Attachment, BodyPartRef, BoneController, Event, HeaderFlags, HeaderRef,
    HitBox, Mdl, Mesh, MeshRef, ModelRef, SequenceDesc, SequenceFlags, SequenceGroup,
    SequenceGroupFile, SequenceRef, SkinTable, Texture, TextureFlags, TextureRef, MDL_VERSION,
};
pub use render::{DrawRange, RenderData, RenderVertex};

#[derive(Debug, Clone, Error, Hash, PartialEq, Eq)]
pub enum Error {
    #[error("io error reading `{path}`: {error}")]
    Io { path: String, error: String },
    #[error("not a {ty} file: invalid signature `{signature}`")]
    InvalidSignature { ty: FileType, signature: String },
    #[error("this is a sequence group file: load the base model it belongs to instead")]
    SequenceGroupFile,
    #[error("unsupported {ty} version {version}, expected {MDL_VERSION}")]
    UnsupportedVersion { ty: FileType, version: i32 },
    #[error("{ty} corrupted: {error}")]
    Corrupted { ty: FileType, error: &'static str },
    #[error("sequence group {group} is not loaded")]
    MissingSequenceGroup { group: usize },
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum FileType {
    Mdl,
    SequenceGroup,
}

pub type Result<T> = result::Result<T, Error>;

impl Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FileType::Mdl => "mdl",
            FileType::SequenceGroup => "sequence group",
        })
    }
}

impl Error {
    fn from_io(err: &io::Error, path: &impl ToString) -> Self {
        Self::Io {
            path: path.to_string(),
            error: err.to_string(),
        }
    }
}

/// Texel dimensions used to keep UVs in range when a mesh's skin resolves
/// to no texture.
const UNTEXTURED_SIZE: i32 = 64;

fn companion_path(path: &Path, suffix: &str) -> PathBuf {
    let stem = path.file_stem().unwrap_or_default().to_string_lossy();
    path.with_file_name(format!("{stem}{suffix}.mdl"))
}

fn read_texture_companion(path: &Path) -> Option<Mdl> {
    let companion = companion_path(path, "t");

    let file = match File::open(&companion) {
        Ok(file) => file,
        Err(err) => {
            if err.kind() != io::ErrorKind::NotFound {
                warn!("texture file `{}`: {}", companion.display(), err);
            }
            return None;
        }
    };

    let result = Mdl::read(file)
        .map_err(|err| Error::from_io(&err, &companion.display()))
        .and_then(|mdl| {
            mdl.check_signature()?;
            mdl.check_version()?;
            mdl.header()?;
            Ok(mdl)
        });

    match result {
        Ok(mdl) => Some(mdl),
        Err(err) => {
            warn!("texture file `{}`: {}", companion.display(), err);
            None
        }
    }
}

fn read_sequence_group(path: &Path, group: usize) -> Option<SequenceGroupFile> {
    let companion = companion_path(path, &format!("{group:02}"));

    let result = File::open(&companion)
        .and_then(SequenceGroupFile::read)
        .map_err(|err| Error::from_io(&err, &companion.display()))
        .and_then(|file| {
            file.check_signature()?;
            file.check_version()?;
            Ok(file)
        });

    match result {
        Ok(file) => Some(file),
        Err(err) => {
            warn!(
                "sequence group {}: `{}`: {}, sequences using it will hold their bind pose",
                group,
                companion.display(),
                err
            );
            None
        }
    }
}

/// A loaded model: the main file buffer plus any companion texture and
/// sequence group files found next to it.
#[derive(Debug, Clone)]
pub struct Model {
    mdl: Mdl,
    texture_mdl: Option<Mdl>,
    sequence_groups: Vec<Option<SequenceGroupFile>>,
}

impl Model {
    /// Reads the model and eagerly loads its companion files. Missing or
    /// invalid companions degrade the model (untextured rendering, bind
    /// pose for demand loaded sequences) instead of failing the load.
    ///
    /// # Errors
    ///
    /// Returns `Err` if reading the main file fails, its signature or
    /// version is invalid, or its header is truncated.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let file = File::open(path).map_err(|err| Error::from_io(&err, &path.display()))?;
        let mdl = Mdl::read(file).map_err(|err| Error::from_io(&err, &path.display()))?;

        mdl.check_signature()?;
        mdl.check_version()?;
        let header = mdl.header()?;

        let texture_mdl = if header.texture_count() == 0 {
            read_texture_companion(path)
        } else {
            None
        };

        let sequence_groups = (1..header.sequence_group_count())
            .map(|group| read_sequence_group(path, group))
            .collect();

        Ok(Self {
            mdl,
            texture_mdl,
            sequence_groups,
        })
    }

    #[cfg(test)]
    pub(crate) fn from_parts(
        mdl: Mdl,
        texture_mdl: Option<Mdl>,
        sequence_groups: Vec<Option<SequenceGroupFile>>,
    ) -> Self {
        Self {
            mdl,
            texture_mdl,
            sequence_groups,
        }
    }

    /// # Errors
    ///
    /// Returns `Err` if a signature or header is invalid or a version is
    /// unsupported.
    pub fn verify(&self) -> Result<Verified> {
        self.mdl.check_signature()?;
        self.mdl.check_version()?;
        let mdl_header = self.mdl.header()?;

        let texture_header = match &self.texture_mdl {
            Some(texture_mdl) => {
                texture_mdl.check_signature()?;
                texture_mdl.check_version()?;
                Some(texture_mdl.header()?)
            }
            None => None,
        };

        let sequence_groups = self
            .sequence_groups
            .iter()
            .map(|group| group.as_ref().map(SequenceGroupFile::bytes))
            .collect();

        Ok(Verified {
            mdl_header,
            texture_header,
            sequence_groups,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Verified<'a> {
    mdl_header: HeaderRef<'a>,
    texture_header: Option<HeaderRef<'a>>,
    sequence_groups: Vec<Option<&'a [u8]>>,
}

impl<'a> Verified<'a> {
    /// # Errors
    ///
    /// Returns `Err` if reading the name fails.
    pub fn name(&self) -> Result<&'a str> {
        self.mdl_header.name()
    }

    #[must_use]
    pub fn header(&self) -> HeaderRef<'a> {
        self.mdl_header
    }

    /// # Errors
    ///
    /// Returns `Err` if reading the bones fails due to a corrupted mdl.
    pub fn bones(&self) -> Result<Vec<Bone<'a>>> {
        self.mdl_header
            .bones()?
            .iter()
            .map(|bone| {
                Ok(Bone {
                    name: bone.name()?,
                    parent_bone_index: bone.parent_bone_index.try_into().ok(),
                    position: bone.position,
                    rotation: bone.rotation,
                    position_scale: bone.position_scale,
                    rotation_scale: bone.rotation_scale,
                })
            })
            .try_collect()
    }

    /// # Errors
    ///
    /// Returns `Err` if reading the sequences fails due to a corrupted mdl.
    pub fn sequences(&self) -> Result<Vec<Sequence<'a>>> {
        self.mdl_header
            .iter_sequences()?
            .map(|sequence| {
                Ok(Sequence {
                    label: sequence.label()?,
                    fps: sequence.fps,
                    flags: sequence.flags(),
                    frame_count: sequence.frame_count,
                    sequence_group: sequence.sequence_group.try_into().unwrap_or_default(),
                })
            })
            .try_collect()
    }

    /// Playback parameters for [`AnimationState::set_sequence`].
    ///
    /// # Errors
    ///
    /// Returns `Err` if the sequence index is out of bounds.
    pub fn sequence_info(&self, sequence: usize) -> Result<SequenceInfo> {
        let sequence = self.mdl_header.sequence(sequence)?;

        Ok(SequenceInfo {
            fps: sequence.fps,
            frame_count: sequence.frame_count,
            looping: sequence.flags().contains(SequenceFlags::LOOPING),
        })
    }

    /// The texture list, from the main file or the companion texture file.
    /// Empty when neither holds textures.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the texture array is out of bounds.
    pub fn textures(&self) -> Result<Vec<TextureRef<'a>>> {
        let source = if self.mdl_header.texture_count() > 0 {
            Some(self.mdl_header)
        } else {
            self.texture_header
        };

        match source {
            Some(header) => Ok(header.iter_textures()?.collect()),
            None => Ok(Vec::new()),
        }
    }

    fn bone_animations(
        &self,
        sequence: &SequenceRef<'a>,
    ) -> Result<Vec<animation::BoneAnimation<'a>>> {
        let group: usize =
            sequence
                .sequence_group
                .try_into()
                .map_err(|_| Error::Corrupted {
                    ty: FileType::Mdl,
                    error: "sequence group index is negative",
                })?;

        let bone_count = self.mdl_header.bone_count();

        if group == 0 {
            animation::bone_animations(
                self.mdl_header.bytes(),
                sequence.anim_offset(),
                bone_count,
                FileType::Mdl,
            )
        } else {
            let data = self
                .sequence_groups
                .get(group - 1)
                .copied()
                .flatten()
                .ok_or(Error::MissingSequenceGroup { group })?;

            animation::bone_animations(
                data,
                sequence.anim_offset(),
                bone_count,
                FileType::SequenceGroup,
            )
        }
    }

    /// # Errors
    ///
    /// Returns `Err` if reading the bones or animation data fails.
    pub fn compute_pose(&self, state: &AnimationState) -> Result<BonePose> {
        let mut pose = BonePose::new();
        self.compute_pose_into(state, &mut pose)?;
        Ok(pose)
    }

    /// Recomputes the pose for the state's current frame into a reusable
    /// buffer. An idle state or a sequence whose group file is missing
    /// yields the bind pose.
    ///
    /// # Errors
    ///
    /// Returns `Err` if reading the bones or animation data fails.
    pub fn compute_pose_into(&self, state: &AnimationState, pose: &mut BonePose) -> Result<()> {
        let bones = self.mdl_header.bones()?;

        let Some(sequence_index) = state.sequence() else {
            animation::compute_pose_into(bones, None, 0.0, pose);
            return Ok(());
        };

        let sequence = self.mdl_header.sequence(sequence_index)?;

        match self.bone_animations(&sequence) {
            Ok(animations) => {
                animation::compute_pose_into(bones, Some(animations.as_slice()), state.frame(), pose);
            }
            Err(err @ Error::MissingSequenceGroup { .. }) => {
                warn!(
                    "sequence `{}`: {}, holding bind pose",
                    sequence.label().unwrap_or(""),
                    err
                );
                animation::compute_pose_into(bones, None, 0.0, pose);
            }
            Err(err) => return Err(err),
        }

        Ok(())
    }

    /// # Errors
    ///
    /// Returns `Err` if the model structure is corrupted.
    pub fn render_data(
        &self,
        pose: &BonePose,
        bodygroup: i32,
        skin_family: usize,
    ) -> Result<RenderData> {
        let mut data = RenderData::new();
        self.render_data_into(pose, bodygroup, skin_family, &mut data)?;
        Ok(data)
    }

    /// Skins the bodygroup-selected model of every body part and expands
    /// its meshes into a flat vertex buffer with one draw range per mesh.
    /// The output buffers are cleared and refilled, so a per-frame caller
    /// can reuse them.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the model structure is corrupted.
    pub fn render_data_into(
        &self,
        pose: &BonePose,
        bodygroup: i32,
        skin_family: usize,
        data: &mut RenderData,
    ) -> Result<()> {
        data.clear();

        let textures = self.textures()?;
        let skin_table = self.mdl_header.skin_table()?;

        let mut skinned_positions = Vec::new();
        let mut skinned_normals = Vec::new();

        for body_part in self.mdl_header.iter_body_parts()? {
            let model = body_part.selected_model(bodygroup)?;

            render::skin_positions(
                model.vertices()?,
                model.vertex_bone_indices()?,
                pose,
                &mut skinned_positions,
            );
            render::skin_normals(
                model.normals()?,
                model.normal_bone_indices()?,
                pose,
                &mut skinned_normals,
            );

            for mesh in model.iter_meshes()? {
                let texture_index =
                    resolve_texture(&skin_table, &textures, skin_family, mesh.skin_reference);

                let (texture_width, texture_height) = texture_index
                    .map_or((UNTEXTURED_SIZE, UNTEXTURED_SIZE), |index| {
                        (textures[index].width, textures[index].height)
                    });

                let normal_base: usize =
                    mesh.normal_base.try_into().map_err(|_| Error::Corrupted {
                        ty: FileType::Mdl,
                        error: "mesh normal base is negative",
                    })?;
                let triangle_offset: usize =
                    mesh.triangle_offset
                        .try_into()
                        .map_err(|_| Error::Corrupted {
                            ty: FileType::Mdl,
                            error: "mesh triangle command offset is negative",
                        })?;

                let limits = tris::Limits {
                    vertex_count: model.vertex_count(),
                    normal_count: model.normal_count(),
                    normal_base,
                    texture_width,
                    texture_height,
                };

                let first_vertex = data.vertices.len();

                for triangle in tris::expand(mesh.bytes(), triangle_offset, &limits)? {
                    for vertex in triangle {
                        data.vertices.push(RenderVertex {
                            position: render::remap_axes(skinned_positions[vertex.vertex_index]),
                            normal: render::remap_axes(skinned_normals[vertex.normal_index]),
                            uv: vertex.uv,
                        });
                    }
                }

                data.ranges.push(DrawRange {
                    texture_index,
                    first_vertex,
                    vertex_count: data.vertices.len() - first_vertex,
                });
            }
        }

        Ok(())
    }
}

fn resolve_texture(
    skin_table: &SkinTable,
    textures: &[TextureRef],
    skin_family: usize,
    skin_reference: i32,
) -> Option<usize> {
    let reference: usize = skin_reference.try_into().ok()?;

    match skin_table.resolve(skin_family, reference) {
        Some(index) if index < textures.len() => Some(index),
        Some(_) => {
            warn!("skin table entry points to a missing texture, drawing untextured");
            None
        }
        None if reference < textures.len() => Some(reference),
        None => None,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Bone<'a> {
    pub name: &'a str,
    pub parent_bone_index: Option<usize>,
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub position_scale: [f32; 3],
    pub rotation_scale: [f32; 3],
}

#[derive(Debug, Clone, Copy)]
pub struct Sequence<'a> {
    pub label: &'a str,
    pub fps: f32,
    pub flags: SequenceFlags,
    pub frame_count: i32,
    pub sequence_group: usize,
}
