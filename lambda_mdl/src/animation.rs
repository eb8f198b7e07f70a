use std::mem::size_of;

use byteorder::NativeEndian;
use glam::{EulerRot, Mat4, Quat, Vec3};
use tracing::warn;
use zerocopy::{byteorder::U16, FromBytes, Unaligned};

use super::binary_utils::{parse, parse_slice};
use super::mdl::Bone;
use super::{Error, FileType, Result};

/// One 2-byte cell of a compressed animation value stream: either a span
/// header packing `{valid, total}` counts or a raw delta value.
#[derive(Debug, Clone, Copy, FromBytes, Unaligned)]
#[repr(C)]
struct AnimValue {
    bytes: [u8; 2],
}

impl AnimValue {
    fn valid(self) -> i32 {
        i32::from(self.bytes[0])
    }

    fn total(self) -> i32 {
        i32::from(self.bytes[1])
    }

    fn value(self) -> i16 {
        i16::from_le_bytes(self.bytes)
    }
}

/// Per-bone channel offsets into the animation value streams, relative to
/// the record's own position. 0 marks an unanimated channel.
#[derive(Debug, Clone, FromBytes, Unaligned)]
#[repr(C)]
struct AnimationOffsets {
    offsets: [U16<NativeEndian>; 6],
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct BoneAnimation<'a> {
    record_offset: usize,
    offsets: [u16; 6],
    bytes: &'a [u8],
}

impl<'a> BoneAnimation<'a> {
    fn channel(&self, channel: usize) -> Option<AnimValues<'a>> {
        let offset = self.offsets[channel];
        if offset == 0 {
            return None;
        }

        Some(AnimValues {
            bytes: self.bytes,
            offset: self.record_offset + usize::from(offset),
        })
    }
}

struct AnimValues<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl AnimValues<'_> {
    fn cell(&self, index: usize) -> Option<AnimValue> {
        parse::<AnimValue>(self.bytes, self.offset + index * size_of::<AnimValue>()).copied()
    }

    /// The values at `frame` and `frame + 1`, holding the last known value
    /// at span and stream boundaries instead of reading out of bounds.
    fn frame_pair(&self, frame: i32) -> Option<(i16, i16)> {
        let mut k = frame.max(0);
        let mut cell = 0_usize;

        loop {
            let span = self.cell(cell)?;
            let valid = span.valid();
            let total = span.total();

            if total == 0 {
                // a zero-length span would never advance the walk
                return None;
            }

            if total > k {
                #[allow(clippy::cast_sign_loss)]
                let value_1 = if valid > k {
                    self.cell(cell + 1 + k as usize)?.value()
                } else {
                    self.cell(cell + valid as usize)?.value()
                };

                #[allow(clippy::cast_sign_loss)]
                let value_2 = if valid > k + 1 {
                    self.cell(cell + 2 + k as usize)?.value()
                } else if total > k + 1 {
                    value_1
                } else {
                    self.cell(cell + valid as usize + 2)
                        .map_or(value_1, AnimValue::value)
                };

                return Some((value_1, value_2));
            }

            k -= total;
            #[allow(clippy::cast_sign_loss)]
            {
                cell += valid as usize + 1;
            }
        }
    }
}

/// Parses the per-bone animation records of a sequence. `data` is the main
/// buffer for embedded sequences or the companion file's buffer for demand
/// loaded ones; `anim_offset` is relative to it either way.
pub(crate) fn bone_animations(
    data: &[u8],
    anim_offset: i32,
    bone_count: usize,
    ty: FileType,
) -> Result<Vec<BoneAnimation>> {
    let offset: usize = anim_offset.try_into().map_err(|_| Error::Corrupted {
        ty: ty.clone(),
        error: "sequence animation offset is negative",
    })?;

    let records: &[AnimationOffsets] =
        parse_slice(data, offset, bone_count).ok_or(Error::Corrupted {
            ty,
            error: "sequence animation data out of bounds",
        })?;

    Ok(records
        .iter()
        .enumerate()
        .map(|(i, record)| BoneAnimation {
            record_offset: offset + i * size_of::<AnimationOffsets>(),
            offsets: record.offsets.map(|offset| offset.get()),
            bytes: data,
        })
        .collect())
}

/// Converts the model's local euler angles to a quaternion using the
/// engine's intrinsic yaw (Z), pitch (Y), roll (X) composition order.
fn angles_to_quat(angles: [f32; 3]) -> Quat {
    Quat::from_euler(EulerRot::ZYX, angles[2], angles[1], angles[0])
}

fn bone_rotation(frame: i32, s: f32, bone: &Bone, animation: Option<&BoneAnimation>) -> Quat {
    let mut angles_1 = bone.rotation;
    let mut angles_2 = bone.rotation;

    if let Some(animation) = animation {
        for channel in 0..3 {
            if let Some(values) = animation.channel(3 + channel) {
                if let Some((value_1, value_2)) = values.frame_pair(frame) {
                    angles_1[channel] = bone.rotation[channel]
                        + f32::from(value_1) * bone.rotation_scale[channel];
                    angles_2[channel] = bone.rotation[channel]
                        + f32::from(value_2) * bone.rotation_scale[channel];
                } else {
                    warn!("bone rotation animation is corrupted, holding bind pose");
                }
            }
        }
    }

    if angles_1 == angles_2 {
        angles_to_quat(angles_1)
    } else {
        angles_to_quat(angles_1).slerp(angles_to_quat(angles_2), s)
    }
}

fn bone_position(frame: i32, s: f32, bone: &Bone, animation: Option<&BoneAnimation>) -> Vec3 {
    let mut position = bone.position;

    if let Some(animation) = animation {
        for channel in 0..3 {
            if let Some(values) = animation.channel(channel) {
                if let Some((value_1, value_2)) = values.frame_pair(frame) {
                    position[channel] += (f32::from(value_1) * (1.0 - s)
                        + f32::from(value_2) * s)
                        * bone.position_scale[channel];
                } else {
                    warn!("bone position animation is corrupted, holding bind pose");
                }
            }
        }
    }

    Vec3::from(position)
}

/// Playback parameters of a sequence, copied out of its descriptor.
#[derive(Debug, Clone, Copy)]
pub struct SequenceInfo {
    pub fps: f32,
    pub frame_count: i32,
    pub looping: bool,
}

/// Externally owned playback state, advanced by elapsed time each tick.
#[derive(Debug, Clone, Default)]
pub struct AnimationState {
    playing: Option<Playing>,
}

#[derive(Debug, Clone, Copy)]
struct Playing {
    sequence: usize,
    frame: f32,
    info: SequenceInfo,
}

impl AnimationState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts playing the given sequence from frame 0.
    pub fn set_sequence(&mut self, sequence: usize, info: SequenceInfo) {
        self.playing = Some(Playing {
            sequence,
            frame: 0.0,
            info,
        });
    }

    /// Advances the current frame by elapsed time. Looping sequences wrap,
    /// others clamp to their last frame.
    pub fn advance(&mut self, delta_time: f32) {
        let Some(playing) = &mut self.playing else {
            return;
        };

        let info = playing.info;

        if info.frame_count <= 1 || info.fps <= 0.0 {
            playing.frame = 0.0;
            return;
        }

        // huge deltas from frame drops would skip most of the sequence
        let delta_time = delta_time.clamp(0.0, 2.0 / info.fps);

        playing.frame += delta_time * info.fps;

        #[allow(clippy::cast_precision_loss)]
        let frames = info.frame_count as f32;

        if playing.frame >= frames {
            if info.looping {
                playing.frame %= frames;
            } else {
                playing.frame = frames - 1.0;
            }
        }
    }

    #[must_use]
    pub fn sequence(&self) -> Option<usize> {
        self.playing.map(|playing| playing.sequence)
    }

    #[must_use]
    pub fn frame(&self) -> f32 {
        self.playing.map_or(0.0, |playing| playing.frame)
    }
}

/// Bone-to-model transforms for one frame, recomputed every tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BonePose {
    transforms: Vec<Mat4>,
}

impl BonePose {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn transforms(&self) -> &[Mat4] {
        &self.transforms
    }
}

/// Evaluates every bone at the given fractional frame and concatenates the
/// local transforms into bone-to-model space, relying on the file's
/// parent-before-child bone order. `None` animations yield the bind pose.
pub(crate) fn compute_pose_into(
    bones: &[Bone],
    animations: Option<&[BoneAnimation]>,
    frame: f32,
    pose: &mut BonePose,
) {
    #[allow(clippy::cast_possible_truncation)]
    let frame_index = frame.floor() as i32;
    let s = frame.fract();

    pose.transforms.clear();
    pose.transforms.reserve(bones.len());

    for (i, bone) in bones.iter().enumerate() {
        let animation = animations.and_then(|animations| animations.get(i));

        let rotation = bone_rotation(frame_index, s, bone, animation);
        let position = bone_position(frame_index, s, bone, animation);

        let local = Mat4::from_rotation_translation(rotation, position);

        let world = match usize::try_from(bone.parent_bone_index) {
            Err(_) => local,
            Ok(parent) if parent < i => pose.transforms[parent] * local,
            Ok(parent) => {
                warn!("bone {} has out of order parent {}, treating as root", i, parent);
                local
            }
        };

        pose.transforms.push(world);
    }
}
