//! Synthetic studio model files for tests, built section by section with
//! back-patched header offsets.

#![allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]

use crate::mdl::Mdl;

pub(crate) const HEADER_SIZE: usize = 244;

#[derive(Debug, Clone)]
pub(crate) struct TestBone {
    pub name: &'static str,
    pub parent: i32,
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub position_scale: [f32; 3],
    pub rotation_scale: [f32; 3],
}

impl Default for TestBone {
    fn default() -> Self {
        Self {
            name: "bone",
            parent: -1,
            position: [0.0; 3],
            rotation: [0.0; 3],
            position_scale: [1.0; 3],
            rotation_scale: [1.0; 3],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct AnimSpan {
    pub valid: u8,
    pub total: u8,
    pub values: Vec<i16>,
}

/// Per-bone animation channels: X, Y, Z position then X, Y, Z rotation.
pub(crate) type BoneChannels = [Option<Vec<AnimSpan>>; 6];

/// All-bind-pose channels for `bone_count` bones.
pub(crate) fn still_channels(bone_count: usize) -> Vec<BoneChannels> {
    (0..bone_count).map(|_| BoneChannels::default()).collect()
}

#[derive(Debug, Clone)]
pub(crate) struct TestSequence {
    pub label: &'static str,
    pub fps: f32,
    pub flags: i32,
    pub frame_count: i32,
    pub sequence_group: i32,
    /// One entry per bone. Embedded in the main file for group 0.
    pub channels: Vec<BoneChannels>,
    /// Offset into the companion file for sequences with group > 0.
    pub anim_offset: Option<i32>,
}

impl Default for TestSequence {
    fn default() -> Self {
        Self {
            label: "idle",
            fps: 10.0,
            flags: 0,
            frame_count: 1,
            sequence_group: 0,
            channels: Vec::new(),
            anim_offset: None,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct TestTexture {
    pub name: &'static str,
    pub flags: i32,
    pub width: i32,
    pub height: i32,
}

impl Default for TestTexture {
    fn default() -> Self {
        Self {
            name: "texture.bmp",
            flags: 0,
            width: 64,
            height: 64,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct TestMesh {
    pub skin_reference: i32,
    pub normal_base: i32,
    /// Raw command stream cells including the terminating zero.
    pub commands: Vec<i16>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct TestModel {
    pub name: &'static str,
    pub vertices: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    /// Defaults to bone 0 for every vertex when empty.
    pub vertex_bones: Vec<u8>,
    /// Defaults to bone 0 for every normal when empty.
    pub normal_bones: Vec<u8>,
    pub meshes: Vec<TestMesh>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct TestBodyPart {
    pub name: &'static str,
    pub base: i32,
    pub models: Vec<TestModel>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct TestMdl {
    pub name: &'static str,
    pub bones: Vec<TestBone>,
    pub sequences: Vec<TestSequence>,
    pub sequence_group_labels: Vec<&'static str>,
    pub textures: Vec<TestTexture>,
    pub skin_reference_count: i32,
    /// Family-major table, `skin_reference_count` entries per family.
    pub skin_table: Vec<i16>,
    pub body_parts: Vec<TestBodyPart>,
}

struct Writer {
    bytes: Vec<u8>,
}

impl Writer {
    fn new() -> Self {
        Self {
            bytes: vec![0; HEADER_SIZE],
        }
    }

    fn pos(&self) -> usize {
        self.bytes.len()
    }

    fn align2(&mut self) {
        if self.bytes.len() % 2 != 0 {
            self.bytes.push(0);
        }
    }

    fn align4(&mut self) {
        while self.bytes.len() % 4 != 0 {
            self.bytes.push(0);
        }
    }

    fn u8(&mut self, v: u8) {
        self.bytes.push(v);
    }

    fn i16(&mut self, v: i16) {
        self.bytes.extend_from_slice(&v.to_le_bytes());
    }

    fn i32(&mut self, v: i32) {
        self.bytes.extend_from_slice(&v.to_le_bytes());
    }

    fn f32(&mut self, v: f32) {
        self.bytes.extend_from_slice(&v.to_le_bytes());
    }

    fn vec3(&mut self, v: [f32; 3]) {
        for component in v {
            self.f32(component);
        }
    }

    fn name(&mut self, s: &str, len: usize) {
        let mut field = vec![0; len];
        field[..s.len()].copy_from_slice(s.as_bytes());
        self.bytes.extend_from_slice(&field);
    }

    fn patch_i32(&mut self, offset: usize, v: i32) {
        self.bytes[offset..offset + 4].copy_from_slice(&v.to_le_bytes());
    }
}

/// Encodes per-bone channel offset records followed by their value streams,
/// with each channel offset relative to its own record.
fn encode_animation_block(channels: &[BoneChannels]) -> Vec<u8> {
    const RECORD_SIZE: usize = 12;

    let mut block = vec![0_u8; channels.len() * RECORD_SIZE];

    for (bone, bone_channels) in channels.iter().enumerate() {
        for (channel, spans) in bone_channels.iter().enumerate() {
            let Some(spans) = spans else {
                continue;
            };

            let record_pos = bone * RECORD_SIZE;
            let relative = (block.len() - record_pos) as u16;

            let offset_pos = record_pos + channel * 2;
            block[offset_pos..offset_pos + 2].copy_from_slice(&relative.to_le_bytes());

            for span in spans {
                block.push(span.valid);
                block.push(span.total);
                for &value in &span.values {
                    block.extend_from_slice(&value.to_le_bytes());
                }
            }
        }
    }

    block
}

/// Builds a companion sequence group file holding one animation block;
/// returns the bytes and the block's offset for the referencing sequence.
pub(crate) fn build_sequence_group_file(channels: &[BoneChannels]) -> (Vec<u8>, i32) {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"IDSQ");
    bytes.extend_from_slice(&10_i32.to_le_bytes());
    bytes.extend_from_slice(&[0; 64]);
    bytes.extend_from_slice(&0_i32.to_le_bytes());

    let anim_offset = bytes.len() as i32;
    bytes.extend_from_slice(&encode_animation_block(channels));

    let length = bytes.len() as i32;
    bytes[72..76].copy_from_slice(&length.to_le_bytes());

    (bytes, anim_offset)
}

impl TestMdl {
    pub(crate) fn build_mdl(&self) -> Mdl {
        Mdl::from_bytes(&self.build())
    }

    pub(crate) fn build(&self) -> Vec<u8> {
        let mut w = Writer::new();

        // bones
        let bone_offset = w.pos();
        for bone in &self.bones {
            w.name(bone.name, 32);
            w.i32(bone.parent);
            w.i32(0); // flags
            for _ in 0..6 {
                w.i32(-1); // bone controllers
            }
            w.vec3(bone.position);
            w.vec3(bone.rotation);
            w.vec3(bone.position_scale);
            w.vec3(bone.rotation_scale);
        }

        // embedded animation blocks, then the sequence descriptors
        let mut anim_offsets = Vec::new();
        for sequence in &self.sequences {
            if sequence.sequence_group == 0 && !sequence.channels.is_empty() {
                w.align4();
                let pos = w.pos() as i32;
                let block = encode_animation_block(&sequence.channels);
                w.bytes.extend_from_slice(&block);
                anim_offsets.push(pos);
            } else {
                anim_offsets.push(sequence.anim_offset.unwrap_or_default());
            }
        }

        w.align4();
        let sequence_offset = w.pos();
        for (sequence, &anim_offset) in self.sequences.iter().zip(&anim_offsets) {
            w.name(sequence.label, 32);
            w.f32(sequence.fps);
            w.i32(sequence.flags);
            w.i32(0); // activity
            w.i32(0); // activity weight
            w.i32(0); // event count
            w.i32(0); // event offset
            w.i32(sequence.frame_count);
            w.i32(0); // pivot count
            w.i32(0); // pivot offset
            w.i32(0); // motion type
            w.i32(0); // motion bone
            w.vec3([0.0; 3]); // linear movement
            w.i32(0); // automove position offset
            w.i32(0); // automove angle offset
            w.vec3([0.0; 3]); // bb min
            w.vec3([0.0; 3]); // bb max
            w.i32(1); // blend count
            w.i32(anim_offset);
            w.i32(0); // blend type x
            w.i32(0); // blend type y
            w.f32(0.0); // blend start x
            w.f32(0.0); // blend start y
            w.f32(0.0); // blend end x
            w.f32(0.0); // blend end y
            w.i32(0); // blend parent
            w.i32(sequence.sequence_group);
            w.i32(0); // entry node
            w.i32(0); // exit node
            w.i32(0); // node flags
            w.i32(0); // next sequence
        }

        let sequence_group_offset = w.pos();
        for label in &self.sequence_group_labels {
            w.name(label, 32);
            w.name("", 64);
            w.i32(0);
            w.i32(0);
        }

        // texture records, then pixels and palettes
        let texture_offset = w.pos();
        let mut pixel_patches = Vec::new();
        for texture in &self.textures {
            w.name(texture.name, 64);
            w.i32(texture.flags);
            w.i32(texture.width);
            w.i32(texture.height);
            pixel_patches.push(w.pos());
            w.i32(0);
        }
        let texture_data_offset = w.pos();
        for (texture, patch) in self.textures.iter().zip(pixel_patches) {
            let pos = w.pos() as i32;
            w.patch_i32(patch, pos);
            for i in 0..texture.width * texture.height {
                w.u8(i as u8);
            }
            for i in 0..256 * 3 {
                w.u8(i as u8);
            }
        }

        w.align2();
        let skin_offset = w.pos();
        for &entry in &self.skin_table {
            w.i16(entry);
        }
        let skin_family_count = if self.skin_reference_count > 0 {
            self.skin_table.len() as i32 / self.skin_reference_count
        } else {
            0
        };

        // body parts, then their nested model records and data
        w.align4();
        let body_part_offset = w.pos();
        let mut model_patches = Vec::new();
        for body_part in &self.body_parts {
            w.name(body_part.name, 64);
            w.i32(body_part.models.len() as i32);
            w.i32(body_part.base);
            model_patches.push(w.pos());
            w.i32(0);
        }

        for (body_part, model_patch) in self.body_parts.iter().zip(model_patches) {
            w.align4();
            let pos = w.pos() as i32;
            w.patch_i32(model_patch, pos);

            let mut data_patches = Vec::new();
            for model in &body_part.models {
                w.name(model.name, 64);
                w.i32(0); // type
                w.f32(0.0); // bounding radius
                w.i32(model.meshes.len() as i32);
                let mesh_patch = w.pos();
                w.i32(0);
                w.i32(model.vertices.len() as i32);
                let vertex_info_patch = w.pos();
                w.i32(0);
                let vertex_patch = w.pos();
                w.i32(0);
                w.i32(model.normals.len() as i32);
                let normal_info_patch = w.pos();
                w.i32(0);
                let normal_patch = w.pos();
                w.i32(0);
                w.i32(0); // group count
                w.i32(0); // group offset
                data_patches.push((
                    mesh_patch,
                    vertex_info_patch,
                    vertex_patch,
                    normal_info_patch,
                    normal_patch,
                ));
            }

            for (model, patches) in body_part.models.iter().zip(data_patches) {
                let (mesh_patch, vertex_info_patch, vertex_patch, normal_info_patch, normal_patch) =
                    patches;

                let pos = w.pos() as i32;
                w.patch_i32(vertex_info_patch, pos);
                for i in 0..model.vertices.len() {
                    w.u8(model.vertex_bones.get(i).copied().unwrap_or_default());
                }

                let pos = w.pos() as i32;
                w.patch_i32(normal_info_patch, pos);
                for i in 0..model.normals.len() {
                    w.u8(model.normal_bones.get(i).copied().unwrap_or_default());
                }

                w.align4();
                let pos = w.pos() as i32;
                w.patch_i32(vertex_patch, pos);
                for &vertex in &model.vertices {
                    w.vec3(vertex);
                }

                let pos = w.pos() as i32;
                w.patch_i32(normal_patch, pos);
                for &normal in &model.normals {
                    w.vec3(normal);
                }

                let pos = w.pos() as i32;
                w.patch_i32(mesh_patch, pos);
                let mut command_patches = Vec::new();
                for mesh in &model.meshes {
                    w.i32(0); // triangle count, unused by the decoder
                    command_patches.push(w.pos());
                    w.i32(0);
                    w.i32(mesh.skin_reference);
                    w.i32(0); // mesh normal count
                    w.i32(mesh.normal_base);
                }

                for (mesh, command_patch) in model.meshes.iter().zip(command_patches) {
                    w.align2();
                    let pos = w.pos() as i32;
                    w.patch_i32(command_patch, pos);
                    for &cell in &mesh.commands {
                        w.i16(cell);
                    }
                }
            }
        }

        let length = w.pos() as i32;

        // header, written over the reserved prefix
        let mut h = Writer { bytes: Vec::new() };
        h.bytes.extend_from_slice(b"IDST");
        h.i32(10);
        h.name(self.name, 64);
        h.i32(length);
        h.vec3([0.0; 3]); // eye position
        h.vec3([0.0; 3]); // hull min
        h.vec3([0.0; 3]); // hull max
        h.vec3([0.0; 3]); // view bb min
        h.vec3([0.0; 3]); // view bb max
        h.i32(0); // flags
        h.i32(self.bones.len() as i32);
        h.i32(bone_offset as i32);
        h.i32(0); // bone controller count
        h.i32(0); // bone controller offset
        h.i32(0); // hitbox count
        h.i32(0); // hitbox offset
        h.i32(self.sequences.len() as i32);
        h.i32(sequence_offset as i32);
        h.i32(self.sequence_group_labels.len() as i32);
        h.i32(sequence_group_offset as i32);
        h.i32(self.textures.len() as i32);
        h.i32(texture_offset as i32);
        h.i32(texture_data_offset as i32);
        h.i32(self.skin_reference_count);
        h.i32(skin_family_count);
        h.i32(skin_offset as i32);
        h.i32(self.body_parts.len() as i32);
        h.i32(body_part_offset as i32);
        h.i32(0); // attachment count
        h.i32(0); // attachment offset
        h.i32(0); // sound table
        h.i32(0); // sound offset
        h.i32(0); // sound group count
        h.i32(0); // sound group offset
        h.i32(0); // transition count
        h.i32(0); // transition offset

        assert_eq!(h.bytes.len(), HEADER_SIZE);
        w.bytes[..HEADER_SIZE].copy_from_slice(&h.bytes);

        w.bytes
    }
}
