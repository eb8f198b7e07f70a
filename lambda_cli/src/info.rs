use clap::Parser;

use lambda_mdl::Model;

#[derive(Parser)]
pub struct Info {
    #[clap(short, long)]
    mdl_path: String,
}

pub fn info(opts: &Info) {
    let model = Model::read(&opts.mdl_path).unwrap();
    let verified = model.verify().unwrap();

    eprintln!("{}", verified.name().unwrap());
    eprintln!("flags: {:?}", verified.header().flags());

    eprintln!("bones:");
    for bone in verified.bones().unwrap() {
        eprintln!("  {} (parent {:?})", bone.name, bone.parent_bone_index);
    }

    eprintln!("textures:");
    for texture in verified.textures().unwrap() {
        eprintln!(
            "  {} {}x{} {:?}",
            texture.name().unwrap(),
            texture.width,
            texture.height,
            texture.flags()
        );
    }

    eprintln!("body parts:");
    for body_part in verified.header().iter_body_parts().unwrap() {
        eprintln!("  {}", body_part.name().unwrap());

        for model in body_part.iter_models().unwrap() {
            eprintln!(
                "    {} ({} vertices, {} normals, {} meshes)",
                model.name().unwrap(),
                model.vertex_count(),
                model.normal_count(),
                model.iter_meshes().unwrap().len()
            );
        }
    }

    eprintln!("sequences:");
    for sequence in verified.sequences().unwrap() {
        eprintln!(
            "  {} ({} frames at {} fps, group {}, {:?})",
            sequence.label,
            sequence.frame_count,
            sequence.fps,
            sequence.sequence_group,
            sequence.flags
        );
    }
}
