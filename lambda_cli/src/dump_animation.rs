use clap::Parser;

use lambda_mdl::{AnimationState, BonePose, Model};

#[derive(Parser)]
pub struct DumpAnimation {
    #[clap(short, long)]
    mdl_path: String,
    #[clap(short, long)]
    sequence: Option<String>,
    #[clap(short, long)]
    bones: bool,
    #[clap(short, long)]
    names_only: bool,
}

pub fn dump_animation(opts: &DumpAnimation) {
    let model = Model::read(&opts.mdl_path).unwrap();
    let verified = model.verify().unwrap();

    if opts.bones {
        for bone in verified.bones().unwrap() {
            eprintln!("{bone:#?}");
        }
    }

    for (index, sequence) in verified.sequences().unwrap().iter().enumerate() {
        if let Some(filter) = &opts.sequence {
            if sequence.label != filter {
                continue;
            }
        }

        if opts.names_only {
            eprintln!("{}", sequence.label);
            continue;
        }

        eprintln!(
            "{} ({} frames at {} fps, group {})",
            sequence.label, sequence.frame_count, sequence.fps, sequence.sequence_group
        );

        let mut state = AnimationState::new();
        state.set_sequence(index, verified.sequence_info(index).unwrap());

        let mut pose = BonePose::new();

        for frame in 0..sequence.frame_count.max(1) {
            verified.compute_pose_into(&state, &mut pose).unwrap();

            eprintln!("  frame {frame}:");
            for (bone, transform) in pose.transforms().iter().enumerate() {
                let (_, rotation, translation) = transform.to_scale_rotation_translation();
                eprintln!("    bone {bone}: position {translation}, rotation {rotation}");
            }

            if sequence.fps > 0.0 {
                state.advance(1.0 / sequence.fps);
            }
        }
    }
}
