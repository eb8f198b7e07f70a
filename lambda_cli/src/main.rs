#![warn(clippy::all, clippy::pedantic)]

mod dump_animation;
mod info;

use dump_animation::{dump_animation, DumpAnimation};
use info::{info, Info};

use clap::Parser;

#[derive(Parser)]
#[clap(version = "0.1.0")]
struct Opts {
    #[clap(subcommand)]
    subcommand: SubCommand,
}

#[derive(Parser)]
enum SubCommand {
    Info(Info),
    DumpAnimation(DumpAnimation),
}

fn main() {
    tracing_subscriber::fmt().with_target(false).init();

    let opts = Opts::parse();

    match opts.subcommand {
        SubCommand::Info(opts) => info(&opts),
        SubCommand::DumpAnimation(opts) => dump_animation(&opts),
    }
}
