use std::{
    io::{stdin, stdout},
    path::PathBuf,
};

use anyhow::Context;
use clap::Parser;

use chip8_rpc::{
    emu::Chip8,
    rpc::{Link, RemoteIo, Server},
};

/// CHIP-8 machine served over stdin/stdout.
///
/// Commands are read one per line on stdin; replies, timer updates and key
/// queries are written to stdout. Logs go to stderr, filtered by RUST_LOG.
#[derive(Parser)]
struct Args {
    /// ROM to load before the first command
    #[arg(long)]
    rom: Option<PathBuf>,

    /// Seed for the random number generator
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let args = Args::parse();

    let reader = stdin().lock();
    let writer = stdout().lock();

    let mut server = match args.seed {
        Some(seed) => Server::with_engine(Chip8::with_seed(
            RemoteIo::new(Link::new(reader, writer)),
            seed,
        )),
        None => Server::new(reader, writer),
    };

    if let Some(rom) = &args.rom {
        server
            .load_file(rom)
            .with_context(|| format!("Failed to load ROM {}", rom.display()))?;
    }

    server.serve().context("Connection to the driver failed")
}
