//! Transport, server command loop and driver-side client.

mod client;
mod link;
mod remote;
mod server;

pub use client::*;
pub use link::*;
pub use remote::*;
pub use server::*;

use std::io::{BufReader, PipeReader, PipeWriter};
use std::thread::JoinHandle;

use crate::io::IoError;

/// Client end of a pipe pair connected to an in-process server.
pub type PipeLink = Link<BufReader<PipeReader>, PipeWriter>;

/// Starts a server on its own thread, wired to the returned link by pipes.
///
/// The server ends when the link is dropped or a `die` is sent.
pub fn spawn_local_server() -> std::io::Result<(PipeLink, JoinHandle<Result<(), IoError>>)> {
    let (client_reader, server_writer) = std::io::pipe()?;
    let (server_reader, client_writer) = std::io::pipe()?;

    let handle = std::thread::Builder::new()
        .name("chip8-server".to_string())
        .spawn(move || Server::new(BufReader::new(server_reader), server_writer).serve())?;

    Ok((
        Link::new(BufReader::new(client_reader), client_writer),
        handle,
    ))
}
