//! Interactive driver built on the RPC client.

mod commands;
mod session;

pub use commands::*;
pub use session::*;
