pub mod driver;
pub mod emu;
pub mod io;
mod nibble;
pub mod protocol;
pub mod rpc;

pub use nibble::u4;
