mod chip8;
mod cpu;
mod display;
mod execute;
mod memory;
mod opcode;
pub mod timing;
mod types;

pub use chip8::*;
pub use cpu::*;
pub use display::*;
pub use memory::*;
pub use opcode::*;
pub use types::*;
