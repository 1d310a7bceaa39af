use crate::io::IoError;

/// Recoverable emulation faults.
///
/// A fault is counted in `Chip8::errors`, logged, and execution continues
/// with the next instruction after a fixed time penalty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Fault {
    #[error("unknown syscall {opcode:#06X}")]
    UnknownSyscall { opcode: u16 },

    #[error("unknown compare mode in {opcode:#06X}")]
    UnknownCompare { opcode: u16 },

    #[error("unknown arithmetic instruction {opcode:#06X}")]
    UnknownArithmetic { opcode: u16 },

    #[error("unknown key instruction {opcode:#06X}")]
    UnknownKeyOp { opcode: u16 },

    #[error("unknown misc instruction {opcode:#06X}")]
    UnknownMisc { opcode: u16 },
}

/// Error types that stop a step or a run.
#[derive(Debug, thiserror::Error)]
pub enum Chip8Error {
    #[error("ROM is too large ({size} bytes), max size is {max_size} bytes")]
    RomLoadError { size: usize, max_size: usize },

    #[error("Memory access out of bounds at address {address:#06X}")]
    MemoryOutOfBounds { address: u16 },

    #[error("Stack underflow: attempted to return with an empty call stack")]
    StackUnderflow,

    #[error("Stack overflow: stack pointer {stack_pointer:#06X} would reach the font area")]
    StackOverflow { stack_pointer: u16 },

    #[error("Io failure: {0}")]
    Io(#[from] IoError),
}
