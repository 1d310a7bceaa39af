//! Approximate instruction costs in microseconds of COSMAC VIP time.
//!
//! The values only drive pacing and timer deadlines, but they are part of
//! the observable `time` counter and must stay stable.

pub const CLEAR: u64 = 109;
pub const RETURN: u64 = 105;
pub const JUMP: u64 = 105;
pub const CALL: u64 = 105;
pub const SKIP_IMM: u64 = 46;
pub const SKIP_REG: u64 = 73;
pub const LOAD_IMM: u64 = 27;
pub const ADD_IMM: u64 = 45;
pub const ARITH: u64 = 200;
pub const LOAD_INDEX: u64 = 55;
pub const JUMP_OFFSET: u64 = 105;
pub const RANDOM: u64 = 164;
pub const DRAW: u64 = 22734;
pub const KEY: u64 = 73;
pub const TIMER: u64 = 45;
pub const ADD_INDEX: u64 = 86;
pub const FONT_CHAR: u64 = 91;
pub const BCD: u64 = 927;
pub const REGS: u64 = 605;

/// Extra cost when a conditional skip is taken.
pub const SKIP_TAKEN: u64 = 18;
/// Cost of an instruction that faulted.
pub const FAULT_PENALTY: u64 = 64;

/// Length of one 60Hz timer tick.
pub const TIMER_TICK: u64 = 1_000_000 / 60;
