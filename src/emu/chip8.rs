use rand::{SeedableRng, rngs::StdRng};

use super::{Chip8Error, Cpu, Display, Fault, Memory, Opcode};
use crate::io::Io;

/// CHIP-8 virtual machine state.
///
/// The engine owns its register file, memory and framebuffer; timers and the
/// keypad are reached through the `Io` implementation it was built with.
pub struct Chip8<I> {
    pub(crate) cpu: Cpu,
    pub(crate) memory: Memory,
    pub(crate) display: Display,
    pub(crate) io: I,
    pub(crate) rng: StdRng,

    /// Emulated time in microseconds, advanced by every instruction
    pub(crate) time: u64,
    /// Time at which the current `run` stops
    watchdog: u64,
    /// Number of recoverable faults since the last load
    pub(crate) errors: u32,
    /// Set by a jump to itself, cleared by `step`
    pub(crate) paused: bool,
    pub(crate) last_fault: Option<Fault>,
}

impl<I: Io> Chip8<I> {
    pub fn new(io: I) -> Self {
        Self::with_rng(io, StdRng::from_os_rng())
    }

    /// Builds an engine whose `RND` instruction is reproducible.
    pub fn with_seed(io: I, seed: u64) -> Self {
        Self::with_rng(io, StdRng::seed_from_u64(seed))
    }

    fn with_rng(io: I, rng: StdRng) -> Self {
        Chip8 {
            cpu: Cpu::new(),
            memory: Memory::new(),
            display: Display::new(),
            io,
            rng,
            time: 0,
            watchdog: 0,
            errors: 0,
            paused: false,
            last_fault: None,
        }
    }

    /// Resets the machine and loads a ROM at 0x200.
    ///
    /// The old machine state is kept if the ROM does not fit.
    pub fn load(&mut self, rom: &[u8]) -> Result<(), Chip8Error> {
        let mut memory = Memory::new();
        memory.load_bin(rom)?;

        self.memory = memory;
        self.cpu = Cpu::new();
        self.display.clear();
        self.time = 0;
        self.watchdog = 0;
        self.errors = 0;
        self.paused = false;
        self.last_fault = None;

        Ok(())
    }

    /// Executes a single instruction (fetch, decode, execute).
    ///
    /// A paused machine is resumed; re-executing a jump to itself pauses it again.
    pub fn step(&mut self) -> Result<(), Chip8Error> {
        self.paused = false;

        let opcode = self.memory.read16(self.cpu.program_counter)?;
        log::trace!("{:#05X}: {:04X}", self.cpu.program_counter, opcode);

        self.execute(Opcode::decode(opcode))
    }

    /// Steps until the machine pauses or `limit` microseconds of emulated time
    /// have passed, then syncs the final time to `Io`.
    pub fn run(&mut self, limit: u64) -> Result<(), Chip8Error> {
        self.watchdog = self.time.saturating_add(limit);

        while !self.paused && self.time < self.watchdog {
            self.step()?;
        }

        self.io.sync(self.time)?;
        Ok(())
    }

    pub(crate) fn record_fault(&mut self, fault: Fault) {
        self.errors = self.errors.wrapping_add(1);
        log::warn!(
            "{fault} at {:#05X}",
            self.cpu.program_counter.wrapping_sub(2)
        );
        self.last_fault = Some(fault);
    }

    /// Halts the machine so that `run` becomes a no-op until the next `step`.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub fn display(&self) -> &Display {
        &self.display
    }

    pub fn io(&self) -> &I {
        &self.io
    }

    pub fn io_mut(&mut self) -> &mut I {
        &mut self.io
    }

    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn watchdog(&self) -> u64 {
        self.watchdog
    }

    pub fn errors(&self) -> u32 {
        self.errors
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// The most recent recoverable fault since the last load.
    pub fn last_fault(&self) -> Option<Fault> {
        self.last_fault
    }
}

impl<I: Io + Default> Default for Chip8<I> {
    fn default() -> Self {
        Self::new(I::default())
    }
}
