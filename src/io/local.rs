use std::collections::VecDeque;

use super::{Io, IoError};
use crate::emu::timing::TIMER_TICK;

/// Delay and sound timers expressed as deadlines on the engine's clock.
///
/// Instead of decrementing at 60Hz, each timer remembers the emulated time at
/// which it reaches zero; reads convert the remaining time back to ticks.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Timers {
    now: u64,
    delay_deadline: u64,
    sound_deadline: u64,
}

impl Timers {
    /// Advances the clock. A clock that goes backwards means the engine was
    /// reset, which also clears both timers.
    pub fn sync(&mut self, time: u64) {
        if time < self.now {
            *self = Timers::default();
        }
        self.now = time;
    }

    pub fn set_delay(&mut self, ticks: u8) {
        self.delay_deadline = self.now + ticks as u64 * TIMER_TICK;
    }

    pub fn set_sound(&mut self, ticks: u8) {
        self.sound_deadline = self.now + ticks as u64 * TIMER_TICK;
    }

    /// Remaining delay in ticks, a partially elapsed tick counts as a whole one.
    pub fn delay(&self) -> u8 {
        let remaining = self.delay_deadline.saturating_sub(self.now);
        remaining.div_ceil(TIMER_TICK).min(u8::MAX as u64) as u8
    }

    pub fn sound_active(&self) -> bool {
        self.sound_deadline > self.now
    }

    pub fn now(&self) -> u64 {
        self.now
    }
}

/// Same-process `Io` backed by an in-memory keypad.
///
/// `next_key` cannot block here: it consumes presses queued with `press` and
/// fails with `IoError::NoKeyPending` when there are none.
#[derive(Debug, Default)]
pub struct LocalIo {
    timers: Timers,
    keypad: [bool; 16],
    pending: VecDeque<u8>,
}

impl LocalIo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a key as down and queues it for `next_key`.
    pub fn press(&mut self, key: u8) {
        let key = key & 0x0F;
        self.keypad[key as usize] = true;
        self.pending.push_back(key);
    }

    pub fn release(&mut self, key: u8) {
        self.keypad[(key & 0x0F) as usize] = false;
    }

    pub fn keypad(&self) -> &[bool; 16] {
        &self.keypad
    }

    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    pub fn sound_active(&self) -> bool {
        self.timers.sound_active()
    }
}

impl Io for LocalIo {
    fn sync(&mut self, time: u64) -> Result<(), IoError> {
        self.timers.sync(time);
        Ok(())
    }

    fn is_key_down(&mut self, key: u8) -> Result<bool, IoError> {
        Ok(self.keypad[(key & 0x0F) as usize])
    }

    fn next_key(&mut self) -> Result<u8, IoError> {
        self.pending.pop_front().ok_or(IoError::NoKeyPending)
    }

    fn set_sound(&mut self, ticks: u8) -> Result<(), IoError> {
        self.timers.set_sound(ticks);
        Ok(())
    }

    fn set_delay(&mut self, ticks: u8) -> Result<(), IoError> {
        self.timers.set_delay(ticks);
        Ok(())
    }

    fn get_delay(&mut self) -> Result<u8, IoError> {
        Ok(self.timers.delay())
    }
}
