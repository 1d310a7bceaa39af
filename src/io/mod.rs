//! Timer, keypad and pacing services consumed by the engine.

mod local;

pub use local::*;

/// Errors raised by an `Io` implementation.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("peer closed the connection")]
    Disconnected,

    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("no key press is pending")]
    NoKeyPending,
}

/// Services the engine needs from its environment.
///
/// Every call may suspend the engine when the implementation talks to a
/// remote driver. The engine calls `sync` with its current cycle time before
/// each timer or keypad access.
pub trait Io {
    /// One-way notification of the current emulated time in microseconds.
    fn sync(&mut self, time: u64) -> Result<(), IoError>;

    fn is_key_down(&mut self, key: u8) -> Result<bool, IoError>;

    /// Waits for the next key press. May block forever.
    fn next_key(&mut self) -> Result<u8, IoError>;

    fn set_sound(&mut self, ticks: u8) -> Result<(), IoError>;

    fn set_delay(&mut self, ticks: u8) -> Result<(), IoError>;

    fn get_delay(&mut self) -> Result<u8, IoError>;
}

impl<T: Io + ?Sized> Io for &mut T {
    fn sync(&mut self, time: u64) -> Result<(), IoError> {
        (**self).sync(time)
    }

    fn is_key_down(&mut self, key: u8) -> Result<bool, IoError> {
        (**self).is_key_down(key)
    }

    fn next_key(&mut self) -> Result<u8, IoError> {
        (**self).next_key()
    }

    fn set_sound(&mut self, ticks: u8) -> Result<(), IoError> {
        (**self).set_sound(ticks)
    }

    fn set_delay(&mut self, ticks: u8) -> Result<(), IoError> {
        (**self).set_delay(ticks)
    }

    fn get_delay(&mut self) -> Result<u8, IoError> {
        (**self).get_delay()
    }
}
