//! Line-oriented message protocol spoken between a server and its driver.
//!
//! Each message is one line: a code followed by its fields as whitespace
//! separated tokens.

mod dispatch;
mod field;
mod message;

pub use dispatch::*;
pub use field::*;
pub use message::*;
