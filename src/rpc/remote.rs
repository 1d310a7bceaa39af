use std::io::{BufRead, Write};

use super::Link;
use crate::io::{Io, IoError};
use crate::protocol::{
    DelayAnswer, DelayQuery, KeyDownAnswer, KeyDownQuery, NextKeyAnswer, NextKeyQuery, SetDelay,
    SetSound, SyncTime,
};

/// `Io` served by the driver at the other end of a link.
///
/// Notifications are sent one way. Queries block until the matching answer
/// arrives; anything else received meanwhile is logged and dropped.
pub struct RemoteIo<R, W> {
    link: Link<R, W>,
}

impl<R: BufRead, W: Write> RemoteIo<R, W> {
    pub fn new(link: Link<R, W>) -> Self {
        RemoteIo { link }
    }

    pub fn link_mut(&mut self) -> &mut Link<R, W> {
        &mut self.link
    }
}

impl<R: BufRead, W: Write> Io for RemoteIo<R, W> {
    fn sync(&mut self, time: u64) -> Result<(), IoError> {
        self.link.send(&SyncTime { time }.into())
    }

    fn is_key_down(&mut self, key: u8) -> Result<bool, IoError> {
        self.link.send(&KeyDownQuery { key }.into())?;
        Ok(self.link.expect::<KeyDownAnswer>()?.down)
    }

    fn next_key(&mut self) -> Result<u8, IoError> {
        self.link.send(&NextKeyQuery {}.into())?;
        Ok(self.link.expect::<NextKeyAnswer>()?.key & 0x0F)
    }

    fn set_sound(&mut self, ticks: u8) -> Result<(), IoError> {
        self.link.send(&SetSound { ticks }.into())
    }

    fn set_delay(&mut self, ticks: u8) -> Result<(), IoError> {
        self.link.send(&SetDelay { ticks }.into())
    }

    fn get_delay(&mut self) -> Result<u8, IoError> {
        self.link.send(&DelayQuery {}.into())?;
        Ok(self.link.expect::<DelayAnswer>()?.ticks)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn remote(input: &str) -> RemoteIo<Cursor<Vec<u8>>, Vec<u8>> {
        RemoteIo::new(Link::new(Cursor::new(input.as_bytes().to_vec()), Vec::new()))
    }

    fn sent(io: RemoteIo<Cursor<Vec<u8>>, Vec<u8>>) -> String {
        let (_, written) = io.link.into_parts();
        String::from_utf8(written).unwrap()
    }

    #[test]
    fn queries_wait_for_their_answer() {
        let mut io = remote("=delay 07\n?\n=key 1\n=nextkey 1c\n");
        assert_eq!(io.get_delay().unwrap(), 7);
        assert!(io.is_key_down(0xA).unwrap());
        assert_eq!(io.next_key().unwrap(), 0xC);

        assert_eq!(sent(io), "?delay\n?key 0a\n?nextkey\n");
    }

    #[test]
    fn notifications_are_one_way() {
        let mut io = remote("");
        io.sync(0x1234).unwrap();
        io.set_delay(3).unwrap();
        io.set_sound(4).unwrap();

        assert_eq!(
            sent(io),
            "_sync 0000000000001234\n_setdelay 03\n_setsound 04\n"
        );
    }

    #[test]
    fn query_without_answer_is_a_disconnect() {
        let mut io = remote("");
        assert!(matches!(io.is_key_down(1), Err(IoError::Disconnected)));
    }
}
