use std::io::{BufRead, Write};

use crate::io::IoError;
use crate::protocol::{Message, Payload};

/// One end of a line-oriented message channel.
pub struct Link<R, W> {
    reader: R,
    writer: W,
    buffer: Vec<u8>,
}

impl<R: BufRead, W: Write> Link<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Link {
            reader,
            writer,
            buffer: Vec::new(),
        }
    }

    /// Writes one message line and flushes it.
    pub fn send(&mut self, message: &Message) -> Result<(), IoError> {
        let line = message.encode();
        log::trace!("-> {line}");

        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Reads the next well-formed message, or `None` once the peer is gone.
    ///
    /// Blank lines are skipped. Malformed lines, including ones that are not
    /// UTF-8, are logged and dropped.
    pub fn recv(&mut self) -> Result<Option<Message>, IoError> {
        loop {
            self.buffer.clear();
            if self.reader.read_until(b'\n', &mut self.buffer)? == 0 {
                return Ok(None);
            }

            let line = match std::str::from_utf8(&self.buffer) {
                Ok(line) => line.trim(),
                Err(e) => {
                    log::warn!("dropping line of {} bytes: {e}", self.buffer.len());
                    continue;
                }
            };
            if line.is_empty() {
                continue;
            }
            log::trace!("<- {line}");

            match Message::decode(line) {
                Ok(message) => return Ok(Some(message)),
                Err(e) => log::warn!("dropping `{line}`: {e}"),
            }
        }
    }

    /// Reads until a message carrying `P` arrives, dropping anything else.
    pub fn expect<P: Payload>(&mut self) -> Result<P, IoError> {
        loop {
            let message = self.recv()?.ok_or(IoError::Disconnected)?;
            match P::extract(message) {
                Ok(payload) => return Ok(payload),
                Err(other) => log::warn!(
                    "ignoring `{}` while waiting for `{}`",
                    other.code(),
                    P::CODE
                ),
            }
        }
    }

    pub fn into_parts(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::protocol::{DelayAnswer, Step, SyncTime};

    fn link(input: &str) -> Link<Cursor<Vec<u8>>, Vec<u8>> {
        Link::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn send_writes_one_line_per_message() {
        let mut link = link("");
        link.send(&Step {}.into()).unwrap();
        link.send(&SyncTime { time: 0x10 }.into()).unwrap();

        let (_, written) = link.into_parts();
        assert_eq!(
            String::from_utf8(written).unwrap(),
            "s\n_sync 0000000000000010\n"
        );
    }

    #[test]
    fn recv_skips_blank_and_malformed_lines() {
        let mut link = link("\n  \nbogus 1\ns 1\nstep\r\n");
        assert_eq!(link.recv().unwrap(), Some(Message::Step(Step {})));
        assert_eq!(link.recv().unwrap(), None);
    }

    #[test]
    fn recv_drops_lines_that_are_not_utf8() {
        let mut link = Link::new(Cursor::new(b"\xff\xfe junk\nstep\n".to_vec()), Vec::new());
        assert_eq!(link.recv().unwrap(), Some(Message::Step(Step {})));
        assert_eq!(link.recv().unwrap(), None);
    }

    #[test]
    fn expect_drops_other_messages() {
        let mut link = link("_sync 5\n=delay 3\n");
        assert_eq!(
            link.expect::<DelayAnswer>().unwrap(),
            DelayAnswer { ticks: 3 }
        );
        assert!(matches!(
            link.expect::<DelayAnswer>(),
            Err(IoError::Disconnected)
        ));
    }
}
