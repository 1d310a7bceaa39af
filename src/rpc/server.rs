use std::io::{BufRead, Write};
use std::path::Path;

use super::{Link, RemoteIo};
use crate::emu::{Chip8, Chip8Error, DISPLAY_X, DISPLAY_Y};
use crate::io::{Io, IoError};
use crate::protocol::{
    CpuRequest, CpuSnapshot, Die, Dispatcher, DisplayRequest, DisplaySnapshot, Load,
    MemoryRequest, MemorySnapshot, Message, PROTOCOL_VERSION, Ready, Run, Step, Version,
};

/// Command loop driving an engine whose `Io` is served by the peer.
pub struct Server<R, W> {
    chip8: Chip8<RemoteIo<R, W>>,
    running: bool,
}

impl<R, W> Server<R, W>
where
    R: BufRead + 'static,
    W: Write + 'static,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_engine(Chip8::new(RemoteIo::new(Link::new(reader, writer))))
    }

    pub fn with_engine(chip8: Chip8<RemoteIo<R, W>>) -> Self {
        Server {
            chip8,
            running: true,
        }
    }

    pub fn chip8(&self) -> &Chip8<RemoteIo<R, W>> {
        &self.chip8
    }

    /// Loads a ROM from disk into the engine.
    pub fn load_file(&mut self, path: &Path) -> Result<(), Chip8Error> {
        let rom = std::fs::read(path).map_err(IoError::from)?;
        self.chip8.load(&rom)?;
        log::info!("loaded {} ({} bytes)", path.display(), rom.len());
        Ok(())
    }

    /// Runs the session until the driver says `die` or hangs up.
    ///
    /// Only transport failures end the session with an error.
    pub fn serve(mut self) -> Result<(), IoError> {
        let commands = Self::commands();

        self.send(Version {
            version: PROTOCOL_VERSION.to_string(),
        })?;

        while self.running {
            self.send(Ready {})?;

            let Some(message) = self.link().recv()? else {
                log::info!("driver hung up");
                break;
            };

            if !message.is_command() {
                log::warn!("ignoring `{}`, it is not a command", message.code());
                continue;
            }
            commands.dispatch(&mut self, message)?;
        }

        log::info!("session finished");
        Ok(())
    }

    fn commands() -> Dispatcher<Self, Message, IoError> {
        Dispatcher::new()
            .on(Self::on_load)
            .on(Self::on_step)
            .on(Self::on_run)
            .on(Self::on_display)
            .on(Self::on_cpu)
            .on(Self::on_memory)
            .on(Self::on_die)
    }

    /// A failed load is reported and leaves the machine as it was.
    fn on_load(&mut self, Load { path }: Load) -> Result<(), IoError> {
        if let Err(e) = self.load_file(Path::new(&path)) {
            log::error!("cannot load {path}: {e}");
        }
        Ok(())
    }

    fn on_step(&mut self, _: Step) -> Result<(), IoError> {
        let result = self.chip8.step();
        self.settle(result)
    }

    fn on_run(&mut self, Run { watchdog }: Run) -> Result<(), IoError> {
        let result = self.chip8.run(watchdog);
        self.settle(result)
    }

    fn on_display(&mut self, _: DisplayRequest) -> Result<(), IoError> {
        let snapshot = DisplaySnapshot::from(&self.chip8);
        self.send(snapshot)
    }

    fn on_cpu(&mut self, _: CpuRequest) -> Result<(), IoError> {
        let snapshot = CpuSnapshot::from(&self.chip8);
        self.send(snapshot)
    }

    fn on_memory(&mut self, request: MemoryRequest) -> Result<(), IoError> {
        match self.chip8.memory().window(request.address, request.length) {
            Ok(bytes) => self.send(MemorySnapshot {
                address: request.address,
                bytes,
            }),
            Err(e) => {
                log::warn!("cannot dump memory: {e}");
                Ok(())
            }
        }
    }

    fn on_die(&mut self, _: Die) -> Result<(), IoError> {
        log::info!("driver asked to terminate");
        self.running = false;
        Ok(())
    }

    /// Transport errors are fatal, any other engine error pauses the machine.
    fn settle(&mut self, result: Result<(), Chip8Error>) -> Result<(), IoError> {
        match result {
            Ok(()) => Ok(()),
            Err(Chip8Error::Io(e)) => Err(e),
            Err(e) => {
                log::error!("execution stopped: {e}");
                self.chip8.pause();
                Ok(())
            }
        }
    }

    fn send(&mut self, payload: impl Into<Message>) -> Result<(), IoError> {
        self.link().send(&payload.into())
    }

    fn link(&mut self) -> &mut Link<R, W> {
        self.chip8.io_mut().link_mut()
    }
}

impl<I: Io> From<&Chip8<I>> for CpuSnapshot {
    fn from(chip8: &Chip8<I>) -> Self {
        let cpu = chip8.cpu();
        CpuSnapshot {
            pc: cpu.program_counter,
            sp: cpu.stack_pointer,
            i: cpu.index_register,
            v: cpu.general_registers,
            paused: chip8.is_paused(),
            errors: chip8.errors(),
            time: chip8.time(),
        }
    }
}

impl<I: Io> From<&Chip8<I>> for DisplaySnapshot {
    fn from(chip8: &Chip8<I>) -> Self {
        DisplaySnapshot {
            width: DISPLAY_X as u8,
            height: DISPLAY_Y as u8,
            rows: *chip8.display().rows(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::io::Cursor;
    use std::rc::Rc;

    use super::*;
    use crate::protocol::{KeyDownQuery, SyncTime};

    #[derive(Clone, Default)]
    struct Shared(Rc<RefCell<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn rom(words: &[u16]) -> Vec<u8> {
        words.iter().flat_map(|word| word.to_be_bytes()).collect()
    }

    /// Serves `input` against a machine loaded with `rom` and returns what
    /// the server sent back.
    fn session(rom: &[u8], input: &str) -> Vec<Message> {
        raw_session(rom, input.as_bytes())
    }

    fn raw_session(rom: &[u8], input: &[u8]) -> Vec<Message> {
        let output = Shared::default();
        let link = Link::new(Cursor::new(input.to_vec()), output.clone());
        let mut chip8 = Chip8::with_seed(RemoteIo::new(link), 0);
        chip8.load(rom).unwrap();

        Server::with_engine(chip8).serve().unwrap();

        let text = String::from_utf8(output.0.take()).unwrap();
        text.lines().map(|line| Message::decode(line).unwrap()).collect()
    }

    fn cpu(messages: &[Message]) -> CpuSnapshot {
        messages
            .iter()
            .rev()
            .find_map(|message| match message {
                Message::CpuSnapshot(cpu) => Some(cpu.clone()),
                _ => None,
            })
            .unwrap()
    }

    fn ready() -> Message {
        Ready {}.into()
    }

    #[test]
    fn greets_then_waits_for_commands() {
        let messages = session(&rom(&[0x1200]), "die\n");
        assert_eq!(
            messages,
            [
                Version {
                    version: PROTOCOL_VERSION.to_string()
                }
                .into(),
                ready(),
            ]
        );
    }

    #[test]
    fn step_then_cpu_snapshot() {
        let messages = session(&rom(&[0x6005, 0x1202]), "s\ncpu\n!\n");
        assert_eq!(messages[2], ready());

        let cpu = cpu(&messages);
        assert_eq!(cpu.pc, 0x202);
        assert_eq!(cpu.v[0], 5);
        assert_eq!(cpu.time, 27);
        assert!(!cpu.paused);
    }

    #[test]
    fn run_stops_at_self_jump_and_syncs() {
        let messages = session(&rom(&[0x6005, 0x1202]), "r 100000\ncpu\n");
        assert_eq!(messages[2], SyncTime { time: 132 }.into());

        let cpu = cpu(&messages);
        assert!(cpu.paused);
        assert_eq!(cpu.pc, 0x202);
    }

    #[test]
    fn key_queries_are_answered_by_the_driver() {
        // LD V1, 7; SKP V1; LD V2, 1; JP 0x206
        let program = rom(&[0x6107, 0xE19E, 0x6201, 0x1206]);
        let messages = session(&program, "r ffff\n=key 1\ncpu\n");

        assert!(messages.contains(&KeyDownQuery { key: 7 }.into()));
        let cpu = cpu(&messages);
        assert_eq!(cpu.v[2], 0);
        assert!(cpu.paused);
    }

    #[test]
    fn non_commands_are_ignored() {
        let messages = session(&rom(&[0x1200]), "=key 1\nbogus\ndie\n");
        assert_eq!(messages.len(), 3);
        assert!(messages[1..].iter().all(|message| *message == ready()));
    }

    #[test]
    fn garbage_bytes_do_not_end_the_session() {
        let messages = raw_session(&rom(&[0x6005, 0x1202]), b"\xffbogus\ns\ncpu\n!\n");
        assert_eq!(cpu(&messages).v[0], 5);
    }

    #[test]
    fn hard_errors_pause_the_machine() {
        let messages = session(&rom(&[0x00EE]), "s\ncpu\n");
        assert!(cpu(&messages).paused);
    }

    #[test]
    fn failed_load_keeps_the_session() {
        let messages = session(&rom(&[0x6005]), "s\nl /nonexistent/rom.ch8\ncpu\n");
        assert_eq!(cpu(&messages).v[0], 5);
    }

    #[test]
    fn memory_window() {
        let messages = session(&rom(&[0x1200]), "mem 50 5\nmem fff 2\n");
        let dumps: Vec<_> = messages
            .iter()
            .filter(|message| matches!(message, Message::MemorySnapshot(_)))
            .collect();

        assert_eq!(
            dumps,
            [&Message::from(MemorySnapshot {
                address: 0x50,
                bytes: vec![0xF0, 0x90, 0x90, 0x90, 0xF0],
            })]
        );
    }

    #[test]
    fn display_snapshot_has_fixed_geometry() {
        let messages = session(&rom(&[0x1200]), "display\n");
        let Message::DisplaySnapshot(display) = &messages[2] else {
            panic!("expected a display snapshot, got {:?}", messages[2]);
        };
        assert_eq!((display.width, display.height), (64, 32));
        assert!(display.rows.iter().all(|&row| row == 0));
    }
}
