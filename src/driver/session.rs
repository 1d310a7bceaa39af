use std::io::{BufRead, Write};

use super::commands::{Command, CommandError, CommandResult};
use crate::emu::{Display, Opcode, timing::TIMER_TICK};
use crate::io::Io;
use crate::protocol::CpuSnapshot;
use crate::rpc::Client;

pub enum PollResult {
    Idle,
    Ran,
    /// The machine paused itself during the last frame.
    Halted,
}

/// Interactive session on top of a connected client.
///
/// While running, each `poll` asks the server to run one frame budget of
/// emulated time and then refreshes the snapshots shown to the user.
pub struct Session<R, W, D> {
    client: Client<R, W, D>,
    is_running: bool,
    frame_budget: u64,

    display: Display,
    cpu: Option<CpuSnapshot>,
    stack: Vec<u16>,
}

impl<R, W, D> Session<R, W, D>
where
    R: BufRead + 'static,
    W: Write + 'static,
    D: Io + 'static,
{
    pub fn new(client: Client<R, W, D>) -> Self {
        Self {
            client,
            is_running: false,
            frame_budget: TIMER_TICK,
            display: Display::new(),
            cpu: None,
            stack: Vec::new(),
        }
    }

    pub fn with_frame_budget(mut self, frame_budget: u64) -> Self {
        self.frame_budget = frame_budget;
        self
    }

    pub fn poll(&mut self) -> Result<PollResult, CommandError> {
        if !self.is_running {
            return Ok(PollResult::Idle);
        }

        let result = self.client.run(self.frame_budget).and_then(|()| self.refresh());
        if let Err(e) = result {
            self.is_running = false;
            return Err(e.into());
        }

        if self.cpu.as_ref().is_some_and(|cpu| cpu.paused) {
            self.is_running = false;
            return Ok(PollResult::Halted);
        }

        Ok(PollResult::Ran)
    }

    pub fn execute(&mut self, command: Command) -> Result<CommandResult, CommandError> {
        match command {
            Command::Run => {
                self.execute_run();
                Ok(CommandResult::Ok)
            }
            Command::Pause => {
                self.execute_pause();
                Ok(CommandResult::Ok)
            }
            Command::Step => {
                self.client.step()?;
                self.refresh()?;
                Ok(CommandResult::Ok)
            }
            Command::Load { path } => {
                self.is_running = false;
                self.client.load(&path)?;
                self.refresh()?;
                Ok(CommandResult::Ok)
            }
            Command::Mem { start, len } => {
                let data = self.fetch(start, len)?;
                Ok(CommandResult::MemDump {
                    data,
                    offset: start,
                })
            }
            Command::Disasm { start, len } => {
                let bytes = len.checked_mul(2).ok_or(CommandError::ValueOutOfRange)?;
                let instructions = self
                    .fetch(start, bytes)?
                    .chunks_exact(2)
                    .map(|word| {
                        let opcode = u16::from_be_bytes([word[0], word[1]]);
                        (opcode, Opcode::decode(opcode))
                    })
                    .collect();

                Ok(CommandResult::Disasm {
                    instructions,
                    offset: start,
                })
            }
            Command::Budget { micros } => {
                if micros == 0 {
                    return Err(CommandError::ValueOutOfRange);
                }
                self.frame_budget = micros;
                Ok(CommandResult::Ok)
            }
            Command::Quit => Ok(CommandResult::Quit),
        }
    }

    pub fn execute_run(&mut self) {
        self.is_running = true;
    }

    pub fn execute_pause(&mut self) {
        self.is_running = false;
    }

    /// Pulls fresh display, cpu and stack snapshots from the server.
    pub fn refresh(&mut self) -> Result<(), crate::rpc::ClientError> {
        if let Some(display) = self.client.display()? {
            self.display = Display::from(display);
        }

        self.cpu = self.client.cpu()?.cloned();

        let depth = self.cpu.as_ref().map_or(0, |cpu| cpu.sp);
        self.stack = match self.client.memory(0, depth)? {
            Some(memory) => memory
                .bytes
                .chunks_exact(2)
                .map(|word| u16::from_be_bytes([word[0], word[1]]))
                .collect(),
            None => Vec::new(),
        };

        Ok(())
    }

    fn fetch(&mut self, start: u16, len: u16) -> Result<Vec<u8>, CommandError> {
        match self.client.memory(start, len)? {
            Some(memory) => Ok(memory.bytes.clone()),
            None => Err(CommandError::OutOfRange),
        }
    }

    /// Ends the session on the server side.
    pub fn quit(self) -> Result<(), CommandError> {
        self.client.quit()?;
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn frame_budget(&self) -> u64 {
        self.frame_budget
    }

    pub fn display(&self) -> &Display {
        &self.display
    }

    pub fn cpu(&self) -> Option<&CpuSnapshot> {
        self.cpu.as_ref()
    }

    /// Return addresses, oldest first.
    pub fn stack(&self) -> &[u16] {
        &self.stack
    }

    pub fn driver(&self) -> &D {
        self.client.driver()
    }

    pub fn driver_mut(&mut self) -> &mut D {
        self.client.driver_mut()
    }
}
