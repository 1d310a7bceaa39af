use std::io::{BufRead, Write};
use std::rc::Rc;

use super::Link;
use crate::emu::Display;
use crate::io::{Io, IoError};
use crate::protocol::{
    CpuRequest, CpuSnapshot, DelayAnswer, DelayQuery, Die, Dispatcher, DisplayRequest,
    DisplaySnapshot, KeyDownAnswer, KeyDownQuery, Load, MemoryRequest, MemorySnapshot, Message,
    NextKeyAnswer, NextKeyQuery, PROTOCOL_VERSION, Ready, Run, SetDelay, SetSound, Step,
    SyncTime, Version,
};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("`{0}` cannot be sent as a single token")]
    BadToken(String),

    #[error(transparent)]
    Io(#[from] IoError),
}

/// Driver side of a session.
///
/// Queries from the server are answered through the driver's own `Io`, and
/// the most recent snapshots are kept for inspection.
pub struct Client<R, W, D> {
    link: Link<R, W>,
    driver: D,
    handlers: Rc<Dispatcher<Client<R, W, D>, Message, IoError>>,
    ready: bool,

    display: Option<DisplaySnapshot>,
    cpu: Option<CpuSnapshot>,
    memory: Option<MemorySnapshot>,
}

impl<R, W, D> Client<R, W, D>
where
    R: BufRead + 'static,
    W: Write + 'static,
    D: Io + 'static,
{
    /// Performs the handshake: the server must announce our protocol version
    /// and then report ready.
    pub fn connect(mut link: Link<R, W>, driver: D) -> Result<Self, ClientError> {
        match link.recv()? {
            Some(Message::Version(Version { version })) if version == PROTOCOL_VERSION => {}
            Some(Message::Version(Version { version })) => {
                return Err(ClientError::Handshake(format!(
                    "server speaks `{version}`, expected `{PROTOCOL_VERSION}`"
                )));
            }
            Some(other) => {
                return Err(ClientError::Handshake(format!(
                    "expected `version`, got `{}`",
                    other.code()
                )));
            }
            None => return Err(ClientError::Handshake("server hung up".to_string())),
        }

        match link.recv()? {
            Some(Message::Ready(_)) => {}
            Some(other) => {
                return Err(ClientError::Handshake(format!(
                    "expected `?`, got `{}`",
                    other.code()
                )));
            }
            None => return Err(ClientError::Handshake("server hung up".to_string())),
        }

        log::info!("connected to server speaking {PROTOCOL_VERSION}");
        Ok(Client {
            link,
            driver,
            handlers: Rc::new(Self::handlers()),
            ready: true,
            display: None,
            cpu: None,
            memory: None,
        })
    }

    /// Sends a command and serves the server until it is ready again.
    pub fn command(&mut self, command: impl Into<Message>) -> Result<(), ClientError> {
        let handlers = Rc::clone(&self.handlers);

        self.link.send(&command.into())?;
        self.ready = false;

        while !self.ready {
            let message = self.link.recv()?.ok_or(IoError::Disconnected)?;
            let code = message.code();
            if !handlers.dispatch(self, message)? {
                log::warn!("unexpected `{code}` from server");
            }
        }
        Ok(())
    }

    pub fn load(&mut self, path: &str) -> Result<(), ClientError> {
        if path.is_empty() || path.contains(char::is_whitespace) {
            return Err(ClientError::BadToken(path.to_string()));
        }
        self.command(Load {
            path: path.to_string(),
        })
    }

    pub fn step(&mut self) -> Result<(), ClientError> {
        self.command(Step {})
    }

    pub fn run(&mut self, watchdog: u64) -> Result<(), ClientError> {
        self.command(Run { watchdog })
    }

    pub fn display(&mut self) -> Result<Option<&DisplaySnapshot>, ClientError> {
        self.display = None;
        self.command(DisplayRequest {})?;
        Ok(self.display.as_ref())
    }

    pub fn cpu(&mut self) -> Result<Option<&CpuSnapshot>, ClientError> {
        self.cpu = None;
        self.command(CpuRequest {})?;
        Ok(self.cpu.as_ref())
    }

    /// `None` when the server refused the window.
    pub fn memory(
        &mut self,
        address: u16,
        length: u16,
    ) -> Result<Option<&MemorySnapshot>, ClientError> {
        self.memory = None;
        self.command(MemoryRequest { address, length })?;
        Ok(self.memory.as_ref())
    }

    /// Asks the server to end the session. The server does not answer.
    pub fn quit(mut self) -> Result<(), ClientError> {
        self.link.send(&Die {}.into())?;
        Ok(())
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    fn handlers() -> Dispatcher<Self, Message, IoError> {
        Dispatcher::new()
            .on(|client: &mut Self, _: Ready| {
                client.ready = true;
                Ok(())
            })
            .on(|client: &mut Self, SyncTime { time }: SyncTime| client.driver.sync(time))
            .on(|client: &mut Self, SetDelay { ticks }: SetDelay| client.driver.set_delay(ticks))
            .on(|client: &mut Self, SetSound { ticks }: SetSound| client.driver.set_sound(ticks))
            .on(Self::on_key_query)
            .on(Self::on_next_key_query)
            .on(Self::on_delay_query)
            .on(|client: &mut Self, snapshot: DisplaySnapshot| {
                client.display = Some(snapshot);
                Ok(())
            })
            .on(|client: &mut Self, snapshot: CpuSnapshot| {
                client.cpu = Some(snapshot);
                Ok(())
            })
            .on(|client: &mut Self, snapshot: MemorySnapshot| {
                client.memory = Some(snapshot);
                Ok(())
            })
    }

    fn on_key_query(&mut self, KeyDownQuery { key }: KeyDownQuery) -> Result<(), IoError> {
        let down = self.driver.is_key_down(key)?;
        self.link.send(&KeyDownAnswer { down }.into())
    }

    fn on_next_key_query(&mut self, _: NextKeyQuery) -> Result<(), IoError> {
        let key = self.driver.next_key()?;
        self.link.send(&NextKeyAnswer { key }.into())
    }

    fn on_delay_query(&mut self, _: DelayQuery) -> Result<(), IoError> {
        let ticks = self.driver.get_delay()?;
        self.link.send(&DelayAnswer { ticks }.into())
    }
}

impl From<&DisplaySnapshot> for Display {
    fn from(snapshot: &DisplaySnapshot) -> Self {
        Display::from(snapshot.rows)
    }
}
