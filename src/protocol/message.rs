use super::{DecodeError, Field, Line, Tokens, Variant};

/// Version string exchanged during the handshake.
pub const PROTOCOL_VERSION: &str = "chip8-rpc.1";

/// A message payload with its canonical wire code.
pub trait Payload: Variant<Message> + Into<Message> {
    const CODE: &'static str;
}

macro_rules! messages {
    ($(
        $(#[$meta:meta])*
        $name:ident = $code:literal $(| $alias:literal)* { $($field:ident : $ty:ty),* $(,)? }
    )*) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, PartialEq, Eq, Default)]
            pub struct $name {
                $(pub $field: $ty,)*
            }

            impl Payload for $name {
                const CODE: &'static str = $code;
            }

            impl Variant<Message> for $name {
                fn extract(message: Message) -> Result<Self, Message> {
                    match message {
                        Message::$name(payload) => Ok(payload),
                        other => Err(other),
                    }
                }
            }

            impl From<$name> for Message {
                fn from(payload: $name) -> Self {
                    Message::$name(payload)
                }
            }
        )*

        /// Everything that can travel between a server and a driver.
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub enum Message {
            $($name($name),)*
        }

        /// Every code accepted on input, canonical spellings and aliases alike.
        pub const CODES: &[&str] = &[$($code, $($alias,)*)*];

        impl Message {
            /// The canonical code this message is sent with.
            pub fn code(&self) -> &'static str {
                match self {
                    $(Message::$name(_) => $code,)*
                }
            }

            /// Renders the message as a single line, without the terminator.
            #[allow(unused_variables)]
            pub fn encode(&self) -> String {
                let mut line = Line::new(self.code());
                match self {
                    $(Message::$name(payload) => {
                        $(payload.$field.encode(&mut line);)*
                    })*
                }
                line.into_string()
            }

            /// Parses one line. Fields are read in declaration order and
            /// nothing may follow the last one.
            pub fn decode(line: &str) -> Result<Self, DecodeError> {
                let mut tokens = Tokens::new(line);
                let message = match tokens.code()? {
                    $($code $(| $alias)* => Message::$name($name {
                        $($field: Field::decode(&mut tokens, stringify!($field))?,)*
                    }),)*
                    other => return Err(DecodeError::UnknownCode(other.to_string())),
                };
                tokens.finish()?;
                Ok(message)
            }
        }
    };
}

messages! {
    /// First message of every session, sent by the server.
    Version = "version" { version: String }

    /// The server is idle and waiting for a command.
    Ready = "?" {}

    DisplaySnapshot = "_display" { width: u8, height: u8, rows: [u64; 32] }

    CpuSnapshot = "_cpu" {
        pc: u16,
        sp: u16,
        i: u16,
        v: [u8; 16],
        paused: bool,
        errors: u32,
        time: u64,
    }

    MemorySnapshot = "_mem" { address: u16, bytes: Vec<u8> }

    /// Current emulated time in microseconds.
    SyncTime = "_sync" { time: u64 }

    SetDelay = "_setdelay" { ticks: u8 }
    SetSound = "_setsound" { ticks: u8 }

    KeyDownQuery = "?key" { key: u8 }
    KeyDownAnswer = "=key" { down: bool }

    NextKeyQuery = "?nextkey" {}
    NextKeyAnswer = "=nextkey" { key: u8 }

    DelayQuery = "?delay" {}
    DelayAnswer = "=delay" { ticks: u8 }

    /// Loads a ROM file from the server's filesystem.
    Load = "l" | "load" { path: String }

    Step = "s" | "step" {}

    /// Runs for at most `watchdog` microseconds of emulated time.
    Run = "r" | "run" { watchdog: u64 }

    DisplayRequest = "display" {}
    CpuRequest = "cpu" {}
    MemoryRequest = "mem" { address: u16, length: u16 }

    /// Ends the session.
    Die = "!" | "die" {}
}

impl Message {
    /// Commands are what a driver may send when the server is idle.
    pub fn is_command(&self) -> bool {
        matches!(
            self,
            Message::Load(_)
                | Message::Step(_)
                | Message::Run(_)
                | Message::DisplayRequest(_)
                | Message::CpuRequest(_)
                | Message::MemoryRequest(_)
                | Message::Die(_)
        )
    }
}
