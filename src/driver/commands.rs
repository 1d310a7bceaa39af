use clap::{Parser, Subcommand};
use clap_num::maybe_hex;

use crate::emu::Opcode;
use crate::rpc::ClientError;

#[derive(Parser)]
#[command(multicall = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Run continuously, one frame budget at a time
    #[command(visible_alias = "r")]
    Run,

    #[command(visible_alias = "p")]
    Pause,

    /// Execute a single instruction
    #[command(visible_alias = "s")]
    Step,

    /// Load a ROM from the server's filesystem and reset the machine
    #[command(visible_alias = "l")]
    Load { path: String },

    #[command(visible_alias = "m")]
    Mem {
        #[arg(default_value = "0x200", value_parser = maybe_hex::<u16>)]
        start: u16,
        #[arg(default_value = "64", value_parser = maybe_hex::<u16>)]
        len: u16,
    },

    #[command(visible_alias = "d")]
    Disasm {
        #[arg(default_value = "0x200", value_parser = maybe_hex::<u16>)]
        start: u16,
        /// Number of instructions
        #[arg(default_value = "16", value_parser = maybe_hex::<u16>)]
        len: u16,
    },

    /// Emulated microseconds to run per frame
    Budget {
        #[arg(value_parser = maybe_hex::<u64>)]
        micros: u64,
    },

    #[command(visible_alias = "q")]
    Quit,
}

pub enum CommandResult {
    Ok,
    MemDump {
        data: Vec<u8>,
        offset: u16,
    },
    Disasm {
        instructions: Vec<(u16, Opcode)>,
        offset: u16,
    },
    Quit,
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Error while talking to the server: {0}")]
    Client(#[from] ClientError),
    #[error("Address range is outside of memory")]
    OutOfRange,
    #[error("Value out of range")]
    ValueOutOfRange,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<Command, clap::Error> {
        Cli::try_parse_from(line.split_whitespace()).map(|cli| cli.command)
    }

    #[test]
    fn aliases_and_defaults() {
        assert_eq!(parse("r").unwrap(), Command::Run);
        assert_eq!(parse("step").unwrap(), Command::Step);
        assert_eq!(
            parse("m").unwrap(),
            Command::Mem {
                start: 0x200,
                len: 64
            }
        );
        assert_eq!(
            parse("d 0x300 4").unwrap(),
            Command::Disasm {
                start: 0x300,
                len: 4
            }
        );
        assert_eq!(
            parse("l roms/ibm.ch8").unwrap(),
            Command::Load {
                path: "roms/ibm.ch8".to_string()
            }
        );
        assert_eq!(parse("budget 0x411a").unwrap(), Command::Budget { micros: 0x411A });
    }

    #[test]
    fn rejects_unknown_commands() {
        assert!(parse("jump 200").is_err());
        assert!(parse("m 0x10000").is_err());
        assert!(parse("load").is_err());
    }
}
