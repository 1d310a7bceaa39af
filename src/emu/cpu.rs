use super::memory::ROM_START_ADDRESS;

/// CHIP-8 register file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cpu {
    /// Address of the next instruction to execute
    pub program_counter: u16,
    /// Next free stack slot; call frames live in memory below the font
    pub stack_pointer: u16,
    /// Index register used for memory operations
    pub index_register: u16,
    /// V0-VF, VF doubles as the carry/collision flag
    pub general_registers: [u8; 16],
}

impl Cpu {
    pub fn new() -> Self {
        Cpu {
            program_counter: ROM_START_ADDRESS as u16,
            stack_pointer: 0,
            index_register: 0,
            general_registers: [0; 16],
        }
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}
