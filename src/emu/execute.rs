use rand::Rng;

use super::{
    Chip8, Chip8Error, DISPLAY_Y, FONT_START_ADDRESS, Memory, Opcode, OpcodeALU, timing,
};
use crate::{io::Io, u4};

impl<I: Io> Chip8<I> {
    pub(crate) fn execute(&mut self, opcode: Opcode) -> Result<(), Chip8Error> {
        self.cpu.program_counter = self.cpu.program_counter.wrapping_add(2);

        let cost = match opcode {
            Opcode::ClearDisplay => {
                self.display.clear();
                timing::CLEAR
            }
            Opcode::Return => {
                self.cpu.program_counter = self.stack_pop()?;
                timing::RETURN
            }
            Opcode::Jump { nnn } => {
                if nnn == self.cpu.program_counter.wrapping_sub(2) {
                    // Infinite loop, stop emulation
                    self.paused = true;
                }
                self.cpu.program_counter = nnn;
                timing::JUMP
            }
            Opcode::JumpWithOffset { nnn } => {
                self.cpu.program_counter = nnn.wrapping_add(self.v(u4::new(0)).into());
                timing::JUMP_OFFSET
            }
            Opcode::Call { nnn } => {
                self.stack_push(self.cpu.program_counter)?;
                self.cpu.program_counter = nnn;
                timing::CALL
            }
            Opcode::SkipRegEqualImm { x, nn } => {
                self.skip_if(self.v(x) == nn);
                timing::SKIP_IMM
            }
            Opcode::SkipRegNotEqualImm { x, nn } => {
                self.skip_if(self.v(x) != nn);
                timing::SKIP_IMM
            }
            Opcode::SkipRegEqualReg { x, y } => {
                self.skip_if(self.v(x) == self.v(y));
                timing::SKIP_REG
            }
            Opcode::SkipRegNotEqualReg { x, y } => {
                self.skip_if(self.v(x) != self.v(y));
                timing::SKIP_REG
            }
            Opcode::SetRegImm { x, nn } => {
                self.cpu.general_registers[x] = nn;
                timing::LOAD_IMM
            }
            Opcode::AddRegImm { x, nn } => {
                self.cpu.general_registers[x] = self.v(x).wrapping_add(nn);
                timing::ADD_IMM
            }
            Opcode::ALU { x, y, op } => {
                self.execute_alu(x, y, op);
                timing::ARITH
            }
            Opcode::Random { x, nn } => {
                let rand_byte: u8 = self.rng.random();
                self.cpu.general_registers[x] = rand_byte & nn;
                timing::RANDOM
            }
            Opcode::SetIndexImm { nnn } => {
                self.cpu.index_register = nnn;
                timing::LOAD_INDEX
            }
            Opcode::AddIndexReg { x } => {
                self.cpu.index_register = self.cpu.index_register.wrapping_add(self.v(x).into());
                timing::ADD_INDEX
            }
            Opcode::Draw { x, y, n } => {
                self.execute_draw(x, y, n)?;
                timing::DRAW
            }
            Opcode::SkipIfPressed { x } => {
                let key = self.v(x) & 0x0F;
                self.io.sync(self.time)?;
                let down = self.io.is_key_down(key)?;
                self.skip_if(down);
                timing::KEY
            }
            Opcode::SkipIfNotPressed { x } => {
                let key = self.v(x) & 0x0F;
                self.io.sync(self.time)?;
                let down = self.io.is_key_down(key)?;
                self.skip_if(!down);
                timing::KEY
            }
            Opcode::WaitForKey { x } => {
                self.io.sync(self.time)?;
                self.cpu.general_registers[x] = self.io.next_key()?;
                timing::TIMER
            }
            Opcode::ReadDelayTimer { x } => {
                self.io.sync(self.time)?;
                self.cpu.general_registers[x] = self.io.get_delay()?;
                timing::TIMER
            }
            Opcode::SetDelayTimer { x } => {
                let ticks = self.v(x);
                self.io.sync(self.time)?;
                self.io.set_delay(ticks)?;
                timing::TIMER
            }
            Opcode::SetSoundTimer { x } => {
                let ticks = self.v(x);
                self.io.sync(self.time)?;
                self.io.set_sound(ticks)?;
                timing::TIMER
            }
            Opcode::FontChar { x } => {
                self.cpu.index_register = Memory::digit(self.v(x));
                timing::FONT_CHAR
            }
            Opcode::BCD { x } => {
                let value = self.v(x);
                let i = self.cpu.index_register;
                self.memory.store8(i, value / 100)?;
                self.memory.store8(i.wrapping_add(1), (value / 10) % 10)?;
                self.memory.store8(i.wrapping_add(2), value % 10)?;
                timing::BCD
            }
            Opcode::StoreRegs { x } => {
                let i = self.cpu.index_register;
                for reg_index in 0..=u8::from(x) {
                    let value = self.cpu.general_registers[reg_index as usize];
                    self.memory.store8(i.wrapping_add(reg_index.into()), value)?;
                }
                timing::REGS
            }
            Opcode::LoadRegs { x } => {
                let i = self.cpu.index_register;
                for reg_index in 0..=u8::from(x) {
                    self.cpu.general_registers[reg_index as usize] =
                        self.memory.read8(i.wrapping_add(reg_index.into()))?;
                }
                timing::REGS
            }
            Opcode::Invalid(fault) => {
                self.record_fault(fault);
                timing::FAULT_PENALTY
            }
        };

        self.time = self.time.wrapping_add(cost);
        Ok(())
    }

    fn v(&self, x: u4) -> u8 {
        self.cpu.general_registers[x]
    }

    fn skip_if(&mut self, condition: bool) {
        if condition {
            self.cpu.program_counter = self.cpu.program_counter.wrapping_add(2);
            self.time = self.time.wrapping_add(timing::SKIP_TAKEN);
        }
    }

    fn stack_push(&mut self, value: u16) -> Result<(), Chip8Error> {
        let stack_pointer = self.cpu.stack_pointer;
        if stack_pointer as usize + 2 > FONT_START_ADDRESS {
            return Err(Chip8Error::StackOverflow { stack_pointer });
        }

        self.memory.store16(stack_pointer, value)?;
        self.cpu.stack_pointer = stack_pointer + 2;
        Ok(())
    }

    fn stack_pop(&mut self) -> Result<u16, Chip8Error> {
        if self.cpu.stack_pointer < 2 {
            return Err(Chip8Error::StackUnderflow);
        }

        self.cpu.stack_pointer -= 2;
        self.memory.read16(self.cpu.stack_pointer)
    }

    fn execute_alu(&mut self, x: u4, y: u4, op: OpcodeALU) {
        let vx = self.v(x);
        let vy = self.v(y);

        let (result, flag) = match op {
            OpcodeALU::Set => (vy, None),
            OpcodeALU::Or => (vx | vy, None),
            OpcodeALU::And => (vx & vy, None),
            OpcodeALU::Xor => (vx ^ vy, None),
            OpcodeALU::Add => {
                let (res, overflow) = vx.overflowing_add(vy);
                (res, Some(overflow as u8))
            }
            // Notice that borrow is inverted
            OpcodeALU::Sub => (vx.wrapping_sub(vy), Some((vx >= vy) as u8)),
            OpcodeALU::SubReverse => (vy.wrapping_sub(vx), Some((vy > vx) as u8)),
            OpcodeALU::ShiftRight => (vx >> 1, Some(vx & 1)),
            OpcodeALU::ShiftLeft => (vx << 1, Some(vx >> 7)),
        };

        // The flag is written first: with x == F the result wins.
        if let Some(flag) = flag {
            self.cpu.general_registers[u4::F] = flag;
        }
        self.cpu.general_registers[x] = result;
    }

    fn execute_draw(&mut self, x: u4, y: u4, n: u4) -> Result<(), Chip8Error> {
        let column = self.v(x) & 63;
        let mut row = self.v(y) & 31;
        let mut address = self.cpu.index_register;

        let mut any_erased = false;
        for _ in 0..u8::from(n) {
            // Don't draw out of bounds
            if row as usize >= DISPLAY_Y {
                break;
            }

            let sprite_byte = self.memory.read8(address)?;
            any_erased |= self.display.draw(column, row, sprite_byte);

            address = address.wrapping_add(1);
            row += 1;
        }

        self.cpu.general_registers[u4::F] = any_erased as u8;
        Ok(())
    }
}
