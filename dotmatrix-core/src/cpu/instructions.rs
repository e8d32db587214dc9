use crate::cpu::registers::{CpuRegisters, ImeState};
use crate::memory::AddressSpace;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecuteError {
    #[error("unimplemented opcode {opcode:#04X} at PC {pc:#06X}")]
    UnimplementedOpcode { opcode: u8, pc: u16 },
}

/// Fetch, decode and execute the instruction at PC, advancing PC past it.
///
/// Returns the number of clock cycles the instruction took, including the
/// extra cycles of taken conditional branches. The opcodes that do not exist
/// on the LR35902 (0xD3, 0xDB, 0xDD, 0xE3, 0xE4, 0xEB, 0xEC, 0xED, 0xF4,
/// 0xFC, 0xFD) are fatal and reported with the PC they were fetched from.
pub fn execute_next(
    address_space: &mut AddressSpace,
    r: &mut CpuRegisters,
) -> Result<u32, ExecuteError> {
    let opcode_pc = r.pc;
    let opcode = fetch_byte(address_space, r);

    let cycles = match opcode {
        // NOP
        0x00 => 4,
        // LD rr, nn
        0x01 | 0x11 | 0x21 | 0x31 => {
            let nn = fetch_word(address_space, r);
            write_pair_sp(r, opcode, nn);
            12
        }
        // LD (BC/DE), A
        0x02 => {
            address_space.write_byte(r.bc(), r.a);
            8
        }
        0x12 => {
            address_space.write_byte(r.de(), r.a);
            8
        }
        // LD (HL+/-), A
        0x22 => {
            address_space.write_byte(r.hl(), r.a);
            r.set_hl(r.hl().wrapping_add(1));
            8
        }
        0x32 => {
            address_space.write_byte(r.hl(), r.a);
            r.set_hl(r.hl().wrapping_sub(1));
            8
        }
        // LD A, (BC/DE)
        0x0A => {
            r.a = address_space.read_byte(r.bc());
            8
        }
        0x1A => {
            r.a = address_space.read_byte(r.de());
            8
        }
        // LD A, (HL+/-)
        0x2A => {
            r.a = address_space.read_byte(r.hl());
            r.set_hl(r.hl().wrapping_add(1));
            8
        }
        0x3A => {
            r.a = address_space.read_byte(r.hl());
            r.set_hl(r.hl().wrapping_sub(1));
            8
        }
        // INC rr / DEC rr (no flags)
        0x03 | 0x13 | 0x23 | 0x33 => {
            write_pair_sp(r, opcode, read_pair_sp(r, opcode).wrapping_add(1));
            8
        }
        0x0B | 0x1B | 0x2B | 0x3B => {
            write_pair_sp(r, opcode, read_pair_sp(r, opcode).wrapping_sub(1));
            8
        }
        // INC r / (HL)
        0x04 | 0x0C | 0x14 | 0x1C | 0x24 | 0x2C | 0x34 | 0x3C => {
            let code = (opcode >> 3) & 0x07;
            let value = read_r8(code, r, address_space);
            let result = value.wrapping_add(1);
            write_r8(code, result, r, address_space);
            r.set_z_flag(result == 0);
            r.set_n_flag(false);
            r.set_h_flag(value & 0x0F == 0x0F);
            if code == INDIRECT_HL_CODE {
                12
            } else {
                4
            }
        }
        // DEC r / (HL)
        0x05 | 0x0D | 0x15 | 0x1D | 0x25 | 0x2D | 0x35 | 0x3D => {
            let code = (opcode >> 3) & 0x07;
            let value = read_r8(code, r, address_space);
            let result = value.wrapping_sub(1);
            write_r8(code, result, r, address_space);
            r.set_z_flag(result == 0);
            r.set_n_flag(true);
            r.set_h_flag(value & 0x0F == 0x00);
            if code == INDIRECT_HL_CODE {
                12
            } else {
                4
            }
        }
        // LD r/(HL), n
        0x06 | 0x0E | 0x16 | 0x1E | 0x26 | 0x2E | 0x36 | 0x3E => {
            let code = (opcode >> 3) & 0x07;
            let n = fetch_byte(address_space, r);
            write_r8(code, n, r, address_space);
            if code == INDIRECT_HL_CODE {
                12
            } else {
                8
            }
        }
        // Accumulator rotates; Z is forced clear, unlike the CB variants
        0x07 => {
            let (result, carry) = rotate_left(r.a);
            r.a = result;
            r.set_flags(false, false, false, carry);
            4
        }
        0x0F => {
            let (result, carry) = rotate_right(r.a);
            r.a = result;
            r.set_flags(false, false, false, carry);
            4
        }
        0x17 => {
            let (result, carry) = rotate_left_thru_carry(r.a, r.c_flag());
            r.a = result;
            r.set_flags(false, false, false, carry);
            4
        }
        0x1F => {
            let (result, carry) = rotate_right_thru_carry(r.a, r.c_flag());
            r.a = result;
            r.set_flags(false, false, false, carry);
            4
        }
        // LD (nn), SP
        0x08 => {
            let nn = fetch_word(address_space, r);
            address_space.write_word(nn, r.sp);
            20
        }
        // ADD HL, rr
        0x09 | 0x19 | 0x29 | 0x39 => {
            let value = read_pair_sp(r, opcode);
            let hl = r.hl();
            let (sum, carry) = hl.overflowing_add(value);
            r.set_hl(sum);
            r.set_n_flag(false);
            r.set_h_flag((hl & 0x0FFF) + (value & 0x0FFF) >= 0x1000);
            r.set_c_flag(carry);
            8
        }
        // STOP (2 bytes; the second is a pad byte)
        0x10 => {
            r.pc = r.pc.wrapping_add(1);
            r.stopped = true;
            4
        }
        // JR e
        0x18 => {
            let e = fetch_byte(address_space, r) as i8;
            r.pc = r.pc.wrapping_add(e as u16);
            12
        }
        // JR cc, e
        0x20 | 0x28 | 0x30 | 0x38 => {
            let e = fetch_byte(address_space, r) as i8;
            if condition_met(r, opcode) {
                r.pc = r.pc.wrapping_add(e as u16);
                12
            } else {
                8
            }
        }
        // DAA
        0x27 => {
            decimal_adjust_accumulator(r);
            4
        }
        // CPL
        0x2F => {
            r.a = !r.a;
            r.set_n_flag(true);
            r.set_h_flag(true);
            4
        }
        // SCF
        0x37 => {
            r.set_n_flag(false);
            r.set_h_flag(false);
            r.set_c_flag(true);
            4
        }
        // CCF
        0x3F => {
            r.set_n_flag(false);
            r.set_h_flag(false);
            r.set_c_flag(!r.c_flag());
            4
        }
        // HALT
        0x76 => {
            r.halted = true;
            4
        }
        // LD r, r'
        0x40..=0x7F => {
            let src = opcode & 0x07;
            let dst = (opcode >> 3) & 0x07;
            let value = read_r8(src, r, address_space);
            write_r8(dst, value, r, address_space);
            if src == INDIRECT_HL_CODE || dst == INDIRECT_HL_CODE {
                8
            } else {
                4
            }
        }
        // ADD/ADC/SUB/SBC/AND/XOR/OR/CP r/(HL)
        0x80..=0xBF => {
            let code = opcode & 0x07;
            let value = read_r8(code, r, address_space);
            alu_operation(r, (opcode >> 3) & 0x07, value);
            if code == INDIRECT_HL_CODE {
                8
            } else {
                4
            }
        }
        // ADD/ADC/SUB/SBC/AND/XOR/OR/CP n
        0xC6 | 0xCE | 0xD6 | 0xDE | 0xE6 | 0xEE | 0xF6 | 0xFE => {
            let n = fetch_byte(address_space, r);
            alu_operation(r, (opcode >> 3) & 0x07, n);
            8
        }
        // RET cc
        0xC0 | 0xC8 | 0xD0 | 0xD8 => {
            if condition_met(r, opcode) {
                r.pc = pop_stack(address_space, r);
                20
            } else {
                8
            }
        }
        // POP rr
        0xC1 | 0xD1 | 0xE1 | 0xF1 => {
            let value = pop_stack(address_space, r);
            write_pair_af(r, opcode, value);
            12
        }
        // JP cc, nn
        0xC2 | 0xCA | 0xD2 | 0xDA => {
            let nn = fetch_word(address_space, r);
            if condition_met(r, opcode) {
                r.pc = nn;
                16
            } else {
                12
            }
        }
        // JP nn
        0xC3 => {
            r.pc = fetch_word(address_space, r);
            16
        }
        // CALL cc, nn
        0xC4 | 0xCC | 0xD4 | 0xDC => {
            let nn = fetch_word(address_space, r);
            if condition_met(r, opcode) {
                push_stack(address_space, r, r.pc);
                r.pc = nn;
                24
            } else {
                12
            }
        }
        // PUSH rr
        0xC5 | 0xD5 | 0xE5 | 0xF5 => {
            push_stack(address_space, r, read_pair_af(r, opcode));
            16
        }
        // RST n
        0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => {
            push_stack(address_space, r, r.pc);
            r.pc = u16::from(opcode & 0x38);
            16
        }
        // RET
        0xC9 => {
            r.pc = pop_stack(address_space, r);
            16
        }
        // Bit-operation page
        0xCB => execute_cb_opcode(address_space, r),
        // CALL nn
        0xCD => {
            let nn = fetch_word(address_space, r);
            push_stack(address_space, r, r.pc);
            r.pc = nn;
            24
        }
        // RETI re-enables the master flag with no delay
        0xD9 => {
            r.pc = pop_stack(address_space, r);
            r.ime = true;
            16
        }
        // LDH (n), A / LDH A, (n)
        0xE0 => {
            let n = fetch_byte(address_space, r);
            address_space.write_byte(u16::from_be_bytes([0xFF, n]), r.a);
            12
        }
        0xF0 => {
            let n = fetch_byte(address_space, r);
            r.a = address_space.read_byte(u16::from_be_bytes([0xFF, n]));
            12
        }
        // LD (FF00+C), A / LD A, (FF00+C)
        0xE2 => {
            address_space.write_byte(u16::from_be_bytes([0xFF, r.c]), r.a);
            8
        }
        0xF2 => {
            r.a = address_space.read_byte(u16::from_be_bytes([0xFF, r.c]));
            8
        }
        // ADD SP, e
        0xE8 => {
            let e = fetch_byte(address_space, r) as i8;
            let (result, h, c) = add_sp_offset(r.sp, e);
            r.sp = result;
            r.set_flags(false, false, h, c);
            16
        }
        // JP HL
        0xE9 => {
            r.pc = r.hl();
            4
        }
        // LD (nn), A / LD A, (nn)
        0xEA => {
            let nn = fetch_word(address_space, r);
            address_space.write_byte(nn, r.a);
            16
        }
        0xFA => {
            let nn = fetch_word(address_space, r);
            r.a = address_space.read_byte(nn);
            16
        }
        // DI / EI, both deferred by one instruction
        0xF3 => {
            r.ime_state = ImeState::WaitOff;
            4
        }
        0xFB => {
            r.ime_state = ImeState::WaitOn;
            4
        }
        // LD HL, SP+e
        0xF8 => {
            let e = fetch_byte(address_space, r) as i8;
            let (result, h, c) = add_sp_offset(r.sp, e);
            r.set_hl(result);
            r.set_flags(false, false, h, c);
            12
        }
        // LD SP, HL
        0xF9 => {
            r.sp = r.hl();
            8
        }
        0xD3 | 0xDB | 0xDD | 0xE3 | 0xE4 | 0xEB | 0xEC | 0xED | 0xF4 | 0xFC | 0xFD => {
            return Err(ExecuteError::UnimplementedOpcode {
                opcode,
                pc: opcode_pc,
            });
        }
    };

    Ok(cycles)
}

/// Register code used in the low/mid opcode bits for the memory operand (HL).
const INDIRECT_HL_CODE: u8 = 0x06;

fn execute_cb_opcode(address_space: &mut AddressSpace, r: &mut CpuRegisters) -> u32 {
    let opcode = fetch_byte(address_space, r);
    let code = opcode & 0x07;

    match opcode {
        // Rotates and shifts; Z is set from the result for all of them
        0x00..=0x3F => {
            let value = read_r8(code, r, address_space);
            let (result, carry) = match opcode {
                0x00..=0x07 => rotate_left(value),
                0x08..=0x0F => rotate_right(value),
                0x10..=0x17 => rotate_left_thru_carry(value, r.c_flag()),
                0x18..=0x1F => rotate_right_thru_carry(value, r.c_flag()),
                0x20..=0x27 => shift_left(value),
                0x28..=0x2F => shift_right_arithmetic(value),
                0x30..=0x37 => (swap_nibbles(value), false),
                _ => shift_right_logical(value),
            };
            write_r8(code, result, r, address_space);
            r.set_flags(result == 0, false, false, carry);
        }
        // BIT b
        0x40..=0x7F => {
            let bit = (opcode >> 3) & 0x07;
            let value = read_r8(code, r, address_space);
            r.set_z_flag(value & (1 << bit) == 0);
            r.set_n_flag(false);
            r.set_h_flag(true);
        }
        // RES b
        0x80..=0xBF => {
            let bit = (opcode >> 3) & 0x07;
            let value = read_r8(code, r, address_space);
            write_r8(code, value & !(1 << bit), r, address_space);
        }
        // SET b
        0xC0..=0xFF => {
            let bit = (opcode >> 3) & 0x07;
            let value = read_r8(code, r, address_space);
            write_r8(code, value | (1 << bit), r, address_space);
        }
    }

    match (opcode, code) {
        (_, 0x00..=0x05 | 0x07) => 8,
        // BIT (HL) only reads the operand
        (0x40..=0x7F, _) => 12,
        _ => 16,
    }
}

fn fetch_byte(address_space: &AddressSpace, r: &mut CpuRegisters) -> u8 {
    let byte = address_space.read_byte(r.pc);
    r.pc = r.pc.wrapping_add(1);
    byte
}

fn fetch_word(address_space: &AddressSpace, r: &mut CpuRegisters) -> u16 {
    let lsb = fetch_byte(address_space, r);
    let msb = fetch_byte(address_space, r);
    u16::from_le_bytes([lsb, msb])
}

fn read_r8(code: u8, r: &CpuRegisters, address_space: &AddressSpace) -> u8 {
    match code {
        0x00 => r.b,
        0x01 => r.c,
        0x02 => r.d,
        0x03 => r.e,
        0x04 => r.h,
        0x05 => r.l,
        0x06 => address_space.read_byte(r.hl()),
        _ => r.a,
    }
}

fn write_r8(code: u8, value: u8, r: &mut CpuRegisters, address_space: &mut AddressSpace) {
    match code {
        0x00 => r.b = value,
        0x01 => r.c = value,
        0x02 => r.d = value,
        0x03 => r.e = value,
        0x04 => r.h = value,
        0x05 => r.l = value,
        0x06 => address_space.write_byte(r.hl(), value),
        _ => r.a = value,
    }
}

/// Register pair selection for opcodes whose bits 4-5 encode BC/DE/HL/SP.
fn read_pair_sp(r: &CpuRegisters, opcode: u8) -> u16 {
    match opcode & 0x30 {
        0x00 => r.bc(),
        0x10 => r.de(),
        0x20 => r.hl(),
        _ => r.sp,
    }
}

fn write_pair_sp(r: &mut CpuRegisters, opcode: u8, value: u16) {
    match opcode & 0x30 {
        0x00 => r.set_bc(value),
        0x10 => r.set_de(value),
        0x20 => r.set_hl(value),
        _ => r.sp = value,
    }
}

/// Register pair selection for PUSH/POP, where 0x30 selects AF instead of SP.
fn read_pair_af(r: &CpuRegisters, opcode: u8) -> u16 {
    match opcode & 0x30 {
        0x00 => r.bc(),
        0x10 => r.de(),
        0x20 => r.hl(),
        _ => r.af(),
    }
}

fn write_pair_af(r: &mut CpuRegisters, opcode: u8, value: u16) {
    match opcode & 0x30 {
        0x00 => r.set_bc(value),
        0x10 => r.set_de(value),
        0x20 => r.set_hl(value),
        _ => r.set_af(value),
    }
}

/// Branch condition encoded in bits 3-4: NZ/Z/NC/C.
fn condition_met(r: &CpuRegisters, opcode: u8) -> bool {
    match opcode & 0x18 {
        0x00 => !r.z_flag(),
        0x08 => r.z_flag(),
        0x10 => !r.c_flag(),
        _ => r.c_flag(),
    }
}

pub(crate) fn push_stack(address_space: &mut AddressSpace, r: &mut CpuRegisters, value: u16) {
    r.sp = r.sp.wrapping_sub(2);
    address_space.write_word(r.sp, value);
}

fn pop_stack(address_space: &AddressSpace, r: &mut CpuRegisters) -> u16 {
    let value = address_space.read_word(r.sp);
    r.sp = r.sp.wrapping_add(2);
    value
}

fn alu_operation(r: &mut CpuRegisters, op: u8, value: u8) {
    match op {
        0x00 => add_to_accumulator(r, value, false),
        0x01 => add_to_accumulator(r, value, r.c_flag()),
        0x02 => subtract_from_accumulator(r, value, false, true),
        0x03 => subtract_from_accumulator(r, value, r.c_flag(), true),
        0x04 => {
            r.a &= value;
            r.set_flags(r.a == 0, false, true, false);
        }
        0x05 => {
            r.a ^= value;
            r.set_flags(r.a == 0, false, false, false);
        }
        0x06 => {
            r.a |= value;
            r.set_flags(r.a == 0, false, false, false);
        }
        // CP discards the result
        _ => subtract_from_accumulator(r, value, false, false),
    }
}

fn add_to_accumulator(r: &mut CpuRegisters, value: u8, carry_in: bool) {
    let carry = u8::from(carry_in);
    let result = r.a.wrapping_add(value).wrapping_add(carry);
    let h = (r.a & 0x0F) + (value & 0x0F) + carry >= 0x10;
    let c = u16::from(r.a) + u16::from(value) + u16::from(carry) >= 0x100;
    r.a = result;
    r.set_flags(result == 0, false, h, c);
}

fn subtract_from_accumulator(r: &mut CpuRegisters, value: u8, carry_in: bool, store: bool) {
    let carry = u8::from(carry_in);
    let result = r.a.wrapping_sub(value).wrapping_sub(carry);
    let h = r.a & 0x0F < (value & 0x0F) + carry;
    let c = u16::from(r.a) < u16::from(value) + u16::from(carry);
    if store {
        r.a = result;
    }
    r.set_flags(result == 0, true, h, c);
}

fn rotate_left(value: u8) -> (u8, bool) {
    let high_bit_set = value & 0x80 != 0;
    ((value << 1) | u8::from(high_bit_set), high_bit_set)
}

fn rotate_left_thru_carry(value: u8, carry: bool) -> (u8, bool) {
    ((value << 1) | u8::from(carry), value & 0x80 != 0)
}

fn rotate_right(value: u8) -> (u8, bool) {
    let low_bit_set = value & 0x01 != 0;
    ((value >> 1) | (u8::from(low_bit_set) << 7), low_bit_set)
}

fn rotate_right_thru_carry(value: u8, carry: bool) -> (u8, bool) {
    ((value >> 1) | (u8::from(carry) << 7), value & 0x01 != 0)
}

fn shift_left(value: u8) -> (u8, bool) {
    (value << 1, value & 0x80 != 0)
}

fn shift_right_arithmetic(value: u8) -> (u8, bool) {
    ((value >> 1) | (value & 0x80), value & 0x01 != 0)
}

fn shift_right_logical(value: u8) -> (u8, bool) {
    (value >> 1, value & 0x01 != 0)
}

fn swap_nibbles(value: u8) -> u8 {
    (value >> 4) | (value << 4)
}

/// BCD correction of A after an addition or subtraction, driven by the N, H
/// and C flags the arithmetic left behind.
fn decimal_adjust_accumulator(r: &mut CpuRegisters) {
    if r.n_flag() {
        let mut value = r.a;
        if r.h_flag() {
            value = value.wrapping_sub(0x06);
        }
        if r.c_flag() {
            value = value.wrapping_sub(0x60);
        }
        r.a = value;
        r.set_z_flag(value == 0);
        r.set_h_flag(false);
    } else {
        let mut value = r.a;
        let mut carry = false;
        if value > 0x99 || r.c_flag() {
            value = value.wrapping_add(0x60);
            carry = true;
        }
        if value & 0x0F >= 0x0A || r.h_flag() {
            value = value.wrapping_add(0x06);
        }
        r.a = value;
        r.set_z_flag(value == 0);
        r.set_h_flag(false);
        r.set_c_flag(carry);
    }
}

/// 16-bit stack-pointer offset addition used by ADD SP,e and LD HL,SP+e.
/// Half-carry comes from bit 3 and carry from bit 7 of `sp ^ e ^ result`,
/// which handles negative offsets uniformly.
fn add_sp_offset(sp: u16, offset: i8) -> (u16, bool, bool) {
    let offset = offset as u16;
    let result = sp.wrapping_add(offset);
    let changed = sp ^ offset ^ result;
    (result, changed & 0x0010 != 0, changed & 0x0100 != 0)
}
