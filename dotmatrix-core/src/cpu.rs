pub(crate) mod instructions;
mod registers;

#[cfg(test)]
mod tests;

use crate::memory::AddressSpace;

pub use instructions::ExecuteError;
pub use registers::{CpuRegisters, ImeState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptType {
    VBlank,
    LcdStatus,
    Timer,
    Serial,
    Joypad,
}

impl InterruptType {
    /// All interrupt sources, highest priority first.
    pub const PRIORITY_ORDER: [Self; 5] = [
        Self::VBlank,
        Self::LcdStatus,
        Self::Timer,
        Self::Serial,
        Self::Joypad,
    ];

    pub fn handler_address(self) -> u16 {
        match self {
            Self::VBlank => 0x0040,
            Self::LcdStatus => 0x0048,
            Self::Timer => 0x0050,
            Self::Serial => 0x0058,
            Self::Joypad => 0x0060,
        }
    }

    /// Bit of this source in the IF and IE registers.
    pub fn bit_mask(self) -> u8 {
        match self {
            Self::VBlank => 0x01,
            Self::LcdStatus => 0x02,
            Self::Timer => 0x04,
            Self::Serial => 0x08,
            Self::Joypad => 0x10,
        }
    }
}

/// Run the CPU for one instruction and return the elapsed clock cycles.
///
/// The prologue first advances the deferred IME state, then dispatches a
/// pending interrupt if the master flag allows it; the instruction at the
/// (possibly redirected) PC executes afterwards in the same step. A halted or
/// stopped CPU burns 4 cycles per step without fetching; HALT ends when an
/// interrupt becomes pending and STOP ends when the host reports a key press.
pub fn step(
    address_space: &mut AddressSpace,
    registers: &mut CpuRegisters,
) -> Result<u32, ExecuteError> {
    if registers.stopped {
        return Ok(4);
    }

    registers.tick_ime_state();
    service_pending_interrupt(address_space, registers);

    if registers.halted {
        return Ok(4);
    }

    instructions::execute_next(address_space, registers)
}

fn service_pending_interrupt(address_space: &mut AddressSpace, registers: &mut CpuRegisters) {
    let pending = address_space.io_registers().pending_interrupts();
    if pending == 0 {
        return;
    }

    if !registers.ime {
        // A pending interrupt ends HALT even when it cannot be dispatched
        registers.halted = false;
        return;
    }

    for interrupt in InterruptType::PRIORITY_ORDER {
        if pending & interrupt.bit_mask() != 0 {
            log::trace!("Dispatching {interrupt:?} interrupt at PC {:04X}", registers.pc);

            address_space.io_registers_mut().clear_interrupt_flag(interrupt);
            registers.ime = false;
            registers.halted = false;

            let return_address = registers.pc;
            instructions::push_stack(address_space, registers, return_address);
            registers.pc = interrupt.handler_address();
            return;
        }
    }
}
