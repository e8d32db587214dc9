use crate::cpu::InterruptType;
use crate::memory::ioregisters::{IoRegister, IoRegisters};

const DIV_PERIOD: u64 = 256;

/// Cycle accumulators for the divider and timer registers. Both accumulate
/// every cycle the CPU reports; TIMA only consumes its accumulator while TAC
/// has the timer enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerCounter {
    div_cycles: u64,
    timer_cycles: u64,
}

impl TimerCounter {
    pub fn new() -> Self {
        Self {
            div_cycles: 0,
            timer_cycles: 0,
        }
    }
}

fn tima_period(timer_control: u8) -> u64 {
    match timer_control & 0x03 {
        0x00 => 1024,
        0x01 => 16,
        0x02 => 64,
        _ => 256,
    }
}

/// Advance DIV and TIMA by the given number of clock cycles.
///
/// DIV increments every 256 cycles unconditionally. When TAC bit 2 is set,
/// TIMA increments at the TAC-selected rate; overflowing from 0xFF reloads it
/// from TMA and requests the Timer interrupt.
pub fn tick(io_registers: &mut IoRegisters, counter: &mut TimerCounter, cycles: u32) {
    counter.div_cycles += u64::from(cycles);
    while counter.div_cycles >= DIV_PERIOD {
        counter.div_cycles -= DIV_PERIOD;
        let div = io_registers.read_register(IoRegister::DIV);
        io_registers.privileged_write(IoRegister::DIV, div.wrapping_add(1));
    }

    counter.timer_cycles += u64::from(cycles);

    let timer_control = io_registers.read_register(IoRegister::TAC);
    if timer_control & 0x04 == 0 {
        return;
    }

    let period = tima_period(timer_control);
    while counter.timer_cycles >= period {
        counter.timer_cycles -= period;

        let tima = io_registers.read_register(IoRegister::TIMA);
        match tima.overflowing_add(1) {
            (new_tima, false) => {
                io_registers.privileged_write(IoRegister::TIMA, new_tima);
            }
            (_, true) => {
                let modulo = io_registers.read_register(IoRegister::TMA);
                io_registers.privileged_write(IoRegister::TIMA, modulo);
                io_registers.request_interrupt(InterruptType::Timer);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn divider_increments_every_256_cycles() {
        let mut io_registers = IoRegisters::new();
        let mut counter = TimerCounter::new();

        tick(&mut io_registers, &mut counter, 255);
        assert_eq!(0x00, io_registers.read_register(IoRegister::DIV));

        tick(&mut io_registers, &mut counter, 1);
        assert_eq!(0x01, io_registers.read_register(IoRegister::DIV));

        tick(&mut io_registers, &mut counter, 256 * 5);
        assert_eq!(0x06, io_registers.read_register(IoRegister::DIV));
    }

    #[test]
    fn divider_wraps() {
        let mut io_registers = IoRegisters::new();
        let mut counter = TimerCounter::new();

        io_registers.privileged_write(IoRegister::DIV, 0xFF);
        tick(&mut io_registers, &mut counter, 256);
        assert_eq!(0x00, io_registers.read_register(IoRegister::DIV));
    }

    #[test]
    fn tima_counts_at_selected_rate() {
        let mut io_registers = IoRegisters::new();
        let mut counter = TimerCounter::new();

        // Timer on, one increment per 16 cycles
        io_registers.privileged_write(IoRegister::TAC, 0x05);

        // 300 cycles at 4 cycles per step: floor(300 / 16) increments
        for _ in 0..75 {
            tick(&mut io_registers, &mut counter, 4);
        }
        assert_eq!(18, io_registers.read_register(IoRegister::TIMA));
    }

    #[test]
    fn tima_disabled_does_not_count() {
        let mut io_registers = IoRegisters::new();
        let mut counter = TimerCounter::new();

        io_registers.privileged_write(IoRegister::TAC, 0x01);
        tick(&mut io_registers, &mut counter, 1024);
        assert_eq!(0x00, io_registers.read_register(IoRegister::TIMA));
    }

    #[test]
    fn tima_overflow_reloads_modulo_and_requests_interrupt() {
        let mut io_registers = IoRegisters::new();
        let mut counter = TimerCounter::new();

        io_registers.privileged_write(IoRegister::IF, 0x00);
        io_registers.privileged_write(IoRegister::TAC, 0x05);
        io_registers.privileged_write(IoRegister::TIMA, 0xFE);
        io_registers.privileged_write(IoRegister::TMA, 0x78);

        tick(&mut io_registers, &mut counter, 16);
        assert_eq!(0xFF, io_registers.read_register(IoRegister::TIMA));
        assert_eq!(0x00, io_registers.read_register(IoRegister::IF) & 0x04);

        tick(&mut io_registers, &mut counter, 16);
        assert_eq!(0x78, io_registers.read_register(IoRegister::TIMA));
        assert_eq!(0x04, io_registers.read_register(IoRegister::IF) & 0x04);
    }

    #[test]
    fn tima_rate_change() {
        let mut io_registers = IoRegisters::new();
        let mut counter = TimerCounter::new();

        io_registers.privileged_write(IoRegister::TAC, 0x06);
        tick(&mut io_registers, &mut counter, 64);
        assert_eq!(0x01, io_registers.read_register(IoRegister::TIMA));

        io_registers.privileged_write(IoRegister::TAC, 0x07);
        tick(&mut io_registers, &mut counter, 256);
        assert_eq!(0x02, io_registers.read_register(IoRegister::TIMA));
    }
}
