use super::{hash_map, run_test, ExpectedState};

#[test]
fn register_to_register() {
    // LD B, 0x3F; LD C, B
    run_test(
        "063F48",
        &ExpectedState {
            b: Some(0x3F),
            c: Some(0x3F),
            f: Some(0xB0),
            ..ExpectedState::empty()
        },
    );

    // LD D, 0x77; LD E, D; LD D, E
    run_test(
        "16775A53",
        &ExpectedState {
            d: Some(0x77),
            e: Some(0x77),
            ..ExpectedState::empty()
        },
    );
}

#[test]
fn indirect_hl() {
    // LD HL, 0xC0B0; LD A, 0x77; LD (HL), A; LD B, (HL)
    run_test(
        "21B0C03E777746",
        &ExpectedState {
            a: Some(0x77),
            b: Some(0x77),
            memory: hash_map! { 0xC0B0: 0x77 },
            ..ExpectedState::empty()
        },
    );
}

#[test]
fn indirect_bc() {
    // LD BC, 0xC03A; LD A, 0x99; LD (BC), A; LD A, 0x00; LD A, (BC)
    run_test(
        "013AC03E99023E000A",
        &ExpectedState {
            a: Some(0x99),
            memory: hash_map! { 0xC03A: 0x99 },
            ..ExpectedState::empty()
        },
    );
}

#[test]
fn hl_increment_and_decrement() {
    // LD HL, 0xC000; LD A, 0x11; LD (HL+), A; LD (HL+), A; LD (HL-), A
    run_test(
        "2100C03E11222232",
        &ExpectedState {
            h: Some(0xC0),
            l: Some(0x01),
            memory: hash_map! { 0xC000: 0x11, 0xC001: 0x11, 0xC002: 0x11 },
            ..ExpectedState::empty()
        },
    );
}

#[test]
fn push_pop_round_trip() {
    // LD BC, 0x1234; PUSH BC; LD HL, 0x0000; POP HL
    run_test(
        "013412C5210000E1",
        &ExpectedState {
            b: Some(0x12),
            c: Some(0x34),
            h: Some(0x12),
            l: Some(0x34),
            sp: Some(0xFFFE),
            ..ExpectedState::empty()
        },
    );
}

#[test]
fn pop_af_masks_low_flag_bits() {
    // LD B, 0x12; LD C, 0x34; PUSH BC; POP AF
    run_test(
        "06120E34C5F1",
        &ExpectedState {
            a: Some(0x12),
            f: Some(0x30),
            sp: Some(0xFFFE),
            ..ExpectedState::empty()
        },
    );
}

#[test]
fn push_af() {
    // XOR A; PUSH AF; POP BC
    run_test(
        "AFF5C1",
        &ExpectedState {
            b: Some(0x00),
            c: Some(0x80),
            ..ExpectedState::empty()
        },
    );
}

#[test]
fn ldh_direct() {
    // LD A, 0x77; LDH (0x80), A; LD A, 0x00; LDH A, (0x80)
    run_test(
        "3E77E0803E00F080",
        &ExpectedState {
            a: Some(0x77),
            memory: hash_map! { 0xFF80: 0x77 },
            ..ExpectedState::empty()
        },
    );
}

#[test]
fn ldh_indirect_c() {
    // LD C, 0x81; LD A, 0x5D; LD (FF00+C), A
    run_test(
        "0E813E5DE2",
        &ExpectedState {
            memory: hash_map! { 0xFF81: 0x5D },
            ..ExpectedState::empty()
        },
    );
}

#[test]
fn direct_address() {
    // LD A, 0x42; LD (0xC123), A; LD A, 0x00; LD A, (0xC123)
    run_test(
        "3E42EA23C13E00FA23C1",
        &ExpectedState {
            a: Some(0x42),
            memory: hash_map! { 0xC123: 0x42 },
            ..ExpectedState::empty()
        },
    );
}

#[test]
fn store_stack_pointer() {
    // LD SP, 0xCAFE; LD (0xC200), SP
    run_test(
        "31FECA0800C2",
        &ExpectedState {
            sp: Some(0xCAFE),
            memory: hash_map! { 0xC200: 0xFE, 0xC201: 0xCA },
            ..ExpectedState::empty()
        },
    );
}

#[test]
fn hl_from_stack_pointer() {
    // LD SP, 0xC000; LD HL, SP+0x10; LD SP, HL
    run_test(
        "3100C0F810F9",
        &ExpectedState {
            h: Some(0xC0),
            l: Some(0x10),
            sp: Some(0xC010),
            f: Some(0x00),
            ..ExpectedState::empty()
        },
    );
}
