use crate::config::InputConfig;
use crate::memory::ioregisters::{IoRegister, IoRegisters};
use sdl2::keyboard::Keycode;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Button {
    Up,
    Down,
    Left,
    Right,
    A,
    B,
    Start,
    Select,
}

#[derive(Error, Debug)]
pub enum KeyMapError {
    #[error("invalid keycode in input config: {keycode}")]
    InvalidKeycode { keycode: String },
    #[error("keycode used for multiple buttons: {keycode}")]
    DuplicateKeycode { keycode: String },
}

fn try_parse_keycode(s: &str) -> Result<Keycode, KeyMapError> {
    Keycode::from_name(s).ok_or_else(|| KeyMapError::InvalidKeycode { keycode: s.into() })
}

macro_rules! build_key_map {
    ($($config_field:expr => $button:expr),+$(,)?) => {
        {
            let mut map = HashMap::new();

            $(
                let keycode = try_parse_keycode(&$config_field)?;
                if map.insert(keycode, $button).is_some() {
                    return Err(KeyMapError::DuplicateKeycode { keycode: keycode.name() });
                }
            )*

            map
        }
    }
}

#[derive(Debug, Clone)]
pub struct KeyMap(HashMap<Keycode, Button>);

impl KeyMap {
    pub fn from_config(input_config: &InputConfig) -> Result<Self, KeyMapError> {
        let map = build_key_map!(
            input_config.up => Button::Up,
            input_config.down => Button::Down,
            input_config.left => Button::Left,
            input_config.right => Button::Right,
            input_config.a => Button::A,
            input_config.b => Button::B,
            input_config.start => Button::Start,
            input_config.select => Button::Select,
        );

        Ok(Self(map))
    }
}

/// Live state of the eight joypad lines; true means pressed.
#[derive(Debug, Clone)]
pub struct JoypadState {
    up: bool,
    down: bool,
    left: bool,
    right: bool,
    a: bool,
    b: bool,
    start: bool,
    select: bool,
}

impl JoypadState {
    pub fn new() -> Self {
        Self {
            up: false,
            down: false,
            left: false,
            right: false,
            a: false,
            b: false,
            start: false,
            select: false,
        }
    }

    fn field_mut(&mut self, button: Button) -> &mut bool {
        match button {
            Button::Up => &mut self.up,
            Button::Down => &mut self.down,
            Button::Left => &mut self.left,
            Button::Right => &mut self.right,
            Button::A => &mut self.a,
            Button::B => &mut self.b,
            Button::Start => &mut self.start,
            Button::Select => &mut self.select,
        }
    }

    /// Record a key press. Returns true when a mapped button went from
    /// released to pressed, which is when the Joypad interrupt fires and a
    /// stopped CPU resumes.
    pub fn key_down(&mut self, keycode: Keycode, key_map: &KeyMap) -> bool {
        let Some(&button) = key_map.0.get(&keycode) else {
            return false;
        };

        let field = self.field_mut(button);
        let newly_pressed = !*field;
        *field = true;

        log::debug!("Key pressed: {keycode}, current state: {self:?}");
        newly_pressed
    }

    pub fn key_up(&mut self, keycode: Keycode, key_map: &KeyMap) {
        if let Some(&button) = key_map.0.get(&keycode) {
            *self.field_mut(button) = false;
        }
        log::debug!("Key released: {keycode}, current state: {self:?}");
    }
}

/// Recompute the JOYP low nibble from the current key state and selector
/// bits. The top two bits always read 1, and a pressed key reads 0. With
/// neither selector active the low nibble reads all 1s.
pub fn update_joyp_register(joypad_state: &JoypadState, io_registers: &mut IoRegisters) {
    let joyp = io_registers.read_register(IoRegister::JOYP);
    let mut value = 0xC0 | (joyp & 0x30);

    if joyp & 0x20 == 0 {
        value |= u8::from(!joypad_state.a)
            | (u8::from(!joypad_state.b) << 1)
            | (u8::from(!joypad_state.select) << 2)
            | (u8::from(!joypad_state.start) << 3);
    } else if joyp & 0x10 == 0 {
        value |= u8::from(!joypad_state.right)
            | (u8::from(!joypad_state.left) << 1)
            | (u8::from(!joypad_state.up) << 2)
            | (u8::from(!joypad_state.down) << 3);
    } else {
        value |= 0x0F;
    }

    io_registers.privileged_write(IoRegister::JOYP, value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::addresses;

    fn default_key_map() -> KeyMap {
        KeyMap::from_config(&InputConfig::default()).unwrap()
    }

    #[test]
    fn buttons_selected() {
        let mut io_registers = IoRegisters::new();
        let mut joypad_state = JoypadState::new();
        let key_map = default_key_map();

        // Select the button group
        io_registers.write_address(addresses::JOYP_REGISTER, 0x10);

        joypad_state.key_down(Keycode::Z, &key_map);
        joypad_state.key_down(Keycode::Return, &key_map);
        update_joyp_register(&joypad_state, &mut io_registers);

        // A (bit 0) and Start (bit 3) read low
        assert_eq!(0xD6, io_registers.read_register(IoRegister::JOYP));
    }

    #[test]
    fn directions_selected() {
        let mut io_registers = IoRegisters::new();
        let mut joypad_state = JoypadState::new();
        let key_map = default_key_map();

        io_registers.write_address(addresses::JOYP_REGISTER, 0x20);

        joypad_state.key_down(Keycode::Left, &key_map);
        update_joyp_register(&joypad_state, &mut io_registers);

        assert_eq!(0xED, io_registers.read_register(IoRegister::JOYP));
    }

    #[test]
    fn nothing_selected_reads_high() {
        let mut io_registers = IoRegisters::new();
        let mut joypad_state = JoypadState::new();
        let key_map = default_key_map();

        io_registers.write_address(addresses::JOYP_REGISTER, 0x30);

        joypad_state.key_down(Keycode::Z, &key_map);
        joypad_state.key_down(Keycode::Left, &key_map);
        update_joyp_register(&joypad_state, &mut io_registers);

        assert_eq!(0xFF, io_registers.read_register(IoRegister::JOYP));
    }

    #[test]
    fn key_down_reports_new_presses_only() {
        let mut joypad_state = JoypadState::new();
        let key_map = default_key_map();

        assert!(joypad_state.key_down(Keycode::X, &key_map));
        assert!(!joypad_state.key_down(Keycode::X, &key_map));

        joypad_state.key_up(Keycode::X, &key_map);
        assert!(joypad_state.key_down(Keycode::X, &key_map));

        // Unmapped keys never report a press
        assert!(!joypad_state.key_down(Keycode::F1, &key_map));
    }
}
