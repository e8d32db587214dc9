use crate::cpu::{self, ExecuteError, InterruptType};
use crate::graphics::{self, GraphicsError};
use crate::input::{self, JoypadState, KeyMap, KeyMapError};
use crate::ppu::{self, PpuMode};
use crate::startup::{EmulationState, SdlState};
use crate::timer::{self, TimerCounter};
use crate::RunConfig;
use sdl2::event::Event;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunError {
    #[error("CPU execution error: {source}")]
    Execution {
        #[from]
        source: ExecuteError,
    },
    #[error("rendering error: {source}")]
    Rendering {
        #[from]
        source: GraphicsError,
    },
    #[error("error processing input config: {source}")]
    InputConfig {
        #[from]
        source: KeyMapError,
    },
}

// One 70224-cycle frame at the 4.194304 MHz machine clock, i.e. ~59.73 Hz
const FRAME_DURATION: Duration = Duration::from_nanos(70224 * 1_000_000_000 / 4_194_304);

/// Run the emulator until the window is closed or an error occurs.
///
/// Each iteration executes exactly one CPU instruction and feeds the elapsed
/// cycles to the timer and the PPU. Host work (presenting the frame, pumping
/// events, pacing to the LCD refresh rate) happens once per frame, when the
/// PPU enters VBlank.
pub fn run(
    emulation_state: EmulationState,
    sdl_state: SdlState,
    run_config: &RunConfig,
) -> Result<(), RunError> {
    log::info!("Running with config:\n{run_config}");

    let EmulationState {
        mut address_space,
        mut cpu_registers,
        mut ppu_state,
    } = emulation_state;

    // The subsystem handles stay alive until the function returns
    let SdlState {
        mut canvas,
        mut event_pump,
        ..
    } = sdl_state;

    let texture_creator = canvas.texture_creator();
    let mut texture = graphics::create_frame_texture(&texture_creator)?;

    let key_map = KeyMap::from_config(&run_config.input_config)?;
    let mut joypad_state = JoypadState::new();
    let mut timer_counter = TimerCounter::new();

    let mut frame_start = Instant::now();

    loop {
        input::update_joyp_register(&joypad_state, address_space.io_registers_mut());

        let cycles = cpu::step(&mut address_space, &mut cpu_registers)?;

        timer::tick(address_space.io_registers_mut(), &mut timer_counter, cycles);

        let prev_mode = ppu_state.mode();
        ppu::tick(&mut ppu_state, &mut address_space, cycles);

        // The frame is complete once the PPU enters VBlank
        if prev_mode != PpuMode::VBlank && ppu_state.mode() == PpuMode::VBlank {
            graphics::render_frame(&ppu_state, &mut canvas, &mut texture, run_config)?;

            for event in event_pump.poll_iter() {
                log::debug!("Received SDL event: {event:?}");
                match event {
                    Event::Quit { .. } => {
                        log::info!("Quit event received, exiting main loop");
                        return Ok(());
                    }
                    Event::KeyDown {
                        keycode: Some(keycode),
                        repeat: false,
                        ..
                    } => {
                        if joypad_state.key_down(keycode, &key_map) {
                            address_space
                                .io_registers_mut()
                                .request_interrupt(InterruptType::Joypad);
                            // Any key press ends STOP
                            cpu_registers.stopped = false;
                        }
                    }
                    Event::KeyUp {
                        keycode: Some(keycode),
                        ..
                    } => {
                        joypad_state.key_up(keycode, &key_map);
                    }
                    _ => {}
                }
            }

            let elapsed = frame_start.elapsed();
            if elapsed < FRAME_DURATION {
                thread::sleep(FRAME_DURATION - elapsed);
            }
            frame_start = Instant::now();
        }
    }
}
