use crate::ppu::{self, FrameBuffer, PpuState};
use crate::RunConfig;
use sdl2::pixels::{Color, PixelFormatEnum};
use sdl2::rect::Rect;
use sdl2::render::{Texture, TextureCreator, TextureValueError, WindowCanvas};
use sdl2::video::{FullscreenType, Window, WindowContext};
use sdl2::IntegerOrSdlError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphicsError {
    #[error("error setting fullscreen mode: {msg}")]
    Fullscreen { msg: String },
    #[error("error creating renderer: {source}")]
    CreateRenderer {
        #[from]
        source: IntegerOrSdlError,
    },
    #[error("error creating frame texture: {source}")]
    CreateTexture {
        #[from]
        source: TextureValueError,
    },
    #[error("error updating frame texture: {msg}")]
    Texture { msg: String },
    #[error("error copying frame texture to renderer: {msg}")]
    CopyToCanvas { msg: String },
}

// The four LCD shades, lightest to darkest
const GB_SHADE_TO_RGB: [[u8; 3]; 4] = [[255, 255, 255], [128, 128, 128], [64, 64, 64], [0, 0, 0]];

/// Create an SDL2 renderer from the given window, optionally with VSync, with
/// the display area initialized to all white pixels.
pub fn create_renderer(
    mut window: Window,
    run_config: &RunConfig,
) -> Result<WindowCanvas, GraphicsError> {
    if run_config.launch_fullscreen {
        window
            .set_fullscreen(FullscreenType::Desktop)
            .map_err(|msg| GraphicsError::Fullscreen { msg })?;
    }

    let mut canvas_builder = window.into_canvas();
    if run_config.vsync_enabled {
        canvas_builder = canvas_builder.present_vsync();
    }

    let mut canvas = canvas_builder.build()?;

    canvas.set_draw_color(Color::RGB(255, 255, 255));
    canvas.clear();
    canvas.present();

    Ok(canvas)
}

pub fn create_frame_texture(
    texture_creator: &TextureCreator<WindowContext>,
) -> Result<Texture<'_>, GraphicsError> {
    let texture = texture_creator.create_texture_streaming(
        PixelFormatEnum::RGB24,
        ppu::SCREEN_WIDTH as u32,
        ppu::SCREEN_HEIGHT as u32,
    )?;
    Ok(texture)
}

fn frame_texture_updater(frame_buffer: &FrameBuffer) -> impl FnOnce(&mut [u8], usize) + '_ {
    move |pixels, pitch| {
        for (row, scanline) in frame_buffer.iter().enumerate() {
            for (col, shade) in scanline.iter().copied().enumerate() {
                let start = row * pitch + 3 * col;
                pixels[start..start + 3].copy_from_slice(&GB_SHADE_TO_RGB[usize::from(shade)]);
            }
        }
    }
}

/// Render the current frame to the window, overwriting all previously
/// displayed data. With VSync enabled this blocks until the next refresh.
pub fn render_frame(
    ppu_state: &PpuState,
    canvas: &mut WindowCanvas,
    texture: &mut Texture<'_>,
    run_config: &RunConfig,
) -> Result<(), GraphicsError> {
    texture
        .with_lock(None, frame_texture_updater(ppu_state.frame_buffer()))
        .map_err(|msg| GraphicsError::Texture { msg })?;

    let dst_rect = if run_config.force_integer_scaling {
        let (w, h) = canvas.window().size();
        determine_integer_scale_rect(w, h)
    } else {
        None
    };

    canvas.set_draw_color(Color::RGB(0, 0, 0));
    canvas.clear();
    canvas
        .copy(texture, None, dst_rect)
        .map_err(|msg| GraphicsError::CopyToCanvas { msg })?;
    canvas.present();

    Ok(())
}

fn determine_integer_scale_rect(w: u32, h: u32) -> Option<Rect> {
    let screen_width = ppu::SCREEN_WIDTH as u32;
    let screen_height = ppu::SCREEN_HEIGHT as u32;

    let scale = (1..)
        .take_while(|&scale| scale * screen_width <= w && scale * screen_height <= h)
        .last()?;

    let scaled_width = scale * screen_width;
    let scaled_height = scale * screen_height;
    Some(Rect::new(
        ((w - scaled_width) / 2) as i32,
        ((h - scaled_height) / 2) as i32,
        scaled_width,
        scaled_height,
    ))
}
