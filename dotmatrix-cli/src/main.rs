use clap::Parser;
use dotmatrix_core::{InputConfig, RunConfig};
use std::error::Error;

#[derive(Parser)]
struct Cli {
    /// Path to the Game Boy ROM file to run
    #[arg(short = 'f', long = "gb-file-path")]
    gb_file_path: String,
    #[arg(long = "no-vsync", default_value_t = true, action = clap::ArgAction::SetFalse)]
    vsync_enabled: bool,
    #[arg(long = "fullscreen", default_value_t = false)]
    launch_fullscreen: bool,
    #[arg(long = "force-integer-scaling", default_value_t = false)]
    force_integer_scaling: bool,
    #[arg(short = 'w', long = "window-width", default_value_t = 640)]
    window_width: u32,
    #[arg(short = 'l', long = "window-height", default_value_t = 576)]
    window_height: u32,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let args = Cli::parse();

    let run_config = RunConfig {
        gb_file_path: args.gb_file_path,
        vsync_enabled: args.vsync_enabled,
        launch_fullscreen: args.launch_fullscreen,
        force_integer_scaling: args.force_integer_scaling,
        window_width: args.window_width,
        window_height: args.window_height,
        input_config: InputConfig::default(),
    };

    dotmatrix_core::run(run_config)
}
