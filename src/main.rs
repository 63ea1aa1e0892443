mod app;
mod heatmap;
mod model;
mod playback;
mod render;
mod trace;
mod ui;

use std::path::PathBuf;

use app::LaunchOptions;

fn parse_args() -> LaunchOptions {
    let mut opts = LaunchOptions {
        model_path: None,
        trace_path: None,
    };
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--model" => opts.model_path = args.next().map(PathBuf::from),
            "--trace" => opts.trace_path = args.next().map(PathBuf::from),
            other => {
                eprintln!("usage: heatlens [--model path.obj] [--trace path.csv]");
                eprintln!("unknown argument: {other}");
                std::process::exit(2);
            }
        }
    }
    opts
}

fn main() {
    env_logger::init();
    log::info!("heatlens starting up");

    if let Err(e) = app::run(parse_args()) {
        log::error!("Fatal error: {e}");
        std::process::exit(1);
    }
}
