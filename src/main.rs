use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cfg = tui_sketchbook::config::Config::parse();
    if cfg.list_devices {
        tui_sketchbook::audio::list_input_devices()?;
        return Ok(());
    }

    tui_sketchbook::logging::init_file(cfg.log_file.as_deref())?;
    tracing::info!(renderer = ?cfg.renderer, camera = %cfg.camera, "starting");
    tui_sketchbook::app::run(cfg)
}
