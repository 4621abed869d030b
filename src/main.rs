//! eqwalker - audio-reactive spectrum display and procedural walker

use anyhow::Context;
use clap::Parser;

use eqwalker::cli::{self, Args, Command};
use eqwalker::{app, logging, record, render};

fn main() -> anyhow::Result<()> {
    logging::init();

    let args = Args::parse();
    let config = args.load_config().context("failed to load configuration")?;
    let command = args.command();

    match &command {
        Command::Play { file, volume } => {
            let track = cli::load_track(file.as_deref()).context("failed to load track")?;
            app::run(config, track, *volume)
        }
        Command::Record { file, .. } => {
            let track = cli::load_track(file.as_deref()).context("failed to load track")?;
            let rec = cli::recording_config(&command).context("missing recording settings")?;
            let summary = record::record(config, &rec, track).context("recording failed")?;
            println!(
                "Wrote {} frames ({}x{}) to {}",
                summary.frames,
                summary.width,
                summary.height,
                rec.frames_dir()
            );
            Ok(())
        }
        Command::Still { size, out, .. } => {
            let params = cli::still_params(&command, &config.still)
                .context("invalid still settings")?
                .context("missing still settings")?;
            render::export_png(&params, *size, out)
                .with_context(|| format!("failed to export {}", out.display()))?;
            println!("Wrote {}", out.display());
            Ok(())
        }
        Command::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}
