mod host;
mod probe;

use std::error::Error;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand, ValueEnum};
use configurator::capability::CapabilityDetector;
use configurator::configuration::{
    ColorId, ConfigPatch, Configuration, RepresentationKind, ViewMode,
};
use configurator::engine::Configurator;
use configurator::error::TracingReporter;
use configurator::resolver::AssetResolver;
use configurator::settings::Settings;
use foundation::time::Time;
use runtime::budget::FrameBudget;
use runtime::frame::Frame;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::host::FetchHost;
use crate::probe::HostProbe;

#[derive(Parser, Debug)]
#[command(name = "suitcase", about = "Suitcase configurator host")]
struct Cli {
    /// JSON settings file; missing files fall back to defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Skip the graphics probe and run without 3D.
    #[arg(long)]
    no_3d: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the candidate list for one configuration.
    Resolve {
        #[arg(long, default_value = "purple")]
        color: String,
        #[arg(long, default_value = "front")]
        view: String,
        #[arg(long, value_enum, default_value_t = Kind::Image)]
        kind: Kind,
    },
    /// Run the capability detector.
    Probe,
    /// Drive the engine with scripted selections and real fetches.
    Run {
        /// `color=<id>` or `view=<mode>`; applied in order.
        #[arg(long = "select", value_parser = parse_select)]
        selections: Vec<ConfigPatch>,
        #[arg(long, default_value_t = 30)]
        frames_between: u64,
        #[arg(long, default_value_t = 600)]
        max_frames: u64,
        #[arg(long, default_value_t = 60)]
        fps: u32,
        /// Fetch starts allowed per frame.
        #[arg(long, default_value_t = 4)]
        fetch_budget: u32,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Kind {
    Model,
    Image,
}

impl From<Kind> for RepresentationKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Model => RepresentationKind::Model3D,
            Kind::Image => RepresentationKind::Image2D,
        }
    }
}

fn parse_select(raw: &str) -> Result<ConfigPatch, String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {raw:?}"))?;
    match key.trim() {
        "color" => ColorId::try_parse(value)
            .map(ConfigPatch::color)
            .ok_or_else(|| format!("unknown color {value:?}")),
        "view" => ViewMode::try_parse(value)
            .map(ConfigPatch::view)
            .ok_or_else(|| format!("unknown view {value:?}")),
        other => Err(format!("unknown selection key {other:?}")),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let settings = Settings::load_or_default(cli.config.as_deref())?.with_process_env()?;

    match cli.command {
        Command::Resolve { color, view, kind } => {
            let config = Configuration::new(ColorId::parse(&color), ViewMode::parse(&view));
            let kind = RepresentationKind::from(kind);
            let candidates = AssetResolver::from_settings(&settings.assets).resolve(&config, kind);
            println!("{config} as {}", kind.label());
            for (i, candidate) in candidates.iter().enumerate() {
                println!("  {}. {}", i + 1, candidate.location());
            }
        }
        Command::Probe => {
            let detector = CapabilityDetector::new(HostProbe::new(cli.no_3d));
            let capability = detector.detect();
            match &capability.reason {
                None => println!("3D supported"),
                Some(reason) => println!("{reason}"),
            }
        }
        Command::Run {
            selections,
            frames_between,
            max_frames,
            fps,
            fetch_budget,
        } => {
            let detector = CapabilityDetector::new(HostProbe::new(cli.no_3d));
            let engine = Configurator::new(&settings, &detector, Box::new(TracingReporter));
            run(engine, selections, frames_between, max_frames, fps, fetch_budget).await;
        }
    }
    Ok(())
}

async fn run(
    mut engine: Configurator,
    selections: Vec<ConfigPatch>,
    frames_between: u64,
    max_frames: u64,
    fps: u32,
    fetch_budget: u32,
) {
    let mut fetches = FetchHost::new();
    let dt_s = 1.0 / f64::from(fps.max(1));
    let started = Instant::now();
    let mut frame = Frame::new(0, dt_s);
    let mut script = selections.into_iter();
    let mut next_select = frames_between;
    let mut last_notice = None;

    while frame.index < max_frames {
        frame = Frame::at(frame.index + 1, dt_s, Time(started.elapsed().as_secs_f64()));

        if frame.index >= next_select
            && let Some(patch) = script.next()
        {
            if let Some(version) = engine.select(patch) {
                info!(%version, config = %engine.config(), "selected");
            }
            next_select = frame.index + frames_between;
        }

        let mut budget = FrameBudget::new(fetch_budget);
        fetches.execute(engine.take_fetch_commands(&mut budget));
        for (id, result) in fetches.drain() {
            engine.fetch_completed(id, result);
        }

        let presentation = engine.tick(frame);
        for event in engine.drain_events() {
            if event.kind == "commit" || event.kind == "fallback" {
                info!(frame = event.frame_index, kind = event.kind, "{}", event.message);
            }
        }
        if presentation.notice != last_notice {
            if let Some(notice) = &presentation.notice {
                warn!("{notice}");
            }
            last_notice = presentation.notice;
        }

        if script.len() == 0 && engine.is_settled() && fetches.in_flight() == 0 {
            info!(frame = frame.index, visible = %engine.visible(), "settled");
            break;
        }
        tokio::time::sleep(Duration::from_secs_f64(dt_s)).await;
    }

    fetches.execute(engine.shutdown());
    fetches.abort_all();
    println!("{}", engine.metrics().snapshot());
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_selections() {
        assert_eq!(
            parse_select("color=Blue").unwrap(),
            ConfigPatch::color(ColorId::Blue)
        );
        assert_eq!(
            parse_select("view= side").unwrap(),
            ConfigPatch::view(ViewMode::Side)
        );
        assert!(parse_select("color=green").is_err());
        assert!(parse_select("size=large").is_err());
        assert!(parse_select("blue").is_err());
    }

    #[test]
    fn cli_accepts_repeated_selects() {
        let cli = Cli::parse_from([
            "suitcase",
            "--no-3d",
            "run",
            "--select",
            "color=orange",
            "--select",
            "view=interactive",
            "--max-frames",
            "10",
        ]);
        assert!(cli.no_3d);
        let Command::Run { selections, max_frames, .. } = cli.command else {
            panic!("expected run");
        };
        assert_eq!(selections.len(), 2);
        assert_eq!(max_frames, 10);
    }
}
