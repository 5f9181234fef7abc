use anyhow::Context;
use clap::Parser;
use gui_bridge::bridge::GuiBridge;
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::runtime::Builder as TokioBuilder;
use workflow::config::ReceiverConfig;
use workflow::runner::{run_generator, Runner};

mod generator;
mod gui_bridge;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "FMCW radar telemetry receiver and synthetic producer")]
struct Args {
    /// Load receiver configuration from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    /// UDP address to receive telemetry on
    #[arg(long)]
    bind: Option<SocketAddr>,
    /// Address of the HTTP polling bridge
    #[arg(long)]
    http: Option<SocketAddr>,
    #[arg(long)]
    tick_ms: Option<u64>,
    #[arg(long)]
    queue_capacity: Option<usize>,
    /// Expose snapshots over HTTP while receiving
    #[arg(long, default_value_t = false)]
    serve: bool,
    /// Stream synthetic telemetry to this address instead of receiving
    #[arg(long)]
    generate: Option<SocketAddr>,
    /// Stop generating after this many frames
    #[arg(long)]
    frames: Option<u64>,
    /// Emit legacy ASCII packets from the generator
    #[arg(long, default_value_t = false)]
    legacy: bool,
    /// Run synthetic traffic through the pipeline in-process and print a summary
    #[arg(long, default_value_t = false)]
    offline: bool,
    #[arg(long, default_value_t = 50)]
    cycles: usize,
    /// Write the final offline snapshot as JSON
    #[arg(long)]
    report: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ReceiverConfig::load(path)?,
        None => ReceiverConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(http) = args.http {
        config.http_addr = http;
    }
    if let Some(tick_ms) = args.tick_ms {
        config.tick_ms = tick_ms;
    }
    if let Some(capacity) = args.queue_capacity {
        config.queue_capacity = capacity;
    }
    config.generator.legacy_text |= args.legacy;
    config.validate().context("validating command-line overrides")?;

    if args.offline {
        let snapshot = Runner::new(config).run_offline(args.cycles)?;
        println!(
            "Offline run -> cycles {}, tracks {}, spectrum bins {}, peak range {:?}, dropped {}",
            args.cycles,
            snapshot.tracked,
            snapshot.spectrum.as_ref().map_or(0, |s| s.len()),
            snapshot.spectrum.as_ref().and_then(|s| s.peak_range_m()),
            snapshot.counters.dropped_total()
        );
        for rate in &snapshot.range_rates {
            println!(
                "  target {:>3}: range-rate {:+.3} m/s (raw {:+.3})",
                rate.target_id, rate.range_rate_mps, rate.raw_mps
            );
        }
        if let Some(path) = args.report {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            let json = serde_json::to_string_pretty(&snapshot).context("serialising snapshot")?;
            fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
        }
        return Ok(());
    }

    let runtime = TokioBuilder::new_multi_thread()
        .enable_all()
        .build()
        .context("creating tokio runtime")?;

    if let Some(target) = args.generate {
        return runtime.block_on(run_generator(
            config.generator.clone(),
            config.pipeline.radar,
            target,
            args.frames,
        ));
    }

    runtime.block_on(async {
        let bridge = GuiBridge::new();
        if args.serve {
            bridge.serve(config.http_addr);
            bridge.publish_status("HTTP bridge running (Ctrl+C to stop)...");
        }
        Runner::new(config).run(bridge).await
    })
}
