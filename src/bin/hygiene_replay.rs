//! hygiene_replay - run recorded detection frames through a hygiene session
//!
//! Reads zones from a JSON file and detection frames as JSON lines (one
//! `DetectionFrame` per line) from a file or stdin. Violations go to stdout
//! as JSON lines; the summary goes to stderr.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use hygiene_kernel::{DetectionFrame, EngineConfig, HygieneSession, JsonLinesSink, ZonePayload};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Zones JSON file: an array of zone payloads in natural coordinates.
    #[arg(long, env = "HYGIENE_ZONES")]
    zones: PathBuf,
    /// Detection frames as JSON lines. Reads stdin when omitted or "-".
    #[arg(long)]
    frames: Option<PathBuf>,
    /// Engine config file (JSON, or TOML by extension). Overrides HYGIENE_CONFIG.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Fail instead of skipping zones that do not validate.
    #[arg(long, default_value_t = false)]
    strict_zones: bool,
    /// Fail on the first frame line that does not parse.
    #[arg(long, default_value_t = false)]
    strict_frames: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match args.config.as_deref() {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::load()?,
    };
    let mut session = HygieneSession::new(config);

    let payloads = read_zones(&args.zones)?;
    let total_zones = payloads.len();
    let accepted = session.registry_mut().load(payloads);
    if accepted < total_zones {
        if args.strict_zones {
            return Err(anyhow!(
                "{} of {} zones in {} failed validation",
                total_zones - accepted,
                total_zones,
                args.zones.display()
            ));
        }
        log::warn!(
            "{} of {} zones failed validation and will not match",
            total_zones - accepted,
            total_zones
        );
    }
    log::info!("loaded {} zones from {}", accepted, args.zones.display());

    session.add_sink(JsonLinesSink::new(io::stdout()));

    let stop = Arc::new(AtomicBool::new(false));
    let stop_handler = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        stop_handler.store(true, Ordering::SeqCst);
    })
    .context("error setting Ctrl-C handler")?;

    let reader: Box<dyn BufRead> = match args.frames.as_deref() {
        Some(path) if path != Path::new("-") => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("open frames {}", path.display()))?,
        )),
        _ => Box::new(BufReader::new(io::stdin())),
    };

    let mut bad_lines = 0usize;
    for (line_no, line) in reader.lines().enumerate() {
        if stop.load(Ordering::SeqCst) {
            log::info!("interrupted; stopping after {} lines", line_no);
            break;
        }
        let line = line.context("read frame line")?;
        if line.trim().is_empty() {
            continue;
        }
        let frame: DetectionFrame = match serde_json::from_str(&line) {
            Ok(frame) => frame,
            Err(err) if !args.strict_frames => {
                log::warn!("line {}: not a detection frame: {}", line_no + 1, err);
                bad_lines += 1;
                continue;
            }
            Err(err) => return Err(anyhow!("line {}: not a detection frame: {}", line_no + 1, err)),
        };
        session.process_frame(&frame);
    }

    let summary = serde_json::json!({
        "framesProcessed": session.frames_processed(),
        "detectionsSkipped": session.detections_skipped(),
        "badLines": bad_lines,
        "violations": session.stats(),
    });
    eprintln!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn read_zones(path: &Path) -> Result<Vec<ZonePayload>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read zones file {}", path.display()))?;
    serde_json::from_str(&raw).map_err(|e| anyhow!("invalid zones file {}: {}", path.display(), e))
}
