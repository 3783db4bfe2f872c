//! Mixdesk console - drive the mixing engine from stdin
//!
//! Reads one command per line, dispatches it through the engine's control
//! dispatcher and ticks the engine on the scheduler period in between.
//!
//! ## Command line flags
//!
//! - `--headless`: render into an in-process output instead of a device
//! - `--config <path>`: engine config file (defaults to the user config dir)
//!
//! ## Console commands
//!
//! Everything `ControlCommand::parse` accepts, plus `tracks`, `meters`,
//! `status`, `analysis`, `save <path>`, `load <path>`, `help` and `quit`.

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::Context;

use mixdesk_core::audio::{BackendKind, HeadlessBackend};
use mixdesk_core::config::{
    default_config_path, load_config, read_config, save_config, EngineConfig, ENGINE_CONFIG_FILE,
};
use mixdesk_core::engine::{ControlCommand, ControlSource, DisplayList, MixEngine, SessionState};
use mixdesk_core::graph::SineTone;

/// Test tone per track so a fresh session is audible
const TONE_FREQUENCIES: [f32; 8] = [110.0, 220.0, 330.0, 440.0, 550.0, 660.0, 770.0, 880.0];

const HELP: &str = "\
  add [name] [kind]       rm <id>              rename <id> <name>
  vol <id> <0..1>         pan <id> <-1..1>     eq <id> <high|mid|low> <dB>
  fx <id> <reverb|delay> <%>                   master <0..1>
  solo <id>               mute <id>
  play | pause | stop     tab <spectrum|waveform|histogram>
  tracks | meters | status | analysis | save <path> | load <path> | quit";

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let headless = args.iter().any(|arg| arg == "--headless");
    let config_path = args
        .iter()
        .position(|arg| arg == "--config")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from)
        .unwrap_or_else(|| default_config_path(ENGINE_CONFIG_FILE));

    // Initialize logger - set RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    // Build the pool before the first callback so rayon never lazily
    // spawns threads inside the audio thread
    rayon::ThreadPoolBuilder::new()
        .thread_name(|i| format!("rayon-strips-{}", i))
        .build_global()
        .context("Failed to initialize Rayon thread pool")?;

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                       Mixdesk Console                        ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    let mut config: EngineConfig = load_config(&config_path);
    log::info!("Config loaded from {:?}", config_path);

    let mut renderer = None;
    let mut engine = if headless {
        config.audio.backend = BackendKind::Headless;
        let backend = HeadlessBackend::new();
        renderer = Some(backend.renderer());
        MixEngine::with_backend(config.clone(), Box::new(backend))?
    } else {
        MixEngine::new(config.clone())?
    };

    let ids: Vec<_> = engine.tracks().iter().map(|t| t.id).collect();
    for (i, id) in ids.into_iter().enumerate() {
        let freq = TONE_FREQUENCIES[i % TONE_FREQUENCIES.len()];
        engine.attach_source(id, Box::new(SineTone::new(freq, 0.1)))?;
    }

    engine.initialize().context("Audio output unavailable")?;
    if let Some(info) = engine.stream_info() {
        println!(
            "Output: {} ({} Hz, {} frames, {:.1} ms)",
            info.device_name,
            info.sample_rate,
            info.buffer_size,
            info.latency_ms()
        );
    }
    let render_thread = match &renderer {
        Some(r) => Some(r.spawn_realtime().context("Failed to start headless render thread")?),
        None => None,
    };

    // Stdin on its own thread so ticks keep their period
    let (line_tx, line_rx) = mpsc::channel::<String>();
    thread::Builder::new()
        .name("mixdesk-stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines().map_while(Result::ok) {
                if line_tx.send(line).is_err() {
                    break;
                }
            }
        })
        .context("Failed to start stdin reader")?;

    println!("{}", HELP);
    let tick = Duration::from_millis(config.transport.tick_ms.max(1) as u64);
    let mut surface = DisplayList::new(512.0, 128.0);

    'run: loop {
        loop {
            match line_rx.try_recv() {
                Ok(line) => {
                    if !handle_line(&mut engine, line.trim()) {
                        break 'run;
                    }
                }
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => break 'run,
            }
        }
        engine.tick(Some(&mut surface));
        thread::sleep(tick);
    }

    engine.dispose();
    if let Some(handle) = render_thread {
        let _ = handle.join();
    }
    log::info!("mix-console shut down");
    Ok(())
}

/// Returns false when the console should exit
fn handle_line(engine: &mut MixEngine, line: &str) -> bool {
    let (head, rest) = line.split_once(' ').unwrap_or((line, ""));
    match head {
        "" => {}
        "quit" | "exit" => return false,
        "help" => println!("{}", HELP),
        "tracks" => {
            for t in engine.tracks() {
                println!(
                    "{:>3} {:<12} vol {:.2} pan {:+.2} eq {:+.1}/{:+.1}/{:+.1} fx {:.0}%/{:.0}%{}{}",
                    t.id,
                    t.name,
                    t.volume,
                    t.pan,
                    t.eq.high,
                    t.eq.mid,
                    t.eq.low,
                    t.effects.reverb,
                    t.effects.delay,
                    if t.is_solo { " [S]" } else { "" },
                    if t.is_muted { " [M]" } else { "" },
                );
            }
        }
        "meters" => {
            for r in engine.meters() {
                println!("{:>3} level {:>5.1} peak {:>6.1} dB", r.id, r.level, r.peak_db);
            }
        }
        "status" => {
            let status = engine.transport_status();
            println!(
                "{:?} {:.2}s / {:.0}s, view {}",
                status.state,
                status.elapsed_secs,
                status.duration_secs,
                engine.analysis_view()
            );
        }
        "analysis" => {
            let snapshot = engine.analysis();
            let sample_rate = engine.graph().sample_rate() as f32;
            let bin_hz = sample_rate / 2.0 / snapshot.frequency.len().max(1) as f32;
            println!(
                "peak {:.3}, dominant {:.0} Hz, histogram {:?}",
                snapshot.peak(),
                snapshot.dominant_bin() as f32 * bin_hz,
                snapshot.level_histogram()
            );
        }
        "save" => {
            if let Err(e) = save_config(&engine.export_state(), &PathBuf::from(rest.trim())) {
                eprintln!("Save failed: {:#}", e);
            }
        }
        "load" => match read_config::<SessionState>(&PathBuf::from(rest.trim())) {
            Ok(state) => {
                for e in engine.restore_state(&state) {
                    eprintln!("Rejected: {}", e);
                }
            }
            Err(e) => eprintln!("Load failed: {:#}", e),
        },
        _ => match ControlCommand::parse(line) {
            Ok(cmd) => match engine.dispatch(cmd, ControlSource::Ui) {
                Ok(outcome) => log::debug!("{:?}", outcome),
                Err(e) => eprintln!("Error: {}", e),
            },
            Err(e) => eprintln!("{}", e),
        },
    }
    true
}
