use clap::{Parser, Subcommand};
use resus_core::*;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;

#[derive(Parser)]
#[command(name = "resq")]
#[command(about = "Resuscitation protocol assistant", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an interactive resuscitation session (default)
    Run,

    /// Run a scripted demonstration session and archive it
    Demo,

    /// List archived sessions and their event logs
    Log,

    /// Clear the session archive
    Clear,
}

fn main() -> Result<()> {
    // Initialize logging
    resus_core::logging::init();

    let cli = Cli::parse();

    // Determine data directory
    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    std::fs::create_dir_all(&data_dir)?;
    let archive_path = data_dir.join("archive.json");

    match cli.command {
        Some(Commands::Demo) => cmd_demo(&archive_path, &config),
        Some(Commands::Log) => cmd_log(&archive_path),
        Some(Commands::Clear) => cmd_clear(&archive_path),
        Some(Commands::Run) | None => cmd_run(&archive_path, &config),
    }
}

/// Messages merged into the interactive loop: real-time ticks plus
/// clinician input lines
enum UiMsg {
    Tick(TickSource),
    Line(String),
    Eof,
}

enum Flow {
    Continue,
    Quit,
}

fn cmd_run(archive_path: &Path, config: &Config) -> Result<()> {
    let store = SessionStore::open(archive_path);
    let mut controller = SessionController::new(store, &config.protocol);

    let tick_rx = controller
        .take_tick_receiver()
        .ok_or_else(|| Error::Other("tick receiver already taken".into()))?;

    let (tx, rx) = mpsc::channel();

    // Forward ticks into the UI channel
    {
        let tx = tx.clone();
        thread::spawn(move || {
            for tick in tick_rx {
                if tx.send(UiMsg::Tick(tick)).is_err() {
                    break;
                }
            }
        });
    }

    // Forward stdin lines into the UI channel
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(l) => {
                    if tx.send(UiMsg::Line(l)).is_err() {
                        return;
                    }
                }
                Err(_) => break,
            }
        }
        let _ = tx.send(UiMsg::Eof);
    });

    let session = controller.begin_session()?;
    tracing::info!(session = %session, "Interactive session started");
    print_help(config);
    render(&controller.snapshot());

    let mut last_prompt = String::new();
    let mut last_reminder: Option<String> = None;

    loop {
        match rx.recv() {
            Ok(UiMsg::Tick(source)) => {
                controller.handle_tick(source);
                let snap = controller.snapshot();
                // Redraw only when the instruction or reminder changes;
                // plain countdown seconds stay quiet
                if snap.prompt != last_prompt || snap.reminder != last_reminder {
                    last_prompt = snap.prompt.clone();
                    last_reminder = snap.reminder.clone();
                    render(&snap);
                }
            }
            Ok(UiMsg::Line(line)) => {
                match handle_command(&mut controller, line.trim(), config) {
                    Ok(Flow::Quit) => break,
                    Ok(Flow::Continue) => {
                        let snap = controller.snapshot();
                        last_prompt = snap.prompt.clone();
                        last_reminder = snap.reminder.clone();
                        render(&snap);
                    }
                    Err(e) => println!("  ✗ Rejected: {}", e),
                }
            }
            Ok(UiMsg::Eof) | Err(_) => break,
        }
    }

    // Archive whatever is still live before leaving
    if controller.live_session().is_some() {
        let id = controller.end_session()?;
        println!("\n✓ Session {} archived", id);
    }

    Ok(())
}

fn handle_command(
    controller: &mut SessionController,
    input: &str,
    config: &Config,
) -> Result<Flow> {
    let (cmd, rest) = match input.split_once(' ') {
        Some((c, r)) => (c, r.trim()),
        None => (input, ""),
    };

    match cmd {
        "r" if !rest.is_empty() => {
            controller.submit_rhythm(rest)?;
        }
        "d" => {
            let joules: u32 = rest
                .parse()
                .map_err(|_| Error::Other(format!("Energy options: {:?}", JOULE_OPTIONS)))?;
            controller.submit_defibrillation(joules)?;
        }
        "a" => {
            controller.record_adrenaline()?;
        }
        "m" if !rest.is_empty() => {
            controller.record_medication(rest)?;
        }
        "n" if !rest.is_empty() => {
            controller.record_alert(rest)?;
        }
        "k" => {
            controller.dismiss_reminder();
        }
        "rosc" => {
            controller.record_rosc()?;
            println!("  ROSC achieved. Proceed to post-cardiac arrest care.");
        }
        "reset" => {
            controller.reset()?;
        }
        "s" => {}
        "end" | "q" => return Ok(Flow::Quit),
        "h" | "help" => print_help(config),
        _ => println!("  Unknown command. 'h' for help."),
    }

    Ok(Flow::Continue)
}

fn render(snap: &Snapshot) {
    println!(
        "[{}] Cycle {} │ {:02}:{:02} remaining │ since shock {}",
        snap.elapsed,
        snap.cycle_number,
        snap.seconds_remaining / 60,
        snap.seconds_remaining % 60,
        snap.since_last_shock,
    );
    println!("  ▶ {}", snap.prompt);

    let flags = snap.flags;
    let mut pulsing = Vec::new();
    if flags.rhythm {
        pulsing.push("rhythm");
    }
    if flags.defibrillation {
        pulsing.push("defibrillation");
    }
    if flags.adrenaline {
        pulsing.push("adrenaline");
    }
    if flags.amiodarone {
        pulsing.push("amiodarone");
    }
    if !pulsing.is_empty() {
        println!("  pulsing: {}", pulsing.join(", "));
    }

    if let Some(ref reminder) = snap.reminder {
        println!("  ⚠ {}", reminder);
    }
}

fn print_help(config: &Config) {
    println!("─────────────────────────────────────────");
    println!("  r <rhythm>   record rhythm check (VT/VF, PEA/AS, ...)");
    println!(
        "  d <joules>   record defibrillation ({:?})",
        config.defibrillation.joule_options
    );
    println!("  a            record Adrenaline given");
    println!("  m <name>     record other medication");
    println!("  n <text>     record note/alert");
    println!("  k            dismiss adrenaline reminder");
    println!("  rosc         record return of spontaneous circulation");
    println!("  reset        reset protocol state (log is kept)");
    println!("  s            show status");
    println!("  end          end session and archive it");
    println!("─────────────────────────────────────────");
}

/// Scripted session on the manual clock: shockable rhythm, one shock, a
/// full CPR cycle, the cycle-2 adrenaline dose. Exercises the whole
/// engine without waiting for wall-clock time.
fn cmd_demo(archive_path: &Path, config: &Config) -> Result<()> {
    let store = SessionStore::open(archive_path);
    let mut controller = SessionController::with_manual_clock(store, &config.protocol);

    controller.begin_session()?;

    controller.submit_rhythm("VT/VF")?;
    println!("Rhythm VT/VF → {}", controller.snapshot().prompt);

    controller.submit_defibrillation(200)?;
    println!("Shock 200J → {}", controller.snapshot().prompt);

    for _ in 0..config.protocol.cycle_seconds {
        controller.handle_tick(TickSource::Cycle);
        controller.handle_tick(TickSource::Elapsed);
        controller.handle_tick(TickSource::Defibrillation);
    }
    let snap = controller.snapshot();
    println!(
        "After {}s of CPR → cycle {}, {}",
        config.protocol.cycle_seconds, snap.cycle_number, snap.prompt
    );

    controller.submit_rhythm("PEA/AS")?;
    println!("Rhythm PEA/AS → {}", controller.snapshot().prompt);

    controller.record_adrenaline()?;
    controller.record_alert("Intubation")?;

    let id = controller.end_session()?;
    let events = controller
        .archive()
        .iter()
        .find(|s| s.id == id)
        .map(|s| s.events.len())
        .unwrap_or(0);

    println!("\n✓ Session archived ({} events)", events);
    println!("  Archive: {}", archive_path.display());
    Ok(())
}

fn cmd_log(archive_path: &Path) -> Result<()> {
    let store = SessionStore::open(archive_path);
    let archive = store.archive();

    if archive.is_empty() {
        println!("No archived sessions.");
        return Ok(());
    }

    println!("{} archived session(s)\n", archive.len());
    for session in archive {
        let ended = session
            .ended_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "-".into());
        println!(
            "Session {}\n  started {}\n  ended   {}",
            session.id,
            session.started_at.to_rfc3339(),
            ended
        );
        for event in &session.events {
            println!("    {}  {}", event.at.format("%H:%M:%S"), event.kind.describe());
        }
        println!();
    }
    Ok(())
}

fn cmd_clear(archive_path: &Path) -> Result<()> {
    let mut store = SessionStore::open(archive_path);
    let count = store.archive().len();
    store.clear_archive();
    println!("✓ Archive cleared ({} session(s) removed)", count);
    Ok(())
}
