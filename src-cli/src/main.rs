mod cli_args;

use clap::Parser;
use cli_args::Cli;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;
use tunle_core::{AppCore, AppPorts, Command, Event};
use tunle_infra_audio_cpal::CpalAudioBackend;
use tunle_infra_decode_hound::HoundWavDecoder;
use tunle_infra_storage_fs::{FsAssetFetcher, FsMelodyResolver, FsPersistence, FsStorage};
use tunle_ports::clock::SystemClock;
use tunle_ports::storage::{SettingsDto, StoragePort};
use tunle_ports::types::{AudioConfig, PlatformEvent, Visibility, Volume01};

const TICK: Duration = Duration::from_millis(16);

const HELP: &str = "keys: 1-8 play a note | p listen & practice | g perform | r retry load | \
n new session | h/s hide/show page | +/- volume | H history | S streak | d diagnostics | q quit";

enum Input {
    Line(String),
    Closed,
}

fn main() {
    let cli = Cli::parse();
    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    if let Err(err) = run(cli) {
        log::error!("tunle exited: {}", err);
        std::process::exit(1);
    }
}

/// Launch flags only shape this run; settings.json keeps what the player saved.
fn apply_overrides(cli: &Cli, settings: &mut SettingsDto) {
    if let Some(root) = cli.asset_root.as_ref() {
        settings.asset_root = root.to_string_lossy().into_owned();
    }
    if let Some(root) = cli.melody_root.as_ref() {
        settings.melody_root = root.to_string_lossy().into_owned();
    }
    if let Some(user) = cli.user.clone() {
        settings.user_id = Some(user);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let data_dir = match cli.data_dir.clone() {
        Some(dir) => dir,
        None => FsStorage::default_base_dir()?,
    };
    let storage = FsStorage::new(data_dir.clone());

    let mut settings = storage.load_settings().unwrap_or_else(|err| {
        log::warn!(target: "storage", "settings unreadable, using defaults: {}", err);
        Default::default()
    });
    apply_overrides(&cli, &mut settings);

    let config = AudioConfig {
        buffer_size_frames: settings.audio_buffer_size_frames,
        ..AudioConfig::default()
    };
    let ports = AppPorts {
        backend: Arc::new(CpalAudioBackend::with_device(
            settings.selected_audio_out.clone(),
            config,
        )),
        fetcher: Arc::new(FsAssetFetcher::new(PathBuf::from(&settings.asset_root))),
        decoder: Arc::new(HoundWavDecoder::new()),
        resolver: Arc::new(FsMelodyResolver::new(PathBuf::from(&settings.melody_root))),
        persistence: Some(Arc::new(FsPersistence::new(data_dir.clone()))),
        storage: Some(Box::new(storage)),
        clock: Arc::new(SystemClock),
    };
    let mut core = AppCore::with_overrides(ports, |stored| apply_overrides(&cli, stored));

    println!("{}", HELP);
    core.handle_command(Command::StartSession { date: cli.date })?;
    print_events(core.drain_events());

    let input = spawn_stdin_reader();
    loop {
        match input.recv_timeout(TICK) {
            Ok(Input::Line(line)) => {
                if !handle_line(&mut core, &line, &data_dir) {
                    break;
                }
            }
            Ok(Input::Closed) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
            Err(mpsc::RecvTimeoutError::Timeout) => {}
        }
        core.tick();
        print_events(core.drain_events());
    }

    core.shutdown();
    print_events(core.drain_events());
    Ok(())
}

fn spawn_stdin_reader() -> mpsc::Receiver<Input> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(Input::Line(line)).is_err() {
                        return;
                    }
                }
                Err(err) => {
                    log::warn!("stdin read failed: {}", err);
                    break;
                }
            }
        }
        let _ = tx.send(Input::Closed);
    });
    rx
}

/// Returns `false` once the player asks to quit.
fn handle_line(core: &mut AppCore, line: &str, data_dir: &std::path::Path) -> bool {
    for key in line.chars().filter(|c| !c.is_whitespace()) {
        if key == 'q' {
            return false;
        }
        let Some(command) = command_for_key(core, key, data_dir) else {
            println!("{}", HELP);
            continue;
        };
        // Every key press counts as a user gesture, except toggling page visibility.
        if !matches!(key, 'h' | 's') {
            send(core, Command::Platform {
                event: PlatformEvent::KeyDown,
            });
        }
        send(core, command);
    }
    true
}

fn command_for_key(core: &AppCore, key: char, data_dir: &std::path::Path) -> Option<Command> {
    let command = match key {
        '1'..='8' => Command::PressNote {
            note: key.to_digit(10)? as u8,
        },
        'p' => Command::ListenAndPractice,
        'g' => Command::Perform,
        'r' => Command::RetryLoad,
        'n' => Command::ResetSession,
        'h' => Command::Platform {
            event: PlatformEvent::VisibilityChanged {
                visibility: Visibility::Hidden,
            },
        },
        's' => Command::Platform {
            event: PlatformEvent::VisibilityChanged {
                visibility: Visibility::Visible,
            },
        },
        '+' | '-' => {
            let step = if key == '+' { 0.1 } else { -0.1 };
            let current = core.settings().master_volume.get();
            Command::SetMasterVolume {
                volume: Volume01::new(current + step),
            }
        }
        'H' => Command::FetchHistory,
        'S' => Command::FetchStreak,
        'd' => Command::ExportDiagnostics {
            path: data_dir.join("diagnostics").to_string_lossy().into_owned(),
        },
        _ => return None,
    };
    Some(command)
}

fn send(core: &mut AppCore, command: Command) {
    if let Err(err) = core.handle_command(command) {
        println!("! {}", err);
    }
}

fn print_events(events: Vec<Event>) {
    for event in events {
        if let Event::SessionStateUpdated { .. } = event {
            log::debug!(target: "session", "{:?}", event);
            continue;
        }
        match serde_json::to_string(&event) {
            Ok(line) => println!("{}", line),
            Err(err) => log::warn!("event not printable: {}", err),
        }
    }
}
