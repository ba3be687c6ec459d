//! DroidFleet command-line front end.
//!
//! A headless surface over the fleet manager: list and watch the attached
//! devices, run device commands, adopt a mirror window into an existing
//! native window, and preview grid layouts.
//!
//! # Usage
//!
//! ```text
//! droidfleet [--adb <PATH>] [--config <FILE>] <COMMAND>
//!
//! Commands:
//!   devices [--json]                        List attached devices once
//!   watch [--interval <SECS>]               Print the device list on every change
//!   reboot <SERIAL>...                      Reboot devices
//!   key <KEYCODE> <SERIAL>...               Send a key event
//!   install <APK> <SERIAL>...               Install a package
//!   push <LOCAL> <REMOTE> <SERIAL>...       Copy a file to devices
//!   shell <COMMAND> <SERIAL>...             Run a shell command
//!   screenshot <SERIAL> [--output <FILE>]   Save a PNG screen capture
//!   mirror <SERIAL> --parent <HANDLE>       Mirror a device into a native window
//!   layout --screen x,y,w,h <SERIAL[:RATIO]>...
//!   config [--path]                         Show the effective configuration
//! ```
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load config, init tracing
//!  └─ DeviceCommands(AdbRunner)
//!       ├─ devices / watch   → DevicePoller (dedicated thread, watch channel)
//!       ├─ device commands   → ActionExecutor (one thread per command)
//!       └─ mirror            → MirrorSession (Tokio timer probing)
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use fleet_core::{
    arrange, AspectLock, Device, DeviceSnapshot, LayoutInput, Resolution, ScreenRect,
    WindowHandle,
};
use fleet_manager::application::mirror_session::MirrorSession;
use fleet_manager::application::poll_devices::{follow_settings, DevicePoller};
use fleet_manager::application::run_action::{ActionExecutor, ActionRequest};
use fleet_manager::application::settings::SettingsHub;
use fleet_manager::infrastructure::bridge::{AdbRunner, DeviceCommands};
use fleet_manager::infrastructure::mirror_tool::ScrcpyLauncher;
use fleet_manager::infrastructure::storage::config::{self, AppConfig};
use fleet_manager::infrastructure::window_host::{
    ContainerSurface, NativeContainer, NativeWindowHost, WindowHost, WindowRect,
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Android device fleet manager.
#[derive(Debug, Parser)]
#[command(name = "droidfleet", about = "Manage and mirror locally attached Android devices", version)]
struct Cli {
    /// Path to the `adb` executable.  Overrides the config file.
    #[arg(long, global = true, env = "DROIDFLEET_ADB")]
    adb: Option<PathBuf>,

    /// Configuration file to use instead of the platform default.
    #[arg(long, global = true, env = "DROIDFLEET_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List attached devices once.
    Devices {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Poll continuously and print the device list whenever it changes.
    Watch {
        /// Refresh interval in seconds (1 to 60).  Defaults to the configured value.
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Reboot devices.
    Reboot {
        #[arg(required = true)]
        serials: Vec<String>,
    },
    /// Send a key event (e.g. `KEYCODE_HOME` or `3`).
    Key {
        keycode: String,
        #[arg(required = true)]
        serials: Vec<String>,
    },
    /// Install an APK.
    Install {
        apk: PathBuf,
        #[arg(required = true)]
        serials: Vec<String>,
    },
    /// Copy a local file to a path on the devices.
    Push {
        local: PathBuf,
        remote: String,
        #[arg(required = true)]
        serials: Vec<String>,
    },
    /// Run a shell command; quote it to pass arguments.
    Shell {
        command: String,
        #[arg(required = true)]
        serials: Vec<String>,
    },
    /// Save a PNG capture of the device screen.
    Screenshot {
        serial: String,
        /// Destination file.  Defaults to `screenshot_<serial>.png`.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Launch the mirror tool and adopt its window into an existing window.
    Mirror {
        serial: String,
        /// Native handle of the container window (decimal or 0x-hex).
        #[arg(long)]
        parent: WindowHandle,
        /// Initial container height in pixels.
        #[arg(long, default_value_t = 800)]
        height: u32,
    },
    /// Print the grid geometry for a set of mirrors without touching any window.
    Layout {
        /// Windows per row.  Defaults to the configured value.
        #[arg(long)]
        columns: Option<u32>,
        /// Screen area as `x,y,width,height`.
        #[arg(long, value_parser = parse_screen)]
        screen: ScreenRect,
        /// `serial`, `serial:ratio` or `serial:WxH`.
        #[arg(required = true, value_parser = parse_layout_input)]
        sessions: Vec<LayoutInput>,
        #[arg(long)]
        json: bool,
    },
    /// Show the effective configuration.
    Config {
        /// Print only the config file location.
        #[arg(long)]
        path: bool,
    },
}

fn parse_screen(value: &str) -> Result<ScreenRect, String> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    let [x, y, width, height] = parts[..] else {
        return Err(format!("expected x,y,width,height but got '{value}'"));
    };
    let int = |s: &str| s.parse::<i32>().map_err(|e| format!("'{s}': {e}"));
    let uint = |s: &str| s.parse::<u32>().map_err(|e| format!("'{s}': {e}"));
    Ok(ScreenRect::new(int(x)?, int(y)?, uint(width)?, uint(height)?))
}

fn parse_layout_input(value: &str) -> Result<LayoutInput, String> {
    let Some((serial, shape)) = value.split_once(':') else {
        return Ok(LayoutInput::new(value, 0.0));
    };
    let ratio = match Resolution::parse(shape) {
        Some(resolution) => resolution.aspect_ratio(),
        None => shape
            .parse::<f64>()
            .map_err(|_| format!("'{shape}' is neither a ratio nor WxH"))?,
    };
    Ok(LayoutInput::new(serial, ratio))
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let (mut app_config, config_warning) = match &cli.config {
        Some(path) => match config::load_config_from(path) {
            Ok(cfg) => (cfg, None),
            Err(e) => (AppConfig::default(), Some(e)),
        },
        None => match config::load_config() {
            Ok(cfg) => (cfg, None),
            Err(e) => (AppConfig::default(), Some(e)),
        },
    };
    if let Some(adb) = &cli.adb {
        app_config.bridge.adb_path = adb.clone();
    }

    // Structured logging to stderr.  `RUST_LOG` overrides the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&app_config.general.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Some(e) = config_warning {
        warn!("failed to load config, using defaults: {e}");
    }

    let commands = DeviceCommands::new(Arc::new(AdbRunner::new(&app_config.bridge.adb_path)));

    match cli.command {
        Command::Devices { json } => list_devices(&commands, json)?,
        Command::Watch { interval } => watch_devices(commands, &app_config, interval).await?,
        Command::Reboot { serials } => {
            return run_actions(&serials, "Reboot", |serial| {
                let commands = commands.clone();
                move || {
                    commands.reboot(&serial)?;
                    Ok(None)
                }
            })
            .await;
        }
        Command::Key { keycode, serials } => {
            return run_actions(&serials, "Key event", |serial| {
                let (commands, keycode) = (commands.clone(), keycode.clone());
                move || {
                    commands.input_keyevent(&serial, &keycode)?;
                    Ok(None)
                }
            })
            .await;
        }
        Command::Install { apk, serials } => {
            return run_actions(&serials, "Install", |serial| {
                let (commands, apk) = (commands.clone(), apk.clone());
                move || {
                    let output = commands
                        .install_apk(&serial, &apk)
                        .with_context(|| format!("installing {}", apk.display()))?;
                    Ok(Some(output))
                }
            })
            .await;
        }
        Command::Push {
            local,
            remote,
            serials,
        } => {
            return run_actions(&serials, "Push", |serial| {
                let (commands, local, remote) = (commands.clone(), local.clone(), remote.clone());
                move || {
                    let output = commands.push_file(&serial, &local, &remote)?;
                    Ok(Some(output))
                }
            })
            .await;
        }
        Command::Shell { command, serials } => {
            return run_actions(&serials, "Shell", |serial| {
                let (commands, command) = (commands.clone(), command.clone());
                move || {
                    let output = commands.shell_command(&serial, &command)?;
                    Ok(Some(output))
                }
            })
            .await;
        }
        Command::Screenshot { serial, output } => {
            let destination =
                output.unwrap_or_else(|| PathBuf::from(format!("screenshot_{serial}.png")));
            return run_actions(&[serial], "Screenshot", |serial| {
                let (commands, destination) = (commands.clone(), destination.clone());
                move || {
                    commands.take_screenshot(&serial, &destination)?;
                    Ok(Some(format!("saved {}", destination.display())))
                }
            })
            .await;
        }
        Command::Mirror {
            serial,
            parent,
            height,
        } => mirror_device(&commands, &app_config, &serial, parent, height).await?,
        Command::Layout {
            columns,
            screen,
            sessions,
            json,
        } => {
            let columns = columns.unwrap_or(app_config.settings().devices_per_row);
            let layout = arrange(&sessions, columns, screen)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&layout)?);
            } else {
                for w in &layout.windows {
                    println!("{:<20} {:>6},{:<6} {}x{}", w.serial, w.x, w.y, w.width, w.height);
                }
            }
        }
        Command::Config { path } => {
            let location = match &cli.config {
                Some(p) => p.clone(),
                None => config::config_file_path()?,
            };
            if path {
                println!("{}", location.display());
            } else {
                println!("# {}", location.display());
                print!("{}", toml::to_string_pretty(&app_config)?);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

// ── Commands ──────────────────────────────────────────────────────────────────

fn list_devices(commands: &DeviceCommands, json: bool) -> anyhow::Result<()> {
    let devices = DevicePoller::poll_once(commands);
    if json {
        println!("{}", serde_json::to_string_pretty(&devices)?);
    } else {
        print_devices(&devices);
    }
    Ok(())
}

fn print_devices(devices: &[Device]) {
    if devices.is_empty() {
        println!("no devices attached");
        return;
    }
    println!(
        "{:<20} {:<8} {:<24} {:<16} {:<16} {:<8} {}",
        "SERIAL", "STATUS", "PRODUCT", "MODEL", "MODEL NUMBER", "ANDROID", "RESOLUTION"
    );
    for d in devices {
        println!(
            "{:<20} {:<8} {:<24} {:<16} {:<16} {:<8} {}",
            d.serial,
            d.status,
            d.product,
            d.model,
            d.model_number,
            d.android_version,
            d.resolution
        );
    }
}

async fn watch_devices(
    commands: DeviceCommands,
    app_config: &AppConfig,
    interval: Option<u64>,
) -> anyhow::Result<()> {
    let hub = SettingsHub::new(app_config.settings());
    if let Some(secs) = interval {
        hub.update(|s| s.refresh_interval = Duration::from_secs(secs));
    }

    let poller = DevicePoller::new(commands, hub.current().refresh_interval);
    let settings_task = tokio::spawn(follow_settings(poller.interval_handle(), hub.subscribe()));
    let mut snapshots = poller.subscribe();
    poller.start().context("starting device poller")?;
    info!(interval_secs = poller.interval().as_secs(), "watching devices; press Ctrl-C to exit");

    let mut shown = DeviceSnapshot::default();
    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                if snapshot.cycle == 1 || !snapshot.same_devices(&shown) {
                    println!("── cycle {} ─ {} online", snapshot.cycle, snapshot.online_count());
                    print_devices(&snapshot.devices);
                    shown = snapshot;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    poller.stop();
    settings_task.abort();
    Ok(())
}

/// Runs one action per serial and prints every result.  Exits non-zero when
/// any action failed.
async fn run_actions<F, A>(serials: &[String], name: &str, make: F) -> anyhow::Result<ExitCode>
where
    F: Fn(String) -> A,
    A: FnOnce() -> anyhow::Result<Option<String>> + Send + 'static,
{
    let (executor, mut results) = ActionExecutor::new();
    for serial in serials {
        executor.submit(ActionRequest::new(name, serial.clone(), make(serial.clone())));
    }

    let mut failed = 0usize;
    for _ in serials {
        let Some(result) = results.recv().await else {
            break;
        };
        if !result.success {
            failed += 1;
        }
        println!("{result}");
    }
    executor.reap_finished();

    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn mirror_device(
    commands: &DeviceCommands,
    app_config: &AppConfig,
    serial: &str,
    parent: WindowHandle,
    height: u32,
) -> anyhow::Result<()> {
    let resolution = commands.screen_resolution(serial);
    if resolution.is_empty() {
        warn!(serial, "resolution unknown; aspect ratio will not be enforced");
    }
    let aspect = AspectLock::from_resolution(&resolution, app_config.mirror.sidebar_width);
    let session = MirrorSession::new(serial, aspect, app_config.adoption_policy());

    let host: Arc<dyn WindowHost> = Arc::new(NativeWindowHost::default());
    let (width, height) = aspect
        .size_for_height(height)
        .unwrap_or((height / 2 + app_config.mirror.sidebar_width, height));
    let container = NativeContainer::new(parent, host.clone(), WindowRect::new(0, 0, width, height));

    let launcher = ScrcpyLauncher::new(&app_config.mirror.scrcpy_path, app_config.mirror_options());
    session.launch(&launcher)?;
    let window = session.await_window(host.as_ref(), &container).await?;
    println!("adopted window {window} into {parent}");

    {
        let _unlocked = session.unlock_aspect();
        if let Err(e) = container.resize(width, height) {
            warn!(error = %e, "failed to size container");
        }
    }
    if let Err(e) = session.fit_mirror(&container, width, height) {
        warn!(error = %e, "failed to size mirror window");
    }

    info!("mirroring {serial}; press Ctrl-C to release the window");
    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;

    if let Some(pid) = session.close() {
        println!("mirror tool (pid {pid}) left running");
    }
    Ok(())
}

