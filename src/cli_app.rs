//! Top-level CLI definition and dispatch.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use clap::{ArgGroup, Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use media_scan_router::core::config::Config;
use media_scan_router::core::paths::PathNormalizer;
use media_scan_router::dispatch::presenter::{DesktopPromptPresenter, PromptPresenter};
use media_scan_router::router::events::ScanEvent;
use media_scan_router::router::policy::ScanRequestRouter;
use media_scan_router::settings::{BootScanPreference, FilePreferenceStore, PreferenceStore};

/// Media Scan Router — routes system events to media scan requests.
#[derive(Debug, Parser)]
#[command(
    name = "msr",
    author,
    version,
    about = "Media Scan Router - event-driven scan dispatch",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Run the routing daemon.
    Daemon,
    /// Evaluate one event against the routing policy without side effects.
    Decide(DecideArgs),
    /// Send one event to a running daemon over the control socket.
    Emit(EventArgs),
    /// Show prompt registration and preference state.
    Status,
    /// View configuration state.
    Config(ConfigArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

/// One inbound event, selected by exactly one flag.
#[derive(Debug, Clone, Args)]
#[command(group = ArgGroup::new("event").required(true).args(
    ["boot", "scan_all", "dismiss", "mount", "file"]
))]
struct EventArgs {
    /// Boot-completed event.
    #[arg(long)]
    boot: bool,
    /// Explicit scan-everything request.
    #[arg(long = "scan-all")]
    scan_all: bool,
    /// Consent prompt dismissal.
    #[arg(long)]
    dismiss: bool,
    /// External volume mounted at PATH.
    #[arg(long, value_name = "PATH")]
    mount: Option<PathBuf>,
    /// Single file created or modified at PATH.
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,
}

impl EventArgs {
    fn to_event(&self) -> ScanEvent {
        if self.boot {
            ScanEvent::BootCompleted
        } else if self.scan_all {
            ScanEvent::ScanAllRequested
        } else if self.dismiss {
            ScanEvent::ScanDismissed
        } else if let Some(path) = &self.mount {
            ScanEvent::VolumeMounted { path: path.clone() }
        } else if let Some(path) = &self.file {
            ScanEvent::FileChanged { path: path.clone() }
        } else {
            // clap's required ArgGroup guarantees one flag is set.
            unreachable!("no event flag set")
        }
    }
}

#[derive(Debug, Clone, Args)]
struct DecideArgs {
    #[command(flatten)]
    event: EventArgs,
    /// Override the stored boot-scan preference.
    #[arg(long, value_name = "PREF")]
    preference: Option<BootScanPreference>,
    /// Decide as if a consent prompt were outstanding.
    #[arg(long)]
    prompt_active: bool,
}

#[derive(Debug, Clone, Args)]
struct ConfigArgs {
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Subcommand)]
enum ConfigCommand {
    /// Print the effective config file path.
    Path,
    /// Print the effective configuration.
    Show,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Target shell.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input at runtime.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Json(_) => 3,
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Daemon => run_daemon(cli),
        Command::Decide(args) => run_decide(cli, args),
        Command::Emit(args) => run_emit(cli, args),
        Command::Status => run_status(cli),
        Command::Config(args) => run_config(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

fn run_daemon(cli: &Cli) -> Result<(), CliError> {
    let config = load_config(cli)?;

    #[cfg(all(unix, feature = "daemon"))]
    {
        media_scan_router::daemon::loop_main::run(&config)
            .map_err(|e| CliError::Runtime(e.to_string()))
    }

    #[cfg(not(all(unix, feature = "daemon")))]
    {
        let _ = config;
        Err(CliError::Runtime(
            "daemon mode requires a Unix build with the `daemon` feature".to_string(),
        ))
    }
}

fn run_decide(cli: &Cli, args: &DecideArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let router = ScanRequestRouter::new(PathNormalizer::new(
        &config.storage.external_root,
        &config.storage.legacy_root_alias,
    ));

    let preference = match args.preference {
        Some(p) => p,
        None => FilePreferenceStore::new(&config.preference.file, config.preference.default)
            .read()
            .map_err(|e| CliError::Runtime(e.to_string()))?,
    };
    let prompt_active = args.prompt_active
        || DesktopPromptPresenter::from_config(&config.prompt).exists();

    let event = args.event.to_event();
    let decision = router.decide(&event, preference, prompt_active);

    match output_mode(cli) {
        OutputMode::Human => {
            println!("event:      {}", event.kind());
            println!("preference: {preference}");
            println!("prompt:     {}", if prompt_active { "active" } else { "inactive" });
            for action in &decision.actions {
                println!("  -> {action}");
            }
            if let Some(reason) = &decision.drop_reason {
                println!("  {} {reason}", "dropped:".yellow());
            }
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "decide",
                "event": event,
                "preference": preference,
                "prompt_active": prompt_active,
                "actions": decision.actions,
                "drop_reason": decision.drop_reason.as_ref().map(ToString::to_string),
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn run_emit(cli: &Cli, args: &EventArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let event = args.to_event();

    #[cfg(unix)]
    {
        use std::os::unix::net::UnixStream;

        let socket = &config.paths.control_socket;
        let mut stream = UnixStream::connect(socket).map_err(|e| {
            CliError::Runtime(format!(
                "connect to daemon at {}: {e} (is `msr daemon` running?)",
                socket.display()
            ))
        })?;
        let line = serde_json::to_string(&event)?;
        writeln!(stream, "{line}")?;

        match output_mode(cli) {
            OutputMode::Human => println!("sent {}", event.kind()),
            OutputMode::Json => {
                write_json_line(&json!({ "command": "emit", "event": event, "sent": true }))?;
            }
        }
        Ok(())
    }

    #[cfg(not(unix))]
    {
        let _ = (config, event);
        Err(CliError::Runtime(
            "emit requires a Unix control socket".to_string(),
        ))
    }
}

fn run_status(cli: &Cli) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let prompt_active = DesktopPromptPresenter::from_config(&config.prompt).exists();
    let preference = FilePreferenceStore::new(&config.preference.file, config.preference.default)
        .read()
        .map_err(|e| CliError::Runtime(e.to_string()))?;
    let socket_live = config.paths.control_socket.exists();

    match output_mode(cli) {
        OutputMode::Human => {
            let prompt_label = if prompt_active {
                "active".yellow().to_string()
            } else {
                "inactive".green().to_string()
            };
            println!("boot-scan preference: {preference}");
            println!("consent prompt:       {prompt_label}");
            println!(
                "control socket:       {} ({})",
                config.paths.control_socket.display(),
                if socket_live { "present" } else { "absent" }
            );
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "status",
                "preference": preference,
                "prompt_active": prompt_active,
                "control_socket": config.paths.control_socket.to_string_lossy(),
                "control_socket_present": socket_live,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    match &args.command {
        None | Some(ConfigCommand::Path) => {
            let path = cli.config.clone().unwrap_or_else(Config::default_path);
            let exists = path.exists();

            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{}", path.display());
                    if !exists {
                        println!("  (file does not exist; defaults will be used)");
                    }
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config path",
                        "path": path.to_string_lossy(),
                        "exists": exists,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Show) => {
            let config = load_config(cli)?;

            match output_mode(cli) {
                OutputMode::Human => {
                    let toml_str = toml::to_string_pretty(&config)
                        .map_err(|e| CliError::Runtime(format!("serialize config: {e}")))?;
                    println!("{toml_str}");
                }
                OutputMode::Json => {
                    let value = serde_json::to_value(&config)?;
                    let payload = json!({
                        "command": "config show",
                        "config": value,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config, CliError> {
    Config::load(cli.config.as_deref()).map_err(|e| CliError::Runtime(e.to_string()))
}

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("MSR_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ => fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn output_mode_resolution_honors_precedence() {
        assert_eq!(
            resolve_output_mode(true, Some("human"), true),
            OutputMode::Json
        );
        assert_eq!(
            resolve_output_mode(false, Some("json"), true),
            OutputMode::Json
        );
        assert_eq!(
            resolve_output_mode(false, Some("human"), false),
            OutputMode::Human
        );
        assert_eq!(resolve_output_mode(false, None, true), OutputMode::Human);
        assert_eq!(resolve_output_mode(false, None, false), OutputMode::Json);
    }

    #[test]
    fn event_args_map_to_events() {
        let args = EventArgs {
            boot: true,
            scan_all: false,
            dismiss: false,
            mount: None,
            file: None,
        };
        assert!(matches!(args.to_event(), ScanEvent::BootCompleted));

        let args = EventArgs {
            boot: false,
            scan_all: false,
            dismiss: false,
            mount: Some(PathBuf::from("/media/usb0")),
            file: None,
        };
        assert!(matches!(args.to_event(), ScanEvent::VolumeMounted { .. }));
    }

    #[test]
    fn exit_codes_are_distinct_per_class() {
        assert_eq!(CliError::User(String::new()).exit_code(), 1);
        assert_eq!(CliError::Runtime(String::new()).exit_code(), 2);
    }
}
