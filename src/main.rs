//! Sahaayak CLI - track civic complaints and get notified on status changes.

use std::io::IsTerminal;
use std::process;

use clap::Parser;
use sahaayak::api::{ApiClient, Feed};
use sahaayak::cli::{Cli, Commands, ConfigCommands};
use sahaayak::commands::{self, CommandResult, WatchOptions};
use sahaayak::config::{self, ConfigOverrides, OutputFormat, ResolvedConfig};
use sahaayak::logging;
use sahaayak::models::MyComplaintsQuery;

fn main() {
    let cli = Cli::parse();

    let mut overrides = ConfigOverrides::new();
    if let Some(url) = &cli.server {
        overrides = overrides.with_server_url(url);
    }
    if let Commands::Watch {
        interval: Some(secs),
        ..
    } = &cli.command
    {
        overrides = overrides.with_poll_interval_secs(*secs);
    }
    if cli.human_readable {
        overrides = overrides.with_output_format(OutputFormat::Human);
    }

    let resolved = match config::resolve_config(&overrides) {
        Ok(resolved) => resolved,
        Err(e) => exit_with_error(&e, cli.human_readable),
    };
    let human = resolved.output_format() == OutputFormat::Human;

    // The dashboard owns the terminal, so it logs to a file instead
    let interactive = is_interactive_watch(&cli.command);
    let log_guard = if interactive {
        logging::init_file_logging().ok()
    } else {
        logging::init_logging(cli.verbose);
        None
    };

    let code = exit_code(run_command(cli.command, resolved, human, interactive), human);
    // Flush buffered file logs; process::exit skips destructors
    drop(log_guard);
    process::exit(code);
}

/// Print an error in the selected format and exit non-zero.
fn exit_with_error(error: &sahaayak::Error, human: bool) -> ! {
    report_error(error, human);
    process::exit(1);
}

fn report_error(error: &sahaayak::Error, human: bool) {
    if human {
        eprintln!("Error: {}", error);
    } else {
        eprintln!("{}", serde_json::json!({ "error": error.to_string() }));
    }
}

/// Report a failed command and map the result to a process exit code.
fn exit_code(result: Result<(), sahaayak::Error>, human: bool) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            report_error(&e, human);
            1
        }
    }
}

/// Watch mode draws the dashboard only on a real terminal.
fn is_interactive_watch(command: &Commands) -> bool {
    match command {
        Commands::Watch { plain, .. } => {
            cfg!(feature = "tui") && !plain && std::io::stdout().is_terminal()
        }
        _ => false,
    }
}

fn run_command(
    command: Commands,
    resolved: ResolvedConfig,
    human: bool,
    interactive: bool,
) -> Result<(), sahaayak::Error> {
    // Config commands never touch the network
    if let Commands::Config { command } = command {
        match command {
            ConfigCommands::Show => output(&commands::config_show(resolved)?, human),
            ConfigCommands::Set { key, value } => {
                output(&commands::config_set(&key, &value)?, human)
            }
            ConfigCommands::Path => output(&commands::config_path()?, human),
        }
        return Ok(());
    }

    let client = ApiClient::new(resolved.server_url(), resolved.request_timeout())?;
    tracing::debug!(server = client.base_url(), "using complaints server");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| sahaayak::Error::Other(format!("Failed to create runtime: {}", e)))?
        .block_on(async move {
            match command {
                Commands::List { filters, html } => {
                    let result = commands::list(&client, &filters.to_filter(), html).await?;
                    output(&result, human);
                }
                Commands::Mine {
                    name,
                    status,
                    sort,
                    html,
                } => {
                    let query = MyComplaintsQuery::new(name)?
                        .with_status(status)
                        .with_sort(sort);
                    let result = commands::mine(&client, &query, html).await?;
                    output(&result, human);
                }
                Commands::SetStatus { id, status } => {
                    output(&commands::set_status(&client, id, status).await?, human);
                }
                Commands::SetPriority { id, priority } => {
                    output(&commands::set_priority(&client, id, priority).await?, human);
                }
                Commands::Feedback {
                    id,
                    rating,
                    message,
                } => {
                    output(&commands::feedback(&client, id, rating, &message).await?, human);
                }
                Commands::Watch {
                    filters,
                    name,
                    sort,
                    ..
                } => {
                    let feed = match name {
                        Some(name) => Feed::Citizen(
                            MyComplaintsQuery::new(name)?
                                .with_status(filters.status)
                                .with_sort(sort),
                        ),
                        None => Feed::Dashboard(filters.to_filter()),
                    };
                    let options = WatchOptions {
                        client: client.clone(),
                        feed,
                        interval: resolved.poll_interval(),
                        prune_after: resolved.prune_after_misses(),
                        notifications: resolved.notifications(),
                    };
                    run_watch(options, interactive).await?;
                }
                Commands::Config { .. } => {}
            }
            Ok::<(), sahaayak::Error>(())
        })
}

#[cfg(feature = "tui")]
async fn run_watch(options: WatchOptions, interactive: bool) -> Result<(), sahaayak::Error> {
    if interactive {
        sahaayak::tui::run_tui(options).await
    } else {
        commands::watch_plain(options).await
    }
}

#[cfg(not(feature = "tui"))]
async fn run_watch(options: WatchOptions, _interactive: bool) -> Result<(), sahaayak::Error> {
    commands::watch_plain(options).await
}

/// Print output in JSON or human-readable format.
fn output<T: CommandResult>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}
