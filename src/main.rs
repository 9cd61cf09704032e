// ABOUTME: CLI entry point for table-reconciler
// ABOUTME: Parses commands, layers config file and flags, routes to handlers

use clap::{ArgAction, Args, Parser, Subcommand};
use std::io::IsTerminal;
use std::path::PathBuf;
use table_reconciler::commands::{self, SyncCommandOptions};
use table_reconciler::config::{flag_pair, EndpointConfig, FileConfig, OptionLayer, SyncOptions};
use table_reconciler::tables::TableSelection;

#[derive(Parser)]
#[command(name = "table-reconciler")]
#[command(about = "Reconcile MySQL tables between a source and a target database", long_about = None)]
#[command(version)]
struct Cli {
    /// Set the log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log: Option<String>,
    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Path to config.toml (defaults to <config dir>/table-reconciler/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Default)]
struct SourceArgs {
    /// Source database URI (mysql://user@host:port/db)
    #[arg(long)]
    source: Option<String>,
    /// Source user, replaces the one in the URI
    #[arg(long = "source-user")]
    source_user: Option<String>,
    /// Source password, replaces the one in the URI
    #[arg(long = "source-password", env = "SOURCE_PASSWORD", hide_env_values = true)]
    source_password: Option<String>,
}

impl SourceArgs {
    fn endpoint(self) -> EndpointConfig {
        EndpointConfig {
            uri: self.source,
            user: self.source_user,
            password: self.source_password,
        }
    }
}

#[derive(Args, Clone, Default)]
struct TargetArgs {
    /// Target database URI (mysql://user@host:port/db)
    #[arg(long)]
    target: Option<String>,
    /// Target user, replaces the one in the URI
    #[arg(long = "target-user")]
    target_user: Option<String>,
    /// Target password, replaces the one in the URI
    #[arg(long = "target-password", env = "TARGET_PASSWORD", hide_env_values = true)]
    target_password: Option<String>,
}

impl TargetArgs {
    fn endpoint(self) -> EndpointConfig {
        EndpointConfig {
            uri: self.target,
            user: self.target_user,
            password: self.target_password,
        }
    }
}

#[derive(Args, Clone, Default)]
struct SelectionArgs {
    /// Tables to reconcile (comma-separated), or '*' for all tables
    #[arg(long, value_delimiter = ',')]
    tables: Option<Vec<String>>,
    /// Tables left out of '*' (comma-separated)
    #[arg(long = "skip-tables", value_delimiter = ',')]
    skip_tables: Option<Vec<String>>,
}

#[derive(Args, Clone, Default)]
struct SyncSwitches {
    /// Primary key column
    #[arg(long = "primary-key")]
    primary_key: Option<String>,
    /// Timestamp column used to pick the newer row; empty disables it
    #[arg(long = "timestamp-key")]
    timestamp_key: Option<String>,
    /// Compare whole rows instead of a timestamp column
    #[arg(long = "no-timestamp", conflicts_with = "timestamp_key")]
    no_timestamp: bool,

    /// Delete target rows that are missing from the source
    #[arg(long, overrides_with = "no_delete")]
    delete: bool,
    #[arg(long = "no-delete", hide = true)]
    no_delete: bool,

    /// Count changes without writing them
    #[arg(short = 'n', long = "dry-run", overrides_with = "apply")]
    dry_run: bool,
    /// Write changes (default)
    #[arg(long, overrides_with = "dry_run")]
    apply: bool,

    /// Overwrite every matching target row with the source row
    #[arg(long, overrides_with = "no_force")]
    force: bool,
    #[arg(long = "no-force", hide = true)]
    no_force: bool,

    /// Push newer target rows back to the source (needs a timestamp column)
    #[arg(long = "two-way", overrides_with = "one_way")]
    two_way: bool,
    /// Only ever write to the target (default)
    #[arg(long = "one-way", overrides_with = "two_way")]
    one_way: bool,

    /// READ-lock each source table while it is snapshotted
    #[arg(long = "read-lock", overrides_with = "no_read_lock")]
    read_lock: bool,
    #[arg(long = "no-read-lock", hide = true)]
    no_read_lock: bool,

    /// WRITE-lock each target table while changes are applied
    #[arg(long = "write-lock", overrides_with = "no_write_lock")]
    write_lock: bool,
    #[arg(long = "no-write-lock", hide = true)]
    no_write_lock: bool,

    /// Log failed changes and carry on instead of stopping
    #[arg(long = "ignore-errors", overrides_with = "no_ignore_errors")]
    ignore_errors: bool,
    #[arg(long = "no-ignore-errors", hide = true)]
    no_ignore_errors: bool,

    /// Show a progress spinner (default when stderr is a terminal)
    #[arg(long, overrides_with = "no_progress")]
    progress: bool,
    #[arg(long = "no-progress", hide = true)]
    no_progress: bool,
}

impl SyncSwitches {
    fn layer(self, selection: SelectionArgs) -> OptionLayer {
        let timestamp_key = if self.no_timestamp {
            Some(String::new())
        } else {
            self.timestamp_key
        };
        OptionLayer {
            primary_key: self.primary_key,
            timestamp_key,
            delete: flag_pair(self.delete, self.no_delete),
            apply: flag_pair(self.apply, self.dry_run),
            force: flag_pair(self.force, self.no_force),
            two_way: flag_pair(self.two_way, self.one_way),
            read_lock: flag_pair(self.read_lock, self.no_read_lock),
            write_lock: flag_pair(self.write_lock, self.no_write_lock),
            ignore_errors: flag_pair(self.ignore_errors, self.no_ignore_errors),
            progress: flag_pair(self.progress, self.no_progress),
            tables: selection.tables,
            skip_tables: selection.skip_tables,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile tables from the source database into the target database
    Sync {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        selection: SelectionArgs,
        #[command(flatten)]
        switches: SyncSwitches,
        /// Print the run summary as JSON on stdout
        #[arg(long)]
        json: bool,
    },
    /// Print the tables a sync would visit, after '*' expansion and the skip-list
    ListTables {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        selection: SelectionArgs,
    },
}

/// Log filter precedence: RUST_LOG, then --log, then -v count, then warn.
fn init_logging(log: Option<&str>, verbose: u8) {
    let fallback = match (log, verbose) {
        (Some(level), _) => level.to_string(),
        (None, 0) => "warn".to_string(),
        (None, 1) => "info".to_string(),
        (None, 2) => "debug".to_string(),
        (None, _) => "trace".to_string(),
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback));

    // stdout is reserved for command output such as --json
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log.as_deref(), cli.verbose);

    let file = FileConfig::discover(cli.config.as_deref())?;
    let repair = file.repair.to_policy();

    // The spinner defaults on for interactive terminals; file and flags may override.
    let terminal = OptionLayer {
        progress: Some(std::io::stderr().is_terminal()),
        ..OptionLayer::default()
    };
    let file_layer = terminal.merge(file.sync);

    match cli.command {
        Commands::Sync {
            source,
            target,
            selection,
            switches,
            json,
        } => {
            let options = SyncOptions::from_layers(file_layer, switches.layer(selection), repair)?;
            commands::sync(SyncCommandOptions {
                source: file.source.merge(source.endpoint()),
                target: file.target.merge(target.endpoint()),
                options,
                json,
            })
            .await
        }
        Commands::ListTables { source, selection } => {
            let cli_layer = OptionLayer {
                tables: selection.tables,
                skip_tables: selection.skip_tables,
                ..OptionLayer::default()
            };
            let options = SyncOptions::from_layers(file_layer, cli_layer, repair)?;
            let selection = TableSelection::new(options.tables, options.skip_tables);
            commands::list_tables(&file.source.merge(source.endpoint()), &selection).await
        }
    }
}
