use crate::app::{self, CreateCommand, ListCommand};
use crate::config;
use crate::events::query::EventFilter;
use crate::events::{EventLevel, EventType, EventVersion};
use crate::logging;
use crate::store::{Order, QueryCondition, TimeRange};
use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::fs;
use std::io;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "eventhub", version)]
#[command(
    about = "Persist and query cluster events in a time-series store",
    long_about = "eventhub writes cluster and component lifecycle events to a time-series store under a fixed tag/field schema, and lists them back with id, cluster, type, version, level and time filters."
)]
#[command(arg_required_else_help = true)]
#[command(after_long_help = "Examples:
  eventhub init
  eventhub create --file events.json --log events.ndjson
  eventhub list --cluster-id c1 --level warning --order desc --limit 20
  eventhub list --id ev-1 --id ev-2 --dry-run
  eventhub completion zsh > ~/.zsh/completions/_eventhub")]
struct Cli {
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Config file (default: $XDG_CONFIG_HOME/eventhub/config.toml)"
    )]
    config: Option<PathBuf>,
    #[arg(short, long, global = true, action = clap::ArgAction::Count, help = "Increase log verbosity")]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OrderArg {
    Asc,
    Desc,
}

impl From<OrderArg> for Order {
    fn from(value: OrderArg) -> Self {
        match value {
            OrderArg::Asc => Order::Asc,
            OrderArg::Desc => Order::Desc,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Prepare the configured store",
        long_about = "Create the event database and apply the configured retention policy (influxdb), or create the schema (sqlite)."
    )]
    Init,
    #[command(about = "Check that the configured store is reachable")]
    Ping,
    #[command(about = "Write events from a JSON or NDJSON file as one batch")]
    #[command(arg_required_else_help = true)]
    #[command(after_long_help = "Example:
  eventhub create --file events.json")]
    Create {
        #[arg(long, value_name = "PATH", help = "JSON array or NDJSON file of events")]
        file: PathBuf,
        #[arg(long, value_name = "PATH", help = "Append an NDJSON line per event to file")]
        log: Option<PathBuf>,
    },
    #[command(about = "List stored events matching the given filters")]
    #[command(after_long_help = "Repeat a flag to match any of several values; different flags must all match.

Examples:
  eventhub list --cluster-id c1
  eventhub list --type pod-register --level warning --level error
  eventhub list --start 2026-02-20T00:00:00Z --order desc --limit 10")]
    List {
        #[arg(long = "id", value_name = "ID", help = "Event id")]
        ids: Vec<String>,
        #[arg(long = "cluster-id", value_name = "CLUSTER_ID", help = "Owning cluster id")]
        cluster_ids: Vec<String>,
        #[arg(long = "type", value_name = "TYPE", help = "Event type (e.g. pod-register)")]
        types: Vec<EventType>,
        #[arg(long = "event-version", value_name = "VERSION", help = "Event version (e.g. v1)")]
        versions: Vec<EventVersion>,
        #[arg(long = "level", value_name = "LEVEL", help = "Event level (e.g. warning)")]
        levels: Vec<EventLevel>,
        #[arg(long, value_name = "RFC3339", help = "Earliest event time, inclusive")]
        start: Option<DateTime<Utc>>,
        #[arg(long, value_name = "RFC3339", help = "Latest event time, inclusive")]
        end: Option<DateTime<Utc>>,
        #[arg(long, value_enum, help = "Sort by time")]
        order: Option<OrderArg>,
        #[arg(long, default_value_t = 0, value_name = "N", help = "Maximum rows (0 = unlimited)")]
        limit: u64,
        #[arg(long, help = "Print the query statement instead of running it")]
        dry_run: bool,
    },
    #[command(
        about = "Generate shell completion script",
        long_about = "Generate shell completion script for your shell. Redirect output to your shell completion directory."
    )]
    #[command(arg_required_else_help = true)]
    Completion {
        #[arg(value_enum, value_name = "SHELL", help = "Target shell")]
        shell: Shell,
    },
    #[command(about = "Generate a man page")]
    Man {
        #[arg(
            long,
            value_name = "PATH",
            help = "Write man page to file (stdout when omitted)"
        )]
        output: Option<PathBuf>,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Commands::Init => app::init_store(&config::load_config(cli.config.as_deref())?),
        Commands::Ping => app::ping(&config::load_config(cli.config.as_deref())?),
        Commands::Create { file, log } => {
            let cfg = config::load_config(cli.config.as_deref())?;
            app::create_events(&cfg, &CreateCommand { file, log })
        }
        Commands::List {
            ids,
            cluster_ids,
            types,
            versions,
            levels,
            start,
            end,
            order,
            limit,
            dry_run,
        } => {
            let time_range = (start.is_some() || end.is_some()).then_some(TimeRange { start, end });
            let filter = EventFilter {
                ids,
                cluster_ids,
                types,
                versions,
                levels,
                condition: QueryCondition {
                    time_range,
                    order: order.map(Into::into),
                    limit,
                },
            };
            let cmd = ListCommand { filter, dry_run };
            if dry_run {
                return app::list_events(&config::AppConfig::default(), &cmd);
            }
            let cfg = config::load_config(cli.config.as_deref())?;
            app::list_events(&cfg, &cmd)
        }
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        Commands::Man { output } => {
            let man = clap_mangen::Man::new(Cli::command());
            match output {
                Some(path) => {
                    let mut bytes = Vec::new();
                    man.render(&mut bytes)?;
                    fs::write(path, bytes)?;
                }
                None => {
                    man.render(&mut io::stdout())?;
                }
            }
            Ok(())
        }
    }
}
