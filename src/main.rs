use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use subfilter::{app, cli, config};

#[derive(Debug, Parser)]
#[command(name = "subfilter")]
#[command(about = "Faceted subfilter panel for monitoring views")]
struct App {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run a render pass and print the subfilter panel with the matching records
    Render {
        /// View: latest, charts, items, hosts, problems
        #[arg(long)]
        view: Option<String>,
        /// JSON array of records (overrides source.records_path)
        #[arg(long)]
        records: Option<PathBuf>,
        /// Output format: table (default), json, html
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Select a facet value, e.g. `set tag_value:env prod`
    Set {
        dimension: String,
        value: String,
        #[arg(long)]
        view: Option<String>,
    },
    /// Remove a selected facet value
    Unset {
        dimension: String,
        value: String,
        #[arg(long)]
        view: Option<String>,
    },
    /// Remove every selected value of a view
    Clear {
        #[arg(long)]
        view: Option<String>,
    },
    /// Show the stored filter and subfilter selection
    Show {
        #[arg(long)]
        view: Option<String>,
    },
    /// Replace the primary filter of a view (clears its subfilter)
    Filter {
        #[arg(long)]
        view: Option<String>,
        /// Name search; `*` matches any characters
        #[arg(long)]
        name: Option<String>,
        /// Host id (repeatable)
        #[arg(long = "host")]
        hosts: Vec<String>,
        /// Severity name or level (repeatable)
        #[arg(long = "severity")]
        severities: Vec<String>,
        /// Tag condition TAG:OPERATOR[:VALUE] (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// How tag conditions combine: and-or (default) or or
        #[arg(long)]
        evaltype: Option<String>,
    },
    /// Show recent selection changes
    History {
        #[arg(long, default_value = "20")]
        limit: usize,
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Serve the HTML dashboard
    Serve {
        /// Bind address (overrides server.addr)
        #[arg(long)]
        addr: Option<String>,
        #[arg(long)]
        records: Option<PathBuf>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write the default config to ~/.subfilter/config.toml
    Init {
        #[arg(long)]
        force: bool,
    },
    /// Set a key, e.g. `display.tag_value_cap 10`
    Set { key: String, value: String },
    /// Overwrite the global config with defaults
    Reset,
}

fn main() -> Result<()> {
    let args = App::parse();
    let cfg = config::load();
    app::init_tracing(&cfg);

    match args.command {
        Commands::Render {
            view,
            records,
            format,
        } => {
            let fmt = cli::OutputFormat::from_str_opt(Some(&format));
            cli::run_render(&cfg, view.as_deref(), records.as_deref(), fmt)
        }
        Commands::Set {
            dimension,
            value,
            view,
        } => cli::run_set(&cfg, view.as_deref(), &dimension, &value),
        Commands::Unset {
            dimension,
            value,
            view,
        } => cli::run_unset(&cfg, view.as_deref(), &dimension, &value),
        Commands::Clear { view } => cli::run_clear(&cfg, view.as_deref()),
        Commands::Show { view } => cli::run_show(&cfg, view.as_deref()),
        Commands::Filter {
            view,
            name,
            hosts,
            severities,
            tags,
            evaltype,
        } => {
            let args = cli::FilterArgs {
                view,
                name,
                hosts,
                severities,
                tags,
                evaltype,
            };
            cli::run_filter(&cfg, &args)
        }
        Commands::History { limit, format } => {
            let fmt = cli::OutputFormat::from_str_opt(Some(&format));
            cli::run_history(&cfg, limit, fmt)
        }
        Commands::Serve { addr, records } => cli::run_serve(&cfg, addr.as_deref(), records.as_deref()),
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::run_config_show(),
            ConfigAction::Init { force } => cli::run_config_init(force),
            ConfigAction::Set { key, value } => cli::run_config_set(&key, &value),
            ConfigAction::Reset => cli::run_config_reset(),
        },
    }
}
