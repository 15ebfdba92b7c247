//! Command-line interface.

use clap::{Parser, Subcommand};

/// Browse the MOEX engine / market / security / board taxonomy and export
/// end-of-day history as SQL.
#[derive(Parser, Debug)]
#[command(name = "moex-eod", version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path (can also be set via EOD_CONFIG env var)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Print Prometheus counters to stderr on exit
    #[arg(long, global = true)]
    pub dump_metrics: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List trading engines
    Engines,

    /// List markets of an engine
    Markets {
        #[arg(short, long)]
        engine: String,
    },

    /// List securities of a market
    Securities {
        #[arg(short, long)]
        engine: String,
        #[arg(short, long)]
        market: String,
    },

    /// Show a security's description and boards
    Describe {
        /// Symbol, optionally followed by a description ("SBER Sberbank")
        #[arg(short, long)]
        security: String,
    },

    /// Fetch end-of-day history and export it as SQL
    History {
        #[arg(short, long)]
        engine: String,
        #[arg(short, long)]
        market: String,
        /// Board; all boards when omitted
        #[arg(short, long)]
        board: Option<String>,
        /// Symbol, optionally followed by a description
        #[arg(short, long)]
        security: String,
        /// Do not write the SQL script
        #[arg(long)]
        no_export: bool,
    },
}

/// How results are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl Cli {
    pub fn format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_history() {
        let cli = Cli::try_parse_from([
            "moex-eod", "--json", "history", "-e", "stock", "-m", "shares", "-s", "SBER", "--no-export",
        ])
        .unwrap();

        assert_eq!(cli.format(), OutputFormat::Json);
        assert_eq!(
            cli.command,
            Command::History {
                engine: "stock".to_string(),
                market: "shares".to_string(),
                board: None,
                security: "SBER".to_string(),
                no_export: true,
            }
        );
    }

    #[test]
    fn test_securities_requires_market() {
        assert!(Cli::try_parse_from(["moex-eod", "securities", "--engine", "stock"]).is_err());
    }
}
