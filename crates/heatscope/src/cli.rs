use crate::error::{Error, Result};
use crate::heatmap::{CategoryMode, Metric, ScaleMode, ViewSettings};
use chrono::{DateTime, TimeDelta, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "heatscope")]
#[command(about = "Terminal heatmap of database query metrics over time")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Metrics database path
    #[arg(long, global = true, env = "HEATSCOPE_DB", default_value = "heatscope.db")]
    pub db: PathBuf,

    /// Log file path
    #[arg(long, global = true, default_value = "heatscope.log")]
    pub log_file: PathBuf,

    /// Also log to stderr (non-interactive commands)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Interactive heatmap (default)
    View {
        #[command(flatten)]
        args: ViewArgs,

        /// Append chosen drill-down actions as JSON lines to this file
        #[arg(long)]
        actions_out: Option<PathBuf>,
    },

    /// Fetch once and print the matrix
    Dump {
        #[command(flatten)]
        args: ViewArgs,

        /// Output as JSON
        #[arg(long, conflicts_with = "csv")]
        json: bool,

        /// Output as CSV
        #[arg(long)]
        csv: bool,
    },

    /// Execute raw SQL on the metrics database
    Query {
        /// SQL query to execute
        sql: String,
    },

    /// Fill the metrics database with synthetic query log rows
    Seed {
        /// Time span to cover, ending now
        #[arg(long, default_value = "6h", value_parser = parse_duration)]
        span: Duration,

        /// Average queries per minute
        #[arg(long, default_value = "30")]
        rate: u32,

        /// Cluster name stored on every row
        #[arg(long, default_value = "main")]
        cluster: String,

        /// RNG seed for reproducible data
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

/// Window and grouping options shared by `view` and `dump`
#[derive(Args, Debug, Clone)]
pub struct ViewArgs {
    /// Only rows from this cluster
    #[arg(long)]
    pub cluster: Option<String>,

    /// Show the last N duration, ending now
    #[arg(long, default_value = "6h", value_parser = parse_duration, conflicts_with_all = ["from", "to"])]
    pub last: Duration,

    /// Window start (RFC 3339)
    #[arg(long, value_parser = parse_time, requires = "to")]
    pub from: Option<DateTime<Utc>>,

    /// Window end (RFC 3339)
    #[arg(long, value_parser = parse_time, requires = "from")]
    pub to: Option<DateTime<Utc>>,

    /// Value plotted in each cell
    #[arg(long, short = 'm', value_enum, default_value_t = Metric::Queries)]
    pub metric: Metric,

    /// Row grouping
    #[arg(long, short = 'c', value_enum, default_value_t = CategoryMode::QueryHash)]
    pub category: CategoryMode,

    /// Color scale
    #[arg(long, short = 's', value_enum, default_value_t = ScaleMode::Linear)]
    pub scale: ScaleMode,

    /// Only this category value
    #[arg(long, short = 'f')]
    pub filter: Option<String>,

    /// Keep only the N categories with the largest totals
    #[arg(long, short = 'n')]
    pub max_categories: Option<usize>,
}

impl Default for ViewArgs {
    fn default() -> Self {
        ViewArgs {
            cluster: None,
            last: Duration::from_secs(6 * 3600),
            from: None,
            to: None,
            metric: Metric::default(),
            category: CategoryMode::default(),
            scale: ScaleMode::default(),
            filter: None,
            max_categories: None,
        }
    }
}

impl ViewArgs {
    /// Absolute window: `--from/--to` if given, else `--last` ending at `now`
    pub fn window(&self, now: DateTime<Utc>) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        match (self.from, self.to) {
            (Some(from), Some(to)) => Ok((from, to)),
            (None, None) => {
                let last = TimeDelta::from_std(self.last).map_err(|_| {
                    Error::InvalidArgument(format!(
                        "--last {} is too large",
                        humantime::format_duration(self.last)
                    ))
                })?;
                let from = now.checked_sub_signed(last).ok_or_else(|| {
                    Error::InvalidArgument(format!(
                        "--last {} reaches before the earliest supported time",
                        humantime::format_duration(self.last)
                    ))
                })?;
                Ok((from, now))
            }
            _ => Err(Error::InvalidArgument(
                "--from and --to must be given together".to_string(),
            )),
        }
    }

    pub fn settings(&self) -> ViewSettings {
        ViewSettings {
            metric: self.metric,
            category_mode: self.category,
            scale: self.scale,
            cluster: self.cluster.clone(),
            category_filter: self.filter.clone(),
            category_limit: self.max_categories,
        }
    }

    fn validate(&self) -> Result<()> {
        match (self.from, self.to) {
            (Some(from), Some(to)) if from >= to => {
                return Err(Error::InvalidTimeRange {
                    from: from.to_rfc3339(),
                    to: to.to_rfc3339(),
                });
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err(Error::InvalidArgument(
                    "--from and --to must be given together".to_string(),
                ));
            }
            _ => {}
        }

        if self.last.is_zero() {
            return Err(Error::InvalidArgument("--last must be positive".to_string()));
        }

        if self.max_categories == Some(0) {
            return Err(Error::InvalidArgument(
                "--max-categories must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    if let Ok(d) = humantime::parse_duration(s) {
        return Ok(d);
    }

    // Bare number as seconds
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    Err(format!(
        "Invalid duration '{}'. Examples: 30s, 5m, 2h, 1h30m, 90",
        s
    ))
}

fn parse_time(s: &str) -> std::result::Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("Invalid time '{}': {}. Example: 2024-05-01T12:00:00Z", s, e))
}

impl Cli {
    pub fn validate(&self) -> Result<()> {
        match &self.command {
            None => Ok(()),
            Some(Command::View { args, .. }) | Some(Command::Dump { args, .. }) => args.validate(),
            Some(Command::Seed { span, rate, .. }) => {
                if span.is_zero() {
                    return Err(Error::InvalidArgument("--span must be positive".to_string()));
                }
                if *rate == 0 {
                    return Err(Error::InvalidArgument("--rate must be at least 1".to_string()));
                }
                Ok(())
            }
            Some(Command::Query { .. }) | Some(Command::Completions { .. }) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("heatscope").chain(args.iter().copied())).unwrap()
    }

    fn view_args(cli: &Cli) -> &ViewArgs {
        match &cli.command {
            Some(Command::View { args, .. }) | Some(Command::Dump { args, .. }) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("90").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn test_view_defaults() {
        let cli = parse(&["view"]);
        let args = view_args(&cli);
        assert_eq!(args.last, Duration::from_secs(6 * 3600));
        assert_eq!(args.metric, Metric::Queries);
        assert_eq!(args.category, CategoryMode::QueryHash);
        assert_eq!(args.scale, ScaleMode::Linear);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_value_names() {
        let cli = parse(&[
            "dump",
            "--metric",
            "read-rows",
            "--category",
            "query-hash",
            "--scale",
            "log10",
            "--max-categories",
            "5",
        ]);
        let settings = view_args(&cli).settings();
        assert_eq!(settings.metric, Metric::ReadRows);
        assert_eq!(settings.scale, ScaleMode::Log10);
        assert_eq!(settings.category_limit, Some(5));

        let cli = parse(&["dump", "--metric", "memory"]);
        assert_eq!(view_args(&cli).metric, Metric::MemoryUsage);
    }

    #[test]
    fn test_window_from_last() {
        let cli = parse(&["view", "--last", "1h"]);
        let now = DateTime::from_timestamp(10_000, 0).unwrap();
        let (from, to) = view_args(&cli).window(now).unwrap();
        assert_eq!(to, now);
        assert_eq!(from.timestamp(), 10_000 - 3600);
    }

    #[test]
    fn test_window_out_of_range_is_an_error() {
        let cli = parse(&["view", "--last", "1000000years"]);
        assert!(cli.validate().is_ok());
        assert!(matches!(
            view_args(&cli).window(Utc::now()),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_explicit_window() {
        let cli = parse(&[
            "view",
            "--from",
            "2024-05-01T10:00:00Z",
            "--to",
            "2024-05-01T12:00:00+00:00",
        ]);
        let (from, to) = view_args(&cli).window(Utc::now()).unwrap();
        assert_eq!(to - from, TimeDelta::hours(2));
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        let inverted = parse(&[
            "view",
            "--from",
            "2024-05-01T12:00:00Z",
            "--to",
            "2024-05-01T10:00:00Z",
        ]);
        assert!(matches!(
            inverted.validate(),
            Err(Error::InvalidTimeRange { .. })
        ));

        assert!(parse(&["view", "--last", "0"]).validate().is_err());
        assert!(parse(&["dump", "--max-categories", "0"]).validate().is_err());
        assert!(parse(&["seed", "--rate", "0"]).validate().is_err());
    }

    #[test]
    fn test_from_requires_to() {
        let result = Cli::try_parse_from(["heatscope", "view", "--from", "2024-05-01T10:00:00Z"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_no_subcommand_is_valid() {
        let cli = parse(&[]);
        assert!(cli.command.is_none());
        assert!(cli.validate().is_ok());
    }
}
