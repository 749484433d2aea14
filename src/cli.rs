use crate::buckets::Period;
use crate::series::Metric;

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodArg {
    /// Last 24 hours, one bucket per hour
    Hour,
    /// One bucket per day with activity
    Day,
}

impl From<PeriodArg> for Period {
    fn from(p: PeriodArg) -> Self {
        match p {
            PeriodArg::Hour => Period::Hour,
            PeriodArg::Day => Period::Day,
        }
    }
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricArg {
    Requests,
    Tokens,
}

impl From<MetricArg> for Metric {
    fn from(m: MetricArg) -> Self {
        match m {
            MetricArg::Requests => Metric::Requests,
            MetricArg::Tokens => Metric::Tokens,
        }
    }
}

#[derive(clap::Subcommand, Debug, Clone)]
pub enum Command {
    /// Render usage statistics from a management API payload (default)
    Report,
    /// Inspect or edit the per-model price table
    #[command(subcommand)]
    Prices(PricesCommand),
}

#[derive(clap::Subcommand, Debug, Clone)]
pub enum PricesCommand {
    /// List configured prices
    List,
    /// Set prompt/completion price per 1M tokens for a model
    Set {
        model: String,
        prompt: f64,
        completion: f64,
    },
    /// Remove a model's price
    Remove { model: String },
    /// Remove every price
    Clear,
}

#[derive(clap::Parser, Debug)]
#[command(version, about = "Usage statistics and cost accounting for a proxy management API")]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Read the `GET /usage` response from a file instead of stdin
    #[arg(long, global = true)]
    pub input: Option<String>,

    /// SQLite file for persisted prices
    #[arg(long, global = true, env = "PROXY_USAGE_DB_PATH")]
    pub db_path: Option<String>,

    /// Emit JSON instead of colored text
    #[arg(long, global = true)]
    pub json: bool,

    /// Chart period: hour|day
    #[arg(long, value_enum, default_value_t = PeriodArg::Hour)]
    pub period: PeriodArg,

    /// Chart metric: requests|tokens
    #[arg(long, value_enum, default_value_t = MetricArg::Requests)]
    pub metric: MetricArg,

    /// Rolling window for live rates, in minutes
    #[arg(long = "window", default_value_t = 30)]
    pub window_minutes: u32,

    /// Chart lines: model names or `all`; unset slots are auto-filled
    #[arg(long = "line", value_delimiter = ',')]
    pub lines: Vec<String>,

    /// Number of chart lines when `--line` is not given
    #[arg(long, default_value_t = 3)]
    pub line_count: usize,

    /// Upper bound on chart lines
    #[arg(long, default_value_t = 9, env = "PROXY_USAGE_MAX_LINES")]
    pub max_lines: usize,

    /// Mask credential-like request sources
    #[arg(long)]
    pub mask_sources: bool,

    /// List this many of the most recent requests
    #[arg(long, default_value_t = 0)]
    pub details: usize,

    /// Debug mode: verbose logging on stderr
    #[arg(long, env = "PROXY_USAGE_DEBUG")]
    pub debug: bool,
}

impl Args {
    pub fn parse() -> Self {
        <Args as clap::Parser>::parse()
    }
}
