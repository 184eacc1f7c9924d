use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use appshelf::icon::DEFAULT_ICON_SIZE_PX;
use appshelf::query::{FilterSpec, SortSpec};

use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "appshelf",
    version,
    about = "Cached, filterable catalog of installed applications"
)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    pub format: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Directory of user-installed desktop entries (repeatable)
    #[arg(long = "user-dir", env = "APPSHELF_USER_DIR", value_delimiter = ':')]
    pub user_dirs: Vec<PathBuf>,

    /// Directory of system desktop entries (repeatable)
    #[arg(long = "system-dir", env = "APPSHELF_SYSTEM_DIRS", value_delimiter = ':')]
    pub system_dirs: Vec<PathBuf>,

    /// Directory searched for icons (repeatable, defaults to the XDG icon dirs)
    #[arg(long = "icon-dir", env = "APPSHELF_ICON_DIRS", value_delimiter = ':')]
    pub icon_dirs: Vec<PathBuf>,

    /// Icon size in pixels
    #[arg(
        long,
        default_value_t = DEFAULT_ICON_SIZE_PX,
        value_parser = clap::value_parser!(u32).range(1..=1024)
    )]
    pub icon_size: u32,

    /// Package id of the calling application, never listed
    #[arg(long, env = "APPSHELF_SELF")]
    pub exclude: Option<String>,

    /// Show user/system statistics after output
    #[arg(long, global = true)]
    pub stats: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FilterArg {
    All,
    User,
    System,
}

impl From<FilterArg> for FilterSpec {
    fn from(arg: FilterArg) -> Self {
        match arg {
            FilterArg::All => FilterSpec::All,
            FilterArg::User => FilterSpec::UserOnly,
            FilterArg::System => FilterSpec::SystemOnly,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortArg {
    NameAsc,
    NameDesc,
    InstallAsc,
    InstallDesc,
}

impl From<SortArg> for SortSpec {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::NameAsc => SortSpec::NameAsc,
            SortArg::NameDesc => SortSpec::NameDesc,
            SortArg::InstallAsc => SortSpec::InstallAsc,
            SortArg::InstallDesc => SortSpec::InstallDesc,
        }
    }
}

#[derive(clap::Args, Debug, Clone, Copy)]
pub struct QueryArgs {
    /// Which applications to include
    #[arg(long, value_enum, default_value = "all")]
    pub filter: FilterArg,

    /// Sort order
    #[arg(long, value_enum, default_value = "name-asc")]
    pub sort: SortArg,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List installed applications
    List {
        #[command(flatten)]
        query: QueryArgs,
    },

    /// Show details about one application
    Info {
        /// Package id (desktop-file id, e.g. org.mozilla.firefox)
        package_id: String,
    },

    /// Fuzzy search installed applications
    Search {
        /// Search query
        query: String,
    },

    /// Check if an application is installed (exit 0=yes, 1=no)
    Has {
        /// Package id
        package_id: String,
    },

    /// Rebuild the catalog periodically and print each new listing
    Watch {
        #[command(flatten)]
        query: QueryArgs,

        /// Seconds between refreshes
        #[arg(long, default_value_t = 5)]
        interval: u64,

        /// Stop after this many listings (runs until Ctrl-C when omitted)
        #[arg(long)]
        cycles: Option<u64>,
    },

    /// Generate shell completion script
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

impl ValueEnum for OutputFormat {
    fn value_variants<'a>() -> &'a [Self] {
        &[
            OutputFormat::Table,
            OutputFormat::Json,
            OutputFormat::Tsv,
            OutputFormat::Names,
            OutputFormat::Ids,
        ]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        match self {
            OutputFormat::Table => Some(clap::builder::PossibleValue::new("table")),
            OutputFormat::Json => Some(clap::builder::PossibleValue::new("json")),
            OutputFormat::Tsv => Some(clap::builder::PossibleValue::new("tsv")),
            OutputFormat::Names => Some(clap::builder::PossibleValue::new("names")),
            OutputFormat::Ids => Some(clap::builder::PossibleValue::new("ids")),
        }
    }
}
