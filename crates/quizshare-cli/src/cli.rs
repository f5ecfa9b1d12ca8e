use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "quizshare")]
#[command(about = "Share quizzes with your community, online or offline")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Optional path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Share a quiz on the LAN server (saved offline when unreachable)
    Share {
        /// Quiz JSON file (reads stdin when omitted)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
        /// Title shown to the community (defaults to the quiz title)
        #[arg(long)]
        title: Option<String>,
        /// Description shown to the community
        #[arg(long)]
        description: Option<String>,
        /// Author name (defaults to the saved user name)
        #[arg(long, value_name = "NAME")]
        user: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List community quizzes
    List {
        /// Number of quizzes to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Search community quizzes
    Search {
        /// Keyword matched against title, description and author
        query: String,
        /// Number of quizzes to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Take a quiz
    #[command(alias = "take")]
    Start {
        /// Quiz ID
        id: String,
        /// Move to the next question after each answer
        #[arg(long)]
        auto_advance: bool,
        /// Print the quiz as JSON instead of starting a session
        #[arg(long)]
        json: bool,
    },
    /// Show server connection status
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage the LAN quiz server address
    Server {
        #[command(subcommand)]
        command: ServerCommands,
    },
    /// Show or change the author name
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Community quizzes stored in the cloud document
    Cloud {
        #[command(subcommand)]
        command: CloudCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum ServerCommands {
    /// Test and save a server address (e.g. 192.168.1.5:3000)
    Set {
        /// Server address
        address: String,
    },
    /// Forget the saved server address
    Clear,
    /// Look for a server on the local network
    Discover,
    /// Show the addresses reported by the current server
    Info {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Show the saved author name
    Show,
    /// Save the author name used when sharing
    Set {
        /// Author name
        name: String,
    },
}

#[derive(Subcommand)]
pub enum CloudCommands {
    /// Merge the cloud document into the local cache
    Sync {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List cached cloud quizzes without contacting the cloud
    List {
        /// Number of quizzes to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Search cloud quizzes
    Search {
        /// Keyword matched against title, description and author
        query: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Publish a quiz to the cloud document
    Share {
        /// Quiz JSON file (reads stdin when omitted)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
        /// Title shown to the community (defaults to the quiz title)
        #[arg(long)]
        title: Option<String>,
        /// Author name (defaults to the saved user name)
        #[arg(long, value_name = "NAME")]
        user: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Keep syncing in the foreground until interrupted
    Watch {
        /// Seconds between syncs (defaults to the configured interval)
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,
    },
}
