use clap::Parser;

/// mongosql - translate MariaDB/MySQL-dialect SQL into MongoDB operations
#[derive(Parser, Clone, Debug)]
#[command(name = "mongosql")]
#[command(version, long_about = None)]
#[command(about = "Run MariaDB/MySQL-dialect SQL against a MongoDB database")]
#[command(arg_required_else_help = false)]
pub struct Args {
    /// Database to use
    #[arg(value_name = "DATABASE")]
    pub database: Option<String>,

    /// MongoDB host to connect to
    #[arg(short = 'h', long)]
    pub host: Option<String>,

    /// MongoDB port
    #[arg(short = 'P', long)]
    pub port: Option<u16>,

    /// MongoDB username
    #[arg(short = 'u', long = "username")]
    pub username: Option<String>,

    /// Prompt for a password interactively instead of reading one from config
    #[arg(short = 'p', long)]
    pub password: bool,

    /// Execute one SQL statement and exit
    #[arg(short = 'e', long)]
    pub execute: Option<String>,

    /// Treat stdin as a batch of statements, one per line (`#` starts a comment)
    #[arg(long)]
    pub batch: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
