use clap::Parser;
use mongosql::cli::Args;
use mongosql::cli_core;
use mongosql::config::Config;
use mongosql::logging;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let config_log_file = Config::config_path().map(|p| p.with_file_name("mongosql.log"));
    let _guard = logging::init(log_level, config_log_file);

    let exit_code = cli_core::run(args).await;
    std::process::exit(exit_code);
}
