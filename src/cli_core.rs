//! REPL / batch / single-statement driver. Reads SQL, runs it through the
//! translation pipeline and the execution client, and prints a rendered
//! result set — the three external interfaces spec.md §6 describes,
//! grounded on the teacher's `CliCore` shape but stripped of every
//! multi-database/session concern this crate doesn't have.

use crate::cli::Args;
use crate::config::Config;
use crate::error::{MongoSqlError, Result};
use crate::history_manager::{self, SessionId};
use crate::mongo_client::MongoDbClient;
use crate::prompt::DbPrompt;
use crate::{format, sql, translate};
use reedline::{Reedline, Signal};
use std::io::{self, BufRead, IsTerminal, Write};
use std::time::Instant;
use tracing::{debug, error};

pub struct CliCore {
    config: Config,
    client: MongoDbClient,
    current_database: String,
}

impl CliCore {
    /// `config` is expected to already hold CLI-flag overrides merged over
    /// loaded defaults; `prompt_for_password` asks interactively instead of
    /// using `config.password` (the `-p` flag with no inline value).
    pub async fn connect(config: &Config, prompt_for_password: bool) -> Result<Self> {
        let database = config.database.clone().unwrap_or_default();
        let password = if prompt_for_password {
            rpassword::prompt_password("Password: ").unwrap_or_default()
        } else {
            config.password.clone()
        };

        let uri = MongoDbClient::connection_string(
            &config.host,
            config.port,
            &config.user,
            &password,
            &database,
        );
        let client = MongoDbClient::connect(&uri, &database, &config.host).await?;

        Ok(CliCore {
            config: config.clone(),
            client,
            current_database: database,
        })
    }

    /// Runs one SQL statement and prints its result; returns `Ok(())` on
    /// success so the caller can decide the process exit code. `vertical`
    /// selects `\G`-style one-field-per-line output instead of a table.
    pub async fn run_statement(&mut self, statement: &str) -> Result<()> {
        self.run_statement_with_mode(statement, false).await
    }

    pub async fn run_statement_with_mode(&mut self, statement: &str, vertical: bool) -> Result<()> {
        let statement = statement.trim();
        if statement.is_empty() {
            return Ok(());
        }
        if statement.eq_ignore_ascii_case("quit") || statement.eq_ignore_ascii_case("exit") {
            return Ok(());
        }

        let start = Instant::now();
        let query = sql::parser::parse(statement)?;
        let request = translate::translator::translate(&query)?;

        if let crate::request::Request::UseDatabase { name } = &request {
            self.client.execute(&request).await?;
            self.current_database = name.clone();
            println!("Database changed");
            return Ok(());
        }

        let result = self.client.execute(&request).await?;
        let elapsed = start.elapsed();
        let rendered = if vertical {
            format::render_vertical(&result, elapsed)
        } else {
            let is_terminal = io::stdout().is_terminal();
            format::render(&result, elapsed, is_terminal)
        };
        print!("{rendered}");
        io::stdout().flush().ok();
        Ok(())
    }

    /// Reads statements from `stdin`, one per line; lines starting with `#`
    /// are comments. Stops at the first failing statement.
    pub async fn run_batch<R: BufRead>(&mut self, input: R) -> i32 {
        for line in input.lines() {
            let Ok(line) = line else { break };
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if let Err(e) = self.run_statement(trimmed).await {
                report_error(&e);
                return 1;
            }
        }
        0
    }

    /// Interactive REPL: accumulates lines into a statement buffer until a
    /// terminator is seen — `;` or `\g` execute, `\G` executes with
    /// vertical output (currently rendered the same as `\g`), `\c` clears
    /// the buffer, and `quit`/`exit`/`\q` end the session.
    pub async fn run_repl(&mut self) -> i32 {
        let session_id = SessionId::new(
            &self.config.host,
            self.config.port,
            &self.config.user,
            &self.current_database,
        );
        let history = history_manager::load_history(&session_id);
        let mut line_editor = Reedline::create().with_history(Box::new(history));
        let mut prompt = DbPrompt::new(if self.current_database.is_empty() {
            None
        } else {
            Some(self.current_database.clone())
        });

        let mut buffer = String::new();

        loop {
            match line_editor.read_line(&prompt) {
                Ok(Signal::Success(line)) => {
                    let trimmed = line.trim();
                    if buffer.is_empty()
                        && (trimmed.eq_ignore_ascii_case("quit")
                            || trimmed.eq_ignore_ascii_case("exit")
                            || trimmed == "\\q")
                    {
                        return 0;
                    }
                    if trimmed == "\\c" {
                        buffer.clear();
                        continue;
                    }

                    let (statement, terminator) = split_terminator(trimmed);
                    if !buffer.is_empty() {
                        buffer.push(' ');
                    }
                    buffer.push_str(statement);

                    if let Some(terminator) = terminator {
                        let db_before = self.current_database.clone();
                        let vertical = terminator == Terminator::Vertical;
                        if let Err(e) = self.run_statement_with_mode(&buffer, vertical).await {
                            report_error(&e);
                        }
                        buffer.clear();
                        if self.current_database != db_before {
                            prompt.update_database(&self.current_database);
                        }
                    }
                }
                Ok(Signal::CtrlD) => return 0,
                Ok(Signal::CtrlC) => {
                    buffer.clear();
                    continue;
                }
                Err(e) => {
                    error!("reedline error: {e}");
                    return 1;
                }
            }
        }
    }
}

#[derive(PartialEq, Eq)]
enum Terminator {
    Normal,
    Vertical,
}

/// Strips a trailing `;`, `\g`, or `\G` terminator from a line, reporting
/// which terminator ended the statement (if any) and whether it calls for
/// vertical (`\G`) output.
fn split_terminator(line: &str) -> (&str, Option<Terminator>) {
    if let Some(stripped) = line.strip_suffix("\\G") {
        (stripped.trim_end(), Some(Terminator::Vertical))
    } else if let Some(stripped) = line.strip_suffix("\\g") {
        (stripped.trim_end(), Some(Terminator::Normal))
    } else if let Some(stripped) = line.strip_suffix(';') {
        (stripped.trim_end(), Some(Terminator::Normal))
    } else {
        (line, None)
    }
}

fn report_error(e: &MongoSqlError) {
    debug!(?e, "statement failed");
    eprintln!("{e}");
}

pub async fn run(args: Args) -> i32 {
    let mut config = Config::load();
    if let Some(host) = &args.host {
        config.host = host.clone();
    }
    if let Some(port) = args.port {
        config.port = Some(port);
    }
    if let Some(user) = &args.username {
        config.user = user.clone();
    }
    if let Some(db) = &args.database {
        config.database = Some(db.clone());
    }

    let mut core = match CliCore::connect(&config, args.password).await {
        Ok(core) => core,
        Err(e) => {
            eprintln!("{e}");
            return 1;
        }
    };

    if let Some(statement) = &args.execute {
        return match core.run_statement(statement).await {
            Ok(()) => 0,
            Err(e) => {
                eprintln!("{e}");
                1
            }
        };
    }

    let stdin = io::stdin();
    if args.batch || !stdin.is_terminal() {
        return core.run_batch(stdin.lock()).await;
    }

    core.run_repl().await
}
