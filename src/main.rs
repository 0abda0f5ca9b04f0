use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use ragchat::config::{EnvSecrets, LayeredSecrets, RelayConfig, TomlSecrets};
use ragchat::conversation::{ChatDisplay, Conversation};
use ragchat::revival::{RevivalObserver, RevivalPolicy};
use ragchat::session::{MEDICAL_DISCLAIMER, SessionContext};
use ragchat::telemetry::{self, OutputFormat, TelemetryConfig};
use ragchat::{RelayClient, RelayError};

/// Ask Betsy! - terminal chat against a LightRAG backend
#[derive(Parser)]
#[command(name = "ragchat", version)]
struct Cli {
    /// TOML secrets file; environment variables take precedence over it.
    #[arg(long, env = "RAGCHAT_SECRETS", default_value = ".streamlit/secrets.toml")]
    secrets: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides RAGCHAT_LOG_LEVEL.
    #[arg(long)]
    log_level: Option<String>,

    /// Log format (text, json, json-compact); overrides RAGCHAT_LOG_FORMAT.
    #[arg(long)]
    log_format: Option<OutputFormat>,

    /// Also write logs to this file; overrides RAGCHAT_LOG_FILE.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Replace the default system prompt.
    #[arg(long)]
    system_prompt: Option<String>,

    /// Health probes before giving up on the backend.
    #[arg(long, default_value_t = 4)]
    revival_attempts: u32,
}

/// Prints each reply incrementally
#[derive(Default)]
struct StdoutDisplay {
    printed: usize,
}

impl ChatDisplay for StdoutDisplay {
    fn render_user(&mut self, _content: &str) {
        self.printed = 0;
        print!("Betsy: ");
        let _ = std::io::stdout().flush();
    }

    fn render_assistant_partial(&mut self, markdown: &str) {
        if let Some(suffix) = markdown.get(self.printed..) {
            print!("{suffix}");
            let _ = std::io::stdout().flush();
        }
        self.printed = markdown.len();
    }

    fn render_assistant_final(&mut self, _markdown: &str) {
        println!("\n");
    }
}

struct ConsoleObserver;

impl RevivalObserver for ConsoleObserver {
    fn on_attempt(&mut self, attempt: u32, _max_attempts: u32) {
        if attempt > 1 {
            eprintln!("Waking up the server... (attempt {attempt})");
        }
    }

    fn on_exhausted(&mut self, _attempts: u32) {
        eprintln!("Failed to wake up the server. Please try again later.");
    }
}

async fn read_line(lines: &mut Lines<BufReader<Stdin>>, prompt: &str) -> Option<String> {
    print!("{prompt}");
    let _ = std::io::stdout().flush();
    match lines.next_line().await {
        Ok(line) => line.map(|l| l.trim().to_string()),
        Err(e) => {
            tracing::error!("Failed to read stdin: {}", e);
            None
        }
    }
}

/// Warn by default, then the environment, then command-line flags
fn telemetry_config(cli: &Cli) -> ragchat::Result<TelemetryConfig> {
    let mut builder = TelemetryConfig::builder()
        .log_level(tracing::Level::WARN)
        .with_env()?;
    if let Some(level) = &cli.log_level {
        builder = builder.log_level_str(level)?;
    }
    if let Some(format) = cli.log_format {
        builder = builder.output_format(format);
    }
    if let Some(path) = &cli.log_file {
        builder = builder.log_file(path.clone());
    }
    Ok(builder.build())
}

fn load_config(cli: &Cli) -> ragchat::Result<RelayConfig> {
    let mut secrets = LayeredSecrets::new().layer(EnvSecrets::new());
    if cli.secrets.exists() {
        secrets = secrets.layer(TomlSecrets::from_path(&cli.secrets)?);
    } else {
        tracing::debug!("No secrets file at {}", cli.secrets.display());
    }
    RelayConfig::from_secrets(&secrets)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let telemetry_config = match telemetry_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let _guard = match telemetry::init_subscriber(telemetry_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let credentials = config.credentials.clone();
    let client = match RelayClient::new(config) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let conversation = Conversation::new(client)
        .with_revival_policy(RevivalPolicy::new().with_max_attempts(cli.revival_attempts));

    let mut session = SessionContext::new();
    if let Some(prompt) = cli.system_prompt {
        session.set_system_prompt(prompt);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Ask Betsy!\n\n{MEDICAL_DISCLAIMER}\n");

    while !session.is_logged_in() {
        let Some(username) = read_line(&mut lines, "Username: ").await else {
            return ExitCode::SUCCESS;
        };
        let Some(password) = read_line(&mut lines, "Password: ").await else {
            return ExitCode::SUCCESS;
        };
        match session.login(&username, &password, credentials.as_ref()) {
            Ok(()) => println!("Login successful!\n"),
            Err(e) => eprintln!("{e}"),
        }
    }

    println!("Commands: /prompt <text>, /clear, /quit\n");

    let mut display = StdoutDisplay::default();
    let mut observer = ConsoleObserver;
    while let Some(line) = read_line(&mut lines, "You: ").await {
        if line.is_empty() {
            continue;
        }
        if line == "/quit" {
            break;
        }
        if line == "/clear" {
            session.restart();
            println!("Chat cleared.\n");
            continue;
        }
        if let Some(prompt) = line.strip_prefix("/prompt") {
            let prompt = prompt.trim();
            if prompt.is_empty() {
                println!("{}\n", session.system_prompt());
            } else {
                session.set_system_prompt(prompt);
                println!("System prompt updated.\n");
            }
            continue;
        }

        match conversation
            .submit_prompt(&mut session, &line, &mut display, &mut observer)
            .await
        {
            Ok(_) => {}
            Err(RelayError::ServerUnavailable { .. }) => {}
            Err(e) => eprintln!("error: {e}"),
        }
    }

    ExitCode::SUCCESS
}
