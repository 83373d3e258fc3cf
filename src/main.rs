use captcha_payout::application::engine::{Engine, Rules, Stores};
use captcha_payout::config::Settings;
use captcha_payout::domain::challenge::AnswerGenerator;
use captcha_payout::interfaces::console::{ConsoleNotifier, TextRenderer};
use captcha_payout::interfaces::csv::account_writer::AccountWriter;
use captcha_payout::interfaces::csv::event_reader::EventReader;
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DRAFT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Inbound events CSV file (user, kind, payload, name, handle, message)
    input: PathBuf,

    /// Settings file; the embedded defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for deterministic challenge answers
    #[arg(long)]
    seed: Option<u64>,

    /// Overrides the administrator identity from the settings
    #[arg(long, env = "CAPTCHA_PAYOUT_ADMIN_ID")]
    admin_id: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref()).into_diagnostic()?;
    if let Some(admin_id) = cli.admin_id {
        settings.admin.id = admin_id;
    }
    let rules = Rules::try_from(&settings).into_diagnostic()?;
    info!(admin = rules.admin_id, policy = ?rules.refund_policy, "Settings loaded");

    let generator = match cli.seed {
        Some(seed) => AnswerGenerator::seeded(seed),
        None => AnswerGenerator::new(),
    };
    let engine = Arc::new(Engine::new(
        rules,
        Stores::in_memory(),
        Box::new(ConsoleNotifier::new()),
        Box::new(TextRenderer),
        generator,
    ));
    let sweeper = Arc::clone(&engine).spawn_draft_sweeper(DRAFT_SWEEP_INTERVAL);

    // Replay events
    let file = File::open(cli.input).into_diagnostic()?;
    let reader = EventReader::new(file);
    for event_result in reader.events() {
        match event_result {
            Ok(event) => engine.handle(event).await,
            Err(e) => {
                eprintln!("Error reading event: {}", e);
            }
        }
    }
    sweeper.abort();

    // Output final state
    let accounts = engine.accounts().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = AccountWriter::new(stdout.lock());
    writer.write_accounts(accounts).into_diagnostic()?;

    Ok(())
}
