use std::sync::Arc;

use loan_assist::config::Config;
use loan_assist::llm::{LlmBackend, LlmConfig, create_provider};
use loan_assist::orchestrator::{Orchestrator, OrchestratorDeps};
use loan_assist::sanction::{ArtifactStore, TextLetterRenderer};
use loan_assist::server::{AppState, app_routes};
use loan_assist::services::{CustomerDirectory, FixedOfferCatalog, LibSqlDirectory, RandomizedCreditBureau};
use loan_assist::session::InMemorySessionStore;
use loan_assist::underwriting::VarianceDemoEvaluator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Config::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export GEMINI_API_KEY=...");
        std::process::exit(1);
    });

    eprintln!("💰 Loan Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.model);
    eprintln!("   Chat WS: ws://0.0.0.0:{}/ws/chat", config.port);
    eprintln!(
        "   Letters: http://0.0.0.0:{}/download_sanction_letter/<file>",
        config.port
    );

    // NL provider
    let llm = create_provider(&LlmConfig {
        backend: LlmBackend::Gemini,
        api_key: config.gemini_api_key.clone(),
        model: config.model.clone(),
    });

    // Customer directory (seeded synthetic data)
    let directory: Arc<dyn CustomerDirectory> =
        Arc::new(LibSqlDirectory::open_local(&config.directory_db_path).await?);
    eprintln!("   Directory DB: {}", config.directory_db_path.display());

    // Sanction letter storage
    let artifacts = Arc::new(ArtifactStore::new(&config.letters_dir));
    artifacts.ensure_dir().await?;
    eprintln!("   Letters dir: {}\n", config.letters_dir.display());

    // The demo wiring uses the randomized doubles for new customers; the
    // decision engine itself stays deterministic.
    let orchestrator = Arc::new(Orchestrator::new(OrchestratorDeps {
        llm,
        directory,
        credit: Arc::new(RandomizedCreditBureau::demo()),
        offers: Arc::new(FixedOfferCatalog::demo()),
        proof: Arc::new(VarianceDemoEvaluator),
        renderer: Arc::new(TextLetterRenderer),
        artifacts: Arc::clone(&artifacts),
    }));

    let state = AppState {
        sessions: Arc::new(InMemorySessionStore::new()),
        orchestrator,
        artifacts,
    };

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(port = config.port, "loan-assist server started");
    axum::serve(listener, app_routes(state)).await?;

    Ok(())
}
