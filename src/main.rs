use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use dotenv::dotenv;
use eyre::Result;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

use nexus_lead_chat::chat::ChatService;
use nexus_lead_chat::chat::lead_store::LeadStore;
use nexus_lead_chat::chat::prompt::system_instruction;
use nexus_lead_chat::config::Cli;
use nexus_lead_chat::gateway::{CompletionSource, ModelGateway};
use nexus_lead_chat::gemini_client::GeminiClient;
use nexus_lead_chat::web_server::{self, AppState};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load environment variables from .env file
    dotenv().ok();

    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    info!("Starting lead chat server");

    let source: Option<Arc<dyn CompletionSource>> =
        match GeminiClient::new(cli.api_key.clone(), &cli.api_base_url, cli.request_timeout()) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                error!("Failed to initialize Gemini client: {}", e);
                None
            }
        };

    let gateway = ModelGateway::initialize(source, &cli.models()).await;
    match gateway.model() {
        Some(model) => info!("Model gateway ready with {}", model),
        None => error!("No model available, chat requests will be refused"),
    }

    let leads = LeadStore::new(&cli.leads_file);
    info!("Qualified leads are appended to {}", leads.path().display());

    let chat = ChatService::new(Arc::new(gateway), system_instruction(&cli.company_name), leads)
        .with_sessions(cli.sessions());

    let app = web_server::router(AppState::new(Arc::new(chat)), &cli.static_dir);
    web_server::start_web_server(cli.bind_addr(), app).await?;

    Ok(ExitCode::SUCCESS)
}
