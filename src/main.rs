use std::net::SocketAddr;
use std::sync::Arc;

use log::{error, info, warn};

use voxnova::config::Config;
use voxnova::mistral::MistralClient;
use voxnova::routes;
use voxnova::state::AppState;
use voxnova::tts::{ENGINE_BINARY, SynthesisEngine};
use voxnova::utils::logger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logger::init_logger();

    let config = Config::from_env();

    // Artifacts accumulate here until removed out-of-band
    std::fs::create_dir_all(&config.audio_dir)?;

    let mistral = match &config.mistral_api_key {
        Some(key) => match MistralClient::new(key, config.mistral_api_base.as_deref()) {
            Ok(client) => Some(client),
            Err(e) => {
                error!("Failed to initialize Mistral client: {}", e);
                None
            }
        },
        None => {
            warn!("MISTRAL_API_KEY not set; chat endpoints disabled, pitch estimation will use the heuristic");
            None
        }
    };

    let engine = SynthesisEngine::new(&config);
    if engine.is_available() {
        info!("Synthesis engine `{}` found in PATH", ENGINE_BINARY);
    } else {
        warn!(
            "Synthesis engine `{}` not found in PATH; synthesis requests will fail",
            ENGINE_BINARY
        );
    }

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let state = Arc::new(AppState {
        config,
        mistral,
        engine,
    });

    let app = routes::router(state);

    info!("voxnova listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
