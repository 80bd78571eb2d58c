use anyhow::Result;
use std::sync::Arc;
use story2comic::core::config::Config;
use story2comic::core::error::GenerationError;
use story2comic::core::io::NativeStorage;
use story2comic::services::image::GeminiImageClient;
use story2comic::services::llm::GeminiClient;
use story2comic::services::setup;
use story2comic::services::workflow::WorkflowManager;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let mut config = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            eprintln!("Please ensure 'config.yml' exists with valid settings.");
            return Err(e);
        }
    };

    config.ensure_directories()?;

    // Resolve the API credential up front; clients take it explicitly.
    setup::run_setup(&mut config)?;
    let api_key = config
        .gemini
        .api_key
        .clone()
        .ok_or(GenerationError::MissingCredential)?;

    let story_llm = Box::new(GeminiClient::new(&api_key, &config.gemini.story_model));
    let prompt_llm = Box::new(GeminiClient::new(&api_key, &config.gemini.prompt_model));
    let image_client = Box::new(GeminiImageClient::new(&api_key, &config.gemini.image_model));
    let storage = Arc::new(NativeStorage::new());

    let mut manager =
        WorkflowManager::new(config, story_llm, prompt_llm, image_client, storage).await?;
    manager.run().await?;

    Ok(())
}
