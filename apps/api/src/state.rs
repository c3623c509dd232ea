use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::render::Renderer;
use crate::storage::FileStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub llm: LlmClient,
    pub store: FileStore,
    /// DOCX template renderer. The template is re-read on every render.
    pub renderer: Renderer,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config, llm: LlmClient) -> Self {
        Self {
            llm,
            store: FileStore::new(&config.data_dir),
            renderer: Renderer::new(&config.template_path),
            config,
        }
    }
}
