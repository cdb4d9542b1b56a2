pub mod error;
pub mod routes;

use std::sync::Arc;

use services::services::{
    captioning::GeminiCaptioner,
    config::AppConfig,
    drafts::InMemoryDraftStore,
    media::{FfmpegBrander, HttpMediaAcquirer, ffmpeg::FFmpegClient},
    notifier::TwilioNotifier,
    orchestrator::{Collaborators, Orchestrator, OrchestratorSettings},
    social::{MetaGraphClient, Publisher},
};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub orchestrator: Orchestrator,
    /// Also reachable through the orchestrator; the manual endpoint needs the
    /// per-request dry-run switch
    pub publisher: Arc<Publisher>,
}

impl AppState {
    /// Wire the production collaborators from configuration
    pub fn from_config(config: AppConfig) -> Self {
        let graph = Arc::new(MetaGraphClient::new(config.meta.clone()));
        let publisher = Arc::new(
            Publisher::new(graph, config.base_url.clone(), config.reel_poll)
                .with_dry_run(config.dry_run),
        );

        let orchestrator = Orchestrator::new(
            Collaborators {
                drafts: Arc::new(InMemoryDraftStore::new()),
                acquirer: Arc::new(HttpMediaAcquirer::new(
                    config.media_dir.clone(),
                    &config.twilio,
                )),
                brander: Arc::new(FfmpegBrander::new(
                    FFmpegClient::new(),
                    config.media_dir.clone(),
                    config.brand_asset_dir.clone(),
                )),
                captioner: Arc::new(GeminiCaptioner::new(config.captioning.clone())),
                notifier: Arc::new(TwilioNotifier::new(
                    config.twilio.clone(),
                    config.base_url.clone(),
                )),
                publisher: publisher.clone(),
            },
            OrchestratorSettings::from(&config),
        );

        Self {
            config: Arc::new(config),
            orchestrator,
            publisher,
        }
    }
}
