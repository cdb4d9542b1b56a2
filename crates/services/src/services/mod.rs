pub mod captioning;
pub mod config;
pub mod drafts;
pub mod lanes;
pub mod media;
pub mod messages;
pub mod notifier;
pub mod orchestrator;
pub mod social;
