//! In-memory Graph API and sleeper for exercising the publish flow

use std::{
    collections::VecDeque,
    path::Path,
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;

use super::{ContainerStatus, GraphApi, Sleeper, SocialError};

#[derive(Default)]
pub struct FakeGraph {
    pub calls: Mutex<Vec<String>>,
    pub statuses: Mutex<VecDeque<Result<ContainerStatus, String>>>,
    /// URLs handed to the Facebook video and Instagram reel calls
    pub video_urls: Mutex<Vec<String>>,
    pub fail_upload: bool,
    pub fail_video: bool,
}

impl FakeGraph {
    /// Container status checks return these in order, then `IN_PROGRESS`
    pub fn with_statuses(statuses: Vec<Result<ContainerStatus, String>>) -> Self {
        Self {
            statuses: Mutex::new(statuses.into()),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.calls().iter().filter(|call| call.as_str() == name).count()
    }

    pub fn video_urls(&self) -> Vec<String> {
        self.video_urls.lock().unwrap().clone()
    }

    fn record(&self, name: &str) {
        self.calls.lock().unwrap().push(name.to_string());
    }
}

#[async_trait]
impl GraphApi for FakeGraph {
    async fn upload_photo(&self, _path: &Path, _caption: &str) -> Result<String, SocialError> {
        self.record("upload_photo");
        if self.fail_upload {
            return Err(SocialError::PlatformError("HTTP 400: bad photo".into()));
        }
        Ok("photo-1".into())
    }

    async fn photo_source_url(&self, photo_id: &str) -> Result<String, SocialError> {
        self.record("photo_source_url");
        Ok(format!("https://scontent.fbcdn.net/{}.jpg", photo_id))
    }

    async fn post_video(&self, video_url: &str, _caption: &str) -> Result<String, SocialError> {
        self.record("post_video");
        self.video_urls.lock().unwrap().push(video_url.to_string());
        if self.fail_video {
            return Err(SocialError::NetworkError("connection reset".into()));
        }
        Ok("video-1".into())
    }

    async fn create_image_container(
        &self,
        _image_url: &str,
        _caption: &str,
    ) -> Result<String, SocialError> {
        self.record("create_image_container");
        Ok("container-image".into())
    }

    async fn create_reel_container(
        &self,
        video_url: &str,
        _caption: &str,
    ) -> Result<String, SocialError> {
        self.record("create_reel_container");
        self.video_urls.lock().unwrap().push(video_url.to_string());
        Ok("container-reel".into())
    }

    async fn container_status(&self, _container_id: &str) -> Result<ContainerStatus, SocialError> {
        self.record("container_status");
        match self.statuses.lock().unwrap().pop_front() {
            Some(Ok(status)) => Ok(status),
            Some(Err(message)) => Err(SocialError::NetworkError(message)),
            None => Ok(ContainerStatus::InProgress),
        }
    }

    async fn publish_container(&self, _container_id: &str) -> Result<String, SocialError> {
        self.record("publish_container");
        Ok("media-1".into())
    }
}

#[derive(Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}
