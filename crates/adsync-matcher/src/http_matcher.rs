use crate::matcher_trait::{Catalog, Matcher};
use adsync_core::{AudioSample, MatchError, MatchRequest, MatchResult, MediaSource};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct MatchResponse {
    clip_id: String,
    t_offset_ms: i64,
    confidence: f64,
}

#[derive(Debug, Deserialize)]
struct AdUrlResponse {
    clip_id: String,
    ad_url: String,
}

#[derive(Debug, Deserialize)]
struct HttpConfig {
    base_url: String,
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    20
}

/// Error detail from a FastAPI-style `{"detail": "..."}` body, or the body itself.
pub(crate) fn error_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

/// Client for the fingerprint backend's `/match` and `/ad-url` endpoints.
pub struct HttpMatcher {
    client: reqwest::Client,
    base_url: Option<String>,
}

impl HttpMatcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: None,
        }
    }

    fn base_url(&self) -> Result<&str, MatchError> {
        self.base_url
            .as_deref()
            .ok_or_else(|| MatchError::RequestFailed("not initialized".to_string()))
    }
}

impl Default for HttpMatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Catalog for HttpMatcher {
    async fn resolve_source(&self, clip_id: &str, lang: &str) -> Result<MediaSource, MatchError> {
        let url = format!("{}/ad-url", self.base_url()?);
        let response = self
            .client
            .get(&url)
            .query(&[("clip_id", clip_id), ("lang", lang)])
            .send()
            .await
            .map_err(|e| MatchError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MatchError::SourceUnavailable(error_detail(&body)));
        }

        let body: AdUrlResponse = response
            .json()
            .await
            .map_err(|e| MatchError::RequestFailed(e.to_string()))?;
        Ok(MediaSource {
            clip_id: body.clip_id,
            url: body.ad_url,
        })
    }
}

#[async_trait]
impl Matcher for HttpMatcher {
    fn name(&self) -> &str {
        "http"
    }

    async fn initialize(&mut self, config: toml::Value) -> Result<(), MatchError> {
        let config: HttpConfig = config
            .try_into()
            .map_err(|e: toml::de::Error| MatchError::InitializationFailed(e.to_string()))?;
        self.client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MatchError::InitializationFailed(e.to_string()))?;
        self.base_url = Some(config.base_url.trim_end_matches('/').to_string());
        Ok(())
    }

    async fn match_sample(
        &self,
        sample: &AudioSample,
        request: &MatchRequest,
    ) -> Result<MatchResult, MatchError> {
        let wav = adsync_audio::encode_wav(sample)?;
        let part = Part::bytes(wav)
            .file_name("sample.wav")
            .mime_str("audio/wav")
            .map_err(|e| MatchError::RequestFailed(e.to_string()))?;
        let form = Form::new().part("audio", part);

        let mut query = vec![("lang", request.lang.clone())];
        if let Some(hint) = &request.clip_hint {
            query.push(("clip_id", hint.clone()));
        }

        let url = format!("{}/match", self.base_url()?);
        let response = self
            .client
            .post(&url)
            .query(&query)
            .multipart(form)
            .send()
            .await
            .map_err(|e| MatchError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(MatchError::NoMatch);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MatchError::Rejected {
                status: status.as_u16(),
                detail: error_detail(&body),
            });
        }

        let body: MatchResponse = response
            .json()
            .await
            .map_err(|e| MatchError::RequestFailed(e.to_string()))?;
        tracing::debug!(
            clip_id = %body.clip_id,
            offset_ms = body.t_offset_ms,
            confidence = body.confidence,
            "matcher responded"
        );
        Ok(MatchResult {
            clip_id: body.clip_id,
            offset_ms: body.t_offset_ms,
            confidence: body.confidence,
        })
    }

    async fn shutdown(&self) -> Result<(), MatchError> {
        Ok(())
    }
}
