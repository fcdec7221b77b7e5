//! Speech-to-text recognizers
//!
//! Recognition misses are expected outcomes, not errors: a recognizer
//! always answers with a `Transcription`.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use docsearch_core::{DocSearchError, Result, SpeechConfig};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::audio::{AudioClip, AudioFormat};

// ============================================================================
// Recognizer Trait
// ============================================================================

/// Outcome of transcribing one recording
#[derive(Debug, Clone, PartialEq)]
pub enum Transcription {
    /// Recognized speech
    Text(String),
    /// Nothing usable came back
    Failed(RecognitionFailure),
}

/// Why a recording produced no transcript
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionFailure {
    /// The audio could not be understood
    Unintelligible,
    /// The recognition service could not be reached or rejected the request
    Service(String),
}

impl std::fmt::Display for RecognitionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unintelligible => write!(f, "audio could not be understood"),
            Self::Service(reason) => write!(f, "speech recognition service error: {reason}"),
        }
    }
}

/// Trait for speech-to-text engines
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Transcribe a whole recording in the given locale (e.g. `pt-BR`)
    async fn transcribe(&self, clip: &AudioClip, language: &str) -> Transcription;
}

// ============================================================================
// Google Speech-to-Text
// ============================================================================

/// Google Cloud Speech-to-Text REST client
pub struct GoogleSpeechRecognizer {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    sample_rate_hertz: u32,
}

#[derive(Debug, Serialize)]
struct RecognizeRequest<'a> {
    config: RecognitionConfig<'a>,
    audio: RecognitionAudio,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecognitionConfig<'a> {
    language_code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    encoding: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sample_rate_hertz: Option<u32>,
}

#[derive(Debug, Serialize)]
struct RecognitionAudio {
    content: String,
}

#[derive(Debug, Default, Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    results: Vec<RecognitionResult>,
}

#[derive(Debug, Deserialize)]
struct RecognitionResult {
    #[serde(default)]
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    #[serde(default)]
    transcript: String,
}

impl GoogleSpeechRecognizer {
    /// Create a recognizer for an endpoint
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key,
            sample_rate_hertz: SpeechConfig::default().sample_rate_hertz,
        }
    }

    /// Create from config
    pub fn from_config(config: &SpeechConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DocSearchError::Other(e.into()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            sample_rate_hertz: config.sample_rate_hertz,
        })
    }

    fn build_request<'a>(&self, clip: &AudioClip, language: &'a str) -> RecognizeRequest<'a> {
        // WAV headers carry encoding and rate; compressed formats need both
        let (encoding, sample_rate_hertz) = match clip.format {
            AudioFormat::Wav => (None, None),
            AudioFormat::Mp3 => (Some("MP3"), Some(self.sample_rate_hertz)),
            AudioFormat::Ogg => (Some("OGG_OPUS"), Some(self.sample_rate_hertz)),
        };

        RecognizeRequest {
            config: RecognitionConfig {
                language_code: language,
                encoding,
                sample_rate_hertz,
            },
            audio: RecognitionAudio {
                content: base64::engine::general_purpose::STANDARD.encode(&clip.bytes),
            },
        }
    }

    async fn recognize(
        &self,
        request: &RecognizeRequest<'_>,
    ) -> std::result::Result<RecognizeResponse, String> {
        let mut builder = self.client.post(&self.endpoint).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.query(&[("key", key)]);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(format!("{status}: {error_text}"));
        }

        response
            .json()
            .await
            .map_err(|e| format!("failed to parse response: {e}"))
    }
}

/// Join the best alternative of every result; `None` when nothing was heard
fn transcript_from(response: RecognizeResponse) -> Option<String> {
    let transcript = response
        .results
        .into_iter()
        .filter_map(|r| r.alternatives.into_iter().next())
        .map(|a| a.transcript.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    (!transcript.is_empty()).then_some(transcript)
}

#[async_trait]
impl SpeechRecognizer for GoogleSpeechRecognizer {
    async fn transcribe(&self, clip: &AudioClip, language: &str) -> Transcription {
        let request = self.build_request(clip, language);
        debug!(
            format = %clip.format,
            bytes = clip.bytes.len(),
            language,
            "Sending recording to speech recognition"
        );

        match self.recognize(&request).await {
            Ok(response) => match transcript_from(response) {
                Some(text) => Transcription::Text(text),
                None => Transcription::Failed(RecognitionFailure::Unintelligible),
            },
            Err(reason) => Transcription::Failed(RecognitionFailure::Service(reason)),
        }
    }
}
