//! Audio extractor
//!
//! Transcribes a whole recording into a single document. Recognition
//! misses yield an empty result and are logged, they never fail the call.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use docsearch_core::{source_name, DocSearchError, Document, Result};
use tracing::{debug, info, warn};

use crate::speech::{RecognitionFailure, SpeechRecognizer, Transcription};
use crate::Extractor;

/// Supported audio containers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Mp3,
    Ogg,
}

impl AudioFormat {
    /// Detect format from extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "wav" => Some(Self::Wav),
            "mp3" => Some(Self::Mp3),
            "ogg" => Some(Self::Ogg),
            _ => None,
        }
    }

    /// Check the container signature at the start of the file
    pub fn matches_magic(&self, bytes: &[u8]) -> bool {
        match self {
            Self::Wav => bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE",
            Self::Ogg => bytes.starts_with(b"OggS"),
            // ID3 tag or a bare MPEG frame sync
            Self::Mp3 => {
                bytes.starts_with(b"ID3")
                    || (bytes.len() >= 2 && bytes[0] == 0xFF && bytes[1] & 0xE0 == 0xE0)
            }
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Wav => write!(f, "wav"),
            Self::Mp3 => write!(f, "mp3"),
            Self::Ogg => write!(f, "ogg"),
        }
    }
}

/// A whole recording loaded in memory
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub bytes: Vec<u8>,
    pub format: AudioFormat,
}

/// Extractor for audio recordings
pub struct AudioExtractor {
    recognizer: Arc<dyn SpeechRecognizer>,
    language: String,
}

impl AudioExtractor {
    /// Create an audio extractor transcribing in `language`
    pub fn new(recognizer: Arc<dyn SpeechRecognizer>, language: impl Into<String>) -> Self {
        Self {
            recognizer,
            language: language.into(),
        }
    }

    async fn load(&self, path: &Path) -> Result<AudioClip> {
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(AudioFormat::from_extension)
            .ok_or_else(|| DocSearchError::UnsupportedFormat(path.display().to_string()))?;

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| DocSearchError::source_unavailable(path, e))?;

        if !format.matches_magic(&bytes) {
            return Err(DocSearchError::extraction_failed(
                path,
                format!("not a valid {format} file"),
            ));
        }

        Ok(AudioClip { bytes, format })
    }
}

#[async_trait]
impl Extractor for AudioExtractor {
    async fn extract(&self, path: &Path) -> Result<Vec<Document>> {
        let clip = self.load(path).await?;
        debug!(path = %path.display(), format = %clip.format, "Transcribing audio");

        let failure = match self.recognizer.transcribe(&clip, &self.language).await {
            Transcription::Text(text) => match Document::new(text, source_name(path)) {
                Some(document) => {
                    info!(path = %path.display(), chars = document.content().len(), "Audio transcribed");
                    return Ok(vec![document]);
                }
                None => RecognitionFailure::Unintelligible,
            },
            Transcription::Failed(failure) => failure,
        };

        warn!(path = %path.display(), %failure, "No transcript produced");
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "audio"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    const WAV_HEADER: &[u8] = b"RIFF\x24\x00\x00\x00WAVEfmt ";

    struct ScriptedRecognizer {
        outcome: Transcription,
        language_seen: Mutex<Option<String>>,
    }

    impl ScriptedRecognizer {
        fn new(outcome: Transcription) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                language_seen: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl SpeechRecognizer for ScriptedRecognizer {
        async fn transcribe(&self, _clip: &AudioClip, language: &str) -> Transcription {
            *self.language_seen.lock().unwrap() = Some(language.to_string());
            self.outcome.clone()
        }
    }

    fn temp_audio(suffix: &str, bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(bytes).unwrap();
        file
    }

    #[tokio::test]
    async fn test_transcript_becomes_single_document() {
        let recognizer = ScriptedRecognizer::new(Transcription::Text(
            "glândulas sebáceas produzem sebo".to_string(),
        ));
        let extractor = AudioExtractor::new(recognizer.clone(), "pt-BR");
        let file = temp_audio(".wav", WAV_HEADER);

        let documents = extractor.extract(file.path()).await.unwrap();

        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].content(), "glândulas sebáceas produzem sebo");
        assert_eq!(documents[0].page_number(), None);
        assert_eq!(
            recognizer.language_seen.lock().unwrap().as_deref(),
            Some("pt-BR")
        );
    }

    #[tokio::test]
    async fn test_unintelligible_audio_yields_empty_result() {
        let recognizer =
            ScriptedRecognizer::new(Transcription::Failed(RecognitionFailure::Unintelligible));
        let extractor = AudioExtractor::new(recognizer, "pt-BR");
        let file = temp_audio(".wav", WAV_HEADER);

        let documents = extractor.extract(file.path()).await.unwrap();
        assert!(documents.is_empty());
    }

    #[tokio::test]
    async fn test_service_failure_yields_empty_result() {
        let recognizer = ScriptedRecognizer::new(Transcription::Failed(
            RecognitionFailure::Service("503 Service Unavailable".to_string()),
        ));
        let extractor = AudioExtractor::new(recognizer, "pt-BR");
        let file = temp_audio(".ogg", b"OggS\x00\x02");

        let documents = extractor.extract(file.path()).await.unwrap();
        assert!(documents.is_empty());
    }

    #[tokio::test]
    async fn test_blank_transcript_yields_empty_result() {
        let recognizer = ScriptedRecognizer::new(Transcription::Text("   ".to_string()));
        let extractor = AudioExtractor::new(recognizer, "pt-BR");
        let file = temp_audio(".mp3", b"ID3\x04\x00");

        let documents = extractor.extract(file.path()).await.unwrap();
        assert!(documents.is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_is_source_unavailable() {
        let recognizer = ScriptedRecognizer::new(Transcription::Text("x".to_string()));
        let extractor = AudioExtractor::new(recognizer, "pt-BR");

        let err = extractor
            .extract(Path::new("/nonexistent/recording.wav"))
            .await
            .unwrap_err();
        assert!(matches!(err, DocSearchError::SourceUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_corrupt_audio_is_extraction_failed() {
        let recognizer = ScriptedRecognizer::new(Transcription::Text("x".to_string()));
        let extractor = AudioExtractor::new(recognizer, "pt-BR");
        let file = temp_audio(".wav", b"definitely not audio");

        let err = extractor.extract(file.path()).await.unwrap_err();
        assert!(matches!(err, DocSearchError::ExtractionFailed { .. }));
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(AudioFormat::from_extension("WAV"), Some(AudioFormat::Wav));
        assert_eq!(AudioFormat::from_extension(".mp3"), Some(AudioFormat::Mp3));
        assert_eq!(AudioFormat::from_extension("flac"), None);
    }

    #[test]
    fn test_magic_bytes() {
        assert!(AudioFormat::Wav.matches_magic(WAV_HEADER));
        assert!(!AudioFormat::Wav.matches_magic(b"RIFF"));
        assert!(AudioFormat::Ogg.matches_magic(b"OggS...."));
        assert!(AudioFormat::Mp3.matches_magic(&[0xFF, 0xFB, 0x90]));
        assert!(!AudioFormat::Mp3.matches_magic(b"OggS"));
    }
}
