//! docsearch Extract - Source format extractors
//!
//! Supports extracting documents from:
//! - PDF files (one document per non-blank page)
//! - Audio recordings (WAV, MP3, OGG) through speech-to-text
//!
//! Each extractor implements the `Extractor` trait and produces
//! `Document`s ready to be embedded and indexed. The
//! `ExtractorRegistry` picks the extractor for a file extension.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use docsearch_core::{DocSearchError, Document, Result, SpeechConfig};

pub mod audio;
pub mod pdf;
pub mod speech;

pub use audio::{AudioClip, AudioExtractor, AudioFormat};
pub use pdf::{render_page_dump, LopdfPageReader, PageReader, PdfExtractor};
pub use speech::{GoogleSpeechRecognizer, RecognitionFailure, SpeechRecognizer, Transcription};

// ============================================================================
// Extractor Trait
// ============================================================================

/// Turns one source file into an ordered sequence of documents
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Extract documents from a file
    async fn extract(&self, path: &Path) -> Result<Vec<Document>>;

    /// Extractor name for logging
    fn name(&self) -> &str;
}

// ============================================================================
// Extractor Registry
// ============================================================================

/// Extensions handled by the audio extractor
pub const AUDIO_EXTENSIONS: &[&str] = &["wav", "mp3", "ogg"];

/// Maps file extensions to extractors
#[derive(Default)]
pub struct ExtractorRegistry {
    extractors: HashMap<String, Arc<dyn Extractor>>,
}

impl ExtractorRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the PDF extractor and an audio extractor using `recognizer`
    pub fn with_defaults(recognizer: Arc<dyn SpeechRecognizer>, language: impl Into<String>) -> Self {
        let mut registry = Self::new();
        registry.register(&["pdf"], PdfExtractor::new());
        registry.register(AUDIO_EXTENSIONS, AudioExtractor::new(recognizer, language));
        registry
    }

    /// Registry wired from configuration, using Google Speech-to-Text
    pub fn from_config(config: &SpeechConfig) -> Result<Self> {
        let recognizer = GoogleSpeechRecognizer::from_config(config)?;
        Ok(Self::with_defaults(
            Arc::new(recognizer),
            config.language.clone(),
        ))
    }

    /// Register an extractor for the given extensions, replacing any
    /// previous registration
    pub fn register<E: Extractor + 'static>(&mut self, extensions: &[&str], extractor: E) {
        let extractor: Arc<dyn Extractor> = Arc::new(extractor);
        for ext in extensions {
            self.extractors
                .insert(normalize_extension(ext), Arc::clone(&extractor));
        }
    }

    /// Find the extractor for an extension (`.pdf`, `pdf` and `.PDF` are equivalent)
    pub fn resolve(&self, extension: &str) -> Result<Arc<dyn Extractor>> {
        self.extractors
            .get(&normalize_extension(extension))
            .cloned()
            .ok_or_else(|| DocSearchError::UnsupportedFormat(extension.to_string()))
    }

    /// Find the extractor for a file path
    pub fn resolve_path(&self, path: &Path) -> Result<Arc<dyn Extractor>> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| DocSearchError::UnsupportedFormat(path.display().to_string()))?;

        self.resolve(extension)
    }

    /// Registered extensions, sorted
    pub fn extensions(&self) -> Vec<&str> {
        let mut extensions: Vec<&str> = self.extractors.keys().map(String::as_str).collect();
        extensions.sort_unstable();
        extensions
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    struct SilentRecognizer;

    #[async_trait]
    impl SpeechRecognizer for SilentRecognizer {
        async fn transcribe(&self, _clip: &AudioClip, _language: &str) -> Transcription {
            Transcription::Failed(RecognitionFailure::Unintelligible)
        }
    }

    fn registry() -> ExtractorRegistry {
        ExtractorRegistry::with_defaults(Arc::new(SilentRecognizer), "pt-BR")
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        let registry = registry();
        assert_eq!(registry.resolve(".pdf").unwrap().name(), "pdf");
        assert_eq!(registry.resolve(".PDF").unwrap().name(), "pdf");
        assert_eq!(registry.resolve("pdf").unwrap().name(), "pdf");
    }

    #[test]
    fn test_resolve_audio_extensions() {
        let registry = registry();
        for ext in [".wav", ".mp3", ".ogg", ".WAV"] {
            assert_eq!(registry.resolve(ext).unwrap().name(), "audio");
        }
    }

    #[test]
    fn test_resolve_unsupported() {
        let registry = registry();
        assert!(matches!(
            registry.resolve(".docx"),
            Err(DocSearchError::UnsupportedFormat(ext)) if ext == ".docx"
        ));
    }

    #[test]
    fn test_resolve_path() {
        let registry = registry();
        assert_eq!(
            registry
                .resolve_path(Path::new("/data/Manual.Pdf"))
                .unwrap()
                .name(),
            "pdf"
        );
        assert!(matches!(
            registry.resolve_path(Path::new("/data/README")),
            Err(DocSearchError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_registered_extensions() {
        assert_eq!(registry().extensions(), vec!["mp3", "ogg", "pdf", "wav"]);
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = registry();
        registry.register(&[".pdf"], AudioExtractor::new(Arc::new(SilentRecognizer), "en-US"));
        assert_eq!(registry.resolve("pdf").unwrap().name(), "audio");
    }
}
