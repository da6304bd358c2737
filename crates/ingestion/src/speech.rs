//! Audio narration of summaries
//!
//! A [`SpeechEngine`] turns a script into an audio file; the [`Narrator`]
//! wraps summaries with a topic-aware intro and a fixed outro, makes sure the
//! destination directory exists and hands the script to the engine.

use crate::errors::IngestionError;
use async_trait::async_trait;
use papercast_common::config::{SpeechConfig, SpeechProvider};
use papercast_common::metrics::record_upstream;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

const OUTRO: &str = "That concludes this summary.";

/// Trait for text-to-speech synthesis
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Synthesize `script` into a file at exactly `dest`
    async fn synthesize(&self, script: &str, dest: &Path) -> Result<(), IngestionError>;

    /// Get the engine name
    fn name(&self) -> &str;
}

/// Script spoken for a summary
pub fn narration_script(summary: &str, topic: Option<&str>) -> String {
    let intro = match topic.map(str::trim).filter(|t| !t.is_empty()) {
        Some(topic) => format!("Here is a summary of a research paper on {}.", topic),
        None => "Here is a summary of a research paper.".to_string(),
    };

    format!("{} {} {}", intro, summary.trim(), OUTRO)
}

/// Split a script into pieces of at most `max_chars` characters on word boundaries.
/// Words longer than `max_chars` are split mid-word.
pub fn chunk_script(script: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();

    for word in script.split_whitespace() {
        let mut word: &str = word;

        while word.chars().count() > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            let split = word
                .char_indices()
                .nth(max_chars)
                .map(|(i, _)| i)
                .unwrap_or(word.len());
            chunks.push(word[..split].to_string());
            word = &word[split..];
        }

        if word.is_empty() {
            continue;
        }

        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };

        if needed > max_chars {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Google Translate TTS engine (the endpoint gTTS uses); produces MP3
pub struct GoogleTranslateSpeech {
    client: reqwest::Client,
    endpoint: String,
    language: String,
    max_chunk_chars: usize,
}

impl GoogleTranslateSpeech {
    pub fn new(config: &SpeechConfig) -> Result<Self, IngestionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/translate_tts", config.base_url.trim_end_matches('/')),
            language: config.language.clone(),
            max_chunk_chars: config.max_chunk_chars,
        })
    }

    async fn fetch_chunk(&self, chunk: &str, idx: usize, total: usize) -> Result<Vec<u8>, IngestionError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("tl", self.language.as_str()),
                ("q", chunk),
                ("total", &total.to_string()),
                ("idx", &idx.to_string()),
                ("textlen", &chunk.chars().count().to_string()),
            ])
            .send()
            .await
            .map_err(|e| IngestionError::upstream("speech", format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(IngestionError::upstream(
                "speech",
                format!("API error {} for chunk {}", response.status(), idx),
            ));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl SpeechEngine for GoogleTranslateSpeech {
    async fn synthesize(&self, script: &str, dest: &Path) -> Result<(), IngestionError> {
        let chunks = chunk_script(script, self.max_chunk_chars);
        if chunks.is_empty() {
            return Err(IngestionError::InvalidInput("nothing to narrate".to_string()));
        }

        let mut audio = Vec::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            let result = self.fetch_chunk(chunk, idx, chunks.len()).await;
            record_upstream("speech", result.is_ok());
            audio.extend(result?);
        }

        debug!(chunks = chunks.len(), bytes = audio.len(), "Speech synthesized");
        tokio::fs::write(dest, audio).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "google"
    }
}

/// Offline engine that writes the narration script instead of audio
pub struct TranscriptSpeech;

#[async_trait]
impl SpeechEngine for TranscriptSpeech {
    async fn synthesize(&self, script: &str, dest: &Path) -> Result<(), IngestionError> {
        tokio::fs::write(dest, script.as_bytes()).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "transcript"
    }
}

/// Create a speech engine based on configuration
pub fn create_speech_engine(config: &SpeechConfig) -> Result<Arc<dyn SpeechEngine>, IngestionError> {
    Ok(match config.provider {
        SpeechProvider::Google => Arc::new(GoogleTranslateSpeech::new(config)?),
        SpeechProvider::Transcript => Arc::new(TranscriptSpeech),
    })
}

/// Narrates summaries through a speech engine
#[derive(Clone)]
pub struct Narrator {
    engine: Arc<dyn SpeechEngine>,
}

impl Narrator {
    pub fn new(engine: Arc<dyn SpeechEngine>) -> Self {
        Self { engine }
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Write the narration of `summary` to `dest`, creating parent directories
    #[instrument(skip(self, summary), fields(engine = self.engine.name(), dest = %dest.display()))]
    pub async fn synthesize(
        &self,
        summary: &str,
        dest: &Path,
        topic: Option<&str>,
    ) -> Result<(), IngestionError> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let script = narration_script(summary, topic);
        self.engine.synthesize(&script, dest).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_narration_script() {
        assert_eq!(
            narration_script("Qubits were stabilized.", Some("Quantum Computing")),
            "Here is a summary of a research paper on Quantum Computing. \
             Qubits were stabilized. That concludes this summary."
        );
        assert_eq!(
            narration_script(" Findings. ", Some("  ")),
            "Here is a summary of a research paper. Findings. That concludes this summary."
        );
    }

    #[test]
    fn test_chunk_script_respects_limit() {
        let script = "one two three four five six seven eight nine ten";
        let chunks = chunk_script(script, 10);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert_eq!(chunks.join(" "), script);
    }

    #[test]
    fn test_chunk_script_splits_long_words() {
        let chunks = chunk_script("abcdefghij xy", 4);
        assert_eq!(chunks, vec!["abcd", "efgh", "ij", "xy"]);
    }

    #[tokio::test]
    async fn test_narrator_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("audios").join("nested").join("7.mp3");

        Narrator::new(Arc::new(TranscriptSpeech))
            .synthesize("A short summary.", &dest, Some("Biology"))
            .await
            .unwrap();

        let written = std::fs::read_to_string(&dest).unwrap();
        assert!(written.starts_with("Here is a summary of a research paper on Biology."));

        // idempotent directory creation
        Narrator::new(Arc::new(TranscriptSpeech))
            .synthesize("Again.", &dest, None)
            .await
            .unwrap();
        assert!(dest.exists());
    }

    #[tokio::test]
    async fn test_google_speech_concatenates_chunks() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/translate_tts"))
            .and(query_param("idx", "0"))
            .and(query_param("tl", "en"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(b"ID3-a".to_vec(), "audio/mpeg"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/translate_tts"))
            .and(query_param("idx", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(b"-b".to_vec(), "audio/mpeg"))
            .expect(1)
            .mount(&server)
            .await;

        let config = SpeechConfig {
            base_url: server.uri(),
            max_chunk_chars: 12,
            ..SpeechConfig::default()
        };
        let engine = GoogleTranslateSpeech::new(&config).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.mp3");
        engine.synthesize("hello there general", &dest).await.unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"ID3-a-b");
    }

    #[tokio::test]
    async fn test_google_speech_failure_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let config = SpeechConfig {
            base_url: server.uri(),
            ..SpeechConfig::default()
        };
        let engine = GoogleTranslateSpeech::new(&config).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.mp3");
        let err = engine.synthesize("hello", &dest).await.unwrap_err();

        assert!(matches!(err, IngestionError::Upstream { service: "speech", .. }));
        assert!(!dest.exists());
    }
}
