//! Paper pipeline orchestrator
//!
//! Every request type walks the same stages:
//!
//! ```text
//! Received -> Extracted -> Classified -> Summarized -> AudioReady -> Persisted
//! ```
//!
//! Request types differ only in how text and title are obtained. Narration is
//! staged before the record is created; the record is then inserted, the audio
//! moved to `audios/{id}.mp3` and attached inside one short write transaction,
//! so a failing run leaves neither a record nor an audio file behind.

use crate::discovery::DiscoveredPaper;
use crate::extraction::html::{derive_title, title_from_doi, title_from_url};
use crate::media::{MediaPath, MediaStore};
use crate::services::Services;
use papercast_common::db::models::Paper;
use papercast_common::metrics::{record_persisted, PipelineTimer};
use papercast_common::{AppConfig, AppError, NewPaper, Repository, Result, DEFAULT_TOPICS};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// Stages of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Received,
    Extracted,
    Classified,
    Summarized,
    AudioReady,
    Persisted,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Received => "received",
            PipelineStage::Extracted => "extracted",
            PipelineStage::Classified => "classified",
            PipelineStage::Summarized => "summarized",
            PipelineStage::AudioReady => "audio_ready",
            PipelineStage::Persisted => "persisted",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document received through the upload form
#[derive(Debug, Clone)]
pub struct UploadedPaper {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub title: Option<String>,
}

/// Re-summarization of every stored summary under one topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicSynthesis {
    pub topic: String,
    pub paper_count: usize,
    pub paper_ids: Vec<i32>,
    pub summary: String,
    /// Narration, relative to the media root
    pub audio: String,
}

/// Stage tracking for one run
struct Run {
    kind: &'static str,
    stage: PipelineStage,
    timer: PipelineTimer,
}

impl Run {
    fn start(kind: &'static str) -> Self {
        debug!(kind, stage = %PipelineStage::Received, "Pipeline started");
        Self {
            kind,
            stage: PipelineStage::Received,
            timer: PipelineTimer::start(kind),
        }
    }

    fn advance(&mut self, stage: PipelineStage) {
        self.timer.stage(stage.as_str());
        self.stage = stage;
        debug!(kind = self.kind, stage = %stage, "Pipeline stage reached");
    }

    fn finish<T>(self, result: Result<T>) -> Result<T> {
        if let Err(ref e) = result {
            warn!(kind = self.kind, stage = %self.stage, error = %e, "Pipeline halted");
        }
        self.timer.finish(result.is_ok());
        result
    }
}

fn require_field(value: &str, field: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::MissingField {
            field: field.to_string(),
        });
    }
    Ok(value.to_string())
}

fn require_url(value: &str, field: &str) -> Result<String> {
    let value = require_field(value, field)?;

    match reqwest::Url::parse(&value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(value),
        _ => Err(AppError::Validation {
            message: format!("'{}' is not a valid http(s) URL", value),
            field: Some(field.to_string()),
        }),
    }
}

fn require_text(text: String, source_kind: &str) -> Result<String> {
    if text.trim().is_empty() {
        return Err(AppError::extraction_failed(source_kind));
    }
    Ok(text)
}

/// Orchestrates capability services, media storage and persistence
#[derive(Clone)]
pub struct Pipeline {
    services: Services,
    repository: Repository,
    media: MediaStore,
    topics: Vec<String>,
    classify_chars: usize,
    max_results: usize,
}

impl Pipeline {
    pub fn new(services: Services, repository: Repository, config: &AppConfig) -> Self {
        let topics = if config.pipeline.topics.is_empty() {
            DEFAULT_TOPICS.iter().map(|t| t.to_string()).collect()
        } else {
            config.pipeline.topics.clone()
        };

        Self {
            services,
            repository,
            media: MediaStore::new(&config.media),
            topics,
            classify_chars: config.pipeline.classify_chars,
            max_results: config.discovery.max_results,
        }
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    pub fn media(&self) -> &MediaStore {
        &self.media
    }

    /// Candidate labels for classification
    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    /// Ingest an uploaded document
    #[instrument(skip(self, upload), fields(filename = %upload.filename, bytes = upload.bytes.len()))]
    pub async fn ingest_upload(&self, upload: UploadedPaper) -> Result<Paper> {
        let mut run = Run::start("upload");
        let stored = match self.media.store_upload(&upload.filename, &upload.bytes).await {
            Ok(stored) => stored,
            Err(e) => return run.finish(Err(e.into())),
        };

        let result = self.process_upload(&mut run, &stored, upload).await;
        if result.is_err() {
            self.media.remove(&stored).await;
        }
        run.finish(result)
    }

    async fn process_upload(&self, run: &mut Run, stored: &MediaPath, upload: UploadedPaper) -> Result<Paper> {
        let text = match self.services.extractor.extract_from_file(&stored.absolute).await {
            Ok(text) => require_text(text, "file")?,
            Err(e) => {
                return Err(AppError::ExtractionFailed {
                    source_kind: "file".to_string(),
                    detail: Some(e.to_string()),
                })
            }
        };
        run.advance(PipelineStage::Extracted);

        let title = upload
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| {
                let stem = Path::new(&upload.filename)
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or_default();
                derive_title(stem)
            });

        let new = NewPaper {
            title,
            file: Some(stored.relative.clone()),
            ..NewPaper::default()
        };

        self.complete(run, &text, new).await
    }

    /// Ingest the document behind a URL
    #[instrument(skip(self))]
    pub async fn ingest_url(&self, url: &str) -> Result<Paper> {
        let url = require_url(url, "url")?;
        let mut run = Run::start("url");
        let result = self.process_url(&mut run, url).await;
        run.finish(result)
    }

    async fn process_url(&self, run: &mut Run, url: String) -> Result<Paper> {
        let text = require_text(self.services.extractor.extract_from_url(&url).await?, "url")?;
        run.advance(PipelineStage::Extracted);

        let title = match self.lookup_title(&url).await {
            Some(title) => title,
            None => title_from_url(&url),
        };

        let new = NewPaper {
            title,
            citation: Some(format!("Paper from {}", url)),
            source_url: Some(url),
            ..NewPaper::default()
        };

        self.complete(run, &text, new).await
    }

    /// Ingest the paper a DOI resolves to
    #[instrument(skip(self))]
    pub async fn ingest_doi(&self, doi: &str) -> Result<Paper> {
        let doi = require_field(doi, "doi")?;
        let mut run = Run::start("doi");
        let result = self.process_doi(&mut run, doi).await;
        run.finish(result)
    }

    async fn process_doi(&self, run: &mut Run, doi: String) -> Result<Paper> {
        let text = require_text(self.services.extractor.extract_from_doi(&doi).await?, "doi")?;
        run.advance(PipelineStage::Extracted);

        let landing_title = match self.services.extractor.doi_landing_url(&doi) {
            Some(landing) => self.lookup_title(&landing).await,
            None => None,
        };
        let title = landing_title.unwrap_or_else(|| title_from_doi(&doi));

        let new = NewPaper {
            title,
            citation: Some(format!("Paper from DOI: {}", doi)),
            doi: Some(doi),
            ..NewPaper::default()
        };

        self.complete(run, &text, new).await
    }

    /// Ingest the article text of an academic web page
    #[instrument(skip(self))]
    pub async fn ingest_academic_page(&self, url: &str) -> Result<Paper> {
        let url = require_url(url, "url")?;
        let mut run = Run::start("academic_page");
        let result = self.process_academic_page(&mut run, url).await;
        run.finish(result)
    }

    async fn process_academic_page(&self, run: &mut Run, url: String) -> Result<Paper> {
        let page = self.services.extractor.extract_from_page(&url).await?;
        let text = require_text(page.text, "page")?;
        run.advance(PipelineStage::Extracted);

        let new = NewPaper {
            title: page.title.unwrap_or_else(|| title_from_url(&url)),
            citation: Some(format!("Paper from {}", url)),
            source_url: Some(url),
            ..NewPaper::default()
        };

        self.complete(run, &text, new).await
    }

    /// Discover papers for `query` and ingest each one from its abstract
    #[instrument(skip(self))]
    pub async fn ingest_search(&self, query: &str) -> Result<Vec<Paper>> {
        let query = require_field(query, "topic")?;

        let discovered = self.services.discovery.search(&query, self.max_results).await?;
        info!(count = discovered.len(), "Papers discovered");

        let mut papers = Vec::with_capacity(discovered.len());
        for entry in discovered {
            let mut run = Run::start("search");
            let result = self.process_discovered(&mut run, entry).await;
            papers.push(run.finish(result)?);
        }

        Ok(papers)
    }

    async fn process_discovered(&self, run: &mut Run, entry: DiscoveredPaper) -> Result<Paper> {
        let text = if entry.summary.trim().is_empty() {
            entry.title.clone()
        } else {
            entry.summary
        };

        let title = if entry.title.trim().is_empty() {
            derive_title("")
        } else {
            entry.title
        };

        let new = NewPaper {
            title,
            source_url: Some(entry.link).filter(|link| !link.is_empty()),
            citation: Some(entry.citation),
            ..NewPaper::default()
        };

        self.complete(run, &text, new).await
    }

    /// Summarize and narrate everything stored under `topic`
    #[instrument(skip(self))]
    pub async fn synthesize_topic(&self, topic: &str) -> Result<TopicSynthesis> {
        let topic = require_field(topic, "topic")?;
        let mut run = Run::start("synthesis");
        let result = self.process_synthesis(&mut run, topic).await;
        run.finish(result)
    }

    async fn process_synthesis(&self, run: &mut Run, topic: String) -> Result<TopicSynthesis> {
        let papers: Vec<Paper> = self
            .repository
            .find_papers_by_topic(&topic)
            .await?
            .into_iter()
            .filter(|p| p.summary.as_deref().is_some_and(|s| !s.trim().is_empty()))
            .collect();

        if papers.is_empty() {
            return Err(AppError::TopicNotFound { topic });
        }

        let combined = papers
            .iter()
            .filter_map(|p| p.summary.as_deref())
            .map(str::trim)
            .collect::<Vec<_>>()
            .join(" ");

        let summary = self.services.summarizer.summarize(&combined).await?;
        run.advance(PipelineStage::Summarized);

        let audio = self.media.synthesis_audio(&topic);
        if let Err(e) = self
            .services
            .narrator
            .synthesize(&summary, &audio.absolute, Some(topic.as_str()))
            .await
        {
            self.media.remove(&audio).await;
            return Err(e.into());
        }
        run.advance(PipelineStage::AudioReady);

        info!(topic = %topic, papers = papers.len(), "Topic synthesized");

        Ok(TopicSynthesis {
            paper_count: papers.len(),
            paper_ids: papers.iter().map(|p| p.id).collect(),
            topic,
            summary,
            audio: audio.relative,
        })
    }

    /// `<title>` of a page; lookup failures fall back to derived titles
    async fn lookup_title(&self, url: &str) -> Option<String> {
        match self.services.extractor.page_title(url).await {
            Ok(title) => title,
            Err(e) => {
                warn!(url, error = %e, "Title lookup failed, deriving one");
                None
            }
        }
    }

    /// Classify, summarize and persist extracted text
    async fn complete(&self, run: &mut Run, text: &str, mut new: NewPaper) -> Result<Paper> {
        let sample: String = text.chars().take(self.classify_chars).collect();
        new.topic = self.services.classifier.classify(&sample, &self.topics).await?;
        run.advance(PipelineStage::Classified);

        let summary = self.services.summarizer.summarize(text).await?;
        run.advance(PipelineStage::Summarized);
        new.summary = Some(summary.clone());

        self.persist(run, new, &summary).await
    }

    /// Narrate to a staged file first so the write transaction only
    /// spans the insert, the rename and the audio update
    async fn persist(&self, run: &mut Run, new: NewPaper, summary: &str) -> Result<Paper> {
        let staged = self.media.staged_audio();
        if let Err(e) = self
            .services
            .narrator
            .synthesize(summary, &staged.absolute, Some(new.topic.as_str()))
            .await
        {
            self.media.remove(&staged).await;
            return Err(e.into());
        }
        run.advance(PipelineStage::AudioReady);

        let mut audio = None;
        match self.insert_and_commit(new, &staged, &mut audio).await {
            Ok(paper) => {
                run.advance(PipelineStage::Persisted);
                record_persisted(run.kind);
                info!(paper_id = paper.id, topic = %paper.topic, "Paper persisted");
                Ok(paper)
            }
            Err(e) => {
                self.media.remove(&staged).await;
                if let Some(audio) = audio {
                    self.media.remove(&audio).await;
                }
                Err(e)
            }
        }
    }

    /// Dropping the transaction on any error rolls the insert back
    async fn insert_and_commit(
        &self,
        new: NewPaper,
        staged: &MediaPath,
        audio: &mut Option<MediaPath>,
    ) -> Result<Paper> {
        let txn = self.repository.begin().await?;
        let paper = self.repository.insert_paper(&txn, new).await?;

        let target = self.media.paper_audio(paper.id);
        self.media.promote(staged, &target).await?;
        let relative = target.relative.clone();
        *audio = Some(target);

        let paper = self.repository.attach_audio(&txn, paper, relative).await?;
        txn.commit().await?;

        Ok(paper)
    }
}
