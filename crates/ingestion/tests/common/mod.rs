//! Shared fixtures for pipeline tests

#![allow(dead_code)]

use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use papercast_common::config::{ClassifierProvider, SpeechProvider, SummarizerProvider};
use papercast_common::{AppConfig, DbPool, Repository};
use papercast_ingestion::speech::{Narrator, SpeechEngine};
use papercast_ingestion::{IngestionError, Pipeline, Services};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

pub const AI_TEXT: &str = "We train a deep learning transformer with reinforcement learning. \
    The neural network improves on machine learning baselines across tasks.";

/// Build a PDF with one page per entry of `pages`
pub fn sample_pdf(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// Offline configuration pointing every remote collaborator at `server_uri`
pub fn test_config(dir: &Path, server_uri: &str) -> AppConfig {
    let mut config = AppConfig::default();
    config.database.url = format!("sqlite://{}?mode=rwc", dir.join("papers.db").display());
    config.media.root = dir.join("media");
    config.extraction.doi_resolvers = vec![format!("{server_uri}/doi/")];
    config.extraction.arxiv_pdf_base = format!("{server_uri}/pdf/");
    config.discovery.base_url = format!("{server_uri}/api/query");
    config.classifier.provider = ClassifierProvider::Keyword;
    config.summarizer.provider = SummarizerProvider::Lead;
    config.speech.provider = SpeechProvider::Transcript;
    config
}

/// Speech engine that always fails after writing part of the file
pub struct BrokenSpeech;

#[async_trait]
impl SpeechEngine for BrokenSpeech {
    async fn synthesize(&self, _script: &str, dest: &Path) -> Result<(), IngestionError> {
        tokio::fs::write(dest, b"ID3").await?;
        Err(IngestionError::Upstream {
            service: "speech",
            message: "quota exceeded".to_string(),
        })
    }

    fn name(&self) -> &str {
        "broken"
    }
}

/// Speech engine whose narrations only complete once `parties` of them overlap
pub struct RendezvousSpeech {
    barrier: tokio::sync::Barrier,
}

impl RendezvousSpeech {
    pub fn new(parties: usize) -> Self {
        Self {
            barrier: tokio::sync::Barrier::new(parties),
        }
    }
}

#[async_trait]
impl SpeechEngine for RendezvousSpeech {
    async fn synthesize(&self, script: &str, dest: &Path) -> Result<(), IngestionError> {
        self.barrier.wait().await;
        tokio::fs::write(dest, script.as_bytes()).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "rendezvous"
    }
}

pub struct Harness {
    pub dir: TempDir,
    pub config: AppConfig,
    pub pipeline: Pipeline,
}

impl Harness {
    pub async fn new(server_uri: &str) -> Self {
        Self::build(server_uri, None).await
    }

    pub async fn with_speech(server_uri: &str, engine: Arc<dyn SpeechEngine>) -> Self {
        Self::build(server_uri, Some(engine)).await
    }

    async fn build(server_uri: &str, engine: Option<Arc<dyn SpeechEngine>>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), server_uri);

        let pool = DbPool::new(&config.database).await.unwrap();
        pool.ensure_schema().await.unwrap();

        let mut services = Services::from_config(&config).unwrap();
        if let Some(engine) = engine {
            services.narrator = Narrator::new(engine);
        }

        let pipeline = Pipeline::new(services, Repository::new(pool), &config);
        Self { dir, config, pipeline }
    }

    pub fn repository(&self) -> &Repository {
        self.pipeline.repository()
    }

    pub fn media_file(&self, relative: &str) -> PathBuf {
        self.pipeline.media().absolute(relative)
    }

    /// Every file under the media root, relative to it
    pub fn media_files(&self) -> Vec<String> {
        fn walk(dir: &Path, root: &Path, out: &mut Vec<String>) {
            let Ok(entries) = std::fs::read_dir(dir) else {
                return;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    walk(&path, root, out);
                } else if let Ok(rel) = path.strip_prefix(root) {
                    out.push(rel.to_string_lossy().replace('\\', "/"));
                }
            }
        }

        let mut files = Vec::new();
        walk(&self.config.media.root, &self.config.media.root, &mut files);
        files.sort();
        files
    }
}
