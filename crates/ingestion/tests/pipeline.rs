mod common;

use common::{sample_pdf, BrokenSpeech, Harness, RendezvousSpeech, AI_TEXT};
use papercast_common::AppError;
use papercast_ingestion::UploadedPaper;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn pdf(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(sample_pdf(&[text]), "application/pdf")
}

fn feed(count: usize) -> String {
    let entries: String = (1..=count)
        .map(|i| {
            format!(
                "<entry><id>http://arxiv.org/abs/2401.0000{i}v1</id>\
                 <published>2024-01-0{i}T00:00:00Z</published>\
                 <title>Transformer Study {i}</title>\
                 <summary>A neural transformer trained with deep learning, run {i}. \
                 Machine learning baselines are beaten.</summary>\
                 <link href=\"http://arxiv.org/abs/2401.0000{i}v1\" rel=\"alternate\"/></entry>"
            )
        })
        .collect();
    format!("<feed xmlns=\"http://www.w3.org/2005/Atom\"><title>ArXiv Query</title>{entries}</feed>")
}

async fn mount_feed(server: &MockServer, count: usize) {
    Mock::given(method("GET"))
        .and(path("/api/query"))
        .and(query_param("search_query", "all:AI"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(feed(count), "application/atom+xml"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn url_ingestion_persists_a_narrated_paper() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/papers/attention-study.pdf"))
        .respond_with(pdf(AI_TEXT))
        .mount(&server)
        .await;
    let harness = Harness::new(&server.uri()).await;
    let url = format!("{}/papers/attention-study.pdf", server.uri());

    let paper = harness.pipeline.ingest_url(&url).await.unwrap();

    assert_eq!(paper.title, "Attention Study");
    assert_eq!(paper.topic, "AI");
    assert_eq!(paper.source_url.as_deref(), Some(url.as_str()));
    assert_eq!(paper.citation, Some(format!("Paper from {}", url)));
    assert!(!paper.summary.clone().unwrap_or_default().is_empty());

    let audio = paper.audio.clone().unwrap();
    assert_eq!(audio, format!("audios/{}.mp3", paper.id));
    let script = std::fs::read_to_string(harness.media_file(&audio)).unwrap();
    assert!(script.starts_with("Here is a summary of a research paper on AI."));
    assert!(script.ends_with("That concludes this summary."));

    let stored = harness.repository().find_paper_by_id(paper.id).await.unwrap();
    assert_eq!(stored, Some(paper));
}

#[tokio::test]
async fn unreachable_url_is_an_extraction_failure_without_record() {
    let server = MockServer::start().await;
    let harness = Harness::new(&server.uri()).await;

    let err = harness
        .pipeline
        .ingest_url("http://127.0.0.1:9/paper.pdf")
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::ExtractionFailed { .. }));
    assert_eq!(err.status_code(), 400);
    assert_eq!(harness.repository().count_papers().await.unwrap(), 0);
    assert!(harness.media_files().is_empty());
}

#[tokio::test]
async fn blank_and_invalid_urls_are_rejected() {
    let server = MockServer::start().await;
    let harness = Harness::new(&server.uri()).await;

    let err = harness.pipeline.ingest_url("   ").await.unwrap_err();
    assert!(matches!(err, AppError::MissingField { ref field } if field == "url"));

    let err = harness.pipeline.ingest_academic_page("not a url").await.unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));

    let err = harness.pipeline.ingest_doi("").await.unwrap_err();
    assert!(matches!(err, AppError::MissingField { ref field } if field == "doi"));
}

#[tokio::test]
async fn speech_failure_rolls_back_the_record() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/paper.pdf"))
        .respond_with(pdf(AI_TEXT))
        .mount(&server)
        .await;
    let harness = Harness::with_speech(&server.uri(), Arc::new(BrokenSpeech)).await;

    let err = harness
        .pipeline
        .ingest_url(&format!("{}/paper.pdf", server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Upstream { .. }));
    assert_eq!(harness.repository().count_papers().await.unwrap(), 0);
    assert!(harness.media_files().is_empty());
}

#[tokio::test]
async fn upload_stores_the_document_and_derives_a_title() {
    let server = MockServer::start().await;
    let harness = Harness::new(&server.uri()).await;

    let paper = harness
        .pipeline
        .ingest_upload(UploadedPaper {
            filename: "graph_neural-nets.pdf".to_string(),
            bytes: sample_pdf(&[AI_TEXT]),
            title: None,
        })
        .await
        .unwrap();

    assert_eq!(paper.title, "Graph Neural Nets");
    assert_eq!(paper.topic, "AI");
    assert!(paper.citation.is_none());

    let file = paper.file.clone().unwrap();
    assert!(file.starts_with("papers/"));
    assert!(file.ends_with("-graph_neural-nets.pdf"));
    assert!(harness.media_file(&file).exists());
    assert!(harness.media_file(paper.audio.as_deref().unwrap()).exists());
}

#[tokio::test]
async fn upload_prefers_the_given_title() {
    let server = MockServer::start().await;
    let harness = Harness::new(&server.uri()).await;

    let paper = harness
        .pipeline
        .ingest_upload(UploadedPaper {
            filename: "draft.pdf".to_string(),
            bytes: sample_pdf(&[AI_TEXT]),
            title: Some("  Scaling Laws  ".to_string()),
        })
        .await
        .unwrap();

    assert_eq!(paper.title, "Scaling Laws");
}

#[tokio::test]
async fn unreadable_upload_is_removed() {
    let server = MockServer::start().await;
    let harness = Harness::new(&server.uri()).await;

    let err = harness
        .pipeline
        .ingest_upload(UploadedPaper {
            filename: "notes.pdf".to_string(),
            bytes: b"plain text, not a document".to_vec(),
            title: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::ExtractionFailed { .. }));
    assert_eq!(harness.repository().count_papers().await.unwrap(), 0);
    assert!(harness.media_files().is_empty());
}

#[tokio::test]
async fn doi_ingestion_uses_landing_page_title() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/doi/10.1000/xyz123"))
        .and(header("accept", "application/pdf"))
        .respond_with(pdf(AI_TEXT))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/doi/10.1000/xyz123"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "<html><head><title>Learning To Learn</title></head></html>",
            "text/html",
        ))
        .mount(&server)
        .await;
    let harness = Harness::new(&server.uri()).await;

    let paper = harness.pipeline.ingest_doi("10.1000/xyz123").await.unwrap();

    assert_eq!(paper.title, "Learning To Learn");
    assert_eq!(paper.doi.as_deref(), Some("10.1000/xyz123"));
    assert_eq!(paper.citation.as_deref(), Some("Paper from DOI: 10.1000/xyz123"));
    assert!(paper.source_url.is_none());
}

#[tokio::test]
async fn doi_title_falls_back_to_the_doi() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pdf/2301.00001.pdf"))
        .respond_with(pdf(AI_TEXT))
        .expect(1)
        .mount(&server)
        .await;
    let harness = Harness::new(&server.uri()).await;

    let paper = harness
        .pipeline
        .ingest_doi("10.48550/arXiv.2301.00001")
        .await
        .unwrap();

    assert_eq!(paper.title, "10.48550 Arxiv.2301.00001");
}

#[tokio::test]
async fn academic_page_uses_article_text() {
    let server = MockServer::start().await;
    let body = format!(
        "<html><head><title>Repository Record</title></head><body>\
         <nav><div>Home</div></nav><article><p>{AI_TEXT}</p></article></body></html>"
    );
    Mock::given(method("GET"))
        .and(path("/record/7"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html"))
        .mount(&server)
        .await;
    let harness = Harness::new(&server.uri()).await;
    let url = format!("{}/record/7", server.uri());

    let paper = harness.pipeline.ingest_academic_page(&url).await.unwrap();

    assert_eq!(paper.title, "Repository Record");
    assert_eq!(paper.topic, "AI");
    assert_eq!(paper.source_url.as_deref(), Some(url.as_str()));
}

#[tokio::test]
async fn academic_page_without_text_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/empty"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<p>tiny</p>", "text/html"))
        .mount(&server)
        .await;
    let harness = Harness::new(&server.uri()).await;

    let err = harness
        .pipeline
        .ingest_academic_page(&format!("{}/empty", server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::ExtractionFailed { .. }));
    assert_eq!(harness.repository().count_papers().await.unwrap(), 0);
}

#[tokio::test]
async fn search_persists_one_narrated_record_per_entry() {
    let server = MockServer::start().await;
    mount_feed(&server, 5).await;
    let harness = Harness::new(&server.uri()).await;

    let papers = harness.pipeline.ingest_search("AI").await.unwrap();

    assert_eq!(papers.len(), 5);
    assert_eq!(harness.repository().count_papers().await.unwrap(), 5);
    for (i, paper) in papers.iter().enumerate() {
        let n = i + 1;
        assert!(harness.pipeline.topics().contains(&paper.topic));
        assert_eq!(paper.title, format!("Transformer Study {n}"));
        assert_eq!(
            paper.citation,
            Some(format!(
                "Transformer Study {n} (2024-01-0{n}T00:00:00Z) - http://arxiv.org/abs/2401.0000{n}v1"
            ))
        );

        let audio = paper.audio.as_deref().unwrap();
        assert!(!audio.is_empty());
        assert!(harness.media_file(audio).exists());
    }
}

#[tokio::test]
async fn synthesis_without_matching_papers_is_not_found() {
    let server = MockServer::start().await;
    let harness = Harness::new(&server.uri()).await;

    let err = harness.pipeline.synthesize_topic("Climate").await.unwrap_err();

    assert!(matches!(err, AppError::TopicNotFound { ref topic } if topic == "Climate"));
    assert_eq!(err.status_code(), 404);
}

#[tokio::test]
async fn synthesis_combines_stored_summaries() {
    let server = MockServer::start().await;
    mount_feed(&server, 3).await;
    let harness = Harness::new(&server.uri()).await;
    let papers = harness.pipeline.ingest_search("AI").await.unwrap();

    let synthesis = harness.pipeline.synthesize_topic("AI").await.unwrap();

    assert_eq!(synthesis.topic, "AI");
    assert_eq!(synthesis.paper_count, 3);
    assert_eq!(
        synthesis.paper_ids,
        papers.iter().map(|p| p.id).collect::<Vec<_>>()
    );
    assert!(!synthesis.summary.is_empty());
    assert_eq!(synthesis.audio, "audios/synthesis/ai.mp3");
    assert!(harness.media_file(&synthesis.audio).exists());

    // synthesis is derived, never stored
    assert_eq!(harness.repository().count_papers().await.unwrap(), 3);
}

#[tokio::test]
async fn overlapping_narrations_both_persist() {
    let server = MockServer::start().await;
    for name in ["first", "second"] {
        Mock::given(method("GET"))
            .and(path(format!("/papers/{name}.pdf")))
            .respond_with(pdf(AI_TEXT))
            .mount(&server)
            .await;
    }
    let harness = Harness::with_speech(&server.uri(), Arc::new(RendezvousSpeech::new(2))).await;
    let first = format!("{}/papers/first.pdf", server.uri());
    let second = format!("{}/papers/second.pdf", server.uri());

    // both narrations must be in flight at once before either can finish
    let (a, b) = tokio::time::timeout(Duration::from_secs(30), async {
        tokio::join!(
            harness.pipeline.ingest_url(&first),
            harness.pipeline.ingest_url(&second)
        )
    })
    .await
    .expect("ingests finished");

    let (a, b) = (a.unwrap(), b.unwrap());
    assert_ne!(a.id, b.id);
    assert_eq!(harness.repository().count_papers().await.unwrap(), 2);

    let mut expected = vec![format!("audios/{}.mp3", a.id), format!("audios/{}.mp3", b.id)];
    expected.sort();
    assert_eq!(harness.media_files(), expected);
    assert_eq!(a.audio, Some(format!("audios/{}.mp3", a.id)));
}
