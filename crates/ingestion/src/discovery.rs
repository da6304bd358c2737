//! Paper discovery over the arXiv Atom API

use crate::errors::IngestionError;
use async_trait::async_trait;
use papercast_common::config::DiscoveryConfig;
use papercast_common::metrics::record_upstream;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// A candidate paper returned by discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredPaper {
    pub title: String,
    pub summary: String,
    pub link: String,
    pub published: String,
    pub citation: String,
}

impl DiscoveredPaper {
    fn new(title: String, summary: String, link: String, published: String) -> Self {
        let citation = format!("{} ({}) - {}", title, published, link);
        Self {
            title,
            summary,
            link,
            published,
            citation,
        }
    }
}

/// Trait for paper discovery
#[async_trait]
pub trait PaperDiscovery: Send + Sync {
    /// At most `max_results` papers matching `query`, in upstream order
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<DiscoveredPaper>, IngestionError>;
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    published: String,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: String,
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl AtomEntry {
    fn into_paper(self) -> DiscoveredPaper {
        let link = self
            .id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .or_else(|| self.links.into_iter().next().map(|l| l.href))
            .unwrap_or_default();

        DiscoveredPaper::new(
            collapse(&self.title),
            collapse(&self.summary),
            link,
            self.published.trim().to_string(),
        )
    }
}

/// Parse an Atom feed into at most `max_results` papers
pub fn parse_feed(xml: &str, max_results: usize) -> Result<Vec<DiscoveredPaper>, IngestionError> {
    let feed: AtomFeed = quick_xml::de::from_str(xml)?;

    Ok(feed
        .entries
        .into_iter()
        .take(max_results)
        .map(AtomEntry::into_paper)
        .collect())
}

/// arXiv export API client
pub struct ArxivDiscovery {
    client: reqwest::Client,
    base_url: String,
}

impl ArxivDiscovery {
    pub fn new(config: &DiscoveryConfig) -> Result<Self, IngestionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    async fn fetch_feed(&self, query: &str, max_results: usize) -> Result<String, IngestionError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("search_query", format!("all:{}", query)),
                ("start", "0".to_string()),
                ("max_results", max_results.to_string()),
            ])
            .send()
            .await
            .map_err(|e| IngestionError::upstream("discovery", format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(IngestionError::upstream(
                "discovery",
                format!("API error {}", response.status()),
            ));
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl PaperDiscovery for ArxivDiscovery {
    #[instrument(skip(self))]
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<DiscoveredPaper>, IngestionError> {
        let result = self.fetch_feed(query, max_results).await;
        record_upstream("discovery", result.is_ok());

        let papers = parse_feed(&result?, max_results)?;
        debug!(count = papers.len(), "Feed parsed");
        Ok(papers)
    }
}

/// Create the discovery client
pub fn create_discovery(config: &DiscoveryConfig) -> Result<Arc<dyn PaperDiscovery>, IngestionError> {
    Ok(Arc::new(ArxivDiscovery::new(config)?))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub(crate) fn atom_feed(count: usize) -> String {
        let entries: String = (1..=count)
            .map(|i| {
                format!(
                    r#"<entry>
    <id>http://arxiv.org/abs/2301.0000{i}v1</id>
    <updated>2023-01-0{i}T00:00:00Z</updated>
    <published>2023-01-0{i}T00:00:00Z</published>
    <title>Neural Study
      Number {i}</title>
    <summary>  We train a deep learning transformer model, experiment {i}.
    Results improve on prior neural baselines.  </summary>
    <author><name>A. Researcher</name></author>
    <link href="http://arxiv.org/abs/2301.0000{i}v1" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/2301.0000{i}v1" rel="related" type="application/pdf"/>
    <arxiv:primary_category xmlns:arxiv="http://arxiv.org/schemas/atom" term="cs.LG" scheme="http://arxiv.org/schemas/atom"/>
  </entry>"#
                )
            })
            .collect();

        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <link href="http://arxiv.org/api/query" rel="self" type="application/atom+xml"/>
  <title type="html">ArXiv Query</title>
  <id>http://arxiv.org/api/query</id>
  <updated>2023-01-10T00:00:00-05:00</updated>
  <opensearch:totalResults xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/">{count}</opensearch:totalResults>
  {entries}
</feed>"#
        )
    }

    #[test]
    fn test_parse_feed_maps_entries() {
        let papers = parse_feed(&atom_feed(2), 5).unwrap();
        assert_eq!(papers.len(), 2);

        let first = &papers[0];
        assert_eq!(first.title, "Neural Study Number 1");
        assert!(first.summary.starts_with("We train a deep learning transformer"));
        assert_eq!(first.link, "http://arxiv.org/abs/2301.00001v1");
        assert_eq!(first.published, "2023-01-01T00:00:00Z");
        assert_eq!(
            first.citation,
            "Neural Study Number 1 (2023-01-01T00:00:00Z) - http://arxiv.org/abs/2301.00001v1"
        );
    }

    #[test]
    fn test_parse_feed_truncates() {
        assert_eq!(parse_feed(&atom_feed(5), 3).unwrap().len(), 3);
    }

    #[test]
    fn test_parse_feed_without_entries() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>ArXiv Query</title></feed>"#;
        assert!(parse_feed(xml, 5).unwrap().is_empty());
    }

    #[test]
    fn test_parse_entry_with_doi_links() {
        // arXiv places the doi link before comment and journal_ref, the rest after
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <title type="html">ArXiv Query</title>
  <entry>
    <id>http://arxiv.org/abs/hep-ex/0307015v1</id>
    <updated>2003-07-07T13:46:39-04:00</updated>
    <published>2003-07-07T13:46:39-04:00</published>
    <title>Multi-Electron Production at High Transverse Momenta</title>
    <summary>Multi-electron production is studied at high electron transverse momentum.</summary>
    <author><name>H1 Collaboration</name></author>
    <arxiv:doi>10.1140/epjc/s2003-01326-x</arxiv:doi>
    <link title="doi" href="http://dx.doi.org/10.1140/epjc/s2003-01326-x" rel="related"/>
    <arxiv:comment>23 pages, 8 figures and 4 tables</arxiv:comment>
    <arxiv:journal_ref>Eur.Phys.J. C31 (2003) 17-29</arxiv:journal_ref>
    <link href="http://arxiv.org/abs/hep-ex/0307015v1" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/hep-ex/0307015v1" rel="related" type="application/pdf"/>
    <arxiv:primary_category term="hep-ex" scheme="http://arxiv.org/schemas/atom"/>
    <category term="hep-ex" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
</feed>"#;

        let papers = parse_feed(xml, 5).unwrap();
        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].title, "Multi-Electron Production at High Transverse Momenta");
        assert_eq!(papers[0].link, "http://arxiv.org/abs/hep-ex/0307015v1");
    }

    #[test]
    fn test_link_falls_back_to_href() {
        let xml = r#"<feed><entry><title>T</title><summary>S</summary>
            <published>2020</published><link href="https://example.org/t"/></entry></feed>"#;
        let papers = parse_feed(xml, 5).unwrap();
        assert_eq!(papers[0].link, "https://example.org/t");
    }

    #[tokio::test]
    async fn test_arxiv_search_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/query"))
            .and(query_param("search_query", "all:AI"))
            .and(query_param("start", "0"))
            .and(query_param("max_results", "5"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(atom_feed(5), "application/atom+xml"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let config = DiscoveryConfig {
            base_url: format!("{}/api/query", server.uri()),
            ..DiscoveryConfig::default()
        };
        let papers = ArxivDiscovery::new(&config).unwrap().search("AI", 5).await.unwrap();
        assert_eq!(papers.len(), 5);
    }

    #[tokio::test]
    async fn test_arxiv_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let config = DiscoveryConfig {
            base_url: server.uri(),
            ..DiscoveryConfig::default()
        };
        let err = ArxivDiscovery::new(&config).unwrap().search("AI", 5).await.unwrap_err();
        assert!(matches!(err, IngestionError::Upstream { service: "discovery", .. }));
    }
}
