use crate::config::ProviderConfig;
use crate::types::{ArticleRecord, PipelineError, ProviderResponse, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

pub const NYT_SOURCE: &str = "New York Times";

/// A read-only endpoint returning the latest articles for one category.
#[async_trait]
pub trait NewsProvider: Send + Sync {
    /// Label stored in the `source` column.
    fn source_name(&self) -> String;

    /// Issue a single read request. Any HTTP status is returned as-is;
    /// only transport failures are errors here.
    async fn fetch_latest(&self) -> Result<ProviderResponse>;
}

/// NYT Top Stories v2 for a fixed section.
pub struct NytTopStories {
    client: Client,
    endpoint: Url,
    api_key: String,
}

impl NytTopStories {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            endpoint: Self::endpoint_for(config)?,
            api_key: config.api_key.clone(),
        })
    }

    pub fn endpoint_for(config: &ProviderConfig) -> Result<Url> {
        let url = format!(
            "{}/{}.json",
            config.base_url.trim_end_matches('/'),
            config.section
        );
        Ok(Url::parse(&url)?)
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl NewsProvider for NytTopStories {
    fn source_name(&self) -> String {
        NYT_SOURCE.to_string()
    }

    async fn fetch_latest(&self) -> Result<ProviderResponse> {
        let start_time = Instant::now();
        debug!("Requesting {}", self.endpoint);

        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[("api-key", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        debug!(
            "Provider answered HTTP {} ({} bytes) in {}ms",
            status,
            body.len(),
            start_time.elapsed().as_millis()
        );
        Ok(ProviderResponse { status, body })
    }
}

#[derive(Debug, Deserialize)]
struct TopStoriesResponse {
    #[serde(default)]
    results: Vec<TopStory>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TopStory {
    title: Option<String>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    url: Option<String>,
    published_date: Option<String>,
    section: Option<String>,
    subsection: Option<String>,
    #[serde(deserialize_with = "list_or_string")]
    geo_facet: Vec<String>,
}

/// The provider sends `[]`, a list of strings, `""` or `null` for facets.
fn list_or_string<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Facets {
        List(Vec<String>),
        Single(String),
    }

    Ok(match Option::<Facets>::deserialize(deserializer)? {
        Some(Facets::List(items)) => items,
        Some(Facets::Single(item)) if !item.is_empty() => vec![item],
        _ => Vec::new(),
    })
}

/// Stage 2: one request, normalized into at most `page_size` records.
pub struct Fetcher<'a> {
    provider: &'a dyn NewsProvider,
}

impl<'a> Fetcher<'a> {
    pub fn new(provider: &'a dyn NewsProvider) -> Self {
        Self { provider }
    }

    pub async fn fetch(&self, page_size: usize) -> Result<Vec<ArticleRecord>> {
        let response = self.provider.fetch_latest().await?;

        if !response.is_success() {
            warn!("Provider rejected request with HTTP {}", response.status);
            return Err(PipelineError::Provider {
                status: response.status,
                body: response.body,
            });
        }

        let articles = normalize_response(&response.body, &self.provider.source_name(), page_size)?;
        info!("Fetched {} articles from {}", articles.len(), self.provider.source_name());
        Ok(articles)
    }
}

/// Parse a provider body and keep the first `page_size` usable articles.
pub fn normalize_response(body: &str, source: &str, page_size: usize) -> Result<Vec<ArticleRecord>> {
    let parsed: TopStoriesResponse = serde_json::from_str(body)?;
    let total = parsed.results.len();

    let articles: Vec<ArticleRecord> = parsed
        .results
        .into_iter()
        .filter_map(|story| normalize_story(story, source))
        .take(page_size)
        .collect();

    debug!("Kept {} of {} provider results", articles.len(), total);
    Ok(articles)
}

fn normalize_story(story: TopStory, source: &str) -> Option<ArticleRecord> {
    let title = story.title.filter(|t| !t.is_empty())?;
    let abstract_text = story.abstract_text.filter(|a| !a.is_empty())?;

    let published_at = story
        .published_date
        .as_deref()
        .filter(|d| !d.is_empty())
        .and_then(|d| parse_published(d, &title));

    Some(ArticleRecord {
        title,
        abstract_text,
        url: story.url.unwrap_or_default(),
        source: source.to_string(),
        published_at,
        section: story.section.unwrap_or_default(),
        subsection: story.subsection.unwrap_or_default(),
        geo_facet: join_geo_facet(&story.geo_facet),
    })
}

fn parse_published(value: &str, title: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(value) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(e) => {
            warn!("Ignoring unparseable published_date {:?} on {:?}: {}", value, title, e);
            None
        }
    }
}

pub fn join_geo_facet(facets: &[String]) -> String {
    facets.join(", ")
}
