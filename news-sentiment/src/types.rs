use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A normalized article as produced by the fetcher. Never persisted directly.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleRecord {
    pub title: String,
    pub abstract_text: String,
    pub url: String,
    pub source: String,
    pub published_at: Option<DateTime<Utc>>,
    pub section: String,
    pub subsection: String,
    pub geo_facet: String,
}

/// A row of `news_articles`.
#[derive(Debug, Clone)]
pub struct RawArticle {
    pub id: Uuid,
    pub record: ArticleRecord,
    pub created_at: DateTime<Utc>,
}

/// A row of `news_sentiment`.
#[derive(Debug, Clone)]
pub struct ScoredArticle {
    pub id: Uuid,
    pub record: ArticleRecord,
    pub sentiment_score: f64,
    pub sentiment_label: SentimentLabel,
    pub created_at: DateTime<Utc>,
}

/// Scorer output waiting to be written to `news_sentiment`.
#[derive(Debug, Clone)]
pub struct ScoredRecord {
    pub record: ArticleRecord,
    pub sentiment: Sentiment,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sentiment {
    pub score: f64,
    pub label: SentimentLabel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    /// Sign of the score decides the label; exactly zero is neutral.
    pub fn from_score(score: f64) -> Self {
        if score > 0.0 {
            SentimentLabel::Positive
        } else if score < 0.0 {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "positive" => Some(SentimentLabel::Positive),
            "negative" => Some(SentimentLabel::Negative),
            "neutral" => Some(SentimentLabel::Neutral),
            _ => None,
        }
    }
}

/// Raw reply from the content provider, before any status handling.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub status: u16,
    pub body: String,
}

impl ProviderResponse {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// Summary of one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub fetched: usize,
    pub raw_inserted: u64,
    pub raw_total: usize,
    pub scored_inserted: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Provider error: HTTP {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Response decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Database connection error: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("A pipeline run is already in progress")]
    RunInProgress,
}

pub type Result<T> = std::result::Result<T, PipelineError>;
