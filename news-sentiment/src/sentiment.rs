use crate::types::{RawArticle, ScoredRecord, Sentiment, SentimentLabel};
use tracing::debug;
use vader_sentiment::SentimentIntensityAnalyzer;

/// Any text-to-polarity function. Implementations should return a value in
/// [-1.0, 1.0]; [`score_text`] clamps whatever comes back.
pub trait PolarityModel: Send + Sync {
    fn name(&self) -> &'static str;

    fn polarity(&self, text: &str) -> f64;
}

/// VADER compound score.
pub struct VaderModel {
    analyzer: SentimentIntensityAnalyzer<'static>,
}

impl VaderModel {
    pub fn new() -> Self {
        Self {
            analyzer: SentimentIntensityAnalyzer::new(),
        }
    }
}

impl Default for VaderModel {
    fn default() -> Self {
        Self::new()
    }
}

impl PolarityModel for VaderModel {
    fn name(&self) -> &'static str {
        "vader"
    }

    fn polarity(&self, text: &str) -> f64 {
        let scores = self.analyzer.polarity_scores(text);
        scores.get("compound").copied().unwrap_or(0.0)
    }
}

/// Lowercase, drop everything that is not alphanumeric or whitespace, and
/// collapse runs of whitespace into single spaces.
pub fn preprocess(text: &str) -> String {
    let kept: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();

    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Score and label both come from the normalized text, so the label always
/// agrees with the sign of the stored score.
pub fn score_text(model: &dyn PolarityModel, text: &str) -> Sentiment {
    let normalized = preprocess(text);
    let raw = model.polarity(&normalized);
    let score = if raw.is_nan() { 0.0 } else { raw.clamp(-1.0, 1.0) };

    Sentiment {
        score,
        label: SentimentLabel::from_score(score),
    }
}

/// Scores every raw article. Pure; persistence happens in the store.
pub fn score_articles(model: &dyn PolarityModel, articles: &[RawArticle]) -> Vec<ScoredRecord> {
    let scored: Vec<ScoredRecord> = articles
        .iter()
        .map(|article| ScoredRecord {
            record: article.record.clone(),
            sentiment: score_text(model, &article.record.abstract_text),
        })
        .collect();

    debug!("Scored {} articles with {}", scored.len(), model.name());
    scored
}
