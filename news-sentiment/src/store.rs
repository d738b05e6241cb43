use crate::types::{ArticleRecord, PipelineError, RawArticle, Result, ScoredArticle, ScoredRecord, SentimentLabel};
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnection, PgRow};
use sqlx::{Connection, Postgres, QueryBuilder, Row};
use std::collections::HashMap;
use tracing::{debug, info};

/// Rows per INSERT statement. Keeps the bind count well under postgres'
/// 65535 parameter limit for both tables.
const INSERT_CHUNK_ROWS: usize = 1000;

const ARTICLE_COLUMNS: &str = "title, abstract, url, source, published_at, section, subsection, geo_facet";

/// Insert fetched articles into `news_articles`, skipping rows that collide on
/// (title, published_at). One transaction for the whole batch. Returns the
/// number of rows actually inserted.
pub async fn insert_raw_articles(conn: &mut PgConnection, articles: &[ArticleRecord]) -> Result<u64> {
    if articles.is_empty() {
        debug!("No raw articles to insert");
        return Ok(0);
    }

    let mut tx = conn.begin().await?;
    let mut inserted = 0;

    for chunk in articles.chunks(INSERT_CHUNK_ROWS) {
        let mut builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("INSERT INTO news_articles ({}) ", ARTICLE_COLUMNS));

        builder.push_values(chunk, |mut row, article| {
            row.push_bind(&article.title)
                .push_bind(&article.abstract_text)
                .push_bind(&article.url)
                .push_bind(&article.source)
                .push_bind(article.published_at)
                .push_bind(&article.section)
                .push_bind(&article.subsection)
                .push_bind(&article.geo_facet);
        });
        builder.push(" ON CONFLICT (title, published_at) DO NOTHING");

        inserted += builder.build().execute(&mut *tx).await?.rows_affected();
    }

    tx.commit().await?;

    info!("Stored {} new raw articles out of {} fetched", inserted, articles.len());
    Ok(inserted)
}

/// Insert scored articles into `news_sentiment` with the same skip-on-conflict
/// policy as the raw table.
pub async fn insert_scored_articles(conn: &mut PgConnection, scored: &[ScoredRecord]) -> Result<u64> {
    if scored.is_empty() {
        debug!("No scored articles to insert");
        return Ok(0);
    }

    let mut tx = conn.begin().await?;
    let mut inserted = 0;

    for chunk in scored.chunks(INSERT_CHUNK_ROWS) {
        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(format!(
            "INSERT INTO news_sentiment ({}, sentiment_score, sentiment_label) ",
            ARTICLE_COLUMNS
        ));

        builder.push_values(chunk, |mut row, item| {
            let article = &item.record;
            row.push_bind(&article.title)
                .push_bind(&article.abstract_text)
                .push_bind(&article.url)
                .push_bind(&article.source)
                .push_bind(article.published_at)
                .push_bind(&article.section)
                .push_bind(&article.subsection)
                .push_bind(&article.geo_facet)
                .push_bind(item.sentiment.score)
                .push_bind(item.sentiment.label.as_str());
        });
        builder.push(" ON CONFLICT (title, published_at) DO NOTHING");

        inserted += builder.build().execute(&mut *tx).await?.rows_affected();
    }

    tx.commit().await?;

    info!("Stored {} new scored articles out of {} scored", inserted, scored.len());
    Ok(inserted)
}

/// Full scan of `news_articles`, oldest first.
pub async fn load_raw_articles(conn: &mut PgConnection) -> Result<Vec<RawArticle>> {
    let rows = sqlx::query(&format!(
        "SELECT id, {}, created_at FROM news_articles ORDER BY created_at, id",
        ARTICLE_COLUMNS
    ))
    .fetch_all(&mut *conn)
    .await?;

    let mut articles = Vec::with_capacity(rows.len());
    for row in rows {
        articles.push(RawArticle {
            id: row.try_get("id")?,
            record: record_from_row(&row)?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        });
    }

    debug!("Loaded {} raw articles", articles.len());
    Ok(articles)
}

pub async fn load_scored_articles(conn: &mut PgConnection) -> Result<Vec<ScoredArticle>> {
    let rows = sqlx::query(&format!(
        "SELECT id, {}, sentiment_score, sentiment_label, created_at \
         FROM news_sentiment ORDER BY created_at, id",
        ARTICLE_COLUMNS
    ))
    .fetch_all(&mut *conn)
    .await?;

    let mut articles = Vec::with_capacity(rows.len());
    for row in rows {
        let label: String = row.try_get("sentiment_label")?;
        let sentiment_label = SentimentLabel::parse(&label).ok_or_else(|| {
            PipelineError::Database(sqlx::Error::Decode(
                format!("unknown sentiment label: {}", label).into(),
            ))
        })?;

        articles.push(ScoredArticle {
            id: row.try_get("id")?,
            record: record_from_row(&row)?,
            sentiment_score: row.try_get("sentiment_score")?,
            sentiment_label,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        });
    }

    Ok(articles)
}

/// Row counts for both tables, keyed by table name.
pub async fn table_stats(conn: &mut PgConnection) -> Result<HashMap<String, i64>> {
    let mut stats = HashMap::new();

    let raw: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM news_articles")
        .fetch_one(&mut *conn)
        .await?;
    stats.insert("news_articles".to_string(), raw);

    let scored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM news_sentiment")
        .fetch_one(&mut *conn)
        .await?;
    stats.insert("news_sentiment".to_string(), scored);

    Ok(stats)
}

fn record_from_row(row: &PgRow) -> Result<ArticleRecord> {
    let text = |column: &str| -> Result<String> {
        Ok(row.try_get::<Option<String>, _>(column)?.unwrap_or_default())
    };

    Ok(ArticleRecord {
        title: row.try_get("title")?,
        abstract_text: text("abstract")?,
        url: row.try_get("url")?,
        source: text("source")?,
        published_at: row.try_get::<Option<DateTime<Utc>>, _>("published_at")?,
        section: text("section")?,
        subsection: text("subsection")?,
        geo_facet: text("geo_facet")?,
    })
}
