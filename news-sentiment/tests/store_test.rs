mod common;

use chrono::{TimeZone, Utc};
use common::{init_tracing, TestDatabase};
use news_sentiment::sentiment::score_articles;
use news_sentiment::{schema, store, ArticleRecord, PolarityModel, SentimentLabel};

struct SignOfLength;

impl PolarityModel for SignOfLength {
    fn name(&self) -> &'static str {
        "length"
    }

    fn polarity(&self, text: &str) -> f64 {
        if text.len() % 2 == 0 {
            0.25
        } else {
            -0.25
        }
    }
}

fn article(title: &str, hour: Option<u32>) -> ArticleRecord {
    ArticleRecord {
        title: title.to_string(),
        abstract_text: format!("Abstract for {}", title),
        url: format!("https://example.com/{}", title),
        source: "New York Times".to_string(),
        published_at: hour.map(|h| Utc.with_ymd_and_hms(2024, 3, 1, h, 0, 0).unwrap()),
        section: "technology".to_string(),
        subsection: String::new(),
        geo_facet: "New York, Tech".to_string(),
    }
}

#[tokio::test]
async fn test_schema_initialization_is_repeatable() {
    init_tracing();
    let Some(test_db) = TestDatabase::create().await else { return };
    let db = test_db.database();

    schema::initialize_schema(&db).await.unwrap();
    schema::initialize_schema(&db).await.unwrap();

    let (a, b) = tokio::join!(schema::initialize_schema(&db), schema::initialize_schema(&db));
    a.unwrap();
    b.unwrap();

    assert_eq!(test_db.count("news_articles").await, 0);
    assert_eq!(test_db.count("news_sentiment").await, 0);

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_raw_insert_skips_conflicts() {
    init_tracing();
    let Some(test_db) = TestDatabase::create().await else { return };
    let db = test_db.database();
    schema::initialize_schema(&db).await.unwrap();

    let batch = vec![
        article("alpha", Some(1)),
        article("beta", Some(2)),
        article("alpha", Some(3)),
    ];

    let mut conn = db.connect().await.unwrap();
    assert_eq!(store::insert_raw_articles(&mut conn, &batch).await.unwrap(), 3);
    assert_eq!(store::insert_raw_articles(&mut conn, &batch).await.unwrap(), 0);

    // Same key with different content is ignored, not updated.
    let mut changed = article("beta", Some(2));
    changed.abstract_text = "rewritten".to_string();
    assert_eq!(store::insert_raw_articles(&mut conn, &[changed]).await.unwrap(), 0);

    let stored = store::load_raw_articles(&mut conn).await.unwrap();
    assert_eq!(stored.len(), 3);
    let beta = stored.iter().find(|a| a.record.title == "beta").unwrap();
    assert_eq!(beta.record.abstract_text, "Abstract for beta");
    assert_eq!(beta.record, article("beta", Some(2)));

    db.release(conn).await;
    test_db.cleanup().await;
}

#[tokio::test]
async fn test_empty_batch_is_a_no_op() {
    init_tracing();
    let Some(test_db) = TestDatabase::create().await else { return };
    let db = test_db.database();
    schema::initialize_schema(&db).await.unwrap();

    let mut conn = db.connect().await.unwrap();
    assert_eq!(store::insert_raw_articles(&mut conn, &[]).await.unwrap(), 0);
    assert_eq!(store::insert_scored_articles(&mut conn, &[]).await.unwrap(), 0);
    db.release(conn).await;

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_scored_insert_is_idempotent() {
    init_tracing();
    let Some(test_db) = TestDatabase::create().await else { return };
    let db = test_db.database();
    schema::initialize_schema(&db).await.unwrap();

    let mut conn = db.connect().await.unwrap();
    let batch: Vec<ArticleRecord> = (0..4).map(|i| article(&format!("item-{}", i), Some(i))).collect();
    store::insert_raw_articles(&mut conn, &batch).await.unwrap();

    let raw = store::load_raw_articles(&mut conn).await.unwrap();
    let scored = score_articles(&SignOfLength, &raw);
    assert_eq!(store::insert_scored_articles(&mut conn, &scored).await.unwrap(), 4);
    assert_eq!(store::insert_scored_articles(&mut conn, &scored).await.unwrap(), 0);

    let stored = store::load_scored_articles(&mut conn).await.unwrap();
    assert_eq!(stored.len(), 4);
    for row in &stored {
        assert!(row.sentiment_label != SentimentLabel::Neutral);
        assert_eq!(row.sentiment_label, SentimentLabel::from_score(row.sentiment_score));
    }

    let stats = store::table_stats(&mut conn).await.unwrap();
    assert_eq!(stats.get("news_articles"), Some(&4));
    assert_eq!(stats.get("news_sentiment"), Some(&4));

    db.release(conn).await;
    test_db.cleanup().await;
}

#[tokio::test]
async fn test_undated_articles_are_deduplicated() {
    init_tracing();
    let Some(test_db) = TestDatabase::create().await else { return };
    let db = test_db.database();
    schema::initialize_schema(&db).await.unwrap();

    let batch = vec![article("undated", None)];
    let mut conn = db.connect().await.unwrap();
    assert_eq!(store::insert_raw_articles(&mut conn, &batch).await.unwrap(), 1);
    assert_eq!(store::insert_raw_articles(&mut conn, &batch).await.unwrap(), 0);

    let raw = store::load_raw_articles(&mut conn).await.unwrap();
    assert_eq!(raw.len(), 1);
    let scored = score_articles(&SignOfLength, &raw);
    assert_eq!(store::insert_scored_articles(&mut conn, &scored).await.unwrap(), 1);
    assert_eq!(store::insert_scored_articles(&mut conn, &scored).await.unwrap(), 0);
    db.release(conn).await;

    assert_eq!(test_db.count("news_articles").await, 1);
    assert_eq!(test_db.count("news_sentiment").await, 1);

    test_db.cleanup().await;
}
