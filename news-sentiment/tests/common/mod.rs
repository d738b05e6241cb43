#![allow(dead_code)]

use async_trait::async_trait;
use news_sentiment::{
    Database, DatabaseConfig, NewsProvider, PipelineConfig, ProviderConfig, ProviderResponse, Result,
};
use serde_json::{json, Value};
use sqlx::postgres::PgConnection;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_test_writer()
        .try_init();
}

/// Provider double that always answers with the same status and body.
pub struct StaticProvider {
    status: u16,
    body: String,
    calls: Arc<AtomicUsize>,
}

impl StaticProvider {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn ok(stories: Vec<Value>) -> Self {
        Self::new(200, top_stories_body(stories))
    }

    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl NewsProvider for StaticProvider {
    fn source_name(&self) -> String {
        "New York Times".to_string()
    }

    async fn fetch_latest(&self) -> Result<ProviderResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ProviderResponse {
            status: self.status,
            body: self.body.clone(),
        })
    }
}

pub fn story(index: usize) -> Value {
    json!({
        "section": "technology",
        "subsection": "",
        "title": format!("Story number {}", index),
        "abstract": format!("A remarkably good development in story {}, welcomed by many.", index),
        "url": format!("https://www.nytimes.com/2024/03/01/technology/story-{}.html", index),
        "published_date": format!("2024-03-01T0{}:00:00-05:00", index % 10),
        "geo_facet": ["New York", "Tech"],
    })
}

pub fn top_stories_body(stories: Vec<Value>) -> String {
    json!({
        "status": "OK",
        "section": "Technology",
        "num_results": stories.len(),
        "results": stories,
    })
    .to_string()
}

/// A database reachable through `TEST_DATABASE_URL`, confined to a fresh
/// schema so tests can run side by side.
pub struct TestDatabase {
    pub config: DatabaseConfig,
    admin: DatabaseConfig,
    schema: String,
}

impl TestDatabase {
    /// `None` when no test database is configured.
    pub async fn create() -> Option<Self> {
        let url = match std::env::var("TEST_DATABASE_URL") {
            Ok(url) if !url.is_empty() => url,
            _ => {
                eprintln!("TEST_DATABASE_URL is not set; skipping database test");
                return None;
            }
        };

        let admin = DatabaseConfig::from_url(&url).expect("TEST_DATABASE_URL must be a postgres URL");
        let schema = format!("news_test_{}", Uuid::new_v4().simple());

        let db = Database::new(admin.clone());
        let mut conn = db.connect().await.expect("test database must be reachable");
        sqlx::query(&format!("CREATE SCHEMA {}", schema))
            .execute(&mut conn)
            .await
            .expect("create test schema");
        db.release(conn).await;

        let mut config = admin.clone();
        config.schema = Some(schema.clone());

        Some(Self {
            config,
            admin,
            schema,
        })
    }

    pub fn database(&self) -> Database {
        Database::new(self.config.clone())
    }

    pub fn pipeline_config(&self, page_size: usize) -> PipelineConfig {
        PipelineConfig {
            database: self.config.clone(),
            provider: ProviderConfig::new("test-key"),
            page_size,
            stage_retries: 0,
            retry_delay_seconds: 0,
        }
    }

    pub async fn connect(&self) -> PgConnection {
        self.database().connect().await.expect("connect to test schema")
    }

    pub async fn count(&self, table: &str) -> i64 {
        let mut conn = self.connect().await;
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&mut conn)
            .await
            .expect("count rows");
        self.database().release(conn).await;
        count
    }

    pub async fn cleanup(self) {
        let db = Database::new(self.admin.clone());
        let mut conn = db.connect().await.expect("reconnect for cleanup");
        sqlx::query(&format!("DROP SCHEMA IF EXISTS {} CASCADE", self.schema))
            .execute(&mut conn)
            .await
            .expect("drop test schema");
        db.release(conn).await;
    }
}
