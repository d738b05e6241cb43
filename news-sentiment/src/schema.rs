use crate::db::Database;
use crate::types::Result;
use sqlx::postgres::PgConnection;
use sqlx::Connection;
use tracing::info;

pub const RAW_TABLE: &str = "news_articles";
pub const SCORED_TABLE: &str = "news_sentiment";

/// Serializes concurrent initializers; `CREATE TABLE IF NOT EXISTS` alone can
/// still collide on the catalog when two sessions race.
const SCHEMA_LOCK_KEY: i64 = 0x6e65_7773_5f73_6368;

const CREATE_RAW_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS news_articles (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        title TEXT NOT NULL,
        abstract TEXT,
        url TEXT NOT NULL,
        source TEXT,
        published_at TIMESTAMPTZ,
        section TEXT,
        subsection TEXT,
        geo_facet TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        UNIQUE NULLS NOT DISTINCT (title, published_at)
    )
"#;

const CREATE_SCORED_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS news_sentiment (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        title TEXT NOT NULL,
        abstract TEXT,
        url TEXT NOT NULL,
        source TEXT,
        published_at TIMESTAMPTZ,
        section TEXT,
        subsection TEXT,
        geo_facet TEXT,
        sentiment_score DOUBLE PRECISION CHECK (sentiment_score BETWEEN -1.0 AND 1.0),
        sentiment_label TEXT CHECK (sentiment_label IN ('positive', 'negative', 'neutral')),
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        UNIQUE NULLS NOT DISTINCT (title, published_at)
    )
"#;

/// Stage 1: make sure both tables exist. Safe to repeat.
pub async fn initialize_schema(db: &Database) -> Result<()> {
    let mut conn = db.connect().await?;
    let outcome = create_tables(&mut conn).await;
    db.release(conn).await;
    outcome?;

    info!("Schema ready ({}, {})", RAW_TABLE, SCORED_TABLE);
    Ok(())
}

async fn create_tables(conn: &mut PgConnection) -> Result<()> {
    let mut tx = conn.begin().await?;

    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(SCHEMA_LOCK_KEY)
        .execute(&mut *tx)
        .await?;

    for ddl in [CREATE_RAW_TABLE, CREATE_SCORED_TABLE] {
        sqlx::query(ddl).execute(&mut *tx).await?;
    }

    tx.commit().await?;
    Ok(())
}
