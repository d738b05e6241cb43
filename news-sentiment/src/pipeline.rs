use crate::config::PipelineConfig;
use crate::db::Database;
use crate::fetcher::{Fetcher, NewsProvider};
use crate::schema;
use crate::sentiment::{self, PolarityModel};
use crate::store;
use crate::types::{ArticleRecord, PipelineError, Result, RunReport};
use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// Initialize -> fetch -> store raw -> score and store, in that order.
/// Each stage only starts after the previous one succeeded.
pub struct Pipeline {
    config: PipelineConfig,
    db: Database,
    provider: Box<dyn NewsProvider>,
    model: Box<dyn PolarityModel>,
    run_gate: Mutex<()>,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        provider: Box<dyn NewsProvider>,
        model: Box<dyn PolarityModel>,
    ) -> Self {
        let db = Database::new(config.database.clone());
        Self {
            config,
            db,
            provider,
            model,
            run_gate: Mutex::new(()),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Run all four stages once. A second call while a run is active fails
    /// with [`PipelineError::RunInProgress`] instead of queueing.
    pub async fn run_once(&self) -> Result<RunReport> {
        let _guard = self.run_gate.try_lock().map_err(|_| PipelineError::RunInProgress)?;
        let start_time = Instant::now();
        info!("Starting pipeline run");

        self.stage("initialize", || self.initialize()).await?;
        let articles = self.stage("fetch", || self.fetch()).await?;
        let raw_inserted = self.stage("store_raw", || self.store_raw(&articles)).await?;
        let (raw_total, scored_inserted) = self.stage("score", || self.score_and_store()).await?;

        let report = RunReport {
            fetched: articles.len(),
            raw_inserted,
            raw_total,
            scored_inserted,
        };
        info!(
            "Pipeline run finished in {}ms: fetched {}, new raw {}, scored {} (new {})",
            start_time.elapsed().as_millis(),
            report.fetched,
            report.raw_inserted,
            report.raw_total,
            report.scored_inserted
        );
        Ok(report)
    }

    pub async fn initialize(&self) -> Result<()> {
        schema::initialize_schema(&self.db).await
    }

    pub async fn fetch(&self) -> Result<Vec<ArticleRecord>> {
        Fetcher::new(self.provider.as_ref())
            .fetch(self.config.page_size)
            .await
    }

    pub async fn store_raw(&self, articles: &[ArticleRecord]) -> Result<u64> {
        if articles.is_empty() {
            info!("Nothing fetched, skipping raw insert");
            return Ok(0);
        }

        let mut conn = self.db.connect().await?;
        let outcome = store::insert_raw_articles(&mut conn, articles).await;
        self.db.release(conn).await;
        outcome
    }

    /// Rescans the whole raw table, scores every row and writes the results.
    /// Rows already present in `news_sentiment` are skipped by the insert.
    /// Returns (raw rows scored, scored rows inserted).
    pub async fn score_and_store(&self) -> Result<(usize, u64)> {
        let mut conn = self.db.connect().await?;
        let outcome = async {
            let raw = store::load_raw_articles(&mut conn).await?;
            let scored = sentiment::score_articles(self.model.as_ref(), &raw);
            let inserted = store::insert_scored_articles(&mut conn, &scored).await?;
            Ok::<_, PipelineError>((raw.len(), inserted))
        }
        .await;
        self.db.release(conn).await;
        outcome
    }

    async fn stage<T, F, Fut>(&self, name: &str, op: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        run_stage(name, self.config.stage_retries, self.config.retry_delay(), op).await
    }
}

/// Run `op`, retrying the whole stage up to `retries` extra times. The first
/// retry waits `delay`; later ones back off exponentially.
pub async fn run_stage<T, F, Fut>(name: &str, retries: u32, delay: Duration, op: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut backoff = ExponentialBackoff {
        current_interval: delay,
        initial_interval: delay,
        randomization_factor: 0.0,
        multiplier: 2.0,
        max_interval: delay.saturating_mul(8),
        max_elapsed_time: None,
        ..Default::default()
    };

    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => {
                if attempt > 0 {
                    info!("Stage {} succeeded on attempt {}", name, attempt + 1);
                }
                return Ok(value);
            }
            Err(e) if attempt < retries => {
                let wait = backoff.next_backoff().unwrap_or(delay);
                warn!(
                    "Stage {} failed on attempt {}: {}; retrying in {:?}",
                    name,
                    attempt + 1,
                    e,
                    wait
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
            Err(e) => {
                error!("Stage {} failed after {} attempts: {}", name, attempt + 1, e);
                return Err(e);
            }
        }
    }
}
