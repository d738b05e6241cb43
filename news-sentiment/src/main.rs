use anyhow::Context;
use clap::Parser;
use news_sentiment::{store, NytTopStories, Pipeline, PipelineConfig, Scheduler, VaderModel};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Fetch top stories, store them, score their sentiment and store the scores.
#[derive(Debug, Parser)]
#[command(name = "news-sentiment", version)]
struct Cli {
    /// Run the pipeline a single time and exit instead of scheduling daily runs.
    #[arg(long)]
    once: bool,

    /// Maximum number of articles kept per fetch (overrides PAGE_SIZE).
    #[arg(long)]
    page_size: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    let mut config = PipelineConfig::from_env().context("failed to load configuration")?;
    if let Some(page_size) = cli.page_size {
        anyhow::ensure!(page_size > 0, "--page-size must be at least 1");
        config.page_size = page_size;
    }
    info!("Loaded configuration: {:?}", config);

    let provider = NytTopStories::new(&config.provider).context("failed to build provider client")?;
    info!("Provider endpoint: {}", provider.endpoint());

    let pipeline = Pipeline::new(config, Box::new(provider), Box::new(VaderModel::new()));

    if cli.once {
        let report = pipeline.run_once().await.map_err(|e| {
            error!("Pipeline run failed: {}", e);
            e
        })?;
        info!("Run report: {:?}", report);
        log_table_stats(&pipeline).await;
        return Ok(());
    }

    Scheduler::daily().run(&pipeline).await;
    Ok(())
}

async fn log_table_stats(pipeline: &Pipeline) {
    let db = pipeline.database();
    let mut conn = match db.connect().await {
        Ok(conn) => conn,
        Err(e) => {
            error!("Failed to read table stats: {}", e);
            return;
        }
    };

    match store::table_stats(&mut conn).await {
        Ok(stats) => {
            info!("Table statistics:");
            for (table, rows) in stats {
                info!("  {}: {} rows", table, rows);
            }
        }
        Err(e) => error!("Failed to read table stats: {}", e),
    }
    db.release(conn).await;
}
