pub mod lazy;
pub mod news_sentiment;

use crate::domain::sentiment::SentimentRecord;
use anyhow::Context;

/// Anything that can list the stored sentiment records for a topic.
#[async_trait::async_trait]
pub trait SentimentSource: Send + Sync {
    async fn fetch(&self, topic: &str) -> anyhow::Result<Vec<SentimentRecord>>;
}

pub async fn migrate(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("sqlx migrations failed")?;
    Ok(())
}
