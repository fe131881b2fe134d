use crate::config::Settings;
use crate::domain::sentiment::{FacebookSentiment, Sentiment, SentimentRecord};
use crate::storage::lazy::LazyHandle;
use crate::storage::{migrate, SentimentSource};
use anyhow::Context;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

const MAX_CONNECTIONS: u32 = 5;

/// Postgres-backed record source.
///
/// The pool is created (and migrations applied) on first use and shared by every request after
/// that.
#[derive(Debug)]
pub struct PgSentimentStore {
    database_url: String,
    collection: String,
    pool: LazyHandle<PgPool>,
}

impl PgSentimentStore {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        Ok(Self {
            database_url: settings.require_database_url()?.to_string(),
            collection: settings.require_sentiment_collection_name()?.to_string(),
            pool: LazyHandle::new(),
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    async fn pool(&self) -> anyhow::Result<&PgPool> {
        self.pool
            .get_or_try_init(|| async {
                let pool = PgPoolOptions::new()
                    .max_connections(MAX_CONNECTIONS)
                    .connect(&self.database_url)
                    .await
                    .context("connect DATABASE_URL failed")?;
                migrate(&pool).await?;
                tracing::info!(collection = %self.collection, "sentiment store initialized");
                Ok::<_, anyhow::Error>(pool)
            })
            .await
    }
}

#[async_trait::async_trait]
impl SentimentSource for PgSentimentStore {
    async fn fetch(&self, topic: &str) -> anyhow::Result<Vec<SentimentRecord>> {
        let pool = self.pool().await?;

        let rows = sqlx::query_as::<_, (String, Option<f64>, Option<Value>)>(
            "SELECT date, alvin, facebook \
             FROM news_sentiment \
             WHERE collection = $1 AND topic = $2",
        )
        .persistent(false)
        .bind(&self.collection)
        .bind(topic)
        .fetch_all(pool)
        .await
        .with_context(|| format!("select news_sentiment failed (topic={topic})"))?;

        Ok(rows
            .into_iter()
            .map(|(date, alvin, facebook)| {
                let alvin = decode_alvin(&date, alvin);
                let facebook = decode_facebook(&date, facebook);
                SentimentRecord {
                    date,
                    sentiment: Sentiment { alvin, facebook },
                }
            })
            .collect())
    }
}

/// `NaN` and infinities fit in a `DOUBLE PRECISION` column but are not scores.
fn decode_alvin(date: &str, raw: Option<f64>) -> Option<f64> {
    match raw {
        Some(v) if !v.is_finite() => {
            tracing::warn!(%date, alvin = v, "non-finite alvin sentiment; skipping");
            None
        }
        other => other,
    }
}

/// A stored `facebook` value either carries all three numeric fields or counts as absent.
fn decode_facebook(date: &str, raw: Option<Value>) -> Option<FacebookSentiment> {
    match raw {
        None | Some(Value::Null) => None,
        Some(v) => match serde_json::from_value::<FacebookSentiment>(v) {
            Ok(facebook) => Some(facebook),
            Err(err) => {
                tracing::warn!(%date, error = %err, "malformed facebook sentiment; skipping");
                None
            }
        },
    }
}
