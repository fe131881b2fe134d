use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use moody_core::config::Settings;
use moody_core::domain::average::compute_averages;
use moody_core::domain::sentiment::DateAverages;
use moody_core::storage::news_sentiment::PgSentimentStore;
use moody_core::storage::SentimentSource;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Local runs read credentials from `.env`; hosted runs get them from the platform.
    if moody_core::config::is_own_server() {
        dotenvy::dotenv().ok();
    }

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let store = PgSentimentStore::from_settings(&settings)?;
    tracing::info!(
        collection = store.collection(),
        own_server = settings.is_own_server,
        "sentiment store configured"
    );

    let state = AppState {
        source: Arc::new(store),
    };
    let app = build_router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], settings.port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET]);

    Router::new()
        .route("/healthz", get(healthz))
        .route("/moody", get(get_average_sentiment))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    source: Arc<dyn SentimentSource>,
}

#[derive(Debug, Serialize)]
struct ApiAverages {
    data: DateAverages,
}

enum ApiError {
    NotFound(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg).into_response(),
            ApiError::Internal(err) => {
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
            }
        }
    }
}

fn not_found(topic: &str) -> ApiError {
    ApiError::NotFound(format!("No news sentiment data found for topic {topic}"))
}

async fn get_average_sentiment(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<ApiAverages>, ApiError> {
    let topics: Vec<String> = params
        .into_iter()
        .filter(|(key, _)| key == "topic")
        .map(|(_, value)| value)
        .collect();

    // A missing or repeated topic matches no stored record; skip the round trip.
    let topic = match <[String; 1]>::try_from(topics) {
        Ok([topic]) => topic,
        Err(topics) => {
            let topic = topics.join(",");
            tracing::info!(%topic, topics_len = topics.len(), "topic missing or repeated");
            return Err(not_found(&topic));
        }
    };

    tracing::info!(%topic, "getting news sentiment data");
    let records = state.source.fetch(&topic).await.map_err(|e| {
        sentry_anyhow::capture_anyhow(&e);
        tracing::error!(%topic, error = ?e, "fetching news sentiment failed");
        ApiError::Internal(e)
    })?;

    if records.is_empty() {
        tracing::info!(%topic, "no news sentiment records");
        return Err(not_found(&topic));
    }

    tracing::info!(
        %topic,
        records_len = records.len(),
        "getting average news sentiment data"
    );
    let data = compute_averages(&records);

    Ok(Json(ApiAverages { data }))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use moody_core::domain::sentiment::{FacebookSentiment, Sentiment, SentimentRecord};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    #[derive(Default)]
    struct StaticSource {
        records: Vec<SentimentRecord>,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl SentimentSource for StaticSource {
        async fn fetch(&self, _topic: &str) -> anyhow::Result<Vec<SentimentRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.records.clone())
        }
    }

    struct FailingSource;

    #[async_trait::async_trait]
    impl SentimentSource for FailingSource {
        async fn fetch(&self, _topic: &str) -> anyhow::Result<Vec<SentimentRecord>> {
            anyhow::bail!("store unavailable")
        }
    }

    fn app_with(source: Arc<dyn SentimentSource>) -> Router {
        build_router(AppState { source })
    }

    fn request(uri: &str) -> Request<Body> {
        Request::get(uri)
            .header(header::ORIGIN, "https://example.com")
            .body(Body::empty())
            .unwrap()
    }

    async fn read_body_string(resp: Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn allow_origin(resp: &Response) -> Option<&str> {
        resp.headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok())
    }

    fn election_records() -> Vec<SentimentRecord> {
        vec![
            SentimentRecord {
                date: "d1".to_string(),
                sentiment: Sentiment {
                    alvin: Some(2.0),
                    facebook: Some(FacebookSentiment::new(1.0, 2.0, 3.0)),
                },
            },
            SentimentRecord {
                date: "d1".to_string(),
                sentiment: Sentiment {
                    alvin: Some(4.0),
                    facebook: Some(FacebookSentiment::new(3.0, 2.0, 1.0)),
                },
            },
        ]
    }

    #[tokio::test]
    async fn healthz_returns_ok() {
        let resp = app_with(Arc::new(StaticSource::default()))
            .oneshot(request("/healthz"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(read_body_string(resp).await, "ok");
    }

    #[tokio::test]
    async fn unknown_topic_is_not_found() {
        let resp = app_with(Arc::new(StaticSource::default()))
            .oneshot(request("/moody?topic=elections"))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(allow_origin(&resp), Some("*"));
        assert_eq!(
            read_body_string(resp).await,
            "No news sentiment data found for topic elections"
        );
    }

    #[tokio::test]
    async fn averages_records_for_topic() {
        let source = Arc::new(StaticSource {
            records: election_records(),
            ..Default::default()
        });
        let resp = app_with(source.clone())
            .oneshot(request("/moody?topic=elections"))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(allow_origin(&resp), Some("*"));
        assert_eq!(
            resp.headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            Some("application/json")
        );

        let body: serde_json::Value =
            serde_json::from_str(&read_body_string(resp).await).unwrap();
        assert_eq!(body["data"]["alvinAverage"]["d1"], 3.0);
        assert_eq!(
            body["data"]["facebookAverage"]["d1"],
            serde_json::json!({"positive": 2.0, "neutral": 2.0, "negative": 2.0})
        );
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn source_failure_is_internal_error() {
        let resp = app_with(Arc::new(FailingSource))
            .oneshot(request("/moody?topic=elections"))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(allow_origin(&resp), Some("*"));
        assert_eq!(read_body_string(resp).await, "store unavailable");
    }

    #[tokio::test]
    async fn missing_topic_skips_the_source() {
        let source = Arc::new(StaticSource {
            records: election_records(),
            ..Default::default()
        });
        let resp = app_with(source.clone())
            .oneshot(request("/moody"))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            read_body_string(resp).await,
            "No news sentiment data found for topic "
        );
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn repeated_topic_is_not_found() {
        let source = Arc::new(StaticSource {
            records: election_records(),
            ..Default::default()
        });
        let resp = app_with(source.clone())
            .oneshot(request("/moody?topic=a&topic=b"))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(allow_origin(&resp), Some("*"));
        assert_eq!(
            read_body_string(resp).await,
            "No news sentiment data found for topic a,b"
        );
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unrelated_params_are_ignored() {
        let source = Arc::new(StaticSource {
            records: election_records(),
            ..Default::default()
        });
        let resp = app_with(source.clone())
            .oneshot(request("/moody?lang=en&topic=elections&topic_hint=x"))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }
}
