pub mod domain;
pub mod storage;

pub mod config {
    use anyhow::Context;

    const DEFAULT_PORT: u16 = 3000;

    /// `IS_OWN_SERVER=true` marks local/test execution, where credentials come from a `.env` file
    /// instead of the hosting platform's environment.
    pub fn is_own_server() -> bool {
        parse_flag(std::env::var("IS_OWN_SERVER").ok().as_deref())
    }

    fn parse_flag(value: Option<&str>) -> bool {
        matches!(value.map(str::trim), Some("true"))
    }

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub is_own_server: bool,
        pub database_url: Option<String>,
        pub sentiment_collection_name: Option<String>,
        pub sentry_dsn: Option<String>,
        pub port: u16,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let port = match std::env::var("PORT") {
                Ok(v) => v
                    .parse()
                    .with_context(|| format!("PORT must be a valid port number (got {v})"))?,
                Err(_) => DEFAULT_PORT,
            };

            Ok(Self {
                is_own_server: is_own_server(),
                database_url: std::env::var("DATABASE_URL").ok(),
                sentiment_collection_name: std::env::var("SENTIMENT_COLLECTION_NAME")
                    .ok()
                    .filter(|s| !s.trim().is_empty()),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                port,
            })
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }

        pub fn require_sentiment_collection_name(&self) -> anyhow::Result<&str> {
            self.sentiment_collection_name
                .as_deref()
                .context("SENTIMENT_COLLECTION_NAME is required")
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn own_server_flag_is_exact_true() {
            assert!(parse_flag(Some("true")));
            assert!(parse_flag(Some(" true ")));
            assert!(!parse_flag(Some("TRUE")));
            assert!(!parse_flag(Some("1")));
            assert!(!parse_flag(None));
        }
    }
}
