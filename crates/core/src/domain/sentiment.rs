use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One stored observation for a topic on a given day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentRecord {
    /// Opaque day key; only compared for equality.
    pub date: String,
    #[serde(default)]
    pub sentiment: Sentiment,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    #[serde(default)]
    pub alvin: Option<f64>,
    #[serde(default)]
    pub facebook: Option<FacebookSentiment>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FacebookSentiment {
    pub positive: f64,
    pub neutral: f64,
    pub negative: f64,
}

impl FacebookSentiment {
    pub fn new(positive: f64, neutral: f64, negative: f64) -> Self {
        Self {
            positive,
            neutral,
            negative,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateAverages {
    pub alvin_average: BTreeMap<String, f64>,
    pub facebook_average: BTreeMap<String, FacebookSentiment>,
}
