use crate::domain::sentiment::{DateAverages, FacebookSentiment, SentimentRecord};
use std::collections::BTreeMap;

#[derive(Debug, Default)]
struct AlvinTotal {
    sum: f64,
    count: usize,
}

#[derive(Debug, Default)]
struct FacebookTotal {
    sum: FacebookSentiment,
    count: usize,
}

/// Averages each sentiment signal per date.
///
/// A record only feeds the signals it actually carries, so a date can show up in one map and not
/// the other. An `alvin` score of `0.0` is a real reading and is averaged like any other value.
pub fn compute_averages<'a, I>(records: I) -> DateAverages
where
    I: IntoIterator<Item = &'a SentimentRecord>,
{
    let mut alvin_totals = BTreeMap::<&str, AlvinTotal>::new();
    let mut facebook_totals = BTreeMap::<&str, FacebookTotal>::new();

    for record in records {
        let date = record.date.as_str();

        if let Some(alvin) = record.sentiment.alvin {
            let total = alvin_totals.entry(date).or_default();
            total.sum += alvin;
            total.count += 1;
        }

        if let Some(facebook) = &record.sentiment.facebook {
            let total = facebook_totals.entry(date).or_default();
            total.sum.positive += facebook.positive;
            total.sum.neutral += facebook.neutral;
            total.sum.negative += facebook.negative;
            total.count += 1;
        }
    }

    // Entries only exist after a contribution, so every count is >= 1.
    let alvin_average = alvin_totals
        .into_iter()
        .map(|(date, total)| (date.to_string(), total.sum / total.count as f64))
        .collect();

    let facebook_average = facebook_totals
        .into_iter()
        .map(|(date, total)| {
            let n = total.count as f64;
            (
                date.to_string(),
                FacebookSentiment::new(
                    total.sum.positive / n,
                    total.sum.neutral / n,
                    total.sum.negative / n,
                ),
            )
        })
        .collect();

    DateAverages {
        alvin_average,
        facebook_average,
    }
}
