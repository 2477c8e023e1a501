use std::sync::{LazyLock, RwLock};
use std::time::{Duration, Instant};

use scraper::{Html, Selector};
use tracing::{debug, info};

use crate::error::{Result, ScheduleError};
use crate::fetch::PageFetcher;

pub const LANDING_PATH: &str = "/education/schedule";

#[cfg(test)]
pub const DEFAULT_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

static PERIOD_OPTION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("select#period option").expect("Invalid period selector"));

#[derive(Debug, Clone)]
struct CachedPeriod {
    value: String,
    fetched_at: Instant,
}

/// Resolves the active academic period and remembers it for `ttl`.
///
/// Concurrent callers may both refresh an expired entry; the last write wins.
pub struct PeriodResolver {
    ttl: Duration,
    cached: RwLock<Option<CachedPeriod>>,
}

impl PeriodResolver {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            cached: RwLock::new(None),
        }
    }

    pub async fn resolve(&self, fetcher: &dyn PageFetcher) -> Result<String> {
        if let Some(value) = self.fresh() {
            return Ok(value);
        }

        let html = fetcher.fetch(LANDING_PATH, &[]).await?;
        let value = parse_period(&html)?;
        info!(period = %value, ttl_secs = self.ttl.as_secs(), "Resolved active period");

        if let Ok(mut cached) = self.cached.write() {
            *cached = Some(CachedPeriod {
                value: value.clone(),
                fetched_at: Instant::now(),
            });
        }
        Ok(value)
    }

    fn fresh(&self) -> Option<String> {
        let cached = self.cached.read().ok()?;
        let entry = cached.as_ref()?;
        if entry.fetched_at.elapsed() < self.ttl {
            debug!(period = %entry.value, "Using cached period");
            Some(entry.value.clone())
        } else {
            None
        }
    }
}

/// First selectable period, or the second one when the first is an exam session.
pub fn parse_period(html: &str) -> Result<String> {
    let document = Html::parse_document(html);
    let values: Vec<&str> = document
        .select(&PERIOD_OPTION)
        .filter_map(|option| option.value().attr("value"))
        .collect();

    let first = values.first().ok_or_else(|| {
        ScheduleError::SourceUnavailable("period selector is missing or empty".to_string())
    })?;

    // a trailing 2 marks the examination session
    if first.ends_with('2') {
        return values.get(1).map(|v| v.to_string()).ok_or_else(|| {
            ScheduleError::SourceFormatChanged(format!(
                "period '{}' is a session period and no other period is listed",
                first
            ))
        });
    }
    Ok(first.to_string())
}
