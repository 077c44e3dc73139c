use crate::model::PeriodBucket;
use chrono::{DateTime, Datelike, Utc};
use std::path::Path;

pub fn period_key(timestamp: &DateTime<Utc>, bucket: PeriodBucket) -> String {
    match bucket {
        PeriodBucket::Day => timestamp.format("%Y-%m-%d").to_string(),
        PeriodBucket::Week => {
            let week = timestamp.iso_week();
            format!("{}-W{:02}", week.year(), week.week())
        }
        PeriodBucket::Month => timestamp.format("%Y-%m").to_string(),
    }
}

pub fn normalized_extension(path: &str) -> String {
    Path::new(path)
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Roll a path up to its first `depth` components; `depth` 0 keeps it intact.
pub fn aggregate_path(path: &str, depth: u32) -> String {
    let parts: Vec<&str> = path.split('/').collect();
    if depth == 0 || parts.len() <= depth as usize {
        path.to_string()
    } else {
        parts[..depth as usize].join("/")
    }
}
