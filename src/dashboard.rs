//! Dashboard view: KPIs, audio counts and monthly sentiment
//!
//! One cycle fans out three requests (KPIs, counts for the selected view
//! mode, monthly sentiment) and caches them as a single entry.
//!
//! ## Cache Keys
//!
//! - Entry: `dashboard:{user_id}:{year}:{month}:{view}`
//! - Selected view mode (raw, no timestamp): `dashboard:view`

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::api::DashboardApi;
use crate::client::RequestClient;
use crate::error::RequestError;
use crate::storage::StorageArea;
use crate::{CacheConfig, CacheStore, DataFetcher, KeyFormatter, Loader, cache_key};

/// Storage key of the persisted view mode
pub const VIEW_MODE_KEY: &str = "dashboard:view";

/// Granularity of the audio counts chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ViewMode {
    #[default]
    Monthly,
    Weekly,
    Daily,
}

impl ViewMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Monthly => "Monthly",
            Self::Weekly => "Weekly",
            Self::Daily => "Daily",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Monthly" => Some(Self::Monthly),
            "Weekly" => Some(Self::Weekly),
            "Daily" => Some(Self::Daily),
            _ => None,
        }
    }

    /// Read the persisted view mode, defaulting to `Monthly`
    pub fn load(storage: &dyn StorageArea) -> Self {
        match storage.get_item(VIEW_MODE_KEY) {
            Ok(Some(raw)) => Self::parse(&raw).unwrap_or_default(),
            Ok(None) => Self::default(),
            Err(e) => {
                warn!("Could not read {}: {}", VIEW_MODE_KEY, e);
                Self::default()
            }
        }
    }

    /// Persist the view mode; failures are logged and ignored
    pub fn save(self, storage: &dyn StorageArea) {
        if let Err(e) = storage.set_item(VIEW_MODE_KEY, self.as_str()) {
            warn!("Could not persist {}: {}", VIEW_MODE_KEY, e);
        }
    }
}

impl std::fmt::Display for ViewMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// English month name for a 1-based month number
pub fn month_name(month: u32) -> Option<&'static str> {
    const MONTHS: [&str; 12] = [
        "January",
        "February",
        "March",
        "April",
        "May",
        "June",
        "July",
        "August",
        "September",
        "October",
        "November",
        "December",
    ];
    MONTHS.get(month.checked_sub(1)? as usize).copied()
}

/// Dependency tuple of the dashboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardDeps {
    pub user_id: String,
    pub year: i32,
    /// Month name, e.g. `January`
    pub month: String,
    pub view: ViewMode,
}

/// Cached dashboard payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub kpi: Value,
    pub counts: Value,
    pub sentiment_monthly: Value,
}

/// One bar of the counts chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatePoint {
    pub date: String,
    pub count: u64,
}

impl DashboardData {
    /// Normalize the counts payload of `view` into chart points.
    ///
    /// The service answers with different row shapes per mode; weekly counts
    /// may also arrive as a `{week: count}` object.
    pub fn series(&self, view: ViewMode) -> Vec<DatePoint> {
        let payload = self.counts.get("data").unwrap_or(&self.counts);

        if let (ViewMode::Weekly, Value::Object(weeks)) = (view, payload) {
            return weeks
                .iter()
                .map(|(week, count)| DatePoint {
                    date: week.clone(),
                    count: as_count(count).unwrap_or(0),
                })
                .collect();
        }

        let Value::Array(rows) = payload else {
            return Vec::new();
        };

        rows.iter()
            .map(|row| match view {
                ViewMode::Monthly => DatePoint {
                    date: first_text(row, &["month", "name"]),
                    count: first_count(row, &["totalRecords", "count"]),
                },
                ViewMode::Weekly => {
                    let first_key = row.as_object().and_then(|o| o.keys().next().cloned());
                    let mut date = first_text(row, &["week", "name"]);
                    if date.is_empty() {
                        date = row.get(0).and_then(text).or(first_key.clone()).unwrap_or_default();
                    }
                    let count = ["totalRecords", "count"]
                        .iter()
                        .find_map(|field| row.get(*field).and_then(as_count))
                        .or_else(|| row.get(first_key.as_deref()?).and_then(as_count))
                        .unwrap_or(0);
                    DatePoint { date, count }
                }
                ViewMode::Daily => DatePoint {
                    date: first_text(row, &["date", "Day", "day"]),
                    count: first_count(row, &["totalRecords", "count", "n"]),
                },
            })
            .collect()
    }
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn first_text(row: &Value, fields: &[&str]) -> String {
    fields
        .iter()
        .find_map(|field| row.get(*field).and_then(text))
        .unwrap_or_default()
}

fn first_count(row: &Value, fields: &[&str]) -> u64 {
    fields
        .iter()
        .find_map(|field| row.get(*field).and_then(as_count))
        .unwrap_or(0)
}

fn as_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f.max(0.0) as u64)),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f.max(0.0) as u64),
        _ => None,
    }
}

/// Fetches the three dashboard resources concurrently
pub struct DashboardFetcher;

#[async_trait]
impl DataFetcher<DashboardDeps, DashboardData, dyn RequestClient> for DashboardFetcher {
    async fn fetch(
        &self,
        ctx: &dyn RequestClient,
        deps: &DashboardDeps,
    ) -> Result<DashboardData, RequestError> {
        let api = DashboardApi::new(ctx);
        let user = deps.user_id.as_str();

        let counts = async {
            match deps.view {
                ViewMode::Monthly => api.monthwise_counts(user, deps.year).await,
                ViewMode::Weekly => api.weekwise_counts(user, &deps.month, deps.year).await,
                ViewMode::Daily => api.datewise_counts(user, &deps.month, deps.year).await,
            }
        };

        let (kpi, counts, sentiment_monthly) = futures::try_join!(
            api.audio_kpi(user),
            counts,
            api.sentiment_monthly(user, deps.year),
        )?;

        // Keep only the rows when the counts come wrapped in `data`
        let counts = match counts {
            Value::Object(mut map) if map.get("data").is_some_and(Value::is_array) => {
                map.remove("data").unwrap_or(Value::Null)
            }
            other => other,
        };

        Ok(DashboardData {
            kpi,
            counts,
            sentiment_monthly,
        })
    }
}

/// Key formatter for the dashboard view
pub struct DashboardKeys;

impl KeyFormatter<DashboardDeps> for DashboardKeys {
    fn namespace(&self) -> &'static str {
        "dashboard"
    }

    fn format_key(&self, deps: &DashboardDeps) -> String {
        cache_key!(
            self.namespace(),
            deps.user_id,
            deps.year,
            deps.month,
            deps.view.as_str()
        )
    }
}

pub type DashboardLoader =
    Loader<DashboardDeps, DashboardData, dyn RequestClient, DashboardFetcher, DashboardKeys>;

/// Create a dashboard loader
pub fn dashboard_loader(
    store: CacheStore,
    config: &CacheConfig,
    client: Arc<dyn RequestClient>,
) -> DashboardLoader {
    Loader::new(store, config, client, DashboardFetcher, DashboardKeys)
}
