//! Audio record views: month list, yearly summary, filter options and details
//!
//! ## Cache Keys
//!
//! - Month list: `list:{user_id}:{month}:{year}:{filters_digest}`
//! - Filter options: `list:options`
//! - Yearly summary: `monthly:{user_id}:{year}`
//! - Details: `details:{user_id}:{audio_id}`

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::api::{AudioApi, rows_of};
use crate::client::{Params, RequestClient};
use crate::error::RequestError;
use crate::fan_out::join_fail_fast;
use crate::key::canonical_digest;
use crate::{CacheConfig, CacheStore, DataFetcher, KeyFormatter, Loader, cache_key};

/// Page size large enough to fetch a whole month at once
pub const RECORD_LIMIT: u32 = 10_000;

/// Record list filters; each filter is a set of accepted values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordFilters {
    pub audio_status: BTreeSet<String>,
    pub sentiment: BTreeSet<String>,
    pub upload_source: BTreeSet<String>,
}

impl RecordFilters {
    pub fn is_empty(&self) -> bool {
        self.audio_status.is_empty() && self.sentiment.is_empty() && self.upload_source.is_empty()
    }

    /// Canonical JSON of the filters, independent of selection order
    pub fn digest(&self) -> String {
        // Sets of strings always serialize
        canonical_digest(self).unwrap_or_default()
    }

    /// Query parameters: non-empty filters comma-joined, plus the page limit
    pub fn to_params(&self) -> Params {
        let mut params = Params::new();
        for (name, values) in [
            ("audioStatus", &self.audio_status),
            ("sentiment", &self.sentiment),
            ("uploadSource", &self.upload_source),
        ] {
            if !values.is_empty() {
                let joined: Vec<&str> = values.iter().map(String::as_str).collect();
                params.push((name, joined.join(",")));
            }
        }
        params.push(("limit", RECORD_LIMIT.to_string()));
        params
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordListDeps {
    pub user_id: String,
    pub month: String,
    pub year: i32,
    pub filters: RecordFilters,
}

pub struct RecordListFetcher;

#[async_trait]
impl DataFetcher<RecordListDeps, Vec<Value>, dyn RequestClient> for RecordListFetcher {
    async fn fetch(
        &self,
        ctx: &dyn RequestClient,
        deps: &RecordListDeps,
    ) -> Result<Vec<Value>, RequestError> {
        let params = deps.filters.to_params();
        let records = AudioApi::new(ctx)
            .month_records(&deps.user_id, &deps.month, deps.year, &params)
            .await?;
        Ok(rows_of(records))
    }
}

pub struct RecordListKeys;

impl KeyFormatter<RecordListDeps> for RecordListKeys {
    fn namespace(&self) -> &'static str {
        "list"
    }

    fn format_key(&self, deps: &RecordListDeps) -> String {
        cache_key!(
            self.namespace(),
            deps.user_id,
            deps.month,
            deps.year,
            deps.filters.digest()
        )
    }
}

/// Filter choices offered by the service; shared by every user
pub struct FilterOptionsFetcher;

#[async_trait]
impl DataFetcher<(), Value, dyn RequestClient> for FilterOptionsFetcher {
    async fn fetch(&self, ctx: &dyn RequestClient, _deps: &()) -> Result<Value, RequestError> {
        match AudioApi::new(ctx).record_filter_options().await? {
            Value::Null => Ok(Value::Object(Map::new())),
            options => Ok(options),
        }
    }
}

pub struct FilterOptionsKeys;

impl KeyFormatter<()> for FilterOptionsKeys {
    fn namespace(&self) -> &'static str {
        "list"
    }

    fn format_key(&self, _deps: &()) -> String {
        cache_key!(self.namespace(), "options")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyDeps {
    pub user_id: String,
    pub year: i32,
}

/// Per-month record totals of one year
pub struct MonthlyFetcher;

#[async_trait]
impl DataFetcher<MonthlyDeps, Vec<Value>, dyn RequestClient> for MonthlyFetcher {
    async fn fetch(
        &self,
        ctx: &dyn RequestClient,
        deps: &MonthlyDeps,
    ) -> Result<Vec<Value>, RequestError> {
        let summary = AudioApi::new(ctx)
            .monthly_summary(&deps.user_id, deps.year)
            .await?;
        Ok(rows_of(summary))
    }
}

pub struct MonthlyKeys;

impl KeyFormatter<MonthlyDeps> for MonthlyKeys {
    fn namespace(&self) -> &'static str {
        "monthly"
    }

    fn format_key(&self, deps: &MonthlyDeps) -> String {
        cache_key!(self.namespace(), deps.user_id, deps.year)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDetailsDeps {
    pub user_id: String,
    pub audio_id: String,
}

/// Insights of one recording and where to play it from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioDetails {
    pub insights: Value,
    pub audio_url: String,
}

impl AudioDetails {
    /// Build details from the raw insights and player responses.
    ///
    /// The player answers with a bare URL or an object holding `audioUrl` or
    /// `url`; the insights record may carry its own `audioUrl` as a fallback.
    pub fn from_responses(insights: Value, player: Value) -> Self {
        let insights = rows_of(insights)
            .into_iter()
            .next()
            .unwrap_or_else(|| Value::Object(Map::new()));

        let non_empty = |value: Option<&Value>| {
            value
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
        };
        let audio_url = match &player {
            Value::String(url) => url.clone(),
            _ => non_empty(player.get("audioUrl"))
                .or_else(|| non_empty(player.get("url")))
                .or_else(|| non_empty(insights.get("audioUrl")))
                .unwrap_or_default(),
        };

        Self {
            insights,
            audio_url,
        }
    }
}

pub struct AudioDetailsFetcher;

#[async_trait]
impl DataFetcher<AudioDetailsDeps, AudioDetails, dyn RequestClient> for AudioDetailsFetcher {
    async fn fetch(
        &self,
        ctx: &dyn RequestClient,
        deps: &AudioDetailsDeps,
    ) -> Result<AudioDetails, RequestError> {
        let api = AudioApi::new(ctx);
        let (user, audio) = (deps.user_id.as_str(), deps.audio_id.as_str());

        let mut responses = join_fail_fast([
            api.audio_insights(user, audio).boxed(),
            api.audio_player_url(user, audio).boxed(),
        ])
        .await?
        .into_iter();

        let insights = responses.next().unwrap_or_default();
        let player = responses.next().unwrap_or_default();
        Ok(AudioDetails::from_responses(insights, player))
    }
}

pub struct AudioDetailsKeys;

impl KeyFormatter<AudioDetailsDeps> for AudioDetailsKeys {
    fn namespace(&self) -> &'static str {
        "details"
    }

    fn format_key(&self, deps: &AudioDetailsDeps) -> String {
        cache_key!(self.namespace(), deps.user_id, deps.audio_id)
    }
}

pub type RecordListLoader =
    Loader<RecordListDeps, Vec<Value>, dyn RequestClient, RecordListFetcher, RecordListKeys>;
pub type FilterOptionsLoader =
    Loader<(), Value, dyn RequestClient, FilterOptionsFetcher, FilterOptionsKeys>;
pub type MonthlyLoader =
    Loader<MonthlyDeps, Vec<Value>, dyn RequestClient, MonthlyFetcher, MonthlyKeys>;
pub type AudioDetailsLoader =
    Loader<AudioDetailsDeps, AudioDetails, dyn RequestClient, AudioDetailsFetcher, AudioDetailsKeys>;

pub fn record_list_loader(
    store: CacheStore,
    config: &CacheConfig,
    client: Arc<dyn RequestClient>,
) -> RecordListLoader {
    Loader::new(store, config, client, RecordListFetcher, RecordListKeys)
}

pub fn filter_options_loader(
    store: CacheStore,
    config: &CacheConfig,
    client: Arc<dyn RequestClient>,
) -> FilterOptionsLoader {
    Loader::new(store, config, client, FilterOptionsFetcher, FilterOptionsKeys)
}

pub fn monthly_loader(
    store: CacheStore,
    config: &CacheConfig,
    client: Arc<dyn RequestClient>,
) -> MonthlyLoader {
    Loader::new(store, config, client, MonthlyFetcher, MonthlyKeys)
}

pub fn audio_details_loader(
    store: CacheStore,
    config: &CacheConfig,
    client: Arc<dyn RequestClient>,
) -> AudioDetailsLoader {
    Loader::new(store, config, client, AudioDetailsFetcher, AudioDetailsKeys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockClient;
    use crate::clock::ManualClock;
    use crate::error::FailureKind;
    use crate::loader::{Phase, Settled};
    use crate::storage::MemoryStorage;
    use serde_json::json;

    fn store() -> (CacheStore, MemoryStorage) {
        let storage = MemoryStorage::new(100);
        let store = CacheStore::new(Arc::new(storage.clone()), Arc::new(ManualClock::new(0)));
        (store, storage)
    }

    fn filters(audio_status: &[&str], sentiment: &[&str]) -> RecordFilters {
        RecordFilters {
            audio_status: audio_status.iter().map(|s| s.to_string()).collect(),
            sentiment: sentiment.iter().map(|s| s.to_string()).collect(),
            upload_source: BTreeSet::new(),
        }
    }

    #[test]
    fn test_filter_digest_is_order_independent() {
        assert_eq!(
            RecordFilters::default().digest(),
            r#"{"audioStatus":[],"sentiment":[],"uploadSource":[]}"#
        );
        assert_eq!(
            filters(&["Processed", "Failed"], &[]).digest(),
            filters(&["Failed", "Processed"], &[]).digest()
        );
        assert_ne!(
            filters(&["Failed"], &[]).digest(),
            filters(&[], &["Failed"]).digest()
        );
    }

    #[test]
    fn test_filter_params() {
        assert_eq!(
            RecordFilters::default().to_params(),
            vec![("limit", "10000".to_owned())]
        );
        assert_eq!(
            filters(&["Processed", "Failed"], &["POSITIVE"]).to_params(),
            vec![
                ("audioStatus", "Failed,Processed".to_owned()),
                ("sentiment", "POSITIVE".to_owned()),
                ("limit", "10000".to_owned()),
            ]
        );
    }

    #[test]
    fn test_record_keys() {
        let deps = RecordListDeps {
            user_id: "7".into(),
            month: "January".into(),
            year: 2024,
            filters: RecordFilters::default(),
        };
        assert_eq!(
            RecordListKeys.format_key(&deps),
            r#"list:7:January:2024:{"audioStatus":[],"sentiment":[],"uploadSource":[]}"#
        );
        assert_eq!(FilterOptionsKeys.format_key(&()), "list:options");
        assert_eq!(
            MonthlyKeys.format_key(&MonthlyDeps {
                user_id: "7".into(),
                year: 2024
            }),
            "monthly:7:2024"
        );
        assert_eq!(
            AudioDetailsKeys.format_key(&AudioDetailsDeps {
                user_id: "7".into(),
                audio_id: "a1".into()
            }),
            "details:7:a1"
        );
    }

    #[tokio::test]
    async fn test_record_list_cycle() {
        let client = Arc::new(MockClient::new().respond(
            "/v1.3/audio_records/get-audio-records/7/January/2024",
            json!({"data": [{"audioId": "a1"}, {"audioId": "a2"}]}),
        ));
        let (store, _) = store();
        let loader = record_list_loader(store.clone(), &CacheConfig::default(), client.clone());

        let deps = RecordListDeps {
            user_id: "7".into(),
            month: "January".into(),
            year: 2024,
            filters: filters(&["Processed"], &[]),
        };
        let key = RecordListKeys.format_key(&deps);
        assert_eq!(loader.load(deps).await, Settled::Success);
        assert_eq!(loader.state().data.map(|rows| rows.len()), Some(2));
        assert_eq!(
            client.params_for("/v1.3/audio_records/get-audio-records/7/January/2024"),
            Some(vec![
                ("audioStatus", "Processed".to_owned()),
                ("limit", "10000".to_owned()),
            ])
        );

        let cached: Vec<Value> = store.get(&key, loader.ttl()).unwrap();
        assert_eq!(cached[1], json!({"audioId": "a2"}));
    }

    #[tokio::test]
    async fn test_filter_options_default_to_empty_object() {
        let client = Arc::new(
            MockClient::new().respond("/v1.3/audio_records/get-audio-filter-options", Value::Null),
        );
        let (store, _) = store();
        let loader = filter_options_loader(store.clone(), &CacheConfig::default(), client);

        assert_eq!(loader.load(()).await, Settled::Success);
        assert_eq!(loader.state().data, Some(json!({})));
        assert_eq!(
            store.get::<Value>("list:options", loader.ttl()),
            Some(json!({}))
        );
    }

    #[tokio::test]
    async fn test_monthly_hydrates_then_fails_with_notice() {
        let client = Arc::new(MockClient::new().fail(
            "/v1.3/monthlyData/getMonthWiseData/7/2024/",
            RequestError::transport(FailureKind::Connect, "Network Error"),
        ));
        let (store, _) = store();
        store.set("monthly:7:2024", &vec![json!({"month": "January", "count": 3})]);
        let loader = monthly_loader(store, &CacheConfig::default(), client);

        let deps = MonthlyDeps {
            user_id: "7".into(),
            year: 2024,
        };
        assert!(matches!(loader.load(deps).await, Settled::Failed(_)));

        let state = loader.state();
        assert_eq!(state.phase, Phase::Hydrated);
        assert_eq!(state.data.map(|rows| rows.len()), Some(1));
        let notice = state.notice.unwrap();
        assert!(notice.is_network_error);
        assert_eq!(notice.user_message(), "Network error. Please check your connection.");
    }

    #[test]
    fn test_audio_url_resolution() {
        let insights = json!({"data": [{"audioId": "a1", "audioUrl": "https://cdn/a1.mp3"}]});

        let details = AudioDetails::from_responses(insights.clone(), json!("https://player/a1"));
        assert_eq!(details.audio_url, "https://player/a1");
        assert_eq!(details.insights["audioId"], "a1");

        let details = AudioDetails::from_responses(insights.clone(), json!({"url": "https://u/a1"}));
        assert_eq!(details.audio_url, "https://u/a1");

        let details = AudioDetails::from_responses(insights, json!({}));
        assert_eq!(details.audio_url, "https://cdn/a1.mp3");

        let details = AudioDetails::from_responses(json!([]), Value::Null);
        assert_eq!(details.insights, json!({}));
        assert_eq!(details.audio_url, "");
    }

    #[tokio::test]
    async fn test_audio_details_cycle() {
        let client = Arc::new(
            MockClient::new()
                .respond(
                    "/v1.3/audio_records/get-audio-insights/7/a1",
                    json!([{"audioId": "a1", "summary": "ok"}]),
                )
                .respond(
                    "/v1.3/media-player/audio_player/7/a1",
                    json!({"audioUrl": "https://player/a1"}),
                ),
        );
        let (store, storage) = store();
        let loader = audio_details_loader(store, &CacheConfig::default(), client);

        let deps = AudioDetailsDeps {
            user_id: "7".into(),
            audio_id: "a1".into(),
        };
        assert_eq!(loader.load(deps).await, Settled::Success);
        let details = loader.state().data.unwrap();
        assert_eq!(details.audio_url, "https://player/a1");
        assert_eq!(details.insights["summary"], "ok");
        assert_eq!(storage.len(), 1);
    }

    #[tokio::test]
    async fn test_audio_details_fail_fast() {
        let client = Arc::new(MockClient::new().respond(
            "/v1.3/audio_records/get-audio-insights/7/a1",
            json!([{"audioId": "a1"}]),
        ));
        let (store, storage) = store();
        let loader = audio_details_loader(store, &CacheConfig::default(), client);

        let deps = AudioDetailsDeps {
            user_id: "7".into(),
            audio_id: "a1".into(),
        };
        // The player route is missing, so the whole cycle fails
        assert!(matches!(
            loader.load(deps).await,
            Settled::Failed(ref e) if e.status == Some(404)
        ));
        assert_eq!(loader.state().phase, Phase::Error);
        assert!(storage.is_empty());
    }
}
