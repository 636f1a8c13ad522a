//! Reports view: call metrics, agent reports and score cards
//!
//! A reports cycle fans out eight requests and caches them as one entry.
//!
//! ## Cache Keys
//!
//! - Entry: `reports:{user_id}:{call_status}:{month}:{score_type}`

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::ReportsApi;
use crate::client::{Params, RequestClient};
use crate::error::RequestError;
use crate::{CacheConfig, CacheStore, DataFetcher, KeyFormatter, Loader, cache_key};

pub const DEFAULT_CALL_STATUS: &str = "both";
pub const DEFAULT_SCORE_TYPE: &str = "OFE Score";

/// Dependency tuple of the reports view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportsDeps {
    pub user_id: String,
    pub call_status: String,
    /// Month name of the score card
    pub month: String,
    pub score_type: String,
}

impl ReportsDeps {
    /// Reports for `month` with the default call status and score type
    pub fn new(user_id: impl Into<String>, month: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            call_status: DEFAULT_CALL_STATUS.to_owned(),
            month: month.into(),
            score_type: DEFAULT_SCORE_TYPE.to_owned(),
        }
    }

    pub fn with_call_status(mut self, call_status: impl Into<String>) -> Self {
        self.call_status = call_status.into();
        self
    }

    pub fn with_score_type(mut self, score_type: impl Into<String>) -> Self {
        self.score_type = score_type.into();
        self
    }
}

/// Cached reports payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportsData {
    pub cards: Value,
    pub call_dist: Value,
    pub peak: Value,
    pub funnel: Vec<Value>,
    pub agent_report: Value,
    pub events: Value,
    pub adherence: Vec<Value>,
    pub score_card: Value,
}

fn array_or_empty(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        _ => Vec::new(),
    }
}

/// Fetches every report of the view concurrently
pub struct ReportsFetcher;

#[async_trait]
impl DataFetcher<ReportsDeps, ReportsData, dyn RequestClient> for ReportsFetcher {
    async fn fetch(
        &self,
        ctx: &dyn RequestClient,
        deps: &ReportsDeps,
    ) -> Result<ReportsData, RequestError> {
        let api = ReportsApi::new(ctx);
        let user = deps.user_id.as_str();
        let by_status: Params = vec![("callStatus", deps.call_status.clone())];
        let score_card_params: Params = vec![
            ("month", deps.month.clone()),
            ("scoreType", deps.score_type.clone()),
            ("callStatus", deps.call_status.clone()),
        ];
        let no_params = Params::new();

        let (cards, call_dist, peak, funnel, agent_report, events, adherence, score_card) =
            futures::try_join!(
                api.card_metrics(user, &by_status),
                api.call_time_distribution(user, &by_status),
                api.peak_call_hours(user, &by_status),
                api.call_to_lead_conversion(user, &by_status),
                api.agent_report(user, &by_status),
                api.events_by_agent(user, &no_params),
                api.agent_followed_script(user, &by_status),
                api.agent_score_card(user, &score_card_params),
            )?;

        Ok(ReportsData {
            cards,
            call_dist,
            peak,
            funnel: array_or_empty(funnel),
            agent_report,
            events,
            adherence: array_or_empty(adherence),
            score_card,
        })
    }
}

/// Key formatter for the reports view
pub struct ReportsKeys;

impl KeyFormatter<ReportsDeps> for ReportsKeys {
    fn namespace(&self) -> &'static str {
        "reports"
    }

    fn format_key(&self, deps: &ReportsDeps) -> String {
        cache_key!(
            self.namespace(),
            deps.user_id,
            deps.call_status,
            deps.month,
            deps.score_type
        )
    }
}

pub type ReportsLoader =
    Loader<ReportsDeps, ReportsData, dyn RequestClient, ReportsFetcher, ReportsKeys>;

/// Create a reports loader
pub fn reports_loader(
    store: CacheStore,
    config: &CacheConfig,
    client: Arc<dyn RequestClient>,
) -> ReportsLoader {
    Loader::new(store, config, client, ReportsFetcher, ReportsKeys)
}
