//! Read endpoints of the analytics service
//!
//! Thin typed wrappers over [`RequestClient::get`]. Responses are returned as
//! raw JSON; the views decide which shape they keep.

use serde_json::Value;

use crate::client::{Params, RequestClient};
use crate::error::RequestError;

const PREFIX: &str = "/v1.3";

/// Dashboard KPI and count endpoints
pub struct DashboardApi<'a> {
    client: &'a dyn RequestClient,
}

impl<'a> DashboardApi<'a> {
    pub fn new(client: &'a dyn RequestClient) -> Self {
        Self { client }
    }

    pub async fn audio_kpi(&self, user_id: &str) -> Result<Value, RequestError> {
        self.client
            .get(&format!("{PREFIX}/dashboard/audio-kpi/{user_id}"), &[])
            .await
    }

    pub async fn datewise_counts(
        &self,
        user_id: &str,
        month: &str,
        year: i32,
    ) -> Result<Value, RequestError> {
        self.client
            .get(
                &format!("{PREFIX}/dashboard/getnAudiosByDate/{user_id}/{month}/{year}/"),
                &[],
            )
            .await
    }

    pub async fn weekwise_counts(
        &self,
        user_id: &str,
        month: &str,
        year: i32,
    ) -> Result<Value, RequestError> {
        self.client
            .get(
                &format!("{PREFIX}/dashboard/getnAudiosByWeek/{user_id}/{month}/{year}/"),
                &[],
            )
            .await
    }

    pub async fn monthwise_counts(&self, user_id: &str, year: i32) -> Result<Value, RequestError> {
        self.client
            .get(
                &format!("{PREFIX}/dashboard/getnAudiosByMonth/{user_id}/{year}"),
                &[],
            )
            .await
    }

    pub async fn sentiment_monthly(&self, user_id: &str, year: i32) -> Result<Value, RequestError> {
        self.client
            .get(
                &format!("{PREFIX}/dashboard/sentiment_kpi_monthly/{user_id}/{year}"),
                &[],
            )
            .await
    }

    pub async fn sentiment_weekly(
        &self,
        user_id: &str,
        month: &str,
        year: i32,
    ) -> Result<Value, RequestError> {
        self.client
            .get(
                &format!("{PREFIX}/dashboard/sentiment-kpi-weekly/{user_id}/{month}/{year}"),
                &[],
            )
            .await
    }

    pub async fn net_sentiment_score(
        &self,
        user_id: &str,
        month: &str,
    ) -> Result<Value, RequestError> {
        self.client
            .get(
                &format!("{PREFIX}/dashboard/netSentimentScore/{user_id}/"),
                &[("month", month.to_owned())],
            )
            .await
    }
}

/// Report endpoints; most accept a `callStatus` filter
pub struct ReportsApi<'a> {
    client: &'a dyn RequestClient,
}

impl<'a> ReportsApi<'a> {
    pub fn new(client: &'a dyn RequestClient) -> Self {
        Self { client }
    }

    async fn report(&self, path: String, params: &Params) -> Result<Value, RequestError> {
        self.client.get(&path, params).await
    }

    pub async fn card_metrics(&self, user_id: &str, params: &Params) -> Result<Value, RequestError> {
        self.report(format!("{PREFIX}/report/cardMetric/{user_id}/"), params)
            .await
    }

    pub async fn call_time_distribution(
        &self,
        user_id: &str,
        params: &Params,
    ) -> Result<Value, RequestError> {
        self.report(format!("{PREFIX}/report/callTimeDistribution/{user_id}/"), params)
            .await
    }

    pub async fn peak_call_hours(
        &self,
        user_id: &str,
        params: &Params,
    ) -> Result<Value, RequestError> {
        self.report(format!("{PREFIX}/report/peakCallHours/{user_id}/"), params)
            .await
    }

    /// Funnel chart rendered server-side as an HTML fragment
    pub async fn call_funnel_html(&self, params: &Params) -> Result<String, RequestError> {
        let value = self
            .report(format!("{PREFIX}/report/callFunnelChartHtml/"), params)
            .await?;
        Ok(match value {
            Value::String(html) => html,
            Value::Null => String::new(),
            other => other.to_string(),
        })
    }

    pub async fn call_to_lead_conversion(
        &self,
        user_id: &str,
        params: &Params,
    ) -> Result<Value, RequestError> {
        self.report(
            format!("{PREFIX}/report/callToLeadConversionRatio/{user_id}/"),
            params,
        )
        .await
    }

    pub async fn events_by_agent(
        &self,
        user_id: &str,
        params: &Params,
    ) -> Result<Value, RequestError> {
        self.report(format!("{PREFIX}/report/eventsByAgent/{user_id}"), params)
            .await
    }

    pub async fn agent_report(&self, user_id: &str, params: &Params) -> Result<Value, RequestError> {
        self.report(format!("{PREFIX}/report/agentReport/{user_id}/"), params)
            .await
    }

    pub async fn agent_score_card(
        &self,
        user_id: &str,
        params: &Params,
    ) -> Result<Value, RequestError> {
        self.report(format!("{PREFIX}/report/agentScoreCard/{user_id}/"), params)
            .await
    }

    pub async fn agent_followed_script(
        &self,
        user_id: &str,
        params: &Params,
    ) -> Result<Value, RequestError> {
        self.report(format!("{PREFIX}/report/agentFollowedScript/{user_id}"), params)
            .await
    }
}

/// Audio record endpoints
pub struct AudioApi<'a> {
    client: &'a dyn RequestClient,
}

impl<'a> AudioApi<'a> {
    pub fn new(client: &'a dyn RequestClient) -> Self {
        Self { client }
    }

    pub async fn monthly_summary(&self, user_id: &str, year: i32) -> Result<Value, RequestError> {
        self.client
            .get(
                &format!("{PREFIX}/monthlyData/getMonthWiseData/{user_id}/{year}/"),
                &[],
            )
            .await
    }

    pub async fn month_records(
        &self,
        user_id: &str,
        month: &str,
        year: i32,
        params: &Params,
    ) -> Result<Value, RequestError> {
        self.client
            .get(
                &format!("{PREFIX}/audio_records/get-audio-records/{user_id}/{month}/{year}"),
                params,
            )
            .await
    }

    pub async fn record_filter_options(&self) -> Result<Value, RequestError> {
        self.client
            .get(&format!("{PREFIX}/audio_records/get-audio-filter-options"), &[])
            .await
    }

    pub async fn audio_insights(&self, user_id: &str, audio_id: &str) -> Result<Value, RequestError> {
        self.client
            .get(
                &format!("{PREFIX}/audio_records/get-audio-insights/{user_id}/{audio_id}"),
                &[],
            )
            .await
    }

    /// Player source; the service answers with either a URL string or an object holding one
    pub async fn audio_player_url(
        &self,
        user_id: &str,
        audio_id: &str,
    ) -> Result<Value, RequestError> {
        self.client
            .get(
                &format!("{PREFIX}/media-player/audio_player/{user_id}/{audio_id}"),
                &[],
            )
            .await
    }
}

/// Unwrap list responses that are either a bare array or `{ "data": [...] }`
pub fn rows_of(value: Value) -> Vec<Value> {
    match value {
        Value::Array(rows) => rows,
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(rows)) => rows,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockClient;
    use serde_json::json;

    #[tokio::test]
    async fn test_endpoint_paths() {
        let client = MockClient::new()
            .respond("/v1.3/dashboard/getnAudiosByWeek/7/January/2024/", json!({"W1": 3}))
            .respond("/v1.3/report/callFunnelChartHtml/", json!("<svg/>"))
            .respond(
                "/v1.3/audio_records/get-audio-records/7/January/2024",
                json!({"data": [{"audioId": "a1"}]}),
            );

        let counts = DashboardApi::new(&client)
            .weekwise_counts("7", "January", 2024)
            .await
            .unwrap();
        assert_eq!(counts, json!({"W1": 3}));

        let params: Params = vec![("callStatus", "both".to_owned())];
        let html = ReportsApi::new(&client).call_funnel_html(&params).await.unwrap();
        assert_eq!(html, "<svg/>");
        assert_eq!(
            client.params_for("/v1.3/report/callFunnelChartHtml/"),
            Some(vec![("callStatus", "both".to_owned())])
        );

        let records = AudioApi::new(&client)
            .month_records("7", "January", 2024, &vec![("limit", "10000".to_owned())])
            .await
            .unwrap();
        assert_eq!(rows_of(records), vec![json!({"audioId": "a1"})]);

        let err = DashboardApi::new(&client).audio_kpi("7").await.unwrap_err();
        assert_eq!(err.status, Some(404));
    }

    #[tokio::test]
    async fn test_sentiment_endpoints() {
        let client = MockClient::new()
            .respond(
                "/v1.3/dashboard/sentiment-kpi-weekly/7/January/2024",
                json!([{"week": "W1", "positive": 4}]),
            )
            .respond("/v1.3/dashboard/netSentimentScore/7/", json!({"score": 42}));
        let api = DashboardApi::new(&client);

        let weekly = api.sentiment_weekly("7", "January", 2024).await.unwrap();
        assert_eq!(rows_of(weekly).len(), 1);

        let score = api.net_sentiment_score("7", "January").await.unwrap();
        assert_eq!(score["score"], 42);
        assert_eq!(
            client.params_for("/v1.3/dashboard/netSentimentScore/7/"),
            Some(vec![("month", "January".to_owned())])
        );
        assert_eq!(
            client.params_for("/v1.3/dashboard/sentiment-kpi-weekly/7/January/2024"),
            Some(Vec::new())
        );
    }

    #[test]
    fn test_rows_of() {
        assert_eq!(rows_of(json!([1, 2])), vec![json!(1), json!(2)]);
        assert_eq!(rows_of(json!({"data": [3]})), vec![json!(3)]);
        assert!(rows_of(json!({"data": {"x": 1}})).is_empty());
        assert!(rows_of(json!(null)).is_empty());
    }
}
