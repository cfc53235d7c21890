//! Meta Graph API client.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tokio::sync::RwLock;

use crate::config::schema::MetaApiConfig;
use crate::connector::{AdsConnector, UpstreamError};
use crate::gateway::operation::Operation;

const GRAPH_BASE: &str = "https://graph.facebook.com/v19.0";
const REQUEST_TIMEOUT_SECS: u64 = 30;

const CAMPAIGN_FIELDS: &[&str] = &[
    "id",
    "name",
    "objective",
    "status",
    "created_time",
    "updated_time",
    "daily_budget",
    "lifetime_budget",
];

const AD_SET_FIELDS: &[&str] = &[
    "id",
    "name",
    "campaign_id",
    "status",
    "targeting",
    "daily_budget",
    "lifetime_budget",
    "start_time",
    "end_time",
];

const AD_FIELDS: &[&str] = &["id", "name", "adset_id", "campaign_id", "status", "created_time"];

const DEFAULT_INSIGHT_FIELDS: &[&str] = &["impressions", "clicks", "spend", "cpc", "ctr", "reach"];

#[derive(Clone, Debug)]
struct Session {
    access_token: String,
    account_id: String,
}

/// Connector for the Meta Ads (Facebook Ads) Graph API.
///
/// Holds the verified session established by `connect`; other operations
/// connect lazily from configured credentials when no session exists yet.
pub struct MetaAdsConnector {
    http: reqwest::Client,
    config: MetaApiConfig,
    session: RwLock<Option<Session>>,
}

impl MetaAdsConnector {
    pub fn new(config: MetaApiConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("failed to construct HTTP client");
        Self {
            http,
            config,
            session: RwLock::new(None),
        }
    }

    /// Establish a session, with request credentials taking precedence
    /// over configured ones. Verifies account access before storing it.
    async fn connect(&self, credentials: &Map<String, Value>) -> Result<Session, UpstreamError> {
        let pick = |key: &str, fallback: &str| -> String {
            credentials
                .get(key)
                .and_then(Value::as_str)
                .filter(|v| !v.is_empty())
                .unwrap_or(fallback)
                .to_string()
        };

        let access_token = pick("access_token", &self.config.access_token);
        let account_id = pick("account_id", &self.config.account_id);
        if access_token.is_empty() || account_id.is_empty() {
            return Err(UpstreamError::NotConnected(
                "access_token and account_id credentials are required".to_string(),
            ));
        }

        let session = Session {
            access_token,
            account_id,
        };
        let url = format!("{GRAPH_BASE}/act_{}", session.account_id);
        self.graph_get(
            &url,
            &[
                ("fields".to_string(), "name,account_status".to_string()),
                ("access_token".to_string(), session.access_token.clone()),
            ],
        )
        .await?;

        tracing::info!(account_id = %session.account_id, "Connected to Meta Ads account");
        *self.session.write().await = Some(session.clone());
        Ok(session)
    }

    async fn ensure_session(&self) -> Result<Session, UpstreamError> {
        if let Some(session) = self.session.read().await.as_ref() {
            return Ok(session.clone());
        }
        self.connect(&Map::new()).await
    }

    async fn graph_get(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> Result<Value, UpstreamError> {
        let response = self.http.get(url).query(query).send().await?;
        Self::read_graph_response(response).await
    }

    async fn graph_post(
        &self,
        url: &str,
        form: &[(String, String)],
    ) -> Result<Value, UpstreamError> {
        let response = self.http.post(url).form(form).send().await?;
        Self::read_graph_response(response).await
    }

    async fn read_graph_response(response: reqwest::Response) -> Result<Value, UpstreamError> {
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        if !status.is_success() {
            let message = body
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("unknown Graph API error")
                .to_string();
            return Err(UpstreamError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(body)
    }

    fn listing_query(session: &Session, fields: &[&str], params: &Map<String, Value>) -> Vec<(String, String)> {
        let mut query = vec![
            ("fields".to_string(), fields.join(",")),
            ("access_token".to_string(), session.access_token.clone()),
        ];
        if let Some(status) = params.get("status") {
            // The API expects a JSON array, e.g. effective_status=["ACTIVE"].
            query.push((
                "effective_status".to_string(),
                serde_json::to_string(status).unwrap_or_default(),
            ));
        }
        if let Some(limit) = params.get("limit").and_then(Value::as_u64) {
            query.push(("limit".to_string(), limit.to_string()));
        }
        query
    }

    async fn get_campaigns(
        &self,
        session: &Session,
        params: &Map<String, Value>,
    ) -> Result<Value, UpstreamError> {
        let url = format!("{GRAPH_BASE}/act_{}/campaigns", session.account_id);
        let body = self
            .graph_get(&url, &Self::listing_query(session, CAMPAIGN_FIELDS, params))
            .await?;
        let campaigns = body.get("data").cloned().unwrap_or_else(|| json!([]));
        let count = campaigns.as_array().map_or(0, Vec::len);
        Ok(json!({"campaigns": campaigns, "count": count}))
    }

    async fn get_ad_sets(
        &self,
        session: &Session,
        params: &Map<String, Value>,
    ) -> Result<Value, UpstreamError> {
        let campaign_id = params.get("campaign_id").and_then(Value::as_str);
        let url = match campaign_id {
            Some(id) => format!("{GRAPH_BASE}/{id}/adsets"),
            None => format!("{GRAPH_BASE}/act_{}/adsets", session.account_id),
        };
        let body = self
            .graph_get(&url, &Self::listing_query(session, AD_SET_FIELDS, params))
            .await?;
        let ad_sets = body.get("data").cloned().unwrap_or_else(|| json!([]));
        let count = ad_sets.as_array().map_or(0, Vec::len);
        Ok(json!({
            "ad_sets": ad_sets,
            "count": count,
            "campaign_id": campaign_id,
        }))
    }

    async fn get_ads(
        &self,
        session: &Session,
        params: &Map<String, Value>,
    ) -> Result<Value, UpstreamError> {
        let url = format!("{GRAPH_BASE}/act_{}/ads", session.account_id);
        let body = self
            .graph_get(&url, &Self::listing_query(session, AD_FIELDS, params))
            .await?;
        let ads = body.get("data").cloned().unwrap_or_else(|| json!([]));
        let count = ads.as_array().map_or(0, Vec::len);
        Ok(json!({"ads": ads, "count": count}))
    }

    async fn create_campaign(
        &self,
        session: &Session,
        params: &Map<String, Value>,
    ) -> Result<Value, UpstreamError> {
        let text = |key: &str| -> String {
            params
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let special_ad_categories = params
            .get("special_ad_categories")
            .map(|v| serde_json::to_string(v).unwrap_or_default())
            .unwrap_or_else(|| "[]".to_string());

        let url = format!("{GRAPH_BASE}/act_{}/campaigns", session.account_id);
        let form = vec![
            ("name".to_string(), text("name")),
            ("objective".to_string(), text("objective")),
            (
                "status".to_string(),
                params
                    .get("status")
                    .map(|s| {
                        crate::gateway::operation::normalize_status(s)
                            .into_iter()
                            .next()
                            .unwrap_or_default()
                    })
                    .unwrap_or_default(),
            ),
            ("special_ad_categories".to_string(), special_ad_categories),
            ("access_token".to_string(), session.access_token.clone()),
        ];
        let created = self.graph_post(&url, &form).await?;

        Ok(json!({
            "campaign": created,
            "success": true,
            "message": "campaign created",
        }))
    }

    async fn update_campaign(
        &self,
        session: &Session,
        params: &Map<String, Value>,
    ) -> Result<Value, UpstreamError> {
        let campaign_id = params
            .get("campaign_id")
            .and_then(Value::as_str)
            .unwrap_or_default();

        let mut form = vec![("access_token".to_string(), session.access_token.clone())];
        for field in ["name", "objective", "daily_budget", "lifetime_budget"] {
            if let Some(value) = params.get(field).and_then(Value::as_str) {
                form.push((field.to_string(), value.to_string()));
            }
        }
        if let Some(status) = params.get("status") {
            if let Some(normalized) =
                crate::gateway::operation::normalize_status(status).into_iter().next()
            {
                form.push(("status".to_string(), normalized));
            }
        }

        let url = format!("{GRAPH_BASE}/{campaign_id}");
        let result = self.graph_post(&url, &form).await?;

        Ok(json!({
            "campaign": {"id": campaign_id},
            "success": result.get("success").and_then(Value::as_bool).unwrap_or(true),
            "message": "campaign updated",
        }))
    }

    async fn get_insights(
        &self,
        session: &Session,
        params: &Map<String, Value>,
    ) -> Result<Value, UpstreamError> {
        let object_id = params
            .get("object_id")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let fields = params
            .get("fields")
            .and_then(Value::as_array)
            .map(|fields| {
                fields
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .unwrap_or_else(|| DEFAULT_INSIGHT_FIELDS.join(","));

        let mut query = vec![
            ("fields".to_string(), fields),
            ("access_token".to_string(), session.access_token.clone()),
        ];
        if let Some(date_preset) = params.get("date_preset").and_then(Value::as_str) {
            query.push(("date_preset".to_string(), date_preset.to_string()));
        }

        let url = format!("{GRAPH_BASE}/{object_id}/insights");
        let body = self.graph_get(&url, &query).await?;
        let insights = body.get("data").cloned().unwrap_or_else(|| json!([]));
        let count = insights.as_array().map_or(0, Vec::len);
        Ok(json!({
            "insights": insights,
            "count": count,
            "object_id": object_id,
            "object_type": params.get("object_type"),
        }))
    }
}

#[async_trait]
impl AdsConnector for MetaAdsConnector {
    async fn execute(
        &self,
        operation: Operation,
        params: &Map<String, Value>,
    ) -> Result<Value, UpstreamError> {
        match operation {
            Operation::Connect => {
                let credentials = params
                    .get("credentials")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();
                // Mirrors the connect contract: a failed connection is a
                // negative payload, not a gateway error.
                match self.connect(&credentials).await {
                    Ok(session) => Ok(json!({
                        "connected": true,
                        "account_id": session.account_id,
                        "message": "connected to Meta Ads account",
                    })),
                    Err(e) => Ok(json!({
                        "connected": false,
                        "message": e.to_string(),
                    })),
                }
            }
            Operation::Disconnect => {
                *self.session.write().await = None;
                Ok(json!({"disconnected": true, "message": "disconnected"}))
            }
            _ => {
                let session = self.ensure_session().await?;
                match operation {
                    Operation::GetCampaigns => self.get_campaigns(&session, params).await,
                    Operation::GetAdSets => self.get_ad_sets(&session, params).await,
                    Operation::GetAds => self.get_ads(&session, params).await,
                    Operation::CreateCampaign => self.create_campaign(&session, params).await,
                    Operation::UpdateCampaign => self.update_campaign(&session, params).await,
                    Operation::GetInsights => self.get_insights(&session, params).await,
                    Operation::Connect | Operation::Disconnect => unreachable!(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_fails_without_credentials() {
        let connector = MetaAdsConnector::new(MetaApiConfig::default());
        let err = connector.ensure_session().await.unwrap_err();
        assert!(matches!(err, UpstreamError::NotConnected(_)));
    }

    #[tokio::test]
    async fn connect_operation_reports_failure_as_payload() {
        let connector = MetaAdsConnector::new(MetaApiConfig::default());
        let payload = connector
            .execute(Operation::Connect, &Map::new())
            .await
            .unwrap();
        assert_eq!(payload.get("connected"), Some(&Value::Bool(false)));
    }

    #[test]
    fn listing_query_serializes_status_and_limit() {
        let session = Session {
            access_token: "tok".to_string(),
            account_id: "123".to_string(),
        };
        let params = match json!({"status": ["ACTIVE"], "limit": 25}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let query = MetaAdsConnector::listing_query(&session, CAMPAIGN_FIELDS, &params);
        assert!(query.contains(&("effective_status".to_string(), "[\"ACTIVE\"]".to_string())));
        assert!(query.contains(&("limit".to_string(), "25".to_string())));
    }
}
