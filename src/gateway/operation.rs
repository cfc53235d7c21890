//! The Meta Ads operation table and request parameter validation.

use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Operations the gateway proxies to the Ads API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Connect,
    Disconnect,
    GetCampaigns,
    GetAdSets,
    GetAds,
    CreateCampaign,
    UpdateCampaign,
    GetInsights,
}

impl Operation {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "connect" => Some(Operation::Connect),
            "disconnect" => Some(Operation::Disconnect),
            "get_campaigns" => Some(Operation::GetCampaigns),
            "get_ad_sets" => Some(Operation::GetAdSets),
            "get_ads" => Some(Operation::GetAds),
            "create_campaign" => Some(Operation::CreateCampaign),
            "update_campaign" => Some(Operation::UpdateCampaign),
            "get_insights" => Some(Operation::GetInsights),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Operation::Connect => "connect",
            Operation::Disconnect => "disconnect",
            Operation::GetCampaigns => "get_campaigns",
            Operation::GetAdSets => "get_ad_sets",
            Operation::GetAds => "get_ads",
            Operation::CreateCampaign => "create_campaign",
            Operation::UpdateCampaign => "update_campaign",
            Operation::GetInsights => "get_insights",
        }
    }

    /// Read operations are idempotent and cacheable; everything else must
    /// never populate or query the cache.
    pub fn is_read(self) -> bool {
        matches!(
            self,
            Operation::GetCampaigns
                | Operation::GetAdSets
                | Operation::GetAds
                | Operation::GetInsights
        )
    }

    /// Parameters that must be present for the operation to be dispatched.
    pub fn required_params(self) -> &'static [&'static str] {
        match self {
            Operation::CreateCampaign => &["name", "objective", "status"],
            Operation::UpdateCampaign => &["campaign_id"],
            Operation::GetInsights => &["object_id", "object_type"],
            _ => &[],
        }
    }

    /// Cap on the `limit` parameter for listing operations.
    pub fn result_limit(self) -> Option<u64> {
        match self {
            Operation::GetCampaigns => Some(100),
            Operation::GetAdSets => Some(200),
            Operation::GetAds => Some(300),
            Operation::GetInsights => Some(50),
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Insight fields callers may request; anything else is dropped.
pub const ALLOWED_INSIGHT_FIELDS: &[&str] = &[
    "impressions",
    "clicks",
    "spend",
    "cpc",
    "ctr",
    "reach",
    "actions",
    "cost_per_action_type",
    "conversions",
    "conversion_values",
    "unique_clicks",
    "frequency",
    "unique_impressions",
    "engagement_rate_ranking",
    "quality_ranking",
];

/// Request validation failures. All surface as 400 with distinct codes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("missing required parameter '{field}' for operation {operation}")]
    MissingParameter {
        operation: &'static str,
        field: &'static str,
    },
}

/// Check required parameters and normalize the map in place: the `limit`
/// cap is clamped, insight fields are filtered to the allow-list, and
/// status values are mapped to the API's uppercase vocabulary. The
/// normalized map is what gets fingerprinted for caching.
pub fn validate_params(
    operation: Operation,
    params: &mut Map<String, Value>,
) -> Result<(), ValidationError> {
    for &field in operation.required_params() {
        if !params.contains_key(field) {
            return Err(ValidationError::MissingParameter {
                operation: operation.name(),
                field,
            });
        }
    }

    if let Some(cap) = operation.result_limit() {
        if let Some(limit) = params.get("limit").and_then(Value::as_u64) {
            if limit > cap {
                params.insert("limit".to_string(), Value::from(cap));
            }
        }
    }

    if operation == Operation::GetInsights {
        if let Some(requested) = params.get("fields").and_then(Value::as_array) {
            let allowed: Vec<Value> = requested
                .iter()
                .filter(|f| {
                    f.as_str()
                        .is_some_and(|name| ALLOWED_INSIGHT_FIELDS.contains(&name))
                })
                .cloned()
                .collect();
            if allowed.is_empty() {
                // Fall back to the connector's default field set.
                params.remove("fields");
            } else {
                params.insert("fields".to_string(), Value::Array(allowed));
            }
        }
    }

    if let Some(status) = params.get("status") {
        let normalized = normalize_status(status);
        if !normalized.is_empty() {
            params.insert(
                "status".to_string(),
                Value::Array(normalized.into_iter().map(Value::String).collect()),
            );
        }
    }

    Ok(())
}

/// Map status names to the Ads API vocabulary: known lowercase aliases
/// become their canonical form, anything else is uppercased as-is.
pub fn normalize_status(raw: &Value) -> Vec<String> {
    let values: Vec<&str> = match raw {
        Value::String(s) => vec![s.as_str()],
        Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    };

    values
        .into_iter()
        .map(|status| match status.to_ascii_lowercase().as_str() {
            "active" => "ACTIVE".to_string(),
            "paused" => "PAUSED".to_string(),
            "deleted" => "DELETED".to_string(),
            "archived" => "ARCHIVED".to_string(),
            _ => status.to_ascii_uppercase(),
        })
        .collect()
}
