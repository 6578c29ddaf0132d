//! Site analytics summary
//!
//! Three fixed reports are run against an [`AnalyticsProvider`] and shaped
//! into the `{basic, popular, trending}` summary served by `/analytics`.
//! The production provider is the GA4 Data API; without credentials a
//! disabled provider answers every report with no rows.

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::error;

use crate::config::AnalyticsConfig;

const GA4_ENDPOINT: &str = "https://analyticsdata.googleapis.com/v1beta";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricOrder {
    pub metric_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderBy {
    pub metric: MetricOrder,
    pub desc: bool,
}

/// Body of a `runReport` call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub date_ranges: Vec<DateRange>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dimensions: Vec<Field>,
    pub metrics: Vec<Field>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub order_bys: Vec<OrderBy>,
}

impl ReportRequest {
    fn new(start_date: &str, dimensions: &[&str], metrics: &[&str]) -> Self {
        let fields = |names: &[&str]| -> Vec<Field> {
            names
                .iter()
                .map(|name| Field {
                    name: name.to_string(),
                })
                .collect()
        };

        Self {
            date_ranges: vec![DateRange {
                start_date: start_date.to_string(),
                end_date: "today".to_string(),
            }],
            dimensions: fields(dimensions),
            metrics: fields(metrics),
            order_bys: Vec::new(),
        }
    }

    fn descending_by(mut self, metric: &str) -> Self {
        self.order_bys.push(OrderBy {
            metric: MetricOrder {
                metric_name: metric.to_string(),
            },
            desc: true,
        });
        self
    }

    /// Site totals over the last week
    pub fn basic() -> Self {
        Self::new(
            "7daysAgo",
            &[],
            &["screenPageViews", "totalUsers", "newUsers", "engagementRate"],
        )
    }

    /// Most viewed pages over the last month
    pub fn popular() -> Self {
        Self::new("30daysAgo", &["pagePath", "pageTitle"], &["screenPageViews"])
            .descending_by("screenPageViews")
    }

    /// Most viewed pages since yesterday
    pub fn trending() -> Self {
        Self::new("1daysAgo", &["pagePath", "pageTitle"], &["screenPageViews"])
            .descending_by("screenPageViews")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReportValue {
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    #[serde(default)]
    pub dimension_values: Vec<ReportValue>,
    #[serde(default)]
    pub metric_values: Vec<ReportValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReportResponse {
    #[serde(default)]
    pub rows: Vec<ReportRow>,
}

/// Source of analytics reports
#[async_trait]
pub trait AnalyticsProvider: Send + Sync {
    async fn run_report(&self, request: &ReportRequest) -> anyhow::Result<ReportResponse>;
}

/// Google Analytics 4 Data API
pub struct Ga4Provider {
    client: reqwest::Client,
    property_id: String,
    access_token: String,
}

impl Ga4Provider {
    pub fn new(property_id: String, access_token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            property_id,
            access_token,
        }
    }
}

#[async_trait]
impl AnalyticsProvider for Ga4Provider {
    async fn run_report(&self, request: &ReportRequest) -> anyhow::Result<ReportResponse> {
        let url = format!(
            "{}/properties/{}:runReport",
            GA4_ENDPOINT, self.property_id
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(request)
            .send()
            .await
            .context("Failed to reach the analytics API")?
            .error_for_status()
            .context("Analytics API refused the report")?;

        response
            .json::<ReportResponse>()
            .await
            .context("Failed to decode analytics report")
    }
}

/// Provider used when no analytics property is configured
pub struct DisabledProvider;

#[async_trait]
impl AnalyticsProvider for DisabledProvider {
    async fn run_report(&self, _request: &ReportRequest) -> anyhow::Result<ReportResponse> {
        Ok(ReportResponse::default())
    }
}

/// Pick the provider for the configuration
pub fn provider(config: &AnalyticsConfig) -> Arc<dyn AnalyticsProvider> {
    match (&config.property_id, &config.access_token) {
        (Some(property_id), Some(access_token)) => Arc::new(Ga4Provider::new(
            property_id.clone(),
            access_token.clone(),
        )),
        _ => Arc::new(DisabledProvider),
    }
}

/// Totals of the `basic` report
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_views: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_visitors: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_visitors: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engagement_rate: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageStats {
    pub page_path: String,
    pub page_title: String,
    pub screen_page_views: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub basic: BasicStats,
    pub popular: Vec<PageStats>,
    pub trending: Vec<PageStats>,
}

fn value_at(values: &[ReportValue], idx: usize) -> Option<String> {
    values.get(idx).map(|v| v.value.clone())
}

fn basic_stats(response: &ReportResponse) -> BasicStats {
    match response.rows.first() {
        Some(row) => BasicStats {
            page_views: value_at(&row.metric_values, 0),
            total_visitors: value_at(&row.metric_values, 1),
            new_visitors: value_at(&row.metric_values, 2),
            engagement_rate: value_at(&row.metric_values, 3),
        },
        None => BasicStats::default(),
    }
}

/// Root stays `/`; any other path loses one trailing slash
fn normalize_path(path: &str) -> String {
    if path == "/" {
        return path.to_string();
    }
    path.strip_suffix('/').unwrap_or(path).to_string()
}

/// One entry per page path, keeping the first (most viewed) row
fn page_stats(response: &ReportResponse) -> Vec<PageStats> {
    let mut seen = HashSet::new();

    response
        .rows
        .iter()
        .filter(|row| !row.dimension_values.is_empty() && !row.metric_values.is_empty())
        .filter_map(|row| {
            let page_path = normalize_path(&value_at(&row.dimension_values, 0)?);
            if !seen.insert(page_path.clone()) {
                return None;
            }
            Some(PageStats {
                page_path,
                page_title: value_at(&row.dimension_values, 1).unwrap_or_default(),
                screen_page_views: value_at(&row.metric_values, 0)?,
            })
        })
        .collect()
}

async fn run(provider: &dyn AnalyticsProvider, alias: &str, request: ReportRequest) -> ReportResponse {
    match provider.run_report(&request).await {
        Ok(response) => response,
        Err(e) => {
            error!("Analytics report {} failed: {:#}", alias, e);
            ReportResponse::default()
        }
    }
}

/// Run the three reports and shape them for the client
pub async fn summarize(provider: &dyn AnalyticsProvider) -> Summary {
    let (basic, popular, trending) = tokio::join!(
        run(provider, "basic", ReportRequest::basic()),
        run(provider, "popular", ReportRequest::popular()),
        run(provider, "trending", ReportRequest::trending()),
    );

    Summary {
        basic: basic_stats(&basic),
        popular: page_stats(&popular),
        trending: page_stats(&trending),
    }
}
