#![deny(clippy::all)]

mod aggregator;
pub mod config;
mod error;
pub mod scanner;
pub mod schema;
pub mod sources;

pub use aggregator::*;
pub use config::{AnalysisConfig, ChartOptions, SyntheticOptions};
pub use error::{AnalysisError, RenderError, SchemaError, SourceError};
pub use scanner::scan_directory;
pub use schema::{validate_fields, REQUIRED_FIELDS};
pub use sources::{
    load_files, write_records, CsvRecordSource, RecordSource, SyntheticRecordSource,
};

use chrono::NaiveDate;
use std::collections::HashSet;

pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// One row of campaign performance data.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CampaignRecord {
    #[serde(rename = "Date", with = "sources::date_format")]
    pub date: NaiveDate,
    #[serde(rename = "Campaign")]
    pub campaign: String,
    #[serde(rename = "Platform")]
    pub platform: String,
    #[serde(rename = "Impressions")]
    pub impressions: u64,
    #[serde(rename = "Clicks")]
    pub clicks: u64,
    #[serde(rename = "Conversions")]
    pub conversions: u64,
    #[serde(rename = "Revenue", deserialize_with = "sources::finite_float::deserialize")]
    pub revenue: f64,
    #[serde(
        rename = "Engagement_Rate",
        deserialize_with = "sources::finite_float::deserialize"
    )]
    pub engagement_rate: f64,
}

/// A collection of campaign records together with the field names its source carried.
///
/// Sets loaded from a file keep the file's header, which may lack required
/// fields; aggregation rejects such sets. Sets built from typed records carry
/// every required field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    fields: Vec<String>,
    records: Vec<CampaignRecord>,
    skipped_rows: usize,
}

impl RecordSet {
    pub fn new(records: Vec<CampaignRecord>) -> Self {
        Self {
            fields: REQUIRED_FIELDS.iter().map(|f| f.to_string()).collect(),
            records,
            skipped_rows: 0,
        }
    }

    pub fn with_fields(fields: Vec<String>, records: Vec<CampaignRecord>) -> Self {
        Self {
            fields,
            records,
            skipped_rows: 0,
        }
    }

    /// Record how many source rows were dropped while decoding.
    pub fn with_skipped_rows(mut self, skipped_rows: usize) -> Self {
        self.skipped_rows = skipped_rows;
        self
    }

    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn records(&self) -> &[CampaignRecord] {
        &self.records
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f == name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Concatenate sets in order. A field survives only if every input carries it.
    pub fn concat(sets: impl IntoIterator<Item = RecordSet>) -> RecordSet {
        let mut sets = sets.into_iter();
        let Some(mut unified) = sets.next() else {
            return RecordSet::default();
        };

        for set in sets {
            let carried: HashSet<&str> = set.fields.iter().map(String::as_str).collect();
            unified.fields.retain(|f| carried.contains(f.as_str()));
            unified.records.extend(set.records);
            unified.skipped_rows = unified.skipped_rows.saturating_add(set.skipped_rows);
        }

        unified
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignMetrics {
    pub campaign: String,
    pub total_revenue: f64,
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: u64,
    /// `None` when the campaign has no impressions.
    pub ctr: Option<f64>,
    /// `None` when the campaign has no clicks.
    pub conversion_rate: Option<f64>,
}

/// Per-campaign metrics ranked three ways, each descending by its own metric.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignPerformance {
    pub by_revenue: Vec<CampaignMetrics>,
    pub by_ctr: Vec<CampaignMetrics>,
    pub by_conversion_rate: Vec<CampaignMetrics>,
}

impl CampaignPerformance {
    pub fn top_by_revenue(&self, n: usize) -> &[CampaignMetrics] {
        &self.by_revenue[..n.min(self.by_revenue.len())]
    }

    pub fn campaign_count(&self) -> usize {
        self.by_revenue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_revenue.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformMetrics {
    pub platform: String,
    pub mean_engagement_rate: f64,
    pub total_impressions: u64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyPlatformMetrics {
    pub date: NaiveDate,
    pub platform: String,
    pub engagement_rate: f64,
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: u64,
    pub ctr: Option<f64>,
    pub conversion_rate: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSummary {
    pub total_records: usize,
    pub total_revenue: f64,
    pub total_impressions: u64,
    pub total_clicks: u64,
    pub total_conversions: u64,
    pub ctr: Option<f64>,
    pub conversion_rate: Option<f64>,
    pub campaigns: usize,
    pub platforms: Vec<String>,
    pub date_range_start: Option<NaiveDate>,
    pub date_range_end: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(campaign: &str) -> CampaignRecord {
        CampaignRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            campaign: campaign.to_string(),
            platform: "Facebook".to_string(),
            impressions: 1000,
            clicks: 50,
            conversions: 5,
            revenue: 100.0,
            engagement_rate: 0.05,
        }
    }

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_record_set_new_carries_required_fields() {
        let set = RecordSet::new(vec![record("A")]);
        assert_eq!(set.fields().len(), REQUIRED_FIELDS.len());
        assert!(REQUIRED_FIELDS.iter().all(|f| set.has_field(f)));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_concat_empty_input() {
        let set = RecordSet::concat(Vec::new());
        assert!(set.is_empty());
        assert!(set.fields().is_empty());
    }

    #[test]
    fn test_concat_preserves_row_order() {
        let set = RecordSet::concat(vec![
            RecordSet::new(vec![record("A"), record("B")]),
            RecordSet::new(vec![record("C")]),
        ]);

        let campaigns: Vec<&str> = set.records().iter().map(|r| r.campaign.as_str()).collect();
        assert_eq!(campaigns, vec!["A", "B", "C"]);
        assert_eq!(set.fields().len(), REQUIRED_FIELDS.len());
    }

    #[test]
    fn test_concat_keeps_only_shared_fields() {
        let deficient = RecordSet::with_fields(fields(&["Date", "Campaign", "Extra"]), Vec::new());
        let set = RecordSet::concat(vec![RecordSet::new(vec![record("A")]), deficient]);

        assert_eq!(set.fields(), &fields(&["Date", "Campaign"])[..]);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_concat_sums_skipped_rows() {
        let set = RecordSet::concat(vec![
            RecordSet::new(vec![record("A")]).with_skipped_rows(2),
            RecordSet::new(Vec::new()),
            RecordSet::new(vec![record("B")]).with_skipped_rows(1),
        ]);

        assert_eq!(set.skipped_rows(), 3);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_top_by_revenue_clamps() {
        let performance = CampaignPerformance::default();
        assert!(performance.top_by_revenue(3).is_empty());
        assert!(performance.is_empty());
    }
}
