//! Grouped aggregation of campaign records
//!
//! Every entry point validates the schema first, then makes one sequential
//! pass over the records. Rates are always ratios of grouped sums.

use crate::schema::{validate_fields, REQUIRED_FIELDS};
use crate::{
    CampaignMetrics, CampaignPerformance, CampaignRecord, DailyPlatformMetrics, DataSummary,
    PlatformMetrics, RecordSet, SchemaError,
};
use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Divide two totals, yielding `None` for a zero denominator.
pub fn ratio(numerator: u64, denominator: u64) -> Option<f64> {
    if denominator == 0 {
        None
    } else {
        Some(numerator as f64 / denominator as f64)
    }
}

/// Group by campaign and rank by revenue, CTR and conversion rate.
///
/// Rankings use a stable sort over first-seen campaign order, so ties keep
/// the order in which campaigns first appear. Undefined ratios rank last.
pub fn aggregate_campaign_metrics(records: &RecordSet) -> Result<CampaignPerformance, SchemaError> {
    validate_fields(records.fields(), &REQUIRED_FIELDS)?;

    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<CampaignAccumulator> = Vec::new();

    for record in records.records() {
        let slot = *index.entry(record.campaign.as_str()).or_insert_with(|| {
            groups.push(CampaignAccumulator::new(&record.campaign));
            groups.len() - 1
        });
        groups[slot].add_record(record);
    }

    let metrics: Vec<CampaignMetrics> = groups
        .into_iter()
        .map(CampaignAccumulator::into_metrics)
        .collect();

    let mut by_revenue = metrics.clone();
    by_revenue.sort_by(|a, b| descending_total(a.total_revenue, b.total_revenue));

    let mut by_ctr = metrics.clone();
    by_ctr.sort_by(|a, b| descending_ratio(a.ctr, b.ctr));

    let mut by_conversion_rate = metrics;
    by_conversion_rate.sort_by(|a, b| descending_ratio(a.conversion_rate, b.conversion_rate));

    Ok(CampaignPerformance {
        by_revenue,
        by_ctr,
        by_conversion_rate,
    })
}

/// Group by platform: mean engagement and summed impressions, ordered by platform name.
pub fn aggregate_platform_metrics(records: &RecordSet) -> Result<Vec<PlatformMetrics>, SchemaError> {
    validate_fields(records.fields(), &REQUIRED_FIELDS)?;

    let mut platforms: BTreeMap<&str, PlatformAccumulator> = BTreeMap::new();
    for record in records.records() {
        platforms
            .entry(record.platform.as_str())
            .or_default()
            .add_record(record);
    }

    Ok(platforms
        .into_iter()
        .map(|(platform, acc)| acc.into_metrics(platform))
        .collect())
}

/// Group by (date, platform), ordered by date then platform.
pub fn aggregate_daily_platform_metrics(
    records: &RecordSet,
) -> Result<Vec<DailyPlatformMetrics>, SchemaError> {
    validate_fields(records.fields(), &REQUIRED_FIELDS)?;

    let mut days: BTreeMap<(NaiveDate, &str), DailyAccumulator> = BTreeMap::new();
    for record in records.records() {
        days.entry((record.date, record.platform.as_str()))
            .or_default()
            .add_record(record);
    }

    Ok(days
        .into_iter()
        .map(|((date, platform), acc)| acc.into_metrics(date, platform))
        .collect())
}

/// Totals across the whole collection.
pub fn calculate_summary(records: &RecordSet) -> Result<DataSummary, SchemaError> {
    validate_fields(records.fields(), &REQUIRED_FIELDS)?;

    let mut summary = DataSummary {
        total_records: records.len(),
        ..DataSummary::default()
    };
    let mut campaigns: BTreeSet<&str> = BTreeSet::new();
    let mut platforms: BTreeSet<&str> = BTreeSet::new();

    for record in records.records() {
        summary.total_revenue += record.revenue;
        summary.total_impressions = summary.total_impressions.saturating_add(record.impressions);
        summary.total_clicks = summary.total_clicks.saturating_add(record.clicks);
        summary.total_conversions = summary.total_conversions.saturating_add(record.conversions);
        campaigns.insert(&record.campaign);
        platforms.insert(&record.platform);

        summary.date_range_start = Some(
            summary
                .date_range_start
                .map_or(record.date, |start| start.min(record.date)),
        );
        summary.date_range_end = Some(
            summary
                .date_range_end
                .map_or(record.date, |end| end.max(record.date)),
        );
    }

    summary.ctr = ratio(summary.total_clicks, summary.total_impressions);
    summary.conversion_rate = ratio(summary.total_conversions, summary.total_clicks);
    summary.campaigns = campaigns.len();
    summary.platforms = platforms.into_iter().map(str::to_string).collect();

    Ok(summary)
}

// =============================================================================
// Internal helpers
// =============================================================================

/// Descending order with non-finite totals ranked after every finite one.
fn descending_total(a: f64, b: f64) -> Ordering {
    descending_ratio(Some(a).filter(|v| v.is_finite()), Some(b).filter(|v| v.is_finite()))
}

fn descending_ratio(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[derive(Default)]
struct Counts {
    impressions: u64,
    clicks: u64,
    conversions: u64,
}

impl Counts {
    fn add_record(&mut self, record: &CampaignRecord) {
        self.impressions = self.impressions.saturating_add(record.impressions);
        self.clicks = self.clicks.saturating_add(record.clicks);
        self.conversions = self.conversions.saturating_add(record.conversions);
    }

    fn ctr(&self) -> Option<f64> {
        ratio(self.clicks, self.impressions)
    }

    fn conversion_rate(&self) -> Option<f64> {
        ratio(self.conversions, self.clicks)
    }
}

struct CampaignAccumulator {
    campaign: String,
    revenue: f64,
    counts: Counts,
}

impl CampaignAccumulator {
    fn new(campaign: &str) -> Self {
        Self {
            campaign: campaign.to_string(),
            revenue: 0.0,
            counts: Counts::default(),
        }
    }

    fn add_record(&mut self, record: &CampaignRecord) {
        self.revenue += record.revenue;
        self.counts.add_record(record);
    }

    fn into_metrics(self) -> CampaignMetrics {
        CampaignMetrics {
            ctr: self.counts.ctr(),
            conversion_rate: self.counts.conversion_rate(),
            campaign: self.campaign,
            total_revenue: self.revenue,
            impressions: self.counts.impressions,
            clicks: self.counts.clicks,
            conversions: self.counts.conversions,
        }
    }
}

#[derive(Default)]
struct PlatformAccumulator {
    engagement_sum: f64,
    rows: u64,
    impressions: u64,
}

impl PlatformAccumulator {
    fn add_record(&mut self, record: &CampaignRecord) {
        self.engagement_sum += record.engagement_rate;
        self.rows += 1;
        self.impressions = self.impressions.saturating_add(record.impressions);
    }

    fn into_metrics(self, platform: &str) -> PlatformMetrics {
        PlatformMetrics {
            platform: platform.to_string(),
            mean_engagement_rate: self.engagement_sum / self.rows as f64,
            total_impressions: self.impressions,
        }
    }
}

#[derive(Default)]
struct DailyAccumulator {
    engagement_sum: f64,
    rows: u64,
    counts: Counts,
}

impl DailyAccumulator {
    fn add_record(&mut self, record: &CampaignRecord) {
        self.engagement_sum += record.engagement_rate;
        self.rows += 1;
        self.counts.add_record(record);
    }

    fn into_metrics(self, date: NaiveDate, platform: &str) -> DailyPlatformMetrics {
        DailyPlatformMetrics {
            date,
            platform: platform.to_string(),
            engagement_rate: self.engagement_sum / self.rows as f64,
            ctr: self.counts.ctr(),
            conversion_rate: self.counts.conversion_rate(),
            impressions: self.counts.impressions,
            clicks: self.counts.clicks,
            conversions: self.counts.conversions,
        }
    }
}
