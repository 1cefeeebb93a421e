//! Synthetic campaign data for demonstrations and dry runs

use super::{write_records, RecordSource};
use crate::config::{SyntheticOptions, MAX_SYNTHETIC_RECORDS};
use crate::{CampaignRecord, RecordSet, SourceError};
use chrono::{Days, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;
use tracing::info;

pub const PLATFORMS: [&str; 2] = ["Facebook", "Instagram"];

const ADJECTIVES: [&str; 10] = [
    "Bold",
    "Smart",
    "Vibrant",
    "Sleek",
    "Dynamic",
    "Innovative",
    "Stellar",
    "Radiant",
    "Agile",
    "Zen",
];

const NOUNS: [&str; 10] = [
    "Vision", "Quest", "Journey", "Horizon", "Leap", "Spark", "Wave", "Pulse", "Orbit", "Nexus",
];

fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Names of the form `"<Adjective> <Noun> <NNN>"`, numbered from 001.
pub fn generate_campaign_names<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Vec<String> {
    (1..=count)
        .map(|i| {
            let adjective = ADJECTIVES[rng.gen_range(0..ADJECTIVES.len())];
            let noun = NOUNS[rng.gen_range(0..NOUNS.len())];
            format!("{adjective} {noun} {i:03}")
        })
        .collect()
}

/// One record per campaign, platform and day, in that nesting order.
pub fn generate_records<R: Rng + ?Sized>(
    rng: &mut R,
    num_campaigns: usize,
    num_days: usize,
) -> Vec<CampaignRecord> {
    let start = start_date();
    let campaigns = generate_campaign_names(rng, num_campaigns);
    let capacity = num_campaigns
        .checked_mul(PLATFORMS.len())
        .and_then(|n| n.checked_mul(num_days))
        .map_or(0, |n| n.min(MAX_SYNTHETIC_RECORDS));
    let mut records = Vec::with_capacity(capacity);

    for campaign in &campaigns {
        for platform in PLATFORMS {
            for day in 0..num_days as u64 {
                let date = start.checked_add_days(Days::new(day)).unwrap_or(start);
                records.push(CampaignRecord {
                    date,
                    campaign: campaign.clone(),
                    platform: platform.to_string(),
                    engagement_rate: rng.gen_range(0.01..=0.15),
                    impressions: rng.gen_range(10_000..=1_000_000),
                    clicks: rng.gen_range(100..=10_000),
                    conversions: rng.gen_range(10..=1_000),
                    revenue: rng.gen_range(1_000.0..=10_000.0),
                });
            }
        }
    }

    records
}

/// Generates a dataset, writes it to the requested location, and returns it.
#[derive(Debug, Clone, Default)]
pub struct SyntheticRecordSource {
    options: SyntheticOptions,
}

impl SyntheticRecordSource {
    pub fn new(options: SyntheticOptions) -> Self {
        Self { options }
    }

    /// Build the dataset in memory without touching the filesystem.
    pub fn generate(&self) -> RecordSet {
        let mut rng = match self.options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        RecordSet::new(generate_records(
            &mut rng,
            self.options.num_campaigns,
            self.options.num_days,
        ))
    }
}

impl RecordSource for SyntheticRecordSource {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    fn load(&self, location: &Path) -> Result<RecordSet, SourceError> {
        info!(
            "Generating synthetic data for {} campaigns across {} days",
            self.options.num_campaigns, self.options.num_days
        );
        let set = self.generate();
        write_records(&set, location)?;
        info!("Synthetic data written to {}", location.display());
        Ok(set)
    }
}
