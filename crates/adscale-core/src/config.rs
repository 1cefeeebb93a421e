//! Run configuration for one analysis pass.

use crate::sources::PLATFORMS;
use crate::AnalysisError;
use std::path::{Path, PathBuf};

pub const DEFAULT_TOP_N: usize = 3;
pub const DEFAULT_NUM_CAMPAIGNS: usize = 100;
pub const DEFAULT_NUM_DAYS: usize = 30;
pub const DEFAULT_CHART_WIDTH: u32 = 2000;
pub const DEFAULT_CHART_HEIGHT: u32 = 1000;

/// Upper bound on generated rows; larger requests are rejected up front.
pub const MAX_SYNTHETIC_RECORDS: usize = 10_000_000;

/// Folder a dry run writes into when the operator names none.
pub const SIMULATED_DATA_DIR: &str = "simulated_data";
pub const SIMULATED_DATA_FILE: &str = "simulated_data.csv";

pub const REVENUE_CHART_FILE: &str = "revenue_performance.png";
pub const CTR_CHART_FILE: &str = "ctr_vs_conversion.png";
pub const PLATFORM_CHART_FILE: &str = "platform_comparison.png";

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticOptions {
    pub num_campaigns: usize,
    pub num_days: usize,
    /// Fixed seed for reproducible datasets; entropy when `None`.
    pub seed: Option<u64>,
}

impl SyntheticOptions {
    /// Rows a dataset of this shape holds, or `None` on overflow.
    pub fn record_count(&self) -> Option<usize> {
        self.num_campaigns
            .checked_mul(PLATFORMS.len())?
            .checked_mul(self.num_days)
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.num_campaigns == 0 || self.num_days == 0 {
            return Err(AnalysisError::Config(
                "synthetic data needs at least one campaign and one day".to_string(),
            ));
        }
        match self.record_count() {
            Some(count) if count <= MAX_SYNTHETIC_RECORDS => Ok(()),
            _ => Err(AnalysisError::Config(format!(
                "{} campaigns over {} days exceeds the synthetic limit of {} records",
                self.num_campaigns, self.num_days, MAX_SYNTHETIC_RECORDS
            ))),
        }
    }
}

impl Default for SyntheticOptions {
    fn default() -> Self {
        Self {
            num_campaigns: DEFAULT_NUM_CAMPAIGNS,
            num_days: DEFAULT_NUM_DAYS,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartOptions {
    pub width: u32,
    pub height: u32,
    pub font_path: Option<PathBuf>,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            width: DEFAULT_CHART_WIDTH,
            height: DEFAULT_CHART_HEIGHT,
            font_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub data_folder: PathBuf,
    pub output_folder: PathBuf,
    pub is_dry_run: bool,
    pub top_n: usize,
    pub synthetic: SyntheticOptions,
    pub chart: ChartOptions,
}

impl AnalysisConfig {
    pub fn new(
        data_folder: impl Into<PathBuf>,
        output_folder: impl Into<PathBuf>,
        is_dry_run: bool,
    ) -> Self {
        Self {
            data_folder: data_folder.into(),
            output_folder: output_folder.into(),
            is_dry_run,
            top_n: DEFAULT_TOP_N,
            synthetic: SyntheticOptions::default(),
            chart: ChartOptions::default(),
        }
    }

    /// Reject settings that would make the run meaningless before any data is touched.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.output_folder.as_os_str().is_empty() {
            return Err(AnalysisError::Config(
                "output folder must not be empty".to_string(),
            ));
        }
        if self.top_n == 0 {
            return Err(AnalysisError::Config(
                "top-N must be at least 1".to_string(),
            ));
        }
        if self.chart.width == 0 || self.chart.height == 0 {
            return Err(AnalysisError::Config(format!(
                "chart size {}x{} is invalid",
                self.chart.width, self.chart.height
            )));
        }
        if self.is_dry_run {
            self.synthetic.validate()?;
        } else if !self.data_folder.is_dir() {
            return Err(AnalysisError::Config(format!(
                "data folder {} is not a directory",
                self.data_folder.display()
            )));
        }
        Ok(())
    }

    pub fn simulated_data_path(&self) -> PathBuf {
        self.data_folder.join(SIMULATED_DATA_FILE)
    }

    pub fn revenue_chart_path(&self) -> PathBuf {
        self.output_folder.join(REVENUE_CHART_FILE)
    }

    pub fn ctr_chart_path(&self) -> PathBuf {
        self.output_folder.join(CTR_CHART_FILE)
    }

    pub fn platform_chart_path(&self) -> PathBuf {
        self.output_folder.join(PLATFORM_CHART_FILE)
    }

    pub fn data_folder(&self) -> &Path {
        &self.data_folder
    }
}
