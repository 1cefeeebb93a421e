//! Load, aggregate, render and report one analysis run.

use super::canvas::{load_font, FONT_ENV_VAR};
use super::charts::ChartRenderer;
use super::report::{self, ReportFormat};
use crate::console::Console;
use adscale_core::{
    aggregate_campaign_metrics, aggregate_daily_platform_metrics, aggregate_platform_metrics,
    calculate_summary, load_files, scan_directory, validate_fields, AnalysisConfig, AnalysisError,
    CampaignPerformance, CsvRecordSource, DailyPlatformMetrics, DataSummary, PlatformMetrics,
    RecordSet, RecordSource, RenderError, SyntheticRecordSource, REQUIRED_FIELDS,
};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct AnalysisOutcome {
    pub dry_run: bool,
    pub files_loaded: usize,
    pub skipped_rows: usize,
    pub summary: DataSummary,
    pub performance: CampaignPerformance,
    pub platforms: Vec<PlatformMetrics>,
    pub daily: Vec<DailyPlatformMetrics>,
    pub charts: Vec<PathBuf>,
    pub failed_charts: Vec<RenderError>,
}

/// Run the analysis and print the report.
///
/// Chart failures do not stop the report; they turn the run into an error
/// only after the report has been printed.
pub fn run(
    config: &AnalysisConfig,
    console: &Console,
    format: ReportFormat,
) -> Result<AnalysisOutcome, AnalysisError> {
    let mut outcome = analyze(config, console)?;
    report::print_report(&outcome, config.top_n, format)?;

    if outcome.failed_charts.is_empty() {
        Ok(outcome)
    } else {
        Err(std::mem::take(&mut outcome.failed_charts).into())
    }
}

pub fn analyze(config: &AnalysisConfig, console: &Console) -> Result<AnalysisOutcome, AnalysisError> {
    config.validate()?;

    if config.is_dry_run {
        generate_synthetic(config, console)?;
    }

    console.heading("Gathering campaign data");
    let (records, files_loaded) = load_records(config, console)?;
    console.step(&format!(
        "Loaded {} records from {} file(s)",
        records.len(),
        files_loaded
    ));
    let skipped_rows = records.skipped_rows();
    if skipped_rows > 0 {
        console.warn(&format!(
            "Dropped {} malformed row(s) with blank or invalid values",
            skipped_rows
        ));
    }

    console.heading("Analyzing performance");
    let performance = aggregate_campaign_metrics(&records)?;
    let platforms = aggregate_platform_metrics(&records)?;
    let daily = aggregate_daily_platform_metrics(&records)?;
    let summary = calculate_summary(&records)?;
    info!(
        "Aggregated {} campaigns, {} platforms, {} daily rows",
        performance.campaign_count(),
        platforms.len(),
        daily.len()
    );

    console.heading("Rendering charts");
    fs::create_dir_all(&config.output_folder)?;
    let (charts, failed_charts) = render_charts(config, console, &performance, &daily);

    Ok(AnalysisOutcome {
        dry_run: config.is_dry_run,
        files_loaded,
        skipped_rows,
        summary,
        performance,
        platforms,
        daily,
        charts,
        failed_charts,
    })
}

fn generate_synthetic(config: &AnalysisConfig, console: &Console) -> Result<(), AnalysisError> {
    let path = config.simulated_data_path();
    let source = SyntheticRecordSource::new(config.synthetic.clone());

    console.heading("Generating synthetic data");
    let spinner = console.spinner(format!(
        "Simulating {} campaigns across {} days...",
        config.synthetic.num_campaigns, config.synthetic.num_days
    ));
    let result = source.load(&path);
    spinner.finish();

    let set = result?;
    console.step(&format!("Wrote {} records to {}", set.len(), path.display()));
    Ok(())
}

/// Scan, load and unify every CSV file in the data folder.
///
/// Unreadable files are skipped with a warning; malformed rows inside a
/// readable file are dropped and counted. The unified set is schema
/// checked before its row count, so a deficient header is reported as such
/// even when the files carry no rows.
fn load_records(
    config: &AnalysisConfig,
    console: &Console,
) -> Result<(RecordSet, usize), AnalysisError> {
    let folder = config.data_folder();
    let files = scan_directory(folder);
    if files.is_empty() {
        return Err(AnalysisError::NoData(format!(
            "no CSV files found in {}",
            folder.display()
        )));
    }
    debug!("Found {} CSV files in {}", files.len(), folder.display());

    let source = CsvRecordSource;
    let spinner = console.spinner(format!("Reading {} file(s)...", files.len()));
    let results = load_files(&source, &files);
    spinner.finish();

    let mut sets = Vec::with_capacity(results.len());
    for (path, result) in results {
        match result {
            Ok(set) => sets.push(set),
            Err(err) => {
                warn!("Skipping {} ({} source): {}", path.display(), source.name(), err);
                console.warn(&format!("Skipped {}", err));
            }
        }
    }

    if sets.is_empty() {
        return Err(AnalysisError::NoData(format!(
            "none of the CSV files in {} could be read",
            folder.display()
        )));
    }

    let files_loaded = sets.len();
    let records = RecordSet::concat(sets);
    validate_fields(records.fields(), &REQUIRED_FIELDS)?;

    if records.is_empty() {
        return Err(AnalysisError::NoData(format!(
            "the CSV files in {} contain no records",
            folder.display()
        )));
    }

    Ok((records, files_loaded))
}

fn render_charts(
    config: &AnalysisConfig,
    console: &Console,
    performance: &CampaignPerformance,
    daily: &[DailyPlatformMetrics],
) -> (Vec<PathBuf>, Vec<RenderError>) {
    let renderer = ChartRenderer::new(&config.chart, load_font(config.chart.font_path.as_deref()));
    if !renderer.has_font() {
        warn!("No TrueType font found, charts will have no text");
        console.warn(&format!(
            "No font found; charts are rendered without text (set {} or font_path)",
            FONT_ENV_VAR
        ));
    }

    let attempts = [
        (
            config.revenue_chart_path(),
            renderer.revenue_performance(&performance.by_revenue, &config.revenue_chart_path()),
        ),
        (
            config.ctr_chart_path(),
            renderer.ctr_vs_conversion(performance, &config.ctr_chart_path()),
        ),
        (
            config.platform_chart_path(),
            renderer.platform_comparison(daily, &config.platform_chart_path()),
        ),
    ];

    let mut written = Vec::new();
    let mut failed = Vec::new();
    for (path, result) in attempts {
        match result {
            Ok(()) => {
                console.success(&format!("Saved {}", path.display()));
                written.push(path);
            }
            Err(err) => {
                warn!("{}", err);
                console.warn(&err.to_string());
                failed.push(err);
            }
        }
    }

    (written, failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use adscale_core::config::{ChartOptions, SyntheticOptions};
    use std::path::Path;
    use tempfile::TempDir;

    const HEADER: &str = "Date,Campaign,Platform,Impressions,Clicks,Conversions,Revenue,Engagement_Rate";

    fn small_config(data: &Path, output: &Path, dry_run: bool) -> AnalysisConfig {
        let mut config = AnalysisConfig::new(data, output, dry_run);
        config.synthetic = SyntheticOptions {
            num_campaigns: 3,
            num_days: 4,
            seed: Some(11),
        };
        config.chart = ChartOptions {
            width: 320,
            height: 200,
            font_path: None,
        };
        config
    }

    fn write_csv(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    fn alternating_csv() -> String {
        let mut content = format!("{HEADER}\n");
        for day in 1..=10 {
            if day % 2 == 1 {
                content.push_str(&format!("2023-01-{day:02},A,Facebook,1000,50,5,100,0.05\n"));
            } else {
                content.push_str(&format!("2023-01-{day:02},B,Instagram,2000,100,10,200,0.1\n"));
            }
        }
        content
    }

    #[test]
    fn test_dry_run_writes_data_and_charts() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("simulated_data");
        let output = dir.path().join("report");
        let config = small_config(&data, &output, true);

        let outcome = analyze(&config, &Console::silent()).unwrap();

        assert!(data.join("simulated_data.csv").is_file());
        assert_eq!(outcome.summary.total_records, 3 * 2 * 4);
        assert_eq!(outcome.performance.campaign_count(), 3);
        assert_eq!(outcome.platforms.len(), 2);
        assert_eq!(outcome.daily.len(), 2 * 4);
        assert!(outcome.failed_charts.is_empty());
        for name in ["revenue_performance.png", "ctr_vs_conversion.png", "platform_comparison.png"] {
            assert!(output.join(name).is_file(), "{name} missing");
        }
    }

    #[test]
    fn test_real_files_are_aggregated() {
        let dir = TempDir::new().unwrap();
        write_csv(dir.path(), "march.csv", &alternating_csv());
        let config = small_config(dir.path(), &dir.path().join("out"), false);

        let outcome = analyze(&config, &Console::silent()).unwrap();

        let top = outcome.performance.top_by_revenue(3);
        assert_eq!(top.len(), 2);
        assert_eq!((top[0].campaign.as_str(), top[0].total_revenue), ("B", 1000.0));
        assert_eq!((top[1].campaign.as_str(), top[1].total_revenue), ("A", 500.0));
        assert_eq!(outcome.files_loaded, 1);
    }

    #[test]
    fn test_missing_folder_is_config_error() {
        let dir = TempDir::new().unwrap();
        let config = small_config(&dir.path().join("nowhere"), dir.path(), false);

        let err = analyze(&config, &Console::silent()).unwrap_err();
        assert!(matches!(err, AnalysisError::Config(_)));
    }

    #[test]
    fn test_empty_folder_is_no_data() {
        let dir = TempDir::new().unwrap();
        let config = small_config(dir.path(), &dir.path().join("out"), false);

        let err = analyze(&config, &Console::silent()).unwrap_err();
        assert!(matches!(err, AnalysisError::NoData(_)));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_header_only_files_are_no_data() {
        let dir = TempDir::new().unwrap();
        write_csv(dir.path(), "empty_rows.csv", &format!("{HEADER}\n"));
        let config = small_config(dir.path(), &dir.path().join("out"), false);

        let err = analyze(&config, &Console::silent()).unwrap_err();
        assert!(matches!(err, AnalysisError::NoData(_)));
    }

    #[test]
    fn test_deficient_header_is_schema_error() {
        let dir = TempDir::new().unwrap();
        write_csv(dir.path(), "good.csv", &alternating_csv());
        write_csv(
            dir.path(),
            "partial.csv",
            "Date,Campaign,Platform,Impressions,Conversions,Engagement_Rate\n\
             2023-02-01,C,Facebook,10,1,0.1\n",
        );
        let config = small_config(dir.path(), &dir.path().join("out"), false);

        match analyze(&config, &Console::silent()) {
            Err(AnalysisError::Schema(err)) => {
                assert_eq!(err.missing, vec!["Clicks", "Revenue"]);
            }
            other => panic!("expected schema error, got {:?}", other.err()),
        }
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_unreadable_files_are_skipped() {
        let dir = TempDir::new().unwrap();
        write_csv(dir.path(), "a_good.csv", &alternating_csv());
        write_csv(dir.path(), "b_empty.csv", "");
        let config = small_config(dir.path(), &dir.path().join("out"), false);

        let outcome = analyze(&config, &Console::silent()).unwrap();
        assert_eq!(outcome.files_loaded, 1);
        assert_eq!(outcome.summary.total_records, 10);
        assert_eq!(outcome.skipped_rows, 0);
    }

    #[test]
    fn test_blank_cell_drops_row_not_file() {
        let dir = TempDir::new().unwrap();
        write_csv(dir.path(), "a_good.csv", &alternating_csv());
        write_csv(
            dir.path(),
            "b_gaps.csv",
            &format!(
                "{HEADER}\n2023-02-01,C,Facebook,1000,50,5,300,0.05\n\
                 2023-02-02,C,Facebook,1000,50,5,,0.05\n\
                 not-a-date,C,Facebook,1,1,1,1,0.1\n"
            ),
        );
        let config = small_config(dir.path(), &dir.path().join("out"), false);

        let outcome = analyze(&config, &Console::silent()).unwrap();
        assert_eq!(outcome.files_loaded, 2);
        assert_eq!(outcome.summary.total_records, 11);
        assert_eq!(outcome.skipped_rows, 2);
        let top = outcome.performance.top_by_revenue(1);
        assert_eq!((top[0].campaign.as_str(), top[0].total_revenue), ("B", 1000.0));
        assert!(outcome.performance.by_revenue.iter().any(|m| m.campaign == "C"));
    }

    #[test]
    fn test_all_files_unreadable_is_no_data() {
        let dir = TempDir::new().unwrap();
        write_csv(dir.path(), "empty.csv", "");
        write_csv(dir.path(), "broken.csv", &format!("{HEADER}\nx,A,Facebook,1,1,1,1,0.1\n"));
        let config = small_config(dir.path(), &dir.path().join("out"), false);

        let err = analyze(&config, &Console::silent()).unwrap_err();
        assert!(matches!(err, AnalysisError::NoData(_)));
    }

    #[test]
    fn test_chart_failure_keeps_other_charts_and_fails_run() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("data");
        let output = dir.path().join("out");
        fs::create_dir_all(&data).unwrap();
        write_csv(&data, "march.csv", &alternating_csv());
        // A directory where the revenue chart should go makes that save fail
        fs::create_dir_all(output.join("revenue_performance.png")).unwrap();
        let config = small_config(&data, &output, false);

        let outcome = analyze(&config, &Console::silent()).unwrap();
        assert_eq!(outcome.failed_charts.len(), 1);
        assert_eq!(outcome.failed_charts[0].chart, "revenue");
        assert_eq!(outcome.charts.len(), 2);
        assert!(output.join("ctr_vs_conversion.png").is_file());
        assert!(output.join("platform_comparison.png").is_file());

        let err = run(&config, &Console::silent(), ReportFormat::Json).unwrap_err();
        match err {
            AnalysisError::Render { failed } => assert_eq!(failed.len(), 1),
            other => panic!("expected render error, got {other:?}"),
        }
    }
}
