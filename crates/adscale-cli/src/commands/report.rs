use super::analyze::AnalysisOutcome;
use adscale_core::{CampaignMetrics, PlatformMetrics};
use colored::Colorize;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};
use serde::Serialize;
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Table,
    Json,
}

pub fn print_report(outcome: &AnalysisOutcome, top_n: usize, format: ReportFormat) -> io::Result<()> {
    match format {
        ReportFormat::Json => {
            println!("{}", render_json(outcome)?);
        }
        ReportFormat::Table => {
            let top = outcome.performance.top_by_revenue(top_n);
            println!(
                "\n  {}",
                format!("Top {} Campaigns by Revenue", top.len()).cyan().bold()
            );
            println!("{}", top_campaigns_table(top));

            println!("\n  {}", "Platforms".cyan().bold());
            println!("{}", platform_table(&outcome.platforms));

            let summary = &outcome.summary;
            println!(
                "\n  {} | Revenue: {} | CTR: {} | Conversion: {}",
                format!(
                    "{} records, {} campaigns",
                    format_number(summary.total_records as u64),
                    format_number(summary.campaigns as u64)
                ),
                format_currency(summary.total_revenue),
                format_ratio(summary.ctr),
                format_ratio(summary.conversion_rate)
            );
            if outcome.skipped_rows > 0 {
                println!(
                    "{}",
                    format!(
                        "  {} malformed row(s) were left out",
                        format_number(outcome.skipped_rows as u64)
                    )
                    .yellow()
                );
            }
            if let (Some(start), Some(end)) = (summary.date_range_start, summary.date_range_end) {
                println!(
                    "{}",
                    format!("  Period: {} to {}", start, end).bright_black()
                );
            }
        }
    }
    Ok(())
}

pub fn top_campaigns_table(campaigns: &[CampaignMetrics]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["#", "Campaign", "Revenue", "Impressions", "Clicks", "CTR", "Conv. Rate"]);

    for (rank, entry) in campaigns.iter().enumerate() {
        table.add_row(vec![
            Cell::new(rank + 1),
            Cell::new(&entry.campaign),
            Cell::new(format_currency(entry.total_revenue)).set_alignment(CellAlignment::Right),
            Cell::new(format_compact(entry.impressions as f64)).set_alignment(CellAlignment::Right),
            Cell::new(format_compact(entry.clicks as f64)).set_alignment(CellAlignment::Right),
            Cell::new(format_ratio(entry.ctr)).set_alignment(CellAlignment::Right),
            Cell::new(format_ratio(entry.conversion_rate)).set_alignment(CellAlignment::Right),
        ]);
    }

    table
}

pub fn platform_table(platforms: &[PlatformMetrics]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Platform", "Mean Engagement", "Impressions"]);

    for entry in platforms {
        table.add_row(vec![
            Cell::new(&entry.platform),
            Cell::new(format_ratio(Some(entry.mean_engagement_rate)))
                .set_alignment(CellAlignment::Right),
            Cell::new(format_number(entry.total_impressions)).set_alignment(CellAlignment::Right),
        ]);
    }

    table
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonReport<'a> {
    version: String,
    generated_at: String,
    files_loaded: usize,
    skipped_rows: usize,
    dry_run: bool,
    summary: &'a adscale_core::DataSummary,
    campaigns: &'a adscale_core::CampaignPerformance,
    platforms: &'a [PlatformMetrics],
    daily: &'a [adscale_core::DailyPlatformMetrics],
    charts: Vec<String>,
    failed_charts: Vec<String>,
}

pub fn render_json(outcome: &AnalysisOutcome) -> serde_json::Result<String> {
    let report = JsonReport {
        version: adscale_core::version(),
        generated_at: chrono::Utc::now().to_rfc3339(),
        files_loaded: outcome.files_loaded,
        skipped_rows: outcome.skipped_rows,
        dry_run: outcome.dry_run,
        summary: &outcome.summary,
        campaigns: &outcome.performance,
        platforms: &outcome.platforms,
        daily: &outcome.daily,
        charts: outcome
            .charts
            .iter()
            .map(|p| p.to_string_lossy().to_string())
            .collect(),
        failed_charts: outcome.failed_charts.iter().map(|e| e.to_string()).collect(),
    };
    serde_json::to_string_pretty(&report)
}

/// `$12,345.67`
pub fn format_currency(n: f64) -> String {
    let cents = (n.abs() * 100.0).round() as u64;
    let sign = if n < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}${}.{:02}", format_number(cents / 100), cents % 100)
}

/// Whole dollars, used for chart value labels.
pub fn format_currency_whole(n: f64) -> String {
    let dollars = n.abs().round() as u64;
    let sign = if n < 0.0 && dollars > 0 { "-" } else { "" };
    format!("{sign}${}", format_number(dollars))
}

pub fn format_compact(n: f64) -> String {
    if n >= 1_000_000_000.0 {
        format!("{:.1}B", n / 1_000_000_000.0)
    } else if n >= 1_000_000.0 {
        format!("{:.1}M", n / 1_000_000.0)
    } else if n >= 1_000.0 {
        format!("{:.1}K", n / 1_000.0)
    } else if n.fract() == 0.0 {
        format!("{n:.0}")
    } else {
        format!("{n:.2}")
    }
}

/// A rate as a percentage, or `-` when undefined.
pub fn format_ratio(ratio: Option<f64>) -> String {
    match ratio {
        Some(r) => format!("{:.2}%", r * 100.0),
        None => "-".to_string(),
    }
}

pub fn format_number(value: u64) -> String {
    let digits = value.to_string();
    let mut result = String::with_capacity(digits.len() + digits.len() / 3);

    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }

    result
}
