use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ── Fixture helpers ────────────────────────────────────────────────────────

const HEADER: &str = "Date,Campaign,Platform,Impressions,Clicks,Conversions,Revenue,Engagement_Rate";

/// Small charts and a tiny seeded synthetic dataset keep runs fast.
fn write_settings(dir: &Path) -> PathBuf {
    let path = dir.join("settings.toml");
    fs::write(
        &path,
        "num_campaigns = 5\nnum_days = 3\nseed = 7\nchart_width = 400\nchart_height = 240\n",
    )
    .unwrap();
    path
}

/// Two campaigns on alternating days:
///   A on Facebook, 5 rows of revenue 100
///   B on Instagram, 5 rows of revenue 200
fn write_campaign_csv(dir: &Path) {
    let mut content = format!("{HEADER}\n");
    for day in 1..=10 {
        if day % 2 == 1 {
            content.push_str(&format!("2023-01-{day:02},A,Facebook,1000,50,5,100,0.05\n"));
        } else {
            content.push_str(&format!("2023-01-{day:02},B,Instagram,2000,100,10,200,0.1\n"));
        }
    }
    fs::write(dir.join("campaigns.csv"), content).unwrap();
}

fn adscale(tmp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("adscale").unwrap();
    cmd.current_dir(tmp.path())
        .env("ADSCALE_CONFIG", tmp.path().join("no-settings.toml"))
        .env_remove("RUST_LOG")
        .arg("--no-spinner");
    cmd
}

// ── Help and version ───────────────────────────────────────────────────────

#[test]
fn test_help() {
    let tmp = TempDir::new().unwrap();
    adscale(&tmp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--data-dir"))
        .stdout(predicate::str::contains("generate"));
}

#[test]
fn test_version() {
    let tmp = TempDir::new().unwrap();
    adscale(&tmp)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

// ── Analysis runs ──────────────────────────────────────────────────────────

#[test]
fn test_dry_run_writes_charts_and_report() {
    let tmp = TempDir::new().unwrap();
    let settings = write_settings(tmp.path());

    adscale(&tmp)
        .args(["--dry-run", "--output-dir", "report", "--config"])
        .arg(&settings)
        .assert()
        .success()
        .stdout(predicate::str::contains("Top 3 Campaigns by Revenue"));

    assert!(tmp.path().join("simulated_data/simulated_data.csv").is_file());
    for name in ["revenue_performance.png", "ctr_vs_conversion.png", "platform_comparison.png"] {
        assert!(tmp.path().join("report").join(name).is_file(), "{name} missing");
    }
}

#[test]
fn test_json_report() {
    let tmp = TempDir::new().unwrap();
    let settings = write_settings(tmp.path());
    let data = tmp.path().join("data");
    fs::create_dir_all(&data).unwrap();
    write_campaign_csv(&data);

    let output = adscale(&tmp)
        .args(["--json", "--data-dir", "data", "--output-dir", "out", "--config"])
        .arg(&settings)
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["filesLoaded"], 1);
    assert_eq!(report["skippedRows"], 0);
    assert_eq!(report["dryRun"], false);
    assert_eq!(report["summary"]["totalRecords"], 10);
    assert_eq!(report["campaigns"]["byRevenue"][0]["campaign"], "B");
    assert_eq!(report["campaigns"]["byRevenue"][0]["totalRevenue"], 1000.0);
    assert_eq!(report["platforms"].as_array().unwrap().len(), 2);
    assert_eq!(report["charts"].as_array().unwrap().len(), 3);
    assert!(report["failedCharts"].as_array().unwrap().is_empty());
}

#[test]
fn test_blank_cells_are_reported_not_fatal() {
    let tmp = TempDir::new().unwrap();
    let settings = write_settings(tmp.path());
    let data = tmp.path().join("data");
    fs::create_dir_all(&data).unwrap();
    write_campaign_csv(&data);
    fs::write(
        data.join("gaps.csv"),
        format!(
            "{HEADER}\n2023-02-01,C,Facebook,1000,50,5,300,0.05\n\
             2023-02-02,C,Facebook,1000,50,5,,0.05\n"
        ),
    )
    .unwrap();

    let output = adscale(&tmp)
        .args(["--json", "--data-dir", "data", "--output-dir", "out", "--config"])
        .arg(&settings)
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["filesLoaded"], 2);
    assert_eq!(report["skippedRows"], 1);
    assert_eq!(report["summary"]["totalRecords"], 11);
}

#[test]
fn test_top_flag_limits_table() {
    let tmp = TempDir::new().unwrap();
    let settings = write_settings(tmp.path());
    let data = tmp.path().join("data");
    fs::create_dir_all(&data).unwrap();
    write_campaign_csv(&data);

    adscale(&tmp)
        .args(["--data-dir", "data", "--output-dir", "out", "--top", "1", "--config"])
        .arg(&settings)
        .assert()
        .success()
        .stdout(predicate::str::contains("Top 1 Campaigns by Revenue"))
        .stdout(predicate::str::contains("$1,000.00"));
}

#[test]
fn test_folders_read_from_stdin() {
    let tmp = TempDir::new().unwrap();
    let settings = write_settings(tmp.path());
    let data = tmp.path().join("data");
    fs::create_dir_all(&data).unwrap();
    write_campaign_csv(&data);

    adscale(&tmp)
        .arg("--config")
        .arg(&settings)
        .write_stdin("data\nout\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("data folder"));

    assert!(tmp.path().join("out/revenue_performance.png").is_file());
}

// ── Failures ───────────────────────────────────────────────────────────────

#[test]
fn test_missing_data_dir_fails() {
    let tmp = TempDir::new().unwrap();
    adscale(&tmp)
        .args(["--data-dir", "nowhere", "--output-dir", "out"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("not a directory"));
}

#[test]
fn test_empty_data_dir_fails() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("data")).unwrap();

    adscale(&tmp)
        .args(["--data-dir", "data", "--output-dir", "out"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("no data"));
}

#[test]
fn test_schema_mismatch_fails() {
    let tmp = TempDir::new().unwrap();
    let data = tmp.path().join("data");
    fs::create_dir_all(&data).unwrap();
    fs::write(
        data.join("partial.csv"),
        "Date,Campaign,Platform,Impressions,Conversions,Engagement_Rate\n\
         2023-01-01,A,Facebook,1000,5,0.05\n",
    )
    .unwrap();

    adscale(&tmp)
        .args(["--data-dir", "data", "--output-dir", "out"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("missing required columns: Clicks, Revenue"));

    assert!(!tmp.path().join("out").exists());
}

#[test]
fn test_no_flags_and_no_input_fails() {
    let tmp = TempDir::new().unwrap();
    adscale(&tmp).write_stdin("").assert().failure().code(1);
}

// ── Generate subcommand ────────────────────────────────────────────────────

#[test]
fn test_generate_writes_dataset() {
    let tmp = TempDir::new().unwrap();

    adscale(&tmp)
        .args(["generate", "--output", "sample/campaigns.csv"])
        .args(["--campaigns", "2", "--days", "3", "--seed", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("12 records"));

    let content = fs::read_to_string(tmp.path().join("sample/campaigns.csv")).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 13);
    assert_eq!(lines[0], HEADER);
}

#[test]
fn test_generate_rejects_zero_days() {
    let tmp = TempDir::new().unwrap();

    adscale(&tmp)
        .args(["generate", "--days", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least one"));
}

#[test]
fn test_generate_rejects_oversized_dataset() {
    let tmp = TempDir::new().unwrap();

    adscale(&tmp)
        .args(["generate", "--campaigns", "18446744073709551615", "--days", "2"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("synthetic limit"));

    assert!(!tmp.path().join("simulated_data").exists());
}
