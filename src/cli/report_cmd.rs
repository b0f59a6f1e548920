use std::path::Path;
use std::time::Duration;

use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region};
use chrono::NaiveDate;
use colored::Colorize;

use crate::cli::output::OutputOptions;
use crate::core::error::PipelineError;
use crate::core::fetcher::CostFetcher;
use crate::core::retry::RetryPolicy;
use crate::core::uploader::Uploader;
use crate::core::writer::ReportWriter;

const OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Resolve the query window from the CLI flags. With no flags the
/// report covers yesterday; a lone --start-date means that single day.
pub fn resolve_window(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<(NaiveDate, NaiveDate), String> {
    match (start, end) {
        (None, None) => {
            let yesterday = today
                .pred_opt()
                .ok_or_else(|| format!("no day before {today}"))?;
            Ok((yesterday, yesterday))
        }
        (Some(s), None) => Ok((s, s)),
        (None, Some(_)) => Err("--end-date requires --start-date".to_string()),
        (Some(s), Some(e)) if s <= e => Ok((s, e)),
        (Some(s), Some(e)) => Err(format!("start date {s} is after end date {e}")),
    }
}

async fn load_aws_config(region: Option<String>) -> aws_config::SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .timeout_config(
            TimeoutConfig::builder()
                .operation_attempt_timeout(OPERATION_TIMEOUT)
                .build(),
        )
        // Retries are handled by our own policy; stacking the SDK's on
        // top would multiply the attempt count.
        .retry_config(RetryConfig::disabled());
    if let Some(region) = region {
        loader = loader.region(Region::new(region));
    }
    loader.load().await
}

/// Run the fetch -> write -> upload pipeline for one date range.
pub async fn run(
    start: NaiveDate,
    end: NaiveDate,
    output_dir: &Path,
    bucket: String,
    prefix: String,
    region: Option<String>,
    opts: &OutputOptions,
) -> Result<(), PipelineError> {
    let retry = RetryPolicy::default();
    let shared = load_aws_config(region).await;

    opts.note(&format!("Querying Cost Explorer for {start}..{end}"));
    let fetcher = CostFetcher::from_shared_config(&shared, retry);
    let report = fetcher.fetch(start, end).await?;
    opts.note(&format!("Fetched {} cost records", report.records.len()));

    let written = ReportWriter::new(output_dir).write(&report)?;
    opts.note(&format!(
        "Wrote {} and {}",
        written.json_path.display(),
        written.csv_path.display()
    ));

    let uploader = Uploader::new(
        aws_sdk_s3::Client::new(&shared),
        bucket,
        prefix,
        retry,
    );
    let keys = uploader.upload_report(&report, &written.paths()).await?;

    print_summary(&report, uploader.bucket(), &keys, opts);
    Ok(())
}

fn print_summary(
    report: &crate::core::models::report::CostReport,
    bucket: &str,
    keys: &[String],
    opts: &OutputOptions,
) {
    let window = if report.start_date == report.end_date {
        report.start_date.to_string()
    } else {
        format!("{} to {}", report.start_date, report.end_date)
    };
    let location = keys
        .first()
        .and_then(|k| k.rsplit_once('/'))
        .map(|(dir, _)| format!("s3://{}/{}/", bucket, dir))
        .unwrap_or_else(|| format!("s3://{}/", bucket));

    let line = format!("Uploaded cost report for {} to {}", window, location);
    if opts.use_color {
        println!("{}", line.green());
    } else {
        println!("{}", line);
    }
    for (currency, total) in report.totals_by_currency() {
        println!("  Total: {} {}", total.round_dp(2), currency);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn no_flags_default_to_yesterday() {
        let (start, end) = resolve_window(None, None, date("2024-01-16")).unwrap();
        assert_eq!(start, date("2024-01-15"));
        assert_eq!(end, date("2024-01-15"));
    }

    #[test]
    fn lone_start_date_is_a_single_day() {
        let (start, end) =
            resolve_window(Some(date("2024-01-10")), None, date("2024-01-16")).unwrap();
        assert_eq!(start, date("2024-01-10"));
        assert_eq!(end, date("2024-01-10"));
    }

    #[test]
    fn explicit_range_is_kept() {
        let (start, end) = resolve_window(
            Some(date("2024-01-01")),
            Some(date("2024-01-31")),
            date("2024-02-10"),
        )
        .unwrap();
        assert_eq!(start, date("2024-01-01"));
        assert_eq!(end, date("2024-01-31"));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let err = resolve_window(
            Some(date("2024-01-31")),
            Some(date("2024-01-01")),
            date("2024-02-10"),
        )
        .unwrap_err();
        assert!(err.contains("after end date"));
    }

    #[test]
    fn lone_end_date_is_rejected() {
        let err =
            resolve_window(None, Some(date("2024-01-15")), date("2024-01-16")).unwrap_err();
        assert!(err.contains("--start-date"));
    }
}
