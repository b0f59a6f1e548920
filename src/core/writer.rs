use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::WriteError;
use crate::core::models::report::CostReport;

/// Local paths of the two artifacts produced for one report.
#[derive(Debug, Clone)]
pub struct WrittenReport {
    pub json_path: PathBuf,
    pub csv_path: PathBuf,
}

impl WrittenReport {
    pub fn paths(&self) -> [&Path; 2] {
        [&self.json_path, &self.csv_path]
    }
}

/// Serializes a report to JSON and CSV in a target directory.
///
/// Output is deterministic: the report's records are already sorted and
/// the run timestamp is not part of the artifacts, so writing the same
/// report twice produces byte-identical files.
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn write(&self, report: &CostReport) -> Result<WrittenReport, WriteError> {
        fs::create_dir_all(&self.output_dir)?;
        let stem = report.file_stem();
        let json_path = self.output_dir.join(format!("{stem}.json"));
        let csv_path = self.output_dir.join(format!("{stem}.csv"));

        fs::write(&json_path, render_json(report)?)?;
        fs::write(&csv_path, render_csv(report)?)?;

        Ok(WrittenReport {
            json_path,
            csv_path,
        })
    }
}

fn render_json(report: &CostReport) -> Result<String, WriteError> {
    Ok(serde_json::to_string(&report.records)?)
}

fn render_csv(report: &CostReport) -> Result<Vec<u8>, WriteError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["date", "service_name", "amount", "currency"])?;
    for record in &report.records {
        writer.write_record([
            record.date.to_string(),
            record.service_name.clone(),
            record.amount.to_string(),
            record.currency.clone(),
        ])?;
    }
    writer
        .into_inner()
        .map_err(|err| WriteError::Io(err.into_error()))
}
