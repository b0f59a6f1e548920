use std::path::Path;

use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use aws_smithy_types::error::display::DisplayErrorContext;
use chrono::{Datelike, NaiveDate};

use crate::core::error::UploadError;
use crate::core::models::report::CostReport;
use crate::core::retry::RetryPolicy;

/// Uploads report artifacts to S3 under a date-partitioned key prefix.
///
/// Each artifact is a single `PutObject`; S3's atomic put means a failed
/// upload leaves no partial object behind.
pub struct Uploader {
    client: Client,
    bucket: String,
    prefix: String,
    retry: RetryPolicy,
}

impl Uploader {
    pub fn new(client: Client, bucket: String, prefix: String, retry: RetryPolicy) -> Self {
        Self {
            client,
            bucket,
            prefix,
            retry,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Upload the given local files, keyed by the report's start date.
    /// Returns the object keys in upload order.
    pub async fn upload_report(
        &self,
        report: &CostReport,
        files: &[&Path],
    ) -> Result<Vec<String>, UploadError> {
        let mut keys = Vec::with_capacity(files.len());
        for path in files {
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| {
                    UploadError::Api(format!("artifact path has no file name: {}", path.display()))
                })?;
            let key = object_key(&self.prefix, report.start_date, file_name);
            self.put_file(path, &key).await?;
            keys.push(key);
        }
        Ok(keys)
    }

    async fn put_file(&self, path: &Path, key: &str) -> Result<(), UploadError> {
        self.retry
            .run(is_transient, || async {
                // ByteStream::from_path re-reads the file, so each retry
                // attempt sends the full body from the start.
                let body = ByteStream::from_path(path)
                    .await
                    .map_err(|err| RetryAborted::Io(std::io::Error::other(err)))?;
                self.client
                    .put_object()
                    .bucket(&self.bucket)
                    .key(key)
                    .body(body)
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(RetryAborted::Sdk)
            })
            .await
            .map_err(|err| match err {
                RetryAborted::Io(io) => UploadError::Io(io),
                RetryAborted::Sdk(sdk) => {
                    UploadError::Api(format!("{}", DisplayErrorContext(&sdk)))
                }
            })
    }
}

enum RetryAborted {
    Io(std::io::Error),
    Sdk(
        aws_smithy_runtime_api::client::result::SdkError<
            aws_sdk_s3::operation::put_object::PutObjectError,
            aws_smithy_runtime_api::client::orchestrator::HttpResponse,
        >,
    ),
}

fn is_transient(err: &RetryAborted) -> bool {
    match err {
        RetryAborted::Io(_) => false,
        RetryAborted::Sdk(sdk) => crate::core::retry::is_transient_sdk_error(sdk),
    }
}

/// `<prefix>/<YYYY>/<MM>/<DD>/<filename>`, zero-padded month and day.
fn object_key(prefix: &str, date: NaiveDate, file_name: &str) -> String {
    format!(
        "{}/{:04}/{:02}/{:02}/{}",
        prefix.trim_matches('/'),
        date.year(),
        date.month(),
        date.day(),
        file_name
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn key_is_date_partitioned() {
        let key = object_key(
            "reports",
            date("2024-01-15"),
            "cost_report_2024-01-15_2024-01-15.json",
        );
        assert_eq!(
            key,
            "reports/2024/01/15/cost_report_2024-01-15_2024-01-15.json"
        );
    }

    #[test]
    fn key_zero_pads_month_and_day() {
        let key = object_key("reports", date("2024-03-05"), "r.csv");
        assert_eq!(key, "reports/2024/03/05/r.csv");
    }

    #[test]
    fn key_trims_prefix_slashes() {
        let key = object_key("/aws-costs/", date("2024-12-31"), "r.json");
        assert_eq!(key, "aws-costs/2024/12/31/r.json");
    }
}
