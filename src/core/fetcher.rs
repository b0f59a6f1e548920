use aws_sdk_costexplorer::config::Region;
use aws_sdk_costexplorer::types::{
    DateInterval, Granularity, GroupDefinition, GroupDefinitionType, ResultByTime,
};
use aws_sdk_costexplorer::Client;
use aws_smithy_types::error::display::DisplayErrorContext;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::core::error::FetchError;
use crate::core::models::report::{CostRecord, CostReport};
use crate::core::retry::{is_transient_sdk_error, RetryPolicy};

const METRIC: &str = "UnblendedCost";

// Cost Explorer is only served out of us-east-1, whatever region the
// ambient credentials resolve to.
const COST_EXPLORER_REGION: &str = "us-east-1";

/// Queries Cost Explorer for daily unblended cost grouped by service.
pub struct CostFetcher {
    client: Client,
    retry: RetryPolicy,
}

impl CostFetcher {
    pub fn new(client: Client, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    pub fn from_shared_config(shared: &aws_config::SdkConfig, retry: RetryPolicy) -> Self {
        let config = aws_sdk_costexplorer::config::Builder::from(shared)
            .region(Region::new(COST_EXPLORER_REGION))
            .build();
        Self::new(Client::from_conf(config), retry)
    }

    /// Fetch cost-by-service for the inclusive range `[start, end]` and
    /// normalize the paged response into a report.
    pub async fn fetch(&self, start: NaiveDate, end: NaiveDate) -> Result<CostReport, FetchError> {
        let interval = query_interval(start, end)?;
        let mut results: Vec<ResultByTime> = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let token = page_token.clone();
            let output = self
                .retry
                .run(is_transient_sdk_error, || {
                    self.client
                        .get_cost_and_usage()
                        .time_period(interval.clone())
                        .granularity(Granularity::Daily)
                        .metrics(METRIC)
                        .group_by(
                            GroupDefinition::builder()
                                .r#type(GroupDefinitionType::Dimension)
                                .key("SERVICE")
                                .build(),
                        )
                        .set_next_page_token(token.clone())
                        .send()
                })
                .await
                .map_err(|err| FetchError::Api(format!("{}", DisplayErrorContext(&err))))?;

            results.extend_from_slice(output.results_by_time());
            match output.next_page_token() {
                Some(next) => page_token = Some(next.to_string()),
                None => break,
            }
        }

        let records = normalize(&results)?;
        Ok(CostReport::new(start, end, records)?)
    }
}

/// Cost Explorer's end date is exclusive; the CLI range is inclusive.
fn query_interval(start: NaiveDate, end: NaiveDate) -> Result<DateInterval, FetchError> {
    let exclusive_end = end
        .succ_opt()
        .ok_or_else(|| FetchError::Api(format!("date range end {end} cannot be advanced")))?;
    DateInterval::builder()
        .start(start.to_string())
        .end(exclusive_end.to_string())
        .build()
        .map_err(|err| FetchError::Api(err.to_string()))
}

/// Flatten paged `ResultsByTime` into one record per (date, service,
/// currency). A service billed in two currencies yields two records.
fn normalize(results: &[ResultByTime]) -> Result<Vec<CostRecord>, FetchError> {
    let mut records = Vec::new();
    for period in results {
        let start = period
            .time_period()
            .map(|p| p.start())
            .ok_or_else(|| FetchError::MalformedResponse("result period missing".into()))?;
        let date: NaiveDate = start.parse().map_err(|_| {
            FetchError::MalformedResponse(format!("unparseable period start: {start}"))
        })?;

        for group in period.groups() {
            let service = group.keys().first().ok_or_else(|| {
                FetchError::MalformedResponse(format!("group without service key on {date}"))
            })?;
            let metric = group
                .metrics()
                .and_then(|m| m.get(METRIC))
                .ok_or_else(|| {
                    FetchError::MalformedResponse(format!(
                        "missing {METRIC} metric for {service} on {date}"
                    ))
                })?;
            let raw_amount = metric.amount().ok_or_else(|| {
                FetchError::MalformedResponse(format!("missing amount for {service} on {date}"))
            })?;
            let amount: Decimal = raw_amount.parse().map_err(|_| {
                FetchError::MalformedResponse(format!(
                    "unparseable amount {raw_amount:?} for {service} on {date}"
                ))
            })?;
            let currency = metric.unit().unwrap_or("USD").to_string();

            records.push(CostRecord {
                date,
                service_name: service.clone(),
                amount,
                currency,
            });
        }
    }
    Ok(records)
}
