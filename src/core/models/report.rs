use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InvalidReport {
    #[error("record date {date} outside queried range {start}..={end}")]
    DateOutOfRange {
        date: NaiveDate,
        start: NaiveDate,
        end: NaiveDate,
    },
    #[error("negative amount {amount} for {service} on {date}")]
    NegativeAmount {
        date: NaiveDate,
        service: String,
        amount: Decimal,
    },
    #[error("duplicate record for {service} ({currency}) on {date}")]
    DuplicateRecord {
        date: NaiveDate,
        service: String,
        currency: String,
    },
    #[error("invalid range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
}

/// One row of cost data: what a single service cost on a single day,
/// in a single currency. The same (date, service) pair may appear once
/// per currency; amounts in different currencies are never summed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostRecord {
    pub date: NaiveDate,
    pub service_name: String,
    pub amount: Decimal,
    pub currency: String,
}

/// All cost records for one query window, sorted by (date, service,
/// currency). Built once per run and never mutated afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct CostReport {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub generated_at: DateTime<Utc>,
    pub records: Vec<CostRecord>,
}

impl CostReport {
    /// Validate and sort `records` into a report for `[start_date, end_date]`.
    ///
    /// Rejects out-of-range dates, negative amounts, and duplicate
    /// (date, service, currency) triples.
    pub fn new(
        start_date: NaiveDate,
        end_date: NaiveDate,
        mut records: Vec<CostRecord>,
    ) -> Result<Self, InvalidReport> {
        if start_date > end_date {
            return Err(InvalidReport::InvalidRange {
                start: start_date,
                end: end_date,
            });
        }

        for record in &records {
            if record.date < start_date || record.date > end_date {
                return Err(InvalidReport::DateOutOfRange {
                    date: record.date,
                    start: start_date,
                    end: end_date,
                });
            }
            if record.amount.is_sign_negative() && !record.amount.is_zero() {
                return Err(InvalidReport::NegativeAmount {
                    date: record.date,
                    service: record.service_name.clone(),
                    amount: record.amount,
                });
            }
        }

        records.sort_by(|a, b| {
            (a.date, &a.service_name, &a.currency).cmp(&(b.date, &b.service_name, &b.currency))
        });

        for pair in records.windows(2) {
            if pair[0].date == pair[1].date
                && pair[0].service_name == pair[1].service_name
                && pair[0].currency == pair[1].currency
            {
                return Err(InvalidReport::DuplicateRecord {
                    date: pair[0].date,
                    service: pair[0].service_name.clone(),
                    currency: pair[0].currency.clone(),
                });
            }
        }

        Ok(Self {
            start_date,
            end_date,
            generated_at: Utc::now(),
            records,
        })
    }

    /// Base name (no extension) shared by the JSON and CSV artifacts.
    pub fn file_stem(&self) -> String {
        format!("cost_report_{}_{}", self.start_date, self.end_date)
    }

    /// Sum of amounts per currency, in currency order.
    pub fn totals_by_currency(&self) -> Vec<(String, Decimal)> {
        let mut totals: Vec<(String, Decimal)> = Vec::new();
        for record in &self.records {
            match totals.iter_mut().find(|(c, _)| *c == record.currency) {
                Some((_, total)) => *total += record.amount,
                None => totals.push((record.currency.clone(), record.amount)),
            }
        }
        totals.sort_by(|a, b| a.0.cmp(&b.0));
        totals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn record(d: &str, service: &str, amount: &str, currency: &str) -> CostRecord {
        CostRecord {
            date: date(d),
            service_name: service.to_string(),
            amount: amount.parse().unwrap(),
            currency: currency.to_string(),
        }
    }

    #[test]
    fn new_sorts_by_date_then_service() {
        let report = CostReport::new(
            date("2024-01-14"),
            date("2024-01-15"),
            vec![
                record("2024-01-15", "Amazon S3", "1.00", "USD"),
                record("2024-01-14", "Amazon S3", "2.00", "USD"),
                record("2024-01-14", "Amazon EC2", "3.00", "USD"),
            ],
        )
        .unwrap();
        let order: Vec<(&NaiveDate, &str)> = report
            .records
            .iter()
            .map(|r| (&r.date, r.service_name.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                (&date("2024-01-14"), "Amazon EC2"),
                (&date("2024-01-14"), "Amazon S3"),
                (&date("2024-01-15"), "Amazon S3"),
            ]
        );
    }

    #[test]
    fn new_rejects_date_outside_range() {
        let err = CostReport::new(
            date("2024-01-14"),
            date("2024-01-15"),
            vec![record("2024-01-16", "Amazon S3", "1.00", "USD")],
        )
        .unwrap_err();
        assert!(matches!(err, InvalidReport::DateOutOfRange { .. }));
    }

    #[test]
    fn new_rejects_negative_amount() {
        let err = CostReport::new(
            date("2024-01-15"),
            date("2024-01-15"),
            vec![record("2024-01-15", "Amazon S3", "-0.01", "USD")],
        )
        .unwrap_err();
        assert!(matches!(err, InvalidReport::NegativeAmount { .. }));
    }

    #[test]
    fn new_accepts_zero_amount() {
        let report = CostReport::new(
            date("2024-01-15"),
            date("2024-01-15"),
            vec![record("2024-01-15", "AWS Lambda", "0", "USD")],
        )
        .unwrap();
        assert_eq!(report.records.len(), 1);
    }

    #[test]
    fn new_rejects_duplicate_triple() {
        let err = CostReport::new(
            date("2024-01-15"),
            date("2024-01-15"),
            vec![
                record("2024-01-15", "Amazon S3", "1.00", "USD"),
                record("2024-01-15", "Amazon S3", "2.00", "USD"),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, InvalidReport::DuplicateRecord { .. }));
    }

    #[test]
    fn new_allows_same_service_in_two_currencies() {
        let report = CostReport::new(
            date("2024-01-15"),
            date("2024-01-15"),
            vec![
                record("2024-01-15", "Amazon S3", "1.00", "USD"),
                record("2024-01-15", "Amazon S3", "0.90", "EUR"),
            ],
        )
        .unwrap();
        assert_eq!(report.records.len(), 2);
    }

    #[test]
    fn new_rejects_inverted_range() {
        let err =
            CostReport::new(date("2024-01-16"), date("2024-01-15"), vec![]).unwrap_err();
        assert!(matches!(err, InvalidReport::InvalidRange { .. }));
    }

    #[test]
    fn file_stem_embeds_both_dates() {
        let report =
            CostReport::new(date("2024-01-14"), date("2024-01-15"), vec![]).unwrap();
        assert_eq!(report.file_stem(), "cost_report_2024-01-14_2024-01-15");
    }

    #[test]
    fn totals_sum_per_currency() {
        let report = CostReport::new(
            date("2024-01-15"),
            date("2024-01-15"),
            vec![
                record("2024-01-15", "Amazon S3", "1.10", "USD"),
                record("2024-01-15", "Amazon EC2", "2.25", "USD"),
                record("2024-01-15", "Amazon S3", "0.90", "EUR"),
            ],
        )
        .unwrap();
        let totals = report.totals_by_currency();
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0], ("EUR".to_string(), "0.90".parse().unwrap()));
        assert_eq!(totals[1], ("USD".to_string(), "3.35".parse().unwrap()));
    }

    #[test]
    fn record_serializes_amount_as_decimal_string() {
        let json = serde_json::to_string(&record("2024-01-15", "EC2", "12.34", "USD")).unwrap();
        assert_eq!(
            json,
            r#"{"date":"2024-01-15","service_name":"EC2","amount":"12.34","currency":"USD"}"#
        );
    }

    #[test]
    fn record_round_trips_through_json() {
        let original = record("2024-01-15", "Amazon EC2", "12.34", "USD");
        let json = serde_json::to_string(&original).unwrap();
        let back: CostRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, original);
    }
}
