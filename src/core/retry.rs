use std::future::Future;
use std::time::Duration;

use aws_smithy_runtime_api::client::orchestrator::HttpResponse;
use aws_smithy_runtime_api::client::result::SdkError;
use aws_smithy_types::error::metadata::ProvideErrorMetadata;

/// Bounded retry with exponential backoff, shared by the fetch and
/// upload stages. SDK-internal retries are disabled so this policy is
/// the only one in effect.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Run `op` until it succeeds, fails non-transiently, or exhausts
    /// `max_attempts`. Delay doubles after each failed attempt.
    pub async fn run<T, E, F, Fut>(
        &self,
        is_transient: impl Fn(&E) -> bool,
        mut op: F,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut delay = self.base_delay;
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_attempts && is_transient(&err) => {
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Whether an HTTP status warrants another attempt: throttling (429)
/// and server-side failures (5xx).
pub fn is_transient_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

const THROTTLING_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "TooManyRequestsException",
    "RequestLimitExceeded",
    "LimitExceededException",
];

/// Classify an AWS SDK error as transient. Timeouts, connection
/// failures, throttling codes, and 429/5xx responses are retried;
/// auth and bad-request failures are not.
pub fn is_transient_sdk_error<E>(err: &SdkError<E, HttpResponse>) -> bool
where
    E: ProvideErrorMetadata,
{
    match err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => true,
        SdkError::ResponseError(ctx) => is_transient_status(ctx.raw().status().as_u16()),
        SdkError::ServiceError(ctx) => {
            let code = ctx.err().meta().code().unwrap_or_default();
            is_transient_status(ctx.raw().status().as_u16())
                || THROTTLING_CODES.contains(&code)
        }
        _ => false,
    }
}
