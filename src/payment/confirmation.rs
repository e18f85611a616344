use std::time::Duration;

use rand::Rng;
use reqwest::{StatusCode, Url};

use crate::client::ApiClient;
use crate::entities::booking::{Booking, BookingStatus, PaymentStatus};
use crate::entities::payment::{GatewayStatus, KhaltiLookupResponse};
use crate::error::{AppError, AppResult};

pub const VERIFICATION_FAILED: &str = "Payment verification failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationStatus {
    Success,
    Pending,
    Failed,
}

#[derive(Debug, Clone)]
pub struct VerificationResult {
    pub status: VerificationStatus,
    pub booking: Option<Booking>,
    pub message: Option<String>,
}

impl VerificationResult {
    fn failed(message: impl Into<String>) -> Self {
        Self {
            status: VerificationStatus::Failed,
            booking: None,
            message: Some(message.into()),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == VerificationStatus::Pending
    }
}

/// Classify a lookup answer.
pub fn classify(status: StatusCode, resp: KhaltiLookupResponse) -> VerificationResult {
    let gateway = resp.gateway_status();
    if resp.success {
        let settled = resp.booking.as_ref().is_some_and(|b| {
            b.status == BookingStatus::Confirmed
                || b.payment_status == Some(PaymentStatus::Completed)
                || gateway == Some(GatewayStatus::Completed)
        });
        let verdict = if settled {
            VerificationStatus::Success
        } else if gateway == Some(GatewayStatus::Pending) {
            VerificationStatus::Pending
        } else {
            VerificationStatus::Failed
        };
        let message = match verdict {
            VerificationStatus::Failed => Some(
                resp.message
                    .unwrap_or_else(|| "Payment verification failed or not confirmed.".to_string()),
            ),
            _ => resp.message,
        };
        return VerificationResult {
            status: verdict,
            booking: resp.booking,
            message,
        };
    }

    if status == StatusCode::ACCEPTED {
        return VerificationResult {
            status: VerificationStatus::Pending,
            booking: resp.booking,
            message: resp.message,
        };
    }
    VerificationResult::failed(resp.message.unwrap_or_else(|| VERIFICATION_FAILED.to_string()))
}

/// Backoff for [`Confirmation::poll_until_settled`].
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    /// Lookups in total, the first one included.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl PollPolicy {
    /// Delay before lookup `attempt + 1`, without jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    fn jittered(&self, attempt: u32) -> Duration {
        let backoff = self.backoff(attempt);
        let spread = (backoff.as_millis() / 4) as u64;
        let jitter = rand::thread_rng().gen_range(0..=spread);
        backoff + Duration::from_millis(jitter)
    }
}

/// The page Khalti sends the customer back to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub pidx: Option<String>,
    pub status: Option<String>,
    pub purchase_order_id: Option<String>,
}

impl Confirmation {
    /// Read the gateway's query parameters. Relative URLs are accepted.
    pub fn from_return_url(url: &str) -> AppResult<Self> {
        let base = Url::parse("http://localhost/").map_err(|e| AppError::Internal(e.to_string()))?;
        let url = base
            .join(url)
            .map_err(|e| AppError::validation(format!("Invalid return URL: {}", e)))?;

        let mut confirmation = Self {
            pidx: None,
            status: None,
            purchase_order_id: None,
        };
        for (key, value) in url.query_pairs() {
            let value = Some(value.into_owned()).filter(|v| !v.is_empty());
            match key.as_ref() {
                "pidx" => confirmation.pidx = value,
                "status" => confirmation.status = value,
                "purchase_order_id" => confirmation.purchase_order_id = value,
                _ => {}
            }
        }
        Ok(confirmation)
    }

    /// One lookup. A `Pending` answer is returned as is.
    pub async fn lookup(&self, client: &ApiClient) -> VerificationResult {
        let Some(pidx) = self.pidx.as_deref() else {
            tracing::warn!("Return URL carried no pidx");
            return VerificationResult::failed(VERIFICATION_FAILED);
        };

        match client.payments().lookup_khalti(pidx).await {
            Ok((status, resp)) => {
                let result = classify(status, resp);
                tracing::info!(pidx, status = ?result.status, "Payment lookup finished");
                result
            }
            Err(err) => {
                tracing::warn!(pidx, error = %err, "Payment lookup failed");
                VerificationResult::failed(err.or_message(VERIFICATION_FAILED).to_string())
            }
        }
    }

    /// Repeat [`Confirmation::lookup`] while it reports `Pending`.
    pub async fn poll_until_settled(&self, client: &ApiClient, policy: PollPolicy) -> VerificationResult {
        let mut attempt = 1;
        loop {
            let result = self.lookup(client).await;
            if !result.is_pending() || attempt >= policy.max_attempts {
                return result;
            }
            let delay = policy.jittered(attempt);
            tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "Payment still pending");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
