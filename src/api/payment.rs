use std::time::Duration;

use reqwest::{Method, StatusCode};

use crate::client::{ApiClient, Payload, RequestOptions};
use crate::entities::booking::BookingStatusUpdate;
use crate::entities::payment::{
    KhaltiInitiateRequest, KhaltiInitiateResponse, KhaltiLookupRequest, KhaltiLookupResponse, KhaltiVerifyRequest,
};
use crate::entities::Ack;
use crate::error::AppResult;
use crate::routes::endpoints;

/// Payment endpoints: booking payment status and the Khalti gateway.
pub struct PaymentApi<'a> {
    client: &'a ApiClient,
}

impl<'a> PaymentApi<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn update_booking_payment(&self, booking_id: &str, update: &BookingStatusUpdate) -> AppResult<Ack> {
        self.client
            .put(&endpoints::booking_status(booking_id), update, &RequestOptions::user())
            .await
    }

    /// The token is passed explicitly: the gateway call must not pick up
    /// whichever credential the page happens to classify to.
    pub async fn initiate_khalti(
        &self,
        req: &KhaltiInitiateRequest,
        user_token: &str,
        timeout: Duration,
    ) -> AppResult<KhaltiInitiateResponse> {
        let opts = RequestOptions::user().with_bearer(user_token).timeout(timeout);
        self.client.post(endpoints::KHALTI_INITIATE, req, &opts).await
    }

    pub async fn verify_khalti(&self, req: &KhaltiVerifyRequest) -> AppResult<KhaltiLookupResponse> {
        self.client
            .post(endpoints::KHALTI_VERIFY, req, &RequestOptions::user())
            .await
    }

    /// Lookup keeps the HTTP status: 202 means the gateway has not settled.
    pub async fn lookup_khalti(&self, pidx: &str) -> AppResult<(StatusCode, KhaltiLookupResponse)> {
        let body = serde_json::to_value(KhaltiLookupRequest {
            pidx: pidx.to_string(),
        })?;
        let resp = self
            .client
            .send(
                Method::POST,
                endpoints::KHALTI_LOOKUP,
                Payload::Json(body),
                &RequestOptions::user(),
            )
            .await?;
        let status = resp.status;
        Ok((status, resp.json()?))
    }
}
