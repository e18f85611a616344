use serde::{Deserialize, Serialize};

use super::booking::Booking;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KhaltiInitiateRequest {
    pub booking_id: String,
    pub amount: f64,
    pub return_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KhaltiInitiateData {
    pub payment_url: Option<String>,
    #[serde(default)]
    pub pidx: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KhaltiInitiateResponse {
    #[serde(default)]
    pub success: bool,
    pub data: Option<KhaltiInitiateData>,
    #[serde(default)]
    pub message: Option<String>,
}

impl KhaltiInitiateResponse {
    pub fn payment_url(&self) -> Option<&str> {
        if !self.success {
            return None;
        }
        self.data
            .as_ref()?
            .payment_url
            .as_deref()
            .filter(|u| !u.is_empty())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KhaltiVerifyRequest {
    pub pidx: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KhaltiLookupRequest {
    pub pidx: String,
}

/// Status strings reported by the Khalti gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatewayStatus {
    Completed,
    Pending,
    Initiated,
    Refunded,
    Expired,
    #[serde(rename = "User canceled")]
    UserCanceled,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KhaltiLookupData {
    pub status: Option<GatewayStatus>,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub total_amount: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KhaltiLookupResponse {
    #[serde(default)]
    pub success: bool,
    pub booking: Option<Booking>,
    pub data: Option<KhaltiLookupData>,
    #[serde(default)]
    pub message: Option<String>,
}

impl KhaltiLookupResponse {
    pub fn gateway_status(&self) -> Option<GatewayStatus> {
        self.data.as_ref()?.status
    }
}
