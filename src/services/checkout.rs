//! Checkout
//!
//! Turns a catalog item into a hosted checkout session with an external
//! payment gateway. The gateway answers with a URL the browser is sent to.
//!
//! Prices are stored in whole currency units; the gateway expects minor units
//! (cents), so the amount is always `price * 100`.

use crate::config::PaymentConfig;
use crate::models::Item;
use crate::services::signing::sign_hex;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;
use uuid::Uuid;

/// Error types for checkout operations
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    /// The item cannot be charged as-is
    #[error("{0}")]
    ValidationError(String),

    /// The gateway refused the request or could not be reached
    #[error("Payment gateway error: {0}")]
    Gateway(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// What the gateway needs to open a checkout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub order_id: String,
    pub order_desc: String,
    pub currency: String,
    /// Amount in minor units
    pub amount: i64,
}

/// A checkout opened by the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub checkout_url: String,
}

/// An external payment processor
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, CheckoutError>;
}

/// Convert whole currency units to minor units.
///
/// Equivalent to appending "00" to the decimal price. Non-positive prices and
/// prices whose minor-unit value would overflow are rejected.
pub fn to_minor_units(price: i64) -> Result<i64, CheckoutError> {
    if price <= 0 {
        return Err(CheckoutError::ValidationError(
            "Price must be a positive whole number".to_string(),
        ));
    }
    price
        .checked_mul(100)
        .ok_or_else(|| CheckoutError::ValidationError("Price is too large to charge".to_string()))
}

/// Builds checkout requests for items and hands them to the gateway
pub struct CheckoutService {
    gateway: Arc<dyn PaymentGateway>,
    currency: String,
}

impl CheckoutService {
    pub fn new(gateway: Arc<dyn PaymentGateway>, currency: impl Into<String>) -> Self {
        Self {
            gateway,
            currency: currency.into(),
        }
    }

    /// Open a checkout for one unit of `item`
    #[instrument(skip(self, item), fields(item_id = item.id))]
    pub async fn start(&self, item: &Item) -> Result<CheckoutSession, CheckoutError> {
        let request = CheckoutRequest {
            order_id: format!("{}-{}", item.id, Uuid::new_v4().simple()),
            order_desc: format!("Purchase of {}", item.title),
            currency: self.currency.clone(),
            amount: to_minor_units(item.price)?,
        };

        tracing::info!(
            "Creating checkout {} for amount {} {}",
            request.order_id,
            request.amount,
            request.currency
        );
        self.gateway.create_checkout(&request).await
    }
}

// ============================================================================
// Hosted checkout gateway
// ============================================================================

/// Gateway speaking the hosted-checkout JSON API.
///
/// Requests are wrapped in `{"request": {...}}` and signed with HMAC-SHA256
/// over the pipe-joined field values in alphabetical key order.
pub struct HostedCheckoutGateway {
    client: reqwest::Client,
    api_url: String,
    merchant_id: String,
    secret_key: String,
}

#[derive(Debug, Serialize)]
struct RequestEnvelope<'a> {
    request: SignedRequest<'a>,
}

#[derive(Debug, Serialize)]
struct SignedRequest<'a> {
    merchant_id: &'a str,
    order_id: &'a str,
    order_desc: &'a str,
    currency: &'a str,
    amount: i64,
    signature: String,
}

#[derive(Debug, Deserialize)]
struct ResponseEnvelope {
    response: GatewayResponse,
}

#[derive(Debug, Deserialize)]
struct GatewayResponse {
    response_status: String,
    #[serde(default)]
    checkout_url: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
}

impl HostedCheckoutGateway {
    pub fn new(config: &PaymentConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            merchant_id: config.merchant_id.clone(),
            secret_key: config.secret_key.clone(),
        })
    }

    /// Signature over `amount|currency|merchant_id|order_desc|order_id`
    fn signature(&self, request: &CheckoutRequest) -> String {
        let payload = [
            request.amount.to_string().as_str(),
            request.currency.as_str(),
            self.merchant_id.as_str(),
            request.order_desc.as_str(),
            request.order_id.as_str(),
        ]
        .join("|");
        sign_hex(self.secret_key.as_bytes(), payload.as_bytes())
    }
}

#[async_trait]
impl PaymentGateway for HostedCheckoutGateway {
    async fn create_checkout(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, CheckoutError> {
        if self.merchant_id.is_empty() {
            return Err(CheckoutError::Gateway(
                "Payment gateway is not configured".to_string(),
            ));
        }

        let body = RequestEnvelope {
            request: SignedRequest {
                merchant_id: &self.merchant_id,
                order_id: &request.order_id,
                order_desc: &request.order_desc,
                currency: &request.currency,
                amount: request.amount,
                signature: self.signature(request),
            },
        };

        let response = self
            .client
            .post(&self.api_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| CheckoutError::Gateway(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(CheckoutError::Gateway(format!(
                "Unexpected HTTP status {}",
                response.status()
            )));
        }

        let envelope: ResponseEnvelope = response
            .json()
            .await
            .map_err(|e| CheckoutError::Gateway(format!("Malformed response: {}", e)))?;

        interpret_response(envelope.response)
    }
}

fn interpret_response(response: GatewayResponse) -> Result<CheckoutSession, CheckoutError> {
    match (response.response_status.as_str(), response.checkout_url) {
        ("success", Some(checkout_url)) if !checkout_url.is_empty() => {
            Ok(CheckoutSession { checkout_url })
        }
        ("success", _) => Err(CheckoutError::Gateway(
            "Response is missing checkout_url".to_string(),
        )),
        _ => Err(CheckoutError::Gateway(
            response
                .error_message
                .unwrap_or_else(|| "Checkout was declined".to_string()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::signing::verify_hex;
    use axum::{routing::post, Json, Router};
    use chrono::Utc;
    use proptest::prelude::*;
    use std::sync::Mutex;

    fn item(price: i64) -> Item {
        Item {
            id: 7,
            title: "Chair".to_string(),
            price,
            is_active: true,
            description: String::new(),
            created_at: Utc::now(),
        }
    }

    /// Records requests and answers with a fixed URL
    #[derive(Default)]
    struct RecordingGateway {
        requests: Mutex<Vec<CheckoutRequest>>,
    }

    #[async_trait]
    impl PaymentGateway for RecordingGateway {
        async fn create_checkout(
            &self,
            request: &CheckoutRequest,
        ) -> Result<CheckoutSession, CheckoutError> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(CheckoutSession {
                checkout_url: format!("https://pay.test/checkout?amount={}", request.amount),
            })
        }
    }

    fn payment_config(api_url: String) -> PaymentConfig {
        PaymentConfig {
            api_url,
            merchant_id: "1396424".to_string(),
            secret_key: "test".to_string(),
            currency: "USD".to_string(),
            timeout_seconds: 5,
        }
    }

    /// Serve `reply` as the gateway's JSON answer on a random local port
    async fn spawn_gateway(reply: serde_json::Value) -> String {
        let app = Router::new().route(
            "/checkout",
            post(move |Json(body): Json<serde_json::Value>| {
                let reply = reply.clone();
                async move {
                    assert!(body["request"]["signature"].is_string());
                    Json(reply)
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/checkout", addr)
    }

    #[test]
    fn test_to_minor_units() {
        assert_eq!(to_minor_units(50).unwrap(), 5000);
        assert_eq!(to_minor_units(1).unwrap(), 100);
        assert!(matches!(to_minor_units(0), Err(CheckoutError::ValidationError(_))));
        assert!(matches!(to_minor_units(-3), Err(CheckoutError::ValidationError(_))));
        assert!(matches!(to_minor_units(i64::MAX), Err(CheckoutError::ValidationError(_))));
    }

    proptest! {
        #[test]
        fn prop_minor_units_append_two_zeros(price in 1i64..=(i64::MAX / 100)) {
            let minor = to_minor_units(price).unwrap();
            prop_assert_eq!(minor.to_string(), format!("{}00", price));
        }
    }

    #[tokio::test]
    async fn test_start_builds_request_from_item() {
        let gateway = Arc::new(RecordingGateway::default());
        let service = CheckoutService::new(gateway.clone(), "UAH");

        let session = service.start(&item(50)).await.expect("Checkout should succeed");

        assert!(session.checkout_url.ends_with("amount=5000"));
        let requests = gateway.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].amount, 5000);
        assert_eq!(requests[0].currency, "UAH");
        assert!(requests[0].order_id.starts_with("7-"));
        assert!(requests[0].order_desc.contains("Chair"));
    }

    #[tokio::test]
    async fn test_order_ids_are_unique() {
        let gateway = Arc::new(RecordingGateway::default());
        let service = CheckoutService::new(gateway.clone(), "USD");

        service.start(&item(10)).await.unwrap();
        service.start(&item(10)).await.unwrap();

        let requests = gateway.requests.lock().unwrap();
        assert_ne!(requests[0].order_id, requests[1].order_id);
    }

    #[tokio::test]
    async fn test_start_rejects_overflowing_price() {
        let gateway = Arc::new(RecordingGateway::default());
        let service = CheckoutService::new(gateway.clone(), "USD");

        let err = service.start(&item(i64::MAX)).await.unwrap_err();

        assert!(matches!(err, CheckoutError::ValidationError(_)));
        assert!(gateway.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn test_signature_covers_fields_in_order() {
        let gateway = HostedCheckoutGateway::new(&payment_config("http://unused".into())).unwrap();
        let request = CheckoutRequest {
            order_id: "7-abc".to_string(),
            order_desc: "Purchase of Chair".to_string(),
            currency: "USD".to_string(),
            amount: 5000,
        };

        let signature = gateway.signature(&request);

        assert!(verify_hex(
            b"test",
            b"5000|USD|1396424|Purchase of Chair|7-abc",
            &signature
        ));
    }

    #[test]
    fn test_interpret_response() {
        let ok = interpret_response(GatewayResponse {
            response_status: "success".to_string(),
            checkout_url: Some("https://pay.test/abc".to_string()),
            error_message: None,
        });
        assert_eq!(ok.unwrap().checkout_url, "https://pay.test/abc");

        let declined = interpret_response(GatewayResponse {
            response_status: "failure".to_string(),
            checkout_url: None,
            error_message: Some("Invalid merchant".to_string()),
        });
        match declined {
            Err(CheckoutError::Gateway(msg)) => assert_eq!(msg, "Invalid merchant"),
            other => panic!("expected gateway error, got {:?}", other),
        }

        let missing_url = interpret_response(GatewayResponse {
            response_status: "success".to_string(),
            checkout_url: None,
            error_message: None,
        });
        assert!(matches!(missing_url, Err(CheckoutError::Gateway(_))));
    }

    #[tokio::test]
    async fn test_unconfigured_gateway_fails() {
        let mut config = payment_config("http://unused".into());
        config.merchant_id.clear();
        let gateway = HostedCheckoutGateway::new(&config).unwrap();

        let request = CheckoutRequest {
            order_id: "1".to_string(),
            order_desc: "x".to_string(),
            currency: "USD".to_string(),
            amount: 100,
        };

        assert!(matches!(
            gateway.create_checkout(&request).await,
            Err(CheckoutError::Gateway(_))
        ));
    }

    #[tokio::test]
    async fn test_hosted_gateway_success() {
        let url = spawn_gateway(serde_json::json!({
            "response": {
                "response_status": "success",
                "checkout_url": "https://pay.test/merchants/abc/order"
            }
        }))
        .await;
        let gateway = HostedCheckoutGateway::new(&payment_config(url)).unwrap();
        let service = CheckoutService::new(Arc::new(gateway), "USD");

        let session = service.start(&item(50)).await.expect("Checkout should succeed");

        assert_eq!(session.checkout_url, "https://pay.test/merchants/abc/order");
    }

    #[tokio::test]
    async fn test_hosted_gateway_failure_carries_message() {
        let url = spawn_gateway(serde_json::json!({
            "response": {
                "response_status": "failure",
                "error_message": "Invalid signature",
                "error_code": 1014
            }
        }))
        .await;
        let gateway = HostedCheckoutGateway::new(&payment_config(url)).unwrap();
        let service = CheckoutService::new(Arc::new(gateway), "USD");

        match service.start(&item(50)).await {
            Err(CheckoutError::Gateway(msg)) => assert_eq!(msg, "Invalid signature"),
            other => panic!("expected gateway error, got {:?}", other),
        }
    }
}
