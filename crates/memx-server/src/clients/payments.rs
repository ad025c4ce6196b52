use std::time::Duration;

use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

/// Client for the payment provider's payment-link API.
#[derive(Clone)]
pub struct PaymentsClient {
    client: Client,
    base_url: String,
    access_token: String,
    location_id: String,
}

#[derive(Deserialize)]
struct PaymentLinkResponse {
    payment_link: PaymentLink,
}

#[derive(Deserialize)]
struct PaymentLink {
    url: String,
}

impl PaymentsClient {
    pub fn new(client: Client, base_url: &str, access_token: &str, location_id: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
            location_id: location_id.to_string(),
        }
    }

    /// Creates a quick-pay checkout link. `note` carries the paying
    /// member's user id so the completion webhook can find the business.
    pub async fn create_payment_link(
        &self,
        title: &str,
        amount_cents: i64,
        note: &str,
    ) -> Result<String> {
        let body = json!({
            "idempotency_key": Uuid::new_v4().to_string(),
            "quick_pay": {
                "name": title,
                "price_money": { "amount": amount_cents, "currency": "USD" },
                "location_id": self.location_id,
            },
            "payment_note": note,
            "checkout_options": {
                "accepted_payment_methods": {
                    "apple_pay": true,
                    "google_pay": true,
                    "cash_app_pay": false,
                },
                "ask_for_shipping_address": false,
            },
        });

        let response = self
            .client
            .post(format!("{}/v2/online-checkout/payment-links", self.base_url))
            .bearer_auth(&self.access_token)
            .json(&body)
            .timeout(Duration::from_secs(15))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "payment link creation failed: {}",
                response.status()
            ));
        }

        let parsed: PaymentLinkResponse = response.json().await?;
        Ok(parsed.payment_link.url)
    }
}
