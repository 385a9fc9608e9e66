use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::currency::CurrencyRateProvider;

/// Mid rates from table A of the National Bank of Poland. Every rate in
/// the table is quoted against PLN.
pub struct NbpCurrencyProvider {
    base_url: String,
    timeout: Duration,
}

impl NbpCurrencyProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        NbpCurrencyProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

#[derive(Debug, Deserialize)]
struct NbpRateResponse {
    rates: Vec<NbpRate>,
}

#[derive(Debug, Deserialize)]
struct NbpRate {
    mid: f64,
    #[serde(alias = "effectiveDate")]
    effective_date: Option<NaiveDate>,
}

#[async_trait]
impl CurrencyRateProvider for NbpCurrencyProvider {
    #[instrument(name = "NbpRateFetch", skip(self))]
    async fn get_rate(&self, from: &str, to: &str) -> Result<f64> {
        let pair = format!("{from}/{to}");
        if !to.eq_ignore_ascii_case("PLN") {
            return Err(anyhow!("Unsupported currency pair: {}", pair));
        }

        let url = format!(
            "{}/api/exchangerates/rates/A/{}/?format=json",
            self.base_url,
            from.to_uppercase()
        );
        debug!("Requesting currency rate from {}", url);

        let client = reqwest::Client::builder()
            .user_agent("acos-forecast/0.1")
            .timeout(self.timeout)
            .build()?;

        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for currency pair: {}", e, pair))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for currency pair: {}",
                response.status(),
                pair
            ));
        }

        let text = response.text().await?;

        let data: NbpRateResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", pair, e))?;

        let item = data
            .rates
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No rate data found for currency pair: {}", pair))?;

        if !item.mid.is_finite() || item.mid <= 0.0 {
            return Err(anyhow!(
                "Invalid rate {} for currency pair: {}",
                item.mid,
                pair
            ));
        }

        debug!(rate = item.mid, effective_date = ?item.effective_date, "Received NBP rate");
        Ok(item.mid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const EUR_PATH: &str = "/api/exchangerates/rates/A/EUR/";

    async fn create_mock_server(response: ResponseTemplate) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(EUR_PATH))
            .and(query_param("format", "json"))
            .respond_with(response)
            .mount(&mock_server)
            .await;

        mock_server
    }

    fn provider(mock_server: &MockServer) -> NbpCurrencyProvider {
        NbpCurrencyProvider::new(&mock_server.uri(), Duration::from_secs(10))
    }

    #[tokio::test]
    async fn test_successful_rate_fetch() {
        let mock_response = r#"{
            "table": "A",
            "currency": "euro",
            "code": "EUR",
            "rates": [
                {
                    "no": "043/A/NBP/2024",
                    "effectiveDate": "2024-03-01",
                    "mid": 4.3197
                }
            ]
        }"#;
        let mock_server =
            create_mock_server(ResponseTemplate::new(200).set_body_string(mock_response)).await;

        let rate = provider(&mock_server)
            .get_rate("EUR", "PLN")
            .await
            .expect("Failed to get rate");
        assert_eq!(rate, 4.3197);
    }

    #[tokio::test]
    async fn test_no_rate_found() {
        let mock_server = create_mock_server(
            ResponseTemplate::new(200).set_body_string(r#"{"code": "EUR", "rates": []}"#),
        )
        .await;

        let result = provider(&mock_server).get_rate("EUR", "PLN").await;
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().to_string(),
            "No rate data found for currency pair: EUR/PLN"
        );
    }

    #[tokio::test]
    async fn test_api_error_response() {
        let mock_server = create_mock_server(ResponseTemplate::new(404)).await;

        let result = provider(&mock_server).get_rate("EUR", "PLN").await;
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().to_string(),
            "HTTP error: 404 Not Found for currency pair: EUR/PLN"
        );
    }

    #[tokio::test]
    async fn test_malformed_response() {
        // "rate" instead of "rates"
        let mock_server = create_mock_server(
            ResponseTemplate::new(200).set_body_string(r#"{"rate": [{"mid": 4.3}]}"#),
        )
        .await;

        let result = provider(&mock_server).get_rate("EUR", "PLN").await;
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse JSON response for EUR/PLN")
        );
    }

    #[tokio::test]
    async fn test_non_positive_rate_rejected() {
        let mock_server = create_mock_server(
            ResponseTemplate::new(200).set_body_string(r#"{"rates": [{"mid": 0.0}]}"#),
        )
        .await;

        let result = provider(&mock_server).get_rate("EUR", "PLN").await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid rate 0"));
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let mock_server = create_mock_server(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"rates": [{"mid": 4.3}]}"#)
                .set_delay(Duration::from_secs(2)),
        )
        .await;

        let provider = NbpCurrencyProvider::new(&mock_server.uri(), Duration::from_millis(100));
        let result = provider.get_rate("EUR", "PLN").await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().starts_with("Request error"));
    }

    #[tokio::test]
    async fn test_unsupported_pair_makes_no_request() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let result = provider(&mock_server).get_rate("EUR", "USD").await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "Unsupported currency pair: EUR/USD"
        );
    }
}
