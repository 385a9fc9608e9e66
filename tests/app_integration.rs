use acos_forecast::core::Calculation;
use acos_forecast::core::metrics::{AcosInput, BudgetInput, ForecastInput};
use acos_forecast::{AppCommand, OutputOptions};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

mod test_utils {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn create_nbp_mock_server(response: ResponseTemplate, calls: u64) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/exchangerates/rates/A/EUR/"))
            .respond_with(response)
            .expect(calls)
            .mount(&mock_server)
            .await;

        mock_server
    }

    pub fn nbp_body(mid: f64) -> String {
        format!(
            r#"{{"table":"A","currency":"euro","code":"EUR","rates":[{{"no":"043/A/NBP/2024","effectiveDate":"2024-03-01","mid":{mid}}}]}}"#
        )
    }
}

fn write_config(dir: &Path, base_url: &str) -> String {
    let config_path = dir.join("config.yaml");
    let config_content = format!(
        r#"
providers:
  nbp:
    base_url: {base_url}
    timeout_secs: 2
rates:
  fallback_rate: 4.30
  cache_ttl_hours: 24
currency: "EUR"
"#
    );
    fs::write(&config_path, config_content).expect("Failed to write config file");
    config_path.to_str().unwrap().to_string()
}

fn forecast_input() -> ForecastInput {
    ForecastInput {
        gross_margin: 40.0,
        target_aov: 30.0,
        target_ctr: 2.0,
        target_cpc: 0.5,
        target_cvr: 5.0,
        impressions: 10_000,
        currency: String::new(),
    }
}

#[test_log::test(tokio::test)]
async fn test_forecast_flow_with_live_rate_and_json_export() {
    let mock_server = test_utils::create_nbp_mock_server(
        wiremock::ResponseTemplate::new(200).set_body_string(test_utils::nbp_body(4.3197)),
        1,
    )
    .await;
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(temp_dir.path(), &mock_server.uri());
    let export_path = temp_dir.path().join("forecast.json");

    let result = acos_forecast::run_command(
        AppCommand::Calculate {
            calculation: Calculation::Forecast(forecast_input()),
            output: OutputOptions {
                json: false,
                export: Some(export_path.clone()),
            },
        },
        Some(&config_path),
    )
    .await;
    assert!(result.is_ok(), "Forecast failed with: {:?}", result.err());

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&export_path).unwrap()).unwrap();
    assert_eq!(report["kind"], "forecast");

    let results = &report["sections"][0]["fields"];
    assert_eq!(results["clicks"], 200.0);
    assert_eq!(results["orders"], 10.0);
    assert_eq!(results["acos"], 33.0);
    assert_eq!(results["roi"], 200.0);

    let inputs = &report["sections"][1]["fields"];
    assert_eq!(inputs["currency"], "EUR");

    let currency = &report["sections"][3]["fields"];
    assert_eq!(currency["exchange_rate"], 4.3197);
    assert_eq!(currency["rate_source"], "live");
    assert_eq!(currency["ad_spend_pln"], 431.97);
}

#[test_log::test(tokio::test)]
async fn test_budget_flow_falls_back_when_rate_source_fails() {
    let mock_server =
        test_utils::create_nbp_mock_server(wiremock::ResponseTemplate::new(500), 1).await;
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(temp_dir.path(), &mock_server.uri());
    let export_path = temp_dir.path().join("budget.csv");

    let result = acos_forecast::run_command(
        AppCommand::Calculate {
            calculation: Calculation::Budget(BudgetInput {
                target_sales: 1000.0,
                target_tacos: 10.0,
                gross_margin: 30.0,
            }),
            output: OutputOptions {
                json: true,
                export: Some(export_path.clone()),
            },
        },
        Some(&config_path),
    )
    .await;
    assert!(result.is_ok(), "Budget failed with: {:?}", result.err());

    let csv = fs::read_to_string(&export_path).unwrap();
    assert!(csv.starts_with("section,metric,value"));
    assert!(csv.contains("Forecast results,Marketing budget,100.0"));
    assert!(csv.contains("Currency info,Rate source,fallback"));
    assert!(csv.contains("Currency info,Exchange rate,4.3"));
    assert!(csv.contains("Currency info,Net profit,860.0"));
}

#[test_log::test(tokio::test)]
async fn test_acos_flow_makes_no_rate_request() {
    let mock_server = test_utils::create_nbp_mock_server(
        wiremock::ResponseTemplate::new(200).set_body_string(test_utils::nbp_body(4.3)),
        0,
    )
    .await;
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(temp_dir.path(), &mock_server.uri());

    let result = acos_forecast::run_command(
        AppCommand::Calculate {
            calculation: Calculation::Acos(AcosInput {
                sales: 1000.0,
                spend: 200.0,
                margin: 30.0,
            }),
            output: OutputOptions::default(),
        },
        Some(&config_path),
    )
    .await;
    assert!(result.is_ok(), "ACOS failed with: {:?}", result.err());
}

#[test_log::test(tokio::test)]
async fn test_invalid_input_is_reported() {
    let mock_server = test_utils::create_nbp_mock_server(
        wiremock::ResponseTemplate::new(200).set_body_string(test_utils::nbp_body(4.3)),
        0,
    )
    .await;
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(temp_dir.path(), &mock_server.uri());
    let export_path = temp_dir.path().join("never.json");

    let mut input = forecast_input();
    input.target_ctr = -2.0;
    let result = acos_forecast::run_command(
        AppCommand::Calculate {
            calculation: Calculation::Forecast(input),
            output: OutputOptions {
                json: false,
                export: Some(export_path.clone()),
            },
        },
        Some(&config_path),
    )
    .await;

    let err = result.unwrap_err();
    assert!(err.to_string().contains("Target CTR must not be negative"));
    assert!(!export_path.exists());
}

#[test_log::test(tokio::test)]
async fn test_rate_command() {
    let mock_server = test_utils::create_nbp_mock_server(
        wiremock::ResponseTemplate::new(200).set_body_string(test_utils::nbp_body(4.2871)),
        1,
    )
    .await;
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(temp_dir.path(), &mock_server.uri());

    let result = acos_forecast::run_command(AppCommand::Rate, Some(&config_path)).await;
    assert!(result.is_ok(), "Rate failed with: {:?}", result.err());
}

#[test_log::test(tokio::test)]
async fn test_missing_config_file_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("missing.yaml");

    let result =
        acos_forecast::run_command(AppCommand::Rate, Some(missing.to_str().unwrap())).await;
    assert!(result.is_err());
    assert!(
        result
            .unwrap_err()
            .to_string()
            .contains("Failed to read config file")
    );
}
