//! COVID-19 statistics API client
//!
//! Fetches the global totals report for a single day from the RapidAPI
//! `covid-19-statistics` service and classifies the result per month.

use std::time::Duration;

use chrono::NaiveDate;
use log::{debug, warn};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;

use super::plan::month_key;
use super::Report;

/// Default endpoint for global totals
pub const DEFAULT_API_URL: &str = "https://covid-19-statistics.p.rapidapi.com/reports/total";

/// Default value for the `X-RapidAPI-Host` header
pub const DEFAULT_API_HOST: &str = "covid-19-statistics.p.rapidapi.com";

const API_KEY_HEADER: &str = "X-RapidAPI-Key";
const API_HOST_HEADER: &str = "X-RapidAPI-Host";

/// Errors that can occur when fetching a report
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed (connect, timeout, body read)
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server answered with something other than 200
    #[error("Unexpected HTTP status: {0}")]
    Status(StatusCode),

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    Parse(#[from] serde_json::Error),
}

impl FetchError {
    /// Whether another attempt could plausibly succeed
    fn is_transient(&self) -> bool {
        match self {
            FetchError::Request(e) => !e.is_decode() && !e.is_builder(),
            FetchError::Status(status) => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            FetchError::Parse(_) => false,
        }
    }
}

/// What happened when a single month was requested
#[derive(Debug)]
pub enum MonthOutcome {
    /// 200 with a non-empty payload
    Fetched(Report),
    /// 200, but `data` was empty or missing
    EmptyPayload,
    /// Non-200 status, transport error, or undecodable body
    Failed(FetchError),
}

/// Settings for [`ReportsClient`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub api_key: String,
    pub api_host: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Extra attempts after a transient failure
    pub retries: u32,
    /// Pause between attempts
    pub retry_backoff: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: String::new(),
            api_host: DEFAULT_API_HOST.to_string(),
            timeout: Duration::from_secs(30),
            retries: 2,
            retry_backoff: Duration::from_secs(1),
        }
    }
}

/// Response envelope from the totals endpoint
#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    data: Option<Payload>,
}

/// `data` is an object when the day has totals and `[]` when it does not
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Payload {
    Many(Vec<Report>),
    One(Report),
}

impl Payload {
    fn into_report(self) -> Option<Report> {
        let report = match self {
            Payload::One(report) => report,
            Payload::Many(mut reports) => match reports.len() {
                0 => return None,
                1 => reports.remove(0),
                _ => Report::merge(&reports),
            },
        };
        (!report.is_empty()).then_some(report)
    }
}

/// Parses a response body into the report it carries, if any
pub fn parse_response(body: &str) -> Result<Option<Report>, FetchError> {
    let response: ApiResponse = serde_json::from_str(body)?;
    Ok(response.data.and_then(Payload::into_report))
}

/// Client for the totals endpoint
#[derive(Debug, Clone)]
pub struct ReportsClient {
    client: Client,
    config: ClientConfig,
}

impl ReportsClient {
    /// Create a client; fails only if the TLS backend cannot be initialised
    pub fn new(config: ClientConfig) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    /// Create a client around an existing HTTP client
    ///
    /// The `timeout` in `config` is not applied; configure it on `client`.
    pub fn with_client(client: Client, config: ClientConfig) -> Self {
        Self { client, config }
    }

    /// Fetch the totals for `date`, retrying transient failures
    ///
    /// Never returns an error directly: every failure mode is folded into a
    /// [`MonthOutcome`] variant so callers can branch on the cause.
    pub async fn fetch_report(&self, date: NaiveDate) -> MonthOutcome {
        let mut attempt = 0;
        loop {
            match self.request(date).await {
                Ok(Some(report)) => return MonthOutcome::Fetched(report),
                Ok(None) => return MonthOutcome::EmptyPayload,
                Err(e) if e.is_transient() && attempt < self.config.retries => {
                    attempt += 1;
                    warn!(
                        "{}: {} (retry {}/{})",
                        month_key(date),
                        e,
                        attempt,
                        self.config.retries
                    );
                    tokio::time::sleep(self.config.retry_backoff).await;
                }
                Err(e) => return MonthOutcome::Failed(e),
            }
        }
    }

    /// Single GET for one day
    async fn request(&self, date: NaiveDate) -> Result<Option<Report>, FetchError> {
        let key = month_key(date);
        debug!("GET {} date={}", self.config.api_url, key);

        let response = self
            .client
            .get(&self.config.api_url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .header(API_HOST_HEADER, &self.config.api_host)
            .query(&[("date", key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status(status));
        }

        let text = response.text().await?;
        parse_response(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    const TOTALS_RESPONSE: &str = r#"{
        "data": {
            "date": "2021-03-01",
            "last_update": "2021-03-02 05:22:02",
            "confirmed": 114375741,
            "confirmed_diff": 275366,
            "deaths": 2537325,
            "deaths_diff": 6125,
            "recovered": 64617553,
            "recovered_diff": 155311,
            "active": 47220863,
            "active_diff": 113930,
            "fatality_rate": 0.0222
        }
    }"#;

    /// Serves one canned HTTP response per connection and returns the raw requests
    async fn serve(responses: Vec<(u16, &'static str)>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/reports/total", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let mut requests = Vec::new();
            for (status, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut raw = Vec::new();
                let mut buf = [0u8; 1024];
                while !raw.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = socket.read(&mut buf).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    raw.extend_from_slice(&buf[..n]);
                }
                requests.push(String::from_utf8_lossy(&raw).to_string());

                let reply = format!(
                    "HTTP/1.1 {} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                socket.write_all(reply.as_bytes()).await.unwrap();
                socket.shutdown().await.unwrap();
            }
            requests
        });

        (url, handle)
    }

    fn test_client(url: String, retries: u32) -> ReportsClient {
        let http = Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(5))
            .build()
            .expect("Client should build");

        ReportsClient::with_client(
            http,
            ClientConfig {
                api_url: url,
                api_key: "test-key".to_string(),
                api_host: "test-host".to_string(),
                timeout: Duration::from_secs(5),
                retries,
                retry_backoff: Duration::ZERO,
            },
        )
    }

    fn march_2021() -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 3, 1).unwrap()
    }

    #[test]
    fn test_parse_object_payload() {
        let report = parse_response(TOTALS_RESPONSE)
            .expect("Should parse")
            .expect("Should carry a report");

        assert_eq!(report.deaths, Some(2537325));
        assert_eq!(report.confirmed, Some(114375741));
        assert_eq!(report.date, Some(march_2021()));
    }

    #[test]
    fn test_parse_empty_list_payload() {
        assert!(parse_response(r#"{"data": []}"#).unwrap().is_none());
    }

    #[test]
    fn test_parse_empty_object_payload() {
        assert!(parse_response(r#"{"data": {}}"#).unwrap().is_none());
    }

    #[test]
    fn test_parse_missing_or_null_data() {
        assert!(parse_response(r#"{}"#).unwrap().is_none());
        assert!(parse_response(r#"{"data": null}"#).unwrap().is_none());
    }

    #[test]
    fn test_parse_single_element_list() {
        let report = parse_response(r#"{"data": [{"deaths": 7, "confirmed": 70, "fatality_rate": 0.1}]}"#)
            .unwrap()
            .unwrap();

        assert_eq!(report.deaths, Some(7));
        assert_eq!(report.fatality_rate, Some(0.1));
    }

    #[test]
    fn test_parse_multi_element_list_is_merged() {
        let body = r#"{"data": [
            {"date": "2022-01-01", "deaths": 10, "confirmed": 100, "fatality_rate": 0.1},
            {"date": "2022-01-01", "deaths": 30, "confirmed": 900, "fatality_rate": 0.033}
        ]}"#;

        let report = parse_response(body).unwrap().unwrap();

        assert_eq!(report.deaths, Some(40));
        assert_eq!(report.confirmed, Some(1000));
        assert!((report.fatality_rate.unwrap() - 0.04).abs() < 1e-12);
    }

    #[test]
    fn test_parse_malformed_json() {
        assert!(matches!(
            parse_response("{ invalid json }"),
            Err(FetchError::Parse(_))
        ));
    }

    #[test]
    fn test_transient_classification() {
        assert!(FetchError::Status(StatusCode::TOO_MANY_REQUESTS).is_transient());
        assert!(FetchError::Status(StatusCode::BAD_GATEWAY).is_transient());
        assert!(!FetchError::Status(StatusCode::NOT_FOUND).is_transient());
        assert!(!FetchError::Status(StatusCode::UNAUTHORIZED).is_transient());
    }

    #[tokio::test]
    async fn test_fetch_report_sends_date_and_headers() {
        let (url, server) = serve(vec![(200, TOTALS_RESPONSE)]).await;
        let client = test_client(url, 0);

        let outcome = client.fetch_report(march_2021()).await;

        assert!(matches!(outcome, MonthOutcome::Fetched(ref r) if r.deaths == Some(2537325)));
        let requests = server.await.unwrap();
        let request = requests[0].to_lowercase();
        assert!(request.starts_with("get /reports/total?date=2021-03-01 "));
        assert!(request.contains("x-rapidapi-key: test-key"));
        assert!(request.contains("x-rapidapi-host: test-host"));
    }

    #[tokio::test]
    async fn test_fetch_report_empty_payload() {
        let (url, server) = serve(vec![(200, r#"{"data": []}"#)]).await;
        let client = test_client(url, 0);

        let outcome = client.fetch_report(march_2021()).await;

        assert!(matches!(outcome, MonthOutcome::EmptyPayload));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_fetch_report_non_200_is_not_retried() {
        let (url, server) = serve(vec![(404, r#"{"message": "nope"}"#)]).await;
        let client = test_client(url, 3);

        let outcome = client.fetch_report(march_2021()).await;

        assert!(matches!(
            outcome,
            MonthOutcome::Failed(FetchError::Status(StatusCode::NOT_FOUND))
        ));
        assert_eq!(server.await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_report_retries_server_errors() {
        let (url, server) = serve(vec![(503, ""), (200, TOTALS_RESPONSE)]).await;
        let client = test_client(url, 1);

        let outcome = client.fetch_report(march_2021()).await;

        assert!(matches!(outcome, MonthOutcome::Fetched(_)));
        assert_eq!(server.await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_report_gives_up_after_retries() {
        let (url, server) = serve(vec![(500, ""), (500, "")]).await;
        let client = test_client(url, 1);

        let outcome = client.fetch_report(march_2021()).await;

        assert!(matches!(
            outcome,
            MonthOutcome::Failed(FetchError::Status(StatusCode::INTERNAL_SERVER_ERROR))
        ));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_fetch_report_retries_refused_connection() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let mut client = test_client(format!("http://127.0.0.1:{}/reports/total", port), 2);
        client.config.retry_backoff = Duration::from_millis(30);

        let start = std::time::Instant::now();
        let outcome = client.fetch_report(march_2021()).await;

        assert!(
            matches!(outcome, MonthOutcome::Failed(FetchError::Request(ref e)) if e.is_connect()),
            "{:?}",
            outcome
        );
        // Two backoffs means three attempts
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn test_fetch_report_retries_timeouts() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/reports/total", listener.local_addr().unwrap());
        // Accept twice and never answer; sockets stay open until the handle is awaited
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            for _ in 0..2 {
                let (socket, _) = listener.accept().await.unwrap();
                held.push(socket);
            }
            held
        });
        let http = Client::builder()
            .no_proxy()
            .timeout(Duration::from_millis(150))
            .build()
            .unwrap();
        let client = ReportsClient::with_client(
            http,
            ClientConfig {
                api_url: url,
                retries: 1,
                retry_backoff: Duration::ZERO,
                ..ClientConfig::default()
            },
        );

        let outcome = client.fetch_report(march_2021()).await;

        assert!(
            matches!(outcome, MonthOutcome::Failed(FetchError::Request(ref e)) if e.is_timeout()),
            "{:?}",
            outcome
        );
        assert_eq!(server.await.unwrap().len(), 2);
    }
}
