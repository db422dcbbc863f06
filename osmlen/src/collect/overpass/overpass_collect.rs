use std::time::Duration;

use tracing::warn;

use crate::error::{Error, Result};

#[cfg(feature = "reqwest")]
use reqwest::{blocking::Client, header::USER_AGENT, StatusCode};
#[cfg(feature = "reqwest")]
use tracing::{debug, info};
#[cfg(feature = "reqwest")]
use url::Url;

#[cfg(feature = "reqwest")]
use crate::collect::overpass::filters::InfrastructureFilter;
#[cfg(feature = "reqwest")]
use crate::collect::overpass::query::{build_query, parse_lengths};
#[cfg(feature = "reqwest")]
use crate::measure::LengthSource;

/// Outcome of one request attempt.
#[derive(Debug)]
pub enum Attempt<T> {
    Done(T),
    /// The service asked us to back off (HTTP 429).
    Overloaded,
    Failed(String),
}

/// Bounded retry with a mandatory pause when the service is overloaded.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub overload_pause: Duration,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 60,
            overload_pause: Duration::from_secs(60),
            retry_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Call `attempt` (with the 1-based attempt number) until it succeeds or attempts run out.
    /// `pause` is called between attempts; no pause follows the last one.
    pub fn run<T>(
        &self,
        mut attempt: impl FnMut(usize) -> Attempt<T>,
        mut pause: impl FnMut(Duration),
    ) -> Result<T> {
        let mut last_failure = String::from("no attempt made");

        for n in 1..=self.max_attempts {
            let wait = match attempt(n) {
                Attempt::Done(value) => return Ok(value),
                Attempt::Overloaded => {
                    warn!(attempt = n, pause = ?self.overload_pause, "service overloaded");
                    last_failure = "service overloaded (HTTP 429)".to_string();
                    self.overload_pause
                }
                Attempt::Failed(message) => {
                    warn!(attempt = n, %message, "request failed");
                    last_failure = message;
                    self.retry_delay
                }
            };
            if n < self.max_attempts && !wait.is_zero() {
                pause(wait);
            }
        }

        Err(Error::Transport {
            attempts: self.max_attempts,
            message: last_failure,
        })
    }
}

/// Blocking client for the Overpass interpreter.
#[cfg(feature = "reqwest")]
pub struct OverpassCollect {
    client: Client,
    endpoint: Url,
    user_agent: String,
    timeout_secs: u32,
    retry: RetryPolicy,
}

#[cfg(feature = "reqwest")]
impl OverpassCollect {
    pub fn new(endpoint: Url, user_agent: &str, timeout_secs: u32, retry: RetryPolicy) -> Result<Self> {
        // leave the server its own timeout before giving up on the socket
        let client = Client::builder()
            .timeout(Duration::from_secs(u64::from(timeout_secs) + 60))
            .build()
            .map_err(|e| Error::Transport {
                attempts: 0,
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(OverpassCollect {
            client,
            endpoint,
            user_agent: user_agent.to_string(),
            timeout_secs,
            retry,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Summed way length per filter inside one fragment, retried per the policy.
    pub fn fetch_lengths(
        &self,
        fragment: &str,
        filters: &[InfrastructureFilter],
        date: Option<&str>,
    ) -> Result<Vec<f64>> {
        let query = build_query(fragment, filters, self.timeout_secs, date);
        info!(
            filters = filters.len(),
            fragment_chars = fragment.len(),
            date = date.unwrap_or("latest"),
            "querying Overpass"
        );

        self.retry
            .run(|_| self.attempt(&query, filters.len()), std::thread::sleep)
    }

    fn attempt(&self, query: &str, expected: usize) -> Attempt<Vec<f64>> {
        let response = match self
            .client
            .get(self.endpoint.clone())
            .query(&[("data", query)])
            .header(USER_AGENT, &self.user_agent)
            .send()
        {
            Ok(response) => response,
            Err(e) => return Attempt::Failed(format!("request error: {e}")),
        };

        let status = response.status();
        debug!(%status, "Overpass response");
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Attempt::Overloaded;
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            return Attempt::Failed(format!("Overpass returned error {status}: {snippet}"));
        }

        let body = match response.text() {
            Ok(body) => body,
            Err(e) => return Attempt::Failed(format!("failed to read response body: {e}")),
        };
        match parse_lengths(&body) {
            Ok(lengths) if lengths.len() == expected => Attempt::Done(lengths),
            Ok(lengths) => Attempt::Failed(
                Error::ResultCount {
                    expected,
                    got: lengths.len(),
                }
                .to_string(),
            ),
            Err(e) => Attempt::Failed(e.to_string()),
        }
    }
}

#[cfg(feature = "reqwest")]
impl LengthSource for OverpassCollect {
    fn lengths(
        &mut self,
        fragment: &str,
        filters: &[InfrastructureFilter],
        date: Option<&str>,
    ) -> Result<Vec<f64>> {
        self.fetch_lengths(fragment, filters, date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max_attempts: usize) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            overload_pause: Duration::from_secs(60),
            retry_delay: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_first_success_is_returned() {
        let mut pauses = Vec::new();
        let value = policy(3)
            .run(|_| Attempt::Done(7), |d| pauses.push(d))
            .unwrap();
        assert_eq!(value, 7);
        assert!(pauses.is_empty());
    }

    #[test]
    fn test_overload_pauses_before_retry() {
        let mut pauses = Vec::new();
        let value = policy(5)
            .run(
                |n| match n {
                    1 => Attempt::Overloaded,
                    2 => Attempt::Failed("connection reset".to_string()),
                    _ => Attempt::Done(vec![1.0, 2.0]),
                },
                |d| pauses.push(d),
            )
            .unwrap();
        assert_eq!(value, vec![1.0, 2.0]);
        assert_eq!(pauses, vec![Duration::from_secs(60), Duration::from_secs(1)]);
    }

    #[test]
    fn test_exhausted_attempts_report_last_failure() {
        let mut calls = 0;
        let mut pauses = 0;
        let err = policy(4)
            .run(
                |_| -> Attempt<()> {
                    calls += 1;
                    Attempt::Failed("bad gateway".to_string())
                },
                |_| pauses += 1,
            )
            .unwrap_err();
        assert_eq!(calls, 4);
        assert_eq!(pauses, 3);
        match err {
            Error::Transport { attempts, message } => {
                assert_eq!(attempts, 4);
                assert_eq!(message, "bad gateway");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(feature = "reqwest")]
    #[test]
    fn test_overpass_collect_new() {
        let endpoint = Url::parse("http://overpass-api.de/api/interpreter").unwrap();
        let collect = OverpassCollect::new(endpoint, "cycleLanes", 1200, RetryPolicy::default()).unwrap();
        assert_eq!(collect.endpoint().host_str(), Some("overpass-api.de"));
    }
}
