//! # Client — Remote Hit Registration and Lookup
//!
//! Talks to the hit-counting service through the CORS relay. A page's counter
//! lives at `<api_base>/<namespace>/<fingerprint>`; appending `/up` increments it.
//!
//! ```text
//! HitCounter                    CORS relay                 counting service
//! ┌──────────────┐   GET ?url=  ┌──────────────┐   GET     ┌──────────────────────┐
//! │ register_hit │ ───────────> │ api.cors.lol │ ───────>  │ /v1/<ns>/<fp>/up     │
//! │ hit_count    │ ───────────> │              │ ───────>  │ /v1/<ns>/<fp>        │
//! │              │ <── {count}  │              │ <───────  │                      │
//! └──────────────┘              └──────────────┘           └──────────────────────┘
//! ```
//!
//! ## Failure Model
//!
//! Transport errors, non-2xx statuses, non-JSON bodies and a missing `count`
//! all fail the call. Nothing is retried: an increment that failed after the
//! service applied it would be counted twice on retry. No timeout is set unless
//! `timeout_secs` is configured.
//!
//! Calls share nothing but the connection pool, so concurrent hits on the same
//! page are ordered by the remote service alone.

use crate::config::CounterConfig;
use crate::error::CounterError;
use crate::fingerprint::{fingerprint, Fingerprint};
use futures::future::join_all;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, ORIGIN};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// Current value of a remote counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct HitCount(u64);

impl HitCount {
    pub fn new(count: u64) -> Self {
        HitCount(count)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HitCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which counter endpoint to hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterOp {
    /// `.../<fp>/up`: bumps the counter and returns the new value.
    Increment,
    /// `.../<fp>`: returns the value without changing it.
    Read,
}

/// Response body from the counting service. Only `count` matters; other fields
/// (`id`, `name`, timestamps) are ignored.
#[derive(Deserialize)]
struct CountResponse {
    count: Option<u64>,
}

#[derive(Clone)]
pub struct HitCounter {
    config: CounterConfig,
    http: reqwest::Client,
}

impl HitCounter {
    pub fn new(config: CounterConfig) -> Result<Self, CounterError> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert(ORIGIN, config.origin_header()?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("pagehits/", env!("CARGO_PKG_VERSION")));
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build()?;

        Ok(HitCounter { config, http })
    }

    /// Counting-service URL for a key, before any relaying.
    pub fn counter_url(&self, fp: Fingerprint, op: CounterOp) -> String {
        let base = self.config.api_base.trim_end_matches('/');
        match op {
            CounterOp::Increment => format!("{}/{}/{}/up", base, self.config.namespace, fp),
            CounterOp::Read => format!("{}/{}/{}", base, self.config.namespace, fp),
        }
    }

    /// The URL actually requested for `name`: relayed when a relay is set.
    pub fn request_url(&self, name: &str, op: CounterOp) -> String {
        self.relayed(&self.counter_url(fingerprint(name), op))
    }

    fn relayed(&self, target: &str) -> String {
        match &self.config.relay_url {
            Some(relay) => format!(
                "{}?url={}",
                relay.trim_end_matches('/'),
                urlencoding::encode(target)
            ),
            None => target.to_string(),
        }
    }

    /// Record one view of `name` and return the updated count.
    ///
    /// Not idempotent. Never retried.
    pub async fn register_hit(&self, name: &str) -> Result<HitCount, CounterError> {
        self.send(name, CounterOp::Increment).await
    }

    /// Read the current count for `name` without changing it.
    pub async fn hit_count(&self, name: &str) -> Result<HitCount, CounterError> {
        self.send(name, CounterOp::Read).await
    }

    /// Read several counts concurrently, one request per name, in input order.
    ///
    /// The requests run interleaved on the caller's task. Duplicate names are
    /// requested once per occurrence.
    pub async fn hit_counts(
        &self,
        names: &[String],
    ) -> Vec<(String, Result<HitCount, CounterError>)> {
        let requests = names.iter().map(|name| async move {
            let result = self.hit_count(name).await;
            (name.clone(), result)
        });
        join_all(requests).await
    }

    async fn send(&self, name: &str, op: CounterOp) -> Result<HitCount, CounterError> {
        let fp = fingerprint(name);
        let url = self.relayed(&self.counter_url(fp, op));
        debug!(page = name, fingerprint = %fp, ?op, url = %url, "counter request");

        let result = self.fetch(&url).await;
        if let Err(e) = &result {
            warn!(page = name, fingerprint = %fp, ?op, error = %e, "counter unavailable");
        }
        result
    }

    async fn fetch(&self, url: &str) -> Result<HitCount, CounterError> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CounterError::Status {
                status: status.as_u16(),
            });
        }
        let body = response.bytes().await?;
        parse_count(&body)
    }
}

fn parse_count(body: &[u8]) -> Result<HitCount, CounterError> {
    let parsed: CountResponse = serde_json::from_slice(body)?;
    parsed.count.map(HitCount).ok_or(CounterError::MissingCount)
}
