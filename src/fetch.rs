//! Campaign payload fetch collaborator.
//!
//! Downloads the `{ panic, campaigns }` document from the flag-management
//! CDN and hands the engine immutable snapshots. Revalidation is
//! conditional: the `Last-Modified` value of the last successful download
//! is echoed back as `If-Modified-Since`, and a 304 leaves the held
//! snapshot untouched. The client delivers either a complete new snapshot
//! or the prior one — never a partial merge — and performs no retries:
//! polling cadence and retry policy belong to the embedding application.

use std::sync::{Arc, RwLock};

use reqwest::StatusCode;
use reqwest::header::{IF_MODIFIED_SINCE, LAST_MODIFIED};
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::model::BucketingPayload;
use crate::validation;

/// Placeholder substituted with the environment id in the endpoint
/// template.
pub const ENV_ID_PLACEHOLDER: &str = "@ENV_ID@";

/// Default endpoint template of the hosted CDN.
pub const DEFAULT_ENDPOINT_TEMPLATE: &str =
    "https://cdn.flagship.io/bucketing/@ENV_ID@/bucketing.json";

/// Configuration for a [`BucketingClient`].
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Environment the payload is scoped to.
    pub environment_id: String,

    /// Endpoint template containing [`ENV_ID_PLACEHOLDER`].
    pub endpoint_template: String,
}

impl FetchConfig {
    /// Configuration for the hosted CDN.
    #[must_use]
    pub fn new(environment_id: impl Into<String>) -> Self {
        Self {
            environment_id: environment_id.into(),
            endpoint_template: DEFAULT_ENDPOINT_TEMPLATE.to_owned(),
        }
    }

    /// Overrides the endpoint template (self-hosted relays, tests).
    #[must_use]
    pub fn with_endpoint_template(mut self, template: impl Into<String>) -> Self {
        self.endpoint_template = template.into();
        self
    }

    /// Concrete URL for this environment.
    #[must_use]
    pub fn endpoint(&self) -> String {
        self.endpoint_template
            .replace(ENV_ID_PLACEHOLDER, &self.environment_id)
    }
}

/// Outcome of one fetch cycle.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// A fresh payload was downloaded and is now the held snapshot.
    Updated(Arc<BucketingPayload>),
    /// The server answered 304; the prior snapshot is still current.
    NotModified(Arc<BucketingPayload>),
}

impl FetchOutcome {
    /// The snapshot current after this cycle, fresh or not.
    #[must_use]
    pub fn snapshot(&self) -> &Arc<BucketingPayload> {
        match self {
            Self::Updated(payload) | Self::NotModified(payload) => payload,
        }
    }
}

/// Conditional-GET client for the campaign payload.
///
/// Holds the latest complete snapshot behind an `RwLock`; readers always
/// observe either the previous or the new payload, never a partial state.
#[derive(Debug)]
pub struct BucketingClient {
    http: reqwest::Client,
    config: FetchConfig,
    state: RwLock<CacheState>,
}

#[derive(Debug, Default)]
struct CacheState {
    snapshot: Option<Arc<BucketingPayload>>,
    last_modified: Option<String>,
}

impl BucketingClient {
    /// Creates a client with a default `reqwest` client.
    #[must_use]
    pub fn new(config: FetchConfig) -> Self {
        Self::with_http(reqwest::Client::new(), config)
    }

    /// Creates a client reusing an existing `reqwest` client.
    #[must_use]
    pub fn with_http(http: reqwest::Client, config: FetchConfig) -> Self {
        Self {
            http,
            config,
            state: RwLock::new(CacheState::default()),
        }
    }

    /// The snapshot from the last successful fetch, if any.
    ///
    /// # Panics
    ///
    /// Panics if a previous holder of the internal lock panicked.
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<BucketingPayload>> {
        self.state.read().expect("cache lock poisoned").snapshot.clone()
    }

    /// Performs one fetch cycle.
    ///
    /// Sends a GET, conditioned on `If-Modified-Since` when a previous
    /// `Last-Modified` is held. A 200 replaces the snapshot wholesale and
    /// runs the validation sweep; a 304 keeps the prior snapshot.
    ///
    /// # Errors
    ///
    /// [`FetchError`] on transport failure, an unexpected status, an
    /// undecodable body, or a 304 arriving before any snapshot exists.
    pub async fn fetch(&self) -> Result<FetchOutcome, FetchError> {
        let url = self.config.endpoint();

        let mut request = self.http.get(&url);
        let held_last_modified = self
            .state
            .read()
            .expect("cache lock poisoned")
            .last_modified
            .clone();
        if let Some(value) = &held_last_modified {
            request = request.header(IF_MODIFIED_SINCE, value);
        }

        let response = request.send().await?;
        match response.status() {
            StatusCode::OK => {
                let last_modified = response
                    .headers()
                    .get(LAST_MODIFIED)
                    .and_then(|v| v.to_str().ok())
                    .map(ToOwned::to_owned);

                let body = response.bytes().await?;
                let payload: BucketingPayload = serde_json::from_slice(&body)?;

                let report = validation::validate(&payload);
                for issue in &report.issues {
                    warn!(environment_id = %self.config.environment_id, %issue, "payload issue");
                }

                info!(
                    environment_id = %self.config.environment_id,
                    campaigns = payload.campaigns.len(),
                    panic = payload.panic,
                    "bucketing payload updated"
                );

                let snapshot = Arc::new(payload);
                let mut state = self.state.write().expect("cache lock poisoned");
                state.snapshot = Some(snapshot.clone());
                state.last_modified = last_modified;
                Ok(FetchOutcome::Updated(snapshot))
            }
            StatusCode::NOT_MODIFIED => {
                debug!(
                    environment_id = %self.config.environment_id,
                    "bucketing payload not modified"
                );
                self.snapshot()
                    .map(FetchOutcome::NotModified)
                    .ok_or(FetchError::NotModifiedWithoutSnapshot)
            }
            status => Err(FetchError::UnexpectedStatus {
                status: status.as_u16(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_substitutes_environment_id() {
        let config = FetchConfig::new("bn1ab7m56qolupi5sa0g");
        assert_eq!(
            config.endpoint(),
            "https://cdn.flagship.io/bucketing/bn1ab7m56qolupi5sa0g/bucketing.json"
        );
    }

    #[test]
    fn endpoint_template_override() {
        let config = FetchConfig::new("env_1")
            .with_endpoint_template("http://127.0.0.1:9000/@ENV_ID@/payload.json");
        assert_eq!(config.endpoint(), "http://127.0.0.1:9000/env_1/payload.json");
    }

    #[test]
    fn client_starts_without_snapshot() {
        let client = BucketingClient::new(FetchConfig::new("env_1"));
        assert!(client.snapshot().is_none());
    }
}
