//! Concourse resource protocol.
//!
//! Concourse runs the resource as `check`, `in <destination>` or
//! `out <source>`, feeding a JSON request on stdin and reading a JSON
//! response from stdout. Only `out` does real work: it formats the build
//! notification and delivers it with retry.

use std::io::{Read, Write};
use std::str::FromStr;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::delivery::{deliver, DeliveryOutcome, RetryPolicy};
use crate::error::{ResourceError, Result};
use crate::message::{format_message, BuildContext};
use crate::slack::{MessagePayload, Notifier, SlackClient, WebhookClient, SLACK_API_BASE};
use crate::version::{Clock, SystemClock, TimestampVersion};

/// The three resource entrypoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Check,
    In,
    Out,
}

impl FromStr for Verb {
    type Err = ResourceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "check" => Ok(Verb::Check),
            "in" => Ok(Verb::In),
            "out" => Ok(Verb::Out),
            other => Err(ResourceError::UnknownVerb(other.to_string())),
        }
    }
}

/// `source` block of the resource configuration.
///
/// `state` is the default reported state; a put's `params.status` takes
/// precedence over it when non-empty (see [`OutParams`]).
#[derive(Debug, Default, Deserialize)]
pub struct Source {
    /// Build state to report (`success`, `failure`, anything else)
    #[serde(default)]
    pub state: String,
    /// Bot token for the Web API
    #[serde(default)]
    pub token: Option<SecretString>,
    /// Channel name or ID
    #[serde(default)]
    pub channel: String,
    /// Incoming webhook; when set, used instead of the Web API
    #[serde(default)]
    pub webhook_url: Option<SecretString>,
    /// Web API base URL override
    #[serde(default)]
    pub api_url: Option<String>,
}

/// `params` block of a put.
///
/// Unlike a plain `source.state` configuration, this lets one resource
/// definition report both outcomes from `on_success` / `on_failure` hooks.
/// Leave `status` empty to report `source.state` unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutParams {
    /// Overrides `source.state` when non-empty
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct InRequest {
    #[serde(default)]
    pub source: Source,
    #[serde(default)]
    pub version: Option<TimestampVersion>,
    #[serde(default)]
    pub params: OutParams,
}

#[derive(Debug, Default, Deserialize)]
pub struct OutRequest {
    #[serde(default)]
    pub source: Source,
    #[serde(default)]
    pub version: Option<TimestampVersion>,
    #[serde(default)]
    pub params: OutParams,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckResponse {
    pub version: Vec<TimestampVersion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InResponse {
    pub version: TimestampVersion,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataField {
    pub name: String,
    pub value: String,
}

impl MetadataField {
    fn new(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutResponse {
    pub version: TimestampVersion,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub metadata: Vec<MetadataField>,
}

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Executes resource verbs against injected time, environment and I/O.
pub struct Resource {
    clock: Box<dyn Clock + Send + Sync>,
    env: EnvLookup,
    retry: RetryPolicy,
}

impl Default for Resource {
    fn default() -> Self {
        Self::new()
    }
}

impl Resource {
    /// Wall clock, process environment, default retry policy.
    pub fn new() -> Self {
        Resource {
            clock: Box::new(SystemClock),
            env: Box::new(|key| std::env::var(key).ok()),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_env<F>(mut self, env: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Box::new(env);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Run `verb` with its positional `args`, reading the request from
    /// `stdin` and writing the response to `stdout`.
    ///
    /// Nothing is written to `stdout` unless the verb succeeds.
    pub async fn exec<R, W>(
        &self,
        verb: &str,
        args: &[String],
        stdin: R,
        mut stdout: W,
    ) -> Result<()>
    where
        R: Read,
        W: Write,
    {
        let output = match verb.parse::<Verb>()? {
            Verb::Check => encode(&self.check())?,
            Verb::In => {
                let [destination] = args else {
                    return Err(ResourceError::Usage("in <destination>"));
                };
                let req: InRequest = decode(stdin)?;
                let mut out = encode(&self.get(destination, &req))?;
                out.push(b'\n');
                out
            }
            Verb::Out => {
                let [source_dir] = args else {
                    return Err(ResourceError::Usage("out <source>"));
                };
                let req: OutRequest = decode(stdin)?;
                let mut out = encode(&self.put(source_dir, req).await?)?;
                out.push(b'\n');
                out
            }
        };

        stdout.write_all(&output)?;
        stdout.flush()?;
        Ok(())
    }

    /// Notifications have no upstream versions to discover.
    pub fn check(&self) -> CheckResponse {
        CheckResponse::default()
    }

    /// Acknowledge the requested version.
    pub fn get(&self, destination: &str, req: &InRequest) -> InResponse {
        info!(version = ?req.version, destination, "in");
        InResponse {
            version: TimestampVersion::echo(req.version.as_ref()),
        }
    }

    /// Send the build notification.
    pub async fn put(&self, source_dir: &str, req: OutRequest) -> Result<OutResponse> {
        let version = TimestampVersion::now(self.clock.as_ref());
        let OutRequest { source, params, .. } = req;

        let state = if params.status.is_empty() {
            source.state.clone()
        } else {
            params.status.clone()
        };

        let build = BuildContext::from_lookup(|key| (self.env)(key));
        let message = format_message(&build, &state);
        let payload = MessagePayload::new(&source.channel, &message);
        debug!(source_dir, state = %state, channel = %source.channel, "out");

        let channel = source.channel.clone();
        let notifier = notifier_for(source)?;

        match deliver(notifier.as_ref(), &payload, &self.retry).await {
            DeliveryOutcome::Delivered { attempts } => Ok(OutResponse {
                version,
                metadata: vec![
                    MetadataField::new("channel", channel),
                    MetadataField::new("state", state),
                    MetadataField::new("build_url", build.full_link()),
                    MetadataField::new("attempts", attempts.to_string()),
                ],
            }),
            DeliveryOutcome::Exhausted {
                attempts,
                last_error,
            } => Err(ResourceError::DeliveryFailed {
                attempts,
                last_error,
            }),
        }
    }
}

fn notifier_for(source: Source) -> Result<Box<dyn Notifier>> {
    let notifier: Box<dyn Notifier> = match source.webhook_url {
        Some(url) => Box::new(WebhookClient::new(url).map_err(ResourceError::Client)?),
        None => {
            let token = source
                .token
                .unwrap_or_else(|| SecretString::from(String::new()));
            let base = source.api_url.as_deref().unwrap_or(SLACK_API_BASE);
            Box::new(SlackClient::with_base_url(base, token).map_err(ResourceError::Client)?)
        }
    };
    Ok(notifier)
}

fn decode<T, R>(stdin: R) -> Result<T>
where
    T: serde::de::DeserializeOwned,
    R: Read,
{
    serde_json::from_reader(stdin).map_err(ResourceError::InvalidRequest)
}

fn encode<T: Serialize>(response: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(response).map_err(ResourceError::InvalidResponse)
}
