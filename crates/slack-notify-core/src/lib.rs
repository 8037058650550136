//! slack-notify core library
//!
//! Formats Concourse build notifications and delivers them to Slack with
//! bounded retry. The binary crate wires [`Resource`] to the process.
//!
//! ## Flow
//!
//! `out` request → [`format_message`] → [`deliver`] → `out` response

pub mod build_env;
pub mod delivery;
pub mod error;
pub mod message;
pub mod resource;
pub mod slack;
pub mod telemetry;
pub mod version;

pub use delivery::{deliver, retry, DeliveryOutcome, RetryPolicy};
pub use error::{NotifyError, ResourceError, Result};
pub use message::{format_message, BuildContext, FormattedMessage, FAILURE_COLOR, SUCCESS_COLOR};
pub use resource::{
    CheckResponse, InRequest, InResponse, MetadataField, OutParams, OutRequest, OutResponse,
    Resource, Source, Verb,
};
pub use slack::{Attachment, MessagePayload, Notifier, SlackClient, WebhookClient};
pub use telemetry::init_tracing;
pub use version::{Clock, FixedClock, SystemClock, TimestampVersion};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
