//! Build notification formatting.
//!
//! [`format_message`] is pure: the same build context and state always
//! produce the same [`FormattedMessage`].

use serde::{Deserialize, Serialize};

/// Color for successful builds.
pub const SUCCESS_COLOR: &str = "#2ECC71";
/// Color for failed builds.
pub const FAILURE_COLOR: &str = "#E74C3C";

/// Metadata describing the build being reported.
///
/// Values are opaque and are interpolated into links as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildContext {
    /// Base URL of the CI web UI
    pub external_url: String,
    pub team: String,
    pub pipeline: String,
    pub job: String,
    /// Build number or name
    pub build: String,
}

impl BuildContext {
    /// Link to the job page.
    pub fn short_link(&self) -> String {
        format!(
            "{}/teams/{}/pipelines/{}/jobs/{}",
            self.external_url, self.team, self.pipeline, self.job
        )
    }

    /// Link to this specific build.
    pub fn full_link(&self) -> String {
        format!("{}/builds/{}", self.short_link(), self.build)
    }
}

/// A chat message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedMessage {
    /// Plain-text summary for clients that cannot render markup
    pub fallback: String,
    /// Display text with link markup
    pub text: String,
    /// Hex color, empty when the state is not recognised
    pub color: String,
    /// Fields in which markup is rendered
    pub markdown_in: Vec<String>,
}

/// Glyph suffix and color for a build state.
fn decoration(state: &str) -> (&'static str, &'static str) {
    match state {
        "success" => (" :bowtie:", SUCCESS_COLOR),
        "failure" => (" :sob:", FAILURE_COLOR),
        _ => ("", ""),
    }
}

/// Format the notification for `state` of the build described by `ctx`.
pub fn format_message(ctx: &BuildContext, state: &str) -> FormattedMessage {
    let short_link = ctx.short_link();
    let full_link = ctx.full_link();
    let (suffix, color) = decoration(state);

    let fallback = format!(
        "Build #{} {}/{} was a {} : {}",
        ctx.build, ctx.pipeline, ctx.job, state, full_link
    );

    let text = format!(
        "Build *<{}|#{}>* in *<{}|{}/{}>* was a *{}*{}",
        full_link, ctx.build, short_link, ctx.pipeline, ctx.job, state, suffix
    );

    FormattedMessage {
        fallback,
        text,
        color: color.to_string(),
        markdown_in: vec!["text".to_string()],
    }
}
