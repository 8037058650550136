//! Build metadata from the environment Concourse provides to `out`.

use crate::message::BuildContext;

pub const EXTERNAL_URL_VAR: &str = "ATC_EXTERNAL_URL";
pub const TEAM_VAR: &str = "BUILD_TEAM_NAME";
pub const PIPELINE_VAR: &str = "BUILD_PIPELINE_NAME";
pub const JOB_VAR: &str = "BUILD_JOB_NAME";
pub const BUILD_VAR: &str = "BUILD_NAME";

impl BuildContext {
    /// Read the build context from the process environment.
    ///
    /// Missing or non-UTF-8 variables read as empty strings.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the build context through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).unwrap_or_default();
        BuildContext {
            external_url: get(EXTERNAL_URL_VAR),
            team: get(TEAM_VAR),
            pipeline: get(PIPELINE_VAR),
            job: get(JOB_VAR),
            build: get(BUILD_VAR),
        }
    }
}
