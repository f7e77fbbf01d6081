use serde::Deserialize;
use std::time::Duration;
use typed_builder::TypedBuilder;

/// Deployment-level settings for the engine.
#[derive(Clone, Debug, Deserialize, TypedBuilder)]
#[serde(deny_unknown_fields)]
pub struct Configuration {
    /// The relation nesting ceiling applied when a request does not carry its
    /// own. Depth counts relation selections only.
    #[serde(default = "default_max_depth")]
    #[builder(default = default_max_depth())]
    pub max_depth: usize,

    /// Reject the whole request when resolution runs past this deadline.
    /// Accepts humantime strings such as "30s". No deadline by default.
    #[serde(deserialize_with = "humantime_serde::deserialize", default)]
    #[builder(default)]
    pub request_timeout: Option<Duration>,
}

fn default_max_depth() -> usize {
    5
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration::builder().build()
    }
}
