//! Per-viewer configuration.

use crate::protocol::Role;

/// Channel every viewer of one origin shares by default.
pub const DEFAULT_CHANNEL: &str = "quickpoint_channel";

/// Query parameter that opts a viewer out of the sync bus.
pub const RECEIVER_PARAM: &str = "receiver";

/// Viewer configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerConfig {
    /// Name of the broadcast channel to join.
    pub channel_name: String,
    /// Primary (owns content) or satellite (mirrors).
    pub role: Role,
    /// Whether this viewer sends and applies sync messages at all.
    pub receiver: bool,
    /// Messages buffered per receiver before it starts lagging.
    pub broadcast_capacity: usize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            channel_name: DEFAULT_CHANNEL.to_string(),
            role: Role::Primary,
            receiver: true,
            broadcast_capacity: 64,
        }
    }
}

impl ViewerConfig {
    pub fn primary() -> Self {
        Self::default()
    }

    pub fn satellite() -> Self {
        Self {
            role: Role::Satellite,
            ..Self::default()
        }
    }

    /// Apply flags from a URL query string (with or without leading `?`).
    ///
    /// Only `receiver` is interpreted: a false-equivalent value turns sync
    /// participation off. Anything else leaves it on.
    pub fn with_query(mut self, query: &str) -> Self {
        if let Some(value) = query_param(query, RECEIVER_PARAM) {
            if is_false_equivalent(value) {
                self.receiver = false;
            }
        }
        self
    }

    /// Primary config derived from a viewer's own query string.
    pub fn from_query(query: &str) -> Self {
        Self::default().with_query(query)
    }
}

/// First value of `name` in a query string.
pub fn query_param<'a>(query: &'a str, name: &str) -> Option<&'a str> {
    let query = query.strip_prefix('?').unwrap_or(query);
    let query = query.split('#').next().unwrap_or_default();
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        (key == name).then_some(value)
    })
}

fn is_false_equivalent(value: &str) -> bool {
    ["false", "0", "no", "off"]
        .iter()
        .any(|candidate| value.trim().eq_ignore_ascii_case(candidate))
}
