//! Import configuration

use serde::Deserialize;

use crate::channel::DEFAULT_CHANNEL_CAPACITY;

/// Default circular buffer capacity, in bytes
pub const DEFAULT_BUFFER_CAPACITY: usize = 65536;

/// Default maximum number of IPv4 datagrams being reassembled at the same time
pub const DEFAULT_MAX_FRAGMENT_SETS: usize = 1024;

/// Parameters of an import
///
/// Missing keys take their default value when deserialized.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Number of records buffered between the worker and the consumer
    pub channel_capacity: usize,
    /// Initial capacity of the reader buffer. It grows if a block does not fit.
    pub buffer_capacity: usize,
    /// Maximum number of in-flight fragmented datagrams
    pub max_fragment_sets: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        ImportConfig {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            max_fragment_sets: DEFAULT_MAX_FRAGMENT_SETS,
        }
    }
}

impl ImportConfig {
    /// Read a configuration from a JSON object
    pub fn from_json(s: &str) -> Result<ImportConfig, serde_json::Error> {
        serde_json::from_str(s)
    }
}
