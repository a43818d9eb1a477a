//! Storage key constants.

/// Keys of the persisted relay state.
pub struct StorageKeys;

impl StorageKeys {
    /// Id of the last command handed to the dispatcher (string or null)
    pub const LAST_DELIVERED_COMMAND_ID: &'static str = "lastDeliveredCommandId";

    /// Whether the relay currently holds a live subscription
    pub const CONNECTED: &'static str = "connected";
}
