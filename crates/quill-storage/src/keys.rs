//! Storage key constants.

/// Storage keys used by the client.
pub struct StorageKeys;

impl StorageKeys {
    /// Bearer token (raw string)
    pub const TOKEN: &'static str = "token";

    /// User record (JSON)
    pub const USER: &'static str = "user";
}
