//! Read-only configuration access port.

/// Lookups by `[section] key`. Integer and boolean getters fall back to
/// `default` when the key is missing or does not parse.
pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;
    /// Keys present in `section`, in no particular order.
    fn keys(&self, section: &str) -> Vec<String>;
}
