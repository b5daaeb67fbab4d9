//! Configuration access port trait.

pub trait ConfigPort {
    /// Raw value, if present. Typed reads and their defaults live with the
    /// validators so an unparseable value is an error rather than a default.
    fn get_string(&self, section: &str, key: &str) -> Option<String>;

    /// True when `key` is present in `section`, whatever its value.
    fn has_key(&self, section: &str, key: &str) -> bool {
        self.get_string(section, key).is_some()
    }
}
