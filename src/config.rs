//! Optional, serde-deserialized configuration analogous to a `sqlx.toml`
//! file: the placeholder/output-alias prefixes and whether an unreferenced
//! argument is a hard error or a warning (spec §2 "Config").
//!
//! The core pipeline never loads this itself; a façade reads it from disk
//! (or wherever the host application keeps its configuration) and passes it
//! in as plain data.

/// How an argument that's never referenced by any bound expression is
/// reported once prepare completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedArgPolicy {
    /// Fail the prepare with [`crate::error::BindError::UnusedType`].
    Error,
    /// Log a `tracing::warn!` and continue.
    Warn,
}

impl Default for UnusedArgPolicy {
    fn default() -> Self {
        UnusedArgPolicy::Error
    }
}

/// Configures the prefixes this crate uses for generated placeholder and
/// output-alias names, and how strictly it treats unused arguments.
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "offline",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, rename_all = "kebab-case")
)]
pub struct Config {
    /// Prefix used for generated bind placeholders, e.g. `sqlair` produces
    /// `@sqlair_0`, `@sqlair_1`, ...
    pub placeholder_prefix: String,

    /// Prefix used for generated output column aliases, e.g. `_sqlair`
    /// produces `_sqlair_0`, `_sqlair_1`, ...
    pub output_alias_prefix: String,

    /// What to do with an argument passed to prepare but never referenced
    /// by an input or output expression.
    #[cfg_attr(feature = "offline", serde(skip))]
    pub unused_arg_policy: UnusedArgPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            placeholder_prefix: "sqlair".to_string(),
            output_alias_prefix: "_sqlair".to_string(),
            unused_arg_policy: UnusedArgPolicy::Error,
        }
    }
}

impl Config {
    /// The bare `prefix_index` name for a bind placeholder, without the `@`
    /// sigil — this is what a driver sees as the parameter's name.
    pub fn placeholder_name(&self, index: usize) -> String {
        prefixed(&self.placeholder_prefix, index)
    }

    pub fn placeholder(&self, index: usize) -> String {
        format!("@{}", self.placeholder_name(index))
    }

    pub fn output_alias(&self, index: usize) -> String {
        prefixed(&self.output_alias_prefix, index)
    }
}

/// `prefix_index`, formatting `index` through `itoa` rather than through
/// `Display`'s more general (and slower) integer formatting path.
fn prefixed(prefix: &str, index: usize) -> String {
    let mut buf = itoa::Buffer::new();
    let digits = buf.format(index);
    let mut name = String::with_capacity(prefix.len() + 1 + digits.len());
    name.push_str(prefix);
    name.push('_');
    name.push_str(digits);
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_prefixes_match_the_canonical_scheme() {
        let cfg = Config::default();
        assert_eq!(cfg.placeholder(0), "@sqlair_0");
        assert_eq!(cfg.placeholder_name(0), "sqlair_0");
        assert_eq!(cfg.output_alias(2), "_sqlair_2");
        assert_eq!(cfg.unused_arg_policy, UnusedArgPolicy::Error);
    }
}
