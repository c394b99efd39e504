//! Configuration settings for style mirroring.
//!
//! Configuration can be loaded from environment variables or constructed
//! programmatically.

use std::env;

/// Container tag mirrored when nothing else is configured.
pub const DEFAULT_CONTAINER_TAG: &str = "style";

/// Runtime configuration for a mirroring session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MirrorConfig {
    /// Lowercase tag names of the top-level containers that get mirrored
    pub container_tags: Vec<String>,
    /// Whether to log per-session counters after every batch
    pub telemetry_enabled: bool,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self::new(Vec::<String>::new(), false)
    }
}

impl MirrorConfig {
    /// Construct a new `MirrorConfig` with explicit values.
    ///
    /// Tags are lowercased and blank entries dropped; an empty list falls
    /// back to [`DEFAULT_CONTAINER_TAG`].
    #[must_use]
    pub fn new<I, S>(container_tags: I, telemetry_enabled: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tags: Vec<String> = Vec::new();
        for tag in container_tags {
            let tag = tag.as_ref().trim().to_ascii_lowercase();
            if !tag.is_empty() && !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        if tags.is_empty() {
            tags.push(DEFAULT_CONTAINER_TAG.to_owned());
        }
        Self {
            container_tags: tags,
            telemetry_enabled,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Reads the following environment variables:
    /// - `STYLE_MIRROR_TAGS`: comma-separated container tags (default: `style`)
    /// - `STYLE_MIRROR_TELEMETRY`: Set to "1" to enable telemetry (default: disabled)
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let tags = lookup("STYLE_MIRROR_TAGS").unwrap_or_default();
        let telemetry_enabled = lookup("STYLE_MIRROR_TELEMETRY").as_deref() == Some("1");
        Self::new(tags.split(','), telemetry_enabled)
    }

    pub fn is_container_tag(&self, tag: &str) -> bool {
        self.container_tags
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_to_style() {
        let config = MirrorConfig::default();
        assert_eq!(config.container_tags, vec!["style".to_owned()]);
        assert!(!config.telemetry_enabled);
        assert!(config.is_container_tag("STYLE"));
        assert!(!config.is_container_tag("link"));
    }

    #[test]
    fn reads_variables() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("STYLE_MIRROR_TAGS", " Style, template ,,"),
            ("STYLE_MIRROR_TELEMETRY", "1"),
        ]);
        let config = MirrorConfig::from_lookup(|key| vars.get(key).map(|val| (*val).to_owned()));
        assert_eq!(
            config.container_tags,
            vec!["style".to_owned(), "template".to_owned()]
        );
        assert!(config.telemetry_enabled);
    }

    #[test]
    fn repeated_tags_are_kept_once() {
        let config = MirrorConfig::new(["style", "template", "STYLE"], false);
        assert_eq!(
            config.container_tags,
            vec!["style".to_owned(), "template".to_owned()]
        );
    }

    #[test]
    fn missing_variables_use_defaults() {
        let config = MirrorConfig::from_lookup(|_| None);
        assert_eq!(config, MirrorConfig::default());
    }
}
