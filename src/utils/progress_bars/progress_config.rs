// src/utils/progress_bars/progress_config.rs

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::env;

/// Configuration for progress tracking throughout the pipeline
#[derive(Debug, Clone)]
pub struct ProgressConfig {
    /// Whether to show progress bars at all
    pub enabled: bool,
    /// Whether to show per-detector bars in addition to the pipeline bar
    pub detailed: bool,
    /// Whether to show memory usage in progress messages
    pub show_memory: bool,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            detailed: true,
            show_memory: true,
        }
    }
}

impl ProgressConfig {
    /// Create progress configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |key: &str, default: bool| {
            lookup(key)
                .and_then(|v| v.trim().parse::<bool>().ok())
                .unwrap_or(default)
        };
        Self {
            enabled: flag("PROGRESS_ENABLED", true),
            detailed: flag("PROGRESS_DETAILED", true),
            show_memory: flag("PROGRESS_SHOW_MEMORY", true),
        }
    }

    /// Create a MultiProgress instance if progress is enabled, None otherwise
    pub fn create_multi_progress(&self) -> Option<MultiProgress> {
        if self.enabled {
            Some(MultiProgress::new())
        } else {
            None
        }
    }

    /// Check if detailed progress should be shown
    pub fn should_show_detailed(&self) -> bool {
        self.enabled && self.detailed
    }

    /// Check if memory usage should be shown
    pub fn should_show_memory(&self) -> bool {
        self.enabled && self.show_memory
    }
}

/// Adds a bar to `multi_progress` with the pipeline's shared style.
pub fn add_bar(multi_progress: Option<&MultiProgress>, len: u64, message: &str) -> Option<ProgressBar> {
    let mp = multi_progress?;
    let pb = mp.add(ProgressBar::new(len));
    let style = ProgressStyle::default_bar()
        .template("  {spinner:.green} [{elapsed_precise}] {bar:30.cyan/blue} {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");
    pb.set_style(style);
    pb.set_message(message.to_string());
    Some(pb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = ProgressConfig::default();
        assert!(config.enabled);
        assert!(config.detailed);
        assert!(config.show_memory);
    }

    #[test]
    fn test_lookup_config() {
        let vars: HashMap<&str, &str> = [
            ("PROGRESS_ENABLED", "false"),
            ("PROGRESS_DETAILED", "false"),
            ("PROGRESS_SHOW_MEMORY", "not-a-bool"),
        ]
        .into_iter()
        .collect();
        let config = ProgressConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert!(!config.enabled);
        assert!(!config.detailed);
        assert!(config.show_memory);
    }

    #[test]
    fn test_multi_progress_creation() {
        let mut config = ProgressConfig::default();

        config.enabled = true;
        assert!(config.create_multi_progress().is_some());

        config.enabled = false;
        assert!(config.create_multi_progress().is_none());
    }

    #[test]
    fn test_should_show_methods() {
        let mut config = ProgressConfig::default();
        assert!(config.should_show_detailed());
        assert!(config.should_show_memory());

        config.enabled = false;
        assert!(!config.should_show_detailed());
        assert!(!config.should_show_memory());

        config.enabled = true;
        config.detailed = false;
        config.show_memory = false;
        assert!(!config.should_show_detailed());
        assert!(!config.should_show_memory());
    }

    #[test]
    fn test_add_bar_without_multi_progress() {
        assert!(add_bar(None, 10, "scan").is_none());
    }
}
