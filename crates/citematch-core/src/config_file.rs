use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfigBuilder;
use crate::verify::VerifyConfig;
use crate::{AnalysisConfig, ConfigError};

/// Name of the per-directory config file that overrides the platform one.
pub const LOCAL_CONFIG_FILE: &str = ".citematch.toml";

/// On-disk TOML configuration.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub matching: Option<MatchingConfig>,
    pub suggestions: Option<SuggestionsConfig>,
    pub verification: Option<VerificationConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchingConfig {
    pub accept_threshold: Option<f64>,
    pub similarity_threshold: Option<f64>,
    pub multi_author_ratio: Option<f64>,
    pub references_heading_regex: Option<String>,
    pub footnotes_heading_regex: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuggestionsConfig {
    pub hidden_max_candidates: Option<usize>,
    pub missing_max_candidates: Option<usize>,
    pub context_radius: Option<usize>,
    pub lenient_max_candidates: Option<usize>,
    pub lenient_accept_score: Option<f64>,
    pub max_title_words: Option<usize>,
    /// Appended to the built-in noise markers.
    pub extra_noise_markers: Option<Vec<String>>,
    /// Appended to the built-in stopwords.
    pub extra_stopwords: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerificationConfig {
    pub mailto: Option<String>,
    pub s2_api_key: Option<String>,
    pub timeout_secs: Option<u64>,
    pub disabled: Option<Vec<String>>,
}

/// Platform config file: `<config_dir>/citematch/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("citematch").join("config.toml"))
}

/// Load config by cascading CWD `.citematch.toml` over the platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(LOCAL_CONFIG_FILE));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Read a config file, treating a missing or malformed file as absent.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    match read_config(path) {
        Ok(config) => Some(config),
        Err(ConfigError::Io(_)) => None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring invalid config file");
            None
        }
    }
}

/// Read a config file, reporting every failure.
pub fn read_config(path: &Path) -> Result<ConfigFile, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Overlay value if set, else base value.
fn pick<S, T>(overlay: &Option<S>, base: &Option<S>, field: impl Fn(&S) -> Option<T>) -> Option<T> {
    overlay
        .as_ref()
        .and_then(&field)
        .or_else(|| base.as_ref().and_then(&field))
}

/// Merge two configs field by field; `overlay` wins where both are set.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let (bm, om) = (&base.matching, &overlay.matching);
    let (bs, os) = (&base.suggestions, &overlay.suggestions);
    let (bv, ov) = (&base.verification, &overlay.verification);

    ConfigFile {
        matching: Some(MatchingConfig {
            accept_threshold: pick(om, bm, |m| m.accept_threshold),
            similarity_threshold: pick(om, bm, |m| m.similarity_threshold),
            multi_author_ratio: pick(om, bm, |m| m.multi_author_ratio),
            references_heading_regex: pick(om, bm, |m| m.references_heading_regex.clone()),
            footnotes_heading_regex: pick(om, bm, |m| m.footnotes_heading_regex.clone()),
        }),
        suggestions: Some(SuggestionsConfig {
            hidden_max_candidates: pick(os, bs, |s| s.hidden_max_candidates),
            missing_max_candidates: pick(os, bs, |s| s.missing_max_candidates),
            context_radius: pick(os, bs, |s| s.context_radius),
            lenient_max_candidates: pick(os, bs, |s| s.lenient_max_candidates),
            lenient_accept_score: pick(os, bs, |s| s.lenient_accept_score),
            max_title_words: pick(os, bs, |s| s.max_title_words),
            extra_noise_markers: pick(os, bs, |s| s.extra_noise_markers.clone()),
            extra_stopwords: pick(os, bs, |s| s.extra_stopwords.clone()),
        }),
        verification: Some(VerificationConfig {
            mailto: pick(ov, bv, |v| v.mailto.clone()),
            s2_api_key: pick(ov, bv, |v| v.s2_api_key.clone()),
            timeout_secs: pick(ov, bv, |v| v.timeout_secs),
            disabled: pick(ov, bv, |v| v.disabled.clone()),
        }),
    }
}

impl ConfigFile {
    /// Builder seeded with every analysis setting present in this file.
    pub fn analysis_builder(&self) -> AnalysisConfigBuilder {
        let mut builder = AnalysisConfigBuilder::new();

        if let Some(m) = &self.matching {
            if let Some(v) = m.accept_threshold {
                builder = builder.accept_threshold(v);
            }
            if let Some(v) = m.similarity_threshold {
                builder = builder.similarity_threshold(v);
            }
            if let Some(v) = m.multi_author_ratio {
                builder = builder.multi_author_ratio(v);
            }
            if let Some(p) = &m.references_heading_regex {
                builder = builder.references_heading_regex(p);
            }
            if let Some(p) = &m.footnotes_heading_regex {
                builder = builder.footnotes_heading_regex(p);
            }
        }

        if let Some(s) = &self.suggestions {
            if let Some(n) = s.hidden_max_candidates {
                builder = builder.hidden_max_candidates(n);
            }
            if let Some(n) = s.missing_max_candidates {
                builder = builder.missing_max_candidates(n);
            }
            if let Some(n) = s.context_radius {
                builder = builder.context_radius(n);
            }
            if let Some(n) = s.lenient_max_candidates {
                builder = builder.lenient_max_candidates(n);
            }
            if let Some(v) = s.lenient_accept_score {
                builder = builder.lenient_accept_score(v);
            }
            if let Some(n) = s.max_title_words {
                builder = builder.max_title_words(n);
            }
            for marker in s.extra_noise_markers.iter().flatten() {
                builder = builder.add_noise_marker(marker.clone());
            }
            for word in s.extra_stopwords.iter().flatten() {
                builder = builder.add_stopword(word.clone());
            }
        }

        builder
    }

    pub fn analysis_config(&self) -> Result<AnalysisConfig, ConfigError> {
        Ok(self.analysis_builder().build()?)
    }

    pub fn verify_config(&self) -> VerifyConfig {
        let mut config = VerifyConfig::default();
        if let Some(v) = &self.verification {
            config.mailto = v.mailto.clone();
            config.s2_api_key = v.s2_api_key.clone();
            if let Some(secs) = v.timeout_secs {
                config.timeout = Duration::from_secs(secs);
            }
            config.disabled_sources = v.disabled.clone().unwrap_or_default();
        }
        config
    }
}

/// Write `config` to `path`, creating parent directories.
pub fn save_config_to(config: &ConfigFile, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_deserializes() {
        let parsed: ConfigFile =
            toml::from_str("[matching]\naccept_threshold = 80.0\n").unwrap();
        let m = parsed.matching.unwrap();
        assert_eq!(m.accept_threshold, Some(80.0));
        assert!(m.similarity_threshold.is_none());
        assert!(parsed.suggestions.is_none());
    }

    #[test]
    fn merge_overlay_wins() {
        let base = ConfigFile {
            matching: Some(MatchingConfig {
                accept_threshold: Some(60.0),
                similarity_threshold: Some(0.8),
                ..Default::default()
            }),
            ..Default::default()
        };
        let overlay = ConfigFile {
            matching: Some(MatchingConfig {
                accept_threshold: Some(75.0),
                ..Default::default()
            }),
            ..Default::default()
        };
        let merged = merge(base, overlay);
        let m = merged.matching.unwrap();
        assert_eq!(m.accept_threshold, Some(75.0));
        assert_eq!(m.similarity_threshold, Some(0.8));
    }

    #[test]
    fn merge_base_preserved_when_overlay_absent() {
        let base = ConfigFile {
            verification: Some(VerificationConfig {
                mailto: Some("me@example.org".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let merged = merge(base, ConfigFile::default());
        assert_eq!(
            merged.verification.unwrap().mailto.as_deref(),
            Some("me@example.org")
        );
    }

    #[test]
    fn analysis_config_from_file() {
        let parsed: ConfigFile = toml::from_str(
            "[matching]\naccept_threshold = 85.0\n\n[suggestions]\ncontext_radius = 40\nextra_stopwords = [\"study\"]\n",
        )
        .unwrap();
        let config = parsed.analysis_config().unwrap();
        assert_eq!(config.accept_threshold(), 85.0);
        assert_eq!(config.context_radius, 40);
        assert!(config.stopwords().contains(&"study".to_string()));
        assert!(config.stopwords().contains(&"the".to_string()));
    }

    #[test]
    fn invalid_heading_regex_is_reported() {
        let parsed: ConfigFile =
            toml::from_str("[matching]\nreferences_heading_regex = \"(\"\n").unwrap();
        assert!(matches!(parsed.analysis_config(), Err(ConfigError::Regex(_))));
    }

    #[test]
    fn verify_config_from_file() {
        let parsed: ConfigFile = toml::from_str(
            "[verification]\ntimeout_secs = 3\ndisabled = [\"PubMed\"]\n",
        )
        .unwrap();
        let v = parsed.verify_config();
        assert_eq!(v.timeout, Duration::from_secs(3));
        assert_eq!(v.disabled_sources, vec!["PubMed"]);
    }

    #[test]
    fn save_and_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = ConfigFile {
            suggestions: Some(SuggestionsConfig {
                hidden_max_candidates: Some(2),
                ..Default::default()
            }),
            ..Default::default()
        };
        save_config_to(&config, &path).unwrap();
        assert_eq!(read_config(&path).unwrap(), config);
    }

    #[test]
    fn malformed_file_is_ignored_by_cascade() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "matching = [[[").unwrap();
        assert!(load_from_path(&path).is_none());
        assert!(matches!(read_config(&path), Err(ConfigError::Toml(_))));
        assert!(load_from_path(&dir.path().join("absent.toml")).is_none());
    }
}
