use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::crypto;
use crate::errors::ConfigError;

// AI 服务配置
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct AIConfig {
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default)]
    pub max_tokens: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct SvnConfig {
    /// Name or path of the svn client binary.
    #[serde(default)]
    pub command: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct OnlineConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ReportConfig {
    #[serde(default)]
    pub output_dir: String,
    #[serde(default)]
    pub auto_open: bool,
}

// 应用总体配置
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub ai: AIConfig,

    /// System prompt sent with every review request.
    #[serde(default)]
    pub review_prompt: String,

    #[serde(default)]
    pub svn: SvnConfig,

    /// Paths matching any of these patterns are skipped during scanning.
    #[serde(default)]
    pub ignore: Vec<String>,

    #[serde(default)]
    pub report: ReportConfig,

    /// Saved credentials for online (remote repository) review.
    #[serde(default)]
    pub online: OnlineConfig,
}

impl AppConfig {
    /// Loads the configuration from a YAML file and fills in defaults.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let data =
            fs::read_to_string(path).map_err(|e| ConfigError::FileRead(path.to_string(), e))?;

        let mut cfg: AppConfig = serde_yaml::from_str(&data)
            .map_err(|e| ConfigError::YamlParse(path.to_string(), e))?;

        if cfg.svn.command.is_empty() {
            cfg.svn.command = "svn".to_string();
        }
        if cfg.report.output_dir.is_empty() {
            cfg.report.output_dir = "./reports".to_string();
        }

        debug!(
            "Loaded configuration from {}: provider={}, model={}",
            path, cfg.ai.provider, cfg.ai.model
        );

        Ok(cfg)
    }

    /// Writes the configuration back to a YAML file (used by `online --save`).
    pub fn save(&self, path: &str) -> Result<(), ConfigError> {
        let data = serde_yaml::to_string(self).map_err(ConfigError::YamlSerialize)?;
        fs::write(path, data).map_err(|e| ConfigError::FileWrite(path.to_string(), e))
    }

    /// Returns the API key usable for authentication.
    ///
    /// The `encrypt` subcommand writes a DES ciphertext into the config file;
    /// a key that decrypts cleanly is assumed to be such a ciphertext, anything
    /// else is used verbatim.
    pub fn resolved_api_key(&self) -> String {
        match crypto::decrypt_api_key(&self.ai.api_key) {
            Ok(plain) => {
                debug!("API key decrypted from config ciphertext");
                plain
            }
            Err(_) => self.ai.api_key.clone(),
        }
    }
}

/// Lists config files the GUI offers for loading: `config.yaml` in the current
/// directory plus any `.yaml`/`.yml` files under `config/`.
pub fn list_config_files() -> Vec<String> {
    let mut configs = Vec::new();

    if Path::new("config.yaml").exists() {
        configs.push("config.yaml".to_string());
    }

    if let Ok(entries) = fs::read_dir("config") {
        for entry in entries.flatten() {
            if entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            let lower = name.to_lowercase();
            if lower.ends_with(".yaml") || lower.ends_with(".yml") {
                configs.push(format!("config/{}", name));
            }
        }
    }

    configs
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
ai:
  provider: openai
  api_key: sk-test
  base_url: https://api.openai.com/v1
  model: gpt-4o-mini
  temperature: 0.3
  max_tokens: 4000
review_prompt: "You are a code reviewer."
ignore:
  - target/
  - "*.log"
report:
  output_dir: ./out
  auto_open: true
online:
  url: https://svn.example.com/repo
  username: alice
  password: secret
"#;

    fn write_temp(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_full_config() {
        let file = write_temp(SAMPLE);
        let cfg = AppConfig::load(file.path().to_str().unwrap()).unwrap();

        assert_eq!(cfg.ai.provider, "openai");
        assert_eq!(cfg.ai.model, "gpt-4o-mini");
        assert_eq!(cfg.ai.max_tokens, 4000);
        assert_eq!(cfg.review_prompt, "You are a code reviewer.");
        assert_eq!(cfg.ignore, vec!["target/".to_string(), "*.log".to_string()]);
        assert_eq!(cfg.report.output_dir, "./out");
        assert!(cfg.report.auto_open);
        assert_eq!(cfg.online.username, "alice");
        // Default applied because the sample omits svn.command
        assert_eq!(cfg.svn.command, "svn");
    }

    #[test]
    fn test_load_applies_defaults() {
        let file = write_temp("ai:\n  provider: openai\n");
        let cfg = AppConfig::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(cfg.svn.command, "svn");
        assert_eq!(cfg.report.output_dir, "./reports");
        assert!(!cfg.report.auto_open);
        assert!(cfg.ignore.is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        let err = AppConfig::load("/nonexistent/config.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::FileRead(_, _)));
    }

    #[test]
    fn test_load_invalid_yaml() {
        let file = write_temp("ai: [not\na map");
        let err = AppConfig::load(file.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, ConfigError::YamlParse(_, _)));
    }

    #[test]
    fn test_save_roundtrip() {
        let file = write_temp(SAMPLE);
        let mut cfg = AppConfig::load(file.path().to_str().unwrap()).unwrap();
        cfg.online.url = "https://svn.example.com/other".to_string();

        let out = NamedTempFile::new().unwrap();
        cfg.save(out.path().to_str().unwrap()).unwrap();

        let reloaded = AppConfig::load(out.path().to_str().unwrap()).unwrap();
        assert_eq!(reloaded.online.url, "https://svn.example.com/other");
        assert_eq!(reloaded.ai.model, cfg.ai.model);
    }

    #[test]
    fn test_resolved_api_key_plaintext_passthrough() {
        let cfg = AppConfig {
            ai: AIConfig {
                api_key: "sk-plaintext".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(cfg.resolved_api_key(), "sk-plaintext");
    }

    #[test]
    fn test_resolved_api_key_decrypts_ciphertext() {
        let encrypted = crypto::encrypt_api_key("sk-hidden").unwrap();
        let cfg = AppConfig {
            ai: AIConfig {
                api_key: encrypted,
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(cfg.resolved_api_key(), "sk-hidden");
    }
}
