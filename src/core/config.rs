use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_input")]
    pub input_folder: String,

    #[serde(default = "default_output")]
    pub output_folder: String,

    #[serde(default = "default_build")]
    pub build_folder: String,

    #[serde(default)]
    pub unattended: bool,

    /// Forces the story language instead of detecting it from the text.
    /// Accepts "zh", "en", "ja", "ko".
    #[serde(default)]
    pub language: Option<String>,

    /// Extra themes to emphasize, applied to every story in the batch.
    #[serde(default)]
    pub keywords: Vec<String>,

    #[serde(default)]
    pub gemini: GeminiConfig,

    #[serde(default = "default_image_concurrency")]
    pub image_concurrency: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,

    #[serde(default = "default_story_model")]
    pub story_model: String,

    #[serde(default = "default_prompt_model")]
    pub prompt_model: String,

    #[serde(default = "default_image_model")]
    pub image_model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            story_model: default_story_model(),
            prompt_model: default_prompt_model(),
            image_model: default_image_model(),
        }
    }
}

fn default_input() -> String {
    "input".to_string()
}
fn default_output() -> String {
    "output".to_string()
}
fn default_build() -> String {
    "build".to_string()
}
fn default_story_model() -> String {
    "gemini-2.5-flash".to_string()
}
fn default_prompt_model() -> String {
    "gemini-2.0-flash".to_string()
}
fn default_image_model() -> String {
    "gemini-2.5-flash-image".to_string()
}
fn default_image_concurrency() -> usize {
    3
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Path::new("config.yml");
        if !path.exists() {
            anyhow::bail!("config.yml not found. Please create one.");
        }

        let content = fs::read_to_string(path).context("Failed to read config.yml")?;
        let config: Config =
            serde_yaml_ng::from_str(&content).context("Failed to parse config.yml")?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let content = serde_yaml_ng::to_string(self)?;
        fs::write("config.yml", content).context("Failed to write config.yml")?;
        Ok(())
    }

    pub fn ensure_directories(&self) -> Result<()> {
        fs::create_dir_all(&self.input_folder)?;
        fs::create_dir_all(&self.output_folder)?;
        fs::create_dir_all(&self.build_folder)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let yaml = "gemini:\n  api_key: test-key\n";
        let config: Config = serde_yaml_ng::from_str(yaml).unwrap();

        assert_eq!(config.input_folder, "input");
        assert_eq!(config.output_folder, "output");
        assert_eq!(config.build_folder, "build");
        assert!(!config.unattended);
        assert_eq!(config.gemini.api_key.as_deref(), Some("test-key"));
        assert_eq!(config.gemini.story_model, "gemini-2.5-flash");
        assert_eq!(config.gemini.prompt_model, "gemini-2.0-flash");
        assert_eq!(config.gemini.image_model, "gemini-2.5-flash-image");
        assert_eq!(config.image_concurrency, 3);
        assert!(config.keywords.is_empty());
        assert!(config.language.is_none());
    }

    #[test]
    fn test_full_config_roundtrip() {
        let yaml = r#"
input_folder: stories
output_folder: comics
build_folder: cache
unattended: true
language: zh
keywords: ["friendship", "robots"]
gemini:
  api_key: abc
  story_model: custom-story
  prompt_model: custom-prompt
  image_model: custom-image
image_concurrency: 5
"#;
        let config: Config = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.language.as_deref(), Some("zh"));
        assert_eq!(config.keywords, vec!["friendship", "robots"]);
        assert_eq!(config.image_concurrency, 5);

        let dumped = serde_yaml_ng::to_string(&config).unwrap();
        let reparsed: Config = serde_yaml_ng::from_str(&dumped).unwrap();
        assert_eq!(reparsed.gemini.story_model, "custom-story");
        assert!(reparsed.unattended);
    }
}
