use crate::core::config::Config;
use crate::core::error::GenerationError;
use anyhow::Result;
use inquire::Password;

/// Resolves the Gemini API credential before any client is built:
/// config file first, then the GEMINI_API_KEY environment variable,
/// then an interactive prompt. Unattended runs fail instead of
/// prompting. The resolved key is written back to the config so core
/// clients can take it as a plain constructor argument.
pub fn run_setup(config: &mut Config) -> Result<()> {
    if config
        .gemini
        .api_key
        .as_deref()
        .map(|k| !k.trim().is_empty())
        .unwrap_or(false)
    {
        return Ok(());
    }

    if let Ok(key) = std::env::var("GEMINI_API_KEY") {
        if !key.trim().is_empty() {
            log::info!("Using Gemini API key from environment");
            config.gemini.api_key = Some(key);
            return Ok(());
        }
    }

    if config.unattended {
        return Err(GenerationError::MissingCredential.into());
    }

    let key = Password::new("Enter your Gemini API key:")
        .without_confirmation()
        .prompt()?;
    if key.trim().is_empty() {
        return Err(GenerationError::MissingCredential.into());
    }

    config.gemini.api_key = Some(key);
    config.save()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::GenerationError;

    fn base_config() -> Config {
        serde_yaml_ng::from_str("unattended: true\n").unwrap()
    }

    #[test]
    fn test_configured_key_is_kept() {
        let mut config = base_config();
        config.gemini.api_key = Some("configured".to_string());
        run_setup(&mut config).unwrap();
        assert_eq!(config.gemini.api_key.as_deref(), Some("configured"));
    }

    #[test]
    fn test_unattended_without_key_fails() {
        let mut config = base_config();
        // Blank configured key counts as absent.
        config.gemini.api_key = Some("   ".to_string());
        std::env::remove_var("GEMINI_API_KEY");

        let err = run_setup(&mut config).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GenerationError>(),
            Some(GenerationError::MissingCredential)
        ));
    }
}
