use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads, parses and validates a job configuration file
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text
pub(crate) fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let mut config: Config = toml::from_str(content)?;
    config.crawl.start_url = config.crawl.start_url.trim().to_string();
    config.output.output_format = config.output.output_format.trim().to_lowercase();

    validate(&config)?;

    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at job start so a report can be tied back to the exact job file.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read(path)?;
    Ok(hex::encode(Sha256::digest(&content)))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_full_config() {
        let config_content = r#"
[crawl]
start-url = "  https://example.com/  "
max-depth = 2
page-limit = 50
allowed-domains = ["example.com"]
respect-robots = false

[fetch]
rate-limit = 0.5
request-timeout = 10
max-retries = 1
dynamic-fallback = false
user-agents = ["TestAgent/1.0"]

[output]
output-dir = "./out"
output-format = "JSONL"
save-raw-html = false
download-images = false
min-image-size = 32
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawl.start_url, "https://example.com/");
        assert_eq!(config.crawl.max_depth, 2);
        assert_eq!(config.crawl.page_limit, 50);
        assert!(!config.crawl.respect_robots);
        assert_eq!(config.fetch.rate_limit, 0.5);
        assert_eq!(config.fetch.user_agents, vec!["TestAgent/1.0".to_string()]);
        assert_eq!(config.output.output_format, "jsonl");
        assert_eq!(config.output.min_image_size, 32);
    }

    #[test]
    fn test_load_minimal_config_uses_defaults() {
        let file = create_temp_config("[crawl]\nstart-url = \"https://example.com/\"\n");
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawl.max_depth, 3);
        assert!(config.fetch.dynamic_fallback);
        assert_eq!(config.output.output_dir, "site_dataset");
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/job.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let file = create_temp_config(
            "[crawl]\nstart-url = \"https://example.com/\"\nmax-depth = 0\n",
        );
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_config_hash_is_stable() {
        let file = create_temp_config("[crawl]\nstart-url = \"https://example.com/\"\n");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let (_, hash2) = load_config_with_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }
}
