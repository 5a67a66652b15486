use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use tracker_atlas::config::load_config;
///
/// let config = load_config(Path::new("atlas.toml")).unwrap();
/// println!("Root tracker: {}", config.site.root_tracker_name);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Recorded with every run so the ledger shows which settings produced it.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(hash_content(&content))
}

fn hash_content(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Loads a configuration and returns both the config and its hash
///
/// The file is read once, so the hash always matches the parsed settings.
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    Ok((config, hash_content(&content)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const VALID_CONFIG: &str = r##"
[site]
host = "https://cb.example.com"
project-id = "119"
root-tracker-name = "Software Requirements"
tracker-home-tree-url = "/cb/ajax/getTrackerHomePageTree.spr?proj_id={project}"
tracker-page-url = "/cb/tracker/{id}"
tree-ajax-url = "/cb/trackers/ajax/tree.spr"
issue-page-url = "/cb/issue/{id}"
tracker-icon = "/cb/displayDocument?doc_id=30320010"

[page]
issue-content-selector = "#issueDescription"
wait-timeout = 5

[session]
csrf = true
csrf-token-expression = 'window.ajaxHeaders["X-CSRF-TOKEN"]'

[crawler]
throttle-delay = 250
only-tracker = "4410"

[complexity]
marker = "Detailed Specification"

[output]
directory = "./out"
database-path = "./atlas.db"
summary-path = "./summary.md"
"##;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let file = create_temp_config(VALID_CONFIG);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.site.project_id, "119");
        assert_eq!(
            config.site.tracker_icon.as_deref(),
            Some("/cb/displayDocument?doc_id=30320010")
        );
        assert_eq!(config.page.tree_config_expression, "tree.config.data");
        assert_eq!(config.page.wait_timeout, 5);
        assert_eq!(config.page.poll_interval, 100);
        assert!(config.session.csrf);
        assert_eq!(config.crawler.throttle_delay, 250);
        assert_eq!(config.crawler.only_tracker.as_deref(), Some("4410"));
        assert_eq!(
            config.complexity.marker.as_deref(),
            Some("Detailed Specification")
        );
    }

    #[test]
    fn test_optional_sections_default() {
        let content = VALID_CONFIG
            .split("[session]")
            .next()
            .unwrap()
            .to_string()
            + "[output]\ndirectory = \"o\"\ndatabase-path = \"a.db\"\nsummary-path = \"s.md\"\n";
        let config = parse_config(&content).unwrap();
        assert!(!config.session.csrf);
        assert_eq!(config.crawler.throttle_delay, 500);
        assert!(config.crawler.only_tracker.is_none());
        assert!(config.complexity.marker.is_none());
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/atlas.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_required_option() {
        let content = VALID_CONFIG.replace("project-id = \"119\"\n", "");
        assert!(matches!(parse_config(&content), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let content = VALID_CONFIG.replace("throttle-delay = 250", "throttle-delay = 90000");
        let file = create_temp_config(&content);
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_hash_matches_loaded_content() {
        let file = create_temp_config(VALID_CONFIG);
        let (_, hash) = load_config_with_hash(file.path()).unwrap();
        assert_eq!(hash, compute_config_hash(file.path()).unwrap());

        let other = create_temp_config(&VALID_CONFIG.replace("250", "300"));
        assert_ne!(hash, compute_config_hash(other.path()).unwrap());
    }
}
