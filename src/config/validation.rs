use crate::config::types::{
    Config, CrawlerConfig, OutputConfig, PageConfig, SessionConfig, SiteConfig, ID_PLACEHOLDER,
    PROJECT_PLACEHOLDER,
};
use crate::ConfigError;
use url::Url;

/// Longest accepted page wait (seconds)
const MAX_WAIT_TIMEOUT_SECS: u64 = 600;

/// Shortest accepted poll interval (milliseconds)
const MIN_POLL_INTERVAL_MS: u64 = 10;

/// Longest accepted throttle delay (milliseconds)
const MAX_THROTTLE_DELAY_MS: u64 = 60_000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_page_config(&config.page)?;
    validate_session_config(&config.session)?;
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    Ok(())
}

fn require_non_empty(value: &str, name: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
    }
    Ok(())
}

fn require_placeholder(template: &str, placeholder: &str, name: &str) -> Result<(), ConfigError> {
    require_non_empty(template, name)?;
    if !template.contains(placeholder) {
        return Err(ConfigError::Validation(format!(
            "{} must contain the {} placeholder, got '{}'",
            name, placeholder, template
        )));
    }
    Ok(())
}

/// Validates remote addressing
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let host = Url::parse(&config.host)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid host '{}': {}", config.host, e)))?;

    if host.scheme() != "http" && host.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "host '{}' must use http or https",
            config.host
        )));
    }

    require_non_empty(&config.project_id, "project_id")?;
    require_non_empty(&config.root_tracker_name, "root_tracker_name")?;
    require_placeholder(
        &config.tracker_home_tree_url,
        PROJECT_PLACEHOLDER,
        "tracker_home_tree_url",
    )?;
    require_placeholder(&config.tracker_page_url, ID_PLACEHOLDER, "tracker_page_url")?;
    require_non_empty(&config.tree_ajax_url, "tree_ajax_url")?;
    require_placeholder(&config.issue_page_url, ID_PLACEHOLDER, "issue_page_url")?;

    if let Some(icon) = &config.tracker_icon {
        require_non_empty(icon, "tracker_icon")?;
    }

    Ok(())
}

/// Validates in-page lookups and wait bounds
fn validate_page_config(config: &PageConfig) -> Result<(), ConfigError> {
    require_non_empty(&config.tree_config_expression, "tree_config_expression")?;
    require_non_empty(&config.issue_content_selector, "issue_content_selector")?;

    if config.wait_timeout < 1 || config.wait_timeout > MAX_WAIT_TIMEOUT_SECS {
        return Err(ConfigError::Validation(format!(
            "wait_timeout must be between 1 and {} seconds, got {}",
            MAX_WAIT_TIMEOUT_SECS, config.wait_timeout
        )));
    }

    if config.poll_interval < MIN_POLL_INTERVAL_MS {
        return Err(ConfigError::Validation(format!(
            "poll_interval must be >= {}ms, got {}ms",
            MIN_POLL_INTERVAL_MS, config.poll_interval
        )));
    }

    if config.poll_interval() > config.wait_timeout() {
        return Err(ConfigError::Validation(format!(
            "poll_interval ({}ms) cannot exceed wait_timeout ({}s)",
            config.poll_interval, config.wait_timeout
        )));
    }

    Ok(())
}

/// Validates authentication settings
fn validate_session_config(config: &SessionConfig) -> Result<(), ConfigError> {
    if config.csrf {
        require_non_empty(&config.csrf_token_expression, "csrf_token_expression")?;
    }

    if let Some(agent) = &config.user_agent {
        require_non_empty(agent, "user_agent")?;
    }

    Ok(())
}

/// Validates crawl pacing
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.throttle_delay > MAX_THROTTLE_DELAY_MS {
        return Err(ConfigError::Validation(format!(
            "throttle_delay must be <= {}ms, got {}ms",
            MAX_THROTTLE_DELAY_MS, config.throttle_delay
        )));
    }
    if let Some(tracker) = &config.only_tracker {
        require_non_empty(tracker, "only_tracker")?;
    }
    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    require_non_empty(&config.directory, "output directory")?;
    require_non_empty(&config.database_path, "database_path")?;
    require_non_empty(&config.summary_path, "summary_path")?;
    Ok(())
}
