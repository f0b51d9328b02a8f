use crate::config::types::{AuthConfig, CrawlConfig, CrawlerConfig, FetchConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &CrawlConfig) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_auth_config(&config.auth)?;
    validate_fetch_config(&config.fetch)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    // max_depth >= 0 is always true for u32, so no check needed

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.concurrency < 1 || config.concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 100, got {}",
            config.concurrency
        )));
    }

    if config.timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "timeout_ms must be greater than 0".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates authentication settings that can be checked without I/O
///
/// Absent credentials are reported later by the resolver.
fn validate_auth_config(config: &AuthConfig) -> Result<(), ConfigError> {
    if let AuthConfig::FormLogin { login_url, .. } = config {
        let url = Url::parse(login_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid login_url: {}", e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(format!(
                "login_url '{}' must use http or https",
                login_url
            )));
        }
    }

    Ok(())
}

/// Validates fetch strategy settings
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    match config {
        FetchConfig::DirectHttp => Ok(()),
        FetchConfig::HeadlessBrowser { screenshot_dir, .. } => {
            if screenshot_dir.is_empty() {
                return Err(ConfigError::Validation(
                    "screenshot_dir cannot be empty".to_string(),
                ));
            }
            Ok(())
        }
        FetchConfig::ExternalProcess { program } => {
            if program.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "external process program cannot be empty".to_string(),
                ));
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(crawler: CrawlerConfig) -> CrawlConfig {
        CrawlConfig {
            crawler,
            auth: AuthConfig::None,
            fetch: FetchConfig::DirectHttp,
            output: Default::default(),
        }
    }

    #[test]
    fn test_default_crawler_config_is_valid() {
        assert!(validate(&config_with(CrawlerConfig::default())).is_ok());
    }

    #[test]
    fn test_concurrency_bounds() {
        let mut crawler = CrawlerConfig::default();
        crawler.concurrency = 0;
        assert!(validate(&config_with(crawler.clone())).is_err());

        crawler.concurrency = 101;
        assert!(validate(&config_with(crawler.clone())).is_err());

        crawler.concurrency = 100;
        assert!(validate(&config_with(crawler)).is_ok());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut crawler = CrawlerConfig::default();
        crawler.timeout_ms = 0;
        assert!(matches!(
            validate(&config_with(crawler)),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_blank_user_agent_rejected() {
        let mut crawler = CrawlerConfig::default();
        crawler.user_agent = "   ".to_string();
        assert!(validate(&config_with(crawler)).is_err());
    }

    #[test]
    fn test_login_url_must_be_http() {
        let mut config = config_with(CrawlerConfig::default());
        config.auth = AuthConfig::FormLogin {
            login_url: "ftp://example.com/login".to_string(),
            login_data: Default::default(),
        };
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));

        config.auth = AuthConfig::FormLogin {
            login_url: "not a url".to_string(),
            login_data: Default::default(),
        };
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_missing_credentials_are_not_a_config_error() {
        let mut config = config_with(CrawlerConfig::default());
        config.auth = AuthConfig::Basic {
            username: Some("user".to_string()),
            password: None,
        };
        assert!(validate(&config).is_ok());
    }
}
