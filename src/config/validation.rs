use thiserror::Error;
use url::Url;

use super::models::Config;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("downloads.max_concurrent must be at least 1")]
    ZeroConcurrency,

    #[error("resolver.endpoint is not a valid http(s) URL: {endpoint}")]
    InvalidResolverEndpoint { endpoint: String },

    #[error("resolver.timeout_secs must be at least 1")]
    ZeroResolverTimeout,

    #[error("downloads.download_dir and downloads.library_dir must differ")]
    OverlappingDirectories,
}

pub fn validate(config: &Config) -> Result<(), ValidationError> {
    if config.downloads.max_concurrent == 0 {
        return Err(ValidationError::ZeroConcurrency);
    }

    if config.resolver.timeout_secs == 0 {
        return Err(ValidationError::ZeroResolverTimeout);
    }

    let endpoint = &config.resolver.endpoint;
    match Url::parse(endpoint) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        _ => {
            return Err(ValidationError::InvalidResolverEndpoint {
                endpoint: endpoint.clone(),
            });
        }
    }

    if config.downloads.download_dir == config.downloads.library_dir {
        return Err(ValidationError::OverlappingDirectories);
    }

    Ok(())
}
