use streamhub_api::{ClientConfig, HubError};

/// Load client configuration from a TOML file.
pub fn load(path: &str) -> Result<ClientConfig, HubError> {
    let content =
        std::fs::read_to_string(path).map_err(|e| HubError::Config(format!("{path}: {e}")))?;
    parse(&content).map_err(|e| e.with_context(path))
}

/// Parse client configuration from a TOML string. Missing keys take their defaults.
pub fn parse(toml_str: &str) -> Result<ClientConfig, HubError> {
    let config: ClientConfig =
        toml::from_str(toml_str).map_err(|e| HubError::Config(e.to_string()))?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &ClientConfig) -> Result<(), HubError> {
    if config.max_put_records == 0 {
        return Err(HubError::Config("max_put_records must be at least 1".into()));
    }
    if config.max_get_records == 0 {
        return Err(HubError::Config("max_get_records must be at least 1".into()));
    }
    if config.ready_poll_interval_ms == 0 {
        return Err(HubError::Config("ready_poll_interval_ms must be positive".into()));
    }
    Ok(())
}
