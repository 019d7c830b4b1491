//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// First error as a `ConfigError`, if any.
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(error) => Err(ConfigError::InvalidValue {
                field: error.path,
                message: error.message,
            }),
            None => Ok(self.warnings),
        }
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_storage(config, &mut result);
        Self::validate_queue(config, &mut result);
        Self::validate_crawler(config, &mut result);
        Self::validate_api(config, &mut result);

        result
    }

    fn validate_storage(config: &Config, result: &mut ValidationResult) {
        let storage = &config.storage;
        if storage.data_dir.as_os_str().is_empty() {
            result.add_error(ValidationError::new("storage.data_dir", "data_dir cannot be empty"));
        }

        for (path, name) in [
            ("storage.crawl_queue", &storage.crawl_queue),
            ("storage.store_queue", &storage.store_queue),
        ] {
            if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
                result.add_error(ValidationError::new(
                    path,
                    format!("'{}' is not a valid queue name", name),
                ));
            }
        }

        if storage.crawl_queue == storage.store_queue {
            result.add_error(ValidationError::new(
                "storage.store_queue",
                "store queue must differ from crawl queue",
            ));
        }
    }

    fn validate_queue(config: &Config, result: &mut ValidationResult) {
        if config.queue.lease_timeout_secs <= 0 {
            result.add_error(ValidationError::new(
                "queue.lease_timeout_secs",
                "lease_timeout_secs must be greater than 0",
            ));
        }

        if config.queue.sweep_interval_ms == 0 {
            result.add_error(ValidationError::new(
                "queue.sweep_interval_ms",
                "sweep_interval_ms must be greater than 0",
            ));
        }

        if config.queue.lease_timeout_secs > 0
            && config.queue.sweep_interval_ms / 1000 > config.queue.lease_timeout_secs as u64
        {
            result.add_warning(ValidationWarning::new(
                "queue.sweep_interval_ms",
                "sweep interval exceeds the lease timeout, expired tasks will wait for the next sweep",
            ));
        }
    }

    fn validate_crawler(config: &Config, result: &mut ValidationResult) {
        let crawler = &config.crawler;
        if crawler.workers == 0 {
            result.add_warning(ValidationWarning::new(
                "crawler.workers",
                "no workers configured, the node will only serve the API",
            ));
        }

        if crawler.idle_min_secs > crawler.idle_max_secs {
            result.add_error(ValidationError::new(
                "crawler.idle_min_secs",
                "idle_min_secs must not exceed idle_max_secs",
            ));
        }

        if crawler.fetch.timeout_secs == 0 {
            result.add_error(ValidationError::new(
                "crawler.fetch.timeout_secs",
                "timeout_secs must be greater than 0",
            ));
        }

        if let Some(proxy) = &crawler.fetch.proxy {
            let known = ["http://", "https://"];
            if !known.iter().any(|scheme| proxy.starts_with(scheme)) {
                result.add_error(ValidationError::new(
                    "crawler.fetch.proxy",
                    "proxy must be an http:// or https:// URL",
                ));
            }
        }

        if !crawler.conf_dir.exists() {
            result.add_warning(ValidationWarning::new(
                "crawler.conf_dir",
                format!("conf_dir does not exist: {:?}", crawler.conf_dir),
            ));
        }
    }

    fn validate_api(config: &Config, result: &mut ValidationResult) {
        if !config.api.enabled {
            return;
        }
        if config.api.port == 0 {
            result.add_error(ValidationError::new("api.port", "Port cannot be 0"));
        }
        if config.api.host.is_empty() {
            result.add_error(ValidationError::new("api.host", "Host cannot be empty"));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
