//! Configuration validation.
//!
//! # Responsibilities
//! - Turn the raw string environment into a typed `AppConfig`
//! - Validate value ranges (port 1–65535, heartbeat interval > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function: RawEnv → Result<AppConfig, Vec<ValidationError>>

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::config::schema::{AppConfig, RawEnv, DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_PORT};

/// A single rejected environment key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{key} is required")]
    Missing { key: &'static str },

    #[error("{key} must not be empty")]
    Empty { key: &'static str },

    #[error("{key} must be an integer, got {value:?}")]
    NotAnInteger { key: &'static str, value: String },

    #[error("{key} must be between {min} and {max}, got {value}")]
    OutOfRange {
        key: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },

    #[error("{key} must be a valid address, got {value:?}")]
    InvalidAddress { key: &'static str, value: String },

    #[error("{key} must be valid Unicode")]
    NotUnicode { key: &'static str },
}

/// Validate a raw environment snapshot.
pub fn validate(raw: &RawEnv) -> Result<AppConfig, Vec<ValidationError>> {
    let mut errors = Vec::new();

    let environment = match raw.node_env.as_deref().map(str::trim) {
        None => {
            errors.push(ValidationError::Missing { key: "NODE_ENV" });
            None
        }
        Some("") => {
            errors.push(ValidationError::Empty { key: "NODE_ENV" });
            None
        }
        Some(value) => Some(value.to_string()),
    };

    let port = match raw.port.as_deref() {
        None => Some(DEFAULT_PORT),
        Some(value) => parse_ranged(&mut errors, "PORT", value, 1, u16::MAX as u64)
            .map(|port| port as u16),
    };

    let host = match raw.host.as_deref().map(str::trim) {
        None | Some("") => Some(AppConfig::default().host),
        Some(value) => match value.parse::<IpAddr>() {
            Ok(ip) => Some(ip),
            Err(_) => {
                errors.push(ValidationError::InvalidAddress {
                    key: "HOST",
                    value: value.to_string(),
                });
                None
            }
        },
    };

    let heartbeat_interval = match raw.heartbeat_interval_ms.as_deref() {
        None => Some(DEFAULT_HEARTBEAT_INTERVAL),
        Some(value) => parse_ranged(&mut errors, "HEARTBEAT_INTERVAL_MS", value, 1, u64::MAX)
            .map(Duration::from_millis),
    };

    let metrics_address = match raw.metrics_address.as_deref().map(str::trim) {
        None | Some("") => Some(None),
        Some(value) => match value.parse::<SocketAddr>() {
            Ok(addr) => Some(Some(addr)),
            Err(_) => {
                errors.push(ValidationError::InvalidAddress {
                    key: "METRICS_ADDRESS",
                    value: value.to_string(),
                });
                None
            }
        },
    };

    match (environment, port, host, heartbeat_interval, metrics_address) {
        (Some(environment), Some(port), Some(host), Some(heartbeat_interval), Some(metrics_address))
            if errors.is_empty() =>
        {
            Ok(AppConfig {
                environment,
                port,
                host,
                heartbeat_interval,
                metrics_address,
            })
        }
        _ => Err(errors),
    }
}

fn parse_ranged(
    errors: &mut Vec<ValidationError>,
    key: &'static str,
    value: &str,
    min: u64,
    max: u64,
) -> Option<u64> {
    let parsed = match value.trim().parse::<u64>() {
        Ok(v) => v,
        Err(_) => {
            errors.push(ValidationError::NotAnInteger {
                key,
                value: value.to_string(),
            });
            return None;
        }
    };

    if parsed < min || parsed > max {
        errors.push(ValidationError::OutOfRange {
            key,
            value: parsed,
            min,
            max,
        });
        return None;
    }

    Some(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(node_env: Option<&str>, port: Option<&str>) -> RawEnv {
        RawEnv {
            node_env: node_env.map(String::from),
            port: port.map(String::from),
            ..RawEnv::default()
        }
    }

    #[test]
    fn accepts_minimal_environment() {
        let config = validate(&raw(Some("test"), Some("4000"))).unwrap();
        assert_eq!(config.environment, "test");
        assert_eq!(config.port, 4000);
        assert_eq!(config.heartbeat_interval, Duration::from_secs(60));
        assert!(config.metrics_address.is_none());
    }

    #[test]
    fn port_defaults_when_absent() {
        let config = validate(&raw(Some("development"), None)).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn missing_node_env_is_rejected() {
        let errors = validate(&raw(None, Some("4000"))).unwrap_err();
        assert_eq!(errors, vec![ValidationError::Missing { key: "NODE_ENV" }]);
    }

    #[test]
    fn blank_node_env_is_rejected() {
        let errors = validate(&raw(Some("   "), None)).unwrap_err();
        assert_eq!(errors, vec![ValidationError::Empty { key: "NODE_ENV" }]);
    }

    #[test]
    fn collects_every_error() {
        let mut env = raw(None, Some("70000"));
        env.heartbeat_interval_ms = Some("soon".into());
        env.host = Some("not-an-ip".into());

        let errors = validate(&env).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::OutOfRange {
            key: "PORT",
            value: 70000,
            min: 1,
            max: 65535,
        }));
        assert!(errors.contains(&ValidationError::NotAnInteger {
            key: "HEARTBEAT_INTERVAL_MS",
            value: "soon".into(),
        }));
    }

    #[test]
    fn port_zero_is_out_of_range() {
        let errors = validate(&raw(Some("test"), Some("0"))).unwrap_err();
        assert!(matches!(errors[0], ValidationError::OutOfRange { key: "PORT", .. }));
    }

    #[test]
    fn zero_heartbeat_interval_is_rejected() {
        let mut env = raw(Some("test"), None);
        env.heartbeat_interval_ms = Some("0".into());
        assert!(validate(&env).is_err());
    }

    #[test]
    fn metrics_address_is_parsed() {
        let mut env = raw(Some("test"), None);
        env.metrics_address = Some("127.0.0.1:9090".into());
        let config = validate(&env).unwrap();
        assert_eq!(config.metrics_address, Some("127.0.0.1:9090".parse().unwrap()));
    }
}
