//! Join request validation.

use std::time::Duration;

use crate::error::{JoinError, JoinResult};

/// Message returned when a required parameter is absent or empty.
pub const MISSING_PARAMETERS: &str = "Missing required parameters (service, host, port)";

/// A validated join request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    /// Service name; also the runtime label replicas are discovered by.
    pub service: String,
    /// Host the router matches on.
    pub host: String,
    /// Port the replicas listen on. Not checked for reachability.
    pub port: String,
    /// Drain grace period. `None` means the controller's default.
    pub delay: Option<Duration>,
}

impl JoinRequest {
    /// Validate raw request parameters.
    ///
    /// `service`, `host` and `port` must be present and non-empty.
    /// `update_delay`, if present and non-empty, must be a non-negative
    /// whole number of minutes.
    pub fn parse(
        service: Option<&str>,
        host: Option<&str>,
        port: Option<&str>,
        update_delay: Option<&str>,
    ) -> JoinResult<Self> {
        let (service, host, port) = match (non_empty(service), non_empty(host), non_empty(port)) {
            (Some(s), Some(h), Some(p)) => (s, h, p),
            _ => return Err(JoinError::Validation(MISSING_PARAMETERS.to_string())),
        };

        let delay = match non_empty(update_delay) {
            Some(raw) => Some(parse_delay_minutes(raw)?),
            None => None,
        };

        Ok(Self {
            service: service.to_string(),
            host: host.to_string(),
            port: port.to_string(),
            delay,
        })
    }
}

/// Parse a delay given in whole minutes.
pub fn parse_delay_minutes(raw: &str) -> JoinResult<Duration> {
    let invalid = || {
        JoinError::Validation(format!(
            "Invalid updateDelay {raw:?}: expected a non-negative number of minutes"
        ))
    };
    let minutes: u64 = raw.trim().parse().map_err(|_| invalid())?;
    let secs = minutes.checked_mul(60).ok_or_else(invalid)?;
    Ok(Duration::from_secs(secs))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_complete_request() {
        let req = JoinRequest::parse(Some("web"), Some("web.example.com"), Some("8080"), None).unwrap();
        assert_eq!(req.service, "web");
        assert_eq!(req.host, "web.example.com");
        assert_eq!(req.port, "8080");
        assert_eq!(req.delay, None);
    }

    #[test]
    fn missing_or_empty_parameters_rejected() {
        let cases = [
            (None, Some("h"), Some("1")),
            (Some("s"), None, Some("1")),
            (Some("s"), Some("h"), None),
            (Some(""), Some("h"), Some("1")),
            (Some("s"), Some(""), Some("1")),
            (Some("s"), Some("h"), Some("")),
        ];
        for (service, host, port) in cases {
            let err = JoinRequest::parse(service, host, port, None).unwrap_err();
            match err {
                JoinError::Validation(msg) => assert_eq!(msg, MISSING_PARAMETERS),
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn delay_in_minutes() {
        let req = JoinRequest::parse(Some("s"), Some("h"), Some("1"), Some("2")).unwrap();
        assert_eq!(req.delay, Some(Duration::from_secs(120)));

        let req = JoinRequest::parse(Some("s"), Some("h"), Some("1"), Some("0")).unwrap();
        assert_eq!(req.delay, Some(Duration::ZERO));
    }

    #[test]
    fn empty_delay_means_default() {
        let req = JoinRequest::parse(Some("s"), Some("h"), Some("1"), Some("")).unwrap();
        assert_eq!(req.delay, None);
    }

    #[test]
    fn invalid_delay_rejected() {
        for raw in ["-1", "five", "1.5", "99999999999999999999"] {
            let err = JoinRequest::parse(Some("s"), Some("h"), Some("1"), Some(raw)).unwrap_err();
            assert!(matches!(err, JoinError::Validation(_)), "{raw} should be rejected");
        }
    }

    #[test]
    fn overflowing_delay_rejected() {
        let raw = (u64::MAX / 60 + 1).to_string();
        assert!(parse_delay_minutes(&raw).is_err());
    }
}
