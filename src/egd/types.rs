use chrono::{DateTime, Utc};

/// One quarter-hour metering record, already converted to energy
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    /// Interval timestamp (UTC)
    pub timestamp: DateTime<Utc>,

    /// Energy for the interval in kWh; `None` when the meter reported no value
    pub value: Option<f64>,

    /// Upstream status code for the record
    pub status: String,
}

impl Measurement {
    /// Whether this record may be counted towards a billing-grade total
    pub fn is_valid(&self) -> bool {
        self.value.is_some() && self.status == super::STATUS_VALID
    }
}

/// Cached OAuth2 access token, replaced wholesale on refresh
#[derive(Debug, Clone)]
pub struct Token {
    /// Bearer token value
    pub access_token: String,

    /// Expiry instant; the token is valid strictly before this
    pub expires_at: DateTime<Utc>,
}

impl Token {
    /// Whether the token is still usable at `now`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn measurement_validity() {
        let ts = Utc::now();
        let valid = Measurement {
            timestamp: ts,
            value: Some(0.125),
            status: super::super::STATUS_VALID.to_string(),
        };
        assert!(valid.is_valid());

        let wrong_status = Measurement {
            timestamp: ts,
            value: Some(0.125),
            status: "IU014".to_string(),
        };
        assert!(!wrong_status.is_valid());

        let missing_value = Measurement {
            timestamp: ts,
            value: None,
            status: super::super::STATUS_VALID.to_string(),
        };
        assert!(!missing_value.is_valid());
    }

    #[test]
    fn token_validity_window() {
        let now = Utc::now();
        let token = Token {
            access_token: "abc".to_string(),
            expires_at: now + Duration::seconds(60),
        };
        assert!(token.is_valid_at(now));
        assert!(!token.is_valid_at(now + Duration::seconds(61)));
        // Expiry itself is already invalid
        assert!(!token.is_valid_at(token.expires_at));
    }
}
