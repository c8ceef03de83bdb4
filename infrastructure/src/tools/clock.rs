//! Clock tool: time_now

use chrono::{SecondsFormat, Utc};
use ragops_application::{HostTool, HostToolError};
use ragops_domain::ParameterSchema;
use serde_json::{Value, json};

pub const TIME_NOW: &str = "time_now";

/// Reports the current wall-clock time.
pub struct TimeNowTool;

impl HostTool for TimeNowTool {
    fn name(&self) -> &str {
        TIME_NOW
    }

    fn description(&self) -> &str {
        "Get the current date and time in UTC, as RFC 3339 and a Unix timestamp"
    }

    fn parameters(&self) -> ParameterSchema {
        ParameterSchema::empty()
    }

    fn call(&self, _arguments: &Value) -> Result<Value, HostToolError> {
        let now = Utc::now();
        Ok(json!({
            "utc": now.to_rfc3339_opts(SecondsFormat::Secs, true),
            "unix": now.timestamp(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_now_reports_utc_and_unix() {
        let result = TimeNowTool.call(&json!({})).unwrap();

        assert!(result["utc"].as_str().unwrap().ends_with('Z'));
        assert!(result["unix"].as_i64().unwrap() > 1_700_000_000);
    }

    #[test]
    fn test_time_now_takes_no_parameters() {
        let schema = TimeNowTool.parameters();

        assert!(schema.validate(&json!({})).is_ok());
        assert!(schema.validate(&json!({"zone": "UTC"})).is_err());
    }
}
