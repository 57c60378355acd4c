//! Clock Tool
//!
//! Reports the current time in UTC, Beijing time, or any fixed offset.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use serde_json::Value;

use chatloop_core::{ParameterSchema, Tool, ToolArguments, ToolFailure, ToolSchema};

pub const CLOCK_TOOL: &str = "get_current_time";

const BEIJING_OFFSET_SECS: i32 = 8 * 3600;

/// DateTime tool - returns current time
#[derive(Debug, Clone, Copy)]
pub struct ClockTool {
    now: fn() -> DateTime<Utc>,
}

impl Default for ClockTool {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockTool {
    pub fn new() -> Self {
        Self { now: Utc::now }
    }

    /// Clock reading time from `now` instead of the system clock
    pub fn with_source(now: fn() -> DateTime<Utc>) -> Self {
        Self { now }
    }
}

/// Resolve a timezone argument to a fixed offset
fn parse_timezone(raw: &str) -> Option<(FixedOffset, String)> {
    let tz = raw.trim();
    let lower = tz.to_ascii_lowercase();

    match lower.as_str() {
        "" | "utc" | "gmt" | "z" => return Some((FixedOffset::east_opt(0)?, "UTC".into())),
        "asia/shanghai" | "beijing" | "china" | "cst" | "prc" => {
            return Some((FixedOffset::east_opt(BEIJING_OFFSET_SECS)?, "Beijing, UTC+08:00".into()));
        }
        _ => {}
    }

    // "+08:00", "-0530", "UTC+8", "GMT-3"
    let offset = lower
        .strip_prefix("utc")
        .or_else(|| lower.strip_prefix("gmt"))
        .unwrap_or(&lower);
    let (sign, rest) = match offset.chars().next()? {
        '+' => (1, &offset[1..]),
        '-' => (-1, &offset[1..]),
        _ => return None,
    };

    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (two_digits(h)?, two_digits(m)?),
        None if rest.len() == 4 && rest.is_ascii() => (two_digits(&rest[..2])?, two_digits(&rest[2..])?),
        None => (two_digits(rest)?, 0),
    };
    if hours > 14 || minutes >= 60 {
        return None;
    }

    let seconds = i32::try_from(hours * 3600 + minutes * 60).ok()?;
    let fixed = FixedOffset::east_opt(sign * seconds)?;
    Some((fixed, format!("UTC{fixed}")))
}

/// One or two ASCII digits, nothing else
fn two_digits(s: &str) -> Option<u32> {
    if s.is_empty() || s.len() > 2 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

#[async_trait]
impl Tool for ClockTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: CLOCK_TOOL.into(),
            description: "Get the current date and time, in UTC by default".into(),
            parameters: vec![
                ParameterSchema::optional_string(
                    "timezone",
                    "Timezone: 'UTC', 'Asia/Shanghai', or an offset like '+05:30'",
                    "UTC",
                ),
                ParameterSchema::optional_string(
                    "format",
                    "Output format: 'human', 'iso', or 'unix'",
                    "human",
                )
                .with_enum(["human", "iso", "unix"]),
            ],
            category: Some("time".into()),
        }
    }

    async fn invoke(&self, args: &ToolArguments) -> Result<String, ToolFailure> {
        let tz = args.get("timezone").and_then(Value::as_str).unwrap_or("UTC");
        let format = args.get("format").and_then(Value::as_str).unwrap_or("human");

        let (offset, label) = parse_timezone(tz).ok_or_else(|| ToolFailure::InvalidArgument {
            name: "timezone".into(),
            reason: format!("unrecognized timezone '{tz}'"),
        })?;

        let now = (self.now)().with_timezone(&offset);

        let output = match format {
            "iso" => now.to_rfc3339(),
            "unix" => now.timestamp().to_string(),
            "human" => format!("Current time ({label}): {}", now.format("%Y-%m-%d %H:%M:%S")),
            other => {
                return Err(ToolFailure::InvalidArgument {
                    name: "format".into(),
                    reason: format!("expected human, iso or unix, got '{other}'"),
                });
            }
        };

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 4, 30, 0).unwrap()
    }

    async fn run(value: Value) -> Result<String, ToolFailure> {
        let Value::Object(args) = value else {
            unreachable!()
        };
        ClockTool::with_source(fixed_now).invoke(&args).await
    }

    #[tokio::test]
    async fn test_default_is_utc_human() {
        assert_eq!(
            run(json!({})).await.unwrap(),
            "Current time (UTC): 2024-05-01 04:30:00"
        );
    }

    #[tokio::test]
    async fn test_beijing() {
        assert_eq!(
            run(json!({"timezone": "Asia/Shanghai"})).await.unwrap(),
            "Current time (Beijing, UTC+08:00): 2024-05-01 12:30:00"
        );
    }

    #[tokio::test]
    async fn test_offsets_and_formats() {
        assert_eq!(
            run(json!({"timezone": "-05:30", "format": "iso"})).await.unwrap(),
            "2024-04-30T23:00:00-05:30"
        );
        assert_eq!(
            run(json!({"timezone": "UTC+8", "format": "unix"})).await.unwrap(),
            fixed_now().timestamp().to_string()
        );
    }

    #[tokio::test]
    async fn test_invalid_arguments() {
        assert!(matches!(
            run(json!({"timezone": "Mars/Olympus"})).await,
            Err(ToolFailure::InvalidArgument { ref name, .. }) if name == "timezone"
        ));
        assert!(matches!(
            run(json!({"format": "roman"})).await,
            Err(ToolFailure::InvalidArgument { ref name, .. }) if name == "format"
        ));
    }

    #[test]
    fn test_parse_timezone_bounds() {
        assert!(parse_timezone("+15").is_none());
        assert!(parse_timezone("+0530").is_some());
        assert!(parse_timezone("nowhere").is_none());
    }

    #[test]
    fn test_parse_timezone_rejects_signed_components() {
        assert!(parse_timezone("+-5").is_none());
        assert!(parse_timezone("+-2147483648").is_none());
        assert!(parse_timezone("++5").is_none());
        assert!(parse_timezone("+05:-30").is_none());
        assert!(parse_timezone("+123").is_none());
        assert_eq!(parse_timezone("-5").unwrap().1, "UTC-05:00");
    }

    #[tokio::test]
    async fn test_overflowing_offset_is_a_tool_error() {
        assert!(matches!(
            run(json!({"timezone": "+-2147483648"})).await,
            Err(ToolFailure::InvalidArgument { .. })
        ));
    }
}
