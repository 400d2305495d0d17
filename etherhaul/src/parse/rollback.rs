//! `show rollback`

use serde::Serialize;

use super::{Shape, check_output, records};
use crate::error::ParseError;

/// State of the device's configuration-revert timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RollbackStatus {
    pub armed: bool,
    /// Seconds until the device reverts; 0 when disarmed.
    pub remaining: u32,
}

impl RollbackStatus {
    pub const DISARMED: RollbackStatus = RollbackStatus {
        armed: false,
        remaining: 0,
    };
}

/// Parse `show rollback` output.
///
/// `rollback timeout : not started` is disarmed; a number is the armed
/// timer's remaining seconds. Anything else is not a rollback status.
pub fn parse_rollback(text: &str) -> Result<RollbackStatus, ParseError> {
    check_output(Shape::Rollback, text)?;

    let record = records(text)
        .find(|r| r.noun == "rollback" && r.id.is_none() && r.key == "timeout")
        .ok_or_else(|| ParseError::new(Shape::Rollback, "no 'rollback timeout' line", text))?;

    if record.value.eq_ignore_ascii_case("not started") {
        return Ok(RollbackStatus::DISARMED);
    }

    match record.value.parse::<u32>() {
        Ok(remaining) => Ok(RollbackStatus {
            armed: true,
            remaining,
        }),
        Err(_) => Err(ParseError::new(
            Shape::Rollback,
            format!("unexpected rollback timeout '{}'", record.value),
            text,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_started() {
        let status = parse_rollback("rollback timeout                   : not started\n").unwrap();
        assert_eq!(status, RollbackStatus::DISARMED);
    }

    #[test]
    fn test_armed() {
        let status = parse_rollback("rollback timeout                   : 9000\n").unwrap();
        assert!(status.armed);
        assert_eq!(status.remaining, 9000);

        let status = parse_rollback("rollback timeout : 300").unwrap();
        assert_eq!(status.remaining, 300);
    }

    #[test]
    fn test_malformed_is_error() {
        let err = parse_rollback("rollback timeout : invalid\n").unwrap_err();
        assert_eq!(err.shape, Shape::Rollback);
        assert!(err.reason.contains("invalid"));

        assert!(parse_rollback("").is_err());
        assert!(parse_rollback("system name : eh\n").is_err());
    }
}
