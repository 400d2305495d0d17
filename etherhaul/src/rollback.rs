//! Control of the device's configuration-rollback timer.
//!
//! While armed, the device reverts to its previous configuration when the
//! timer runs out, so a change that cuts off management access undoes
//! itself. The timer lives on the device; this module only arms, clears
//! and reads it.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::driver::Driver;
use crate::error::{Error, Result, ValidationError};
use crate::parse::{RollbackStatus, parse_rollback};

/// Longest timeout the device accepts, in seconds.
pub const MAX_ROLLBACK_TIMEOUT: u64 = 86_400;

/// Rollback timer state as last read from the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RollbackState {
    Disarmed,
    Armed { remaining: u32 },
}

impl From<RollbackStatus> for RollbackState {
    fn from(status: RollbackStatus) -> Self {
        if status.armed {
            RollbackState::Armed {
                remaining: status.remaining,
            }
        } else {
            RollbackState::Disarmed
        }
    }
}

fn validate_timeout(timeout: u64) -> std::result::Result<u32, ValidationError> {
    if timeout > MAX_ROLLBACK_TIMEOUT {
        return Err(ValidationError::RollbackTimeout(timeout));
    }
    u32::try_from(timeout).map_err(|_| ValidationError::RollbackTimeout(timeout))
}

/// Read `show rollback`.
pub async fn read_status<D: Driver>(driver: &mut D) -> Result<RollbackStatus> {
    let command = "show rollback";
    let response = driver.send_command(command).await?;

    if let Some(message) = response.failure_message {
        return Err(Error::DeviceCommand {
            command: command.to_string(),
            message,
        });
    }

    Ok(parse_rollback(&response.result)?)
}

/// Rollback state machine bound to one driver.
pub struct RollbackController<'a, D: Driver> {
    driver: &'a mut D,
    state: RollbackState,
}

impl<'a, D: Driver> RollbackController<'a, D> {
    /// Read the current timer state and bind to `driver`.
    pub async fn attach(driver: &'a mut D) -> Result<Self> {
        let status = read_status(&mut *driver).await?;
        debug!("rollback attached: {:?}", status);

        Ok(Self {
            driver,
            state: status.into(),
        })
    }

    /// The state as last read.
    pub fn state(&self) -> RollbackState {
        self.state
    }

    /// Access the driver for the commands the timer guards.
    pub fn driver(&mut self) -> &mut D {
        &mut *self.driver
    }

    /// Arm the timer for `timeout` seconds, re-arming if already armed.
    ///
    /// The timeout is checked before anything is sent.
    pub async fn enable(&mut self, timeout: u64) -> Result<RollbackStatus> {
        let timeout = validate_timeout(timeout)?;

        let command = format!("set rollback timeout {timeout}");
        info!("arming rollback for {}s", timeout);
        let response = self.driver.send_command(&command).await?;

        let lower = response.result.to_ascii_lowercase();
        let acknowledged = lower.contains("set done") || lower.contains("rollbacktimeout");

        if let Some(message) = response.failure_message {
            return Err(Error::DeviceCommand { command, message });
        }
        if !acknowledged {
            return Err(Error::DeviceCommand {
                command,
                message: format!("no acknowledgement: {}", response.result.trim()),
            });
        }

        let status = self.refresh().await?;
        if timeout > 0 && !status.armed {
            return Err(Error::DeviceCommand {
                command,
                message: "rollback still not started after arming".to_string(),
            });
        }

        Ok(status)
    }

    /// Clear the timer. Nothing is sent when it is already disarmed.
    pub async fn disable(&mut self) -> Result<RollbackStatus> {
        if self.state == RollbackState::Disarmed {
            debug!("rollback already disarmed");
            return Ok(RollbackStatus::DISARMED);
        }

        let command = "clear rollback".to_string();
        info!("clearing rollback");
        let response = self.driver.send_command(&command).await?;

        if let Some(message) = response.failure_message {
            return Err(Error::DeviceCommand { command, message });
        }
        if !response.result.to_ascii_lowercase().contains("rollback cleared") {
            return Err(Error::DeviceCommand {
                command,
                message: format!("no acknowledgement: {}", response.result.trim()),
            });
        }

        let status = self.refresh().await?;
        if status.armed {
            return Err(Error::DeviceCommand {
                command,
                message: format!("rollback still armed ({}s left)", status.remaining),
            });
        }

        Ok(status)
    }

    /// Re-read the timer from the device.
    pub async fn refresh(&mut self) -> Result<RollbackStatus> {
        let status = read_status(&mut *self.driver).await?;
        self.state = status.into();
        Ok(status)
    }
}

/// Desired rollback timer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RollbackRequest {
    /// Armed with a timeout.
    Present,
    /// Cleared.
    Absent,
}

/// What [`set_rollback`] did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RollbackOutcome {
    /// A command was sent to the device.
    pub changed: bool,
    pub message: String,
    /// The timer as read back afterwards.
    pub status: RollbackStatus,
}

/// Put the rollback timer into the requested state.
///
/// `Present` needs a timeout; both the presence and range of the timeout
/// are checked before the device is contacted. `Present` always (re)arms;
/// `Absent` on a disarmed timer sends nothing and reports no change.
pub async fn set_rollback<D: Driver>(
    driver: &mut D,
    request: RollbackRequest,
    timeout: Option<u64>,
) -> Result<RollbackOutcome> {
    match request {
        RollbackRequest::Present => {
            let timeout = timeout.ok_or(ValidationError::MissingRollbackTimeout)?;
            validate_timeout(timeout)?;
            let mut controller = RollbackController::attach(driver).await?;

            let message = match controller.state() {
                RollbackState::Armed { remaining } => {
                    format!("rollback re-armed from {remaining}s to {timeout}s")
                }
                RollbackState::Disarmed => format!("rollback armed for {timeout}s"),
            };
            let status = controller.enable(timeout).await?;

            Ok(RollbackOutcome {
                changed: true,
                message,
                status,
            })
        }
        RollbackRequest::Absent => {
            let mut controller = RollbackController::attach(driver).await?;

            let (changed, message) = match controller.state() {
                RollbackState::Armed { remaining } => {
                    (true, format!("rollback cleared ({remaining}s were left)"))
                }
                RollbackState::Disarmed => (false, "rollback already cleared".to_string()),
            };
            let status = controller.disable().await?;

            Ok(RollbackOutcome {
                changed,
                message,
                status,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::time::Duration;

    use tokio_test::{assert_err, assert_ok, block_on};

    use super::*;
    use crate::channel::first_matching_line;
    use crate::driver::CommandResult;
    use crate::platform::vendors::etherhaul;
    use crate::platform::{Phase, PlatformDefinition};

    /// Replies to each command with the next canned output.
    struct Scripted {
        platform: PlatformDefinition,
        replies: VecDeque<&'static str>,
        sent: Vec<String>,
    }

    impl Scripted {
        fn new(replies: &[&'static str]) -> Self {
            Self {
                platform: etherhaul::platform().unwrap(),
                replies: replies.iter().copied().collect(),
                sent: Vec::new(),
            }
        }
    }

    impl Driver for Scripted {
        async fn send_command(&mut self, command: &str) -> Result<CommandResult> {
            self.sent.push(command.to_string());
            let output = self.replies.pop_front().unwrap_or("");
            let result = CommandResult::new(command, output, output, "EH-8010FX>", Duration::ZERO);

            Ok(match first_matching_line(&self.platform.failure_patterns, output) {
                Some(message) => result.with_failure(message),
                None => result,
            })
        }

        async fn acquire_phase(&mut self, _phase: Phase) -> Result<()> {
            Ok(())
        }

        async fn close(&mut self) -> Result<()> {
            Ok(())
        }

        fn current_phase(&self) -> Option<Phase> {
            Some(Phase::Exec)
        }

        fn platform(&self) -> &PlatformDefinition {
            &self.platform
        }

        fn is_open(&self) -> bool {
            true
        }

        fn is_alive(&self) -> bool {
            true
        }
    }

    const DISARMED: &str = "rollback timeout                   : not started";

    #[test]
    fn test_enable_requires_acknowledgement() {
        let mut driver = Scripted::new(&[DISARMED, "Syntax accepted"]);

        let err = block_on(async {
            let mut controller = assert_ok!(RollbackController::attach(&mut driver).await);
            assert_err!(controller.enable(60).await)
        });

        assert!(matches!(err, Error::DeviceCommand { .. }));
        assert_eq!(driver.sent, ["show rollback", "set rollback timeout 60"]);
    }

    #[test]
    fn test_enable_confirms_timer_started() {
        let mut driver = Scripted::new(&[DISARMED, "Set done: rollbacktimeout: 60", DISARMED]);

        let err = block_on(async {
            let mut controller = assert_ok!(RollbackController::attach(&mut driver).await);
            assert_err!(controller.enable(60).await)
        });

        assert!(err.to_string().contains("still not started"));
    }

    #[test]
    fn test_disable_confirms_timer_cleared() {
        let mut driver = Scripted::new(&[
            "rollback timeout : 30",
            "rollback cleared",
            "rollback timeout : 25",
        ]);

        let err = block_on(async {
            let mut controller = assert_ok!(RollbackController::attach(&mut driver).await);
            assert_eq!(controller.state(), RollbackState::Armed { remaining: 30 });
            assert_err!(controller.disable().await)
        });

        assert!(err.to_string().contains("still armed (25s left)"));
    }

    #[test]
    fn test_rejected_clear() {
        let mut driver = Scripted::new(&["rollback timeout : 30", "%Error: rollback is locked"]);

        let err = block_on(async {
            let mut controller = assert_ok!(RollbackController::attach(&mut driver).await);
            assert_err!(controller.disable().await)
        });

        match err {
            Error::DeviceCommand { command, message } => {
                assert_eq!(command, "clear rollback");
                assert_eq!(message, "%Error: rollback is locked");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unreadable_status() {
        let mut driver = Scripted::new(&["rollback timeout : soon"]);

        let result = block_on(read_status(&mut driver));
        assert!(matches!(result, Err(Error::Parse(_))));
    }

    #[test]
    fn test_validate_timeout() {
        assert_eq!(validate_timeout(0), Ok(0));
        assert_eq!(validate_timeout(86_400), Ok(86_400));
        assert_eq!(
            validate_timeout(90_000),
            Err(ValidationError::RollbackTimeout(90_000))
        );
    }

    #[test]
    fn test_state_from_status() {
        assert_eq!(
            RollbackState::from(RollbackStatus::DISARMED),
            RollbackState::Disarmed
        );
        assert_eq!(
            RollbackState::from(RollbackStatus {
                armed: true,
                remaining: 300
            }),
            RollbackState::Armed { remaining: 300 }
        );
    }

    #[test]
    fn test_request_deserialize() {
        let request: RollbackRequest = serde_json::from_str("\"present\"").unwrap();
        assert_eq!(request, RollbackRequest::Present);
    }
}
