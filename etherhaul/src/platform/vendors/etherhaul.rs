//! Siklu EtherHaul (EH) platform definition.
//!
//! EH radios drop straight into an operational prompt where both `show` and
//! `set` commands are accepted:
//!
//! ```text
//! EH-8010FX>                # operational mode, show + set
//! EH-8010FX#                # enable mode (some firmware builds)
//! EH-8010FX(config)#        # configuration sub-mode (some firmware builds)
//! ```
//!
//! The hostname part of the prompt never contains `% < > & # ' / \ " | { } ; ,`
//! or whitespace and is at least two characters long.
//!
//! The CLI has no command to disable paging, so long listings are continued
//! by answering the `--More--` marker instead.

use crate::error::PlatformError;
use crate::platform::{Phase, PlatformDefinition, PrivilegeLevel};

/// Platform name for Siklu EtherHaul radios.
pub const PLATFORM_NAME: &str = "siklu_eh";

/// Create the EtherHaul platform definition.
pub fn platform() -> Result<PlatformDefinition, PlatformError> {
    let exec = PrivilegeLevel::new("exec", Phase::Exec, r#"[^%<>&#'/\\"|{};,\s]{2,}>\s?$"#)?;

    let enable = PrivilegeLevel::new("enable", Phase::Privileged, r#"[^%<>&#'/\\"|{};,\s]{2,}#\s?$"#)?
        .with_parent("exec")
        .with_enter("enable")
        .with_exit("disable")
        .with_secret_prompt(r"(?i)password:\s?$")?
        .with_exclusion("(config");

    let config = PrivilegeLevel::new(
        "config",
        Phase::Configuration,
        r#"[^%<>&#'/\\"|{};,\s]{2,}\(config[^)]*\)#\s?$"#,
    )?
    .with_parent("enable")
    .with_enter("configure")
    .with_exit("end");

    let definition = PlatformDefinition::new(PLATFORM_NAME)
        .with_privilege(exec)
        .with_privilege(enable)
        .with_privilege(config)
        .with_default_privilege("exec")
        .with_config_phase(Phase::Exec)
        .with_failure_pattern(r"(?i)%\s?error")?
        .with_failure_pattern(r"(?i)%\s?bad secret")?
        .with_failure_pattern(r"(?i)invalid input")?
        .with_failure_pattern(r"(?i)unknown command")?
        .with_failure_pattern(r"(?i)connection timed out")?
        .with_failure_pattern(r"(?i)^\s*error:")?
        .with_failure_pattern(r"(?i)^\s*invalid\b")?
        .with_pager(r"(?i)--\s?more\s?--\s*$", " ")?
        .with_logout_command("exit");

    definition.validate()?;
    Ok(definition)
}
