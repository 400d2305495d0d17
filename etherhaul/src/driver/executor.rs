//! Sequential command execution.

use log::debug;

use super::{CommandResult, Driver};
use crate::error::Result;

/// Run `commands` one after another and collect their results.
///
/// Each command is sent only after the previous one's prompt came back.
/// A command the device rejects is reported in its [`CommandResult`] and
/// the batch continues; a timeout or transport error stops the batch and
/// is returned as `Err`.
///
/// # Example
///
/// ```rust,no_run
/// use etherhaul::driver::{execute_commands, Driver};
///
/// # async fn example(driver: &mut impl Driver) -> Result<(), etherhaul::Error> {
/// let results = execute_commands(driver, &["show system", "show sw"]).await?;
/// for result in &results {
///     println!("{}: ok={}", result.command, result.is_success());
/// }
/// # Ok(())
/// # }
/// ```
pub async fn execute_commands<D, S>(driver: &mut D, commands: &[S]) -> Result<Vec<CommandResult>>
where
    D: Driver,
    S: AsRef<str>,
{
    let mut results = Vec::with_capacity(commands.len());

    for command in commands {
        let result = driver.send_command(command.as_ref()).await?;
        if !result.is_success() {
            debug!("batch continues after rejected command '{}'", result.command);
        }
        results.push(result);
    }

    Ok(results)
}
