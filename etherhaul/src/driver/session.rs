//! Interactive CLI session over a [`Transport`].

use std::time::{Duration, Instant};

use log::{debug, trace, warn};
use regex::bytes::Regex;
use secrecy::{ExposeSecret, SecretString};

use super::privilege::PrivilegeManager;
use super::response::CommandResult;
use super::Driver;
use crate::channel::{combine_patterns, first_matching_line};
use crate::error::{ConnectionError, Error, PlatformError, Result, SessionError};
use crate::platform::{Phase, PlatformDefinition};
use crate::transport::Transport;

/// Lifecycle state of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the first prompt.
    Connecting,
    /// Idle at a prompt, ready for the next command.
    Ready,
    /// A command was sent and its prompt never arrived.
    InCommand,
    /// Logged out or lost.
    Closed,
}

/// Timeouts and secrets used while a session is open.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// How long to wait for the first prompt after login.
    pub open_timeout: Duration,

    /// How long to wait for each command's prompt.
    pub command_timeout: Duration,

    /// Secret sent when escalation asks for a password.
    pub enable_secret: Option<SecretString>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            open_timeout: Duration::from_secs(30),
            command_timeout: Duration::from_secs(30),
            enable_secret: None,
        }
    }
}

/// An open CLI session to one device.
///
/// The session owns its transport. Commands are strictly sequential: each
/// `send_command` writes one line and reads until the next prompt before it
/// returns, and `&mut self` keeps a second command from starting meanwhile.
pub struct Session<T: Transport> {
    transport: Option<T>,
    platform: PlatformDefinition,
    privilege_manager: PrivilegeManager,
    state: SessionState,
    timeout: Duration,

    /// Any privilege level's prompt.
    prompt_pattern: Regex,

    /// Prompt or pager marker.
    read_pattern: Regex,

    banner: String,
    enable_secret: Option<SecretString>,
}

impl<T: Transport> Session<T> {
    /// Open a session over an already-authenticated transport.
    ///
    /// Consumes the login banner, detects the current phase, moves to the
    /// platform's default privilege level and disables pagination.
    pub async fn open(
        transport: T,
        platform: PlatformDefinition,
        options: SessionOptions,
    ) -> Result<Self> {
        platform.validate()?;

        let prompt_pattern = combine_patterns(platform.privilege_levels.values().map(|l| &l.pattern))
            .map_err(PlatformError::from)?;
        let read_pattern = match &platform.pager {
            Some(pager) => combine_patterns([&prompt_pattern, &pager.pattern])
                .map_err(PlatformError::from)?,
            None => prompt_pattern.clone(),
        };

        let privilege_manager = PrivilegeManager::new(platform.privilege_levels.clone());

        let mut session = Self {
            transport: Some(transport),
            platform,
            privilege_manager,
            state: SessionState::Connecting,
            timeout: options.command_timeout,
            prompt_pattern,
            read_pattern,
            banner: String::new(),
            enable_secret: options.enable_secret,
        };

        session.consume_banner(options.open_timeout).await?;

        let default = session.platform.default_privilege.clone();
        session.acquire_privilege(&default).await?;

        session.disable_pagination().await?;

        debug!(
            "session open on platform '{}' in phase {:?}",
            session.platform.name,
            session.current_phase()
        );
        Ok(session)
    }

    /// Read the login banner up to the first prompt.
    async fn consume_banner(&mut self, timeout: Duration) -> Result<()> {
        let transport = self.transport.as_mut().ok_or(SessionError::NotConnected)?;

        let data = match transport.read_until(&self.prompt_pattern, timeout).await {
            Ok(data) => data,
            Err(Error::Timeout(_)) => {
                self.state = SessionState::Closed;
                return Err(ConnectionError::NoPrompt(timeout).into());
            }
            Err(e) => {
                self.state = SessionState::Closed;
                return Err(e);
            }
        };

        let text = String::from_utf8_lossy(&data).replace('\r', "");
        let (banner, prompt) = split_prompt(&text);
        self.banner = banner.trim().to_string();

        let level = self.privilege_manager.determine_from_prompt(prompt)?.name.clone();
        self.privilege_manager.set_current(&level)?;
        self.state = SessionState::Ready;

        debug!("initial prompt '{}' at level '{}'", prompt.trim(), level);
        Ok(())
    }

    /// Run the platform's pagination-disable commands.
    ///
    /// A command the device rejects is logged and otherwise ignored.
    async fn disable_pagination(&mut self) -> Result<()> {
        for command in self.platform.pagination_commands.clone() {
            let result = self.send_command(&command).await?;
            if let Some(message) = &result.failure_message {
                warn!("pagination command '{}' rejected: {}", command, message);
            }
        }
        Ok(())
    }

    /// The login banner seen before the first prompt.
    pub fn banner(&self) -> &str {
        &self.banner
    }

    /// The current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Set the per-command read timeout.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Get the privilege manager.
    pub fn privilege_manager(&self) -> &PrivilegeManager {
        &self.privilege_manager
    }

    fn ensure_ready(&self) -> Result<()> {
        match self.state {
            SessionState::Ready => Ok(()),
            SessionState::InCommand => Err(SessionError::Unusable.into()),
            SessionState::Connecting | SessionState::Closed => {
                Err(SessionError::NotConnected.into())
            }
        }
    }

    /// Record the effect of a failed read or write on the lifecycle state.
    fn note_failure(&mut self, error: &Error) {
        match error {
            Error::Timeout(_) => {
                warn!("command timed out; session is no longer usable");
                self.state = SessionState::InCommand;
            }
            Error::Connection(e) => {
                debug!("transport lost: {}", e);
                self.state = SessionState::Closed;
                self.transport = None;
            }
            _ => {}
        }
    }

    /// Write one line and read until a prompt, answering pager markers.
    ///
    /// `expect` overrides the pattern that ends the read; the pager is
    /// only handled for the default read. A `hidden` line is never logged.
    async fn exchange(&mut self, line: &str, expect: Option<&Regex>, hidden: bool) -> Result<String> {
        self.ensure_ready()?;
        self.state = SessionState::InCommand;

        match self.exchange_inner(line, expect, hidden).await {
            Ok(text) => {
                self.state = SessionState::Ready;
                Ok(text)
            }
            Err(e) => {
                self.note_failure(&e);
                Err(e)
            }
        }
    }

    async fn exchange_inner(
        &mut self,
        line: &str,
        expect: Option<&Regex>,
        hidden: bool,
    ) -> Result<String> {
        let timeout = self.timeout;
        let deadline = Instant::now() + timeout;
        let transport = self.transport.as_mut().ok_or(SessionError::NotConnected)?;

        if hidden {
            trace!("send: <hidden>");
        } else {
            trace!("send: {:?}", line);
        }
        transport.write(format!("{line}\n").as_bytes()).await?;

        let pattern = expect.unwrap_or(&self.read_pattern);
        let mut output = String::new();

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(Error::Timeout(timeout));
            }

            let data = transport
                .read_until(pattern, remaining)
                .await
                .map_err(|e| match e {
                    Error::Timeout(_) => Error::Timeout(timeout),
                    other => other,
                })?;
            let chunk = String::from_utf8_lossy(&data).into_owned();

            let pager = match (&self.platform.pager, expect) {
                (Some(pager), None) if !self.prompt_pattern.is_match(chunk.as_bytes()) => pager,
                _ => {
                    output.push_str(&chunk);
                    return Ok(output);
                }
            };

            match pager.pattern.find(chunk.as_bytes()) {
                Some(m) => output.push_str(&chunk[..m.start()]),
                None => output.push_str(&chunk),
            }
            trace!("answering pager marker");
            transport.write(pager.response.as_bytes()).await?;
        }
    }

    /// Send one command and wait for its prompt.
    pub async fn send_command(&mut self, command: &str) -> Result<CommandResult> {
        let start = Instant::now();
        let raw = self.exchange(command, None, false).await?;
        let elapsed = start.elapsed();

        let (result, prompt) = normalize_output(&raw, command);

        if self.privilege_manager.observe_prompt(&prompt).is_none() {
            debug!("prompt '{}' matched no privilege level", prompt);
        }

        let response = CommandResult::new(command, result, raw.as_str(), prompt, elapsed);
        match first_matching_line(&self.platform.failure_patterns, &response.result) {
            Some(message) => {
                debug!("command '{}' rejected: {}", command, message);
                Ok(response.with_failure(message))
            }
            None => Ok(response),
        }
    }

    /// Navigate to the named privilege level.
    pub async fn acquire_privilege(&mut self, target: &str) -> Result<()> {
        let current = self
            .privilege_manager
            .current()
            .map(|l| l.name.clone())
            .ok_or(SessionError::NotConnected)?;

        if current == target {
            return Ok(());
        }

        let path = self.privilege_manager.path(&current, target)?;

        for step in path.windows(2) {
            let (from, to) = (&step[0], &step[1]);

            let transition = self.privilege_manager.transition(from, to).ok_or_else(|| {
                SessionError::NoPrivilegePath {
                    from: from.clone(),
                    to: to.clone(),
                }
            })?;

            debug!("privilege {} -> {} via '{}'", from, to, transition.command);

            let raw = match &transition.secret_prompt {
                Some(auth) => {
                    let expect = combine_patterns([&self.prompt_pattern, auth])
                        .map_err(PlatformError::from)?;
                    let text = self.exchange(&transition.command, Some(&expect), false).await?;

                    if self.prompt_pattern.is_match(text.as_bytes()) {
                        text
                    } else {
                        let secret = self
                            .enable_secret
                            .as_ref()
                            .map(|s| s.expose_secret().to_string())
                            .unwrap_or_default();
                        let prompt_pattern = self.prompt_pattern.clone();
                        self.exchange(&secret, Some(&prompt_pattern), true).await?
                    }
                }
                None => self.exchange(&transition.command, None, false).await?,
            };

            let (_, prompt) = normalize_output(&raw, &transition.command);
            match self.privilege_manager.observe_prompt(&prompt) {
                Some(level) if level == *to => {}
                _ => {
                    return Err(SessionError::PhaseAcquisitionFailed { target: to.clone() }.into());
                }
            }
        }

        Ok(())
    }

    /// Log out and close the transport.
    ///
    /// A peer that already dropped the connection is not an error, and
    /// closing twice is a no-op.
    pub async fn close(&mut self) -> Result<()> {
        self.state = SessionState::Closed;
        let Some(mut transport) = self.transport.take() else {
            return Ok(());
        };

        for command in &self.platform.logout_commands {
            if let Err(e) = transport.write(format!("{command}\n").as_bytes()).await {
                return tolerate_closed_peer(e);
            }
        }

        transport.close().await.or_else(tolerate_closed_peer)
    }
}

fn tolerate_closed_peer(error: Error) -> Result<()> {
    match error {
        Error::Connection(e) => {
            debug!("peer already closed the session: {}", e);
            Ok(())
        }
        other => Err(other),
    }
}

/// Split `text` into everything before the last line and the last line.
fn split_prompt(text: &str) -> (&str, &str) {
    match memchr::memrchr(b'\n', text.as_bytes()) {
        Some(pos) => (&text[..pos], &text[pos + 1..]),
        None => ("", text),
    }
}

/// Strip carriage returns, the command echo and the trailing prompt.
///
/// Returns the normalized output and the trimmed prompt.
fn normalize_output(raw: &str, command: &str) -> (String, String) {
    let text = raw.replace('\r', "");
    let (body, prompt) = split_prompt(&text);

    let body = match memchr::memchr(b'\n', body.as_bytes()) {
        Some(pos) if body[..pos].trim() == command.trim() => &body[pos + 1..],
        None if body.trim() == command.trim() => "",
        _ => body,
    };

    (body.to_string(), prompt.trim().to_string())
}

impl<T: Transport> Driver for Session<T> {
    async fn send_command(&mut self, command: &str) -> Result<CommandResult> {
        Session::send_command(self, command).await
    }

    async fn acquire_phase(&mut self, phase: Phase) -> Result<()> {
        let target = self.privilege_manager.level_for_phase(phase)?.to_string();
        self.acquire_privilege(&target).await
    }

    async fn close(&mut self) -> Result<()> {
        Session::close(self).await
    }

    fn current_phase(&self) -> Option<Phase> {
        self.privilege_manager.current_phase()
    }

    fn platform(&self) -> &PlatformDefinition {
        &self.platform
    }

    fn is_open(&self) -> bool {
        self.state == SessionState::Ready
    }

    fn is_alive(&self) -> bool {
        self.is_open() && self.transport.as_ref().is_some_and(|t| t.is_alive())
    }
}
