//! Credential exchange state machine.
//!
//! One cycle validates (or refreshes) the MFA session, assumes the target
//! role, optionally exports the activation snippet, and then either stops or
//! sleeps for half the target session lifetime before starting over:
//!
//! ```text
//! NeedsIntermediate -> HasIntermediate -> AssumingRole -> [Exported] -> Sleeping | Done
//!        ^                                      ^                          |
//!        +------------ (MFA) ------------------ + ------ (no MFA) ---------+
//! ```

use std::time::Duration;

use log::info;

use crate::{
    config::Config,
    error::Result,
    export,
    profile::ProfileWriter,
    provider::{CredentialProvider, ProviderSession, role_session_name},
    token::TokenSource,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    NeedsIntermediate,
    HasIntermediate,
    AssumingRole,
    Exported,
    Sleeping,
    Done,
}

/// Blocking pause between renewals.
pub trait Delay {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioDelay;

impl Delay for TokioDelay {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

pub struct Orchestrator<P, T, D> {
    config: Config,
    provider: P,
    tokens: T,
    delay: D,
    writer: ProfileWriter,
    state: State,
}

impl<P, T, D> Orchestrator<P, T, D>
where
    P: CredentialProvider,
    T: TokenSource,
    D: Delay,
{
    pub fn new(config: Config, provider: P, tokens: T, delay: D, writer: ProfileWriter) -> Self {
        let state = initial_state(&config);
        Self {
            config,
            provider,
            tokens,
            delay,
            writer,
            state,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Drives the state machine until [`State::Done`].
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The cycle finished and renewal is off
    /// * `Err(Error)` - The first failure of any step. Nothing is retried: an
    ///   MFA code is single-use, and the other failures need operator input.
    ///
    /// With renewal on this only returns on error; the process otherwise runs
    /// until it is terminated.
    pub async fn run(&mut self) -> Result<()> {
        while self.state() != State::Done {
            self.step().await?;
        }
        Ok(())
    }

    /// Performs one transition and returns the new state.
    ///
    /// | from | work | to |
    /// |------|------|----|
    /// | `NeedsIntermediate` | validate or refresh the MFA session | `HasIntermediate` |
    /// | `HasIntermediate` | - | `AssumingRole` |
    /// | `AssumingRole` | assume the role, export if configured | `Exported`, `Sleeping` or `Done` |
    /// | `Exported` | - | `Sleeping` or `Done` |
    /// | `Sleeping` | wait half the target duration | initial state |
    /// | `Done` | - | `Done` |
    ///
    /// # Errors
    ///
    /// Any provider, token, or file error. The state is left unchanged, so the
    /// failed step is the one [`Orchestrator::state`] reports.
    pub async fn step(&mut self) -> Result<State> {
        self.state = match self.state {
            State::NeedsIntermediate => {
                self.ensure_session_token_profile().await?;
                State::HasIntermediate
            }
            State::HasIntermediate => State::AssumingRole,
            State::AssumingRole => {
                self.ensure_target_profile().await?;
                match &self.config.export_file {
                    Some(path) => {
                        export::export_activation(&self.config.target_profile, path).await?;
                        State::Exported
                    }
                    None => self.after_cycle(),
                }
            }
            State::Exported => self.after_cycle(),
            State::Sleeping => {
                let interval = self.config.renew_interval();
                info!("Renewing credentials in {}s", interval.as_secs());
                self.delay.sleep(interval).await;
                initial_state(&self.config)
            }
            State::Done => State::Done,
        };
        Ok(self.state)
    }

    fn after_cycle(&self) -> State {
        if self.config.renew {
            State::Sleeping
        } else {
            State::Done
        }
    }

    /// Keeps the intermediate profile valid, minting a new MFA session token
    /// only when the cached one no longer works.
    async fn ensure_session_token_profile(&self) -> Result<()> {
        let Some(serial) = self.config.mfa_device.as_deref() else {
            return Ok(());
        };
        let config = &self.config;

        if self
            .provider
            .validate_session(&config.intermediate_profile, &config.region)
            .await
        {
            info!(
                "Session token for profile {} is still valid",
                config.intermediate_profile
            );
            return Ok(());
        }

        let code = self.tokens.token_code(serial)?;
        info!(
            "Fetching session token - Duration: {}s",
            config.intermediate_duration
        );
        let credentials = self
            .provider
            .issue_session_token(
                &config.profile,
                &config.region,
                serial,
                &code,
                config.intermediate_duration,
            )
            .await?;

        self.writer
            .write(&credentials, &config.intermediate_profile, &config.region)
            .await
    }

    /// Assumes the target role from the source profile and stores the result.
    async fn ensure_target_profile(&self) -> Result<()> {
        let config = &self.config;
        let session = self
            .provider
            .open_session(config.source_profile(), &config.region)
            .await;

        let identity = self.provider.caller_identity(&session).await?;
        let session_name = role_session_name(&identity);
        info!(
            "Assuming role {} as {session_name} - Duration: {}s",
            config.role_arn, config.target_duration
        );

        let credentials = self
            .provider
            .assume_role(&session, &config.role_arn, session_name, config.target_duration)
            .await?;

        let region = session.region().unwrap_or_else(|| config.region.clone());
        self.writer
            .write(&credentials, &config.target_profile, &region)
            .await
    }
}

fn initial_state(config: &Config) -> State {
    if config.mfa_device.is_some() {
        State::NeedsIntermediate
    } else {
        State::AssumingRole
    }
}
