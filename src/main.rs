//! swamp: AWS role assumption through an MFA session
//!
//! This program keeps a set of temporary AWS credential profiles up to date for
//! an operator who has to authenticate with MFA before assuming a role in a
//! target account.
//!
//! Each cycle performs the following operations:
//! 1. Checks whether the intermediate (MFA session) profile still works
//! 2. If not, obtains an MFA code from a command or the terminal and mints a new
//!    session token from the long-term profile
//! 3. Assumes the target role and writes it to the target profile
//! 4. Optionally writes a shell snippet activating the target profile
//! 5. With `--renew`, sleeps for half the target session lifetime and repeats

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, error::ErrorKind};

mod cli;
mod config;
mod credentials;
mod error;
mod export;
mod orchestrator;
mod profile;
mod provider;
mod token;

use cli::Args;
use config::Config;
use orchestrator::{Orchestrator, TokioDelay};
use profile::ProfileWriter;
use provider::StsProvider;
use token::MfaTokenAcquirer;

/// Entry point and the only place the process exits on failure.
///
/// Invalid arguments print usage through clap and exit with its usage status.
/// Every other error is printed once with its context and exits with status 1.
#[tokio::main]
async fn main() -> Result<()> {
    // INFO by default so progress is visible; RUST_LOG overrides.
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let config = match Config::try_from(Args::parse()) {
        Ok(config) => config,
        Err(e) => Args::command().error(ErrorKind::ValueValidation, e).exit(),
    };

    // Open the credentials file before anything prompts for an MFA code.
    let writer = ProfileWriter::new(config.credentials_file.clone())
        .await
        .context("Error initializing profile writer")?;
    log::debug!("Using credentials file {}", writer.path().display());

    let provider = StsProvider::new(config.credentials_file.clone());
    let tokens = MfaTokenAcquirer::new(config.mfa_exec.clone());

    Orchestrator::new(config, provider, tokens, TokioDelay, writer)
        .run()
        .await?;
    Ok(())
}
