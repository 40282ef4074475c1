//! Credential provider seam.
//!
//! The orchestrator only talks to [`CredentialProvider`]. [`StsProvider`] is
//! the production implementation backed by AWS STS; tests substitute a fake.

use std::path::PathBuf;

use aws_config::{
    BehaviorVersion, Region, SdkConfig,
    profile::{
        ProfileFileCredentialsProvider,
        profile_file::{ProfileFileKind, ProfileFiles},
    },
};
use aws_sdk_sts::{Client, error::DisplayErrorContext};
use log::debug;

use crate::{
    credentials::Credentials,
    error::{Error, Result},
};

/// A provider session bound to one profile.
pub trait ProviderSession {
    /// Region the session resolved to, if any.
    fn region(&self) -> Option<String>;
}

pub trait CredentialProvider {
    type Session: ProviderSession;

    /// Builds a session from the cached credentials of `profile`. An empty
    /// `region` lets the profile decide.
    async fn open_session(&self, profile: &str, region: &str) -> Self::Session;

    /// ARN of the identity behind `session`.
    async fn caller_identity(&self, session: &Self::Session) -> Result<String>;

    /// Whether `profile` currently holds usable credentials. Any failure
    /// counts as invalid.
    async fn validate_session(&self, profile: &str, region: &str) -> bool {
        let session = self.open_session(profile, region).await;
        match self.caller_identity(&session).await {
            Ok(arn) => {
                debug!("Profile {profile} is authenticated as {arn}");
                true
            }
            Err(e) => {
                debug!("Profile {profile} is not usable: {e}");
                false
            }
        }
    }

    /// Mints an MFA-backed session token from the long-term credentials of
    /// `profile`.
    async fn issue_session_token(
        &self,
        profile: &str,
        region: &str,
        serial_number: &str,
        token_code: &str,
        duration: u32,
    ) -> Result<Credentials>;

    async fn assume_role(
        &self,
        session: &Self::Session,
        role_arn: &str,
        role_session_name: &str,
        duration: u32,
    ) -> Result<Credentials>;
}

/// Role-session name derived from a caller identity ARN: everything after the
/// last `/`, or the whole ARN when it has none.
pub fn role_session_name(identity_arn: &str) -> &str {
    identity_arn.rsplit('/').next().unwrap_or(identity_arn)
}

/// AWS STS backed provider.
#[derive(Debug, Clone, Default)]
pub struct StsProvider {
    credentials_file: Option<PathBuf>,
}

impl StsProvider {
    /// `credentials_file` overrides where the SDK reads cached profiles from,
    /// so reads and writes hit the same file.
    pub fn new(credentials_file: Option<PathBuf>) -> Self {
        Self { credentials_file }
    }

    /// Loads SDK configuration whose only credential source is `profile`.
    ///
    /// Environment keys and other links of the default chain are ignored, so a
    /// stale `AWS_ACCESS_KEY_ID` cannot stand in for the named profile.
    async fn load_config(&self, profile: &str, region: &str) -> SdkConfig {
        let mut credentials = ProfileFileCredentialsProvider::builder().profile_name(profile);
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).profile_name(profile);
        if let Some(files) = self.profile_files() {
            credentials = credentials.profile_files(files.clone());
            loader = loader.profile_files(files);
        }
        if !region.is_empty() {
            loader = loader.region(Region::new(region.to_string()));
        }
        loader
            .credentials_provider(credentials.build())
            .load()
            .await
    }

    fn profile_files(&self) -> Option<ProfileFiles> {
        self.credentials_file.as_ref().map(|path| {
            ProfileFiles::builder()
                .include_default_config_file(true)
                .with_file(ProfileFileKind::Credentials, path)
                .build()
        })
    }
}

pub struct StsSession {
    config: SdkConfig,
}

impl ProviderSession for StsSession {
    fn region(&self) -> Option<String> {
        self.config.region().map(ToString::to_string)
    }
}

impl CredentialProvider for StsProvider {
    type Session = StsSession;

    async fn open_session(&self, profile: &str, region: &str) -> StsSession {
        StsSession {
            config: self.load_config(profile, region).await,
        }
    }

    async fn caller_identity(&self, session: &StsSession) -> Result<String> {
        const OPERATION: &str = "Error fetching caller id";

        Client::new(&session.config)
            .get_caller_identity()
            .send()
            .await
            .map_err(|e| Error::provider(OPERATION, DisplayErrorContext(&e).to_string()))?
            .arn()
            .map(str::to_string)
            .ok_or_else(|| Error::provider(OPERATION, "no ARN returned"))
    }

    async fn issue_session_token(
        &self,
        profile: &str,
        region: &str,
        serial_number: &str,
        token_code: &str,
        duration: u32,
    ) -> Result<Credentials> {
        const OPERATION: &str = "Error getting session token";

        let config = self.load_config(profile, region).await;
        Client::new(&config)
            .get_session_token()
            .duration_seconds(duration as i32)
            .serial_number(serial_number)
            .token_code(token_code)
            .send()
            .await
            .map_err(|e| Error::provider(OPERATION, DisplayErrorContext(&e).to_string()))?
            .credentials()
            .map(Credentials::from)
            .ok_or_else(|| Error::provider(OPERATION, "no credentials returned"))
    }

    async fn assume_role(
        &self,
        session: &StsSession,
        role_arn: &str,
        role_session_name: &str,
        duration: u32,
    ) -> Result<Credentials> {
        const OPERATION: &str = "Error assuming role";

        Client::new(&session.config)
            .assume_role()
            .role_arn(role_arn)
            .role_session_name(role_session_name)
            .duration_seconds(duration as i32)
            .send()
            .await
            .map_err(|e| Error::provider(OPERATION, DisplayErrorContext(&e).to_string()))?
            .credentials()
            .map(Credentials::from)
            .ok_or_else(|| Error::provider(OPERATION, "no credentials returned"))
    }
}
