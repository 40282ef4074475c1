//! Validated runtime configuration.

use std::{ops::RangeInclusive, path::PathBuf};

use crate::{
    cli::Args,
    error::{Error, Result},
};

/// Accepted `GetSessionToken` durations for IAM users.
pub const INTERMEDIATE_DURATION: RangeInclusive<u32> = 900..=129_600;
/// Accepted `AssumeRole` durations. Role chaining caps at one hour, but the
/// role's own maximum is enforced by STS.
pub const TARGET_DURATION: RangeInclusive<u32> = 900..=43_200;

/// Configuration the orchestrator runs with. Built once from [`Args`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub profile: String,
    pub intermediate_profile: String,
    pub target_profile: String,
    pub region: String,
    pub role_arn: String,
    /// `None` skips the MFA session and assumes the role from `profile`.
    pub mfa_device: Option<String>,
    /// `None` prompts for the MFA code.
    pub mfa_exec: Option<String>,
    pub intermediate_duration: u32,
    pub target_duration: u32,
    /// Where the activation snippet goes; `None` when exporting is off.
    pub export_file: Option<PathBuf>,
    pub renew: bool,
    pub credentials_file: Option<PathBuf>,
}

impl Config {
    /// Profile the target role is assumed from.
    pub fn source_profile(&self) -> &str {
        match self.mfa_device {
            Some(_) => &self.intermediate_profile,
            None => &self.profile,
        }
    }

    /// Pause between renewals: half the target session lifetime.
    pub fn renew_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(u64::from(self.target_duration / 2))
    }
}

impl TryFrom<Args> for Config {
    type Error = Error;

    fn try_from(args: Args) -> Result<Self> {
        let non_empty = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let target_profile = non_empty(args.target_profile)
            .ok_or_else(|| invalid("--target-profile is required"))?;
        let profile = non_empty(Some(args.profile))
            .ok_or_else(|| invalid("--profile must not be empty"))?;

        let role_arn = role_arn(
            non_empty(args.target_role_arn),
            non_empty(args.account),
            non_empty(args.target_role),
        )?;

        let mfa_device = non_empty(args.mfa_device);
        let intermediate_profile = args.intermediate_profile.trim().to_string();
        if mfa_device.is_some() {
            if intermediate_profile.is_empty() {
                return Err(invalid("--intermediate-profile must not be empty"));
            }
            if intermediate_profile == profile || intermediate_profile == target_profile {
                return Err(invalid(
                    "--intermediate-profile must differ from --profile and --target-profile",
                ));
            }
            check_range("--intermediate-duration", args.intermediate_duration, INTERMEDIATE_DURATION)?;
        }
        if target_profile == profile {
            return Err(invalid("--target-profile must differ from --profile"));
        }
        check_range("--target-duration", args.target_duration, TARGET_DURATION)?;

        // The default location is only resolved when the snippet is written.
        let export_file = match (args.export_profile, args.export_file) {
            (false, _) => None,
            (true, Some(path)) if path.as_os_str().is_empty() => {
                return Err(invalid("--export-file must not be empty"));
            }
            (true, Some(path)) => Some(path),
            (true, None) => Some(
                dirs::home_dir()
                    .map(|home| home.join(".swamp_profile"))
                    .ok_or_else(|| invalid("Could not determine home directory for --export-file"))?,
            ),
        };

        if args.renew && args.target_duration / 2 == 0 {
            return Err(invalid("--target-duration is too short to renew"));
        }

        Ok(Self {
            profile,
            intermediate_profile,
            target_profile,
            region: args.region,
            role_arn,
            mfa_device,
            mfa_exec: non_empty(args.mfa_exec),
            intermediate_duration: args.intermediate_duration,
            target_duration: args.target_duration,
            export_file,
            renew: args.renew,
            credentials_file: args.credentials_file,
        })
    }
}

fn role_arn(arn: Option<String>, account: Option<String>, role: Option<String>) -> Result<String> {
    match (arn, account, role) {
        (Some(arn), None, None) => Ok(arn),
        (None, Some(account), Some(role)) => Ok(format!("arn:aws:iam::{account}:role/{role}")),
        (Some(_), _, _) => Err(invalid(
            "--target-role-arn cannot be combined with --account or --target-role",
        )),
        _ => Err(invalid(
            "either --target-role-arn or both --account and --target-role are required",
        )),
    }
}

fn check_range(flag: &str, value: u32, range: RangeInclusive<u32>) -> Result<()> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(invalid(format!(
            "{flag} must be between {} and {} seconds, got {value}",
            range.start(),
            range.end()
        )))
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::Config(message.into())
}
