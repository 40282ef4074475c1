//! Command-line interface definitions.

use std::path::PathBuf;

use clap::Parser;

/// Assume an AWS role through an MFA-backed intermediate session.
///
/// Uses the long-term credentials of `--profile` to obtain an MFA session
/// token (stored as `--intermediate-profile`), then assumes the target role
/// and stores the result as `--target-profile` in the AWS credentials file.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Args {
    /// Profile holding the long-term credentials
    #[arg(short, long, env = "SWAMP_PROFILE", default_value = "default")]
    pub profile: String,

    /// Profile the MFA session token is stored in
    #[arg(long, env = "SWAMP_INTERMEDIATE_PROFILE", default_value = "session-token")]
    pub intermediate_profile: String,

    /// Profile the assumed role credentials are stored in
    #[arg(short, long, env = "SWAMP_TARGET_PROFILE")]
    pub target_profile: Option<String>,

    /// AWS region used for STS and written to the profiles
    #[arg(short, long, env = "SWAMP_REGION", default_value = "eu-west-1")]
    pub region: String,

    /// ARN of the role to assume
    #[arg(long, env = "SWAMP_TARGET_ROLE_ARN")]
    pub target_role_arn: Option<String>,

    /// Account id of the role to assume (combined with --target-role)
    #[arg(short, long, env = "SWAMP_ACCOUNT")]
    pub account: Option<String>,

    /// Name of the role to assume (combined with --account)
    #[arg(long, env = "SWAMP_TARGET_ROLE")]
    pub target_role: Option<String>,

    /// Serial number or ARN of the MFA device; omit to skip the MFA session
    #[arg(short, long, env = "SWAMP_MFA_DEVICE")]
    pub mfa_device: Option<String>,

    /// Shell command printing the current MFA code; omit to be prompted
    #[arg(long, env = "SWAMP_MFA_EXEC")]
    pub mfa_exec: Option<String>,

    /// Intermediate session duration in seconds (900-129600)
    #[arg(long, env = "SWAMP_INTERMEDIATE_DURATION", default_value = "43200")]
    pub intermediate_duration: u32,

    /// Target role session duration in seconds (900-43200)
    #[arg(long, env = "SWAMP_TARGET_DURATION", default_value = "3600")]
    pub target_duration: u32,

    /// Write a shell snippet activating the target profile
    #[arg(short, long)]
    pub export_profile: bool,

    /// Where the activation snippet is written [default: ~/.swamp_profile]
    #[arg(long, env = "SWAMP_EXPORT_FILE")]
    pub export_file: Option<PathBuf>,

    /// Keep running and renew the target credentials at half their lifetime
    #[arg(long)]
    pub renew: bool,

    /// Path to AWS credentials file [default: ~/.aws/credentials]
    #[arg(short, long, env = "AWS_SHARED_CREDENTIALS_FILE")]
    pub credentials_file: Option<PathBuf>,
}
