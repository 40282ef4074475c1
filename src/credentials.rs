//! Temporary AWS credentials as handed from STS to the profile writer.

use std::fmt;

use aws_sdk_sts::types;
use aws_smithy_types::{DateTime, date_time::Format};

/// Temporary credentials returned by STS.
///
/// Lives for one orchestration cycle: handed to the profile writer and then
/// dropped.
#[derive(Clone, PartialEq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expiration: DateTime,
}

impl Credentials {
    /// Expiration in RFC 3339 form, for log output.
    pub fn expires_at(&self) -> String {
        self.expiration
            .fmt(Format::DateTime)
            .unwrap_or_else(|_| "unknown".to_string())
    }
}

impl From<&types::Credentials> for Credentials {
    fn from(credentials: &types::Credentials) -> Self {
        Self {
            access_key_id: credentials.access_key_id().to_string(),
            secret_access_key: credentials.secret_access_key().to_string(),
            session_token: credentials.session_token().to_string(),
            expiration: *credentials.expiration(),
        }
    }
}

// Secrets stay out of debug output.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &"** redacted **")
            .field("expiration", &self.expires_at())
            .finish()
    }
}
