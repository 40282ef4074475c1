//! MFA token acquisition.
//!
//! The one-time code either comes from an external command (for instance a
//! password manager CLI printing the current TOTP) or is typed in by the
//! operator.

use std::{
    io::{self, BufRead, Write},
    process::Command,
};

use log::{debug, info};

use crate::error::{Error, Result};

/// Source of MFA one-time codes.
pub trait TokenSource {
    /// Returns the current code for the device `serial`, already trimmed.
    fn token_code(&self, serial: &str) -> Result<String>;
}

/// Acquires codes by running `command` through `/bin/sh`, or by prompting on
/// the terminal when no command is configured.
#[derive(Debug, Clone, Default)]
pub struct MfaTokenAcquirer {
    command: Option<String>,
}

impl MfaTokenAcquirer {
    pub fn new(command: Option<String>) -> Self {
        Self {
            command: command.filter(|c| !c.trim().is_empty()),
        }
    }
}

impl TokenSource for MfaTokenAcquirer {
    fn token_code(&self, serial: &str) -> Result<String> {
        let raw = match &self.command {
            Some(command) => fetch_token_code(serial, command)?,
            None => {
                let stdin = io::stdin();
                ask_for_token_code(serial, &mut stdin.lock(), &mut io::stdout())?
            }
        };
        Ok(clean_token_code(&raw).to_string())
    }
}

/// Strips surrounding whitespace and line terminators. Digits are not
/// checked; STS decides whether the code is valid.
pub fn clean_token_code(code: &str) -> &str {
    code.trim()
}

fn fetch_token_code(serial: &str, command: &str) -> Result<String> {
    info!("Obtaining mfa token for: {serial}");

    let output = Command::new("/bin/sh")
        .args(["-c", command])
        .output()
        .map_err(|e| Error::Execution {
            command: command.to_string(),
            reason: e.to_string(),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Execution {
            command: command.to_string(),
            reason: format!("{} {}", output.status, stderr.trim()).trim_end().to_string(),
        });
    }

    debug!("MFA command produced {} bytes", output.stdout.len());
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn ask_for_token_code(
    serial: &str,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> Result<String> {
    write!(output, "Enter mfa token for {serial}: ")
        .and_then(|()| output.flush())
        .map_err(|e| Error::io("Error prompting for mfa token", e))?;

    let mut code = String::new();
    let read = input
        .read_line(&mut code)
        .map_err(|e| Error::io("Error reading mfa token", e))?;
    if read == 0 {
        return Err(Error::io(
            "Error reading mfa token",
            io::Error::new(io::ErrorKind::UnexpectedEof, "input closed"),
        ));
    }

    Ok(code)
}
