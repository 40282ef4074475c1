//! Profile persistence in the shared AWS credentials file.
//!
//! Each profile is a section of the INI-formatted credentials file that the
//! AWS CLI and SDKs read:
//!
//! ```ini
//! [session-token]
//! aws_access_key_id=ASIA...
//! aws_secret_access_key=...
//! aws_session_token=...
//! region=eu-west-1
//! ```
//!
//! Writes replace the named section and leave every other section alone. The
//! new file is written next to the old one and renamed over it, so readers
//! never observe a half-written section. Comments in the file are not
//! preserved.

use std::path::{Path, PathBuf};

use configparser::ini::Ini;
use log::info;
use tokio::{fs, io::AsyncWriteExt};

use crate::{
    credentials::Credentials,
    error::{Error, Result},
};

// Keys that appear before the first section header land here. The name can
// never be a real section, which keeps `[default]` a regular section.
const UNSECTIONED: &str = "\u{0}unsectioned";

/// INI parser matching how AWS tools read the credentials file: section and
/// key names are case-sensitive, and `;`/`#` inside a value are literal.
pub(crate) fn credentials_parser() -> Ini {
    let mut ini = Ini::new_cs();
    ini.set_default_section(UNSECTIONED);
    let no_inline_comments: &[char] = &[];
    ini.set_inline_comment_symbols(Some(no_inline_comments));
    ini
}

/// Writes named credential sets into the credentials file.
#[derive(Debug, Clone)]
pub struct ProfileWriter {
    path: PathBuf,
}

impl ProfileWriter {
    /// Opens the credentials file, creating it and its directory if needed.
    ///
    /// # Arguments
    ///
    /// * `path` - Location of the credentials file. `None` uses
    ///   `~/.aws/credentials`, following the AWS CLI convention.
    ///
    /// # Returns
    ///
    /// * `Ok(ProfileWriter)` - The file exists and is writable
    /// * `Err(Error::Io)` - The home directory is unknown, or the directory or
    ///   file cannot be created or opened for writing
    ///
    /// This runs before any provider call, so an unwritable location aborts the
    /// process before the operator is asked for an MFA code.
    pub async fn new(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => default_credentials_path()?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::io(format!("Error creating directory {}", parent.display()), e)
            })?;
        }

        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| Error::io(format!("Error opening {}", path.display()), e))?;

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stores `credentials` under `profile`, replacing any previous entry.
    ///
    /// # Arguments
    ///
    /// * `credentials` - Temporary credentials to persist
    /// * `profile` - Section name; an existing section of that name is replaced
    ///   in full, every other section is written back unchanged
    /// * `region` - Value of the `region` key
    ///
    /// # Errors
    ///
    /// * `Error::Io` - The file cannot be read, or the new content cannot be
    ///   written or renamed into place. The original file is left untouched.
    /// * `Error::ProfileStore` - The existing file is not valid INI
    pub async fn write(&self, credentials: &Credentials, profile: &str, region: &str) -> Result<()> {
        let content = fs::read_to_string(&self.path)
            .await
            .map_err(|e| Error::io(format!("Error reading {}", self.path.display()), e))?;

        let mut ini = credentials_parser();
        ini.read(content).map_err(|reason| Error::ProfileStore {
            path: self.path.display().to_string(),
            reason,
        })?;

        ini.remove_section(profile);
        for (key, value) in [
            ("aws_access_key_id", credentials.access_key_id.as_str()),
            ("aws_secret_access_key", credentials.secret_access_key.as_str()),
            ("aws_session_token", credentials.session_token.as_str()),
            ("region", region),
        ] {
            ini.set(profile, key, Some(value.to_string()));
        }

        self.replace(ini.writes()).await?;
        info!(
            "Wrote profile {profile} to {} (expires at {})",
            self.path.display(),
            credentials.expires_at()
        );
        Ok(())
    }

    async fn replace(&self, content: String) -> Result<()> {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".swamp.tmp");
        let tmp = PathBuf::from(tmp);

        let result = self.replace_with(&tmp, content.as_bytes()).await;
        if result.is_err() {
            let _ = fs::remove_file(&tmp).await;
        }
        result
    }

    async fn replace_with(&self, tmp: &Path, content: &[u8]) -> Result<()> {
        let write_err = |e: std::io::Error| Error::io(format!("Error writing {}", tmp.display()), e);

        // A leftover from an interrupted run may carry a wider mode.
        let _ = fs::remove_file(tmp).await;

        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(tmp).await.map_err(write_err)?;
        file.write_all(content).await.map_err(write_err)?;
        file.sync_all().await.map_err(write_err)?;
        drop(file);

        fs::rename(tmp, &self.path)
            .await
            .map_err(|e| Error::io(format!("Error replacing {}", self.path.display()), e))
    }
}

fn default_credentials_path() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".aws").join("credentials"))
        .ok_or_else(|| {
            Error::io(
                "Could not determine home directory",
                std::io::Error::new(std::io::ErrorKind::NotFound, "no home directory"),
            )
        })
}

#[cfg(test)]
mod tests {
    use aws_smithy_types::DateTime;
    use tempfile::TempDir;

    use super::*;

    fn credentials(tag: &str) -> Credentials {
        Credentials {
            access_key_id: format!("ASIA{tag}"),
            secret_access_key: format!("secret-{tag}"),
            session_token: format!("token/{tag}+=="),
            expiration: DateTime::from_secs(1_700_000_000),
        }
    }

    fn load(path: &Path) -> Ini {
        let mut ini = credentials_parser();
        ini.load(path).unwrap();
        ini
    }

    async fn writer(dir: &TempDir) -> ProfileWriter {
        ProfileWriter::new(Some(dir.path().join(".aws").join("credentials")))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn creates_missing_file_and_directory() {
        let dir = TempDir::new().unwrap();
        let writer = writer(&dir).await;

        assert!(writer.path().exists());
        assert_eq!(std::fs::read_to_string(writer.path()).unwrap(), "");
    }

    #[tokio::test]
    async fn unwritable_location_fails_fast() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();

        let err = ProfileWriter::new(Some(blocker.join("credentials")))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io { .. }), "{err}");
    }

    #[tokio::test]
    async fn last_write_wins() {
        let dir = TempDir::new().unwrap();
        let writer = writer(&dir).await;

        writer.write(&credentials("ONE"), "target", "eu-west-1").await.unwrap();
        writer.write(&credentials("TWO"), "target", "us-east-1").await.unwrap();

        let content = std::fs::read_to_string(writer.path()).unwrap();
        assert_eq!(content.matches("[target]").count(), 1);

        let ini = load(writer.path());
        assert_eq!(ini.get("target", "aws_access_key_id").as_deref(), Some("ASIATWO"));
        assert_eq!(ini.get("target", "aws_secret_access_key").as_deref(), Some("secret-TWO"));
        assert_eq!(ini.get("target", "aws_session_token").as_deref(), Some("token/TWO+=="));
        assert_eq!(ini.get("target", "region").as_deref(), Some("us-east-1"));
    }

    #[tokio::test]
    async fn distinct_profiles_do_not_interfere() {
        let dir = TempDir::new().unwrap();
        let writer = writer(&dir).await;

        writer.write(&credentials("A"), "a", "eu-west-1").await.unwrap();
        writer.write(&credentials("B"), "b", "eu-west-2").await.unwrap();

        let ini = load(writer.path());
        assert_eq!(ini.get("a", "aws_access_key_id").as_deref(), Some("ASIAA"));
        assert_eq!(ini.get("a", "region").as_deref(), Some("eu-west-1"));
        assert_eq!(ini.get("b", "aws_access_key_id").as_deref(), Some("ASIAB"));
        assert_eq!(ini.get("b", "region").as_deref(), Some("eu-west-2"));
    }

    #[tokio::test]
    async fn preserves_unrelated_sections() {
        let dir = TempDir::new().unwrap();
        let writer = writer(&dir).await;
        std::fs::write(
            writer.path(),
            "[default]\naws_access_key_id=AKIALONGTERM\naws_secret_access_key=long/term\n\n\
             [Other-Profile]\nregion=ap-southeast-2\n",
        )
        .unwrap();

        writer.write(&credentials("NEW"), "session-token", "eu-west-1").await.unwrap();

        let content = std::fs::read_to_string(writer.path()).unwrap();
        assert!(content.contains("[default]"), "{content}");

        let ini = load(writer.path());
        assert_eq!(ini.get("default", "aws_access_key_id").as_deref(), Some("AKIALONGTERM"));
        assert_eq!(ini.get("default", "aws_secret_access_key").as_deref(), Some("long/term"));
        assert_eq!(ini.get("Other-Profile", "region").as_deref(), Some("ap-southeast-2"));
        assert_eq!(ini.get("session-token", "aws_access_key_id").as_deref(), Some("ASIANEW"));
    }

    #[tokio::test]
    async fn replacing_drops_stale_keys_of_the_section() {
        let dir = TempDir::new().unwrap();
        let writer = writer(&dir).await;
        std::fs::write(writer.path(), "[target]\nexpiration=yesterday\n").unwrap();

        writer.write(&credentials("X"), "target", "eu-west-1").await.unwrap();

        let ini = load(writer.path());
        assert_eq!(ini.get("target", "expiration"), None);
        assert_eq!(ini.get("target", "aws_access_key_id").as_deref(), Some("ASIAX"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let writer = writer(&dir).await;
        writer.write(&credentials("P"), "p", "eu-west-1").await.unwrap();

        let mode = std::fs::metadata(writer.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn comment_characters_in_values_survive() {
        let dir = TempDir::new().unwrap();
        let writer = writer(&dir).await;
        std::fs::write(
            writer.path(),
            "[tool]\ncredential_process=/usr/bin/get-creds --name a#b;c\nnote=x ; y\n",
        )
        .unwrap();

        writer.write(&credentials("C"), "target", "eu-west-1").await.unwrap();

        let content = std::fs::read_to_string(writer.path()).unwrap();
        assert!(content.contains("--name a#b;c"), "{content}");

        let ini = load(writer.path());
        assert_eq!(
            ini.get("tool", "credential_process").as_deref(),
            Some("/usr/bin/get-creds --name a#b;c")
        );
        assert_eq!(ini.get("tool", "note").as_deref(), Some("x ; y"));
    }

    #[tokio::test]
    async fn failed_replace_leaves_no_temporary_file() {
        let dir = TempDir::new().unwrap();
        // Renaming a file over a directory fails.
        let target = dir.path().join("credentials");
        std::fs::create_dir(&target).unwrap();
        let writer = ProfileWriter { path: target };

        let err = writer.replace("[p]\nk=v\n".into()).await.unwrap_err();

        assert!(matches!(err, Error::Io { .. }), "{err}");
        assert!(!dir.path().join("credentials.swamp.tmp").exists());
    }

    #[tokio::test]
    async fn successful_replace_leaves_no_temporary_file() {
        let dir = TempDir::new().unwrap();
        let writer = writer(&dir).await;
        std::fs::write(format!("{}.swamp.tmp", writer.path().display()), "stale").unwrap();

        writer.write(&credentials("T"), "t", "eu-west-1").await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(writer.path().parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, ["credentials"]);
    }
}
