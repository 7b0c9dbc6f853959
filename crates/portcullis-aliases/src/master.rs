//! Master secret resolution and the `master` file.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use rand::Rng;
use rand::distr::Alphanumeric;
use tracing::info;
use zeroize::Zeroizing;

use crate::error::{AliasError, AliasResult};
use crate::vault::restrict_permissions;

/// Environment variable that supplies the master secret directly.
pub const ENV_MASTER_SECRET: &str = "PORTCULLIS_MASTER_SECRET";
/// File name of the master secret inside the store directory.
pub const MASTER_FILE_NAME: &str = "master";
const GENERATED_MASTER_LEN: usize = 32;

/// Secret every cluster key is derived from.
#[derive(Clone)]
pub struct MasterSecret(Zeroizing<String>);

impl std::fmt::Debug for MasterSecret {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("MasterSecret(<redacted>)")
    }
}

impl MasterSecret {
    /// Wrap a master secret, rejecting blank values.
    ///
    /// # Errors
    ///
    /// Returns [`AliasError::EmptyValue`] when `secret` is blank.
    pub fn new(secret: impl Into<String>) -> AliasResult<Self> {
        let secret = Zeroizing::new(secret.into());
        if secret.trim().is_empty() {
            return Err(AliasError::EmptyValue {
                alias: MASTER_FILE_NAME.to_string(),
            });
        }
        Ok(Self(secret))
    }

    /// Random alphanumeric master secret.
    #[must_use]
    pub fn generate() -> Self {
        let secret: String = rand::rng()
            .sample_iter(Alphanumeric)
            .take(GENERATED_MASTER_LEN)
            .map(char::from)
            .collect();
        Self(Zeroizing::new(secret))
    }

    /// Resolve from `PORTCULLIS_MASTER_SECRET`, falling back to the master file.
    ///
    /// # Errors
    ///
    /// Returns [`AliasError::MasterSecretMissing`] when neither source exists.
    pub fn resolve(store_dir: &Path) -> AliasResult<Self> {
        Self::resolve_with(store_dir, |name| std::env::var(name).ok())
    }

    /// [`MasterSecret::resolve`] with an injectable environment lookup.
    ///
    /// # Errors
    ///
    /// Returns [`AliasError::MasterSecretMissing`] when neither source exists.
    pub fn resolve_with<F>(store_dir: &Path, lookup: F) -> AliasResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secret) = lookup(ENV_MASTER_SECRET).filter(|s| !s.trim().is_empty()) {
            return Self::new(secret);
        }
        let path = master_path(store_dir);
        match fs::read_to_string(&path) {
            Ok(contents) => Self::new(contents.trim_end_matches(['\r', '\n']).to_string())
                .map_err(|_| AliasError::MasterSecretMissing { path }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(AliasError::MasterSecretMissing { path })
            }
            Err(err) => Err(AliasError::io("master.read", path, err)),
        }
    }

    /// Persist to `<store_dir>/master`, owner-readable only.
    ///
    /// # Errors
    ///
    /// Returns [`AliasError::MasterSecretExists`] when the file exists and
    /// `force` is false, or an IO error.
    pub fn write(&self, store_dir: &Path, force: bool) -> AliasResult<PathBuf> {
        let path = master_path(store_dir);
        if path.exists() && !force {
            return Err(AliasError::MasterSecretExists { path });
        }
        fs::create_dir_all(store_dir)
            .map_err(|source| AliasError::io("master.create_dir", store_dir, source))?;
        let mut file = fs::File::create(&path)
            .map_err(|source| AliasError::io("master.create", &path, source))?;
        restrict_permissions(&path)?;
        file.write_all(self.0.as_bytes())
            .and_then(|()| file.write_all(b"\n"))
            .and_then(|()| file.sync_all())
            .map_err(|source| AliasError::io("master.write", &path, source))?;
        info!(path = %path.display(), "master secret written");
        Ok(path)
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

/// Location of the master file for `store_dir`.
#[must_use]
pub fn master_path(store_dir: &Path) -> PathBuf {
    store_dir.join(MASTER_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn environment_wins_over_file() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        MasterSecret::new("from-file")?.write(dir.path(), false)?;

        let from_env = MasterSecret::resolve_with(dir.path(), |name| {
            (name == ENV_MASTER_SECRET).then(|| "from-env".to_string())
        })?;
        assert_eq!(from_env.as_bytes(), b"from-env");

        let from_file = MasterSecret::resolve_with(dir.path(), |_| None)?;
        assert_eq!(from_file.as_bytes(), b"from-file");
        Ok(())
    }

    #[test]
    fn missing_master_is_reported_with_path() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let Err(AliasError::MasterSecretMissing { path }) =
            MasterSecret::resolve_with(dir.path(), |_| None)
        else {
            panic!("expected missing master secret");
        };
        assert_eq!(path, dir.path().join("master"));
        Ok(())
    }

    #[test]
    fn write_refuses_to_clobber_without_force() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let generated = MasterSecret::generate();
        assert_eq!(generated.as_bytes().len(), 32);
        generated.write(dir.path(), false)?;
        assert!(matches!(
            MasterSecret::new("other")?.write(dir.path(), false),
            Err(AliasError::MasterSecretExists { .. })
        ));
        MasterSecret::new("other")?.write(dir.path(), true)?;
        assert_eq!(
            MasterSecret::resolve_with(dir.path(), |_| None)?.as_bytes(),
            b"other"
        );
        assert!(!format!("{generated:?}").contains(std::str::from_utf8(generated.as_bytes())?));
        Ok(())
    }

    #[test]
    fn blank_secrets_are_rejected() {
        assert!(MasterSecret::new("  ").is_err());
    }
}
