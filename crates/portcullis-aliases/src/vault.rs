//! One cluster's sealed aliases and their on-disk JSON form.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::crypto::{ClusterKey, SALT_LEN, SealedValue, generate_salt};
use crate::error::{AliasError, AliasResult};
use crate::master::MasterSecret;

/// Suffix of every cluster file.
pub const CLUSTER_FILE_SUFFIX: &str = "-credentials.json";
const FORMAT_VERSION: u32 = 1;
const VERIFIER_PLAINTEXT: &[u8] = b"portcullis-alias-verifier";

/// Persisted record of one alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAlias {
    /// Sealed secret.
    pub value: SealedValue,
    /// When the value was last written.
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ClusterFile {
    version: u32,
    cluster: String,
    salt: String,
    verifier: SealedValue,
    aliases: BTreeMap<String, StoredAlias>,
}

/// Decrypted view of a cluster: its key plus sealed alias records.
#[derive(Debug)]
pub struct ClusterVault {
    cluster: String,
    salt: [u8; SALT_LEN],
    key: ClusterKey,
    verifier: SealedValue,
    aliases: BTreeMap<String, StoredAlias>,
    /// Holds changes the cluster file does not have yet.
    dirty: bool,
}

impl ClusterVault {
    /// Fresh, empty vault for `cluster`.
    ///
    /// # Errors
    ///
    /// Returns an error if key derivation or sealing the verifier fails.
    pub fn create(cluster: &str, master: &MasterSecret) -> AliasResult<Self> {
        let salt = generate_salt();
        let key = ClusterKey::derive(cluster, master.as_bytes(), &salt)?;
        let verifier = key.seal(VERIFIER_PLAINTEXT)?;
        Ok(Self {
            cluster: cluster.to_string(),
            salt,
            key,
            verifier,
            aliases: BTreeMap::new(),
            dirty: true,
        })
    }

    /// Load a vault from `path`, checking the master secret against its verifier.
    ///
    /// # Errors
    ///
    /// Returns [`AliasError::MasterSecretMismatch`] when the verifier does not
    /// open, and IO, JSON, or corrupt-record errors for unreadable files.
    pub fn load(path: &Path, master: &MasterSecret) -> AliasResult<Self> {
        let raw = fs::read(path).map_err(|source| AliasError::io("vault.read", path, source))?;
        let file: ClusterFile =
            serde_json::from_slice(&raw).map_err(|source| AliasError::json("vault.parse", path, source))?;
        if file.version != FORMAT_VERSION {
            return Err(AliasError::corrupt(&file.cluster, "version"));
        }
        let salt: [u8; SALT_LEN] = general_purpose::STANDARD
            .decode(&file.salt)
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(|| AliasError::corrupt(&file.cluster, "salt"))?;
        let key = ClusterKey::derive(&file.cluster, master.as_bytes(), &salt)?;
        match key.open(&file.verifier) {
            Ok(plain) if plain.as_slice() == VERIFIER_PLAINTEXT => {}
            Ok(_) | Err(AliasError::Crypto { .. }) => {
                return Err(AliasError::MasterSecretMismatch {
                    cluster: file.cluster,
                });
            }
            Err(other) => return Err(other),
        }
        Ok(Self {
            cluster: file.cluster,
            salt,
            key,
            verifier: file.verifier,
            aliases: file.aliases,
            dirty: false,
        })
    }

    /// Write the vault to `path` atomically (temp file, then rename).
    ///
    /// # Errors
    ///
    /// Returns IO or JSON errors; the previous file is left intact on failure.
    pub fn save(&mut self, path: &Path) -> AliasResult<()> {
        let file = ClusterFile {
            version: FORMAT_VERSION,
            cluster: self.cluster.clone(),
            salt: general_purpose::STANDARD.encode(self.salt),
            verifier: self.verifier.clone(),
            aliases: self.aliases.clone(),
        };
        let body = serde_json::to_vec_pretty(&file)
            .map_err(|source| AliasError::json("vault.serialize", path, source))?;
        let temp = temp_path(path);
        let written = write_replacing(&temp, path, &body);
        if written.is_err() {
            let _ = fs::remove_file(&temp);
        } else {
            self.dirty = false;
        }
        written
    }

    /// Whether the vault changed since it was loaded or last saved.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Cluster this vault belongs to.
    #[must_use]
    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    /// Alias names in ascending order.
    #[must_use]
    pub fn alias_names(&self) -> Vec<String> {
        self.aliases.keys().cloned().collect()
    }

    /// Whether `alias` is stored.
    #[must_use]
    pub fn contains(&self, alias: &str) -> bool {
        self.aliases.contains_key(alias)
    }

    /// Number of stored aliases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    /// Whether the vault holds no aliases.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// Seal and store `value`, returning the record it replaced.
    ///
    /// # Errors
    ///
    /// Returns [`AliasError::Crypto`] if sealing fails.
    pub fn put(&mut self, alias: &str, value: &[u8]) -> AliasResult<Option<StoredAlias>> {
        let record = StoredAlias {
            value: self.key.seal(value)?,
            updated_at: Utc::now(),
        };
        self.dirty = true;
        Ok(self.aliases.insert(alias.to_string(), record))
    }

    /// Remove `alias`, returning its record.
    pub fn remove(&mut self, alias: &str) -> Option<StoredAlias> {
        let removed = self.aliases.remove(alias);
        self.dirty |= removed.is_some();
        removed
    }

    /// Put a previously removed or replaced record back.
    ///
    /// Only used to undo a mutation that failed to persist, so the vault is
    /// clean again afterwards.
    pub fn restore(&mut self, alias: &str, previous: Option<StoredAlias>) {
        self.dirty = false;
        match previous {
            Some(record) => {
                self.aliases.insert(alias.to_string(), record);
            }
            None => {
                self.aliases.remove(alias);
            }
        }
    }

    /// Copy of every record, for all-or-nothing batches.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, StoredAlias> {
        self.aliases.clone()
    }

    /// Replace every record with `snapshot`, taken while the vault was clean.
    pub fn rollback(&mut self, snapshot: BTreeMap<String, StoredAlias>) {
        self.dirty = false;
        self.aliases = snapshot;
    }

    /// Decrypt `alias`.
    ///
    /// # Errors
    ///
    /// Returns [`AliasError::AliasNotFound`] when absent, or a decode error.
    pub fn reveal(&self, alias: &str) -> AliasResult<Zeroizing<String>> {
        let record = self.aliases.get(alias).ok_or_else(|| AliasError::AliasNotFound {
            cluster: self.cluster.clone(),
            alias: alias.to_string(),
        })?;
        let plain = self.key.open(&record.value)?;
        std::str::from_utf8(&plain)
            .map(|text| Zeroizing::new(text.to_string()))
            .map_err(|_| AliasError::corrupt(&self.cluster, "value"))
    }
}

/// `<dir>/<cluster>-credentials.json`.
#[must_use]
pub fn cluster_path(dir: &Path, cluster: &str) -> PathBuf {
    dir.join(format!("{cluster}{CLUSTER_FILE_SUFFIX}"))
}

/// Cluster name encoded in a cluster file name.
#[must_use]
pub fn cluster_from_file_name(name: &str) -> Option<&str> {
    name.strip_suffix(CLUSTER_FILE_SUFFIX)
        .filter(|cluster| !cluster.is_empty())
}

fn write_replacing(temp: &Path, path: &Path, body: &[u8]) -> AliasResult<()> {
    let mut handle =
        fs::File::create(temp).map_err(|source| AliasError::io("vault.create_temp", temp, source))?;
    restrict_permissions(temp)?;
    handle
        .write_all(body)
        .and_then(|()| handle.sync_all())
        .map_err(|source| AliasError::io("vault.write_temp", temp, source))?;
    fs::rename(temp, path).map_err(|source| AliasError::io("vault.rename", path, source))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Make `path` readable by its owner only.
#[cfg(unix)]
pub(crate) fn restrict_permissions(path: &Path) -> AliasResult<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .map_err(|source| AliasError::io("set_permissions", path, source))
}

/// Make `path` readable by its owner only.
#[cfg(not(unix))]
pub(crate) fn restrict_permissions(_path: &Path) -> AliasResult<()> {
    Ok(())
}
