//! The alias credential store: every cluster vault behind one lock.
//!
//! # Design
//! - One store-wide `RwLock`; mutations hold the write lock across the file
//!   write so readers never observe a half-applied batch.
//! - Each mutation is persisted before it returns; a failed write rolls the
//!   in-memory vault back to its previous state.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use portcullis_telemetry::Metrics;
use rand::Rng;
use rand::distr::Alphanumeric;
use tracing::{error, info, warn};
use zeroize::Zeroizing;

use crate::error::{AliasError, AliasResult};
use crate::master::MasterSecret;
use crate::names::{DEFAULT_CLUSTER, validate_alias, validate_cluster};
use crate::vault::{ClusterVault, cluster_from_file_name, cluster_path};

/// Length of generated alias secrets.
pub const GENERATED_SECRET_LEN: usize = 16;

/// Secret to store under an alias.
#[derive(Clone)]
pub enum AliasValue {
    /// Caller-supplied secret.
    Provided(Zeroizing<String>),
    /// Generate a random secret.
    Generate,
}

impl AliasValue {
    /// Wrap a caller-supplied secret.
    #[must_use]
    pub fn provided(value: impl Into<String>) -> Self {
        Self::Provided(Zeroizing::new(value.into()))
    }

    const fn is_generated(&self) -> bool {
        matches!(self, Self::Generate)
    }
}

impl std::fmt::Debug for AliasValue {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Provided(_) => formatter.write_str("Provided(<redacted>)"),
            Self::Generate => formatter.write_str("Generate"),
        }
    }
}

/// Outcome of a single create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedAlias {
    /// Cluster the alias was stored in.
    pub cluster: String,
    /// Alias name.
    pub alias: String,
    /// Whether the secret was generated.
    pub generated: bool,
    /// Whether an existing value was replaced.
    pub replaced: bool,
}

/// One entry of a bulk create.
#[derive(Debug, Clone)]
pub struct BulkEntry {
    /// Target cluster.
    pub cluster: String,
    /// Alias name.
    pub alias: String,
    /// Secret to store.
    pub value: AliasValue,
}

/// What a bulk create did for one cluster.
#[derive(Debug)]
pub struct ClusterBatch {
    /// Cluster name.
    pub cluster: String,
    /// Aliases created, in input order, or the error that aborted the batch.
    pub outcome: AliasResult<BatchCreated>,
}

/// Aliases committed for one cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchCreated {
    /// Every alias written, in input order.
    pub created: Vec<String>,
    /// The subset whose secrets were generated.
    pub generated: Vec<String>,
}

/// Alias names currently stored for a cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterListing {
    /// Cluster name.
    pub cluster: String,
    /// Alias names, ascending.
    pub aliases: Vec<String>,
}

/// Per-cluster encrypted alias store.
pub struct AliasStore {
    dir: PathBuf,
    master: MasterSecret,
    vaults: RwLock<HashMap<String, ClusterVault>>,
    metrics: Option<Metrics>,
}

impl std::fmt::Debug for AliasStore {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("AliasStore")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

impl AliasStore {
    /// Open the store in `dir`, loading every persisted cluster.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be created or read, or a
    /// cluster file is corrupt or sealed under a different master secret.
    pub fn open(dir: impl Into<PathBuf>, master: MasterSecret) -> AliasResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| AliasError::io("store.create_dir", &dir, source))?;
        let mut vaults = HashMap::new();
        let entries =
            fs::read_dir(&dir).map_err(|source| AliasError::io("store.read_dir", &dir, source))?;
        for entry in entries {
            let entry = entry.map_err(|source| AliasError::io("store.read_entry", &dir, source))?;
            let file_name = entry.file_name();
            let Some(cluster) = file_name.to_str().and_then(cluster_from_file_name) else {
                continue;
            };
            if validate_cluster(cluster).is_err() {
                warn!(file = %entry.path().display(), "skipping cluster file with invalid name");
                continue;
            }
            let vault = ClusterVault::load(&entry.path(), &master)?;
            vaults.insert(cluster.to_string(), vault);
        }
        info!(dir = %dir.display(), clusters = vaults.len(), "alias store opened");
        Ok(Self {
            dir,
            master,
            vaults: RwLock::new(vaults),
            metrics: None,
        })
    }

    /// Record alias operations on `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Directory holding the cluster files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Clusters that currently have a vault, sorted.
    #[must_use]
    pub fn clusters(&self) -> Vec<String> {
        let mut clusters: Vec<String> = self.read().keys().cloned().collect();
        clusters.sort();
        clusters
    }

    /// Store `value` under `(cluster, alias)`.
    ///
    /// # Errors
    ///
    /// Returns [`AliasError::AliasAlreadyExists`] when the alias exists and
    /// `overwrite` is false, [`AliasError::InvalidName`] or
    /// [`AliasError::EmptyValue`] for bad input, or a persistence error (in
    /// which case nothing changed).
    pub fn create_alias(
        &self,
        cluster: &str,
        alias: &str,
        value: AliasValue,
        overwrite: bool,
    ) -> AliasResult<CreatedAlias> {
        let result = self.create_alias_inner(cluster, alias, &value, overwrite);
        self.record("create", &result);
        if let Ok(created) = &result {
            info!(
                cluster = %created.cluster,
                alias = %created.alias,
                generated = created.generated,
                replaced = created.replaced,
                "alias created"
            );
        }
        result
    }

    fn create_alias_inner(
        &self,
        cluster: &str,
        alias: &str,
        value: &AliasValue,
        overwrite: bool,
    ) -> AliasResult<CreatedAlias> {
        validate_cluster(cluster)?;
        validate_alias(alias)?;
        let secret = resolve_value(alias, value)?;

        let mut vaults = self.write();
        let is_new_cluster = !vaults.contains_key(cluster);
        let path = cluster_path(&self.dir, cluster);
        let vault = match vaults.entry(cluster.to_string()) {
            Entry::Occupied(existing) => existing.into_mut(),
            Entry::Vacant(slot) => slot.insert(ClusterVault::create(cluster, &self.master)?),
        };
        if vault.contains(alias) && !overwrite {
            if is_new_cluster {
                vaults.remove(cluster);
            }
            return Err(AliasError::AliasAlreadyExists {
                cluster: cluster.to_string(),
                alias: alias.to_string(),
            });
        }

        let previous = vault.put(alias, secret.as_bytes())?;
        let replaced = previous.is_some();
        if let Err(err) = vault.save(&path) {
            vault.restore(alias, previous);
            if is_new_cluster {
                vaults.remove(cluster);
            }
            return Err(err);
        }
        Ok(CreatedAlias {
            cluster: cluster.to_string(),
            alias: alias.to_string(),
            generated: value.is_generated(),
            replaced,
        })
    }

    /// Create many aliases, grouped by cluster in first-seen order.
    ///
    /// Each cluster's sub-batch is all-or-nothing. A failing cluster is
    /// reported and processing continues with the next one.
    pub fn create_aliases_bulk(&self, entries: &[BulkEntry], overwrite: bool) -> Vec<ClusterBatch> {
        let mut order: Vec<&str> = Vec::new();
        let mut grouped: HashMap<&str, Vec<&BulkEntry>> = HashMap::new();
        for entry in entries {
            let cluster = entry.cluster.as_str();
            if !grouped.contains_key(cluster) {
                order.push(cluster);
            }
            grouped.entry(cluster).or_default().push(entry);
        }

        order
            .into_iter()
            .map(|cluster| {
                let batch = grouped.remove(cluster).unwrap_or_default();
                let outcome = self.create_cluster_batch(cluster, &batch, overwrite);
                self.record("create_bulk", &outcome);
                match &outcome {
                    Ok(created) => info!(
                        cluster,
                        created = created.created.len(),
                        "alias batch committed"
                    ),
                    Err(err) => error!(cluster, error = %err, "alias batch aborted"),
                }
                ClusterBatch {
                    cluster: cluster.to_string(),
                    outcome,
                }
            })
            .collect()
    }

    fn create_cluster_batch(
        &self,
        cluster: &str,
        batch: &[&BulkEntry],
        overwrite: bool,
    ) -> AliasResult<BatchCreated> {
        validate_cluster(cluster)?;
        let mut secrets = Vec::with_capacity(batch.len());
        for entry in batch {
            validate_alias(&entry.alias)?;
            secrets.push(resolve_value(&entry.alias, &entry.value)?);
        }

        let mut vaults = self.write();
        let is_new_cluster = !vaults.contains_key(cluster);
        let vault = match vaults.entry(cluster.to_string()) {
            Entry::Occupied(existing) => existing.into_mut(),
            Entry::Vacant(slot) => slot.insert(ClusterVault::create(cluster, &self.master)?),
        };
        let snapshot = vault.snapshot();
        let applied = apply_batch(vault, batch, &secrets, overwrite)
            .and_then(|report| vault.save(&cluster_path(&self.dir, cluster)).map(|()| report));
        if applied.is_err() {
            vault.rollback(snapshot);
            if is_new_cluster {
                vaults.remove(cluster);
            }
        }
        applied
    }

    /// Alias names for each requested cluster; `__gateway` when none given.
    ///
    /// Clusters without a vault list as empty. Values are never returned.
    ///
    /// # Errors
    ///
    /// Returns [`AliasError::InvalidName`] for an invalid cluster name.
    pub fn list_aliases<S: AsRef<str>>(&self, clusters: &[S]) -> AliasResult<Vec<ClusterListing>> {
        let requested: Vec<&str> = if clusters.is_empty() {
            vec![DEFAULT_CLUSTER]
        } else {
            clusters.iter().map(AsRef::as_ref).collect()
        };
        for cluster in &requested {
            validate_cluster(cluster)?;
        }
        let vaults = self.read();
        let listings = requested
            .into_iter()
            .map(|cluster| ClusterListing {
                cluster: cluster.to_string(),
                aliases: vaults
                    .get(cluster)
                    .map(ClusterVault::alias_names)
                    .unwrap_or_default(),
            })
            .collect();
        drop(vaults);
        if let Some(metrics) = &self.metrics {
            metrics.inc_alias_operation("list", "ok");
        }
        Ok(listings)
    }

    /// Remove `(cluster, alias)`.
    ///
    /// # Errors
    ///
    /// Returns [`AliasError::AliasNotFound`] when absent, or a persistence
    /// error (in which case the alias is kept).
    pub fn delete_alias(&self, cluster: &str, alias: &str) -> AliasResult<()> {
        let result = self.delete_alias_inner(cluster, alias);
        self.record("delete", &result);
        if result.is_ok() {
            info!(cluster, alias, "alias deleted");
        }
        result
    }

    fn delete_alias_inner(&self, cluster: &str, alias: &str) -> AliasResult<()> {
        validate_cluster(cluster)?;
        let not_found = || AliasError::AliasNotFound {
            cluster: cluster.to_string(),
            alias: alias.to_string(),
        };
        let mut vaults = self.write();
        let vault = vaults.get_mut(cluster).ok_or_else(not_found)?;
        let previous = vault.remove(alias).ok_or_else(not_found)?;
        if let Err(err) = vault.save(&cluster_path(&self.dir, cluster)) {
            vault.restore(alias, Some(previous));
            return Err(err);
        }
        Ok(())
    }

    /// Decrypt the secret stored under `(cluster, alias)`.
    ///
    /// # Errors
    ///
    /// Returns [`AliasError::AliasNotFound`] when absent.
    pub fn get_secret(&self, cluster: &str, alias: &str) -> AliasResult<Zeroizing<String>> {
        let result = self.read().get(cluster).map_or_else(
            || {
                Err(AliasError::AliasNotFound {
                    cluster: cluster.to_string(),
                    alias: alias.to_string(),
                })
            },
            |vault| vault.reveal(alias),
        );
        self.record("get", &result);
        result
    }

    /// Persist vaults holding changes their cluster file lacks.
    ///
    /// Clean vaults are left alone: another process (the admin CLI) may have
    /// rewritten their files since this store loaded them.
    ///
    /// # Errors
    ///
    /// Returns the first persistence error.
    pub fn flush(&self) -> AliasResult<()> {
        let mut vaults = self.write();
        let mut written = 0_usize;
        for (cluster, vault) in vaults.iter_mut().filter(|(_, vault)| vault.is_dirty()) {
            vault.save(&cluster_path(&self.dir, cluster))?;
            written += 1;
        }
        info!(clusters = vaults.len(), written, "alias store flushed");
        Ok(())
    }

    fn record<T>(&self, operation: &str, result: &AliasResult<T>) {
        if let Some(metrics) = &self.metrics {
            let outcome = match result {
                Ok(_) => "ok",
                Err(AliasError::AliasAlreadyExists { .. }) => "exists",
                Err(AliasError::AliasNotFound { .. }) => "not_found",
                Err(_) => "error",
            };
            metrics.inc_alias_operation(operation, outcome);
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, ClusterVault>> {
        match self.vaults.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!("alias store lock poisoned; continuing with recovered guard");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, ClusterVault>> {
        match self.vaults.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!("alias store lock poisoned; continuing with recovered guard");
                poisoned.into_inner()
            }
        }
    }
}

fn apply_batch(
    vault: &mut ClusterVault,
    batch: &[&BulkEntry],
    secrets: &[Zeroizing<String>],
    overwrite: bool,
) -> AliasResult<BatchCreated> {
    let mut report = BatchCreated::default();
    for (entry, secret) in batch.iter().zip(secrets) {
        let duplicate_in_batch = report.created.iter().any(|a| a == &entry.alias);
        if duplicate_in_batch || (vault.contains(&entry.alias) && !overwrite) {
            return Err(AliasError::AliasAlreadyExists {
                cluster: vault.cluster().to_string(),
                alias: entry.alias.clone(),
            });
        }
        vault.put(&entry.alias, secret.as_bytes())?;
        report.created.push(entry.alias.clone());
        if entry.value.is_generated() {
            report.generated.push(entry.alias.clone());
        }
    }
    Ok(report)
}

fn resolve_value(alias: &str, value: &AliasValue) -> AliasResult<Zeroizing<String>> {
    match value {
        AliasValue::Provided(secret) if secret.is_empty() => Err(AliasError::EmptyValue {
            alias: alias.to_string(),
        }),
        AliasValue::Provided(secret) => Ok(secret.clone()),
        AliasValue::Generate => Ok(generate_secret()),
    }
}

/// Random alphanumeric secret of [`GENERATED_SECRET_LEN`] characters.
#[must_use]
pub fn generate_secret() -> Zeroizing<String> {
    Zeroizing::new(
        rand::rng()
            .sample_iter(Alphanumeric)
            .take(GENERATED_SECRET_LEN)
            .map(char::from)
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::sync::Arc;
    use std::thread;

    type TestResult = Result<(), Box<dyn Error>>;

    fn open(dir: &Path) -> AliasResult<AliasStore> {
        AliasStore::open(dir, MasterSecret::new("test-master")?)
    }

    fn entry(cluster: &str, alias: &str, value: &str) -> BulkEntry {
        BulkEntry {
            cluster: cluster.into(),
            alias: alias.into(),
            value: AliasValue::provided(value),
        }
    }

    #[test]
    fn generated_alias_is_listed_for_its_cluster() -> TestResult {
        let dir = tempfile::tempdir()?;
        let store = open(dir.path())?;
        let created = store.create_alias("cluster1", "test_key", AliasValue::Generate, false)?;
        assert!(created.generated);
        assert!(!created.replaced);

        let listings = store.list_aliases(&["cluster1"])?;
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].cluster, "cluster1");
        assert_eq!(listings[0].aliases, vec!["test_key"]);
        assert_eq!(store.get_secret("cluster1", "test_key")?.len(), GENERATED_SECRET_LEN);
        Ok(())
    }

    #[test]
    fn listing_without_clusters_uses_gateway_scope() -> TestResult {
        let dir = tempfile::tempdir()?;
        let store = open(dir.path())?;
        store.create_alias(DEFAULT_CLUSTER, "b-alias", AliasValue::provided("2"), false)?;
        store.create_alias(DEFAULT_CLUSTER, "a-alias", AliasValue::provided("1"), false)?;

        let listings = store.list_aliases::<&str>(&[])?;
        assert_eq!(listings[0].cluster, "__gateway");
        assert_eq!(listings[0].aliases, vec!["a-alias", "b-alias"]);

        let unknown = store.list_aliases(&["nowhere"])?;
        assert!(unknown[0].aliases.is_empty());
        Ok(())
    }

    #[test]
    fn existing_alias_requires_overwrite() -> TestResult {
        let dir = tempfile::tempdir()?;
        let store = open(dir.path())?;
        store.create_alias("cluster1", "key", AliasValue::provided("first"), false)?;
        assert!(matches!(
            store.create_alias("cluster1", "key", AliasValue::provided("second"), false),
            Err(AliasError::AliasAlreadyExists { .. })
        ));
        assert_eq!(store.get_secret("cluster1", "key")?.as_str(), "first");

        let replaced = store.create_alias("cluster1", "key", AliasValue::provided("second"), true)?;
        assert!(replaced.replaced);
        assert_eq!(store.get_secret("cluster1", "key")?.as_str(), "second");
        Ok(())
    }

    #[test]
    fn bulk_create_reports_each_cluster_in_order() -> TestResult {
        let dir = tempfile::tempdir()?;
        let store = open(dir.path())?;
        let entries = vec![
            entry("clusterX", "aliasx1", "x1"),
            entry("clusterX", "aliasx2", "x2"),
            entry("clusterY", "aliasy1", "y1"),
            BulkEntry {
                cluster: "clusterY".into(),
                alias: "aliasy2".into(),
                value: AliasValue::Generate,
            },
        ];
        let batches = store.create_aliases_bulk(&entries, false);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].cluster, "clusterX");
        let x = batches[0].outcome.as_ref().map_err(ToString::to_string)?;
        assert_eq!(x.created, vec!["aliasx1", "aliasx2"]);
        assert!(x.generated.is_empty());
        let y = batches[1].outcome.as_ref().map_err(ToString::to_string)?;
        assert_eq!(y.created, vec!["aliasy1", "aliasy2"]);
        assert_eq!(y.generated, vec!["aliasy2"]);

        let listings = store.list_aliases(&["clusterX", "clusterY"])?;
        assert_eq!(listings[0].aliases, vec!["aliasx1", "aliasx2"]);
        assert_eq!(listings[1].aliases, vec!["aliasy1", "aliasy2"]);
        Ok(())
    }

    #[test]
    fn failing_cluster_batch_is_rolled_back_and_others_proceed() -> TestResult {
        let dir = tempfile::tempdir()?;
        let store = open(dir.path())?;
        store.create_alias("clusterX", "taken", AliasValue::provided("old"), false)?;

        let entries = vec![
            entry("clusterX", "fresh", "1"),
            entry("clusterX", "taken", "2"),
            entry("clusterY", "aliasy1", "3"),
        ];
        let batches = store.create_aliases_bulk(&entries, false);
        assert!(matches!(
            batches[0].outcome,
            Err(AliasError::AliasAlreadyExists { ref alias, .. }) if alias == "taken"
        ));
        assert!(batches[1].outcome.is_ok());

        assert_eq!(store.list_aliases(&["clusterX"])?[0].aliases, vec!["taken"]);
        assert_eq!(store.get_secret("clusterX", "taken")?.as_str(), "old");

        let reopened = open(dir.path())?;
        assert_eq!(reopened.list_aliases(&["clusterX"])?[0].aliases, vec!["taken"]);
        assert_eq!(reopened.list_aliases(&["clusterY"])?[0].aliases, vec!["aliasy1"]);
        Ok(())
    }

    #[test]
    fn duplicate_alias_within_batch_aborts_cluster() -> TestResult {
        let dir = tempfile::tempdir()?;
        let store = open(dir.path())?;
        let batches = store.create_aliases_bulk(
            &[entry("fresh", "dup", "1"), entry("fresh", "dup", "2")],
            true,
        );
        assert!(batches[0].outcome.is_err());
        assert!(store.clusters().is_empty());
        assert!(!cluster_path(dir.path(), "fresh").exists());
        Ok(())
    }

    #[test]
    fn delete_removes_alias_and_reports_missing() -> TestResult {
        let dir = tempfile::tempdir()?;
        let store = open(dir.path())?;
        store.create_alias("cluster1", "key", AliasValue::provided("v"), false)?;
        store.delete_alias("cluster1", "key")?;
        assert!(store.list_aliases(&["cluster1"])?[0].aliases.is_empty());
        assert!(matches!(
            store.delete_alias("cluster1", "key"),
            Err(AliasError::AliasNotFound { .. })
        ));
        assert!(matches!(
            store.delete_alias("never", "key"),
            Err(AliasError::AliasNotFound { .. })
        ));
        Ok(())
    }

    #[test]
    fn store_reopens_with_same_master_only() -> TestResult {
        let dir = tempfile::tempdir()?;
        {
            let store = open(dir.path())?;
            store.create_alias("cluster1", "key", AliasValue::provided("persisted"), false)?;
            store.flush()?;
        }
        let reopened = open(dir.path())?;
        assert_eq!(reopened.clusters(), vec!["cluster1"]);
        assert_eq!(reopened.get_secret("cluster1", "key")?.as_str(), "persisted");

        assert!(matches!(
            AliasStore::open(dir.path(), MasterSecret::new("different")?),
            Err(AliasError::MasterSecretMismatch { .. })
        ));
        Ok(())
    }

    #[test]
    fn flush_keeps_changes_made_by_another_store() -> TestResult {
        let dir = tempfile::tempdir()?;
        open(dir.path())?.create_alias("cluster1", "seed", AliasValue::provided("s"), false)?;

        let gateway = open(dir.path())?;
        let admin = open(dir.path())?;
        admin.create_alias("cluster1", "added_while_running", AliasValue::provided("a"), false)?;
        admin.delete_alias("cluster1", "seed")?;
        gateway.flush()?;

        let reopened = open(dir.path())?;
        assert_eq!(
            reopened.list_aliases(&["cluster1"])?[0].aliases,
            vec!["added_while_running"]
        );
        Ok(())
    }

    #[test]
    fn invalid_input_is_rejected_before_mutation() -> TestResult {
        let dir = tempfile::tempdir()?;
        let store = open(dir.path())?;
        assert!(matches!(
            store.create_alias("../etc", "key", AliasValue::provided("v"), false),
            Err(AliasError::InvalidName { field: "cluster", .. })
        ));
        assert!(matches!(
            store.create_alias("cluster1", "bad alias", AliasValue::provided("v"), false),
            Err(AliasError::InvalidName { field: "alias", .. })
        ));
        assert!(matches!(
            store.create_alias("cluster1", "key", AliasValue::provided(""), false),
            Err(AliasError::EmptyValue { .. })
        ));
        assert!(store.clusters().is_empty());
        Ok(())
    }

    #[test]
    fn operations_are_counted_when_metrics_attached() -> TestResult {
        let dir = tempfile::tempdir()?;
        let metrics = Metrics::new()?;
        let store = open(dir.path())?.with_metrics(metrics.clone());
        store.create_alias("cluster1", "key", AliasValue::Generate, false)?;
        let _ = store.create_alias("cluster1", "key", AliasValue::Generate, false);
        let rendered = metrics.render()?;
        assert!(rendered.contains(r#"alias_operations_total{operation="create",outcome="ok"} 1"#));
        assert!(rendered.contains(r#"alias_operations_total{operation="create",outcome="exists"} 1"#));
        Ok(())
    }

    #[test]
    fn concurrent_creates_are_not_lost() -> TestResult {
        let dir = tempfile::tempdir()?;
        let store = Arc::new(open(dir.path())?);
        let handles: Vec<_> = (0..8)
            .map(|index| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    store.create_alias("shared", &format!("alias{index}"), AliasValue::Generate, false)
                })
            })
            .collect();
        for handle in handles {
            handle.join().map_err(|_| "thread panicked")??;
        }
        assert_eq!(store.list_aliases(&["shared"])?[0].aliases.len(), 8);
        assert_eq!(open(dir.path())?.list_aliases(&["shared"])?[0].aliases.len(), 8);
        Ok(())
    }
}
