//! Alias commands: create, bulk create, list, delete.

use std::io::Write;

use portcullis_aliases::{AliasError, AliasValue, BulkEntry, DEFAULT_CLUSTER};

use crate::cli::{BatchArgs, CreateAliasArgs, DeleteAliasArgs, Globals, ListAliasArgs};
use crate::client::{CliError, CliResult, read_secret, stdin_is_terminal};
use crate::output::{render_batch_summary, render_listing, render_listings, write_line};

const VALUE_HINT: &str = "pass --value or --generate";

pub(crate) fn handle_create_alias<W: Write>(
    globals: &Globals,
    args: CreateAliasArgs,
    out: &mut W,
) -> CliResult<()> {
    let store = globals.open_store()?;
    let value = if args.generate {
        AliasValue::Generate
    } else {
        let secret = read_secret(args.value, "alias value", stdin_is_terminal(), VALUE_HINT)?;
        AliasValue::Provided(secret)
    };
    let created = store.create_alias(&args.cluster, &args.name, value, args.force)?;
    write_line(
        out,
        format_args!("{} has been successfully created.", created.alias),
    )
}

/// `create-aliases`: every alias goes to the single `--cluster` (default `__gateway`).
pub(crate) fn handle_create_aliases<W: Write>(
    globals: &Globals,
    args: &BatchArgs,
    out: &mut W,
) -> CliResult<()> {
    let batch = parse_batch(&args.tokens, ClusterMarkers::Single)?;
    run_batch(globals, batch, false, out)
}

/// `create-list-aliases`: aliases before each `--cluster` marker belong to it.
pub(crate) fn handle_create_list_aliases<W: Write>(
    globals: &Globals,
    args: &BatchArgs,
    out: &mut W,
) -> CliResult<()> {
    let batch = parse_batch(&args.tokens, ClusterMarkers::Closing)?;
    run_batch(globals, batch, true, out)
}

pub(crate) fn handle_list_aliases<W: Write>(
    globals: &Globals,
    args: &ListAliasArgs,
    out: &mut W,
) -> CliResult<()> {
    let clusters: Vec<&str> = args
        .clusters
        .iter()
        .map(|cluster| cluster.trim())
        .filter(|cluster| !cluster.is_empty())
        .collect();
    let store = globals.open_store()?;
    let listings = store.list_aliases(&clusters)?;
    render_listings(out, &listings, globals.output)
}

pub(crate) fn handle_delete_alias<W: Write>(
    globals: &Globals,
    args: &DeleteAliasArgs,
    out: &mut W,
) -> CliResult<()> {
    let store = globals.open_store()?;
    match store.delete_alias(&args.cluster, &args.name) {
        Ok(()) => write_line(
            out,
            format_args!("{} has been successfully deleted.", args.name),
        ),
        Err(AliasError::AliasNotFound { .. }) => Err(CliError::failure(anyhow::anyhow!(
            "Deletion of Alias: {} Failed. No such alias exists in the cluster.",
            args.name
        ))),
        Err(err) => Err(err.into()),
    }
}

fn run_batch<W: Write>(
    globals: &Globals,
    batch: ParsedBatch,
    list_after: bool,
    out: &mut W,
) -> CliResult<()> {
    let interactive = stdin_is_terminal();
    let mut entries = Vec::new();
    for (cluster, specs) in batch.groups {
        for spec in specs {
            let value = match spec.value {
                Some(value) => AliasValue::provided(value),
                None if batch.generate => AliasValue::Generate,
                None => AliasValue::Provided(read_secret(
                    None,
                    &format!("value for {}", spec.alias),
                    interactive,
                    VALUE_HINT,
                )?),
            };
            entries.push(BulkEntry {
                cluster: cluster.clone(),
                alias: spec.alias,
                value,
            });
        }
    }

    let store = globals.open_store()?;
    let mut failed = Vec::new();
    for batch_report in store.create_aliases_bulk(&entries, batch.force) {
        match batch_report.outcome {
            Ok(report) => {
                render_batch_summary(out, &report)?;
                if list_after {
                    render_listing(out, &batch_report.cluster, &report.created)?;
                }
            }
            Err(err) => {
                let message = CliError::from(err).display_message();
                write_line(
                    out,
                    format_args!(
                        "Creation of aliases for cluster: {} failed: {message}",
                        batch_report.cluster
                    ),
                )?;
                failed.push(batch_report.cluster);
            }
        }
    }
    if failed.is_empty() {
        Ok(())
    } else {
        Err(CliError::failure(anyhow::anyhow!(
            "alias creation failed for cluster(s): {}",
            failed.join(", ")
        )))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClusterMarkers {
    /// One `--cluster` applies to every alias.
    Single,
    /// Each `--cluster` closes the aliases listed before it.
    Closing,
}

#[derive(Debug, PartialEq, Eq)]
struct AliasSpec {
    alias: String,
    value: Option<String>,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct ParsedBatch {
    groups: Vec<(String, Vec<AliasSpec>)>,
    generate: bool,
    force: bool,
}

fn parse_batch(tokens: &[String], markers: ClusterMarkers) -> CliResult<ParsedBatch> {
    let mut batch = ParsedBatch::default();
    let mut pending: Vec<AliasSpec> = Vec::new();
    let mut single_cluster: Option<String> = None;
    let mut iter = tokens.iter();

    while let Some(token) = iter.next() {
        let (flag, inline) = match token.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag, Some(value.to_string())),
            _ => (token.as_str(), None),
        };
        let mut operand = |name: &str| {
            inline
                .clone()
                .or_else(|| iter.next().cloned())
                .ok_or_else(|| CliError::validation(format!("{name} requires a value")))
        };
        match flag {
            "--alias" => {
                let alias = operand("--alias")?;
                if pending.iter().any(|spec| spec.alias == alias) {
                    return Err(CliError::validation(format!("Duplicated alias {alias}")));
                }
                pending.push(AliasSpec { alias, value: None });
            }
            "--value" => {
                let value = operand("--value")?;
                match pending.last_mut() {
                    Some(spec) if spec.value.is_none() => spec.value = Some(value),
                    _ => {
                        return Err(CliError::validation(
                            "--value must directly follow an --alias",
                        ));
                    }
                }
            }
            "--cluster" => {
                let cluster = operand("--cluster")?;
                match markers {
                    ClusterMarkers::Single => {
                        if single_cluster.replace(cluster).is_some() {
                            return Err(CliError::validation("--cluster given more than once"));
                        }
                    }
                    ClusterMarkers::Closing => {
                        if pending.is_empty() {
                            return Err(CliError::validation(format!(
                                "--cluster {cluster} has no aliases before it"
                            )));
                        }
                        batch.groups.push((cluster, std::mem::take(&mut pending)));
                    }
                }
            }
            "--generate" => batch.generate = true,
            "--force" => batch.force = true,
            other => {
                return Err(CliError::validation(format!("unexpected argument '{other}'")));
            }
        }
    }

    if !pending.is_empty() {
        let cluster = single_cluster.unwrap_or_else(|| DEFAULT_CLUSTER.to_string());
        batch.groups.push((cluster, pending));
    }
    if batch.groups.is_empty() {
        return Err(CliError::validation("at least one --alias is required"));
    }
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::tests::{TestResult, run_in};

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    fn words(line: &str) -> Vec<String> {
        line.split_whitespace().map(str::to_owned).collect()
    }

    async fn with_master(dir: &std::path::Path) -> TestResult {
        let (result, _) = run_in(dir, &["create-master", "--master", "test-master"]).await;
        result.map_err(|err| err.display_message().into())
    }

    #[test]
    fn closing_markers_group_aliases_by_cluster() -> Result<(), CliError> {
        let batch = parse_batch(
            &words(concat!(
                "--alias aliasx1 --value v1 --alias aliasx2 --cluster clusterX",
                " --alias=aliasy1 --cluster clusterY --alias trailing --generate",
            )),
            ClusterMarkers::Closing,
        )?;
        let clusters: Vec<&str> = batch.groups.iter().map(|(c, _)| c.as_str()).collect();
        assert_eq!(clusters, vec!["clusterX", "clusterY", "__gateway"]);
        assert_eq!(
            batch.groups[0].1,
            vec![
                AliasSpec {
                    alias: "aliasx1".into(),
                    value: Some("v1".into())
                },
                AliasSpec {
                    alias: "aliasx2".into(),
                    value: None
                },
            ]
        );
        assert!(batch.generate);
        assert!(!batch.force);
        Ok(())
    }

    #[test]
    fn single_cluster_applies_to_every_alias() -> Result<(), CliError> {
        let batch = parse_batch(
            &tokens(&["--alias", "a", "--cluster", "c1", "--alias", "b", "--force"]),
            ClusterMarkers::Single,
        )?;
        assert_eq!(batch.groups.len(), 1);
        assert_eq!(batch.groups[0].0, "c1");
        assert_eq!(batch.groups[0].1.len(), 2);
        assert!(batch.force);
        Ok(())
    }

    #[test]
    fn malformed_batches_are_validation_errors() {
        let cases: [(&[&str], ClusterMarkers); 6] = [
            (&["--value", "v"], ClusterMarkers::Closing),
            (&["--alias", "a", "--value", "v", "--value", "w"], ClusterMarkers::Closing),
            (&["--cluster", "c"], ClusterMarkers::Closing),
            (&["--alias", "a", "--alias", "a"], ClusterMarkers::Single),
            (&["--alias"], ClusterMarkers::Single),
            (&["--alias", "a", "--bogus"], ClusterMarkers::Single),
        ];
        for (raw, markers) in cases {
            let result = parse_batch(&tokens(raw), markers);
            assert!(
                matches!(result, Err(CliError::Validation(_))),
                "{raw:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn create_then_list_includes_generated_alias() -> TestResult {
        let dir = tempfile::tempdir()?;
        with_master(dir.path()).await?;

        let (result, output) = run_in(
            dir.path(),
            &["create-alias", "test_key", "--cluster", "cluster1", "--generate"],
        )
        .await;
        assert!(result.is_ok());
        assert_eq!(output, "test_key has been successfully created.\n");

        let (result, output) = run_in(dir.path(), &["list-alias", "--cluster", "cluster1"]).await;
        assert!(result.is_ok());
        assert!(output.starts_with("Listing aliases for: cluster1\n"));
        assert!(output.lines().any(|line| line == "test_key"));
        assert!(output.ends_with("\n1 items.\n"));
        Ok(())
    }

    #[tokio::test]
    async fn list_without_clusters_uses_the_gateway_cluster() -> TestResult {
        let dir = tempfile::tempdir()?;
        with_master(dir.path()).await?;
        let (result, output) = run_in(dir.path(), &["list-alias"]).await;
        assert!(result.is_ok());
        assert_eq!(output, "Listing aliases for: __gateway\n\n0 items.\n");
        Ok(())
    }

    #[tokio::test]
    async fn create_list_aliases_reports_each_cluster() -> TestResult {
        let dir = tempfile::tempdir()?;
        with_master(dir.path()).await?;
        let args: Vec<&str> = concat!(
            "create-list-aliases",
            " --alias aliasx1 --value x1 --alias aliasx2 --value x2 --cluster clusterX",
            " --alias aliasy1 --value y1 --alias aliasy2 --value y2 --cluster clusterY",
        )
        .split_whitespace()
        .collect();
        let (result, output) = run_in(dir.path(), &args).await;
        assert!(result.is_ok());
        assert_eq!(
            output,
            "2 alias(es) have been successfully created: [aliasx1, aliasx2]\n\
             Listing aliases for: clusterX\naliasx1\naliasx2\n\n2 items.\n\
             2 alias(es) have been successfully created: [aliasy1, aliasy2]\n\
             Listing aliases for: clusterY\naliasy1\naliasy2\n\n2 items.\n"
        );
        Ok(())
    }

    #[tokio::test]
    async fn failing_cluster_is_reported_and_others_commit() -> TestResult {
        let dir = tempfile::tempdir()?;
        with_master(dir.path()).await?;
        let (first, _) = run_in(
            dir.path(),
            &["create-alias", "taken", "--cluster", "clusterX", "--value", "v"],
        )
        .await;
        assert!(first.is_ok());

        let args: Vec<&str> = concat!(
            "create-list-aliases",
            " --alias fresh --value 1 --alias taken --value 2 --cluster clusterX",
            " --alias aliasy1 --value 3 --cluster clusterY",
        )
        .split_whitespace()
        .collect();
        let (result, output) = run_in(dir.path(), &args).await;
        let Err(err) = result else {
            return Err("expected partial failure".into());
        };
        assert_eq!(err.exit_code(), 3);
        assert!(output.contains("Creation of aliases for cluster: clusterX failed"));
        assert!(output.contains("1 alias(es) have been successfully created: [aliasy1]"));

        let (_, listing) = run_in(dir.path(), &["list-alias", "--cluster", "clusterX"]).await;
        assert!(!listing.contains("fresh"));
        Ok(())
    }

    #[tokio::test]
    async fn existing_alias_needs_force_and_delete_reports_missing() -> TestResult {
        let dir = tempfile::tempdir()?;
        with_master(dir.path()).await?;
        let create = ["create-alias", "k", "--value", "one"];
        assert!(run_in(dir.path(), &create).await.0.is_ok());
        let (again, _) = run_in(dir.path(), &create).await;
        assert!(matches!(again, Err(CliError::Failure(_))));
        let (forced, _) = run_in(dir.path(), &["create-alias", "k", "--value", "two", "--force"]).await;
        assert!(forced.is_ok());

        let (deleted, output) = run_in(dir.path(), &["delete-alias", "k"]).await;
        assert!(deleted.is_ok());
        assert_eq!(output, "k has been successfully deleted.\n");

        let (missing, _) = run_in(dir.path(), &["delete-alias", "k"]).await;
        let Err(err) = missing else {
            return Err("expected missing alias".into());
        };
        assert_eq!(
            err.display_message(),
            "Deletion of Alias: k Failed. No such alias exists in the cluster."
        );
        Ok(())
    }
}
