//! `create-master`: persist the secret cluster stores are sealed with.

use std::io::Write;

use portcullis_aliases::MasterSecret;
use portcullis_aliases::vault::cluster_from_file_name;
use tracing::warn;

use crate::cli::{CreateMasterArgs, Globals};
use crate::client::{CliResult, read_secret, stdin_is_terminal};
use crate::output::write_line;

pub(crate) fn handle_create_master<W: Write>(
    globals: &Globals,
    args: CreateMasterArgs,
    out: &mut W,
) -> CliResult<()> {
    let dir = globals.resolve_store_dir()?;
    let master = if args.generate {
        MasterSecret::generate()
    } else {
        let secret = read_secret(
            args.master,
            "master secret",
            stdin_is_terminal(),
            "pass --master or --generate",
        )?;
        MasterSecret::new(secret.as_str())?
    };

    let sealed = sealed_clusters(&dir);
    if args.force && !sealed.is_empty() {
        warn!(
            clusters = %sealed.join(","),
            "replacing the master secret leaves existing cluster stores unreadable"
        );
    }
    let path = master.write(&dir, args.force)?;
    write_line(
        out,
        format_args!("Master secret has been persisted to {}.", path.display()),
    )
}

fn sealed_clusters(dir: &std::path::Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut clusters: Vec<String> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            entry
                .file_name()
                .to_str()
                .and_then(cluster_from_file_name)
                .map(str::to_string)
        })
        .collect();
    clusters.sort();
    clusters
}
