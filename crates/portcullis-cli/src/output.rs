//! Renderers for alias listings, batch reports, and identities.

use std::fmt::Display;
use std::io::Write;

use anyhow::anyhow;
use portcullis_aliases::{BatchCreated, ClusterListing};
use portcullis_identity::Identity;
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

#[derive(Serialize)]
struct ListingView<'a> {
    cluster: &'a str,
    aliases: &'a [String],
}

#[derive(Serialize)]
struct IdentityView<'a> {
    principal: &'a str,
    groups: Vec<&'a str>,
}

pub(crate) fn write_line<W: Write>(out: &mut W, line: impl Display) -> CliResult<()> {
    writeln!(out, "{line}").map_err(|err| CliError::failure(anyhow!("failed to write output: {err}")))
}

/// `Listing aliases for: <cluster>`, one name per line, then the count.
pub(crate) fn render_listing<W: Write>(out: &mut W, cluster: &str, aliases: &[String]) -> CliResult<()> {
    write_line(out, format_args!("Listing aliases for: {cluster}"))?;
    for alias in aliases {
        write_line(out, alias)?;
    }
    write_line(out, format_args!("\n{} items.", aliases.len()))
}

pub(crate) fn render_listings<W: Write>(
    out: &mut W,
    listings: &[ClusterListing],
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => {
            let views: Vec<ListingView<'_>> = listings
                .iter()
                .map(|listing| ListingView {
                    cluster: &listing.cluster,
                    aliases: &listing.aliases,
                })
                .collect();
            write_json(out, &views)
        }
        OutputFormat::Table => listings
            .iter()
            .try_for_each(|listing| render_listing(out, &listing.cluster, &listing.aliases)),
    }
}

/// Generated and supplied aliases are reported on separate lines.
pub(crate) fn render_batch_summary<W: Write>(out: &mut W, report: &BatchCreated) -> CliResult<()> {
    if !report.generated.is_empty() {
        write_line(
            out,
            format_args!(
                "{} alias(es) have been successfully generated: {}",
                report.generated.len(),
                bracketed(&report.generated)
            ),
        )?;
    }
    let supplied: Vec<String> = report
        .created
        .iter()
        .filter(|alias| !report.generated.contains(alias))
        .cloned()
        .collect();
    if !supplied.is_empty() {
        write_line(
            out,
            format_args!(
                "{} alias(es) have been successfully created: {}",
                supplied.len(),
                bracketed(&supplied)
            ),
        )?;
    }
    Ok(())
}

pub(crate) fn render_identity<W: Write>(
    out: &mut W,
    identity: &Identity,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => write_json(
            out,
            &IdentityView {
                principal: identity.principal.as_str(),
                groups: identity.groups.iter().collect(),
            },
        ),
        OutputFormat::Table => {
            write_line(out, format_args!("principal: {}", identity.principal))?;
            let groups: Vec<&str> = identity.groups.iter().collect();
            if groups.is_empty() {
                write_line(out, "groups: <none>")
            } else {
                write_line(out, format_args!("groups: {}", groups.join(", ")))
            }
        }
    }
}

/// `[a, b]`.
pub(crate) fn bracketed(names: &[String]) -> String {
    format!("[{}]", names.join(", "))
}

fn write_json<W: Write, T: Serialize>(out: &mut W, value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
    write_line(out, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render<F>(f: F) -> Result<String, CliError>
    where
        F: FnOnce(&mut Vec<u8>) -> CliResult<()>,
    {
        let mut out = Vec::new();
        f(&mut out)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    #[test]
    fn listing_matches_the_classic_layout() -> Result<(), CliError> {
        let text = render(|out| render_listing(out, "cluster1", &["a".into(), "b".into()]))?;
        assert_eq!(text, "Listing aliases for: cluster1\na\nb\n\n2 items.\n");
        Ok(())
    }

    #[test]
    fn batch_summary_separates_generated_aliases() -> Result<(), CliError> {
        let report = BatchCreated {
            created: vec!["aliasx1".into(), "aliasx2".into(), "aliasx3".into()],
            generated: vec!["aliasx2".into()],
        };
        let text = render(|out| render_batch_summary(out, &report))?;
        assert_eq!(
            text,
            "1 alias(es) have been successfully generated: [aliasx2]\n\
             2 alias(es) have been successfully created: [aliasx1, aliasx3]\n"
        );
        Ok(())
    }

    #[test]
    fn listings_render_as_json() -> Result<(), CliError> {
        let listings = vec![ClusterListing {
            cluster: "__gateway".into(),
            aliases: vec!["k".into()],
        }];
        let text = render(|out| render_listings(out, &listings, OutputFormat::Json))?;
        let value: serde_json::Value =
            serde_json::from_str(&text).map_err(|err| CliError::failure(anyhow!(err)))?;
        assert_eq!(value[0]["cluster"], "__gateway");
        assert_eq!(value[0]["aliases"][0], "k");
        Ok(())
    }
}
