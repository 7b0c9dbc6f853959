//! Command-line surface of the Portcullis administrative tool.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use portcullis_aliases::{AliasStore, DEFAULT_CLUSTER, MasterSecret};
use portcullis_config::defaults::ENV_CONFIG_PATH;
use portcullis_config::load_config;
use portcullis_config::loader::ENV_ALIAS_STORE_DIR;
use reqwest::Url;

use crate::client::{CliError, CliResult, parse_url};
use crate::commands::aliases::{
    handle_create_alias, handle_create_aliases, handle_create_list_aliases, handle_delete_alias,
    handle_list_aliases,
};
use crate::commands::auth::{handle_auth_test, handle_hash_password};
use crate::commands::master::handle_create_master;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Parses CLI arguments, executes the requested command, and returns the
/// process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    let mut stdout = io::stdout();
    match execute(cli, &mut stdout).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

pub(crate) async fn execute<W: Write + Send>(cli: Cli, out: &mut W) -> CliResult<()> {
    let label = command_label(&cli.command);
    tracing::debug!(command = label, "dispatching command");
    let globals = Globals {
        config: cli.config,
        store_dir: cli.store_dir,
        timeout: cli.timeout,
        output: cli.output,
    };
    match cli.command {
        Command::CreateAlias(args) => handle_create_alias(&globals, args, out),
        Command::CreateAliases(args) => handle_create_aliases(&globals, &args, out),
        Command::CreateListAliases(args) => handle_create_list_aliases(&globals, &args, out),
        Command::ListAlias(args) => handle_list_aliases(&globals, &args, out),
        Command::DeleteAlias(args) => handle_delete_alias(&globals, &args, out),
        Command::CreateMaster(args) => handle_create_master(&globals, args, out),
        Command::HashPassword(args) => handle_hash_password(args, out),
        Command::AuthTest(args) => handle_auth_test(&globals, args, out).await,
    }
}

#[derive(Parser)]
#[command(
    name = "portcullis",
    version,
    about = "Administrative CLI for the Portcullis gateway"
)]
pub(crate) struct Cli {
    #[arg(long, global = true, env = ENV_CONFIG_PATH, help = "Gateway configuration document")]
    config: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        env = ENV_ALIAS_STORE_DIR,
        help = "Alias store directory (overrides the configuration document)"
    )]
    store_dir: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        env = "PORTCULLIS_HTTP_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS
    )]
    timeout: u64,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    output: OutputFormat,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Create one alias in a cluster's credential store.
    CreateAlias(CreateAliasArgs),
    /// Create several aliases in one cluster.
    CreateAliases(BatchArgs),
    /// Create aliases across clusters; aliases before a `--cluster` marker belong to it.
    CreateListAliases(BatchArgs),
    /// List alias names for one or more clusters.
    ListAlias(ListAliasArgs),
    /// Delete one alias.
    DeleteAlias(DeleteAliasArgs),
    /// Persist the master secret the credential stores are sealed with.
    CreateMaster(CreateMasterArgs),
    /// Print an argon2 hash for the user directory.
    HashPassword(HashPasswordArgs),
    /// Call a preauth endpoint and print the asserted identity.
    AuthTest(AuthTestArgs),
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Options shared by every command.
pub(crate) struct Globals {
    pub(crate) config: Option<PathBuf>,
    pub(crate) store_dir: Option<PathBuf>,
    pub(crate) timeout: u64,
    pub(crate) output: OutputFormat,
}

impl Globals {
    /// `--store-dir`, else the configured `aliases.store_dir`.
    pub(crate) fn resolve_store_dir(&self) -> CliResult<PathBuf> {
        if let Some(dir) = &self.store_dir {
            return Ok(dir.clone());
        }
        load_config(self.config.as_deref())
            .map(|config| config.aliases.store_dir)
            .map_err(|err| CliError::failure(anyhow::Error::new(err).context("failed to load configuration")))
    }

    /// Open the alias store with the resolved master secret.
    pub(crate) fn open_store(&self) -> CliResult<AliasStore> {
        let dir = self.resolve_store_dir()?;
        open_store_at(&dir)
    }
}

fn open_store_at(dir: &Path) -> CliResult<AliasStore> {
    let master = MasterSecret::resolve(dir)?;
    Ok(AliasStore::open(dir, master)?)
}

#[derive(Args)]
pub(crate) struct CreateAliasArgs {
    #[arg(help = "Alias name")]
    pub(crate) name: String,
    #[arg(long, default_value = DEFAULT_CLUSTER)]
    pub(crate) cluster: String,
    #[arg(long, conflicts_with = "generate")]
    pub(crate) value: Option<String>,
    #[arg(long, help = "Generate a random secret")]
    pub(crate) generate: bool,
    #[arg(long, help = "Overwrite an existing alias")]
    pub(crate) force: bool,
}

#[derive(Args)]
pub(crate) struct BatchArgs {
    #[arg(
        trailing_var_arg = true,
        allow_hyphen_values = true,
        num_args = 1..,
        required = true,
        value_name = "--alias A [--value V] ... [--cluster C] [--generate] [--force]"
    )]
    pub(crate) tokens: Vec<String>,
}

#[derive(Args)]
pub(crate) struct ListAliasArgs {
    #[arg(long = "cluster", value_delimiter = ',', help = "Clusters to list (comma separated)")]
    pub(crate) clusters: Vec<String>,
}

#[derive(Args)]
pub(crate) struct DeleteAliasArgs {
    #[arg(help = "Alias name")]
    pub(crate) name: String,
    #[arg(long, default_value = DEFAULT_CLUSTER)]
    pub(crate) cluster: String,
}

#[derive(Args)]
pub(crate) struct CreateMasterArgs {
    #[arg(long, conflicts_with = "generate")]
    pub(crate) master: Option<String>,
    #[arg(long, help = "Generate a random master secret")]
    pub(crate) generate: bool,
    #[arg(long, help = "Replace an existing master file")]
    pub(crate) force: bool,
}

#[derive(Args)]
pub(crate) struct HashPasswordArgs {
    #[arg(long)]
    pub(crate) password: Option<String>,
}

#[derive(Args)]
pub(crate) struct AuthTestArgs {
    #[arg(long, value_parser = parse_url, help = "Preauth endpoint URL")]
    pub(crate) url: Url,
    #[arg(long)]
    pub(crate) user: String,
    #[arg(long)]
    pub(crate) password: Option<String>,
    #[arg(long, default_value = "X-Knox-Actor-ID")]
    pub(crate) actor_id_header: String,
    #[arg(long, default_value = "X-Knox-Actor-Groups")]
    pub(crate) groups_prefix: String,
}

const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::CreateAlias(_) => "create_alias",
        Command::CreateAliases(_) => "create_aliases",
        Command::CreateListAliases(_) => "create_list_aliases",
        Command::ListAlias(_) => "list_alias",
        Command::DeleteAlias(_) => "delete_alias",
        Command::CreateMaster(_) => "create_master",
        Command::HashPassword(_) => "hash_password",
        Command::AuthTest(_) => "auth_test",
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::error::Error;

    pub(crate) type TestResult<T = ()> = Result<T, Box<dyn Error>>;

    /// Parse `args` against a store in `dir` and capture stdout.
    pub(crate) async fn run_in(dir: &Path, args: &[&str]) -> (CliResult<()>, String) {
        let mut argv = vec![
            "portcullis".to_string(),
            "--store-dir".to_string(),
            dir.display().to_string(),
        ];
        argv.extend(args.iter().map(ToString::to_string));
        let cli = match Cli::try_parse_from(argv) {
            Ok(cli) => cli,
            Err(err) => return (Err(CliError::validation(err.to_string())), String::new()),
        };
        let mut out = Vec::new();
        let result = execute(cli, &mut out).await;
        (result, String::from_utf8_lossy(&out).into_owned())
    }

    #[test]
    fn batch_commands_capture_interleaved_tokens() -> TestResult {
        let cli = Cli::try_parse_from([
            "portcullis",
            "create-list-aliases",
            "--alias",
            "aliasx1",
            "--value",
            "-starts-with-dash",
            "--cluster",
            "clusterX",
            "--generate",
        ])?;
        let Command::CreateListAliases(args) = cli.command else {
            return Err("expected create-list-aliases".into());
        };
        assert_eq!(
            args.tokens,
            vec![
                "--alias",
                "aliasx1",
                "--value",
                "-starts-with-dash",
                "--cluster",
                "clusterX",
                "--generate"
            ]
        );
        Ok(())
    }

    #[test]
    fn list_alias_splits_comma_separated_clusters() -> TestResult {
        let cli = Cli::try_parse_from(["portcullis", "list-alias", "--cluster", "a,b", "--cluster", "c"])?;
        let Command::ListAlias(args) = cli.command else {
            return Err("expected list-alias".into());
        };
        assert_eq!(args.clusters, vec!["a", "b", "c"]);
        assert_eq!(command_label(&Command::ListAlias(args)), "list_alias");
        Ok(())
    }

    #[test]
    fn value_and_generate_conflict() {
        let parsed = Cli::try_parse_from([
            "portcullis",
            "create-alias",
            "test_key",
            "--value",
            "v",
            "--generate",
        ]);
        assert!(parsed.is_err());
    }

    #[tokio::test]
    async fn missing_master_secret_is_a_validation_error() -> TestResult {
        let dir = tempfile::tempdir()?;
        let (result, _) = run_in(dir.path(), &["list-alias"]).await;
        let Err(err) = result else {
            return Err("expected failure".into());
        };
        assert_eq!(err.exit_code(), 2);
        Ok(())
    }
}
