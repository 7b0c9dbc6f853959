//! Shared error type, HTTP client, and prompt helpers for the CLI.

use std::fmt::{self, Display, Formatter};
use std::io::{self, IsTerminal};
use std::time::Duration;

use anyhow::anyhow;
use portcullis_aliases::AliasError;
use portcullis_api::models::ProblemDetails;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode, Url};
use zeroize::Zeroizing;

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

impl From<AliasError> for CliError {
    fn from(error: AliasError) -> Self {
        match &error {
            AliasError::AliasAlreadyExists { cluster, alias } => Self::Failure(anyhow!(
                "alias '{alias}' already exists in cluster '{cluster}'; pass --force to overwrite"
            )),
            AliasError::AliasNotFound { cluster, alias } => Self::Failure(anyhow!(
                "alias '{alias}' does not exist in cluster '{cluster}'"
            )),
            AliasError::InvalidName {
                field,
                reason,
                value,
            } => Self::validation(format!("invalid {field} name '{value}' ({reason})")),
            AliasError::EmptyValue { alias } => {
                Self::validation(format!("value for '{alias}' must not be empty"))
            }
            AliasError::MasterSecretMissing { path } => Self::validation(format!(
                "master secret not found at {}; run `portcullis create-master` or set {}",
                path.display(),
                portcullis_aliases::ENV_MASTER_SECRET
            )),
            AliasError::MasterSecretExists { path } => Self::validation(format!(
                "master secret already exists at {}; pass --force to replace it",
                path.display()
            )),
            AliasError::MasterSecretMismatch { cluster } => Self::Failure(anyhow!(
                "master secret does not open the credentials of cluster '{cluster}'"
            )),
            _ => Self::failure(error),
        }
    }
}

/// Build the client used for calls against a gateway.
pub(crate) fn build_client(timeout_secs: u64, request_id: &str) -> CliResult<Client> {
    let mut default_headers = HeaderMap::new();
    let request_id = HeaderValue::from_str(request_id)
        .map_err(|_| CliError::failure(anyhow!("request identifier contains invalid characters")))?;
    default_headers.insert(HEADER_REQUEST_ID, request_id);

    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .redirect(reqwest::redirect::Policy::none())
        .default_headers(default_headers)
        .build()
        .map_err(|err| CliError::failure(anyhow!("failed to build HTTP client: {err}")))
}

/// Parse a URL argument.
pub(crate) fn parse_url(input: &str) -> Result<Url, String> {
    input
        .parse::<Url>()
        .map_err(|err| format!("invalid URL '{input}': {err}"))
}

/// Turn a non-success gateway response into a CLI error.
pub(crate) async fn classify_problem(response: reqwest::Response) -> CliError {
    let status = response.status();
    let bytes = response.bytes().await.unwrap_or_default();

    let body_text = String::from_utf8_lossy(&bytes).to_string();
    let problem = serde_json::from_slice::<ProblemDetails>(&bytes).ok();

    let message = problem
        .as_ref()
        .and_then(|p| p.detail.clone())
        .unwrap_or_else(|| {
            problem
                .as_ref()
                .map_or_else(|| body_text.trim().to_string(), |p| p.title.clone())
        });

    if status == StatusCode::BAD_REQUEST {
        CliError::validation(message)
    } else if message.is_empty() {
        CliError::failure(anyhow!("request failed with status {status}"))
    } else {
        CliError::failure(anyhow!("{message} (status {})", status.as_u16()))
    }
}

/// Use `provided`, else prompt without echo when `interactive`.
///
/// Prompted values are asked for twice and must match.
pub(crate) fn read_secret(
    provided: Option<String>,
    label: &str,
    interactive: bool,
    missing_hint: &str,
) -> CliResult<Zeroizing<String>> {
    if let Some(value) = provided {
        if value.is_empty() {
            return Err(CliError::validation(format!("{label} cannot be empty")));
        }
        return Ok(Zeroizing::new(value));
    }
    if !interactive {
        return Err(CliError::validation(format!(
            "{label} required; {missing_hint} when running non-interactively"
        )));
    }
    let first = prompt(&format!("Enter {label}: "))?;
    if first.is_empty() {
        return Err(CliError::validation(format!("{label} cannot be empty")));
    }
    let second = prompt(&format!("Enter {label} again: "))?;
    if *first != *second {
        return Err(CliError::validation(format!("{label} entries do not match")));
    }
    Ok(first)
}

/// Whether prompts can be shown.
pub(crate) fn stdin_is_terminal() -> bool {
    io::stdin().is_terminal()
}

fn prompt(message: &str) -> CliResult<Zeroizing<String>> {
    rpassword::prompt_password(message)
        .map(Zeroizing::new)
        .map_err(|err| CliError::failure(anyhow!("failed to read from terminal: {err}")))
}
