//! Run configuration

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use kdcperf_core::{
    load_credential_list, BenchError, CredentialRotator, CredentialSource, KeytabHandle, Result,
};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Load test configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadTestConfig {
    /// Service principal every attempt authenticates to
    pub target_service: String,

    /// Total number of attempts; required
    pub iterations: Option<usize>,

    /// Number of concurrent workers; required
    pub parallelism: Option<usize>,

    /// Job queue capacity (defaults to `iterations`)
    pub queue_capacity: Option<usize>,

    /// Per-attempt timeout in milliseconds
    pub call_timeout_ms: Option<u64>,

    /// Client program used by the kinit backend
    pub kinit_program: PathBuf,

    /// Log every attempt as it completes
    pub verbose: bool,

    /// Only print the final summary
    pub quiet: bool,

    /// Write the summary as JSON to this path
    pub output: Option<PathBuf>,

    /// Where identities and secrets come from
    pub credentials: CredentialConfig,
}

impl Default for LoadTestConfig {
    fn default() -> Self {
        Self {
            target_service: String::new(),
            iterations: None,
            parallelism: None,
            queue_capacity: None,
            call_timeout_ms: None,
            kinit_program: PathBuf::from("kinit"),
            verbose: false,
            quiet: false,
            output: None,
            credentials: CredentialConfig::default(),
        }
    }
}

/// Credential source settings
///
/// Precedence when several are set: keytab, then password, then list.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialConfig {
    /// Client identity for keytab or password mode
    pub client: Option<String>,

    /// Password for `client`
    pub password: Option<String>,

    /// Keytab holding keys for `client`
    pub keytab: Option<PathBuf>,

    /// Headerless `identity,password` list
    pub csv: Option<PathBuf>,
}

impl fmt::Debug for CredentialConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialConfig")
            .field("client", &self.client)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("keytab", &self.keytab)
            .field("csv", &self.csv)
            .finish()
    }
}

impl LoadTestConfig {
    /// Load from a TOML file; absent keys keep their defaults
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            BenchError::Configuration(format!("cannot read '{}': {}", path.display(), e))
        })?;
        toml::from_str(&text).map_err(|e| {
            BenchError::Configuration(format!("invalid config '{}': {}", path.display(), e))
        })
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.target_service.trim().is_empty() {
            return Err(BenchError::Configuration(
                "target service is required".to_string(),
            ));
        }
        if self.iterations()? == 0 {
            return Err(BenchError::Configuration(
                "iterations must be a positive integer".to_string(),
            ));
        }
        if self.parallelism()? == 0 {
            return Err(BenchError::Configuration(
                "parallelism must be a positive integer".to_string(),
            ));
        }
        if self.queue_capacity == Some(0) {
            return Err(BenchError::Configuration(
                "queue capacity must be a positive integer".to_string(),
            ));
        }
        if self.call_timeout_ms == Some(0) {
            return Err(BenchError::Configuration(
                "call timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Total number of attempts
    pub fn iterations(&self) -> Result<usize> {
        self.iterations
            .ok_or_else(|| BenchError::Configuration("iterations is required".to_string()))
    }

    /// Number of concurrent workers
    pub fn parallelism(&self) -> Result<usize> {
        self.parallelism
            .ok_or_else(|| BenchError::Configuration("parallelism is required".to_string()))
    }

    /// Effective job queue capacity
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity.or(self.iterations).unwrap_or(1)
    }

    /// Effective per-attempt timeout
    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.map(Duration::from_millis)
    }

    /// Build the credential rotation for this run
    pub fn build_rotator(&self) -> Result<CredentialRotator> {
        let creds = &self.credentials;

        if let Some(path) = &creds.keytab {
            let client = require_client(creds, "--keytab")?;
            let keytab = KeytabHandle::open(path)?;
            if self.verbose {
                info!("Using keytab at '{}' to authenticate", path.display());
            }
            return Ok(CredentialRotator::single(CredentialSource::with_keytab(
                client, keytab,
            )));
        }

        if let Some(password) = creds.password.as_deref().filter(|p| !p.is_empty()) {
            let client = require_client(creds, "--password")?;
            if self.verbose {
                info!("Using password to authenticate");
            }
            return Ok(CredentialRotator::single(CredentialSource::with_password(
                client,
                password,
            )));
        }

        if let Some(path) = &creds.csv {
            let sources = load_credential_list(path)?;
            if self.verbose {
                info!(
                    "Rotating through {} credential(s) from '{}'",
                    sources.len(),
                    path.display()
                );
            }
            return CredentialRotator::new(sources);
        }

        Err(BenchError::Configuration(
            "one of --password, --keytab or --csv must be specified".to_string(),
        ))
    }
}

fn require_client<'a>(creds: &'a CredentialConfig, mode: &str) -> Result<&'a str> {
    match creds.client.as_deref() {
        Some(client) if !client.is_empty() => Ok(client),
        _ => Err(BenchError::Configuration(format!(
            "--client is required with {}",
            mode
        ))),
    }
}
