//! Process-backed authenticator
//!
//! Drives the system Kerberos client: every attempt runs `kinit` against a
//! private, throwaway credential cache so concurrent attempts never share
//! client state.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use kdcperf_core::{AuthError, Authenticator, BenchError, CredentialSource, Principal, Result, Secret};
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use zeroize::Zeroizing;

/// Authenticates by running a `kinit`-compatible program
#[derive(Debug, Clone)]
pub struct KinitAuthenticator {
    program: PathBuf,
}

impl KinitAuthenticator {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Default for KinitAuthenticator {
    fn default() -> Self {
        Self::new("kinit")
    }
}

/// One attempt's context: resolved principals and a private cache
///
/// Dropping the session deletes the cache directory.
#[derive(Debug)]
pub struct KinitSession {
    client: Principal,
    service: Principal,
    cache_dir: TempDir,
}

impl KinitSession {
    fn cache_name(&self) -> String {
        format!("FILE:{}", self.cache_dir.path().join("ccache").display())
    }
}

#[async_trait]
impl Authenticator for KinitAuthenticator {
    type Session = KinitSession;

    fn name(&self) -> &str {
        "kinit"
    }

    async fn open_session(
        &self,
        credential: &CredentialSource,
        target_service: &str,
    ) -> Result<KinitSession> {
        let client = Principal::parse(credential.identity())?;
        let service = Principal::parse(target_service)?;
        let cache_dir = tempfile::Builder::new()
            .prefix("kdcperf-")
            .tempdir()
            .map_err(|e| {
                BenchError::Precondition(format!("cannot create credential cache: {}", e))
            })?;

        Ok(KinitSession {
            client,
            service,
            cache_dir,
        })
    }

    async fn authenticate(
        &self,
        session: &mut KinitSession,
        credential: &CredentialSource,
    ) -> std::result::Result<(), AuthError> {
        let mut cmd = Command::new(&self.program);
        cmd.env("KRB5CCNAME", session.cache_name())
            .arg("-S")
            .arg(session.service.to_string())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        match credential.secret() {
            Secret::Password(_) => {
                cmd.stdin(Stdio::piped());
            }
            Secret::Keytab(keytab) => {
                cmd.stdin(Stdio::null()).arg("-k").arg("-t").arg(keytab.path());
            }
        }
        cmd.arg(session.client.to_string());

        let mut child = cmd.spawn().map_err(|e| {
            AuthError::Precondition(format!("cannot run {}: {}", self.program.display(), e))
        })?;

        if let (Secret::Password(password), Some(mut stdin)) =
            (credential.secret(), child.stdin.take())
        {
            let mut line = Zeroizing::new(Vec::with_capacity(password.len() + 1));
            line.extend_from_slice(password.as_bytes());
            line.push(b'\n');
            // A closed pipe means the client exited early; its status says why.
            let _ = stdin.write_all(&line).await;
        }

        let output = child.wait_with_output().await.map_err(|e| {
            AuthError::Precondition(format!("cannot wait for {}: {}", self.program.display(), e))
        })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(AuthError::Rejected(failure_reason(&output.stderr, output.status)))
        }
    }
}

/// Last non-empty stderr line, or the exit status if there is none
fn failure_reason(stderr: &[u8], status: ExitStatus) -> String {
    let text = String::from_utf8_lossy(stderr);
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .map(str::to_string)
        .unwrap_or_else(|| format!("client exited with {}", status))
}
