//! Credential sources
//!
//! A [`CredentialSource`] is one identity the benchmark can authenticate as,
//! together with the secret material that proves it: a password, or a
//! keytab shared by every source that names it.

use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use csv::ReaderBuilder;
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::{BenchError, Result};

/// Shared handle to a keytab validated at configuration time
#[derive(Clone, PartialEq, Eq)]
pub struct KeytabHandle {
    path: Arc<PathBuf>,
}

impl KeytabHandle {
    /// Validate that `path` names a readable regular file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let meta = std::fs::metadata(path).map_err(|e| {
            BenchError::Configuration(format!("cannot open keytab '{}': {}", path.display(), e))
        })?;
        if !meta.is_file() {
            return Err(BenchError::Configuration(format!(
                "keytab '{}' is not a regular file",
                path.display()
            )));
        }
        Ok(Self {
            path: Arc::new(path.to_path_buf()),
        })
    }

    /// Filesystem location of the keytab
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Debug for KeytabHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("KeytabHandle").field(&self.path).finish()
    }
}

/// Secret material proving an identity
#[derive(Clone)]
pub enum Secret {
    /// Password, wiped from memory when the last copy drops
    Password(Zeroizing<String>),
    /// Long-term keys held in a keytab
    Keytab(KeytabHandle),
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password(_) => f.write_str("Password(<redacted>)"),
            Self::Keytab(handle) => f.debug_tuple("Keytab").field(handle).finish(),
        }
    }
}

/// One identity usable to authenticate
#[derive(Debug, Clone)]
pub struct CredentialSource {
    identity: Arc<str>,
    secret: Secret,
}

impl CredentialSource {
    /// Identity proven by a password
    pub fn with_password(identity: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            identity: Arc::from(identity.into()),
            secret: Secret::Password(Zeroizing::new(password.into())),
        }
    }

    /// Identity proven by keys in a shared keytab
    pub fn with_keytab(identity: impl Into<String>, keytab: KeytabHandle) -> Self {
        Self {
            identity: Arc::from(identity.into()),
            secret: Secret::Keytab(keytab),
        }
    }

    /// Principal name being authenticated
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Secret material for the identity
    pub fn secret(&self) -> &Secret {
        &self.secret
    }
}

/// Read a headerless `identity,password` credential list
///
/// The whole list is read before returning. The first record that does not
/// have exactly two fields fails the load; rows are never skipped.
pub fn read_credential_list<R: Read>(reader: R) -> Result<Vec<CredentialSource>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut sources = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let line = record
            .position()
            .map(|p| p.line())
            .unwrap_or(index as u64 + 1);

        if record.len() != 2 {
            return Err(BenchError::MalformedRecord {
                line,
                fields: record.len(),
            });
        }
        sources.push(CredentialSource::with_password(&record[0], &record[1]));
    }

    if sources.is_empty() {
        return Err(BenchError::EmptyCredentialList);
    }
    Ok(sources)
}

/// Load a credential list from a file
pub fn load_credential_list(path: impl AsRef<Path>) -> Result<Vec<CredentialSource>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| {
        BenchError::Configuration(format!(
            "cannot open credential list '{}': {}",
            path.display(),
            e
        ))
    })?;
    let sources = read_credential_list(file)?;
    debug!(
        "Loaded {} credential(s) from {}",
        sources.len(),
        path.display()
    );
    Ok(sources)
}
