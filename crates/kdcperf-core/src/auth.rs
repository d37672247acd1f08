//! Boundary to the authentication service under test

use async_trait::async_trait;

use crate::credential::CredentialSource;
use crate::error::{AuthError, Result};

/// An authentication primitive the benchmark can drive
///
/// Every attempt runs in its own [`Authenticator::Session`]: opened by
/// `open_session`, used for exactly one `authenticate` call, then dropped.
/// Sessions are never shared between workers, so implementations need no
/// interior locking beyond what `Send + Sync` on the authenticator itself
/// requires.
#[async_trait]
pub trait Authenticator: Send + Sync + 'static {
    /// Per-attempt execution context, released on drop
    type Session: Send;

    /// Short backend name for logs
    fn name(&self) -> &str;

    /// Build the context for one attempt
    ///
    /// Resolving the client identity and `target_service` into the form the
    /// backend needs happens here. Any error is a precondition failure and
    /// aborts the run.
    async fn open_session(
        &self,
        credential: &CredentialSource,
        target_service: &str,
    ) -> Result<Self::Session>;

    /// Perform the attempt; this call alone is timed
    async fn authenticate(
        &self,
        session: &mut Self::Session,
        credential: &CredentialSource,
    ) -> std::result::Result<(), AuthError>;
}
