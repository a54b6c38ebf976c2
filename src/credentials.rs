//! Master password resolution
//!
//! Databases reference their master password through a spec string rather
//! than embedding it in the configuration document:
//!
//! - `ssm:NAME` reads AWS SSM parameter `NAME`, decrypted
//! - `env:NAME` reads environment variable `NAME`
//! - `file:PATH` reads the file at `PATH` (`~` is expanded), dropping the
//!   trailing newline
//!
//! Only databases that can receive grants (status `enabled` or higher) have
//! their passwords resolved.

use crate::config::DatabaseConfig;
use crate::error::SecretError;
use crate::util::SecretString;
// async_trait required for dyn-compatibility with &dyn PasswordResolver
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_ssm::error::DisplayErrorContext;
use std::collections::HashMap;
use tracing::debug;

const SSM_PREFIX: &str = "ssm:";

/// Turns a password spec into the password itself
#[async_trait]
pub trait PasswordResolver: Send + Sync {
    async fn resolve(&self, spec: &str) -> Result<SecretString, SecretError>;
}

/// Read access to SSM Parameter Store
#[async_trait]
pub trait SsmParameters: Send + Sync {
    /// Fetch the decrypted value of a (possibly `SecureString`) parameter
    async fn get_decrypted(&self, name: &str) -> Result<String, SecretError>;
}

#[async_trait]
impl SsmParameters for aws_sdk_ssm::Client {
    async fn get_decrypted(&self, name: &str) -> Result<String, SecretError> {
        let output = self
            .get_parameter()
            .name(name)
            .with_decryption(true)
            .send()
            .await
            .map_err(|e| SecretError::Ssm {
                name: name.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        output
            .parameter()
            .and_then(|parameter| parameter.value())
            .map(str::to_string)
            .ok_or_else(|| SecretError::Ssm {
                name: name.to_string(),
                message: "parameter has no value".to_string(),
            })
    }
}

/// Resolver for `ssm:`, `env:` and `file:` specs.
///
/// `ssm:` specs need an SSM client; without one they fail with
/// [`SecretError::SsmUnavailable`].
#[derive(Debug, Clone)]
pub struct DefaultPasswordResolver<S = aws_sdk_ssm::Client> {
    ssm: Option<S>,
}

impl DefaultPasswordResolver {
    /// Resolver without SSM access
    pub fn new() -> Self {
        Self { ssm: None }
    }

    /// Resolver backed by an SSM client built from the ambient AWS
    /// configuration (environment, profile, instance role)
    pub async fn from_aws_env() -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        Self::with_ssm(aws_sdk_ssm::Client::new(&config))
    }

    /// Build the resolver `databases` need, loading AWS configuration only
    /// when an eligible database uses an `ssm:` spec
    pub async fn for_databases(databases: &[DatabaseConfig]) -> Self {
        if uses_ssm(databases) {
            Self::from_aws_env().await
        } else {
            Self::new()
        }
    }
}

impl Default for DefaultPasswordResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> DefaultPasswordResolver<S> {
    /// Resolver reading `ssm:` specs through `ssm`
    pub fn with_ssm(ssm: S) -> Self {
        Self { ssm: Some(ssm) }
    }
}

#[async_trait]
impl<S: SsmParameters> PasswordResolver for DefaultPasswordResolver<S> {
    async fn resolve(&self, spec: &str) -> Result<SecretString, SecretError> {
        if let Some(name) = spec.strip_prefix(SSM_PREFIX) {
            let ssm = self.ssm.as_ref().ok_or(SecretError::SsmUnavailable)?;
            return ssm.get_decrypted(name).await.map(SecretString::new);
        }

        if let Some(name) = spec.strip_prefix("env:") {
            return std::env::var(name)
                .map(SecretString::new)
                .map_err(|_| SecretError::MissingEnv(name.to_string()));
        }

        if let Some(path) = spec.strip_prefix("file:") {
            let expanded = shellexpand::tilde(path);
            let contents = tokio::fs::read_to_string(expanded.as_ref())
                .await
                .map_err(|source| SecretError::File {
                    path: path.to_string(),
                    source,
                })?;
            return Ok(SecretString::new(contents.trim_end_matches(['\r', '\n'])));
        }

        Err(SecretError::UnsupportedSpec)
    }
}

/// Check whether any eligible database keeps its password in SSM
pub fn uses_ssm(databases: &[DatabaseConfig]) -> bool {
    databases.iter().any(|db| {
        db.status().is_eligible()
            && db
                .master_password
                .as_deref()
                .is_some_and(|spec| spec.starts_with(SSM_PREFIX))
    })
}

/// Resolved master passwords keyed by database id
#[derive(Debug, Default)]
pub struct MasterPasswords(HashMap<String, SecretString>);

impl MasterPasswords {
    /// Password of `database`, if it was resolved
    pub fn get(&self, database: &str) -> Option<&SecretString> {
        self.0.get(database)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Resolve the master password of every eligible database
pub async fn resolve_master_passwords<R>(
    databases: &[DatabaseConfig],
    resolver: &R,
) -> Result<MasterPasswords, SecretError>
where
    R: PasswordResolver + ?Sized,
{
    let mut passwords = HashMap::new();

    for db in databases.iter().filter(|db| db.status().is_eligible()) {
        let attributed = |source: SecretError| SecretError::Database {
            database: db.id.clone(),
            source: Box::new(source),
        };

        let spec = db
            .master_password
            .as_deref()
            .ok_or_else(|| attributed(SecretError::NotConfigured))?;
        let password = resolver.resolve(spec).await.map_err(attributed)?;

        debug!(database = %db.id, "Resolved master password");
        passwords.insert(db.id.clone(), password);
    }

    Ok(MasterPasswords(passwords))
}
