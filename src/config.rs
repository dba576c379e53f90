// Run configuration for authorder
// Loaded from a TOML file; command-line flags override the [run] table
//
// Example:
//
//   [targets.allowed]
//   arn = "arn:aws:sns:us-east-1:111122223333:probe-allowed"
//
//   [targets.denied]
//   arn = "arn:aws:sns:us-east-1:444455556666:probe-denied"
//   access_key_id = "AKIA..."
//   secret_access_key = "..."
//
//   [run]
//   concurrency = 2
//   absent_codes = "inconclusive"
//
// A target without an access key in its table reads its whole credential
// set from `<ROLE>_AWS_ACCESS_KEY_ID`, `<ROLE>_AWS_SECRET_ACCESS_KEY` and
// `<ROLE>_AWS_SESSION_TOKEN`, or failing that from the unprefixed `AWS_*`
// variables. Empty variables count as unset.

use crate::arn::{Arn, IdentityGenerator};
use crate::engine::{ProbeOptions, DEFAULT_TIMEOUT};
use crate::error::{ProbeError, Result};
use crate::models::{Credentials, ProbeTriple, Target, TargetRole};
use crate::verdict::AbsentCodePolicy;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Only SNS has an action catalog.
pub const SUPPORTED_SERVICE: &str = "sns";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    pub arn: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
    #[serde(default)]
    pub session_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetsConfig {
    pub allowed: Option<TargetConfig>,
    pub denied: Option<TargetConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Empty means the whole catalog.
    pub actions: Vec<String>,
    pub include_unsafe: bool,
    pub concurrency: usize,
    pub timeout_ms: u64,
    pub absent_codes: AbsentCodePolicy,
    pub output_dir: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            actions: Vec::new(),
            include_unsafe: false,
            concurrency: 1,
            timeout_ms: u64::try_from(DEFAULT_TIMEOUT.as_millis()).unwrap_or(u64::MAX),
            absent_codes: AbsentCodePolicy::default(),
            output_dir: PathBuf::from("."),
        }
    }
}

impl RunConfig {
    pub fn probe_options(&self) -> ProbeOptions {
        ProbeOptions {
            timeout: Duration::from_millis(self.timeout_ms),
            absent_codes: self.absent_codes,
            concurrency: self.concurrency.max(1),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub targets: TargetsConfig,
    #[serde(default)]
    pub run: RunConfig,
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| ProbeError::Config(format!("invalid config: {}", e)))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ProbeError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        debug!(path = %path.display(), "loaded config");
        Self::from_toml_str(&text)
    }

    /// Validate targets and build the run's triple, reading credentials
    /// from the process environment where the file leaves them out.
    pub fn build_triple(&self, generator: &dyn IdentityGenerator) -> Result<ProbeTriple> {
        self.build_triple_with(generator, |key| std::env::var(key).ok())
    }

    /// Like [`Config::build_triple`], with an explicit variable lookup.
    pub fn build_triple_with<F>(&self, generator: &dyn IdentityGenerator, env: F) -> Result<ProbeTriple>
    where
        F: Fn(&str) -> Option<String>,
    {
        let allowed_cfg = self
            .targets
            .allowed
            .as_ref()
            .ok_or_else(|| ProbeError::Config("missing [targets.allowed]".to_string()))?;
        let denied_cfg = self
            .targets
            .denied
            .as_ref()
            .ok_or_else(|| ProbeError::Config("missing [targets.denied]".to_string()))?;

        let allowed = resolve_target(TargetRole::Allowed, allowed_cfg, &env)?;
        let denied = resolve_target(TargetRole::Denied, denied_cfg, &env)?;

        for target in [&allowed, &denied] {
            if target.arn.service != SUPPORTED_SERVICE {
                return Err(ProbeError::Config(format!(
                    "{} target `{}` is not an {} resource",
                    target.role, target.arn, SUPPORTED_SERVICE
                )));
            }
        }
        if allowed.arn == denied.arn {
            return Err(ProbeError::Config(
                "allowed and denied targets must be different resources".to_string(),
            ));
        }

        Ok(ProbeTriple::new(allowed, denied, generator))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Pick one credential source for a target and read every field from it.
///
/// Sources in order: the file, `<ROLE>_AWS_*`, `AWS_*`. The source is the
/// first one with an access key id; its secret is required and its session
/// token is optional. Fields are never mixed across sources.
fn resolve_credentials<F>(role: TargetRole, cfg: &TargetConfig, env: &F) -> Result<Credentials>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(access_key_id) = non_empty(cfg.access_key_id.clone()) {
        let secret_access_key = non_empty(cfg.secret_access_key.clone()).ok_or_else(|| {
            ProbeError::Config(format!(
                "[targets.{}] sets access_key_id but no secret_access_key",
                role
            ))
        })?;
        return Ok(Credentials {
            access_key_id,
            secret_access_key,
            session_token: non_empty(cfg.session_token.clone()),
        });
    }
    if cfg.secret_access_key.is_some() || cfg.session_token.is_some() {
        return Err(ProbeError::Config(format!(
            "[targets.{}] sets a secret or session token without access_key_id",
            role
        )));
    }

    let role_prefix = format!("{}_AWS_", role.to_string().to_uppercase());
    for prefix in [role_prefix.as_str(), "AWS_"] {
        let lookup = |name: &str| non_empty(env(&format!("{}{}", prefix, name)));
        if let Some(access_key_id) = lookup("ACCESS_KEY_ID") {
            let secret_access_key = lookup("SECRET_ACCESS_KEY").ok_or_else(|| {
                ProbeError::Config(format!(
                    "{}ACCESS_KEY_ID is set but {}SECRET_ACCESS_KEY is not",
                    prefix, prefix
                ))
            })?;
            debug!(%role, source = prefix, "credentials from environment");
            return Ok(Credentials {
                access_key_id,
                secret_access_key,
                session_token: lookup("SESSION_TOKEN"),
            });
        }
    }

    Err(ProbeError::Config(format!("no access key id for {} target", role)))
}

fn resolve_target<F>(role: TargetRole, cfg: &TargetConfig, env: &F) -> Result<Target>
where
    F: Fn(&str) -> Option<String>,
{
    let arn = Arn::parse(cfg.arn.trim())?;
    let credentials = resolve_credentials(role, cfg, env)?;
    let target = Target::new(role, arn, credentials);
    Ok(match &cfg.endpoint {
        Some(endpoint) => target.with_endpoint(endpoint.clone()),
        None => target,
    })
}
