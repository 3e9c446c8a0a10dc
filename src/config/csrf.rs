use anyhow::Result;
use std::env;

/// Key used to sign CSRF tokens.
#[derive(Clone)]
pub struct CsrfConfig {
    pub secret: Vec<u8>,
}

impl CsrfConfig {
    /// `CSRF_SECRET` if set, otherwise the JWT secret.
    pub fn from_env() -> Result<Self> {
        let secret = env::var("CSRF_SECRET")
            .or_else(|_| env::var("JWT_SECRET"))
            .map_err(|_| anyhow::anyhow!("CSRF_SECRET or JWT_SECRET must be set"))?;

        if secret.len() < 32 {
            return Err(anyhow::anyhow!("CSRF secret must be at least 32 characters"));
        }

        Ok(Self {
            secret: secret.into_bytes(),
        })
    }
}

impl std::fmt::Debug for CsrfConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsrfConfig").finish_non_exhaustive()
    }
}
