// Copyright (C) Microsoft Corporation. All rights reserved.

use std::fmt;
use std::str::FromStr;

/// How the lifecycle decides whether to install the locking shim.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LockingMode {
    /// Ask the backend whether it is internally thread-safe.
    #[default]
    Auto,
    /// Always install the lock table and callbacks.
    Shim,
    /// Never touch global library state.
    Passthrough,
}

impl FromStr for LockingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "shim" => Ok(Self::Shim),
            "passthrough" => Ok(Self::Passthrough),
            other => Err(format!("unknown locking mode '{other}'")),
        }
    }
}

impl fmt::Display for LockingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Auto => "auto",
            Self::Shim => "shim",
            Self::Passthrough => "passthrough",
        };
        f.write_str(name)
    }
}

/// Construction-time settings of a [`CryptoLifecycle`](super::CryptoLifecycle).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LifecycleConfig {
    /// Locking strategy selection.
    pub locking: LockingMode,
}

impl LifecycleConfig {
    /// Environment variable read by [`from_env`](Self::from_env).
    pub const LOCKING_ENV: &'static str = "OSSL_CRYPTO_LOCKING";

    /// Reads the configuration from the environment.
    ///
    /// Unset or unparsable values select [`LockingMode::Auto`].
    pub fn from_env() -> Self {
        Self::from_env_value(std::env::var(Self::LOCKING_ENV).ok().as_deref())
    }

    fn from_env_value(value: Option<&str>) -> Self {
        let locking = match value.map(str::parse::<LockingMode>) {
            None => LockingMode::Auto,
            Some(Ok(mode)) => mode,
            Some(Err(err)) => {
                tracing::warn!(%err, var = Self::LOCKING_ENV, "falling back to auto locking");
                LockingMode::Auto
            }
        };

        Self { locking }
    }
}
