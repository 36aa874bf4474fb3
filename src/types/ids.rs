//! Newtype wrappers for domain identifiers.
//!
//! These types prevent accidental mixing of different identifier kinds (e.g.
//! using a raw version string where a package name is expected) and make the
//! code more self-documenting.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// A package name as published to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageName(pub String);

impl PackageName {
    pub fn new(s: impl Into<String>) -> Self {
        PackageName(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for PackageName {
    fn from(s: String) -> Self {
        PackageName(s)
    }
}

impl From<&str> for PackageName {
    fn from(s: &str) -> Self {
        PackageName(s.to_string())
    }
}

/// A deployment stage.
///
/// Inbound messages and route parameters use a handful of historical aliases
/// (`development`, `staging`, `dist`, ...); parsing folds them all into the
/// three canonical stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Environment {
    Dev,
    Test,
    Prod,
}

impl Environment {
    /// Returns the canonical short name for this environment.
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Test => "test",
            Environment::Prod => "prod",
        }
    }
}

/// Error returned when an environment string matches no known alias.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown environment: {0}")]
pub struct UnknownEnvironment(pub String);

impl FromStr for Environment {
    type Err = UnknownEnvironment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" | "dev" => Ok(Environment::Dev),
            "staging" | "testing" | "test" => Ok(Environment::Test),
            "production" | "dist" | "prod" => Ok(Environment::Prod),
            other => Err(UnknownEnvironment(other.to_string())),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for Environment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Environment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The key identifying one build's aggregate state: package, environment
/// and version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildSpec {
    pub pkg: PackageName,
    pub env: Environment,
    pub version: String,
}

impl BuildSpec {
    pub fn new(pkg: impl Into<PackageName>, env: Environment, version: impl Into<String>) -> Self {
        BuildSpec {
            pkg: pkg.into(),
            env,
            version: version.into(),
        }
    }
}

impl fmt::Display for BuildSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} ({})", self.pkg, self.version, self.env)
    }
}

/// A unique, time-ordered identifier for one status event log entry.
///
/// Every generated id is distinct, even for logically identical input,
/// because each one names a new log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub Uuid);

impl EventId {
    /// Generates a fresh time-ordered (UUIDv7) identifier.
    pub fn generate() -> Self {
        EventId(Uuid::now_v7())
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod environment {
        use super::*;

        #[test]
        fn parses_canonical_names() {
            assert_eq!("dev".parse(), Ok(Environment::Dev));
            assert_eq!("test".parse(), Ok(Environment::Test));
            assert_eq!("prod".parse(), Ok(Environment::Prod));
        }

        #[test]
        fn parses_aliases() {
            assert_eq!("development".parse(), Ok(Environment::Dev));
            assert_eq!("staging".parse(), Ok(Environment::Test));
            assert_eq!("testing".parse(), Ok(Environment::Test));
            assert_eq!("production".parse(), Ok(Environment::Prod));
            assert_eq!("dist".parse(), Ok(Environment::Prod));
        }

        #[test]
        fn rejects_unknown() {
            let err = "sandbox".parse::<Environment>().unwrap_err();
            assert_eq!(err, UnknownEnvironment("sandbox".to_string()));
        }

        #[test]
        fn serde_uses_canonical_name() {
            let json = serde_json::to_string(&Environment::Prod).unwrap();
            assert_eq!(json, "\"prod\"");

            let parsed: Environment = serde_json::from_str("\"staging\"").unwrap();
            assert_eq!(parsed, Environment::Test);
        }
    }

    mod build_spec {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn serde_roundtrip(
                pkg in "[a-z][a-z0-9-]{0,30}",
                version in "[0-9]{1,3}\\.[0-9]{1,3}\\.[0-9]{1,3}",
            ) {
                let spec = BuildSpec::new(pkg, Environment::Dev, version);
                let json = serde_json::to_string(&spec).unwrap();
                let parsed: BuildSpec = serde_json::from_str(&json).unwrap();
                prop_assert_eq!(spec, parsed);
            }
        }

        #[test]
        fn display_format() {
            let spec = BuildSpec::new("whatever", Environment::Dev, "1.0.0");
            assert_eq!(format!("{}", spec), "whatever@1.0.0 (dev)");
        }
    }

    mod event_id {
        use super::*;

        #[test]
        fn generate_is_unique() {
            let a = EventId::generate();
            let b = EventId::generate();
            assert_ne!(a, b);
        }

        #[test]
        fn generated_ids_are_time_ordered() {
            let ids: Vec<EventId> = (0..10).map(|_| EventId::generate()).collect();
            let mut sorted = ids.clone();
            sorted.sort();
            assert_eq!(ids, sorted);
        }
    }
}
