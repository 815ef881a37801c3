//! Test identity: which test method requested a page.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A test method within its fully qualified test class.
///
/// Displays as `method(fully.qualified.Class)`, which is also the file stem
/// of stored page bodies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestIdentity {
    pub method: String,
    pub class: String,
}

impl TestIdentity {
    pub fn new(method: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            class: class.into(),
        }
    }
}

impl fmt::Display for TestIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.method, self.class)
    }
}

impl std::str::FromStr for TestIdentity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (method, rest) = s
            .split_once('(')
            .ok_or_else(|| format!("expected method(Class), got {s:?}"))?;
        let class = rest
            .strip_suffix(')')
            .ok_or_else(|| format!("missing closing parenthesis in {s:?}"))?;
        if method.is_empty() || class.is_empty() {
            return Err(format!("expected method(Class), got {s:?}"));
        }
        Ok(Self::new(method, class))
    }
}
