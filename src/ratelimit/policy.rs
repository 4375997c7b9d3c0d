//! Rate limit policies and named presets.
//!
//! A [`Policy`] is the `(max_requests, window)` pair governing one class of
//! limited operation. Policies are validated on construction, so a `Policy`
//! value in hand is always usable by the store.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::{LimiterError, Result};

/// Longest window a policy may use.
pub const MAX_WINDOW: Duration = Duration::from_secs(366 * 86400);

/// Immutable limit configuration supplied per call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Policy {
    max_requests: u64,
    window: Duration,
}

impl Policy {
    /// Create a policy, rejecting a zero ceiling or a window that is zero or
    /// longer than [`MAX_WINDOW`].
    pub fn new(max_requests: u64, window: Duration) -> Result<Self> {
        if max_requests == 0 {
            return Err(LimiterError::InvalidPolicy(
                "max_requests must be at least 1".to_string(),
            ));
        }
        if window.is_zero() {
            return Err(LimiterError::InvalidPolicy(
                "window duration must be greater than 0".to_string(),
            ));
        }
        if window > MAX_WINDOW {
            return Err(LimiterError::InvalidPolicy(format!(
                "window duration must not exceed {}s",
                MAX_WINDOW.as_secs()
            )));
        }
        Ok(Self {
            max_requests,
            window,
        })
    }

    pub const PRESET_REGISTRATION: Policy = Policy::per_minute_const(10);
    pub const PRESET_API: Policy = Policy::per_minute_const(100);
    pub const PRESET_LOGIN: Policy = Policy::per_minute_const(5);

    /// Per-minute policy checked at compile time. A zero ceiling fails the build.
    const fn per_minute_const(max_requests: u64) -> Self {
        assert!(max_requests > 0);
        Self {
            max_requests,
            window: Duration::from_secs(60),
        }
    }

    /// Shorthand for a per-minute policy.
    pub fn per_minute(max_requests: u64) -> Result<Self> {
        Self::new(max_requests, TimeUnit::Minute.duration())
    }

    /// Maximum number of admitted requests per window.
    pub fn max_requests(&self) -> u64 {
        self.max_requests
    }

    /// Length of one window.
    pub fn window(&self) -> Duration {
        self.window
    }
}

/// Time unit for configured rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
    Day,
}

impl TimeUnit {
    /// Get the duration of this time unit.
    pub fn duration(&self) -> Duration {
        match self {
            TimeUnit::Second => Duration::from_secs(1),
            TimeUnit::Minute => Duration::from_secs(60),
            TimeUnit::Hour => Duration::from_secs(3600),
            TimeUnit::Day => Duration::from_secs(86400),
        }
    }
}

/// A policy as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRule {
    /// Number of requests allowed per unit of time
    pub requests_per_unit: u64,
    /// The time unit
    pub unit: TimeUnit,
    /// Optional description for this policy
    #[serde(default)]
    pub name: Option<String>,
}

impl PolicyRule {
    /// Create a rule without a description.
    pub fn new(requests_per_unit: u64, unit: TimeUnit) -> Self {
        Self {
            requests_per_unit,
            unit,
            name: None,
        }
    }

    /// Validate this rule and turn it into a [`Policy`].
    pub fn to_policy(&self) -> Result<Policy> {
        Policy::new(self.requests_per_unit, self.unit.duration())
    }
}

impl TryFrom<&PolicyRule> for Policy {
    type Error = LimiterError;

    fn try_from(rule: &PolicyRule) -> Result<Self> {
        rule.to_policy()
    }
}

/// Names of the built-in presets.
pub const REGISTRATION: &str = "registration";
pub const API: &str = "api";
pub const LOGIN: &str = "login";

/// The rules behind [`PolicySet::presets`].
pub fn preset_rules() -> BTreeMap<String, PolicyRule> {
    let mut rules = BTreeMap::new();
    rules.insert(REGISTRATION.to_string(), PolicyRule::new(10, TimeUnit::Minute));
    rules.insert(API.to_string(), PolicyRule::new(100, TimeUnit::Minute));
    rules.insert(LOGIN.to_string(), PolicyRule::new(5, TimeUnit::Minute));
    rules
}

/// Named policies, resolved by callers before they reach the store.
#[derive(Debug, Clone, Default)]
pub struct PolicySet {
    policies: BTreeMap<String, Policy>,
}

impl PolicySet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The registration (10/min), api (100/min) and login (5/min) presets.
    pub fn presets() -> Self {
        let mut set = Self::new();
        set.insert(REGISTRATION, Policy::PRESET_REGISTRATION);
        set.insert(API, Policy::PRESET_API);
        set.insert(LOGIN, Policy::PRESET_LOGIN);
        set
    }

    /// Build a set from configured rules, failing on the first invalid one.
    pub fn from_rules(rules: &BTreeMap<String, PolicyRule>) -> Result<Self> {
        let mut set = Self::new();
        for (name, rule) in rules {
            let policy = rule.to_policy().map_err(|e| match e {
                LimiterError::InvalidPolicy(msg) => {
                    LimiterError::InvalidPolicy(format!("{}: {}", name, msg))
                }
                other => other,
            })?;
            set.insert(name.clone(), policy);
        }
        Ok(set)
    }

    /// Register or replace a named policy.
    pub fn insert(&mut self, name: impl Into<String>, policy: Policy) {
        self.policies.insert(name.into(), policy);
    }

    /// Look up a policy by name.
    pub fn get(&self, name: &str) -> Result<Policy> {
        self.policies
            .get(name)
            .copied()
            .ok_or_else(|| LimiterError::UnknownPolicy(name.to_string()))
    }

    /// Iterate over the policies in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Policy)> {
        self.policies.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}
