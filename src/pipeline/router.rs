//! Content-based router for staged attachments.
//!
//! Rules are checked in order and the first matching predicate wins:
//! - `*.zip` → zip repair, then zip extraction
//! - `*.gz`  → gzip extraction (with DMARC validation)
//!
//! Paths no rule claims fall through to the [`UnroutedPolicy`].
//!
//! Routing looks at the file name only. A `.zip` without a zip signature is
//! routed to the zip branch and fails there with `ArchiveFormat`.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use tracing::debug;

use crate::error::{ConfigError, ExtractError, Result};
use crate::pipeline::types::{ExtractionResult, Stage};

type PathPredicate = Box<dyn Fn(&Path) -> bool + Send + Sync>;

/// A predicate over staged paths paired with the stage that handles matches.
pub struct RouteRule {
    /// Human-readable description (for logging).
    pub label: String,
    predicate: PathPredicate,
    handler: Box<dyn Stage>,
}

impl RouteRule {
    pub fn new<P, S>(label: impl Into<String>, predicate: P, handler: S) -> Self
    where
        P: Fn(&Path) -> bool + Send + Sync + 'static,
        S: Stage + 'static,
    {
        Self {
            label: label.into(),
            predicate: Box::new(predicate),
            handler: Box::new(handler),
        }
    }

    /// Match paths whose text ends with `suffix` (case-sensitive).
    pub fn suffix<S: Stage + 'static>(suffix: &str, handler: S) -> Self {
        let owned = suffix.to_string();
        Self::new(
            format!("*{suffix}"),
            move |path: &Path| path.to_string_lossy().ends_with(owned.as_str()),
            handler,
        )
    }

    pub fn matches(&self, path: &Path) -> bool {
        (self.predicate)(path)
    }
}

impl fmt::Debug for RouteRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteRule")
            .field("label", &self.label)
            .field("handler", &self.handler.name())
            .finish()
    }
}

/// What to do with a staged path that no rule matched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnroutedPolicy {
    /// Drop it. The staged file stays on disk.
    #[default]
    Ignore,
    /// Report the staged file as a result unchanged.
    Accept,
    /// Fail the run with `UnroutableAttachment`.
    Reject,
}

impl UnroutedPolicy {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ignore => "ignore",
            Self::Accept => "accept",
            Self::Reject => "reject",
        }
    }
}

impl FromStr for UnroutedPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ignore" => Ok(Self::Ignore),
            "accept" => Ok(Self::Accept),
            "reject" => Ok(Self::Reject),
            other => Err(ConfigError::InvalidValue {
                key: "unrouted policy".into(),
                message: format!("expected ignore, accept or reject, got {other:?}"),
            }),
        }
    }
}

/// Ordered rule list with a fallback policy.
#[derive(Debug, Default)]
pub struct ContentRouter {
    rules: Vec<RouteRule>,
    policy: UnroutedPolicy,
}

impl ContentRouter {
    /// Create a router with no rules.
    pub fn new(policy: UnroutedPolicy) -> Self {
        Self {
            rules: Vec::new(),
            policy,
        }
    }

    /// Append a rule; it is checked after all existing rules.
    pub fn add_rule(&mut self, rule: RouteRule) {
        self.rules.push(rule);
    }

    pub fn with_rule(mut self, rule: RouteRule) -> Self {
        self.add_rule(rule);
        self
    }

    pub fn policy(&self) -> UnroutedPolicy {
        self.policy
    }

    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }

    /// Hand `path` to the first matching rule's stage, or apply the policy.
    pub fn route(&self, path: &Path, sink: &mut ExtractionResult) -> Result<()> {
        if let Some(rule) = self.rules.iter().find(|r| r.matches(path)) {
            debug!(
                path = %path.display(),
                rule = %rule.label,
                handler = rule.handler.name(),
                "Routing staged file"
            );
            return rule.handler.process(path, sink);
        }

        debug!(
            path = %path.display(),
            policy = self.policy.label(),
            "No route matched"
        );
        match self.policy {
            UnroutedPolicy::Ignore => Ok(()),
            UnroutedPolicy::Accept => {
                sink.push(path);
                Ok(())
            }
            UnroutedPolicy::Reject => Err(ExtractError::UnroutableAttachment {
                path: path.to_path_buf(),
            }),
        }
    }
}

impl Stage for ContentRouter {
    fn name(&self) -> &str {
        "content_router"
    }

    fn process(&self, input: &Path, sink: &mut ExtractionResult) -> Result<()> {
        self.route(input, sink)
    }
}
