//! Task/project lifecycle manager
//!
//! Business rules that sit between the API and the [`Store`](crate::store::Store): input
//! validation, referential checks, the task status policy and translation of
//! store absence into [`DomainError::NotFound`].
//!
//! All operations hang off [`Lifecycle`]; each entity family has its own
//! `impl` block in a submodule:
//!
//! - `users`: registration, admin user management, bootstrap admin
//! - `projects`: projects and memberships
//! - `tasks`: tasks, subtasks and comments
//! - `notifications`: per-user notifications
//!
//! The caller identity is an explicit argument wherever a record needs an
//! author; the access gate has already run by the time these are called.

mod notifications;
mod projects;
mod tasks;
mod users;

pub use notifications::NewNotification;
pub use projects::{NewProject, ProjectChanges};
pub use tasks::{NewSubtask, NewTask, SubtaskChanges, TaskChanges};
pub use users::{NewUser, UserChanges};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::auth::password::PasswordError;
use crate::models::task::TaskStatus;
use crate::store::{SharedStore, StoreError};

/// One failed field check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Error type for lifecycle operations
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    /// Input failed one or more field checks
    #[error("Validation failed: {}", summarize(.0))]
    Validation(Vec<FieldViolation>),

    /// Target entity doesn't exist
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Password(#[from] PasswordError),
}

impl DomainError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        DomainError::Validation(vec![FieldViolation::new(field, message)])
    }

    pub(crate) fn not_found(entity: &'static str, id: Uuid) -> Self {
        DomainError::NotFound { entity, id }
    }
}

fn summarize(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("{}: {}", v.field, v.message))
        .collect::<Vec<_>>()
        .join("; ")
}

pub type DomainResult<T> = Result<T, DomainError>;

/// Collects field violations for one input
#[derive(Debug, Default)]
pub(crate) struct Violations(Vec<FieldViolation>);

impl Violations {
    pub(crate) fn push(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(FieldViolation::new(field, message));
    }

    pub(crate) fn require_text(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.push(field, format!("{} must not be empty", field));
        }
    }

    /// Parses `raw` into `T`, recording the parse error against `field`
    pub(crate) fn parse<T>(&mut self, field: &str, raw: Option<&str>) -> Option<T>
    where
        T: FromStr<Err = String>,
    {
        match raw.map(str::parse::<T>) {
            Some(Ok(value)) => Some(value),
            Some(Err(message)) => {
                self.push(field, message);
                None
            }
            None => None,
        }
    }

    pub(crate) fn finish(self) -> DomainResult<()> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(self.0))
        }
    }
}

/// Which status changes a task update may make
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionPolicy {
    /// Any status may be set from any status
    #[default]
    Unconstrained,

    /// Only moves allowed by [`TaskStatus::can_transition_to`]
    Strict,
}

impl TransitionPolicy {
    pub fn allows(&self, from: TaskStatus, to: TaskStatus) -> bool {
        match self {
            TransitionPolicy::Unconstrained => true,
            TransitionPolicy::Strict => from.can_transition_to(to),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionPolicy::Unconstrained => "unconstrained",
            TransitionPolicy::Strict => "strict",
        }
    }
}

impl fmt::Display for TransitionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransitionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unconstrained" => Ok(TransitionPolicy::Unconstrained),
            "strict" => Ok(TransitionPolicy::Strict),
            other => Err(format!(
                "unknown transition policy '{}': expected unconstrained or strict",
                other
            )),
        }
    }
}

/// Entry point for all domain operations
#[derive(Clone)]
pub struct Lifecycle {
    store: SharedStore,
    transitions: TransitionPolicy,
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("transitions", &self.transitions)
            .field("deletion", &self.store.deletion_policy())
            .finish()
    }
}

impl Lifecycle {
    pub fn new(store: SharedStore) -> Self {
        Self {
            store,
            transitions: TransitionPolicy::default(),
        }
    }

    pub fn with_transition_policy(mut self, transitions: TransitionPolicy) -> Self {
        self.transitions = transitions;
        self
    }

    pub fn transition_policy(&self) -> TransitionPolicy {
        self.transitions
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_policy_from_str() {
        assert_eq!("strict".parse::<TransitionPolicy>(), Ok(TransitionPolicy::Strict));
        assert_eq!(" Unconstrained ".parse::<TransitionPolicy>(), Ok(TransitionPolicy::Unconstrained));
        assert!("loose".parse::<TransitionPolicy>().is_err());
    }

    #[test]
    fn test_transition_policy_allows() {
        let strict = TransitionPolicy::Strict;
        assert!(strict.allows(TaskStatus::Open, TaskStatus::Done));
        assert!(!strict.allows(TaskStatus::Done, TaskStatus::Open));
        assert!(strict.allows(TaskStatus::Done, TaskStatus::Done));

        let open = TransitionPolicy::Unconstrained;
        assert!(open.allows(TaskStatus::Done, TaskStatus::Open));
        assert!(open.allows(TaskStatus::Canceled, TaskStatus::InProgress));
    }

    #[test]
    fn test_violations_collects() {
        let mut violations = Violations::default();
        violations.require_text("title", "   ");
        let status: Option<TaskStatus> = violations.parse("status", Some("Paused"));
        assert!(status.is_none());

        match violations.finish() {
            Err(DomainError::Validation(list)) => {
                let fields: Vec<_> = list.iter().map(|v| v.field.as_str()).collect();
                assert_eq!(fields, vec!["title", "status"]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_validation_display() {
        let err = DomainError::Validation(vec![
            FieldViolation::new("name", "name must not be empty"),
            FieldViolation::new("end_date", "end_date must not precede start_date"),
        ]);
        assert_eq!(
            err.to_string(),
            "Validation failed: name: name must not be empty; end_date: end_date must not precede start_date"
        );
    }
}
