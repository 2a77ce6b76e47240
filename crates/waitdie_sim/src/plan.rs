//! Work plans.
//!
//! A plan is the fixed sequence of lock and data steps a transaction runs on
//! every attempt. All transactions acquire resources in the same global order,
//! which rules out lock-order deadlocks independently of Wait-Die.

use crate::error::{SimError, SimResult};
use std::collections::HashSet;
use std::fmt;
use waitdie_core::ResourceId;

/// One step of a work plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Lock a resource.
    Acquire(ResourceId),
    /// Read a locked resource.
    Read(ResourceId),
    /// Write all listed (locked) resources.
    Write(Vec<ResourceId>),
    /// Unlock a resource.
    Release(ResourceId),
    /// Release anything still held and commit.
    Commit,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Acquire(r) => write!(f, "acquire {r}"),
            Self::Read(r) => write!(f, "read {r}"),
            Self::Write(rs) => {
                let names: Vec<_> = rs.iter().map(ResourceId::as_str).collect();
                write!(f, "write {}", names.join(","))
            }
            Self::Release(r) => write!(f, "release {r}"),
            Self::Commit => f.write_str("commit"),
        }
    }
}

/// An ordered list of steps ending in a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkPlan {
    steps: Vec<Step>,
}

impl WorkPlan {
    /// Builds the standard plan over `resources`:
    /// acquire and read each in order, write all, release in reverse, commit.
    pub fn ordered(resources: &[ResourceId]) -> SimResult<Self> {
        let mut steps = Vec::with_capacity(resources.len() * 3 + 2);
        for r in resources {
            steps.push(Step::Acquire(r.clone()));
            steps.push(Step::Read(r.clone()));
        }
        steps.push(Step::Write(resources.to_vec()));
        for r in resources.iter().rev() {
            steps.push(Step::Release(r.clone()));
        }
        steps.push(Step::Commit);
        Self::from_steps(steps)
    }

    /// Builds a plan from explicit steps.
    ///
    /// # Errors
    ///
    /// Rejects plans that acquire a resource twice, touch a resource they
    /// do not hold, or do not end with exactly one commit.
    pub fn from_steps(steps: Vec<Step>) -> SimResult<Self> {
        let mut held = HashSet::new();
        let mut acquired = HashSet::new();
        let last = steps.len().checked_sub(1);

        for (i, step) in steps.iter().enumerate() {
            match step {
                Step::Acquire(r) => {
                    if !acquired.insert(r.clone()) {
                        return Err(SimError::invalid_config(format!(
                            "step {i}: {r} acquired twice"
                        )));
                    }
                    held.insert(r.clone());
                }
                Step::Read(r) | Step::Release(r) => {
                    if !held.contains(r) {
                        return Err(SimError::invalid_config(format!(
                            "step {i}: {step} on a resource not held"
                        )));
                    }
                    if matches!(step, Step::Release(_)) {
                        held.remove(r);
                    }
                }
                Step::Write(rs) => {
                    if let Some(r) = rs.iter().find(|r| !held.contains(*r)) {
                        return Err(SimError::invalid_config(format!(
                            "step {i}: write to {r} which is not held"
                        )));
                    }
                }
                Step::Commit => {
                    if Some(i) != last {
                        return Err(SimError::invalid_config(format!(
                            "step {i}: commit must be the final step"
                        )));
                    }
                }
            }
        }

        if !matches!(steps.last(), Some(Step::Commit)) {
            return Err(SimError::invalid_config("plan must end with commit"));
        }
        Ok(Self { steps })
    }

    /// The plan's steps.
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Resources in acquisition order.
    #[must_use]
    pub fn acquisition_order(&self) -> Vec<ResourceId> {
        self.steps
            .iter()
            .filter_map(|s| match s {
                Step::Acquire(r) => Some(r.clone()),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<ResourceId> {
        names.iter().map(|n| ResourceId::new(n)).collect()
    }

    #[test]
    fn two_resource_plan_matches_reference_order() {
        let plan = WorkPlan::ordered(&ids(&["A", "B"])).unwrap();
        let rendered: Vec<_> = plan.steps().iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "acquire A",
                "read A",
                "acquire B",
                "read B",
                "write A,B",
                "release B",
                "release A",
                "commit"
            ]
        );
        assert_eq!(plan.acquisition_order(), ids(&["A", "B"]));
    }

    #[test]
    fn rejects_double_acquire() {
        let steps = vec![
            Step::Acquire(ResourceId::new("A")),
            Step::Acquire(ResourceId::new("A")),
            Step::Commit,
        ];
        assert!(WorkPlan::from_steps(steps).is_err());
    }

    #[test]
    fn rejects_read_without_lock() {
        let steps = vec![Step::Read(ResourceId::new("A")), Step::Commit];
        assert!(WorkPlan::from_steps(steps).is_err());
    }

    #[test]
    fn rejects_missing_or_early_commit() {
        assert!(WorkPlan::from_steps(vec![Step::Acquire(ResourceId::new("A"))]).is_err());
        assert!(WorkPlan::from_steps(vec![Step::Commit, Step::Commit]).is_err());
        assert!(WorkPlan::from_steps(Vec::new()).is_err());
    }

    #[test]
    fn commit_may_release_remaining_locks() {
        let steps = vec![Step::Acquire(ResourceId::new("A")), Step::Commit];
        assert!(WorkPlan::from_steps(steps).is_ok());
    }
}
