//! Operator availability accounting.
//!
//! Availability is derived at read time from the number of active (not yet
//! `Completed`) tasks each operator is assigned to. It is never stored.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{OperatorCategory, User};

/// Number of active tasks at which an operator stops accepting new work.
pub const BUSY_THRESHOLD: i64 = 3;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Available,
    Busy,
}

impl Availability {
    pub fn from_active_count(active_tasks: i64) -> Self {
        if active_tasks >= BUSY_THRESHOLD {
            Availability::Busy
        } else {
            Availability::Available
        }
    }

    pub fn is_available(self) -> bool {
        self == Availability::Available
    }
}

/// One row of the supervisor's operator list.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OperatorSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub category: OperatorCategory,
    pub total_tasks: i64,
    pub availability: Availability,
}

impl OperatorSummary {
    pub fn new(operator: &User, active_tasks: i64) -> Self {
        Self {
            id: operator.id,
            name: operator.name.clone(),
            email: operator.email.clone(),
            category: operator.category.unwrap_or_default(),
            total_tasks: active_tasks,
            availability: Availability::from_active_count(active_tasks),
        }
    }
}

/// Builds summaries for `operators`; operators missing from `counts` have no active tasks.
pub fn summarize(operators: &[User], counts: &HashMap<Uuid, i64>) -> Vec<OperatorSummary> {
    operators
        .iter()
        .map(|operator| {
            let active = counts.get(&operator.id).copied().unwrap_or(0);
            OperatorSummary::new(operator, active)
        })
        .collect()
}

/// Returns the ids in `requested` that are not already in `current`, first occurrence only.
///
/// These are the operators whose availability must be checked before an assignment.
pub fn newly_added(current: &[Uuid], requested: &[Uuid]) -> Vec<Uuid> {
    let mut added = Vec::new();
    for id in requested {
        if !current.contains(id) && !added.contains(id) {
            added.push(*id);
        }
    }
    added
}

/// Removes duplicate ids while preserving the first-seen order.
pub fn dedup_preserving_order(ids: &[Uuid]) -> Vec<Uuid> {
    newly_added(&[], ids)
}
