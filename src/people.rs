use std::collections::{BTreeMap, BTreeSet};

use crate::model::People;

/// Accumulates raw (user, role) observations as aggregation walks events.
///
/// Observations keep insertion order and duplicates; the normalized map is
/// computed from the full list at the end, never updated incrementally.
#[derive(Debug, Default, Clone)]
pub struct Roster {
  observations: Vec<(String, String)>,
}

impl Roster {
  pub fn new() -> Self {
    Self::default()
  }

  /// Record that `user` was seen in relationship `role`.
  pub fn note(&mut self, user: impl Into<String>, role: impl Into<String>) {
    self.observations.push((user.into(), role.into()));
  }

  /// Append every observation from another roster.
  pub fn absorb(&mut self, other: &Roster) {
    self.observations.extend(other.observations.iter().cloned());
  }

  pub fn normalized(&self) -> People {
    normalize(&self.observations)
  }
}

/// Collapse observation pairs into user → sorted distinct roles.
pub fn normalize(observations: &[(String, String)]) -> People {
  let mut roles: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

  for (user, role) in observations {
    roles.entry(user.clone()).or_default().insert(role.clone());
  }

  roles
    .into_iter()
    .map(|(user, set)| (user, set.into_iter().collect()))
    .collect()
}
