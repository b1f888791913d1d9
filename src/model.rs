// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Define the JSON model (commits, bugs, patches, lifecycle events) shared by aggregation and reporting
// role: model/types
// outputs: Serializable structs with stable field names; typed flag statuses rendered as compact strings
// invariants: Optional fields are omitted, not null; people maps are sorted; patch liveness derives from the newest obsoletion-related event
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// user → sorted, deduplicated relationship roles.
pub type People = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagKind {
  Review,
  Feedback,
  Needinfo,
}

impl FlagKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      FlagKind::Review => "review",
      FlagKind::Feedback => "feedback",
      FlagKind::Needinfo => "needinfo",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagState {
  Requested,
  Granted,
  Denied,
  Withdrawn,
}

impl FlagState {
  fn symbol(&self) -> char {
    match self {
      FlagState::Requested => '?',
      FlagState::Granted => '+',
      FlagState::Denied => '-',
      FlagState::Withdrawn => 'X',
    }
  }

  fn from_symbol(c: char) -> Option<Self> {
    match c {
      '?' => Some(FlagState::Requested),
      '+' => Some(FlagState::Granted),
      '-' => Some(FlagState::Denied),
      'X' => Some(FlagState::Withdrawn),
      _ => None,
    }
  }
}

/// A flag status such as `review?` or `needinfoX`, kept typed internally and
/// rendered as the tracker's compact string form in JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagStatus {
  pub kind: FlagKind,
  pub state: FlagState,
}

impl FlagStatus {
  pub fn new(kind: FlagKind, state: FlagState) -> Self {
    Self { kind, state }
  }
}

impl fmt::Display for FlagStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}{}", self.kind.as_str(), self.state.symbol())
  }
}

impl FromStr for FlagStatus {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    for kind in [FlagKind::Review, FlagKind::Feedback, FlagKind::Needinfo] {
      if let Some(rest) = s.strip_prefix(kind.as_str()) {
        let mut chars = rest.chars();
        if let (Some(sym), None) = (chars.next(), chars.next()) {
          if let Some(state) = FlagState::from_symbol(sym) {
            return Ok(FlagStatus::new(kind, state));
          }
        }
      }
    }
    Err(format!("unrecognized flag status {:?}", s))
  }
}

impl Serialize for FlagStatus {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for FlagStatus {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
  }
}

/// Status carried by one entry in a patch's event list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchEventStatus {
  Flag(FlagStatus),
  Obsoleted,
  Unobsoleted,
}

impl fmt::Display for PatchEventStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PatchEventStatus::Flag(flag) => flag.fmt(f),
      PatchEventStatus::Obsoleted => f.write_str("obsoleted"),
      PatchEventStatus::Unobsoleted => f.write_str("unobsoleted"),
    }
  }
}

impl FromStr for PatchEventStatus {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "obsoleted" => Ok(PatchEventStatus::Obsoleted),
      "unobsoleted" => Ok(PatchEventStatus::Unobsoleted),
      other => other.parse::<FlagStatus>().map(PatchEventStatus::Flag),
    }
  }
}

impl Serialize for PatchEventStatus {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for PatchEventStatus {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
  }
}

/// One lifecycle event on a patch: a review/feedback flag change or an
/// obsoletion marker. `requestee` is absent for obsoletion events; `actor`
/// is present only when someone other than the requestee acted.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PatchEvent {
  pub status: PatchEventStatus,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub requestee: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub actor: Option<String>,
  pub timestamp: String,
}

/// Bug-scope flag event (needinfo lifecycle).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FlagEvent {
  pub status: FlagStatus,
  pub requestee: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub actor: Option<String>,
  pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AssignmentEvent {
  pub user: String,
  pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StatusEvent {
  pub status: String,
  pub user: String,
  pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TriageEvent {
  pub user: String,
  pub action: String,
  pub timestamp: String,
}

/// Code-review revision linked from a review-tool attachment.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Revision {
  pub url: String,
  pub id: String,
  pub phid: String,
  pub diffs: Vec<u64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Patch {
  pub id: u64,
  pub content_type: String,
  pub user: String,
  pub timestamp: String,
  pub summary: String,
  pub status: Vec<PatchEvent>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub revision: Option<Revision>,
}

impl Patch {
  /// A patch is active unless its most recent obsoletion-related event
  /// obsoleted it. Patches never touched by obsoletion are active.
  pub fn is_active(&self) -> bool {
    for event in self.status.iter().rev() {
      match event.status {
        PatchEventStatus::Obsoleted => return false,
        PatchEventStatus::Unobsoleted => return true,
        PatchEventStatus::Flag(_) => {}
      }
    }
    true
  }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Bug {
  pub id: u64,
  pub url: String,
  pub reporter: String,
  pub product: String,
  pub component: String,
  pub comment_count: i64,
  pub created_timestamp: String,
  pub patches: Vec<Patch>,
  pub assigned_to: Vec<AssignmentEvent>,
  pub status: Vec<StatusEvent>,
  pub flags: Vec<FlagEvent>,
  pub triaged: Vec<TriageEvent>,
  pub people: People,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Backout {
  pub summary: String,
  pub user: String,
  pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Commit {
  pub node: String,
  pub hg_url: String,
  pub summary: String,
  pub author: String,
  pub pusher: String,
  pub push_timestamp: String,
  pub patch_size: usize,
  pub patch_lines_of_code: usize,
  pub bug_id: u64,
  pub bug_url: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub backout: Option<Backout>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub landed_attachment_id: Option<u64>,
  pub people: People,
}

/// Batch-mode document: every requested commit plus every distinct bug.
#[derive(Debug, Serialize, Deserialize)]
pub struct BatchReport {
  pub commits: BTreeMap<String, Commit>,
  pub bugs: BTreeMap<String, Bug>,
}
