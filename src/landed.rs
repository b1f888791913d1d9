use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::Patch;

// Bracketed reviewer callouts appended to titles, e.g. "[r=jane]" or "[r?lead]".
static REVIEWER_CALLOUT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[r[=?][^\]]*\]").unwrap());

/// Normalize a summary for landed-patch comparison: drop reviewer callouts,
/// collapse whitespace runs, trim.
pub fn normalize_summary(summary: &str) -> String {
  let stripped = REVIEWER_CALLOUT.replace_all(summary, " ");
  stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Pick the patch most likely to be the one that landed as this commit.
///
/// A single active patch is taken as-is. Otherwise the first active patch
/// whose normalized summary equals the commit's normalized summary wins; the
/// first-match tie-break is deliberate, favoring precision over recall. `None`
/// means the heuristic declined to guess.
pub fn infer_landed_patch<'a>(commit_summary: &str, patches: &'a [Patch]) -> Option<&'a Patch> {
  let active: Vec<&Patch> = patches.iter().filter(|p| p.is_active()).collect();

  if active.len() == 1 {
    return Some(active[0]);
  }

  let target = normalize_summary(commit_summary);
  active.into_iter().find(|p| normalize_summary(&p.summary) == target)
}
