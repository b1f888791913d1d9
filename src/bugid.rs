use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

// Values at or above this are phone numbers, hashes, or other noise.
const BUG_ID_CEILING: u64 = 100_000_000;

// A number counts as a bug reference when the word "bug" precedes it, when it
// is a standalone run of five or more digits, or when it opens the summary.
static AFTER_BUG_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bbug\s*#?(\d+)\b").unwrap());
static STANDALONE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{5,})\b").unwrap());
static LEADING_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)\b").unwrap());

/// Find the plausible bug ids referenced by a commit summary line.
///
/// Returns a deduplicated set; the caller enforces its own cardinality rules.
/// Never fails — a summary without references yields an empty set.
pub fn parse_bug_ids(summary: &str) -> BTreeSet<u64> {
  let mut ids = BTreeSet::new();

  for re in [&AFTER_BUG_WORD, &STANDALONE_RUN, &LEADING_DIGITS] {
    for caps in re.captures_iter(summary) {
      if let Ok(id) = caps[1].parse::<u64>() {
        if id < BUG_ID_CEILING {
          ids.insert(id);
        }
      }
    }
  }

  ids
}
