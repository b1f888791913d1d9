// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Utilities for timestamps, node identifiers, mailbox parsing, and man page rendering
// role: utilities/helpers
// inputs: Epoch seconds; revision identifiers; hg user fields; clap CommandFactory
// outputs: UTC ISO-8601 strings, short node ids, bare email addresses, man page text
// invariants:
// - iso_utc always renders UTC with a trailing Z, second precision
// - short_node never panics on identifiers shorter than 12 chars
// - mailbox_email falls back to the trimmed input when no angle brackets are present
// errors: render_man_page bubbles render IO errors; the rest is infallible
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use chrono::{TimeZone, Utc};
use clap::CommandFactory;

/// Generates the 12-character short form of a full revision node id.
pub fn short_node(full: &str) -> String {
  full.chars().take(12).collect()
}

/// Formats a Unix epoch timestamp as UTC ISO-8601 (`2019-03-08T16:01:22Z`).
///
/// Push timestamps arrive as epoch seconds; everything we emit is normalized
/// to UTC regardless of the pusher's timezone.
pub fn iso_utc(epoch: i64) -> String {
  match Utc.timestamp_opt(epoch, 0).single() {
    Some(dt) => dt.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
    None => String::new(),
  }
}

/// Extracts the bare address from a `Name <email>` style mailbox field.
///
/// hg revision records carry the committer as a full mailbox; the consolidated
/// record wants just the address so people dedup across systems.
pub fn mailbox_email(user: &str) -> String {
  if let (Some(open), Some(close)) = (user.rfind('<'), user.rfind('>')) {
    if open < close {
      return user[open + 1..close].trim().to_string();
    }
  }
  user.trim().to_string()
}

/// First line of a multi-line commit description.
pub fn first_line(text: &str) -> String {
  text.lines().next().unwrap_or("").to_string()
}

/// Render a section-1 man page for a clap `CommandFactory` implementor.
/// Returns the troff content as a UTF-8 string.
pub fn render_man_page<T: CommandFactory>() -> anyhow::Result<String> {
  let cmd = T::command();
  let man = clap_mangen::Man::new(cmd);
  let mut buf: Vec<u8> = Vec::new();

  man.render(&mut buf)?;

  Ok(String::from_utf8_lossy(&buf).to_string())
}

#[cfg(test)]
mod tests {
  use super::*;
  use clap::Parser;

  #[test]
  fn short_node_truncates() {
    assert_eq!(short_node("9b2a99adc05e53cd4010de512f50118594756650"), "9b2a99adc05e");
    assert_eq!(short_node("abc"), "abc");
  }

  #[test]
  fn iso_utc_renders_z_suffix() {
    assert_eq!(iso_utc(1_552_060_882), "2019-03-08T16:01:22Z");
    assert_eq!(iso_utc(0), "1970-01-01T00:00:00Z");
  }

  #[test]
  fn mailbox_email_strips_display_name() {
    assert_eq!(mailbox_email("Jane Doe <jane@example.com>"), "jane@example.com");
    assert_eq!(mailbox_email("jane@example.com"), "jane@example.com");
    assert_eq!(mailbox_email("  odd input  "), "odd input");
  }

  #[test]
  fn first_line_of_multiline_description() {
    assert_eq!(first_line("Bug 42 - fix thing\n\nlonger explanation"), "Bug 42 - fix thing");
    assert_eq!(first_line(""), "");
  }

  #[derive(Parser, Debug)]
  #[command(name = "dummy", version, about = "Dummy CLI", long_about = None)]
  struct DummyCli;

  #[test]
  fn render_man_page_produces_troff_text() {
    let page = render_man_page::<DummyCli>().expect("render manpage");
    assert!(page.contains(".TH"));
    assert!(page.to_lowercase().contains("dummy"));
  }
}
