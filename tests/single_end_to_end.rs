mod common;

use common::*;
use predicates::prelude::*;

const NODE: &str = "9b2a99adc05e53cd4010de512f50118594756650";
const REV: &str = "9b2a99adc05e";

#[test]
fn consolidates_one_revision_into_one_document() {
  let dir = tempfile::TempDir::new().unwrap();
  seed_revision(dir.path(), REV, NODE, "Bug 42 - fix thing\n\nlonger explanation", "");
  seed_bug_with_one_patch(dir.path(), 42, 9001);

  let output = dossier_cmd(dir.path()).arg(REV).output().unwrap();
  assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

  let doc: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(doc["node"], NODE);
  assert_eq!(doc["bug_id"], 42);
  assert_eq!(doc["summary"], "Bug 42 - fix thing");
  assert_eq!(doc["author"], "dev@example.com");
  assert_eq!(doc["pusher"], "sheriff@example.com");
  assert_eq!(doc["push_timestamp"], "2019-03-08T16:01:22Z");
  assert_eq!(doc["hg_url"], format!("{}/rev/{}", HG_URL, REV));
  assert_eq!(doc["bug_url"], format!("{}/42", BZ_URL));
  assert_eq!(doc["bug_created_timestamp"], "2019-01-01T10:00:00Z");
  assert_eq!(doc["landed_attachment_id"], 9001);
  assert_eq!(doc["patches"][0]["id"], 9001);
  assert_eq!(doc.get("backout"), None);

  let dev_roles: Vec<&str> =
    doc["people"]["dev@example.com"].as_array().unwrap().iter().filter_map(|v| v.as_str()).collect();
  assert!(dev_roles.contains(&"patch author"));
  assert!(dev_roles.contains(&"push author"));
  assert_eq!(doc["people"]["reporter@example.com"][0], "reporter");
}

#[test]
fn stdout_is_json_with_sorted_keys() {
  let dir = tempfile::TempDir::new().unwrap();
  seed_revision(dir.path(), REV, NODE, "Bug 42 - fix thing", "");
  seed_bug_with_one_patch(dir.path(), 42, 9001);

  let output = dossier_cmd(dir.path()).arg(REV).output().unwrap();
  assert!(output.status.success());

  let text = String::from_utf8(output.stdout).unwrap();
  assert!(text.starts_with('{'));

  // Top-level keys must come out sorted for diff-friendly output.
  let positions: Vec<usize> = ["\"author\"", "\"bug_id\"", "\"node\"", "\"people\"", "\"triaged\""]
    .iter()
    .map(|k| text.find(k).unwrap_or_else(|| panic!("missing key {}", k)))
    .collect();
  let mut sorted = positions.clone();
  sorted.sort_unstable();
  assert_eq!(positions, sorted);
}

#[test]
fn backed_out_revision_carries_backout_record() {
  let dir = tempfile::TempDir::new().unwrap();
  let backout_full = "00b1afbbe0b7a2b2d817c8a0b605175a25e4be14";
  seed_revision(dir.path(), REV, NODE, "Bug 42 - fix thing", backout_full);
  seed_revision(
    dir.path(),
    "00b1afbbe0b7",
    backout_full,
    "Backed out changeset 9b2a99adc05e (bug 42) for test failures",
    "",
  );
  seed_bug_with_one_patch(dir.path(), 42, 9001);

  let output = dossier_cmd(dir.path()).arg(REV).output().unwrap();
  assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

  let doc: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(
    doc["backout"]["summary"],
    "Backed out changeset 9b2a99adc05e (bug 42) for test failures"
  );
  assert_eq!(doc["backout"]["user"], "dev@example.com");
  assert_eq!(doc["backout"]["timestamp"], "2019-03-08T16:01:22Z");
}

#[test]
fn zero_arguments_is_a_usage_error() {
  let dir = tempfile::TempDir::new().unwrap();
  dossier_cmd(dir.path())
    .assert()
    .failure()
    .stdout(predicate::str::is_empty())
    .stderr(predicate::str::contains("syntax"));
}

#[test]
fn missing_credential_is_fatal_at_startup() {
  let dir = tempfile::TempDir::new().unwrap();
  seed_revision(dir.path(), REV, NODE, "Bug 42 - fix thing", "");
  seed_bug_with_one_patch(dir.path(), 42, 9001);

  dossier_cmd(dir.path())
    .env_remove("PHAB_API_TOKEN")
    .arg(REV)
    .assert()
    .failure()
    .stdout(predicate::str::is_empty())
    .stderr(predicate::str::contains("PHAB_API_TOKEN"));
}

#[test]
fn revision_without_bug_reference_is_skipped_with_diagnostic() {
  let dir = tempfile::TempDir::new().unwrap();
  seed_revision(dir.path(), "aaaa", "aaaa", "tidy comments, no tracking reference", "");
  seed_revision(dir.path(), REV, NODE, "Bug 42 - fix thing", "");
  seed_bug_with_one_patch(dir.path(), 42, 9001);

  let output = dossier_cmd(dir.path()).arg("aaaa").arg(REV).output().unwrap();
  assert!(output.status.success());

  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("failed to find bug-id"), "stderr: {}", stderr);

  // The bad revision produced no document; the good one still did.
  let doc: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(doc["bug_id"], 42);
}

#[test]
fn ambiguous_bug_reference_is_skipped_with_diagnostic() {
  let dir = tempfile::TempDir::new().unwrap();
  seed_revision(dir.path(), "bbbb", "bbbb", "Bug 11111 and bug 22222 - merge cleanup", "");

  let output = dossier_cmd(dir.path()).arg("bbbb").output().unwrap();
  assert!(output.status.success());
  assert!(output.stdout.is_empty());

  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("multiple bug-ids"), "stderr: {}", stderr);
}

#[test]
fn inference_miss_is_diagnostic_only() {
  let dir = tempfile::TempDir::new().unwrap();
  seed_revision(dir.path(), REV, NODE, "Bug 42 - fix thing", "");
  // Two active patches, neither summary matching the commit.
  seed_bug(
    dir.path(),
    42,
    serde_json::json!([]),
    serde_json::json!([
      {
        "id": 9001,
        "is_patch": 1,
        "content_type": "text/plain",
        "creator": "dev@example.com",
        "creation_time": "2019-01-02T10:00:00Z",
        "summary": "part 1: prepare",
      },
      {
        "id": 9002,
        "is_patch": 1,
        "content_type": "text/plain",
        "creator": "dev@example.com",
        "creation_time": "2019-01-03T10:00:00Z",
        "summary": "part 2: land",
      },
    ]),
  );

  let output = dossier_cmd(dir.path()).arg(REV).output().unwrap();
  assert!(output.status.success());

  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("no landed patch inferred"), "stderr: {}", stderr);

  let doc: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(doc.get("landed_attachment_id"), None);
  assert_eq!(doc["patches"].as_array().unwrap().len(), 2);
}
