use std::path::Path;

use serde_json::json;

pub const HG_URL: &str = "https://hg.invalid/repo";
pub const BZ_URL: &str = "https://bz.invalid";

// Integration tests run the real binary against a pre-seeded cache directory:
// a present cache key is authoritative for the fetcher, so the runs below are
// hermetic even though the configured hosts do not exist.

#[allow(dead_code)]
pub fn seed_json(cache: &Path, key: &str, value: &serde_json::Value) {
  std::fs::write(cache.join(key), serde_json::to_string_pretty(value).unwrap()).unwrap();
}

#[allow(dead_code)]
pub fn seed_text(cache: &Path, key: &str, body: &str) {
  std::fs::write(cache.join(key), body).unwrap();
}

/// Seed the revision record for `rev` (the id used on the command line).
#[allow(dead_code)]
pub fn seed_revision(cache: &Path, rev: &str, node: &str, desc: &str, backedoutby: &str) {
  seed_json(
    cache,
    &format!("{}-hg", rev),
    &json!({
      "node": node,
      "desc": desc,
      "user": "Dev One <dev@example.com>",
      "pushuser": "sheriff@example.com",
      "pushdate": [1_552_060_882, 0],
      "backedoutby": backedoutby,
    }),
  );
  seed_text(cache, &format!("{}-patch", rev), "diff --git a/f b/f\n+one line\n");
}

/// Seed bug metadata, history, and attachment list for one bug.
#[allow(dead_code)]
pub fn seed_bug(cache: &Path, bug_id: u64, history: serde_json::Value, attachments: serde_json::Value) {
  seed_json(
    cache,
    &format!("bug-{}", bug_id),
    &json!({
      "bugs": [{
        "creator": "reporter@example.com",
        "creation_time": "2019-01-01T10:00:00Z",
        "product": "Core",
        "component": "Networking",
        "comment_count": 3,
      }]
    }),
  );
  seed_json(cache, &format!("bug-{}-history", bug_id), &json!({ "bugs": [{ "history": history }] }));
  seed_json(
    cache,
    &format!("bug-{}-attachments", bug_id),
    &json!({ "bugs": { bug_id.to_string(): attachments } }),
  );
}

/// One plain non-obsoleted patch authored by dev@example.com.
#[allow(dead_code)]
pub fn seed_bug_with_one_patch(cache: &Path, bug_id: u64, attachment_id: u64) {
  seed_bug(
    cache,
    bug_id,
    json!([]),
    json!([{
      "id": attachment_id,
      "is_patch": 1,
      "content_type": "text/plain",
      "creator": "dev@example.com",
      "creation_time": "2019-01-02T10:00:00Z",
      "summary": "Bug 42 - fix thing",
    }]),
  );
}

/// Command pointed at the seeded cache, with the credential the binary
/// requires at startup.
#[allow(dead_code)]
pub fn dossier_cmd(cache: &Path) -> assert_cmd::Command {
  let mut cmd = assert_cmd::Command::cargo_bin("commit-dossier").unwrap();
  cmd
    .env("PHAB_API_TOKEN", "test-token")
    .arg("--cache-dir")
    .arg(cache)
    .arg("--hg-url")
    .arg(HG_URL)
    .arg("--bugzilla-url")
    .arg(BZ_URL);
  cmd
}
