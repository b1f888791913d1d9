use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};
use crate::ext::serde_json::JsonFetch;
use crate::fetch::Fetcher;
use crate::model::Revision;

// Revision URLs look like https://phabricator.services.mozilla.com/D104842
static REVISION_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(https?://[^/\s]+)/+D(\d+)\b").unwrap());

/// Resolve a review revision URL to its stable identifier and diff list
/// through the review system's search API. Both conduit calls are cached per
/// revision id, so re-runs never repeat the network round-trips.
pub fn resolve(fetcher: &Fetcher, api_token: &str, revision_url: &str) -> Result<Revision> {
  let url = revision_url.trim();
  let caps = REVISION_URL
    .captures(url)
    .ok_or_else(|| Error::BadRevisionUrl { url: url.to_string() })?;

  let base_url = caps[1].to_string();
  let revision_id: u64 = caps[2]
    .parse()
    .map_err(|_| Error::BadRevisionUrl { url: url.to_string() })?;

  let search = conduit(
    fetcher,
    api_token,
    &base_url,
    "differential.revision.search",
    &format!("phid-{}", revision_id),
    vec![("constraints[ids][0]".to_string(), revision_id.to_string())],
  )?;

  let phid = search.fetch("result.data.0.phid").to::<String>().ok_or_else(|| Error::Malformed {
    source_name: "differential.revision.search".into(),
    field: "result.data.0.phid".into(),
  })?;

  let diff_search = conduit(
    fetcher,
    api_token,
    &base_url,
    "differential.diff.search",
    &format!("diffs-{}", revision_id),
    vec![("constraints[revisionPHIDs][0]".to_string(), phid.clone())],
  )?;

  let diffs: Vec<u64> = diff_search
    .fetch("result.data")
    .iter_array()
    .filter_map(|d| d.fetch("id").to::<u64>())
    .collect();

  Ok(Revision {
    url: url.to_string(),
    id: format!("D{}", revision_id),
    phid,
    diffs,
  })
}

fn conduit(
  fetcher: &Fetcher,
  api_token: &str,
  base_url: &str,
  api_name: &str,
  cache_key: &str,
  mut params: Vec<(String, String)>,
) -> Result<serde_json::Value> {
  params.push(("api.token".to_string(), api_token.to_string()));
  fetcher.json(&format!("{}/api/{}", base_url, api_name), cache_key, Some(&params))
}
