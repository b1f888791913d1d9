// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Cache-backed HTTP fetching: a Transport seam (GET/form-POST) behind a flat on-disk cache keyed by stable strings
// role: fetching/cache
// inputs: URLs, caller-chosen cache keys, optional form parameters
// outputs: JSON values or raw text; cache files persisted under the cache directory
// side_effects: Network calls on cache miss; writes cache files; progress lines on stderr
// invariants:
// - A present cache key is authoritative: the network is never consulted, even if the URL differs
// - JSON cache files are pretty-printed with sorted keys; text files are stored verbatim
// - No retries; transport errors surface to the caller untouched
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::fs;
use std::path::PathBuf;

use crate::error::{Error, Result};

const USER_AGENT: &str = "commit-dossier";

/// Blocking transport seam so aggregation logic never talks to ureq directly.
pub trait Transport {
  fn get(&self, url: &str) -> Result<String>;
  fn post_form(&self, url: &str, params: &[(String, String)]) -> Result<String>;
}

pub struct HttpTransport {
  agent: ureq::Agent,
}

impl HttpTransport {
  pub fn new() -> Self {
    Self { agent: ureq::AgentBuilder::new().build() }
  }
}

impl Transport for HttpTransport {
  fn get(&self, url: &str) -> Result<String> {
    let response = self
      .agent
      .get(url)
      .set("User-Agent", USER_AGENT)
      .call()
      .map_err(|e| Error::Http(Box::new(e)))?;
    Ok(response.into_string()?)
  }

  fn post_form(&self, url: &str, params: &[(String, String)]) -> Result<String> {
    let pairs: Vec<(&str, &str)> = params.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
    let response = self
      .agent
      .post(url)
      .set("User-Agent", USER_AGENT)
      .send_form(&pairs)
      .map_err(|e| Error::Http(Box::new(e)))?;
    Ok(response.into_string()?)
  }
}

/// Fetcher with a flat cache directory. Each distinct remote call gets a
/// caller-chosen stable key; presence of the key's file is the only thing that
/// decides whether the network is hit.
pub struct Fetcher {
  cache_dir: PathBuf,
  transport: Box<dyn Transport>,
}

impl Fetcher {
  pub fn new(cache_dir: impl Into<PathBuf>, transport: Box<dyn Transport>) -> Result<Self> {
    let cache_dir = cache_dir.into();
    fs::create_dir_all(&cache_dir)?;
    Ok(Self { cache_dir, transport })
  }

  /// Fetch a JSON payload, consulting and populating the cache.
  pub fn json(
    &self,
    url: &str,
    cache_key: &str,
    params: Option<&[(String, String)]>,
  ) -> Result<serde_json::Value> {
    let path = self.cache_dir.join(cache_key);

    if path.exists() {
      let raw = fs::read_to_string(&path)?;
      return Ok(serde_json::from_str(&raw)?);
    }

    eprintln!("fetching {}", url);
    let body = self.request(url, params)?;
    let value: serde_json::Value = serde_json::from_str(&body)?;
    fs::write(&path, serde_json::to_string_pretty(&value)?)?;

    Ok(value)
  }

  /// Fetch a raw-text payload, consulting and populating the cache.
  pub fn text(&self, url: &str, cache_key: &str) -> Result<String> {
    let path = self.cache_dir.join(cache_key);

    if path.exists() {
      return Ok(fs::read_to_string(&path)?);
    }

    eprintln!("fetching {}", url);
    let body = self.transport.get(url)?;
    fs::write(&path, &body)?;

    Ok(body)
  }

  fn request(&self, url: &str, params: Option<&[(String, String)]>) -> Result<String> {
    match params {
      Some(p) => self.transport.post_form(url, p),
      None => self.transport.get(url),
    }
  }
}


#[cfg(test)]
mod tests {
  use super::testing::MemTransport;
  use super::*;
  use std::collections::HashMap;

  fn fetcher_with(responses: &[(&str, &str)]) -> (Fetcher, std::rc::Rc<std::cell::RefCell<Vec<String>>>, tempfile::TempDir) {
    let map: HashMap<String, String> =
      responses.iter().map(|(u, b)| (u.to_string(), b.to_string())).collect();
    let (transport, log) = MemTransport::new(map);
    let dir = tempfile::TempDir::new().unwrap();
    let fetcher = Fetcher::new(dir.path(), Box::new(transport)).unwrap();
    (fetcher, log, dir)
  }

  #[test]
  fn json_miss_then_hit_uses_network_once() {
    let (fetcher, log, _dir) = fetcher_with(&[("https://x.test/rev/abc", r#"{"node": "abc"}"#)]);

    let first = fetcher.json("https://x.test/rev/abc", "abc-hg", None).unwrap();
    assert_eq!(first["node"], "abc");

    let second = fetcher.json("https://x.test/rev/abc", "abc-hg", None).unwrap();
    assert_eq!(second, first);
    assert_eq!(log.borrow().len(), 1);
  }

  #[test]
  fn cache_key_is_authoritative_over_url() {
    let (fetcher, log, _dir) = fetcher_with(&[("https://x.test/a", r#"{"from": "a"}"#)]);

    fetcher.json("https://x.test/a", "shared-key", None).unwrap();
    // Different URL, same key: must return the stored payload, no network.
    let v = fetcher.json("https://x.test/b", "shared-key", None).unwrap();
    assert_eq!(v["from"], "a");
    assert_eq!(log.borrow().len(), 1);
  }

  #[test]
  fn text_is_stored_verbatim() {
    let body = "diff --git a/f b/f\n+added line\n";
    let (fetcher, _log, dir) = fetcher_with(&[("https://x.test/raw/abc", body)]);

    let text = fetcher.text("https://x.test/raw/abc", "abc-patch").unwrap();
    assert_eq!(text, body);

    let on_disk = std::fs::read_to_string(dir.path().join("abc-patch")).unwrap();
    assert_eq!(on_disk, body);
  }

  #[test]
  fn json_cache_files_are_sorted_and_pretty() {
    let (fetcher, _log, dir) = fetcher_with(&[("https://x.test/j", r#"{"zeta": 1, "alpha": 2}"#)]);

    fetcher.json("https://x.test/j", "j", None).unwrap();
    let on_disk = std::fs::read_to_string(dir.path().join("j")).unwrap();
    let alpha = on_disk.find("alpha").unwrap();
    let zeta = on_disk.find("zeta").unwrap();
    assert!(alpha < zeta);
    assert!(on_disk.contains('\n'));
  }

  #[test]
  fn malformed_json_surfaces_as_error() {
    let (fetcher, _log, _dir) = fetcher_with(&[("https://x.test/bad", "not json")]);
    let err = fetcher.json("https://x.test/bad", "bad", None).unwrap_err();
    assert!(matches!(err, Error::Json(_)));
  }

  #[test]
  fn missing_response_surfaces_transport_error() {
    let (fetcher, _log, _dir) = fetcher_with(&[]);
    assert!(fetcher.json("https://x.test/nope", "nope", None).is_err());
  }
}
