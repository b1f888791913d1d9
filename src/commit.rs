use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::bug::{self, LoadedBug};
use crate::bugid;
use crate::cli::EffectiveConfig;
use crate::error::{Error, Result};
use crate::ext::serde_json::JsonFetch;
use crate::fetch::Fetcher;
use crate::landed;
use crate::model::{Backout, Commit};
use crate::people::Roster;
use crate::util::{first_line, iso_utc, mailbox_email, short_node};

/// Per-run aggregation state: configuration, the cache-backed fetcher, and
/// the bug memo table shared by every requested revision. Owning the tables
/// here keeps the pipeline free of ambient globals.
pub struct AggregationContext<'a> {
  pub cfg: &'a EffectiveConfig,
  pub fetcher: Fetcher,
  bugs: RefCell<HashMap<u64, Rc<LoadedBug>>>,
}

impl<'a> AggregationContext<'a> {
  pub fn new(cfg: &'a EffectiveConfig, fetcher: Fetcher) -> Self {
    Self {
      cfg,
      fetcher,
      bugs: RefCell::new(HashMap::new()),
    }
  }

  /// Load a bug, at most once per run. Later commits referencing the same
  /// ticket share the first load's record and observation list.
  pub fn bug(&self, bug_id: u64) -> Result<Rc<LoadedBug>> {
    if let Some(loaded) = self.bugs.borrow().get(&bug_id) {
      return Ok(Rc::clone(loaded));
    }

    let loaded = Rc::new(bug::load_bug(self, bug_id)?);
    self.bugs.borrow_mut().insert(bug_id, Rc::clone(&loaded));

    Ok(loaded)
  }

  /// Every bug completed so far, ordered by id. Used for batch output,
  /// including the partial document emitted after an interrupt.
  pub fn loaded_bugs(&self) -> Vec<(u64, Rc<LoadedBug>)> {
    let mut all: Vec<(u64, Rc<LoadedBug>)> = self
      .bugs
      .borrow()
      .iter()
      .map(|(id, loaded)| (*id, Rc::clone(loaded)))
      .collect();
    all.sort_by_key(|(id, _)| *id);
    all
  }
}

/// A finished Commit plus its raw people observations, kept so single-mode
/// output can merge them with the bug's.
#[derive(Debug)]
pub struct LoadedCommit {
  pub commit: Commit,
  pub roster: Roster,
}

/// Aggregate one revision: fetch it (and its backout, if any), measure the
/// raw patch, resolve the referenced bug, and infer the landed attachment.
pub fn load_commit(ctx: &AggregationContext, rev: &str) -> Result<LoadedCommit> {
  let hg = &ctx.cfg.hg_url;

  let rev_doc = ctx
    .fetcher
    .json(&format!("{}/json-rev/{}", hg, rev), &format!("{}-hg", rev), None)?;

  let node = rev_doc.fetch("node").to::<String>().ok_or_else(|| Error::Malformed {
    source_name: "revision record".into(),
    field: "node".into(),
  })?;
  let summary = first_line(&rev_doc.fetch("desc").to_or_default::<String>());
  let author = mailbox_email(&rev_doc.fetch("user").to_or_default::<String>());
  let pusher = rev_doc.fetch("pushuser").to_or_default::<String>();
  let push_epoch = rev_doc.fetch("pushdate.0").to::<i64>().ok_or_else(|| Error::Malformed {
    source_name: "revision record".into(),
    field: "pushdate".into(),
  })?;

  let backout = load_backout(ctx, &rev_doc)?;

  let patch_text = ctx
    .fetcher
    .text(&format!("{}/raw-rev/{}", hg, rev), &format!("{}-patch", rev))?;

  let ids = bugid::parse_bug_ids(&summary);
  let bug_id = match ids.len() {
    0 => return Err(Error::NoBugId { summary }),
    1 => ids.into_iter().next().unwrap_or_default(),
    _ => {
      return Err(Error::AmbiguousBugId {
        summary,
        ids: ids.into_iter().collect(),
      })
    }
  };

  let loaded_bug = ctx.bug(bug_id)?;

  let landed_attachment_id =
    landed::infer_landed_patch(&summary, &loaded_bug.bug.patches).map(|p| p.id);
  if landed_attachment_id.is_none() {
    eprintln!("no landed patch inferred for {} (bug {})", short_node(&node), bug_id);
  }

  let mut roster = Roster::new();
  roster.note(author.clone(), "push author");
  roster.note(pusher.clone(), "push user");
  if let Some(b) = &backout {
    roster.note(b.user.clone(), "backout author");
  }

  let commit = Commit {
    hg_url: format!("{}/rev/{}", hg, short_node(&node)),
    node,
    summary,
    author,
    pusher,
    push_timestamp: iso_utc(push_epoch),
    patch_size: patch_text.len(),
    patch_lines_of_code: patch_text.lines().count(),
    bug_id,
    bug_url: format!("{}/{}", ctx.cfg.bugzilla_url, bug_id),
    backout,
    landed_attachment_id,
    people: roster.normalized(),
  };

  Ok(LoadedCommit { commit, roster })
}

/// Fetch the reverting revision named by a backout pointer, if any. The host
/// links backouts by full node; fetches use the 12-char short form.
fn load_backout(ctx: &AggregationContext, rev_doc: &serde_json::Value) -> Result<Option<Backout>> {
  let backedoutby = rev_doc.fetch("backedoutby").to_or_default::<String>();
  let backedoutby = backedoutby.trim();

  if backedoutby.is_empty() {
    return Ok(None);
  }

  let short = short_node(backedoutby);
  let doc = ctx.fetcher.json(
    &format!("{}/json-rev/{}", ctx.cfg.hg_url, short),
    &format!("{}-hg", short),
    None,
  )?;

  let epoch = doc.fetch("pushdate.0").to::<i64>().unwrap_or(0);

  Ok(Some(Backout {
    summary: first_line(&doc.fetch("desc").to_or_default::<String>()),
    user: mailbox_email(&doc.fetch("user").to_or_default::<String>()),
    timestamp: iso_utc(epoch),
  }))
}
