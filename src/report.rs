// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Drive the revision loop and assemble output documents (per-revision or batch); route errors per scope
// role: reporting/orchestrator
// inputs: AggregationContext (config, fetcher, bug memo table)
// outputs: Pretty-printed, key-sorted JSON on stdout; diagnostics on stderr
// side_effects: Prints; reads the process interrupt flag set by the Ctrl-C handler
// invariants:
// - stdout carries JSON only; every diagnostic goes to stderr
// - Item-scoped errors skip one revision; upstream errors abort the run in single mode
// - An interrupt stops further revisions but the accumulated batch document is still emitted
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;

use crate::bug::LoadedBug;
use crate::commit::{self, AggregationContext, LoadedCommit};
use crate::error;
use crate::model::BatchReport;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Install the Ctrl-C handler. The revision loop polls the flag between
/// revisions so an interrupt still emits whatever has been accumulated.
pub fn install_interrupt_flag() {
  if let Err(err) = ctrlc::set_handler(|| INTERRUPTED.store(true, Ordering::SeqCst)) {
    eprintln!("warning: failed to install Ctrl+C handler: {}", err);
  }
}

fn interrupt_requested() -> bool {
  INTERRUPTED.load(Ordering::SeqCst)
}

/// Process every requested revision in argument order and print the results.
pub fn run(ctx: &AggregationContext) -> Result<()> {
  let mut commits: BTreeMap<String, crate::model::Commit> = BTreeMap::new();

  for rev in &ctx.cfg.revisions {
    if interrupt_requested() {
      eprintln!("interrupted; emitting partial output");
      break;
    }

    match commit::load_commit(ctx, rev) {
      Ok(loaded) => {
        if ctx.cfg.batch {
          commits.insert(loaded.commit.node.clone(), loaded.commit);
        } else {
          let bug = ctx.bug(loaded.commit.bug_id)?;
          print_document(&single_document(&loaded, &bug)?)?;
        }
      }
      Err(e) if e.is_item_scoped() => eprintln!("{}: {}", rev, e),
      Err(e) => {
        if ctx.cfg.batch && !ctx.cfg.fail_fast {
          eprintln!("{}: {}", rev, e);
        } else {
          return Err(e.into());
        }
      }
    }
  }

  if ctx.cfg.batch {
    let bugs = ctx
      .loaded_bugs()
      .into_iter()
      .map(|(id, loaded)| (id.to_string(), loaded.bug.clone()))
      .collect();
    let report = BatchReport { commits, bugs };
    print_document(&serde_json::to_value(&report)?)?;
  }

  Ok(())
}

/// Single-revision document: the commit with its bug's fields inlined and the
/// two observation lists normalized together. The bug's own id/url are left
/// out (the commit carries them as bug_id/bug_url); its creation timestamp is
/// renamed to keep the flat namespace unambiguous.
pub fn single_document(
  commit: &LoadedCommit,
  bug: &LoadedBug,
) -> error::Result<serde_json::Value> {
  let mut doc = as_object(serde_json::to_value(&commit.commit)?);
  let bug_fields = as_object(serde_json::to_value(&bug.bug)?);

  for (key, value) in bug_fields {
    match key.as_str() {
      "id" | "url" | "people" => {}
      "created_timestamp" => {
        doc.insert("bug_created_timestamp".to_string(), value);
      }
      _ => {
        doc.insert(key, value);
      }
    }
  }

  let mut merged = commit.roster.clone();
  merged.absorb(&bug.roster);
  doc.insert("people".to_string(), serde_json::to_value(merged.normalized())?);

  Ok(serde_json::Value::Object(doc))
}

fn as_object(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
  match value {
    serde_json::Value::Object(map) => map,
    _ => serde_json::Map::new(),
  }
}

// serde_json's Map keeps keys sorted, so pretty-printing a Value gives the
// stable key-sorted layout downstream diffing relies on.
fn print_document(value: &serde_json::Value) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}
