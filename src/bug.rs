// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Aggregate one tracker bug: metadata, attachment/patch lifecycle, flag and triage history, people roles
// role: aggregation/bug
// inputs: AggregationContext (fetcher, config), numeric bug id
// outputs: LoadedBug carrying the finished Bug record plus its raw people observations
// side_effects: Cache-backed fetches of bug metadata, history, attachments, and review-tool payloads
// invariants:
// - A patch only carries events from history changes naming its own attachment id
// - History is applied in upstream order, change-group by change-group
// - People maps are normalized once, after the full walk
// errors: Unknown attachment ids are fatal for this bug; fetch/parse errors propagate untouched
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use base64::Engine as _;

use crate::commit::AggregationContext;
use crate::error::{Error, Result};
use crate::ext::serde_json::JsonFetch;
use crate::model::{
  AssignmentEvent, Bug, FlagEvent, FlagKind, FlagState, FlagStatus, Patch, PatchEvent,
  PatchEventStatus, Revision, StatusEvent, TriageEvent,
};
use crate::people::Roster;
use crate::phabricator;

// Attachment content types the tracker uses for review-system submissions.
const REVIEW_BOARD_CONTENT_TYPE: &str = "text/x-review-board-request";
const GITHUB_CONTENT_TYPE: &str = "text/x-github-request";
const PHABRICATOR_CONTENT_TYPE: &str = "text/x-phabricator-request";

// Per-release status flags look like cf_status_firefox66; any non-empty value
// set on one of them counts as a triage action.
const STATUS_FLAG_PREFIX: &str = "cf_status_firefox";
const EMPTY_FLAG_MARKER: &str = "---";
const UNTRIAGED_COMPONENT: &str = "Untriaged";
const OBSOLETE_MARKER: &str = "1";

/// A finished Bug plus the raw observation list it was normalized from, so
/// single-revision output can merge bug and commit observations.
#[derive(Debug, Clone)]
pub struct LoadedBug {
  pub bug: Bug,
  pub roster: Roster,
}

/// Aggregate one bug. Callers go through `AggregationContext::bug`, which
/// memoizes the result per bug id for the rest of the run.
pub fn load_bug(ctx: &AggregationContext, bug_id: u64) -> Result<LoadedBug> {
  let bz = &ctx.cfg.bugzilla_url;

  let meta_doc = ctx
    .fetcher
    .json(&format!("{}/rest/bug/{}", bz, bug_id), &format!("bug-{}", bug_id), None)?;
  let meta = meta_doc.fetch("bugs.0").to::<serde_json::Value>().ok_or_else(|| Error::Malformed {
    source_name: "bug metadata".into(),
    field: "bugs.0".into(),
  })?;

  let history_doc = ctx.fetcher.json(
    &format!("{}/rest/bug/{}/history", bz, bug_id),
    &format!("bug-{}-history", bug_id),
    None,
  )?;

  let attachments_doc = ctx.fetcher.json(
    &format!("{}/rest/bug/{}/attachment?exclude_fields=data", bz, bug_id),
    &format!("bug-{}-attachments", bug_id),
    None,
  )?;

  let mut roster = Roster::new();

  let reporter = meta.fetch("creator").to_or_default::<String>();
  roster.note(reporter.clone(), "reporter");

  let mut patches = build_patches(ctx, bug_id, &attachments_doc, &mut roster)?;

  let mut assigned_to: Vec<AssignmentEvent> = Vec::new();
  let mut status_events: Vec<StatusEvent> = Vec::new();
  let mut flags: Vec<FlagEvent> = Vec::new();
  let mut triaged: Vec<TriageEvent> = Vec::new();

  for group in history_doc.fetch("bugs.0.history").iter_array() {
    let who = group.fetch("who").to_or_default::<String>();
    let when = group.fetch("when").to_or_default::<String>();

    for change in group.fetch("changes").iter_array() {
      let field = change.fetch("field_name").to_or_default::<String>();
      let added = change.fetch("added").to_or_default::<String>();
      let removed = change.fetch("removed").to_or_default::<String>();

      match field.as_str() {
        "assigned_to" => {
          assigned_to.push(AssignmentEvent { user: added.clone(), timestamp: when.clone() });
          roster.note(added.clone(), "assigned bug");
        }

        "flagtypes.name" => {
          apply_attachment_flag(bug_id, &mut patches, &mut roster, change, FlagKind::Review, &who, &when)?;
          apply_attachment_flag(bug_id, &mut patches, &mut roster, change, FlagKind::Feedback, &who, &when)?;
          apply_bug_flag(&mut flags, &mut roster, change, FlagKind::Needinfo, &who, &when);
        }

        "attachments.isobsolete" => {
          let patch = find_patch(bug_id, &mut patches, change)?;
          let status = if added == OBSOLETE_MARKER {
            PatchEventStatus::Obsoleted
          } else {
            PatchEventStatus::Unobsoleted
          };
          patch.status.push(PatchEvent {
            status,
            requestee: None,
            actor: None,
            timestamp: when.clone(),
          });
          roster.note(who.clone(), "obsoleted attachment");
        }

        "status" => {
          status_events.push(StatusEvent {
            status: added.clone(),
            user: who.clone(),
            timestamp: when.clone(),
          });
          roster.note(who.clone(), "bug status");
        }

        "component" if removed == UNTRIAGED_COMPONENT => {
          triaged.push(TriageEvent {
            user: who.clone(),
            action: format!("component -> {}", added),
            timestamp: when.clone(),
          });
          roster.note(who.clone(), "triaged");
        }

        f if f.starts_with(STATUS_FLAG_PREFIX) && added != EMPTY_FLAG_MARKER => {
          triaged.push(TriageEvent {
            user: who.clone(),
            action: format!("{}: {}", field, added),
            timestamp: when.clone(),
          });
          roster.note(who.clone(), "triaged");
        }

        _ => {}
      }
    }
  }

  let bug = Bug {
    id: bug_id,
    url: format!("{}/{}", bz, bug_id),
    reporter,
    product: meta.fetch("product").to_or_default(),
    component: meta.fetch("component").to_or_default(),
    comment_count: meta.fetch("comment_count").to_or_default(),
    created_timestamp: meta.fetch("creation_time").to_or_default(),
    patches,
    assigned_to,
    status: status_events,
    flags,
    triaged,
    people: roster.normalized(),
  };

  Ok(LoadedBug { bug, roster })
}

/// Filter the attachment list down to patches and build their records.
/// Review-tool attachments get their revision resolved through the search API.
fn build_patches(
  ctx: &AggregationContext,
  bug_id: u64,
  attachments_doc: &serde_json::Value,
  roster: &mut Roster,
) -> Result<Vec<Patch>> {
  let mut patches = Vec::new();

  for att in attachments_doc.fetch(&format!("bugs.{}", bug_id)).iter_array() {
    if !is_patch(att) {
      continue;
    }

    let id = att.fetch("id").to::<u64>().ok_or_else(|| Error::Malformed {
      source_name: "attachment list".into(),
      field: "id".into(),
    })?;
    let content_type = att.fetch("content_type").to_or_default::<String>();
    let creator = att.fetch("creator").to_or_default::<String>();

    let revision = if content_type == PHABRICATOR_CONTENT_TYPE {
      Some(resolve_attachment_revision(ctx, id)?)
    } else {
      None
    };

    roster.note(creator.clone(), "patch author");
    patches.push(Patch {
      id,
      content_type,
      user: creator,
      timestamp: att.fetch("creation_time").to_or_default(),
      summary: att.fetch("summary").to_or_default(),
      status: Vec::new(),
      revision,
    });
  }

  Ok(patches)
}

fn is_patch(attachment: &serde_json::Value) -> bool {
  if attachment.fetch("is_patch").to::<i64>() == Some(1) {
    return true;
  }
  let content_type = attachment.fetch("content_type").to_or_default::<String>();
  content_type == REVIEW_BOARD_CONTENT_TYPE
    || content_type == GITHUB_CONTENT_TYPE
    || content_type == PHABRICATOR_CONTENT_TYPE
}

/// The attachment's opaque payload is the base64-encoded review revision URL.
fn resolve_attachment_revision(ctx: &AggregationContext, attachment_id: u64) -> Result<Revision> {
  let doc = ctx.fetcher.json(
    &format!("{}/rest/bug/attachment/{}?include_fields=data", ctx.cfg.bugzilla_url, attachment_id),
    &format!("attachment-{}-data", attachment_id),
    None,
  )?;

  let data = doc
    .fetch(&format!("attachments.{}.data", attachment_id))
    .to::<String>()
    .ok_or_else(|| Error::Malformed {
      source_name: "attachment payload".into(),
      field: "data".into(),
    })?;

  let bytes = base64::engine::general_purpose::STANDARD
    .decode(data.trim())
    .map_err(|_| Error::Malformed {
      source_name: "attachment payload".into(),
      field: "data (base64)".into(),
    })?;
  let url = String::from_utf8(bytes).map_err(|_| Error::Malformed {
    source_name: "attachment payload".into(),
    field: "data (utf-8)".into(),
  })?;

  phabricator::resolve(&ctx.fetcher, &ctx.cfg.phab_token, url.trim())
}

fn find_patch<'a>(
  bug_id: u64,
  patches: &'a mut [Patch],
  change: &serde_json::Value,
) -> Result<&'a mut Patch> {
  let attachment_id = change.fetch("attachment_id").to::<u64>().ok_or_else(|| Error::Malformed {
    source_name: "bug history".into(),
    field: "attachment_id".into(),
  })?;

  patches
    .iter_mut()
    .find(|p| p.id == attachment_id)
    .ok_or(Error::UnknownAttachment { bug_id, attachment_id })
}

/// `<kind>?(<requestee>)` → the requestee, anything else → None.
fn request_target(token: &str, kind: FlagKind) -> Option<String> {
  token
    .strip_prefix(kind.as_str())?
    .strip_prefix("?(")?
    .strip_suffix(')')
    .map(str::to_string)
}

/// Exactly `<kind>+` or `<kind>-`.
fn grant_or_deny(token: &str, kind: FlagKind) -> Option<FlagState> {
  match token.strip_prefix(kind.as_str())? {
    "+" => Some(FlagState::Granted),
    "-" => Some(FlagState::Denied),
    _ => None,
  }
}

/// Apply one flag type's additions from a history change to the named patch.
/// Tokens of other flag types are left for their own invocation.
fn apply_attachment_flag(
  bug_id: u64,
  patches: &mut [Patch],
  roster: &mut Roster,
  change: &serde_json::Value,
  kind: FlagKind,
  who: &str,
  when: &str,
) -> Result<()> {
  let added = change.fetch("added").to_or_default::<String>();

  for token in added.split(',') {
    let token = token.trim();

    if let Some(requestee) = request_target(token, kind) {
      let patch = find_patch(bug_id, patches, change)?;
      patch.status.push(PatchEvent {
        status: PatchEventStatus::Flag(FlagStatus::new(kind, FlagState::Requested)),
        requestee: Some(requestee.clone()),
        actor: None,
        timestamp: when.to_string(),
      });
      roster.note(who, format!("{} requester", kind.as_str()));
      roster.note(requestee, format!("{} requestee", kind.as_str()));
    } else if let Some(state) = grant_or_deny(token, kind) {
      let patch = find_patch(bug_id, patches, change)?;
      patch.status.push(PatchEvent {
        status: PatchEventStatus::Flag(FlagStatus::new(kind, state)),
        requestee: Some(who.to_string()),
        actor: None,
        timestamp: when.to_string(),
      });
      roster.note(who, format!("{} requestee", kind.as_str()));
    }
  }

  Ok(())
}

/// Bug-scope variant: appends to the bug's own flag list, and additionally
/// reads the removed side for withdrawals. A withdrawal performed by someone
/// other than the requestee keeps that acting user on the event.
fn apply_bug_flag(
  flags: &mut Vec<FlagEvent>,
  roster: &mut Roster,
  change: &serde_json::Value,
  kind: FlagKind,
  who: &str,
  when: &str,
) {
  let added = change.fetch("added").to_or_default::<String>();

  for token in added.split(',') {
    let token = token.trim();

    if let Some(requestee) = request_target(token, kind) {
      flags.push(FlagEvent {
        status: FlagStatus::new(kind, FlagState::Requested),
        requestee: requestee.clone(),
        actor: None,
        timestamp: when.to_string(),
      });
      roster.note(who, format!("{} requester", kind.as_str()));
      roster.note(requestee, format!("{} requestee", kind.as_str()));
    } else if let Some(state) = grant_or_deny(token, kind) {
      flags.push(FlagEvent {
        status: FlagStatus::new(kind, state),
        requestee: who.to_string(),
        actor: None,
        timestamp: when.to_string(),
      });
      roster.note(who, format!("{} requestee", kind.as_str()));
    }
  }

  let removed = change.fetch("removed").to_or_default::<String>();

  for token in removed.split(',') {
    let token = token.trim();

    if let Some(requestee) = request_target(token, kind) {
      let actor = if who != requestee { Some(who.to_string()) } else { None };
      flags.push(FlagEvent {
        status: FlagStatus::new(kind, FlagState::Withdrawn),
        requestee,
        actor,
        timestamp: when.to_string(),
      });
      roster.note(who, format!("{} requestee", kind.as_str()));
    }
  }
}
