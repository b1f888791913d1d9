use anyhow::{Result, bail};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "commit-dossier",
    version,
    about = "Consolidate commit, bug, and review activity into one JSON record",
    long_about = None
)]
pub struct Cli {
  /// Version-control revision ids to consolidate
  pub revisions: Vec<String>,

  /// Base URL of the version-control host
  #[arg(long, default_value = "https://hg.mozilla.org/mozilla-central")]
  pub hg_url: String,

  /// Base URL of the issue tracker
  #[arg(long, default_value = "https://bugzilla.mozilla.org")]
  pub bugzilla_url: String,

  /// Directory holding cached upstream responses (created if missing)
  #[arg(long, default_value = "cache")]
  pub cache_dir: PathBuf,

  /// Emit a single {commits, bugs} document instead of one document per revision
  #[arg(long)]
  pub batch: bool,

  /// In batch mode, abort the whole run on the first upstream failure
  #[arg(long)]
  pub fail_fast: bool,

  /// Emit a troff man page to stdout (internal; for packaging)
  #[arg(long, hide = true)]
  pub gen_man: bool,
}

#[derive(Debug)]
pub struct EffectiveConfig {
  pub revisions: Vec<String>,
  pub hg_url: String,
  pub bugzilla_url: String,
  pub cache_dir: PathBuf,
  pub batch: bool,
  pub fail_fast: bool,
  pub phab_token: String,
}

/// Validate the CLI and fold in the review-system credential.
///
/// The credential is handed in by `main` rather than read here so tests can
/// exercise both paths without touching the process environment.
pub fn normalize(cli: Cli, phab_token: Option<String>) -> Result<EffectiveConfig> {
  if cli.revisions.is_empty() {
    bail!("syntax: commit-dossier <rev>[..] (provide at least one revision id)");
  }

  let phab_token = match phab_token {
    Some(t) if !t.trim().is_empty() => t,
    _ => bail!(
      "You must have the PHAB_API_TOKEN environment variable set to a valid review-system API token."
    ),
  };

  Ok(EffectiveConfig {
    revisions: cli.revisions,
    hg_url: cli.hg_url.trim_end_matches('/').to_string(),
    bugzilla_url: cli.bugzilla_url.trim_end_matches('/').to_string(),
    cache_dir: cli.cache_dir,
    batch: cli.batch,
    fail_fast: cli.fail_fast,
    phab_token,
  })
}
