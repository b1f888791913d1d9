use thiserror::Error;

/// Result type alias for the aggregation pipeline.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
  /// A commit summary named no bug at all.
  #[error("failed to find bug-id in: {summary}")]
  NoBugId { summary: String },

  /// A commit summary named more than one bug.
  #[error("found multiple bug-ids in: {summary}")]
  AmbiguousBugId { summary: String, ids: Vec<u64> },

  /// Bug history referenced an attachment id absent from the attachment list.
  #[error("bug {bug_id} history references unknown attachment {attachment_id}")]
  UnknownAttachment { bug_id: u64, attachment_id: u64 },

  /// A review-tool attachment payload did not decode to a usable revision URL.
  #[error("invalid revision URL {url:?}")]
  BadRevisionUrl { url: String },

  /// An upstream payload was missing a field we cannot proceed without.
  #[error("malformed response from {source_name}: missing {field}")]
  Malformed { source_name: String, field: String },

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("http error: {0}")]
  Http(#[from] Box<ureq::Error>),
}

impl Error {
  /// Errors that spoil only the revision or bug being aggregated.
  ///
  /// Everything else (io, http, malformed upstream payloads) is an upstream
  /// failure: fatal for the run in single mode, fatal for the current
  /// revision in batch mode unless --fail-fast promotes it.
  pub fn is_item_scoped(&self) -> bool {
    matches!(
      self,
      Error::NoBugId { .. }
        | Error::AmbiguousBugId { .. }
        | Error::UnknownAttachment { .. }
        | Error::BadRevisionUrl { .. }
    )
  }
}
