//! Mapping of Torbox status vocabulary onto workflow outcomes
//!
//! Torbox reports job state through loosely enumerated tokens and several of
//! them mean the same thing. The poll loop only ever looks at the
//! [`StatusClass`] returned by [`classify`], so new synonyms are added here
//! and nowhere else.

/// Tokens meaning "ready to download"
pub const READY_TOKENS: &[&str] = &["completed", "ready", "cached", "done"];

/// Tokens meaning "the job will never complete"
pub const FAILED_TOKENS: &[&str] = &["error", "failed"];

/// Three-way classification of a status check
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusClass {
    /// Terminal success: the file can be requested
    Ready,
    /// Terminal failure reported by the service
    Failed,
    /// Keep polling
    Pending,
}

/// Classify a status token together with the reported progress fraction
///
/// A progress of 1 or more counts as ready even when the token itself is
/// not a known completion token.
pub fn classify(token: Option<&str>, progress: f64) -> StatusClass {
    let token = token.map(|t| t.trim().to_ascii_lowercase());
    let is_one_of = |set: &[&str]| token.as_deref().is_some_and(|t| set.contains(&t));

    if is_one_of(READY_TOKENS) || progress >= 1.0 {
        StatusClass::Ready
    } else if is_one_of(FAILED_TOKENS) {
        StatusClass::Failed
    } else {
        StatusClass::Pending
    }
}
