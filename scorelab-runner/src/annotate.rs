//! Copy a validation outcome onto scored candidates.

use scorelab_core::domain::{round_to, Candidate};

use crate::walk_forward::ValidationSummary;

/// Annotated copies of `candidates`.
///
/// Every copy carries the summary's validation block. A positive penalty is
/// recorded on the candidate and subtracted from its score (one decimal);
/// ranks are left as they are.
pub fn attach_validation(candidates: &[Candidate], summary: &ValidationSummary) -> Vec<Candidate> {
    let annotation = summary.annotation();
    let penalty = summary.validation_penalty;
    candidates
        .iter()
        .map(|c| {
            let mut item = c.clone();
            item.validation = Some(annotation.clone());
            if penalty > 0.0 {
                item.validation_penalty = Some(round_to(penalty, 4));
                item.score = round_to(item.score - penalty, 1);
            }
            item
        })
        .collect()
}

/// Copies without validation fields, for caching an unannotated list.
///
/// Scores are not restored; strip the list the annotation was made from.
pub fn strip_validation(candidates: &[Candidate]) -> Vec<Candidate> {
    candidates
        .iter()
        .map(|c| {
            let mut item = c.clone();
            item.validation = None;
            item.validation_penalty = None;
            item
        })
        .collect()
}
