//! Eligibility ranking and input normalisation
//!
//! The store answers "who matches"; this module decides the order and
//! cleans the codes callers send in.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use shared::EligibleProvider;

use crate::error::{EngineError, EngineResult};

/// Sort by status rank descending, then company name ascending
pub fn rank_providers(mut providers: Vec<EligibleProvider>) -> Vec<EligibleProvider> {
    providers.sort_by(compare_standing);
    // A provider joined through several matching rows shows up once
    providers.dedup_by(|a, b| a.id == b.id);
    providers
}

fn compare_standing(a: &EligibleProvider, b: &EligibleProvider) -> Ordering {
    b.status
        .rank()
        .cmp(&a.status.rank())
        .then_with(|| a.company_name.cmp(&b.company_name))
        .then_with(|| a.id.cmp(&b.id))
}

/// Trim a required code, rejecting blanks
pub fn require_code(field: &str, value: Option<&str>) -> EngineResult<String> {
    let trimmed = value.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return Err(EngineError::validation(field, format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Trim and de-duplicate a list of codes; at least one must remain
pub fn normalize_codes(field: &str, values: &[String]) -> EngineResult<BTreeSet<String>> {
    let codes: BTreeSet<String> = values
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect();

    if codes.is_empty() {
        return Err(EngineError::validation(
            field,
            format!("{field} must contain at least one non-empty code"),
        ));
    }
    Ok(codes)
}
