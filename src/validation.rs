//! Payload sanity sweep.
//!
//! A non-aborting pass over a freshly parsed payload that collects ALL
//! issues instead of stopping at the first, so a misconfigured campaign is
//! visible at fetch time rather than as a silent no-decision at resolve
//! time. Purely advisory: resolve-time behavior (skip-and-report) is
//! unchanged whether or not this sweep ran.

use crate::model::{BucketingPayload, OperatorField};

/// A single issue found while sweeping a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// JSON path to the problematic field (e.g.
    /// `campaigns[1].variationGroups[0]`).
    pub path: String,
    /// Description of the issue.
    pub message: String,
    /// Severity level.
    pub severity: IssueSeverity,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            IssueSeverity::Error => "error",
            IssueSeverity::Warning => "warning",
        };
        write!(f, "{}: {} at {}", prefix, self.message, self.path)
    }
}

/// Severity of a validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueSeverity {
    /// The affected group or campaign will produce no decisions.
    Error,
    /// Suspicious but still resolvable.
    Warning,
}

/// Result of sweeping a payload.
#[derive(Debug, Default)]
pub struct ValidationReport {
    /// Issues in payload declaration order.
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Returns `true` if no issue at all was found.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Returns `true` if any error-severity issue was found.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.issues
            .iter()
            .any(|i| i.severity == IssueSeverity::Error)
    }
}

/// Sweeps `payload` and reports everything suspicious.
#[must_use]
pub fn validate(payload: &BucketingPayload) -> ValidationReport {
    let mut report = ValidationReport::default();

    for (ci, campaign) in payload.campaigns.iter().enumerate() {
        let campaign_path = format!("campaigns[{ci}]");
        if campaign.id.is_empty() {
            error(&mut report, &campaign_path, "campaign id is empty");
        }
        if campaign.variation_groups.is_empty() {
            warning(&mut report, &campaign_path, "campaign has no variation groups");
        }

        for (gi, group) in campaign.variation_groups.iter().enumerate() {
            let group_path = format!("{campaign_path}.variationGroups[{gi}]");
            if group.id.is_empty() {
                error(&mut report, &group_path, "variation group id is empty");
            }

            if group.variations.is_empty() {
                error(&mut report, &group_path, "variation group has no variations");
            } else {
                let sum: u64 = group.variations.iter().map(|v| u64::from(v.allocation)).sum();
                if sum != 100 {
                    error(
                        &mut report,
                        &group_path,
                        &format!("allocations sum to {sum}, expected exactly 100"),
                    );
                }
            }

            for (vi, variation) in group.variations.iter().enumerate() {
                let variation_path = format!("{group_path}.variations[{vi}]");
                if variation.id.is_empty() {
                    error(&mut report, &variation_path, "variation id is empty");
                }
                if variation.allocation > 100 {
                    error(
                        &mut report,
                        &variation_path,
                        &format!("allocation {} exceeds 100", variation.allocation),
                    );
                }
            }

            for (tgi, targeting_group) in group.targeting.targeting_groups.iter().enumerate() {
                for (ti, targeting) in targeting_group.targetings.iter().enumerate() {
                    if let OperatorField::Unknown(raw) = &targeting.operator {
                        warning(
                            &mut report,
                            &format!(
                                "{group_path}.targeting.targetingGroups[{tgi}].targetings[{ti}]"
                            ),
                            &format!("unrecognized operator '{raw}'"),
                        );
                    }
                }
            }
        }
    }

    report
}

fn error(report: &mut ValidationReport, path: &str, message: &str) {
    report.issues.push(ValidationIssue {
        path: path.to_owned(),
        message: message.to_owned(),
        severity: IssueSeverity::Error,
    });
}

fn warning(report: &mut ValidationReport, path: &str, message: &str) {
    report.issues.push(ValidationIssue {
        path: path.to_owned(),
        message: message.to_owned(),
        severity: IssueSeverity::Warning,
    });
}
