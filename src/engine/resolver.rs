//! Per-campaign resolution.
//!
//! Orchestrates the guard, the targeting evaluator, and the allocator
//! across a whole payload and assembles the decision list. Failures never
//! cross campaign boundaries: a broken group or predicate costs at most its
//! own campaign a decision.

use crate::model::{BucketingPayload, Campaign, Decision, DecisionVariation, VisitorContext};
use crate::observability::{Event, EventSink};

use super::{allocator, safe_mode, targeting};

/// Resolves every campaign of `payload` for one visitor.
///
/// Pure with respect to shared state: the output depends only on the three
/// arguments and the fixed hash seed, so concurrent calls over different
/// visitors or snapshots need no locking.
///
/// Order of operations per the engine contract:
/// 1. panic flag short-circuits to an empty list before any evaluation;
/// 2. campaigns are visited in declaration order; a campaign matches if any
///    of its variation groups' targeting matches, and only the first
///    matching group is allocated — at most one decision per campaign;
/// 3. allocation failures skip the campaign but never the pass;
/// 4. an info-level summary event closes the pass.
#[must_use]
pub fn resolve(
    payload: &BucketingPayload,
    visitor_id: &str,
    context: &VisitorContext,
    sink: &dyn EventSink,
) -> Vec<Decision> {
    if safe_mode::panic_active(payload, sink) {
        return Vec::new();
    }

    let mut decisions = Vec::new();
    let mut matched_campaigns = 0_usize;

    for campaign in &payload.campaigns {
        match resolve_campaign(campaign, visitor_id, context, sink) {
            CampaignOutcome::Decided(decision) => {
                matched_campaigns += 1;
                decisions.push(decision);
            }
            CampaignOutcome::MatchedButUnallocatable => matched_campaigns += 1,
            CampaignOutcome::NoMatch => {}
        }
    }

    sink.emit(Event::ResolutionCompleted {
        visitor_id: visitor_id.to_owned(),
        matched_campaigns,
        decisions: decisions.len(),
    });

    decisions
}

enum CampaignOutcome {
    Decided(Decision),
    MatchedButUnallocatable,
    NoMatch,
}

fn resolve_campaign(
    campaign: &Campaign,
    visitor_id: &str,
    context: &VisitorContext,
    sink: &dyn EventSink,
) -> CampaignOutcome {
    // First matching group wins; remaining groups are not even evaluated.
    let matching_group = campaign
        .variation_groups
        .iter()
        .find(|group| targeting::matches(context, &group.targeting, sink));

    let Some(group) = matching_group else {
        sink.emit(Event::CampaignEvaluated {
            campaign_id: campaign.id.clone(),
            matched: false,
        });
        return CampaignOutcome::NoMatch;
    };

    sink.emit(Event::CampaignEvaluated {
        campaign_id: campaign.id.clone(),
        matched: true,
    });

    match allocator::allocate(visitor_id, group, sink) {
        Ok(variation) => CampaignOutcome::Decided(Decision {
            id: campaign.id.clone(),
            variation_group_id: group.id.clone(),
            variation: DecisionVariation::from_variation(variation),
        }),
        Err(error) => {
            sink.emit(Event::from_allocation_error(&error));
            CampaignOutcome::MatchedButUnallocatable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Campaign, ContextValue, Modifications, Operator, Targeting, TargetingGroup,
        TargetingGroupSet, Variation, VariationGroup,
    };
    use crate::observability::MemorySink;

    fn all_users_group(id: &str, variations: Vec<Variation>) -> VariationGroup {
        VariationGroup {
            id: id.to_owned(),
            targeting: TargetingGroupSet {
                targeting_groups: vec![TargetingGroup {
                    targetings: vec![Targeting {
                        key: crate::model::ALL_USERS_KEY.to_owned(),
                        operator: Operator::Equals.into(),
                        value: ContextValue::Bool(true),
                    }],
                }],
            },
            variations,
        }
    }

    fn full_variation(id: &str) -> Variation {
        Variation {
            id: id.to_owned(),
            allocation: 100,
            modifications: Modifications::default(),
        }
    }

    #[test]
    fn panic_short_circuits_before_any_evaluation() {
        let payload = BucketingPayload {
            panic: true,
            campaigns: vec![Campaign {
                id: "c1".to_owned(),
                variation_groups: vec![all_users_group("vg1", vec![full_variation("v1")])],
            }],
        };
        let sink = MemorySink::new();
        let decisions = resolve(&payload, "visitor_1", &VisitorContext::new(), &sink);

        assert!(decisions.is_empty());
        // Only the safe-mode notice — no targeting, allocation, or summary
        // events.
        assert_eq!(sink.events(), vec![Event::PanicModeActive]);
    }

    #[test]
    fn single_campaign_resolves_to_one_decision() {
        let payload = BucketingPayload {
            panic: false,
            campaigns: vec![Campaign {
                id: "c1".to_owned(),
                variation_groups: vec![all_users_group("vg1", vec![full_variation("v1")])],
            }],
        };
        let sink = MemorySink::new();
        let decisions = resolve(&payload, "visitor_1", &VisitorContext::new(), &sink);

        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].id, "c1");
        assert_eq!(decisions[0].variation_group_id, "vg1");
        assert_eq!(decisions[0].variation.id, "v1");

        let summary = sink.events().into_iter().last().unwrap();
        assert_eq!(
            summary,
            Event::ResolutionCompleted {
                visitor_id: "visitor_1".to_owned(),
                matched_campaigns: 1,
                decisions: 1,
            }
        );
    }

    #[test]
    fn broken_group_skips_campaign_but_not_pass() {
        let broken = Variation {
            id: "v_broken".to_owned(),
            allocation: 110,
            modifications: Modifications::default(),
        };
        let payload = BucketingPayload {
            panic: false,
            campaigns: vec![
                Campaign {
                    id: "c_broken".to_owned(),
                    variation_groups: vec![all_users_group("vg_broken", vec![broken])],
                },
                Campaign {
                    id: "c_ok".to_owned(),
                    variation_groups: vec![all_users_group("vg_ok", vec![full_variation("v1")])],
                },
            ],
        };
        let sink = MemorySink::new();
        let decisions = resolve(&payload, "visitor_1", &VisitorContext::new(), &sink);

        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].id, "c_ok");

        let fatal: Vec<_> = sink.filtered(|e| matches!(e, Event::AllocationFailed { .. }));
        assert_eq!(fatal.len(), 1);

        // The broken campaign still counts as matched in the summary.
        let summary = sink.events().into_iter().last().unwrap();
        assert_eq!(
            summary,
            Event::ResolutionCompleted {
                visitor_id: "visitor_1".to_owned(),
                matched_campaigns: 2,
                decisions: 1,
            }
        );
    }

    #[test]
    fn first_matching_group_wins() {
        // Both groups match every visitor; only the first may be allocated.
        let payload = BucketingPayload {
            panic: false,
            campaigns: vec![Campaign {
                id: "c1".to_owned(),
                variation_groups: vec![
                    all_users_group("vg_first", vec![full_variation("v_first")]),
                    all_users_group("vg_second", vec![full_variation("v_second")]),
                ],
            }],
        };
        let sink = MemorySink::new();
        let decisions = resolve(&payload, "visitor_1", &VisitorContext::new(), &sink);

        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].variation_group_id, "vg_first");

        // Exactly one hash computed — the second group was never allocated.
        let hashes = sink.filtered(|e| matches!(e, Event::HashComputed { .. }));
        assert_eq!(hashes.len(), 1);
    }

    #[test]
    fn decisions_preserve_campaign_declaration_order() {
        let campaigns: Vec<Campaign> = (0..5)
            .map(|i| Campaign {
                id: format!("c{i}"),
                variation_groups: vec![all_users_group(
                    &format!("vg{i}"),
                    vec![full_variation(&format!("v{i}"))],
                )],
            })
            .collect();
        let payload = BucketingPayload {
            panic: false,
            campaigns,
        };
        let decisions = resolve(
            &payload,
            "visitor_1",
            &VisitorContext::new(),
            &MemorySink::new(),
        );
        let ids: Vec<&str> = decisions.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["c0", "c1", "c2", "c3", "c4"]);
    }

    #[test]
    fn empty_payload_resolves_to_empty_with_summary() {
        let sink = MemorySink::new();
        let decisions = resolve(
            &BucketingPayload::default(),
            "visitor_1",
            &VisitorContext::new(),
            &sink,
        );
        assert!(decisions.is_empty());
        assert_eq!(
            sink.events(),
            vec![Event::ResolutionCompleted {
                visitor_id: "visitor_1".to_owned(),
                matched_campaigns: 0,
                decisions: 0,
            }]
        );
    }
}
