//! Property tests for subtask reshaping, routing normalization and judge parsing.

use maestro::domain::models::{prepare_subtasks, RawRouting, RefinementNeeded};
use maestro::services::parse_judge_response;
use maestro::services::stages::normalize_decision;
use maestro::ExecutionMode;
use proptest::prelude::*;

fn worker_pool() -> impl Strategy<Value = Vec<String>> {
    prop::sample::subsequence(
        vec![
            "Researcher".to_string(),
            "Analyst".to_string(),
            "Writer".to_string(),
            "Critic".to_string(),
        ],
        1..=4,
    )
}

fn raw_routing() -> impl Strategy<Value = RawRouting> {
    (
        prop::collection::vec(
            prop_oneof![
                Just("Researcher".to_string()),
                Just("writer".to_string()),
                Just("Ghost".to_string()),
                "[a-z]{0,6}",
            ],
            0..5,
        ),
        prop::option::of(prop_oneof![
            Just("delegated".to_string()),
            Just("sequential".to_string()),
            Just("parallel".to_string()),
            "[a-z]{0,8}",
        ]),
        prop::collection::vec("[a-z ]{0,12}", 0..6),
        prop::option::of(-2.0f64..3.0),
    )
        .prop_map(|(assigned_to, mode, subtasks, confidence)| RawRouting {
            assigned_to,
            mode,
            subtasks,
            confidence,
            ..Default::default()
        })
}

proptest! {
    /// Property: one subtask per assignee, blanks replaced by the task text
    #[test]
    fn prop_prepare_subtasks_matches_assignees(
        assignees in 0usize..8,
        subtasks in prop::collection::vec("[a-z ]{0,10}", 0..10),
    ) {
        let prepared = prepare_subtasks(assignees, &subtasks, "whole task");

        prop_assert_eq!(prepared.len(), assignees);
        for (i, subtask) in prepared.iter().enumerate() {
            prop_assert!(!subtask.trim().is_empty());
            match subtasks.get(i) {
                Some(original) if !original.trim().is_empty() => {
                    prop_assert_eq!(subtask, original);
                }
                _ => {
                    prop_assert_eq!(subtask.as_str(), "whole task");
                }
            }
        }
    }

    /// Property: normalized decisions are never empty, only name available
    /// workers and delegate to exactly one of them
    #[test]
    fn prop_normalized_routing_is_well_formed(
        raw in raw_routing(),
        available in worker_pool(),
    ) {
        let (decision, _notes) =
            normalize_decision(raw, "research the market", &available, "Researcher").unwrap();

        prop_assert!(!decision.assigned_to.is_empty());
        prop_assert_eq!(decision.subtasks.len(), decision.assigned_to.len());
        for worker in &decision.assigned_to {
            prop_assert!(available.contains(worker), "unknown worker {}", worker);
        }
        if decision.mode == ExecutionMode::Delegated {
            prop_assert_eq!(decision.assigned_to.len(), 1);
            prop_assert_eq!(decision.subtasks[0].as_str(), "research the market");
        }
        if let Some(confidence) = decision.confidence {
            prop_assert!((0.0..=1.0).contains(&confidence));
        }
    }

    /// Property: parsed judge scores stay in range and low scores always need refinement
    #[test]
    fn prop_judge_scores_are_clamped(
        score in -50.0f64..50.0,
        needed in prop_oneof![Just("yes"), Just("no"), Just("maybe")],
    ) {
        let response = format!("Score: {score}\nRefinement Needed: {needed}");
        let evaluation = parse_judge_response(1, &response, 8.0);

        prop_assert!((0.0..=10.0).contains(&evaluation.score));
        if evaluation.score < 8.0 {
            prop_assert_eq!(evaluation.refinement_needed, RefinementNeeded::Yes);
        }
    }
}
