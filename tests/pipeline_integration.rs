//! End-to-end pipeline runs over the mock collaborators.

mod common;

use std::sync::Arc;
use std::time::Duration;

use maestro::adapters::{MockWorkerRuntime, ScriptedReasoningService, SqliteHistorySink};
use maestro::domain::models::{RawRouting, StagePayload};
use maestro::{
    DomainError, ExecutionMode, JudgeTerminal, Phase, PhaseStatus, StageEvent, Task,
};

use common::{driver, fast_config, judged_config, with_scripted_judge};

fn routed(assigned: &[&str], mode: &str, subtasks: &[&str]) -> RawRouting {
    RawRouting {
        assigned_to: assigned.iter().map(|s| (*s).to_string()).collect(),
        mode: Some(mode.into()),
        subtasks: subtasks.iter().map(|s| (*s).to_string()).collect(),
        confidence: Some(0.9),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_delegated_happy_path() {
    let reasoning = Arc::new(
        ScriptedReasoningService::new().with_routing(routed(&["Analyst"], "delegated", &[])),
    );
    let runtime = Arc::new(
        MockWorkerRuntime::new().with_worker("Analyst", |prompt| Ok(format!("answer to: {prompt}"))),
    );

    let result = driver(fast_config(), reasoning.clone(), runtime.clone(), &["Analyst", "Writer"])
        .run_pipeline("What drove Q3 revenue?")
        .await
        .unwrap();

    assert_eq!(result.final_result, "answer to: What drove Q3 revenue?");
    assert_eq!(result.routing.decision.mode, ExecutionMode::Delegated);
    assert_eq!(runtime.calls_for("Analyst"), vec!["What drove Q3 revenue?"]);
    assert_eq!(result.status_of(Phase::Analysis), Some(PhaseStatus::Success));
    assert_eq!(result.status_of(Phase::Routing), Some(PhaseStatus::Success));
    assert_eq!(result.status_of(Phase::Execution), Some(PhaseStatus::Success));
    assert_eq!(result.status_of(Phase::Judge), Some(PhaseStatus::Success));
    assert_eq!(result.metadata["judge_gated"], false);
    assert!(!result.is_degraded());
    assert_eq!(reasoning.calls("evaluate_progress"), 1);
    assert_eq!(reasoning.calls("assess_quality"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_parallel_fan_out_preserves_assignment_order() {
    let reasoning = Arc::new(ScriptedReasoningService::new().with_routing(routed(
        &["Researcher", "Writer"],
        "parallel",
        &["find sources", "draft the summary"],
    )));
    let runtime = Arc::new(
        MockWorkerRuntime::echo()
            .with_delay("Researcher", Duration::from_millis(50))
            .with_delay("Writer", Duration::from_millis(10)),
    );

    let result = driver(fast_config(), reasoning, runtime.clone(), &["Researcher", "Writer"])
        .run_pipeline("Research and summarize battery recycling")
        .await
        .unwrap();

    assert_eq!(runtime.max_in_flight(), 2);
    let researcher = result.final_result.find("## Researcher").unwrap();
    let writer = result.final_result.find("## Writer").unwrap();
    assert!(researcher < writer, "sections follow assignment order, not completion order");
    assert!(result.final_result.contains("[Researcher] find sources"));
    assert!(result.final_result.contains("[Writer] draft the summary"));
}

#[tokio::test]
async fn test_sequential_handoff_reaches_next_worker() {
    let reasoning = Arc::new(ScriptedReasoningService::new().with_routing(routed(
        &["Researcher", "Writer"],
        "sequential",
        &["collect facts", "write it up"],
    )));
    let runtime = Arc::new(
        MockWorkerRuntime::new()
            .with_worker("Researcher", |_| Ok("fact one; fact two".into()))
            .with_worker("Writer", |_| Ok("final prose".into())),
    );

    let result = driver(fast_config(), reasoning, runtime.clone(), &["Researcher", "Writer"])
        .run_pipeline("Explain tides")
        .await
        .unwrap();

    assert_eq!(runtime.call_order(), vec!["Researcher", "Writer"]);
    let writer_prompt = &runtime.calls_for("Writer")[0];
    assert!(writer_prompt.starts_with("write it up"));
    assert!(writer_prompt.contains("fact one; fact two"));
    assert!(result.final_result.contains("final prose"));
}

#[tokio::test]
async fn test_judge_refinement_converges() {
    let reasoning = Arc::new(
        ScriptedReasoningService::new().with_routing(routed(&["Writer"], "delegated", &[])),
    );
    let runtime = Arc::new(with_scripted_judge(
        MockWorkerRuntime::new().with_worker("Writer", |_| Ok("refined draft".into())),
        &[4.0, 6.0, 9.0],
    ));

    let result = driver(judged_config(3), reasoning, runtime.clone(), &["Writer", "Judge"])
        .run_pipeline("Write a product announcement")
        .await
        .unwrap();

    assert_eq!(result.judge_evaluations.len(), 3);
    assert_eq!(result.quality.judge_score, Some(9.0));
    assert_eq!(result.metadata["judge_terminal"], "passed");
    assert_eq!(result.metadata["refinement_rounds"], 2);
    // One execution call plus two refinements.
    assert_eq!(runtime.calls_for("Writer").len(), 3);
    assert_eq!(result.status_of(Phase::Judge), Some(PhaseStatus::Success));
    assert_eq!(result.metadata["judge_gated"], true);
}

#[tokio::test]
async fn test_parallel_plan_without_subtasks_runs_every_worker() {
    let reasoning = Arc::new(ScriptedReasoningService::new().with_routing(routed(
        &["Researcher", "Analyst"],
        "parallel",
        &[],
    )));
    let runtime = Arc::new(MockWorkerRuntime::echo());

    let result = driver(fast_config(), reasoning, runtime.clone(), &["Researcher", "Analyst"])
        .run_pipeline("Assess the grid storage market")
        .await
        .unwrap();

    assert_eq!(runtime.total_calls(), 2);
    assert_eq!(result.status_of(Phase::Execution), Some(PhaseStatus::Success));
    assert!(result.final_result.contains("[Analyst] Assess the grid storage market"));
}

#[tokio::test]
async fn test_no_workers_aborts_with_routing_unavailable() {
    let reasoning = Arc::new(ScriptedReasoningService::new());
    let runtime = Arc::new(MockWorkerRuntime::echo());

    let err = driver(fast_config(), reasoning, runtime.clone(), &[])
        .run_pipeline("anything")
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::RoutingUnavailable));
    assert_eq!(runtime.total_calls(), 0);
}

#[tokio::test]
async fn test_reasoning_outage_degrades_every_phase() {
    let reasoning = Arc::new(
        ScriptedReasoningService::new()
            .failing_with(DomainError::TransientReasoning("overloaded".into())),
    );
    let runtime = Arc::new(MockWorkerRuntime::echo());

    let result = driver(fast_config(), reasoning.clone(), runtime, &["Writer", "Analyst"])
        .run_pipeline("Summarize the meeting notes")
        .await
        .unwrap();

    assert_eq!(result.status_of(Phase::Analysis), Some(PhaseStatus::Fallback));
    assert_eq!(result.status_of(Phase::Routing), Some(PhaseStatus::Fallback));
    assert_eq!(result.status_of(Phase::Execution), Some(PhaseStatus::Success));
    assert_eq!(result.status_of(Phase::Progress), Some(PhaseStatus::Fallback));
    assert_eq!(result.status_of(Phase::Quality), Some(PhaseStatus::Fallback));
    assert_eq!(result.status_of(Phase::Judge), Some(PhaseStatus::Success));
    assert!(result.is_degraded());
    assert_eq!(result.routing.decision.assigned_to, vec!["Writer"]);
    assert_eq!(result.final_result, "[Writer] Summarize the meeting notes");
    assert_eq!(reasoning.calls("route_task"), 3, "transient failures are retried");
}

#[tokio::test]
async fn test_stream_emits_stages_in_order_then_completes() {
    let reasoning = Arc::new(ScriptedReasoningService::new());
    let runtime = Arc::new(MockWorkerRuntime::echo());
    let mut events = driver(fast_config(), reasoning, runtime, &["Writer"])
        .stream_pipeline(Task::new("Outline a talk").with_conversation_id("conv-7"));

    let mut phases = Vec::new();
    let mut terminal = None;
    while let Some(event) = events.recv().await {
        match event {
            StageEvent::StageCompleted { phase, payload, .. } => {
                assert_eq!(payload.phase(), phase);
                phases.push(phase);
            }
            other => terminal = Some(other),
        }
    }

    assert_eq!(phases, Phase::ALL.to_vec());
    match terminal {
        Some(StageEvent::Completed { result }) => {
            assert_eq!(result.metadata["conversation_id"], "conv-7");
        }
        other => panic!("expected completed event, got {other:?}"),
    }
}

#[tokio::test]
async fn test_judge_event_reports_terminal_state() {
    let reasoning = Arc::new(
        ScriptedReasoningService::new().with_routing(routed(&["Writer"], "delegated", &[])),
    );
    let runtime = Arc::new(with_scripted_judge(
        MockWorkerRuntime::new().with_worker("Writer", |_| Ok("text".into())),
        &[2.0],
    ));
    let mut events = driver(judged_config(1), reasoning, runtime, &["Writer", "Judge"])
        .stream_pipeline("Write a limerick");

    let mut judge_payload = None;
    while let Some(event) = events.recv().await {
        if let StageEvent::StageCompleted {
            payload: payload @ StagePayload::Judge { .. },
            ..
        } = event
        {
            judge_payload = Some(payload);
        }
    }

    match judge_payload {
        Some(StagePayload::Judge {
            terminal,
            refinement_rounds,
            evaluations,
        }) => {
            assert_eq!(terminal, JudgeTerminal::RoundsExhausted);
            assert_eq!(refinement_rounds, 1);
            assert_eq!(evaluations.len(), 2);
        }
        other => panic!("missing judge payload: {other:?}"),
    }
}

#[tokio::test]
async fn test_repeated_task_hits_analysis_cache() {
    let reasoning = Arc::new(ScriptedReasoningService::new());
    let runtime = Arc::new(MockWorkerRuntime::echo());
    let driver = driver(fast_config(), reasoning.clone(), runtime, &["Writer"]);

    let first = driver.run_pipeline("Plan a trip to Lisbon").await.unwrap();
    let second = driver.run_pipeline("  Plan a trip to Lisbon\n").await.unwrap();

    assert_eq!(first.status_of(Phase::Analysis), Some(PhaseStatus::Success));
    assert_eq!(second.status_of(Phase::Analysis), Some(PhaseStatus::Cached));
    assert_eq!(first.analysis, second.analysis);
    assert_eq!(reasoning.calls("analyze_task"), 1);
}

#[tokio::test]
async fn test_history_records_finished_runs() {
    let sink = Arc::new(SqliteHistorySink::in_memory().await.unwrap());
    let reasoning = Arc::new(ScriptedReasoningService::new());
    let runtime = Arc::new(MockWorkerRuntime::echo());
    let driver = driver(fast_config(), reasoning, runtime, &["Writer"]).with_history(sink.clone());

    let result = driver
        .run_pipeline(Task::new("Draft release notes").with_correlation_id("req-42"))
        .await
        .unwrap();
    driver.flush_history().await;

    let records = sink.recent(10).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].run_id, result.run_id);
    assert_eq!(records[0].correlation_id.as_deref(), Some("req-42"));
    assert_eq!(records[0].assigned_agents, vec!["Writer"]);
    assert_eq!(records[0].phase_status.len(), Phase::ALL.len());
}
