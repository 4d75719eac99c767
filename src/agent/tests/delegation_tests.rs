use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::super::*;
use super::test_utils::*;
use crate::crew::ExecutionContext;
use crate::error::AgentError;
use crate::llm::CompletionResponse;

fn assignment<'a>(description: &'a str, context: &'a ExecutionContext) -> Assignment<'a> {
    Assignment {
        description,
        expected_output: None,
        context,
    }
}

#[tokio::test]
async fn test_delegation_runs_coworker_once() {
    let manager_llm = Arc::new(ScriptedProvider::replies(vec![
        tool_call(
            "call_1",
            DELEGATE_TOOL,
            r#"{"coworker":"Blog Manager","task":"Draft the intro","context":"Madrid won"}"#,
        ),
        CompletionResponse::message("Approved"),
    ]));
    let writer_llm = Arc::new(EchoProvider::default());
    let crew = vec![
        Arc::new(agent_with("Content Marketing Manager", manager_llm.clone()).with_delegation(true)),
        Arc::new(agent_with("Blog Manager", writer_llm.clone()).with_delegation(true)),
    ];

    let scope = RunScope::new(&crew, &RoleKeywordRouter, CancellationToken::new());
    let context = ExecutionContext::new();
    let response = crew[0].run_with(&assignment("Review", &context), &scope).await.unwrap();

    assert_eq!(response.content, "Approved");
    assert_eq!(response.delegated_to, vec!["Blog Manager"]);
    assert_eq!(response.model_calls, 3);

    // The manager saw the delegation tool, the coworker did not
    assert!(manager_llm.requests()[0].tools.iter().any(|t| t.name == DELEGATE_TOOL));
    let writer_requests = writer_llm.requests();
    assert_eq!(writer_requests.len(), 1);
    assert!(writer_requests[0].tools.iter().all(|t| t.name != DELEGATE_TOOL));
    assert!(writer_requests[0]
        .transcript()
        .contains("Additional context from Content Marketing Manager: Madrid won"));

    let handed_back = manager_llm.requests()[1].messages.last().unwrap().text().to_string();
    assert_eq!(handed_back, "Blog Manager says: Draft the intro");
}

#[tokio::test]
async fn test_delegation_from_delegated_work_is_a_loop() {
    let manager_llm = Arc::new(ScriptedProvider::replies(vec![tool_call(
        "call_1",
        DELEGATE_TOOL,
        r#"{"coworker":"Blog Manager","task":"Draft"}"#,
    )]));
    let writer_llm = Arc::new(ScriptedProvider::replies(vec![tool_call(
        "call_2",
        DELEGATE_TOOL,
        r#"{"coworker":"Content Marketing Manager","task":"You do it"}"#,
    )]));
    let crew = vec![
        Arc::new(agent_with("Content Marketing Manager", manager_llm).with_delegation(true)),
        Arc::new(agent_with("Blog Manager", writer_llm).with_delegation(true)),
    ];

    let scope = RunScope::new(&crew, &RoleKeywordRouter, CancellationToken::new());
    let context = ExecutionContext::new();
    let err = crew[0].run_with(&assignment("Review", &context), &scope).await.unwrap_err();

    match err {
        AgentError::DelegationLoop { from, to } => {
            assert_eq!(from, "Blog Manager");
            assert_eq!(to, "Content Marketing Manager");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_delegation_refused_without_permission() {
    let llm = Arc::new(ScriptedProvider::replies(vec![
        tool_call("call_1", DELEGATE_TOOL, r#"{"coworker":"Blog Manager","task":"Draft"}"#),
        CompletionResponse::message("Did it myself"),
    ]));
    let crew = vec![
        Arc::new(agent_with("Social Media Manager", llm.clone())),
        Arc::new(agent_with("Blog Manager", Arc::new(SilentProvider))),
    ];

    let scope = RunScope::new(&crew, &RoleKeywordRouter, CancellationToken::new());
    let context = ExecutionContext::new();
    let response = crew[0].run_with(&assignment("Tweet", &context), &scope).await.unwrap();

    assert_eq!(response.content, "Did it myself");
    assert!(response.delegated_to.is_empty());
    assert!(llm.requests()[0].tools.is_empty());
    let note = llm.requests()[1].messages.last().unwrap().text().to_string();
    assert!(note.contains("Delegation is not available"));
}

#[tokio::test]
async fn test_unmatched_coworker_is_reported() {
    let llm = Arc::new(ScriptedProvider::replies(vec![
        tool_call("call_1", DELEGATE_TOOL, r#"{"coworker":"Lawyer","task":"Check contracts"}"#),
        CompletionResponse::message("ok"),
    ]));
    let crew = vec![
        Arc::new(agent_with("Content Marketing Manager", llm.clone()).with_delegation(true)),
        Arc::new(agent_with("Blog Manager", Arc::new(SilentProvider))),
    ];

    let scope = RunScope::new(&crew, &RoleKeywordRouter, CancellationToken::new());
    let context = ExecutionContext::new();
    crew[0].run_with(&assignment("Review", &context), &scope).await.unwrap();

    let note = llm.requests()[1].messages.last().unwrap().text().to_string();
    assert_eq!(note, "No coworker matches 'Lawyer'. Available coworkers: Blog Manager.");
}
