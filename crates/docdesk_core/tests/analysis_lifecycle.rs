use std::sync::Once;

use chrono::{DateTime, TimeZone, Utc};
use docdesk_core::model::{
    Citation, Document, DocumentContradiction, DocumentPattern, DocumentStatus, QueryResponse,
};
use docdesk_core::{
    update, AnalysisTab, AppState, CachedSession, Effect, ErrorKind, Failure, MessageRole,
    MessageStatus, Msg, QueryPhase, RETRIEVAL_NOMINAL_MS,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(desk_logging::initialize_for_tests);
}

fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, minute, 0).unwrap()
}

fn doc(id: &str) -> Document {
    Document {
        id: id.to_string(),
        name: format!("{id}.pdf"),
        doc_type: "pdf".to_string(),
        status: DocumentStatus::Ready,
        size: 2048,
        uploaded_at: at(0),
        uploaded_by: "carol".to_string(),
        tags: Default::default(),
        project_id: None,
    }
}

/// Opens an analysis over `ids` and answers the cache lookup with `cached`.
fn open_analysis(ids: &[&str], cached: Option<CachedSession>) -> (AppState, Vec<Effect>) {
    let documents = ids.iter().map(|id| doc(id)).collect();
    let (mut state, _) = update(AppState::new(), Msg::DocumentsLoaded(documents));
    for id in ids {
        state = update(
            state,
            Msg::SelectorToggled {
                document_id: id.to_string(),
            },
        )
        .0;
    }
    let (state, effects) = update(state, Msg::SelectionConfirmed);
    let key = match effects.as_slice() {
        [Effect::LoadSession { key }] => key.clone(),
        other => panic!("expected LoadSession, got {other:?}"),
    };
    update(
        state,
        Msg::SessionLoaded {
            key,
            session: cached,
        },
    )
}

fn submit(state: AppState, text: &str, minute: u32) -> (AppState, Vec<Effect>) {
    let (state, _) = update(state, Msg::QueryInputChanged(text.to_string()));
    update(state, Msg::QuerySubmitted { at: at(minute) })
}

/// Runs the retrieval ramp to completion and returns the issued request id.
fn finish_retrieval(state: AppState) -> (AppState, u64) {
    let (state, effects) = update(
        state,
        Msg::Tick {
            elapsed_ms: RETRIEVAL_NOMINAL_MS,
        },
    );
    let request_id = match effects.as_slice() {
        [Effect::SendQuery { request_id, .. }] => *request_id,
        other => panic!("expected SendQuery, got {other:?}"),
    };
    (state, request_id)
}

fn response(answer: &str) -> QueryResponse {
    QueryResponse {
        answer: answer.to_string(),
        citations: vec![Citation {
            document_id: "A".to_string(),
            document_name: "A.pdf".to_string(),
            excerpt: "term of 12 months".to_string(),
            page: Some(3),
        }],
        generated_at: at(5),
        patterns: None,
        contradictions: None,
    }
}

fn pattern(id: &str) -> DocumentPattern {
    DocumentPattern {
        id: id.to_string(),
        description: format!("pattern {id}"),
        document_ids: vec!["A".to_string(), "B".to_string()],
        confidence: Some(0.8),
    }
}

fn contradiction(id: &str) -> DocumentContradiction {
    DocumentContradiction {
        id: id.to_string(),
        description: format!("contradiction {id}"),
        document_ids: vec!["A".to_string(), "B".to_string()],
        severity: Some("high".to_string()),
    }
}

#[test]
fn query_waits_for_retrieval_ramp_before_sending() {
    init_logging();
    let (state, _) = open_analysis(&["A", "B"], None);
    let (state, effects) = submit(state, "What are the differences?", 1);
    assert!(effects.is_empty());

    let view = state.view().analysis.unwrap();
    assert_eq!(view.phase, QueryPhase::Retrieving);
    assert_eq!(view.progress.unwrap().percent, 0);
    assert_eq!(view.input, "");
    assert_eq!(view.messages.len(), 2);
    assert_eq!(view.messages[0].role, MessageRole::User);
    assert_eq!(view.messages[1].status, MessageStatus::Retrieving);

    let (state, effects) = update(state, Msg::Tick { elapsed_ms: 1_000 });
    assert!(effects.is_empty());
    let progress = state.view().analysis.unwrap().progress.unwrap();
    assert_eq!(progress.percent, 50);
    assert_eq!(progress.remaining_ms, 1_000);

    let (state, effects) = update(state, Msg::Tick { elapsed_ms: 1_000 });
    match effects.as_slice() {
        [Effect::SendQuery { request, .. }] => {
            assert_eq!(request.query, "What are the differences?");
            assert_eq!(request.document_ids, vec!["A", "B"]);
            assert!(request.include_patterns);
            assert!(request.include_contradictions);
        }
        other => panic!("expected SendQuery, got {other:?}"),
    }
    let view = state.view().analysis.unwrap();
    assert_eq!(view.phase, QueryPhase::Generating);
    assert_eq!(view.messages[1].status, MessageStatus::Generating);

    let (state, _) = update(state, Msg::Tick { elapsed_ms: 120_000 });
    let progress = state.view().analysis.unwrap().progress.unwrap();
    assert!(progress.percent < 100);
}

#[test]
fn completed_answer_has_no_bold_markers() {
    init_logging();
    let (state, _) = open_analysis(&["A", "B"], None);
    let (state, _) = submit(state, "What are the differences?", 1);
    let (state, request_id) = finish_retrieval(state);

    let (state, effects) = update(
        state,
        Msg::QueryCompleted {
            request_id,
            response: response("Document A has a **12 month** term while B has **24**."),
        },
    );

    let view = state.view().analysis.unwrap();
    let answer = &view.messages[1];
    assert_eq!(answer.status, MessageStatus::Completed);
    assert!(!answer.content.contains("**"));
    assert_eq!(answer.content, "Document A has a 12 month term while B has 24.");
    assert_eq!(answer.citations.len(), 1);
    assert_eq!(answer.timestamp, at(5));
    assert_eq!(view.phase, QueryPhase::Idle);
    assert!(view.progress.is_none());

    assert_eq!(effects.len(), 2);
    assert!(matches!(effects[0], Effect::PersistSession { ref key, .. } if key == "A,B"));
    match &effects[1] {
        Effect::SyncSavedAnalysis { draft } => {
            assert!(draft.has_messages);
            assert!(!draft.has_patterns);
            assert_eq!(draft.document_names, vec!["A.pdf", "B.pdf"]);
        }
        other => panic!("expected SyncSavedAnalysis, got {other:?}"),
    }
}

#[test]
fn starting_second_query_aborts_the_first() {
    init_logging();
    let (state, _) = open_analysis(&["A", "B"], None);
    let (state, _) = submit(state, "first", 1);
    let (state, first_id) = finish_retrieval(state);

    let (state, effects) = submit(state, "second", 2);
    assert_eq!(
        effects.first(),
        Some(&Effect::CancelQuery {
            request_id: first_id
        })
    );
    assert!(effects
        .iter()
        .any(|effect| matches!(effect, Effect::PersistSession { .. })));

    // A late answer to the first query must not complete its placeholder.
    let (state, effects) = update(
        state,
        Msg::QueryCompleted {
            request_id: first_id,
            response: response("late"),
        },
    );
    assert!(effects.is_empty());

    let view = state.view().analysis.unwrap();
    assert_eq!(view.messages.len(), 4);
    assert_eq!(view.messages[1].status, MessageStatus::Cancelled);
    assert_eq!(view.messages[1].content, "");
    assert_eq!(view.messages[3].status, MessageStatus::Retrieving);
    assert_eq!(view.phase, QueryPhase::Retrieving);

    let (_state, second_id) = finish_retrieval(state);
    assert_ne!(second_id, first_id);
}

#[test]
fn second_query_during_retrieval_cancels_without_network_abort() {
    init_logging();
    let (state, _) = open_analysis(&["A", "B"], None);
    let (state, _) = submit(state, "first", 1);
    let (state, effects) = submit(state, "second", 2);

    assert!(effects
        .iter()
        .all(|effect| !matches!(effect, Effect::CancelQuery { .. })));
    let view = state.view().analysis.unwrap();
    assert_eq!(view.messages[1].status, MessageStatus::Cancelled);
}

#[test]
fn cancel_aborts_request_and_clears_progress() {
    init_logging();
    let (state, _) = open_analysis(&["A", "B"], None);
    let (state, _) = submit(state, "question", 1);
    let (state, request_id) = finish_retrieval(state);

    let (state, effects) = update(state, Msg::CancelClicked);
    assert_eq!(effects[0], Effect::CancelQuery { request_id });
    assert!(matches!(effects[1], Effect::PersistSession { .. }));

    let view = state.view().analysis.unwrap();
    assert_eq!(view.phase, QueryPhase::Idle);
    assert!(view.progress.is_none());
    assert_eq!(view.messages[1].status, MessageStatus::Cancelled);

    // The engine's cancellation report arrives afterwards and is ignored.
    let (state, effects) = update(
        state,
        Msg::QueryFailed {
            request_id,
            failure: Failure::Cancelled,
        },
    );
    assert!(effects.is_empty());
    assert_eq!(
        state.view().analysis.unwrap().messages[1].status,
        MessageStatus::Cancelled
    );
}

#[test]
fn cancel_during_retrieval_never_sends() {
    init_logging();
    let (state, _) = open_analysis(&["A", "B"], None);
    let (state, _) = submit(state, "question", 1);
    let (state, effects) = update(state, Msg::CancelClicked);
    assert!(matches!(effects.as_slice(), [Effect::PersistSession { .. }]));

    let (_state, effects) = update(
        state,
        Msg::Tick {
            elapsed_ms: RETRIEVAL_NOMINAL_MS * 2,
        },
    );
    assert!(effects.is_empty());
}

#[test]
fn network_failure_offers_retry_with_same_content() {
    init_logging();
    let (state, _) = open_analysis(&["A", "B"], None);
    let (state, _) = submit(state, "Summarize both", 1);
    let (state, request_id) = finish_retrieval(state);

    let (state, effects) = update(
        state,
        Msg::QueryFailed {
            request_id,
            failure: Failure::Network("connection reset".to_string()),
        },
    );
    assert!(effects
        .iter()
        .any(|effect| matches!(effect, Effect::ShowToast(_))));
    let view = state.view().analysis.unwrap();
    let failed = &view.messages[1];
    assert_eq!(failed.status, MessageStatus::Error);
    assert!(failed.can_retry);
    assert!(failed.error.as_deref().unwrap().contains("Network"));
    let failed_id = failed.id;

    let (state, effects) = update(
        state,
        Msg::RetryClicked {
            message_id: failed_id,
            at: at(3),
        },
    );
    assert!(effects.is_empty());
    let view = state.view().analysis.unwrap();
    assert_eq!(view.messages.len(), 2);
    assert_eq!(view.messages[0].content, "Summarize both");
    assert_eq!(view.messages[1].status, MessageStatus::Retrieving);
    assert_ne!(view.messages[1].id, failed_id);

    let (state, effects) = update(
        state,
        Msg::Tick {
            elapsed_ms: RETRIEVAL_NOMINAL_MS,
        },
    );
    match effects.as_slice() {
        [Effect::SendQuery {
            request_id: retry_id,
            request,
        }] => {
            assert_ne!(*retry_id, request_id);
            assert_eq!(request.query, "Summarize both");
        }
        other => panic!("expected SendQuery, got {other:?}"),
    }
    assert_eq!(state.view().analysis.unwrap().phase, QueryPhase::Generating);
}

#[test]
fn validation_failure_is_not_retryable() {
    init_logging();
    let (state, _) = open_analysis(&["A", "B"], None);
    let (state, _) = submit(state, "bad", 1);
    let (state, request_id) = finish_retrieval(state);
    let (state, _) = update(
        state,
        Msg::QueryFailed {
            request_id,
            failure: Failure::Http {
                status: 400,
                message: Some("query too long".to_string()),
            },
        },
    );
    let view = state.view().analysis.unwrap();
    let failed = view.messages[1].clone();
    assert!(!failed.can_retry);
    assert_eq!(failed.error.as_deref(), Some("query too long"));

    let (state, effects) = update(
        state,
        Msg::RetryClicked {
            message_id: failed.id,
            at: at(2),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.view().analysis.unwrap().messages.len(), 2);
}

#[test]
fn new_contradictions_switch_tab_before_patterns() {
    init_logging();
    let (state, _) = open_analysis(&["A", "B"], None);
    let (state, _) = submit(state, "conflicts?", 1);
    let (state, request_id) = finish_retrieval(state);
    let mut reply = response("Found some.");
    reply.patterns = Some(vec![pattern("p1")]);
    reply.contradictions = Some(vec![contradiction("c1")]);
    let (state, _) = update(
        state,
        Msg::QueryCompleted {
            request_id,
            response: reply,
        },
    );
    let view = state.view().analysis.unwrap();
    assert_eq!(view.active_tab, AnalysisTab::Contradictions);
    assert_eq!(view.patterns.len(), 1);
    assert_eq!(view.contradictions.len(), 1);

    // Only patterns are new this time.
    let (state, _) = update(state, Msg::TabSelected(AnalysisTab::Chat));
    let (state, _) = submit(state, "themes?", 2);
    let (state, request_id) = finish_retrieval(state);
    let mut reply = response("Themes.");
    reply.patterns = Some(vec![pattern("p1"), pattern("p2")]);
    reply.contradictions = Some(vec![contradiction("c1")]);
    let (state, _) = update(
        state,
        Msg::QueryCompleted {
            request_id,
            response: reply,
        },
    );
    let view = state.view().analysis.unwrap();
    assert_eq!(view.active_tab, AnalysisTab::Patterns);
    assert_eq!(view.patterns.len(), 2);
    assert_eq!(view.contradictions.len(), 1);

    // Nothing new: the tab stays where the user put it.
    let (state, _) = update(state, Msg::TabSelected(AnalysisTab::Chat));
    let (state, _) = submit(state, "again", 3);
    let (state, request_id) = finish_retrieval(state);
    let mut reply = response("Same.");
    reply.patterns = Some(vec![pattern("p2")]);
    let (state, _) = update(
        state,
        Msg::QueryCompleted {
            request_id,
            response: reply,
        },
    );
    assert_eq!(state.view().analysis.unwrap().active_tab, AnalysisTab::Chat);
}

#[test]
fn persisted_snapshot_restores_the_same_conversation() {
    init_logging();
    let (state, _) = open_analysis(&["A", "B"], None);
    let (state, _) = submit(state, "What changed?", 1);
    let (state, request_id) = finish_retrieval(state);
    let (state, effects) = update(
        state,
        Msg::QueryCompleted {
            request_id,
            response: response("**Everything**"),
        },
    );
    let snapshot = match &effects[0] {
        Effect::PersistSession { session, .. } => session.clone(),
        other => panic!("expected PersistSession, got {other:?}"),
    };
    let before = state.view().analysis.unwrap().messages;

    let (restored, effects) = open_analysis(&["B", "A"], Some(snapshot));
    // Messages only; the comparison is still missing so it is fetched.
    assert!(matches!(effects.as_slice(), [Effect::FetchComparison { .. }]));
    let after = restored.view().analysis.unwrap().messages;
    assert_eq!(after, before);

    // Ids continue after the restored ones.
    let (restored, _) = submit(restored, "next", 9);
    let ids: Vec<_> = restored
        .view()
        .analysis
        .unwrap()
        .messages
        .iter()
        .map(|message| message.id)
        .collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);
}

#[test]
fn interrupted_messages_restore_as_cancelled() {
    init_logging();
    let (state, _) = open_analysis(&["A", "B"], None);
    let (state, _) = submit(state, "question", 1);
    let (_state, effects) = submit(state, "another", 2);
    let snapshot = effects
        .into_iter()
        .find_map(|effect| match effect {
            Effect::PersistSession { session, .. } => Some(session),
            _ => None,
        })
        .expect("persist on supersede");
    assert_eq!(snapshot.messages[3].status, MessageStatus::Retrieving);

    let (restored, _) = open_analysis(&["A", "B"], Some(snapshot));
    let messages = restored.view().analysis.unwrap().messages;
    assert_eq!(messages[3].status, MessageStatus::Cancelled);
}

#[test]
fn clear_conversation_drops_messages_and_cache() {
    init_logging();
    let (state, _) = open_analysis(&["A", "B"], None);
    let (state, _) = submit(state, "question", 1);
    let (state, request_id) = finish_retrieval(state);
    let (state, effects) = update(state, Msg::ClearConversation);

    assert_eq!(effects[0], Effect::CancelQuery { request_id });
    assert!(effects.contains(&Effect::ClearCachedConversation {
        key: "A,B".to_string()
    }));
    assert!(state.view().analysis.unwrap().messages.is_empty());
}

#[test]
fn closing_analysis_cancels_in_flight_query() {
    init_logging();
    let (state, _) = open_analysis(&["A", "B"], None);
    let (state, _) = submit(state, "question", 1);
    let (state, request_id) = finish_retrieval(state);
    let (state, effects) = update(state, Msg::AnalysisClosed);
    assert_eq!(effects[0], Effect::CancelQuery { request_id });
    assert!(state.view().analysis.is_none());
}

#[test]
fn query_failure_kinds_map_to_message_state() {
    init_logging();
    let (state, _) = open_analysis(&["A", "B"], None);
    let (state, _) = submit(state, "slow", 1);
    let (state, request_id) = finish_retrieval(state);
    let (state, _) = update(
        state,
        Msg::QueryFailed {
            request_id,
            failure: Failure::Timeout,
        },
    );
    let message = state.view().analysis.unwrap().messages[1].clone();
    assert_eq!(message.status, MessageStatus::Error);
    assert!(message.can_retry);
    assert_eq!(
        docdesk_core::classify(&Failure::Timeout).kind,
        ErrorKind::Timeout
    );
}
