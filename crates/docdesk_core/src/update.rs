use crate::{classify, AppState, Effect, Msg, Resource, Toast};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::Started => vec![
            Effect::LoadDocuments,
            Effect::LoadProjects,
            Effect::LoadSavedAnalyses,
        ],
        Msg::DocumentsLoaded(documents) => {
            state.set_documents(documents);
            Vec::new()
        }
        Msg::ProjectsLoaded(projects) => {
            state.set_projects(projects);
            Vec::new()
        }
        Msg::SavedAnalysesLoaded(saved) => {
            state.set_saved_analyses(saved);
            Vec::new()
        }
        Msg::LoadFailed { resource, failure } => {
            let info = classify(&failure);
            if info.is_cancelled() {
                Vec::new()
            } else {
                vec![Effect::ShowToast(Toast::error(format!(
                    "Could not load {}: {}",
                    resource_label(resource),
                    info.message
                )))]
            }
        }
        Msg::ProjectToggled { project_id } => {
            state.toggle_project(&project_id);
            Vec::new()
        }
        Msg::SelectorToggled { document_id } => {
            state.toggle_selection(&document_id);
            Vec::new()
        }
        Msg::SelectorToggleAll => {
            state.toggle_select_all();
            Vec::new()
        }
        Msg::SelectionConfirmed => state.confirm_selection(),
        Msg::SavedAnalysisOpened { analysis_id } => state.open_saved_analysis(&analysis_id),
        Msg::AnalysisClosed => state.close_analysis(),
        Msg::SessionLoaded { key, session } => state.session_loaded(&key, session),
        Msg::QueryInputChanged(text) => {
            state.set_query_input(text);
            Vec::new()
        }
        Msg::QuerySubmitted { at } => state.submit_query(at),
        Msg::CancelClicked => state.cancel_query(),
        Msg::RetryClicked { message_id, at } => state.retry_message(message_id, at),
        Msg::QueryCompleted {
            request_id,
            response,
        } => state.with_session(|session| session.complete_query(request_id, response)),
        Msg::QueryFailed {
            request_id,
            failure,
        } => state.with_session(|session| session.fail_query(request_id, &failure)),
        Msg::ComparisonLoaded {
            request_id,
            comparison,
        } => state.with_session(|session| session.apply_comparison(request_id, comparison)),
        Msg::ComparisonFailed {
            request_id,
            failure,
        } => state.with_session(|session| session.apply_comparison_failure(request_id, &failure)),
        Msg::ComparisonRetryClicked => state.retry_comparison(),
        Msg::TabSelected(tab) => {
            state.select_tab(tab);
            Vec::new()
        }
        Msg::ClearConversation => state.clear_conversation(),
        Msg::Tick { elapsed_ms } => state.tick(elapsed_ms),
    };

    (state, effects)
}

fn resource_label(resource: Resource) -> &'static str {
    match resource {
        Resource::Documents => "documents",
        Resource::Projects => "projects",
        Resource::SavedAnalyses => "saved analyses",
    }
}
