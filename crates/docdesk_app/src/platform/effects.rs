use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use desk_logging::{desk_debug, desk_info};
use docdesk_core::{Effect, Msg, Resource, Toast};
use docdesk_engine::{DocumentFilter, EngineEvent, EngineHandle};

use super::app::AppEvent;
use super::persistence::SessionPersistence;

/// Executes core effects against the engine and the local store.
pub struct EffectRunner {
    engine: EngineHandle,
    persistence: SessionPersistence,
    events: mpsc::Sender<AppEvent>,
}

impl EffectRunner {
    pub fn new(
        engine: EngineHandle,
        persistence: SessionPersistence,
        events: mpsc::Sender<AppEvent>,
    ) -> Self {
        let runner = Self {
            engine,
            persistence,
            events,
        };
        runner.spawn_event_loop();
        runner
    }

    /// Runs IO effects and hands back toasts for the renderer.
    pub fn run(&self, effects: Vec<Effect>) -> Vec<Toast> {
        let mut toasts = Vec::new();
        for effect in effects {
            match effect {
                Effect::LoadDocuments => self.engine.load_documents(DocumentFilter::default()),
                Effect::LoadProjects => self.engine.load_projects(),
                Effect::LoadSavedAnalyses => self.engine.load_saved_analyses(),
                Effect::LoadSession { key } => {
                    let session = self.persistence.load(&key);
                    let _ = self
                        .events
                        .send(AppEvent::Msg(Msg::SessionLoaded { key, session }));
                }
                Effect::FetchComparison {
                    request_id,
                    document_ids,
                } => {
                    desk_info!(
                        "FetchComparison request_id={} documents={}",
                        request_id,
                        document_ids.len()
                    );
                    self.engine.compare(request_id, document_ids);
                }
                Effect::SendQuery {
                    request_id,
                    request,
                } => {
                    desk_info!(
                        "SendQuery request_id={} query_len={}",
                        request_id,
                        request.query.len()
                    );
                    self.engine.query(request_id, request);
                }
                Effect::CancelQuery { request_id } => self.engine.cancel(request_id),
                Effect::PersistSession { key, session } => self.persistence.save(&key, &session),
                Effect::ClearCachedConversation { key } => {
                    self.persistence.clear_conversation(&key)
                }
                Effect::SyncSavedAnalysis { draft } => self.engine.sync_saved_analysis(draft),
                Effect::ShowToast(toast) => toasts.push(toast),
            }
        }
        toasts
    }

    pub fn login(&self, email: String, password: String) {
        self.engine.login(email, password);
    }

    pub fn logout(&self) {
        self.engine.logout();
    }

    pub fn restore_user(&self) {
        self.engine.restore_user();
    }

    fn spawn_event_loop(&self) {
        let engine = self.engine.clone();
        let events = self.events.clone();
        thread::spawn(move || loop {
            let Some(event) = engine.recv_timeout(Duration::from_millis(200)) else {
                continue;
            };
            for app_event in map_event(event) {
                if events.send(app_event).is_err() {
                    desk_debug!("App loop gone; stopping engine event forwarding");
                    return;
                }
            }
        });
    }
}

pub(crate) fn map_event(event: EngineEvent) -> Vec<AppEvent> {
    let msg = match event {
        EngineEvent::DocumentsLoaded(result) => match result {
            Ok(documents) => Msg::DocumentsLoaded(documents),
            Err(err) => load_failed(Resource::Documents, err),
        },
        EngineEvent::ProjectsLoaded(result) => match result {
            Ok(projects) => Msg::ProjectsLoaded(projects),
            Err(err) => load_failed(Resource::Projects, err),
        },
        EngineEvent::SavedAnalysesLoaded(result) => match result {
            Ok(saved) => Msg::SavedAnalysesLoaded(saved),
            Err(err) => load_failed(Resource::SavedAnalyses, err),
        },
        EngineEvent::ComparisonFinished { request_id, result } => match result {
            Ok(comparison) => Msg::ComparisonLoaded {
                request_id,
                comparison,
            },
            Err(err) => Msg::ComparisonFailed {
                request_id,
                failure: err.into(),
            },
        },
        EngineEvent::QueryFinished { request_id, result } => match result {
            Ok(response) => Msg::QueryCompleted {
                request_id,
                response,
            },
            Err(err) => Msg::QueryFailed {
                request_id,
                failure: err.into(),
            },
        },
        EngineEvent::SignedIn(user) => {
            return vec![
                AppEvent::Notice(format!("Signed in as {}", user.email)),
                AppEvent::Msg(Msg::Started),
            ];
        }
        EngineEvent::SignedOut => return vec![AppEvent::Notice("Signed out".to_string())],
        EngineEvent::AuthFailed(reason) => {
            return vec![AppEvent::Notice(format!("Sign-in failed: {reason}"))];
        }
    };
    vec![AppEvent::Msg(msg)]
}

fn load_failed(resource: Resource, err: docdesk_engine::ApiError) -> Msg {
    Msg::LoadFailed {
        resource,
        failure: err.into(),
    }
}
