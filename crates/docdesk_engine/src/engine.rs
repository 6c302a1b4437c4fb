use std::collections::HashMap;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use desk_logging::{desk_debug, desk_info, desk_warn};
use docdesk_core::model::{DocumentId, QueryRequest, SavedAnalysisDraft};
use docdesk_core::RequestId;
use tokio_util::sync::CancellationToken;

use crate::client::{cancellable, DocumentApi};
use crate::{
    ApiSettings, AuthSession, DocumentFilter, EngineError, EngineEvent, LocalStore,
    ReqwestApiClient,
};

enum EngineCommand {
    LoadDocuments(DocumentFilter),
    LoadProjects,
    LoadSavedAnalyses,
    Compare {
        request_id: RequestId,
        document_ids: Vec<DocumentId>,
    },
    Query {
        request_id: RequestId,
        request: QueryRequest,
    },
    Cancel {
        request_id: RequestId,
    },
    SyncSavedAnalysis(SavedAnalysisDraft),
    Login {
        email: String,
        password: String,
    },
    RestoreUser,
    Logout,
}

/// Cancellation tokens of requests still running, plus the current query.
#[derive(Default)]
struct InFlight {
    tokens: HashMap<RequestId, CancellationToken>,
    current_query: Option<RequestId>,
}

impl InFlight {
    fn register(&mut self, request_id: RequestId) -> CancellationToken {
        let token = CancellationToken::new();
        self.tokens.insert(request_id, token.clone());
        token
    }

    /// Registers a query, cancelling the one it replaces.
    fn register_query(&mut self, request_id: RequestId) -> CancellationToken {
        if let Some(previous) = self.current_query.replace(request_id) {
            self.cancel(previous);
        }
        self.register(request_id)
    }

    fn cancel(&mut self, request_id: RequestId) {
        if let Some(token) = self.tokens.remove(&request_id) {
            desk_debug!("Cancelling request {}", request_id);
            token.cancel();
        }
        if self.current_query == Some(request_id) {
            self.current_query = None;
        }
    }

    fn finish(&mut self, request_id: RequestId) {
        self.tokens.remove(&request_id);
        if self.current_query == Some(request_id) {
            self.current_query = None;
        }
    }
}

struct Shared {
    client: ReqwestApiClient,
    auth: tokio::sync::Mutex<AuthSession>,
    in_flight: Mutex<InFlight>,
    event_tx: mpsc::Sender<EngineEvent>,
}

impl Shared {
    fn in_flight(&self) -> std::sync::MutexGuard<'_, InFlight> {
        self.in_flight.lock().unwrap_or_else(|err| err.into_inner())
    }

    fn emit(&self, event: EngineEvent) {
        let _ = self.event_tx.send(event);
    }
}

/// Runs REST calls on a background tokio runtime and reports results as
/// [`EngineEvent`]s.
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: Arc<Mutex<mpsc::Receiver<EngineEvent>>>,
}

impl EngineHandle {
    pub fn new(settings: ApiSettings, store: LocalStore) -> Result<Self, EngineError> {
        let client = ReqwestApiClient::new(settings)?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("docdesk-engine")
            .build()?;
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let auth = AuthSession::init(store, &client);
        let shared = Arc::new(Shared {
            client,
            auth: tokio::sync::Mutex::new(auth),
            in_flight: Mutex::new(InFlight::default()),
            event_tx,
        });

        thread::spawn(move || {
            while let Ok(command) = cmd_rx.recv() {
                dispatch(&runtime, &shared, command);
            }
            desk_info!("Engine command channel closed");
        });

        Ok(Self {
            cmd_tx,
            event_rx: Arc::new(Mutex::new(event_rx)),
        })
    }

    fn send(&self, command: EngineCommand) {
        let _ = self.cmd_tx.send(command);
    }

    pub fn load_documents(&self, filter: DocumentFilter) {
        self.send(EngineCommand::LoadDocuments(filter));
    }

    pub fn load_projects(&self) {
        self.send(EngineCommand::LoadProjects);
    }

    pub fn load_saved_analyses(&self) {
        self.send(EngineCommand::LoadSavedAnalyses);
    }

    pub fn compare(&self, request_id: RequestId, document_ids: Vec<DocumentId>) {
        self.send(EngineCommand::Compare {
            request_id,
            document_ids,
        });
    }

    /// Starts a query; a query still in flight is cancelled first.
    pub fn query(&self, request_id: RequestId, request: QueryRequest) {
        self.send(EngineCommand::Query {
            request_id,
            request,
        });
    }

    pub fn cancel(&self, request_id: RequestId) {
        self.send(EngineCommand::Cancel { request_id });
    }

    /// Fire-and-forget; failures are only logged.
    pub fn sync_saved_analysis(&self, draft: SavedAnalysisDraft) {
        self.send(EngineCommand::SyncSavedAnalysis(draft));
    }

    pub fn login(&self, email: impl Into<String>, password: impl Into<String>) {
        self.send(EngineCommand::Login {
            email: email.into(),
            password: password.into(),
        });
    }

    /// Resolves the user behind a stored token, if there is one.
    pub fn restore_user(&self) {
        self.send(EngineCommand::RestoreUser);
    }

    pub fn logout(&self) {
        self.send(EngineCommand::Logout);
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.lock().ok()?.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.lock().ok()?.recv_timeout(timeout).ok()
    }
}

fn dispatch(runtime: &tokio::runtime::Runtime, shared: &Arc<Shared>, command: EngineCommand) {
    match command {
        EngineCommand::Cancel { request_id } => {
            shared.in_flight().cancel(request_id);
        }
        EngineCommand::Query {
            request_id,
            request,
        } => {
            let token = shared.in_flight().register_query(request_id);
            let shared = shared.clone();
            runtime.spawn(async move {
                let result = cancellable(&token, shared.client.query(&request)).await;
                shared.in_flight().finish(request_id);
                if let Err(err) = &result {
                    desk_warn!("Query {} failed: {}", request_id, err);
                }
                shared.emit(EngineEvent::QueryFinished { request_id, result });
            });
        }
        EngineCommand::Compare {
            request_id,
            document_ids,
        } => {
            let token = shared.in_flight().register(request_id);
            let shared = shared.clone();
            runtime.spawn(async move {
                let result = cancellable(&token, shared.client.compare(&document_ids)).await;
                shared.in_flight().finish(request_id);
                shared.emit(EngineEvent::ComparisonFinished { request_id, result });
            });
        }
        command => {
            let shared = shared.clone();
            runtime.spawn(async move {
                handle_command(&shared, command).await;
            });
        }
    }
}

async fn handle_command(shared: &Shared, command: EngineCommand) {
    let client = &shared.client;
    match command {
        EngineCommand::LoadDocuments(filter) => {
            let result = client.list_all_documents(&filter).await;
            shared.emit(EngineEvent::DocumentsLoaded(result));
        }
        EngineCommand::LoadProjects => {
            shared.emit(EngineEvent::ProjectsLoaded(client.project_hierarchy().await));
        }
        EngineCommand::LoadSavedAnalyses => {
            shared.emit(EngineEvent::SavedAnalysesLoaded(
                client.list_saved_analyses().await,
            ));
        }
        EngineCommand::SyncSavedAnalysis(draft) => {
            match client.create_saved_analysis(&draft).await {
                Ok(saved) => desk_debug!("Saved analysis {} synced", saved.id),
                Err(err) => desk_warn!("Saved analysis sync failed: {}", err),
            }
        }
        EngineCommand::Login { email, password } => {
            let mut auth = shared.auth.lock().await;
            match auth.login(client, &email, &password).await {
                Ok(user) => shared.emit(EngineEvent::SignedIn(user)),
                Err(err) => shared.emit(EngineEvent::AuthFailed(err.to_string())),
            }
        }
        EngineCommand::RestoreUser => {
            let mut auth = shared.auth.lock().await;
            if !auth.is_signed_in() {
                return;
            }
            match auth.refresh_user(client).await {
                Ok(user) => shared.emit(EngineEvent::SignedIn(user)),
                Err(err) => shared.emit(EngineEvent::AuthFailed(err.to_string())),
            }
        }
        EngineCommand::Logout => {
            let mut auth = shared.auth.lock().await;
            match auth.logout(client) {
                Ok(()) => shared.emit(EngineEvent::SignedOut),
                Err(err) => shared.emit(EngineEvent::AuthFailed(err.to_string())),
            }
        }
        EngineCommand::Cancel { .. }
        | EngineCommand::Query { .. }
        | EngineCommand::Compare { .. } => {}
    }
}
