use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use desk_logging::{desk_debug, desk_warn};
use docdesk_core::model::{
    Document, DocumentComparison, DocumentId, Member, Project, ProjectId, QueryRequest,
    QueryResponse, Role, SavedAnalysis, SavedAnalysisDraft, Tag, User,
};
use reqwest::{multipart, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::types::{BulkRequest, ListBody};
use crate::{ApiError, BulkAction, DocumentFilter, DocumentHealth, DocumentPage, LoginResponse};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_DOCUMENT_PAGES: u32 = 100;

#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Always ends with `/` so relative paths join below it.
    pub base_url: Url,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl ApiSettings {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let mut normalized = base_url.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let base_url =
            Url::parse(&normalized).map_err(|err| ApiError::InvalidRequest(err.to_string()))?;
        Ok(Self {
            base_url,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }
}

/// Calls the engine issues on behalf of the state machine.
#[async_trait::async_trait]
pub trait DocumentApi: Send + Sync {
    async fn list_documents(&self, filter: &DocumentFilter) -> Result<DocumentPage, ApiError>;
    async fn project_hierarchy(&self) -> Result<Vec<Project>, ApiError>;
    async fn list_saved_analyses(&self) -> Result<Vec<SavedAnalysis>, ApiError>;
    async fn compare(&self, document_ids: &[DocumentId]) -> Result<DocumentComparison, ApiError>;
    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse, ApiError>;
    async fn create_saved_analysis(
        &self,
        draft: &SavedAnalysisDraft,
    ) -> Result<SavedAnalysis, ApiError>;

    /// Walks the listing page by page (1-based) until the reported `total`
    /// is reached. Stops after one page when the backend reports no total,
    /// and on an empty page.
    async fn list_all_documents(
        &self,
        filter: &DocumentFilter,
    ) -> Result<Vec<Document>, ApiError> {
        let mut filter = filter.clone();
        let mut page_number = filter.page.unwrap_or(1);
        let mut documents = Vec::new();
        for _ in 0..MAX_DOCUMENT_PAGES {
            filter.page = Some(page_number);
            let page = self.list_documents(&filter).await?;
            let fetched = page.documents.len();
            documents.extend(page.documents);
            let Some(total) = page.total else {
                return Ok(documents);
            };
            if fetched == 0 || documents.len() as u64 >= total {
                return Ok(documents);
            }
            page_number += 1;
        }
        desk_warn!(
            "Document listing still incomplete after {} pages; keeping {} documents",
            MAX_DOCUMENT_PAGES,
            documents.len()
        );
        Ok(documents)
    }
}

/// Races `work` against `token`; a fired token wins and yields `Cancelled`.
pub async fn cancellable<T>(
    token: &CancellationToken,
    work: impl Future<Output = Result<T, ApiError>>,
) -> Result<T, ApiError> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(ApiError::Cancelled),
        result = work => result,
    }
}

#[derive(Debug, Clone)]
pub struct ReqwestApiClient {
    settings: ApiSettings,
    http: reqwest::Client,
    token: Arc<RwLock<Option<String>>>,
}

impl ReqwestApiClient {
    pub fn new(settings: ApiSettings) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::Network(err.to_string()))?;
        Ok(Self {
            settings,
            http,
            token: Arc::new(RwLock::new(None)),
        })
    }

    pub fn settings(&self) -> &ApiSettings {
        &self.settings
    }

    /// Sets or clears the bearer token attached to every request.
    pub fn set_token(&self, token: Option<String>) {
        let mut guard = self.token.write().unwrap_or_else(|err| err.into_inner());
        *guard = token;
    }

    pub fn has_token(&self) -> bool {
        self.current_token().is_some()
    }

    fn current_token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|err| err.into_inner())
            .clone()
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let url = self
            .settings
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| ApiError::InvalidRequest(err.to_string()))?;
        desk_debug!("{} {}", method, url);
        let builder = self.http.request(method, url);
        Ok(match self.current_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        send_json(self.request(Method::GET, path)?).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        send_json(self.request(Method::POST, path)?.json(body)).await
    }

    // ---- documents ----

    pub async fn get_document(&self, id: &str) -> Result<Document, ApiError> {
        self.get_json(&format!("documents/{id}")).await
    }

    pub async fn upload_document(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        project_id: Option<&ProjectId>,
    ) -> Result<Document, ApiError> {
        let part = multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let mut form = multipart::Form::new().part("file", part);
        if let Some(project_id) = project_id {
            form = form.text("projectId", project_id.clone());
        }
        send_json(self.request(Method::POST, "documents/upload")?.multipart(form)).await
    }

    pub async fn delete_document(&self, id: &str) -> Result<(), ApiError> {
        send_empty(self.request(Method::DELETE, &format!("documents/{id}"))?).await
    }

    pub async fn bulk_action(
        &self,
        action: BulkAction,
        document_ids: &[DocumentId],
    ) -> Result<(), ApiError> {
        let body = BulkRequest {
            action,
            document_ids,
        };
        send_empty(self.request(Method::POST, "documents/bulk")?.json(&body)).await
    }

    pub async fn set_tags(&self, id: &str, tags: &[String]) -> Result<Document, ApiError> {
        let builder = self
            .request(Method::PUT, &format!("documents/{id}/tags"))?
            .json(&json!({ "tags": tags }));
        send_json(builder).await
    }

    pub async fn move_document(
        &self,
        id: &str,
        project_id: Option<&ProjectId>,
    ) -> Result<Document, ApiError> {
        let builder = self
            .request(Method::PUT, &format!("documents/{id}/move"))?
            .json(&json!({ "projectId": project_id }));
        send_json(builder).await
    }

    pub async fn document_health(&self) -> Result<DocumentHealth, ApiError> {
        self.get_json("documents/health").await
    }

    pub async fn share_document(&self, id: &str, emails: &[String]) -> Result<(), ApiError> {
        let builder = self
            .request(Method::POST, &format!("documents/{id}/share"))?
            .json(&json!({ "emails": emails }));
        send_empty(builder).await
    }

    // ---- projects ----

    pub async fn list_projects(&self) -> Result<Vec<Project>, ApiError> {
        let body: ListBody<Project> = self.get_json("projects").await?;
        Ok(body.into_parts().0)
    }

    pub async fn get_project(&self, id: &str) -> Result<Project, ApiError> {
        self.get_json(&format!("projects/{id}")).await
    }

    // ---- tags ----

    pub async fn list_tags(&self) -> Result<Vec<Tag>, ApiError> {
        let body: ListBody<Tag> = self.get_json("tags").await?;
        Ok(body.into_parts().0)
    }

    pub async fn create_tag(&self, name: &str, color: Option<&str>) -> Result<Tag, ApiError> {
        self.post_json("tags", &json!({ "name": name, "color": color }))
            .await
    }

    pub async fn delete_tag(&self, id: &str) -> Result<(), ApiError> {
        send_empty(self.request(Method::DELETE, &format!("tags/{id}"))?).await
    }

    // ---- users and organizations ----

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        self.post_json(
            "auth/login",
            &json!({ "email": email, "password": password }),
        )
        .await
    }

    pub async fn current_user(&self) -> Result<User, ApiError> {
        self.get_json("users/me").await
    }

    pub async fn list_members(&self, organization_id: &str) -> Result<Vec<Member>, ApiError> {
        let body: ListBody<Member> = self
            .get_json(&format!("organizations/{organization_id}/members"))
            .await?;
        Ok(body.into_parts().0)
    }

    pub async fn invite_member(
        &self,
        organization_id: &str,
        email: &str,
        role: Role,
    ) -> Result<Member, ApiError> {
        self.post_json(
            &format!("organizations/{organization_id}/members"),
            &InviteRequest { email, role },
        )
        .await
    }

    pub async fn remove_member(&self, organization_id: &str, user_id: &str) -> Result<(), ApiError> {
        let path = format!("organizations/{organization_id}/members/{user_id}");
        send_empty(self.request(Method::DELETE, &path)?).await
    }
}

#[derive(Serialize)]
struct InviteRequest<'a> {
    email: &'a str,
    role: Role,
}

#[async_trait::async_trait]
impl DocumentApi for ReqwestApiClient {
    async fn list_documents(&self, filter: &DocumentFilter) -> Result<DocumentPage, ApiError> {
        let builder = self.request(Method::GET, "documents")?.query(filter);
        let body: ListBody<Document> = send_json(builder).await?;
        let (documents, total) = body.into_parts();
        Ok(DocumentPage { documents, total })
    }

    async fn project_hierarchy(&self) -> Result<Vec<Project>, ApiError> {
        let body: ListBody<Project> = self.get_json("projects/hierarchy").await?;
        Ok(body.into_parts().0)
    }

    async fn list_saved_analyses(&self) -> Result<Vec<SavedAnalysis>, ApiError> {
        let body: ListBody<SavedAnalysis> = self.get_json("saved-analyses").await?;
        Ok(body.into_parts().0)
    }

    async fn compare(&self, document_ids: &[DocumentId]) -> Result<DocumentComparison, ApiError> {
        self.post_json(
            "cross-document/compare",
            &json!({ "documentIds": document_ids }),
        )
        .await
    }

    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse, ApiError> {
        self.post_json("cross-document/query", request).await
    }

    async fn create_saved_analysis(
        &self,
        draft: &SavedAnalysisDraft,
    ) -> Result<SavedAnalysis, ApiError> {
        self.post_json("saved-analyses", draft).await
    }
}

async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, ApiError> {
    let response = checked(builder).await?;
    let bytes = response.bytes().await.map_err(map_reqwest_error)?;
    serde_json::from_slice(&bytes).map_err(|err| ApiError::Decode(err.to_string()))
}

async fn send_empty(builder: RequestBuilder) -> Result<(), ApiError> {
    checked(builder).await.map(|_| ())
}

async fn checked(builder: RequestBuilder) -> Result<Response, ApiError> {
    let response = builder.send().await.map_err(map_reqwest_error)?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Status {
        status: status.as_u16(),
        message: server_message(&body),
    })
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Pulls a human-readable error out of a failed response body.
fn server_message(body: &str) -> Option<String> {
    let text = match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.message.or(parsed.error)?,
        Err(_) if body.trim_start().starts_with('<') => return None,
        Err(_) => body.to_string(),
    };
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::Timeout;
    }
    if err.is_decode() {
        return ApiError::Decode(err.to_string());
    }
    if err.is_builder() {
        return ApiError::InvalidRequest(err.to_string());
    }
    ApiError::Network(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gains_trailing_slash() {
        let settings = ApiSettings::new("https://example.test/api").unwrap();
        assert_eq!(settings.base_url.as_str(), "https://example.test/api/");
        assert_eq!(
            settings.base_url.join("documents/health").unwrap().as_str(),
            "https://example.test/api/documents/health"
        );
    }

    #[test]
    fn rejects_unparseable_base_url() {
        assert!(matches!(
            ApiSettings::new("not a url"),
            Err(ApiError::InvalidRequest(_))
        ));
    }

    #[test]
    fn server_message_prefers_json_fields() {
        assert_eq!(
            server_message(r#"{"message":" Document not found "}"#).as_deref(),
            Some("Document not found")
        );
        assert_eq!(
            server_message(r#"{"error":"bad ids"}"#).as_deref(),
            Some("bad ids")
        );
        assert_eq!(server_message(r#"{"message":""}"#), None);
        assert_eq!(server_message("plain failure\n").as_deref(), Some("plain failure"));
        assert_eq!(server_message("<html>oops</html>"), None);
        assert_eq!(server_message(""), None);
    }
}
