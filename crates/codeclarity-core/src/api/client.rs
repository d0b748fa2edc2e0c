//! Typed endpoint methods for the CodeClarity REST API.
//!
//! Every authenticated call asks the `SessionManager` for a token first,
//! so a token close to expiry is refreshed transparently before the
//! request goes out.

use std::sync::Arc;

use reqwest::Method;
use serde::{de::DeserializeOwned, Serialize};

use super::{ApiError, Transport};
use crate::auth::{AuthError, CredentialStore, SessionManager, TokenRefresher};
use crate::config::Settings;
use crate::models::{
    Analysis, AnalysisCreateRequest, Analyzer, AnalyzerCreateRequest, AuthRequest, AuthTokens,
    Created, LicenseStats, Paginated, Project, ProjectImportRequest, SbomStats, User,
    Vulnerability, VulnerabilityStats,
};

/// Default page size for list endpoints.
pub const DEFAULT_ENTRIES_PER_PAGE: u32 = 20;

/// Workspace used when a results call does not name one.
pub const DEFAULT_WORKSPACE: &str = ".";

/// Percent-encode a query parameter value.
pub fn encode_query_value(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

fn page_query(page: u32, entries_per_page: u32) -> String {
    format!("page={}&entries_per_page={}", page, entries_per_page)
}

/// API client for CodeClarity.
/// Clone is cheap - the transport shares its connection pool.
#[derive(Clone)]
pub struct ApiClient {
    transport: Transport,
    sessions: Option<SessionManager>,
}

impl ApiClient {
    /// Client for unauthenticated calls only (login).
    pub fn new(transport: Transport) -> Self {
        Self {
            transport,
            sessions: None,
        }
    }

    pub fn authenticated(transport: Transport, sessions: SessionManager) -> Self {
        Self {
            transport,
            sessions: Some(sessions),
        }
    }

    /// Build a client whose session refreshes through its own transport.
    pub fn from_settings(
        settings: &Settings,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self, ApiError> {
        let transport = Transport::from_settings(settings)?;
        let refresher: Arc<dyn TokenRefresher> = Arc::new(transport.clone());
        let sessions = SessionManager::new(store, refresher, settings.api_key.clone());
        Ok(Self::authenticated(transport, sessions))
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Transport carrying a currently valid bearer token.
    async fn signed(&self) -> Result<Transport, ApiError> {
        let sessions = self
            .sessions
            .as_ref()
            .ok_or(ApiError::Auth(AuthError::NotAuthenticated))?;
        let token = sessions.acquire_token().await?;
        Ok(self.transport.with_token(token))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.signed().await?.get(path).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.signed().await?.request(Method::POST, path, Some(body)).await
    }

    // ------------------------------------------------------------------
    // Auth
    // ------------------------------------------------------------------

    /// Exchange email and password for a token pair.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<AuthTokens, ApiError> {
        let body = AuthRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.transport.post("/auth/authenticate", &body).await
    }

    pub async fn refresh_token(&self, refresh_token: &str) -> Result<AuthTokens, ApiError> {
        self.transport.refresh(refresh_token).await
    }

    pub async fn current_user(&self) -> Result<User, ApiError> {
        self.get("/auth/user").await
    }

    /// Current user, signed with an explicit token instead of the session.
    /// Used right after login, before the new tokens are stored.
    pub async fn current_user_with_token(&self, token: &str) -> Result<User, ApiError> {
        self.transport
            .with_token(token.to_string())
            .get("/auth/user")
            .await
    }

    // ------------------------------------------------------------------
    // Analyzers
    // ------------------------------------------------------------------

    pub async fn list_analyzers(
        &self,
        org_id: &str,
        page: u32,
        entries_per_page: u32,
    ) -> Result<Paginated<Analyzer>, ApiError> {
        let path = format!(
            "/org/{}/analyzers?{}",
            org_id,
            page_query(page, entries_per_page)
        );
        self.get(&path).await
    }

    pub async fn get_analyzer(&self, org_id: &str, analyzer_id: &str) -> Result<Analyzer, ApiError> {
        self.get(&format!("/org/{}/analyzers/{}", org_id, analyzer_id))
            .await
    }

    pub async fn create_analyzer(
        &self,
        org_id: &str,
        request: &AnalyzerCreateRequest,
    ) -> Result<Created, ApiError> {
        self.post(&format!("/org/{}/analyzers", org_id), request)
            .await
    }

    // ------------------------------------------------------------------
    // Projects
    // ------------------------------------------------------------------

    pub async fn list_projects(
        &self,
        org_id: &str,
        page: u32,
        entries_per_page: u32,
        search: Option<&str>,
    ) -> Result<Paginated<Project>, ApiError> {
        let mut path = format!(
            "/org/{}/projects?{}",
            org_id,
            page_query(page, entries_per_page)
        );
        if let Some(search) = search.filter(|s| !s.is_empty()) {
            path.push_str("&search_key=");
            path.push_str(&encode_query_value(search));
        }
        self.get(&path).await
    }

    pub async fn get_project(&self, org_id: &str, project_id: &str) -> Result<Project, ApiError> {
        self.get(&format!("/org/{}/projects/{}", org_id, project_id))
            .await
    }

    pub async fn import_project(
        &self,
        org_id: &str,
        request: &ProjectImportRequest,
    ) -> Result<Created, ApiError> {
        self.post(&format!("/org/{}/projects", org_id), request)
            .await
    }

    // ------------------------------------------------------------------
    // Analyses
    // ------------------------------------------------------------------

    pub async fn list_analyses(
        &self,
        org_id: &str,
        project_id: &str,
        page: u32,
        entries_per_page: u32,
    ) -> Result<Paginated<Analysis>, ApiError> {
        let path = format!(
            "/org/{}/projects/{}/analyses?{}",
            org_id,
            project_id,
            page_query(page, entries_per_page)
        );
        self.get(&path).await
    }

    pub async fn get_analysis(
        &self,
        org_id: &str,
        project_id: &str,
        analysis_id: &str,
    ) -> Result<Analysis, ApiError> {
        let path = format!(
            "/org/{}/projects/{}/analyses/{}",
            org_id, project_id, analysis_id
        );
        self.get(&path).await
    }

    pub async fn start_analysis(
        &self,
        org_id: &str,
        project_id: &str,
        request: &AnalysisCreateRequest,
    ) -> Result<Created, ApiError> {
        let path = format!("/org/{}/projects/{}/analyses", org_id, project_id);
        self.post(&path, request).await
    }

    // ------------------------------------------------------------------
    // Results
    // ------------------------------------------------------------------

    fn results_path(org_id: &str, project_id: &str, analysis_id: &str, tail: &str) -> String {
        format!(
            "/org/{}/projects/{}/analysis/{}/{}",
            org_id, project_id, analysis_id, tail
        )
    }

    pub async fn vulnerability_stats(
        &self,
        org_id: &str,
        project_id: &str,
        analysis_id: &str,
        workspace: Option<&str>,
    ) -> Result<VulnerabilityStats, ApiError> {
        let workspace = encode_query_value(workspace.unwrap_or(DEFAULT_WORKSPACE));
        let tail = format!("vulnerabilities/stats?workspace={}", workspace);
        self.get(&Self::results_path(org_id, project_id, analysis_id, &tail))
            .await
    }

    pub async fn sbom_stats(
        &self,
        org_id: &str,
        project_id: &str,
        analysis_id: &str,
        workspace: Option<&str>,
    ) -> Result<SbomStats, ApiError> {
        let workspace = encode_query_value(workspace.unwrap_or(DEFAULT_WORKSPACE));
        let tail = format!("sbom/stats?workspace={}", workspace);
        self.get(&Self::results_path(org_id, project_id, analysis_id, &tail))
            .await
    }

    pub async fn license_stats(
        &self,
        org_id: &str,
        project_id: &str,
        analysis_id: &str,
        workspace: Option<&str>,
    ) -> Result<LicenseStats, ApiError> {
        let mut tail = "licenses/stats".to_string();
        if let Some(workspace) = workspace.filter(|w| !w.is_empty()) {
            tail.push_str("?workspace=");
            tail.push_str(&encode_query_value(workspace));
        }
        self.get(&Self::results_path(org_id, project_id, analysis_id, &tail))
            .await
    }

    pub async fn vulnerabilities(
        &self,
        org_id: &str,
        project_id: &str,
        analysis_id: &str,
        page: u32,
        entries_per_page: u32,
        workspace: Option<&str>,
    ) -> Result<Paginated<Vulnerability>, ApiError> {
        let mut tail = format!("vulnerabilities?{}", page_query(page, entries_per_page));
        if let Some(workspace) = workspace.filter(|w| !w.is_empty()) {
            tail.push_str("&workspace=");
            tail.push_str(&encode_query_value(workspace));
        }
        self.get(&Self::results_path(org_id, project_id, analysis_id, &tail))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_query_value() {
        assert_eq!(encode_query_value("."), ".");
        assert_eq!(encode_query_value("my repo/core"), "my+repo%2Fcore");
        assert_eq!(encode_query_value("a&b=c"), "a%26b%3Dc");
    }

    #[test]
    fn test_results_path() {
        assert_eq!(
            ApiClient::results_path("o1", "p1", "a1", "sbom/stats?workspace=."),
            "/org/o1/projects/p1/analysis/a1/sbom/stats?workspace=."
        );
    }

    #[tokio::test]
    async fn test_unauthenticated_client_refuses_signed_calls() {
        let transport = Transport::new("http://127.0.0.1:9", false).unwrap();
        let client = ApiClient::new(transport);
        let err = client.current_user().await.unwrap_err();
        assert!(matches!(err, ApiError::Auth(AuthError::NotAuthenticated)));
    }
}
