//! Google Drive API client.

use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use std::sync::Arc;

use pirkit_common::{Error, Result, ResourceId, FOLDER_MIME_TYPE};

use crate::api::{DriveApi, DriveFile, FileList, FileQuery, SharedDrive};

use super::auth::AccessTokenSource;

/// Google Drive API base URL.
const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Fields requested for single files.
const FILE_FIELDS: &str = "id,name,mimeType,parents,webViewLink,trashed";
/// Fields requested for listings.
const LIST_FIELDS: &str = "nextPageToken,files(id,name,mimeType,parents,webViewLink,trashed)";

/// Response from listing shared drives.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveListResponse {
    #[serde(default)]
    drives: Vec<SharedDrive>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Google Drive API client.
pub struct DriveClient {
    http: Client,
    tokens: Arc<dyn AccessTokenSource>,
    /// Shared drive to scope listings to.
    drive_id: Option<String>,
    base_url: String,
}

impl DriveClient {
    /// Create a new Drive client.
    ///
    /// # Errors
    /// - HTTP client construction failure
    pub fn new(
        tokens: Arc<dyn AccessTokenSource>,
        drive_id: Option<String>,
        user_agent: &str,
    ) -> Result<Self> {
        let http = Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| Error::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self::with_http(http, tokens, drive_id))
    }

    /// Create a client around an existing HTTP client.
    pub fn with_http(
        http: Client,
        tokens: Arc<dyn AccessTokenSource>,
        drive_id: Option<String>,
    ) -> Self {
        Self {
            http,
            tokens,
            drive_id,
            base_url: DRIVE_API_BASE.to_string(),
        }
    }

    /// Point the client at a different API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Shared drive listings are scoped to, if any.
    pub fn drive_id(&self) -> Option<&str> {
        self.drive_id.as_deref()
    }

    /// Get authorization header.
    async fn auth_header(&self) -> Result<String> {
        let token = self.tokens.access_token().await?;
        Ok(format!("Bearer {}", token))
    }

    /// Query parameters for a file listing.
    fn list_params(&self, q: Option<String>) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("fields", LIST_FIELDS.to_string()),
            ("supportsAllDrives", "true".to_string()),
            ("includeItemsFromAllDrives", "true".to_string()),
        ];

        if let Some(drive_id) = &self.drive_id {
            params.push(("corpora", "drive".to_string()));
            params.push(("driveId", drive_id.clone()));
        }

        if let Some(q) = q {
            params.push(("q", q));
        }

        params
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        request: RequestBuilder,
        action: &str,
    ) -> Result<T> {
        let auth = self.auth_header().await?;

        let response = request
            .header(header::AUTHORIZATION, auth)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to {}: {}", action, e)))?;

        self.handle_response(response).await
    }

    /// Handle API response with error checking.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| Error::Network(format!("Failed to parse response: {}", e)))
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(status_error(status, body))
        }
    }
}

/// Map a failed response onto the error taxonomy.
fn status_error(status: StatusCode, body: String) -> Error {
    match status {
        StatusCode::NOT_FOUND => Error::NotFound(format!("Resource not found: {}", body)),
        StatusCode::UNAUTHORIZED => {
            Error::Authentication(format!("Invalid or expired token: {}", body))
        }
        StatusCode::FORBIDDEN => Error::PermissionDenied(format!("Access denied: {}", body)),
        _ => Error::Network(format!("API error: {} - {}", status, body)),
    }
}

#[async_trait]
impl DriveApi for DriveClient {
    fn name(&self) -> &str {
        "gdrive"
    }

    async fn list_files(&self, query: &FileQuery) -> Result<FileList> {
        let url = format!("{}/files", self.base_url);
        let request = self
            .http
            .get(&url)
            .query(&self.list_params(Some(query.to_query_string())));

        self.send(request, "list files").await
    }

    async fn get_file(&self, id: &ResourceId) -> Result<DriveFile> {
        let url = format!("{}/files/{}", self.base_url, id);
        let request = self
            .http
            .get(&url)
            .query(&[("fields", FILE_FIELDS), ("supportsAllDrives", "true")]);

        self.send(request, "get file").await
    }

    async fn create_folder(&self, parent: &ResourceId, name: &str) -> Result<DriveFile> {
        let url = format!("{}/files", self.base_url);
        let metadata = serde_json::json!({
            "name": name,
            "mimeType": FOLDER_MIME_TYPE,
            "parents": [parent.as_str()],
        });

        let request = self
            .http
            .post(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .query(&[("fields", FILE_FIELDS), ("supportsAllDrives", "true")])
            .json(&metadata);

        self.send(request, "create folder").await
    }

    async fn copy_file(
        &self,
        source: &ResourceId,
        parent: &ResourceId,
        name: &str,
    ) -> Result<DriveFile> {
        let url = format!("{}/files/{}/copy", self.base_url, source);
        let metadata = serde_json::json!({
            "name": name,
            "parents": [parent.as_str()],
        });

        let request = self
            .http
            .post(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .query(&[("fields", FILE_FIELDS), ("supportsAllDrives", "true")])
            .json(&metadata);

        self.send(request, "copy file").await
    }

    async fn list_drives(&self) -> Result<Vec<SharedDrive>> {
        let url = format!("{}/drives", self.base_url);
        let request = self
            .http
            .get(&url)
            .query(&[("fields", "nextPageToken,drives(id,name)"), ("pageSize", "100")]);

        let response: DriveListResponse = self.send(request, "list drives").await?;
        if response.next_page_token.is_some() {
            tracing::warn!("More shared drives exist than the first page shows");
        }

        Ok(response.drives)
    }

    async fn list_all_files(&self) -> Result<FileList> {
        let url = format!("{}/files", self.base_url);
        let request = self.http.get(&url).query(&self.list_params(None));

        self.send(request, "list files").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gdrive::auth::{StaticTokenSource, Token};
    use crate::gdrive::test_server::serve_once;

    fn id(s: &str) -> ResourceId {
        ResourceId::new(s).unwrap()
    }

    fn client(drive_id: Option<&str>) -> DriveClient {
        DriveClient::new(
            Arc::new(StaticTokenSource::new(Token::bearer("abc"))),
            drive_id.map(str::to_string),
            "pirkit-test",
        )
        .unwrap()
    }

    fn param<'a>(params: &'a [(&'static str, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_list_params_without_shared_drive() {
        let params = client(None).list_params(Some("q-string".to_string()));

        assert_eq!(param(&params, "q"), Some("q-string"));
        assert_eq!(param(&params, "supportsAllDrives"), Some("true"));
        assert_eq!(param(&params, "includeItemsFromAllDrives"), Some("true"));
        assert_eq!(param(&params, "corpora"), None);
        assert_eq!(param(&params, "driveId"), None);
    }

    #[test]
    fn test_list_params_scoped_to_shared_drive() {
        let client = client(Some("0ABCdrive"));
        let params = client.list_params(None);

        assert_eq!(client.drive_id(), Some("0ABCdrive"));
        assert_eq!(param(&params, "corpora"), Some("drive"));
        assert_eq!(param(&params, "driveId"), Some("0ABCdrive"));
        assert_eq!(param(&params, "q"), None);
        assert!(param(&params, "fields").unwrap().contains("webViewLink"));
    }

    #[test]
    fn test_status_error_mapping() {
        assert!(matches!(
            status_error(StatusCode::NOT_FOUND, String::new()),
            Error::NotFound(_)
        ));
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, String::new()),
            Error::Authentication(_)
        ));
        assert!(matches!(
            status_error(StatusCode::FORBIDDEN, String::new()),
            Error::PermissionDenied(_)
        ));
        match status_error(StatusCode::INTERNAL_SERVER_ERROR, "boom".to_string()) {
            Error::Network(msg) => assert!(msg.contains("500") && msg.contains("boom")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_base_url_override() {
        let client = client(None).with_base_url("http://127.0.0.1:9999/drive/v3/");
        assert_eq!(client.base_url, "http://127.0.0.1:9999/drive/v3");
        assert_eq!(client.name(), "gdrive");
    }

    #[test]
    fn test_drive_list_response() {
        let json = r#"{"drives": [{"id": "0ABC", "name": "Engineering"}]}"#;
        let response: DriveListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.drives[0].name, "Engineering");
        assert!(response.next_page_token.is_none());
    }

    #[tokio::test]
    async fn test_copy_file_posts_name_and_parent() {
        let (base, request) = serve_once(
            200,
            r#"{"id": "D9", "name": "TEMPLATE", "mimeType": "application/vnd.google-apps.document", "parents": ["F1"]}"#,
        )
        .await;
        let client = client(None).with_base_url(base);

        let copy = client
            .copy_file(&id("T0"), &id("F1"), "TEMPLATE")
            .await
            .unwrap();
        assert_eq!(copy.id, "D9");

        let request = request.await.unwrap();
        assert_eq!(request.method, "POST");
        assert!(request.target.starts_with("/files/T0/copy?"));
        assert!(request.target.contains("supportsAllDrives=true"));
        assert!(request.headers.contains("authorization: bearer abc"));

        let body = request.json();
        assert_eq!(body["name"], "TEMPLATE");
        assert_eq!(body["parents"], serde_json::json!(["F1"]));
        assert!(body.get("mimeType").is_none());
    }

    #[tokio::test]
    async fn test_create_folder_posts_folder_metadata() {
        let (base, request) = serve_once(
            200,
            r#"{"id": "F2", "name": "Team", "mimeType": "application/vnd.google-apps.folder", "parents": ["F1"]}"#,
        )
        .await;
        let client = client(None).with_base_url(base);

        let folder = client.create_folder(&id("F1"), "Team").await.unwrap();
        assert!(folder.is_folder());

        let request = request.await.unwrap();
        assert_eq!(request.method, "POST");
        assert!(request.target.starts_with("/files?"));

        let body = request.json();
        assert_eq!(body["name"], "Team");
        assert_eq!(body["mimeType"], FOLDER_MIME_TYPE);
        assert_eq!(body["parents"], serde_json::json!(["F1"]));
    }

    #[tokio::test]
    async fn test_list_files_sends_query_scoped_to_shared_drive() {
        let (base, request) = serve_once(
            200,
            r#"{"files": [{"id": "D1", "name": "TEMPLATE", "mimeType": "application/vnd.google-apps.document", "parents": ["F1"]}], "nextPageToken": "next"}"#,
        )
        .await;
        let client = client(Some("0ABCdrive")).with_base_url(base);

        let list = client
            .list_files(&FileQuery::document(id("F1"), "TEMPLATE"))
            .await
            .unwrap();
        assert_eq!(list.files.len(), 1);
        assert_eq!(list.next_page_token.as_deref(), Some("next"));

        let request = request.await.unwrap();
        assert_eq!(request.method, "GET");
        assert!(request.target.starts_with("/files?"));
        assert!(request.target.contains("corpora=drive"));
        assert!(request.target.contains("driveId=0ABCdrive"));
        assert!(request.target.contains("q="));
    }

    #[tokio::test]
    async fn test_missing_file_maps_to_not_found() {
        let (base, request) = serve_once(404, r#"{"error": {"code": 404}}"#).await;
        let client = client(None).with_base_url(base);

        let result = client.get_file(&id("gone")).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
        assert!(request.await.unwrap().target.starts_with("/files/gone?"));
    }
}
