use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::models::{Profile, Project};
use crate::services::store::{ProfileDirectory, ProjectDirectory, StoreError};

/// Errors that can occur when interacting with Appwrite
#[derive(Debug, Error)]
pub enum AppwriteError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Unauthorized: invalid API key or token")]
    Unauthorized,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

impl From<AppwriteError> for StoreError {
    fn from(value: AppwriteError) -> Self {
        StoreError::Directory(value.to_string())
    }
}

/// Collection IDs in Appwrite
#[derive(Debug, Clone)]
pub struct AppwriteCollections {
    pub profiles: String,
    pub projects: String,
}

/// Appwrite API client
///
/// Serves as the profile and project directory:
/// - Listing every profile for deck construction
/// - Looking up the current viewer and message participants
/// - Resolving projects for direct message threads
pub struct AppwriteClient {
    base_url: String,
    api_key: String,
    project_id: String,
    database_id: String,
    client: Client,
    collections: AppwriteCollections,
    page_size: usize,
}

impl AppwriteClient {
    /// Create a new Appwrite client
    pub fn new(
        base_url: String,
        api_key: String,
        project_id: String,
        database_id: String,
        collections: AppwriteCollections,
        page_size: usize,
    ) -> Result<Self, AppwriteError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            base_url,
            api_key,
            project_id,
            database_id,
            client,
            collections,
            page_size: page_size.max(1),
        })
    }

    fn documents_url(&self, collection: &str) -> String {
        format!(
            "{}/databases/{}/collections/{}/documents",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(&self.database_id),
            urlencoding::encode(collection)
        )
    }

    /// Run a document query and return the raw documents
    async fn query_documents(&self, collection: &str, queries: &[String]) -> Result<Vec<Value>, AppwriteError> {
        let url = self.documents_url(collection);
        let params: Vec<(&str, &str)> = queries.iter().map(|q| ("queries[]", q.as_str())).collect();

        let response = self
            .client
            .get(&url)
            .query(&params)
            .header("X-Appwrite-Key", &self.api_key)
            .header("X-Appwrite-Project", &self.project_id)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(AppwriteError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "Unable to read body".to_string());
            tracing::error!("Appwrite query on {} failed: {} - {}", collection, status, body);
            return Err(AppwriteError::ApiError(format!("Query on {} failed: {}", collection, status)));
        }

        let json: Value = response.json().await?;

        json.get("documents")
            .and_then(|d| d.as_array())
            .cloned()
            .ok_or_else(|| AppwriteError::InvalidResponse("Missing documents array".into()))
    }

    /// Fetch the first document matching `field == value`
    async fn find_one<T: DeserializeOwned>(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<T>, AppwriteError> {
        let query = serde_json::json!({
            "method": "equal",
            "attribute": field,
            "values": [value],
        })
        .to_string();
        let limit = serde_json::json!({ "method": "limit", "values": [1] }).to_string();

        let documents = self.query_documents(collection, &[query, limit]).await?;

        match documents.first() {
            Some(doc) => parse_document(doc).map(Some),
            None => Ok(None),
        }
    }
}

fn parse_document<T: DeserializeOwned>(doc: &Value) -> Result<T, AppwriteError> {
    // Documents either carry their fields at the top level or under "data"
    let data = doc.get("data").unwrap_or(doc);

    serde_json::from_value(data.clone())
        .map_err(|e| AppwriteError::InvalidResponse(format!("Failed to parse document: {}", e)))
}

#[async_trait]
impl ProfileDirectory for AppwriteClient {
    /// Page through the whole profile collection in directory order
    async fn list_profiles(&self) -> Result<Vec<Profile>, StoreError> {
        let mut profiles = Vec::new();
        let mut offset = 0usize;

        loop {
            let queries = vec![
                serde_json::json!({ "method": "limit", "values": [self.page_size] }).to_string(),
                serde_json::json!({ "method": "offset", "values": [offset] }).to_string(),
            ];
            let documents = self.query_documents(&self.collections.profiles, &queries).await?;
            let fetched = documents.len();

            for doc in &documents {
                match parse_document::<Profile>(doc) {
                    Ok(profile) => profiles.push(profile),
                    Err(e) => tracing::warn!("Skipping malformed profile document: {}", e),
                }
            }

            if fetched < self.page_size {
                break;
            }
            offset += fetched;
        }

        tracing::debug!("Listed {} profiles from Appwrite", profiles.len());
        Ok(profiles)
    }

    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError> {
        tracing::debug!("Fetching profile for user: {}", user_id);
        Ok(self.find_one(&self.collections.profiles, "id", user_id).await?)
    }
}

#[async_trait]
impl ProjectDirectory for AppwriteClient {
    async fn get_project(&self, project_id: &str) -> Result<Option<Project>, StoreError> {
        Ok(self.find_one(&self.collections.projects, "id", project_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client(base_url: String, page_size: usize) -> AppwriteClient {
        let collections = AppwriteCollections {
            profiles: "profiles".to_string(),
            projects: "projects".to_string(),
        };

        AppwriteClient::new(
            base_url,
            "test_key".to_string(),
            "test_project".to_string(),
            "test_db".to_string(),
            collections,
            page_size,
        )
        .unwrap()
    }

    #[test]
    fn test_appwrite_client_creation() {
        let client = client("https://appwrite.test/v1/".to_string(), 0);

        assert_eq!(client.api_key, "test_key");
        assert_eq!(client.page_size, 1);
        assert_eq!(
            client.documents_url("profiles"),
            "https://appwrite.test/v1/databases/test_db/collections/profiles/documents"
        );
    }

    #[tokio::test]
    async fn test_get_profile_parses_document() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/databases/test_db/collections/profiles/documents")
            .match_query(Matcher::Any)
            .match_header("X-Appwrite-Key", "test_key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"total":1,"documents":[{"$id":"doc1","id":"u1","displayName":"Ana","role":"a&r","genres":["Pop"],"onboarded":true}]}"#,
            )
            .create_async()
            .await;

        let profile = client(server.url(), 100).get_profile("u1").await.unwrap().unwrap();

        mock.assert_async().await;
        assert_eq!(profile.display_name, "Ana");
        assert_eq!(profile.role, crate::models::Role::AandR);
        assert!(profile.onboarded);
    }

    #[tokio::test]
    async fn test_missing_project_is_none() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/databases/test_db/collections/projects/documents")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"total":0,"documents":[]}"#)
            .create_async()
            .await;

        let project = client(server.url(), 100).get_project("p1").await.unwrap();
        assert!(project.is_none());
    }

    #[tokio::test]
    async fn test_api_error_maps_to_directory_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/databases/test_db/collections/profiles/documents")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let result = client(server.url(), 100).list_profiles().await;
        assert!(matches!(result, Err(StoreError::Directory(_))));
    }

    #[tokio::test]
    async fn test_list_profiles_pages_until_short_page() {
        let mut server = mockito::Server::new_async().await;
        // Matches the offset query whether or not the matcher sees it percent-encoded
        let offset = |n: usize| {
            Matcher::Regex(format!(
                r#"offset(%22|")(%2C|,)(%22|")values(%22|")(%3A|:)(%5B|\[){}(%5D|\])"#,
                n
            ))
        };
        let page = |ids: &[&str]| {
            let docs: Vec<Value> = ids
                .iter()
                .map(|id| serde_json::json!({"id": id, "displayName": id, "role": "producer"}))
                .collect();
            serde_json::json!({ "total": 3, "documents": docs }).to_string()
        };

        server
            .mock("GET", "/databases/test_db/collections/profiles/documents")
            .match_query(offset(0))
            .with_status(200)
            .with_body(page(&["a", "b"]))
            .create_async()
            .await;
        server
            .mock("GET", "/databases/test_db/collections/profiles/documents")
            .match_query(offset(2))
            .with_status(200)
            .with_body(page(&["c"]))
            .create_async()
            .await;

        let profiles = client(server.url(), 2).list_profiles().await.unwrap();
        let ids: Vec<&str> = profiles.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
