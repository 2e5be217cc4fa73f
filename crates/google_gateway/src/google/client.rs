//! Google REST client bound to one user's access token.

use async_trait::async_trait;
use reqwest::{header, Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use super::drive::{DriveApi, FileListPage, DRIVE_LIST_FIELDS};
use super::sheets::{RangeValues, SheetsApi, ValueInputOption, ValueRange};
use crate::error::{GatewayError, Result};

pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4";

/// Base URLs of the Google APIs the gateway relays to
#[derive(Debug, Clone)]
pub struct GoogleEndpoints {
    pub drive_api_base: String,
    pub sheets_api_base: String,
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        Self {
            drive_api_base: DRIVE_API_BASE.to_string(),
            sheets_api_base: SHEETS_API_BASE.to_string(),
        }
    }
}

/// Google's JSON error envelope: `{"error": {"code", "message", "status"}}`
#[derive(Debug, Deserialize)]
struct GoogleErrorEnvelope {
    error: GoogleErrorBody,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Client handle for one request. Built fresh by the auth gate for each
/// authenticated request; the underlying connection pool is shared.
#[derive(Clone)]
pub struct GoogleClient {
    http: Client,
    access_token: String,
    endpoints: GoogleEndpoints,
}

impl GoogleClient {
    pub fn new(http: Client, access_token: impl Into<String>, endpoints: GoogleEndpoints) -> Self {
        Self {
            http,
            access_token: access_token.into(),
            endpoints,
        }
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    /// `{sheets}/spreadsheets/{id}/values/{range}{suffix}`, with the range
    /// percent-encoded as a single path segment.
    fn values_url(&self, spreadsheet_id: &str, range: &str, suffix: &str) -> Result<Url> {
        let mut url = Url::parse(&self.endpoints.sheets_api_base).map_err(|e| {
            GatewayError::Internal(format!("Invalid Sheets API base URL: {}", e))
        })?;
        url.path_segments_mut()
            .map_err(|_| GatewayError::Internal("Sheets API base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(&["spreadsheets", spreadsheet_id, "values"])
            .push(&format!("{}{}", range, suffix));
        Ok(url)
    }

    async fn handle_response<T: DeserializeOwned>(response: Response, context: &str) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<GoogleErrorEnvelope>(&body) {
                Ok(envelope) => match envelope.error.status {
                    Some(code) => format!("{} ({})", envelope.error.message, code),
                    None => envelope.error.message,
                },
                Err(_) if body.is_empty() => status.to_string(),
                Err(_) => body,
            };
            tracing::warn!("[WARN] Google API error {}: {}", status, message);
            return Err(GatewayError::upstream(context, message));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| GatewayError::upstream(context, format!("Malformed response: {}", e)))
    }

    async fn write_values(
        &self,
        url: Url,
        method: reqwest::Method,
        values: &RangeValues,
        extra_query: &[(&str, &str)],
        context: &str,
    ) -> Result<Value> {
        let response = self
            .http
            .request(method, url)
            .header(header::AUTHORIZATION, self.auth_header())
            .query(extra_query)
            .json(&json!({ "majorDimension": "ROWS", "values": values }))
            .send()
            .await
            .map_err(|e| GatewayError::upstream(context, e.to_string()))?;

        Self::handle_response(response, context).await
    }
}

#[async_trait]
impl DriveApi for GoogleClient {
    async fn list_files_page(&self, page_token: Option<&str>, page_size: u32) -> Result<FileListPage> {
        const CONTEXT: &str = "Failed to list Drive files";

        let url = format!("{}/files", self.endpoints.drive_api_base);
        let page_size = page_size.to_string();

        let mut request = self
            .http
            .get(&url)
            .header(header::AUTHORIZATION, self.auth_header())
            .query(&[("pageSize", page_size.as_str()), ("fields", DRIVE_LIST_FIELDS)]);

        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::upstream(CONTEXT, e.to_string()))?;

        Self::handle_response(response, CONTEXT).await
    }
}

#[async_trait]
impl SheetsApi for GoogleClient {
    async fn get_values(&self, spreadsheet_id: &str, range: &str) -> Result<ValueRange> {
        const CONTEXT: &str = "Failed to read spreadsheet values";

        let url = self.values_url(spreadsheet_id, range, "")?;
        let response = self
            .http
            .get(url)
            .header(header::AUTHORIZATION, self.auth_header())
            .send()
            .await
            .map_err(|e| GatewayError::upstream(CONTEXT, e.to_string()))?;

        Self::handle_response(response, CONTEXT).await
    }

    async fn append_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: &RangeValues,
        input_option: ValueInputOption,
    ) -> Result<Value> {
        let url = self.values_url(spreadsheet_id, range, ":append")?;
        self.write_values(
            url,
            reqwest::Method::POST,
            values,
            &[
                ("valueInputOption", input_option.as_str()),
                ("insertDataOption", "INSERT_ROWS"),
            ],
            "Failed to append spreadsheet values",
        )
        .await
    }

    async fn update_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: &RangeValues,
        input_option: ValueInputOption,
    ) -> Result<Value> {
        let url = self.values_url(spreadsheet_id, range, "")?;
        self.write_values(
            url,
            reqwest::Method::PUT,
            values,
            &[("valueInputOption", input_option.as_str())],
            "Failed to update spreadsheet values",
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client_for(server: &mockito::ServerGuard) -> GoogleClient {
        GoogleClient::new(
            Client::new(),
            "ya29.test",
            GoogleEndpoints {
                drive_api_base: server.url(),
                sheets_api_base: server.url(),
            },
        )
    }

    #[test]
    fn test_values_url_encodes_range() {
        let client = GoogleClient::new(Client::new(), "t", GoogleEndpoints::default());

        let url = client.values_url("abc123", "Sheet1!A1:B2", "").unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/abc123/values/Sheet1!A1:B2"
        );

        let url = client.values_url("abc123", "My Sheet!A1", ":append").unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/abc123/values/My%20Sheet!A1:append"
        );
    }

    #[tokio::test]
    async fn test_list_files_page_sends_page_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/files")
            .match_header("authorization", "Bearer ya29.test")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("pageSize".into(), "1000".into()),
                Matcher::UrlEncoded("fields".into(), DRIVE_LIST_FIELDS.into()),
                Matcher::UrlEncoded("pageToken".into(), "p2".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"files":[{"id":"1","name":"Budget"}],"nextPageToken":"p3"}"#)
            .create_async()
            .await;

        let page = client_for(&server)
            .list_files_page(Some("p2"), 1000)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(page.files.len(), 1);
        assert_eq!(page.next_page_token.as_deref(), Some("p3"));
    }

    #[tokio::test]
    async fn test_google_error_becomes_upstream() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/files")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"error":{"code":401,"message":"Request had invalid authentication credentials.","status":"UNAUTHENTICATED"}}"#,
            )
            .create_async()
            .await;

        let err = client_for(&server).list_files_page(None, 1000).await.unwrap_err();

        match err {
            GatewayError::Upstream { context, message } => {
                assert_eq!(context, "Failed to list Drive files");
                assert_eq!(
                    message,
                    "Request had invalid authentication credentials. (UNAUTHENTICATED)"
                );
            }
            other => panic!("Expected Upstream, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_get_values() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/spreadsheets/id1/values/Sheet1!A1:B2")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"range":"Sheet1!A1:B2","majorDimension":"ROWS"}"#)
            .create_async()
            .await;

        let range = client_for(&server)
            .get_values("id1", "Sheet1!A1:B2")
            .await
            .unwrap();

        assert_eq!(range.range.as_deref(), Some("Sheet1!A1:B2"));
        assert!(range.values.is_none());
    }

    #[tokio::test]
    async fn test_append_values_uses_user_entered() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/spreadsheets/id1/values/Sheet1!A1:append")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("valueInputOption".into(), "USER_ENTERED".into()),
                Matcher::UrlEncoded("insertDataOption".into(), "INSERT_ROWS".into()),
            ]))
            .match_body(Matcher::PartialJson(json!({ "values": [["a", "b"]] })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"spreadsheetId":"id1","updates":{"updatedRows":1}}"#)
            .expect(1)
            .create_async()
            .await;

        let response = client_for(&server)
            .append_values(
                "id1",
                "Sheet1!A1",
                &vec![vec![json!("a"), json!("b")]],
                ValueInputOption::UserEntered,
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response["updates"]["updatedRows"], 1);
    }

    #[tokio::test]
    async fn test_update_values_uses_put() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/spreadsheets/id1/values/Sheet1!A1:B1")
            .match_query(Matcher::UrlEncoded(
                "valueInputOption".into(),
                "USER_ENTERED".into(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"spreadsheetId":"id1","updatedRange":"Sheet1!A1:B1","updatedCells":2}"#)
            .create_async()
            .await;

        let response = client_for(&server)
            .update_values(
                "id1",
                "Sheet1!A1:B1",
                &vec![vec![json!(1), json!("=A1*2")]],
                ValueInputOption::UserEntered,
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response["updatedCells"], 2);
    }
}
