// ABOUTME: Google Drive v3 and Sheets v4 client implementing the document provider
// ABOUTME: Template lookup, copies, link sharing, sheet protections, and single-cell reads and writes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

//! Google Workspace document provider
//!
//! Authenticates with an access token supplied by the deployment. Token
//! acquisition and refresh are outside this crate.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use url::Url;

use super::{CellValue, DocumentProvider, DocumentRef};
use crate::config::DocumentConfig;
use crate::constants::{limits, service_names};
use crate::errors::{AppError, AppResult};
use crate::models::MonthKey;

const DRIVE_BASE_URL: &str = "https://www.googleapis.com/drive/v3";
const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4";
const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";
const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
const TEMPLATE_MARKER: &str = "シフト提出テンプレ";

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    mime_type: String,
}

#[derive(Debug, Deserialize)]
struct PermissionList {
    #[serde(default)]
    permissions: Vec<Permission>,
}

#[derive(Debug, Deserialize)]
struct Permission {
    id: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpreadsheetLayout {
    #[serde(default)]
    sheets: Vec<SheetLayout>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetLayout {
    properties: SheetProperties,
    #[serde(default)]
    protected_ranges: Vec<ProtectedRange>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProtectedRange {
    protected_range_id: i64,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Drive and Sheets API client
pub struct GoogleClient {
    config: DocumentConfig,
    http_client: Client,
    drive_base_url: String,
    sheets_base_url: String,
}

impl GoogleClient {
    /// Create a client against the public Google endpoints
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn new(config: DocumentConfig) -> AppResult<Self> {
        Self::with_base_urls(config, DRIVE_BASE_URL, SHEETS_BASE_URL)
    }

    /// Create a client against custom endpoints
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn with_base_urls(
        config: DocumentConfig,
        drive_base_url: &str,
        sheets_base_url: &str,
    ) -> AppResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(limits::HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            config,
            http_client,
            drive_base_url: drive_base_url.trim_end_matches('/').to_owned(),
            sheets_base_url: sheets_base_url.trim_end_matches('/').to_owned(),
        })
    }

    fn token(&self) -> AppResult<&str> {
        self.config
            .access_token
            .as_deref()
            .ok_or_else(|| AppError::config("Google access token is not configured"))
    }

    fn url(&self, base: &str, segments: &[&str]) -> AppResult<Url> {
        let mut url = Url::parse(base)
            .map_err(|e| AppError::config(format!("Invalid API base URL '{base}': {e}")))?;
        url.path_segments_mut()
            .map_err(|()| AppError::config(format!("API base URL cannot take a path: {base}")))?
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> AppResult<RequestBuilder> {
        Ok(self
            .http_client
            .request(method, url)
            .bearer_auth(self.token()?))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> AppResult<T> {
        let response = request
            .send()
            .await
            .map_err(|e| AppError::external_service(service_names::GOOGLE_API, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let excerpt: String = body.chars().take(300).collect();
            warn!(what, %status, body = %excerpt, "Google API request failed");
            return Err(AppError::external_service(
                service_names::GOOGLE_API,
                format!("{what} failed with HTTP {status}"),
            ));
        }

        response.json().await.map_err(|e| {
            AppError::external_service(
                service_names::GOOGLE_API,
                format!("{what}: JSON parse error: {e}"),
            )
        })
    }

    async fn list_files(&self, query: &str, what: &str) -> AppResult<Vec<DriveFile>> {
        let url = self.url(&self.drive_base_url, &["files"])?;
        let request = self.request(Method::GET, url)?.query(&[
            ("q", query),
            ("fields", "files(id,name,mimeType)"),
            ("pageSize", "1000"),
            ("supportsAllDrives", "true"),
            ("includeItemsFromAllDrives", "true"),
        ]);
        let list: FileList = self.send_json(request, what).await?;
        Ok(list.files)
    }

    async fn layout(&self, doc: &DocumentRef) -> AppResult<SpreadsheetLayout> {
        let url = self.url(&self.sheets_base_url, &["spreadsheets", doc.id()])?;
        let request = self.request(Method::GET, url)?.query(&[(
            "fields",
            "sheets(properties(sheetId),protectedRanges(protectedRangeId,description))",
        )]);
        self.send_json(request, "read spreadsheet layout").await
    }

    async fn batch_update(&self, doc: &DocumentRef, requests: Vec<Value>, what: &str) -> AppResult<()> {
        if requests.is_empty() {
            return Ok(());
        }
        let url = self.url(
            &self.sheets_base_url,
            &["spreadsheets", &format!("{}:batchUpdate", doc.id())],
        )?;
        let request = self
            .request(Method::POST, url)?
            .json(&json!({ "requests": requests }));
        let _: Value = self.send_json(request, what).await?;
        Ok(())
    }

    async fn create_permission(&self, doc: &DocumentRef, body: Value, what: &str) -> AppResult<()> {
        let url = self.url(&self.drive_base_url, &["files", doc.id(), "permissions"])?;
        let request = self
            .request(Method::POST, url)?
            .query(&[("sendNotificationEmail", "false"), ("supportsAllDrives", "true")])
            .json(&body);
        let _: Value = self.send_json(request, what).await?;
        Ok(())
    }
}

fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// A template candidate must start with the month and carry the marker
fn is_template_for(file: &DriveFile, month: MonthKey) -> bool {
    file.mime_type == SPREADSHEET_MIME
        && file.name.starts_with(&month.to_string())
        && file.name.contains(TEMPLATE_MARKER)
}

#[async_trait]
impl DocumentProvider for GoogleClient {
    async fn find_template(&self, month: MonthKey) -> AppResult<Option<DocumentRef>> {
        let folder = self
            .config
            .template_folder_id
            .as_deref()
            .ok_or_else(|| AppError::config("Template folder is not configured"))?;
        let query = format!("'{}' in parents and trashed = false", quote(folder));
        let files = self.list_files(&query, "list templates").await?;
        Ok(files
            .iter()
            .find(|f| is_template_for(f, month))
            .map(|f| DocumentRef::new(f.id.clone())))
    }

    async fn ensure_month_folder(&self, month: MonthKey) -> AppResult<String> {
        let parent = self
            .config
            .copies_parent_folder_id
            .as_deref()
            .ok_or_else(|| AppError::config("Copies parent folder is not configured"))?;
        let name = month.to_string();
        let query = format!(
            "'{}' in parents and name = '{}' and mimeType = '{FOLDER_MIME}' and trashed = false",
            quote(parent),
            quote(&name)
        );
        if let Some(existing) = self.list_files(&query, "find month folder").await?.into_iter().next() {
            return Ok(existing.id);
        }

        let url = self.url(&self.drive_base_url, &["files"])?;
        let request = self
            .request(Method::POST, url)?
            .query(&[("supportsAllDrives", "true")])
            .json(&json!({ "name": name, "mimeType": FOLDER_MIME, "parents": [parent] }));
        let created: DriveFile = self.send_json(request, "create month folder").await?;
        info!(month = %month, folder_id = %created.id, "Created month folder");
        Ok(created.id)
    }

    async fn copy_template(
        &self,
        template: &DocumentRef,
        dest_folder: &str,
        name: &str,
    ) -> AppResult<DocumentRef> {
        let url = self.url(&self.drive_base_url, &["files", template.id(), "copy"])?;
        let request = self
            .request(Method::POST, url)?
            .query(&[("supportsAllDrives", "true")])
            .json(&json!({ "name": name, "parents": [dest_folder] }));
        let copied: DriveFile = self.send_json(request, "copy template").await?;
        debug!(template = %template, copy = %copied.id, "Copied template");
        Ok(DocumentRef::new(copied.id))
    }

    async fn set_public_editable(&self, doc: &DocumentRef) -> AppResult<()> {
        self.create_permission(
            doc,
            json!({ "type": "anyone", "role": "writer" }),
            "share document for editing",
        )
        .await
    }

    async fn set_public_view_only(&self, doc: &DocumentRef) -> AppResult<()> {
        let url = self.url(&self.drive_base_url, &["files", doc.id(), "permissions"])?;
        let request = self
            .request(Method::GET, url)?
            .query(&[("fields", "permissions(id,type)"), ("supportsAllDrives", "true")]);
        let list: PermissionList = self.send_json(request, "list permissions").await?;

        match list.permissions.iter().find(|p| p.kind == "anyone") {
            Some(anyone) => {
                let url = self.url(
                    &self.drive_base_url,
                    &["files", doc.id(), "permissions", &anyone.id],
                )?;
                let request = self
                    .request(Method::PATCH, url)?
                    .query(&[("supportsAllDrives", "true")])
                    .json(&json!({ "role": "reader" }));
                let _: Value = self.send_json(request, "restrict link sharing").await?;
                Ok(())
            }
            None => {
                self.create_permission(
                    doc,
                    json!({ "type": "anyone", "role": "reader" }),
                    "share document read-only",
                )
                .await
            }
        }
    }

    async fn ensure_principal_can_edit(&self, doc: &DocumentRef) -> AppResult<()> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Capabilities {
            #[serde(default)]
            can_edit: bool,
        }
        #[derive(Deserialize)]
        struct FileCapabilities {
            capabilities: Capabilities,
        }

        let url = self.url(&self.drive_base_url, &["files", doc.id()])?;
        let request = self
            .request(Method::GET, url)?
            .query(&[("fields", "capabilities(canEdit)"), ("supportsAllDrives", "true")]);
        let file: FileCapabilities = self.send_json(request, "read capabilities").await?;
        if file.capabilities.can_edit {
            return Ok(());
        }

        let principal = self.principal().await?;
        self.create_permission(
            doc,
            json!({ "type": "user", "role": "writer", "emailAddress": principal }),
            "grant principal edit access",
        )
        .await
    }

    async fn protect_all_sheets(&self, doc: &DocumentRef, description: &str) -> AppResult<()> {
        let principal = self.principal().await?;
        let layout = self.layout(doc).await?;
        let requests = layout
            .sheets
            .iter()
            .map(|sheet| {
                json!({
                    "addProtectedRange": {
                        "protectedRange": {
                            "range": { "sheetId": sheet.properties.sheet_id },
                            "description": description,
                            "warningOnly": false,
                            "editors": { "users": [principal] }
                        }
                    }
                })
            })
            .collect();
        self.batch_update(doc, requests, "protect sheets").await
    }

    async fn remove_protections(
        &self,
        doc: &DocumentRef,
        description: Option<&str>,
    ) -> AppResult<usize> {
        let layout = self.layout(doc).await?;
        let requests: Vec<Value> = layout
            .sheets
            .iter()
            .flat_map(|sheet| sheet.protected_ranges.iter())
            .filter(|p| description.is_none_or(|d| p.description.as_deref() == Some(d)))
            .map(|p| json!({ "deleteProtectedRange": { "protectedRangeId": p.protected_range_id } }))
            .collect();
        let removed = requests.len();
        self.batch_update(doc, requests, "remove protections").await?;
        Ok(removed)
    }

    async fn read_flag(&self, doc: &DocumentRef, cell: &str) -> AppResult<bool> {
        let url = self.url(&self.sheets_base_url, &["spreadsheets", doc.id(), "values", cell])?;
        let request = self
            .request(Method::GET, url)?
            .query(&[("valueRenderOption", "UNFORMATTED_VALUE")]);
        let range: ValueRange = self.send_json(request, "read flag").await?;
        Ok(range
            .values
            .first()
            .and_then(|row| row.first())
            .is_some_and(|v| v == &Value::Bool(true)))
    }

    async fn write_cell(&self, doc: &DocumentRef, cell: &str, value: CellValue) -> AppResult<()> {
        let value = match value {
            CellValue::Bool(b) => Value::Bool(b),
            CellValue::Text(t) => Value::String(t),
        };
        let url = self.url(&self.sheets_base_url, &["spreadsheets", doc.id(), "values", cell])?;
        let request = self
            .request(Method::PUT, url)?
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({ "range": cell, "values": [[value]] }));
        let _: Value = self.send_json(request, "write cell").await?;
        Ok(())
    }

    async fn principal(&self) -> AppResult<String> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct User {
            email_address: String,
        }
        #[derive(Deserialize)]
        struct About {
            user: User,
        }

        let url = self.url(&self.drive_base_url, &["about"])?;
        let request = self
            .request(Method::GET, url)?
            .query(&[("fields", "user(emailAddress)")]);
        let about: About = self.send_json(request, "read principal").await?;
        Ok(about.user.email_address)
    }

    async fn owner(&self, doc: &DocumentRef) -> AppResult<String> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Owner {
            email_address: String,
        }
        #[derive(Deserialize)]
        struct Owners {
            #[serde(default)]
            owners: Vec<Owner>,
        }

        let url = self.url(&self.drive_base_url, &["files", doc.id()])?;
        let request = self
            .request(Method::GET, url)?
            .query(&[("fields", "owners(emailAddress)"), ("supportsAllDrives", "true")]);
        let file: Owners = self.send_json(request, "read owner").await?;
        file.owners
            .into_iter()
            .next()
            .map(|o| o.email_address)
            .ok_or_else(|| AppError::not_found(format!("Owner of document {doc}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, mime: &str) -> DriveFile {
        DriveFile {
            id: "id".to_owned(),
            name: name.to_owned(),
            mime_type: mime.to_owned(),
        }
    }

    #[test]
    fn template_must_match_month_marker_and_type() {
        let month = MonthKey::new(2026, 1).unwrap();
        assert!(is_template_for(&file("2026-01_シフト提出テンプレ", SPREADSHEET_MIME), month));
        assert!(!is_template_for(&file("2026-02_シフト提出テンプレ", SPREADSHEET_MIME), month));
        assert!(!is_template_for(&file("2026-01_メモ", SPREADSHEET_MIME), month));
        assert!(!is_template_for(&file("2026-01_シフト提出テンプレ", FOLDER_MIME), month));
    }

    #[test]
    fn cell_ranges_are_path_encoded() {
        let client = GoogleClient::new(DocumentConfig::default()).unwrap();
        let url = client
            .url(&client.sheets_base_url, &["spreadsheets", "abc", "values", "Input!C2"])
            .unwrap();
        assert!(url.as_str().ends_with("/spreadsheets/abc/values/Input!C2"));
    }

    #[test]
    fn query_values_are_escaped() {
        assert_eq!(quote("a'b"), "a\\'b");
    }
}
