//! # Sheets Client
//!
//! Authenticated calls against one spreadsheet. Everything that talks to the
//! remote service goes through a [`SheetsClient`]: the direct
//! [`Spreadsheet`](crate::spreadsheet::Spreadsheet) API and the background
//! uploader behind [`AtomicSheet`](crate::sheet::AtomicSheet).
//!
//! | Call | Request |
//! |------|---------|
//! | [`fetch_spreadsheet`](SheetsClient::fetch_spreadsheet) | `GET {base}/{id}` |
//! | [`load_sheet`](SheetsClient::load_sheet) | `GET {base}/{id}?fields=...&ranges={title}`, then `addSheet` if missing |
//! | [`batch_update`](SheetsClient::batch_update) | `POST {base}/{id}:batchUpdate` |
//! | [`read_values`](SheetsClient::read_values) | `GET {base}/{id}/values/{range}` |
//! | [`write_values`](SheetsClient::write_values) | `PUT {base}/{id}/values/{range}?valueInputOption=USER_ENTERED` |
//!
//! Each call asks the [`Authenticator`] for the spreadsheets scope and sends
//! the result as an `Authorization: Bearer` header.

use std::sync::Arc;

use tracing::{debug, info};
use url::Url;

use crate::auth::{Authenticator, Scope};
use crate::cache::Grid;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::location::Location;
use crate::operation::{Operation, Operations};
use crate::schema::{
    BatchUpdateResponse, Sheet, SheetProperties, SpreadsheetResource, ValuesRange, WriteResponse,
};
use crate::transport::{execute, HttpRequest, ReqwestTransport, Transport};
use crate::types::{Dimension, Extent, SheetId, SpreadsheetId};

/// Field mask used when loading a sheet's snapshot.
pub const LOAD_FIELDS: &str = "sheets.properties,sheets.data.rowData.values.userEnteredValue";

/// A sheet's remote state as loaded (or just created).
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSheet {
    pub properties: SheetProperties,
    pub sheet_id: SheetId,
    pub rows: Grid,
    pub extent: Extent,
    /// True if the sheet didn't exist and was added by the load.
    pub created: bool,
}

impl LoadedSheet {
    fn from_sheet(sheet: Sheet, created: bool) -> Result<Self> {
        let sheet_id = sheet.properties.sheet_id.ok_or_else(|| {
            Error::UnexpectedResponse(format!("sheet '{}' has no sheetId", sheet.properties.title))
        })?;
        let (columns, rows) = sheet.extent();
        Ok(Self {
            rows: sheet.rows_text(),
            extent: Extent::new(columns, rows),
            sheet_id,
            properties: sheet.properties,
            created,
        })
    }
}

/// Authenticated access to one spreadsheet.
#[derive(Clone)]
pub struct SheetsClient {
    spreadsheet_id: SpreadsheetId,
    authenticator: Arc<dyn Authenticator>,
    transport: Arc<dyn Transport>,
    config: ClientConfig,
    scope: Scope,
}

impl SheetsClient {
    pub fn new(
        spreadsheet_id: impl Into<SpreadsheetId>,
        authenticator: Arc<dyn Authenticator>,
        transport: Arc<dyn Transport>,
        config: ClientConfig,
    ) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            authenticator,
            transport,
            config,
            scope: Scope::sheets(),
        }
    }

    /// A client using [`ReqwestTransport`] with the configured timeout.
    pub fn with_reqwest(
        spreadsheet_id: impl Into<SpreadsheetId>,
        authenticator: Arc<dyn Authenticator>,
        config: ClientConfig,
    ) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new(&config)?);
        Ok(Self::new(spreadsheet_id, authenticator, transport, config))
    }

    /// Requests `scope` instead of the default spreadsheets scope.
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn spreadsheet_id(&self) -> &SpreadsheetId {
        &self.spreadsheet_id
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// `{base}/{id}`
    pub fn spreadsheet_url(&self) -> String {
        format!("{}/{}", self.config.api_base_url, self.spreadsheet_id)
    }

    fn values_url(&self, range: &str) -> Result<String> {
        let mut url = Url::parse(&self.spreadsheet_url())
            .map_err(|e| Error::Config(format!("invalid api base url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| Error::Config("api base url cannot have a path".to_string()))?
            .push("values")
            .push(range);
        Ok(url.to_string())
    }

    async fn authorized(&self, request: HttpRequest) -> Result<HttpRequest> {
        let headers = self.authenticator.authorization_header(&self.scope).await?;
        Ok(request.headers(headers))
    }

    // =========================================================================
    // Spreadsheet Calls
    // =========================================================================

    /// Fetches the spreadsheet's properties and sheet list.
    pub async fn fetch_spreadsheet(&self) -> Result<SpreadsheetResource> {
        let request = self.authorized(HttpRequest::get(self.spreadsheet_url())).await?;
        execute(self.transport.as_ref(), request).await
    }

    /// Loads the sheet titled `title` with its cell values, adding the sheet
    /// if the spreadsheet doesn't have one.
    pub async fn load_sheet(&self, title: &str) -> Result<LoadedSheet> {
        let request = self
            .authorized(
                HttpRequest::get(self.spreadsheet_url())
                    .query("fields", LOAD_FIELDS)
                    .query("ranges", quote_sheet(title)),
            )
            .await?;

        let existing = match execute::<SpreadsheetResource>(self.transport.as_ref(), request).await {
            Ok(resource) => resource
                .sheets
                .into_iter()
                .find(|s| s.properties.title == title),
            // An unknown sheet name is an unparsable range.
            Err(Error::Api { status: 400, message }) => {
                debug!(title, %message, "sheet lookup rejected, creating sheet");
                None
            }
            Err(e) => return Err(e),
        };

        if let Some(sheet) = existing {
            let loaded = LoadedSheet::from_sheet(sheet, false)?;
            info!(
                title,
                sheet_id = %loaded.sheet_id,
                extent = %loaded.extent,
                rows = loaded.rows.len(),
                "sheet loaded"
            );
            return Ok(loaded);
        }

        let properties = self.add_sheet(title, None).await?;
        let loaded = LoadedSheet::from_sheet(Sheet::new(properties), true)?;
        info!(title, sheet_id = %loaded.sheet_id, "sheet created");
        Ok(loaded)
    }

    /// Adds a sheet and returns the properties the service assigned.
    pub async fn add_sheet(
        &self,
        title: &str,
        grid: Option<crate::schema::GridProperties>,
    ) -> Result<SheetProperties> {
        let response = self.batch_update(Operation::add_sheet(title, grid)).await?;
        response
            .added_sheet()
            .cloned()
            .ok_or_else(|| Error::UnexpectedResponse("addSheet reply missing".to_string()))
    }

    /// Sends one batch-update call holding `operations` in order.
    pub async fn batch_update(&self, operations: impl Into<Operations>) -> Result<BatchUpdateResponse> {
        let operations = operations.into();
        debug!(requests = operations.len(), "batch update");
        let url = format!("{}:batchUpdate", self.spreadsheet_url());
        let request = self
            .authorized(HttpRequest::post(url))
            .await?
            .json(&operations)?;
        execute(self.transport.as_ref(), request).await
    }

    // =========================================================================
    // Values Calls
    // =========================================================================

    /// Reads the values of `sheet`, optionally limited to `from..=to`.
    pub async fn read_values(
        &self,
        sheet: &str,
        range: Option<(&Location, &Location)>,
    ) -> Result<ValuesRange> {
        let range = match range {
            Some((from, to)) => format!("{}!{}:{}", quote_sheet(sheet), from, to),
            None => quote_sheet(sheet),
        };
        let request = self.authorized(HttpRequest::get(self.values_url(&range)?)).await?;
        execute(self.transport.as_ref(), request).await
    }

    /// Writes `data` starting at `from`; rows or columns per `dimension`.
    pub async fn write_values(
        &self,
        sheet: Option<&str>,
        data: Grid,
        from: &Location,
        dimension: Dimension,
    ) -> Result<WriteResponse> {
        let (col, row) = from.celled();
        let cell = Location::cell(col, row);
        let range = match sheet {
            Some(sheet) => format!("{}!{}", quote_sheet(sheet), cell),
            None => cell.to_string(),
        };
        let body = ValuesRange::new(dimension, range.as_str(), Some(data))?;
        let request = self
            .authorized(
                HttpRequest::put(self.values_url(&range)?).query("valueInputOption", "USER_ENTERED"),
            )
            .await?
            .json(&body)?;
        execute(self.transport.as_ref(), request).await
    }
}

/// Quotes a sheet title for use in A1 notation when it isn't a plain word.
pub fn quote_sheet(title: &str) -> String {
    if !title.is_empty() && title.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        title.to_string()
    } else {
        format!("'{}'", title.replace('\'', "''"))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parse_range;

    #[test]
    fn test_quote_sheet() {
        assert_eq!(quote_sheet("Sheet1"), "Sheet1");
        assert_eq!(quote_sheet("My Sheet"), "'My Sheet'");
        assert_eq!(quote_sheet("Bob's"), "'Bob''s'");

        let (sheet, start, _) = parse_range(&format!("{}!B2", quote_sheet("Bob's"))).unwrap();
        assert_eq!(sheet, "Bob's");
        assert_eq!(start, Location::cell(1, 1));
    }

    #[test]
    fn test_loaded_sheet_requires_id() {
        let err = LoadedSheet::from_sheet(Sheet::new(SheetProperties::titled("x")), false)
            .unwrap_err();
        assert!(matches!(err, Error::UnexpectedResponse(_)));
    }
}
