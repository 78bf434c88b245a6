//! Availability lookup through the Sporetrofit sports-center service
//!
//! The sports centers' mobile app talks to an ASMX web service that accepts
//! one form field, `inputJSONStr`, and answers with the JSON result wrapped in
//! an XML `<string>` element:
//!
//! ```text
//! <?xml version="1.0" encoding="utf-8"?>
//! <string xmlns="http://tempuri.org/">{"Data":{"ResultData":{...}}}</string>
//! ```
//!
//! Rows live under `Data.ResultData.AvailableData.DataTable.DataRow`, which is
//! an array, a single object when there is exactly one row, or absent.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::utils::error::TransportError;

/// Public service host
pub const SPORETROFIT_HOST: &str = "http://app.sporetrofit.com:8080";

/// Single entry point every service name is posted to
pub const ENTRY_POINT_URI: &str = "/ws_lohas/service.asmx/EntryPoint";

const ENVELOPE_OPEN: &str = r#"<string xmlns="http://tempuri.org/">"#;
const ENVELOPE_CLOSE: &str = "</string>";

/// User agent of the official iOS app
pub const APP_USER_AGENT: &str =
    "tp-stage/2.0.10 (com.fit-foxconn.TPSportsCenter; build:1; iOS 15.5.0) Alamofire/2.0.10";

/// Identity fields the service expects in every request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppIdentity {
    pub uuid: String,
    pub temp_id: String,
    pub upid: String,
    pub coid: String,
    pub category_id: String,
    pub type_id: String,
    pub lang: String,
}

impl Default for AppIdentity {
    fn default() -> Self {
        Self {
            uuid: "81479C1C-B830-4941-872E-7F0D5216F090".to_string(),
            temp_id: "81479C1C-B830-4941-872E-7F0D5216F090".to_string(),
            upid: "d6f4b8d3-b581-4cc2-8976-da98a9f43c73".to_string(),
            coid: "TP".to_string(),
            category_id: "Badminton".to_string(),
            type_id: "ios".to_string(),
            lang: "zh-Hant-TW".to_string(),
        }
    }
}

/// One bookable time slot of a location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailableSlot {
    #[serde(rename = "allowBooking")]
    pub allow_booking: String,

    /// Remaining fields as the service sent them
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl AvailableSlot {
    pub fn is_bookable(&self) -> bool {
        self.allow_booking == "Y"
    }
}

/// A location returned by a location query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationSummary {
    /// `"{LID}┼{LSID}"`, the key `location_available_data` takes
    pub lid_key: String,
    pub use_date: String,
    pub price: String,
    pub lid_name: String,
    pub lsid_name: String,
}

impl LocationSummary {
    fn from_row(row: &Value) -> Result<Self, TransportError> {
        let field = |name: &str| -> Result<String, TransportError> {
            match row.get(name) {
                Some(Value::String(s)) => Ok(s.clone()),
                Some(Value::Null) | None => Err(TransportError::Malformed(format!(
                    "location row is missing '{name}'"
                ))),
                Some(other) => Ok(other.to_string()),
            }
        };

        Ok(Self {
            lid_key: format!("{}┼{}", field("LID")?, field("LSID")?),
            use_date: field("useDate")?,
            price: field("Price")?,
            lid_name: field("LIDName")?,
            lsid_name: field("LSIDName")?,
        })
    }
}

/// Client for the Sporetrofit entry point
pub struct AvailabilityClient {
    client: Client,
    host: String,
    identity: AppIdentity,
}

impl AvailabilityClient {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        Self::with_host(SPORETROFIT_HOST, timeout)
    }

    /// Client against another host, e.g. a mock server
    pub fn with_host(host: &str, timeout: Duration) -> Result<Self, TransportError> {
        url::Url::parse(host).map_err(|e| TransportError::InvalidUrl(format!("{host}: {e}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(APP_USER_AGENT));

        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            host: host.trim_end_matches('/').to_string(),
            identity: AppIdentity::default(),
        })
    }

    pub fn with_identity(mut self, identity: AppIdentity) -> Self {
        self.identity = identity;
        self
    }

    /// Bookable slots of one location on one day
    pub async fn location_available_data(
        &self,
        lid_key: &str,
        use_date: &str,
    ) -> Result<Vec<AvailableSlot>, TransportError> {
        let id = &self.identity;
        let contents = self
            .query(
                "getResLocationAvailableData",
                json!({
                    "UUID": id.uuid,
                    "typeID": id.type_id,
                    "TempID": id.temp_id,
                    "LIDKey": lid_key,
                    "UseDate": use_date,
                    "COID": id.coid,
                    "UPID": id.upid,
                    "Lang": id.lang,
                }),
            )
            .await?;

        let slots = data_rows(&contents)?
            .into_iter()
            .map(serde_json::from_value::<AvailableSlot>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| TransportError::Malformed(format!("unexpected slot row: {e}")))?;

        Ok(slots.into_iter().filter(AvailableSlot::is_bookable).collect())
    }

    /// Locations with availability in a date and time window
    pub async fn location_query(
        &self,
        start_date: &str,
        end_date: &str,
        start_time: &str,
        end_time: &str,
    ) -> Result<Vec<LocationSummary>, TransportError> {
        let id = &self.identity;
        let contents = self
            .query(
                "getLocationQueryData",
                json!({
                    "UUID": id.uuid,
                    "typeID": id.type_id,
                    "StartDate": start_date,
                    "EndTime": end_time,
                    "StartTime": start_time,
                    "Lang": id.lang,
                    "EndDate": end_date,
                    "TempID": id.temp_id,
                    "CategoryID": id.category_id,
                    "COID": id.coid,
                    "UPID": id.upid,
                }),
            )
            .await?;

        data_rows(&contents)?
            .iter()
            .map(LocationSummary::from_row)
            .collect()
    }

    async fn query(&self, service_name: &str, request_data: Value) -> Result<Value, TransportError> {
        let payload = json!({
            "Data": {
                "serviceName": service_name,
                "RequestData": request_data,
            }
        });
        let input = serde_json::to_string(&payload)
            .map_err(|e| TransportError::Malformed(e.to_string()))?;

        let url = format!("{}{ENTRY_POINT_URI}", self.host);
        tracing::debug!(url = %url, service = service_name, "Querying availability service");

        let response = self
            .client
            .post(&url)
            .form(&[("inputJSONStr", input.as_str())])
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;

        let status = response.status();
        let body = response.text().await.map_err(TransportError::from_reqwest)?;

        if !status.is_success() {
            tracing::error!(
                status = status.as_u16(),
                body = %crate::utils::body_preview(&body),
                "Availability query failed"
            );
            return Err(TransportError::Status(status.as_u16()));
        }

        let json_text = unwrap_envelope(&body)?;
        serde_json::from_str(&json_text)
            .map_err(|e| TransportError::Decode(format!("invalid JSON in envelope: {e}")))
    }
}

/// Extract and entity-decode the JSON text inside the `<string>` wrapper
pub fn unwrap_envelope(body: &str) -> Result<String, TransportError> {
    let inner = body
        .split_once(ENVELOPE_OPEN)
        .and_then(|(_, rest)| rest.split_once(ENVELOPE_CLOSE))
        .map(|(inner, _)| inner)
        .ok_or_else(|| {
            TransportError::Malformed(format!(
                "no <string> envelope in response: {}",
                crate::utils::body_preview(body)
            ))
        })?;

    Ok(html_escape::decode_html_entities(inner).into_owned())
}

/// `Data.ResultData.AvailableData.DataTable.DataRow` as a list
fn data_rows(contents: &Value) -> Result<Vec<Value>, TransportError> {
    let table = contents
        .pointer("/Data/ResultData/AvailableData/DataTable")
        .ok_or_else(|| TransportError::Malformed("response has no DataTable".to_string()))?;

    Ok(match table.get("DataRow") {
        Some(Value::Array(rows)) => rows.clone(),
        Some(Value::Object(row)) => vec![Value::Object(row.clone())],
        _ => Vec::new(),
    })
}
