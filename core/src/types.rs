//! Wire DTOs for the sendwithus API.
//!
//! # Design
//! Every field is optional on the wire: missing fields decode to their zero
//! value (`#[serde(default)]`), an explicit `null` decodes the same way,
//! and zero values are left out when encoding,
//! so a struct with one field set serializes to a one-key object. Unknown
//! response fields are ignored.
//!
//! Shared shapes are composed by value and flattened on the wire: `Sender`
//! carries a `Recipient`, `Log` carries a `LogEvent`.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize};

fn is_zero(value: &i64) -> bool {
    *value == 0
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Decodes an explicit `null` as the zero value, like a missing key.
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// An email template and its versions, in server order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Template {
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_default")]
    pub id: String,
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "null_default")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "is_zero", deserialize_with = "null_default")]
    pub created: i64,
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "null_default")]
    pub versions: Vec<Version>,
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_default")]
    pub name: String,
}

/// One content revision of a template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Version {
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_default")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_default")]
    pub id: String,
    #[serde(skip_serializing_if = "is_zero", deserialize_with = "null_default")]
    pub created: i64,
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_default")]
    pub html: String,
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_default")]
    pub text: String,
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_default")]
    pub subject: String,
    #[serde(skip_serializing_if = "is_false", deserialize_with = "null_default")]
    pub published: bool,
}

/// Address and display name of a recipient.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Recipient {
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_default")]
    pub address: String,
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_default")]
    pub name: String,
}

impl Recipient {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: String::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// A sender: a recipient-shaped address plus an optional reply-to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sender {
    #[serde(flatten)]
    pub from: Recipient,
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_default")]
    pub reply_to: String,
}

impl Sender {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            from: Recipient::new(address),
            reply_to: String::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.from.name = name.into();
        self
    }

    pub fn with_reply_to(mut self, reply_to: impl Into<String>) -> Self {
        self.reply_to = reply_to.into();
        self
    }
}

/// Inline or file attachment; `data` is base64 encoded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attachment {
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_default")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_default")]
    pub data: String,
}

impl Attachment {
    /// Builds an attachment from raw bytes, base64 encoding them.
    pub fn from_bytes(id: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            id: id.into(),
            data: B64.encode(bytes),
        }
    }
}

/// A single transactional send.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Email {
    /// Template to render.
    #[serde(
        rename = "email_id",
        skip_serializing_if = "String::is_empty",
        deserialize_with = "null_default"
    )]
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<Recipient>,
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "null_default")]
    pub cc: Vec<Recipient>,
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "null_default")]
    pub bcc: Vec<Recipient>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<Sender>,
    #[serde(skip_serializing_if = "HashMap::is_empty", deserialize_with = "null_default")]
    pub email_data: HashMap<String, serde_json::Value>,
    #[serde(skip_serializing_if = "HashMap::is_empty", deserialize_with = "null_default")]
    pub headers: HashMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "null_default")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline: Option<Attachment>,
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "null_default")]
    pub files: Vec<Attachment>,
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_default")]
    pub esp_account: String,
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_default")]
    pub version_name: String,
}

/// Parameters for enrolling a recipient in a drip campaign.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DripCampaign {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<Recipient>,
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "null_default")]
    pub cc: Vec<Recipient>,
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "null_default")]
    pub bcc: Vec<Recipient>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<Sender>,
    #[serde(skip_serializing_if = "HashMap::is_empty", deserialize_with = "null_default")]
    pub email_data: HashMap<String, serde_json::Value>,
    #[serde(skip_serializing_if = "HashMap::is_empty", deserialize_with = "null_default")]
    pub headers: HashMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "null_default")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_default")]
    pub esp_account: String,
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_default")]
    pub locale: String,
}

/// Filters for listing logs. Sent as a URL query, never as JSON; zero
/// values are left out of the query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogQuery {
    pub count: u32,
    pub offset: u32,
    pub created_gt: i64,
    pub created_gte: i64,
    pub created_lt: i64,
    pub created_lte: i64,
}

impl LogQuery {
    /// Encodes the non-zero filters, keys in sorted order.
    pub fn to_query_string(&self) -> String {
        let pairs: [(&str, i64); 6] = [
            ("count", i64::from(self.count)),
            ("created_gt", self.created_gt),
            ("created_gte", self.created_gte),
            ("created_lt", self.created_lt),
            ("created_lte", self.created_lte),
            ("offset", i64::from(self.offset)),
        ];
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in pairs.iter().filter(|(_, value)| *value != 0) {
            query.append_pair(key, &value.to_string());
        }
        query.finish()
    }
}

/// One event recorded against a log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogEvent {
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_default")]
    pub object: String,
    #[serde(skip_serializing_if = "is_zero", deserialize_with = "null_default")]
    pub created: i64,
    #[serde(
        rename = "type",
        skip_serializing_if = "String::is_empty",
        deserialize_with = "null_default"
    )]
    pub kind: String,
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_default")]
    pub message: String,
}

/// A provider-side record of one send.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Log {
    #[serde(flatten)]
    pub event: LogEvent,
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_default")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_default")]
    pub recipient_name: String,
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_default")]
    pub recipient_address: String,
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_default")]
    pub status: String,
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_default")]
    pub email_id: String,
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_default")]
    pub email_name: String,
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_default")]
    pub email_version: String,
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_default")]
    pub events_url: String,
}

/// Template name and version of a resent email.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResentEmail {
    #[serde(deserialize_with = "null_default")]
    pub name: String,
    #[serde(deserialize_with = "null_default")]
    pub version_name: String,
}

/// Outcome of resending a logged email.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogResend {
    #[serde(skip_serializing_if = "is_false", deserialize_with = "null_default")]
    pub success: bool,
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_default")]
    pub status: String,
    #[serde(
        rename = "log_id",
        skip_serializing_if = "String::is_empty",
        deserialize_with = "null_default"
    )]
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<ResentEmail>,
}
