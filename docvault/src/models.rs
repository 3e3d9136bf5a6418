//! Domain models
//!
//! Rust structs representing documents, tags and the signed-in user.
//! All models use serde; the persisted JSON shape stays readable by older
//! clients (numeric ids, `file_name` for the file reference).

use crate::config::{PERSONAL_MINOR_HEADS, PROFESSIONAL_MINOR_HEADS};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Top-level document category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MajorHead {
    Personal,
    Professional,
}

impl MajorHead {
    pub const ALL: [MajorHead; 2] = [MajorHead::Personal, MajorHead::Professional];

    pub fn as_str(&self) -> &'static str {
        match self {
            MajorHead::Personal => "Personal",
            MajorHead::Professional => "Professional",
        }
    }

    /// Subcategories offered for this category
    pub fn minor_heads(&self) -> &'static [&'static str] {
        match self {
            MajorHead::Personal => PERSONAL_MINOR_HEADS,
            MajorHead::Professional => PROFESSIONAL_MINOR_HEADS,
        }
    }

    pub fn accepts_minor_head(&self, minor_head: &str) -> bool {
        self.minor_heads().contains(&minor_head)
    }
}

impl fmt::Display for MajorHead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MajorHead {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "personal" => Ok(MajorHead::Personal),
            "professional" => Ok(MajorHead::Professional),
            other => Err(format!("Unknown category: {}", other)),
        }
    }
}

/// Reference to the file behind a document: a local path/URI or a remote URL
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub uri: String,
    #[serde(rename = "type", alias = "mime_type", default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

impl FileRef {
    pub fn is_image(&self) -> bool {
        self.mime_type
            .as_deref()
            .is_some_and(|m| m.starts_with("image/"))
    }

    pub fn is_pdf(&self) -> bool {
        self.mime_type.as_deref().is_some_and(|m| m.contains("pdf"))
    }
}

/// A document known to the client, either created locally or returned by search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(with = "calendar_date")]
    pub date: NaiveDate,
    pub major_head: MajorHead,
    #[serde(default)]
    pub minor_head: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    #[serde(alias = "file_name", default)]
    pub file: FileRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_time: Option<DateTime<Utc>>,
}

impl DocumentRecord {
    /// Exact, case-sensitive tag membership
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Name shown in lists and used for downloaded files
    pub fn display_name(&self) -> String {
        self.title
            .clone()
            .or_else(|| self.file.name.clone())
            .unwrap_or_else(|| format!("Document #{}", self.id))
    }
}

/// Tag suggestion offered by the remote tag listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub name: String,
}

/// Signed-in user, persisted under the `user_data` key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    pub user_id: String,
    pub user_name: String,
    #[serde(default)]
    pub token: Option<String>,
}

/// Add a trimmed tag unless it is empty or already present.
///
/// Returns whether the list changed.
pub fn add_tag(tags: &mut Vec<String>, tag: &str) -> bool {
    let tag = tag.trim();
    if tag.is_empty() || tags.iter().any(|t| t == tag) {
        return false;
    }
    tags.push(tag.to_string());
    true
}

/// Remove an exact tag match. Returns whether the list changed.
pub fn remove_tag(tags: &mut Vec<String>, tag: &str) -> bool {
    let before = tags.len();
    tags.retain(|t| t != tag);
    tags.len() != before
}

/// Parse the date formats seen in stored and remote records:
/// `YYYY-MM-DD`, `DD-MM-YYYY`, or an RFC 3339 timestamp.
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d-%m-%Y"))
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.date_naive())
        })
        .or_else(|| {
            raw.get(..10)
                .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
        })
}

pub(crate) fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Integer(i64),
        Float(f64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Integer(n) => n.to_string(),
        RawId::Float(n) => n.to_string(),
    })
}

pub(crate) mod calendar_date {
    use chrono::NaiveDate;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&date.format("%Y-%m-%d").to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_calendar_date(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid document date: {}", raw)))
    }
}
