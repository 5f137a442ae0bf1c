//! Structured values stored as serialized JSON text on an article row

use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// A related link shown beneath an article
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubLink {
    pub title: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Image,
    Video,
    Audio,
    #[serde(other)]
    Other,
}

/// An image, clip, or audio attachment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaItem {
    #[serde(rename = "type", alias = "kind")]
    pub kind: MediaKind,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

/// Serialize a sequence for storage
pub fn encode_list<T: Serialize>(items: &[T]) -> serde_json::Result<String> {
    serde_json::to_string(items)
}

/// Parse a stored sequence. Absent, blank, or `null` text is an empty sequence;
/// anything else that is not a JSON array of `T` is an error.
pub fn decode_list<T: DeserializeOwned>(raw: Option<&str>) -> serde_json::Result<Vec<T>> {
    let trimmed = match raw.map(str::trim) {
        None | Some("") => return Ok(Vec::new()),
        Some(s) => s,
    };
    let parsed: Option<Vec<T>> = serde_json::from_str(trimmed)?;
    Ok(parsed.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_and_null_are_empty() {
        assert!(decode_list::<SubLink>(None).unwrap().is_empty());
        assert!(decode_list::<SubLink>(Some("   ")).unwrap().is_empty());
        assert!(decode_list::<SubLink>(Some("null")).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_is_error() {
        assert!(decode_list::<SubLink>(Some("[{\"title\": ")).is_err());
        assert!(decode_list::<SubLink>(Some("{\"title\": \"x\"}")).is_err());
    }

    #[test]
    fn test_partial_objects_fill_defaults() {
        let links: Vec<SubLink> =
            decode_list(Some(r#"[{"title":"Budget"},{"url":"/a","extra":1}]"#)).unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].title, "Budget");
        assert_eq!(links[0].url, "");
        assert_eq!(links[1].url, "/a");
    }

    #[test]
    fn test_media_kind_accepts_unknown() {
        let media: Vec<MediaItem> = decode_list(Some(
            r#"[{"type":"video","url":"/v.mp4"},{"kind":"gallery","url":"/g"}]"#,
        ))
        .unwrap();
        assert_eq!(media[0].kind, MediaKind::Video);
        assert_eq!(media[1].kind, MediaKind::Other);
    }
}
