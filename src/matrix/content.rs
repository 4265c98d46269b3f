use serde::Serialize;

pub const CUSTOM_HTML_FORMAT: &str = "org.matrix.custom.html";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InReplyTo {
    pub event_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelatesTo {
    #[serde(rename = "m.in_reply_to")]
    pub in_reply_to: InReplyTo,
}

/// `m.room.message` content for `m.text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextContent {
    pub msgtype: &'static str,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted_body: Option<String>,
    #[serde(rename = "m.relates_to", skip_serializing_if = "Option::is_none")]
    pub relates_to: Option<RelatesTo>,
}

impl TextContent {
    pub fn plain(body: impl Into<String>) -> Self {
        Self {
            msgtype: "m.text",
            body: body.into(),
            format: None,
            formatted_body: None,
            relates_to: None,
        }
    }

    pub fn html(body: impl Into<String>, formatted_body: impl Into<String>) -> Self {
        Self {
            format: Some(CUSTOM_HTML_FORMAT),
            formatted_body: Some(formatted_body.into()),
            ..Self::plain(body)
        }
    }

    pub fn reply(body: impl Into<String>, ancestor_event_id: impl Into<String>) -> Self {
        Self {
            relates_to: Some(RelatesTo {
                in_reply_to: InReplyTo {
                    event_id: ancestor_event_id.into(),
                },
            }),
            ..Self::plain(body)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    pub mimetype: String,
    pub size: u64,
}

/// `m.room.message` content for `m.file`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileContent {
    pub msgtype: &'static str,
    pub body: String,
    pub url: String,
    pub info: FileInfo,
}

impl FileContent {
    pub fn new(filename: &str, content_uri: &str, mimetype: &str, size: u64) -> Self {
        Self {
            msgtype: "m.file",
            body: filename.to_string(),
            url: content_uri.to_string(),
            info: FileInfo {
                mimetype: mimetype.to_string(),
                size,
            },
        }
    }
}
