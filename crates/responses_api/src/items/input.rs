use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::content::InputContent;
use super::output::OutputItem;
use super::{tagged, RawItem};
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
    Developer,
}

pub(crate) fn assistant_role() -> Role {
    Role::Assistant
}

/// Body of an input message. Decoding tries a plain string, then a typed
/// part list, then keeps the JSON as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum InputMessageContent {
    Text(String),
    Parts(Vec<InputContent>),
    Raw(Value),
}

impl<'de> Deserialize<'de> for InputMessageContent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        if let Value::String(text) = value {
            return Ok(Self::Text(text));
        }
        if value.is_array() {
            if let Ok(parts) = Vec::<InputContent>::deserialize(&value) {
                return Ok(Self::Parts(parts));
            }
        }
        Ok(Self::Raw(value))
    }
}

/// Message in an input or conversation item list. Items stored by the
/// server may omit `role`; those are assistant turns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default = "assistant_role")]
    pub role: Role,
    pub content: InputMessageContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl InputMessage {
    pub fn new(role: Role, content: InputMessageContent) -> Self {
        Self {
            id: None,
            role,
            content,
            status: None,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, InputMessageContent::Text(text.into()))
    }

    pub fn developer(text: impl Into<String>) -> Self {
        Self::new(Role::Developer, InputMessageContent::Text(text.into()))
    }

    pub fn with_parts(role: Role, parts: Vec<InputContent>) -> Self {
        Self::new(role, InputMessageContent::Parts(parts))
    }
}

/// Element of a request's `input` list or of a conversation's item list.
#[derive(Debug, Clone, PartialEq)]
pub enum InputItem {
    Content(InputContent),
    ItemReference { id: String },
    Message(InputMessage),
    /// An item previously produced by the server, such as a tool call or its
    /// output, resubmitted as context.
    Output(OutputItem),
    Opaque(RawItem),
}

#[derive(Serialize, Deserialize)]
struct ItemReference {
    id: String,
}

impl InputItem {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Content(InputContent::text(text))
    }

    pub fn user_message(text: impl Into<String>) -> Self {
        Self::Message(InputMessage::user(text))
    }

    pub fn item_reference(id: impl Into<String>) -> Self {
        Self::ItemReference { id: id.into() }
    }

    pub fn from_raw(raw: &RawItem) -> Result<Self, ApiError> {
        let tag = raw.tag();
        if InputContent::TAGS.contains(&tag) {
            return raw.decode("input content").map(Self::Content);
        }
        match tag {
            "item_reference" => {
                let reference: ItemReference = raw.decode("item reference")?;
                Ok(Self::ItemReference { id: reference.id })
            }
            "message" => raw.decode("input message").map(Self::Message),
            tag if OutputItem::is_known_tag(tag) => OutputItem::from_raw(raw).map(Self::Output),
            _ => Ok(Self::Opaque(raw.clone())),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ApiError> {
        Self::from_raw(&RawItem::from_json(json)?)
    }

    pub fn tag(&self) -> &str {
        match self {
            Self::Content(content) => content.tag(),
            Self::ItemReference { .. } => "item_reference",
            Self::Message(_) => "message",
            Self::Output(item) => item.tag(),
            Self::Opaque(raw) => raw.tag(),
        }
    }
}

impl From<InputContent> for InputItem {
    fn from(value: InputContent) -> Self {
        Self::Content(value)
    }
}

impl From<InputMessage> for InputItem {
    fn from(value: InputMessage) -> Self {
        Self::Message(value)
    }
}

impl From<OutputItem> for InputItem {
    fn from(value: OutputItem) -> Self {
        match value {
            OutputItem::Opaque(raw) => Self::Opaque(raw),
            item => Self::Output(item),
        }
    }
}

impl Serialize for InputItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Content(content) => content.serialize(serializer),
            Self::ItemReference { id } => {
                tagged(serializer, "item_reference", &ItemReference { id: id.clone() })
            }
            Self::Message(message) => tagged(serializer, "message", message),
            Self::Output(item) => item.serialize(serializer),
            Self::Opaque(raw) => raw.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for InputItem {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawItem::deserialize(deserializer)?;
        Self::from_raw(&raw).map_err(D::Error::custom)
    }
}
