//! Tagged-union content model shared by requests, responses, conversations
//! and stream events.
//!
//! Every item is a JSON object carrying a string `type`. Decoding first
//! peeks the tag and stashes the verbatim bytes in a [`RawItem`]; the typed
//! parse happens on demand. Items whose tag this build does not know are kept
//! as [`OutputItem::Opaque`]/[`InputItem::Opaque`] and re-encode byte for byte.

mod content;
mod input;
mod output;

use std::fmt;

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::value::RawValue;

use crate::error::ApiError;

pub use content::{
    image_data_url, Annotation, ImageDetail, ImageFileRef, ImageUrlRef, InputContent,
    OutputContent,
};
pub use input::{InputItem, InputMessage, InputMessageContent, Role};
pub use output::{
    ApplyPatchCall, ApplyPatchCallOutput, CodeInterpreterCall, CodeInterpreterFile,
    CodeInterpreterResult, ComputerCall, ComputerCallOutput, CustomToolCall,
    CustomToolCallOutput, FileSearchCall, FileSearchResult, FunctionCall, FunctionCallOutput,
    LocalShellCall, LocalShellCallOutput, McpApprovalRequest, McpApprovalResponse, McpCall,
    McpListTools, McpToolInfo, OutputItem, OutputMessage, OutputMessageContent, Reasoning,
    ReasoningSummary, SafetyCheck, ShellCall, ShellCallOutput, ToolOutputPayload, WebSearchCall,
};

/// Verbatim JSON of one item alongside its peeked `type`.
#[derive(Clone)]
pub struct RawItem {
    tag: String,
    raw: Box<RawValue>,
}

#[derive(Deserialize)]
struct TagPeek {
    #[serde(rename = "type")]
    tag: Option<String>,
}

/// Extracts only the `type` discriminator of a JSON object.
pub fn peek_tag(json: &str) -> Result<String, ApiError> {
    let peek: TagPeek =
        serde_json::from_str(json).map_err(|error| ApiError::decode("item tag", error))?;
    peek.tag
        .filter(|tag| !tag.is_empty())
        .ok_or_else(|| ApiError::InvalidItem("item is missing its \"type\" tag".to_owned()))
}

impl RawItem {
    pub fn from_json(json: &str) -> Result<Self, ApiError> {
        let tag = peek_tag(json)?;
        let raw = RawValue::from_string(json.trim().to_owned())
            .map_err(|error| ApiError::decode("raw item", error))?;
        Ok(Self { tag, raw })
    }

    /// Encodes `value` and stashes the result.
    pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Self, ApiError> {
        let json =
            serde_json::to_string(value).map_err(|error| ApiError::decode("raw item", error))?;
        Self::from_json(&json)
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn json(&self) -> &str {
        self.raw.get()
    }

    pub fn decode<T: DeserializeOwned>(&self, context: &'static str) -> Result<T, ApiError> {
        serde_json::from_str(self.raw.get()).map_err(|error| ApiError::decode(context, error))
    }
}

impl fmt::Debug for RawItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawItem")
            .field("tag", &self.tag)
            .field("raw", &self.raw.get())
            .finish()
    }
}

impl PartialEq for RawItem {
    fn eq(&self, other: &Self) -> bool {
        self.raw.get() == other.raw.get()
    }
}

impl Serialize for RawItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RawItem {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Box::<RawValue>::deserialize(deserializer)?;
        let tag = peek_tag(raw.get()).map_err(D::Error::custom)?;
        Ok(Self { tag, raw })
    }
}

/// Writes `item` as a JSON object whose `type` is always `tag`.
#[derive(Serialize)]
pub(crate) struct Tagged<'a, T: Serialize> {
    #[serde(rename = "type")]
    pub tag: &'static str,
    #[serde(flatten)]
    pub item: &'a T,
}

pub(crate) fn tagged<S, T>(serializer: S, tag: &'static str, item: &T) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Serialize,
{
    Tagged { tag, item }.serialize(serializer)
}
