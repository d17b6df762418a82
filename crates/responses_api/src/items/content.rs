use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImageDetail {
    #[default]
    Auto,
    Low,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrlRef {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<ImageDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageFileRef {
    pub file_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<ImageDetail>,
}

/// Content parts a caller may place in an input message or directly in the
/// input list. `output_text` and `refusal` are accepted so assistant turns
/// can be resubmitted as history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputContent {
    Text {
        text: String,
    },
    InputText {
        text: String,
    },
    ImageUrl {
        image_url: ImageUrlRef,
    },
    ImageFile {
        image_file: ImageFileRef,
    },
    InputImage {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image_url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file_id: Option<String>,
        #[serde(default)]
        detail: ImageDetail,
    },
    InputFile {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file_data: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file_url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filename: Option<String>,
    },
    OutputText {
        text: String,
        #[serde(default)]
        annotations: Vec<Annotation>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        logprobs: Option<Value>,
    },
    Refusal {
        refusal: String,
    },
}

impl InputContent {
    pub const TAGS: &'static [&'static str] = &[
        "text",
        "input_text",
        "image_url",
        "image_file",
        "input_image",
        "input_file",
        "output_text",
        "refusal",
    ];

    pub fn text(text: impl Into<String>) -> Self {
        Self::InputText { text: text.into() }
    }

    pub fn image_url(url: impl Into<String>) -> Self {
        Self::InputImage {
            image_url: Some(url.into()),
            file_id: None,
            detail: ImageDetail::Auto,
        }
    }

    /// Inline image built from raw bytes as a base64 `data:` URL.
    pub fn image_bytes(mime_type: &str, bytes: &[u8]) -> Self {
        Self::image_url(image_data_url(mime_type, bytes))
    }

    pub fn file_id(file_id: impl Into<String>) -> Self {
        Self::InputFile {
            file_id: Some(file_id.into()),
            file_data: None,
            file_url: None,
            filename: None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::InputText { .. } => "input_text",
            Self::ImageUrl { .. } => "image_url",
            Self::ImageFile { .. } => "image_file",
            Self::InputImage { .. } => "input_image",
            Self::InputFile { .. } => "input_file",
            Self::OutputText { .. } => "output_text",
            Self::Refusal { .. } => "refusal",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } | Self::InputText { text } | Self::OutputText { text, .. } => {
                Some(text)
            }
            _ => None,
        }
    }
}

pub fn image_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", STANDARD.encode(bytes))
}

/// Parts of an assistant message. Closed: anything else is rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputContent {
    OutputText {
        text: String,
        #[serde(default)]
        annotations: Vec<Annotation>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        logprobs: Option<Value>,
    },
    Refusal {
        refusal: String,
    },
}

impl OutputContent {
    pub const TAGS: &'static [&'static str] = &["output_text", "refusal"];

    pub fn text(text: impl Into<String>) -> Self {
        Self::OutputText {
            text: text.into(),
            annotations: Vec::new(),
            logprobs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Annotation {
    FileCitation {
        file_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filename: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start_index: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        end_index: Option<u32>,
    },
    FilePath {
        file_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start_index: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        end_index: Option<u32>,
    },
    UrlCitation {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        start_index: u32,
        end_index: u32,
    },
    ContainerFileCitation {
        container_id: String,
        file_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filename: Option<String>,
        start_index: u32,
        end_index: u32,
    },
}

impl Annotation {
    pub const TAGS: &'static [&'static str] = &[
        "file_citation",
        "file_path",
        "url_citation",
        "container_file_citation",
    ];
}
