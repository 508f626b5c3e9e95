use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Content of one outbound turn: plain text, or ordered parts when the turn
/// carries an image.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChatContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: ChatContent,
}

impl ChatMessage {
    pub fn text(role: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: ChatContent::Text(text.into()),
        }
    }

    /// Text part first, then the image part.
    pub fn multimodal(
        role: impl Into<String>,
        text: impl Into<String>,
        image_url: impl Into<String>,
    ) -> Self {
        Self {
            role: role.into(),
            content: ChatContent::Parts(vec![
                ContentPart::Text { text: text.into() },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image_url.into(),
                    },
                },
            ]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub user: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponseMessage {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponseChoice {
    pub message: Option<ChatResponseMessage>,
}

/// Completion envelope. Fields are optional on the wire; use
/// [`ChatResponse::into_reply`] to validate them.
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<ChatResponseChoice>,
}

/// The two fields the dispatch pipeline needs out of a completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub served_model: String,
    pub text: String,
}

impl ChatResponse {
    pub fn into_reply(self) -> Result<ChatReply, String> {
        let served_model = self
            .model
            .ok_or_else(|| "response is missing `model`".to_string())?;
        let text = self
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .ok_or_else(|| "response is missing `choices[0].message.content`".to_string())?;
        Ok(ChatReply { served_model, text })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyIssueRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KeyIssueResponse {
    pub key: String,
    pub key_id: String,
}
