//! Splits embedded reasoning out of a raw reply.

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";

/// Visible reply text plus the reasoning transcript, if the reply carried one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitReply {
    pub content: String,
    pub thinking: Option<String>,
}

/// Extract the first `<think>...</think>` span from `raw`.
///
/// The span may cover several lines and is matched non-greedily. When
/// found, the inner text becomes the transcript and the span (markers
/// included) is removed from the content; both are trimmed. Without a
/// complete pair the reply is returned unchanged.
pub fn split_reasoning(raw: &str) -> SplitReply {
    let Some(open) = raw.find(THINK_OPEN) else {
        return SplitReply::unchanged(raw);
    };
    let inner_start = open + THINK_OPEN.len();
    let Some(close_offset) = raw[inner_start..].find(THINK_CLOSE) else {
        return SplitReply::unchanged(raw);
    };
    let inner_end = inner_start + close_offset;
    let span_end = inner_end + THINK_CLOSE.len();

    let mut content = String::with_capacity(raw.len() - (span_end - open));
    content.push_str(&raw[..open]);
    content.push_str(&raw[span_end..]);

    SplitReply {
        content: content.trim().to_string(),
        thinking: Some(raw[inner_start..inner_end].trim().to_string()),
    }
}

impl SplitReply {
    fn unchanged(raw: &str) -> Self {
        Self {
            content: raw.to_string(),
            thinking: None,
        }
    }
}
