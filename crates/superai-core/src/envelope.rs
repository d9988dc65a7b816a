//! The uniform `{success, message, prompt, data}` result shape.

use serde::{Deserialize, Serialize};

use crate::error::{Error, FaultKind};

/// Harvested reply payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyData {
    /// Display label of the model that was active when harvesting.
    pub model: String,
    #[serde(default)]
    pub texts: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

impl ReplyData {
    /// Partial payload carrying only the identified model.
    pub fn model_only(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }
}

/// Result of every public automation operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    pub message: String,
    pub prompt: Option<String>,
    pub data: Option<ReplyData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault: Option<FaultKind>,
}

impl Envelope {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            prompt: None,
            data: None,
            fault: None,
        }
    }

    pub fn failed(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            prompt: None,
            data: None,
            fault: Some(kind),
        }
    }

    /// Failed envelope from an error, with an optional context prefix
    /// such as `"Error selecting dropdown option"`.
    pub fn from_error(context: Option<&str>, err: &Error) -> Self {
        let message = match context {
            Some(ctx) => format!("{}: {}", ctx, err),
            None => err.to_string(),
        };
        Self::failed(err.kind(), message)
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn with_data(mut self, data: ReplyData) -> Self {
        self.data = Some(data);
        self
    }

    pub fn is_success(&self) -> bool {
        self.success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let env = Envelope::ok("New responses retrieved")
            .with_prompt("hello")
            .with_data(ReplyData {
                model: "ChatGPT 4o".into(),
                texts: vec!["hi".into()],
                images: vec![],
            });
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["prompt"], "hello");
        assert_eq!(json["data"]["model"], "ChatGPT 4o");
        assert!(json.get("fault").is_none());
    }

    #[test]
    fn test_failed_envelope_carries_kind() {
        let env = Envelope::from_error(
            Some("Error handling recent chats"),
            &Error::InvalidChoice("No such chat exists.".into()),
        );
        assert!(!env.success);
        assert_eq!(env.fault, Some(FaultKind::InvalidChoice));
        assert!(env.message.starts_with("Error handling recent chats: "));
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["fault"], "InvalidChoice");
        assert!(json["prompt"].is_null());
        assert!(json["data"].is_null());
    }
}
