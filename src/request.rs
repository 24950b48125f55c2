//! Prompt, response and catalog types shared by every client

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifier of a remote model, e.g. "openai/o1"
pub type ModelId = String;

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role
{   System
  , User
  , Assistant
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage
{   pub role: Role
  , pub content: String
}

impl ChatMessage
{   pub fn user(content: impl Into<String>) -> Self
    {   ChatMessage
        {   role: Role::User
          , content: content.into()
        }
    }

    pub fn system(content: impl Into<String>) -> Self
    {   ChatMessage
        {   role: Role::System
          , content: content.into()
        }
    }
}

/// Ordered message list sent verbatim to every model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromptMessage
{   messages: Vec<ChatMessage>
}

impl PromptMessage
{   pub fn new(messages: Vec<ChatMessage>) -> Self
    {   PromptMessage { messages }
    }

    /// A single user message, which is what the CLI sends
    pub fn user(text: impl Into<String>) -> Self
    {   PromptMessage
        {   messages: vec![ChatMessage::user(text)]
        }
    }

    pub fn messages(&self) -> &[ChatMessage]
    {   &self.messages
    }

    /// User-authored text, for display and file headers
    pub fn text(&self) -> String
    {   self.messages
          .iter()
          .filter(|m| m.role == Role::User)
          .map(|m| m.content.as_str())
          .collect::<Vec<_>>()
          .join("\n\n")
    }

    pub fn is_blank(&self) -> bool
    {   self.messages.iter().all(|m| m.content.trim().is_empty())
    }
}

/// Token counters reported by the endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage
{   #[serde(default)]
    pub prompt_tokens: u32
  , #[serde(default)]
    pub completion_tokens: u32
  , #[serde(default)]
    pub total_tokens: u32
}

/// Normalized completion returned by a `CompletionClient`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResponse
{   /// Generated text
    pub text: String
  , /// Model name echoed by the endpoint
    pub model: Option<String>
  , /// Why generation stopped
    pub finish_reason: Option<String>
  , /// Token usage, when the endpoint reports it
    pub usage: Option<TokenUsage>
}

/// Per-token prices, as decimal strings the way the catalog ships them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pricing
{   #[serde(default)]
    pub prompt: Option<String>
  , #[serde(default)]
    pub completion: Option<String>
  , /// Any other price entries (image, request, ...)
    #[serde(flatten)]
    pub other: BTreeMap<String, serde_json::Value>
}

impl Pricing
{   /// prompt + completion price; unparsable entries count as zero
    pub fn total(&self) -> f64
    {   parse_price(self.prompt.as_deref())
          + parse_price(self.completion.as_deref())
    }
}

fn parse_price(raw: Option<&str>) -> f64
{   raw.and_then(|s| s.trim().parse::<f64>().ok())
      .filter(|p| p.is_finite())
      .unwrap_or(0.0)
}

/// One entry of the model catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor
{   pub id: ModelId
  , #[serde(default)]
    pub name: Option<String>
  , #[serde(default)]
    pub pricing: Pricing
  , #[serde(default)]
    pub context_length: Option<u64>
  , /// Remaining descriptor fields, kept for the catalog report
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>
}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn test_prompt_serializes_as_plain_array()
    {   let prompt = PromptMessage::user("ping");
        let json = serde_json::to_value(&prompt).unwrap();
        assert_eq!(
          json,
          serde_json::json!([{"role": "user", "content": "ping"}])
        );
    }

    #[test]
    fn test_prompt_text_skips_system_messages()
    {   let prompt = PromptMessage::new(vec![
          ChatMessage::system("be terse"),
          ChatMessage::user("first"),
          ChatMessage::user("second"),
        ]);
        assert_eq!(prompt.text(), "first\n\nsecond");
    }

    #[test]
    fn test_blank_prompt()
    {   assert!(PromptMessage::user("   \n").is_blank());
        assert!(!PromptMessage::user("hi").is_blank());
    }

    #[test]
    fn test_pricing_total_tolerates_garbage()
    {   let pricing = Pricing
        {   prompt: Some("0.000003".to_string())
          , completion: Some("n/a".to_string())
          , other: BTreeMap::new()
        };
        assert!((pricing.total() - 0.000003).abs() < 1e-12);
        assert_eq!(Pricing::default().total(), 0.0);
    }

    #[test]
    fn test_descriptor_keeps_unknown_fields()
    {   let raw = serde_json::json!({
          "id": "openai/o1",
          "name": "OpenAI: o1",
          "context_length": 200000,
          "pricing": {"prompt": "0.000015", "completion": "0.00006", "image": "0.021675"},
          "architecture": {"modality": "text+image->text"}
        });
        let model: ModelDescriptor = serde_json::from_value(raw).unwrap();
        assert_eq!(model.context_length, Some(200000));
        assert!(model.extra.contains_key("architecture"));
        assert!(model.pricing.other.contains_key("image"));
    }

    #[test]
    fn test_usage_missing_fields_default_to_zero()
    {   let usage: TokenUsage
          = serde_json::from_str(r#"{"total_tokens": 9}"#).unwrap();
        assert_eq!(usage.prompt_tokens, 0);
        assert_eq!(usage.total_tokens, 9);
    }
}
