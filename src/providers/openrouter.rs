use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use log::{debug, trace, error};
use crate::config::ProviderConfig;
use crate::error::Error;
use crate::request::
{   ChatMessage
  , CompletionResponse
  , ModelDescriptor
  , PromptMessage
  , TokenUsage
};

// ===== Wire Types =====

#[derive(Debug, Serialize)]
struct ChatRequest<'a>
{   model: &'a str
  , messages: &'a [ChatMessage]
}

#[derive(Debug, Deserialize)]
struct ChatResponse
{   #[serde(default)]
    model: Option<String>
  , #[serde(default)]
    choices: Vec<Choice>
  , #[serde(default)]
    usage: Option<TokenUsage>
  , #[serde(default)]
    error: Option<ApiErrorBody>
}

#[derive(Debug, Deserialize)]
struct Choice
{   message: ResponseMessage
  , #[serde(default)]
    finish_reason: Option<String>
}

#[derive(Debug, Deserialize)]
struct ResponseMessage
{   #[serde(default)]
    content: Option<String>
}

/// OpenRouter reports some failures as `{"error": {...}}`, sometimes
/// with a 200 status
#[derive(Debug, Deserialize)]
struct ApiErrorBody
{   #[serde(default)]
    code: Option<serde_json::Value>
  , #[serde(default)]
    message: String
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope
{   error: ApiErrorBody
}

#[derive(Debug, Deserialize)]
struct ModelsResponse
{   data: Vec<ModelDescriptor>
}

// ===== Client =====

/// OpenRouter chat-completions client
///
/// Holds one `reqwest::Client` (and its connection pool) for the whole
/// process; cloning is cheap and shares the pool.
#[derive(Debug, Clone)]
pub struct OpenRouterClient
{   http_client: reqwest::Client
  , api_base: String
  , api_key: String
  , site_url: Option<String>
  , site_name: Option<String>
}

impl OpenRouterClient
{   pub fn new(
      api_key: String
    , config: &ProviderConfig
    ) -> Self
    {   debug!("Creating OpenRouterClient for {}", config.api_base);
        OpenRouterClient
        {   http_client: reqwest::Client::new()
          , api_base: config.api_base.trim_end_matches('/').to_string()
          , api_key
          , site_url: config.site_url.clone()
          , site_name: config.site_name.clone()
        }
    }

    fn request(
      &self
    , builder: reqwest::RequestBuilder
    ) -> reqwest::RequestBuilder
    {   let mut builder = builder
          .header("Authorization", format!("Bearer {}", self.api_key))
          .header("Content-Type", "application/json");
        if let Some(url) = &self.site_url
        {   builder = builder.header("HTTP-Referer", url);
        }
        if let Some(name) = &self.site_name
        {   builder = builder.header("X-Title", name);
        }
        builder
    }

    async fn send(
      &self
    , builder: reqwest::RequestBuilder
    ) -> Result<String, Error>
    {   let response = self.request(builder)
          .send()
          .await
          .map_err(|e| {
            error!("HTTP error: {}", e);
            transport_error(e)
          })?;

        let status = response.status();
        trace!("OpenRouter response status: {}", status);

        let body = response.text().await.map_err(|e| {
          error!("Failed to read body: {}", e);
          transport_error(e)
        })?;

        if !status.is_success()
        {   error!("OpenRouter API error {}: {}", status, body);
            return Err(status_error(status.as_u16(), &body));
        }
        Ok(body)
    }
}

#[async_trait]
impl crate::providers::CompletionClient for OpenRouterClient
{   async fn generate_completion(
      &self
    , model: &str
    , messages: &PromptMessage
    ) -> Result<CompletionResponse, Error>
    {   debug!("Requesting completion from: {}", model);

        let request = ChatRequest
        {   model
          , messages: messages.messages()
        };
        trace!("OpenRouter request: {:?}", request);

        let builder = self.http_client
          .post(format!("{}/chat/completions", self.api_base))
          .json(&request);
        let body = self.send(builder).await?;

        parse_chat_response(&body)
    }

    async fn list_models(&self)
      -> Result<Vec<ModelDescriptor>, Error>
    {   debug!("Fetching model catalog");

        let builder = self.http_client
          .get(format!("{}/models", self.api_base));
        let body = self.send(builder).await?;

        let models: ModelsResponse = serde_json::from_str(&body)
          .map_err(|e| {
            error!("Parse error: {}", e);
            Error::MalformedResponse(e.to_string())
          })?;

        debug!("Retrieved {} models", models.data.len());
        Ok(models.data)
    }
}

fn transport_error(e: reqwest::Error) -> Error
{   if e.is_decode()
    {   Error::MalformedResponse(e.to_string())
    } else
    {   Error::Transport(e.to_string())
    }
}

/// Map a non-success status (and its body) onto an error category
fn status_error(status: u16, body: &str) -> Error
{   let message = serde_json::from_str::<ErrorEnvelope>(body)
      .map(|env| env.error.message)
      .ok()
      .filter(|m| !m.is_empty())
      .unwrap_or_else(|| {
        if body.trim().is_empty()
        {   "Unknown error".to_string()
        } else
        {   body.trim().to_string()
        }
      });

    classify(status, message)
}

fn classify(status: u16, message: String) -> Error
{   match status
    {   401 | 403 => Error::Auth(message)
      , 429 => Error::RateLimited(message)
      , _ => Error::Api { status, message }
    }
}

fn parse_chat_response(body: &str)
  -> Result<CompletionResponse, Error>
{   let response: ChatResponse = serde_json::from_str(body)
      .map_err(|e| {
        error!("Parse error: {}", e);
        Error::MalformedResponse(e.to_string())
      })?;

    if let Some(err) = response.error
    {   let status = err.code
          .as_ref()
          .and_then(|c| c.as_u64())
          .and_then(|c| u16::try_from(c).ok())
          .unwrap_or(200);
        error!("OpenRouter returned an error body: {}", err.message);
        return Err(classify(status, err.message));
    }

    let choice = response.choices.into_iter().next()
      .ok_or_else(|| {
        error!("No choices in response");
        Error::MalformedResponse(
          "response contained no choices".to_string()
        )
      })?;

    let text = choice.message.content.ok_or_else(|| {
      Error::MalformedResponse(
        "choice had no message content".to_string()
      )
    })?;

    Ok(CompletionResponse
    {   text
      , model: response.model
      , finish_reason: choice.finish_reason
      , usage: response.usage
    })
}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn test_parse_full_response()
    {   let body = r#"{
          "id": "gen-1",
          "model": "openai/o1",
          "choices": [
            {"message": {"role": "assistant", "content": "pong"},
             "finish_reason": "stop"}
          ],
          "usage": {"prompt_tokens": 3, "completion_tokens": 2, "total_tokens": 5}
        }"#;
        let response = parse_chat_response(body).unwrap();
        assert_eq!(response.text, "pong");
        assert_eq!(response.model.as_deref(), Some("openai/o1"));
        assert_eq!(response.finish_reason.as_deref(), Some("stop"));
        assert_eq!(response.usage.unwrap().total_tokens, 5);
    }

    #[test]
    fn test_missing_usage_is_not_fabricated()
    {   let body = r#"{"choices": [{"message": {"content": "hi"}}]}"#;
        let response = parse_chat_response(body).unwrap();
        assert_eq!(response.usage, None);
        assert_eq!(response.finish_reason, None);
    }

    #[test]
    fn test_empty_choices_is_malformed()
    {   let err = parse_chat_response(r#"{"choices": []}"#)
          .unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }

    #[test]
    fn test_error_body_with_ok_status()
    {   let body = r#"{"error": {"code": 429, "message": "slow down"}}"#;
        assert_eq!(
          parse_chat_response(body).unwrap_err(),
          Error::RateLimited("slow down".to_string())
        );
    }

    #[test]
    fn test_status_mapping()
    {   let body = r#"{"error": {"message": "No auth credentials found"}}"#;
        assert_eq!(
          status_error(401, body),
          Error::Auth("No auth credentials found".to_string())
        );
        assert_eq!(
          status_error(502, "bad gateway"),
          Error::Api
          {   status: 502
            , message: "bad gateway".to_string()
          }
        );
        assert_eq!(
          status_error(500, ""),
          Error::Api
          {   status: 500
            , message: "Unknown error".to_string()
          }
        );
    }

    #[test]
    fn test_not_json_is_malformed()
    {   let err = parse_chat_response("<html>").unwrap_err();
        assert_eq!(
          err.kind(),
          crate::error::ErrorKind::MalformedResponse
        );
    }
}
