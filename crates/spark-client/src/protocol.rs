//! Wire documents exchanged with the service.
//!
//! Outbound, one JSON text frame per turn carrying the full history
//! snapshot. Inbound, one JSON text frame per reply fragment.

use serde::{Deserialize, Serialize};

use crate::{ChatError, Message, Role, TokenUsage};

// =============================================================================
// Domain types
// =============================================================================

/// Everything needed to encode one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnRequest {
    pub app_id: String,
    pub uid: String,
    pub domain: String,
    pub chat_id: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub top_k: u32,
    pub messages: Vec<Message>,
}

/// Position of a fragment within a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStatus {
    First,
    Middle,
    Last,
}

impl TurnStatus {
    pub fn from_code(code: i64) -> Result<Self, ChatError> {
        match code {
            0 => Ok(Self::First),
            1 => Ok(Self::Middle),
            2 => Ok(Self::Last),
            other => Err(ChatError::SerializationError(format!(
                "unknown turn status {other}"
            ))),
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Self::First => 0,
            Self::Middle => 1,
            Self::Last => 2,
        }
    }
}

/// One decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnResponseFragment {
    pub status_code: i64,
    pub status_message: String,
    pub sid: String,
    pub turn_status: TurnStatus,
    pub role: Role,
    pub content_delta: String,
    pub choice_index: u32,
    pub usage: Option<TokenUsage>,
}

impl TurnResponseFragment {
    pub fn is_error(&self) -> bool {
        self.status_code != 0
    }

    pub fn is_final(&self) -> bool {
        self.turn_status == TurnStatus::Last
    }
}

// =============================================================================
// Outbound wire shape
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub header: RequestHeader,
    pub parameter: RequestParameter,
    pub payload: RequestPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestHeader {
    pub app_id: String,
    pub uid: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestParameter {
    pub chat: ChatParameter,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatParameter {
    pub domain: String,
    pub chat_id: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub top_k: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestPayload {
    pub message: MessageText,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageText {
    pub text: Vec<Message>,
}

impl From<&TurnRequest> for ChatRequest {
    fn from(req: &TurnRequest) -> Self {
        Self {
            header: RequestHeader {
                app_id: req.app_id.clone(),
                uid: req.uid.clone(),
            },
            parameter: RequestParameter {
                chat: ChatParameter {
                    domain: req.domain.clone(),
                    chat_id: req.chat_id.clone(),
                    temperature: req.temperature,
                    max_tokens: req.max_tokens,
                    top_k: req.top_k,
                },
            },
            payload: RequestPayload {
                message: MessageText {
                    text: req.messages.clone(),
                },
            },
        }
    }
}

// =============================================================================
// Inbound wire shape
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub header: ResponseHeader,
    /// Absent on most error frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<ResponsePayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseHeader {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub sid: String,
    #[serde(default)]
    pub status: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponsePayload {
    pub choices: Choices,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageBlock>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choices {
    pub status: i64,
    #[serde(default)]
    pub seq: i64,
    #[serde(default)]
    pub text: Vec<ChoiceText>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceText {
    #[serde(default)]
    pub content: String,
    #[serde(default = "default_reply_role")]
    pub role: Role,
    #[serde(default)]
    pub index: u32,
}

fn default_reply_role() -> Role {
    Role::Assistant
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageBlock {
    pub text: TokenUsage,
}

impl ChatResponse {
    /// Flatten into a fragment.
    ///
    /// A non-zero code is a complete frame on its own. A zero-code frame must
    /// carry `payload.choices`.
    pub fn into_fragment(self) -> Result<TurnResponseFragment, ChatError> {
        let ResponseHeader {
            code,
            message,
            sid,
            status,
        } = self.header;

        let Some(payload) = self.payload else {
            if code != 0 {
                return Ok(TurnResponseFragment {
                    status_code: code,
                    status_message: message,
                    sid,
                    turn_status: TurnStatus::from_code(status).unwrap_or(TurnStatus::Last),
                    role: Role::Assistant,
                    content_delta: String::new(),
                    choice_index: 0,
                    usage: None,
                });
            }
            return Err(ChatError::SerializationError(
                "success frame without payload".into(),
            ));
        };

        let turn_status = TurnStatus::from_code(payload.choices.status)?;
        let (content_delta, role, choice_index) = match payload.choices.text.into_iter().next() {
            Some(choice) => (choice.content, choice.role, choice.index),
            None => (String::new(), Role::Assistant, 0),
        };

        Ok(TurnResponseFragment {
            status_code: code,
            status_message: message,
            sid,
            turn_status,
            role,
            content_delta,
            choice_index,
            usage: payload.usage.map(|u| u.text),
        })
    }
}

impl From<&TurnResponseFragment> for ChatResponse {
    fn from(fragment: &TurnResponseFragment) -> Self {
        Self {
            header: ResponseHeader {
                code: fragment.status_code,
                message: fragment.status_message.clone(),
                sid: fragment.sid.clone(),
                status: fragment.turn_status.code(),
            },
            payload: Some(ResponsePayload {
                choices: Choices {
                    status: fragment.turn_status.code(),
                    seq: 0,
                    text: vec![ChoiceText {
                        content: fragment.content_delta.clone(),
                        role: fragment.role,
                        index: fragment.choice_index,
                    }],
                },
                usage: fragment.usage.map(|text| UsageBlock { text }),
            }),
        }
    }
}

// =============================================================================
// Codec
// =============================================================================

pub fn encode_request(req: &TurnRequest) -> Result<String, ChatError> {
    serde_json::to_string(&ChatRequest::from(req))
        .map_err(|e| ChatError::SerializationError(e.to_string()))
}

pub fn decode_fragment(frame: &str) -> Result<TurnResponseFragment, ChatError> {
    let response: ChatResponse =
        serde_json::from_str(frame).map_err(|e| ChatError::SerializationError(e.to_string()))?;
    response.into_fragment()
}

/// Encode a fragment as the service would send it. Used by test servers.
pub fn encode_fragment(fragment: &TurnResponseFragment) -> Result<String, ChatError> {
    serde_json::to_string(&ChatResponse::from(fragment))
        .map_err(|e| ChatError::SerializationError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> TurnRequest {
        TurnRequest {
            app_id: "5d1ce7a1".into(),
            uid: "0123456789abcdef0123456789abcdef".into(),
            domain: "generalv3".into(),
            chat_id: "240514073000_1a2b3c4d".into(),
            temperature: 0.5,
            max_tokens: 4096,
            top_k: 4,
            messages: vec![
                Message::system("be brief"),
                Message::user("Hello"),
                Message::assistant("Hi"),
                Message::user("What can you do?"),
            ],
        }
    }

    #[test]
    fn request_wire_layout() {
        let json = encode_request(&request()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["header"]["app_id"], "5d1ce7a1");
        assert_eq!(value["header"]["uid"], "0123456789abcdef0123456789abcdef");
        let chat = &value["parameter"]["chat"];
        assert_eq!(chat["domain"], "generalv3");
        assert_eq!(chat["chat_id"], "240514073000_1a2b3c4d");
        assert_eq!(chat["temperature"], 0.5);
        assert_eq!(chat["max_tokens"], 4096);
        assert_eq!(chat["top_k"], 4);

        let text = value["payload"]["message"]["text"].as_array().unwrap();
        assert_eq!(text.len(), 4);
        assert_eq!(text[0]["role"], "system");
        assert_eq!(text[3]["content"], "What can you do?");
    }

    #[test]
    fn decodes_service_example() {
        let frame = r#"{
            "header": {"code": 0, "message": "Success", "sid": "cht000cb087@dx18793cd421fb894542", "status": 2},
            "payload": {
                "choices": {"status": 2, "seq": 0,
                    "text": [{"content": "我可以帮助你的吗？", "role": "assistant", "index": 0}]},
                "usage": {"text": {"question_tokens": 4, "prompt_tokens": 5, "completion_tokens": 9, "total_tokens": 14}}
            }
        }"#;
        let fragment = decode_fragment(frame).unwrap();
        assert!(!fragment.is_error());
        assert!(fragment.is_final());
        assert_eq!(fragment.sid, "cht000cb087@dx18793cd421fb894542");
        assert_eq!(fragment.content_delta, "我可以帮助你的吗？");
        assert_eq!(fragment.usage.unwrap().total_tokens, 14);
    }

    #[test]
    fn error_frame_without_payload_is_valid() {
        let frame = r#"{"header": {"code": 10163, "message": "invalid parameter", "sid": "x", "status": 2}}"#;
        let fragment = decode_fragment(frame).unwrap();
        assert!(fragment.is_error());
        assert_eq!(fragment.status_code, 10163);
        assert_eq!(fragment.status_message, "invalid parameter");
        assert!(fragment.content_delta.is_empty());
    }

    #[test]
    fn success_frame_without_payload_is_malformed() {
        let frame = r#"{"header": {"code": 0, "message": "Success", "sid": "x", "status": 1}}"#;
        assert!(matches!(
            decode_fragment(frame),
            Err(ChatError::SerializationError(_))
        ));
    }

    #[test]
    fn garbage_is_a_serialization_error() {
        for frame in ["", "not json", "{}", r#"{"header": {"code": "zero"}}"#] {
            assert!(
                matches!(decode_fragment(frame), Err(ChatError::SerializationError(_))),
                "{frame:?}"
            );
        }
    }

    #[test]
    fn unknown_turn_status_is_rejected() {
        let frame = r#"{"header": {"code": 0, "sid": "x", "status": 7},
            "payload": {"choices": {"status": 7, "text": []}}}"#;
        assert!(matches!(
            decode_fragment(frame),
            Err(ChatError::SerializationError(_))
        ));
    }

    #[test]
    fn request_messages_and_fragments_keep_every_role() {
        let req = TurnRequest {
            messages: Role::ALL
                .into_iter()
                .map(|role| Message {
                    role,
                    content: format!("{role:?} says hi"),
                })
                .collect(),
            ..request()
        };
        let wire: ChatRequest = serde_json::from_str(&encode_request(&req).unwrap()).unwrap();
        assert_eq!(wire.payload.message.text, req.messages);

        for (i, message) in req.messages.iter().enumerate() {
            let fragment = TurnResponseFragment {
                status_code: 0,
                status_message: "Success".into(),
                sid: "sid-1".into(),
                turn_status: TurnStatus::Middle,
                role: message.role,
                content_delta: message.content.clone(),
                choice_index: i as u32,
                usage: None,
            };
            let decoded = decode_fragment(&encode_fragment(&fragment).unwrap()).unwrap();
            assert_eq!(decoded, fragment);
        }
    }
}
