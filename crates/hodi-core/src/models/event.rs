//! 라이브 채널 수신 이벤트.
//!
//! 서버 푸시 메시지는 `type` 판별자를 가진 JSON 객체다.
//! 알 수 없는 타입은 버리지 않고 `Unrecognized`로 보존해 로그에 남긴다.

use serde::Deserialize;
use tracing::debug;

use crate::error::CoreError;
use crate::models::snapshot::ConversationId;

/// `new_message` 페이로드
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NewMessagePayload {
    /// 알림 제목
    #[serde(default)]
    pub title: Option<String>,
    /// 알림 본문
    #[serde(default)]
    pub body: Option<String>,
    /// 메시지가 속한 대화
    #[serde(default)]
    pub conversation_id: Option<ConversationId>,
}

/// 라이브 채널에서 수신한 이벤트 (한 번 소비되고 저장되지 않음)
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// 새 메시지 도착
    NewMessage(NewMessagePayload),
    /// 대화 상태 변경 (페이로드는 로그용으로만 보관)
    ConversationUpdated(serde_json::Value),
    /// 일반 알림 갱신
    GenericNotificationUpdate,
    /// 알 수 없는 타입 (원본 타입 문자열, 없으면 빈 문자열)
    Unrecognized(String),
}

impl InboundEvent {
    /// 텍스트 프레임을 이벤트로 파싱
    ///
    /// JSON이 아니면 에러. JSON이지만 객체가 아니거나 `type`이 없으면 `Unrecognized("")`.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        let kind = value
            .get("type")
            .and_then(|t| t.as_str())
            .unwrap_or_default()
            .to_string();

        let event = match kind.as_str() {
            "new_message" => {
                let payload = serde_json::from_value(value).unwrap_or_else(|e| {
                    debug!("new_message 페이로드 해석 실패, 기본값 사용: {e}");
                    NewMessagePayload::default()
                });
                InboundEvent::NewMessage(payload)
            }
            "conversation_updated" => InboundEvent::ConversationUpdated(value),
            "notification_update" => InboundEvent::GenericNotificationUpdate,
            _ => InboundEvent::Unrecognized(kind),
        };
        Ok(event)
    }

    /// 로그용 타입 이름
    pub fn kind(&self) -> &str {
        match self {
            InboundEvent::NewMessage(_) => "new_message",
            InboundEvent::ConversationUpdated(_) => "conversation_updated",
            InboundEvent::GenericNotificationUpdate => "notification_update",
            InboundEvent::Unrecognized(raw) => raw,
        }
    }
}
