//! 미읽음 알림 스냅샷 모델.
//!
//! 서버의 `unread-conversations` 응답을 그대로 표현한다.
//! 스냅샷은 조회할 때마다 통째로 교체되며 부분 병합하지 않는다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// 대화 식별자 (불투명 값)
///
/// 서버는 숫자 또는 문자열로 보낼 수 있으므로 둘 다 받아 문자열로 보관한다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    /// 새 식별자 생성
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ConversationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl<'de> Deserialize<'de> for ConversationId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Unsigned(u64),
            Signed(i64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => Self(s),
            RawId::Unsigned(n) => Self(n.to_string()),
            RawId::Signed(n) => Self(n.to_string()),
        })
    }
}

/// 대화 우선순위
///
/// 서버 기본값(`medium`), `low` 등 알 수 없는 값은 모두 `Normal`로 취급한다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High = 1,
    Urgent = 2,
    #[default]
    #[serde(other)]
    Normal = 0,
}

/// 미읽음 대화 요약
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    /// 대화 ID
    pub conversation_id: ConversationId,
    /// 대화 제목
    #[serde(default)]
    pub subject: Option<String>,
    /// 마지막 메시지 본문
    #[serde(default)]
    pub last_message: Option<String>,
    /// 마지막 메시지 시각 (메시지가 없는 대화는 null)
    #[serde(default)]
    pub last_message_at: Option<DateTime<Utc>>,
    /// 메시지를 보낸 단말 ID
    #[serde(default)]
    pub device_id: Option<String>,
    /// 우선순위
    #[serde(default)]
    pub priority: Priority,
    /// 서버가 지역화한 우선순위 라벨
    #[serde(default)]
    pub priority_display: Option<String>,
    /// 관리자 기준 미읽음 메시지 수
    #[serde(rename = "unread_count_admin", default)]
    pub unread_count_for_admin: u32,
    /// 대화 화면 경로
    #[serde(rename = "conversation_url")]
    pub navigation_url: String,
}

/// 미읽음 상태 스냅샷 — 서버가 권위 있는 단일 출처
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationSnapshot {
    /// 서버가 정한 순서의 미읽음 대화 목록 (순서 보존)
    #[serde(rename = "unread_conversations", default)]
    pub conversations: Vec<ConversationSummary>,
    /// 전체 미읽음 메시지 수
    #[serde(default)]
    pub total_unread_count: u64,
    /// 미읽음 대화 수
    #[serde(rename = "unread_conversations_count", default)]
    pub unread_conversation_count: u64,
}

impl NotificationSnapshot {
    /// 미읽음이 하나도 없는지
    pub fn is_empty(&self) -> bool {
        self.total_unread_count == 0 && self.conversations.is_empty()
    }
}
