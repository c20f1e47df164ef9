//! 알림 프레젠터.
//!
//! NotificationSnapshot → 표시용 텍스트 변환. 마크업은 만들지 않는다.

use chrono::{DateTime, Utc};
use hodi_core::models::snapshot::{ConversationSummary, NotificationSnapshot, Priority};

const SUBJECT_MAX_CHARS: usize = 30;
const MESSAGE_MAX_CHARS: usize = 50;
const DEVICE_MAX_CHARS: usize = 15;

/// 우선순위 표시 톤
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// urgent
    Danger,
    /// high
    Warning,
    /// normal
    Info,
}

impl Tone {
    /// 톤 이름 (스타일 클래스용)
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Danger => "danger",
            Tone::Warning => "warning",
            Tone::Info => "info",
        }
    }
}

/// 대화 한 줄 표시 데이터
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationView {
    /// 제목 (잘림)
    pub subject: String,
    /// 마지막 메시지 (잘림)
    pub last_message: String,
    /// 장치 ID (잘림)
    pub device: String,
    /// 상대 시간 텍스트
    pub time_text: String,
    /// 우선순위 라벨
    pub priority_label: String,
    /// 우선순위 톤
    pub tone: Tone,
    /// 대화별 미읽음 배지 (2건 이상일 때만)
    pub unread_badge: Option<String>,
    /// 이동 경로
    pub navigation_url: String,
}

/// 알림 패널 전체 표시 데이터
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationView {
    /// 배지 숫자 (0이면 숨김)
    pub badge: Option<String>,
    /// 헤더 문구
    pub header: String,
    /// 대화 목록 (서버 순서 유지)
    pub conversations: Vec<ConversationView>,
}

/// 스냅샷 → 표시 데이터 (현재 시각 기준)
pub fn present(snapshot: &NotificationSnapshot) -> NotificationView {
    present_at(snapshot, Utc::now())
}

/// 스냅샷 → 표시 데이터 (기준 시각 지정)
pub fn present_at(snapshot: &NotificationSnapshot, now: DateTime<Utc>) -> NotificationView {
    NotificationView {
        badge: badge_text(snapshot.total_unread_count),
        header: header_text(snapshot.total_unread_count),
        conversations: snapshot
            .conversations
            .iter()
            .map(|c| present_conversation(c, now))
            .collect(),
    }
}

/// 대화 요약 → 표시 데이터
pub fn present_conversation(
    conversation: &ConversationSummary,
    now: DateTime<Utc>,
) -> ConversationView {
    ConversationView {
        subject: truncate(
            non_empty(&conversation.subject).unwrap_or("Emergency Chat"),
            SUBJECT_MAX_CHARS,
        ),
        last_message: truncate(
            non_empty(&conversation.last_message).unwrap_or("New conversation started"),
            MESSAGE_MAX_CHARS,
        ),
        device: truncate(
            non_empty(&conversation.device_id).unwrap_or("Unknown"),
            DEVICE_MAX_CHARS,
        ),
        time_text: conversation
            .last_message_at
            .map(|at| format_relative_time(at, now))
            .unwrap_or_default(),
        priority_label: conversation
            .priority_display
            .clone()
            .unwrap_or_else(|| priority_to_label(conversation.priority).to_string()),
        tone: priority_to_tone(conversation.priority),
        unread_badge: (conversation.unread_count_for_admin > 1)
            .then(|| conversation.unread_count_for_admin.to_string()),
        navigation_url: conversation.navigation_url.clone(),
    }
}

fn badge_text(total: u64) -> Option<String> {
    (total > 0).then(|| total.to_string())
}

fn header_text(total: u64) -> String {
    match total {
        0 => "No unread messages.".to_string(),
        1 => "You have 1 unread message.".to_string(),
        n => format!("You have {n} unread messages."),
    }
}

fn priority_to_tone(p: Priority) -> Tone {
    match p {
        Priority::Urgent => Tone::Danger,
        Priority::High => Tone::Warning,
        Priority::Normal => Tone::Info,
    }
}

fn priority_to_label(p: Priority) -> &'static str {
    match p {
        Priority::Urgent => "Urgent",
        Priority::High => "High",
        Priority::Normal => "Normal",
    }
}

/// 빈 문자열은 값 없음과 같게 취급
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// 문자 단위로 자르고 "..." 붙임
fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{cut}...")
}

fn format_relative_time(dt: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = now - dt;

    if diff.num_seconds() < 60 {
        "Just now".to_string()
    } else if diff.num_minutes() < 60 {
        format!("{}m ago", diff.num_minutes())
    } else if diff.num_hours() < 24 {
        format!("{}h ago", diff.num_hours())
    } else {
        format!("{}d ago", diff.num_days())
    }
}
