//! 애플리케이션 설정 구조체.
//!
//! 서버 엔드포인트, 전달 엔진 타이밍, 세션 인증, 알림 설정을 정의한다.
//! `ConfigManager`를 통해 JSON 파일에서 로드하며, 모든 필드에 기본값이 있다.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::CoreError;

/// 최상위 애플리케이션 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 서버 연결 설정
    #[serde(default)]
    pub server: ServerConfig,
    /// 전달 엔진 설정 (재연결/폴백/읽음 처리)
    #[serde(default)]
    pub delivery: DeliveryConfig,
    /// 세션 인증 설정
    #[serde(default)]
    pub auth: AuthConfig,
    /// 알림 설정
    #[serde(default)]
    pub notification: NotificationConfig,
}

// ============================================================
// 서버 설정
// ============================================================

/// 서버 연결 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 서버 기본 URL (예: "https://chat.example.com")
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// 요청 타임아웃 (밀리초)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// 미읽음 스냅샷 조회 경로
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,
    /// 읽음 처리 경로 (`{id}`가 대화 ID로 치환됨)
    #[serde(default = "default_mark_read_path")]
    pub mark_read_path: String,
    /// 라이브 채널(WebSocket) 경로
    #[serde(default = "default_live_channel_path")]
    pub live_channel_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_ms: default_request_timeout_ms(),
            snapshot_path: default_snapshot_path(),
            mark_read_path: default_mark_read_path(),
            live_channel_path: default_live_channel_path(),
        }
    }
}

// ============================================================
// 전달 엔진 설정
// ============================================================

/// 전달 엔진 설정
///
/// 재연결 지연은 고정값이며 지터를 넣지 않는다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// 폴백 전환 전 최대 재연결 시도 횟수
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    /// 채널 유실 후 재연결까지 대기 (밀리초)
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    /// 폴백 폴링 주기 (밀리초)
    #[serde(default = "default_fallback_poll_interval_ms")]
    pub fallback_poll_interval_ms: u64,
    /// 읽음 처리 성공 후 후속 조회까지 대기 (밀리초)
    #[serde(default = "default_mark_read_settle_ms")]
    pub mark_read_settle_ms: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: default_max_reconnect_attempts(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            fallback_poll_interval_ms: default_fallback_poll_interval_ms(),
            mark_read_settle_ms: default_mark_read_settle_ms(),
        }
    }
}

impl DeliveryConfig {
    /// 재연결 지연을 Duration으로 반환
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// 폴백 폴링 주기를 Duration으로 반환
    pub fn fallback_poll_interval(&self) -> Duration {
        Duration::from_millis(self.fallback_poll_interval_ms)
    }

    /// 읽음 처리 후 대기 시간을 Duration으로 반환
    pub fn mark_read_settle(&self) -> Duration {
        Duration::from_millis(self.mark_read_settle_ms)
    }
}

// ============================================================
// 인증 설정
// ============================================================

/// 세션 인증 설정 — 동일 출처 쿠키 + CSRF 헤더
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// 요청에 실어 보낼 `Cookie` 헤더 값 (세션 + csrftoken)
    #[serde(default)]
    pub session_cookie: Option<String>,
    /// CSRF 토큰이 담긴 쿠키 이름
    #[serde(default = "default_csrf_cookie_name")]
    pub csrf_cookie_name: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_cookie: None,
            csrf_cookie_name: default_csrf_cookie_name(),
        }
    }
}

// ============================================================
// 알림 설정
// ============================================================

/// 새 메시지 알림 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// 네이티브 알림 활성화 여부
    #[serde(default = "default_true")]
    pub alerts_enabled: bool,
    /// 페이로드에 제목이 없을 때 사용할 제목
    #[serde(default = "default_alert_title")]
    pub default_alert_title: String,
    /// 페이로드에 본문이 없을 때 사용할 본문
    #[serde(default = "default_alert_body")]
    pub default_alert_body: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            alerts_enabled: true,
            default_alert_title: default_alert_title(),
            default_alert_body: default_alert_body(),
        }
    }
}

impl AppConfig {
    /// 기본 설정 생성
    pub fn default_config() -> Self {
        Self {
            server: ServerConfig::default(),
            delivery: DeliveryConfig::default(),
            auth: AuthConfig::default(),
            notification: NotificationConfig::default(),
        }
    }

    /// 서버 요청 타임아웃을 Duration으로 반환
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.server.request_timeout_ms)
    }

    /// 설정값 검증
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.server.base_url.trim().is_empty() {
            return Err(invalid("server.base_url", "비어 있을 수 없습니다"));
        }
        if !self.server.mark_read_path.contains("{id}") {
            return Err(invalid(
                "server.mark_read_path",
                "{id} 자리표시자가 필요합니다",
            ));
        }
        if self.server.request_timeout_ms == 0 {
            return Err(invalid("server.request_timeout_ms", "0보다 커야 합니다"));
        }
        if self.delivery.max_reconnect_attempts == 0 {
            return Err(invalid(
                "delivery.max_reconnect_attempts",
                "0보다 커야 합니다",
            ));
        }
        if self.delivery.reconnect_delay_ms == 0 {
            return Err(invalid("delivery.reconnect_delay_ms", "0보다 커야 합니다"));
        }
        if self.delivery.fallback_poll_interval_ms == 0 {
            return Err(invalid(
                "delivery.fallback_poll_interval_ms",
                "0보다 커야 합니다",
            ));
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

fn invalid(field: &str, message: &str) -> CoreError {
    CoreError::Validation {
        field: field.to_string(),
        message: message.to_string(),
    }
}

// ============================================================
// 기본값 함수
// ============================================================

fn default_true() -> bool {
    true
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}
fn default_request_timeout_ms() -> u64 {
    30_000
}
fn default_snapshot_path() -> String {
    "/api/chat/notifications/unread-conversations/".to_string()
}
fn default_mark_read_path() -> String {
    "/api/chat/conversations/{id}/messages/read/".to_string()
}
fn default_live_channel_path() -> String {
    "/ws/notifications/".to_string()
}
fn default_max_reconnect_attempts() -> u32 {
    5
}
fn default_reconnect_delay_ms() -> u64 {
    3_000
}
fn default_fallback_poll_interval_ms() -> u64 {
    30_000
}
fn default_mark_read_settle_ms() -> u64 {
    500
}
fn default_csrf_cookie_name() -> String {
    "csrftoken".to_string()
}
fn default_alert_title() -> String {
    "New Chat Message".to_string()
}
fn default_alert_body() -> String {
    "You have a new message".to_string()
}
