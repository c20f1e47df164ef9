//! 콘솔 프레젠테이션 싱크.
//!
//! 스냅샷을 텍스트 패널로 다시 그리고, 새 메시지 알림을 한 줄로 출력한다.

use async_trait::async_trait;
use hodi_core::error::CoreError;
use hodi_core::models::snapshot::NotificationSnapshot;
use hodi_core::ports::presentation::{AlertPermission, MessageAlert, PresentationSink};
use hodi_sync::presenter::{self, NotificationView};
use parking_lot::Mutex;
use std::io::Write;
use tracing::debug;

/// 콘솔 렌더러 — `PresentationSink` 포트 구현
pub struct ConsoleSink {
    out: Mutex<Box<dyn Write + Send>>,
    permission: Mutex<AlertPermission>,
    alerts_enabled: bool,
}

impl ConsoleSink {
    /// 표준 출력용 싱크
    pub fn stdout(alerts_enabled: bool) -> Self {
        Self::with_writer(Box::new(std::io::stdout()), alerts_enabled)
    }

    /// 임의 출력 대상 싱크
    pub fn with_writer(out: Box<dyn Write + Send>, alerts_enabled: bool) -> Self {
        Self {
            out: Mutex::new(out),
            permission: Mutex::new(AlertPermission::Default),
            alerts_enabled,
        }
    }

    fn write_block(&self, text: &str) -> Result<(), CoreError> {
        let mut out = self.out.lock();
        out.write_all(text.as_bytes())?;
        out.flush()?;
        Ok(())
    }
}

/// 표시 데이터 → 콘솔 텍스트
pub fn format_view(view: &NotificationView) -> String {
    let mut text = String::new();
    let badge = view.badge.as_deref().map(|b| format!(" [{b}]")).unwrap_or_default();
    text.push_str(&format!("── Notifications{badge} ──\n"));
    text.push_str(&view.header);
    text.push('\n');

    for conversation in &view.conversations {
        let unread = conversation
            .unread_badge
            .as_deref()
            .map(|n| format!(" ({n})"))
            .unwrap_or_default();
        let time = if conversation.time_text.is_empty() {
            String::new()
        } else {
            format!(" · {}", conversation.time_text)
        };
        text.push_str(&format!(
            "  [{}] {}{} · {}{}\n",
            conversation.tone.as_str(),
            conversation.subject,
            unread,
            conversation.priority_label,
            time,
        ));
        text.push_str(&format!(
            "      {} (device {}) → {}\n",
            conversation.last_message, conversation.device, conversation.navigation_url
        ));
    }
    text
}

/// 알림 → 콘솔 한 줄
pub fn format_alert(alert: &MessageAlert) -> String {
    match alert.navigation_path() {
        Some(path) => format!("[ALERT] {}: {} → {}\n", alert.title, alert.body, path),
        None => format!("[ALERT] {}: {}\n", alert.title, alert.body),
    }
}

#[async_trait]
impl PresentationSink for ConsoleSink {
    async fn render(&self, snapshot: &NotificationSnapshot) -> Result<(), CoreError> {
        let view = presenter::present(snapshot);
        self.write_block(&format_view(&view))
    }

    fn alert_permission(&self) -> AlertPermission {
        *self.permission.lock()
    }

    async fn request_alert_permission(&self) -> AlertPermission {
        let granted = if self.alerts_enabled {
            AlertPermission::Granted
        } else {
            AlertPermission::Denied
        };
        *self.permission.lock() = granted;
        debug!("알림 권한: {granted:?}");
        granted
    }

    async fn raise_alert(&self, alert: &MessageAlert) -> Result<(), CoreError> {
        self.write_block(&format_alert(alert))
    }
}
