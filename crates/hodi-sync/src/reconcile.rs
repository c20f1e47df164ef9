//! 수신 이벤트 조정 규칙.
//!
//! 페이로드를 스냅샷에 병합하지 않는다. 서버를 단일 진실 공급원으로 보고
//! 관련 이벤트마다 스냅샷을 한 번 다시 조회한다.

use hodi_core::config::NotificationConfig;
use hodi_core::models::event::InboundEvent;
use hodi_core::ports::presentation::MessageAlert;
use tracing::{debug, info};

/// 이벤트 하나에 대한 엔진의 반응
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reaction {
    /// 스냅샷 재조회 필요 여부
    pub refresh: bool,
    /// 표시할 네이티브 알림
    pub alert: Option<MessageAlert>,
}

/// 이벤트 → 반응 결정
pub fn plan(event: &InboundEvent, notification: &NotificationConfig) -> Reaction {
    match event {
        InboundEvent::NewMessage(payload) => {
            debug!("새 메시지 이벤트: conversation_id={:?}", payload.conversation_id);
            let alert = MessageAlert {
                title: payload
                    .title
                    .clone()
                    .unwrap_or_else(|| notification.default_alert_title.clone()),
                body: payload
                    .body
                    .clone()
                    .unwrap_or_else(|| notification.default_alert_body.clone()),
                conversation_id: payload.conversation_id.clone(),
            };
            Reaction {
                refresh: true,
                alert: Some(alert),
            }
        }
        InboundEvent::ConversationUpdated(_) | InboundEvent::GenericNotificationUpdate => {
            Reaction {
                refresh: true,
                alert: None,
            }
        }
        InboundEvent::Unrecognized(raw) => {
            info!("알 수 없는 알림 타입 무시: {raw:?}");
            Reaction::default()
        }
    }
}
