//! 프레젠테이션 싱크 포트.
//!
//! 구현: `hodi-app` crate (콘솔 렌더러)

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::snapshot::{ConversationId, NotificationSnapshot};

/// 사용자 알림 권한 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertPermission {
    /// 허용됨
    Granted,
    /// 거부됨
    Denied,
    /// 아직 묻지 않음
    Default,
}

/// 새 메시지 알림
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageAlert {
    /// 알림 제목
    pub title: String,
    /// 알림 본문
    pub body: String,
    /// 관련 대화 (클릭 시 이동 대상)
    pub conversation_id: Option<ConversationId>,
}

impl MessageAlert {
    /// 알림 클릭 시 이동할 대화 경로
    pub fn navigation_path(&self) -> Option<String> {
        self.conversation_id
            .as_ref()
            .map(|id| format!("/chat/conversations/{id}/"))
    }
}

/// 스냅샷 렌더링 및 네이티브 알림 표시
#[async_trait]
pub trait PresentationSink: Send + Sync {
    /// 새 스냅샷 렌더링 (이전 화면을 통째로 교체)
    ///
    /// 전달 엔진 루프 안에서 완료 순서대로 await 되므로 바로 반환해야 한다.
    /// 렌더링이 길어지면 재연결 타이머, 폴링 틱, 명령 처리가 그만큼 밀린다.
    /// 느린 출력 대상은 내부에서 별도 태스크로 넘길 것.
    async fn render(&self, snapshot: &NotificationSnapshot) -> Result<(), CoreError>;

    /// 현재 알림 권한 (엔진은 조회만 하고 요청하지 않음)
    fn alert_permission(&self) -> AlertPermission;

    /// 알림 권한 요청 (호스트가 시작 시 한 번 호출)
    async fn request_alert_permission(&self) -> AlertPermission {
        self.alert_permission()
    }

    /// 네이티브 알림 표시
    async fn raise_alert(&self, alert: &MessageAlert) -> Result<(), CoreError>;
}
