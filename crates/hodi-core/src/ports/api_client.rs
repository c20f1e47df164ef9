//! 알림 API 클라이언트 포트.
//!
//! 구현: `hodi-network` crate (reqwest)

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::snapshot::{ConversationId, NotificationSnapshot};

/// 요청/응답형 알림 데이터 소스
#[async_trait]
pub trait NotificationApi: Send + Sync {
    /// 현재 미읽음 스냅샷 조회
    ///
    /// 2xx가 아닌 응답은 에러이며, 호출자는 이전 스냅샷을 유지해야 한다.
    async fn fetch_snapshot(&self) -> Result<NotificationSnapshot, CoreError>;

    /// 대화를 읽음으로 표시
    async fn mark_conversation_read(&self, conversation_id: &ConversationId)
        -> Result<(), CoreError>;
}

/// CSRF 토큰 조회 (외부 협력자)
pub trait CsrfTokenProvider: Send + Sync {
    /// 현재 CSRF 토큰. 없으면 `None`
    fn csrf_token(&self) -> Option<String>;
}
