//! HTTP REST 알림 클라이언트.
//!
//! `NotificationApi` 포트 구현. 모든 요청에 CSRF 헤더와 세션 쿠키를 붙인다.
//! 재시도는 하지 않는다. 실패하면 다음 자연 트리거(타이머/이벤트/포커스)를 기다린다.

use async_trait::async_trait;
use hodi_core::config::ServerConfig;
use hodi_core::error::CoreError;
use hodi_core::models::snapshot::{ConversationId, NotificationSnapshot};
use hodi_core::ports::api_client::{CsrfTokenProvider, NotificationApi};
use reqwest::header::{CONTENT_TYPE, COOKIE, RETRY_AFTER};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// CSRF 토큰 헤더 이름
const CSRF_HEADER: &str = "X-CSRFToken";

/// Retry-After 헤더가 없을 때 기본 대기 (초)
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// REST 알림 클라이언트 — `NotificationApi` 포트 구현
pub struct HttpNotificationClient {
    client: reqwest::Client,
    base_url: String,
    snapshot_path: String,
    mark_read_path: String,
    session_cookie: Option<String>,
    csrf: Arc<dyn CsrfTokenProvider>,
}

impl HttpNotificationClient {
    /// 새 HTTP 알림 클라이언트 생성
    pub fn new(
        server: &ServerConfig,
        timeout: Duration,
        session_cookie: Option<String>,
        csrf: Arc<dyn CsrfTokenProvider>,
    ) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Network(format!("HTTP 클라이언트 빌드 실패: {}", e)))?;

        Ok(Self {
            client,
            base_url: server.base_url.trim_end_matches('/').to_string(),
            snapshot_path: server.snapshot_path.clone(),
            mark_read_path: server.mark_read_path.clone(),
            session_cookie,
            csrf,
        })
    }

    /// CSRF 헤더 + 세션 쿠키가 포함된 요청 빌더 반환
    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        // 토큰이 없으면 빈 값을 보낸다 (서버가 403으로 판단)
        let token = self.csrf.csrf_token().unwrap_or_default();

        let builder = self
            .client
            .request(method, &url)
            .header(CSRF_HEADER, token)
            .header(CONTENT_TYPE, "application/json");

        match &self.session_cookie {
            Some(cookie) => builder.header(COOKIE, cookie.as_str()),
            None => builder,
        }
    }

    /// 읽음 처리 경로 (`{id}` 치환)
    fn mark_read_url_path(&self, conversation_id: &ConversationId) -> String {
        self.mark_read_path
            .replace("{id}", conversation_id.as_str())
    }

    /// 응답 상태 코드 확인 및 에러 매핑
    async fn check_response(
        &self,
        resp: reqwest::Response,
    ) -> Result<reqwest::Response, CoreError> {
        let status = resp.status();

        if status.is_success() {
            return Ok(resp);
        }

        let retry_after = resp
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS);

        let text = resp.text().await.unwrap_or_else(|e| {
            warn!("응답 본문 읽기 실패: {e}");
            String::new()
        });

        match status.as_u16() {
            401 | 403 => Err(CoreError::Auth(format!("인증 실패 ({status}): {text}"))),
            404 => Err(CoreError::NotFound {
                resource_type: "API".to_string(),
                id: text,
            }),
            429 => Err(CoreError::RateLimit {
                retry_after_secs: retry_after,
            }),
            503 => Err(CoreError::ServiceUnavailable(text)),
            _ => Err(CoreError::Internal(format!("API 에러 ({status}): {text}"))),
        }
    }
}

#[async_trait]
impl NotificationApi for HttpNotificationClient {
    async fn fetch_snapshot(&self) -> Result<NotificationSnapshot, CoreError> {
        let resp = self
            .request(reqwest::Method::GET, &self.snapshot_path)
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("스냅샷 조회 요청 실패: {e}")))?;

        let resp = self.check_response(resp).await?;
        let body = resp
            .text()
            .await
            .map_err(|e| CoreError::Network(format!("스냅샷 응답 수신 실패: {e}")))?;
        let snapshot: NotificationSnapshot = serde_json::from_str(&body)?;

        debug!(
            "스냅샷 조회 성공: 미읽음 {}건, 대화 {}개",
            snapshot.total_unread_count,
            snapshot.conversations.len()
        );
        Ok(snapshot)
    }

    async fn mark_conversation_read(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<(), CoreError> {
        debug!("읽음 처리 요청: conversation_id={conversation_id}");

        let path = self.mark_read_url_path(conversation_id);
        let resp = self
            .request(reqwest::Method::POST, &path)
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("읽음 처리 요청 실패: {e}")))?;

        self.check_response(resp).await?;
        Ok(())
    }
}
