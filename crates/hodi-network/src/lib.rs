//! # hodi-network
//!
//! HTTP/WebSocket 네트워크 어댑터.
//! 미읽음 스냅샷 조회와 읽음 처리(REST), 알림 푸시 수신(WebSocket)을 담당하며
//! 동일 출처 세션 쿠키와 CSRF 헤더를 자동으로 붙인다.
//!
//! ## 사용 예시
//!
//! ```rust,ignore
//! use hodi_network::csrf::CookieCsrfProvider;
//! use hodi_network::http_client::HttpNotificationClient;
//! use hodi_network::ws_client::{live_channel_url, WsLiveChannel};
//! ```

pub mod csrf;
pub mod http_client;
pub mod ws_client;
