//! # hodi-sync
//!
//! 미읽음 알림 전달 엔진.
//!
//! 라이브 채널(WebSocket)이 살아 있으면 푸시 이벤트로, 끊기면 재연결 정책에 따라
//! 재시도하고, 재시도 예산이 소진되면 주기 폴링으로 스냅샷을 동기화한다.
//!
//! - [`engine`] — 연결 상태 머신 + 명령 큐 기반 단일 소비자 루프
//! - [`reconnect`] — 고정 지연 재연결 정책 (RetryBudget)
//! - [`reconcile`] — 수신 이벤트 → 재조회/알림 결정
//! - [`presenter`] — 스냅샷 → 표시용 텍스트 변환

pub mod engine;
pub mod presenter;
pub mod reconcile;
pub mod reconnect;

pub use engine::{DeliveryEngine, EngineHandle};
