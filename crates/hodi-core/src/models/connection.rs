//! 라이브 채널 연결 상태.

use serde::{Deserialize, Serialize};

/// 전달 엔진의 연결 상태
///
/// 엔진이 단독으로 소유하며, 채널 수명주기 신호와 재연결 정책에 의해서만 바뀐다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// 초기 상태 / 엔진 정지 후
    #[default]
    Disconnected,
    /// 라이브 채널 다이얼 진행 중
    Connecting,
    /// 라이브 채널 정상
    Connected,
    /// 재연결 타이머 대기 중
    Reconnecting,
    /// 재시도 예산 소진 — 이번 세션 동안 폴링만 사용
    PollingFallback,
}

impl ConnectionState {
    /// 폴백 타이머 틱이 스냅샷 조회를 일으키는 상태인지
    pub fn polls_on_tick(&self) -> bool {
        !matches!(self, ConnectionState::Connected)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Connected => write!(f, "Connected"),
            ConnectionState::Reconnecting => write!(f, "Reconnecting"),
            ConnectionState::PollingFallback => write!(f, "PollingFallback"),
        }
    }
}
