//! 라이브 채널 포트.
//!
//! 구현: `hodi-network` crate (tokio-tungstenite)
//!
//! 채널은 재시도를 하지 않는다. 연결 실패나 종료는 `Closed` 신호로만 알리고,
//! 재연결 여부는 전달 엔진의 재연결 정책이 결정한다.

use tokio::sync::mpsc;

use crate::models::event::InboundEvent;

/// 채널 수명주기 신호 (한 채널 인스턴스 안에서는 전송 순서대로 전달됨)
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelSignal {
    /// 연결 수립
    Opened,
    /// 파싱된 메시지 (잘못된 프레임은 채널이 로그 후 건너뜀)
    Message(InboundEvent),
    /// 전송 에러 — 로그용, 상태를 바꾸지 않음
    Error(String),
    /// 채널 유실 (연결 실패 포함)
    Closed,
}

/// 열린 채널 핸들
pub trait ChannelHandle: Send {
    /// 채널 닫기. 어느 상태에서 몇 번 호출해도 안전하다.
    fn close(&mut self);
}

/// 지속 연결형 푸시 채널
pub trait LiveChannel: Send + Sync {
    /// 비동기 다이얼 시작
    ///
    /// 즉시 핸들을 반환하고, 이후 수명주기 신호를 `signals`로 보낸다.
    /// 다이얼 실패 시에는 `Error` 후 `Closed`를 보낸다.
    fn open(&self, url: &str, signals: mpsc::Sender<ChannelSignal>) -> Box<dyn ChannelHandle>;
}
