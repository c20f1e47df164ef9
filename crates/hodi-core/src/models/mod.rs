//! HODI 도메인 모델.
//!
//! 서버에서 받는 미읽음 스냅샷, 라이브 채널 이벤트, 연결 상태를 정의한다.
//! 와이어 포맷 모델은 `serde` Serialize/Deserialize를 구현한다.

pub mod connection;
pub mod event;
pub mod snapshot;
