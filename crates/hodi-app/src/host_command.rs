//! 표준 입력 호스트 명령.
//!
//! 브라우저 호스트가 엔진에 주던 이벤트(가시성, 포커스, 읽음 클릭)를
//! 콘솔에서는 한 줄 명령으로 받는다.

use hodi_core::error::CoreError;
use hodi_core::models::snapshot::ConversationId;

/// 도움말 문구
pub const HELP: &str =
    "commands: read <id> | focus | visible | refresh | status | help | quit";

/// 호스트 명령
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCommand {
    /// 대화 읽음 처리
    Read(ConversationId),
    /// 창 포커스 복귀
    Focus,
    /// 페이지 가시성 복귀
    Visible,
    /// 수동 새로고침
    Refresh,
    /// 현재 상태 출력
    Status,
    /// 도움말 출력
    Help,
    /// 종료
    Quit,
}

impl HostCommand {
    /// 입력 한 줄 파싱 (빈 줄은 `None`)
    pub fn parse(line: &str) -> Result<Option<Self>, CoreError> {
        let mut parts = line.split_whitespace();
        let Some(verb) = parts.next() else {
            return Ok(None);
        };

        let command = match verb.to_ascii_lowercase().as_str() {
            "read" => {
                let id = parts.next().ok_or_else(|| CoreError::Validation {
                    field: "read".to_string(),
                    message: "대화 ID가 필요합니다".to_string(),
                })?;
                HostCommand::Read(ConversationId::new(id))
            }
            "focus" => HostCommand::Focus,
            "visible" => HostCommand::Visible,
            "refresh" => HostCommand::Refresh,
            "status" => HostCommand::Status,
            "help" | "?" => HostCommand::Help,
            "quit" | "exit" => HostCommand::Quit,
            other => {
                return Err(CoreError::Validation {
                    field: "command".to_string(),
                    message: format!("알 수 없는 명령: {other}"),
                })
            }
        };
        Ok(Some(command))
    }
}
