//! 재연결 정책.
//!
//! 채널 유실 신호마다 다음 행동(고정 지연 후 재시도 / 폴링 폴백)을 결정한다.
//! 지연은 지수 증가나 지터 없이 항상 같다.

use hodi_core::config::DeliveryConfig;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 재시도 예산
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    /// 마지막 성공 이후 재시도 횟수
    pub attempt_count: u32,
    /// 최대 재시도 횟수
    pub max_attempts: u32,
    /// 재시도 간 고정 지연
    pub delay: Duration,
}

impl RetryBudget {
    /// 남은 재시도가 없는지
    pub fn is_exhausted(&self) -> bool {
        self.attempt_count >= self.max_attempts
    }
}

/// 채널 유실 후 결정
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// `delay` 후 재연결 (`attempt`는 1부터 시작)
    Retry { attempt: u32, delay: Duration },
    /// 라이브 채널 포기, 폴링으로 전환
    Fallback,
}

/// 고정 지연 재연결 정책
///
/// 한 번 폴백하면 세션이 끝날 때까지 다시 재시도하지 않는다.
#[derive(Debug)]
pub struct ReconnectPolicy {
    budget: RetryBudget,
    abandoned: bool,
}

impl ReconnectPolicy {
    /// 새 정책 생성
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            budget: RetryBudget {
                attempt_count: 0,
                max_attempts,
                delay,
            },
            abandoned: false,
        }
    }

    /// 전달 설정에서 생성
    pub fn from_config(config: &DeliveryConfig) -> Self {
        Self::new(config.max_reconnect_attempts, config.reconnect_delay())
    }

    /// 채널 유실 처리
    pub fn on_channel_lost(&mut self) -> ReconnectDecision {
        if self.abandoned {
            return ReconnectDecision::Fallback;
        }

        if self.budget.is_exhausted() {
            self.abandoned = true;
            warn!(
                "재연결 {}회 모두 실패 - 폴링 모드로 전환",
                self.budget.max_attempts
            );
            return ReconnectDecision::Fallback;
        }

        self.budget.attempt_count += 1;
        debug!(
            "재연결 예약 ({}/{}), {}ms 후",
            self.budget.attempt_count,
            self.budget.max_attempts,
            self.budget.delay.as_millis()
        );
        ReconnectDecision::Retry {
            attempt: self.budget.attempt_count,
            delay: self.budget.delay,
        }
    }

    /// 연결 성공 기록 — 재시도 카운터 리셋
    pub fn record_success(&mut self) {
        if self.abandoned {
            return;
        }
        if self.budget.attempt_count > 0 {
            info!(
                "라이브 채널 복구됨 ({}회 재시도 후)",
                self.budget.attempt_count
            );
        }
        self.budget.attempt_count = 0;
    }

    /// 현재 재시도 횟수
    pub fn attempt_count(&self) -> u32 {
        self.budget.attempt_count
    }

    /// 라이브 채널을 영구히 포기했는지
    pub fn is_abandoned(&self) -> bool {
        self.abandoned
    }

    /// 현재 예산 스냅샷
    pub fn budget(&self) -> RetryBudget {
        self.budget
    }
}
