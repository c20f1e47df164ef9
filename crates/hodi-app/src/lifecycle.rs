//! 라이프사이클 관리.
//!
//! 종료 사유 브로드캐스트와 OS 시그널 대기. 먼저 들어온 사유 하나만 기록된다.

use std::fmt;
use tokio::sync::watch;
use tracing::info;

/// 종료 사유
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// OS 시그널 (SIGINT, SIGTERM, Ctrl+C)
    Signal(&'static str),
    /// 콘솔 `quit` 명령
    HostQuit,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::Signal(name) => write!(f, "{name} 수신"),
            ShutdownReason::HostQuit => f.write_str("quit 명령"),
        }
    }
}

/// 라이프사이클 관리자
pub struct LifecycleManager {
    shutdown_tx: watch::Sender<Option<ShutdownReason>>,
}

impl LifecycleManager {
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(None);
        Self { shutdown_tx }
    }

    /// 종료 수신기 (값이 `Some`이 되면 종료)
    pub fn subscribe(&self) -> watch::Receiver<Option<ShutdownReason>> {
        self.shutdown_tx.subscribe()
    }

    /// 종료 요청. 이미 종료 중이면 처음 사유를 유지한다.
    pub fn shutdown(&self, reason: ShutdownReason) {
        let first = self.shutdown_tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        });
        if first {
            info!("종료 요청: {reason}");
        }
    }

    /// 기록된 종료 사유
    pub fn reason(&self) -> Option<ShutdownReason> {
        *self.shutdown_tx.borrow()
    }

    /// OS 시그널 대기 (SIGINT, SIGTERM) 후 종료 요청
    pub async fn wait_for_signal(&self) -> std::io::Result<()> {
        #[cfg(unix)]
        let name = {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigint = signal(SignalKind::interrupt())?;
            let mut sigterm = signal(SignalKind::terminate())?;

            tokio::select! {
                _ = sigint.recv() => "SIGINT",
                _ = sigterm.recv() => "SIGTERM",
            }
        };

        #[cfg(not(unix))]
        let name = {
            tokio::signal::ctrl_c().await?;
            "Ctrl+C"
        };

        self.shutdown(ShutdownReason::Signal(name));
        Ok(())
    }
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}
