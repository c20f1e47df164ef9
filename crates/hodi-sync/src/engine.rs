//! 전달 엔진.
//!
//! 연결 상태 머신을 단일 태스크 루프로 구동한다. 호스트 명령, 채널 신호,
//! 재연결 타이머, 폴백 타이머, 백그라운드 작업 완료가 모두 하나의
//! `select!`로 들어오므로 상태와 재시도 예산은 이 루프만 변경한다.
//!
//! 스냅샷은 요청 순서가 아니라 완료 순서대로 적용된다 (마지막 완료 우선).

use hodi_core::config::{DeliveryConfig, NotificationConfig};
use hodi_core::error::CoreError;
use hodi_core::models::connection::ConnectionState;
use hodi_core::models::event::InboundEvent;
use hodi_core::models::snapshot::{ConversationId, NotificationSnapshot};
use hodi_core::ports::api_client::NotificationApi;
use hodi_core::ports::live_channel::{ChannelHandle, ChannelSignal, LiveChannel};
use hodi_core::ports::presentation::{AlertPermission, MessageAlert, PresentationSink};
use std::future::pending;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::{interval_at, Instant, MissedTickBehavior, Sleep};
use tracing::{debug, error, info, warn};

use crate::reconcile;
use crate::reconnect::{ReconnectDecision, ReconnectPolicy};

/// 채널 신호 버퍼 크기
const SIGNAL_BUFFER: usize = 64;

/// 호스트 → 엔진 명령
#[derive(Debug)]
enum EngineCommand {
    /// 페이지가 다시 보이게 됨
    PageVisible,
    /// 창이 입력 포커스를 다시 얻음
    WindowFocused,
    /// 수동 새로고침
    Refresh,
    /// 사용자가 대화를 읽음 처리
    MarkAsRead(ConversationId),
    /// 엔진 정지
    Stop,
}

/// 백그라운드 작업 결과
enum TaskOutcome {
    Fetched {
        seq: u64,
        result: Result<NotificationSnapshot, CoreError>,
    },
    MarkedRead {
        conversation_id: ConversationId,
        result: Result<(), CoreError>,
    },
    Alerted(Result<(), CoreError>),
}

/// 현재 열린 채널과 그 신호 수신기
///
/// 채널을 교체하면 이전 수신기가 버려지므로 이전 채널의 늦은 신호는 무시된다.
struct ChannelLink {
    handle: Box<dyn ChannelHandle>,
    signals: mpsc::Receiver<ChannelSignal>,
}

/// 전달 엔진 — 명시적으로 생성하고 `start`로 구동한다
pub struct DeliveryEngine {
    delivery: DeliveryConfig,
    notification: NotificationConfig,
    channel_url: String,
    channel: Arc<dyn LiveChannel>,
    api: Arc<dyn NotificationApi>,
    sink: Arc<dyn PresentationSink>,
}

impl DeliveryEngine {
    /// 새 엔진 생성
    pub fn new(
        delivery: DeliveryConfig,
        notification: NotificationConfig,
        channel_url: impl Into<String>,
        channel: Arc<dyn LiveChannel>,
        api: Arc<dyn NotificationApi>,
        sink: Arc<dyn PresentationSink>,
    ) -> Self {
        Self {
            delivery,
            notification,
            channel_url: channel_url.into(),
            channel,
            api,
            sink,
        }
    }

    /// 엔진 시작: 라이브 채널 다이얼 + 폴백 타이머 가동
    ///
    /// tokio 런타임 안에서 호출해야 한다. 시작 시점에는 스냅샷을 조회하지 않는다.
    pub fn start(self) -> EngineHandle {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (snapshot_tx, snapshot_rx) = watch::channel(None);

        let mut engine_loop = EngineLoop {
            policy: ReconnectPolicy::from_config(&self.delivery),
            delivery: self.delivery,
            notification: self.notification,
            channel_url: self.channel_url,
            channel: self.channel,
            api: self.api,
            sink: self.sink,
            state: ConnectionState::Disconnected,
            state_tx,
            snapshot_tx,
            commands: command_rx,
            link: None,
            reconnect_timer: None,
            tasks: JoinSet::new(),
            fetch_seq: 0,
        };

        info!("전달 엔진 시작");
        engine_loop.open_channel();
        let task = tokio::spawn(engine_loop.run());

        EngineHandle {
            commands: command_tx,
            state_rx,
            snapshot_rx,
            task,
        }
    }
}

/// 실행 중인 엔진 핸들
///
/// 호스트 이벤트를 엔진 명령 큐로 전달하고, 상태와 최신 스냅샷을 관찰한다.
/// 핸들을 버리면 엔진도 정지한다.
pub struct EngineHandle {
    commands: mpsc::UnboundedSender<EngineCommand>,
    state_rx: watch::Receiver<ConnectionState>,
    snapshot_rx: watch::Receiver<Option<NotificationSnapshot>>,
    task: JoinHandle<()>,
}

impl EngineHandle {
    /// 페이지 가시성 복귀 — 즉시 조회
    pub fn page_visible(&self) {
        self.send(EngineCommand::PageVisible);
    }

    /// 창 포커스 복귀 — 즉시 조회
    pub fn window_focused(&self) {
        self.send(EngineCommand::WindowFocused);
    }

    /// 수동 새로고침
    pub fn refresh(&self) {
        self.send(EngineCommand::Refresh);
    }

    /// 대화 읽음 처리 요청
    pub fn mark_as_read(&self, conversation_id: ConversationId) {
        self.send(EngineCommand::MarkAsRead(conversation_id));
    }

    /// 현재 연결 상태
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// 연결 상태 변경 구독
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// 가장 최근에 적용된 스냅샷
    pub fn latest_snapshot(&self) -> Option<NotificationSnapshot> {
        self.snapshot_rx.borrow().clone()
    }

    /// 스냅샷 변경 구독
    pub fn subscribe_snapshot(&self) -> watch::Receiver<Option<NotificationSnapshot>> {
        self.snapshot_rx.clone()
    }

    /// 엔진 정지 — 타이머 취소, 채널 닫기, 진행 중 작업 중단
    pub async fn stop(self) {
        self.send(EngineCommand::Stop);
        if let Err(e) = self.task.await {
            error!("전달 엔진 태스크 종료 에러: {e}");
        }
    }

    fn send(&self, command: EngineCommand) {
        if self.commands.send(command).is_err() {
            debug!("전달 엔진이 이미 정지됨, 명령 무시");
        }
    }
}

/// 엔진 루프 상태 (루프 태스크가 단독 소유)
struct EngineLoop {
    delivery: DeliveryConfig,
    notification: NotificationConfig,
    channel_url: String,
    channel: Arc<dyn LiveChannel>,
    api: Arc<dyn NotificationApi>,
    sink: Arc<dyn PresentationSink>,
    policy: ReconnectPolicy,
    state: ConnectionState,
    state_tx: watch::Sender<ConnectionState>,
    snapshot_tx: watch::Sender<Option<NotificationSnapshot>>,
    commands: mpsc::UnboundedReceiver<EngineCommand>,
    link: Option<ChannelLink>,
    reconnect_timer: Option<Pin<Box<Sleep>>>,
    tasks: JoinSet<TaskOutcome>,
    fetch_seq: u64,
}

impl EngineLoop {
    async fn run(mut self) {
        let period = self.delivery.fallback_poll_interval();
        let mut poll = interval_at(Instant::now() + period, period);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(EngineCommand::Stop) | None => break,
                    Some(command) => self.handle_command(command),
                },
                signal = next_signal(&mut self.link) => self.handle_signal(signal),
                _ = reconnect_due(&mut self.reconnect_timer) => self.on_reconnect_timer(),
                _ = poll.tick() => self.on_fallback_tick(),
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    self.on_task_done(joined).await;
                }
            }
        }

        self.shutdown();
    }

    fn handle_command(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::PageVisible => self.spawn_fetch("page_visible"),
            EngineCommand::WindowFocused => self.spawn_fetch("window_focused"),
            EngineCommand::Refresh => self.spawn_fetch("manual_refresh"),
            EngineCommand::MarkAsRead(conversation_id) => self.spawn_mark_read(conversation_id),
            EngineCommand::Stop => {}
        }
    }

    fn handle_signal(&mut self, signal: ChannelSignal) {
        match signal {
            ChannelSignal::Opened => self.on_channel_open(),
            ChannelSignal::Message(event) => {
                if self.state == ConnectionState::Connected {
                    self.route_event(event);
                } else {
                    debug!("연결 상태가 아님({}), 이벤트 무시: {}", self.state, event.kind());
                }
            }
            ChannelSignal::Error(detail) => warn!("라이브 채널 에러: {detail}"),
            ChannelSignal::Closed => self.on_channel_lost(),
        }
    }

    fn on_channel_open(&mut self) {
        if self.reconnect_timer.take().is_some() {
            debug!("대기 중이던 재연결 타이머 취소");
        }
        self.policy.record_success();
        self.set_state(ConnectionState::Connected);
        info!("라이브 채널 연결됨");
        self.spawn_fetch("channel_open");
    }

    fn on_channel_lost(&mut self) {
        self.close_channel();

        if !matches!(
            self.state,
            ConnectionState::Connecting | ConnectionState::Connected
        ) {
            debug!("채널 유실 신호 무시 (상태: {})", self.state);
            return;
        }

        match self.policy.on_channel_lost() {
            ReconnectDecision::Retry { attempt, delay } => {
                info!(
                    "라이브 채널 유실 - {}ms 후 재연결 ({attempt}/{})",
                    delay.as_millis(),
                    self.delivery.max_reconnect_attempts
                );
                self.reconnect_timer = Some(Box::pin(tokio::time::sleep(delay)));
                self.set_state(ConnectionState::Reconnecting);
            }
            ReconnectDecision::Fallback => {
                self.reconnect_timer = None;
                self.set_state(ConnectionState::PollingFallback);
                warn!(
                    "라이브 채널 포기 - {}ms 주기 폴링으로 전환",
                    self.delivery.fallback_poll_interval_ms
                );
            }
        }
    }

    fn on_reconnect_timer(&mut self) {
        self.reconnect_timer = None;
        if self.state != ConnectionState::Reconnecting {
            return;
        }
        debug!("재연결 시도 ({}회째)", self.policy.attempt_count());
        self.open_channel();
    }

    fn on_fallback_tick(&mut self) {
        if self.state.polls_on_tick() {
            self.spawn_fetch("fallback_tick");
        }
    }

    fn route_event(&mut self, event: InboundEvent) {
        let reaction = reconcile::plan(&event, &self.notification);
        if reaction.refresh {
            self.spawn_fetch(event.kind());
        }
        if let Some(alert) = reaction.alert {
            self.spawn_alert(alert);
        }
    }

    fn open_channel(&mut self) {
        self.close_channel();
        let (signal_tx, signal_rx) = mpsc::channel(SIGNAL_BUFFER);
        let handle = self.channel.open(&self.channel_url, signal_tx);
        self.link = Some(ChannelLink {
            handle,
            signals: signal_rx,
        });
        self.set_state(ConnectionState::Connecting);
    }

    fn close_channel(&mut self) {
        if let Some(mut link) = self.link.take() {
            link.handle.close();
        }
    }

    fn spawn_fetch(&mut self, reason: &str) {
        self.fetch_seq += 1;
        let seq = self.fetch_seq;
        debug!("스냅샷 조회 #{seq} ({reason})");

        let api = self.api.clone();
        self.tasks.spawn(async move {
            TaskOutcome::Fetched {
                seq,
                result: api.fetch_snapshot().await,
            }
        });
    }

    fn spawn_mark_read(&mut self, conversation_id: ConversationId) {
        let api = self.api.clone();
        let settle = self.delivery.mark_read_settle();
        self.tasks.spawn(async move {
            let result = api.mark_conversation_read(&conversation_id).await;
            if result.is_ok() {
                // 서버 카운터 반영 대기
                tokio::time::sleep(settle).await;
            }
            TaskOutcome::MarkedRead {
                conversation_id,
                result,
            }
        });
    }

    fn spawn_alert(&mut self, alert: MessageAlert) {
        if !self.notification.alerts_enabled {
            debug!("알림 비활성화됨: {}", alert.title);
            return;
        }
        let permission = self.sink.alert_permission();
        if permission != AlertPermission::Granted {
            debug!("알림 권한 없음 ({permission:?}): {}", alert.title);
            return;
        }

        let sink = self.sink.clone();
        self.tasks
            .spawn(async move { TaskOutcome::Alerted(sink.raise_alert(&alert).await) });
    }

    async fn on_task_done(&mut self, joined: Result<TaskOutcome, JoinError>) {
        match joined {
            Ok(TaskOutcome::Fetched {
                seq,
                result: Ok(snapshot),
            }) => self.apply_snapshot(seq, snapshot).await,
            Ok(TaskOutcome::Fetched {
                seq,
                result: Err(e),
            }) => warn!("스냅샷 조회 #{seq} 실패, 이전 스냅샷 유지: {e}"),
            Ok(TaskOutcome::MarkedRead {
                conversation_id,
                result: Ok(()),
            }) => {
                debug!("읽음 처리 완료: {conversation_id}");
                self.spawn_fetch("mark_read");
            }
            Ok(TaskOutcome::MarkedRead {
                conversation_id,
                result: Err(e),
            }) => warn!("읽음 처리 실패 ({conversation_id}): {e}"),
            Ok(TaskOutcome::Alerted(Err(e))) => warn!("알림 표시 실패: {e}"),
            Ok(TaskOutcome::Alerted(Ok(()))) => {}
            Err(e) if e.is_cancelled() => {}
            Err(e) => error!("엔진 작업 패닉: {e}"),
        }
    }

    async fn apply_snapshot(&mut self, seq: u64, snapshot: NotificationSnapshot) {
        debug!(
            "스냅샷 #{seq} 적용: 미읽음 {}건, 대화 {}개",
            snapshot.total_unread_count, snapshot.unread_conversation_count
        );
        self.snapshot_tx.send_replace(Some(snapshot.clone()));
        if let Err(e) = self.sink.render(&snapshot).await {
            warn!("스냅샷 렌더링 실패: {e}");
        }
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state != state {
            debug!("연결 상태: {} → {}", self.state, state);
            self.state = state;
            self.state_tx.send_replace(state);
        }
    }

    fn shutdown(&mut self) {
        self.reconnect_timer = None;
        self.close_channel();
        self.tasks.abort_all();
        self.set_state(ConnectionState::Disconnected);
        info!("전달 엔진 정지");
    }
}

/// 현재 채널의 다음 신호 (채널이 없으면 영원히 대기)
///
/// 송신측이 `Closed` 없이 사라지면 유실로 취급한다.
async fn next_signal(link: &mut Option<ChannelLink>) -> ChannelSignal {
    match link {
        Some(link) => link.signals.recv().await.unwrap_or(ChannelSignal::Closed),
        None => pending().await,
    }
}

async fn reconnect_due(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(sleep) => sleep.as_mut().await,
        None => pending().await,
    }
}
