//! 전달 엔진 통합 테스트.
//!
//! 가짜 채널/API/싱크 + 일시정지된 tokio 시계로 상태 전이, 재연결 타이밍,
//! 폴백 폴링, 이벤트 조정, 읽음 처리 흐름을 검증한다.

use async_trait::async_trait;
use hodi_core::config::{DeliveryConfig, NotificationConfig};
use hodi_core::error::CoreError;
use hodi_core::models::connection::ConnectionState;
use hodi_core::models::event::{InboundEvent, NewMessagePayload};
use hodi_core::models::snapshot::{ConversationId, NotificationSnapshot};
use hodi_core::ports::api_client::NotificationApi;
use hodi_core::ports::live_channel::{ChannelHandle, ChannelSignal, LiveChannel};
use hodi_core::ports::presentation::{AlertPermission, MessageAlert, PresentationSink};
use hodi_sync::{DeliveryEngine, EngineHandle};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};

// ============================================================
// 가짜 협력자
// ============================================================

/// 다이얼 기록 + 테스트가 신호를 주입하는 채널
struct FakeChannel {
    /// true면 모든 다이얼이 즉시 실패
    fail_dials: bool,
    dials: Mutex<Vec<(Instant, mpsc::Sender<ChannelSignal>)>>,
    closes: Arc<AtomicUsize>,
}

impl FakeChannel {
    fn with_mode(fail_dials: bool) -> Arc<Self> {
        Arc::new(Self {
            fail_dials,
            dials: Mutex::new(Vec::new()),
            closes: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn manual() -> Arc<Self> {
        Self::with_mode(false)
    }

    fn refusing() -> Arc<Self> {
        Self::with_mode(true)
    }

    fn dial_count(&self) -> usize {
        self.dials.lock().len()
    }

    fn dial_times(&self) -> Vec<Instant> {
        self.dials.lock().iter().map(|(at, _)| *at).collect()
    }

    /// 가장 최근 다이얼에 신호 주입
    async fn emit(&self, signal: ChannelSignal) {
        let tx = self.dials.lock().last().expect("다이얼 없음").1.clone();
        tx.send(signal).await.expect("엔진이 채널 수신기를 버림");
    }
}

struct FakeHandle {
    closes: Arc<AtomicUsize>,
}

impl ChannelHandle for FakeHandle {
    fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

impl LiveChannel for FakeChannel {
    fn open(&self, _url: &str, signals: mpsc::Sender<ChannelSignal>) -> Box<dyn ChannelHandle> {
        if self.fail_dials {
            let _ = signals.try_send(ChannelSignal::Error("connection refused".to_string()));
            let _ = signals.try_send(ChannelSignal::Closed);
        }
        self.dials.lock().push((Instant::now(), signals));
        Box::new(FakeHandle {
            closes: self.closes.clone(),
        })
    }
}

/// n번째 조회는 `total_unread_count == n`인 스냅샷을 반환
#[derive(Default)]
struct FakeApi {
    fetch_times: Mutex<Vec<Instant>>,
    fetch_delays: Mutex<VecDeque<Duration>>,
    fail_fetch: AtomicBool,
    marks: Mutex<Vec<(Instant, ConversationId)>>,
    fail_mark: AtomicBool,
}

impl FakeApi {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn with_delays(delays: &[u64]) -> Arc<Self> {
        let api = Self::default();
        api.fetch_delays
            .lock()
            .extend(delays.iter().map(|ms| Duration::from_millis(*ms)));
        Arc::new(api)
    }

    fn fetch_count(&self) -> usize {
        self.fetch_times.lock().len()
    }
}

#[async_trait]
impl NotificationApi for FakeApi {
    async fn fetch_snapshot(&self) -> Result<NotificationSnapshot, CoreError> {
        let n = {
            let mut times = self.fetch_times.lock();
            times.push(Instant::now());
            times.len() as u64
        };
        let delay = self.fetch_delays.lock().pop_front().unwrap_or_default();
        if !delay.is_zero() {
            sleep(delay).await;
        }
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(CoreError::Network("connection reset".to_string()));
        }
        Ok(NotificationSnapshot {
            total_unread_count: n,
            ..NotificationSnapshot::default()
        })
    }

    async fn mark_conversation_read(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<(), CoreError> {
        self.marks
            .lock()
            .push((Instant::now(), conversation_id.clone()));
        if self.fail_mark.load(Ordering::SeqCst) {
            return Err(CoreError::Auth("forbidden".to_string()));
        }
        Ok(())
    }
}

struct FakeSink {
    permission: AlertPermission,
    renders: Mutex<Vec<u64>>,
    alerts: Mutex<Vec<MessageAlert>>,
}

impl FakeSink {
    fn new(permission: AlertPermission) -> Arc<Self> {
        Arc::new(Self {
            permission,
            renders: Mutex::new(Vec::new()),
            alerts: Mutex::new(Vec::new()),
        })
    }

    fn rendered_totals(&self) -> Vec<u64> {
        self.renders.lock().clone()
    }

    fn alert_count(&self) -> usize {
        self.alerts.lock().len()
    }
}

#[async_trait]
impl PresentationSink for FakeSink {
    async fn render(&self, snapshot: &NotificationSnapshot) -> Result<(), CoreError> {
        self.renders.lock().push(snapshot.total_unread_count);
        Ok(())
    }

    fn alert_permission(&self) -> AlertPermission {
        self.permission
    }

    async fn raise_alert(&self, alert: &MessageAlert) -> Result<(), CoreError> {
        self.alerts.lock().push(alert.clone());
        Ok(())
    }
}

// ============================================================
// 헬퍼
// ============================================================

fn start_engine(
    channel: &Arc<FakeChannel>,
    api: &Arc<FakeApi>,
    sink: &Arc<FakeSink>,
    delivery: DeliveryConfig,
) -> EngineHandle {
    DeliveryEngine::new(
        delivery,
        NotificationConfig::default(),
        "ws://localhost:8000/ws/notifications/",
        channel.clone(),
        api.clone(),
        sink.clone(),
    )
    .start()
}

/// 대기 중인 작업을 모두 처리시킴 (시계는 1ms만 진행)
async fn settle() {
    sleep(Duration::from_millis(1)).await;
}

fn new_message(conversation: &str) -> ChannelSignal {
    ChannelSignal::Message(InboundEvent::NewMessage(NewMessagePayload {
        title: Some("SOS".to_string()),
        body: Some("Help needed".to_string()),
        conversation_id: Some(ConversationId::new(conversation)),
    }))
}

// ============================================================
// 연결 수명주기
// ============================================================

#[tokio::test(start_paused = true)]
async fn start_dials_without_fetching() {
    let channel = FakeChannel::manual();
    let api = FakeApi::new();
    let sink = FakeSink::new(AlertPermission::Granted);
    let handle = start_engine(&channel, &api, &sink, DeliveryConfig::default());

    assert_eq!(handle.state(), ConnectionState::Connecting);
    settle().await;
    assert_eq!(channel.dial_count(), 1);
    assert_eq!(api.fetch_count(), 0);
    assert!(handle.latest_snapshot().is_none());
}

#[tokio::test(start_paused = true)]
async fn channel_open_connects_and_fetches() {
    let channel = FakeChannel::manual();
    let api = FakeApi::new();
    let sink = FakeSink::new(AlertPermission::Granted);
    let handle = start_engine(&channel, &api, &sink, DeliveryConfig::default());
    let mut snapshots = handle.subscribe_snapshot();

    settle().await;
    channel.emit(ChannelSignal::Opened).await;
    snapshots.changed().await.unwrap();
    assert_eq!(snapshots.borrow().as_ref().unwrap().total_unread_count, 1);
    settle().await;

    assert_eq!(handle.state(), ConnectionState::Connected);
    assert_eq!(api.fetch_count(), 1);
    assert_eq!(sink.rendered_totals(), vec![1]);
    assert_eq!(handle.latest_snapshot().unwrap().total_unread_count, 1);
}

#[tokio::test(start_paused = true)]
async fn failed_dials_retry_at_fixed_delay_then_poll_forever() {
    let channel = FakeChannel::refusing();
    let api = FakeApi::new();
    let sink = FakeSink::new(AlertPermission::Granted);
    let handle = start_engine(&channel, &api, &sink, DeliveryConfig::default());
    let started = Instant::now();

    settle().await;
    assert_eq!(handle.state(), ConnectionState::Reconnecting);

    // 최초 다이얼 + 재시도 5회
    sleep(Duration::from_millis(15_100)).await;
    assert_eq!(handle.state(), ConnectionState::PollingFallback);
    assert_eq!(channel.dial_count(), 6);

    let times = channel.dial_times();
    for pair in times.windows(2) {
        assert_eq!(pair[1] - pair[0], Duration::from_millis(3_000));
    }
    assert_eq!(api.fetch_count(), 0, "첫 폴백 틱 전에는 조회 없음");

    // 폴백 타이머: 30초마다 한 번
    sleep(Duration::from_secs(30) - (Instant::now() - started) + Duration::from_millis(10)).await;
    assert_eq!(api.fetch_count(), 1);

    sleep(Duration::from_secs(60)).await;
    assert_eq!(api.fetch_count(), 3);

    sleep(Duration::from_secs(300)).await;
    assert_eq!(api.fetch_count(), 13);
    assert_eq!(channel.dial_count(), 6, "폴백 후 다시 다이얼하지 않음");
    assert_eq!(handle.state(), ConnectionState::PollingFallback);
}

#[tokio::test(start_paused = true)]
async fn successful_open_resets_retry_budget() {
    let channel = FakeChannel::manual();
    let api = FakeApi::new();
    let sink = FakeSink::new(AlertPermission::Granted);
    let delivery = DeliveryConfig {
        max_reconnect_attempts: 2,
        reconnect_delay_ms: 1_000,
        ..DeliveryConfig::default()
    };
    let handle = start_engine(&channel, &api, &sink, delivery);
    settle().await;

    // 재시도 2회 소진 직전까지
    for _ in 0..2 {
        channel.emit(ChannelSignal::Closed).await;
        settle().await;
        assert_eq!(handle.state(), ConnectionState::Reconnecting);
        sleep(Duration::from_millis(1_000)).await;
        assert_eq!(handle.state(), ConnectionState::Connecting);
    }

    channel.emit(ChannelSignal::Opened).await;
    settle().await;
    assert_eq!(handle.state(), ConnectionState::Connected);

    // 리셋 후 다시 2회 재시도 가능
    for _ in 0..2 {
        channel.emit(ChannelSignal::Closed).await;
        settle().await;
        assert_eq!(handle.state(), ConnectionState::Reconnecting);
        sleep(Duration::from_millis(1_000)).await;
    }

    channel.emit(ChannelSignal::Closed).await;
    settle().await;
    assert_eq!(handle.state(), ConnectionState::PollingFallback);
    assert_eq!(channel.dial_count(), 5);
}

#[tokio::test(start_paused = true)]
async fn transport_error_alone_does_not_change_state() {
    let channel = FakeChannel::manual();
    let api = FakeApi::new();
    let sink = FakeSink::new(AlertPermission::Granted);
    let handle = start_engine(&channel, &api, &sink, DeliveryConfig::default());

    settle().await;
    channel.emit(ChannelSignal::Opened).await;
    channel
        .emit(ChannelSignal::Error("frame too large".to_string()))
        .await;
    settle().await;

    assert_eq!(handle.state(), ConnectionState::Connected);
    assert_eq!(channel.dial_count(), 1);
}

// ============================================================
// 폴백 타이머
// ============================================================

#[tokio::test(start_paused = true)]
async fn connected_ticks_never_fetch() {
    let channel = FakeChannel::manual();
    let api = FakeApi::new();
    let sink = FakeSink::new(AlertPermission::Granted);
    let handle = start_engine(&channel, &api, &sink, DeliveryConfig::default());

    settle().await;
    channel.emit(ChannelSignal::Opened).await;
    settle().await;
    assert_eq!(api.fetch_count(), 1);

    sleep(Duration::from_secs(95)).await;
    assert_eq!(api.fetch_count(), 1);
    assert_eq!(handle.state(), ConnectionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn reconnecting_ticks_fetch_once_each() {
    let channel = FakeChannel::manual();
    let api = FakeApi::new();
    let sink = FakeSink::new(AlertPermission::Granted);
    let delivery = DeliveryConfig {
        reconnect_delay_ms: 100_000,
        ..DeliveryConfig::default()
    };
    let handle = start_engine(&channel, &api, &sink, delivery);

    settle().await;
    channel.emit(ChannelSignal::Opened).await;
    channel.emit(ChannelSignal::Closed).await;
    settle().await;
    assert_eq!(handle.state(), ConnectionState::Reconnecting);
    assert_eq!(api.fetch_count(), 1);

    sleep(Duration::from_secs(30)).await;
    assert_eq!(api.fetch_count(), 2);
    sleep(Duration::from_secs(30)).await;
    assert_eq!(api.fetch_count(), 3);
    assert_eq!(handle.state(), ConnectionState::Reconnecting);
}

// ============================================================
// 이벤트 조정
// ============================================================

#[tokio::test(start_paused = true)]
async fn unrecognized_event_is_ignored() {
    let channel = FakeChannel::manual();
    let api = FakeApi::new();
    let sink = FakeSink::new(AlertPermission::Granted);
    let _handle = start_engine(&channel, &api, &sink, DeliveryConfig::default());

    settle().await;
    channel.emit(ChannelSignal::Opened).await;
    settle().await;
    let before = api.fetch_count();

    channel
        .emit(ChannelSignal::Message(InboundEvent::Unrecognized(
            "foo".to_string(),
        )))
        .await;
    settle().await;

    assert_eq!(api.fetch_count(), before);
    assert_eq!(sink.alert_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn new_message_fetches_once_and_alerts_once_during_inflight_fetch() {
    let channel = FakeChannel::manual();
    // 채널 오픈 직후 조회가 2초 걸림
    let api = FakeApi::with_delays(&[2_000]);
    let sink = FakeSink::new(AlertPermission::Granted);
    let _handle = start_engine(&channel, &api, &sink, DeliveryConfig::default());

    settle().await;
    channel.emit(ChannelSignal::Opened).await;
    settle().await;
    channel.emit(new_message("12")).await;
    settle().await;

    assert_eq!(api.fetch_count(), 2);
    assert_eq!(sink.alert_count(), 1);

    sleep(Duration::from_secs(3)).await;
    assert_eq!(api.fetch_count(), 2);
    assert_eq!(sink.alert_count(), 1);

    let alert = sink.alerts.lock()[0].clone();
    assert_eq!(alert.title, "SOS");
    assert_eq!(alert.navigation_path().as_deref(), Some("/chat/conversations/12/"));
}

#[tokio::test(start_paused = true)]
async fn alert_needs_granted_permission() {
    let channel = FakeChannel::manual();
    let api = FakeApi::new();
    let sink = FakeSink::new(AlertPermission::Default);
    let _handle = start_engine(&channel, &api, &sink, DeliveryConfig::default());

    settle().await;
    channel.emit(ChannelSignal::Opened).await;
    channel.emit(new_message("1")).await;
    settle().await;

    assert_eq!(api.fetch_count(), 2, "권한이 없어도 재조회는 수행");
    assert_eq!(sink.alert_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn disabled_alerts_are_not_raised() {
    let channel = FakeChannel::manual();
    let api = FakeApi::new();
    let sink = FakeSink::new(AlertPermission::Granted);
    let notification = NotificationConfig {
        alerts_enabled: false,
        ..NotificationConfig::default()
    };
    let _handle = DeliveryEngine::new(
        DeliveryConfig::default(),
        notification,
        "ws://localhost/ws/",
        channel.clone(),
        api.clone(),
        sink.clone(),
    )
    .start();

    settle().await;
    channel.emit(ChannelSignal::Opened).await;
    channel.emit(new_message("1")).await;
    settle().await;

    assert_eq!(api.fetch_count(), 2);
    assert_eq!(sink.alert_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn last_completed_fetch_wins() {
    let channel = FakeChannel::manual();
    // 첫 조회는 느리고 두 번째는 즉시 완료
    let api = FakeApi::with_delays(&[2_000, 0]);
    let sink = FakeSink::new(AlertPermission::Granted);
    let handle = start_engine(&channel, &api, &sink, DeliveryConfig::default());

    settle().await;
    channel.emit(ChannelSignal::Opened).await;
    settle().await;
    channel
        .emit(ChannelSignal::Message(
            InboundEvent::GenericNotificationUpdate,
        ))
        .await;
    settle().await;

    assert_eq!(sink.rendered_totals(), vec![2]);

    sleep(Duration::from_secs(3)).await;
    assert_eq!(sink.rendered_totals(), vec![2, 1]);
    assert_eq!(handle.latest_snapshot().unwrap().total_unread_count, 1);
}

#[tokio::test(start_paused = true)]
async fn pending_fetch_applies_after_channel_drop() {
    let channel = FakeChannel::manual();
    let api = FakeApi::with_delays(&[0, 1_000]);
    let sink = FakeSink::new(AlertPermission::Granted);
    let handle = start_engine(&channel, &api, &sink, DeliveryConfig::default());

    settle().await;
    channel.emit(ChannelSignal::Opened).await;
    settle().await;

    channel
        .emit(ChannelSignal::Message(InboundEvent::ConversationUpdated(
            serde_json::json!({"conversation": {"id": 4}}),
        )))
        .await;
    channel.emit(ChannelSignal::Closed).await;
    settle().await;

    assert_eq!(handle.state(), ConnectionState::Reconnecting);
    assert_eq!(handle.latest_snapshot().unwrap().total_unread_count, 1);

    sleep(Duration::from_millis(1_100)).await;
    assert_eq!(handle.state(), ConnectionState::Reconnecting);
    assert_eq!(handle.latest_snapshot().unwrap().total_unread_count, 2);
}

#[tokio::test(start_paused = true)]
async fn failed_fetch_keeps_previous_snapshot() {
    let channel = FakeChannel::manual();
    let api = FakeApi::new();
    let sink = FakeSink::new(AlertPermission::Granted);
    let handle = start_engine(&channel, &api, &sink, DeliveryConfig::default());

    settle().await;
    channel.emit(ChannelSignal::Opened).await;
    settle().await;

    api.fail_fetch.store(true, Ordering::SeqCst);
    handle.refresh();
    settle().await;

    assert_eq!(api.fetch_count(), 2);
    assert_eq!(sink.rendered_totals(), vec![1]);
    assert_eq!(handle.latest_snapshot().unwrap().total_unread_count, 1);
    assert_eq!(handle.state(), ConnectionState::Connected);
}

// ============================================================
// 호스트 트리거 / 읽음 처리
// ============================================================

#[tokio::test(start_paused = true)]
async fn visibility_and_focus_always_fetch() {
    let channel = FakeChannel::manual();
    let api = FakeApi::new();
    let sink = FakeSink::new(AlertPermission::Granted);
    let handle = start_engine(&channel, &api, &sink, DeliveryConfig::default());

    settle().await;
    channel.emit(ChannelSignal::Opened).await;
    settle().await;

    handle.page_visible();
    handle.window_focused();
    settle().await;
    assert_eq!(api.fetch_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn mark_read_success_fetches_after_settle_delay() {
    let channel = FakeChannel::manual();
    let api = FakeApi::new();
    let sink = FakeSink::new(AlertPermission::Granted);
    let handle = start_engine(&channel, &api, &sink, DeliveryConfig::default());
    settle().await;

    handle.mark_as_read(ConversationId::new("7"));
    settle().await;
    assert_eq!(api.marks.lock().len(), 1);
    assert_eq!(api.fetch_count(), 0);

    sleep(Duration::from_millis(450)).await;
    assert_eq!(api.fetch_count(), 0);

    sleep(Duration::from_millis(100)).await;
    assert_eq!(api.fetch_count(), 1);

    let marked_at = api.marks.lock()[0].0;
    let fetched_at = api.fetch_times.lock()[0];
    assert!(fetched_at - marked_at >= Duration::from_millis(500));
    assert_eq!(api.marks.lock()[0].1.as_str(), "7");
}

#[tokio::test(start_paused = true)]
async fn mark_read_failure_is_silent() {
    let channel = FakeChannel::manual();
    let api = FakeApi::new();
    api.fail_mark.store(true, Ordering::SeqCst);
    let sink = FakeSink::new(AlertPermission::Granted);
    let handle = start_engine(&channel, &api, &sink, DeliveryConfig::default());
    settle().await;

    handle.mark_as_read(ConversationId::new("7"));
    sleep(Duration::from_secs(2)).await;

    assert_eq!(api.marks.lock().len(), 1);
    assert_eq!(api.fetch_count(), 0);
    assert!(sink.rendered_totals().is_empty());
}

// ============================================================
// 정지
// ============================================================

#[tokio::test(start_paused = true)]
async fn stop_cancels_timers_and_closes_channel() {
    let channel = FakeChannel::refusing();
    let api = FakeApi::new();
    let sink = FakeSink::new(AlertPermission::Granted);
    let handle = start_engine(&channel, &api, &sink, DeliveryConfig::default());
    let state = handle.subscribe_state();

    settle().await;
    assert_eq!(*state.borrow(), ConnectionState::Reconnecting);

    handle.stop().await;
    assert_eq!(*state.borrow(), ConnectionState::Disconnected);

    sleep(Duration::from_secs(120)).await;
    assert_eq!(channel.dial_count(), 1, "정지 후 재연결 없음");
    assert_eq!(api.fetch_count(), 0, "정지 후 폴링 없음");
}

#[tokio::test(start_paused = true)]
async fn stop_closes_open_channel() {
    let channel = FakeChannel::manual();
    let api = FakeApi::new();
    let sink = FakeSink::new(AlertPermission::Granted);
    let handle = start_engine(&channel, &api, &sink, DeliveryConfig::default());

    settle().await;
    channel.emit(ChannelSignal::Opened).await;
    settle().await;

    handle.stop().await;
    assert_eq!(channel.closes.load(Ordering::SeqCst), 1);
}
