//! WebSocket 라이브 채널.
//!
//! `LiveChannel` 포트 구현. `tokio-tungstenite` 기반 수신 전용 알림 스트림.
//! 재시도는 하지 않으며, 연결 실패와 종료는 모두 `Closed` 신호로 엔진에 알린다.

use futures::{SinkExt, StreamExt};
use hodi_core::error::CoreError;
use hodi_core::models::event::InboundEvent;
use hodi_core::ports::live_channel::{ChannelHandle, ChannelSignal, LiveChannel};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::header::COOKIE;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use url::Url;

/// 서버 기본 URL과 경로로 WebSocket URL 생성 (`http→ws`, `https→wss`)
pub fn live_channel_url(base_url: &str, path: &str) -> Result<String, CoreError> {
    let base = Url::parse(base_url)
        .map_err(|e| CoreError::Config(format!("잘못된 서버 URL: {base_url}: {e}")))?;
    let mut url = base
        .join(path)
        .map_err(|e| CoreError::Config(format!("잘못된 채널 경로: {path}: {e}")))?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(CoreError::Config(format!(
                "지원하지 않는 URL 스킴: {other}"
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| CoreError::Config(format!("URL 스킴 변경 실패: {url}")))?;

    Ok(url.to_string())
}

/// WebSocket 라이브 채널 — `LiveChannel` 포트 구현
pub struct WsLiveChannel {
    session_cookie: Option<String>,
    connect_timeout: Duration,
}

impl WsLiveChannel {
    /// 새 채널 생성 (핸드셰이크에 세션 쿠키를 실어 보냄)
    ///
    /// `connect_timeout` 안에 핸드셰이크가 끝나지 않으면 연결 실패로 본다.
    pub fn new(session_cookie: Option<String>, connect_timeout: Duration) -> Self {
        Self {
            session_cookie,
            connect_timeout,
        }
    }
}

impl LiveChannel for WsLiveChannel {
    fn open(&self, url: &str, signals: mpsc::Sender<ChannelSignal>) -> Box<dyn ChannelHandle> {
        let (close_tx, close_rx) = oneshot::channel();
        tokio::spawn(run_channel(
            url.to_string(),
            self.session_cookie.clone(),
            self.connect_timeout,
            signals,
            close_rx,
        ));
        Box::new(WsChannelHandle {
            close_tx: Some(close_tx),
        })
    }
}

/// 열린 WebSocket 채널 핸들 (drop 시에도 닫힘)
struct WsChannelHandle {
    close_tx: Option<oneshot::Sender<()>>,
}

impl ChannelHandle for WsChannelHandle {
    fn close(&mut self) {
        if let Some(tx) = self.close_tx.take() {
            let _ = tx.send(());
        }
    }
}

fn build_request(url: &str, cookie: Option<&str>) -> Result<Request, CoreError> {
    let mut request = url
        .into_client_request()
        .map_err(|e| CoreError::Channel(format!("WebSocket 요청 생성 실패: {e}")))?;
    if let Some(cookie) = cookie {
        let value = HeaderValue::from_str(cookie)
            .map_err(|e| CoreError::Channel(format!("잘못된 쿠키 헤더: {e}")))?;
        request.headers_mut().insert(COOKIE, value);
    }
    Ok(request)
}

/// 다이얼 + 수신 루프
async fn run_channel(
    url: String,
    cookie: Option<String>,
    connect_timeout: Duration,
    signals: mpsc::Sender<ChannelSignal>,
    mut close_rx: oneshot::Receiver<()>,
) {
    let request = match build_request(&url, cookie.as_deref()) {
        Ok(request) => request,
        Err(e) => {
            let _ = signals.send(ChannelSignal::Error(e.to_string())).await;
            let _ = signals.send(ChannelSignal::Closed).await;
            return;
        }
    };

    info!("WebSocket 연결: {}", url.split('?').next().unwrap_or(&url));

    let ws_stream = tokio::select! {
        _ = &mut close_rx => {
            debug!("다이얼 중 채널 닫힘");
            return;
        }
        result = tokio::time::timeout(connect_timeout, tokio_tungstenite::connect_async(request)) => {
            let failure = match result {
                Ok(Ok((stream, _))) => Ok(stream),
                Ok(Err(e)) => Err(format!("WebSocket 연결 실패: {e}")),
                Err(_) => Err(format!("WebSocket 연결 타임아웃 ({}ms)", connect_timeout.as_millis())),
            };
            match failure {
                Ok(stream) => stream,
                Err(reason) => {
                    let _ = signals.send(ChannelSignal::Error(reason)).await;
                    let _ = signals.send(ChannelSignal::Closed).await;
                    return;
                }
            }
        }
    };

    if signals.send(ChannelSignal::Opened).await.is_err() {
        return;
    }

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            _ = &mut close_rx => {
                let _ = write.send(Message::Close(None)).await;
                debug!("WebSocket 채널 닫음");
                return;
            }
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => match InboundEvent::parse(text.as_str()) {
                    Ok(event) => {
                        if signals.send(ChannelSignal::Message(event)).await.is_err() {
                            return;
                        }
                    }
                    Err(e) => warn!("잘못된 WebSocket 프레임 건너뜀: {e}"),
                },
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {} // Binary/Ping/Pong은 무시 (Pong은 자동 응답)
                Some(Err(e)) => {
                    let _ = signals
                        .send(ChannelSignal::Error(format!("WebSocket 수신 에러: {e}")))
                        .await;
                    break;
                }
            },
        }
    }

    debug!("WebSocket 수신 루프 종료");
    let _ = signals.send(ChannelSignal::Closed).await;
}
