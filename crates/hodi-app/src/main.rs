//! # hodi-app
//!
//! HODI 미읽음 알림 클라이언트 바이너리 진입점.
//! 설정 로드, 어댑터 생성(DI), 전달 엔진 구동, 표준 입력 명령 처리.

mod console_sink;
mod host_command;
mod lifecycle;

use anyhow::{Context, Result};
use clap::Parser;
use hodi_core::config::AppConfig;
use hodi_core::config_manager::ConfigManager;
use hodi_core::ports::api_client::CsrfTokenProvider;
use hodi_core::ports::presentation::PresentationSink;
use hodi_network::csrf::{CookieCsrfProvider, StaticCsrfToken};
use hodi_network::http_client::HttpNotificationClient;
use hodi_network::ws_client::{live_channel_url, WsLiveChannel};
use hodi_sync::presenter;
use hodi_sync::{DeliveryEngine, EngineHandle};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::console_sink::{format_view, ConsoleSink};
use crate::host_command::{HostCommand, HELP};
use crate::lifecycle::{LifecycleManager, ShutdownReason};

/// 세션 쿠키 환경 변수
const SESSION_COOKIE_ENV: &str = "HODI_SESSION_COOKIE";

/// HODI 미읽음 알림 클라이언트
///
/// 라이브 채널(WebSocket)로 알림을 받고, 끊기면 폴링으로 전환한다.
#[derive(Parser, Debug)]
#[command(name = "hodi-notify")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 서버 URL 지정 (기본: 설정 파일 값)
    #[arg(long, short = 's')]
    server: Option<String>,

    /// 설정 파일 경로 (기본: 플랫폼 설정 디렉토리)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// 요청에 실어 보낼 Cookie 헤더 값 (환경 변수보다 우선)
    #[arg(long)]
    session_cookie: Option<String>,

    /// CSRF 토큰 직접 지정 (기본: 세션 쿠키의 csrftoken 값)
    #[arg(long)]
    csrf_token: Option<String>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,

    /// 폴백 폴링 주기 (밀리초)
    #[arg(long)]
    poll_interval: Option<u64>,

    /// 새 메시지 알림 끄기
    #[arg(long)]
    no_alerts: bool,
}

/// 설정 파일 경로 결정 (CLI 인자 또는 플랫폼별 기본 경로)
fn resolve_config_path(config: Option<&PathBuf>) -> Result<PathBuf> {
    match config {
        Some(path) => Ok(path.clone()),
        None => Ok(ConfigManager::default_path()?),
    }
}

/// CLI 인자와 환경 변수로 설정 오버라이드 (CLI > 환경 변수 > 파일)
fn apply_overrides(config: &mut AppConfig, args: &Args, env_cookie: Option<String>) {
    if let Some(ref server_url) = args.server {
        config.server.base_url = server_url.clone();
    }
    if let Some(cookie) = args.session_cookie.clone().or(env_cookie) {
        config.auth.session_cookie = Some(cookie);
    }
    if let Some(interval) = args.poll_interval {
        config.delivery.fallback_poll_interval_ms = interval;
    }
    if args.no_alerts {
        config.notification.alerts_enabled = false;
    }
}

/// 어댑터 생성 + 엔진 시작
async fn start_engine(
    config: &AppConfig,
    csrf_token: Option<String>,
    sink: Arc<ConsoleSink>,
) -> Result<EngineHandle> {
    let cookie = config.auth.session_cookie.clone();
    let csrf: Arc<dyn CsrfTokenProvider> = match csrf_token {
        Some(token) => Arc::new(StaticCsrfToken(token)),
        None => Arc::new(CookieCsrfProvider::new(
            cookie.clone(),
            config.auth.csrf_cookie_name.clone(),
        )),
    };
    let api = Arc::new(
        HttpNotificationClient::new(&config.server, config.request_timeout(), cookie.clone(), csrf)
            .context("HTTP 클라이언트 생성 실패")?,
    );
    let url = live_channel_url(&config.server.base_url, &config.server.live_channel_path)
        .context("라이브 채널 URL 생성 실패")?;
    let channel = Arc::new(WsLiveChannel::new(cookie, config.request_timeout()));

    // 권한은 호스트가 시작 시 한 번만 요청
    let permission = sink.request_alert_permission().await;
    info!("라이브 채널: {url}, 알림 권한: {permission:?}");

    let engine = DeliveryEngine::new(
        config.delivery.clone(),
        config.notification.clone(),
        url,
        channel,
        api,
        sink,
    );
    Ok(engine.start())
}

fn print_status(handle: &EngineHandle) {
    println!("connection: {}", handle.state());
    match handle.latest_snapshot() {
        Some(snapshot) => print!("{}", format_view(&presenter::present(&snapshot))),
        None => println!("(no snapshot yet)"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_filter = format!(
        "hodi_app={},hodi_core={},hodi_network={},hodi_sync={}",
        args.log_level, args.log_level, args.log_level, args.log_level
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .init();

    info!("HODI 알림 클라이언트 시작");

    // 설정 로드
    let config_path = resolve_config_path(args.config.as_ref())?;
    let manager = ConfigManager::with_path(config_path)?;
    info!("설정 파일: {}", manager.config_path().display());

    let mut config = manager.get();
    apply_overrides(&mut config, &args, std::env::var(SESSION_COOKIE_ENV).ok());
    config.validate()?;
    info!("서버: {}", config.server.base_url);
    if config.auth.session_cookie.is_none() {
        warn!("세션 쿠키 없음 - 서버가 요청을 거부할 수 있음");
    }

    let sink = Arc::new(ConsoleSink::stdout(config.notification.alerts_enabled));
    let handle = start_engine(&config, args.csrf_token.clone(), sink).await?;

    // 시그널 대기 태스크
    let lifecycle = Arc::new(LifecycleManager::new());
    let mut shutdown_rx = lifecycle.subscribe();
    {
        let lifecycle = lifecycle.clone();
        tokio::spawn(async move {
            if let Err(e) = lifecycle.wait_for_signal().await {
                warn!("시그널 핸들러 등록 실패: {e}");
            }
        });
    }

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut state_rx = handle.subscribe_state();

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => break,
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *state_rx.borrow();
                info!("연결 상태: {state}");
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match HostCommand::parse(&line) {
                    Ok(Some(HostCommand::Quit)) => {
                        lifecycle.shutdown(ShutdownReason::HostQuit);
                        break;
                    }
                    Ok(Some(HostCommand::Read(id))) => handle.mark_as_read(id),
                    Ok(Some(HostCommand::Focus)) => handle.window_focused(),
                    Ok(Some(HostCommand::Visible)) => handle.page_visible(),
                    Ok(Some(HostCommand::Refresh)) => handle.refresh(),
                    Ok(Some(HostCommand::Status)) => print_status(&handle),
                    Ok(Some(HostCommand::Help)) => println!("{HELP}"),
                    Ok(None) => {}
                    Err(e) => println!("{e}\n{HELP}"),
                },
                Ok(None) => {
                    info!("표준 입력 종료 - 시그널로만 종료 가능");
                    stdin_open = false;
                }
                Err(e) => {
                    warn!("표준 입력 읽기 실패: {e}");
                    stdin_open = false;
                }
            },
        }
    }

    match lifecycle.reason() {
        Some(reason) => info!("종료 사유: {reason}"),
        None => info!("전달 엔진 종료됨"),
    }
    handle.stop().await;
    info!("HODI 알림 클라이언트 종료");
    Ok(())
}
