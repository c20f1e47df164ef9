//! 설정 파일 로드.
//!
//! 플랫폼 설정 디렉토리(`directories::ProjectDirs`)의 JSON 파일에서 설정을 읽는다.
//! 파일이 없으면 기본 설정을 써 두고 그대로 사용한다.

use crate::config::AppConfig;
use crate::error::CoreError;
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// 설정 파일 이름
const CONFIG_FILE_NAME: &str = "config.json";

/// 로드된 설정과 그 출처 파일
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: AppConfig,
    config_path: PathBuf,
}

impl ConfigManager {
    /// 플랫폼 기본 설정 파일 경로
    ///
    /// 홈 디렉토리를 알 수 없는 환경에서는 `CoreError::Config`.
    pub fn default_path() -> Result<PathBuf, CoreError> {
        ProjectDirs::from("com", "hodi", "hodi-notify")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
            .ok_or_else(|| CoreError::Config("플랫폼 설정 디렉토리를 찾을 수 없습니다".to_string()))
    }

    /// 지정된 경로에서 설정 로드 (없으면 기본 설정 파일 생성)
    pub fn with_path(config_path: PathBuf) -> Result<Self, CoreError> {
        let config = if config_path.exists() {
            load_from_file(&config_path)?
        } else {
            let default_config = AppConfig::default_config();
            write_default(&config_path, &default_config)?;
            info!("기본 설정 파일 생성: {}", config_path.display());
            default_config
        };

        Ok(Self {
            config,
            config_path,
        })
    }

    /// 로드된 설정 (복제본)
    pub fn get(&self) -> AppConfig {
        self.config.clone()
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

fn load_from_file(path: &Path) -> Result<AppConfig, CoreError> {
    let content = fs::read_to_string(path).map_err(|e| {
        CoreError::Config(format!("설정 파일 읽기 실패: {}: {}", path.display(), e))
    })?;

    let config: AppConfig = serde_json::from_str(&content).map_err(|e| {
        CoreError::Config(format!("설정 파일 파싱 실패: {}: {}", path.display(), e))
    })?;

    if let Err(e) = config.validate() {
        warn!("설정 파일 검증 실패: {}: {e}", path.display());
        return Err(e);
    }

    debug!("설정 파일 로드 완료: {}", path.display());
    Ok(config)
}

fn write_default(path: &Path, config: &AppConfig) -> Result<(), CoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            CoreError::Config(format!(
                "설정 디렉토리 생성 실패: {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| CoreError::Config(format!("설정 직렬화 실패: {e}")))?;
    fs::write(path, content).map_err(|e| {
        CoreError::Config(format!("설정 파일 저장 실패: {}: {}", path.display(), e))
    })
}
