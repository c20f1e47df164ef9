//! CSRF 토큰 조회.
//!
//! 서버가 내려준 `csrftoken` 쿠키 값을 `X-CSRFToken` 헤더로 되돌려 보낸다.

use hodi_core::ports::api_client::CsrfTokenProvider;

/// `Cookie` 헤더 문자열에서 이름으로 쿠키 값 조회
pub fn find_cookie(cookie_header: &str, name: &str) -> Option<String> {
    cookie_header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

/// 쿠키 헤더 기반 CSRF 토큰 제공자
pub struct CookieCsrfProvider {
    cookie_header: Option<String>,
    cookie_name: String,
}

impl CookieCsrfProvider {
    /// 새 제공자 생성
    pub fn new(cookie_header: Option<String>, cookie_name: impl Into<String>) -> Self {
        Self {
            cookie_header,
            cookie_name: cookie_name.into(),
        }
    }
}

impl CsrfTokenProvider for CookieCsrfProvider {
    fn csrf_token(&self) -> Option<String> {
        self.cookie_header
            .as_deref()
            .and_then(|header| find_cookie(header, &self.cookie_name))
    }
}

/// 고정 토큰 제공자 (CLI에서 직접 지정한 경우)
pub struct StaticCsrfToken(pub String);

impl CsrfTokenProvider for StaticCsrfToken {
    fn csrf_token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}
