//! 데이터 모듈 오류 타입.

use thiserror::Error;

/// 데이터 관련 오류.
#[derive(Debug, Error)]
pub enum DataError {
    /// 네트워크/타임아웃/HTTP 상태/응답 본문 파싱 오류
    #[error("Transport error: {0}")]
    Transport(String),

    /// API가 실패 envelope를 반환함 (빈 결과 코드 제외)
    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },

    /// 재시도 예산을 모두 소진한 페이지 요청
    #[error("Request failed on page {page} after {attempts} attempts: {source}")]
    FetchFailure {
        page: u32,
        attempts: u32,
        #[source]
        source: Box<DataError>,
    },

    /// 파일 입출력 오류
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV 쓰기 오류
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// 직렬화/역직렬화 오류
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// 잘못된 입력 값
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl DataError {
    /// 재시도 가능한 에러인지 확인.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DataError::Transport(_) | DataError::Api { .. })
    }

    /// `FetchFailure`라면 실패한 페이지 번호 반환.
    pub fn failed_page(&self) -> Option<u32> {
        match self {
            DataError::FetchFailure { page, .. } => Some(*page),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for DataError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DataError::Transport(format!("timeout: {}", err))
        } else if err.is_connect() {
            DataError::Transport(format!("connection failed: {}", err))
        } else if err.is_decode() {
            DataError::Transport(format!("malformed response body: {}", err))
        } else {
            DataError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        DataError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
