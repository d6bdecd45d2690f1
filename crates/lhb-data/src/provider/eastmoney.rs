//! 동방재부(Eastmoney) 데이터센터 API 클라이언트.
//!
//! 용호방 상세 리포트(`RPT_DAILYBILLBOARD_DETAILSNEW`)를 기간 필터로 조회합니다.
//!
//! # 응답 envelope
//!
//! ```text
//! { "success": true,  "result": { "pages": 3, "count": 1203, "data": [...] } }
//! { "success": false, "code": 9201, "message": "返回数据为空", "result": null }
//! ```
//!
//! 코드 9201은 "조건에 맞는 데이터 없음"으로, 실패가 아니라 빈 페이지로
//! 취급합니다. 그 외 실패 코드와 전송 오류는 [`RetryPolicy`]에 따라
//! 재시도한 뒤 [`DataError::FetchFailure`]로 승격됩니다.
//!
//! # 사용 예제
//!
//! ```rust,ignore
//! use lhb_data::provider::EastmoneyLhbClient;
//!
//! let client = EastmoneyLhbClient::new()?;
//! let rows = client
//!     .collect_rows(start, end, Duration::from_millis(200), 5)
//!     .await?;
//! ```

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Deserialize;

use crate::error::{DataError, Result};
use crate::model::{RawRecord, RAW_COLUMNS};
use crate::retry::RetryPolicy;

/// 데이터센터 조회 엔드포인트.
pub const DEFAULT_API_URL: &str = "https://datacenter-web.eastmoney.com/api/data/v1/get";

/// 용호방 상세 리포트 식별자.
pub const REPORT_NAME: &str = "RPT_DAILYBILLBOARD_DETAILSNEW";

/// 페이지당 행 수 (고정).
pub const PAGE_SIZE: u32 = 500;

/// "조회 결과 없음" API 코드.
pub const EMPTY_RESULT_CODE: i64 = 9201;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// 한 페이지 조회 결과.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageResponse {
    /// 전체 페이지 수
    pub pages: u32,
    /// 전체 행 수
    pub count: u64,
    /// 이 페이지의 행
    pub rows: Vec<RawRecord>,
}

impl PageResponse {
    /// 빈 결과 (코드 9201 매핑용).
    pub fn empty() -> Self {
        Self::default()
    }
}

/// API 응답 래퍼.
#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    result: Option<ApiResult>,
}

#[derive(Debug, Deserialize)]
struct ApiResult {
    #[serde(default)]
    pages: Option<u32>,
    #[serde(default)]
    count: Option<u64>,
    #[serde(default)]
    data: Option<Vec<RawRecord>>,
}

impl ApiEnvelope {
    /// envelope를 페이지 결과 또는 API 에러로 해석.
    fn into_page(self) -> Result<PageResponse> {
        if self.success {
            let result = self.result.unwrap_or(ApiResult {
                pages: None,
                count: None,
                data: None,
            });
            return Ok(PageResponse {
                pages: result.pages.unwrap_or(0),
                count: result.count.unwrap_or(0),
                rows: result.data.unwrap_or_default(),
            });
        }

        let code = self.code.unwrap_or_default();
        if code == EMPTY_RESULT_CODE {
            return Ok(PageResponse::empty());
        }

        Err(DataError::Api {
            code,
            message: self.message.unwrap_or_default(),
        })
    }
}

/// Eastmoney 용호방 API 클라이언트.
#[derive(Debug, Clone)]
pub struct EastmoneyLhbClient {
    client: reqwest::Client,
    base_url: String,
    backoff: RetryPolicy,
}

impl EastmoneyLhbClient {
    /// 기본 엔드포인트로 클라이언트 생성.
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_API_URL)
    }

    /// 엔드포인트를 지정하여 클라이언트 생성 (테스트/프록시용).
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DataError::Transport(format!("HTTP client build failed: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            backoff: RetryPolicy::default(),
        })
    }

    /// 백오프 단위/상한 변경. 시도 횟수는 호출마다 지정합니다.
    pub fn with_backoff(mut self, base_delay: Duration, max_delay: Duration) -> Self {
        self.backoff.base_delay = base_delay;
        self.backoff.max_delay = max_delay;
        self
    }

    /// 한 페이지 조회 (재시도 포함).
    ///
    /// # Arguments
    /// * `start_date`, `end_date` - 포함 구간 (start ≤ end는 호출자가 보장)
    /// * `page_number` - 1부터 시작하는 페이지 번호
    /// * `max_retries` - 최대 시도 횟수
    pub async fn fetch_page(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        page_number: u32,
        max_retries: u32,
    ) -> Result<PageResponse> {
        if page_number == 0 {
            return Err(DataError::InvalidData(
                "page number must start at 1".to_string(),
            ));
        }

        let params = build_params(start_date, end_date, page_number);
        let policy = RetryPolicy {
            max_attempts: max_retries,
            ..self.backoff.clone()
        };

        policy
            .run(|attempt| {
                tracing::debug!(
                    page = page_number,
                    attempt = attempt,
                    start_date = %start_date,
                    end_date = %end_date,
                    "Eastmoney API 요청"
                );
                self.request_page(&params)
            })
            .await
            .map_err(|exhausted| DataError::FetchFailure {
                page: page_number,
                attempts: exhausted.attempts,
                source: Box::new(exhausted.last_error),
            })
    }

    /// 기간 내 전체 행 수집.
    ///
    /// 1페이지에서 전체 페이지 수를 확인한 뒤, 2..=N 페이지를 순서대로
    /// 조회합니다. 각 후속 요청 전에 `page_delay`만큼 대기합니다.
    /// 중간 페이지 실패 시 전체 수집이 실패합니다.
    pub async fn collect_rows(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        page_delay: Duration,
        max_retries: u32,
    ) -> Result<Vec<RawRecord>> {
        let first = self
            .fetch_page(start_date, end_date, 1, max_retries)
            .await?;
        let pages = first.pages;
        let mut rows = first.rows;

        for page in 2..=pages {
            tokio::time::sleep(page_delay).await;
            let response = self
                .fetch_page(start_date, end_date, page, max_retries)
                .await?;
            rows.extend(response.rows);
        }

        tracing::info!(
            start_date = %start_date,
            end_date = %end_date,
            pages = pages,
            rows = rows.len(),
            "용호방 수집 완료"
        );
        Ok(rows)
    }

    /// 단일 HTTP 요청 실행 및 envelope 해석.
    async fn request_page(&self, params: &[(&'static str, String)]) -> Result<PageResponse> {
        let response = self
            .client
            .get(&self.base_url)
            .query(params)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DataError::Transport(format!("HTTP status {}", status)));
        }

        let body = response.text().await?;
        let envelope: ApiEnvelope = serde_json::from_str(&body)
            .map_err(|e| DataError::Transport(format!("malformed response body: {}", e)))?;

        envelope.into_page()
    }
}

/// 조회 파라미터 구성.
fn build_params(
    start_date: NaiveDate,
    end_date: NaiveDate,
    page_number: u32,
) -> Vec<(&'static str, String)> {
    let start = start_date.format("%Y-%m-%d");
    let end = end_date.format("%Y-%m-%d");

    vec![
        ("reportName", REPORT_NAME.to_string()),
        ("columns", RAW_COLUMNS.join(",")),
        ("pageNumber", page_number.to_string()),
        ("pageSize", PAGE_SIZE.to_string()),
        ("sortTypes", "-1,1".to_string()),
        ("sortColumns", "TRADE_DATE,SECURITY_CODE".to_string()),
        ("source", "WEB".to_string()),
        ("client", "WEB".to_string()),
        (
            "filter",
            format!("(TRADE_DATE>='{}')(TRADE_DATE<='{}')", start, end),
        ),
    ]
}
