//! 기간 수집 → 정규화 → 저장 파이프라인.

use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use chrono::NaiveDate;
use lhb_data::{export_rows, normalize, EastmoneyLhbClient, ExportSummary};

use crate::config::{validate_range, FetchConfig};
use crate::modules::watch::DailyCapture;
use crate::{CollectorConfig, Result};

/// 기간 데이터를 수집하여 산출물로 저장.
///
/// 수집 실패는 그대로 전파됩니다 (부분 결과 없음).
pub async fn export_range(
    client: &EastmoneyLhbClient,
    fetch: &FetchConfig,
    start_date: NaiveDate,
    end_date: NaiveDate,
    out_dir: &Path,
    write_when_empty: bool,
) -> Result<ExportSummary> {
    let started = Instant::now();

    let raw_rows = client
        .collect_rows(start_date, end_date, fetch.page_delay(), fetch.max_retries)
        .await?;
    let overview_rows = normalize(&raw_rows);
    let summary = export_rows(
        out_dir,
        start_date,
        end_date,
        &raw_rows,
        &overview_rows,
        write_when_empty,
    )?;

    tracing::debug!(
        elapsed = format!("{:.1}s", started.elapsed().as_secs_f64()),
        "파이프라인 완료"
    );
    Ok(summary)
}

/// 1회성 기간 내보내기 (range 명령).
///
/// 설정과 기간을 먼저 검증하므로 잘못된 입력은 네트워크 요청 없이 실패합니다.
pub async fn run_range(
    config: &CollectorConfig,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<ExportSummary> {
    config.validate()?;
    validate_range(start_date, end_date)?;

    tracing::info!(
        start_date = %start_date,
        end_date = %end_date,
        out_dir = %config.out_dir.display(),
        "기간 수집 시작"
    );

    let client = EastmoneyLhbClient::with_base_url(&config.api_url)?;
    export_range(
        &client,
        &config.fetch,
        start_date,
        end_date,
        &config.out_dir,
        true,
    )
    .await
}

/// 감시 모드용 당일 수집기.
///
/// 빈 결과는 저장하지 않습니다.
#[derive(Debug, Clone)]
pub struct EastmoneyDailyCapture {
    client: EastmoneyLhbClient,
    fetch: FetchConfig,
    out_dir: PathBuf,
}

impl EastmoneyDailyCapture {
    pub fn new(client: EastmoneyLhbClient, fetch: FetchConfig, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            fetch,
            out_dir: out_dir.into(),
        }
    }
}

#[async_trait]
impl DailyCapture for EastmoneyDailyCapture {
    async fn capture(&self, trade_date: NaiveDate) -> Result<ExportSummary> {
        export_range(
            &self.client,
            &self.fetch,
            trade_date,
            trade_date,
            &self.out_dir,
            false,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WatchConfig;
    use crate::error::CollectorError;
    use mockito::{Matcher, Server};

    const API_PATH: &str = "/api/data/v1/get";

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn config(api_url: String, out_dir: &Path) -> CollectorConfig {
        CollectorConfig {
            api_url,
            out_dir: out_dir.to_path_buf(),
            fetch: FetchConfig {
                sleep_seconds: 0.0,
                max_retries: 1,
            },
            watch: WatchConfig {
                start: "15:30".to_string(),
                deadline: "20:00".to_string(),
                interval_minutes: 5.0,
                timezone: "Asia/Shanghai".to_string(),
                daily_subdir: "daily".to_string(),
                state_subdir: "state".to_string(),
                force: false,
            },
        }
    }

    const BODY: &str = r#"{"success":true,"result":{"pages":1,"count":3,"data":[
        {"SECURITY_CODE":"600000","SECUCODE":"600000.SH","SECURITY_NAME_ABBR":"浦发银行",
         "TRADE_DATE":"2024-01-05 00:00:00","CHANGE_RATE":10.02,
         "TRADE_MARKET_CODE":"069001001001","SECURITY_TYPE_CODE":"058001001","EXPLAIN":"a"},
        {"SECURITY_CODE":"600000","SECUCODE":"600000.SH","SECURITY_NAME_ABBR":"浦发银行",
         "TRADE_DATE":"2024-01-05 00:00:00","CHANGE_RATE":10.02,
         "TRADE_MARKET_CODE":"069001001001","SECURITY_TYPE_CODE":"058001001","EXPLAIN":"b"},
        {"SECURITY_CODE":"113050","SECUCODE":"113050.SH","SECURITY_NAME_ABBR":"南银转债",
         "TRADE_DATE":"2024-01-05 00:00:00","CHANGE_RATE":-3.5,
         "TRADE_MARKET_CODE":"069001001001","SECURITY_TYPE_CODE":"060","EXPLAIN":"c"}
    ]}}"#;

    #[tokio::test]
    async fn test_run_range_writes_artifacts() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", API_PATH)
            .match_query(Matcher::UrlEncoded("pageNumber".to_string(), "1".to_string()))
            .with_status(200)
            .with_body(BODY)
            .expect(1)
            .create_async()
            .await;
        let dir = tempfile::tempdir().unwrap();
        let config = config(format!("{}{}", server.url(), API_PATH), dir.path());

        let summary = run_range(&config, date("2024-01-05"), date("2024-01-05"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(summary.raw_rows, 3);
        assert_eq!(summary.overview_rows, 2);
        assert_eq!(summary.trade_days, 1);
        assert_eq!(
            summary.raw_path,
            Some(dir.path().join("lhb_raw_20240105_20240105.csv"))
        );
        assert!(summary.grouped_path.unwrap().is_file());
    }

    #[tokio::test]
    async fn test_run_range_rejects_inverted_range_without_network() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", API_PATH)
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;
        let dir = tempfile::tempdir().unwrap();
        let config = config(format!("{}{}", server.url(), API_PATH), dir.path());

        let err = run_range(&config, date("2024-02-01"), date("2024-01-01"))
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, CollectorError::Config(_)));
    }

    #[tokio::test]
    async fn test_daily_capture_skips_empty_day() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", API_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"success":false,"code":9201,"message":"返回数据为空"}"#)
            .create_async()
            .await;
        let dir = tempfile::tempdir().unwrap();
        let client =
            EastmoneyLhbClient::with_base_url(format!("{}{}", server.url(), API_PATH)).unwrap();
        let capture = EastmoneyDailyCapture::new(
            client,
            FetchConfig {
                sleep_seconds: 0.0,
                max_retries: 1,
            },
            dir.path().join("daily"),
        );

        let summary = capture.capture(date("2024-01-05")).await.unwrap();

        assert_eq!(summary.raw_rows, 0);
        assert!(!summary.has_artifacts());
        assert!(!dir.path().join("daily").exists());
    }
}
