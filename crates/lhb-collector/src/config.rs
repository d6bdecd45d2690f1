//! 환경변수 기반 설정 모듈.
//!
//! `.env`와 환경변수에서 기본값을 읽고, CLI 인자가 이를 덮어씁니다.
//! 모든 값은 네트워크 요청 전에 검증되며, 검증 실패는 항상 치명적입니다.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;
use lhb_data::provider::DEFAULT_API_URL;

use crate::error::CollectorError;
use crate::Result;

/// Collector 전체 설정
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// 데이터센터 API URL
    pub api_url: String,
    /// 산출물 루트 디렉터리
    pub out_dir: PathBuf,
    /// 페이지 수집 설정
    pub fetch: FetchConfig,
    /// 당일 감시 모드 설정
    pub watch: WatchConfig,
}

/// 페이지 수집 설정
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// 페이지 요청 간 대기 (초)
    pub sleep_seconds: f64,
    /// 페이지당 최대 시도 횟수
    pub max_retries: u32,
}

/// 감시 모드 설정
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// 감시 시작 시각 (HH:MM)
    pub start: String,
    /// 감시 마감 시각 (HH:MM)
    pub deadline: String,
    /// 폴링 주기 (분)
    pub interval_minutes: f64,
    /// 시간대 (IANA 이름)
    pub timezone: String,
    /// 일별 산출물 하위 디렉터리
    pub daily_subdir: String,
    /// 완료 마커 하위 디렉터리
    pub state_subdir: String,
    /// 완료 마커 무시 여부
    pub force: bool,
}

/// 검증된 감시 일정.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchSchedule {
    pub start: NaiveTime,
    pub deadline: NaiveTime,
    /// 폴링 주기 (최소 1초)
    pub interval: Duration,
    /// 설정 그대로의 주기 (완료 마커 기록용)
    pub interval_minutes: f64,
    pub timezone: Tz,
}

impl CollectorConfig {
    /// 환경변수에서 설정 로드
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            api_url: env_var_or("LHB_API_URL", DEFAULT_API_URL),
            out_dir: PathBuf::from(env_var_or("LHB_OUT_DIR", "data/eastmoney_lhb")),
            fetch: FetchConfig {
                sleep_seconds: env_var_parse("LHB_SLEEP_SECONDS", 0.2),
                max_retries: env_var_parse("LHB_MAX_RETRIES", 5),
            },
            watch: WatchConfig {
                start: env_var_or("LHB_WATCH_START", "15:30"),
                deadline: env_var_or("LHB_WATCH_DEADLINE", "20:00"),
                interval_minutes: env_var_parse("LHB_WATCH_INTERVAL_MINUTES", 5.0),
                timezone: env_var_or("LHB_WATCH_TZ", "Asia/Shanghai"),
                daily_subdir: env_var_or("LHB_DAILY_SUBDIR", "daily"),
                state_subdir: env_var_or("LHB_STATE_SUBDIR", "state"),
                force: env_var_bool("LHB_WATCH_FORCE", false),
            },
        }
    }

    /// 공통 설정 검증.
    pub fn validate(&self) -> Result<()> {
        self.fetch.validate()?;
        if self.api_url.trim().is_empty() {
            return Err(CollectorError::Config("api url must not be empty".to_string()));
        }
        Ok(())
    }

    /// 감시 모드 일별 산출물 디렉터리.
    pub fn daily_dir(&self) -> PathBuf {
        self.out_dir.join(&self.watch.daily_subdir)
    }

    /// 완료 마커 디렉터리.
    pub fn state_dir(&self) -> PathBuf {
        self.out_dir.join(&self.watch.state_subdir)
    }
}

impl FetchConfig {
    /// 검증: 시도 횟수 ≥ 1, 대기 시간은 유한한 0 이상 값.
    pub fn validate(&self) -> Result<()> {
        if self.max_retries == 0 {
            return Err(CollectorError::Config(
                "max-retries must be at least 1".to_string(),
            ));
        }
        non_negative_duration("sleep-seconds", self.sleep_seconds)?;
        Ok(())
    }

    /// 페이지 요청 간 딜레이를 Duration으로 반환
    pub fn page_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.sleep_seconds).unwrap_or(Duration::ZERO)
    }
}

impl WatchConfig {
    /// 감시 일정 파싱 및 검증.
    pub fn schedule(&self) -> Result<WatchSchedule> {
        let start = parse_hhmm(&self.start)?;
        let deadline = parse_hhmm(&self.deadline)?;
        if deadline <= start {
            return Err(CollectorError::Config(format!(
                "watch deadline {} must be later than watch start {}",
                self.deadline, self.start
            )));
        }

        let timezone: Tz = self
            .timezone
            .parse()
            .map_err(|_| CollectorError::Config(format!("Unknown timezone: {}", self.timezone)))?;

        let interval = non_negative_duration("watch-interval-minutes", self.interval_minutes * 60.0)?
            .max(Duration::from_secs(1));

        Ok(WatchSchedule {
            start,
            deadline,
            interval,
            interval_minutes: self.interval_minutes,
            timezone,
        })
    }
}

impl WatchSchedule {
    /// 해당 날짜의 감시 시작/마감 시점.
    pub fn window_for(
        &self,
        day: NaiveDate,
    ) -> Result<(chrono::DateTime<Tz>, chrono::DateTime<Tz>)> {
        let resolve = |time: NaiveTime| {
            self.timezone
                .from_local_datetime(&day.and_time(time))
                .earliest()
                .ok_or_else(|| {
                    CollectorError::Config(format!(
                        "{} {} does not exist in {}",
                        day, time, self.timezone
                    ))
                })
        };
        Ok((resolve(self.start)?, resolve(self.deadline)?))
    }

    /// 시작 시각 (HH:MM).
    pub fn start_label(&self) -> String {
        self.start.format("%H:%M").to_string()
    }

    /// 마감 시각 (HH:MM).
    pub fn deadline_label(&self) -> String {
        self.deadline.format("%H:%M").to_string()
    }
}

/// `YYYY-MM-DD` 날짜 파싱.
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        CollectorError::Config(format!(
            "Invalid date format: {} (expected YYYY-MM-DD)",
            value
        ))
    })
}

/// 기간 검증 (start ≤ end).
pub fn validate_range(start_date: NaiveDate, end_date: NaiveDate) -> Result<()> {
    if start_date > end_date {
        return Err(CollectorError::Config(format!(
            "start-date {} must be <= end-date {}",
            start_date, end_date
        )));
    }
    Ok(())
}

/// `HH:MM` 시각 파싱.
pub fn parse_hhmm(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| CollectorError::Config(format!("Invalid HH:MM time: {}", value)))
}

fn non_negative_duration(name: &str, seconds: f64) -> Result<Duration> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(CollectorError::Config(format!(
            "{} must be a non-negative number",
            name
        )));
    }
    Duration::try_from_secs_f64(seconds)
        .map_err(|e| CollectorError::Config(format!("{} out of range: {}", name, e)))
}

/// 환경변수 문자열 (없으면 기본값)
fn env_var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// 환경변수에서 값을 파싱 (실패 시 기본값 사용)
fn env_var_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// 환경변수에서 bool 값 파싱
fn env_var_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn watch_config(start: &str, deadline: &str) -> WatchConfig {
        WatchConfig {
            start: start.to_string(),
            deadline: deadline.to_string(),
            interval_minutes: 5.0,
            timezone: "Asia/Shanghai".to_string(),
            daily_subdir: "daily".to_string(),
            state_subdir: "state".to_string(),
            force: false,
        }
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2024-01-05").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()
        );
        assert!(matches!(parse_date("2024/01/05"), Err(CollectorError::Config(_))));
        assert!(parse_date("2024-02-30").is_err());
    }

    #[test]
    fn test_validate_range() {
        let a = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let b = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert!(validate_range(a, b).is_ok());
        assert!(validate_range(a, a).is_ok());
        assert!(matches!(validate_range(b, a), Err(CollectorError::Config(_))));
    }

    #[test]
    fn test_schedule_parses() {
        let schedule = watch_config("15:30", "20:00").schedule().unwrap();
        assert_eq!(schedule.start, NaiveTime::from_hms_opt(15, 30, 0).unwrap());
        assert_eq!(schedule.interval, Duration::from_secs(300));
        assert_eq!(schedule.timezone, chrono_tz::Asia::Shanghai);
        assert_eq!(schedule.start_label(), "15:30");
    }

    #[test]
    fn test_schedule_rejects_bad_values() {
        assert!(watch_config("25:00", "20:00").schedule().is_err());
        assert!(watch_config("15:30", "8pm").schedule().is_err());
        assert!(watch_config("20:00", "20:00").schedule().is_err());
        assert!(watch_config("20:00", "15:30").schedule().is_err());

        let mut bad_tz = watch_config("15:30", "20:00");
        bad_tz.timezone = "Mars/Olympus".to_string();
        assert!(bad_tz.schedule().is_err());

        let mut negative = watch_config("15:30", "20:00");
        negative.interval_minutes = -1.0;
        assert!(negative.schedule().is_err());
    }

    #[test]
    fn test_schedule_interval_has_floor() {
        let mut config = watch_config("15:30", "20:00");
        config.interval_minutes = 0.0;
        assert_eq!(config.schedule().unwrap().interval, Duration::from_secs(1));
    }

    #[test]
    fn test_fetch_config_validation() {
        let ok = FetchConfig {
            sleep_seconds: 0.2,
            max_retries: 5,
        };
        assert!(ok.validate().is_ok());
        assert_eq!(ok.page_delay(), Duration::from_millis(200));

        let zero_retries = FetchConfig {
            max_retries: 0,
            ..ok.clone()
        };
        assert!(zero_retries.validate().is_err());

        let negative_sleep = FetchConfig {
            sleep_seconds: -0.5,
            ..ok
        };
        assert!(negative_sleep.validate().is_err());
    }

    #[test]
    fn test_window_for_uses_timezone() {
        let schedule = watch_config("09:00", "09:10").schedule().unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let (start, deadline) = schedule.window_for(day).unwrap();

        assert_eq!(start.to_rfc3339(), "2024-01-05T09:00:00+08:00");
        assert_eq!(deadline - start, chrono::Duration::minutes(10));
    }
}
