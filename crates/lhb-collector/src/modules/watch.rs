//! 당일 용호방 감시 스케줄러.
//!
//! 상태 전이: `Idle → WaitingForStart → Polling → {Done | DeadlinePassed}`.
//!
//! - 시작 시 당일 완료 마커가 있으면 (강제 실행이 아닐 때) 곧바로 `Done`
//! - 마감 이후라면 폴링 없이 `DeadlinePassed`
//! - 시작 전이라면 시작 시각까지 대기
//! - 폴링마다 당일 수집을 실행하고, 원본 행이 1개 이상이면 마커 기록 후 `Done`
//!
//! 수집 실패는 경고 로그만 남기고 "아직 데이터 없음"으로 취급합니다.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use lhb_data::{EastmoneyLhbClient, ExportSummary};

use crate::config::WatchSchedule;
use crate::modules::clock::{Clock, SystemClock};
use crate::modules::done_marker::{DoneMarker, DoneMarkerStore};
use crate::modules::range_export::EastmoneyDailyCapture;
use crate::{CollectorConfig, Result};

/// 하루치 수집 파이프라인.
#[async_trait]
pub trait DailyCapture: Send + Sync {
    /// `trade_date..=trade_date` 구간을 수집하여 저장. 빈 결과는 저장하지 않습니다.
    async fn capture(&self, trade_date: NaiveDate) -> Result<ExportSummary>;
}

/// 스케줄러 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Idle,
    WaitingForStart,
    Polling,
    Done,
    DeadlinePassed,
}

impl WatchState {
    /// 종료 상태 여부.
    pub fn is_terminal(&self) -> bool {
        matches!(self, WatchState::Done | WatchState::DeadlinePassed)
    }
}

/// 감시 실행 결과. 모든 변형이 정상 종료입니다.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchOutcome {
    /// 이미 완료 마커가 있어 아무것도 하지 않음
    AlreadyDone { marker_path: PathBuf },
    /// 이번 실행에서 데이터를 확보하고 마커를 기록함
    Captured {
        marker_path: PathBuf,
        summary: ExportSummary,
        attempts: u32,
    },
    /// 데이터 없이 마감 시각이 지남
    DeadlinePassed { attempts: u32 },
}

impl WatchOutcome {
    /// 대응하는 종료 상태.
    pub fn final_state(&self) -> WatchState {
        match self {
            WatchOutcome::AlreadyDone { .. } | WatchOutcome::Captured { .. } => WatchState::Done,
            WatchOutcome::DeadlinePassed { .. } => WatchState::DeadlinePassed,
        }
    }
}

/// 당일 감시 스케줄러.
pub struct WatchScheduler {
    schedule: WatchSchedule,
    clock: Arc<dyn Clock>,
    capture: Arc<dyn DailyCapture>,
    markers: DoneMarkerStore,
    force: bool,
}

impl WatchScheduler {
    pub fn new(
        schedule: WatchSchedule,
        clock: Arc<dyn Clock>,
        capture: Arc<dyn DailyCapture>,
        markers: DoneMarkerStore,
        force: bool,
    ) -> Self {
        Self {
            schedule,
            clock,
            capture,
            markers,
            force,
        }
    }

    fn local_now(&self) -> DateTime<Tz> {
        self.clock.now().with_timezone(&self.schedule.timezone)
    }

    /// 종료 상태에 도달할 때까지 실행.
    pub async fn run(&self) -> Result<WatchOutcome> {
        let today = self.local_now().date_naive();
        let (start_at, deadline_at) = self.schedule.window_for(today)?;
        let mut state = WatchState::Idle;
        let mut outcome = None;
        let mut attempts: u32 = 0;

        while !state.is_terminal() {
            tracing::debug!(state = ?state, trade_date = %today, "감시 상태");
            state = match state {
                WatchState::Idle => {
                    if !self.force && self.markers.exists(today) {
                        let marker_path = self.markers.path_for(today);
                        tracing::info!(
                            trade_date = %today,
                            path = %marker_path.display(),
                            "이미 수집 완료된 거래일, 종료"
                        );
                        outcome = Some(WatchOutcome::AlreadyDone { marker_path });
                        WatchState::Done
                    } else if self.local_now() > deadline_at {
                        tracing::info!(
                            trade_date = %today,
                            deadline = %self.schedule.deadline_label(),
                            "마감 시각이 지나 폴링하지 않음"
                        );
                        WatchState::DeadlinePassed
                    } else {
                        WatchState::WaitingForStart
                    }
                }
                WatchState::WaitingForStart => {
                    let now = self.local_now();
                    if now < start_at {
                        let wait = (start_at - now).to_std().unwrap_or(Duration::ZERO);
                        tracing::info!(
                            trade_date = %today,
                            start = %self.schedule.start_label(),
                            wait_secs = wait.as_secs(),
                            "감시 시작 시각까지 대기"
                        );
                        self.clock.sleep(wait).await;
                    }
                    tracing::info!(
                        trade_date = %today,
                        deadline = %self.schedule.deadline_label(),
                        interval_secs = self.schedule.interval.as_secs(),
                        "폴링 시작"
                    );
                    WatchState::Polling
                }
                WatchState::Polling => {
                    if self.local_now() > deadline_at {
                        WatchState::DeadlinePassed
                    } else {
                        attempts += 1;
                        match self.capture.capture(today).await {
                            Ok(summary) if summary.raw_rows > 0 => {
                                outcome = Some(self.finish(today, summary, attempts)?);
                                WatchState::Done
                            }
                            result => {
                                match result {
                                    Ok(_) => tracing::info!(
                                        trade_date = %today,
                                        attempt = attempts,
                                        "아직 공시 데이터 없음"
                                    ),
                                    Err(e) => tracing::warn!(
                                        trade_date = %today,
                                        attempt = attempts,
                                        error = %e,
                                        "당일 수집 실패, 다음 주기에 재시도"
                                    ),
                                }
                                self.wait_next_poll(deadline_at).await
                            }
                        }
                    }
                }
                terminal => terminal,
            };
        }

        match outcome {
            Some(outcome) => Ok(outcome),
            None => {
                tracing::info!(
                    trade_date = %today,
                    attempts = attempts,
                    "마감 시각까지 데이터를 확보하지 못함"
                );
                Ok(WatchOutcome::DeadlinePassed { attempts })
            }
        }
    }

    /// 다음 폴링까지 `min(주기, 남은 시간)` 대기.
    ///
    /// 남은 시간이 없으면 대기 없이 `DeadlinePassed`로 전이합니다.
    async fn wait_next_poll(&self, deadline_at: DateTime<Tz>) -> WatchState {
        let remaining = (deadline_at - self.local_now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        if remaining.is_zero() {
            return WatchState::DeadlinePassed;
        }
        self.clock.sleep(self.schedule.interval.min(remaining)).await;
        WatchState::Polling
    }

    /// 완료 마커 기록.
    fn finish(&self, today: NaiveDate, summary: ExportSummary, attempts: u32) -> Result<WatchOutcome> {
        let marker = DoneMarker {
            trade_date: today,
            captured_at: self.local_now().fixed_offset(),
            watch_start: self.schedule.start_label(),
            watch_deadline: self.schedule.deadline_label(),
            watch_interval_minutes: self.schedule.interval_minutes,
            summary,
        };
        let written = self.markers.write(&marker, self.force)?;

        tracing::info!(trade_date = %today, attempts = attempts, "당일 공시 확보");
        marker.summary.log_summary("watch");

        Ok(WatchOutcome::Captured {
            marker_path: written.path().to_path_buf(),
            summary: marker.summary,
            attempts,
        })
    }
}

/// 실제 시계와 Eastmoney 수집기로 오늘 감시 실행 (watch 명령).
pub async fn watch_today(config: &CollectorConfig) -> Result<WatchOutcome> {
    config.validate()?;
    let schedule = config.watch.schedule()?;

    let (daily_dir, state_dir) = prepare_dirs(config)?;

    let client = EastmoneyLhbClient::with_base_url(&config.api_url)?;
    let capture = EastmoneyDailyCapture::new(client, config.fetch.clone(), daily_dir);

    let scheduler = WatchScheduler::new(
        schedule,
        Arc::new(SystemClock),
        Arc::new(capture),
        DoneMarkerStore::new(state_dir),
        config.watch.force,
    );
    scheduler.run().await
}

/// 일별 산출물/마커 디렉터리 생성 후 절대 경로로 반환.
///
/// 마커에 기록되는 산출물 경로가 실행 위치와 무관하도록 합니다.
fn prepare_dirs(config: &CollectorConfig) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(config.daily_dir())?;
    std::fs::create_dir_all(config.state_dir())?;

    let out_dir = std::fs::canonicalize(&config.out_dir)?;
    Ok((
        out_dir.join(&config.watch.daily_subdir),
        out_dir.join(&config.watch.state_subdir),
    ))
}
