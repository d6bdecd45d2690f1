//! 당일 수집 완료 마커 관리 모듈.
//!
//! 감시 모드가 특정 거래일의 데이터를 처음 확보하면
//! `<state_dir>/<YYYY-MM-DD>.done.json`을 한 번 기록합니다.
//! 다음 실행은 시작 시점에 이 파일을 확인하고, 있으면 네트워크 요청 없이 종료합니다.
//!
//! # 동시 실행
//!
//! 잠금 파일은 사용하지 않습니다. 강제 실행이 아니면 임시 파일을 기존 마커를
//! 덮어쓰지 않는 방식으로 제자리에 옮기므로, 같은 날짜를 두고 경쟁한 두 번째
//! 프로세스는 [`MarkerWrite::AlreadyExists`]를 받습니다.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, NaiveDate};
use lhb_data::ExportSummary;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::Result;

/// 완료 마커 내용.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoneMarker {
    /// 거래일
    pub trade_date: NaiveDate,
    /// 수집 시각 (감시 시간대 기준)
    pub captured_at: DateTime<FixedOffset>,
    /// 감시 시작 시각 (HH:MM)
    pub watch_start: String,
    /// 감시 마감 시각 (HH:MM)
    pub watch_deadline: String,
    /// 폴링 주기 (분)
    pub watch_interval_minutes: f64,
    /// 내보내기 요약
    pub summary: ExportSummary,
}

/// 마커 기록 결과.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerWrite {
    /// 새로 기록됨 (강제 실행 시 교체 포함)
    Created(PathBuf),
    /// 다른 실행이 먼저 기록함
    AlreadyExists(PathBuf),
}

impl MarkerWrite {
    /// 마커 파일 경로.
    pub fn path(&self) -> &Path {
        match self {
            MarkerWrite::Created(path) | MarkerWrite::AlreadyExists(path) => path,
        }
    }
}

/// 완료 마커 저장소.
#[derive(Debug, Clone)]
pub struct DoneMarkerStore {
    state_dir: PathBuf,
}

impl DoneMarkerStore {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
        }
    }

    /// 해당 거래일의 마커 경로.
    pub fn path_for(&self, trade_date: NaiveDate) -> PathBuf {
        self.state_dir
            .join(format!("{}.done.json", trade_date.format("%Y-%m-%d")))
    }

    /// 마커 존재 여부.
    pub fn exists(&self, trade_date: NaiveDate) -> bool {
        self.path_for(trade_date).is_file()
    }

    /// 마커 로드. 없으면 `None`.
    pub fn load(&self, trade_date: NaiveDate) -> Result<Option<DoneMarker>> {
        let path = self.path_for(trade_date);
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 마커 기록.
    ///
    /// 같은 디렉터리의 임시 파일에 내용을 모두 쓴 뒤 제자리로 이동하므로
    /// 중간에 실패해도 빈 마커나 일부만 쓰인 마커가 남지 않습니다.
    /// `replace`가 false이면 이미 존재하는 마커를 건드리지 않습니다.
    pub fn write(&self, marker: &DoneMarker, replace: bool) -> Result<MarkerWrite> {
        std::fs::create_dir_all(&self.state_dir)?;
        let path = self.path_for(marker.trade_date);
        let content = serde_json::to_string_pretty(marker)?;

        let mut staged = NamedTempFile::new_in(&self.state_dir)?;
        staged.write_all(content.as_bytes())?;
        staged.as_file().sync_all()?;

        let persisted = if replace {
            staged.persist(&path)
        } else {
            staged.persist_noclobber(&path)
        };
        match persisted {
            Ok(_) => {}
            Err(e) if !replace && e.error.kind() == ErrorKind::AlreadyExists => {
                tracing::warn!(path = %path.display(), "완료 마커가 이미 존재함 (다른 실행이 먼저 기록)");
                return Ok(MarkerWrite::AlreadyExists(path));
            }
            Err(e) => return Err(e.error.into()),
        }

        tracing::info!(path = %path.display(), trade_date = %marker.trade_date, "완료 마커 기록");
        Ok(MarkerWrite::Created(path))
    }
}
