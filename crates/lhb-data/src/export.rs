//! 산출물 저장.
//!
//! 한 번의 실행마다 다음 3개 파일을 생성합니다 (`stamp` = `YYYYMMDD_YYYYMMDD`):
//!
//! | 파일 | 내용 |
//! |------|------|
//! | `lhb_raw_<stamp>.csv` | 원본 행 (API 컬럼 8개) |
//! | `lhb_overview_<stamp>.csv` | 개요 행 (9개 컬럼) |
//! | `lhb_overview_grouped_<stamp>.json` | 거래일 → 시장 그룹 → 개요 행 |
//!
//! CSV는 스프레드시트 호환을 위해 UTF-8 BOM으로 시작합니다.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::Result;
use crate::model::{MarketGroup, OverviewRecord, RawRecord, OVERVIEW_COLUMNS, RAW_COLUMNS};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// 내보내기 결과 요약.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSummary {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// 원본 행 수
    pub raw_rows: usize,
    /// 개요 행 수 (거래일+종목 중복 제거)
    pub overview_rows: usize,
    /// 서로 다른 거래일 수
    pub trade_days: usize,
    pub raw_path: Option<PathBuf>,
    pub overview_path: Option<PathBuf>,
    pub grouped_path: Option<PathBuf>,
}

impl ExportSummary {
    /// 파일이 저장되었는지 여부.
    pub fn has_artifacts(&self) -> bool {
        self.raw_path.is_some()
    }

    /// 요약 로그 출력
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            start_date = %self.start_date,
            end_date = %self.end_date,
            raw_rows = self.raw_rows,
            overview_rows = self.overview_rows,
            trade_days = self.trade_days,
            raw_path = ?self.raw_path,
            overview_path = ?self.overview_path,
            grouped_path = ?self.grouped_path,
            "내보내기 완료"
        );
    }
}

/// 거래일 → 시장 그룹 → 개요 행 묶음.
///
/// 입력 행이 정규화 순서라면 거래일은 내림차순, 그룹은 우선순위 순으로
/// 직렬화됩니다.
#[derive(Debug, Default)]
pub struct GroupedOverview<'a> {
    days: Vec<(&'a str, Vec<(MarketGroup, Vec<&'a OverviewRecord>)>)>,
}

impl<'a> GroupedOverview<'a> {
    /// 개요 행을 처음 등장한 순서대로 묶음.
    pub fn from_rows(rows: &'a [OverviewRecord]) -> Self {
        let mut days: Vec<(&'a str, Vec<(MarketGroup, Vec<&'a OverviewRecord>)>)> = Vec::new();

        for row in rows {
            let day_index = match days.iter().position(|(day, _)| *day == row.trade_date) {
                Some(index) => index,
                None => {
                    days.push((row.trade_date.as_str(), Vec::new()));
                    days.len() - 1
                }
            };

            let groups = &mut days[day_index].1;
            match groups.iter_mut().find(|(group, _)| *group == row.market_group) {
                Some((_, records)) => records.push(row),
                None => groups.push((row.market_group, vec![row])),
            }
        }

        Self { days }
    }

    /// 거래일 수.
    pub fn day_count(&self) -> usize {
        self.days.len()
    }
}

struct GroupMap<'g, 'a>(&'g [(MarketGroup, Vec<&'a OverviewRecord>)]);

impl Serialize for GroupMap<'_, '_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (group, records) in self.0 {
            map.serialize_entry(group.as_str(), records)?;
        }
        map.end()
    }
}

impl Serialize for GroupedOverview<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.days.len()))?;
        for (day, groups) in &self.days {
            map.serialize_entry(day, &GroupMap(groups))?;
        }
        map.end()
    }
}

/// 산출물 경로 묶음.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub raw: PathBuf,
    pub overview: PathBuf,
    pub grouped: PathBuf,
}

impl ArtifactPaths {
    /// 기간 스탬프로 경로 생성.
    pub fn for_range(out_dir: &Path, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        let stamp = format!(
            "{}_{}",
            start_date.format("%Y%m%d"),
            end_date.format("%Y%m%d")
        );
        Self {
            raw: out_dir.join(format!("lhb_raw_{}.csv", stamp)),
            overview: out_dir.join(format!("lhb_overview_{}.csv", stamp)),
            grouped: out_dir.join(format!("lhb_overview_grouped_{}.json", stamp)),
        }
    }
}

/// 원본/개요 행을 저장하고 요약을 반환.
///
/// 원본 행이 없고 `write_when_empty`가 false이면 파일을 만들지 않습니다.
pub fn export_rows(
    out_dir: &Path,
    start_date: NaiveDate,
    end_date: NaiveDate,
    raw_rows: &[RawRecord],
    overview_rows: &[OverviewRecord],
    write_when_empty: bool,
) -> Result<ExportSummary> {
    let trade_days: HashSet<&str> = overview_rows.iter().map(|r| r.trade_date.as_str()).collect();

    let mut summary = ExportSummary {
        start_date,
        end_date,
        raw_rows: raw_rows.len(),
        overview_rows: overview_rows.len(),
        trade_days: trade_days.len(),
        raw_path: None,
        overview_path: None,
        grouped_path: None,
    };

    if raw_rows.is_empty() && !write_when_empty {
        tracing::debug!(start_date = %start_date, end_date = %end_date, "빈 결과, 저장 생략");
        return Ok(summary);
    }

    std::fs::create_dir_all(out_dir)?;
    let paths = ArtifactPaths::for_range(out_dir, start_date, end_date);

    write_raw_csv(&paths.raw, raw_rows)?;
    write_overview_csv(&paths.overview, overview_rows)?;
    write_grouped_json(&paths.grouped, overview_rows)?;

    summary.raw_path = Some(paths.raw);
    summary.overview_path = Some(paths.overview);
    summary.grouped_path = Some(paths.grouped);
    Ok(summary)
}

/// BOM을 쓴 CSV writer 생성.
fn bom_csv_writer(path: &Path) -> Result<csv::Writer<BufWriter<File>>> {
    let mut file = BufWriter::new(File::create(path)?);
    file.write_all(UTF8_BOM)?;
    Ok(csv::Writer::from_writer(file))
}

/// 원본 CSV 저장.
pub fn write_raw_csv(path: &Path, rows: &[RawRecord]) -> Result<()> {
    let mut wtr = bom_csv_writer(path)?;
    wtr.write_record(RAW_COLUMNS)?;

    for row in rows {
        let change_rate = row.change_rate.map(|v| v.to_string()).unwrap_or_default();
        wtr.write_record([
            row.security_code.as_str(),
            row.secucode.as_str(),
            row.security_name.as_str(),
            row.trade_date.as_str(),
            change_rate.as_str(),
            row.trade_market_code.as_str(),
            row.security_type_code.as_str(),
            row.explain.as_str(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// 개요 CSV 저장.
pub fn write_overview_csv(path: &Path, rows: &[OverviewRecord]) -> Result<()> {
    let mut wtr = bom_csv_writer(path)?;
    wtr.write_record(OVERVIEW_COLUMNS)?;

    for row in rows {
        let change_rate = row.change_rate.map(|v| v.to_string()).unwrap_or_default();
        wtr.write_record([
            row.trade_date.as_str(),
            row.market_group.as_str(),
            row.security_code.as_str(),
            row.security_name.as_str(),
            change_rate.as_str(),
            row.trade_market_code.as_str(),
            row.security_type_code.as_str(),
            row.detail_link.as_str(),
            row.quote_link.as_str(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// 그룹 JSON 저장.
pub fn write_grouped_json(path: &Path, rows: &[OverviewRecord]) -> Result<()> {
    let grouped = GroupedOverview::from_rows(rows);
    tracing::debug!(path = %path.display(), trade_days = grouped.day_count(), "그룹 JSON 저장");
    let mut file = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut file, &grouped)?;
    file.flush()?;
    Ok(())
}
