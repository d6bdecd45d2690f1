//! Eastmoney 용호방(LHB) 공시 수집기.
//!
//! 이 crate는 `lhb-data` 위에서 동작하는 바이너리를 제공합니다:
//! - 기간 내보내기 (원본 CSV, 개요 CSV, 그룹 JSON)
//! - 당일 감시 모드 (공시가 올라올 때까지 폴링, 완료 마커 기록)

pub mod config;
pub mod error;
pub mod modules;

pub use config::CollectorConfig;
pub use error::{CollectorError, Result};
