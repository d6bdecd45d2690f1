//! 용호방(LHB) 데이터 수집 및 정규화.
//!
//! 이 crate는 다음을 제공합니다:
//! - Eastmoney 데이터센터 API 클라이언트 (페이지 조회, 기간 수집)
//! - 지수 백오프 재시도 정책
//! - 원본 행 정규화 (중복 제거, 시장 그룹 분류, 링크 생성, 정렬)
//! - CSV/JSON 산출물 저장

pub mod error;
pub mod export;
pub mod model;
pub mod normalize;
pub mod provider;
pub mod retry;

pub use error::{DataError, Result};
pub use export::{export_rows, ArtifactPaths, ExportSummary, GroupedOverview};
pub use model::{MarketGroup, OverviewRecord, RawRecord};
pub use normalize::normalize;
pub use provider::{EastmoneyLhbClient, PageResponse};
pub use retry::RetryPolicy;
