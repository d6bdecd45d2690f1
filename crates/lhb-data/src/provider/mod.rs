//! 데이터 Provider 모듈.
//!
//! ## 동방재부(Eastmoney) 데이터센터
//! - `EastmoneyLhbClient`: 용호방 상세 리포트 조회 (페이지 단위, 재시도 포함)
//! - 인증 불필요, 페이지당 500행 고정

pub mod eastmoney;

pub use eastmoney::{
    EastmoneyLhbClient, PageResponse, DEFAULT_API_URL, EMPTY_RESULT_CODE, PAGE_SIZE, REPORT_NAME,
};
