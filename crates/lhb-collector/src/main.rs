//! LHB collector CLI.

use std::path::PathBuf;

use chrono::{Datelike, Local, NaiveDate};
use clap::{Parser, Subcommand};
use lhb_collector::config::parse_date;
use lhb_collector::modules::{self, WatchOutcome};
use lhb_collector::CollectorConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "lhb-collector")]
#[command(about = "Eastmoney LHB disclosure collector", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// 산출물 루트 디렉터리
    #[arg(long, global = true)]
    out_dir: Option<PathBuf>,

    /// 페이지 요청 간 대기 (초)
    #[arg(long, global = true)]
    sleep_seconds: Option<f64>,

    /// 페이지당 최대 시도 횟수
    #[arg(long, global = true)]
    max_retries: Option<u32>,
}

#[derive(Subcommand)]
enum Commands {
    /// 기간 데이터 내보내기
    Range {
        /// 시작일 (YYYY-MM-DD, 기본: 올해 1월 1일)
        #[arg(long)]
        start_date: Option<String>,

        /// 종료일 (YYYY-MM-DD, 기본: 오늘)
        #[arg(long)]
        end_date: Option<String>,
    },

    /// 당일 공시 감시 (확보 또는 마감까지 폴링)
    Watch {
        /// 감시 시작 시각 (HH:MM)
        #[arg(long)]
        start: Option<String>,

        /// 감시 마감 시각 (HH:MM)
        #[arg(long)]
        deadline: Option<String>,

        /// 폴링 주기 (분)
        #[arg(long)]
        interval_minutes: Option<f64>,

        /// 시간대 (예: Asia/Shanghai)
        #[arg(long)]
        tz: Option<String>,

        /// 일별 산출물 하위 디렉터리
        #[arg(long)]
        daily_subdir: Option<String>,

        /// 완료 마커 하위 디렉터리
        #[arg(long)]
        state_subdir: Option<String>,

        /// 완료 마커가 있어도 다시 수집
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    /// 공통 CLI 인자로 환경변수 설정 덮어쓰기
    fn apply_overrides(&self, config: &mut CollectorConfig) {
        if let Some(out_dir) = &self.out_dir {
            config.out_dir = out_dir.clone();
        }
        if let Some(sleep_seconds) = self.sleep_seconds {
            config.fetch.sleep_seconds = sleep_seconds;
        }
        if let Some(max_retries) = self.max_retries {
            config.fetch.max_retries = max_retries;
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // 로깅 초기화
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "lhb_collector={level},lhb_data={level}",
                    level = cli.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, "LHB Collector 실패");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = CollectorConfig::from_env();
    cli.apply_overrides(&mut config);
    tracing::debug!(api_url = %config.api_url, out_dir = %config.out_dir.display(), "설정 로드 완료");

    match cli.command {
        Commands::Range {
            start_date,
            end_date,
        } => {
            let today = Local::now().date_naive();
            let start_date = match start_date {
                Some(value) => parse_date(&value)?,
                None => NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today),
            };
            let end_date = match end_date {
                Some(value) => parse_date(&value)?,
                None => today,
            };

            let summary = modules::run_range(&config, start_date, end_date).await?;
            summary.log_summary("range");
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Watch {
            start,
            deadline,
            interval_minutes,
            tz,
            daily_subdir,
            state_subdir,
            force,
        } => {
            let watch = &mut config.watch;
            if let Some(start) = start {
                watch.start = start;
            }
            if let Some(deadline) = deadline {
                watch.deadline = deadline;
            }
            if let Some(interval_minutes) = interval_minutes {
                watch.interval_minutes = interval_minutes;
            }
            if let Some(tz) = tz {
                watch.timezone = tz;
            }
            if let Some(daily_subdir) = daily_subdir {
                watch.daily_subdir = daily_subdir;
            }
            if let Some(state_subdir) = state_subdir {
                watch.state_subdir = state_subdir;
            }
            watch.force |= force;

            match modules::watch_today(&config).await? {
                WatchOutcome::AlreadyDone { marker_path } => {
                    println!("already done: {}", marker_path.display());
                }
                WatchOutcome::Captured {
                    marker_path,
                    summary,
                    attempts,
                } => {
                    println!(
                        "captured after {} poll(s): {} raw rows, marker {}",
                        attempts,
                        summary.raw_rows,
                        marker_path.display()
                    );
                }
                WatchOutcome::DeadlinePassed { attempts } => {
                    println!("deadline passed after {} poll(s), no data", attempts);
                }
            }
        }
    }

    Ok(())
}
