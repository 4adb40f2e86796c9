use std::io::Write;

use chrono::Local;
use env_logger::{Builder, Env};
use log::info;
use once_cell::sync::Lazy;

use inrix_partition_config::Settings;
use inrix_partition_db::{PgConnector, run_partitioning};
use inrix_partition_error::Result;

/// 설정파일 디렉토리
static CONFIG_DIR: Lazy<String> = Lazy::new(|| {
    std::env::var("PARTITION_CONFIG_DIR").unwrap_or_else(|_| ".".to_string()) // 기본값 현재 디렉토리
});

/// 기본 로그 레벨. `RUST_LOG` 로 덮어쓸 수 있다
#[cfg(debug_assertions)]
const DEFAULT_LOG_LEVEL: &str = "debug";
#[cfg(not(debug_assertions))]
const DEFAULT_LOG_LEVEL: &str = "info";

/// 로거 빌더 생성
fn logger_builder(env: Env<'_>) -> Builder {
    let mut builder = Builder::from_env(env.default_filter_or(DEFAULT_LOG_LEVEL));
    builder.format(|buf, record| {
        if cfg!(debug_assertions) {
            writeln!(
                buf,
                "[{} {} {}:{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        } else {
            writeln!(
                buf,
                "[{} {}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        }
    });
    builder
}

/// 로거 세팅
fn setup_logger() {
    logger_builder(Env::default()).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // 로거 세팅
    setup_logger();

    info!("inrix 파티션 제약조건 추가 시작");

    // 통합 설정 로드
    let settings = Settings::load_from(CONFIG_DIR.as_str())?;

    // db 연결 관리자
    let connector = PgConnector::new(&settings.database);

    let summary = run_partitioning(&settings, &connector).await?;
    info!(
        "완료: 추가 {}, 건너뜀 {}, 재시도 {}",
        summary.applied, summary.skipped, summary.retries
    );

    Ok(())
}
