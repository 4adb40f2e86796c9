use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use inrix_partition_error::{Result, config_err};

/// 데이터베이스 설정
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// 데이터베이스 연결 설정
    pub connection: ConnectionConfig,
    /// 세션 설정
    pub session: SessionConfig,
    /// 재시도 설정
    pub retry: RetryConfig,
}

impl DbConfig {
    /// 설정파일에서 db 설정 로드
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        Self::parse(&contents)
    }

    /// yml 문자열에서 db 설정 파싱
    pub fn parse(contents: &str) -> Result<Self> {
        let config: DbConfig = serde_yml::from_str(contents)?;
        config.retry.validate()?;
        Ok(config)
    }
}

/// db 연결설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub sslmode: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            database: "inrix".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
            sslmode: "disable".to_string(),
        }
    }
}

/// 세션 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// 연결 타임아웃(초)
    pub connection_timeout_seconds: u64,
    /// ALTER TABLE 실행 타임아웃(초)
    pub statement_timeout_seconds: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connection_timeout_seconds: 30,
            // 큰 파티션은 CHECK 검증에 전체 스캔이 필요함
            statement_timeout_seconds: 3600,
        }
    }
}

/// 재연결 재시도 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// 파티션당 최대 시도 횟수
    pub max_attempts: u32,
    /// 첫 재시도 대기 시간(ms)
    pub initial_backoff_ms: u64,
    /// 최대 대기 시간(ms)
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_backoff_ms: 500,
            max_backoff_ms: 30_000,
        }
    }
}

impl RetryConfig {
    fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(config_err("retry.max_attempts 는 1 이상이어야 합니다"));
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(config_err(format!(
                "retry.initial_backoff_ms({})가 retry.max_backoff_ms({})보다 큽니다",
                self.initial_backoff_ms, self.max_backoff_ms
            )));
        }
        Ok(())
    }
}
