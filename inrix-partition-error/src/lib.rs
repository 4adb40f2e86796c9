use std::error::Error as StdError;
use std::fmt;
use std::io;

use tokio::time::error::Elapsed;
use tokio_postgres::Error as PgError;
use tokio_postgres::error::SqlState;
use serde_yml::Error as YmlError;

/// 파티션 제약조건 작업의 모든 에러 타입을 정의합니다.
#[derive(Debug)]
pub enum PartitionError {
    /// 설정 관련 에러
    Config(String),

    /// 입출력 에러
    Io(io::Error),

    /// 쿼리 자체의 문제 (문법, 권한 등). 재시도 대상이 아님
    Database(String),

    /// 연결 끊김, 서버 종료 등 연결 수준의 에러. 재연결 후 재시도
    Operational(String),

    /// 이미 같은 이름의 제약조건이 존재
    DuplicateConstraint(String),

    /// 허용되지 않는 식별자
    InvalidIdentifier(String),

    /// 타임아웃 에러
    Timeout(String),

    /// 재시도 횟수 초과
    RetryExhausted {
        partition: String,
        attempts: u32,
        last_error: String,
    },

    /// 내부 상태 관련 에러
    Internal(String),

    /// 기타 에러
    Other(String),
}

impl PartitionError {
    /// 재연결 후 재시도할 수 있는 에러인지 여부
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, PartitionError::Operational(_) | PartitionError::Timeout(_))
    }
}

impl fmt::Display for PartitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartitionError::Config(msg) => write!(f, "설정 에러: {}", msg),
            PartitionError::Io(err) => write!(f, "I/O 에러: {}", err),
            PartitionError::Database(msg) => write!(f, "데이터베이스 에러: {}", msg),
            PartitionError::Operational(msg) => write!(f, "연결 에러: {}", msg),
            PartitionError::DuplicateConstraint(msg) => write!(f, "제약조건 중복: {}", msg),
            PartitionError::InvalidIdentifier(msg) => write!(f, "잘못된 식별자: {}", msg),
            PartitionError::Timeout(msg) => write!(f, "타임아웃 에러: {}", msg),
            PartitionError::RetryExhausted {
                partition,
                attempts,
                last_error,
            } => write!(
                f,
                "재시도 횟수 초과: {} ({}회 시도, 마지막 에러: {})",
                partition, attempts, last_error
            ),
            PartitionError::Internal(msg) => write!(f, "내부 에러: {}", msg),
            PartitionError::Other(msg) => write!(f, "기타 에러: {}", msg),
        }
    }
}

impl StdError for PartitionError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            PartitionError::Io(err) => Some(err),
            _ => None,
        }
    }
}

/// Result 타입 별칭 정의
pub type Result<T> = std::result::Result<T, PartitionError>;

/// 연결 수준의 PostgreSQL 에러인지 판별
///
/// 연결이 닫혔거나, I/O 에러가 원인이거나, 서버가 연결 예외(08xxx),
/// statement_timeout 취소(57014), 관리자 종료(57P01~57P03),
/// 연결 수 초과(53300)를 보고한 경우. 취소된 문장은 서버에서 롤백된다.
pub fn is_operational(err: &PgError) -> bool {
    if err.is_closed() {
        return true;
    }

    if let Some(code) = err.code() {
        return code.code().starts_with("08")
            || *code == SqlState::QUERY_CANCELED
            || *code == SqlState::ADMIN_SHUTDOWN
            || *code == SqlState::CRASH_SHUTDOWN
            || *code == SqlState::CANNOT_CONNECT_NOW
            || *code == SqlState::TOO_MANY_CONNECTIONS;
    }

    err.source().is_some_and(|source| source.is::<io::Error>())
}

/// From 트레이트 구현으로 다양한 에러 타입을 PartitionError로 변환
impl From<io::Error> for PartitionError {
    fn from(err: io::Error) -> Self {
        PartitionError::Io(err)
    }
}

impl From<PgError> for PartitionError {
    fn from(err: PgError) -> Self {
        if is_operational(&err) {
            PartitionError::Operational(format!("PostgreSQL 연결 에러: {}", err))
        } else {
            PartitionError::Database(format!("PostgreSQL 에러: {}", err))
        }
    }
}

impl From<Elapsed> for PartitionError {
    fn from(err: Elapsed) -> Self {
        PartitionError::Timeout(format!("작업 타임아웃: {}", err))
    }
}

impl From<YmlError> for PartitionError {
    fn from(err: YmlError) -> Self {
        PartitionError::Config(format!("YAML 파싱 에러: {}", err))
    }
}

impl From<String> for PartitionError {
    fn from(err: String) -> Self {
        PartitionError::Other(err)
    }
}

impl From<&str> for PartitionError {
    fn from(err: &str) -> Self {
        PartitionError::Other(err.to_string())
    }
}

/// 에러 처리 유틸리티 함수
pub fn config_err<E: fmt::Display>(err: E) -> PartitionError {
    PartitionError::Config(format!("{}", err))
}

pub fn db_err<E: fmt::Display>(err: E) -> PartitionError {
    PartitionError::Database(format!("{}", err))
}

pub fn operational_err<E: fmt::Display>(err: E) -> PartitionError {
    PartitionError::Operational(format!("{}", err))
}

pub fn internal_err<E: fmt::Display>(err: E) -> PartitionError {
    PartitionError::Internal(format!("{}", err))
}
