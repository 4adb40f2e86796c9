use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use inrix_partition_error::Result;

use crate::calendar::Calendar;

/// 파티션 제약조건 작업 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionConfig {
    /// 대상 테이블 설정
    pub target: TargetConfig,
    /// 처리할 연도별 월 목록
    pub calendar: Calendar,
}

impl PartitionConfig {
    /// 설정파일에서 설정 로드
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        Self::parse(&contents)
    }

    /// yml 문자열에서 설정 파싱
    pub fn parse(contents: &str) -> Result<Self> {
        let config = serde_yml::from_str(contents)?;
        Ok(config)
    }
}

/// 대상 테이블 설정
///
/// 파티션 테이블 이름은 `<schema>.<table_prefix><yyyymm>` 형태.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub schema: String,
    pub table_prefix: String,
    /// 범위를 검사할 날짜 컬럼
    pub column: String,
    /// 이미 제약조건이 있는 파티션은 건너뜀 (false 면 에러로 중단)
    pub skip_existing: bool,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            schema: "inrix".to_string(),
            table_prefix: "raw_data".to_string(),
            column: "tx".to_string(),
            skip_existing: true,
        }
    }
}
