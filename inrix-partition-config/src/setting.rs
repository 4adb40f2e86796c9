use std::path::Path;

use log::info;

use inrix_partition_error::{PartitionError, Result};

use crate::config::PartitionConfig;
use crate::dbconfig::DbConfig;

const DB_CONFIG_FILE: &str = "db.yml";
const PARTITION_CONFIG_FILE: &str = "partition.yml";

/// 통합 세팅 인스턴스
///
/// 시작 시 한 번 만들고 이후 변경하지 않는다.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub database: DbConfig,
    pub partition: PartitionConfig,
}

impl Settings {
    /// 현재 디렉토리에서 Setting 생성
    pub fn new() -> Result<Self> {
        Self::load_from(".")
    }

    /// 지정한 디렉토리에서 Setting 생성
    pub fn load_from<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let database = Self::load_db_config(&dir.join(DB_CONFIG_FILE))?;
        let partition = Self::load_partition_config(&dir.join(PARTITION_CONFIG_FILE))?;

        Ok(Self {
            database,
            partition,
        })
    }

    /// db 설정 로드
    fn load_db_config(path: &Path) -> Result<DbConfig> {
        // yml 파일 유무 확인
        if path.exists() {
            info!("DB 설정파일 로드: {}", path.display());
            DbConfig::from_file(path).map_err(|e| {
                PartitionError::Config(format!("DB 설정파일 로드 실패: {}", e))
            })
        } else {
            // 기본설정사용
            info!("DB 기본설정 사용");
            Ok(DbConfig::default())
        }
    }

    /// 파티션 설정 로드
    fn load_partition_config(path: &Path) -> Result<PartitionConfig> {
        if path.exists() {
            info!("파티션 설정파일 로드: {}", path.display());
            PartitionConfig::from_file(path).map_err(|e| {
                PartitionError::Config(format!("파티션 설정파일 로드 실패: {}", e))
            })
        } else {
            info!("파티션 기본설정 사용");
            Ok(PartitionConfig::default())
        }
    }
}
