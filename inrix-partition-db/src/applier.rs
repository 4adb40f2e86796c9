use log::{info, warn};

use inrix_partition_config::TargetConfig;
use inrix_partition_error::{PartitionError, Result};

use crate::ident::{Identifier, TableName};
use crate::partition::PartitionLabel;
use crate::session::PartitionSession;
use crate::sql;

/// `yyyymm` 접미사 최대 길이
const YYYYMM_LEN: usize = 6;

/// 제약조건 적용 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// 이미 같은 이름의 제약조건이 있어 건너뜀
    AlreadyPresent,
}

/// 파티션별 CHECK 제약조건 적용기
#[derive(Debug, Clone)]
pub struct ConstraintApplier {
    schema: Identifier,
    table_prefix: String,
    column: Identifier,
    skip_existing: bool,
}

impl ConstraintApplier {
    pub fn new(target: &TargetConfig) -> Result<Self> {
        // 접두사 자체도 식별자 규칙을 만족해야 함
        Identifier::new(&target.table_prefix)?;

        let applier = Self {
            schema: Identifier::new(&target.schema)?,
            table_prefix: target.table_prefix.clone(),
            column: Identifier::new(&target.column)?,
            skip_existing: target.skip_existing,
        };

        // 가장 긴 이름(yyyymm 6자리)으로 제약조건 이름을 미리 확인
        let longest = format!(
            "{}{}_{}_check",
            applier.table_prefix,
            "0".repeat(YYYYMM_LEN),
            applier.column.as_str()
        );
        Identifier::new(&longest).map_err(|_| {
            PartitionError::InvalidIdentifier(format!(
                "제약조건 이름 {} 이 PostgreSQL 식별자 길이(63자)를 넘습니다. table_prefix 또는 column 을 줄여야 합니다",
                longest
            ))
        })?;

        Ok(applier)
    }

    /// 파티션 테이블 이름
    pub fn table_name(&self, label: &PartitionLabel) -> Result<TableName> {
        Ok(TableName {
            schema: self.schema.clone(),
            table: Identifier::new(&format!("{}{}", self.table_prefix, label.yyyymm()))?,
        })
    }

    /// 제약조건 이름. 이름 없는 단일 컬럼 CHECK 에 PostgreSQL 이 붙이는 이름과 같다
    pub fn constraint_name(&self, table: &TableName) -> Result<Identifier> {
        Identifier::new(&format!("{}_{}_check", table.table.as_str(), self.column.as_str()))
    }

    /// 파티션 하나에 대한 ALTER TABLE 문
    pub fn statement(&self, label: &PartitionLabel) -> Result<String> {
        let table = self.table_name(label)?;
        let constraint = self.constraint_name(&table)?;
        Ok(sql::add_check_constraint(
            &table,
            &constraint,
            &self.column,
            &label.start_literal(),
        ))
    }

    /// 파티션 하나에 제약조건 추가
    pub async fn apply<S: PartitionSession + ?Sized>(
        &self,
        session: &mut S,
        label: &PartitionLabel,
    ) -> Result<ApplyOutcome> {
        let table = self.table_name(label)?;
        let statement = self.statement(label)?;

        info!("{} 테이블에 체크 제약조건 추가", table);
        match session.execute(&statement).await {
            Ok(()) => Ok(ApplyOutcome::Applied),
            Err(PartitionError::DuplicateConstraint(msg)) if self.skip_existing => {
                warn!("{} 테이블에 이미 제약조건이 있어 건너뜀: {}", table, msg);
                Ok(ApplyOutcome::AlreadyPresent)
            }
            Err(e) => Err(e),
        }
    }
}
