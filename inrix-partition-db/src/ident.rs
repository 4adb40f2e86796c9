use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use inrix_partition_error::{PartitionError, Result};

/// PostgreSQL 식별자 최대 길이 (NAMEDATALEN - 1)
const MAX_IDENTIFIER_LEN: usize = 63;

/// 허용 식별자: 소문자, 숫자, 밑줄. 따옴표로 감싸도 의미가 바뀌지 않는 이름만 허용
static IDENTIFIER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z_][a-z0-9_]*$").expect("식별자 정규식"));

/// 검증된 SQL 식별자
///
/// `Display` 는 큰따옴표로 감싼 형태를 출력한다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier(String);

impl Identifier {
    pub fn new(name: &str) -> Result<Self> {
        if name.len() > MAX_IDENTIFIER_LEN {
            return Err(PartitionError::InvalidIdentifier(format!(
                "{} ({}자 초과)",
                name, MAX_IDENTIFIER_LEN
            )));
        }
        if !IDENTIFIER_PATTERN.is_match(name) {
            return Err(PartitionError::InvalidIdentifier(format!("{:?}", name)));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.0)
    }
}

/// 스키마를 포함한 테이블 이름
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    pub schema: Identifier,
    pub table: Identifier,
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}
