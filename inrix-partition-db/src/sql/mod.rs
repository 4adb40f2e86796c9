use crate::ident::{Identifier, TableName};

/// 월 범위 CHECK 제약조건 추가 쿼리
///
/// 식별자는 검증된 `Identifier` 로만 받고, 날짜는 `YYYY-MM-DD` 형식만 넣는다.
pub fn add_check_constraint(
    table: &TableName,
    constraint: &Identifier,
    column: &Identifier,
    start: &str,
) -> String {
    format!(
        include_str!("./add_check_constraint.sql"),
        table = table,
        constraint = constraint,
        column = column,
        start = start,
    )
}
