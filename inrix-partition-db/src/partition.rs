use std::fmt;

use chrono::{Months, NaiveDate};

use inrix_partition_config::Calendar;
use inrix_partition_error::{Result, config_err};

/// 월 단위 파티션 라벨
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionLabel {
    year: i32,
    month: u32,
    start: NaiveDate,
    end: NaiveDate,
}

impl PartitionLabel {
    /// (연도, 월)로 라벨 생성
    pub fn new(year: i32, month: u32) -> Result<Self> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| config_err(format!("날짜로 만들 수 없는 연월: {}-{}", year, month)))?;
        let end = start
            .checked_add_months(Months::new(1))
            .ok_or_else(|| config_err(format!("다음 달을 계산할 수 없는 연월: {}-{}", year, month)))?;

        Ok(Self {
            year,
            month,
            start,
            end,
        })
    }

    /// 테이블 이름 접미사 (`yyyymm`)
    pub fn yyyymm(&self) -> String {
        format!("{}{:02}", self.year, self.month)
    }

    /// 파티션 첫째 날
    pub const fn start_date(&self) -> NaiveDate {
        self.start
    }

    /// 다음 달 첫째 날 (범위 상한, 미포함)
    pub const fn end_date(&self) -> NaiveDate {
        self.end
    }

    /// SQL 날짜 리터럴용 문자열 (`YYYY-MM-DD`)
    pub fn start_literal(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }
}

impl fmt::Display for PartitionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:02}", self.year, self.month)
    }
}

/// calendar 순서대로 라벨 목록 생성
pub fn labels(calendar: &Calendar) -> Result<Vec<PartitionLabel>> {
    calendar
        .entries()
        .map(|(year, month)| PartitionLabel::new(year, month))
        .collect()
}
