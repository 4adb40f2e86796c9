use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};

use inrix_partition_error::{PartitionError, Result, config_err};

/// 처리할 연도별 월 목록
///
/// 연도는 오름차순, 월은 설정에 적힌 순서대로 순회한다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCalendar", into = "BTreeMap<i32, Vec<u32>>")]
pub struct Calendar {
    years: BTreeMap<i32, Vec<u32>>,
}

impl Calendar {
    /// 연도별 월 목록으로 생성
    pub fn new(years: BTreeMap<i32, Vec<u32>>) -> Result<Self> {
        if years.values().all(Vec::is_empty) {
            return Err(config_err("calendar 에 처리할 월이 없습니다"));
        }

        for (year, months) in &years {
            if !(1..=9999).contains(year) {
                return Err(config_err(format!("잘못된 연도: {}", year)));
            }
            for (i, month) in months.iter().enumerate() {
                if !(1..=12).contains(month) {
                    return Err(config_err(format!("잘못된 월: {}년 {}월", year, month)));
                }
                if months[..i].contains(month) {
                    return Err(config_err(format!("중복된 월: {}년 {}월", year, month)));
                }
            }
        }

        Ok(Self { years })
    }

    /// (연도, 월) 쌍을 순서대로 반환
    pub fn entries(&self) -> impl Iterator<Item = (i32, u32)> + '_ {
        self.years
            .iter()
            .flat_map(|(year, months)| months.iter().map(move |month| (*year, *month)))
    }

    /// 전체 (연도, 월) 쌍의 수
    pub fn len(&self) -> usize {
        self.years.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Calendar {
    /// raw_data 가 적재된 월: 2012-07~2013-06, 2014-01~2016-06
    fn default() -> Self {
        let years: BTreeMap<i32, Vec<u32>> = BTreeMap::from([
            (2012, (7..=12).collect()),
            (2013, (1..=6).collect()),
            (2014, (1..=12).collect()),
            (2015, (1..=12).collect()),
            (2016, (1..=6).collect()),
        ]);
        Self { years }
    }
}

impl From<Calendar> for BTreeMap<i32, Vec<u32>> {
    fn from(calendar: Calendar) -> Self {
        calendar.years
    }
}

/// yml 에서 읽은 그대로의 calendar. 같은 연도가 두 번 나오면 에러
#[derive(Debug)]
pub struct RawCalendar(Vec<(i32, MonthSpec)>);

impl<'de> Deserialize<'de> for RawCalendar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct CalendarVisitor;

        impl<'de> Visitor<'de> for CalendarVisitor {
            type Value = RawCalendar;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("연도별 월 목록")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<RawCalendar, A::Error> {
                let mut entries: Vec<(i32, MonthSpec)> = Vec::new();
                while let Some((YearKey(year), spec)) = map.next_entry::<YearKey, MonthSpec>()? {
                    // `2012:` 와 `"2012":` 는 yml 에서는 다른 키
                    if entries.iter().any(|(seen, _)| *seen == year) {
                        return Err(de::Error::custom(format!("중복된 연도: {}", year)));
                    }
                    entries.push((year, spec));
                }
                Ok(RawCalendar(entries))
            }
        }

        deserializer.deserialize_map(CalendarVisitor)
    }
}

impl TryFrom<RawCalendar> for Calendar {
    type Error = PartitionError;

    fn try_from(raw: RawCalendar) -> Result<Self> {
        let mut years = BTreeMap::new();
        for (year, spec) in raw.0 {
            years.insert(year, spec.into_months(year)?);
        }
        Calendar::new(years)
    }
}

/// 월 목록: `[7, 8, 9]` 또는 `{ first: 7, last: 12 }`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MonthSpec {
    List(Vec<u32>),
    Range { first: u32, last: u32 },
}

impl MonthSpec {
    fn into_months(self, year: i32) -> Result<Vec<u32>> {
        match self {
            MonthSpec::List(months) => Ok(months),
            MonthSpec::Range { first, last } if first <= last => Ok((first..=last).collect()),
            MonthSpec::Range { first, last } => Err(config_err(format!(
                "{}년 월 범위가 뒤집혀 있습니다: {}..{}",
                year, first, last
            ))),
        }
    }
}

/// 정수(`2012:`)와 문자열(`"2012":`) 키를 모두 허용하는 연도 키
#[derive(Debug, PartialEq, Eq)]
pub struct YearKey(pub i32);

impl<'de> Deserialize<'de> for YearKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct YearVisitor;

        impl Visitor<'_> for YearVisitor {
            type Value = YearKey;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("연도 (정수 또는 문자열)")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<YearKey, E> {
                i32::try_from(v)
                    .map(YearKey)
                    .map_err(|_| E::custom(format!("연도 범위 초과: {}", v)))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<YearKey, E> {
                i32::try_from(v)
                    .map(YearKey)
                    .map_err(|_| E::custom(format!("연도 범위 초과: {}", v)))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<YearKey, E> {
                v.trim()
                    .parse()
                    .map(YearKey)
                    .map_err(|_| E::custom(format!("연도가 숫자가 아닙니다: {:?}", v)))
            }
        }

        deserializer.deserialize_any(YearVisitor)
    }
}
