//! cron 表达式模块
//! Cron expression module
//!
//! 解析五段式 cron 表达式（分 时 日 月 周）并计算下次执行时间。
//! Parses five-field cron expressions (minute hour day month day-of-week) and
//! computes upcoming occurrences.
//!
//! 每个字段被解析为一个允许值集合，校验与下次执行时间计算共用同一份解析结果。
//! Each field is parsed into a set of accepted values; validation and next-run
//! computation share the same parse result.
//!
//! 支持的语法 / Supported syntax:
//! - `*` 通配 / wildcard
//! - `,` 列表 / explicit lists
//! - `-` 区间 / ranges
//! - `/` 步进 / step values
//!
//! 周字段接受 0-7，其中 0 和 7 都表示周日。
//! The day-of-week field accepts 0-7 where both 0 and 7 denote Sunday.

use crate::error::{Error, Result};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

/// 字段描述：名称与取值范围
/// Field descriptor: name and value bounds
struct FieldSpec {
  name: &'static str,
  min: u8,
  max: u8,
}

const MINUTE: FieldSpec = FieldSpec {
  name: "minute",
  min: 0,
  max: 59,
};
const HOUR: FieldSpec = FieldSpec {
  name: "hour",
  min: 0,
  max: 23,
};
const DAY_OF_MONTH: FieldSpec = FieldSpec {
  name: "day-of-month",
  min: 1,
  max: 31,
};
const MONTH: FieldSpec = FieldSpec {
  name: "month",
  min: 1,
  max: 12,
};
const DAY_OF_WEEK: FieldSpec = FieldSpec {
  name: "day-of-week",
  min: 0,
  max: 7,
};

/// 向前搜索下次执行时间的天数上限，覆盖闰年周期
/// Day-level search horizon for next-run computation, covers a full leap cycle
const SEARCH_HORIZON_DAYS: u32 = 366 * 4 + 1;

/// 已解析的五段式 cron 表达式
/// A parsed five-field cron expression
///
/// 不变式：各集合非空且位于字段取值范围内；周日统一存为 0。
/// Invariant: all sets are non-empty and within field bounds; Sunday is stored as 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSchedule {
  expr: String,
  minutes: BTreeSet<u8>,
  hours: BTreeSet<u8>,
  days_of_month: BTreeSet<u8>,
  months: BTreeSet<u8>,
  days_of_week: BTreeSet<u8>,
  /// 日字段是否受限（非 `*`）；与周字段一起决定按日匹配规则
  /// Whether the day-of-month field is restricted (not `*`); governs the day match rule
  dom_restricted: bool,
  dow_restricted: bool,
}

impl FromStr for CronSchedule {
  type Err = Error;

  fn from_str(expr: &str) -> Result<Self> {
    let trimmed = expr.trim();
    if trimmed.is_empty() {
      return Err(Error::invalid_cron(expr, "expression is empty"));
    }
    let fields: Vec<&str> = trimmed.split_whitespace().collect();
    if fields.len() != 5 {
      return Err(Error::invalid_cron(
        expr,
        format!(
          "expected 5 fields (minute hour day-of-month month day-of-week), got {}",
          fields.len()
        ),
      ));
    }

    let minutes = parse_field(expr, &MINUTE, fields[0])?;
    let hours = parse_field(expr, &HOUR, fields[1])?;
    let days_of_month = parse_field(expr, &DAY_OF_MONTH, fields[2])?;
    let months = parse_field(expr, &MONTH, fields[3])?;
    let mut days_of_week = parse_field(expr, &DAY_OF_WEEK, fields[4])?;
    // 0 和 7 都表示周日，统一为 0
    // Both 0 and 7 mean Sunday, normalize to 0
    if days_of_week.remove(&7) {
      days_of_week.insert(0);
    }

    Ok(Self {
      expr: trimmed.to_string(),
      minutes,
      hours,
      days_of_month,
      months,
      days_of_week,
      dom_restricted: fields[2] != "*",
      dow_restricted: fields[4] != "*",
    })
  }
}

/// 解析单个字段为允许值集合
/// Parse a single field into its set of accepted values
fn parse_field(expr: &str, spec: &FieldSpec, text: &str) -> Result<BTreeSet<u8>> {
  let mut values = BTreeSet::new();
  for part in text.split(',') {
    if part.is_empty() {
      return Err(Error::invalid_cron(
        expr,
        format!("empty list item in {} field", spec.name),
      ));
    }

    let (base, step) = match part.split_once('/') {
      Some((base, step_str)) => {
        let step: u8 = step_str.parse().map_err(|_| {
          Error::invalid_cron(
            expr,
            format!("invalid step {:?} in {} field", step_str, spec.name),
          )
        })?;
        if step == 0 {
          return Err(Error::invalid_cron(
            expr,
            format!("step must be greater than 0 in {} field", spec.name),
          ));
        }
        (base, step)
      }
      None => (part, 1),
    };

    let (start, end) = if base == "*" {
      (spec.min, spec.max)
    } else if let Some((lo, hi)) = base.split_once('-') {
      let lo = parse_value(expr, spec, lo)?;
      let hi = parse_value(expr, spec, hi)?;
      if lo > hi {
        return Err(Error::invalid_cron(
          expr,
          format!("reversed range {}-{} in {} field", lo, hi, spec.name),
        ));
      }
      (lo, hi)
    } else {
      let value = parse_value(expr, spec, base)?;
      // 带步进的单值按「从该值到上界」处理，如分钟字段的 "5/15"
      // A single value with a step spans up to the field maximum, e.g. "5/15" for minutes
      if part.contains('/') {
        (value, spec.max)
      } else {
        (value, value)
      }
    };

    let mut v = start;
    while v <= end {
      values.insert(v);
      match v.checked_add(step) {
        Some(next) => v = next,
        None => break,
      }
    }
  }
  Ok(values)
}

/// 解析单个数值并做范围校验
/// Parse one numeric value with bounds checking
fn parse_value(expr: &str, spec: &FieldSpec, text: &str) -> Result<u8> {
  let value: u8 = text.parse().map_err(|_| {
    Error::invalid_cron(
      expr,
      format!("invalid value {:?} in {} field", text, spec.name),
    )
  })?;
  if value < spec.min || value > spec.max {
    return Err(Error::invalid_cron(
      expr,
      format!(
        "{} value {} out of range {}-{}",
        spec.name, value, spec.min, spec.max
      ),
    ));
  }
  Ok(value)
}

impl CronSchedule {
  /// 原始表达式文本
  /// The original expression text
  pub fn expression(&self) -> &str {
    &self.expr
  }

  /// 判断给定时刻（分钟精度）是否命中表达式
  /// Whether the given instant (minute precision) satisfies the expression
  pub fn matches(&self, t: DateTime<Utc>) -> bool {
    self.minutes.contains(&(t.minute() as u8))
      && self.hours.contains(&(t.hour() as u8))
      && self.months.contains(&(t.month() as u8))
      && self.day_matches(t.date_naive())
  }

  /// 标准 cron 的按日匹配规则：日和周字段都受限时取并集，否则取交集
  /// Standard cron day rule: when both day fields are restricted either may
  /// match, otherwise the restricted one (or none) must match
  fn day_matches(&self, date: NaiveDate) -> bool {
    let dom = self.days_of_month.contains(&(date.day() as u8));
    let dow = self
      .days_of_week
      .contains(&(date.weekday().num_days_from_sunday() as u8));
    match (self.dom_restricted, self.dow_restricted) {
      (true, true) => dom || dow,
      (true, false) => dom,
      (false, true) => dow,
      (false, false) => true,
    }
  }

  /// 计算严格晚于 `after` 的下一次执行时间
  /// Compute the next occurrence strictly after `after`
  ///
  /// 按「匹配日 → 时集合 → 分集合」搜索；表达式在搜索窗口内无法命中
  /// （如 2 月 30 日）则返回 `None`。
  /// Searches matching days, then the hour and minute sets; returns `None` when
  /// the expression cannot fire within the search horizon (e.g. Feb 30).
  pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let start = after + Duration::minutes(1);
    let start_date = start.date_naive();
    let start_hour = start.hour() as u8;
    let start_minute = start.minute() as u8;

    let mut date = start_date;
    for _ in 0..SEARCH_HORIZON_DAYS {
      if self.months.contains(&(date.month() as u8)) && self.day_matches(date) {
        for &hour in &self.hours {
          if date == start_date && hour < start_hour {
            continue;
          }
          for &minute in &self.minutes {
            if date == start_date && hour == start_hour && minute < start_minute {
              continue;
            }
            let naive = date.and_hms_opt(hour as u32, minute as u32, 0)?;
            return Some(DateTime::from_naive_utc_and_offset(naive, Utc));
          }
        }
      }
      date = date.succ_opt()?;
    }
    None
  }

  /// 返回严格晚于 `after` 的执行时间迭代器
  /// Iterator over occurrences strictly after `after`
  pub fn upcoming(&self, after: DateTime<Utc>) -> Upcoming<'_> {
    Upcoming {
      schedule: self,
      cursor: after,
    }
  }
}

/// 执行时间迭代器
/// Occurrence iterator
pub struct Upcoming<'a> {
  schedule: &'a CronSchedule,
  cursor: DateTime<Utc>,
}

impl Iterator for Upcoming<'_> {
  type Item = DateTime<Utc>;

  fn next(&mut self) -> Option<Self::Item> {
    let next = self.schedule.next_after(self.cursor)?;
    self.cursor = next;
    Some(next)
  }
}

/// cron 表达式校验结果
/// Cron expression validation result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CronValidation {
  /// 表达式是否有效
  /// Whether the expression is valid
  pub valid: bool,
  /// 无效时的错误说明
  /// Error description when invalid
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  /// 有效时的后续执行时间预览
  /// Preview of upcoming occurrences when valid
  #[serde(skip_serializing_if = "Option::is_none")]
  pub next_runs: Option<Vec<DateTime<Utc>>>,
}

/// 校验 cron 表达式并计算后续执行时间预览
/// Validate a cron expression and compute an occurrence preview
///
/// 纯函数：不产生副作用，结果只依赖表达式与 `now`。
/// Pure: no side effects, the result depends only on the expression and `now`.
pub fn validate_expression(expr: &str, preview: usize, now: DateTime<Utc>) -> CronValidation {
  match expr.parse::<CronSchedule>() {
    Ok(schedule) => CronValidation {
      valid: true,
      error: None,
      next_runs: Some(schedule.upcoming(now).take(preview).collect()),
    },
    Err(e) => CronValidation {
      valid: false,
      error: Some(e.to_string()),
      next_runs: None,
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
  }

  #[test]
  fn test_parse_wildcard_and_step() {
    let s: CronSchedule = "*/30 * * * *".parse().unwrap();
    assert_eq!(s.minutes, BTreeSet::from([0, 30]));
    assert_eq!(s.hours.len(), 24);
    assert!(!s.dom_restricted);
    assert!(!s.dow_restricted);
  }

  #[test]
  fn test_parse_lists_ranges_steps() {
    let s: CronSchedule = "1,15,30 9-17 * * 1-5".parse().unwrap();
    assert_eq!(s.minutes, BTreeSet::from([1, 15, 30]));
    assert_eq!(s.hours, (9..=17).collect::<BTreeSet<u8>>());
    assert_eq!(s.days_of_week, BTreeSet::from([1, 2, 3, 4, 5]));

    let s: CronSchedule = "10-40/10 * * * *".parse().unwrap();
    assert_eq!(s.minutes, BTreeSet::from([10, 20, 30, 40]));

    // 单值带步进从该值延伸到上界
    // Single value with step spans to the field maximum
    let s: CronSchedule = "5/15 * * * *".parse().unwrap();
    assert_eq!(s.minutes, BTreeSet::from([5, 20, 35, 50]));
  }

  #[test]
  fn test_sunday_as_zero_and_seven() {
    let zero: CronSchedule = "0 0 * * 0".parse().unwrap();
    let seven: CronSchedule = "0 0 * * 7".parse().unwrap();
    assert_eq!(zero.days_of_week, BTreeSet::from([0]));
    assert_eq!(zero.days_of_week, seven.days_of_week);

    // 2024-02-04 是周日
    // 2024-02-04 is a Sunday
    assert!(zero.matches(at(2024, 2, 4, 0, 0)));
    assert!(seven.matches(at(2024, 2, 4, 0, 0)));
    assert!(!zero.matches(at(2024, 2, 5, 0, 0)));
  }

  #[test]
  fn test_parse_errors() {
    for expr in [
      "",
      "* * * *",
      "* * * * * *",
      "60 * * * *",
      "* 24 * * *",
      "* * 0 * *",
      "* * 32 * *",
      "* * * 13 *",
      "* * * * 8",
      "a * * * *",
      "5-1 * * * *",
      "*/0 * * * *",
      "1,,2 * * * *",
      "*/x * * * *",
    ] {
      let err = expr.parse::<CronSchedule>().unwrap_err();
      assert!(
        matches!(err, Error::InvalidCron { .. }),
        "expected InvalidCron for {expr:?}, got {err:?}"
      );
      assert!(!err.to_string().is_empty());
    }
  }

  #[test]
  fn test_next_after_strictly_increasing_and_matching() {
    let s: CronSchedule = "*/30 * * * *".parse().unwrap();
    let now = at(2024, 2, 1, 10, 5);
    let runs: Vec<_> = s.upcoming(now).take(6).collect();
    assert_eq!(runs[0], at(2024, 2, 1, 10, 30));
    assert_eq!(runs[1], at(2024, 2, 1, 11, 0));
    for pair in runs.windows(2) {
      assert!(pair[0] < pair[1]);
    }
    for run in &runs {
      assert!(s.matches(*run));
      assert!(*run > now);
    }
  }

  #[test]
  fn test_next_after_is_strictly_after_exact_hit() {
    let s: CronSchedule = "30 10 * * *".parse().unwrap();
    // 正好落在触发点上时，下一次应是次日
    // From an instant exactly on a firing point, the next run is the following day
    let next = s.next_after(at(2024, 2, 1, 10, 30)).unwrap();
    assert_eq!(next, at(2024, 2, 2, 10, 30));
  }

  #[test]
  fn test_next_crosses_month_boundary() {
    let s: CronSchedule = "0 0 1 * *".parse().unwrap();
    let next = s.next_after(at(2024, 2, 15, 12, 0)).unwrap();
    assert_eq!(next, at(2024, 3, 1, 0, 0));
  }

  #[test]
  fn test_day_of_month_or_day_of_week() {
    // 日和周都受限时命中任一即可：13 号或周五
    // Both day fields restricted: either the 13th or a Friday matches
    let s: CronSchedule = "0 0 13 * 5".parse().unwrap();
    assert!(s.matches(at(2024, 2, 13, 0, 0))); // Tuesday the 13th
    assert!(s.matches(at(2024, 2, 9, 0, 0))); // Friday the 9th
    assert!(!s.matches(at(2024, 2, 12, 0, 0))); // Monday the 12th

    // 仅日受限
    // Only day-of-month restricted
    let s: CronSchedule = "0 0 13 * *".parse().unwrap();
    assert!(s.matches(at(2024, 2, 13, 0, 0)));
    assert!(!s.matches(at(2024, 2, 9, 0, 0)));
  }

  #[test]
  fn test_unsatisfiable_expression_has_no_next() {
    let s: CronSchedule = "0 0 30 2 *".parse().unwrap();
    assert!(s.next_after(at(2024, 1, 1, 0, 0)).is_none());
  }

  #[test]
  fn test_validate_expression_valid() {
    let v = validate_expression("*/5 * * * *", 3, at(2024, 2, 1, 10, 0));
    assert!(v.valid);
    assert!(v.error.is_none());
    let runs = v.next_runs.unwrap();
    assert_eq!(runs.len(), 3);
    assert_eq!(runs[0], at(2024, 2, 1, 10, 5));
  }

  #[test]
  fn test_validate_expression_invalid() {
    let v = validate_expression("61 * * * *", 3, Utc::now());
    assert!(!v.valid);
    assert!(!v.error.unwrap().is_empty());
    assert!(v.next_runs.is_none());

    let v = validate_expression("* * * *", 3, Utc::now());
    assert!(!v.valid);
    assert!(v.error.unwrap().contains("5 fields"));
  }
}
