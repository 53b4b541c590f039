//! Admin listing filters: parsed from the raw query string into an
//! [`OrderQuery`] the repositories can run without further checks.

use std::collections::HashMap;
use std::ops::RangeInclusive;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use optica_types::domain::order::OrderStatus;
use optica_types::domain::query::{DateRange, OrderQuery, SortDirection, SortField, SortSpec};

use crate::errors::AppError;

pub const KEY_EMAIL: &str = "correo";
pub const KEY_STATUS: &str = "status";
pub const KEY_SORT: &str = "sort";
pub const KEY_FROM: &str = "desde";
pub const KEY_TO: &str = "hasta";

pub const ALLOWED_FILTERS: [&str; 5] = [KEY_EMAIL, KEY_STATUS, KEY_SORT, KEY_FROM, KEY_TO];

/// Years a date bound may fall in. Storage compares timestamps as text.
const BOUND_YEARS: RangeInclusive<i32> = 0..=9999;

#[derive(Clone, Copy)]
enum Bound {
    Start,
    End,
}

pub fn parse_filters(filters: &HashMap<String, String>) -> Result<OrderQuery, AppError> {
    let mut unknown: Vec<&str> = filters
        .keys()
        .map(String::as_str)
        .filter(|k| !ALLOWED_FILTERS.contains(k))
        .collect();
    if !unknown.is_empty() {
        unknown.sort_unstable();
        return Err(AppError::bad_request(format!(
            "invalid filter(s): {}",
            unknown.join(", ")
        )));
    }

    let status = filters
        .get(KEY_STATUS)
        .map(|raw| {
            raw.parse::<OrderStatus>()
                .map_err(|_| AppError::bad_request("invalid status"))
        })
        .transpose()?;

    let created = match (filters.get(KEY_FROM), filters.get(KEY_TO)) {
        (None, None) => None,
        (Some(from), Some(to)) => {
            let from = parse_bound(KEY_FROM, from, Bound::Start)?;
            let to = parse_bound(KEY_TO, to, Bound::End)?;
            Some(DateRange::new(from, to).ok_or_else(|| {
                AppError::bad_request(format!("{KEY_FROM} must not be after {KEY_TO}"))
            })?)
        }
        _ => {
            return Err(AppError::bad_request(format!(
                "{KEY_FROM} and {KEY_TO} must be provided together"
            )))
        }
    };

    let sort = filters
        .get(KEY_SORT)
        .map(|raw| parse_sort(raw))
        .transpose()?
        .unwrap_or_default();

    Ok(OrderQuery {
        email: filters.get(KEY_EMAIL).cloned(),
        status,
        created,
        owner: None,
        sort,
    })
}

/// `<field>_<ASC|DESC>`. `fecha` is the order date shown to customers,
/// which is the creation time.
fn parse_sort(raw: &str) -> Result<SortSpec, AppError> {
    let invalid = || AppError::bad_request("invalid sort parameter");
    let (field, direction) = raw.rsplit_once('_').ok_or_else(invalid)?;
    let field = match field {
        "createdAt" | "fecha" => SortField::CreatedAt,
        "updatedAt" => SortField::UpdatedAt,
        _ => return Err(invalid()),
    };
    let direction = if direction.eq_ignore_ascii_case("asc") {
        SortDirection::Asc
    } else if direction.eq_ignore_ascii_case("desc") {
        SortDirection::Desc
    } else {
        return Err(invalid());
    };
    Ok(SortSpec { field, direction })
}

/// Accepts RFC 3339 or a bare `YYYY-MM-DD`, which covers the whole day.
fn parse_bound(key: &str, raw: &str, bound: Bound) -> Result<DateTime<Utc>, AppError> {
    let invalid = || AppError::bad_request(format!("invalid date for {key}: {raw}"));
    let at = match DateTime::parse_from_rfc3339(raw) {
        Ok(at) => at.with_timezone(&Utc),
        Err(_) => {
            let day = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| invalid())?;
            match bound {
                Bound::Start => Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN)),
                Bound::End => {
                    let next = day.succ_opt().ok_or_else(invalid)?;
                    Utc.from_utc_datetime(&next.and_time(NaiveTime::MIN))
                        .checked_sub_signed(Duration::microseconds(1))
                        .ok_or_else(invalid)?
                }
            }
        }
    };
    if !BOUND_YEARS.contains(&at.year()) {
        return Err(invalid());
    }
    Ok(at)
}
