//! Response header checks.
//!
//! Presence is always checked. Values are parsed only for the formats below;
//! any other declared format is accepted as-is.

use axum::http::HeaderMap;
use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::contract::HeaderContract;
use crate::validation::outcome::Violation;

/// Check one declared header against the response headers.
pub fn check_header(name: &str, headers: &HeaderMap, contract: &HeaderContract) -> Option<Violation> {
    let value = header_value(headers, name);
    if value.is_empty() {
        return Some(Violation::header(name, format!("{} in headers is missing", name)));
    }

    let format = contract.format.as_deref()?;
    check_format(format, &value)
        .err()
        .map(|message| Violation::header(name, message))
}

/// First value of a header, or `""` when absent.
fn header_value(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
        .unwrap_or_default()
}

/// Parse `value` with the parser for `format`. Unknown formats pass.
pub fn check_format(format: &str, value: &str) -> Result<(), String> {
    match format {
        "int32" => value.parse::<i32>().map(drop).map_err(|e| parse_error(format, value, e)),
        "int64" => value.parse::<i64>().map(drop).map_err(|e| parse_error(format, value, e)),
        "float" => value.parse::<f32>().map(drop).map_err(|e| parse_error(format, value, e)),
        "double" => value.parse::<f64>().map(drop).map_err(|e| parse_error(format, value, e)),
        "date" => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(drop)
            .map_err(|e| parse_error(format, value, e)),
        "date-time" => parse_date_time(value).map_err(|e| parse_error(format, value, e)),
        "uuid" => uuid::Uuid::parse_str(value)
            .map(drop)
            .map_err(|e| parse_error(format, value, e)),
        _ => Ok(()),
    }
}

/// RFC 3339, plus the local-time and colon-less offset forms servers commonly send.
fn parse_date_time(value: &str) -> Result<(), chrono::ParseError> {
    let rfc3339 = match DateTime::parse_from_rfc3339(value) {
        Ok(_) => return Ok(()),
        Err(e) => e,
    };
    if DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z").is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
    {
        return Ok(());
    }
    Err(rfc3339)
}

fn parse_error(format: &str, value: &str, error: impl std::fmt::Display) -> String {
    format!("parsing {:?} as {}: {}", value, format, error)
}
