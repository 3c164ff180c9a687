//! Date/time function family. Current-time functions read MongoDB's
//! aggregation-time `"$$NOW"` system variable; extractors wrap their input
//! in `$toDate` so both literal date strings and date-typed fields work.
//! `INTERVAL n UNIT` arguments (`DATE_ADD`/`DATE_SUB`/`ADDDATE`/`SUBDATE`/
//! `TIMESTAMPADD`) are pre-parsed by the expression compiler into an
//! `{amount, unit}` document before reaching `call`.

use super::string_fns::arg;
use crate::error::{MongoSqlError, Result};
use bson::{doc, Bson};

pub const NAMES: &[&str] = &[
    "NOW",
    "CURDATE",
    "CURTIME",
    "CURRENT_DATE",
    "CURRENT_TIME",
    "CURRENT_TIMESTAMP",
    "UTC_DATE",
    "UTC_TIME",
    "UTC_TIMESTAMP",
    "SYSDATE",
    "LOCALTIME",
    "LOCALTIMESTAMP",
    "YEAR",
    "MONTH",
    "DAY",
    "DAYOFMONTH",
    "HOUR",
    "MINUTE",
    "SECOND",
    "MICROSECOND",
    "DAYOFWEEK",
    "DAYOFYEAR",
    "WEEK",
    "WEEKOFYEAR",
    "YEARWEEK",
    "QUARTER",
    "WEEKDAY",
    "DAYNAME",
    "MONTHNAME",
    "DATE_FORMAT",
    "TIME_FORMAT",
    "DATE_ADD",
    "DATE_SUB",
    "ADDDATE",
    "SUBDATE",
    "TIMESTAMPADD",
    "DATEDIFF",
    "TIMESTAMPDIFF",
    "TO_DAYS",
    "FROM_DAYS",
    "SEC_TO_TIME",
    "TIME_TO_SEC",
    "MAKEDATE",
    "MAKETIME",
    "PERIOD_ADD",
    "PERIOD_DIFF",
    "ADDTIME",
    "SUBTIME",
    "CONVERT_TZ",
    "STR_TO_DATE",
    "DATE",
    "TIME",
];

/// Functions whose final argument is an `INTERVAL n UNIT` clause rather than
/// a plain expression — consulted by the expression compiler.
pub const INTERVAL_ARG_FUNCTIONS: &[&str] =
    &["DATE_ADD", "DATE_SUB", "ADDDATE", "SUBDATE", "TIMESTAMPADD"];

fn to_date(e: Bson) -> Bson {
    Bson::Document(doc! { "$toDate": e })
}

fn now_format(fmt: &str, utc: bool) -> Bson {
    let mut inner = doc! { "date": "$$NOW", "format": fmt };
    if utc {
        inner.insert("timezone", "UTC");
    }
    Bson::Document(doc! { "$dateToString": inner })
}

/// MySQL → MongoDB `$dateToString`/`$dateFromString` specifier table, per
/// spec.md §4.F. Unsupported specifiers pass through unchanged.
pub fn translate_format(mysql_fmt: &str) -> String {
    let mut out = String::new();
    let mut chars = mysql_fmt.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('Y') => out.push_str("%Y"),
            Some('M') => out.push_str("%B"),
            Some('m') => out.push_str("%m"),
            Some('d') => out.push_str("%d"),
            Some('W') => out.push_str("%A"),
            Some('H') => out.push_str("%H"),
            Some('h') => out.push_str("%I"),
            Some('i') => out.push_str("%M"),
            Some('s') => out.push_str("%S"),
            Some('p') => out.push_str("%p"),
            Some('r') => out.push_str("%I:%M:%S %p"),
            Some('T') => out.push_str("%H:%M:%S"),
            Some('%') => out.push('%'),
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }
    out
}

const WEEKDAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];
const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

fn day_name_switch(date: Bson) -> Bson {
    let dow = Bson::Document(doc! { "$dayOfWeek": date });
    let branches: Vec<Bson> = (1..=7)
        .map(|i| {
            Bson::Document(doc! {
                "case": { "$eq": [dow.clone(), i] },
                "then": WEEKDAY_NAMES[(i - 1) as usize]
            })
        })
        .collect();
    Bson::Document(doc! { "$switch": { "branches": branches, "default": Bson::Null } })
}

fn month_name_switch(date: Bson) -> Bson {
    let m = Bson::Document(doc! { "$month": date });
    let branches: Vec<Bson> = (1..=12)
        .map(|i| {
            Bson::Document(doc! {
                "case": { "$eq": [m.clone(), i] },
                "then": MONTH_NAMES[(i - 1) as usize]
            })
        })
        .collect();
    Bson::Document(doc! { "$switch": { "branches": branches, "default": Bson::Null } })
}

fn unit_ms(unit: &str) -> Option<f64> {
    Some(match unit {
        "millisecond" => 1.0,
        "second" => 1000.0,
        "minute" => 60_000.0,
        "hour" => 3_600_000.0,
        "day" => 86_400_000.0,
        "week" => 604_800_000.0,
        _ => return None,
    })
}

fn interval_parts(interval_doc: &Bson) -> Result<(Bson, String)> {
    let doc = interval_doc
        .as_document()
        .ok_or_else(|| MongoSqlError::translation("expected an INTERVAL amount/unit document"))?;
    let amount = doc
        .get("amount")
        .cloned()
        .ok_or_else(|| MongoSqlError::translation("INTERVAL missing amount"))?;
    let unit = doc
        .get_str("unit")
        .map_err(|_| MongoSqlError::translation("INTERVAL missing unit"))?
        .to_string();
    Ok((amount, unit))
}

pub fn call(name: &str, args: &[Bson]) -> Result<Bson> {
    match name {
        "NOW" | "CURRENT_TIMESTAMP" | "SYSDATE" | "LOCALTIME" | "LOCALTIMESTAMP" => {
            Ok(now_format("%Y-%m-%d %H:%M:%S", false))
        }
        "CURDATE" | "CURRENT_DATE" => Ok(now_format("%Y-%m-%d", false)),
        "CURTIME" | "CURRENT_TIME" => Ok(now_format("%H:%M:%S", false)),
        "UTC_TIMESTAMP" => Ok(now_format("%Y-%m-%d %H:%M:%S", true)),
        "UTC_DATE" => Ok(now_format("%Y-%m-%d", true)),
        "UTC_TIME" => Ok(now_format("%H:%M:%S", true)),
        "YEAR" => Ok(Bson::Document(doc! { "$year": to_date(arg(args, 0)?) })),
        "MONTH" => Ok(Bson::Document(doc! { "$month": to_date(arg(args, 0)?) })),
        "DAY" | "DAYOFMONTH" => Ok(Bson::Document(doc! { "$dayOfMonth": to_date(arg(args, 0)?) })),
        "HOUR" => Ok(Bson::Document(doc! { "$hour": to_date(arg(args, 0)?) })),
        "MINUTE" => Ok(Bson::Document(doc! { "$minute": to_date(arg(args, 0)?) })),
        "SECOND" => Ok(Bson::Document(doc! { "$second": to_date(arg(args, 0)?) })),
        "MICROSECOND" => Ok(Bson::Document(doc! {
            "$multiply": [{ "$millisecond": to_date(arg(args, 0)?) }, 1000]
        })),
        "DAYOFWEEK" => Ok(Bson::Document(doc! { "$dayOfWeek": to_date(arg(args, 0)?) })),
        "DAYOFYEAR" => Ok(Bson::Document(doc! { "$dayOfYear": to_date(arg(args, 0)?) })),
        "WEEK" | "WEEKOFYEAR" => Ok(Bson::Document(doc! { "$week": to_date(arg(args, 0)?) })),
        "YEARWEEK" => {
            let date = to_date(arg(args, 0)?);
            Ok(Bson::Document(doc! {
                "$add": [
                    { "$multiply": [{ "$year": date.clone() }, 100] },
                    { "$week": date }
                ]
            }))
        }
        "QUARTER" => Ok(Bson::Document(doc! {
            "$ceil": { "$divide": [{ "$month": to_date(arg(args, 0)?) }, 3] }
        })),
        "WEEKDAY" => {
            // MongoDB: 1=Sunday..7=Saturday. MySQL WEEKDAY: 0=Monday..6=Sunday.
            let dow = Bson::Document(doc! { "$dayOfWeek": to_date(arg(args, 0)?) });
            Ok(Bson::Document(doc! {
                "$mod": [{ "$add": [dow, 5] }, 7]
            }))
        }
        "DAYNAME" => Ok(day_name_switch(to_date(arg(args, 0)?))),
        "MONTHNAME" => Ok(month_name_switch(to_date(arg(args, 0)?))),
        "DATE_FORMAT" | "TIME_FORMAT" => {
            let date = to_date(arg(args, 0)?);
            let fmt_bson = arg(args, 1)?;
            let fmt = match fmt_bson {
                Bson::String(s) => translate_format(&s),
                other => {
                    return Err(MongoSqlError::translation(format!(
                        "DATE_FORMAT requires a literal format string, got {other:?}"
                    )))
                }
            };
            Ok(Bson::Document(doc! { "$dateToString": { "date": date, "format": fmt } }))
        }
        "STR_TO_DATE" => {
            let date_str = arg(args, 0)?;
            let fmt_bson = arg(args, 1)?;
            let fmt = match fmt_bson {
                Bson::String(s) => translate_format(&s),
                other => {
                    return Err(MongoSqlError::translation(format!(
                        "STR_TO_DATE requires a literal format string, got {other:?}"
                    )))
                }
            };
            Ok(Bson::Document(
                doc! { "$dateFromString": { "dateString": date_str, "format": fmt } },
            ))
        }
        "DATE" => Ok(Bson::Document(doc! {
            "$dateToString": { "date": to_date(arg(args, 0)?), "format": "%Y-%m-%d" }
        })),
        "TIME" => Ok(Bson::Document(doc! {
            "$dateToString": { "date": to_date(arg(args, 0)?), "format": "%H:%M:%S" }
        })),
        "DATE_ADD" | "ADDDATE" | "TIMESTAMPADD" => {
            let date = to_date(arg(args, 0)?);
            let (amount, unit) = interval_parts(&arg(args, 1)?)?;
            Ok(Bson::Document(
                doc! { "$dateAdd": { "startDate": date, "unit": unit, "amount": amount } },
            ))
        }
        "DATE_SUB" | "SUBDATE" => {
            let date = to_date(arg(args, 0)?);
            let (amount, unit) = interval_parts(&arg(args, 1)?)?;
            Ok(Bson::Document(
                doc! { "$dateSubtract": { "startDate": date, "unit": unit, "amount": amount } },
            ))
        }
        "DATEDIFF" => {
            let a = to_date(arg(args, 0)?);
            let b = to_date(arg(args, 1)?);
            Ok(Bson::Document(doc! {
                "$toInt": { "$divide": [{ "$subtract": [a, b] }, 86_400_000] }
            }))
        }
        "TIMESTAMPDIFF" => {
            let (_, unit) = interval_parts(&arg(args, 0)?)
                .or_else(|_| -> Result<(Bson, String)> {
                    // Plain unit literal (no amount) form: TIMESTAMPDIFF(unit, a, b).
                    match arg(args, 0)? {
                        Bson::String(s) => Ok((Bson::Null, s.to_lowercase())),
                        other => Err(MongoSqlError::translation(format!(
                            "TIMESTAMPDIFF requires a unit, got {other:?}"
                        ))),
                    }
                })?;
            let a = to_date(arg(args, 1)?);
            let b = to_date(arg(args, 2)?);
            if unit == "year" || unit == "month" || unit == "quarter" {
                let mongo_unit = if unit == "quarter" { "month" } else { unit.as_str() };
                let diff = Bson::Document(
                    doc! { "$dateDiff": { "startDate": a, "endDate": b, "unit": mongo_unit } },
                );
                if unit == "quarter" {
                    Ok(Bson::Document(doc! { "$trunc": { "$divide": [diff, 3] } }))
                } else {
                    Ok(diff)
                }
            } else {
                let ms = unit_ms(&unit).ok_or_else(|| {
                    MongoSqlError::unsupported(format!("TIMESTAMPDIFF unit {unit} not supported"))
                })?;
                Ok(Bson::Document(doc! {
                    "$toInt": { "$divide": [{ "$subtract": [b, a] }, ms] }
                }))
            }
        }
        // Marker operators with no native MongoDB equivalent — interpreted
        // only by the expression evaluator (§4.E), pushed through otherwise.
        "TO_DAYS" => Ok(Bson::Document(doc! { "$toDays": arg(args, 0)? })),
        "FROM_DAYS" => Ok(Bson::Document(doc! { "$fromDays": arg(args, 0)? })),
        "SEC_TO_TIME" => Ok(Bson::Document(doc! { "$secToTime": arg(args, 0)? })),
        "TIME_TO_SEC" => Ok(Bson::Document(doc! { "$timeToSec": arg(args, 0)? })),
        "MAKEDATE" => Ok(Bson::Document(doc! { "$makeDate": [arg(args, 0)?, arg(args, 1)?] })),
        "MAKETIME" => Ok(Bson::Document(
            doc! { "$makeTime": [arg(args, 0)?, arg(args, 1)?, arg(args, 2)?] },
        )),
        "PERIOD_ADD" => Ok(Bson::Document(doc! { "$periodAdd": [arg(args, 0)?, arg(args, 1)?] })),
        "PERIOD_DIFF" => Ok(Bson::Document(doc! { "$periodDiff": [arg(args, 0)?, arg(args, 1)?] })),
        "ADDTIME" => Ok(Bson::Document(doc! { "$addTime": [arg(args, 0)?, arg(args, 1)?] })),
        "SUBTIME" => Ok(Bson::Document(doc! { "$subTime": [arg(args, 0)?, arg(args, 1)?] })),
        "CONVERT_TZ" => Ok(Bson::Document(doc! {
            "$convertTz": [arg(args, 0)?, arg(args, 1)?, arg(args, 2)?]
        })),
        _ => Err(MongoSqlError::unsupported(format!(
            "datetime function {name} not supported"
        ))),
    }
}
