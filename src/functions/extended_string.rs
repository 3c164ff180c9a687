use super::string_fns::arg;
use crate::error::{MongoSqlError, Result};
use bson::{doc, Bson};

pub const NAMES: &[&str] = &[
    "CONCAT_WS",
    "REGEXP_SUBSTR",
    "FORMAT",
    "SOUNDEX",
    "HEX",
    "UNHEX",
    "BIN",
];

/// Insert thousands separators into the integer part of a decimal string.
fn group_thousands(int_part: &str) -> String {
    let bytes: Vec<char> = int_part.chars().collect();
    let mut out = String::new();
    let len = bytes.len();
    for (i, c) in bytes.iter().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(*c);
    }
    out
}

fn format_number(n: f64, decimals: i64) -> String {
    let decimals = decimals.max(0) as usize;
    let rounded = format!("{n:.decimals$}");
    let (int_part, frac_part) = match rounded.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (rounded.as_str(), None),
    };
    let negative = int_part.starts_with('-');
    let digits = int_part.trim_start_matches('-');
    let grouped = group_thousands(digits);
    let mut result = if negative {
        format!("-{grouped}")
    } else {
        grouped
    };
    if let Some(f) = frac_part {
        result.push('.');
        result.push_str(f);
    }
    result
}

/// MariaDB's extended SOUNDEX: first letter kept verbatim, remaining
/// letters mapped to digits, consecutive duplicates collapsed, padded with
/// trailing zeros to at least 4 characters (MariaDB does not truncate to 4
/// the way standard SOUNDEX does).
fn soundex(s: &str) -> String {
    fn code(c: char) -> Option<char> {
        match c.to_ascii_uppercase() {
            'B' | 'F' | 'P' | 'V' => Some('1'),
            'C' | 'G' | 'J' | 'K' | 'Q' | 'S' | 'X' | 'Z' => Some('2'),
            'D' | 'T' => Some('3'),
            'L' => Some('4'),
            'M' | 'N' => Some('5'),
            'R' => Some('6'),
            _ => None,
        }
    }
    let letters: Vec<char> = s.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.is_empty() {
        return String::new();
    }
    let mut out = String::new();
    out.push(letters[0].to_ascii_uppercase());
    let mut last_code = code(letters[0]);
    for &c in &letters[1..] {
        let cur = code(c);
        if let Some(d) = cur {
            if Some(d) != last_code {
                out.push(d);
            }
        }
        last_code = cur;
    }
    while out.len() < 4 {
        out.push('0');
    }
    out
}

pub fn call(name: &str, args: &[Bson]) -> Result<Bson> {
    match name {
        "CONCAT_WS" => {
            let sep = arg(args, 0)?;
            let rest: Vec<Bson> = args[1.min(args.len())..].to_vec();
            let mut pieces = Vec::new();
            for (i, piece) in rest.into_iter().enumerate() {
                if i > 0 {
                    pieces.push(sep.clone());
                }
                pieces.push(piece);
            }
            Ok(Bson::Document(doc! { "$concat": pieces }))
        }
        "REGEXP_SUBSTR" => Ok(Bson::Document(doc! {
            "$regexFind": { "input": arg(args, 0)?, "regex": arg(args, 1)? }
        })),
        "FORMAT" => {
            let n = arg(args, 0)?;
            let d = args.get(1).and_then(|b| b.as_i64().or_else(|| b.as_i32().map(i64::from))).unwrap_or(0);
            match n {
                Bson::Int32(i) => Ok(Bson::String(format_number(i as f64, d))),
                Bson::Int64(i) => Ok(Bson::String(format_number(i as f64, d))),
                Bson::Double(f) => Ok(Bson::String(format_number(f, d))),
                other => Err(MongoSqlError::translation(format!(
                    "FORMAT requires a numeric literal, got {other:?}"
                ))),
            }
        }
        "SOUNDEX" => match arg(args, 0)? {
            Bson::String(s) => Ok(Bson::String(soundex(&s))),
            other => Ok(Bson::Document(doc! { "$soundex": other })),
        },
        "HEX" => match arg(args, 0)? {
            Bson::String(s) => Ok(Bson::String(hex::encode_upper(s.as_bytes()))),
            Bson::Int32(i) => Ok(Bson::String(format!("{i:X}"))),
            Bson::Int64(i) => Ok(Bson::String(format!("{i:X}"))),
            other => Ok(Bson::Document(doc! { "$hex": other })),
        },
        "UNHEX" => match arg(args, 0)? {
            Bson::String(s) => match hex::decode(&s) {
                Ok(bytes) => Ok(Bson::String(String::from_utf8_lossy(&bytes).to_string())),
                Err(_) => Ok(Bson::Null),
            },
            other => Ok(Bson::Document(doc! { "$unhex": other })),
        },
        "BIN" => match arg(args, 0)? {
            Bson::Int32(i) => Ok(Bson::String(format!("{i:b}"))),
            Bson::Int64(i) => Ok(Bson::String(format!("{i:b}"))),
            other => Ok(Bson::Document(doc! { "$bin": other })),
        },
        _ => Err(MongoSqlError::unsupported(format!(
            "extended string function {name} not supported"
        ))),
    }
}
