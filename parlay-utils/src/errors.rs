use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Deserialize)]
pub enum ParlayErrorKind {
    RuntimeError,
}

mod error_date_time_format {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = format!("{}", date.format(FORMAT));
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(s.as_str(), FORMAT)
            .map_err(serde::de::Error::custom)
            .map(|x| {
                let now = Utc::now();
                let date: DateTime<Utc> = DateTime::from_utc(x, *now.offset());
                date
            })
    }
}

/// Structured payload carried by every Parlay error: what happened and where.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ParlayErrorBody {
    pub kind: ParlayErrorKind,
    pub message: String,
    pub module: String,
    pub file: String,
    pub line: u32,
    #[serde(with = "error_date_time_format")]
    pub utc_date_time: DateTime<Utc>,
}

impl fmt::Display for ParlayErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match serde_json::to_string_pretty(&self) {
            Ok(s) => write!(f, "{s}"),
            Err(_) => write!(f, "{}: {}", self.file, self.message),
        }
    }
}

pub trait ErrorWithBody {
    fn get_body(&self) -> &ParlayErrorBody;
}

#[doc(hidden)]
#[macro_export]
macro_rules! runtime_error_body {
    ($($x: expr),*) => {
        $crate::errors::ParlayErrorBody {
            kind: $crate::errors::ParlayErrorKind::RuntimeError,
            message: format!($($x,)*),
            module: module_path!().to_owned(),
            file: file!().to_owned(),
            line: line!(),
            utc_date_time: chrono::Utc::now(),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_macros() {
        let e = runtime_error_body!("Test {}", 31);
        assert_eq!(e.kind, ParlayErrorKind::RuntimeError);
        assert_eq!(e.message, "Test 31");
    }
}
