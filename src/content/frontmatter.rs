//! Front-matter parsing

use chrono::{DateTime, Local, NaiveDateTime};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_yaml::{Mapping, Value};

/// Custom deserializer that handles both a single string and a list of strings
fn string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, SeqAccess, Visitor};
    use std::fmt;

    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![value.to_string()])
        }

        fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![value])
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![value.to_string()])
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![value.to_string()])
        }

        fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![value.to_string()])
        }

        fn visit_bool<E>(self, value: bool) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![value.to_string()])
        }

        fn visit_seq<S>(self, mut seq: S) -> Result<Self::Value, S::Error>
        where
            S: SeqAccess<'de>,
        {
            let mut vec = Vec::new();
            while let Some(item) = seq.next_element::<Value>()? {
                match scalar_string(&item) {
                    Some(s) => vec.push(s),
                    None => return Err(de::Error::custom("tags must be scalars")),
                }
            }
            Ok(vec)
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Vec::new())
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_any(StringOrVec)
}

/// Accept any scalar (`title: 1984`) as text
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Null => Ok(None),
        other => scalar_string(&other)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom("expected a string, number or boolean")),
    }
}

/// Text form of a scalar YAML value; `None` for null, lists and mappings
pub fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_string(&tagged.value),
        _ => None,
    }
}

/// Manually assigned ordering key of a content item.
///
/// Read leniently: numbers and numeric strings count, anything else is
/// `Missing`. Non-finite values are never stored, so two `Number`s always
/// compare.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SortIndex {
    Number(f64),
    #[default]
    Missing,
}

impl SortIndex {
    /// Interpret a raw front-matter value
    pub fn from_value(value: &Value) -> Self {
        let number = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            Value::Tagged(tagged) => return Self::from_value(&tagged.value),
            _ => None,
        };
        match number {
            Some(n) if n.is_finite() => SortIndex::Number(n),
            _ => SortIndex::Missing,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SortIndex::Number(n) => Some(*n),
            SortIndex::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, SortIndex::Missing)
    }
}

impl<'de> Deserialize<'de> for SortIndex {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(SortIndex::from_value(&value))
    }
}

impl Serialize for SortIndex {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            SortIndex::Number(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => {
                serializer.serialize_i64(*n as i64)
            }
            SortIndex::Number(n) => serializer.serialize_f64(*n),
            SortIndex::Missing => serializer.serialize_none(),
        }
    }
}

/// Front-matter data from a content file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontMatter {
    #[serde(deserialize_with = "lenient_string", default)]
    pub title: Option<String>,
    #[serde(deserialize_with = "lenient_string", default)]
    pub id: Option<String>,
    pub index: SortIndex,
    #[serde(deserialize_with = "string_or_vec", default)]
    pub tags: Vec<String>,
    pub layout: Option<String>,
    pub permalink: Option<String>,
    pub date: Option<String>,
    #[serde(deserialize_with = "lenient_string", default)]
    pub description: Option<String>,
    pub draft: bool,

    /// Additional custom fields
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl FrontMatter {
    /// Parse front-matter from content string.
    /// Returns (front_matter, remaining_content)
    pub fn parse(content: &str) -> Result<(Self, &str), serde_yaml::Error> {
        let (mapping, body) = Self::split(content)?;
        Ok((Self::from_mapping(mapping)?, body))
    }

    /// Separate the raw YAML mapping from the body without typing it, so
    /// directory data can be merged in first
    pub fn split(content: &str) -> Result<(Mapping, &str), serde_yaml::Error> {
        let trimmed = content.trim_start_matches('\u{feff}');
        let Some(rest) = strip_fence(trimmed) else {
            return Ok((Mapping::new(), content));
        };

        let (yaml, body) = match find_closing_fence(rest) {
            Some((end, body_start)) => (&rest[..end], &rest[body_start..]),
            // No closing ---, treat as no front-matter
            None => return Ok((Mapping::new(), content)),
        };
        let body = body.trim_start_matches(['\n', '\r']);

        if yaml.trim().is_empty() {
            return Ok((Mapping::new(), body));
        }

        match serde_yaml::from_str::<Value>(yaml)? {
            Value::Mapping(map) => Ok((map, body)),
            Value::Null => Ok((Mapping::new(), body)),
            _ => Err(<serde_yaml::Error as serde::de::Error>::custom(
                "front-matter must be a mapping of keys to values",
            )),
        }
    }

    /// Type a merged front-matter mapping
    pub fn from_mapping(mapping: Mapping) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_value(Value::Mapping(mapping))
    }

    /// Parse the date string into a DateTime
    pub fn parse_date(&self) -> Option<DateTime<Local>> {
        self.date.as_deref().and_then(parse_date_string)
    }
}

/// Strip an opening `---` line, returning the text after it
fn strip_fence(content: &str) -> Option<&str> {
    let rest = content.strip_prefix("---")?;
    let line_end = rest.find('\n').unwrap_or(rest.len());
    if !rest[..line_end].trim().is_empty() {
        return None;
    }
    Some(&rest[(line_end + 1).min(rest.len())..])
}

/// Locate the closing `---` line: (end of yaml, start of body)
fn find_closing_fence(rest: &str) -> Option<(usize, usize)> {
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            return Some((offset, offset + line.len()));
        }
        offset += line.len();
    }
    None
}

/// Parse a date string in various formats
fn parse_date_string(s: &str) -> Option<DateTime<Local>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Local));
    }

    let formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
    ];
    for fmt in formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return dt.and_local_timezone(Local).earliest();
        }
    }

    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = chrono::NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0)?.and_local_timezone(Local).earliest();
        }
    }

    None
}
