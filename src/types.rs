use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1, take_while_m_n},
    character::complete::char,
    combinator::{all_consuming, map_res, opt, recognize},
    multi::separated_list0,
    sequence::{delimited, preceded, separated_pair, tuple},
    IResult,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{ReportError, Result};

/// Database assumed when a reference carries only an item id.
pub const DEFAULT_DATABASE: &str = "master";

/// Content item identifier: a GUID rendered as `{XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(uuid::Uuid);

impl ItemId {
    pub fn new() -> Self {
        ItemId(uuid::Uuid::new_v4())
    }

    pub fn from_uuid(uuid: uuid::Uuid) -> Self {
        ItemId(uuid)
    }

    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for ItemId {
    fn default() -> Self {
        ItemId(uuid::Uuid::nil())
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.0.hyphenated().to_string().to_uppercase())
    }
}

impl FromStr for ItemId {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        all_consuming(item_id)(s.trim())
            .map(|(_, id)| id)
            .map_err(|_| ReportError::InvalidReference(format!("not an item id: '{}'", s)))
    }
}

impl Serialize for ItemId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ItemId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Versioned, language-qualified reference to a content item.
///
/// Textual form is `sitecore://{database}/{ID}?lang={language}&ver={version}`.
/// The scheme/database prefix and the query are optional when parsing, so a
/// bare `{ID}` is accepted as well.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemUri {
    pub database: String,
    pub id: ItemId,
    pub language: Option<String>,
    pub version: Option<u32>,
}

impl ItemUri {
    pub fn new(id: ItemId) -> Self {
        Self {
            database: DEFAULT_DATABASE.to_string(),
            id,
            language: None,
            version: None,
        }
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = Some(language.to_string());
        self
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }

    /// Parse a caller-supplied reference. Malformed input is an `InvalidReference`.
    pub fn parse(input: &str) -> Result<Self> {
        let (_, (database, id, params)) = all_consuming(data_uri)(input.trim()).map_err(|_| {
            ReportError::InvalidReference(format!("malformed item reference: '{}'", input))
        })?;

        let mut uri = ItemUri::new(id);
        if let Some(db) = database {
            uri.database = db.to_string();
        }
        for (key, value) in params {
            match key {
                "lang" if !value.is_empty() => uri.language = Some(value.to_string()),
                "ver" if !value.is_empty() => {
                    let version = value.parse::<u32>().map_err(|_| {
                        ReportError::InvalidReference(format!(
                            "malformed version '{}' in item reference '{}'",
                            value, input
                        ))
                    })?;
                    uri.version = Some(version);
                }
                _ => {}
            }
        }
        Ok(uri)
    }

    /// Does `other` fall under this reference when used as a filter?
    /// Ids must agree; language only constrains when this reference carries one.
    pub fn matches(&self, other: &ItemUri) -> bool {
        if self.id != other.id {
            return false;
        }
        match (&self.language, &other.language) {
            (Some(want), Some(have)) => want.eq_ignore_ascii_case(have),
            (Some(_), None) => false,
            (None, _) => true,
        }
    }
}

impl fmt::Display for ItemUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sitecore://{}/{}", self.database, self.id)?;
        let mut sep = '?';
        if let Some(ref lang) = self.language {
            write!(f, "{}lang={}", sep, lang)?;
            sep = '&';
        }
        if let Some(ver) = self.version {
            write!(f, "{}ver={}", sep, ver)?;
        }
        Ok(())
    }
}

impl FromStr for ItemUri {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        ItemUri::parse(s)
    }
}

impl Serialize for ItemUri {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ItemUri {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ItemUri::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// ── Parsers ─────────────────────────────────────────────────────────

fn hex_digits(n: usize) -> impl FnMut(&str) -> IResult<&str, &str> {
    move |input| take_while_m_n(n, n, |c: char| c.is_ascii_hexdigit())(input)
}

fn guid_body(input: &str) -> IResult<&str, ItemId> {
    map_res(
        recognize(tuple((
            hex_digits(8),
            char('-'),
            hex_digits(4),
            char('-'),
            hex_digits(4),
            char('-'),
            hex_digits(4),
            char('-'),
            hex_digits(12),
        ))),
        |s: &str| uuid::Uuid::parse_str(s).map(ItemId),
    )(input)
}

fn item_id(input: &str) -> IResult<&str, ItemId> {
    alt((delimited(char('{'), guid_body, char('}')), guid_body))(input)
}

fn database_name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-')(input)
}

fn query_param(input: &str) -> IResult<&str, (&str, &str)> {
    separated_pair(
        take_while1(|c: char| c != '=' && c != '&'),
        char('='),
        take_while(|c: char| c != '&'),
    )(input)
}

type RawUri<'a> = (Option<&'a str>, ItemId, Vec<(&'a str, &'a str)>);

fn data_uri(input: &str) -> IResult<&str, RawUri<'_>> {
    let (input, database) =
        opt(delimited(tag("sitecore://"), database_name, char('/')))(input)?;
    let (input, id) = item_id(input)?;
    let (input, params) = opt(preceded(char('?'), separated_list0(char('&'), query_param)))(input)?;
    Ok((input, (database, id, params.unwrap_or_default())))
}
