use std::str::FromStr;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, Utc};
use url::Url;

pub const DEFAULT_FROM: &str = "2000-01-01";
pub const DEFAULT_METADATA_PREFIX: &str = "oai_dc";

const DAY_FORMAT: &str = "%Y-%m-%d";
const SECONDS_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, Clone)]
pub struct OaiConfig {
    pub endpoint: Url,
    pub verb: Verb,
    pub parameters: HarvestParameters,
    pub resume_style: ResumeStyle,
    pub timeout: Option<Duration>,
    pub verbose: bool,
}

/// Selective harvesting arguments sent with the initial request only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestParameters {
    pub from: Option<String>,
    pub until: Option<String>,
    pub metadata_prefix: Option<String>,
    pub set: Option<String>,
}

impl HarvestParameters {
    /// Query pairs for the non-empty parameters, keyed by their OAI-PMH names.
    pub fn pairs(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("from", &self.from),
            ("until", &self.until),
            ("metadataPrefix", &self.metadata_prefix),
            ("set", &self.set),
        ]
        .into_iter()
        .filter_map(|(key, value)| match value.as_deref() {
            Some(value) if !value.is_empty() => Some((key, value)),
            _ => None,
        })
    }
}

/// List verbs that support resumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Verb {
    #[value(name = "ListRecords")]
    ListRecords,
    #[value(name = "ListIdentifiers")]
    ListIdentifiers,
    #[value(name = "ListSets")]
    ListSets,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::ListRecords => "ListRecords",
            Verb::ListIdentifiers => "ListIdentifiers",
            Verb::ListSets => "ListSets",
        }
    }
}

impl std::fmt::Display for Verb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which arguments accompany `resumptionToken` on continuation requests.
///
/// OAI-PMH 2.0 requires `verb` on every request, but some providers reject
/// anything besides the token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResumeStyle {
    #[default]
    WithVerb,
    TokenOnly,
}

/// Lower bound of the harvest window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FromDate {
    Fixed(String),
    Unbounded,
}

impl FromDate {
    pub fn resolve(&self) -> Option<String> {
        match self {
            FromDate::Fixed(date) => Some(date.clone()),
            FromDate::Unbounded => None,
        }
    }
}

impl FromStr for FromDate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" | "" => Ok(FromDate::Unbounded),
            other => parse_datestamp(other).map(FromDate::Fixed),
        }
    }
}

/// Upper bound of the harvest window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UntilDate {
    /// Current UTC date, resolved when parameters are built.
    Today,
    Fixed(String),
    Unbounded,
}

impl UntilDate {
    pub fn resolve(&self) -> Option<String> {
        match self {
            UntilDate::Today => Some(Utc::now().date_naive().format(DAY_FORMAT).to_string()),
            UntilDate::Fixed(date) => Some(date.clone()),
            UntilDate::Unbounded => None,
        }
    }
}

impl FromStr for UntilDate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "today" => Ok(UntilDate::Today),
            "none" | "" => Ok(UntilDate::Unbounded),
            other => parse_datestamp(other).map(UntilDate::Fixed),
        }
    }
}

/// Accept a datestamp at either OAI-PMH granularity.
pub fn parse_datestamp(value: &str) -> Result<String, String> {
    let day = NaiveDate::parse_from_str(value, DAY_FORMAT).is_ok();
    if day || NaiveDateTime::parse_from_str(value, SECONDS_FORMAT).is_ok() {
        Ok(value.to_string())
    } else {
        Err(format!(
            "'{value}' is not a datestamp (expected YYYY-MM-DD or YYYY-MM-DDThh:mm:ssZ)"
        ))
    }
}
