//! htsget request description and URI construction.
//!
//! A [`RequestDescription`] is an immutable value built by the caller; turning
//! it into a URL is a pure transformation that validates the description
//! before any network call is made.

use crate::{
    Error, Result,
    types::{DataClass, Field, Format},
};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Genomic interval in protocol coordinates (0-based, half-open).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval {
    pub reference_name: String,
    pub start: Option<u64>,
    pub end: Option<u64>,
}

impl Interval {
    pub fn new(reference_name: impl Into<String>) -> Self {
        Self {
            reference_name: reference_name.into(),
            start: None,
            end: None,
        }
    }

    pub fn with_start(mut self, start: u64) -> Self {
        self.start = Some(start);
        self
    }

    pub fn with_end(mut self, end: u64) -> Self {
        self.end = Some(end);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.reference_name.is_empty() {
            return Err(Error::Configuration(
                "interval reference name must not be empty".to_string(),
            ));
        }
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if end < start {
                return Err(Error::Configuration(format!(
                    "interval end {} precedes start {}",
                    end, start
                )));
            }
        }
        Ok(())
    }
}

/// Parses `chr`, `chr:start` or `chr:start-end` in 1-based closed coordinates
/// and converts to protocol coordinates.
///
/// The text after the last `:` is read as the range, so a reference name that
/// itself contains `:` (e.g. `HLA-A*01:01`) must be written with a trailing
/// `:` to be taken whole: `HLA-A*01:01:`.
impl FromStr for Interval {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (name, range) = match s.rsplit_once(':') {
            Some((name, "")) => (name, None),
            Some((name, range)) => (name, Some(range)),
            None => (s, None),
        };

        let mut interval = Interval::new(name);
        if let Some(range) = range {
            let range = range.replace(',', "");
            let (start, end) = match range.split_once('-') {
                Some((start, end)) => (start.to_string(), Some(end.to_string())),
                None => (range, None),
            };
            let start = parse_position(&start, s)?;
            if start == 0 {
                return Err(Error::Configuration(format!(
                    "interval {} must start at position 1 or later",
                    s
                )));
            }
            if let Some(end) = end {
                let end = parse_position(&end, s)?;
                if end < start {
                    return Err(Error::Configuration(format!(
                        "interval {} ends before it starts",
                        s
                    )));
                }
                interval.end = Some(end);
            }
            interval.start = Some(start - 1);
        }

        interval.validate()?;
        Ok(interval)
    }
}

fn parse_position(value: &str, interval: &str) -> Result<u64> {
    value
        .parse()
        .map_err(|_| Error::Configuration(format!("invalid position in interval {}", interval)))
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reference_name)?;
        match (self.start, self.end) {
            (Some(start), Some(end)) => write!(f, ":{}-{}", start.saturating_add(1), end),
            (Some(start), None) => write!(f, ":{}", start.saturating_add(1)),
            (None, Some(end)) => write!(f, ":1-{}", end),
            (None, None) => Ok(()),
        }
    }
}

/// Everything needed to issue one htsget ticket request
#[derive(Debug, Clone)]
pub struct RequestDescription {
    endpoint: Url,
    id: String,
    format: Option<Format>,
    class: Option<DataClass>,
    interval: Option<Interval>,
    fields: Vec<Field>,
    tags: Vec<String>,
    notags: Vec<String>,
}

impl RequestDescription {
    pub fn new(endpoint: Url, id: impl Into<String>) -> Self {
        Self {
            endpoint,
            id: id.into(),
            format: None,
            class: None,
            interval: None,
            fields: Vec::new(),
            tags: Vec::new(),
            notags: Vec::new(),
        }
    }

    /// Build a request from an `htsget://host/path/id` URI.
    ///
    /// The last path segment is the id; the rest becomes an `https` endpoint.
    pub fn from_htsget_uri(uri: &str) -> Result<Self> {
        let parsed = Url::parse(uri)
            .map_err(|e| Error::Configuration(format!("invalid htsget uri {}: {}", uri, e)))?;
        if parsed.scheme() != "htsget" {
            return Err(Error::Configuration(format!(
                "expected htsget:// uri, got {}",
                uri
            )));
        }
        let host = parsed
            .host_str()
            .ok_or_else(|| Error::Configuration(format!("htsget uri {} has no host", uri)))?;

        let path = parsed.path().trim_matches('/');
        let (prefix, id) = match path.rsplit_once('/') {
            Some((prefix, id)) => (prefix, id),
            None => ("", path),
        };

        let authority = match parsed.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        let endpoint = Url::parse(&format!("https://{}/{}", authority, prefix))
            .map_err(|e| Error::Configuration(format!("invalid htsget uri {}: {}", uri, e)))?;

        Ok(Self::new(endpoint, id))
    }

    pub fn with_format(mut self, format: Option<Format>) -> Self {
        self.format = format;
        self
    }

    pub fn with_class(mut self, class: Option<DataClass>) -> Self {
        self.class = class;
        self
    }

    pub fn with_interval(mut self, interval: Option<Interval>) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_fields(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
        self.fields = fields.into_iter().collect();
        self
    }

    pub fn with_tags<S: Into<String>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_notags<S: Into<String>>(mut self, notags: impl IntoIterator<Item = S>) -> Self {
        self.notags = notags.into_iter().map(Into::into).collect();
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn interval(&self) -> Option<&Interval> {
        self.interval.as_ref()
    }

    /// Check the description without building a URL.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim_matches('/').is_empty() {
            return Err(Error::Configuration("id must not be empty".to_string()));
        }
        if self.endpoint.query().is_some() {
            return Err(Error::Configuration(format!(
                "endpoint {} must not carry a query string",
                self.endpoint
            )));
        }
        if self.id.trim_matches('/').split('/').any(str::is_empty) {
            return Err(Error::Configuration(format!(
                "id {} contains an empty path segment",
                self.id
            )));
        }
        if self.endpoint.cannot_be_a_base() {
            return Err(Error::Configuration(format!(
                "endpoint {} cannot be used as a base url",
                self.endpoint
            )));
        }
        if let Some(interval) = &self.interval {
            interval.validate()?;
        }
        if let Some(tag) = self.tags.iter().find(|t| self.notags.contains(t)) {
            return Err(Error::Configuration(format!(
                "tag {} is both included and excluded",
                tag
            )));
        }
        Ok(())
    }

    /// Build the ticket URL: `<endpoint>/<id>?<params>`.
    ///
    /// Empty lists emit no parameter at all; each list element becomes its own
    /// parameter occurrence, in list order.
    pub fn to_url(&self) -> Result<Url> {
        self.validate()?;

        let mut url = self.endpoint.clone();
        url.set_fragment(None);
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                Error::Configuration(format!(
                    "endpoint {} cannot be used as a base url",
                    self.endpoint
                ))
            })?;
            segments.pop_if_empty();
            for segment in self.id.trim_matches('/').split('/') {
                segments.push(segment);
            }
        }

        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(format) = self.format {
            params.push(("format", format.as_str().to_string()));
        }
        if let Some(class) = self.class {
            params.push(("class", class.as_str().to_string()));
        }
        if let Some(interval) = &self.interval {
            params.push(("referenceName", interval.reference_name.clone()));
            if let Some(start) = interval.start {
                params.push(("start", start.to_string()));
            }
            if let Some(end) = interval.end {
                params.push(("end", end.to_string()));
            }
        }
        params.extend(self.fields.iter().map(|f| ("field", f.as_str().to_string())));
        params.extend(self.tags.iter().map(|t| ("tag", t.clone())));
        params.extend(self.notags.iter().map(|t| ("notag", t.clone())));

        if !params.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in &params {
                query.append_pair(key, value);
            }
        }

        Ok(url)
    }
}
