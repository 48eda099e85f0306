use crate::{
    Interval, RequestDescription,
    types::{DataClass, Field, Format},
};
use clap::Parser;
use std::path::PathBuf;
use url::Url;

#[derive(Debug, Clone, Parser)]
#[command(name = "htsgetr-reader")]
#[command(about = "Download a file using htsget")]
pub struct Config {
    /// URL of htsget endpoint (e.g., https://example.com/reads)
    #[arg(long, env = "HTSGET_URL")]
    pub url: Url,

    /// ID of record to request
    #[arg(long, env = "HTSGET_ID")]
    pub id: String,

    /// Format to request record data in
    #[arg(long)]
    pub format: Option<Format>,

    /// Class of data to request (header or body)
    #[arg(long = "class")]
    pub data_class: Option<DataClass>,

    /// Interval to request, e.g. chr1:1000-2000 (1-based, inclusive)
    #[arg(short = 'L', long)]
    pub interval: Option<Interval>,

    /// A field to include, default: all
    #[arg(long = "field")]
    pub fields: Vec<Field>,

    /// A tag which should be included
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// A tag which should be excluded
    #[arg(long = "notag")]
    pub notags: Vec<String>,

    /// Simultaneous block downloads; values above 1 fetch blocks in parallel
    #[arg(
        long,
        env = "HTSGET_READER_THREADS",
        default_value = "1",
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub reader_threads: u16,

    /// Digest the assembled file and compare it with the md5 the server reported
    #[arg(long)]
    pub check_md5: bool,

    /// Output file
    #[arg(short = 'O', long)]
    pub output: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

impl Config {
    pub fn request(&self) -> RequestDescription {
        RequestDescription::new(self.url.clone(), self.id.clone())
            .with_format(self.format)
            .with_class(self.data_class)
            .with_interval(self.interval.clone())
            .with_fields(self.fields.iter().copied())
            .with_tags(self.tags.iter().cloned())
            .with_notags(self.notags.iter().cloned())
    }

    pub fn is_parallel(&self) -> bool {
        self.reader_threads > 1
    }
}
