use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Data formats an htsget server may return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Bam,
    Cram,
    Vcf,
    Bcf,
    // Extensions beyond htsget 1.3
    Fasta,
    Fastq,
}

impl Format {
    /// Value used for the `format` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Bam => "BAM",
            Format::Cram => "CRAM",
            Format::Vcf => "VCF",
            Format::Bcf => "BCF",
            Format::Fasta => "FASTA",
            Format::Fastq => "FASTQ",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BAM" => Ok(Format::Bam),
            "CRAM" => Ok(Format::Cram),
            "VCF" => Ok(Format::Vcf),
            "BCF" => Ok(Format::Bcf),
            "FASTA" => Ok(Format::Fasta),
            "FASTQ" => Ok(Format::Fastq),
            _ => Err(format!("unknown format: {}", s)),
        }
    }
}

/// Data class - header only or full data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataClass {
    #[default]
    Body,
    Header,
}

impl DataClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataClass::Body => "body",
            DataClass::Header => "header",
        }
    }
}

impl FromStr for DataClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "body" => Ok(DataClass::Body),
            "header" => Ok(DataClass::Header),
            _ => Err(format!("unknown data class: {}", s)),
        }
    }
}

/// Read fields that may be selected with the `fields` parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Qname,
    Flag,
    Rname,
    Pos,
    Mapq,
    Cigar,
    Rnext,
    Pnext,
    Tlen,
    Seq,
    Qual,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Qname => "QNAME",
            Field::Flag => "FLAG",
            Field::Rname => "RNAME",
            Field::Pos => "POS",
            Field::Mapq => "MAPQ",
            Field::Cigar => "CIGAR",
            Field::Rnext => "RNEXT",
            Field::Pnext => "PNEXT",
            Field::Tlen => "TLEN",
            Field::Seq => "SEQ",
            Field::Qual => "QUAL",
        }
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "QNAME" => Ok(Field::Qname),
            "FLAG" => Ok(Field::Flag),
            "RNAME" => Ok(Field::Rname),
            "POS" => Ok(Field::Pos),
            "MAPQ" => Ok(Field::Mapq),
            "CIGAR" => Ok(Field::Cigar),
            "RNEXT" => Ok(Field::Rnext),
            "PNEXT" => Ok(Field::Pnext),
            "TLEN" => Ok(Field::Tlen),
            "SEQ" => Ok(Field::Seq),
            "QUAL" => Ok(Field::Qual),
            _ => Err(format!("unknown field: {}", s)),
        }
    }
}

/// Successful ticket body, wrapped under the `htsget` root key.
///
/// Keys are matched after lowercasing, so field names here are lowercase.
#[derive(Debug, Deserialize)]
pub struct TicketEnvelope {
    pub htsget: TicketBody,
}

#[derive(Debug, Deserialize)]
pub struct TicketBody {
    #[serde(default)]
    pub format: Option<String>,
    #[serde(alias = "blocks")]
    pub urls: Vec<BlockEntry>,
    #[serde(default)]
    pub md5: Option<String>,
}

/// One manifest entry: either a URL (possibly a `data:` URI) or inline base64 data
#[derive(Debug, Deserialize)]
pub struct BlockEntry {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub class: Option<String>,
}

/// Error body returned with 4xx responses
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub htsget: ErrorBody,
}
