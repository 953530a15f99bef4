//! Universe configuration: the instruments a scoring request covers.
//!
//! Stored as TOML, one `[[instruments]]` table per instrument. Sector and size
//! bucket are optional; scoring fills in `Other` and a volume-derived bucket
//! when they are missing. Codes are normalized (upper-cased, exchange suffix
//! stripped) and deduplicated on construction, first occurrence winning.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::{read_file, ConfigError};
use crate::domain::SizeBucket;

pub const DEFAULT_SECTOR: &str = "Other";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub code: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bucket: Option<SizeBucket>,
}

impl Instrument {
    pub fn new(code: &str, name: &str) -> Self {
        Self {
            code: normalize_code(code),
            name: name.to_string(),
            sector: None,
            size_bucket: None,
        }
    }

    pub fn with_sector(mut self, sector: &str) -> Self {
        self.sector = Some(sector.to_string());
        self
    }

    pub fn with_bucket(mut self, bucket: SizeBucket) -> Self {
        self.size_bucket = Some(bucket);
        self
    }

    pub fn sector_or_default(&self) -> &str {
        self.sector.as_deref().unwrap_or(DEFAULT_SECTOR)
    }
}

/// Upper-case and strip a `.KS` / `.KQ` exchange suffix.
pub fn normalize_code(raw: &str) -> String {
    let upper = raw.trim().to_ascii_uppercase();
    upper
        .strip_suffix(".KS")
        .or_else(|| upper.strip_suffix(".KQ"))
        .unwrap_or(upper.as_str())
        .to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Universe {
    instruments: Vec<Instrument>,
}

impl Universe {
    pub fn new(instruments: impl IntoIterator<Item = Instrument>) -> Self {
        let mut seen = HashSet::new();
        let instruments = instruments
            .into_iter()
            .map(|mut i| {
                i.code = normalize_code(&i.code);
                i
            })
            .filter(|i| !i.code.is_empty() && seen.insert(i.code.clone()))
            .collect();
        Self { instruments }
    }

    /// Load a universe from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Self::from_toml(&read_file(path)?)
    }

    /// Parse a universe from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let parsed: Universe = toml::from_str(content)?;
        Ok(Self::new(parsed.instruments))
    }

    /// Serialize the universe to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    pub fn get(&self, code: &str) -> Option<&Instrument> {
        let code = normalize_code(code);
        self.instruments.iter().find(|i| i.code == code)
    }

    pub fn codes(&self) -> Vec<&str> {
        self.instruments.iter().map(|i| i.code.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    /// Append caller-supplied codes that are not already present. Unknown
    /// codes are named after themselves.
    pub fn with_custom<S: AsRef<str>>(mut self, codes: &[S]) -> Self {
        for raw in codes {
            let code = normalize_code(raw.as_ref());
            if code.is_empty() || self.get(&code).is_some() {
                continue;
            }
            self.instruments.push(Instrument::new(&code, &code));
        }
        self
    }

    /// Keep only the listed codes. An empty intersection keeps everything.
    pub fn restricted_to<S: AsRef<str>>(self, codes: &[S]) -> Self {
        let wanted: HashSet<String> = codes.iter().map(|c| normalize_code(c.as_ref())).collect();
        let kept: Vec<Instrument> = self
            .instruments
            .iter()
            .filter(|i| wanted.contains(&i.code))
            .cloned()
            .collect();
        if kept.is_empty() {
            self
        } else {
            Self { instruments: kept }
        }
    }

    /// Order-independent content hash of the instrument codes.
    pub fn fingerprint(&self) -> String {
        let mut codes = self.codes();
        codes.sort_unstable();
        blake3::hash(codes.join(",").as_bytes()).to_hex().to_string()
    }

    /// Default large-cap KRX universe.
    pub fn default_krx() -> Self {
        use SizeBucket::{Large, Mega, Mid};
        let rows: [(&str, &str, &str, SizeBucket); 24] = [
            ("005930", "Samsung Electronics", "Semiconductor", Mega),
            ("000660", "SK hynix", "Semiconductor", Mega),
            ("373220", "LG Energy Solution", "Battery", Mega),
            ("207940", "Samsung Biologics", "Bio", Mega),
            ("005380", "Hyundai Motor", "Automotive", Mega),
            ("000270", "Kia", "Automotive", Mega),
            ("068270", "Celltrion", "Bio", Large),
            ("005490", "POSCO Holdings", "Materials", Large),
            ("035420", "NAVER", "Internet", Mega),
            ("051910", "LG Chem", "Chemical", Mega),
            ("035720", "Kakao", "Internet", Large),
            ("105560", "KB Financial", "Financial", Large),
            ("012330", "Hyundai Mobis", "Automotive", Large),
            ("066570", "LG Electronics", "Electronics", Large),
            ("006400", "Samsung SDI", "Battery", Large),
            ("096770", "SK Innovation", "Energy", Large),
            ("055550", "Shinhan Financial", "Financial", Large),
            ("017670", "SK Telecom", "Telecom", Large),
            ("015760", "KEPCO", "Utilities", Large),
            ("011200", "HMM", "Shipping", Mid),
            ("267260", "HD Hyundai Electric", "Industrial", Mid),
            ("003490", "Korean Air", "Transport", Large),
            ("036570", "NCSoft", "Entertainment", Mid),
            ("079550", "LIG Nex1", "Defense", Mid),
        ];
        Self::new(
            rows.iter()
                .map(|(code, name, sector, bucket)| {
                    Instrument::new(code, name).with_sector(sector).with_bucket(*bucket)
                }),
        )
    }
}
