use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use crate::application::errors::ConfigError;

static STEAMID64: Lazy<Regex> = Lazy::new(|| Regex::new(r"^765\d{14}$").expect("valid regex"));

/// 64-bit Steam account identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SteamId(u64);

impl SteamId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn is_valid(input: &str) -> bool {
        STEAMID64.is_match(input.trim())
    }
}

impl FromStr for SteamId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if !Self::is_valid(s) {
            return Err(ConfigError::InvalidValue(format!("not a SteamID64: {}", s)));
        }
        s.parse::<u64>()
            .map(SteamId)
            .map_err(|e| ConfigError::InvalidValue(format!("not a SteamID64: {} ({})", s, e)))
    }
}

impl TryFrom<String> for SteamId {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SteamId> for String {
    fn from(id: SteamId) -> Self {
        id.0.to_string()
    }
}

impl fmt::Display for SteamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
