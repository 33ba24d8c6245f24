use crate::error::{ProcessingError, Result};
use crate::utils::constants::{DATE_FORMAT, DEFAULT_IDENTIFIER_PREFIX, DEFAULT_IDENTIFIER_SUFFIX};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid digit regex"));

/// Fixed prefix and suffix wrapped around the variable name in a band
/// identifier, e.g. `AgERA5_Dew-Point-Temperature-2m-Mean_20200101`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierPattern {
    /// Literal text before the variable name
    pub prefix: String,
    /// Regular expression matched after the variable name
    pub suffix: String,
}

impl Default for IdentifierPattern {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_IDENTIFIER_PREFIX.to_string(),
            suffix: DEFAULT_IDENTIFIER_SUFFIX.to_string(),
        }
    }
}

impl IdentifierPattern {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    pub fn compile(&self) -> Result<IdentifierParser> {
        let pattern = format!(
            r"^{}_(?P<name>.+?)_(?:{})$",
            regex::escape(&self.prefix),
            self.suffix
        );
        Ok(IdentifierParser {
            variable: Regex::new(&pattern)?,
        })
    }
}

/// Compiled form of [`IdentifierPattern`]
#[derive(Debug, Clone)]
pub struct IdentifierParser {
    variable: Regex,
}

impl IdentifierParser {
    /// Extract the `YYYYMMDD` date, validated as a real calendar day
    pub fn date(&self, identifier: &str) -> Result<String> {
        extract_date(identifier).ok_or_else(|| {
            ProcessingError::metadata(identifier, "no valid 8-digit YYYYMMDD date found")
        })
    }

    pub fn variable_name(&self, identifier: &str) -> Result<String> {
        self.variable
            .captures(identifier)
            .and_then(|caps| caps.name("name"))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| {
                ProcessingError::metadata(
                    identifier,
                    format!("does not match pattern '{}'", self.variable.as_str()),
                )
            })
    }

    pub fn parse(&self, identifier: &str) -> Result<(String, String)> {
        Ok((self.date(identifier)?, self.variable_name(identifier)?))
    }
}

/// First 8-digit run that is a valid calendar date. Longer digit runs are
/// not split.
pub fn extract_date(text: &str) -> Option<String> {
    DIGIT_RUN
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|run| run.len() == 8)
        .find(|run| NaiveDate::parse_from_str(run, DATE_FORMAT).is_ok())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_default_identifier() {
        let parser = IdentifierPattern::default().compile().unwrap();
        let (date, name) = parser
            .parse("AgERA5_Temperature-Air-2m-Mean-24h_20200715_final-v1.1")
            .unwrap();
        assert_eq!(date, "20200715");
        assert_eq!(name, "Temperature-Air-2m-Mean-24h");
    }

    #[test]
    fn test_variable_name_with_underscores() {
        let parser = IdentifierPattern::default().compile().unwrap();
        let name = parser
            .variable_name("AgERA5_Dew_Point_Temperature_2m_Mean_20200715")
            .unwrap();
        assert_eq!(name, "Dew_Point_Temperature_2m_Mean");
    }

    #[test]
    fn test_custom_prefix_is_literal() {
        let parser = IdentifierPattern::new("era5.daily", r"\d{8}").compile().unwrap();
        assert_eq!(
            parser.variable_name("era5.daily_t2m_20210101").unwrap(),
            "t2m"
        );
        assert!(parser.variable_name("era5xdaily_t2m_20210101").is_err());
    }

    #[test]
    fn test_missing_date_fails() {
        let parser = IdentifierPattern::default().compile().unwrap();
        let err = parser.date("AgERA5_Temperature_final").unwrap_err();
        assert!(matches!(err, ProcessingError::MetadataParse { .. }));
    }

    #[test]
    fn test_pattern_mismatch_fails() {
        let parser = IdentifierPattern::default().compile().unwrap();
        let err = parser.variable_name("CHIRPS_precip_20200101").unwrap_err();
        assert!(matches!(err, ProcessingError::MetadataParse { .. }));
    }

    #[test]
    fn test_extract_date_skips_invalid_calendar_days() {
        assert_eq!(
            extract_date("x_20201345_y_20201231"),
            Some("20201231".to_string())
        );
        assert_eq!(extract_date("run_123456789"), None);
        assert_eq!(extract_date("20200229.tif"), Some("20200229".to_string()));
    }

    #[test]
    fn test_invalid_suffix_regex() {
        let pattern = IdentifierPattern::new("AgERA5", "(");
        assert!(matches!(pattern.compile(), Err(ProcessingError::Regex(_))));
    }
}
