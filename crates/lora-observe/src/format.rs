use std::{fmt, str::FromStr};

use crate::error::LoggerError;

/// Output encoding selected by `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoggerFormat {
    #[default]
    Text,
    Json,
    Journald,
}

impl LoggerFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoggerFormat::Text => "text",
            LoggerFormat::Json => "json",
            LoggerFormat::Journald => "journald",
        }
    }
}

impl fmt::Display for LoggerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoggerFormat {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "" => Ok(LoggerFormat::Text),
            "json" => Ok(LoggerFormat::Json),
            "journald" | "journal" => {
                #[cfg(all(target_os = "linux", feature = "journald"))]
                {
                    Ok(LoggerFormat::Journald)
                }

                #[cfg(not(all(target_os = "linux", feature = "journald")))]
                {
                    Err(LoggerError::JournaldNotSupported)
                }
            }
            _ => Err(LoggerError::InvalidFormat(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!(" JSON ".parse::<LoggerFormat>().unwrap(), LoggerFormat::Json);
        assert_eq!("Text".parse::<LoggerFormat>().unwrap(), LoggerFormat::Text);
        assert_eq!("".parse::<LoggerFormat>().unwrap(), LoggerFormat::Text);
    }

    #[test]
    fn rejects_unknown_format() {
        let err = "xml".parse::<LoggerFormat>().unwrap_err();
        assert!(matches!(err, LoggerError::InvalidFormat(ref s) if s == "xml"));
    }

    #[cfg(not(feature = "journald"))]
    #[test]
    fn journald_requires_feature() {
        assert!(matches!(
            "journald".parse::<LoggerFormat>(),
            Err(LoggerError::JournaldNotSupported)
        ));
    }
}
