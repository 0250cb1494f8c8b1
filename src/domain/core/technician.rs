use std::{fmt, str::FromStr};

use derive_more::{Display, Error};
use serde_with::{DeserializeFromStr, SerializeDisplay};

/// 作業員ID (メールアドレス形式)
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, SerializeDisplay, DeserializeFromStr)]
pub struct TechnicianId(String);

impl TechnicianId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(value: &str) -> Result<(), TechnicianIdError> {
        if value.is_empty() {
            return Err(TechnicianIdError::Empty);
        }
        if value.chars().any(|c| c.is_whitespace() || c == '"' || c == '\\') {
            return Err(TechnicianIdError::InvalidCharacter);
        }
        match value.split_once('@') {
            Some((local, domain))
                if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
            {
                Ok(())
            }
            _ => Err(TechnicianIdError::NotEmailLike),
        }
    }
}

impl fmt::Display for TechnicianId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TechnicianId {
    type Err = TechnicianIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::validate(s)?;
        Ok(Self(s.to_owned()))
    }
}

/// 作業員IDのエラー
#[derive(Error, Display, Debug, PartialEq, Eq)]
pub enum TechnicianIdError {
    #[display(fmt = "Technician id is empty")]
    Empty,
    #[display(fmt = "Technician id contains whitespace, quotes or backslashes")]
    InvalidCharacter,
    #[display(fmt = "Technician id must look like an email address")]
    NotEmailLike,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let id: TechnicianId = "tech@x.com".parse().unwrap();
        assert_eq!(id.as_str(), "tech@x.com");
        assert_eq!(id.to_string(), "tech@x.com");
    }

    #[test]
    fn test_parse_invalid() {
        assert_eq!("".parse::<TechnicianId>(), Err(TechnicianIdError::Empty));
        assert_eq!(
            "tech @x.com".parse::<TechnicianId>(),
            Err(TechnicianIdError::InvalidCharacter)
        );
        assert_eq!(
            "te\"ch@x.com".parse::<TechnicianId>(),
            Err(TechnicianIdError::InvalidCharacter)
        );
        assert_eq!(
            "a@x.com\\".parse::<TechnicianId>(),
            Err(TechnicianIdError::InvalidCharacter)
        );
        assert_eq!(
            "tech".parse::<TechnicianId>(),
            Err(TechnicianIdError::NotEmailLike)
        );
        assert_eq!(
            "@x.com".parse::<TechnicianId>(),
            Err(TechnicianIdError::NotEmailLike)
        );
        assert_eq!(
            "a@b@c".parse::<TechnicianId>(),
            Err(TechnicianIdError::NotEmailLike)
        );
    }

    #[test]
    fn test_deserialize_validates() {
        assert!(serde_json::from_str::<TechnicianId>("\"tech@x.com\"").is_ok());
        assert!(serde_json::from_str::<TechnicianId>("\"nobody\"").is_err());
    }
}
