use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{VaultError, VaultResult};

/// Secret category. Serialized with the display names used in backup files;
/// unrecognized names read back as `Other`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Seed")]
    Seed,
    #[serde(rename = "Private Key")]
    PrivateKey,
    #[default]
    #[serde(rename = "Other", other)]
    Other,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Seed, Category::PrivateKey, Category::Other];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Seed => "Seed",
            Category::PrivateKey => "Private Key",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "seed" => Ok(Category::Seed),
            "privatekey" => Ok(Category::PrivateKey),
            "other" => Ok(Category::Other),
            _ => Err(VaultError::validation(format!(
                "unknown category '{s}' (expected Seed, Private Key or Other)"
            ))),
        }
    }
}

/// A stored secret. `data` is an encoded envelope; plaintext never lives here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretRecord {
    /// Store-assigned identifier, preserved across export/import
    pub id: u64,
    pub category: Category,
    pub label: String,
    pub tag: String,
    /// Envelope blob (base64url)
    pub data: String,
    /// Unix timestamp of creation in this store
    pub created_at: u64,
}

/// Caller input for a new secret, before encryption.
#[derive(Debug)]
pub struct NewSecret {
    pub category: Category,
    pub label: String,
    pub tag: String,
    pub content: SecretString,
}

impl NewSecret {
    pub fn new(
        category: Category,
        label: impl Into<String>,
        tag: impl Into<String>,
        content: SecretString,
    ) -> Self {
        Self {
            category,
            label: label.into(),
            tag: tag.into(),
            content,
        }
    }

    /// Label and content must be non-blank; tag may be empty.
    pub fn validate(&self) -> VaultResult<()> {
        if self.label.trim().is_empty() {
            return Err(VaultError::validation("label is required"));
        }
        if self.content.expose_secret().trim().is_empty() {
            return Err(VaultError::validation("secret content is required"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_serde_names() {
        let json = serde_json::to_string(&Category::ALL).unwrap();
        assert_eq!(json, r#"["Seed","Private Key","Other"]"#);

        let parsed: Vec<Category> =
            serde_json::from_str(r#"["Seed","Private Key","Other","Mnemonic"]"#).unwrap();
        assert_eq!(
            parsed,
            vec![Category::Seed, Category::PrivateKey, Category::Other, Category::Other]
        );
    }

    #[test]
    fn test_category_from_str() {
        assert_eq!("seed".parse::<Category>().unwrap(), Category::Seed);
        assert_eq!("Private Key".parse::<Category>().unwrap(), Category::PrivateKey);
        assert_eq!("private-key".parse::<Category>().unwrap(), Category::PrivateKey);
        assert_eq!("OTHER".parse::<Category>().unwrap(), Category::Other);
        assert!("wallet".parse::<Category>().is_err());
    }

    #[test]
    fn test_new_secret_validation() {
        let ok = NewSecret::new(Category::Seed, "main", "", SecretString::from("words"));
        assert!(ok.validate().is_ok());

        let no_label = NewSecret::new(Category::Seed, "  ", "t", SecretString::from("words"));
        assert!(matches!(no_label.validate(), Err(VaultError::Validation(_))));

        let no_content = NewSecret::new(Category::Seed, "main", "t", SecretString::from(" \n"));
        assert!(matches!(no_content.validate(), Err(VaultError::Validation(_))));
    }
}
