//! Address types.

use serde::{Deserialize, Serialize};

/// A postal address as held by the identity provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Address {
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    /// Street, building, unit.
    pub line: String,
    pub city: String,
    pub province: String,
    pub postal_code: String,
    pub country: String,
}

impl Address {
    /// Create a new address.
    pub fn new(
        line: impl Into<String>,
        city: impl Into<String>,
        province: impl Into<String>,
        postal_code: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            line: line.into(),
            city: city.into(),
            province: province.into(),
            postal_code: postal_code.into(),
            country: country.into(),
            ..Self::default()
        }
    }

    /// Set the recipient name.
    pub fn with_name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = first.into();
        self.last_name = last.into();
        self
    }

    /// Get full name.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// "line, city, province, postal_code, country", skipping blank parts.
    pub fn one_line(&self) -> String {
        [
            &self.line,
            &self.city,
            &self.province,
            &self.postal_code,
            &self.country,
        ]
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }

    /// An address is deliverable once line, city and country are present.
    pub fn is_complete(&self) -> bool {
        !self.line.trim().is_empty()
            && !self.city.trim().is_empty()
            && !self.country.trim().is_empty()
    }
}
