use std::time::Duration;

use anyhow::Context;

pub const DEFAULT_API_BASE: &str = "https://api.airtable.com/v0";
pub const DEFAULT_COMPANY_TABLE: &str = "Companies";
pub const DEFAULT_MAP_TABLE: &str = "Talent Flow";
const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone)]
pub struct AirtableConfig {
    pub api_key: String,
    pub base_id: String,
    pub company_table: String,
    pub map_table: String,
    pub api_base: String,
    pub page_size: usize,
    pub timeout: Duration,
}

impl AirtableConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .with_context(|| format!("{key} must be set to read from Airtable"))
        };

        Ok(Self {
            api_key: required("AIRTABLE_API_KEY")?,
            base_id: required("AIRTABLE_BASE_ID")?,
            company_table: lookup("AIRTABLE_TABLE")
                .unwrap_or_else(|| DEFAULT_COMPANY_TABLE.to_string()),
            map_table: lookup("AIRTABLE_MAP_TABLE")
                .unwrap_or_else(|| DEFAULT_MAP_TABLE.to_string()),
            api_base: lookup("AIRTABLE_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            page_size: lookup("AIRTABLE_PAGE_SIZE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(MAX_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
            timeout: Duration::from_secs(
                lookup("AIRTABLE_TIMEOUT_SECS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(30),
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn applies_defaults() {
        let config = AirtableConfig::from_lookup(lookup(&[
            ("AIRTABLE_API_KEY", "key"),
            ("AIRTABLE_BASE_ID", "app1"),
        ]))
        .unwrap();
        assert_eq!(config.company_table, "Companies");
        assert_eq!(config.map_table, "Talent Flow");
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.page_size, 100);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn missing_key_names_the_variable() {
        let err = AirtableConfig::from_lookup(lookup(&[("AIRTABLE_BASE_ID", "app1")]))
            .unwrap_err();
        assert!(err.to_string().contains("AIRTABLE_API_KEY"));
    }

    #[test]
    fn page_size_is_clamped() {
        let config = AirtableConfig::from_lookup(lookup(&[
            ("AIRTABLE_API_KEY", "key"),
            ("AIRTABLE_BASE_ID", "app1"),
            ("AIRTABLE_PAGE_SIZE", "500"),
        ]))
        .unwrap();
        assert_eq!(config.page_size, 100);
    }
}
