use std::path::Path;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use thiserror::Error;

/// Reasons a filter configuration could not be turned into a list of filters.
#[derive(Error, Debug)]
pub enum FilterConfigError {
    #[error("could not read filter config: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse filter config as YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("filter config must be a mapping of filter name to filter options")]
    NotAMapping,
    #[error("filter name {key:?} is not a string")]
    BadName {
        key: String,
    },
    #[error("filter {name} is not a mapping with a `filter` field: {source}")]
    BadEntry {
        name: String,
        source: serde_yaml::Error,
    },
    #[error("filter {name} has a `filter` that is a list or mapping, expected a single value")]
    BadExpression {
        name: String,
    },
}

/// The options for one named filter as written in the config file, for example:
///
/// ```yaml
/// dns:
///   filter: "dns"
/// nmap-scan:
///   filter: "tcp.flags.syn == 1 && tcp.window_size <= 1024"
/// ```
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct FilterEntry {
    #[serde(default)]
    pub filter: Option<Value>,
}

impl FilterEntry {
    /// The display filter as written. Unquoted numbers and booleans are taken as their text, so
    /// `filter: 80` is the expression `80`.
    pub fn expression(&self, name: &str) -> Result<Option<String>, FilterConfigError> {
        match &self.filter {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Number(num)) => Ok(Some(num.to_string())),
            Some(Value::Bool(b)) => Ok(Some(b.to_string())),
            Some(_) => Err(FilterConfigError::BadExpression { name: name.to_string() }),
        }
    }
}

/// A named display filter, the name is also the folder extracted packets are written to.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FilterSpec {
    pub name: String,
    pub expression: String,
}

impl FilterSpec {
    pub fn new<N: Into<String>, E: Into<String>>(name: N, expression: E) -> Self {
        Self {
            name: name.into(),
            expression: expression.into(),
        }
    }
}

/// All filters found in a config file, kept in the order they were written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterConfig {
    pub filters: Vec<FilterSpec>,
}

impl FilterConfig {
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, FilterConfigError> {
        tracing::trace!("reading filter config from {:?}", path.as_ref());
        let text = tokio::fs::read_to_string(path).await?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, FilterConfigError> {
        let value: Value = serde_yaml::from_str(text)?;
        let mapping = value.as_mapping().ok_or(FilterConfigError::NotAMapping)?;

        let mut filters = Vec::with_capacity(mapping.len());
        for (key, options) in mapping.iter() {
            let name = match key {
                Value::String(name) => name.clone(),
                // unquoted numbers are a valid folder name, so accept them as well
                Value::Number(num) => num.to_string(),
                other => return Err(FilterConfigError::BadName { key: format!("{other:?}") }),
            };
            let entry: Option<FilterEntry> = serde_yaml::from_value(options.clone())
                .map_err(|source| FilterConfigError::BadEntry { name: name.clone(), source })?;
            let expression = match entry.unwrap_or_default().expression(&name)? {
                Some(expression) => expression,
                None => {
                    tracing::warn!("filter {name} has no `filter` field, an empty filter will be used");
                    String::new()
                }
            };
            filters.push(FilterSpec { name, expression });
        }
        Ok(Self { filters })
    }

    /// Narrow the filters down to the allowlist, if one was given. The allowlist order wins and
    /// names that are not in the config are dropped.
    pub fn select(&self, allowlist: Option<&[String]>) -> Vec<FilterSpec> {
        let Some(allowlist) = allowlist else {
            return self.filters.clone();
        };
        let mut selected: Vec<FilterSpec> = Vec::with_capacity(allowlist.len());
        for name in allowlist {
            if selected.iter().any(|f| f.name.eq(name)) {
                continue;
            }
            match self.filters.iter().find(|f| f.name.eq(name)) {
                Some(filter) => selected.push(filter.clone()),
                None => tracing::warn!("filter {name} is not in the filter config, ignoring"),
            }
        }
        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
first:
  filter: value_1
second:
  filter: value_2
third:
  filter: value_3
"#;

    fn names(filters: &[FilterSpec]) -> Vec<&str> {
        filters.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn test_read_filters() {
        let config = FilterConfig::from_yaml_str(CONFIG).unwrap();
        assert_eq!(config.filters.len(), 3);
        assert_eq!(names(&config.filters), vec!["first", "second", "third"]);
        assert_eq!(config.filters[1], FilterSpec::new("second", "value_2"));
    }

    #[test]
    fn test_read_filters_override() {
        let config = FilterConfig::from_yaml_str(CONFIG).unwrap();
        let allow = vec!["third".to_string(), "first".to_string()];
        let selected = config.select(Some(allow.as_slice()));
        assert_eq!(names(&selected), vec!["third", "first"]);
    }

    #[test]
    fn test_read_filters_invalid_override() {
        let config = FilterConfig::from_yaml_str(CONFIG).unwrap();
        let allow = vec!["first".to_string(), "missing".to_string()];
        let selected = config.select(Some(allow.as_slice()));
        assert_eq!(names(&selected), vec!["first"]);

        let allow = vec!["first".to_string(), "first".to_string()];
        assert_eq!(config.select(Some(allow.as_slice())).len(), 1);

        let allow: Vec<String> = Vec::new();
        assert!(config.select(Some(allow.as_slice())).is_empty());
    }

    #[test]
    fn test_missing_filter_field_is_empty() {
        let config = FilterConfig::from_yaml_str("dns:\n  filter: dns\nempty:\n  other: 1\nbare:\n").unwrap();
        assert_eq!(config.filters[0], FilterSpec::new("dns", "dns"));
        assert_eq!(config.filters[1], FilterSpec::new("empty", ""));
        assert_eq!(config.filters[2], FilterSpec::new("bare", ""));
    }

    #[test]
    fn test_scalar_filter_is_stringified() {
        let config = FilterConfig::from_yaml_str("port80:\n  filter: 80\nflag:\n  filter: true\n").unwrap();
        assert_eq!(config.filters[0], FilterSpec::new("port80", "80"));
        assert_eq!(config.filters[1], FilterSpec::new("flag", "true"));

        assert!(matches!(
            FilterConfig::from_yaml_str("dns:\n  filter: [dns, udp]\n"),
            Err(FilterConfigError::BadExpression { .. })
        ));
    }

    #[test]
    fn test_malformed_config() {
        assert!(matches!(
            FilterConfig::from_yaml_str("- just\n- a list\n"),
            Err(FilterConfigError::NotAMapping)
        ));
        assert!(matches!(
            FilterConfig::from_yaml_str("dns: \"not a mapping\"\n"),
            Err(FilterConfigError::BadEntry { .. })
        ));
        assert!(FilterConfig::from_yaml_str("dns: [unclosed\n").is_err());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("packhunt.conf");
        tokio::fs::write(&path, CONFIG).await.unwrap();
        let config = FilterConfig::load_from_file(&path).await.unwrap();
        assert_eq!(config.filters.len(), 3);

        assert!(FilterConfig::load_from_file(dir.path().join("missing.conf")).await.is_err());
    }
}
