use std::path::Path;

use thiserror::Error;

/// One candidate path and the substring expected in its response body when
/// the path is genuinely exposed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathEntry {
    pub path: String,
    pub signature: String,
}

/// Insertion-ordered mapping of URL path fragments to expected signatures.
/// Keys are unique; re-adding a path keeps its original position and replaces
/// the signature, matching the semantics of the JSON/YAML mappings it is
/// loaded from.
#[derive(Clone, Debug, Default)]
pub struct PathMap {
    entries: Vec<PathEntry>,
}

// Shipped fallback used when no dictionary file is given. Signatures are
// substrings of the canonical success response for each endpoint.
const DEFAULT_PATHS: &[(&str, &str)] = &[
    ("/actuator", "_links"),
    ("/actuator/env", "propertySources"),
    ("/actuator/health", "\"status\""),
    ("/actuator/beans", "beans"),
    ("/actuator/mappings", "handler"),
    ("/actuator/gateway/routes", "predicate"),
    ("/env", "profiles"),
    ("/jolokia/list", "jolokia"),
    ("/druid/index.html", "Druid"),
    ("/swagger-ui.html", "Swagger"),
    ("/v2/api-docs", "swagger"),
    ("/.git/config", "[core]"),
    ("/.env", "APP_"),
    ("/server-status", "Apache Server Status"),
    ("/phpinfo.php", "phpinfo()"),
];

impl PathMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a map from (path, signature) pairs, last signature wins on
    /// duplicate paths.
    pub fn from_pairs<I, P, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (P, S)>,
        P: Into<String>,
        S: Into<String>,
    {
        let mut map = Self::new();
        for (path, signature) in pairs {
            map.insert(path.into(), signature.into());
        }
        map
    }

    pub fn insert(&mut self, path: String, signature: String) {
        match self.entries.iter_mut().find(|e| e.path == path) {
            Some(existing) => existing.signature = signature,
            None => self.entries.push(PathEntry { path, signature }),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The built-in dictionary of commonly exposed sensitive endpoints.
    pub fn builtin() -> Self {
        Self::from_pairs(DEFAULT_PATHS.iter().copied())
    }

    /// Loads a dictionary file, dispatching on the file extension.
    pub fn load(path: &Path) -> Result<Self, DictionaryError> {
        let display = path.to_string_lossy().to_string();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        let contents = std::fs::read_to_string(path).map_err(|e| DictionaryError::Read {
            path: display.clone(),
            source: e,
        })?;

        match extension.as_str() {
            "json" => Self::from_json(&contents, &display),
            "yml" | "yaml" => Self::from_yaml(&contents, &display),
            _ => Err(DictionaryError::UnsupportedFormat { path: display }),
        }
    }

    fn from_json(contents: &str, path: &str) -> Result<Self, DictionaryError> {
        let value: serde_json::Value =
            serde_json::from_str(contents).map_err(|e| DictionaryError::Parse {
                path: path.to_string(),
                message: e.to_string(),
            })?;
        let object = value.as_object().ok_or_else(|| DictionaryError::NotAMapping {
            path: path.to_string(),
        })?;

        let mut map = Self::new();
        for (key, value) in object.iter() {
            let signature = value.as_str().ok_or_else(|| DictionaryError::Parse {
                path: path.to_string(),
                message: format!("signature for '{key}' must be a string"),
            })?;
            map.insert(key.clone(), signature.to_string());
        }
        Ok(map)
    }

    fn from_yaml(contents: &str, path: &str) -> Result<Self, DictionaryError> {
        let value: serde_yaml::Value =
            serde_yaml::from_str(contents).map_err(|e| DictionaryError::Parse {
                path: path.to_string(),
                message: e.to_string(),
            })?;
        let mapping = value.as_mapping().ok_or_else(|| DictionaryError::NotAMapping {
            path: path.to_string(),
        })?;

        let mut map = Self::new();
        for (key, value) in mapping.iter() {
            let key = key.as_str().ok_or_else(|| DictionaryError::Parse {
                path: path.to_string(),
                message: "path keys must be strings".to_string(),
            })?;
            let signature = value.as_str().ok_or_else(|| DictionaryError::Parse {
                path: path.to_string(),
                message: format!("signature for '{key}' must be a string"),
            })?;
            map.insert(key.to_string(), signature.to_string());
        }
        Ok(map)
    }
}

#[derive(Debug, Error)]
pub enum DictionaryError {
    #[error("failed to read dictionary '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse dictionary '{path}': {message}")]
    Parse { path: String, message: String },

    #[error("unsupported dictionary format '{path}', expected .json, .yml or .yaml")]
    UnsupportedFormat { path: String },

    #[error("dictionary '{path}' must be a mapping of path to signature")]
    NotAMapping { path: String },
}
