//! Authoritative display names from an exchange listing CSV.
//!
//! The file needs a header row with a code column (`Code`, `code`, `Symbol`)
//! and a name column (`Name`, `name`). Other columns are ignored. A registry
//! that cannot be loaded degrades to the universe's own names.

use rsrank_core::ranking::NameLookup;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

const CODE_HEADERS: [&str; 3] = ["code", "symbol", "ticker"];
const NAME_HEADERS: [&str; 2] = ["name", "korean_name"];

#[derive(Debug, Clone, Default)]
pub struct NameRegistry {
    names: HashMap<String, String>,
}

impl NameRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, csv::Error> {
        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers = rdr.headers()?.clone();
        let find = |candidates: &[&str]| {
            headers
                .iter()
                .position(|h| candidates.iter().any(|c| h.trim().eq_ignore_ascii_case(c)))
        };
        let (Some(code_col), Some(name_col)) = (find(&CODE_HEADERS), find(&NAME_HEADERS)) else {
            return Ok(Self::empty());
        };

        let mut names = HashMap::new();
        for record in rdr.records() {
            let record = record?;
            let (Some(code), Some(name)) = (record.get(code_col), record.get(name_col)) else {
                continue;
            };
            let (code, name) = (code.trim(), name.trim());
            if !code.is_empty() && !name.is_empty() {
                names.entry(code.to_string()).or_insert_with(|| name.to_string());
            }
        }
        Ok(Self { names })
    }

    /// Load from `path`, falling back to an empty registry with a warning.
    pub fn load_or_empty(path: &Path) -> Self {
        let loaded = std::fs::File::open(path)
            .map_err(csv::Error::from)
            .and_then(Self::from_reader);
        match loaded {
            Ok(registry) => {
                info!(path = %path.display(), names = registry.len(), "name registry loaded");
                registry
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "name registry unavailable, using universe names");
                Self::empty()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl NameLookup for NameRegistry {
    fn display_name(&self, code: &str) -> Option<&str> {
        self.names.get(code).map(String::as_str)
    }
}
