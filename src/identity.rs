use crate::error::{RepoStatsError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// One logical contributor in the alias file. `matches` holds every raw name
/// or email spelling that should fold into this contributor.
#[derive(Debug, Clone, Deserialize)]
pub struct AliasEntry {
    pub name: String,
    #[serde(default)]
    pub primary_email: Option<String>,
    #[serde(default)]
    pub matches: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct AliasFile {
    author_aliases: Vec<AliasEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalAuthor {
    pub identity: String,
    pub display_name: String,
}

/// Static raw-spelling to canonical-contributor mapping. Emails are always
/// case-folded before lookup, so two spellings of the same address collapse
/// even without an alias file.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    canonical: HashMap<String, CanonicalAuthor>,
}

impl AliasTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref()).map_err(|e| {
            RepoStatsError::AliasTable(format!("{}: {e}", path.as_ref().display()))
        })?;
        let file: AliasFile = serde_json::from_str(&raw)
            .map_err(|e| RepoStatsError::AliasTable(format!("invalid alias file: {e}")))?;
        Ok(Self::from_entries(file.author_aliases))
    }

    pub fn from_entries(entries: Vec<AliasEntry>) -> Self {
        let mut canonical = HashMap::new();
        for entry in entries {
            let identity = entry
                .primary_email
                .as_deref()
                .map(str::to_lowercase)
                .unwrap_or_else(|| entry.name.to_lowercase());
            let author = CanonicalAuthor {
                identity: identity.clone(),
                display_name: entry.name.clone(),
            };
            canonical.insert(identity, author.clone());
            for m in &entry.matches {
                canonical.insert(m.to_lowercase(), author.clone());
            }
        }
        Self { canonical }
    }

    /// Map a raw name/email pair to its canonical contributor. Lookup order:
    /// email, then name, both case-folded. Unmatched authors key on their
    /// case-folded email so spelling variants of one address still merge.
    pub fn resolve(&self, name: &str, email: &str) -> CanonicalAuthor {
        let email_key = email.to_lowercase();
        if let Some(found) = self.canonical.get(&email_key) {
            return found.clone();
        }
        if let Some(found) = self.canonical.get(&name.to_lowercase()) {
            return found.clone();
        }
        let identity = if email_key.is_empty() {
            name.to_lowercase()
        } else {
            email_key
        };
        CanonicalAuthor {
            identity,
            display_name: name.to_string(),
        }
    }
}
