use regex::Regex;

use crate::error::{Result, TrackitError};

struct CategoryPatterns {
    name: String,
    patterns: Vec<Regex>,
}

/// Category rules compiled once at config load. Categories are tried in
/// document order and the first matching pattern wins.
pub struct CategoryMatcher {
    categories: Vec<CategoryPatterns>,
}

impl CategoryMatcher {
    pub fn compile(rules: Vec<(String, Vec<String>)>) -> Result<Self> {
        let mut categories = Vec::with_capacity(rules.len());
        for (name, sources) in rules {
            let patterns = sources
                .iter()
                .map(|src| {
                    Regex::new(src).map_err(|e| {
                        TrackitError::Config(format!("category '{name}': invalid pattern '{src}': {e}"))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            categories.push(CategoryPatterns { name, patterns });
        }
        Ok(Self { categories })
    }

    pub fn categorize(&self, counter_party: &str) -> Option<&str> {
        self.categories
            .iter()
            .find(|c| c.patterns.iter().any(|re| re.is_match(counter_party)))
            .map(|c| c.name.as_str())
    }

    pub fn names(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.name.as_str()).collect()
    }
}

impl std::fmt::Debug for CategoryMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
