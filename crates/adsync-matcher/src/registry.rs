use crate::matcher_trait::Matcher;
use adsync_core::MatchError;
use std::collections::HashMap;

pub struct MatcherRegistry {
    factories: HashMap<String, fn() -> Box<dyn Matcher>>,
}

impl MatcherRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register("fixed", || {
            Box::new(crate::fixed_matcher::FixedMatcher::new())
        });
        #[cfg(feature = "http")]
        registry.register("http", || Box::new(crate::http_matcher::HttpMatcher::new()));
        registry
    }

    pub fn register(&mut self, name: &str, factory: fn() -> Box<dyn Matcher>) {
        self.factories.insert(name.to_string(), factory);
    }

    pub fn create(&self, name: &str) -> Result<Box<dyn Matcher>, MatchError> {
        self.factories
            .get(name)
            .map(|f| f())
            .ok_or_else(|| MatchError::MatcherNotFound(name.to_string()))
    }

    /// Create and initialise a matcher in one step.
    pub async fn build(
        &self,
        name: &str,
        config: toml::Value,
    ) -> Result<Box<dyn Matcher>, MatchError> {
        let mut matcher = self.create(name)?;
        matcher.initialize(config).await?;
        Ok(matcher)
    }

    pub fn list_matchers(&self) -> Vec<&str> {
        self.factories.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for MatcherRegistry {
    fn default() -> Self {
        Self::new()
    }
}
