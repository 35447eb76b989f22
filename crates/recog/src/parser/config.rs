/// Parser configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserConfig {
    /// Build a parse tree. When off, [`crate::error::ParseResult::tree`] is `None`.
    pub build_parse_tree: bool,
    /// Diagnostics recorded per parse; later ones are only counted.
    pub max_errors: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            build_parse_tree: true,
            max_errors: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ParserConfig::default();
        assert!(config.build_parse_tree);
        assert_eq!(config.max_errors, 100);
    }
}
