//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON (可选) 格式。

use contracts::{ContractError, SinkBlueprint};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// 解析配置内容
pub fn parse(content: &str, format: ConfigFormat) -> Result<SinkBlueprint, ContractError> {
    match format {
        ConfigFormat::Toml => toml::from_str(content)
            .map_err(|e| ContractError::config_parse(format!("TOML parse error: {e}"))),
        ConfigFormat::Json => serde_json::from_str(content)
            .map_err(|e| ContractError::config_parse(format!("JSON parse error: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::BackendKind;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_extension("toml"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("JSON"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }

    #[test]
    fn test_parse_toml() {
        let content = r#"
[backend]
kind = "mock"

[[destinations]]
name = "orders"
"#;
        let blueprint = parse(content, ConfigFormat::Toml).unwrap();
        assert_eq!(blueprint.backend.kind, BackendKind::Mock);
        assert_eq!(blueprint.destinations[0].name, "orders");
    }

    #[test]
    fn test_parse_invalid_toml() {
        let result = parse("not = [valid", ConfigFormat::Toml);
        assert!(result.is_err());
    }
}
