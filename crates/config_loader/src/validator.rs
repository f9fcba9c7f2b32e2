//! 配置校验模块
//!
//! 校验规则：
//! - destinations 非空，name 非空且唯一
//! - batch_size / queue_capacity / transactions_per_batch >= 1
//! - file backend 必须提供 address
//! - 每 destination 的 batch_size 覆盖值 >= 1

use std::collections::HashSet;

use contracts::{BackendKind, ContractError, SinkBlueprint};

/// 校验 SinkBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &SinkBlueprint) -> Result<(), ContractError> {
    validate_backend(blueprint)?;
    validate_writer_settings(blueprint)?;
    validate_destinations(blueprint)?;
    Ok(())
}

/// 校验 backend 配置
fn validate_backend(blueprint: &SinkBlueprint) -> Result<(), ContractError> {
    if blueprint.backend.kind == BackendKind::File && blueprint.backend.address.is_empty() {
        return Err(ContractError::config_validation(
            "backend.address",
            "file backend requires a base directory address",
        ));
    }
    Ok(())
}

/// 校验 writer 参数下限
fn validate_writer_settings(blueprint: &SinkBlueprint) -> Result<(), ContractError> {
    let writer = &blueprint.writer;

    if writer.batch_size == 0 {
        return Err(ContractError::config_validation(
            "writer.batch_size",
            "batch_size must be >= 1",
        ));
    }
    if writer.queue_capacity == 0 {
        return Err(ContractError::config_validation(
            "writer.queue_capacity",
            "queue_capacity must be >= 1",
        ));
    }
    if writer.transactions_per_batch == 0 {
        return Err(ContractError::config_validation(
            "writer.transactions_per_batch",
            "transactions_per_batch must be >= 1",
        ));
    }
    Ok(())
}

/// 校验 destination 列表：非空、name 唯一、覆盖值合法
fn validate_destinations(blueprint: &SinkBlueprint) -> Result<(), ContractError> {
    if blueprint.destinations.is_empty() {
        return Err(ContractError::config_validation(
            "destinations",
            "at least one destination is required",
        ));
    }

    let mut seen = HashSet::new();
    for (idx, destination) in blueprint.destinations.iter().enumerate() {
        if destination.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("destinations[{idx}].name"),
                "destination name cannot be empty",
            ));
        }
        if !seen.insert(&destination.name) {
            return Err(ContractError::config_validation(
                format!("destinations[name={}]", destination.name),
                "duplicate destination name",
            ));
        }
        if destination.batch_size == Some(0) {
            return Err(ContractError::config_validation(
                format!("destinations[{}].batch_size", destination.name),
                "batch_size override must be >= 1",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{BackendConfig, ConfigVersion, DestinationConfig, WriterSettings};
    use std::collections::HashMap;

    fn minimal_blueprint() -> SinkBlueprint {
        SinkBlueprint {
            version: ConfigVersion::V1,
            backend: BackendConfig {
                kind: BackendKind::Mock,
                address: String::new(),
                params: HashMap::new(),
            },
            writer: WriterSettings::default(),
            destinations: vec![DestinationConfig {
                name: "orders".to_string(),
                batch_size: None,
            }],
        }
    }

    #[test]
    fn test_minimal_blueprint_is_valid() {
        assert!(validate(&minimal_blueprint()).is_ok());
    }

    #[test]
    fn test_empty_destinations_rejected() {
        let mut blueprint = minimal_blueprint();
        blueprint.destinations.clear();
        assert!(validate(&blueprint).is_err());
    }

    #[test]
    fn test_duplicate_destination_rejected() {
        let mut blueprint = minimal_blueprint();
        blueprint.destinations.push(DestinationConfig {
            name: "orders".to_string(),
            batch_size: None,
        });
        let err = validate(&blueprint).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let mut blueprint = minimal_blueprint();
        blueprint.writer.batch_size = 0;
        assert!(validate(&blueprint).is_err());
    }

    #[test]
    fn test_zero_batch_size_override_rejected() {
        let mut blueprint = minimal_blueprint();
        blueprint.destinations[0].batch_size = Some(0);
        assert!(validate(&blueprint).is_err());
    }

    #[test]
    fn test_file_backend_requires_address() {
        let mut blueprint = minimal_blueprint();
        blueprint.backend.kind = BackendKind::File;
        assert!(validate(&blueprint).is_err());

        blueprint.backend.address = "./out".to_string();
        assert!(validate(&blueprint).is_ok());
    }
}
