use serde_json::{json, Value};
use std::sync::LazyLock;

pub static CONFIG_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "properties": {
            "tenant": {
                "type": "object",
                "properties": {
                    "tenant_id": { "type": "string", "minLength": 1 },
                    "client_id": { "type": "string" },
                    "client_secret": { "type": "string" },
                    "access_token": { "type": "string" }
                },
                "additionalProperties": false
            },
            "collection": {
                "type": "object",
                "properties": {
                    "services": {
                        "type": "array",
                        "items": { "type": "string", "enum": ["defender", "entra"] },
                        "minItems": 1
                    },
                    "timeout_secs": { "type": "integer", "minimum": 1 },
                    "max_pages": { "type": "integer", "minimum": 1 },
                    "lookback_days": { "type": "integer", "minimum": 1, "maximum": 180 }
                },
                "additionalProperties": false
            },
            "endpoints": {
                "type": "object",
                "properties": {
                    "graph": { "type": "string" },
                    "defender": { "type": "string" },
                    "authority": { "type": "string" }
                },
                "additionalProperties": false
            },
            "delegated": {
                "type": "object",
                "properties": {
                    "defender_data": { "type": "string" }
                }
            },
            "output": {
                "type": "object",
                "properties": {
                    "path": { "type": "string" },
                    "format": { "type": "string", "enum": ["json", "summary"] }
                }
            }
        },
        "additionalProperties": false
    })
});
