//! Validator plugin rules run by the built-in engine

use super::source_map::JsonPath;
use serde_json::Value;

const HTTP_METHODS: [&str; 7] = ["get", "put", "post", "patch", "delete", "head", "options"];

#[derive(Debug, Clone, PartialEq)]
pub struct RuleViolation {
    pub id: &'static str,
    pub name: &'static str,
    pub message: String,
    pub path: JsonPath,
}

impl RuleViolation {
    /// Message key, id first.
    pub fn key(&self) -> [&'static str; 2] {
        [self.id, self.name]
    }
}

type Rule = fn(&Value, &mut Vec<RuleViolation>);

const RULES: [Rule; 2] = [definition_property_names_camel_case, operation_id_required];

/// Runs every rule against one parsed input.
pub fn run_rules(document: &Value) -> Vec<RuleViolation> {
    let mut violations = vec![];
    for rule in RULES {
        rule(document, &mut violations);
    }
    violations
}

fn definition_property_names_camel_case(document: &Value, out: &mut Vec<RuleViolation>) {
    let Some(definitions) = document.get("definitions").and_then(Value::as_object) else {
        return;
    };
    for (name, definition) in definitions {
        let Some(properties) = definition.get("properties").and_then(Value::as_object) else {
            continue;
        };
        for property in properties.keys() {
            if is_camel_case(property) {
                continue;
            }
            out.push(RuleViolation {
                id: "R3016",
                name: "DefinitionsPropertiesNamesCamelCase",
                message: format!("Property named '{property}' of '{name}' must follow camelCase style."),
                path: JsonPath::from_keys(&["definitions", name, "properties", property]),
            });
        }
    }
}

fn operation_id_required(document: &Value, out: &mut Vec<RuleViolation>) {
    let Some(paths) = document.get("paths").and_then(Value::as_object) else {
        return;
    };
    for (path, item) in paths {
        for method in HTTP_METHODS {
            let Some(operation) = item.get(method) else {
                continue;
            };
            if operation.get("operationId").and_then(Value::as_str).is_some() {
                continue;
            }
            out.push(RuleViolation {
                id: "R1001",
                name: "OperationIdRequired",
                message: format!("Operation '{} {path}' has no operationId.", method.to_uppercase()),
                path: JsonPath::from_keys(&["paths", path, method]),
            });
        }
    }
}

fn is_camel_case(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric())
}
