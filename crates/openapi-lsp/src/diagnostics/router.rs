//! Maps engine messages onto editor diagnostics or log lines

use crate::engine::{Channel, EngineMessage, SourceRange, VALIDATOR_PLUGIN};
use crate::settings::InformationSeverity;
use crate::utils::parse_uri;
use lsp_types::{Diagnostic, DiagnosticSeverity, Position, Range, Url};

/// Published documentation of the validator rules.
pub const RULES_DOCUMENTATION_URL: &str = "https://github.com/Azure/azure-rest-api-specs/blob/current/documentation/openapi-authoring-automated-guidelines.md";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Verbose,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RoutedMessage {
    /// One diagnostic per range, with the normalized URI it belongs to
    Diagnostics(Vec<(Url, Diagnostic)>),
    Log { level: LogLevel, text: String },
}

/// Editor severity of a diagnostic channel; `None` for log channels.
pub fn severity_for(
    channel: Channel,
    information: InformationSeverity,
) -> Option<DiagnosticSeverity> {
    match channel {
        Channel::Warning => Some(DiagnosticSeverity::WARNING),
        Channel::Error => Some(DiagnosticSeverity::ERROR),
        Channel::Information => Some(information.to_lsp()),
        Channel::Debug | Channel::Verbose | Channel::Fatal => None,
    }
}

pub fn route(message: &EngineMessage, information: InformationSeverity) -> RoutedMessage {
    let Some(severity) = severity_for(message.channel, information) else {
        let level = match message.channel {
            Channel::Debug => LogLevel::Debug,
            Channel::Verbose => LogLevel::Verbose,
            _ => LogLevel::Error,
        };
        return RoutedMessage::Log { level, text: message.text.clone() };
    };

    let text = format!("{}{}", message.text, more_info(message));
    let source = message.key.join("/");
    let diagnostics = message
        .ranges
        .iter()
        .filter_map(|range| {
            let uri = range_document(range)?;
            let diagnostic = Diagnostic {
                range: to_lsp_range(range),
                severity: Some(severity),
                source: Some(source.clone()),
                message: text.clone(),
                ..Default::default()
            };
            Some((uri, diagnostic))
        })
        .collect();
    RoutedMessage::Diagnostics(diagnostics)
}

/// Link to the rule documentation for validator messages, empty otherwise.
fn more_info(message: &EngineMessage) -> String {
    if message.plugin.as_deref() != Some(VALIDATOR_PLUGIN) {
        return String::new();
    }
    let (Some(id), Some(name)) = (message.key.first(), message.key.get(1)) else {
        return String::new();
    };
    format!(
        "\n More info: {}#{}-{}\n",
        RULES_DOCUMENTATION_URL,
        name.to_lowercase(),
        id.to_lowercase()
    )
}

fn range_document(range: &SourceRange) -> Option<Url> {
    parse_uri(range.document.trim_end_matches('/')).ok()
}

/// Engine lines are 1-based, editor lines 0-based; columns pass through.
fn to_lsp_range(range: &SourceRange) -> Range {
    Range::new(
        Position::new(range.start.line.saturating_sub(1), range.start.column),
        Position::new(range.end.line.saturating_sub(1), range.end.column),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SourcePosition;

    fn range(document: &str, start: (u32, u32), end: (u32, u32)) -> SourceRange {
        SourceRange {
            document: document.to_string(),
            start: SourcePosition::new(start.0, start.1),
            end: SourcePosition::new(end.0, end.1),
        }
    }

    #[test]
    fn test_line_becomes_zero_based_and_column_is_kept() {
        let message = EngineMessage::new(Channel::Error, "broken")
            .with_range(range("file:///work/pets.json", (5, 2), (5, 9)));

        let RoutedMessage::Diagnostics(routed) = route(&message, InformationSeverity::default())
        else {
            panic!("expected diagnostics");
        };
        let (uri, diagnostic) = &routed[0];
        assert_eq!(uri.as_str(), "file:///work/pets.json");
        assert_eq!(diagnostic.range, Range::new(Position::new(4, 2), Position::new(4, 9)));
        assert_eq!(diagnostic.severity, Some(DiagnosticSeverity::ERROR));
    }

    #[test]
    fn test_validator_messages_link_rule_documentation() {
        let message = EngineMessage::new(Channel::Warning, "Use camelCase.")
            .with_plugin(VALIDATOR_PLUGIN)
            .with_key(["R3016", "DefinitionsPropertiesNamesCamelCase"])
            .with_range(range("file:///work/pets.json/", (1, 0), (1, 4)));

        let RoutedMessage::Diagnostics(routed) = route(&message, InformationSeverity::default())
        else {
            panic!("expected diagnostics");
        };
        let (uri, diagnostic) = &routed[0];
        assert_eq!(uri.as_str(), "file:///work/pets.json");
        assert_eq!(
            diagnostic.message,
            format!(
                "Use camelCase.\n More info: {RULES_DOCUMENTATION_URL}#definitionspropertiesnamescamelcase-r3016\n"
            )
        );
        assert_eq!(diagnostic.source.as_deref(), Some("R3016/DefinitionsPropertiesNamesCamelCase"));
    }

    #[test]
    fn test_information_severity_is_configurable() {
        assert_eq!(
            severity_for(Channel::Information, InformationSeverity::Warning),
            Some(DiagnosticSeverity::WARNING)
        );
        assert_eq!(
            severity_for(Channel::Information, InformationSeverity::Information),
            Some(DiagnosticSeverity::INFORMATION)
        );
    }

    #[test]
    fn test_log_channels_bypass_diagnostics() {
        let fatal = EngineMessage::new(Channel::Fatal, "engine crashed");
        assert_eq!(
            route(&fatal, InformationSeverity::default()),
            RoutedMessage::Log { level: LogLevel::Error, text: "engine crashed".to_string() }
        );
        let verbose = EngineMessage::new(Channel::Verbose, "pass done");
        assert!(matches!(
            route(&verbose, InformationSeverity::default()),
            RoutedMessage::Log { level: LogLevel::Verbose, .. }
        ));
    }

    #[test]
    fn test_unparsable_range_document_is_dropped() {
        let message = EngineMessage::new(Channel::Error, "broken")
            .with_range(range("not a uri", (1, 0), (1, 1)));
        assert_eq!(
            route(&message, InformationSeverity::default()),
            RoutedMessage::Diagnostics(vec![])
        );
    }
}
