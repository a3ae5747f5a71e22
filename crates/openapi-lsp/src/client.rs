//! Outbound side of the protocol connection

use lsp_server::{Message, Notification};
use lsp_types::notification::{LogMessage, Notification as _, PublishDiagnostics};
use lsp_types::{LogMessageParams, MessageType, PublishDiagnosticsParams};

/// What the coordinator needs from the editor connection.
pub trait LanguageClient {
    fn publish_diagnostics(&self, params: PublishDiagnosticsParams);

    fn log_message(&self, typ: MessageType, message: String);
}

impl LanguageClient for crossbeam_channel::Sender<Message> {
    fn publish_diagnostics(&self, params: PublishDiagnosticsParams) {
        let notification = Notification::new(PublishDiagnostics::METHOD.to_string(), params);
        // the connection is gone once the send fails, the main loop notices on its own
        let _ = self.send(Message::Notification(notification));
    }

    fn log_message(&self, typ: MessageType, message: String) {
        let notification =
            Notification::new(LogMessage::METHOD.to_string(), LogMessageParams { typ, message });
        let _ = self.send(Message::Notification(notification));
    }
}
