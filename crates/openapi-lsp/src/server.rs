//! Language Server Protocol front end over stdin/stdout

use crate::coordinator::DocumentCoordinator;
use crate::engine::local::LocalEngine;
use crate::errors::CoordinatorError;
use crate::utils::{cast_notification, cast_request, create_error_response, normalize_uri};
use crate::Context;
use crossbeam_channel::Sender;
use lsp_server::{Connection, Message, Notification, Request, Response};
use lsp_types::notification::{
    DidChangeConfiguration, DidChangeTextDocument, DidChangeWatchedFiles, DidCloseTextDocument,
    DidOpenTextDocument, DidSaveTextDocument,
};
use lsp_types::request::{GotoDefinition, HoverRequest};
use lsp_types::{
    HoverProviderCapability, InitializeParams, InitializeResult, OneOf, SaveOptions,
    ServerCapabilities, ServerInfo, TextDocumentSyncCapability, TextDocumentSyncKind,
    TextDocumentSyncOptions, TextDocumentSyncSaveOptions, Url,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::error::Error;

/// Custom request returning the merged definition of a document's context.
pub const MERGED_DEFINITION_METHOD: &str = "openapi/mergedDefinition";

type Coordinator = DocumentCoordinator<LocalEngine, Sender<Message>>;

#[derive(Debug, Deserialize)]
struct MergedDefinitionParams {
    uri: Url,
}

/// Documents the editor has open, with their language and latest text.
#[derive(Default)]
struct OpenDocuments {
    documents: HashMap<Url, (String, String)>,
}

impl OpenDocuments {
    fn open(&mut self, uri: &Url, language_id: String, text: String) {
        self.documents.insert(normalize_uri(uri), (language_id, text));
    }

    fn change(&mut self, uri: &Url, text: String) -> Option<String> {
        let (language_id, current) = self.documents.get_mut(&normalize_uri(uri))?;
        *current = text;
        Some(language_id.clone())
    }

    fn text(&self, uri: &Url) -> Option<String> {
        self.documents.get(&normalize_uri(uri)).map(|(_, text)| text.clone())
    }

    fn close(&mut self, uri: &Url) {
        self.documents.remove(&normalize_uri(uri));
    }
}

pub fn run_lsp(ctx: &Context) -> Result<(), Box<dyn Error + Send + Sync>> {
    ctx.try_log(|logger| info!(logger, "Starting OpenAPI language server"));

    let (connection, io_threads) = Connection::stdio();

    let (initialize_id, initialize_params) = match connection.initialize_start() {
        Ok(params) => params,
        Err(e) => {
            ctx.try_log(|logger| error!(logger, "Failed to receive initialize request: {:?}", e));
            return Err(Box::new(e));
        }
    };
    let initialize_params: InitializeParams = serde_json::from_value(initialize_params)?;

    let initialize_result = InitializeResult {
        capabilities: server_capabilities(),
        server_info: Some(ServerInfo {
            name: "openapi-language-server".to_string(),
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
        }),
    };
    connection.initialize_finish(initialize_id, serde_json::to_value(initialize_result)?)?;

    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    let mut coordinator =
        DocumentCoordinator::new(LocalEngine::new(), connection.sender.clone(), ctx.clone());

    #[allow(deprecated)]
    let root = initialize_params
        .root_uri
        .as_ref()
        .map(|uri| uri.to_string())
        .or(initialize_params.root_path.clone());
    if let Err(e) = coordinator.set_root_uri(root.as_deref()) {
        coordinator.error(&e.to_string());
    }

    let mut documents = OpenDocuments::default();

    for message in &connection.receiver {
        match message {
            Message::Request(req) => {
                if connection.handle_shutdown(&req)? {
                    break;
                }
                let response = runtime.block_on(handle_request(req, &coordinator));
                connection.sender.send(Message::Response(response))?;
            }
            Message::Notification(not) => {
                let method = not.method.clone();
                let handled =
                    runtime.block_on(handle_notification(not, &mut coordinator, &mut documents));
                if let Err(e) = handled {
                    coordinator.error(&format!("{method}: {e}"));
                }
            }
            Message::Response(_) => {}
        }
    }

    io_threads.join()?;
    ctx.try_log(|logger| info!(logger, "OpenAPI language server shutting down"));
    Ok(())
}

fn server_capabilities() -> ServerCapabilities {
    ServerCapabilities {
        text_document_sync: Some(TextDocumentSyncCapability::Options(TextDocumentSyncOptions {
            open_close: Some(true),
            change: Some(TextDocumentSyncKind::FULL),
            save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                include_text: Some(true),
            })),
            ..Default::default()
        })),
        hover_provider: Some(HoverProviderCapability::Simple(true)),
        definition_provider: Some(OneOf::Left(true)),
        ..Default::default()
    }
}

async fn handle_request(req: Request, coordinator: &Coordinator) -> Response {
    let method = req.method.clone();
    match method.as_str() {
        "textDocument/hover" => match cast_request::<HoverRequest>(req) {
            Ok((id, params)) => Response::new_ok(id, coordinator.hover(params).await),
            Err((id, e)) => create_error_response(id, &e.to_string()),
        },
        "textDocument/definition" => match cast_request::<GotoDefinition>(req) {
            Ok((id, params)) => Response::new_ok(id, coordinator.goto_definition(params).await),
            Err((id, e)) => create_error_response(id, &e.to_string()),
        },
        MERGED_DEFINITION_METHOD => {
            match serde_json::from_value::<MergedDefinitionParams>(req.params) {
                Ok(params) => {
                    Response::new_ok(req.id, coordinator.merged_definition_payload(&params.uri))
                }
                Err(e) => create_error_response(req.id, &e.to_string()),
            }
        }
        _ => Response::new_err(
            req.id,
            lsp_server::ErrorCode::MethodNotFound as i32,
            format!("Method not found: {method}"),
        ),
    }
}

async fn handle_notification(
    not: Notification,
    coordinator: &mut Coordinator,
    documents: &mut OpenDocuments,
) -> Result<(), CoordinatorError> {
    let method = not.method.clone();
    match method.as_str() {
        "textDocument/didOpen" => {
            let document = cast_notification::<DidOpenTextDocument>(not)?.text_document;
            documents.open(&document.uri, document.language_id.clone(), document.text.clone());
            coordinator.open_or_changed_file(&document.uri, &document.language_id, document.text).await
        }
        "textDocument/didChange" => {
            let params = cast_notification::<DidChangeTextDocument>(not)?;
            let uri = params.text_document.uri;
            // full sync: the last change carries the whole text
            let Some(change) = params.content_changes.into_iter().last() else {
                return Ok(());
            };
            match documents.change(&uri, change.text.clone()) {
                Some(language_id) => {
                    coordinator.open_or_changed_file(&uri, &language_id, change.text).await
                }
                None => Ok(()),
            }
        }
        "textDocument/didClose" => {
            let uri = cast_notification::<DidCloseTextDocument>(not)?.text_document.uri;
            documents.close(&uri);
            coordinator.closed(&uri).await
        }
        "textDocument/didSave" => {
            let params = cast_notification::<DidSaveTextDocument>(not)?;
            let uri = params.text_document.uri;
            match params.text.or_else(|| documents.text(&uri)) {
                Some(text) => coordinator.on_saved(&uri, &text).await,
                None => Ok(()),
            }
        }
        "workspace/didChangeWatchedFiles" => {
            let params = cast_notification::<DidChangeWatchedFiles>(not)?;
            coordinator.changed_on_disk(params.changes).await
        }
        "workspace/didChangeConfiguration" => {
            let params = cast_notification::<DidChangeConfiguration>(not)?;
            coordinator.configuration_changed(params.settings).await;
            Ok(())
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::test_utils::url;

    #[test]
    fn test_open_documents_remember_language() {
        let mut documents = OpenDocuments::default();
        documents.open(&url("work/pets.json"), "json".into(), "{}".into());

        assert_eq!(documents.change(&url("work/pets.json"), "[]".into()), Some("json".into()));
        assert_eq!(documents.text(&url("work/pets.json")), Some("[]".into()));
        assert_eq!(documents.change(&url("work/other.json"), "[]".into()), None);

        documents.close(&url("work/pets.json"));
        assert_eq!(documents.text(&url("work/pets.json")), None);
    }

    #[test]
    fn test_capabilities_request_full_sync_and_saved_text() {
        let capabilities = server_capabilities();
        let Some(TextDocumentSyncCapability::Options(sync)) = capabilities.text_document_sync
        else {
            panic!("expected sync options");
        };
        assert_eq!(sync.change, Some(TextDocumentSyncKind::FULL));
        assert!(matches!(
            sync.save,
            Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions { include_text: Some(true) }))
        ));
    }
}
