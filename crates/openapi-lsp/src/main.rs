use openapi_lsp::{server, Context};
use std::process;

#[macro_use]
extern crate hiro_system_kit;

pub fn main() {
    let logger = hiro_system_kit::log::setup_logger();
    let _guard = hiro_system_kit::log::setup_global_logger(logger.clone());
    let ctx = Context { logger: Some(logger) };

    if let Err(e) = server::run_lsp(&ctx) {
        ctx.try_log(|logger| error!(logger, "Language server stopped: {e}"));
        std::thread::sleep(std::time::Duration::from_millis(500));
        process::exit(1);
    }
}
