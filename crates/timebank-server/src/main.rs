// SPDX-License-Identifier: Apache-2.0

use std::process::ExitCode;
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    timebank_server::runtime::init_tracing();
    match timebank_server::runtime::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!(%message, "startup failed");
            ExitCode::FAILURE
        }
    }
}
