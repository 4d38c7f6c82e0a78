use techpro_core::config::LoadOptions;
use techpro_server::bootstrap;

use crate::commands::{current_thread_runtime, CommandResult};

pub fn run(session_id: &str, message: &str) -> CommandResult {
    if message.trim().is_empty() {
        return CommandResult::failure("ask", "invalid_input", "message must not be empty", 2);
    }

    let runtime = match current_thread_runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "ask",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let app = bootstrap(LoadOptions::default())
            .await
            .map_err(|error| ("bootstrap", error.to_string(), 4u8))?;
        Ok::<_, (&'static str, String, u8)>(
            app.orchestrator.process_message(message, session_id).await,
        )
    });

    match result {
        Ok(response) => match serde_json::to_value(&response) {
            Ok(data) => CommandResult::success_with("ask", response.response, Some(data)),
            Err(error) => CommandResult::failure("ask", "serialization", error.to_string(), 5),
        },
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("ask", error_class, message, exit_code)
        }
    }
}
