use std::process::ExitCode;

fn main() -> ExitCode {
    techpro_cli::run()
}
