//! agent-installer - install the agent payload shipped beside this binary.
//!
//! ```text
//! sudo ./agent-installer -u admin -pw secret -s tp.example.com
//! ```

use clap::error::ErrorKind;
use clap::Parser;
use std::process::ExitCode;

use agent_forge::installer::{self, InstallArgs, InstallLayout, Verifier};

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    agent_forge::logging::init(0);

    let args = match InstallArgs::try_parse_from(installer::normalize_go_flags(std::env::args_os())) {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            let rendered = e.to_string();
            let first = rendered.lines().next().unwrap_or_default();
            return fail(&[first.trim_start_matches("error: ").to_string()]);
        }
    };

    let layout = match InstallLayout::from_env() {
        Ok(layout) => layout,
        Err(e) => return fail(&[format!("{:#}", e)]),
    };
    let supervisor = layout.supervisor.supervisor();

    match installer::run(
        &args,
        installer::is_root(),
        &layout,
        supervisor.as_ref(),
        Verifier::for_server,
    ) {
        Ok(_) => ExitCode::SUCCESS,
        Err(failure) => fail(&failure.messages()),
    }
}

fn fail(messages: &[String]) -> ExitCode {
    print!("{}", installer::render_errors(messages));
    ExitCode::FAILURE
}
