//! main.rs
//! Entry point for rove: lists a directory through the navigator.

use rove::app::{DirState, Navigator};
use rove::config::Config;
use rove::core::{CancelToken, OsFs};
use rove::utils::cli::{CliAction, handle_args};
use rove::utils::{expand_home_path, shorten_home_path};

use tracing_subscriber::{EnvFilter, fmt};

use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    init_tracing();

    let start = match handle_args() {
        CliAction::Exit => return ExitCode::SUCCESS,
        CliAction::Run => match std::env::current_dir() {
            Ok(dir) => dir,
            Err(e) => {
                eprintln!("[rove] Error: cannot read the current directory: {}", e);
                return ExitCode::FAILURE;
            }
        },
        CliAction::RunAtPath(arg) => expand_home_path(&arg),
    };

    let config = Config::load();
    let cancel = CancelToken::new();
    let mut nav = match Navigator::new(&config, Arc::new(OsFs), &cancel, &start) {
        Ok(nav) => nav,
        Err(e) => {
            eprintln!("[rove] Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let state = nav.reload("", &[]);
    cancel.cancel();

    if let Some(e) = &state.error {
        eprintln!(
            "[rove] Error: Path '{}' cannot be opened: {}",
            start.display(),
            e
        );
        return ExitCode::FAILURE;
    }
    print_listing(&state);
    ExitCode::SUCCESS
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("ROVE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

fn print_listing(state: &DirState) {
    println!("{}", shorten_home_path(&state.nav.path));
    for entry in &state.entries {
        let marker = if entry.is_dir() { "/" } else { "" };
        let link = if entry.is_symlink() {
            format!(" -> {}", entry.link_name())
        } else {
            String::new()
        };
        println!(
            "{}  {:>10}  {}{}{}",
            entry.modified_str(),
            entry.size_str(),
            entry.name(),
            marker,
            link
        );
    }
}
