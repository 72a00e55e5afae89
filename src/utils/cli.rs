//! Command-line argument parsing and help for rove.
//!
//! When invoked with no args (`rove`), the current directory is listed.

use crate::config::Config;

pub enum CliAction {
    Run,
    RunAtPath(String),
    Exit,
}

pub fn handle_args() -> CliAction {
    let args: Vec<String> = std::env::args().collect();
    parse_args(args.get(1..).unwrap_or_default())
}

fn parse_args(args: &[String]) -> CliAction {
    if args.is_empty() {
        return CliAction::Run;
    }

    if args.len() > 1 {
        eprintln!("Error: rove accepts only one argument at a time.");
        eprintln!("Usage: rove [PATH] or rove [OPTION]");
        return CliAction::Exit;
    }

    match args[0].as_str() {
        "--version" | "-v" => {
            print_version();
            CliAction::Exit
        }
        "-h" | "--help" => {
            print_help();
            CliAction::Exit
        }
        "--config-help" => {
            print_config_help();
            CliAction::Exit
        }
        "--init" => {
            if let Err(e) = Config::generate_default(&Config::default_path()) {
                eprintln!("Error: {}", e);
            }
            CliAction::Exit
        }
        arg if !arg.starts_with('-') && !arg.trim().is_empty() => {
            CliAction::RunAtPath(arg.to_string())
        }
        arg => {
            eprintln!("Unknown argument: {}", arg);
            eprintln!("Try --help for available options");
            CliAction::Exit
        }
    }
}

fn print_version() {
    println!("rove {}", env!("CARGO_PKG_VERSION"));
}

fn print_help() {
    println!(
        r#"rove - navigation core of a terminal file browser

USAGE:
  rove [PATH]

PATH:
  Directory to list (defaults to the current directory)

OPTIONS:
      --init              Generate a default configuration
      --config-help       Display all the configuration options
  -h, --help              Print help information
  -v, --version           Display the current installed version of rove

ENVIRONMENT:
  ROVE_CONFIG             Override the default config path
  ROVE_LOG                Log filter, e.g. "rove=debug" [default: warn]
"#
    );
}

fn print_config_help() {
    println!(
        r##"
rove - Configuration Guide (rove.toml)

[general]
  show_hidden                Show hidden files (dotfiles) [default: false]
  dirs_first                 Sort directories before files [default: true]
  sort_by                    natural, name, size, modified, accessed, changed, extension
  sort_reverse               Reverse the sort order [default: false]
  ignore_case                Fold case when sorting and searching [default: true]
  ignore_diacritics          Fold accents when sorting and searching [default: true]
  smart_case                 Case sensitive search when the pattern has uppercase [default: true]
  smart_diacritics           Accent sensitive search when the pattern has accents [default: true]
  glob_search                Match search patterns as globs instead of substrings
  move_to_trash              Move files to the trash instead of deleting them

[performance]
  preview_cache_size         Previews kept in memory, 0 for unlimited [default: 64]
  listing_cache_size         Directory listings kept in memory, 0 for unlimited [default: 32]
  preview_prune_interval_secs  Seconds between cache prunes [default: 5]
  history_depth              Back/forward entries kept, 0 for unlimited [default: 100]
  walker_concurrency         Directory walk threads (1..=100) [default: 16]
  batch_workers              Parallel file operations (1..=64) [default: 8]
  prewarm_depth              Parent levels listed in the background, 0 to disable [default: 2]
"##
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_args_runs_in_cwd() {
        assert!(matches!(parse_args(&[]), CliAction::Run));
    }

    #[test]
    fn path_arg() {
        match parse_args(&args(&["~/src"])) {
            CliAction::RunAtPath(p) => assert_eq!(p, "~/src"),
            _ => panic!("expected a path"),
        }
    }

    #[test]
    fn unknown_flag_and_extra_args_exit() {
        assert!(matches!(parse_args(&args(&["--bogus"])), CliAction::Exit));
        assert!(matches!(parse_args(&args(&["a", "b"])), CliAction::Exit));
        assert!(matches!(parse_args(&args(&["--version"])), CliAction::Exit));
    }
}
