//! layerconf CLI - Command-line interface for layered configuration resolution
//!
//! Usage:
//!   layerconf resolve config.yml -s stage=prod
//!   layerconf get config.yml database.host
//!   layerconf check config.yml other.yml

use clap::{Parser, Subcommand};
use colored::Colorize;
use layerconf_core::{Config, ErrorKind, Overrides, Value};
use std::path::PathBuf;
use std::process::ExitCode;

/// layerconf - Layered configuration resolution
#[derive(Parser)]
#[command(name = "layerconf")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a configuration, resolve it, and print the result
    Resolve {
        /// Configuration file to resolve
        file: PathBuf,

        /// Override a value: -s key=value, or -s key for a boolean flag
        #[arg(short = 's', long = "set", value_name = "KEY[=VALUE]")]
        set: Vec<String>,

        /// Output format: yaml, json
        #[arg(short, long, default_value = "yaml")]
        format: String,

        /// Write to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Get a specific value from the resolved configuration
    Get {
        /// Configuration file
        file: PathBuf,

        /// Path to the value (e.g., database.host)
        path: String,

        /// Override a value: -s key=value, or -s key for a boolean flag
        #[arg(short = 's', long = "set", value_name = "KEY[=VALUE]")]
        set: Vec<String>,

        /// Output format: text, json, yaml
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Default value if the path is not found
        #[arg(short, long)]
        default: Option<String>,
    },

    /// Quick syntax check without resolution
    Check {
        /// Configuration file(s) to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

/// Run the CLI with the given arguments
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve {
            file,
            set,
            format,
            output,
        } => cmd_resolve(file, &set, &format, output),

        Commands::Get {
            file,
            path,
            set,
            format,
            default,
        } => cmd_get(file, &path, &set, &format, default),

        Commands::Check { files } => cmd_check(files),
    }
}

/// Parse repeated -s flags into overrides
///
/// `key=value` splits on the first '='; a bare `key` is a boolean flag
/// set to true. Values coerce the same way document scalars do.
fn parse_overrides(flags: &[String]) -> Overrides {
    let mut overrides = Overrides::new();
    for flag in flags {
        match flag.split_once('=') {
            Some((key, value)) => overrides.insert_raw(key, value),
            None => overrides.insert(flag.clone(), true),
        }
    }
    overrides
}

fn load_config(file: &PathBuf, set: &[String]) -> Result<Config, ExitCode> {
    let overrides = parse_overrides(set);
    Config::load(file, &overrides).map_err(|e| {
        eprintln!(
            "{}",
            format!("Failed to load {}: {}", file.display(), e).red()
        );
        // Unreadable or unparseable input is a usage/I-O failure (2);
        // anything the resolver rejects is a resolution failure (1).
        match e.kind {
            ErrorKind::DocumentNotFound { .. } | ErrorKind::Parse => ExitCode::from(2),
            _ => ExitCode::from(1),
        }
    })
}

fn cmd_resolve(file: PathBuf, set: &[String], format: &str, output: Option<PathBuf>) -> ExitCode {
    let config = match load_config(&file, set) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let result = match format {
        "json" => config.to_json(),
        _ => config.to_yaml(),
    };

    match result {
        Ok(content) => {
            if let Some(output_path) = output {
                if let Err(e) = std::fs::write(&output_path, &content) {
                    eprintln!("{}: {}", "Error writing file".red(), e);
                    return ExitCode::from(2);
                }
                eprintln!("{} Wrote to {}", "✓".green(), output_path.display());
            } else {
                print!("{}", content);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            ExitCode::from(1)
        }
    }
}

fn cmd_get(
    file: PathBuf,
    path: &str,
    set: &[String],
    format: &str,
    default: Option<String>,
) -> ExitCode {
    let config = match load_config(&file, set) {
        Ok(c) => c,
        Err(code) => return code,
    };

    match config.get(path) {
        Ok(value) => {
            match format {
                "json" => {
                    println!("{}", serde_json::to_string_pretty(&value).unwrap());
                }
                "yaml" => {
                    let yaml = serde_yaml::to_string(&value).unwrap();
                    print!("{}", yaml);
                }
                _ => {
                    // Text format - just print the value
                    match value {
                        Value::String(s) => println!("{}", s),
                        Value::Integer(i) => println!("{}", i),
                        Value::Float(v) => println!("{}", v),
                        Value::Bool(b) => println!("{}", b),
                        Value::Null => println!("null"),
                        _ => {
                            // For containers, output as YAML
                            let yaml = serde_yaml::to_string(&value).unwrap();
                            print!("{}", yaml);
                        }
                    }
                }
            }
            ExitCode::SUCCESS
        }
        Err(_) => {
            if let Some(default_val) = default {
                println!("{}", default_val);
                ExitCode::SUCCESS
            } else {
                eprintln!("{}: Path '{}' not found", "Error".red(), path);
                ExitCode::from(1)
            }
        }
    }
}

fn cmd_check(files: Vec<PathBuf>) -> ExitCode {
    let mut all_valid = true;

    for file in files {
        let content = match std::fs::read_to_string(&file) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), file.display(), e);
                all_valid = false;
                continue;
            }
        };

        let ext = file.extension().and_then(|e| e.to_str()).unwrap_or("");
        let parse_result: Result<Value, String> = if ext == "json" {
            serde_json::from_str(&content).map_err(|e| format!("Invalid JSON: {}", e))
        } else {
            serde_yaml::from_str(&content).map_err(|e| format!("Invalid YAML: {}", e))
        };

        match parse_result {
            Ok(_) => {
                println!(
                    "{} {}: valid {}",
                    "✓".green(),
                    file.display(),
                    if ext == "json" { "JSON" } else { "YAML" }
                );
            }
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), file.display(), e);
                all_valid = false;
            }
        }
    }

    if all_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_overrides_key_value() {
        let overrides = parse_overrides(&["stage=prod".into(), "port=8080".into()]);

        assert_eq!(overrides.get("stage"), Some(&Value::String("prod".into())));
        assert_eq!(overrides.get("port"), Some(&Value::Integer(8080)));
    }

    #[test]
    fn test_parse_overrides_bare_key_is_boolean() {
        let overrides = parse_overrides(&["verbose".into()]);

        assert_eq!(overrides.get("verbose"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_parse_overrides_splits_on_first_equals() {
        let overrides = parse_overrides(&["token=a=b".into()]);

        assert_eq!(overrides.get("token"), Some(&Value::String("a=b".into())));
    }

    #[test]
    fn test_parse_overrides_coerces_scalars() {
        let overrides = parse_overrides(&["debug=true".into(), "ratio=1.5".into()]);

        assert_eq!(overrides.get("debug"), Some(&Value::Bool(true)));
        assert_eq!(overrides.get("ratio"), Some(&Value::Float(1.5)));
    }

    #[test]
    fn test_parse_overrides_empty() {
        let overrides = parse_overrides(&[]);
        assert!(overrides.is_empty());
    }
}
