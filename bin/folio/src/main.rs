//! Folio CLI
//!
//! Compiles authored documents into cached artifacts for one or more
//! rendering backends.
//!
//! This is the binary entry point. The library functionality is in `lib.rs`.

use clap::Parser;
use color_eyre::eyre::Result;

/// Command-line interface for Folio.
#[derive(Parser)]
#[command(
    name = "folio",
    version,
    about = "Compile documents into cached, renderable artifacts"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "folio.toml")]
    config: std::path::PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(clap::Subcommand)]
enum Commands {
    /// Compile documents and write them to the cache
    Build {
        /// Backend to build for (repeatable; default: all configured)
        #[arg(short, long = "backend")]
        backends: Vec<String>,
        /// Document identifiers (default: every document)
        identifiers: Vec<String>,
    },
    /// Compile every document without writing, reporting diagnostics
    Check {
        /// Backend to check (repeatable; default: all configured)
        #[arg(short, long = "backend")]
        backends: Vec<String>,
        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,
    },
    /// Render a cached artifact as HTML
    Show {
        /// Document identifier
        identifier: String,
        /// Backend whose cache to read
        #[arg(short, long, default_value = "mdx-bundler")]
        backend: String,
        /// Prop passed to the artifact (key=value, repeatable)
        #[arg(short, long = "prop")]
        props: Vec<String>,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    folio::init_tracing(cli.verbose);

    match cli.command {
        Commands::Build {
            backends,
            identifiers,
        } => {
            folio::cmd::build::run(&cli.config, &backends, &identifiers)?;
        }
        Commands::Check { backends, strict } => {
            folio::cmd::check::run(&cli.config, &backends, strict)?;
        }
        Commands::Show {
            identifier,
            backend,
            props,
        } => {
            folio::cmd::show::run(&cli.config, &backend, &identifier, &props)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn test_cli_build_command_parsing() {
        let args = ["folio", "build", "-b", "mdx-bundler", "--backend", "contentlayer", "blog/post"];
        let cli = Cli::parse_from(args);

        assert_eq!(cli.config, std::path::PathBuf::from("folio.toml"));
        assert_eq!(cli.verbose, 0);

        match cli.command {
            Commands::Build {
                backends,
                identifiers,
            } => {
                assert_eq!(backends, vec!["mdx-bundler", "contentlayer"]);
                assert_eq!(identifiers, vec!["blog/post"]);
            }
            _ => panic!("Expected Build command"),
        }
    }

    #[test]
    fn test_cli_build_defaults() {
        let cli = Cli::parse_from(["folio", "build"]);

        match cli.command {
            Commands::Build {
                backends,
                identifiers,
            } => {
                assert!(backends.is_empty());
                assert!(identifiers.is_empty());
            }
            _ => panic!("Expected Build command"),
        }
    }

    #[test]
    fn test_cli_check_command_parsing() {
        let cli = Cli::parse_from(["folio", "check", "--strict"]);

        match cli.command {
            Commands::Check { strict, backends } => {
                assert!(strict);
                assert!(backends.is_empty());
            }
            _ => panic!("Expected Check command"),
        }
    }

    #[test]
    fn test_cli_show_command_parsing() {
        let args = ["folio", "show", "sample", "--backend", "next-mdx-remote", "-p", "title=Hi"];
        let cli = Cli::parse_from(args);

        match cli.command {
            Commands::Show {
                identifier,
                backend,
                props,
            } => {
                assert_eq!(identifier, "sample");
                assert_eq!(backend, "next-mdx-remote");
                assert_eq!(props, vec!["title=Hi"]);
            }
            _ => panic!("Expected Show command"),
        }
    }

    #[test]
    fn test_cli_verbosity_flags() {
        let cli = Cli::parse_from(["folio", "-vvv", "build"]);
        assert_eq!(cli.verbose, 3);
    }

    #[test]
    fn test_cli_custom_config_path() {
        let cli = Cli::parse_from(["folio", "--config", "site.toml", "build"]);
        assert_eq!(cli.config, std::path::PathBuf::from("site.toml"));
    }
}
