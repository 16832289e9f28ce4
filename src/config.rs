//! Command line configuration.

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::proxy::DEFAULT_PROXY_BASE;

/// Command line configuration for diskref.
#[derive(Debug, Clone, Parser)]
#[command(name = "diskref", version, about, long_about = None)]
pub struct Config {
    /// Proxy endpoint path embedded in rewritten image targets
    #[arg(long, global = true, default_value = DEFAULT_PROXY_BASE)]
    pub proxy_base: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Operations exposed by the binary.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Rewrite disk:: image targets to proxy URLs
    ToProxy {
        /// Context identifier (conversation or document id)
        #[arg(long)]
        context: String,

        /// Markdown file, stdin when omitted
        input: Option<PathBuf>,
    },

    /// Rewrite proxy URLs for a context back to disk:: form
    ToPermanent {
        /// Context identifier used when the proxy form was produced
        #[arg(long)]
        context: String,

        /// Markdown file, stdin when omitted
        input: Option<PathBuf>,
    },

    /// Render markdown to an HTML page with proxied images
    Render {
        /// Context identifier of the document
        #[arg(long)]
        context: String,

        /// Markdown file, stdin when omitted
        input: Option<PathBuf>,

        /// Output file, stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Page title
        #[arg(long, default_value = "Document")]
        title: String,
    },

    /// Serve the proxy endpoint from a directory of contexts
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: SocketAddr,

        /// Directory holding one subdirectory per context
        #[arg(long, default_value = "artifacts")]
        root: PathBuf,
    },
}

impl Config {
    /// Parses configuration from command line arguments.
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Validates configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the proxy base is not an absolute path without query,
    /// a context is empty, an input file does not exist, or the serve root
    /// is not a directory.
    pub fn validate(&self) -> Result<()> {
        if !self.proxy_base.starts_with('/') {
            bail!("Proxy base must start with '/': {}", self.proxy_base);
        }
        if self.proxy_base.contains(['?', '#', ' ']) {
            bail!(
                "Proxy base must not contain a query, fragment or spaces: {}",
                self.proxy_base
            );
        }

        match &self.command {
            Command::ToProxy { context, input }
            | Command::ToPermanent { context, input }
            | Command::Render { context, input, .. } => {
                if context.trim().is_empty() {
                    bail!("Context identifier must not be empty");
                }
                if let Some(input) = input
                    && !input.is_file()
                {
                    bail!("Input file does not exist: {}", input.display());
                }
            }
            Command::Serve { root, .. } => {
                if !root.is_dir() {
                    bail!("Artifact root is not a directory: {}", root.display());
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        Config::try_parse_from(args).expect("Arguments should parse")
    }

    #[test]
    fn test_parse_to_proxy_defaults() {
        // Arrange & Act
        let config = parse(&["diskref", "to-proxy", "--context", "doc-42"]);

        // Assert
        assert_eq!(config.proxy_base, DEFAULT_PROXY_BASE);
        match config.command {
            Command::ToProxy { context, input } => {
                assert_eq!(context, "doc-42");
                assert!(input.is_none());
            }
            other => panic!("Unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_global_proxy_base_after_subcommand() {
        let config = parse(&[
            "diskref",
            "to-permanent",
            "--context",
            "c",
            "--proxy-base",
            "/img",
        ]);
        assert_eq!(config.proxy_base, "/img");
    }

    #[test]
    fn test_parse_serve_defaults() {
        let config = parse(&["diskref", "serve"]);
        match config.command {
            Command::Serve { addr, root } => {
                assert_eq!(addr.to_string(), "127.0.0.1:8080");
                assert_eq!(root, PathBuf::from("artifacts"));
            }
            other => panic!("Unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_requires_context() {
        assert!(Config::try_parse_from(["diskref", "to-proxy"]).is_err());
    }

    #[test]
    fn test_validate_rejects_relative_proxy_base() {
        let config = parse(&["diskref", "to-proxy", "--context", "c", "--proxy-base", "img"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_query_in_proxy_base() {
        let config = parse(&[
            "diskref",
            "to-proxy",
            "--context",
            "c",
            "--proxy-base",
            "/img?x=1",
        ]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_blank_context() {
        let config = parse(&["diskref", "render", "--context", " "]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_missing_input() {
        // Arrange
        let config = parse(&[
            "diskref",
            "to-proxy",
            "--context",
            "c",
            "/nonexistent/input.md",
        ]);

        // Act
        let result = config.validate();

        // Assert
        let message = result.expect_err("Missing input should fail").to_string();
        assert!(message.contains("does not exist"), "Got: {}", message);
    }

    #[test]
    fn test_validate_serve_root() {
        // Arrange
        let dir = tempfile::TempDir::new().expect("Should create temp dir");
        let root = dir.path().to_str().expect("Temp path should be UTF8");
        let valid = parse(&["diskref", "serve", "--root", root]);
        let invalid = parse(&["diskref", "serve", "--root", "/nonexistent/root"]);

        // Act & Assert
        assert!(valid.validate().is_ok());
        assert!(invalid.validate().is_err());
    }
}
