use anyhow::{Context, Result};
use diskref::{Command, Config, FsStore, MarkdownRenderer, PathRewriter, Resolver};
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Reads markdown from a file, or stdin when no path is given.
fn read_input(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut content = String::new();
            std::io::stdin()
                .read_to_string(&mut content)
                .context("Failed to read stdin")?;
            Ok(content)
        }
    }
}

fn write_stdout(content: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(content.as_bytes())
        .context("Failed to write stdout")?;
    stdout.flush().context("Failed to flush stdout")
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries rewritten markdown
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::parse();
    config.validate().context("Invalid configuration")?;

    let rewriter = PathRewriter::new(&config.proxy_base);

    match config.command {
        Command::ToProxy { context, input } => {
            let markdown = read_input(input.as_deref())?;
            write_stdout(&rewriter.to_proxy_form(&markdown, &context))
        }
        Command::ToPermanent { context, input } => {
            let markdown = read_input(input.as_deref())?;
            write_stdout(&rewriter.to_permanent_form(&markdown, &context))
        }
        Command::Render {
            context,
            input,
            output,
            title,
        } => {
            let markdown = read_input(input.as_deref())?;
            let page = MarkdownRenderer::with_proxy(rewriter, context)
                .render_page(&title, &markdown)
                .context("Failed to render markdown")?;

            match output {
                Some(path) => std::fs::write(&path, page)
                    .with_context(|| format!("Failed to write {}", path.display())),
                None => write_stdout(&page),
            }
        }
        Command::Serve { addr, root } => {
            tracing::info!(root = %root.display(), proxy_base = %config.proxy_base, "serving artifacts");
            let resolver = Resolver::new(Arc::new(FsStore::new(root)));
            let router = diskref::server::router(resolver, &config.proxy_base);
            diskref::server::serve(addr, router).await
        }
    }
}
