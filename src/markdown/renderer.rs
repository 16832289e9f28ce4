//! Markdown rendering with GitHub Flavored Markdown support.

use anyhow::{Context, Result};
use comrak::Options;
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::path::Path;
use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

use super::PathRewriter;

/// Renders markdown to HTML with GitHub Flavored Markdown extensions.
///
/// Provides GFM extensions including tables, strikethrough, autolinks,
/// task lists and footnotes. Code blocks with a language are highlighted
/// by syntect using CSS classes. When configured with a rewriter, permanent
/// artifact references are pointed at the proxy endpoint for this render
/// only; the source markdown is never modified.
pub struct MarkdownRenderer<'a> {
    options: Options<'a>,
    syntax_set: SyntaxSet,
    proxy: Option<(PathRewriter, String)>,
}

impl<'a> MarkdownRenderer<'a> {
    /// Creates renderer with GitHub Flavored Markdown options.
    ///
    /// Configures GFM extensions and security settings:
    /// - Tables, strikethrough, autolinks, task lists, footnotes
    /// - Raw HTML escaped (transcripts are untrusted content)
    /// - Syntax highlighting with syntect using CSS classes
    pub fn new() -> Self {
        let mut options = Options::default();

        options.extension.strikethrough = true;
        options.extension.table = true;
        options.extension.autolink = true;
        options.extension.tasklist = true;
        options.extension.footnotes = true;

        options.render.unsafe_ = false;
        options.render.escape = true;

        let syntax_set = SyntaxSet::load_defaults_newlines();

        Self {
            options,
            syntax_set,
            proxy: None,
        }
    }

    /// Creates renderer rewriting artifact references for a context.
    ///
    /// # Arguments
    ///
    /// * `rewriter`: Rewriter carrying the proxy endpoint
    /// * `context`: Context identifier of the rendered document
    pub fn with_proxy(rewriter: PathRewriter, context: impl Into<String>) -> Self {
        let mut renderer = Self::new();
        renderer.proxy = Some((rewriter, context.into()));
        renderer
    }

    /// Renders markdown content to HTML string.
    ///
    /// # Errors
    ///
    /// Returns error if syntax highlighting fails
    pub fn render(&self, content: &str) -> Result<String> {
        let html = match &self.proxy {
            Some((rewriter, context)) => {
                let proxied = rewriter.to_proxy_form(content, context);
                comrak::markdown_to_html(&proxied, &self.options)
            }
            None => comrak::markdown_to_html(content, &self.options),
        };

        self.highlight_code_blocks(&html)
    }

    /// Renders markdown as a complete HTML page.
    ///
    /// # Arguments
    ///
    /// * `title`: Page title
    /// * `content`: Markdown body
    ///
    /// # Errors
    ///
    /// Returns error if rendering fails
    pub fn render_page(&self, title: &str, content: &str) -> Result<String> {
        let body = self.render(content)?;
        Ok(page(title, &body).into_string())
    }

    /// Renders markdown file at given path.
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or rendering fails
    pub fn render_file(&self, path: impl AsRef<Path>) -> Result<String> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read markdown file")?;
        self.render(&content)
    }

    /// Replaces `<code class="language-X">` contents with highlighted HTML.
    fn highlight_code_blocks(&self, html: &str) -> Result<String> {
        const OPEN: &str = "<code class=\"language-";
        const CLOSE: &str = "</code>";

        let mut result = String::with_capacity(html.len());
        let mut last_end = 0;
        let mut search_pos = 0;

        while let Some(found) = html[search_pos..].find(OPEN) {
            let code_start = search_pos + found;
            let lang_start = code_start + OPEN.len();

            let Some(lang_len) = html[lang_start..].find('"') else {
                search_pos = code_start + 1;
                continue;
            };
            let lang_end = lang_start + lang_len;
            let language = &html[lang_start..lang_end];

            let Some(tag_len) = html[lang_end..].find('>') else {
                search_pos = code_start + 1;
                continue;
            };
            let content_start = lang_end + tag_len + 1;

            let Some(content_len) = html[content_start..].find(CLOSE) else {
                search_pos = code_start + 1;
                continue;
            };
            let content_end = content_start + content_len;

            let decoded = html_decode(&html[content_start..content_end]);
            let highlighted = self
                .highlight_code(&decoded, language)
                .context("Failed to highlight code block")?;

            result.push_str(&html[last_end..code_start]);
            result.push_str(OPEN);
            result.push_str(language);
            result.push_str("\">");
            result.push_str(&highlighted);
            result.push_str(CLOSE);

            last_end = content_end + CLOSE.len();
            search_pos = last_end;
        }

        result.push_str(&html[last_end..]);
        Ok(result)
    }

    /// Highlights code with syntect using `hljs-` prefixed CSS classes.
    fn highlight_code(&self, code: &str, language: &str) -> Result<String> {
        if code.is_empty() {
            return Ok(String::new());
        }

        let Some(syntax) = self
            .syntax_set
            .find_syntax_by_token(language)
            .or_else(|| self.syntax_set.find_syntax_by_extension(language))
        else {
            return Ok(html_escape(code));
        };

        let mut generator = ClassedHTMLGenerator::new_with_class_style(
            syntax,
            &self.syntax_set,
            ClassStyle::SpacedPrefixed { prefix: "hljs-" },
        );

        for line in LinesWithEndings::from(code) {
            generator
                .parse_html_for_line_which_includes_newline(line)
                .context("Failed to parse line for syntax highlighting")?;
        }

        Ok(generator.finalize())
    }
}

impl<'a> Default for MarkdownRenderer<'a> {
    fn default() -> Self {
        Self::new()
    }
}

/// Reverses the entity escaping comrak applies inside code blocks.
fn html_decode(html: &str) -> String {
    html.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Standalone page around rendered markdown.
fn page(title: &str, body: &str) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
            }
            body {
                article class="markdown-body" {
                    (PreEscaped(body))
                }
            }
        }
    }
}
