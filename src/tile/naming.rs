//! Output naming templates.
//!
//! Deployments disagree on how pages are named, so file and chapter directory
//! names are rendered from a small template language:
//!
//! | Placeholder  | Value                                             |
//! |--------------|---------------------------------------------------|
//! | `{title}`    | Series title, lower-cased, whitespace → separator |
//! | `{chapter}`  | Chapter identifier as given                       |
//! | `{page}`     | Page index, unpadded                              |
//! | `{page:0N}`  | Page index, zero-padded to `N` digits             |
//! | `{ext}`      | Extension of the output encoding (no dot)         |
//!
//! `{{` and `}}` produce literal braces.
//!
//! Templates seen in practice:
//!
//! - `page_{page}.{ext}` (default, inside `{title}/chapter_{chapter}/`)
//! - `{title}_chapter{chapter}_{page:02}.{ext}`
//! - `{title}-chapter{chapter}-{page}.{ext}`
//! - `chapter{chapter}_{page:02}.{ext}`

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::TemplateError;

/// Default file name template.
pub const DEFAULT_FILE_TEMPLATE: &str = "page_{page}.{ext}";

/// Default chapter directory template.
pub const DEFAULT_CHAPTER_DIR_TEMPLATE: &str = "chapter_{chapter}";

/// Default replacement for whitespace in series titles.
pub const DEFAULT_TITLE_SEPARATOR: &str = "_";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Title,
    Chapter,
    Page { width: usize },
    Ext,
}

/// A parsed naming template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl NamingTemplate {
    /// Parse any template.
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '{' if matches!(chars.peek(), Some((_, '{'))) => {
                    chars.next();
                    literal.push('{');
                }
                '}' if matches!(chars.peek(), Some((_, '}'))) => {
                    chars.next();
                    literal.push('}');
                }
                '}' => return Err(TemplateError::UnmatchedClose(pos)),
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for (_, c) in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        name.push(c);
                    }
                    if !closed {
                        return Err(TemplateError::Unclosed(pos));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(parse_placeholder(&name)?);
                }
                '/' | '\\' => return Err(TemplateError::PathSeparator(template.to_string())),
                c => literal.push(c),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: template.to_string(),
            segments,
        })
    }

    /// Parse a tile file name template; it must reference the page index.
    pub fn parse_file_name(template: &str) -> Result<Self, TemplateError> {
        let parsed = Self::parse(template)?;
        if !parsed.has_page() {
            return Err(TemplateError::MissingPage(template.to_string()));
        }
        Ok(parsed)
    }

    /// Parse a chapter directory template; page and extension are not known there.
    pub fn parse_dir(template: &str) -> Result<Self, TemplateError> {
        let parsed = Self::parse(template)?;
        for segment in &parsed.segments {
            match segment {
                Segment::Page { .. } => {
                    return Err(TemplateError::UnknownPlaceholder("page".to_string()))
                }
                Segment::Ext => return Err(TemplateError::UnknownPlaceholder("ext".to_string())),
                _ => {}
            }
        }
        Ok(parsed)
    }

    /// Whether the template contains a page placeholder.
    pub fn has_page(&self) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, Segment::Page { .. }))
    }

    /// The original template text.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Render a file name for `page` with extension `ext`.
    pub fn render(&self, context: &NamingContext, page: u32, ext: &str) -> String {
        let mut out = String::with_capacity(self.source.len() + 16);
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::Title => out.push_str(&context.normalized_title()),
                Segment::Chapter => out.push_str(&context.chapter_component()),
                Segment::Page { width } => out.push_str(&format!("{page:0width$}")),
                Segment::Ext => out.push_str(ext),
            }
        }
        out
    }

    /// Render a directory name (page and extension unused).
    pub fn render_dir(&self, context: &NamingContext) -> String {
        self.render(context, 0, "")
    }
}

fn parse_placeholder(name: &str) -> Result<Segment, TemplateError> {
    match name {
        "title" => Ok(Segment::Title),
        "chapter" => Ok(Segment::Chapter),
        "page" => Ok(Segment::Page { width: 0 }),
        "ext" => Ok(Segment::Ext),
        _ => {
            // {page:0N}
            let width = name
                .strip_prefix("page:0")
                .and_then(|w| w.parse::<usize>().ok())
                .filter(|w| *w > 0 && *w <= 10);
            match width {
                Some(width) => Ok(Segment::Page { width }),
                None => Err(TemplateError::UnknownPlaceholder(name.to_string())),
            }
        }
    }
}

impl FromStr for NamingTemplate {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for NamingTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl Default for NamingTemplate {
    fn default() -> Self {
        Self {
            source: DEFAULT_FILE_TEMPLATE.to_string(),
            segments: vec![
                Segment::Literal("page_".to_string()),
                Segment::Page { width: 0 },
                Segment::Literal(".".to_string()),
                Segment::Ext,
            ],
        }
    }
}

// =============================================================================
// Naming Context
// =============================================================================

/// Inputs to naming: which series and chapter the tiles belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingContext {
    /// Series title as given by the caller
    pub title: String,

    /// Chapter identifier (number or folder name)
    pub chapter: String,

    /// Replacement for whitespace in the title
    pub separator: String,
}

impl NamingContext {
    pub fn new(title: impl Into<String>, chapter: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            chapter: chapter.into(),
            separator: DEFAULT_TITLE_SEPARATOR.to_string(),
        }
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Lower-cased title with every whitespace character replaced by the separator.
    ///
    /// The result is always a single path component: path separators are
    /// replaced as well, and a title made only of dots has them replaced.
    pub fn normalized_title(&self) -> String {
        let mut out = String::with_capacity(self.title.len());
        for c in self.title.trim().chars() {
            if c.is_whitespace() || is_path_separator(c) {
                out.push_str(&self.separator);
            } else {
                out.extend(c.to_lowercase());
            }
        }
        path_component(out)
    }

    /// Chapter identifier as a single path component.
    pub fn chapter_component(&self) -> String {
        path_component(self.chapter.replace(is_path_separator, DEFAULT_TITLE_SEPARATOR))
    }
}

fn is_path_separator(c: char) -> bool {
    matches!(c, '/' | '\\')
}

/// Make `name` safe to join onto a directory: no separators (even from a
/// custom separator string), not empty, not `.` or `..`.
fn path_component(name: String) -> String {
    let name = if name.contains(is_path_separator) {
        name.replace(is_path_separator, DEFAULT_TITLE_SEPARATOR)
    } else {
        name
    };

    if name.is_empty() || name.chars().all(|c| c == '.') {
        DEFAULT_TITLE_SEPARATOR.repeat(name.len().max(1))
    } else {
        name
    }
}

// =============================================================================
// Output Layout
// =============================================================================

/// Filesystem layout for tiled chapters:
/// `<root>/<normalized title>/<chapter_dir>/<file_name>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    pub chapter_dir: NamingTemplate,
    pub file_name: NamingTemplate,
}

impl OutputLayout {
    pub fn new(chapter_dir: NamingTemplate, file_name: NamingTemplate) -> Self {
        Self {
            chapter_dir,
            file_name,
        }
    }

    /// Build a layout from template strings.
    pub fn from_templates(chapter_dir: &str, file_name: &str) -> Result<Self, TemplateError> {
        Ok(Self {
            chapter_dir: NamingTemplate::parse_dir(chapter_dir)?,
            file_name: NamingTemplate::parse_file_name(file_name)?,
        })
    }

    /// Directory receiving the tiles of one chapter.
    pub fn chapter_path(&self, root: &Path, context: &NamingContext) -> PathBuf {
        root.join(context.normalized_title())
            .join(self.chapter_dir.render_dir(context))
    }
}

impl Default for OutputLayout {
    fn default() -> Self {
        Self {
            chapter_dir: NamingTemplate {
                source: DEFAULT_CHAPTER_DIR_TEMPLATE.to_string(),
                segments: vec![Segment::Literal("chapter_".to_string()), Segment::Chapter],
            },
            file_name: NamingTemplate::default(),
        }
    }
}
