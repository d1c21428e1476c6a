//! Deterministic, marker-driven fallback patch.
//!
//! Injects two artifacts into the target module when they are missing:
//!
//! - the sources constant, right after the logger-initialisation line (or at
//!   the top of the file when there is no such line)
//! - the staged/pending lookup method, right after the header of the
//!   anchor class
//!
//! Each artifact is presence-checked through its own marker first, so
//! `apply(apply(x)) == apply(x)`.

use serde::{Deserialize, Serialize};

use crate::domain::{Degradation, PatchmendError, Result};
use crate::pattern::TextPattern;

const DEFAULT_INDENT: &str = "    ";

/// What gets injected and where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatchTemplate {
    /// Module-level constant holding the default sources.
    pub constant_name: String,
    /// Line the constant is placed after (pattern; `literal:` prefix allowed).
    pub constant_anchor: String,
    /// Class receiving the lookup method.
    pub class_name: String,
    pub method_name: String,
    pub sources: Vec<String>,
    pub statuses: Vec<String>,
    pub table: String,
    pub key_column: String,
}

impl Default for PatchTemplate {
    fn default() -> Self {
        Self {
            constant_name: "STAGED_SOURCES".to_string(),
            constant_anchor: r"(?m)^logger[ \t]*=[ \t]*logging\.getLogger\(.*\)[ \t]*\r?$"
                .to_string(),
            class_name: "ImportItem".to_string(),
            method_name: "find_staged_or_pending".to_string(),
            sources: vec!["amazon".to_string(), "idb".to_string()],
            statuses: vec!["staged".to_string(), "pending".to_string()],
            table: "import_item".to_string(),
            key_column: "ia_id".to_string(),
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_plain_literal(value: &str) -> bool {
    !value.is_empty() && !value.contains(['\'', '"', '\\', '\n', '\r'])
}

fn quoted(values: &[String]) -> Vec<String> {
    values.iter().map(|v| format!("'{v}'")).collect()
}

impl PatchTemplate {
    /// Reject templates whose rendering could produce invalid source.
    pub fn validate(&self) -> Result<()> {
        for (field, name) in [
            ("constant_name", &self.constant_name),
            ("class_name", &self.class_name),
            ("method_name", &self.method_name),
            ("table", &self.table),
            ("key_column", &self.key_column),
        ] {
            if !is_identifier(name) {
                return Err(PatchmendError::Config(format!(
                    "patch.{field} must be an identifier, got {name:?}"
                )));
            }
        }
        if self.sources.is_empty() {
            return Err(PatchmendError::Config("patch.sources must not be empty".to_string()));
        }
        if self.statuses.is_empty() {
            return Err(PatchmendError::Config("patch.statuses must not be empty".to_string()));
        }
        if let Some(bad) = self
            .sources
            .iter()
            .chain(&self.statuses)
            .find(|v| !is_plain_literal(v))
        {
            return Err(PatchmendError::Config(format!(
                "patch source/status values must be non-empty and unquoted, got {bad:?}"
            )));
        }
        Ok(())
    }

    /// `STAGED_SOURCES = ('amazon', 'idb')`
    pub fn constant_declaration(&self) -> String {
        let items = quoted(&self.sources);
        let tuple = if items.len() == 1 {
            format!("({},)", items[0])
        } else {
            format!("({})", items.join(", "))
        };
        format!("{} = {}", self.constant_name, tuple)
    }

    /// Static lookup method, every line prefixed with `indent`, trailing
    /// blank line included.
    pub fn method_block(&self, indent: &str) -> String {
        let statuses = quoted(&self.statuses).join(", ");
        let mut out = String::new();
        out.push_str(&format!("{indent}@staticmethod\n"));
        out.push_str(&format!(
            "{indent}def {}(identifiers, sources={}):\n",
            self.method_name, self.constant_name
        ));
        out.push_str(&format!(
            "{indent}{indent}ids = [f\"{{s}}:{{i}}\" for s in sources for i in identifiers]\n"
        ));
        out.push_str(&format!(
            "{indent}{indent}return db.select(\"{}\", where=\"{} in $ids and status in ({})\", vars={{\"ids\": ids}})\n",
            self.table, self.key_column, statuses
        ));
        out.push('\n');
        out
    }

    /// Keys the injected method builds for `identifiers` with the default sources.
    pub fn lookup_keys<I: AsRef<str>>(&self, identifiers: &[I]) -> Vec<String> {
        lookup_keys(&self.sources, identifiers)
    }
}

/// Source-major cross product `source:identifier`.
///
/// Mirrors the comprehension emitted into the lookup method: for every
/// source, for every identifier.
pub fn lookup_keys<S: AsRef<str>, I: AsRef<str>>(sources: &[S], identifiers: &[I]) -> Vec<String> {
    sources
        .iter()
        .flat_map(|s| {
            identifiers
                .iter()
                .map(move |i| format!("{}:{}", s.as_ref(), i.as_ref()))
        })
        .collect()
}

/// Result of one deterministic application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchedContent {
    pub content: String,
    pub constant_inserted: bool,
    pub method_inserted: bool,
    /// Set when an artifact was needed but could not be placed.
    pub degradation: Option<Degradation>,
}

impl PatchedContent {
    pub fn changed(&self) -> bool {
        self.constant_inserted || self.method_inserted
    }
}

/// Idempotent rule-based patcher.
#[derive(Debug, Clone)]
pub struct DeterministicPatcher {
    template: PatchTemplate,
    constant_marker: TextPattern,
    constant_anchor: TextPattern,
    method_marker: TextPattern,
    class_anchor: TextPattern,
}

impl DeterministicPatcher {
    pub fn new(template: PatchTemplate) -> Result<Self> {
        template.validate()?;
        // Plain or annotated assignment; `==` comparisons do not count.
        let constant_marker = TextPattern::regex(&format!(
            r"(?m)^{}[ \t]*(?::[^=\n]*)?=(?:[^=]|$)",
            regex::escape(&template.constant_name)
        ))?;
        let constant_anchor = TextPattern::parse(&template.constant_anchor)?;
        let method_marker = TextPattern::regex(&format!(
            r"(?m)^[ \t]*(?:async[ \t]+)?def[ \t]+{}\b",
            regex::escape(&template.method_name)
        ))?;
        // Only the start of the header; the superclass list and the colon
        // are checked by `class_header_end`.
        let class_anchor = TextPattern::regex(&format!(
            r"(?m)^class[ \t]+{}\b",
            regex::escape(&template.class_name)
        ))?;

        Ok(Self {
            template,
            constant_marker,
            constant_anchor,
            method_marker,
            class_anchor,
        })
    }

    pub fn template(&self) -> &PatchTemplate {
        &self.template
    }

    /// Number of constant declarations in `content`.
    pub fn constant_count(&self, content: &str) -> usize {
        self.constant_marker.count(content)
    }

    pub fn has_constant(&self, content: &str) -> bool {
        self.constant_marker.is_present(content)
    }

    pub fn has_method(&self, content: &str) -> bool {
        self.method_marker.is_present(content)
    }

    /// Apply both insertions. Total: never fails, at worst degrades.
    pub fn apply(&self, content: &str) -> PatchedContent {
        let blank = content.trim().is_empty();
        let mut out = if blank {
            String::new()
        } else {
            content.to_string()
        };

        let constant_inserted = if self.has_constant(&out) {
            false
        } else {
            out = self.insert_constant(&out);
            true
        };

        let mut degradation = None;
        let method_inserted = if self.has_method(&out) {
            false
        } else if blank {
            out.push_str(&format!("\n\nclass {}:\n", self.template.class_name));
            out.push_str(&self.template.method_block(DEFAULT_INDENT));
            true
        } else {
            match self.insert_method(&out) {
                Some(patched) => {
                    out = patched;
                    true
                }
                None => {
                    degradation = Some(Degradation::ClassAnchorMissing);
                    false
                }
            }
        };

        PatchedContent {
            content: out,
            constant_inserted,
            method_inserted,
            degradation,
        }
    }

    fn insert_constant(&self, content: &str) -> String {
        let declaration = format!("{}\n", self.template.constant_declaration());
        let at = match self.constant_anchor.locate(content) {
            Some(span) => span.line_end,
            None => prologue_end(content),
        };
        insert_line_after(content, at, &declaration)
    }

    fn insert_method(&self, content: &str) -> Option<String> {
        let header_end = self
            .class_anchor
            .locate_all(content)
            .find_map(|span| class_header_end(content, span.end))?;
        let indent = body_indent(&content[header_end..]);
        Some(insert_line_after(
            content,
            header_end,
            &self.template.method_block(&indent),
        ))
    }
}

/// Offset just past a block class header whose name ends at `from`.
///
/// Accepts an optional superclass list with nested parentheses, possibly
/// spread over several lines, then `:` and an optional comment closing the
/// line. `None` for anything else, including one-line class bodies.
fn class_header_end(content: &str, from: usize) -> Option<usize> {
    let bytes = content.as_bytes();
    let skip_blanks = |mut i: usize| {
        while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
            i += 1;
        }
        i
    };

    let mut i = skip_blanks(from);
    if bytes.get(i) == Some(&b'(') {
        let mut depth = 0usize;
        loop {
            match *bytes.get(i)? {
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        i += 1;
                        break;
                    }
                }
                _ => {}
            }
            i += 1;
        }
        i = skip_blanks(i);
    }

    if bytes.get(i) != Some(&b':') {
        return None;
    }
    i = skip_blanks(i + 1);
    if bytes.get(i) == Some(&b'#') {
        while i < bytes.len() && bytes[i] != b'\n' {
            i += 1;
        }
    }
    if bytes.get(i) == Some(&b'\r') {
        i += 1;
    }
    match bytes.get(i).copied() {
        None => Some(i),
        Some(b'\n') => Some(i + 1),
        Some(_) => None,
    }
}

/// Offset just past the module prologue: leading comments, the module
/// docstring and `from __future__` imports. Neither of the last two may
/// follow another statement, so an unanchored constant goes after them.
fn prologue_end(content: &str) -> usize {
    let mut lines = content.split_inclusive('\n');
    let mut offset = 0;
    let mut end = 0;
    let mut seen_statement = false;

    while let Some(line) = lines.next() {
        offset += line.len();
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if !seen_statement {
            if let Some((quote, rest)) = docstring_open(trimmed) {
                if quote.len() == 3 && !rest.contains(quote) {
                    for more in lines.by_ref() {
                        offset += more.len();
                        if more.contains(quote) {
                            break;
                        }
                    }
                }
                seen_statement = true;
                end = offset;
                continue;
            }
        }

        if trimmed.starts_with("from __future__ import") {
            if trimmed.contains('(') && !trimmed.contains(')') {
                for more in lines.by_ref() {
                    offset += more.len();
                    if more.contains(')') {
                        break;
                    }
                }
            }
            seen_statement = true;
            end = offset;
            continue;
        }
        break;
    }
    end
}

/// Opening quote of a string-literal statement and the text after it.
fn docstring_open(line: &str) -> Option<(&'static str, &str)> {
    let body = line.trim_start_matches(['r', 'R', 'u', 'U']);
    ["\"\"\"", "'''", "\"", "'"]
        .into_iter()
        .find_map(|q| body.strip_prefix(q).map(|rest| (q, rest)))
}

/// Insert `text` at `at`, which is a line boundary or the end of content.
fn insert_line_after(content: &str, at: usize, text: &str) -> String {
    let mut out = String::with_capacity(content.len() + text.len() + 1);
    out.push_str(&content[..at]);
    if at == content.len() && !content.is_empty() && !content.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(text);
    out.push_str(&content[at..]);
    out
}

/// Indentation of the first non-blank line of a class body.
fn body_indent(body: &str) -> String {
    body.lines()
        .find(|line| !line.trim().is_empty())
        .map(|line| {
            line.chars()
                .take_while(|c| *c == ' ' || *c == '\t')
                .collect::<String>()
        })
        .filter(|indent| !indent.is_empty())
        .unwrap_or_else(|| DEFAULT_INDENT.to_string())
}
