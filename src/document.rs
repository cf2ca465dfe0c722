//! Daily-note document model.
//!
//! A note is a YAML front-matter block followed by a markdown body. The body is split on
//! `## ` headings into an ordered list of sections; a heading may carry one leading
//! pictographic glyph (`## ✅ Tasks`) which is kept for rendering but ignored for lookup.
//! Everything before the first heading is the preamble (usually the `# Title` line).
//!
//! All reads and edits go through the parsed [`Document`] and a single [`Document::render`],
//! so section boundaries are derived in exactly one place.

use std::sync::LazyLock;

use regex::Regex;
use serde_yaml::{Mapping, Value};
use unicode_segmentation::UnicodeSegmentation;

use crate::error::NoteError;
use crate::fields::Priority;

pub const TASKS_SECTION: &str = "Tasks";
pub const ACCOMPLISHMENTS_SECTION: &str = "Accomplishments";
pub const NOTES_SECTION: &str = "Notes";

static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^##\s+(\S.*?)\s*$").unwrap());
static SINGLE_LINE_COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*<!--.*-->\s*$").unwrap());
static TASK_LINE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^- \[([ x])\] (.+)$").unwrap());
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#(\w[\w-]*)").unwrap());
static TAG_STRIP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*#\w[\w-]*").unwrap());
static BULLET_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-*] (?:\[[ x]\] )?").unwrap());

/// A heading-delimited region of the note body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Heading text with any leading glyph stripped.
    pub name: String,
    pub glyph: Option<String>,
    /// Content between this heading and the next, without leading/trailing blank lines.
    pub body: String,
}

impl Section {
    pub fn new(name: &str, body: &str, glyph: Option<&str>) -> Self {
        let (parsed_glyph, name) = split_heading(name);
        Section {
            name,
            glyph: glyph.filter(|g| !g.trim().is_empty()).map(|g| g.trim().to_string()).or(parsed_glyph),
            body: trim_blank_lines(body),
        }
    }

    fn heading(&self) -> String {
        match &self.glyph {
            Some(g) => format!("## {} {}", g, self.name),
            None => format!("## {}", self.name),
        }
    }

    fn matches(&self, key: &str) -> bool {
        self.name.to_lowercase() == key
    }
}

/// A checkbox line inside a note's Tasks section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskLine {
    /// Display text with every `#tag` removed.
    pub text: String,
    pub completed: bool,
    pub priority: Priority,
    pub tags: Vec<String>,
    pub raw: String,
}

/// A parsed daily note.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub metadata: Mapping,
    pub preamble: String,
    pub sections: Vec<Section>,
}

/// Parse raw note text into front matter, preamble and ordered sections.
pub fn parse(raw: &str) -> Result<Document, NoteError> {
    let (metadata, body) = split_front_matter(raw)?;

    let mut preamble: Vec<&str> = Vec::new();
    let mut sections: Vec<Section> = Vec::new();
    let mut current: Option<(Option<String>, String, Vec<&str>)> = None;

    for line in body.lines() {
        if let Some(caps) = HEADING_RE.captures(line) {
            if let Some((glyph, name, lines)) = current.take() {
                sections.push(Section { name, glyph, body: trim_blank_lines(&lines.join("\n")) });
            }
            let (glyph, name) = split_heading(&caps[1]);
            current = Some((glyph, name, Vec::new()));
        } else if let Some((_, _, lines)) = current.as_mut() {
            lines.push(line);
        } else {
            preamble.push(line);
        }
    }
    if let Some((glyph, name, lines)) = current {
        sections.push(Section { name, glyph, body: trim_blank_lines(&lines.join("\n")) });
    }

    Ok(Document { metadata, preamble: trim_blank_lines(&preamble.join("\n")), sections })
}

impl Document {
    pub fn new(metadata: Mapping) -> Self {
        Document { metadata, ..Default::default() }
    }

    /// Serialise back to note text. `parse(render(d))` yields a document equal to `d`.
    pub fn render(&self) -> Result<String, NoteError> {
        let mut blocks: Vec<String> = Vec::new();
        if !self.metadata.is_empty() {
            let yaml = serde_yaml::to_string(&self.metadata)?;
            blocks.push(format!("---\n{}---", ensure_newline(&yaml)));
        } else if opens_fence(&self.preamble) {
            // An empty block keeps a leading `---` in the preamble from reading as front matter.
            blocks.push("---\n---".to_string());
        }
        if !self.preamble.is_empty() {
            blocks.push(self.preamble.clone());
        }
        for section in &self.sections {
            if section.body.is_empty() {
                blocks.push(section.heading());
            } else {
                blocks.push(format!("{}\n\n{}", section.heading(), section.body));
            }
        }
        let mut out = blocks.join("\n\n");
        out.push('\n');
        Ok(out)
    }

    /// Case-insensitive, glyph-insensitive lookup; the first section with the name wins.
    pub fn section(&self, name: &str) -> Option<&Section> {
        let key = lookup_key(name);
        self.sections.iter().find(|s| s.matches(&key))
    }

    pub fn section_mut(&mut self, name: &str) -> Option<&mut Section> {
        let key = lookup_key(name);
        self.sections.iter_mut().find(|s| s.matches(&key))
    }

    /// Ordered name → body view with first-occurrence-wins semantics.
    pub fn section_map(&self) -> Vec<(&str, &str)> {
        let mut seen: Vec<String> = Vec::new();
        let mut out = Vec::new();
        for s in &self.sections {
            let key = s.name.to_lowercase();
            if seen.contains(&key) {
                continue;
            }
            seen.push(key);
            out.push((s.name.as_str(), s.body.as_str()));
        }
        out
    }

    #[cfg(test)]
    pub fn metadata_str(&self, key: &str) -> Option<String> {
        match self.metadata.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Replace or append to an existing section's body. Returns `false` if the section
    /// does not exist; new sections are only created through [`Document::push_section`].
    pub fn set_section_body(&mut self, name: &str, content: &str, append: bool) -> bool {
        let Some(section) = self.section_mut(name) else {
            return false;
        };
        let content = trim_blank_lines(content);
        section.body = if append && !section.body.is_empty() {
            if content.is_empty() {
                section.body.clone()
            } else {
                format!("{}\n\n{}", section.body, content)
            }
        } else {
            content
        };
        true
    }

    /// Append a new heading and body at the end of the document. The name must have
    /// visible text besides a glyph and fit on one line; the glyph must be a single emoji.
    pub fn push_section(&mut self, name: &str, content: &str, glyph: Option<&str>) -> Result<(), NoteError> {
        let (_, bare) = split_heading(name);
        if bare.is_empty() || bare.contains('\n') || leading_glyph(&bare).is_some_and(|g| g.len() == bare.len()) {
            return Err(NoteError::InvalidSectionName(name.to_string()));
        }
        if let Some(g) = glyph.map(str::trim).filter(|g| !g.is_empty()) {
            if leading_glyph(g) != Some(g) {
                return Err(NoteError::InvalidGlyph(g.to_string()));
            }
        }
        self.sections.push(Section::new(name, content, glyph));
        Ok(())
    }

    /// Task lines of the Tasks section (empty if the section is absent).
    pub fn tasks(&self) -> Vec<TaskLine> {
        self.section(TASKS_SECTION).map(|s| extract_tasks(&s.body)).unwrap_or_default()
    }

    /// Bullets of the Accomplishments section (empty if the section is absent).
    pub fn accomplishments(&self) -> Vec<String> {
        self.section(ACCOMPLISHMENTS_SECTION).map(|s| extract_bullets(&s.body)).unwrap_or_default()
    }

    /// Add a list item to a section, directly under its last line. Single-line placeholder
    /// comments are dropped. Returns `false` if the section does not exist.
    pub fn append_list_item(&mut self, name: &str, item: &str) -> bool {
        let Some(section) = self.section_mut(name) else {
            return false;
        };
        let mut lines = content_lines(&section.body);
        lines.push(item.to_string());
        section.body = trim_blank_lines(&lines.join("\n"));
        true
    }

    /// Insert a checkbox line into the Tasks section, creating the section if needed.
    /// High-priority lines go to the top; everything else goes after the existing lines.
    pub fn insert_task_line(&mut self, line: &str, priority: Priority) {
        if self.section(TASKS_SECTION).is_none() {
            self.sections.push(Section::new(TASKS_SECTION, "", Some("✅")));
        }
        if let Some(section) = self.section_mut(TASKS_SECTION) {
            let mut lines = content_lines(&section.body);
            if priority == Priority::High {
                lines.insert(0, line.to_string());
            } else {
                lines.push(line.to_string());
            }
            section.body = trim_blank_lines(&lines.join("\n"));
        }
    }

    /// Flip the checkbox of the first task line, in any section, whose clean text starts
    /// with `text` (case-insensitive) and is currently in the opposite state.
    pub fn set_task_completed(&mut self, text: &str, completed: bool) -> bool {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return false;
        }
        for section in &mut self.sections {
            let mut lines: Vec<String> = section.body.lines().map(str::to_string).collect();
            let hit = lines.iter().position(|line| {
                parse_task_line(line)
                    .is_some_and(|t| t.completed != completed && t.text.to_lowercase().starts_with(&needle))
            });
            if let Some(idx) = hit {
                let line = &lines[idx];
                let indent = &line[..line.len() - line.trim_start().len()];
                let rest = &line.trim()[6..];
                let mark = if completed { "x" } else { " " };
                let updated = format!("{indent}- [{mark}] {rest}");
                lines[idx] = updated;
                section.body = lines.join("\n");
                return true;
            }
        }
        false
    }
}

/// Open checkbox line for `text`, tagged with the priority's note tag if it has one.
pub fn format_task_line(text: &str, priority: Priority) -> String {
    match priority.note_tag() {
        Some(tag) => format!("- [ ] {} {}", text.trim(), tag),
        None => format!("- [ ] {}", text.trim()),
    }
}

/// Extract checkbox task lines from a section body. Non-matching lines are ignored.
pub fn extract_tasks(section_text: &str) -> Vec<TaskLine> {
    section_text.lines().filter_map(parse_task_line).collect()
}

fn parse_task_line(line: &str) -> Option<TaskLine> {
    let raw = line.trim();
    let caps = TASK_LINE_RE.captures(raw)?;
    let completed = &caps[1] == "x";
    let body = caps[2].trim();

    let tags: Vec<String> = TAG_RE.captures_iter(body).map(|c| c[1].to_string()).collect();
    let priority = if tags.iter().any(|t| t == "high-priority" || t == "urgent") {
        Priority::High
    } else if tags.iter().any(|t| t == "low-priority") {
        Priority::Low
    } else {
        Priority::Medium
    };
    let text = TAG_STRIP_RE.replace_all(body, "").trim().to_string();

    Some(TaskLine { text, completed, priority, tags, raw: raw.to_string() })
}

/// Extract `- ` / `* ` bullets, stripping a leading checkbox and skipping comments.
pub fn extract_bullets(section_text: &str) -> Vec<String> {
    section_text
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with("- ") || l.starts_with("* "))
        .map(|l| BULLET_PREFIX_RE.replace(l, "").trim().to_string())
        .filter(|t| !t.is_empty() && !t.starts_with("<!--"))
        .collect()
}

/// Split heading text into an optional leading glyph and the section name.
///
/// The glyph is the first grapheme cluster (so `▶️` and ZWJ sequences stay whole) when it
/// starts with a pictographic code point and is followed by whitespace and a name.
pub fn split_heading(text: &str) -> (Option<String>, String) {
    let text = text.trim();
    if let Some(glyph) = leading_glyph(text) {
        let rest = &text[glyph.len()..];
        if rest.starts_with(char::is_whitespace) && !rest.trim().is_empty() {
            return (Some(glyph.to_string()), rest.trim().to_string());
        }
    }
    (None, text.to_string())
}

fn leading_glyph(text: &str) -> Option<&str> {
    let cluster = text.graphemes(true).next()?;
    cluster.chars().next().filter(|c| is_pictographic(*c)).map(|_| cluster)
}

/// Extended_Pictographic code points, with the blocks folded into ranges.
fn is_pictographic(c: char) -> bool {
    matches!(c as u32,
        0x00A9 | 0x00AE | 0x203C | 0x2049 | 0x2122 | 0x2139
        | 0x2194..=0x2199 | 0x21A9..=0x21AA
        | 0x231A..=0x231B | 0x2328 | 0x23CF | 0x23E9..=0x23FA
        | 0x24C2 | 0x25AA..=0x25AB | 0x25B6 | 0x25C0 | 0x25FB..=0x25FE
        | 0x2600..=0x27BF
        | 0x2934..=0x2935 | 0x2B05..=0x2B07 | 0x2B1B..=0x2B1C | 0x2B50 | 0x2B55
        | 0x3030 | 0x303D | 0x3297 | 0x3299
        | 0x1F000..=0x1FAFF
        | 0x1FC00..=0x1FFFD)
}

fn lookup_key(name: &str) -> String {
    split_heading(name).1.to_lowercase()
}

fn split_front_matter(raw: &str) -> Result<(Mapping, &str), NoteError> {
    let raw = raw.strip_prefix('\u{FEFF}').unwrap_or(raw);
    let Some(first_end) = raw.find('\n') else {
        return Ok((Mapping::new(), raw));
    };
    if raw[..first_end].trim_end() != "---" {
        return Ok((Mapping::new(), raw));
    }

    let mut offset = first_end + 1;
    for line in raw[offset..].split_inclusive('\n') {
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed == "..." {
            let yaml = &raw[first_end + 1..offset];
            let body = &raw[offset + line.len()..];
            return Ok((parse_metadata(yaml)?, body));
        }
        offset += line.len();
    }
    // Unterminated block: not front matter.
    Ok((Mapping::new(), raw))
}

fn parse_metadata(yaml: &str) -> Result<Mapping, NoteError> {
    if yaml.trim().is_empty() {
        return Ok(Mapping::new());
    }
    match serde_yaml::from_str::<Value>(yaml)? {
        Value::Mapping(m) => Ok(m),
        Value::Null => Ok(Mapping::new()),
        _ => Err(NoteError::FrontMatterShape),
    }
}

/// Drop leading and trailing blank lines, keeping inner layout and indentation.
pub fn trim_blank_lines(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.iter().position(|l| !l.trim().is_empty());
    let end = lines.iter().rposition(|l| !l.trim().is_empty());
    match (start, end) {
        (Some(s), Some(e)) => lines[s..=e].join("\n"),
        _ => String::new(),
    }
}

/// Body lines minus comments that open and close on the same line. Multi-line comments
/// are kept whole.
fn content_lines(body: &str) -> Vec<String> {
    body.lines()
        .filter(|l| !SINGLE_LINE_COMMENT_RE.is_match(l))
        .map(str::to_string)
        .collect()
}

fn opens_fence(text: &str) -> bool {
    text.lines().next().is_some_and(|l| l.trim_end() == "---")
}

fn ensure_newline(s: &str) -> String {
    if s.ends_with('\n') {
        s.to_string()
    } else {
        format!("{s}\n")
    }
}
