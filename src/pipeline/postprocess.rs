//! Post-processing: deterministic cleanup of model-generated Markdown.
//!
//! The verify and translate prompts spell out a strict layout: an explanation
//! paragraph, a blank line, a `### Key Recommendations` header, a blank line,
//! then 3–4 bullets using one marker. Models get close but drift: they wrap
//! the answer in ```` ```markdown ```` fences, mix `*` and `-` bullets, glue a
//! header to the paragraph above it, or run the next paragraph straight into
//! the list. These rules repair that drift without touching wording.
//!
//! ## Rule Order
//!
//! Fences and line endings first so every later rule sees clean `\n` lines;
//! bullets are unified before list-block spacing so the list detector only
//! needs to know one marker; blank-line collapsing runs after the rules that
//! insert blank lines.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all post-processing rules to a phase 2 or phase 3 answer.
///
/// Rules (applied in order):
/// 1. Strip outer markdown fences
/// 2. Normalise line endings (CRLF → LF)
/// 3. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 4. Trim trailing whitespace per line
/// 5. Unify bullet markers (`*`, `+`, `•` → `-`)
/// 6. Blank line before and after every heading
/// 7. Blank line after every list block
/// 8. Collapse runs of blank lines down to one
/// 9. Trim leading blank lines and end with exactly one newline
pub fn clean_markdown(input: &str) -> String {
    let s = strip_markdown_fences(input);
    let s = normalise_line_endings(&s);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = unify_bullets(&s);
    let s = normalise_heading_spacing(&s);
    let s = space_after_lists(&s);
    let s = collapse_blank_lines(&s);
    ensure_final_newline(&s)
}

// ── Rule 1: Strip outer markdown fences ──────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*[ \t]*\r?\n(.*?)\r?\n```\s*$").unwrap());

/// Remove a single code fence wrapping the whole answer, if present.
pub fn strip_markdown_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 4: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 5: Unify bullet markers ─────────────────────────────────────────────

// `*` and `+` need a following space so `**bold**` lines are left alone;
// `•` is never emphasis, so the space is optional.
static RE_BULLET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^([ \t]*)(?:[*+][ \t]+|•[ \t]*)").unwrap());

fn unify_bullets(input: &str) -> String {
    RE_BULLET.replace_all(input, "${1}- ").to_string()
}

// ── Rule 6: Heading spacing ──────────────────────────────────────────────────

fn is_heading(line: &str) -> bool {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    (1..=6).contains(&hashes) && line[hashes..].starts_with(' ')
}

fn normalise_heading_spacing(input: &str) -> String {
    let lines: Vec<&str> = input.lines().collect();
    let mut out: Vec<&str> = Vec::with_capacity(lines.len() + 8);

    for (i, line) in lines.iter().enumerate() {
        if is_heading(line) && out.last().is_some_and(|prev| !prev.is_empty()) {
            out.push("");
        }
        out.push(line);
        let next = lines.get(i + 1).copied();
        if is_heading(line) && next.is_some_and(|n| !n.is_empty()) {
            out.push("");
        }
    }

    out.join("\n")
}

// ── Rule 7: Blank line after list blocks ─────────────────────────────────────

static RE_LIST_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[ \t]*(?:-[ \t]+|\d+[.)][ \t]+)").unwrap());

fn is_list_item(line: &str) -> bool {
    RE_LIST_ITEM.is_match(line)
}

/// A non-blank line that directly follows a list item and is neither another
/// item nor an indented continuation closes the list: separate it.
fn space_after_lists(input: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut in_list = false;

    for line in input.lines() {
        if is_list_item(line) {
            in_list = true;
        } else if line.is_empty() {
            in_list = false;
        } else if in_list && !line.starts_with([' ', '\t']) {
            out.push("");
            in_list = false;
        }
        out.push(line);
    }

    out.join("\n")
}

// ── Rule 8: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Rule 9: Ensure file ends with single newline ─────────────────────────────

fn ensure_final_newline(input: &str) -> String {
    let trimmed = input.trim_start_matches('\n').trim_end();
    if trimmed.is_empty() {
        String::from("\n")
    } else {
        format!("{}\n", trimmed)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
