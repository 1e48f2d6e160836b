/*!
format.rs

Human-output helpers for the `hollow-dispatch` CLI.

  - StyleOptions::detect() -> StyleOptions   (NO_COLOR / NO_EMOJI / COLUMNS)
  - color(role, text, &StyleOptions) -> String
  - emoji(tag, &StyleOptions) -> &'static str
  - table(headers, rows, &StyleOptions) -> String

JSON output paths do not use these helpers.
*/

use std::borrow::Cow;

#[derive(Debug, Clone)]
pub struct StyleOptions {
    pub use_color: bool,
    pub use_emoji: bool,
    pub term_width: usize,
}

impl Default for StyleOptions {
    fn default() -> Self {
        Self::detect()
    }
}

impl StyleOptions {
    pub fn detect() -> Self {
        let width = std::env::var("COLUMNS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .map(|w| w.clamp(40, 220))
            .unwrap_or(100);

        StyleOptions {
            use_color: std::env::var_os("NO_COLOR").is_none(),
            use_emoji: std::env::var_os("NO_EMOJI").is_none(),
            term_width: width,
        }
    }

    /// No color, no emoji, fixed width. Used by tests.
    pub fn plain() -> Self {
        StyleOptions {
            use_color: false,
            use_emoji: false,
            term_width: 100,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Role {
    Primary,
    Accent,
    Success,
    Warning,
    Error,
    Dim,
}

pub fn color(role: Role, text: impl AsRef<str>, style: &StyleOptions) -> String {
    if !style.use_color {
        return text.as_ref().to_string();
    }
    let code = match role {
        Role::Primary => "38;5;45",
        Role::Accent => "38;5;213",
        Role::Success => "38;5;82",
        Role::Warning => "38;5;214",
        Role::Error => "38;5;196",
        Role::Dim => "2",
    };
    format!("\x1b[{code}m{}\x1b[0m", text.as_ref())
}

pub fn emoji(tag: &str, style: &StyleOptions) -> &'static str {
    if !style.use_emoji {
        return "";
    }
    match tag {
        "success" => "✔",
        "error" => "✖",
        "warn" => "⚠",
        "info" => "ℹ",
        "clock" => "⏱",
        "list" => "📜",
        _ => "",
    }
}

/// Left-aligned columns separated by two spaces, shrinking the widest
/// columns (with an ellipsis) when the row would exceed the terminal width.
pub fn table(headers: &[&str], rows: &[Vec<String>], style: &StyleOptions) -> String {
    if headers.is_empty() {
        return String::new();
    }
    let cols = headers.len();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(cols) {
            widths[i] = widths[i].max(display_width(cell));
        }
    }

    let total: usize = widths.iter().sum::<usize>() + (cols - 1) * 2;
    if total > style.term_width {
        let mut overflow = total - style.term_width;
        let mut order: Vec<usize> = (0..cols).collect();
        order.sort_by(|a, b| widths[*b].cmp(&widths[*a]));
        for idx in order {
            if overflow == 0 {
                break;
            }
            let shrink = widths[idx].saturating_sub(4).min(overflow);
            widths[idx] -= shrink;
            overflow -= shrink;
        }
    }

    let render = |cells: &mut dyn Iterator<Item = &str>| -> String {
        cells
            .enumerate()
            .map(|(i, c)| fit(c, widths[i]))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = Vec::with_capacity(rows.len() + 2);
    out.push(color(
        Role::Accent,
        render(&mut headers.iter().copied()),
        style,
    ));
    out.push(color(
        Role::Dim,
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  "),
        style,
    ));
    for row in rows {
        let mut cells = (0..cols).map(|c| row.get(c).map(String::as_str).unwrap_or(""));
        out.push(render(&mut cells));
    }
    out.join("\n")
}

fn fit(s: &str, width: usize) -> String {
    let len = display_width(s);
    if len <= width {
        return format!("{s}{}", " ".repeat(width - len));
    }
    let plain = strip_ansi(s);
    let mut cut: String = plain.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

fn strip_ansi(s: &str) -> Cow<'_, str> {
    if !s.contains('\x1b') {
        return Cow::Borrowed(s);
    }
    let mut buf = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            for t in chars.by_ref() {
                if t.is_ascii_alphabetic() {
                    break;
                }
            }
            continue;
        }
        buf.push(c);
    }
    Cow::Owned(buf)
}

fn display_width(s: &str) -> usize {
    strip_ansi(s).chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_aligns_columns() {
        let t = table(
            &["NAME", "PRIO"],
            &[
                vec!["heal".into(), "10".into()],
                vec!["say".into(), "0".into()],
            ],
            &StyleOptions::plain(),
        );
        let lines: Vec<&str> = t.lines().collect();
        assert_eq!(lines[0], "NAME  PRIO");
        assert_eq!(lines[1], "----  ----");
        assert_eq!(lines[2], "heal  10");
        assert_eq!(lines[3], "say   0");
    }

    #[test]
    fn table_truncates_wide_cells() {
        let mut style = StyleOptions::plain();
        style.term_width = 20;
        let t = table(&["A", "B"], &[vec!["x".repeat(40), "y".into()]], &style);
        assert!(t.lines().all(|l| l.chars().count() <= 20));
        assert!(t.contains('…'));
    }

    #[test]
    fn strip_ansi_removes_codes() {
        assert_eq!(strip_ansi("\x1b[31mRED\x1b[0m"), "RED");
        let style = StyleOptions {
            use_color: true,
            ..StyleOptions::plain()
        };
        assert_eq!(display_width(&color(Role::Error, "abc", &style)), 3);
    }
}
