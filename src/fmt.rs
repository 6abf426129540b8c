use colored::{ColoredString, Colorize};

use crate::models::CostFlags;

/// Background color per hierarchy level, 1-based; deeper levels reuse the
/// last entry.
const LEVEL_COLORS: &[(u8, u8, u8)] = &[
    (0xe8, 0x8b, 0x8b),
    (0xa7, 0xd1, 0xba),
    (0x8e, 0xc6, 0xe2),
    (0xba, 0x8b, 0xa3),
    (0xe0, 0xc2, 0x96),
    (0x9a, 0xa1, 0xe0),
    (0xc7, 0xd3, 0x8d),
    (0xd1, 0xd1, 0xd1),
    (0xc5, 0xa1, 0x8b),
    (0xce, 0x9d, 0xe0),
    (0xa3, 0xe4, 0xaa),
];

pub fn level_color(level: i64) -> (u8, u8, u8) {
    let idx = (level.max(1) as usize - 1).min(LEVEL_COLORS.len() - 1);
    LEVEL_COLORS[idx]
}

/// `CODE - Description`, tinted by level when `color` is set.
pub fn code_line(code: &str, description: &str, level: i64, color: bool) -> ColoredString {
    let text = format!("{code} - {description}");
    if color {
        let (r, g, b) = level_color(level);
        text.black().on_truecolor(r, g, b)
    } else {
        text.normal()
    }
}

/// Two spaces per level below the root.
pub fn indent(level: i64) -> String {
    "  ".repeat(level.max(1) as usize - 1)
}

pub fn flag_labels(flags: CostFlags) -> String {
    if flags.is_empty() {
        return "(none)".to_string();
    }
    flags.iter().map(|f| f.label()).collect::<Vec<_>>().join(", ")
}

/// Wrap `text` to `width`, prefixing continuation lines with `prefix`.
pub fn wrap_block(text: &str, width: usize, prefix: &str) -> String {
    let options = textwrap::Options::new(width).subsequent_indent(prefix);
    text.lines()
        .map(|line| textwrap::fill(line, &options))
        .collect::<Vec<_>>()
        .join(&format!("\n{prefix}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CostFlag;

    #[test]
    fn test_level_color_clamps() {
        assert_eq!(level_color(1), (0xe8, 0x8b, 0x8b));
        assert_eq!(level_color(0), level_color(1));
        assert_eq!(level_color(40), (0xa3, 0xe4, 0xaa));
    }

    #[test]
    fn test_indent() {
        assert_eq!(indent(1), "");
        assert_eq!(indent(3), "    ");
    }

    #[test]
    fn test_flag_labels() {
        assert_eq!(flag_labels(CostFlags::EMPTY), "(none)");
        assert_eq!(
            flag_labels(CostFlag::Labor | CostFlag::GeneralAndAdministrative),
            "Labor, G&A"
        );
    }

    #[test]
    fn test_plain_code_line() {
        colored::control::set_override(false);
        assert_eq!(code_line("1.10", "Grading", 2, false).to_string(), "1.10 - Grading");
    }

    #[test]
    fn test_wrap_block_keeps_paragraphs() {
        let wrapped = wrap_block("one two three\nfour", 8, "  ");
        assert_eq!(wrapped, "one two\n  three\n  four");
    }
}
