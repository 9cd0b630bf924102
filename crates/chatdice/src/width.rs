// ABOUTME: Width and symbol normalization for chat input.
// ABOUTME: Folds full-width ASCII to half-width, dash and dice symbol variants, and chat escapes.

/// Offset between the full-width ASCII block (U+FF01..=U+FF5E) and ASCII.
const FULL_WIDTH_OFFSET: u32 = 0xFEE0;

/// Convert full-width ASCII variants to their half-width forms.
///
/// Only `U+FF01..=U+FF5E` is touched, so applying this twice is the same as
/// applying it once.
pub fn to_half_width(s: &str) -> String {
    s.chars().map(half_width_char).collect()
}

pub(crate) fn half_width_char(c: char) -> char {
    match c {
        '\u{FF01}'..='\u{FF5E}' => char::from_u32(c as u32 - FULL_WIDTH_OFFSET).unwrap_or(c),
        _ => c,
    }
}

pub(crate) fn is_dash_variant(c: char) -> bool {
    matches!(c, '―' | 'ー' | '—' | '‐')
}

/// Replace the dash look-alikes people type in Japanese IMEs with `-`.
pub fn normalize_dashes(s: &str) -> String {
    s.chars()
        .map(|c| if is_dash_variant(c) { '-' } else { c })
        .collect()
}

/// Normalize the dice and arithmetic symbol variants of a roll expression.
pub fn normalize_dice_symbols(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'Ⅾ' | 'Ð' => 'D',
            '×' => '*',
            '÷' => '/',
            c if is_dash_variant(c) => '-',
            c => c,
        })
        .collect()
}

/// Expand chat escapes: `\n` newline, `\s` space (`\ｓ` ideographic space),
/// `\\` backslash. `￥` works as an escape character too.
///
/// Unknown escapes and a trailing escape character are kept as typed.
pub fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending: Option<char> = None;

    for c in s.chars() {
        match pending.take() {
            Some(escape) => match c {
                'n' | 'ｎ' => out.push('\n'),
                's' => out.push(' '),
                'ｓ' => out.push('\u{3000}'),
                '\\' | '￥' => out.push(c),
                _ => {
                    out.push(escape);
                    out.push(c);
                }
            },
            None if is_escape_char(c) => pending = Some(c),
            None => out.push(c),
        }
    }

    if let Some(escape) = pending {
        out.push(escape);
    }
    out
}

pub(crate) fn is_escape_char(c: char) -> bool {
    c == '\\' || c == '￥'
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_half_width_letters_and_digits() {
        assert_eq!(to_half_width("２Ｄ６＋１"), "2D6+1");
        assert_eq!(to_half_width("ｃｈｏｉｃｅ［ａ，ｂ］"), "choice[a,b]");
    }

    #[test]
    fn test_half_width_leaves_other_characters() {
        assert_eq!(to_half_width("　ダイス ＞ ￥"), "　ダイス > ￥");
        assert_eq!(to_half_width(""), "");
    }

    #[test]
    fn test_dash_variants() {
        assert_eq!(normalize_dashes("1―6"), "1-6");
        assert_eq!(normalize_dashes("a‐c"), "a-c");
    }

    #[test]
    fn test_dice_symbols() {
        assert_eq!(normalize_dice_symbols("2Ⅾ6×3÷2ー1"), "2D6*3/2-1");
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r"a\nb"), "a\nb");
        assert_eq!(unescape(r"a\sb"), "a b");
        assert_eq!(unescape(r"a\\b"), r"a\b");
        assert_eq!(unescape(r"a\xb"), r"a\xb");
        assert_eq!(unescape("a￥ｎb"), "a\nb");
        assert_eq!(unescape(r"trailing\"), r"trailing\");
    }

    proptest! {
        #[test]
        fn half_width_is_idempotent(s in "\\PC*") {
            let once = to_half_width(&s);
            prop_assert_eq!(to_half_width(&once), once);
        }

        #[test]
        fn half_width_keeps_char_count(s in "\\PC*") {
            prop_assert_eq!(to_half_width(&s).chars().count(), s.chars().count());
        }
    }
}
