//! Standard Helvetica metrics and WinAnsi text encoding.

/// Resource name used for Helvetica in generated content streams.
pub const HELVETICA: &str = "Helvetica";

/// Glyph advance widths for Helvetica, ASCII 32..=126, in 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n'..'z'
    334, 260, 334, 584, // '{'..'~'
];

const DEFAULT_WIDTH: u16 = 556;

/// WinAnsi codes 0x80..=0x9F that differ from Latin-1, with Helvetica widths.
const WIN_ANSI_EXTRA: [(char, u8, u16); 27] = [
    ('\u{20ac}', 0x80, 556),  // Euro
    ('\u{201a}', 0x82, 222),  // quotesinglbase
    ('\u{0192}', 0x83, 556),  // florin
    ('\u{201e}', 0x84, 333),  // quotedblbase
    ('\u{2026}', 0x85, 1000), // ellipsis
    ('\u{2020}', 0x86, 556),  // dagger
    ('\u{2021}', 0x87, 556),  // daggerdbl
    ('\u{02c6}', 0x88, 333),  // circumflex
    ('\u{2030}', 0x89, 1000), // perthousand
    ('\u{0160}', 0x8a, 667),  // Scaron
    ('\u{2039}', 0x8b, 333),  // guilsinglleft
    ('\u{0152}', 0x8c, 1000), // OE
    ('\u{017d}', 0x8e, 611),  // Zcaron
    ('\u{2018}', 0x91, 222),  // quoteleft
    ('\u{2019}', 0x92, 222),  // quoteright
    ('\u{201c}', 0x93, 333),  // quotedblleft
    ('\u{201d}', 0x94, 333),  // quotedblright
    ('\u{2022}', 0x95, 350),  // bullet
    ('\u{2013}', 0x96, 556),  // endash
    ('\u{2014}', 0x97, 1000), // emdash
    ('\u{02dc}', 0x98, 333),  // tilde
    ('\u{2122}', 0x99, 1000), // trademark
    ('\u{0161}', 0x9a, 500),  // scaron
    ('\u{203a}', 0x9b, 333),  // guilsinglright
    ('\u{0153}', 0x9c, 944),  // oe
    ('\u{017e}', 0x9e, 500),  // zcaron
    ('\u{0178}', 0x9f, 667),  // Ydieresis
];

fn win_ansi_extra(c: char) -> Option<(u8, u16)> {
    WIN_ANSI_EXTRA
        .iter()
        .find(|(ch, _, _)| *ch == c)
        .map(|&(_, code, width)| (code, width))
}

fn char_width(c: char) -> u16 {
    match c as u32 {
        code @ 32..=126 => HELVETICA_WIDTHS[(code - 32) as usize],
        _ => win_ansi_extra(c).map_or(DEFAULT_WIDTH, |(_, width)| width),
    }
}

/// Width of `text` set in Helvetica at `font_size`, in points.
pub fn text_width(text: &str, font_size: f32) -> f32 {
    let units: u32 = text.chars().map(|c| u32::from(char_width(c))).sum();
    units as f32 * font_size / 1000.0
}

/// Encode text for a simple font with WinAnsiEncoding.
///
/// Latin-1 characters map directly, typographic punctuation and the few
/// other cp1252 glyphs map into 0x80..=0x9F, anything else becomes `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            code @ 0x20..=0x7e | code @ 0xa0..=0xff => code as u8,
            0x09 => b' ',
            _ => win_ansi_extra(c).map_or(b'?', |(code, _)| code),
        })
        .collect()
}

/// Greedy word wrap against Helvetica metrics.
///
/// Words wider than `max_width` are broken at character boundaries. An empty
/// input yields a single empty line so blank paragraphs keep their height.
pub fn wrap_text(text: &str, max_width: f32, font_size: f32) -> Vec<String> {
    let space = text_width(" ", font_size);
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut line_width = 0.0;

    for word in text.split_whitespace() {
        let word_width = text_width(word, font_size);

        if word_width > max_width {
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            line_width = 0.0;
            for c in word.chars() {
                let w = text_width(c.encode_utf8(&mut [0; 4]), font_size);
                if line_width + w > max_width && !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                    line_width = 0.0;
                }
                line.push(c);
                line_width += w;
            }
            continue;
        }

        if line.is_empty() {
            line.push_str(word);
            line_width = word_width;
        } else if line_width + space + word_width <= max_width {
            line.push(' ');
            line.push_str(word);
            line_width += space + word_width;
        } else {
            lines.push(std::mem::replace(&mut line, word.to_string()));
            line_width = word_width;
        }
    }

    if !line.is_empty() || lines.is_empty() {
        lines.push(line);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_width() {
        // "A" = 667 units
        assert!((text_width("A", 10.0) - 6.67).abs() < 1e-4);
        assert_eq!(text_width("", 12.0), 0.0);
    }

    #[test]
    fn test_encode_win_ansi() {
        assert_eq!(encode_win_ansi("Hi é"), vec![b'H', b'i', b' ', 0xe9]);
        assert_eq!(encode_win_ansi("日"), vec![b'?']);
    }

    #[test]
    fn test_encode_win_ansi_typographic() {
        assert_eq!(
            encode_win_ansi("\u{2018}\u{2019}\u{201c}\u{201d}\u{2013}\u{2014}\u{20ac}\u{2026}\u{2022}\u{2122}"),
            vec![0x91, 0x92, 0x93, 0x94, 0x96, 0x97, 0x80, 0x85, 0x95, 0x99]
        );
        assert!((text_width("\u{2014}", 10.0) - 10.0).abs() < 1e-4);
        assert!((text_width("\u{2019}", 10.0) - 2.22).abs() < 1e-4);
    }

    #[test]
    fn test_wrap_preserves_words() {
        let width = text_width("Hello world", 12.0);
        let lines = wrap_text("Hello world this is a test", width, 12.0);
        assert!(lines.len() >= 2);
        assert_eq!(lines.join(" "), "Hello world this is a test");
    }

    #[test]
    fn test_wrap_empty() {
        assert_eq!(wrap_text("", 100.0, 12.0), vec![String::new()]);
    }

    #[test]
    fn test_wrap_breaks_long_words() {
        let lines = wrap_text("Supercalifragilistic", 30.0, 12.0);
        assert!(lines.len() >= 2);
        assert_eq!(lines.concat(), "Supercalifragilistic");
    }
}
