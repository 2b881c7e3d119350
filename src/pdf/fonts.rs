//! Font metrics and character decoding for laid-out text
//!
//! Only what is needed to place spans on the page: glyph advance widths and a
//! best-effort mapping from character codes to Unicode text.

use std::collections::HashMap;
use lopdf::{Dictionary, Document, Object};
use crate::pdf::resources::{get_resolved, name_str, number, resolve};

/// Width used when a font gives no usable metrics (1/1000 em)
const FALLBACK_WIDTH: f32 = 500.0;

/// One decoded character code
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    /// Unicode text for the code (may be empty or several chars)
    pub text: String,
    /// Advance width in 1/1000 text space units
    pub width: f32,
    /// Single-byte code 32, which receives word spacing
    pub is_word_space: bool,
}

#[derive(Debug, Clone)]
enum Widths {
    /// Simple font: /FirstChar + /Widths
    Simple {
        first_char: u32,
        widths: Vec<f32>,
        missing: f32,
    },
    /// CID font: /DW + /W
    Cid {
        default: f32,
        map: HashMap<u32, f32>,
        /// `c_first c_last w` entries, kept as ranges
        ranges: Vec<(u32, u32, f32)>,
    },
    /// Standard font without a widths array
    Helvetica,
}

/// Metrics and decoding table for one font resource
#[derive(Debug, Clone)]
pub struct FontInfo {
    pub base_font: String,
    two_byte: bool,
    widths: Widths,
    to_unicode: Option<ToUnicode>,
    /// Simple font codes renamed by `/Encoding /Differences`
    differences: HashMap<u32, char>,
}

impl FontInfo {
    /// The built-in Helvetica face used for replacement text
    pub fn helvetica() -> Self {
        Self {
            base_font: "Helvetica".to_string(),
            two_byte: false,
            widths: Widths::Helvetica,
            to_unicode: None,
            differences: HashMap::new(),
        }
    }

    /// Read a font dictionary
    pub fn from_dict(doc: &Document, dict: &Dictionary) -> Self {
        let base_font = get_resolved(doc, dict, b"BaseFont")
            .and_then(name_str)
            .unwrap_or_default();
        let subtype = get_resolved(doc, dict, b"Subtype")
            .and_then(name_str)
            .unwrap_or_default();

        let to_unicode = match get_resolved(doc, dict, b"ToUnicode") {
            Some(Object::Stream(stream)) => {
                let data = stream
                    .decompressed_content()
                    .unwrap_or_else(|_| stream.content.clone());
                Some(ToUnicode::parse(&data))
            }
            _ => None,
        };

        if subtype == "Type0" {
            let descendant = match get_resolved(doc, dict, b"DescendantFonts") {
                Some(Object::Array(fonts)) => fonts.first().map(|f| resolve(doc, f)),
                _ => None,
            };
            let widths = match descendant {
                Some(Object::Dictionary(cid_font)) => cid_widths(doc, cid_font),
                _ => Widths::Cid { default: 1000.0, map: HashMap::new(), ranges: Vec::new() },
            };
            return Self { base_font, two_byte: true, widths, to_unicode, differences: HashMap::new() };
        }

        let widths = match get_resolved(doc, dict, b"Widths") {
            Some(Object::Array(array)) => {
                let first_char = get_resolved(doc, dict, b"FirstChar")
                    .and_then(number)
                    .unwrap_or(0.0) as u32;
                let missing = match get_resolved(doc, dict, b"FontDescriptor") {
                    Some(Object::Dictionary(descriptor)) => get_resolved(doc, descriptor, b"MissingWidth")
                        .and_then(number)
                        .unwrap_or(0.0),
                    _ => 0.0,
                };
                Widths::Simple {
                    first_char,
                    widths: array
                        .iter()
                        .map(|w| number(resolve(doc, w)).unwrap_or(missing))
                        .collect(),
                    missing,
                }
            }
            // Standard 14 fonts carry no widths; Helvetica metrics are close enough for placement
            _ => Widths::Helvetica,
        };

        let differences = match get_resolved(doc, dict, b"Encoding") {
            Some(Object::Dictionary(encoding)) => encoding_differences(doc, encoding),
            _ => HashMap::new(),
        };

        Self { base_font, two_byte: false, widths, to_unicode, differences }
    }

    /// Advance width for a character code in 1/1000 em
    pub fn width(&self, code: u32) -> f32 {
        match &self.widths {
            Widths::Simple { first_char, widths, missing } => code
                .checked_sub(*first_char)
                .and_then(|i| widths.get(i as usize).copied())
                .filter(|w| *w > 0.0)
                .unwrap_or(if *missing > 0.0 { *missing } else { FALLBACK_WIDTH }),
            Widths::Cid { default, map, ranges } => map
                .get(&code)
                .copied()
                .or_else(|| {
                    ranges
                        .iter()
                        .find(|(first, last, _)| (*first..=*last).contains(&code))
                        .map(|(_, _, w)| *w)
                })
                .unwrap_or(*default),
            Widths::Helvetica => helvetica_width(code),
        }
    }

    /// Split a shown string into glyphs
    pub fn decode(&self, bytes: &[u8]) -> Vec<Glyph> {
        let codes: Vec<u32> = if self.two_byte {
            bytes
                .chunks(2)
                .map(|pair| pair.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b)))
                .collect()
        } else {
            bytes.iter().map(|b| u32::from(*b)).collect()
        };

        codes
            .into_iter()
            .map(|code| Glyph {
                text: self.unicode(code),
                width: self.width(code),
                is_word_space: !self.two_byte && code == 32,
            })
            .collect()
    }

    fn unicode(&self, code: u32) -> String {
        if let Some(text) = self.to_unicode.as_ref().and_then(|map| map.lookup(code)) {
            return text;
        }
        if self.two_byte {
            return char::REPLACEMENT_CHARACTER.to_string();
        }
        if let Some(c) = self.differences.get(&code) {
            return c.to_string();
        }
        // Simple fonts: ASCII plus Latin-1 is what label generators emit
        char::from_u32(code)
            .filter(|c| !c.is_control())
            .map(|c| c.to_string())
            .unwrap_or_default()
    }
}

/// Parse /DW and /W from a CIDFont dictionary
fn cid_widths(doc: &Document, cid_font: &Dictionary) -> Widths {
    let default = get_resolved(doc, cid_font, b"DW")
        .and_then(number)
        .unwrap_or(1000.0);
    let mut map = HashMap::new();
    let mut ranges = Vec::new();

    if let Some(Object::Array(entries)) = get_resolved(doc, cid_font, b"W") {
        // Either `c [w1 w2 ...]` or `c_first c_last w`
        let entries: Vec<&Object> = entries.iter().map(|e| resolve(doc, e)).collect();
        let mut i = 0;
        while i < entries.len() {
            let Some(first) = number(entries[i]) else { break };
            match entries.get(i + 1) {
                Some(Object::Array(widths)) => {
                    for (offset, w) in widths.iter().enumerate() {
                        let code = (first as u32).checked_add(offset as u32);
                        if let (Some(code), Some(w)) = (code, number(resolve(doc, w))) {
                            map.insert(code, w);
                        }
                    }
                    i += 2;
                }
                Some(last) => {
                    let (Some(last), Some(w)) = (number(last), entries.get(i + 2).and_then(|w| number(w))) else {
                        break;
                    };
                    ranges.push((first as u32, last as u32, w));
                    i += 3;
                }
                None => break,
            }
        }
    }

    Widths::Cid { default, map, ranges }
}

/// Code to character table from an encoding dictionary's /Differences
///
/// A number sets the next code; each following glyph name takes one code.
/// Names without a known character are left out.
fn encoding_differences(doc: &Document, encoding: &Dictionary) -> HashMap<u32, char> {
    let mut table = HashMap::new();
    let Some(Object::Array(entries)) = get_resolved(doc, encoding, b"Differences") else {
        return table;
    };

    let mut code = 0u32;
    for entry in entries.iter().map(|e| resolve(doc, e)) {
        if let Some(n) = number(entry) {
            code = n.max(0.0) as u32;
        } else if let Some(name) = name_str(entry) {
            if let Some(c) = glyph_char(&name) {
                table.insert(code, c);
            }
            code = code.saturating_add(1);
        }
    }
    table
}

/// Character for an Adobe glyph name (ASCII, common WinAnsi and `uniXXXX`)
fn glyph_char(name: &str) -> Option<char> {
    // Variants such as `B.sc` or `a.alt` share the base glyph
    let name = name.split('.').next().unwrap_or(name);

    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return c.is_ascii_alphabetic().then_some(c);
    }
    if let Some(hex) = name.strip_prefix("uni").or_else(|| name.strip_prefix('u')) {
        if (4..=6).contains(&hex.len()) {
            if let Some(c) = u32::from_str_radix(hex, 16).ok().and_then(char::from_u32) {
                return Some(c);
            }
        }
    }
    if let Some(digit) = DIGIT_NAMES.iter().position(|d| *d == name) {
        return char::from_digit(digit as u32, 10);
    }

    let c = match name {
        "space" | "nbspace" => ' ',
        "exclam" => '!',
        "quotedbl" => '"',
        "numbersign" => '#',
        "dollar" => '$',
        "percent" => '%',
        "ampersand" => '&',
        "quotesingle" => '\'',
        "parenleft" => '(',
        "parenright" => ')',
        "asterisk" => '*',
        "plus" => '+',
        "comma" => ',',
        "hyphen" | "minus" => '-',
        "period" => '.',
        "slash" => '/',
        "colon" => ':',
        "semicolon" => ';',
        "less" => '<',
        "equal" => '=',
        "greater" => '>',
        "question" => '?',
        "at" => '@',
        "bracketleft" => '[',
        "backslash" => '\\',
        "bracketright" => ']',
        "asciicircum" => '^',
        "underscore" => '_',
        "grave" => '`',
        "braceleft" => '{',
        "bar" => '|',
        "braceright" => '}',
        "asciitilde" => '~',
        "quoteleft" => '\u{2018}',
        "quoteright" => '\u{2019}',
        "quotedblleft" => '\u{201C}',
        "quotedblright" => '\u{201D}',
        "endash" => '\u{2013}',
        "emdash" => '\u{2014}',
        "bullet" => '\u{2022}',
        "degree" => '\u{B0}',
        "copyright" => '\u{A9}',
        "registered" => '\u{AE}',
        "trademark" => '\u{2122}',
        _ => return None,
    };
    Some(c)
}

const DIGIT_NAMES: [&str; 10] = [
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine",
];

/// Helvetica advance width for a WinAnsi code
pub fn helvetica_width(code: u32) -> f32 {
    match code {
        32..=126 => HELVETICA_WIDTHS[(code - 32) as usize] as f32,
        _ => 556.0,
    }
}

/// Width of a string set in Helvetica, in text space units at `font_size`
pub fn helvetica_text_width(text: &str, font_size: f32) -> f32 {
    text.chars()
        .map(|c| helvetica_width(c as u32))
        .sum::<f32>()
        * font_size
        / 1000.0
}

/// Helvetica glyph widths for chars 32-126, in 1/1000ths of the em square
const HELVETICA_WIDTHS: [u16; 95] = [
    278,  // 32 space
    278,  // 33 !
    355,  // 34 "
    556,  // 35 #
    556,  // 36 $
    889,  // 37 %
    667,  // 38 &
    191,  // 39 '
    333,  // 40 (
    333,  // 41 )
    389,  // 42 *
    584,  // 43 +
    278,  // 44 ,
    333,  // 45 -
    278,  // 46 .
    278,  // 47 /
    556,  // 48 0
    556,  // 49 1
    556,  // 50 2
    556,  // 51 3
    556,  // 52 4
    556,  // 53 5
    556,  // 54 6
    556,  // 55 7
    556,  // 56 8
    556,  // 57 9
    278,  // 58 :
    278,  // 59 ;
    584,  // 60 <
    584,  // 61 =
    584,  // 62 >
    556,  // 63 ?
    1015, // 64 @
    667,  // 65 A
    667,  // 66 B
    722,  // 67 C
    722,  // 68 D
    667,  // 69 E
    611,  // 70 F
    778,  // 71 G
    722,  // 72 H
    278,  // 73 I
    500,  // 74 J
    667,  // 75 K
    556,  // 76 L
    833,  // 77 M
    722,  // 78 N
    778,  // 79 O
    667,  // 80 P
    778,  // 81 Q
    722,  // 82 R
    667,  // 83 S
    611,  // 84 T
    722,  // 85 U
    667,  // 86 V
    944,  // 87 W
    667,  // 88 X
    667,  // 89 Y
    611,  // 90 Z
    278,  // 91 [
    278,  // 92 \
    278,  // 93 ]
    469,  // 94 ^
    556,  // 95 _
    333,  // 96 `
    556,  // 97 a
    556,  // 98 b
    500,  // 99 c
    556,  // 100 d
    556,  // 101 e
    278,  // 102 f
    556,  // 103 g
    556,  // 104 h
    222,  // 105 i
    222,  // 106 j
    500,  // 107 k
    222,  // 108 l
    833,  // 109 m
    556,  // 110 n
    556,  // 111 o
    556,  // 112 p
    556,  // 113 q
    333,  // 114 r
    500,  // 115 s
    278,  // 116 t
    556,  // 117 u
    500,  // 118 v
    722,  // 119 w
    500,  // 120 x
    500,  // 121 y
    500,  // 122 z
    334,  // 123 {
    260,  // 124 |
    334,  // 125 }
    584,  // 126 ~
];

/// Code to Unicode mapping from a /ToUnicode CMap
#[derive(Debug, Clone, Default)]
pub struct ToUnicode {
    chars: HashMap<u32, String>,
    ranges: Vec<(u32, u32, RangeTarget)>,
}

#[derive(Debug, Clone)]
enum RangeTarget {
    /// Destination of the first code, incremented along the range
    Offset(Vec<u16>),
    /// One destination per code
    List(Vec<String>),
}

#[derive(Debug, PartialEq)]
enum CMapToken {
    Hex(Vec<u8>),
    ArrayStart,
    ArrayEnd,
    Word(String),
}

impl ToUnicode {
    /// Parse the bfchar and bfrange sections of a CMap stream
    pub fn parse(data: &[u8]) -> Self {
        let tokens = tokenize_cmap(data);
        let mut cmap = ToUnicode::default();
        let mut i = 0;

        while i < tokens.len() {
            match &tokens[i] {
                CMapToken::Word(w) if w == "beginbfchar" => {
                    i += 1;
                    while let (Some(CMapToken::Hex(src)), Some(CMapToken::Hex(dst))) =
                        (tokens.get(i), tokens.get(i + 1))
                    {
                        cmap.chars.insert(code_of(src), utf16_text(dst));
                        i += 2;
                    }
                }
                CMapToken::Word(w) if w == "beginbfrange" => {
                    i += 1;
                    while let (Some(CMapToken::Hex(lo)), Some(CMapToken::Hex(hi))) =
                        (tokens.get(i), tokens.get(i + 1))
                    {
                        let (lo, hi) = (code_of(lo), code_of(hi));
                        match tokens.get(i + 2) {
                            Some(CMapToken::Hex(dst)) => {
                                cmap.ranges.push((lo, hi, RangeTarget::Offset(utf16_units(dst))));
                                i += 3;
                            }
                            Some(CMapToken::ArrayStart) => {
                                let mut list = Vec::new();
                                i += 3;
                                while let Some(CMapToken::Hex(dst)) = tokens.get(i) {
                                    list.push(utf16_text(dst));
                                    i += 1;
                                }
                                if tokens.get(i) == Some(&CMapToken::ArrayEnd) {
                                    i += 1;
                                }
                                cmap.ranges.push((lo, hi, RangeTarget::List(list)));
                            }
                            _ => break,
                        }
                    }
                }
                _ => i += 1,
            }
        }

        cmap
    }

    pub fn lookup(&self, code: u32) -> Option<String> {
        if let Some(text) = self.chars.get(&code) {
            return Some(text.clone());
        }
        self.ranges
            .iter()
            .find(|(lo, hi, _)| (*lo..=*hi).contains(&code))
            .and_then(|(lo, _, target)| match target {
                RangeTarget::Offset(units) => {
                    let mut units = units.clone();
                    let last = units.last_mut()?;
                    *last = last.checked_add((code - lo) as u16)?;
                    String::from_utf16(&units).ok()
                }
                RangeTarget::List(list) => list.get((code - lo) as usize).cloned(),
            })
    }
}

fn tokenize_cmap(data: &[u8]) -> Vec<CMapToken> {
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < data.len() {
        match data[i] {
            b'<' if data.get(i + 1) == Some(&b'<') => i += 2,
            b'>' if data.get(i + 1) == Some(&b'>') => i += 2,
            b'<' => {
                let end = data[i..].iter().position(|&b| b == b'>').map_or(data.len(), |p| i + p);
                let digits: Vec<u8> = data[i + 1..end]
                    .iter()
                    .filter(|b| b.is_ascii_hexdigit())
                    .copied()
                    .collect();
                tokens.push(CMapToken::Hex(hex_bytes(&digits)));
                i = end + 1;
            }
            b'[' => {
                tokens.push(CMapToken::ArrayStart);
                i += 1;
            }
            b']' => {
                tokens.push(CMapToken::ArrayEnd);
                i += 1;
            }
            b'%' => {
                while i < data.len() && data[i] != b'\n' && data[i] != b'\r' {
                    i += 1;
                }
            }
            b if b.is_ascii_whitespace() => i += 1,
            _ => {
                let start = i;
                while i < data.len()
                    && !data[i].is_ascii_whitespace()
                    && !matches!(data[i], b'<' | b'>' | b'[' | b']' | b'%')
                {
                    i += 1;
                }
                tokens.push(CMapToken::Word(String::from_utf8_lossy(&data[start..i]).into_owned()));
            }
        }
    }

    tokens
}

fn hex_bytes(digits: &[u8]) -> Vec<u8> {
    let nibble = |d: u8| (d as char).to_digit(16).unwrap_or(0) as u8;
    digits
        .chunks(2)
        .map(|pair| {
            let hi = nibble(pair[0]);
            let lo = pair.get(1).map_or(0, |d| nibble(*d));
            (hi << 4) | lo
        })
        .collect()
}

fn code_of(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b))
}

fn utf16_units(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks(2)
        .map(|pair| match pair {
            [hi, lo] => u16::from_be_bytes([*hi, *lo]),
            [single] => u16::from(*single),
            _ => 0,
        })
        .collect()
}

fn utf16_text(bytes: &[u8]) -> String {
    String::from_utf16_lossy(&utf16_units(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    #[test]
    fn test_helvetica_widths() {
        assert_eq!(helvetica_width(b' ' as u32), 278.0);
        assert_eq!(helvetica_width(b'B' as u32), 667.0);
        assert_eq!(helvetica_width(b'0' as u32), 556.0);
        assert_eq!(helvetica_width(0x2022), 556.0);
        // "Bi" = 667 + 222
        assert!((helvetica_text_width("Bi", 10.0) - 8.89).abs() < 1e-4);
    }

    #[test]
    fn test_simple_font_widths_and_decoding() {
        let doc = Document::with_version("1.5");
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "TrueType",
            "BaseFont" => "Arial",
            "FirstChar" => 65,
            "Widths" => vec![Object::Integer(600), Object::Integer(700)],
        };
        let info = FontInfo::from_dict(&doc, &font);

        assert_eq!(info.base_font, "Arial");
        assert_eq!(info.width(65), 600.0);
        assert_eq!(info.width(66), 700.0);
        assert_eq!(info.width(67), FALLBACK_WIDTH);

        let glyphs = info.decode(b"AB ");
        let text: String = glyphs.iter().map(|g| g.text.as_str()).collect();
        assert_eq!(text, "AB ");
        assert!(glyphs[2].is_word_space);
        assert!(!glyphs[0].is_word_space);
    }

    #[test]
    fn test_standard_font_falls_back_to_helvetica() {
        let doc = Document::with_version("1.5");
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
        };
        let info = FontInfo::from_dict(&doc, &font);
        assert_eq!(info.width(b'B' as u32), 667.0);
    }

    #[test]
    fn test_to_unicode_bfchar_and_bfrange() {
        let cmap = b"/CIDInit /ProcSet findresource begin\n\
            2 beginbfchar\n<0003> <0020>\n<0011> <0042>\nendbfchar\n\
            2 beginbfrange\n<0020> <0022> <0061>\n<0030> <0031> [<0058> <0059>]\nendbfrange\n\
            endcmap";
        let map = ToUnicode::parse(cmap);

        assert_eq!(map.lookup(0x03).as_deref(), Some(" "));
        assert_eq!(map.lookup(0x11).as_deref(), Some("B"));
        assert_eq!(map.lookup(0x20).as_deref(), Some("a"));
        assert_eq!(map.lookup(0x22).as_deref(), Some("c"));
        assert_eq!(map.lookup(0x31).as_deref(), Some("Y"));
        assert_eq!(map.lookup(0x40), None);
    }

    #[test]
    fn test_cid_font_uses_w_array() {
        let mut doc = Document::with_version("1.5");
        let cid_font = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "DW" => 1000,
            "W" => vec![
                Object::Integer(3),
                Object::Array(vec![Object::Integer(250), Object::Integer(300)]),
                Object::Integer(10),
                Object::Integer(12),
                Object::Integer(400),
            ],
        });
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => "Label-Sans",
            "Encoding" => "Identity-H",
            "DescendantFonts" => vec![Object::Reference(cid_font)],
        };
        let info = FontInfo::from_dict(&doc, &font);

        assert_eq!(info.width(3), 250.0);
        assert_eq!(info.width(4), 300.0);
        assert_eq!(info.width(11), 400.0);
        assert_eq!(info.width(99), 1000.0);

        // Two-byte codes without a ToUnicode map decode to replacement chars
        let glyphs = info.decode(&[0x00, 0x03, 0x00, 0x04]);
        assert_eq!(glyphs.len(), 2);
        assert_eq!(glyphs[0].text, "\u{FFFD}");
        assert!(!glyphs[0].is_word_space);
    }

    #[test]
    fn test_open_ended_w_range_is_not_expanded() {
        let mut doc = Document::with_version("1.5");
        let cid_font = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "W" => vec![
                Object::Integer(0),
                Object::Integer(4_294_967_295),
                Object::Integer(500),
                Object::Integer(20),
                Object::Array(vec![Object::Integer(250)]),
            ],
        });
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => "Label-Sans",
            "DescendantFonts" => vec![Object::Reference(cid_font)],
        };
        let info = FontInfo::from_dict(&doc, &font);

        assert_eq!(info.width(7), 500.0);
        assert_eq!(info.width(0xFFFF_FF00), 500.0);
        // Individual widths take precedence over ranges
        assert_eq!(info.width(20), 250.0);
    }

    #[test]
    fn test_differences_rename_simple_font_codes() {
        let doc = Document::with_version("1.5");
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "TrueType",
            "BaseFont" => "ABCDEF+LabelSans",
            "FirstChar" => 1,
            "Widths" => vec![Object::Integer(278); 80],
            "Encoding" => dictionary! {
                "Type" => "Encoding",
                "BaseEncoding" => "WinAnsiEncoding",
                "Differences" => vec![
                    Object::Integer(1),
                    Object::Name(b"colon".to_vec()),
                    Object::Name(b"one".to_vec()),
                    Object::Name(b"uni00E9".to_vec()),
                    Object::Name(b"g123".to_vec()),
                    Object::Integer(65),
                    Object::Name(b"B".to_vec()),
                    Object::Name(b"e".to_vec()),
                    Object::Name(b"s".to_vec()),
                    Object::Name(b"t.alt".to_vec()),
                ],
            },
        };
        let info = FontInfo::from_dict(&doc, &font);

        let text = |bytes: &[u8]| -> String { info.decode(bytes).iter().map(|g| g.text.clone()).collect() };
        assert_eq!(text(b"ABCD"), "Best");
        assert_eq!(text(&[1, 2, 3]), ":1\u{e9}");
        // Codes outside the table keep their plain meaning
        assert_eq!(text(b"EF"), "EF");
        // Unknown glyph names fall back too
        assert_eq!(text(&[4]), "");
    }

    #[test]
    fn test_to_unicode_wins_over_differences() {
        let mut doc = Document::with_version("1.5");
        let cmap = doc.add_object(lopdf::Stream::new(
            dictionary! {},
            b"1 beginbfchar\n<41> <0058>\nendbfchar".to_vec(),
        ));
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "ToUnicode" => cmap,
            "Encoding" => dictionary! {
                "Differences" => vec![Object::Integer(65), Object::Name(b"B".to_vec())],
            },
        };
        let info = FontInfo::from_dict(&doc, &font);
        assert_eq!(info.decode(b"A")[0].text, "X");
    }
}
