//! Simplified renderings of legislation text.
//!
//! Upstream stores each text version twice: as plain text and as RTF. The
//! RTF matters because amendments are marked with formatting, underline for
//! inserted language and strike-through for removed language. The RTF is
//! reduced to a small HTML fragment that keeps only those marks and
//! paragraph breaks.

/// Normalize plain text: unix line endings, no non-breaking spaces, no
/// trailing whitespace, at most one consecutive blank line.
pub fn simplify_plain(input: &str) -> String {
    let normalized = input.replace("\r\n", "\n").replace('\r', "\n").replace('\u{a0}', " ");

    let mut out = String::with_capacity(normalized.len());
    let mut blank_run = 0;
    for line in normalized.lines().map(str::trim_end) {
        if line.is_empty() {
            blank_run += 1;
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
            if blank_run > 0 {
                out.push('\n');
            }
        }
        blank_run = 0;
        out.push_str(line);
    }
    out
}

/// Destination groups whose content is never rendered.
const SKIPPED_DESTINATIONS: &[&str] = &[
    "fonttbl",
    "colortbl",
    "stylesheet",
    "info",
    "pict",
    "header",
    "footer",
    "headerl",
    "headerr",
    "footerl",
    "footerr",
    "listtable",
    "listoverridetable",
    "rsidtbl",
    "generator",
    "xmlnstbl",
    "themedata",
    "colorschememapping",
    "datastore",
    "latentstyles",
    "object",
    "fldinst",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Format {
    underline: bool,
    strike: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct Group {
    skip: bool,
    format: Format,
}

/// Accumulates rendered paragraphs while tracking which tags are open.
#[derive(Default)]
struct Writer {
    paragraphs: Vec<String>,
    current: String,
    open: Format,
}

impl Writer {
    fn push_char(&mut self, c: char, want: Format) {
        if want != self.open {
            self.close_tags();
            if want.underline {
                self.current.push_str("<u>");
            }
            if want.strike {
                self.current.push_str("<s>");
            }
            self.open = want;
        }
        match c {
            '&' => self.current.push_str("&amp;"),
            '<' => self.current.push_str("&lt;"),
            '>' => self.current.push_str("&gt;"),
            '"' => self.current.push_str("&quot;"),
            c => self.current.push(c),
        }
    }

    fn close_tags(&mut self) {
        if self.open.strike {
            self.current.push_str("</s>");
        }
        if self.open.underline {
            self.current.push_str("</u>");
        }
        self.open = Format::default();
    }

    fn paragraph(&mut self) {
        self.close_tags();
        let text = std::mem::take(&mut self.current);
        self.paragraphs.push(text);
    }

    fn finish(mut self) -> String {
        self.paragraph();
        self.paragraphs
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !is_visually_empty(p))
            .map(|p| format!("<p>{p}</p>"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn is_visually_empty(p: &str) -> bool {
    p.replace("<u>", "").replace("</u>", "").replace("<s>", "").replace("</s>", "").trim().is_empty()
}

/// Reduce an RTF document to `<p>` paragraphs with `<u>`/`<s>` marks.
pub fn simplify_rtf(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut stack: Vec<Group> = Vec::new();
    let mut group = Group::default();
    let mut writer = Writer::default();
    // characters still to drop after a \uN escape
    let mut skip_fallback = 0usize;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '{' => {
                stack.push(group);
                i += 1;
            }
            '}' => {
                group = stack.pop().unwrap_or_default();
                i += 1;
            }
            '\r' | '\n' => i += 1,
            '\\' => {
                i += 1;
                let Some(&next) = chars.get(i) else { break };
                if next.is_ascii_alphabetic() {
                    let start = i;
                    while i < chars.len() && chars[i].is_ascii_alphabetic() {
                        i += 1;
                    }
                    let word: String = chars[start..i].iter().collect();
                    let param_start = i;
                    if i < chars.len() && chars[i] == '-' {
                        i += 1;
                    }
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                    let param: Option<i32> = chars[param_start..i].iter().collect::<String>().parse().ok();
                    if i < chars.len() && chars[i] == ' ' {
                        i += 1;
                    }

                    match word.as_str() {
                        w if SKIPPED_DESTINATIONS.contains(&w) => group.skip = true,
                        "par" | "line" | "sect" if !group.skip => writer.paragraph(),
                        "tab" if !group.skip => writer.push_char(' ', group.format),
                        "ul" | "uld" | "uldb" | "ulw" | "uldash" => group.format.underline = param != Some(0),
                        "ulnone" => group.format.underline = false,
                        "strike" | "striked" => group.format.strike = param != Some(0),
                        "plain" => group.format = Format::default(),
                        "u" => {
                            if let Some(code) = param {
                                let code = if code < 0 { code + 65536 } else { code };
                                if !group.skip
                                    && let Some(ch) = u32::try_from(code).ok().and_then(char::from_u32)
                                {
                                    writer.push_char(ch, group.format);
                                }
                                skip_fallback = 1;
                            }
                        }
                        _ => {}
                    }
                    continue;
                }

                i += 1;
                let literal = match next {
                    '\\' | '{' | '}' => Some(next),
                    '~' => Some(' '),
                    '_' => Some('-'),
                    '*' => {
                        group.skip = true;
                        None
                    }
                    '\'' => {
                        let hex: String = chars.iter().skip(i).take(2).collect();
                        i += hex.chars().count();
                        u8::from_str_radix(&hex, 16).ok().map(decode_cp1252)
                    }
                    '\r' | '\n' => {
                        if !group.skip {
                            writer.paragraph();
                        }
                        None
                    }
                    _ => None,
                };
                if let Some(ch) = literal {
                    if skip_fallback > 0 {
                        skip_fallback -= 1;
                    } else if !group.skip {
                        writer.push_char(ch, group.format);
                    }
                }
            }
            c => {
                i += 1;
                if skip_fallback > 0 {
                    skip_fallback -= 1;
                } else if !group.skip {
                    writer.push_char(c, group.format);
                }
            }
        }
    }

    writer.finish()
}

/// Map a Windows-1252 byte to a char; only the punctuation block differs
/// from Latin-1 in practice.
fn decode_cp1252(byte: u8) -> char {
    match byte {
        0x91 => '\u{2018}',
        0x92 => '\u{2019}',
        0x93 => '\u{201c}',
        0x94 => '\u{201d}',
        0x95 => '\u{2022}',
        0x96 => '\u{2013}',
        0x97 => '\u{2014}',
        0xa0 => ' ',
        b => char::from(b),
    }
}
