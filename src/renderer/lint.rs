//! Table-driven renderer that validates TeX without typesetting it.
//!
//! Hard errors (both modes): unknown control sequences, unbalanced groups,
//! unbalanced `\left`/`\right`, unknown or mismatched environments.
//!
//! Strict mode additionally rejects what KaTeX only warns about or refuses
//! in strict mode: non-ASCII characters outside text groups, text accents
//! in math, scripts without an argument, double scripts, `&` outside an
//! alignment environment and display-only environments in inline math.

use webtex_dom::escape_html;

use crate::normalize::commands::{
    is_known_command, is_text_command, ALIGNMENT_ENVIRONMENTS, DISPLAY_ENVIRONMENTS, ENVIRONMENTS,
};
use crate::normalize::scan::{control_word, matching_brace, skip_ws, utf8_len};
use crate::pipeline::{MathRenderer, RenderOptions};
use crate::utils::error::{RenderError, RenderResult};

/// Validates TeX against the static command tables and wraps it in a
/// `webtex-tex` span.
#[derive(Debug, Default, Clone, Copy)]
pub struct LintRenderer;

impl MathRenderer for LintRenderer {
    fn render(&self, tex: &str, opts: &RenderOptions) -> RenderResult<String> {
        if tex.trim().is_empty() {
            return Err(RenderError::EmptyInput);
        }
        Checker::new(tex, *opts).run()?;
        let mode = if opts.display_mode { "display" } else { "inline" };
        Ok(format!(
            "<span class=\"webtex-tex\" data-mode=\"{}\">{}</span>",
            mode,
            escape_html(tex, false)
        ))
    }
}

const TEXT_ACCENTS: &[u8] = b"'`^~\"=.";

const DELIMITER_COMMANDS: &[&str] = &[
    "langle", "rangle", "lfloor", "rfloor", "lceil", "rceil", "lvert", "rvert", "lVert",
    "rVert", "vert", "Vert", "backslash", "uparrow", "downarrow", "Uparrow", "Downarrow",
    "updownarrow",
];

#[derive(Debug, PartialEq, Eq)]
enum FrameKind {
    Root,
    Group,
    Env(String),
    Left,
}

#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    text: bool,
    sup: bool,
    sub: bool,
    /// A `^`/`_` is waiting for its argument.
    awaiting: bool,
}

impl Frame {
    fn new(kind: FrameKind, text: bool) -> Self {
        Self {
            kind,
            text,
            sup: false,
            sub: false,
            awaiting: false,
        }
    }
}

struct Checker<'a> {
    src: &'a str,
    bytes: &'a [u8],
    opts: RenderOptions,
    frames: Vec<Frame>,
}

impl<'a> Checker<'a> {
    fn new(src: &'a str, opts: RenderOptions) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            opts,
            frames: vec![Frame::new(FrameKind::Root, false)],
        }
    }

    fn run(mut self) -> RenderResult<()> {
        let mut i = 0usize;
        while i < self.bytes.len() {
            let b = self.bytes[i];
            i = match b {
                b' ' | b'\t' | b'\n' | b'\r' => i + 1,
                b'%' => self.src[i..].find('\n').map(|n| i + n + 1).unwrap_or(self.bytes.len()),
                b'{' => {
                    let text = self.in_text();
                    self.atom();
                    self.frames.push(Frame::new(FrameKind::Group, text));
                    i + 1
                }
                b'}' => {
                    self.close_script(i)?;
                    if self.top().kind != FrameKind::Group {
                        return Err(RenderError::syntax("Unexpected '}'", Some(i)));
                    }
                    self.frames.pop();
                    i + 1
                }
                b'^' | b'_' if !self.in_text() => {
                    self.script(b, i)?;
                    i + 1
                }
                b'&' => {
                    self.cell(i)?;
                    i + 1
                }
                b'#' => return Err(RenderError::syntax("Unexpected '#'", Some(i))),
                b'\\' => self.control(i)?,
                _ => {
                    if b >= 0x80 && self.opts.strict && !self.in_text() {
                        return Err(RenderError::syntax(
                            "Unicode text character used in math mode",
                            Some(i),
                        ));
                    }
                    self.atom();
                    i + utf8_len(b)
                }
            };
        }
        self.close_script(self.bytes.len())?;
        let end = self.bytes.len();
        match &self.top().kind {
            FrameKind::Root => Ok(()),
            FrameKind::Group => Err(RenderError::syntax("Expected '}'", Some(end))),
            FrameKind::Env(name) => Err(RenderError::syntax(
                format!("Missing \\end{{{}}}", name),
                Some(end),
            )),
            FrameKind::Left => Err(RenderError::syntax("Missing \\right", Some(end))),
        }
    }

    fn top(&self) -> &Frame {
        // the root frame is never popped
        &self.frames[self.frames.len() - 1]
    }

    fn top_mut(&mut self) -> &mut Frame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    fn in_text(&self) -> bool {
        self.frames.iter().any(|f| f.text)
    }

    fn in_alignment(&self) -> bool {
        self.frames.iter().any(|f| match &f.kind {
            FrameKind::Env(name) => ALIGNMENT_ENVIRONMENTS.contains(name.as_str()),
            _ => false,
        })
    }

    /// Something that can carry scripts (or be a script's argument).
    fn atom(&mut self) {
        let top = self.top_mut();
        if top.awaiting {
            top.awaiting = false;
        } else {
            top.sup = false;
            top.sub = false;
        }
    }

    fn script(&mut self, op: u8, i: usize) -> RenderResult<()> {
        let strict = self.opts.strict;
        let top = self.top_mut();
        if top.awaiting {
            if strict {
                return Err(RenderError::syntax(
                    format!("Expected group after '{}'", op as char),
                    Some(i),
                ));
            }
            return Ok(());
        }
        let seen = if op == b'^' { &mut top.sup } else { &mut top.sub };
        if *seen && strict {
            let what = if op == b'^' { "superscript" } else { "subscript" };
            return Err(RenderError::syntax(format!("Double {}", what), Some(i)));
        }
        *seen = true;
        top.awaiting = true;
        Ok(())
    }

    fn close_script(&mut self, i: usize) -> RenderResult<()> {
        if self.top().awaiting && self.opts.strict {
            return Err(RenderError::syntax("Expected group after script", Some(i)));
        }
        self.top_mut().awaiting = false;
        Ok(())
    }

    fn cell(&mut self, i: usize) -> RenderResult<()> {
        self.close_script(i)?;
        if self.opts.strict && !self.in_alignment() && !self.in_text() {
            return Err(RenderError::syntax(
                "Misplaced alignment tab character &",
                Some(i),
            ));
        }
        let top = self.top_mut();
        top.sup = false;
        top.sub = false;
        Ok(())
    }

    /// Handle the control sequence at `i`; returns the offset after it.
    fn control(&mut self, i: usize) -> RenderResult<usize> {
        let Some((name, end)) = control_word(self.bytes, i) else {
            return self.control_symbol(i);
        };
        match name {
            "begin" => self.begin_env(i, end),
            "end" => self.end_env(i, end),
            "left" => {
                let j = self.delimiter(end, "left")?;
                self.atom();
                self.frames.push(Frame::new(FrameKind::Left, false));
                Ok(j)
            }
            "right" => {
                self.close_script(i)?;
                if self.top().kind != FrameKind::Left {
                    return Err(RenderError::syntax("Unmatched \\right", Some(i)));
                }
                self.frames.pop();
                self.delimiter(end, "right")
            }
            "middle" => {
                if !self.frames.iter().any(|f| f.kind == FrameKind::Left) {
                    return Err(RenderError::syntax("\\middle without \\left", Some(i)));
                }
                self.delimiter(end, "middle")
            }
            _ if is_text_command(name) => {
                self.atom();
                let open = skip_ws(self.bytes, end);
                if self.bytes.get(open) == Some(&b'{') {
                    self.frames.push(Frame::new(FrameKind::Group, true));
                    return Ok(open + 1);
                }
                Ok(end)
            }
            _ if is_known_command(name) => {
                self.atom();
                Ok(end)
            }
            _ => Err(RenderError::unknown_command(name)),
        }
    }

    fn control_symbol(&mut self, i: usize) -> RenderResult<usize> {
        let Some(&next) = self.bytes.get(i + 1) else {
            return Err(RenderError::syntax(
                "Unexpected end of input after '\\'",
                Some(i),
            ));
        };
        if TEXT_ACCENTS.contains(&next) && self.opts.strict && !self.in_text() {
            return Err(RenderError::syntax(
                format!("Accent \\{} works only in text mode", next as char),
                Some(i),
            ));
        }
        self.atom();
        Ok(i + 1 + utf8_len(next))
    }

    fn env_name(&self, i: usize, end: usize) -> RenderResult<(&'a str, usize)> {
        let open = skip_ws(self.bytes, end);
        let close = matching_brace(self.bytes, open)
            .ok_or_else(|| RenderError::syntax("Expected environment name", Some(i)))?;
        let src: &'a str = self.src;
        Ok((&src[open + 1..close], close + 1))
    }

    fn begin_env(&mut self, i: usize, end: usize) -> RenderResult<usize> {
        let (name, next) = self.env_name(i, end)?;
        if !ENVIRONMENTS.contains(name) {
            return Err(RenderError::syntax(
                format!("No such environment: {}", name),
                Some(i),
            ));
        }
        if self.opts.strict && !self.opts.display_mode && DISPLAY_ENVIRONMENTS.contains(name) {
            return Err(RenderError::syntax(
                format!("{} can only be used in display mode", name),
                Some(i),
            ));
        }
        self.atom();
        self.frames
            .push(Frame::new(FrameKind::Env(name.to_string()), false));
        Ok(next)
    }

    fn end_env(&mut self, i: usize, end: usize) -> RenderResult<usize> {
        let (name, next) = self.env_name(i, end)?;
        self.close_script(i)?;
        let mismatch = match &self.top().kind {
            FrameKind::Env(open) if open == name => None,
            FrameKind::Env(open) => Some(format!(
                "Mismatch: \\begin{{{}}} matched by \\end{{{}}}",
                open, name
            )),
            _ => Some(format!("\\end{{{}}} without matching \\begin", name)),
        };
        if let Some(message) = mismatch {
            return Err(RenderError::syntax(message, Some(i)));
        }
        self.frames.pop();
        Ok(next)
    }

    /// Consume the delimiter after `\left`, `\right` or `\middle`.
    fn delimiter(&self, end: usize, which: &str) -> RenderResult<usize> {
        let k = skip_ws(self.bytes, end);
        match self.bytes.get(k) {
            Some(b'\\') => match control_word(self.bytes, k) {
                Some((name, j)) if DELIMITER_COMMANDS.contains(&name) => Ok(j),
                Some(_) => Err(RenderError::syntax(
                    format!("Invalid delimiter after \\{}", which),
                    Some(k),
                )),
                None if matches!(self.bytes.get(k + 1), Some(b'{' | b'}' | b'|')) => Ok(k + 2),
                None => Err(RenderError::syntax(
                    format!("Invalid delimiter after \\{}", which),
                    Some(k),
                )),
            },
            Some(c) if b"()[]|./<>".contains(c) => Ok(k + 1),
            _ => Err(RenderError::syntax(
                format!("Missing delimiter after \\{}", which),
                Some(k),
            )),
        }
    }
}
