//! Conservative JavaScript minifier for generated bootstrap scripts.
//!
//! Two passes, each optional:
//!
//! 1. [`strip_comments`] removes `/* ... */` and `// ...` comments outside
//!    string and template literals.
//! 2. [`collapse_whitespace`] drops whitespace wherever the grammar allows
//!    and keeps a single space between word characters.
//!
//! Regex literals are not recognized and newlines are only kept after line
//! comments, so input must terminate every statement with `;`. The bootstrap templates are written
//! that way. Anything else should go through an external minifier plugged in
//! as a [`ScriptMinifier`].

use crate::error::MinifyError;

/// Which passes [`minify_js`] runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JsMinifyOptions {
    pub strip_comments: bool,
    pub collapse_whitespace: bool,
}

impl Default for JsMinifyOptions {
    fn default() -> Self {
        Self {
            strip_comments: true,
            collapse_whitespace: true,
        }
    }
}

/// Pluggable script minifier.
///
/// A failure never fails the compile: the caller logs it and keeps the
/// unminified script.
pub trait ScriptMinifier {
    fn minify(&self, script: &str) -> Result<String, MinifyError>;
}

impl<F> ScriptMinifier for F
where
    F: Fn(&str) -> Result<String, MinifyError>,
{
    fn minify(&self, script: &str) -> Result<String, MinifyError> {
        self(script)
    }
}

/// [`ScriptMinifier`] backed by [`minify_js`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuiltinScriptMinifier {
    pub options: JsMinifyOptions,
}

impl BuiltinScriptMinifier {
    pub fn new(options: JsMinifyOptions) -> Self {
        Self { options }
    }
}

impl ScriptMinifier for BuiltinScriptMinifier {
    fn minify(&self, script: &str) -> Result<String, MinifyError> {
        minify_js(script, self.options)
    }
}

enum State {
    Normal,
    AfterSlash,
    InString(char),
    InStringEscape(char),
    InBlockComment,
    InBlockCommentEnd,
    InLineComment,
}

/// Removes comments outside string and template literals.
///
/// A line comment keeps its terminating newline. Fails on an unterminated
/// block comment.
pub fn strip_comments(input: &str) -> Result<String, MinifyError> {
    let mut output = String::with_capacity(input.len());
    let mut state = State::Normal;
    let mut comment_start = 0usize;

    for (idx, ch) in input.char_indices() {
        if let State::AfterSlash = state {
            match ch {
                '*' => {
                    output.pop();
                    comment_start = idx - 1;
                    state = State::InBlockComment;
                    continue;
                }
                '/' => {
                    output.pop();
                    state = State::InLineComment;
                    continue;
                }
                // Not a comment: `ch` is handled as normal code below.
                _ => state = State::Normal,
            }
        }

        match state {
            State::Normal | State::AfterSlash => {
                output.push(ch);
                match ch {
                    '"' | '\'' | '`' => state = State::InString(ch),
                    '/' => state = State::AfterSlash,
                    _ => {}
                }
            }
            State::InString(quote) => {
                output.push(ch);
                if ch == '\\' {
                    state = State::InStringEscape(quote);
                } else if ch == quote {
                    state = State::Normal;
                }
            }
            State::InStringEscape(quote) => {
                output.push(ch);
                state = State::InString(quote);
            }
            State::InBlockComment => {
                if ch == '*' {
                    state = State::InBlockCommentEnd;
                }
            }
            State::InBlockCommentEnd => {
                if ch == '/' {
                    state = State::Normal;
                } else if ch != '*' {
                    state = State::InBlockComment;
                }
            }
            State::InLineComment => {
                if ch == '\n' || ch == '\r' {
                    output.push(ch);
                    state = State::Normal;
                }
            }
        }
    }

    if let State::InBlockComment | State::InBlockCommentEnd = state {
        return Err(MinifyError::new("unterminated block comment").at(comment_start));
    }
    Ok(output)
}

/// Collapses whitespace outside string and template literals.
///
/// Comments are copied through. A line comment keeps its terminating newline
/// so it cannot swallow the code that follows. Fails on an unterminated
/// literal or block comment.
pub fn collapse_whitespace(input: &str) -> Result<String, MinifyError> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.char_indices().peekable();
    let mut literal: Option<(char, usize)> = None;
    let mut escaped = false;
    let mut pending_space = false;

    while let Some((idx, ch)) = chars.next() {
        if let Some((quote, _)) = literal {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == quote {
                literal = None;
            }
            continue;
        }

        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }

        if ch == '/' {
            let next = chars.peek().map(|&(_, next)| next);
            if matches!(next, Some('/' | '*')) {
                // `a / /* c */ b` must not turn into a line comment.
                if out.ends_with('/') {
                    out.push(' ');
                }
                pending_space = false;
                out.push('/');
                if next == Some('/') {
                    copy_line_comment(&mut chars, &mut out);
                } else if !copy_block_comment(&mut chars, &mut out) {
                    return Err(MinifyError::new("unterminated block comment").at(idx));
                }
                continue;
            }
        }

        if pending_space {
            maybe_push_space(&mut out, ch);
            pending_space = false;
        }
        if matches!(ch, '"' | '\'' | '`') {
            literal = Some((ch, idx));
        }
        out.push(ch);
    }

    if let Some((_, start)) = literal {
        return Err(MinifyError::new("unterminated string literal").at(start));
    }
    Ok(out)
}

/// Copies the rest of a line comment and ends it with `\n`.
fn copy_line_comment<I>(chars: &mut I, out: &mut String)
where
    I: Iterator<Item = (usize, char)>,
{
    for (_, ch) in chars {
        if ch == '\n' || ch == '\r' {
            break;
        }
        out.push(ch);
    }
    out.push('\n');
}

/// Copies a block comment after its opening `/`, through the closing `*/`.
/// Returns `false` if the input ends first.
fn copy_block_comment<I>(chars: &mut I, out: &mut String) -> bool
where
    I: Iterator<Item = (usize, char)>,
{
    // The opening `*` cannot also close the comment.
    let mut prev = '\0';
    let mut opened = false;
    for (_, ch) in chars {
        out.push(ch);
        if !opened {
            opened = true;
            continue;
        }
        if prev == '*' && ch == '/' {
            return true;
        }
        prev = ch;
    }
    false
}

fn is_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '$'
}

fn maybe_push_space(out: &mut String, next_char: char) {
    let Some(prev_char) = out.chars().last() else {
        return;
    };

    // `a + ++b` must not become `a+++b`.
    if (prev_char == '+' && next_char == '+') || (prev_char == '-' && next_char == '-') {
        out.push(' ');
        return;
    }

    if is_word_char(prev_char) && is_word_char(next_char) {
        out.push(' ');
    }
}

/// Runs the passes enabled in `options`.
pub fn minify_js(input: &str, options: JsMinifyOptions) -> Result<String, MinifyError> {
    let stripped = if options.strip_comments {
        strip_comments(input)?
    } else {
        input.to_string()
    };
    if options.collapse_whitespace {
        collapse_whitespace(&stripped)
    } else {
        Ok(stripped)
    }
}
