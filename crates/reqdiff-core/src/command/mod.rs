//! Command parser: free-form cURL text to request templates
//!
//! Parsing, validation and placeholder suggestion are separate pure
//! functions. [`parse`] always produces a template, [`validate`] explains
//! what is wrong with a command, and [`auto_detect_placeholder`] proposes an
//! edit the caller may accept or ignore.

mod flags;
pub mod lexer;

use base64::Engine;
use flags::Flag;
use indexmap::IndexMap;
use lexer::Token;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, trace};

/// Marks where a host's base URL belongs inside a command
pub const PLACEHOLDER: &str = "{host}";

/// The command verb every command must start with
pub const COMMAND_VERB: &str = "curl";

/// Loopback name accepted as a URL without a scheme
const LOOPBACK_NAME: &str = "localhost";

/// Reasons [`validate`] rejects a command
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    /// Blank command text
    #[error("command is empty")]
    Empty,

    /// First word is not `curl`
    #[error("command must start with 'curl', found '{found}'")]
    MissingVerb { found: String },

    /// Flag outside the supported set
    #[error("unrecognized flag '{flag}'")]
    UnknownFlag { flag: String },

    /// Flag that takes a value appears last
    #[error("flag '{flag}' requires an argument")]
    MissingArgument { flag: String },

    /// No positional URL argument
    #[error("command has no URL")]
    MissingUrl,

    /// URL with an unsupported prefix
    #[error("URL '{url}' must start with '/', 'http://', 'https://', '{{host}}' or 'localhost'")]
    InvalidUrl { url: String },

    /// Quote opened but never closed
    #[error("unterminated {quote} quote")]
    UnterminatedQuote { quote: char },
}

/// A request described by one command, independent of any host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestTemplate {
    /// Upper-cased HTTP method
    pub method: String,
    /// May still contain [`PLACEHOLDER`] or be relative
    pub url: String,
    /// Case-sensitive keys, later duplicates win
    pub headers: IndexMap<String, String>,
    pub body: Option<String>,
    /// The command text this template was parsed from
    pub source: String,
}

impl RequestTemplate {
    /// Same method, URL, headers and body; the source text may differ
    pub fn is_equivalent(&self, other: &RequestTemplate) -> bool {
        self.method == other.method
            && self.url == other.url
            && self.headers == other.headers
            && self.body == other.body
    }

    /// Whether the placeholder appears in the URL, a header value or the body
    pub fn has_placeholder(&self) -> bool {
        self.url.contains(PLACEHOLDER)
            || self.headers.values().any(|v| v.contains(PLACEHOLDER))
            || self.body.as_deref().is_some_and(|b| b.contains(PLACEHOLDER))
    }
}

/// Join continuation lines and collapse whitespace outside quotes
///
/// Lines ending in `\` are joined with the next line. Runs of whitespace
/// outside quotes become one space; quoted text is kept verbatim so bodies
/// survive intact. Idempotent.
pub fn normalize(text: &str) -> String {
    let mut joined = String::with_capacity(text.len());
    let mut lines = text.lines().peekable();
    while let Some(line) = lines.next() {
        let trimmed = line.trim_end();
        match trimmed.strip_suffix('\\') {
            Some(head) if lines.peek().is_some() => {
                joined.push_str(head);
                joined.push(' ');
            }
            _ => {
                joined.push_str(line);
                if lines.peek().is_some() {
                    joined.push('\n');
                }
            }
        }
    }

    let mut out = String::with_capacity(joined.len());
    // closing quote character and whether backslash escapes inside it
    let mut quote: Option<(char, bool)> = None;
    let mut pending_space = false;
    let mut chars = joined.chars().peekable();

    while let Some(c) = chars.next() {
        match quote {
            Some((close, escapes)) => {
                out.push(c);
                if c == '\\' && escapes {
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                } else if c == close {
                    quote = None;
                }
            }
            None if c.is_whitespace() => pending_space = true,
            None => {
                if pending_space && !out.is_empty() {
                    out.push(' ');
                }
                pending_space = false;
                out.push(c);
                match c {
                    '\\' => {
                        if let Some(next) = chars.next() {
                            out.push(next);
                        }
                    }
                    '\'' => quote = Some(('\'', false)),
                    '"' => quote = Some(('"', true)),
                    '$' if chars.peek() == Some(&'\'') => {
                        out.push('\'');
                        chars.next();
                        quote = Some(('\'', true));
                    }
                    _ => {}
                }
            }
        }
    }

    out
}

/// Parse command text into a template. Never fails.
///
/// Flags are consumed from a working copy of the words in the order method,
/// headers, body, other known flags. The URL is then taken from what
/// remains. An empty URL is accepted here; [`validate`] rejects it.
pub fn parse(text: &str) -> RequestTemplate {
    let normalized = normalize(text);
    let mut words = flags::expand(lexer::tokenize_lenient(&normalized));

    if words
        .first()
        .is_some_and(|w| !w.quoted && w.text == COMMAND_VERB)
    {
        words.remove(0);
    }

    let explicit_method = take_all(&mut words, Flag::Method)
        .pop()
        .map(|m| m.to_ascii_uppercase());

    let mut headers = IndexMap::new();
    for raw in take_all(&mut words, Flag::Header) {
        match raw.split_once(':') {
            Some((name, value)) => {
                headers.insert(name.trim().to_string(), value.trim().to_string());
            }
            // curl sends `Name;` as an empty header
            None => match raw.trim().strip_suffix(';') {
                Some(name) => {
                    headers.insert(name.trim().to_string(), String::new());
                }
                None => debug!(header = %raw, "Ignoring header without a colon"),
            },
        }
    }
    for (flag, name) in [
        (Flag::UserAgent, "User-Agent"),
        (Flag::Referer, "Referer"),
        (Flag::Cookie, "Cookie"),
    ] {
        if let Some(value) = take_all(&mut words, flag).pop() {
            headers.insert(name.to_string(), value);
        }
    }
    if let Some(credentials) = take_all(&mut words, Flag::User).pop() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials.as_bytes());
        headers.insert("Authorization".to_string(), format!("Basic {encoded}"));
    }

    let mut bodies = take_all(&mut words, Flag::Data);
    let json_bodies = take_all(&mut words, Flag::Json);
    if !json_bodies.is_empty() {
        for (name, value) in [("Content-Type", "application/json"), ("Accept", "application/json")] {
            if !headers.keys().any(|k| k.eq_ignore_ascii_case(name)) {
                headers.insert(name.to_string(), value.to_string());
            }
        }
        bodies.extend(json_bodies);
    }
    let mut body = if bodies.is_empty() {
        None
    } else {
        Some(bodies.join("&"))
    };

    let force_get = take_switch(&mut words, Flag::ForceGet);
    let head = take_switch(&mut words, Flag::Head);
    let explicit_url = take_all(&mut words, Flag::Url).into_iter().next();
    take_inert(&mut words);

    let mut url = explicit_url.unwrap_or_else(|| extract_url(&words));

    if force_get {
        if let Some(query) = body.take() {
            let separator = if url.contains('?') { '&' } else { '?' };
            url = format!("{url}{separator}{query}");
        }
    }

    let method = match explicit_method {
        Some(method) => method,
        None if head => "HEAD".to_string(),
        None if body.is_some() => "POST".to_string(),
        None => "GET".to_string(),
    };

    trace!(%method, %url, headers = headers.len(), "Parsed command");

    RequestTemplate {
        method,
        url,
        headers,
        body,
        source: text.to_string(),
    }
}

/// Remove every occurrence of `flag` and its argument, returning the arguments
fn take_all(words: &mut Vec<Token>, flag: Flag) -> Vec<String> {
    let mut values = Vec::new();
    let mut i = 0;
    while i < words.len() {
        if words[i].is_flag() && flags::lookup(&words[i].text) == Some(flag) {
            words.remove(i);
            if i < words.len() {
                values.push(words.remove(i).text);
            }
        } else {
            i += 1;
        }
    }
    values
}

fn take_switch(words: &mut Vec<Token>, flag: Flag) -> bool {
    let before = words.len();
    words.retain(|w| !(w.is_flag() && flags::lookup(&w.text) == Some(flag)));
    words.len() != before
}

fn take_inert(words: &mut Vec<Token>) {
    let mut i = 0;
    while i < words.len() {
        match flags::lookup(&words[i].text).filter(|_| words[i].is_flag()) {
            Some(flag @ Flag::Inert { .. }) => {
                words.remove(i);
                if flag.takes_argument() && i < words.len() {
                    words.remove(i);
                }
            }
            _ => i += 1,
        }
    }
}

/// URL fallback chain over the words left after flag extraction
fn extract_url(words: &[Token]) -> String {
    if let Some(first) = words.first().filter(|w| w.quoted) {
        return first.text.clone();
    }
    if let Some(word) = words.iter().find(|w| looks_like_url(&w.text)) {
        return word.text.clone();
    }
    words
        .iter()
        .find(|w| !w.is_flag())
        .map(|w| w.text.clone())
        .unwrap_or_default()
}

fn scheme_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*://").expect("valid scheme regex"))
}

fn looks_like_url(text: &str) -> bool {
    text.starts_with('/') || text.starts_with(PLACEHOLDER) || scheme_regex().is_match(text)
}

/// Whether the placeholder token appears anywhere in the text
pub fn has_placeholder(text: &str) -> bool {
    text.contains(PLACEHOLDER)
}

/// Suggest a version of the command with the placeholder inserted
///
/// Tries, in order: the first scheme and authority, the first
/// hostname-looking substring, the first root-relative path. Returns `None`
/// when the placeholder is already present or nothing matches. The
/// suggestion is advisory and never applied by this crate.
pub fn auto_detect_placeholder(text: &str) -> Option<String> {
    static AUTHORITY: OnceLock<Regex> = OnceLock::new();
    static HOSTNAME: OnceLock<Regex> = OnceLock::new();
    static ROOT_PATH: OnceLock<Regex> = OnceLock::new();

    if has_placeholder(text) {
        return None;
    }

    let authority = AUTHORITY.get_or_init(|| {
        Regex::new(r#"[A-Za-z][A-Za-z0-9+.-]*://[^\s/'"?#]+"#).expect("valid authority regex")
    });
    if authority.is_match(text) {
        return Some(authority.replace(text, PLACEHOLDER).into_owned());
    }

    let hostname = HOSTNAME.get_or_init(|| {
        Regex::new(r"\b(?:(?:[A-Za-z0-9-]+\.)+[A-Za-z]{2,}|\d{1,3}(?:\.\d{1,3}){3})(?::\d+)?")
            .expect("valid hostname regex")
    });
    if let Some(found) = hostname.find(text) {
        let mut suggestion = String::with_capacity(text.len());
        suggestion.push_str(&text[..found.start()]);
        suggestion.push_str(PLACEHOLDER);
        suggestion.push_str(&text[found.end()..]);
        return Some(suggestion);
    }

    let root_path = ROOT_PATH
        .get_or_init(|| Regex::new(r#"(^|\s)(['"]?)/"#).expect("valid root path regex"));
    root_path
        .find(text)
        .map(|_| root_path.replace(text, "${1}${2}{host}/").into_owned())
}

/// Check a command against the recognized syntax without building a template
pub fn validate(text: &str) -> Result<(), CommandError> {
    let normalized = normalize(text);
    if normalized.is_empty() {
        return Err(CommandError::Empty);
    }

    let words = lexer::tokenize(&normalized)
        .map_err(|e| CommandError::UnterminatedQuote { quote: e.quote })?;
    let words = flags::expand(words);
    let mut words = words.iter();

    match words.next() {
        Some(verb) if !verb.quoted && verb.text == COMMAND_VERB => {}
        Some(other) => {
            return Err(CommandError::MissingVerb {
                found: other.text.clone(),
            })
        }
        None => return Err(CommandError::Empty),
    }

    let mut url: Option<&str> = None;
    let mut explicit_url: Option<&str> = None;
    while let Some(word) = words.next() {
        if !word.is_flag() {
            url.get_or_insert(&word.text);
            continue;
        }

        let flag = flags::lookup(&word.text).ok_or_else(|| CommandError::UnknownFlag {
            flag: word.text.clone(),
        })?;
        if flag.takes_argument() {
            match words.next() {
                Some(arg) if !arg.is_flag() => {
                    if flag == Flag::Url {
                        explicit_url.get_or_insert(&arg.text);
                    }
                }
                _ => {
                    return Err(CommandError::MissingArgument {
                        flag: word.text.clone(),
                    })
                }
            }
        }
    }

    let url = explicit_url
        .or(url)
        .filter(|u| !u.is_empty())
        .ok_or(CommandError::MissingUrl)?;

    if is_acceptable_url(url) {
        Ok(())
    } else {
        Err(CommandError::InvalidUrl {
            url: url.to_string(),
        })
    }
}

fn is_acceptable_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    url.starts_with('/')
        || url.starts_with(PLACEHOLDER)
        || lower.starts_with("http://")
        || lower.starts_with("https://")
        || lower == LOOPBACK_NAME
        || lower.starts_with(&format!("{LOOPBACK_NAME}:"))
        || lower.starts_with(&format!("{LOOPBACK_NAME}/"))
}

/// Render a template back to command text
///
/// `parse(&format(t))` yields a template equivalent to `t`; the text is not
/// meant to reproduce the original source byte for byte.
pub fn format(template: &RequestTemplate) -> String {
    let mut parts = vec![COMMAND_VERB.to_string()];

    if template.method != "GET" || template.body.is_some() {
        parts.push("-X".to_string());
        parts.push(method_word(&template.method));
    }

    parts.push(lexer::quote(&template.url));

    for (name, value) in &template.headers {
        parts.push("-H".to_string());
        parts.push(lexer::quote(&format!("{name}: {value}")));
    }

    if let Some(body) = &template.body {
        parts.push("--data-raw".to_string());
        parts.push(lexer::quote(body));
    }

    parts.join(" ")
}

/// Plain verbs stay bare; anything else is quoted so it reads back as one word
fn method_word(method: &str) -> String {
    if !method.is_empty() && method.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        method.to_string()
    } else {
        lexer::quote(method)
    }
}
