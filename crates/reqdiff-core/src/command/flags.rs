//! The recognized curl flag set

use super::lexer::Token;

/// What a recognized flag contributes to a request template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flag {
    Method,
    Header,
    Data,
    Json,
    Url,
    User,
    UserAgent,
    Referer,
    Cookie,
    ForceGet,
    Head,
    /// Accepted but without effect on the template
    Inert { takes_argument: bool },
}

impl Flag {
    pub(crate) fn takes_argument(self) -> bool {
        match self {
            Flag::Method
            | Flag::Header
            | Flag::Data
            | Flag::Json
            | Flag::Url
            | Flag::User
            | Flag::UserAgent
            | Flag::Referer
            | Flag::Cookie => true,
            Flag::ForceGet | Flag::Head => false,
            Flag::Inert { takes_argument } => takes_argument,
        }
    }
}

const SWITCH: Flag = Flag::Inert {
    takes_argument: false,
};
const OPTION: Flag = Flag::Inert {
    takes_argument: true,
};

pub(crate) fn lookup(name: &str) -> Option<Flag> {
    let flag = match name {
        "-X" | "--request" => Flag::Method,
        "-H" | "--header" => Flag::Header,
        "-d" | "--data" | "--data-raw" | "--data-binary" | "--data-ascii"
        | "--data-urlencode" => Flag::Data,
        "--json" => Flag::Json,
        "--url" => Flag::Url,
        "-u" | "--user" => Flag::User,
        "-A" | "--user-agent" => Flag::UserAgent,
        "-e" | "--referer" => Flag::Referer,
        "-b" | "--cookie" => Flag::Cookie,
        "-G" | "--get" => Flag::ForceGet,
        "-I" | "--head" => Flag::Head,
        "-s" | "--silent" | "-S" | "--show-error" | "-k" | "--insecure" | "-L"
        | "--location" | "-i" | "--include" | "-v" | "--verbose" | "--compressed" | "-f"
        | "--fail" | "-N" | "--no-buffer" | "-g" | "--globoff" | "--http1.1" | "--http2" => {
            SWITCH
        }
        "-o" | "--output" | "-m" | "--max-time" | "--connect-timeout" | "-w" | "--write-out"
        | "--max-redirs" => OPTION,
        _ => return None,
    };
    Some(flag)
}

/// Split bundled and attached short flags into separate words
///
/// `-sSL` becomes `-s -S -L` when every letter is a known switch, and
/// `-XPOST` becomes `-X POST`. `--name=value` is split for known long flags
/// that take an argument. Anything else is left for the caller to judge.
pub(crate) fn expand(tokens: Vec<Token>) -> Vec<Token> {
    let mut expanded = Vec::with_capacity(tokens.len());

    for token in tokens {
        if !token.is_flag() || lookup(&token.text).is_some() {
            expanded.push(token);
            continue;
        }

        if let Some((name, value)) = token.text.split_once('=') {
            if name.starts_with("--") && lookup(name).is_some_and(Flag::takes_argument) {
                expanded.push(Token::bare(name));
                expanded.push(Token::bare(value));
                continue;
            }
        }

        if let Some(rest) = token.text.strip_prefix("-X") {
            if !token.text.starts_with("--") {
                expanded.push(Token::bare("-X"));
                expanded.push(Token::bare(rest));
                continue;
            }
        }

        let letters = &token.text[1..];
        let bundle: Option<Vec<Token>> = if token.text.starts_with("--") {
            None
        } else {
            letters
                .chars()
                .map(|c| {
                    let name = format!("-{c}");
                    lookup(&name)
                        .filter(|flag| !flag.takes_argument())
                        .map(|_| Token::bare(name))
                })
                .collect()
        };

        match bundle {
            Some(flags) => expanded.extend(flags),
            None => expanded.push(token),
        }
    }

    expanded
}
