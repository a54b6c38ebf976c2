//! Pattern matching for database selectors
//!
//! Pathname-style glob matching over database ids. `*` matches any run of
//! characters and `?` any single character, neither of them crossing a `/`.
//! Bracket expressions (`[abc]`, `[a-z]`, `[!x]`) and `\` escapes follow the
//! usual fnmatch rules; a `[` without a closing `]` is a literal.

/// Check whether a selector uses glob metacharacters.
///
/// Selectors without `*` or `?` are exact ids, even if they contain brackets.
pub fn is_wildcard(selector: &str) -> bool {
    selector.contains(['*', '?'])
}

/// Compiled glob pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobPattern {
    source: String,
    tokens: Vec<Token>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(char),
    AnyChar,
    AnyRun,
    Class { negated: bool, items: Vec<ClassItem> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ClassItem {
    Char(char),
    Range(char, char),
}

impl Token {
    fn matches_char(&self, c: char) -> bool {
        match self {
            Token::Literal(l) => *l == c,
            Token::AnyChar => c != '/',
            Token::Class { negated, items } => {
                if c == '/' {
                    return false;
                }
                let hit = items.iter().any(|item| match item {
                    ClassItem::Char(x) => *x == c,
                    ClassItem::Range(lo, hi) => *lo <= c && c <= *hi,
                });
                hit != *negated
            }
            // Runs are handled by `GlobPattern::matches`.
            Token::AnyRun => false,
        }
    }
}

impl GlobPattern {
    /// Compile a glob pattern
    pub fn new(pattern: &str) -> Self {
        let chars: Vec<char> = pattern.chars().collect();
        let mut tokens = Vec::with_capacity(chars.len());
        let mut i = 0;

        while i < chars.len() {
            match chars[i] {
                '*' => {
                    // Consecutive stars behave as one.
                    if tokens.last() != Some(&Token::AnyRun) {
                        tokens.push(Token::AnyRun);
                    }
                    i += 1;
                }
                '?' => {
                    tokens.push(Token::AnyChar);
                    i += 1;
                }
                '\\' if i + 1 < chars.len() => {
                    tokens.push(Token::Literal(chars[i + 1]));
                    i += 2;
                }
                '[' => match parse_class(&chars, i + 1) {
                    Some((token, next)) => {
                        tokens.push(token);
                        i = next;
                    }
                    None => {
                        tokens.push(Token::Literal('['));
                        i += 1;
                    }
                },
                c => {
                    tokens.push(Token::Literal(c));
                    i += 1;
                }
            }
        }

        Self {
            source: pattern.to_string(),
            tokens,
        }
    }

    /// Get the pattern source
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Check if a database id matches this pattern
    pub fn matches(&self, id: &str) -> bool {
        let text: Vec<char> = id.chars().collect();
        let (n, m) = (self.tokens.len(), text.len());

        // reachable[i][j]: tokens[i..] match text[j..]
        let mut reachable = vec![vec![false; m + 1]; n + 1];
        reachable[n][m] = true;

        for i in (0..n).rev() {
            for j in (0..=m).rev() {
                reachable[i][j] = match &self.tokens[i] {
                    Token::AnyRun => {
                        reachable[i + 1][j]
                            || (j < m && text[j] != '/' && reachable[i][j + 1])
                    }
                    token => j < m && token.matches_char(text[j]) && reachable[i + 1][j + 1],
                };
            }
        }

        reachable[0][0]
    }
}

/// Parse a bracket expression whose body starts at `start`. Returns the
/// token and the index just past the closing `]`, or `None` if unterminated.
fn parse_class(chars: &[char], start: usize) -> Option<(Token, usize)> {
    let mut i = start;
    let negated = matches!(chars.get(i), Some('!') | Some('^'));
    if negated {
        i += 1;
    }

    let mut items = Vec::new();
    let mut first = true;

    loop {
        let mut c = *chars.get(i)?;
        if c == ']' && !first {
            return Some((Token::Class { negated, items }, i + 1));
        }
        first = false;

        if c == '\\' {
            i += 1;
            c = *chars.get(i)?;
        }
        i += 1;

        if chars.get(i) == Some(&'-') && chars.get(i + 1).is_some_and(|&hi| hi != ']') {
            let mut hi = chars[i + 1];
            i += 2;
            if hi == '\\' {
                hi = *chars.get(i)?;
                i += 1;
            }
            items.push(ClassItem::Range(c, hi));
        } else {
            items.push(ClassItem::Char(c));
        }
    }
}
