//! Package-name patterns used to narrow test discovery.

use regex::Regex;

use crate::error::Error;

/// Prefix marking a pattern as a regular expression to be used as-is.
pub const REGEX_PREFIX: &str = "re::";

#[derive(Debug, Clone)]
enum PatternKind
{
    /// Equal to the class name or its package.
    Exact(String),
    /// Shell-style pattern, compiled to an anchored regex.
    Wildcard(Regex),
    /// Caller-supplied regex, searched for anywhere in the class name.
    Regex(Regex),
}

/// One package pattern, its kind fixed when it is parsed.
#[derive(Debug, Clone)]
pub struct PackagePattern
{
    source: String,
    kind: PatternKind,
}

fn compile(pattern: &str, regex: &str) -> Result<Regex, Error>
{
    Regex::new(regex).map_err(|source| Error::FilterPattern { pattern: pattern.to_string(), source })
}

impl PackagePattern
{
    pub fn parse(pattern: &str) -> Result<PackagePattern, Error>
    {
        let kind = if let Some(regex) = pattern.strip_prefix(REGEX_PREFIX)
        {
            PatternKind::Regex(compile(pattern, regex)?)
        }
        else if pattern.contains(['*', '?', '['])
        {
            PatternKind::Wildcard(compile(pattern, &wildcard_to_regex(pattern))?)
        }
        else
        {
            PatternKind::Exact(pattern.to_string())
        };
        Ok(PackagePattern { source: pattern.to_string(), kind })
    }

    pub fn as_str(&self) -> &str
    {
        &self.source
    }

    /// Match against a dotted class name such as `com.foo.BarTest`.
    pub fn matches(&self, class_name: &str) -> bool
    {
        let package = match class_name.rfind('.')
        {
            Some(ix) => &class_name[..ix],
            None => "",
        };
        match &self.kind
        {
            PatternKind::Exact(name) => name == class_name || name == package,
            PatternKind::Wildcard(re) => re.is_match(class_name) || re.is_match(package),
            PatternKind::Regex(re) => re.is_match(class_name),
        }
    }
}

/// Any-of set of package patterns. An empty filter accepts everything.
#[derive(Debug, Clone, Default)]
pub struct PackageFilter
{
    patterns: Vec<PackagePattern>,
}

impl PackageFilter
{
    /// Parse every pattern up front; the first invalid one is the error.
    pub fn new<I, S>(patterns: I) -> Result<PackageFilter, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| PackagePattern::parse(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PackageFilter { patterns })
    }

    pub fn accept_all() -> PackageFilter
    {
        PackageFilter::default()
    }

    pub fn patterns(&self) -> &[PackagePattern]
    {
        &self.patterns
    }

    pub fn matches(&self, class_name: &str) -> bool
    {
        self.patterns.is_empty() || self.patterns.iter().any(|p| p.matches(class_name))
    }
}

/// Translate a shell-style wildcard into an anchored regular expression.
///
/// `*` matches any run of characters (dots included), `?` a single character
/// and `[...]` a character class, negated by a leading `!` or `^`. A `[` with
/// no closing `]` is taken literally.
pub fn wildcard_to_regex(pattern: &str) -> String
{
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::from("^");
    let mut i = 0;
    while i < chars.len()
    {
        match chars[i]
        {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' =>
            {
                let mut j = i + 1;
                if j < chars.len() && (chars[j] == '!' || chars[j] == '^')
                {
                    j += 1;
                }
                // a ']' straight after the opening bracket is a member, not the end
                if j < chars.len() && chars[j] == ']'
                {
                    j += 1;
                }
                while j < chars.len() && chars[j] != ']'
                {
                    j += 1;
                }
                if j >= chars.len()
                {
                    out.push_str("\\[");
                }
                else
                {
                    out.push('[');
                    let mut body = &chars[i + 1..j];
                    if let Some((&('!' | '^'), rest)) = body.split_first()
                    {
                        out.push('^');
                        body = rest;
                    }
                    for c in body
                    {
                        match c
                        {
                            '\\' | '[' | ']' | '&' | '~' | '^' => {
                                out.push('\\');
                                out.push(*c);
                            }
                            _ => out.push(*c),
                        }
                    }
                    out.push(']');
                    i = j;
                }
            }
            c => out.push_str(&regex::escape(c.encode_utf8(&mut [0u8; 4]))),
        }
        i += 1;
    }
    out.push('$');
    out
}
