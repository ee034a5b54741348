//! Graphite glob to search-index regex translation.
//!
//! Substitution order matters: dot/star/question first, then brace lists,
//! then numeric ranges. Earlier passes must not see the alternation and
//! range syntax produced by later ones.

/// Translate a Graphite-style glob into a regex the search index accepts.
///
/// `web.*.cpu.{user,system}` becomes `web\..*\.cpu\.(user|system)`.
/// Numeric ranges expand: `[2-5]` becomes `(2|3|4|5)`, order-normalized so
/// `[5-2]` is equivalent.
pub fn translate(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() * 2);
    for c in glob.chars() {
        match c {
            '.' => out.push_str("\\."),
            '*' => out.push_str(".*"),
            '?' => out.push_str(".?"),
            _ => out.push(c),
        }
    }
    let out = translate_braces(&out);
    translate_ranges(&out)
}

/// `{a,b,c}` -> `(a|b|c)`; unbalanced braces pass through untouched.
fn translate_braces(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(open) = rest.find('{') {
        match rest[open..].find('}') {
            Some(rel_close) => {
                let close = open + rel_close;
                out.push_str(&rest[..open]);
                out.push('(');
                out.push_str(&rest[open + 1..close].replace(',', "|"));
                out.push(')');
                rest = &rest[close + 1..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out
}

/// `[N-M]` -> `(N|N+1|...|M)` for numeric bounds; anything else inside the
/// brackets is left as an ordinary regex character class.
fn translate_ranges(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(open) = rest.find('[') {
        match rest[open..].find(']') {
            Some(rel_close) => {
                let close = open + rel_close;
                out.push_str(&rest[..open]);
                match expand_numeric_range(&rest[open + 1..close]) {
                    Some(expanded) => out.push_str(&expanded),
                    None => out.push_str(&rest[open..=close]),
                }
                rest = &rest[close + 1..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out
}

fn expand_numeric_range(inner: &str) -> Option<String> {
    let (lo, hi) = inner.split_once('-')?;
    let lo: i64 = lo.parse().ok()?;
    let hi: i64 = hi.parse().ok()?;
    let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
    let alternatives: Vec<String> = (lo..=hi).map(|n| n.to_string()).collect();
    Some(format!("({})", alternatives.join("|")))
}
