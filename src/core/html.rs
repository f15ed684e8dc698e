// src/core/html.rs
//
// Tolerant, case-insensitive HTML scanning. No DOM: callers slice known blocks
// and strip what is left.

pub fn to_lower(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii() {
                c.to_ascii_lowercase()
            } else {
                c
            }
        })
        .collect()
}

/// Every `<tag ...> ... </tag>` element in `s`, nesting-aware, in document order of
/// their opening tags. Each entry is `(start, end, depth)`; depth 0 is outermost.
/// Unclosed elements are dropped.
pub fn element_blocks_ci(s: &str, tag: &str) -> Vec<(usize, usize, usize)> {
    let lc = to_lower(s);
    let open = join!("<", &to_lower(tag));
    let close = join!("</", &to_lower(tag), ">");

    let mut out = Vec::new();
    let mut stack: Vec<usize> = Vec::new();
    let mut pos = 0usize;

    loop {
        let next_open = find_open_tag(&lc, &open, pos);
        let next_close = lc[pos..].find(&close).map(|i| i + pos);

        match (next_open, next_close) {
            (Some(o), Some(c)) if o < c => {
                stack.push(o);
                pos = o + open.len();
            }
            (Some(o), None) => {
                stack.push(o);
                pos = o + open.len();
            }
            (_, Some(c)) => {
                let end = c + close.len();
                if let Some(start) = stack.pop() {
                    out.push((start, end, stack.len()));
                }
                pos = end;
            }
            (None, None) => break,
        }
    }

    out.sort_by_key(|&(start, _, _)| start);
    out
}

/// Find `<tag` followed by whitespace, `>` or `/` (so `<tr` does not match `<track`).
fn find_open_tag(lc: &str, open: &str, from: usize) -> Option<usize> {
    let mut pos = from;
    while let Some(rel) = lc.get(pos..)?.find(open) {
        let at = pos + rel;
        let next = lc[at + open.len()..].chars().next();
        if matches!(next, Some(c) if c.is_ascii_whitespace() || c == '>' || c == '/') {
            return Some(at);
        }
        pos = at + open.len();
    }
    None
}

pub fn inner_after_open_tag(block: &str) -> String {
    if let Some(oe) = block.find('>') {
        if let Some(cs) = block.rfind('<') {
            if cs > oe {
                return block[oe + 1..cs].to_string();
            }
        }
    }
    s!()
}

pub fn strip_tags<S: AsRef<str>>(s: S) -> String {
    let s = s.as_ref();

    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;

    for ch in s.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    super::sanitize::normalize_ws(&out)
}
