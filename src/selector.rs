use std::collections::HashSet;

use crate::dom::{Dom, NodeId};
use crate::error::{Error, Result};
use crate::tokens::contains_token;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SelectorAttrCondition {
    Exists { key: String },
    Eq { key: String, value: String },
    Includes { key: String, value: String },
    Contains { key: String, value: String },
    StartsWith { key: String, value: String },
    EndsWith { key: String, value: String },
}

impl SelectorAttrCondition {
    fn matches(&self, dom: &Dom, node_id: NodeId) -> bool {
        match self {
            Self::Exists { key } => dom.has_attr(node_id, key),
            Self::Eq { key, value } => dom.attr(node_id, key) == Some(value.as_str()),
            Self::Includes { key, value } => {
                !value.is_empty() && contains_token(dom.attr(node_id, key), value)
            }
            // Empty needles never match for the substring operators.
            Self::Contains { key, value } => {
                !value.is_empty() && dom.attr(node_id, key).is_some_and(|v| v.contains(value.as_str()))
            }
            Self::StartsWith { key, value } => {
                !value.is_empty()
                    && dom.attr(node_id, key).is_some_and(|v| v.starts_with(value.as_str()))
            }
            Self::EndsWith { key, value } => {
                !value.is_empty() && dom.attr(node_id, key).is_some_and(|v| v.ends_with(value.as_str()))
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct SelectorStep {
    tag: Option<String>,
    universal: bool,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<SelectorAttrCondition>,
}

impl SelectorStep {
    fn id_only(&self) -> Option<&str> {
        if !self.universal && self.tag.is_none() && self.classes.is_empty() && self.attrs.is_empty() {
            self.id.as_deref()
        } else {
            None
        }
    }

    fn matches(&self, dom: &Dom, node_id: NodeId) -> bool {
        let Some(element) = dom.element(node_id) else {
            return false;
        };

        if let Some(tag) = &self.tag {
            if !element.tag_name.eq_ignore_ascii_case(tag) {
                return false;
            }
        }

        if let Some(id) = &self.id {
            if element.attrs.get("id") != Some(id) {
                return false;
            }
        }

        if self
            .classes
            .iter()
            .any(|class_name| !contains_token(element.attrs.get("class").map(String::as_str), class_name))
        {
            return false;
        }

        self.attrs.iter().all(|cond| cond.matches(dom, node_id))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SelectorCombinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SelectorPart {
    step: SelectorStep,
    // Relation to previous (left) selector part.
    combinator: Option<SelectorCombinator>,
}

/// A parsed selector list (`a, b > c`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Selector {
    groups: Vec<Vec<SelectorPart>>,
}

impl Selector {
    pub(crate) fn parse(selector: &str) -> Result<Self> {
        let groups = split_selector_groups(selector)?;
        let mut parsed = Vec::with_capacity(groups.len());
        for group in groups {
            parsed.push(parse_selector_chain(&group)?);
        }
        Ok(Self { groups: parsed })
    }

    /// Selector matching elements whose `attr` value contains `needle` as a substring.
    pub(crate) fn attr_contains(attr: &str, needle: &str) -> Self {
        Self::single_attr(SelectorAttrCondition::Contains {
            key: attr.to_ascii_lowercase(),
            value: needle.to_string(),
        })
    }

    fn single_attr(cond: SelectorAttrCondition) -> Self {
        let step = SelectorStep {
            attrs: vec![cond],
            ..SelectorStep::default()
        };
        Self {
            groups: vec![vec![SelectorPart {
                step,
                combinator: None,
            }]],
        }
    }

    pub(crate) fn matches(&self, dom: &Dom, node_id: NodeId) -> bool {
        dom.element(node_id).is_some()
            && self
                .groups
                .iter()
                .any(|steps| matches_selector_chain(dom, node_id, steps))
    }

    /// Matching connected elements in document order, without duplicates.
    pub(crate) fn query_all(&self, dom: &Dom) -> Vec<NodeId> {
        if self.groups.len() == 1 && self.groups[0].len() == 1 {
            if let Some(id) = self.groups[0][0].step.id_only() {
                return dom.by_id(id).into_iter().collect();
            }
        }

        let mut seen = HashSet::new();
        dom.all_element_nodes()
            .into_iter()
            .filter(|candidate| self.matches(dom, *candidate) && seen.insert(*candidate))
            .collect()
    }
}

fn matches_selector_chain(dom: &Dom, node_id: NodeId, steps: &[SelectorPart]) -> bool {
    let Some(last) = steps.last() else {
        return false;
    };
    if !last.step.matches(dom, node_id) {
        return false;
    }

    let mut current = node_id;
    for idx in (1..steps.len()).rev() {
        let prev_step = &steps[idx - 1].step;
        let combinator = steps[idx]
            .combinator
            .unwrap_or(SelectorCombinator::Descendant);

        let matched = match combinator {
            SelectorCombinator::Child => dom
                .parent(current)
                .filter(|parent| prev_step.matches(dom, *parent)),
            SelectorCombinator::Descendant => {
                let mut cursor = dom.parent(current);
                let mut found = None;
                while let Some(parent) = cursor {
                    if prev_step.matches(dom, parent) {
                        found = Some(parent);
                        break;
                    }
                    cursor = dom.parent(parent);
                }
                found
            }
        };

        let Some(matched) = matched else {
            return false;
        };
        current = matched;
    }

    true
}

fn parse_selector_chain(selector: &str) -> Result<Vec<SelectorPart>> {
    let selector = selector.trim();
    if selector.is_empty() {
        return Err(Error::UnsupportedSelector(selector.into()));
    }

    let tokens = tokenize_selector(selector)?;
    let mut steps = Vec::new();
    let mut pending_combinator: Option<SelectorCombinator> = None;

    for token in tokens {
        if token == ">" {
            if pending_combinator.is_some() || steps.is_empty() {
                return Err(Error::UnsupportedSelector(selector.into()));
            }
            pending_combinator = Some(SelectorCombinator::Child);
            continue;
        }

        let step = parse_selector_step(&token)?;
        let combinator = if steps.is_empty() {
            None
        } else {
            Some(
                pending_combinator
                    .take()
                    .unwrap_or(SelectorCombinator::Descendant),
            )
        };
        steps.push(SelectorPart { step, combinator });
    }

    if steps.is_empty() || pending_combinator.is_some() {
        return Err(Error::UnsupportedSelector(selector.into()));
    }

    Ok(steps)
}

fn split_selector_groups(selector: &str) -> Result<Vec<String>> {
    let mut groups = Vec::new();
    let mut current = String::new();
    let mut bracket_depth = 0usize;
    let mut quote: Option<char> = None;

    for ch in selector.chars() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            current.push(ch);
            continue;
        }
        match ch {
            '\'' | '"' if bracket_depth > 0 => {
                quote = Some(ch);
                current.push(ch);
            }
            '[' => {
                bracket_depth += 1;
                current.push(ch);
            }
            ']' => {
                if bracket_depth == 0 {
                    return Err(Error::UnsupportedSelector(selector.into()));
                }
                bracket_depth -= 1;
                current.push(ch);
            }
            ',' if bracket_depth == 0 => {
                let trimmed = current.trim();
                if trimmed.is_empty() {
                    return Err(Error::UnsupportedSelector(selector.into()));
                }
                groups.push(trimmed.to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    if bracket_depth != 0 || quote.is_some() {
        return Err(Error::UnsupportedSelector(selector.into()));
    }

    let trimmed = current.trim();
    if trimmed.is_empty() {
        return Err(Error::UnsupportedSelector(selector.into()));
    }
    groups.push(trimmed.to_string());
    Ok(groups)
}

fn tokenize_selector(selector: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut bracket_depth = 0usize;
    let mut quote: Option<char> = None;

    for ch in selector.chars() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            current.push(ch);
            continue;
        }
        match ch {
            '\'' | '"' if bracket_depth > 0 => {
                quote = Some(ch);
                current.push(ch);
            }
            '[' => {
                bracket_depth += 1;
                current.push(ch);
            }
            ']' => {
                if bracket_depth == 0 {
                    return Err(Error::UnsupportedSelector(selector.into()));
                }
                bracket_depth -= 1;
                current.push(ch);
            }
            '>' if bracket_depth == 0 => {
                if !current.trim().is_empty() {
                    tokens.push(current.trim().to_string());
                }
                current.clear();
                tokens.push(ch.to_string());
            }
            '+' | '~' if bracket_depth == 0 => {
                // Sibling combinators have no use in delegation scopes.
                return Err(Error::UnsupportedSelector(selector.into()));
            }
            ch if ch.is_ascii_whitespace() && bracket_depth == 0 => {
                if !current.trim().is_empty() {
                    tokens.push(current.trim().to_string());
                }
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    if bracket_depth != 0 || quote.is_some() {
        return Err(Error::UnsupportedSelector(selector.into()));
    }

    if !current.trim().is_empty() {
        tokens.push(current.trim().to_string());
    }

    Ok(tokens)
}

fn parse_selector_step(part: &str) -> Result<SelectorStep> {
    let part = part.trim();
    if part.is_empty() {
        return Err(Error::UnsupportedSelector(part.into()));
    }

    let bytes = part.as_bytes();
    let mut i = 0usize;
    let mut step = SelectorStep::default();

    while i < bytes.len() {
        match bytes[i] {
            b'*' => {
                if step.universal || step.tag.is_some() {
                    return Err(Error::UnsupportedSelector(part.into()));
                }
                step.universal = true;
                i += 1;
            }
            b'#' => {
                i += 1;
                let Some((id, next)) = parse_selector_ident(part, i) else {
                    return Err(Error::UnsupportedSelector(part.into()));
                };
                if step.id.replace(id).is_some() {
                    return Err(Error::UnsupportedSelector(part.into()));
                }
                i = next;
            }
            b'.' => {
                i += 1;
                let Some((class_name, next)) = parse_selector_ident(part, i) else {
                    return Err(Error::UnsupportedSelector(part.into()));
                };
                step.classes.push(class_name);
                i = next;
            }
            b'[' => {
                let (attr, next) = parse_selector_attr_condition(part, i)?;
                step.attrs.push(attr);
                i = next;
            }
            _ => {
                if step.tag.is_some()
                    || step.id.is_some()
                    || !step.classes.is_empty()
                    || !step.attrs.is_empty()
                    || step.universal
                {
                    return Err(Error::UnsupportedSelector(part.into()));
                }
                let Some((tag, next)) = parse_selector_ident(part, i) else {
                    return Err(Error::UnsupportedSelector(part.into()));
                };
                step.tag = Some(tag);
                i = next;
            }
        }
    }

    Ok(step)
}

fn parse_selector_ident(src: &str, start: usize) -> Option<(String, usize)> {
    let bytes = src.as_bytes();
    if start >= bytes.len() || !is_selector_ident_char(bytes[start]) {
        return None;
    }
    let mut end = start + 1;
    while end < bytes.len() && is_selector_ident_char(bytes[end]) {
        end += 1;
    }
    Some((src.get(start..end)?.to_string(), end))
}

fn is_selector_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

fn parse_selector_attr_condition(
    src: &str,
    open_bracket: usize,
) -> Result<(SelectorAttrCondition, usize)> {
    let bytes = src.as_bytes();
    let mut i = open_bracket + 1;
    let mut quote: Option<u8> = None;

    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }

        if b == b'\'' || b == b'"' {
            quote = Some(b);
            i += 1;
            continue;
        }

        if b == b']' {
            let body = src
                .get(open_bracket + 1..i)
                .ok_or_else(|| Error::UnsupportedSelector(src.into()))?
                .trim();
            if body.is_empty() {
                return Err(Error::UnsupportedSelector(src.into()));
            }
            return Ok((parse_attr_body(src, body)?, i + 1));
        }

        i += 1;
    }

    Err(Error::UnsupportedSelector(src.into()))
}

fn parse_attr_body(src: &str, body: &str) -> Result<SelectorAttrCondition> {
    let Some((lhs, value)) = body.split_once('=') else {
        if !body.bytes().all(is_attr_key_char) {
            return Err(Error::UnsupportedSelector(src.into()));
        }
        return Ok(SelectorAttrCondition::Exists {
            key: body.to_ascii_lowercase(),
        });
    };

    let (key, op) = match lhs.as_bytes().last() {
        Some(op @ (b'~' | b'*' | b'^' | b'$')) => (&lhs[..lhs.len() - 1], Some(*op)),
        _ => (lhs, None),
    };
    let key = key.trim().to_ascii_lowercase();
    if key.is_empty() || !key.bytes().all(is_attr_key_char) {
        return Err(Error::UnsupportedSelector(src.into()));
    }

    let value = value.trim();
    let value = if value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')))
    {
        value[1..value.len() - 1].to_string()
    } else {
        value.to_string()
    };

    Ok(match op {
        None => SelectorAttrCondition::Eq { key, value },
        Some(b'~') => SelectorAttrCondition::Includes { key, value },
        Some(b'*') => SelectorAttrCondition::Contains { key, value },
        Some(b'^') => SelectorAttrCondition::StartsWith { key, value },
        Some(_) => SelectorAttrCondition::EndsWith { key, value },
    })
}

fn is_attr_key_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b':'
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::parse_html;

    fn ids(dom: &Dom, selector: &str) -> Result<Vec<String>> {
        let selector = Selector::parse(selector)?;
        Ok(selector
            .query_all(dom)
            .into_iter()
            .map(|node| dom.attr(node, "id").unwrap_or_default().to_string())
            .collect())
    }

    #[test]
    fn attribute_operators_match_like_css() -> Result<()> {
        let dom = parse_html(
            r#"<div id="a" data-o="panel"></div>
               <div id="b" data-o="side panelled"></div>
               <div id="c" data-o="xx"></div>
               <div id="d"></div>"#,
        )?;
        assert_eq!(ids(&dom, "[data-o]")?, vec!["a", "b", "c"]);
        assert_eq!(ids(&dom, "[data-o=panel]")?, vec!["a"]);
        assert_eq!(ids(&dom, "[data-o~='panel']")?, vec!["a"]);
        assert_eq!(ids(&dom, r#"[data-o*="panel"]"#)?, vec!["a", "b"]);
        assert_eq!(ids(&dom, "[data-o^=side]")?, vec!["b"]);
        assert_eq!(ids(&dom, "[data-o$=led]")?, vec!["b"]);
        assert_eq!(ids(&dom, "[data-o*='']")?, Vec::<String>::new());
        Ok(())
    }

    #[test]
    fn combinators_and_groups_work() -> Result<()> {
        let dom = parse_html(
            r#"<section id="s"><div id="outer" class="box wide"><p id="inner"></p></div></section>
               <p id="top"></p>"#,
        )?;
        assert_eq!(ids(&dom, "section p")?, vec!["inner"]);
        assert_eq!(ids(&dom, "section > p")?, Vec::<String>::new());
        assert_eq!(ids(&dom, "div.box.wide > p")?, vec!["inner"]);
        assert_eq!(ids(&dom, "#top, #s")?, vec!["s", "top"]);
        assert_eq!(ids(&dom, "*")?.len(), 4);
        Ok(())
    }

    #[test]
    fn quoted_values_may_contain_separators() -> Result<()> {
        let dom = parse_html(r#"<a id="x" title="a, b > c"></a>"#)?;
        assert_eq!(ids(&dom, r#"a[title="a, b > c"]"#)?, vec!["x"]);
        Ok(())
    }

    #[test]
    fn malformed_selectors_are_rejected() {
        for bad in ["", "div >", "> p", "[x", "a ~ b", "p + p", "div,", "[=x]", "#"] {
            assert!(
                matches!(Selector::parse(bad), Err(Error::UnsupportedSelector(_))),
                "expected rejection for {bad:?}"
            );
        }
    }

    #[test]
    fn built_contains_selector_matches_substrings() -> Result<()> {
        let dom = parse_html(r#"<i id="i" data-handob-observer="xx"></i>"#)?;
        let i = dom.by_id("i").ok_or_else(|| Error::SelectorNotFound("#i".into()))?;
        assert!(Selector::attr_contains("data-handob-observer", "x").matches(&dom, i));
        assert!(!Selector::attr_contains("data-handob-observer", "y").matches(&dom, i));
        Ok(())
    }
}
