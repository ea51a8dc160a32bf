use crate::error::{ODataError, ODataResult};
use crate::model::{EntityTypeDef, KeyPredicate, PathSegment, Schema, TypeTag};

/// Parses a resource path relative to the service root, e.g.
/// `Categories(1)/Products` or `Suppliers(SupplierID=2)/Address`.
///
/// Only the segment kinds are classified here. Shape rules (depth, keys
/// before navigation) belong to the router.
pub fn parse_resource_path(schema: &Schema, raw: &str) -> ODataResult<Vec<PathSegment>> {
    let trimmed = raw.trim_matches('/');
    if trimmed.is_empty() {
        return Err(ODataError::invalid("empty resource path"));
    }

    let mut segments = Vec::new();
    let mut context: Option<TypeTag> = None;
    let mut after_property = false;

    for part in split_segments(trimmed)? {
        let (name, key_text) = split_key(part)?;
        if name.starts_with('$') {
            return Err(ODataError::unsupported(format!("'{}' is not supported", name)));
        }
        if after_property {
            return Err(ODataError::unsupported(format!(
                "segment '{}' follows a property",
                name
            )));
        }

        let Some(current) = context else {
            let set = schema
                .entity_set(name)
                .ok_or_else(|| ODataError::not_found(format!("entity set '{}' not found", name)))?;
            let keys = match key_text {
                Some(text) => parse_keys(schema.entity_type(set.entity_type), text)?,
                None => Vec::new(),
            };
            segments.push(PathSegment::entity_set(name, set.entity_type, keys));
            context = Some(set.entity_type);
            continue;
        };

        let def = schema.entity_type(current);
        if let Some(relationship) = schema.relationship(current, name) {
            let keys = match key_text {
                Some(text) => parse_keys(schema.entity_type(relationship.target), text)?,
                None => Vec::new(),
            };
            segments.push(PathSegment::navigation(name, keys));
            context = Some(relationship.target);
        } else if def.get_property(name).is_some() {
            if key_text.is_some() {
                return Err(ODataError::invalid(format!(
                    "property '{}' cannot take a key",
                    name
                )));
            }
            segments.push(PathSegment::property(name));
            after_property = true;
        } else {
            return Err(ODataError::not_found(format!(
                "'{}' is not a member of {}",
                name, def.name
            )));
        }
    }
    Ok(segments)
}

/// Splits on `/` outside string literals.
fn split_segments(path: &str) -> ODataResult<Vec<&str>> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_quote = false;
    for (i, c) in path.char_indices() {
        match c {
            '\'' => in_quote = !in_quote,
            '/' if !in_quote => {
                parts.push(&path[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if in_quote {
        return Err(ODataError::invalid("unterminated string literal"));
    }
    parts.push(&path[start..]);
    if parts.iter().any(|p| p.is_empty()) {
        return Err(ODataError::invalid("empty path segment"));
    }
    Ok(parts)
}

/// `Products(1)` -> (`Products`, Some(`1`)).
fn split_key(segment: &str) -> ODataResult<(&str, Option<&str>)> {
    let Some(open) = segment.find('(') else {
        if segment.contains(')') {
            return Err(ODataError::invalid(format!("unbalanced parentheses in '{}'", segment)));
        }
        return Ok((segment, None));
    };
    let name = &segment[..open];
    let inner = segment[open + 1..]
        .strip_suffix(')')
        .ok_or_else(|| ODataError::invalid(format!("unbalanced parentheses in '{}'", segment)))?;
    if name.is_empty() {
        return Err(ODataError::invalid(format!("missing name in '{}'", segment)));
    }
    Ok((name, Some(inner)))
}

fn parse_keys(def: &EntityTypeDef, text: &str) -> ODataResult<Vec<KeyPredicate>> {
    let parts = split_outside_quotes(text, ',');
    if parts.iter().any(|p| p.trim().is_empty()) {
        return Err(ODataError::invalid(format!(
            "empty key predicate for {}",
            def.name
        )));
    }

    if let [only] = parts.as_slice() {
        if find_outside_quotes(only, '=').is_none() {
            let key = def.single_key().ok_or_else(|| {
                ODataError::invalid(format!(
                    "{} has a composite key; name every key property",
                    def.name
                ))
            })?;
            return Ok(vec![KeyPredicate::new(key.name.clone(), parse_literal(only)?)]);
        }
    }

    let mut predicates: Vec<KeyPredicate> = Vec::with_capacity(parts.len());
    for part in parts {
        let eq = find_outside_quotes(part, '=')
            .ok_or_else(|| ODataError::invalid(format!("expected name=value in '{}'", part)))?;
        let name = part[..eq].trim();
        if !def.is_key(name) {
            return Err(ODataError::invalid(format!(
                "'{}' is not a key property of {}",
                name, def.name
            )));
        }
        if predicates.iter().any(|p| p.name == name) {
            return Err(ODataError::invalid(format!("key '{}' given twice", name)));
        }
        predicates.push(KeyPredicate::new(name, parse_literal(&part[eq + 1..])?));
    }
    if predicates.len() != def.key.len() {
        return Err(ODataError::invalid(format!(
            "{} requires values for {}",
            def.name,
            def.key.join(", ")
        )));
    }
    Ok(predicates)
}

/// String literals are unquoted with `''` collapsed; everything else is kept verbatim.
fn parse_literal(raw: &str) -> ODataResult<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ODataError::invalid("empty key literal"));
    }
    let Some(rest) = raw.strip_prefix('\'') else {
        if raw.contains('\'') {
            return Err(ODataError::invalid(format!("malformed key literal {}", raw)));
        }
        return Ok(raw.to_string());
    };
    let inner = rest
        .strip_suffix('\'')
        .ok_or_else(|| ODataError::invalid(format!("unterminated string literal {}", raw)))?;

    let mut text = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\'' {
            if chars.next_if_eq(&'\'').is_none() {
                return Err(ODataError::invalid(format!("malformed key literal {}", raw)));
            }
        }
        text.push(c);
    }
    Ok(text)
}

fn split_outside_quotes(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_quote = false;
    for (i, c) in text.char_indices() {
        if c == '\'' {
            in_quote = !in_quote;
        } else if c == separator && !in_quote {
            parts.push(&text[start..i]);
            start = i + c.len_utf8();
        }
    }
    parts.push(&text[start..]);
    parts
}

fn find_outside_quotes(text: &str, target: char) -> Option<usize> {
    let mut in_quote = false;
    for (i, c) in text.char_indices() {
        if c == '\'' {
            in_quote = !in_quote;
        } else if c == target && !in_quote {
            return Some(i);
        }
    }
    None
}
