//! Parsing and re-serialization of `style="..."` attribute declarations.
//!
//! Declaration order is preserved. Property names are stored lowercase, values
//! verbatim (including any `!important` suffix).

use super::css::parse_declarations;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InlineStyle {
    declarations: Vec<(String, String)>,
}

impl InlineStyle {
    pub fn parse(text: &str) -> Self {
        Self {
            declarations: parse_declarations(text),
        }
    }

    pub fn get(&self, prop: &str) -> Option<&str> {
        // Later declarations win, same as the cascade within one block.
        self.declarations
            .iter()
            .rev()
            .find(|(p, _)| p == prop)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, prop: &str) -> bool {
        self.declarations.iter().any(|(p, _)| p == prop)
    }

    /// Replaces every existing declaration of `prop` with a single one at the
    /// position of the first, or appends.
    pub fn set(&mut self, prop: &str, value: impl Into<String>) {
        let value = value.into();
        let prop = prop.to_ascii_lowercase();
        match self.declarations.iter().position(|(p, _)| *p == prop) {
            Some(idx) => {
                self.declarations[idx].1 = value;
                let mut seen = false;
                self.declarations.retain(|(p, _)| {
                    if *p != prop {
                        return true;
                    }
                    let keep = !seen;
                    seen = true;
                    keep
                });
            }
            None => self.declarations.push((prop, value)),
        }
    }

    /// Sets `prop` only if it is not declared yet. Returns whether it was added.
    pub fn set_if_absent(&mut self, prop: &str, value: impl Into<String>) -> bool {
        if self.contains(prop) {
            return false;
        }
        self.set(prop, value);
        true
    }

    pub fn remove(&mut self, prop: &str) -> bool {
        let before = self.declarations.len();
        self.declarations.retain(|(p, _)| p != prop);
        before != self.declarations.len()
    }

    /// Removes every declaration whose property matches. Returns the count removed.
    pub fn remove_where<F: Fn(&str, &str) -> bool>(&mut self, predicate: F) -> usize {
        let before = self.declarations.len();
        self.declarations.retain(|(p, v)| !predicate(p, v));
        before - self.declarations.len()
    }

    /// Appends `other`'s declarations after this one's, as if written later.
    pub fn append(&mut self, other: &InlineStyle) {
        self.declarations.extend(other.declarations.iter().cloned());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.declarations
            .iter()
            .map(|(p, v)| (p.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    pub fn to_css(&self) -> String {
        self.declarations
            .iter()
            .map(|(p, v)| format!("{p}: {v}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}
