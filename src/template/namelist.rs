// src/template/namelist.rs

//! Minimal Fortran namelist editor.
//!
//! Only what the WPS templates need: groups of `key = value` entries, `!`
//! comments, and values continued over several lines. Untouched entries
//! keep their original value text.

use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;

static ENTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z][A-Za-z0-9_]*(?:\([^)]*\))?)\s*=\s*(.*)$")
        .expect("namelist entry regex is valid")
});

/// A value written into a namelist.
#[derive(Debug, Clone, PartialEq)]
pub enum NmlValue {
    Str(String),
    Real(f64),
    List(Vec<NmlValue>),
}

impl NmlValue {
    pub fn render(&self) -> String {
        match self {
            NmlValue::Str(s) => format!("'{}'", s.replace('\'', "''")),
            NmlValue::Real(v) if v.fract() == 0.0 => format!("{v:.1}"),
            NmlValue::Real(v) => format!("{v}"),
            NmlValue::List(items) => items
                .iter()
                .map(NmlValue::render)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Entry {
    key: String,
    value: String,
}

#[derive(Debug, Clone, PartialEq)]
struct Group {
    name: String,
    entries: Vec<Entry>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Namelist {
    groups: Vec<Group>,
}

impl Namelist {
    pub fn parse(text: &str) -> Result<Self, String> {
        let mut groups = Vec::new();
        let mut current: Option<Group> = None;

        for (lineno, raw) in text.lines().enumerate() {
            let line = strip_comment(raw).trim();
            if line.is_empty() {
                continue;
            }

            if current.is_none() {
                let Some(name) = line.strip_prefix('&') else {
                    return Err(format!(
                        "line {}: content outside of a namelist group",
                        lineno + 1
                    ));
                };
                current = Some(Group {
                    name: name.trim().to_lowercase(),
                    entries: Vec::new(),
                });
                continue;
            }
            let Some(group) = current.as_mut() else {
                continue;
            };

            if line == "/" || line.eq_ignore_ascii_case("&end") {
                groups.extend(current.take());
                continue;
            }

            if let Some(caps) = ENTRY_RE.captures(line) {
                group.entries.push(Entry {
                    key: caps[1].to_lowercase(),
                    value: trim_value(&caps[2]).to_string(),
                });
            } else if let Some(last) = group.entries.last_mut() {
                let more = trim_value(line);
                if !more.is_empty() {
                    last.value.push_str(", ");
                    last.value.push_str(more);
                }
            } else {
                return Err(format!(
                    "line {}: value without a key in group '{}'",
                    lineno + 1,
                    group.name
                ));
            }
        }

        if let Some(group) = current {
            return Err(format!("group '{}' is not terminated with '/'", group.name));
        }

        Ok(Self { groups })
    }

    /// Raw value text of `group.key`, if present.
    pub fn get(&self, group: &str, key: &str) -> Option<&str> {
        let group = self.group(group)?;
        let key = key.to_lowercase();
        group
            .entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.value.as_str())
    }

    /// Set `group.key`, appending the key if the group does not have it.
    ///
    /// The group itself must exist in the template.
    pub fn set(&mut self, group: &str, key: &str, value: NmlValue) -> Result<(), String> {
        let name = group.to_lowercase();
        let group = self
            .groups
            .iter_mut()
            .find(|g| g.name == name)
            .ok_or_else(|| format!("namelist has no '&{name}' group"))?;

        let key = key.to_lowercase();
        let rendered = value.render();
        match group.entries.iter_mut().find(|e| e.key == key) {
            Some(entry) => entry.value = rendered,
            None => group.entries.push(Entry {
                key,
                value: rendered,
            }),
        }
        Ok(())
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for group in &self.groups {
            let _ = writeln!(out, "&{}", group.name);
            for entry in &group.entries {
                let _ = writeln!(out, " {} = {},", entry.key, entry.value);
            }
            out.push_str("/\n\n");
        }
        out
    }

    fn group(&self, name: &str) -> Option<&Group> {
        let name = name.to_lowercase();
        self.groups.iter().find(|g| g.name == name)
    }
}

fn trim_value(s: &str) -> &str {
    s.trim().trim_end_matches(',').trim_end()
}

/// Drop a trailing `!` comment, ignoring `!` inside quoted strings.
fn strip_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    for (idx, ch) in line.char_indices() {
        match (quote, ch) {
            (None, '\'' | '"') => quote = Some(ch),
            (Some(q), c) if c == q => quote = None,
            (None, '!') => return &line[..idx],
            _ => {}
        }
    }
    line
}
