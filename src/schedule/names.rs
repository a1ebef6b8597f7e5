use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::employee::{EmployeeSummary, FullNameUpdate};

/// Kazakh-specific letters folded onto the nearest Russian letter.
static KAZAKH_TO_RUSSIAN: Lazy<HashMap<char, char>> = Lazy::new(|| {
    HashMap::from([
        ('Ә', 'А'),
        ('ә', 'а'),
        ('Ғ', 'Г'),
        ('ғ', 'г'),
        ('Қ', 'К'),
        ('қ', 'к'),
        ('Ң', 'Н'),
        ('ң', 'н'),
        ('Ө', 'О'),
        ('ө', 'о'),
        ('Ұ', 'У'),
        ('ұ', 'у'),
        ('Ү', 'У'),
        ('ү', 'у'),
        ('Һ', 'Х'),
        ('һ', 'х'),
        ('І', 'И'),
        ('і', 'и'),
    ])
});

#[inline]
pub fn normalize_char(c: char) -> char {
    KAZAKH_TO_RUSSIAN.get(&c).copied().unwrap_or(c)
}

/// Matching key for a "Surname I.O." or "Surname Given Patronymic" name:
/// the uppercased surname followed by the uppercased initials.
///
/// Different people sharing a surname and initials collide; callers only
/// ever count mismatches.
pub fn name_key(name: &str) -> String {
    let folded: String = name
        .chars()
        .map(normalize_char)
        .map(|c| if c == '.' { ' ' } else { c })
        .collect();

    let mut tokens = folded.split_whitespace();
    let Some(surname) = tokens.next() else {
        return String::new();
    };

    let mut key = surname.to_uppercase();
    for token in tokens {
        let Some(initial) = token.chars().next() else {
            continue;
        };
        if !initial.is_alphabetic() {
            continue;
        }
        key.extend(initial.to_uppercase());
    }
    key
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NameMapping {
    #[schema(example = "Иванов И.И.")]
    pub short_name: String,
    #[schema(example = "Иванов Иван Иванович")]
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct NameMatchReport {
    pub mapping: Vec<NameMapping>,
    pub matched: usize,
    pub not_matched: usize,
    pub total_short: usize,
    pub total_full: usize,
}

/// Pairs abbreviated names with expanded ones through [`name_key`].
/// A later full name with the same key replaces an earlier one.
pub fn match_names(short_names: &[String], full_names: &[String]) -> NameMatchReport {
    let mut by_key: HashMap<String, &str> = HashMap::with_capacity(full_names.len());
    for full in full_names {
        let key = name_key(full);
        if !key.is_empty() {
            by_key.insert(key, full.as_str());
        }
    }

    let mut seen = HashSet::new();
    let mut mapping = Vec::new();
    for short in short_names {
        if !seen.insert(short.as_str()) {
            continue;
        }
        let key = name_key(short);
        if key.is_empty() {
            continue;
        }
        if let Some(full) = by_key.get(&key) {
            mapping.push(NameMapping {
                short_name: short.clone(),
                full_name: (*full).to_string(),
            });
        }
    }

    NameMatchReport {
        matched: mapping.len(),
        not_matched: short_names.len().saturating_sub(mapping.len()),
        total_short: short_names.len(),
        total_full: full_names.len(),
        mapping,
    }
}

/// Resolves each mapped short name to an employee by exact display name.
/// Returns the updates to push and how many short names had no employee.
pub fn plan_updates(
    mapping: &[NameMapping],
    employees: &[EmployeeSummary],
) -> (Vec<FullNameUpdate>, usize) {
    let by_name: HashMap<&str, u64> = employees
        .iter()
        .map(|e| (e.full_name.as_str(), e.id))
        .collect();

    let mut updates = Vec::with_capacity(mapping.len());
    let mut not_found = 0;
    for m in mapping {
        match by_name.get(m.short_name.as_str()) {
            Some(&employee_id) => updates.push(FullNameUpdate {
                employee_id,
                full_name_expanded: m.full_name.clone(),
            }),
            None => not_found += 1,
        }
    }
    (updates, not_found)
}

/// Splits an uploaded text file into trimmed, non-empty lines.
pub fn parse_name_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}
