//! Column listing and selector matching.
//!
//! A table exposes its own top-level columns plus those of any friend tables
//! attached to it. [`top_level_names`] flattens that tree into the names a
//! selector can address, and [`resolve_columns`] filters them through a
//! [`ColumnMatcher`].

use std::collections::HashSet;

use regex::Regex;

use crate::error::{ReadSpeedError, Result};

/// Top-level column structure of a table, including attached friends.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColumnLayout {
    /// Identity of the table; each identity is visited once while listing.
    pub table: String,
    /// Own top-level column names, in storage order.
    pub columns: Vec<String>,
    /// Friend tables whose columns are readable through this one.
    pub friends: Vec<FriendLayout>,
}

/// A friend table attached under an alias.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FriendLayout {
    /// Alias used to qualify clashing column names.
    pub alias: String,
    /// Layout of the friend table.
    pub layout: ColumnLayout,
}

impl ColumnLayout {
    /// Layout with plain columns and no friends.
    pub fn new<C: Into<String>>(
        table: impl Into<String>,
        columns: impl IntoIterator<Item = C>,
    ) -> Self {
        Self {
            table: table.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            friends: Vec::new(),
        }
    }

    /// Attach a friend under `alias`.
    pub fn with_friend(mut self, alias: impl Into<String>, layout: ColumnLayout) -> Self {
        self.friends.push(FriendLayout {
            alias: alias.into(),
            layout,
        });
        self
    }
}

/// Names of all top-level columns reachable from `layout`.
///
/// Own columns come first, then friends depth-first. A friend column whose
/// name is already taken is listed as `<alias>.<name>`.
pub fn top_level_names(layout: &ColumnLayout) -> Vec<String> {
    let mut registered = HashSet::new();
    let mut names = Vec::new();
    let mut visited = HashSet::new();
    collect_names(layout, None, &mut registered, &mut names, &mut visited);
    names
}

fn collect_names<'a>(
    layout: &'a ColumnLayout,
    friend_alias: Option<&str>,
    registered: &mut HashSet<String>,
    names: &mut Vec<String>,
    visited: &mut HashSet<&'a str>,
) {
    if !visited.insert(layout.table.as_str()) {
        return;
    }

    for column in &layout.columns {
        if registered.insert(column.clone()) {
            names.push(column.clone());
        } else if let Some(alias) = friend_alias {
            let qualified = format!("{alias}.{column}");
            if registered.insert(qualified.clone()) {
                names.push(qualified);
            }
        }
    }

    for friend in &layout.friends {
        collect_names(
            &friend.layout,
            Some(&friend.alias),
            registered,
            names,
            visited,
        );
    }
}

/// Compiled column selectors, built once per run.
#[derive(Debug, Clone)]
pub struct ColumnMatcher {
    selectors: Vec<Selector>,
    use_regex: bool,
}

#[derive(Debug, Clone)]
enum Selector {
    Literal(String),
    Pattern { source: String, regex: Regex },
}

impl Selector {
    fn source(&self) -> &str {
        match self {
            Selector::Literal(name) => name,
            Selector::Pattern { source, .. } => source,
        }
    }

    fn matches(&self, name: &str) -> bool {
        match self {
            Selector::Literal(literal) => literal == name,
            Selector::Pattern { regex, .. } => regex.is_match(name),
        }
    }
}

impl ColumnMatcher {
    /// Compile `selectors`; patterns must match a whole column name.
    pub fn new<S: AsRef<str>>(selectors: &[S], use_regex: bool) -> Result<Self> {
        let selectors = selectors
            .iter()
            .map(|selector| {
                let selector = selector.as_ref();
                if !use_regex {
                    return Ok(Selector::Literal(selector.to_string()));
                }
                Regex::new(&format!("^(?:{selector})$"))
                    .map(|regex| Selector::Pattern {
                        source: selector.to_string(),
                        regex,
                    })
                    .map_err(|err| {
                        ReadSpeedError::config(format!(
                            "invalid column pattern '{selector}': {err}"
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            selectors,
            use_regex,
        })
    }

    /// Whether selectors are patterns.
    pub fn use_regex(&self) -> bool {
        self.use_regex
    }

    /// Filter `available` down to the names matched by any selector, preserving order.
    ///
    /// Returns the matched names and the selectors that matched nothing.
    pub fn filter<'a>(&'a self, available: &[String]) -> (Vec<String>, Vec<&'a str>) {
        let mut used = vec![false; self.selectors.len()];
        let matched = available
            .iter()
            .filter(|name| {
                match self
                    .selectors
                    .iter()
                    .position(|selector| selector.matches(name))
                {
                    Some(idx) => {
                        used[idx] = true;
                        true
                    }
                    None => false,
                }
            })
            .cloned()
            .collect();
        let unused = self
            .selectors
            .iter()
            .zip(used)
            .filter(|(_, used)| !used)
            .map(|(selector, _)| selector.source())
            .collect();
        (matched, unused)
    }
}

/// Resolve the concrete columns of `layout` selected by `matcher`.
///
/// Fails when pattern mode matches nothing, or when any selector goes unused.
pub fn resolve_columns(
    layout: &ColumnLayout,
    matcher: &ColumnMatcher,
    file: &str,
) -> Result<Vec<String>> {
    let available = top_level_names(layout);
    let (columns, unused) = matcher.filter(&available);

    let column_error = |reason: String| ReadSpeedError::Column {
        table: layout.table.clone(),
        file: file.to_string(),
        reason,
    };

    if columns.is_empty() && matcher.use_regex() {
        return Err(column_error(
            "provided column patterns didn't match any columns".to_string(),
        ));
    }
    if !unused.is_empty() {
        return Err(column_error(format!(
            "the following columns/patterns weren't found: {}",
            unused.join(", ")
        )));
    }
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> ColumnLayout {
        ColumnLayout::new("t", ["x", "x_branch", "y_brunch", "mismatched"])
    }

    #[test]
    fn friends_are_listed_after_own_columns() {
        let friend = ColumnLayout::new("f", ["x", "z"]);
        let names = top_level_names(&layout().with_friend("fr", friend));
        assert_eq!(
            names,
            vec!["x", "x_branch", "y_brunch", "mismatched", "fr.x", "z"]
        );
    }

    #[test]
    fn each_table_is_visited_once() {
        let inner = ColumnLayout::new("g", ["w"]);
        let friend = ColumnLayout::new("f", ["z"]).with_friend("g1", inner.clone());
        let root = ColumnLayout::new("t", ["x"])
            .with_friend("f", friend)
            .with_friend("g2", inner);
        assert_eq!(top_level_names(&root), vec!["x", "z", "w"]);
    }

    #[test]
    fn literal_selection_keeps_storage_order() {
        let matcher = ColumnMatcher::new(&["y_brunch", "x"], false).unwrap();
        let columns = resolve_columns(&layout(), &matcher, "f.parquet").unwrap();
        assert_eq!(columns, vec!["x", "y_brunch"]);
    }

    #[test]
    fn patterns_match_whole_names() {
        let matcher = ColumnMatcher::new(&["(x|y)_.*nch"], true).unwrap();
        let columns = resolve_columns(&layout(), &matcher, "f.parquet").unwrap();
        assert_eq!(columns, vec!["x_branch", "y_brunch"]);

        let matcher = ColumnMatcher::new(&[".*"], true).unwrap();
        assert_eq!(
            resolve_columns(&layout(), &matcher, "f.parquet").unwrap().len(),
            4
        );
    }

    #[test]
    fn unmatched_selectors_fail() {
        let matcher = ColumnMatcher::new(&["z_.*"], true).unwrap();
        let err = resolve_columns(&layout(), &matcher, "f.parquet").unwrap_err();
        assert!(matches!(err, ReadSpeedError::Column { .. }));

        let matcher = ColumnMatcher::new(&["x_.*"], false).unwrap();
        assert!(matches!(
            resolve_columns(&layout(), &matcher, "f.parquet"),
            Err(ReadSpeedError::Column { .. })
        ));

        let matcher = ColumnMatcher::new(&["x", "nope"], false).unwrap();
        let err = resolve_columns(&layout(), &matcher, "f.parquet").unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn invalid_pattern_is_a_config_error() {
        assert!(matches!(
            ColumnMatcher::new(&["(unclosed"], true),
            Err(ReadSpeedError::Config(_))
        ));
        ColumnMatcher::new(&["(unclosed"], false).unwrap();
    }
}
