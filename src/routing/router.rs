//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Compile contract path items into route entries
//! - Look up the entry governing a request (method + path)
//! - Return the matched entry with its path parameters, or an explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(1) lookup for fully literal paths via HashMap
//! - O(n) scan over parameterised patterns, most literal segments first
//! - One operation per path item (see `PathItem::governing_operation`)

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::http::Method;

use crate::contract::{Operation, PathItem};
use crate::routing::matcher::{PathPattern, PatternError};

/// A compiled route bound to exactly one declared operation.
#[derive(Debug)]
pub struct RouteEntry {
    pub method: Method,
    pub pattern: PathPattern,
    pub operation: Operation,
}

impl RouteEntry {
    /// `METHOD /full/path/{template}`, for logs.
    pub fn describe(&self) -> String {
        format!("{} {}", self.method, self.pattern)
    }
}

/// Result of a successful lookup.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub entry: Arc<RouteEntry>,
    pub params: Vec<(String, String)>,
}

/// Immutable route index built once from the contract.
#[derive(Debug, Default)]
pub struct RouteTable {
    literal: HashMap<Method, HashMap<String, Arc<RouteEntry>>>,
    patterned: HashMap<Method, Vec<Arc<RouteEntry>>>,
    entries: Vec<Arc<RouteEntry>>,
}

impl RouteTable {
    /// Register the governing operation of every path item under
    /// `base_path + template`.
    pub fn build(base_path: &str, paths: &BTreeMap<String, PathItem>) -> Result<Self, PatternError> {
        let mut table = RouteTable::default();

        for (template, item) in paths {
            let Some((method, operation)) = item.governing_operation() else {
                continue;
            };

            let pattern = PathPattern::parse(&join_base_path(base_path, template))?;
            let entry = Arc::new(RouteEntry {
                method: method.clone(),
                pattern,
                operation: operation.clone(),
            });

            if entry.pattern.is_literal() {
                let by_path = table.literal.entry(method).or_default();
                let key = entry.pattern.template().to_string();
                if by_path.contains_key(&key) {
                    tracing::warn!(route = %entry.describe(), "Duplicate route ignored");
                    continue;
                }
                by_path.insert(key, entry.clone());
            } else {
                table.patterned.entry(method).or_default().push(entry.clone());
            }
            table.entries.push(entry);
        }

        // More literal segments first, then template text, so the scan is
        // deterministic and prefers `/widgets/new` over `/widgets/{id}`.
        for candidates in table.patterned.values_mut() {
            candidates.sort_by(|a, b| {
                b.pattern
                    .literal_segments()
                    .cmp(&a.pattern.literal_segments())
                    .then_with(|| a.pattern.template().cmp(b.pattern.template()))
            });
        }

        Ok(table)
    }

    /// Find the route governing `method path`. Pure; safe to call concurrently.
    pub fn lookup(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        if let Some(entry) = self.literal.get(method).and_then(|by_path| by_path.get(path)) {
            return Some(RouteMatch {
                entry: entry.clone(),
                params: Vec::new(),
            });
        }

        self.patterned.get(method)?.iter().find_map(|entry| {
            entry.pattern.matches(path).map(|params| RouteMatch {
                entry: entry.clone(),
                params,
            })
        })
    }

    /// Registered routes in registration order.
    pub fn entries(&self) -> impl Iterator<Item = &Arc<RouteEntry>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Join a base path and a path template without doubling or dropping `/`.
pub fn join_base_path(base_path: &str, template: &str) -> String {
    let base = base_path.trim_end_matches('/');
    if template.starts_with('/') {
        format!("{}{}", base, template)
    } else {
        format!("{}/{}", base, template)
    }
}
