//! Fixpoint interpolation
//!
//! Repeatedly scans every string scalar for reference markers and
//! substitutes resolved values until a full pass makes no substitution.
//! Each pass resolves against a snapshot taken at pass start, so the
//! outcome does not depend on traversal order. A marker whose target
//! still contains markers of its own is deferred to a later pass rather
//! than partially substituted; a pass that makes no progress while
//! markers remain is a cycle.

use log::{debug, trace};

use crate::error::{Error, ErrorKind, Result};
use crate::interpolation::{self, Interpolation};
use crate::overrides::Overrides;
use crate::value::Value;

/// Resolve every reference marker in `tree`, consulting `overrides`
/// before the tree itself
///
/// Returns the fully resolved tree. Running it again on a result that
/// contains no `${` text is a no-op; text produced by unescaping `\${`
/// is a genuine literal `${` and reads as a live marker on a later
/// call. Fails with `UnresolvedReference` for a marker with no match
/// and no default, and with `CyclicReference` when no fixpoint exists.
pub fn interpolate(tree: Value, overrides: &Overrides) -> Result<Value> {
    // One pass can always retire at least one marker unless the
    // remaining markers form a cycle, so node_count passes suffice.
    let max_passes = tree.node_count().max(1);
    let mut current = tree;

    for pass in 1..=max_passes {
        let snapshot = current.clone();
        let mut stats = PassStats::default();
        let next = resolve_node(&current, "", &snapshot, overrides, &mut stats)?;

        debug!(
            "interpolation pass {}: {} substitutions, {} deferred",
            pass,
            stats.substitutions,
            stats.deferred.len()
        );

        if stats.substitutions == 0 {
            if let Some((expr, at)) = stats.deferred.into_iter().next() {
                // No progress but markers remain: every one of them is
                // waiting on another, which is a cycle.
                return Err(Error::cyclic_reference(expr, at));
            }
            return Ok(unescape_tree(next));
        }

        current = next;
    }

    // More passes than nodes without reaching a fixpoint.
    Err(Error::cyclic_reference("<unknown>", ""))
}

#[derive(Default)]
struct PassStats {
    substitutions: usize,
    /// (marker path expression, scalar location) pairs left for a later pass
    deferred: Vec<(String, String)>,
}

/// Outcome of resolving one marker expression within a pass
enum Outcome {
    Done(Value),
    /// The referenced path still contains markers; retry next pass
    Defer(String),
}

fn resolve_node(
    node: &Value,
    path: &str,
    snapshot: &Value,
    overrides: &Overrides,
    stats: &mut PassStats,
) -> Result<Value> {
    match node {
        Value::String(s) if interpolation::contains_marker(s) => {
            let parsed = interpolation::parse(s)?;
            if !parsed.has_refs() {
                // All marker-looking text turned out escaped; an identity
                // rewrite must not count as progress.
                return Ok(node.clone());
            }
            match resolve_expr(&parsed, path, snapshot, overrides)? {
                Outcome::Done(value) => {
                    trace!("substituted '{}' at {}", s, path);
                    stats.substitutions += 1;
                    Ok(value)
                }
                Outcome::Defer(expr) => {
                    stats.deferred.push((expr, path.to_string()));
                    Ok(node.clone())
                }
            }
        }
        Value::Sequence(seq) => {
            let mut resolved = Vec::with_capacity(seq.len());
            for (i, item) in seq.iter().enumerate() {
                let item_path = format!("{}[{}]", path, i);
                resolved.push(resolve_node(item, &item_path, snapshot, overrides, stats)?);
            }
            Ok(Value::Sequence(resolved))
        }
        Value::Mapping(map) => {
            let mut resolved = indexmap::IndexMap::new();
            for (key, val) in map {
                let key_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };
                resolved.insert(
                    key.clone(),
                    resolve_node(val, &key_path, snapshot, overrides, stats)?,
                );
            }
            Ok(Value::Mapping(resolved))
        }
        _ => Ok(node.clone()),
    }
}

/// Resolve a parsed marker expression against overrides then the snapshot
///
/// `scalar_path` is the location of the scalar being resolved, used for
/// error context only.
fn resolve_expr(
    expr: &Interpolation,
    scalar_path: &str,
    snapshot: &Value,
    overrides: &Overrides,
) -> Result<Outcome> {
    match expr {
        Interpolation::Literal(s) => Ok(Outcome::Done(Value::String(s.clone()))),

        Interpolation::Ref { path, default } => {
            // Overrides shadow document-internal values. Override values
            // are opaque: any marker-looking text in them is escaped so
            // later passes leave it alone, and the post-fixpoint rewrite
            // restores it verbatim.
            if let Some(value) = overrides.get(path) {
                return Ok(Outcome::Done(protect_opaque(value)));
            }

            match snapshot.get_path(path) {
                Ok(value) => {
                    if has_live_markers(value) {
                        // Target not yet resolved; retry next pass.
                        Ok(Outcome::Defer(path.clone()))
                    } else {
                        Ok(Outcome::Done(value.clone()))
                    }
                }
                Err(e) if e.kind == ErrorKind::PathNotFound => match default {
                    Some(fallback) => resolve_expr(fallback, scalar_path, snapshot, overrides),
                    None => Err(Error::unresolved_reference(path, scalar_path)),
                },
                Err(e) => Err(e.with_path(scalar_path)),
            }
        }

        Interpolation::Concat(parts) => {
            let mut result = String::new();
            for part in parts {
                match part {
                    // Literal parts keep escape sequences verbatim; they
                    // are rewritten after the fixpoint.
                    Interpolation::Literal(s) => result.push_str(s),
                    other => match resolve_expr(other, scalar_path, snapshot, overrides)? {
                        Outcome::Done(value) => match value {
                            Value::String(s) => result.push_str(&s),
                            // Canonical scalar rendering for everything else
                            other_value => result.push_str(&other_value.to_string()),
                        },
                        Outcome::Defer(expr) => return Ok(Outcome::Defer(expr)),
                    },
                }
            }
            Ok(Outcome::Done(Value::String(result)))
        }
    }
}

/// Escape marker starts in an override value before substitution
fn protect_opaque(value: &Value) -> Value {
    match value {
        Value::String(s) if interpolation::needs_processing(s) => {
            Value::String(interpolation::escape(s))
        }
        other => other.clone(),
    }
}

/// Check whether any string scalar under `value` still carries a live marker
fn has_live_markers(value: &Value) -> bool {
    match value {
        Value::String(s) => interpolation::contains_marker(s),
        Value::Sequence(seq) => seq.iter().any(has_live_markers),
        Value::Mapping(map) => map.values().any(has_live_markers),
        _ => false,
    }
}

/// Rewrite escaped markers to literal `${` throughout the tree
fn unescape_tree(value: Value) -> Value {
    match value {
        Value::String(s) if s.contains("\\${") => Value::String(interpolation::unescape(&s)),
        Value::Sequence(seq) => Value::Sequence(seq.into_iter().map(unescape_tree).collect()),
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(k, v)| (k, unescape_tree(v)))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn yaml(input: &str) -> Value {
        serde_yaml::from_str(input).unwrap()
    }

    #[test]
    fn test_plain_tree_passes_through() {
        let tree = yaml("a: 1\nb: text\n");
        let resolved = interpolate(tree.clone(), &Overrides::new()).unwrap();
        assert_eq!(resolved, tree);
    }

    #[test]
    fn test_simple_reference() {
        let tree = yaml("defaults:\n  host: localhost\ndatabase:\n  host: ${defaults.host}\n");
        let resolved = interpolate(tree, &Overrides::new()).unwrap();
        assert_eq!(
            resolved.get_path("database.host").unwrap().as_str(),
            Some("localhost")
        );
    }

    #[test]
    fn test_fixpoint_chain() {
        // {a:"1", b:"${a}2", c:"${b}3"} resolves to {a:"1", b:"12", c:"123"}
        let tree = yaml("a: \"1\"\nb: ${a}2\nc: ${b}3\n");
        let resolved = interpolate(tree, &Overrides::new()).unwrap();

        assert_eq!(resolved.get_path("a").unwrap().as_str(), Some("1"));
        assert_eq!(resolved.get_path("b").unwrap().as_str(), Some("12"));
        assert_eq!(resolved.get_path("c").unwrap().as_str(), Some("123"));
    }

    #[test]
    fn test_override_shadows_document() {
        let tree = yaml("a: \"1\"\nb: ${a}\n");
        let mut overrides = Overrides::new();
        overrides.insert("a", "9");

        let resolved = interpolate(tree, &overrides).unwrap();

        assert_eq!(resolved.get_path("b").unwrap().as_str(), Some("9"));
        // The document's own value at 'a' stays untouched; overrides are
        // a lookup source, not a patch.
        assert_eq!(resolved.get_path("a").unwrap().as_str(), Some("1"));
    }

    #[test]
    fn test_unresolved_reference_names_path() {
        let tree = yaml("a: ${missing}\n");
        let err = interpolate(tree, &Overrides::new()).unwrap_err();

        assert_eq!(
            err.kind,
            ErrorKind::UnresolvedReference {
                expr: "missing".into()
            }
        );
        assert_eq!(err.path, Some("a".into()));
    }

    #[test]
    fn test_default_fallback() {
        let tree = yaml("a: ${missing, fallback}\n");
        let resolved = interpolate(tree, &Overrides::new()).unwrap();
        assert_eq!(resolved.get_path("a").unwrap().as_str(), Some("fallback"));
    }

    #[test]
    fn test_default_ignored_when_value_exists() {
        let tree = yaml("host: real\na: ${host, fallback}\n");
        let resolved = interpolate(tree, &Overrides::new()).unwrap();
        assert_eq!(resolved.get_path("a").unwrap().as_str(), Some("real"));
    }

    #[test]
    fn test_default_referencing_another_path() {
        let tree = yaml("backup: b-host\na: ${missing, ${backup}}\n");
        let resolved = interpolate(tree, &Overrides::new()).unwrap();
        assert_eq!(resolved.get_path("a").unwrap().as_str(), Some("b-host"));
    }

    #[test]
    fn test_cycle_detection() {
        let tree = yaml("a: ${b}\nb: ${a}\n");
        let err = interpolate(tree, &Overrides::new()).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::CyclicReference { .. }));
    }

    #[test]
    fn test_self_cycle_detection() {
        let tree = yaml("a: ${a}\n");
        let err = interpolate(tree, &Overrides::new()).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::CyclicReference { .. }));
    }

    #[test]
    fn test_three_way_cycle_detection() {
        let tree = yaml("a: ${b}\nb: ${c}\nc: ${a}\n");
        let err = interpolate(tree, &Overrides::new()).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::CyclicReference { .. }));
    }

    #[test]
    fn test_cycle_broken_by_override() {
        // The cycle disappears when an override shadows one member
        let tree = yaml("a: ${b}\nb: ${a}\n");
        let mut overrides = Overrides::new();
        overrides.insert("b", "grounded");

        let resolved = interpolate(tree, &overrides).unwrap();
        assert_eq!(resolved.get_path("a").unwrap().as_str(), Some("grounded"));
        assert_eq!(resolved.get_path("b").unwrap().as_str(), Some("grounded"));
    }

    #[test]
    fn test_whole_marker_preserves_type() {
        let tree = yaml("port: 5432\ncopied: ${port}\n");
        let resolved = interpolate(tree, &Overrides::new()).unwrap();
        assert_eq!(resolved.get_path("copied").unwrap().as_i64(), Some(5432));
    }

    #[test]
    fn test_whole_marker_copies_structure() {
        let tree = yaml("database:\n  host: localhost\n  port: 5432\nalias: ${database}\n");
        let resolved = interpolate(tree, &Overrides::new()).unwrap();

        assert_eq!(
            resolved.get_path("alias.host").unwrap().as_str(),
            Some("localhost")
        );
        assert_eq!(resolved.get_path("alias.port").unwrap().as_i64(), Some(5432));
    }

    #[test]
    fn test_embedded_marker_renders_canonically() {
        let tree = yaml("port: 5432\nurl: host:${port}/db\nflag: is-${enabled}\nenabled: true\n");
        let resolved = interpolate(tree, &Overrides::new()).unwrap();

        assert_eq!(
            resolved.get_path("url").unwrap().as_str(),
            Some("host:5432/db")
        );
        assert_eq!(resolved.get_path("flag").unwrap().as_str(), Some("is-true"));
    }

    #[test]
    fn test_structure_referencing_structure() {
        // A marker whose target contains its own markers resolves once
        // the target has been resolved.
        let tree = yaml(
            "stage: prod\ndatabase:\n  name: app-${stage}\nalias: ${database}\n",
        );
        let resolved = interpolate(tree, &Overrides::new()).unwrap();
        assert_eq!(
            resolved.get_path("alias.name").unwrap().as_str(),
            Some("app-prod")
        );
    }

    #[test]
    fn test_markers_in_sequences() {
        let tree = yaml("stage: dev\nnames:\n  - app-${stage}\n  - ${stage}\n");
        let resolved = interpolate(tree, &Overrides::new()).unwrap();

        let names = resolved.get_path("names").unwrap().as_sequence().unwrap();
        assert_eq!(names[0].as_str(), Some("app-dev"));
        assert_eq!(names[1].as_str(), Some("dev"));
    }

    #[test]
    fn test_sequence_index_reference() {
        let tree = yaml("servers:\n  - host: server1\n  - host: server2\nprimary: ${servers[0].host}\n");
        let resolved = interpolate(tree, &Overrides::new()).unwrap();
        assert_eq!(
            resolved.get_path("primary").unwrap().as_str(),
            Some("server1")
        );
    }

    #[test]
    fn test_escaped_marker_becomes_literal() {
        let tree = yaml("literal: '\\${not_resolved}'\n");
        let resolved = interpolate(tree, &Overrides::new()).unwrap();
        assert_eq!(
            resolved.get_path("literal").unwrap().as_str(),
            Some("${not_resolved}")
        );
    }

    #[test]
    fn test_escaped_marker_next_to_live_marker() {
        let tree = yaml("stage: dev\nmixed: '\\${raw}-${stage}'\n");
        let resolved = interpolate(tree, &Overrides::new()).unwrap();
        assert_eq!(
            resolved.get_path("mixed").unwrap().as_str(),
            Some("${raw}-dev")
        );
    }

    #[test]
    fn test_backslash_before_escaped_marker_resolves() {
        // '\\${x}' is a literal backslash plus an escaped marker, not a
        // live reference; only the escape is rewritten.
        let tree = yaml("a: '\\\\${x}'\n");
        let resolved = interpolate(tree, &Overrides::new()).unwrap();
        assert_eq!(resolved.get_path("a").unwrap().as_str(), Some("\\${x}"));
    }

    #[test]
    fn test_live_marker_after_backslash_prefixed_escape() {
        let tree = yaml("stage: dev\na: '\\\\${x}-${stage}'\n");
        let resolved = interpolate(tree, &Overrides::new()).unwrap();
        assert_eq!(
            resolved.get_path("a").unwrap().as_str(),
            Some("\\${x}-dev")
        );
    }

    #[test]
    fn test_idempotent_on_resolved_tree() {
        let tree = yaml("a: \"1\"\nb: ${a}2\nc: ${b}3\n");
        let resolved = interpolate(tree, &Overrides::new()).unwrap();

        let mut overrides = Overrides::new();
        overrides.insert("a", "ignored");
        let again = interpolate(resolved.clone(), &overrides).unwrap();

        assert_eq!(again, resolved);
    }

    #[test]
    fn test_escapes_are_consumed_once() {
        // Unescaping produces genuine literal ${...} text; a second
        // interpolate call sees it as a live marker again.
        let tree = yaml("literal: '\\${raw}'\n");
        let resolved = interpolate(tree, &Overrides::new()).unwrap();
        assert_eq!(
            resolved.get_path("literal").unwrap().as_str(),
            Some("${raw}")
        );

        let err = interpolate(resolved, &Overrides::new()).unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::UnresolvedReference { expr: "raw".into() }
        );
    }

    #[test]
    fn test_override_type_preserved_for_whole_marker() {
        let tree = yaml("timeout: ${limits.timeout}\n");
        let mut overrides = Overrides::new();
        overrides.insert("limits.timeout", 30i64);

        let resolved = interpolate(tree, &overrides).unwrap();
        assert_eq!(resolved.get_path("timeout").unwrap().as_i64(), Some(30));
    }

    #[test]
    fn test_override_wins_over_default() {
        let tree = yaml("a: ${stage, dev}\n");
        let mut overrides = Overrides::new();
        overrides.insert("stage", "prod");

        let resolved = interpolate(tree, &overrides).unwrap();
        assert_eq!(resolved.get_path("a").unwrap().as_str(), Some("prod"));
    }

    #[test]
    fn test_override_values_are_opaque() {
        // Markers inside an override value are not expanded
        let tree = yaml("real: value\na: ${key}\n");
        let mut overrides = Overrides::new();
        overrides.insert("key", "${real}");

        let resolved = interpolate(tree, &overrides).unwrap();
        assert_eq!(resolved.get_path("a").unwrap().as_str(), Some("${real}"));
    }

    #[test]
    fn test_unresolved_inside_default_surfaces() {
        let tree = yaml("a: ${missing, ${also_missing}}\n");
        let err = interpolate(tree, &Overrides::new()).unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::UnresolvedReference {
                expr: "also_missing".into()
            }
        );
    }

    #[test]
    fn test_deep_chain_resolves() {
        // A chain as long as the tree still converges within the bound
        let tree = yaml("a: \"0\"\nb: ${a}\nc: ${b}\nd: ${c}\ne: ${d}\nf: ${e}\n");
        let resolved = interpolate(tree, &Overrides::new()).unwrap();
        assert_eq!(resolved.get_path("f").unwrap().as_str(), Some("0"));
    }

    #[test]
    fn test_determinism() {
        let input = "stage: prod\nname: app-${stage}\ncopy: ${name}\n";
        let first = interpolate(yaml(input), &Overrides::new()).unwrap();
        let second = interpolate(yaml(input), &Overrides::new()).unwrap();
        assert_eq!(first, second);
    }
}
