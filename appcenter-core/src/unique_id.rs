// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Unique app identifiers.
//!
//! A unique id is the 5-tuple `scope/bundle-kind/origin/id/branch`. Any
//! segment may be `*`, which matches any value when comparing.

/// Segment value meaning "any"
pub const WILDCARD: &str = "*";

const N_SEGMENTS: usize = 5;

/// Build a unique id, substituting `*` for unset or empty segments
pub fn build(
    scope: Option<&str>,
    bundle_kind: Option<&str>,
    origin: Option<&str>,
    id: &str,
    branch: Option<&str>,
) -> String {
    let seg = |s: Option<&str>| match s {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => WILDCARD.to_string(),
    };
    format!(
        "{}/{}/{}/{}/{}",
        seg(scope),
        seg(bundle_kind),
        seg(origin),
        seg(Some(id)),
        seg(branch)
    )
}

/// Split a unique id into its segments
pub fn parse(unique_id: &str) -> Option<[&str; N_SEGMENTS]> {
    let parts: Vec<&str> = unique_id.split('/').collect();
    if parts.len() != N_SEGMENTS {
        return None;
    }
    Some([parts[0], parts[1], parts[2], parts[3], parts[4]])
}

pub fn is_valid(unique_id: &str) -> bool {
    parse(unique_id).is_some()
}

/// Get the plain id segment
pub fn id_segment(unique_id: &str) -> Option<&str> {
    parse(unique_id).map(|p| p[3])
}

/// Check whether any segment is a wildcard
pub fn has_wildcard(unique_id: &str) -> bool {
    match parse(unique_id) {
        Some(parts) => parts.iter().any(|p| *p == WILDCARD),
        None => false,
    }
}

/// Compare two unique ids, treating `*` segments as matching anything.
///
/// Strings that are not well-formed unique ids only compare equal when
/// they are byte-identical.
pub fn equal(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    match (parse(a), parse(b)) {
        (Some(pa), Some(pb)) => pa
            .iter()
            .zip(pb.iter())
            .all(|(x, y)| x == y || *x == WILDCARD || *y == WILDCARD),
        _ => false,
    }
}
