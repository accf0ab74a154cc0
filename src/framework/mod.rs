// src/framework/mod.rs

//! Target framework profiles and dependency-group selection
//!
//! A package declares its dependencies in groups, one per target framework.
//! Queries narrow that declaration to a single group: the one whose profile
//! is the nearest compatible match for the caller's target. Compatibility
//! between framework families is defined by a fixed, ordered table; ties
//! between families are broken by table order, never by the order groups
//! appear in the package.

use crate::error::{Error, Result};
use crate::metadata::DependencyGroup;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Framework version as declared in a profile string ("net6.0" → 6.0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameworkVersion {
    pub major: u16,
    pub minor: u16,
}

impl FrameworkVersion {
    pub fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for FrameworkVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// A target compatibility profile
///
/// Identifiers compare case-insensitively. `Any` matches every package and
/// is also the profile of dependency groups declared without a framework.
#[derive(Debug, Clone)]
pub enum TargetFramework {
    Any,
    Specific {
        identifier: String,
        version: FrameworkVersion,
    },
}

/// Ordered fallback table. A target framework accepts dependency groups
/// whose identifier appears in its row, preferring earlier entries.
const COMPATIBILITY: &[(&str, &[&str])] = &[
    ("net", &["net", "netcoreapp", "netstandard"]),
    ("netcoreapp", &["netcoreapp", "netstandard"]),
    ("netframework", &["netframework", "netstandard"]),
    ("netstandard", &["netstandard"]),
];

impl TargetFramework {
    /// Parse a profile string such as "net6.0", "netstandard2.0" or "any"
    pub fn parse(s: &str) -> Result<Self> {
        let t = s.trim();
        if t.is_empty() || t.eq_ignore_ascii_case("any") {
            return Ok(Self::Any);
        }

        let split = t.find(|c: char| c.is_ascii_digit());
        let Some(pos) = split else {
            return Err(Error::InvalidFramework(s.to_string()));
        };
        if pos == 0 {
            return Err(Error::InvalidFramework(s.to_string()));
        }

        let identifier = t[..pos].to_string();
        let version_part = &t[pos..];
        let (major, minor) = match version_part.split_once('.') {
            Some((maj, min)) => (
                maj.parse::<u16>()
                    .map_err(|_| Error::InvalidFramework(s.to_string()))?,
                min.parse::<u16>()
                    .map_err(|_| Error::InvalidFramework(s.to_string()))?,
            ),
            None => (
                version_part
                    .parse::<u16>()
                    .map_err(|_| Error::InvalidFramework(s.to_string()))?,
                0,
            ),
        };

        Ok(Self::Specific {
            identifier,
            version: FrameworkVersion::new(major, minor),
        })
    }

    /// Whether this is the wildcard profile
    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }

    fn identifier_key(&self) -> Option<String> {
        match self {
            Self::Any => None,
            Self::Specific { identifier, .. } => Some(identifier.to_lowercase()),
        }
    }
}

impl PartialEq for TargetFramework {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Any, Self::Any) => true,
            (
                Self::Specific {
                    identifier: a,
                    version: va,
                },
                Self::Specific {
                    identifier: b,
                    version: vb,
                },
            ) => a.eq_ignore_ascii_case(b) && va == vb,
            _ => false,
        }
    }
}

impl Eq for TargetFramework {}

impl Hash for TargetFramework {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Any => 0u8.hash(state),
            Self::Specific {
                identifier,
                version,
            } => {
                1u8.hash(state);
                identifier.to_lowercase().hash(state);
                version.hash(state);
            }
        }
    }
}

impl fmt::Display for TargetFramework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "any"),
            Self::Specific {
                identifier,
                version,
            } => write!(f, "{identifier}{version}"),
        }
    }
}

/// Select the dependency group whose profile is the nearest compatible
/// match for the target
///
/// Rules, in order:
/// 1. Groups in the target's own framework family, highest version not
///    exceeding the target version.
/// 2. Groups in imported families, walking the compatibility table row in
///    order; again highest version wins within a family.
/// 3. A group with the `Any` profile.
///
/// `None` means no group matches; callers treat the package as compatible
/// with no declared dependencies for that target.
pub fn select_nearest<'a>(
    groups: &'a [DependencyGroup],
    target: &TargetFramework,
) -> Option<&'a DependencyGroup> {
    let any_group = groups.iter().find(|g| g.target_framework.is_any());

    let Some(target_key) = target.identifier_key() else {
        // The wildcard target only ever matches wildcard groups
        return any_group;
    };
    let TargetFramework::Specific {
        version: target_version,
        ..
    } = target
    else {
        return any_group;
    };

    let row = COMPATIBILITY
        .iter()
        .find(|(id, _)| *id == target_key)
        .map(|(_, accepts)| *accepts);

    let table_key = [target_key.as_str()];
    let accepted: &[&str] = row.unwrap_or(&table_key);

    for family in accepted {
        let best = groups
            .iter()
            .filter_map(|g| match &g.target_framework {
                TargetFramework::Specific {
                    identifier,
                    version,
                } if identifier.eq_ignore_ascii_case(family)
                    && version <= target_version =>
                {
                    Some((version, g))
                }
                _ => None,
            })
            .max_by_key(|(version, _)| **version);
        if let Some((_, group)) = best {
            return Some(group);
        }
    }

    any_group
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(framework: &str) -> DependencyGroup {
        DependencyGroup {
            target_framework: TargetFramework::parse(framework).unwrap(),
            dependencies: Vec::new(),
        }
    }

    #[test]
    fn test_parse_specific() {
        let fw = TargetFramework::parse("net6.0").unwrap();
        assert_eq!(
            fw,
            TargetFramework::Specific {
                identifier: "net".to_string(),
                version: FrameworkVersion::new(6, 0),
            }
        );
        assert_eq!(fw.to_string(), "net6.0");
    }

    #[test]
    fn test_parse_any() {
        assert!(TargetFramework::parse("any").unwrap().is_any());
        assert!(TargetFramework::parse("").unwrap().is_any());
    }

    #[test]
    fn test_parse_invalid() {
        assert!(TargetFramework::parse("6.0").is_err());
        assert!(TargetFramework::parse("net").is_err());
        assert!(TargetFramework::parse("net6.x").is_err());
    }

    #[test]
    fn test_identifier_case_insensitive() {
        let a = TargetFramework::parse("Net6.0").unwrap();
        let b = TargetFramework::parse("net6.0").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_nearest_prefers_same_family_highest_version() {
        let groups = vec![
            group("netstandard2.0"),
            group("net5.0"),
            group("net6.0"),
            group("net8.0"),
        ];
        let target = TargetFramework::parse("net7.0").unwrap();
        let selected = select_nearest(&groups, &target).unwrap();
        assert_eq!(
            selected.target_framework,
            TargetFramework::parse("net6.0").unwrap()
        );
    }

    #[test]
    fn test_nearest_falls_back_to_imported_family() {
        let groups = vec![group("netstandard2.0"), group("netframework4.8")];
        let target = TargetFramework::parse("net6.0").unwrap();
        let selected = select_nearest(&groups, &target).unwrap();
        assert_eq!(
            selected.target_framework,
            TargetFramework::parse("netstandard2.0").unwrap()
        );
    }

    #[test]
    fn test_nearest_tie_broken_by_table_order_not_group_order() {
        // netcoreapp precedes netstandard in the net row even though the
        // netstandard group is declared first
        let groups = vec![group("netstandard2.0"), group("netcoreapp3.1")];
        let target = TargetFramework::parse("net6.0").unwrap();
        let selected = select_nearest(&groups, &target).unwrap();
        assert_eq!(
            selected.target_framework,
            TargetFramework::parse("netcoreapp3.1").unwrap()
        );
    }

    #[test]
    fn test_nearest_any_group_is_last_resort() {
        let groups = vec![group("any"), group("net6.0")];
        let target = TargetFramework::parse("net8.0").unwrap();
        let selected = select_nearest(&groups, &target).unwrap();
        assert_eq!(
            selected.target_framework,
            TargetFramework::parse("net6.0").unwrap()
        );
    }

    #[test]
    fn test_nearest_no_match() {
        let groups = vec![group("net8.0")];
        let target = TargetFramework::parse("net6.0").unwrap();
        assert!(select_nearest(&groups, &target).is_none());

        let target = TargetFramework::parse("netstandard2.0").unwrap();
        assert!(select_nearest(&groups, &target).is_none());
    }

    #[test]
    fn test_nearest_any_target_matches_only_any_groups() {
        let groups = vec![group("net6.0")];
        assert!(select_nearest(&groups, &TargetFramework::Any).is_none());

        let groups = vec![group("net6.0"), group("any")];
        let selected = select_nearest(&groups, &TargetFramework::Any).unwrap();
        assert!(selected.target_framework.is_any());
    }
}
