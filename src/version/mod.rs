// src/version/mod.rs

//! Version handling for package metadata
//!
//! Provides normalized four-part versions (major.minor.patch[.revision])
//! with optional prerelease labels, and the version-range notation carried
//! in dependency declarations. Ranges are parsed and validated here but are
//! otherwise opaque to the gather core; the downstream resolver interprets
//! them against candidate versions.

use crate::error::{Error, Result};
use semver::Prerelease;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A normalized package version
///
/// Up to four numeric parts with an optional prerelease label. Missing
/// parts normalize to zero, so "1.0", "1.0.0" and "1.0.0.0" are equal.
/// Build metadata (`+...`) is discarded. Prerelease labels compare per
/// semver rules, case-insensitively; original casing is kept for display.
#[derive(Debug, Clone)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub revision: u64,
    pub release: Option<String>,
}

impl Version {
    /// Parse a version string
    ///
    /// Examples:
    /// - "1.2" → 1.2.0
    /// - "1.2.3.4" → four-part version with revision 4
    /// - "2.0.0-beta.1" → prerelease
    /// - "1.0.0+build5" → build metadata dropped
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidVersion(s.to_string()));
        }

        // Build metadata does not participate in ordering or equality
        let body = trimmed.split('+').next().unwrap_or(trimmed);

        let (numeric, release) = match body.split_once('-') {
            Some((n, r)) if !r.is_empty() => (n, Some(r.to_string())),
            Some(_) => return Err(Error::InvalidVersion(s.to_string())),
            None => (body, None),
        };

        let fields: Vec<&str> = numeric.split('.').collect();
        if fields.is_empty() || fields.len() > 4 {
            return Err(Error::InvalidVersion(s.to_string()));
        }

        let mut parts = [0u64; 4];
        for (i, field) in fields.iter().enumerate() {
            parts[i] = field
                .parse::<u64>()
                .map_err(|_| Error::InvalidVersion(s.to_string()))?;
        }

        Ok(Self {
            major: parts[0],
            minor: parts[1],
            patch: parts[2],
            revision: parts[3],
            release,
        })
    }

    /// Whether this version carries a prerelease label
    pub fn is_prerelease(&self) -> bool {
        self.release.is_some()
    }

    fn release_key(&self) -> Option<String> {
        self.release.as_ref().map(|r| r.to_lowercase())
    }
}

/// Compare two lowercased prerelease labels per semver rules
///
/// Falls back to plain string ordering for labels semver rejects
/// (e.g. numeric identifiers with leading zeros).
fn release_ord(a: &str, b: &str) -> Ordering {
    match (Prerelease::new(a), Prerelease::new(b)) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch, self.revision)
            .cmp(&(other.major, other.minor, other.patch, other.revision))
            .then_with(|| match (self.release_key(), other.release_key()) {
                (None, None) => Ordering::Equal,
                // A release version outranks any prerelease of the same number
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => release_ord(&a, &b),
            })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.major.hash(state);
        self.minor.hash(state);
        self.patch.hash(state);
        self.revision.hash(state);
        self.release_key().hash(state);
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if self.revision > 0 {
            write!(f, ".{}", self.revision)?;
        }
        if let Some(ref release) = self.release {
            write!(f, "-{}", release)?;
        }
        Ok(())
    }
}

/// How a floating range is allowed to drift
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatBehavior {
    /// Highest prerelease above the stated base ("1.2.3-*")
    Prerelease,
    /// Highest patch within the stated minor ("1.2.*")
    Patch,
    /// Highest minor within the stated major ("1.*")
    Minor,
    /// Any version ("*")
    Major,
}

/// An interval over versions with inclusive/exclusive bounds and an
/// optional floating specifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionRange {
    pub min: Option<Version>,
    pub min_inclusive: bool,
    pub max: Option<Version>,
    pub max_inclusive: bool,
    pub float: Option<FloatBehavior>,
}

impl VersionRange {
    /// The unbounded range: any version satisfies it
    pub fn any() -> Self {
        Self {
            min: Some(Version {
                major: 0,
                minor: 0,
                patch: 0,
                revision: 0,
                release: None,
            }),
            min_inclusive: true,
            max: None,
            max_inclusive: false,
            float: Some(FloatBehavior::Major),
        }
    }

    /// An inclusive lower bound with no upper bound
    pub fn minimum(version: Version) -> Self {
        Self {
            min: Some(version),
            min_inclusive: true,
            max: None,
            max_inclusive: false,
            float: None,
        }
    }

    /// A range pinning exactly one version
    pub fn exact(version: Version) -> Self {
        Self {
            min: Some(version.clone()),
            min_inclusive: true,
            max: Some(version),
            max_inclusive: true,
            float: None,
        }
    }

    /// Parse a range string
    ///
    /// Accepted forms:
    /// - "1.2.3" — minimum version, inclusive
    /// - "[1.2.3]" — exact pin
    /// - "[1.0, 2.0)" — interval with bracket bounds; either side may be
    ///   empty for an open bound
    /// - "*", "1.*", "1.2.*", "1.2.3-*" — floating ranges
    pub fn parse(s: &str) -> Result<Self> {
        let t = s.trim();
        if t.is_empty() || t == "*" {
            return Ok(Self::any());
        }

        let invalid = || Error::InvalidRange(s.to_string());

        let open = t.starts_with('[') || t.starts_with('(');
        let close = t.ends_with(']') || t.ends_with(')');
        if open || close {
            if !(open && close) {
                return Err(invalid());
            }
            let min_inclusive = t.starts_with('[');
            let max_inclusive = t.ends_with(']');
            let inner = &t[1..t.len() - 1];
            let fields: Vec<&str> = inner.split(',').collect();
            return match fields.len() {
                1 => {
                    if !min_inclusive || !max_inclusive {
                        return Err(invalid());
                    }
                    let v = Version::parse(fields[0]).map_err(|_| invalid())?;
                    Ok(Self::exact(v))
                }
                2 => {
                    let parse_bound = |field: &str| -> Result<Option<Version>> {
                        let field = field.trim();
                        if field.is_empty() {
                            Ok(None)
                        } else {
                            Version::parse(field).map(Some).map_err(|_| invalid())
                        }
                    };
                    let min = parse_bound(fields[0])?;
                    let max = parse_bound(fields[1])?;
                    if min.is_none() && max.is_none() {
                        return Err(invalid());
                    }
                    Ok(Self {
                        min,
                        min_inclusive,
                        max,
                        max_inclusive,
                        float: None,
                    })
                }
                _ => Err(invalid()),
            };
        }

        if let Some(base) = t.strip_suffix(".*") {
            let float = match base.matches('.').count() {
                0 => FloatBehavior::Minor,
                1 => FloatBehavior::Patch,
                _ => return Err(invalid()),
            };
            let min = Version::parse(base).map_err(|_| invalid())?;
            return Ok(Self {
                min: Some(min),
                min_inclusive: true,
                max: None,
                max_inclusive: false,
                float: Some(float),
            });
        }

        if let Some(base) = t.strip_suffix("-*") {
            let min = Version::parse(base).map_err(|_| invalid())?;
            return Ok(Self {
                min: Some(min),
                min_inclusive: true,
                max: None,
                max_inclusive: false,
                float: Some(FloatBehavior::Prerelease),
            });
        }

        let v = Version::parse(t).map_err(|_| invalid())?;
        Ok(Self::minimum(v))
    }

    /// Check whether a version falls within the bounds
    pub fn satisfies(&self, version: &Version) -> bool {
        if let Some(ref min) = self.min {
            let ok = if self.min_inclusive {
                version >= min
            } else {
                version > min
            };
            if !ok {
                return false;
            }
        }
        if let Some(ref max) = self.max {
            let ok = if self.max_inclusive {
                version <= max
            } else {
                version < max
            };
            if !ok {
                return false;
            }
        }
        true
    }

    /// Whether this range explicitly admits prerelease versions
    pub fn allows_prerelease(&self) -> bool {
        matches!(self.float, Some(FloatBehavior::Prerelease))
            || self.min.as_ref().is_some_and(|v| v.is_prerelease())
            || self.max.as_ref().is_some_and(|v| v.is_prerelease())
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(float) = self.float {
            return match (float, &self.min) {
                (FloatBehavior::Minor, Some(v)) => write!(f, "{}.*", v.major),
                (FloatBehavior::Patch, Some(v)) => write!(f, "{}.{}.*", v.major, v.minor),
                (FloatBehavior::Prerelease, Some(v)) => write!(f, "{v}-*"),
                _ => write!(f, "*"),
            };
        }
        match (&self.min, &self.max) {
            (Some(min), Some(max)) if min == max && self.min_inclusive && self.max_inclusive => {
                write!(f, "[{min}]")
            }
            (Some(min), None) if self.min_inclusive => write!(f, "{min}"),
            (min, max) => {
                write!(f, "{}", if self.min_inclusive { '[' } else { '(' })?;
                if let Some(v) = min {
                    write!(f, "{v}")?;
                }
                write!(f, ", ")?;
                if let Some(v) = max {
                    write!(f, "{v}")?;
                }
                write!(f, "{}", if self.max_inclusive { ']' } else { ')' })
            }
        }
    }
}
