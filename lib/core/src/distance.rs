//! Pluggable distance measures and the name registry used to resolve them.
//!
//! Names are resolved two ways:
//! - short aliases, case-insensitive, ignoring `-` and `_` (`euclidean`,
//!   `squared-euclidean`, `CosineDistanceMeasure`, ...)
//! - qualified identifiers (anything containing `.` or `::`), matched exactly
//!
//! The built-ins are also registered under their `org.apache.mahout.common.distance`
//! class names so existing job scripts keep working.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::{Error, Result};

const MAHOUT_PACKAGE: &str = "org.apache.mahout.common.distance";

/// Default exponent for [`Distance::Minkowski`]
pub const DEFAULT_MINKOWSKI_EXPONENT: f64 = 3.0;

/// A non-negative dissimilarity between two vectors of equal length
pub trait DistanceMeasure: Send + Sync + fmt::Debug {
    /// Stable name written into seed artifacts
    fn name(&self) -> &str;

    fn distance(&self, a: &[f64], b: &[f64]) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Distance {
    Euclidean,
    SquaredEuclidean,
    Manhattan,
    Chebyshev,
    Minkowski { exponent: f64 },
    Cosine,
    Tanimoto,
}

impl Distance {
    pub const ALL: [Distance; 7] = [
        Distance::Euclidean,
        Distance::SquaredEuclidean,
        Distance::Manhattan,
        Distance::Chebyshev,
        Distance::Minkowski {
            exponent: DEFAULT_MINKOWSKI_EXPONENT,
        },
        Distance::Cosine,
        Distance::Tanimoto,
    ];

    fn short_name(&self) -> &'static str {
        match self {
            Distance::Euclidean => "Euclidean",
            Distance::SquaredEuclidean => "SquaredEuclidean",
            Distance::Manhattan => "Manhattan",
            Distance::Chebyshev => "Chebyshev",
            Distance::Minkowski { .. } => "Minkowski",
            Distance::Cosine => "Cosine",
            Distance::Tanimoto => "Tanimoto",
        }
    }
}

impl Default for Distance {
    fn default() -> Self {
        Distance::Euclidean
    }
}

impl DistanceMeasure for Distance {
    fn name(&self) -> &str {
        self.short_name()
    }

    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        if a.len() != b.len() {
            return f64::INFINITY;
        }

        let diffs = a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs());
        match self {
            Distance::Euclidean => diffs.map(|d| d * d).sum::<f64>().sqrt(),
            Distance::SquaredEuclidean => diffs.map(|d| d * d).sum(),
            Distance::Manhattan => diffs.sum(),
            Distance::Chebyshev => diffs.fold(0.0, f64::max),
            Distance::Minkowski { exponent } => {
                diffs.map(|d| d.powf(*exponent)).sum::<f64>().powf(1.0 / exponent)
            }
            Distance::Cosine => {
                let (dot, norm_a, norm_b) = dot_and_norms(a, b);
                if norm_a == 0.0 && norm_b == 0.0 {
                    return 0.0;
                }
                if norm_a == 0.0 || norm_b == 0.0 {
                    return 1.0;
                }
                (1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())).max(0.0)
            }
            Distance::Tanimoto => {
                let (dot, norm_a, norm_b) = dot_and_norms(a, b);
                let denominator = norm_a + norm_b - dot;
                if denominator == 0.0 {
                    return 0.0;
                }
                (1.0 - dot / denominator).max(0.0)
            }
        }
    }
}

/// Dot product and the two squared norms in one pass
#[inline]
fn dot_and_norms(a: &[f64], b: &[f64]) -> (f64, f64, f64) {
    a.iter()
        .zip(b.iter())
        .fold((0.0, 0.0, 0.0), |(dot, na, nb), (x, y)| {
            (dot + x * y, na + x * x, nb + y * y)
        })
}

type Factory = Arc<dyn Fn() -> Arc<dyn DistanceMeasure> + Send + Sync>;

/// Maps names to distance constructors
pub struct DistanceRegistry {
    aliases: AHashMap<String, Factory>,
    qualified: AHashMap<String, Factory>,
}

impl DistanceRegistry {
    /// A registry with nothing in it
    pub fn empty() -> Self {
        Self {
            aliases: AHashMap::new(),
            qualified: AHashMap::new(),
        }
    }

    /// A registry holding the built-in measures
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        for distance in Distance::ALL {
            let short = distance.short_name();
            let factory: Factory = Arc::new(move || Arc::new(distance) as Arc<dyn DistanceMeasure>);
            registry.insert_alias(short, factory.clone());
            registry.insert_alias(&format!("{short}DistanceMeasure"), factory.clone());
            registry.qualified.insert(
                format!("{MAHOUT_PACKAGE}.{short}DistanceMeasure"),
                factory,
            );
        }
        registry
    }

    /// Register an application-provided measure under a qualified name and,
    /// optionally, a short alias
    pub fn register<F>(&mut self, qualified: &str, alias: Option<&str>, factory: F)
    where
        F: Fn() -> Arc<dyn DistanceMeasure> + Send + Sync + 'static,
    {
        let factory: Factory = Arc::new(factory);
        if let Some(alias) = alias {
            self.insert_alias(alias, factory.clone());
        }
        self.qualified.insert(qualified.to_string(), factory);
    }

    fn insert_alias(&mut self, alias: &str, factory: Factory) {
        self.aliases.insert(normalize_alias(alias), factory);
    }

    /// Resolve a measure by short alias or qualified name
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn DistanceMeasure>> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Config("distance measure name is empty".to_string()));
        }

        let factory = if is_qualified(name) {
            self.qualified.get(name)
        } else {
            self.aliases.get(&normalize_alias(name))
        };

        factory
            .map(|make| make())
            .ok_or_else(|| Error::UnknownDistance(name.to_string()))
    }

    /// Known qualified names, sorted
    pub fn qualified_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.qualified.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for DistanceRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for DistanceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DistanceRegistry")
            .field("aliases", &self.aliases.len())
            .field("qualified", &self.qualified_names())
            .finish()
    }
}

#[inline]
fn is_qualified(name: &str) -> bool {
    name.contains('.') || name.contains("::")
}

fn normalize_alias(alias: &str) -> String {
    alias
        .chars()
        .filter(|c| *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}
