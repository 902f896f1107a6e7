use std::{collections::BTreeSet, fmt, str::FromStr};

/// A code generation target the schema compiler knows about.
///
/// The declaration order is the order in which outputs and flags are planned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Feature {
    /// C++: a `.pb.cc`/`.pb.h` pair, searched through the generator's `includes`.
    Cxx,
    /// Python: a single `_pb2.py` module, searched through `protoc_includes`.
    Python,
}

impl Feature {
    pub fn from_tag(tag: &str) -> Option<Feature> {
        match tag {
            "cxx" => Some(Feature::Cxx),
            "py" => Some(Feature::Python),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Feature::Cxx => "cxx",
            Feature::Python => "py",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// The features of a build target. Tags that are not a [`Feature`] (`cxxprogram`, `c`, ...) are
/// kept around so errors can name them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureSet {
    features: BTreeSet<Feature>,
    unrecognized: Vec<String>,
}

impl FeatureSet {
    pub fn new() -> FeatureSet {
        FeatureSet::default()
    }

    pub fn from_tags<I, S>(tags: I) -> FeatureSet
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = FeatureSet::default();
        for tag in tags {
            let tag = tag.as_ref();
            match Feature::from_tag(tag) {
                Some(feature) => {
                    set.features.insert(feature);
                }
                None => {
                    if !set.unrecognized.iter().any(|t| t == tag) {
                        set.unrecognized.push(tag.to_owned());
                    }
                }
            }
        }
        set
    }

    pub fn with(mut self, feature: Feature) -> FeatureSet {
        self.features.insert(feature);
        self
    }

    pub fn contains(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }

    /// Recognized features, in planning order.
    pub fn iter(&self) -> impl Iterator<Item = Feature> + '_ {
        self.features.iter().copied()
    }

    /// True if no recognized feature is active.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn unrecognized(&self) -> &[String] {
        &self.unrecognized
    }
}

impl fmt::Display for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tags: Vec<&str> = self
            .features
            .iter()
            .map(|feature| feature.tag())
            .chain(self.unrecognized.iter().map(String::as_str))
            .collect();
        write!(f, "[{}]", tags.join(", "))
    }
}

impl FromStr for FeatureSet {
    type Err = std::convert::Infallible;

    /// Tags separated by whitespace or commas, as in `features = 'cxx cxxprogram'`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(FeatureSet::from_tags(
            s.split(|c: char| c == ',' || c.is_whitespace())
                .filter(|t| !t.is_empty()),
        ))
    }
}
