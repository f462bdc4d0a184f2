/// Common types used throughout friend-finder.
///
/// The central type is [`TraitVector`]: a validated five-dimensional Big-Five
/// profile on the canonical [0,100] scale. Everything that reaches the index
/// or the scorer has already been through [`TraitVector::new`].
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{MatchError, MatchResult};

/// Number of personality dimensions.
pub const DIMENSIONS: usize = 5;

/// Lowest value on the canonical trait scale.
pub const TRAIT_MIN: f64 = 0.0;

/// Highest value on the canonical trait scale.
pub const TRAIT_MAX: f64 = 100.0;

/// Identifier of a user account.
pub type UserId = i64;

/// A personality trait, in canonical vector order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trait {
    Extraversion,
    Agreeableness,
    Conscientiousness,
    EmotionalStability,
    IntellectImagination,
}

impl Trait {
    /// All traits in canonical order.
    pub const ALL: [Trait; DIMENSIONS] = [
        Trait::Extraversion,
        Trait::Agreeableness,
        Trait::Conscientiousness,
        Trait::EmotionalStability,
        Trait::IntellectImagination,
    ];

    /// Position of this trait inside a [`TraitVector`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Wire name of the trait.
    pub fn name(self) -> &'static str {
        match self {
            Trait::Extraversion => "extraversion",
            Trait::Agreeableness => "agreeableness",
            Trait::Conscientiousness => "conscientiousness",
            Trait::EmotionalStability => "emotional_stability",
            Trait::IntellectImagination => "intellect_imagination",
        }
    }
}

impl fmt::Display for Trait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Trait {
    type Err = MatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Trait::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| MatchError::invalid(format!("unknown trait '{}'", s)))
    }
}

/// Trait components as they come out of storage, where any column may be null.
pub type RawTraits = [Option<f64>; DIMENSIONS];

/// A validated personality vector on the [0,100] scale.
///
/// Immutable once constructed. Components are ordered as in [`Trait::ALL`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraitVector {
    values: [f64; DIMENSIONS],
}

impl TraitVector {
    /// Create a vector, rejecting non-finite or out-of-range components.
    pub fn new(values: [f64; DIMENSIONS]) -> MatchResult<Self> {
        for (value, t) in values.iter().zip(Trait::ALL) {
            if !value.is_finite() {
                return Err(MatchError::invalid(format!("{} is not finite", t)));
            }
            if !(TRAIT_MIN..=TRAIT_MAX).contains(value) {
                return Err(MatchError::invalid(format!(
                    "{} = {} is outside [{}, {}]",
                    t, value, TRAIT_MIN, TRAIT_MAX
                )));
            }
        }
        Ok(Self { values })
    }

    /// Create a vector from a slice that must hold exactly five components.
    pub fn from_slice(values: &[f64]) -> MatchResult<Self> {
        let values: [f64; DIMENSIONS] = values.try_into().map_err(|_| {
            MatchError::invalid(format!(
                "trait vector must have exactly {} components, got {}",
                DIMENSIONS,
                values.len()
            ))
        })?;
        Self::new(values)
    }

    /// Validate nullable stored components.
    pub fn from_raw(raw: &RawTraits) -> MatchResult<Self> {
        let mut values = [0.0; DIMENSIONS];
        for ((slot, component), t) in values.iter_mut().zip(raw).zip(Trait::ALL) {
            *slot = component.ok_or_else(|| MatchError::invalid(format!("{} is missing", t)))?;
        }
        Self::new(values)
    }

    /// Component for a single trait.
    pub fn get(&self, t: Trait) -> f64 {
        self.values[t.index()]
    }

    /// All components in canonical order.
    pub fn as_array(&self) -> &[f64; DIMENSIONS] {
        &self.values
    }

    /// Components lifted into the nullable storage representation.
    pub fn to_raw(&self) -> RawTraits {
        self.values.map(Some)
    }
}

impl AsRef<[f64]> for TraitVector {
    fn as_ref(&self) -> &[f64] {
        &self.values
    }
}

impl fmt::Display for TraitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.values.iter().map(|v| format!("{:.1}", v)).collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

#[derive(Serialize, Deserialize)]
struct NamedTraits {
    extraversion: f64,
    agreeableness: f64,
    conscientiousness: f64,
    emotional_stability: f64,
    intellect_imagination: f64,
}

impl Serialize for TraitVector {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let [e, a, c, s, i] = self.values;
        NamedTraits {
            extraversion: e,
            agreeableness: a,
            conscientiousness: c,
            emotional_stability: s,
            intellect_imagination: i,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TraitVector {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let n = NamedTraits::deserialize(deserializer)?;
        TraitVector::new([
            n.extraversion,
            n.agreeableness,
            n.conscientiousness,
            n.emotional_stability,
            n.intellect_imagination,
        ])
        .map_err(serde::de::Error::custom)
    }
}

/// Relationship between two users as seen by the relationship store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendStatus {
    #[default]
    None,
    Pending,
    Accepted,
    Blocked,
}

impl FriendStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FriendStatus::None => "none",
            FriendStatus::Pending => "pending",
            FriendStatus::Accepted => "accepted",
            FriendStatus::Blocked => "blocked",
        }
    }
}

impl fmt::Display for FriendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Public profile of a user account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_deleted: bool,
}

fn default_true() -> bool {
    true
}

impl UserProfile {
    /// Create an active profile with only the required fields set.
    pub fn new(id: UserId, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            first_name: None,
            last_name: None,
            bio: None,
            avatar_url: None,
            created_at: Utc::now(),
            is_active: true,
            is_deleted: false,
        }
    }

    /// Set first and last name.
    pub fn with_name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = Some(first.into());
        self.last_name = Some(last.into());
        self
    }

    /// Set the bio.
    pub fn with_bio(mut self, bio: impl Into<String>) -> Self {
        self.bio = Some(bio.into());
        self
    }

    /// Set the account creation time.
    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = at;
        self
    }

    /// Whether the account can take part in discovery at all.
    pub fn is_discoverable(&self) -> bool {
        self.is_active && !self.is_deleted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_trait_vector_rejects_out_of_range() {
        assert!(TraitVector::new([50.0, 50.0, 50.0, 50.0, 100.5]).is_err());
        assert!(TraitVector::new([-0.1, 50.0, 50.0, 50.0, 50.0]).is_err());
        assert!(TraitVector::new([0.0, 50.0, 50.0, 50.0, 100.0]).is_ok());
    }

    #[test]
    fn test_trait_vector_rejects_non_finite() {
        let err = TraitVector::new([f64::NAN, 1.0, 1.0, 1.0, 1.0]).unwrap_err();
        assert!(err.to_string().contains("extraversion"));
        assert!(TraitVector::new([1.0, f64::INFINITY, 1.0, 1.0, 1.0]).is_err());
    }

    #[test]
    fn test_from_slice_checks_length() {
        assert!(TraitVector::from_slice(&[1.0, 2.0, 3.0, 4.0]).is_err());
        assert!(TraitVector::from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).is_err());
        let v = TraitVector::from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!(v.get(Trait::IntellectImagination), 5.0);
    }

    #[test]
    fn test_from_raw_reports_missing_component() {
        let raw = [Some(10.0), Some(20.0), None, Some(40.0), Some(50.0)];
        let err = TraitVector::from_raw(&raw).unwrap_err();
        assert!(err.to_string().contains("conscientiousness is missing"));
    }

    #[test]
    fn test_trait_vector_serde_named_fields() {
        let v = TraitVector::new([84.0, 62.0, 56.0, 90.0, 78.0]).unwrap();
        let value = serde_json::to_value(v).unwrap();
        assert_eq!(value["emotional_stability"], json!(90.0));

        let back: TraitVector = serde_json::from_value(value).unwrap();
        assert_eq!(back, v);

        let bad = json!({
            "extraversion": 101.0,
            "agreeableness": 0.0,
            "conscientiousness": 0.0,
            "emotional_stability": 0.0,
            "intellect_imagination": 0.0
        });
        assert!(serde_json::from_value::<TraitVector>(bad).is_err());
    }

    #[test]
    fn test_trait_from_str() {
        assert_eq!("Emotional_Stability".parse::<Trait>().unwrap(), Trait::EmotionalStability);
        assert!("openness".parse::<Trait>().is_err());
    }

    #[test]
    fn test_friend_status_wire_names() {
        assert_eq!(serde_json::to_value(FriendStatus::Pending).unwrap(), json!("pending"));
        assert_eq!(FriendStatus::default(), FriendStatus::None);
    }
}
