use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A field in a partial update.
///
/// Plain `Option<T>` cannot tell "not sent" from "sent as null"; a merge
/// needs both. Use with `#[serde(default, skip_serializing_if = "Patch::is_absent")]`
/// so a missing key becomes `Absent` and round-trips back to a missing key.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch<T> {
    /// Key was not present: leave the stored value alone.
    Absent,
    /// Key was present with `null`: clear the stored value.
    Null,
    /// Key was present with a value: overwrite.
    Value(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Self::Absent
    }
}

impl<T> Patch<T> {
    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Patch::Absent)
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Patch::Null)
    }

    /// `None` when absent, `Some(None)` when null, `Some(Some(v))` otherwise.
    #[must_use]
    pub fn into_option(self) -> Option<Option<T>> {
        match self {
            Patch::Absent => None,
            Patch::Null => Some(None),
            Patch::Value(v) => Some(Some(v)),
        }
    }

    /// Applies this patch to an optional slot. Returns true if the key was present.
    pub fn apply(self, slot: &mut Option<T>) -> bool {
        match self.into_option() {
            Some(value) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

impl<T> From<Option<T>> for Patch<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Patch::Null, Patch::Value)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Patch::from)
    }
}

impl<T: Serialize> Serialize for Patch<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Patch::Value(v) => serializer.serialize_some(v),
            Patch::Absent | Patch::Null => serializer.serialize_none(),
        }
    }
}
