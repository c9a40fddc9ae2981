use serde::de::{self, Deserialize, Deserializer, MapAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;

/// A mapping from names to values that remembers declaration order.
///
/// Manifest documents are mappings, but the order in which projects are
/// declared is the order in which every report lists them. Deserializing
/// rejects a name that appears twice instead of silently keeping the last one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedEntries<T>(Vec<(String, T)>);

impl<T> Default for NamedEntries<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> NamedEntries<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, replacing the value in place when the name exists.
    pub fn insert(&mut self, name: impl Into<String>, value: T) {
        let name = name.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.0
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T> FromIterator<(String, T)> for NamedEntries<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        let mut entries = Self::new();
        for (name, value) in iter {
            entries.insert(name, value);
        }
        entries
    }
}

impl<T> IntoIterator for NamedEntries<T> {
    type Item = (String, T);
    type IntoIter = std::vec::IntoIter<(String, T)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<T: Serialize> Serialize for NamedEntries<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

struct NamedEntriesVisitor<T>(PhantomData<T>);

impl<'de, T: Deserialize<'de>> Visitor<'de> for NamedEntriesVisitor<T> {
    type Value = NamedEntries<T>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a mapping of uniquely named entries")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(NamedEntries::new())
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));

        while let Some(name) = access.next_key::<String>()? {
            if !seen.insert(name.clone()) {
                return Err(de::Error::custom(format!("duplicate entry '{}'", name)));
            }
            let value = access.next_value()?;
            entries.push((name, value));
        }

        Ok(NamedEntries(entries))
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for NamedEntries<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(NamedEntriesVisitor(PhantomData))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declaration_order_is_kept() {
        let entries: NamedEntries<u32> =
            serde_json::from_str(r#"{"zeta": 1, "alpha": 2, "mid": 3}"#).unwrap();
        let names: Vec<&str> = entries.names().collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
        assert_eq!(entries.get("alpha"), Some(&2));
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let result: Result<NamedEntries<u32>, _> =
            serde_json::from_str(r#"{"a": 1, "b": 2, "a": 3}"#);
        let message = result.unwrap_err().to_string();
        assert!(message.contains("duplicate entry 'a'"), "{}", message);

        let result: Result<NamedEntries<u32>, _> = serde_yaml::from_str("a: 1\nb: 2\na: 3\n");
        assert!(result.unwrap_err().to_string().contains("duplicate"));
    }

    #[test]
    fn test_serializes_in_order() {
        let entries: NamedEntries<u32> =
            vec![("b".to_string(), 1), ("a".to_string(), 2)].into_iter().collect();
        assert_eq!(serde_json::to_string(&entries).unwrap(), r#"{"b":1,"a":2}"#);
    }

    #[test]
    fn test_insert_replaces_existing_value() {
        let mut entries = NamedEntries::new();
        entries.insert("a", 1);
        entries.insert("b", 2);
        entries.insert("a", 3);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries.get("a"), Some(&3));
        assert!(entries.contains("b"));
        assert!(!entries.contains("c"));
    }
}
