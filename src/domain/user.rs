use serde_json::Value;
use std::cmp::Ordering;

/// A single entry of the users collection.
///
/// Both fields are optional in the database. Records are read leniently: an entry
/// that is not an object, or a token that is not a string, simply counts as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserRecord {
    pub available: Option<bool>,
    pub fcm_token: Option<String>,
}

impl UserRecord {
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let Some(fields) = value.as_object() else {
            return Self::default();
        };

        Self {
            available: fields.get("available").and_then(Value::as_bool),
            fcm_token: fields.get("fcmToken").and_then(Value::as_str).map(str::to_owned),
        }
    }

    /// Returns the device token if one is registered and non-empty.
    #[must_use]
    pub fn push_token(&self) -> Option<&str> {
        self.fcm_token.as_deref().filter(|token| !token.is_empty())
    }
}

/// Point-in-time view of the whole users collection.
///
/// Entries are kept in the order the collection's keys are enumerated on the
/// client: integer-like uids first, numerically, then the rest in database key
/// order. See [`compare_keys`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserSnapshot {
    entries: Vec<(String, UserRecord)>,
}

impl UserSnapshot {
    /// Builds a snapshot from the raw collection value. `null` (no users yet) is empty.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let mut entries: Vec<(String, UserRecord)> = value
            .as_object()
            .map(|users| users.iter().map(|(uid, entry)| (uid.clone(), UserRecord::from_value(entry))).collect())
            .unwrap_or_default();
        entries.sort_by(|(a, _), (b, _)| compare_keys(a, b));

        Self { entries }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &UserRecord)> {
        self.entries.iter().map(|(uid, record)| (uid.as_str(), record))
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum KeyRank<'a> {
    /// Canonical array index (`0`, `10`, never `010`).
    Index(u32),
    /// Other 32-bit integer keys, e.g. `-5` or `007`.
    Integer(i32),
    Name(&'a str),
}

fn key_rank(key: &str) -> KeyRank<'_> {
    let digits = key.strip_prefix('-').unwrap_or(key);
    if digits.is_empty() || digits.len() > 10 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return KeyRank::Name(key);
    }

    let canonical = digits.len() == key.len() && (key == "0" || !key.starts_with('0'));
    match (canonical, key.parse::<u32>(), key.parse::<i32>()) {
        (true, Ok(index), _) if index != u32::MAX => KeyRank::Index(index),
        (_, _, Ok(n)) => KeyRank::Integer(n),
        _ => KeyRank::Name(key),
    }
}

/// Orders collection keys the way a client enumerates a decoded snapshot.
///
/// The database sorts 32-bit integer keys numerically before string keys, and
/// object key enumeration then hoists array-index keys to the front.
#[must_use]
pub fn compare_keys(a: &str, b: &str) -> Ordering {
    key_rank(a).cmp(&key_rank(b)).then_with(|| a.cmp(b))
}

impl FromIterator<(String, UserRecord)> for UserSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, UserRecord)>>(iter: I) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}
