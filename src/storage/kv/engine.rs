//! In-process key space with single-key atomic commands
//!
//! Every command locks exactly one key (a `DashMap` shard entry), so a
//! command is atomic on its key and commands on different keys interleave
//! freely. Multi-key sequences get no isolation; callers order their
//! writes so that a partial sequence is harmless.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::StorageError;
use crate::statuslist::{StatusBits, StatusList};

#[derive(Debug, Clone)]
enum Value {
    Str(Vec<u8>),
    Hash(HashMap<String, String>),
    List(VecDeque<String>),
    Set(HashSet<String>),
}

impl Value {
    fn kind(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Hash(_) => "hash",
            Value::List(_) => "list",
            Value::Set(_) => "set",
        }
    }
}

#[derive(Debug, Clone)]
struct Slot {
    value: Value,
    expires_at: Option<Instant>,
}

impl Slot {
    fn persistent(value: Value) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

fn wrong_type(key: &str, expected: &str, found: &Value) -> StorageError {
    StorageError::Corruption(format!(
        "WRONGTYPE key {key} holds a {}, expected {expected}",
        found.kind()
    ))
}

/// Atomic key-value command set
#[derive(Debug, Default)]
pub struct KvEngine {
    data: DashMap<String, Slot>,
}

impl KvEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live entry for `key`, dropping it first if expired
    fn live(&self, key: &str) -> Entry<'_, String, Slot> {
        let entry = self.data.entry(key.to_string());
        match entry {
            Entry::Occupied(occupied) if occupied.get().is_expired(Instant::now()) => {
                let (key, _) = occupied.remove_entry();
                self.data.entry(key)
            }
            other => other,
        }
    }

    // ========== Strings ==========

    /// `SET key value NX PX ttl`
    pub fn set_nx_px(&self, key: &str, value: &str, ttl: Option<Duration>) -> bool {
        let now = Instant::now();
        match self.data.entry(key.to_string()) {
            Entry::Occupied(mut occupied) if occupied.get().is_expired(now) => {
                occupied.insert(Slot {
                    value: Value::Str(value.as_bytes().to_vec()),
                    expires_at: ttl.map(|t| now + t),
                });
                true
            }
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(Slot {
                    value: Value::Str(value.as_bytes().to_vec()),
                    expires_at: ttl.map(|t| now + t),
                });
                true
            }
        }
    }

    pub fn set(&self, key: &str, value: Vec<u8>) {
        self.data
            .insert(key.to_string(), Slot::persistent(Value::Str(value)));
    }

    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        match self.data.get(key) {
            Some(slot) if !slot.is_expired(Instant::now()) => match &slot.value {
                Value::Str(bytes) => Ok(Some(bytes.clone())),
                other => Err(wrong_type(key, "string", other)),
            },
            _ => Ok(None),
        }
    }

    /// Delete `key` only while it still holds `value`
    pub fn del_if_eq(&self, key: &str, value: &str) -> bool {
        self.data
            .remove_if(key, |_, slot| {
                matches!(&slot.value, Value::Str(bytes) if bytes == value.as_bytes())
            })
            .is_some()
    }

    /// `BITFIELD key SET u<bits> #index value` on a packed status string
    pub fn bitfield_set(
        &self,
        key: &str,
        bits: StatusBits,
        index: u32,
        value: u8,
    ) -> Result<(), StorageError> {
        match self.live(key) {
            Entry::Occupied(mut occupied) => match &mut occupied.get_mut().value {
                Value::Str(bytes) => {
                    let mut list = StatusList::from_bytes(bits, std::mem::take(bytes));
                    let written = list.set(index, value);
                    *bytes = list.into_bytes();
                    if written {
                        Ok(())
                    } else {
                        Err(StorageError::Corruption(format!(
                            "{key} too short for index {index}"
                        )))
                    }
                }
                other => Err(wrong_type(key, "string", other)),
            },
            Entry::Vacant(_) => Err(StorageError::Corruption(format!("{key} is missing"))),
        }
    }

    // ========== Hashes ==========

    pub fn hset(&self, key: &str, fields: &[(&str, String)]) -> Result<(), StorageError> {
        match self.live(key) {
            Entry::Occupied(mut occupied) => match &mut occupied.get_mut().value {
                Value::Hash(hash) => {
                    for (field, value) in fields {
                        hash.insert((*field).to_string(), value.clone());
                    }
                    Ok(())
                }
                other => Err(wrong_type(key, "hash", other)),
            },
            Entry::Vacant(vacant) => {
                let hash = fields
                    .iter()
                    .map(|(f, v)| ((*f).to_string(), v.clone()))
                    .collect();
                vacant.insert(Slot::persistent(Value::Hash(hash)));
                Ok(())
            }
        }
    }

    pub fn hgetall(&self, key: &str) -> Result<Option<HashMap<String, String>>, StorageError> {
        match self.data.get(key) {
            Some(slot) if !slot.is_expired(Instant::now()) => match &slot.value {
                Value::Hash(hash) => Ok(Some(hash.clone())),
                other => Err(wrong_type(key, "hash", other)),
            },
            _ => Ok(None),
        }
    }

    /// `HINCRBY`; returns the new value
    pub fn hincrby(&self, key: &str, field: &str, delta: i64) -> Result<i64, StorageError> {
        match self.live(key) {
            Entry::Occupied(mut occupied) => match &mut occupied.get_mut().value {
                Value::Hash(hash) => {
                    let current: i64 = match hash.get(field) {
                        Some(v) => v.parse().map_err(|_| {
                            StorageError::Corruption(format!("{key}.{field} is not an integer"))
                        })?,
                        None => 0,
                    };
                    let next = current + delta;
                    hash.insert(field.to_string(), next.to_string());
                    Ok(next)
                }
                other => Err(wrong_type(key, "hash", other)),
            },
            Entry::Vacant(vacant) => {
                let mut hash = HashMap::new();
                hash.insert(field.to_string(), delta.to_string());
                vacant.insert(Slot::persistent(Value::Hash(hash)));
                Ok(delta)
            }
        }
    }

    // ========== Lists ==========

    pub fn rpush(&self, key: &str, values: &[String]) -> Result<usize, StorageError> {
        match self.live(key) {
            Entry::Occupied(mut occupied) => match &mut occupied.get_mut().value {
                Value::List(list) => {
                    list.extend(values.iter().cloned());
                    Ok(list.len())
                }
                other => Err(wrong_type(key, "list", other)),
            },
            Entry::Vacant(vacant) => {
                vacant.insert(Slot::persistent(Value::List(
                    values.iter().cloned().collect(),
                )));
                Ok(values.len())
            }
        }
    }

    /// Append `value` unless the list already contains it; true if appended
    pub fn rpush_unique(&self, key: &str, value: &str) -> Result<bool, StorageError> {
        match self.live(key) {
            Entry::Occupied(mut occupied) => match &mut occupied.get_mut().value {
                Value::List(list) => {
                    if list.iter().any(|v| v == value) {
                        Ok(false)
                    } else {
                        list.push_back(value.to_string());
                        Ok(true)
                    }
                }
                other => Err(wrong_type(key, "list", other)),
            },
            Entry::Vacant(vacant) => {
                vacant.insert(Slot::persistent(Value::List(VecDeque::from([
                    value.to_string()
                ]))));
                Ok(true)
            }
        }
    }

    /// `LPOP key count`
    pub fn lpop(&self, key: &str, count: usize) -> Result<Vec<String>, StorageError> {
        match self.live(key) {
            Entry::Occupied(mut occupied) => match &mut occupied.get_mut().value {
                Value::List(list) => {
                    let n = count.min(list.len());
                    Ok(list.drain(..n).collect())
                }
                other => Err(wrong_type(key, "list", other)),
            },
            Entry::Vacant(_) => Ok(Vec::new()),
        }
    }

    /// `LREM key 0 value`; returns the number removed
    pub fn lrem(&self, key: &str, value: &str) -> Result<usize, StorageError> {
        match self.live(key) {
            Entry::Occupied(mut occupied) => match &mut occupied.get_mut().value {
                Value::List(list) => {
                    let before = list.len();
                    list.retain(|v| v != value);
                    Ok(before - list.len())
                }
                other => Err(wrong_type(key, "list", other)),
            },
            Entry::Vacant(_) => Ok(0),
        }
    }

    pub fn llen(&self, key: &str) -> Result<usize, StorageError> {
        self.with_list(key, |list| list.len())
    }

    pub fn lrange_all(&self, key: &str) -> Result<Vec<String>, StorageError> {
        self.with_list(key, |list| list.iter().cloned().collect())
    }

    fn with_list<T: Default>(
        &self,
        key: &str,
        f: impl FnOnce(&VecDeque<String>) -> T,
    ) -> Result<T, StorageError> {
        match self.data.get(key) {
            Some(slot) if !slot.is_expired(Instant::now()) => match &slot.value {
                Value::List(list) => Ok(f(list)),
                other => Err(wrong_type(key, "list", other)),
            },
            _ => Ok(T::default()),
        }
    }

    // ========== Sets ==========

    pub fn sadd(&self, key: &str, member: &str) -> Result<bool, StorageError> {
        match self.live(key) {
            Entry::Occupied(mut occupied) => match &mut occupied.get_mut().value {
                Value::Set(set) => Ok(set.insert(member.to_string())),
                other => Err(wrong_type(key, "set", other)),
            },
            Entry::Vacant(vacant) => {
                vacant.insert(Slot::persistent(Value::Set(HashSet::from([
                    member.to_string()
                ]))));
                Ok(true)
            }
        }
    }

    pub fn smembers(&self, key: &str) -> Result<Vec<String>, StorageError> {
        match self.data.get(key) {
            Some(slot) if !slot.is_expired(Instant::now()) => match &slot.value {
                Value::Set(set) => Ok(set.iter().cloned().collect()),
                other => Err(wrong_type(key, "set", other)),
            },
            _ => Ok(Vec::new()),
        }
    }
}
