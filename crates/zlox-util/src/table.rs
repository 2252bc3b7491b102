//! Open-addressing hash table keyed by byte strings.
//!
//! This is the one map used at runtime: once for string interning (the heap
//! owns the key bytes) and once for the globals table (keys are borrowed from
//! the chunk's variable-name pool). Key ownership is encoded in the type
//! parameter `K` rather than a runtime flag: `Box<str>` keys own their bytes,
//! `&str` keys borrow them.
//!
//! Collision resolution is linear probing over a power-of-two slot array.
//! There is no deletion and therefore no tombstone state; growth at a load
//! factor of 3/4 keeps probe sequences short and guarantees termination.

/// Initial slot count. Must be a power of two.
const INITIAL_CAPACITY: usize = 32;

/// Computes the 32-bit FNV-1a hash of a byte string.
///
/// # Example
///
/// ```
/// use zlox_util::table::fnv1a_32;
///
/// assert_eq!(fnv1a_32(b""), 0x811c9dc5);
/// assert_eq!(fnv1a_32(b"a"), 0xe40c292c);
/// ```
pub fn fnv1a_32(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for &byte in bytes {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

/// A key type the table can hash and compare.
///
/// Both key flavors used at runtime dereference to `str`, so both expose
/// their bytes the same way: owned `Box<str>` keys for the interning table,
/// borrowed `&str` keys for the globals table.
pub trait KeyBytes {
    fn key_bytes(&self) -> &[u8];
}

impl KeyBytes for &str {
    fn key_bytes(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl KeyBytes for Box<str> {
    fn key_bytes(&self) -> &[u8] {
        self.as_bytes()
    }
}

/// An occupied slot.
///
/// `value` is `None` between [`Table::find_or_reserve`] and the first write:
/// the slot is claimed (the key is stored, the entry counts toward the load
/// factor) but holds no observable value yet. Lookups treat such entries as
/// absent.
#[derive(Debug)]
pub struct Entry<K, V> {
    /// Cached key hash, so growth never rehashes key bytes.
    hash: u32,
    key: K,
    pub value: Option<V>,
}

impl<K, V> Entry<K, V> {
    /// The key stored in this slot.
    pub fn key(&self) -> &K {
        &self.key
    }
}

/// Linear-probing hash map from byte-string keys to values.
///
/// `K` is any [`KeyBytes`] type (`&str` or `Box<str>`). Two keys are the
/// same key iff their bytes are equal.
///
/// # Example
///
/// ```
/// use zlox_util::table::Table;
///
/// let mut table: Table<&str, i32> = Table::new();
/// table.insert("answer", 42);
/// assert_eq!(table.find(b"answer"), Some(&42));
/// assert_eq!(table.find(b"question"), None);
/// ```
#[derive(Debug)]
pub struct Table<K, V> {
    slots: Vec<Option<Entry<K, V>>>,
    /// Occupied slots, including reserved-but-unset entries.
    live: usize,
}

impl<K: KeyBytes, V> Table<K, V> {
    pub fn new() -> Self {
        Self {
            slots: empty_slots(INITIAL_CAPACITY),
            live: 0,
        }
    }

    /// Number of occupied slots (reserved entries included).
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Current slot count. Always a power of two.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the entry for `key`, claiming a fresh slot with an unset value
    /// if the key is not present yet.
    ///
    /// Growth happens up front, before the slot is claimed, so the table is
    /// never probed at full occupancy.
    pub fn find_or_reserve(&mut self, key: K) -> &mut Entry<K, V> {
        if (self.live + 1) * 4 > self.capacity() * 3 {
            self.grow();
        }

        let hash = fnv1a_32(key.key_bytes());
        let idx = self.probe(hash, key.key_bytes());
        if self.slots[idx].is_none() {
            self.slots[idx] = Some(Entry {
                hash,
                key,
                value: None,
            });
            self.live += 1;
        }
        self.slots[idx].as_mut().expect("probe returned a claimed slot")
    }

    /// Inserts or overwrites the value for `key`.
    pub fn insert(&mut self, key: K, value: V) {
        self.find_or_reserve(key).value = Some(value);
    }

    /// Looks up the value for a key given as raw bytes.
    ///
    /// Reserved entries with no value yet read as absent.
    pub fn find(&self, key: &[u8]) -> Option<&V> {
        self.entry_at(key)?.value.as_ref()
    }

    /// Returns the stored (canonical) key equal to `key`, if any.
    pub fn find_key(&self, key: &[u8]) -> Option<&K> {
        let entry = self.entry_at(key)?;
        entry.value.as_ref()?;
        Some(&entry.key)
    }

    pub fn has_key(&self, key: &[u8]) -> bool {
        self.find_key(key).is_some()
    }

    fn entry_at(&self, key: &[u8]) -> Option<&Entry<K, V>> {
        let hash = fnv1a_32(key);
        self.slots[self.probe(hash, key)].as_ref()
    }

    /// Finds the slot index for `key`: either the slot holding it or the
    /// first empty slot of its probe sequence.
    ///
    /// Terminates because occupancy is bounded below capacity.
    fn probe(&self, hash: u32, key: &[u8]) -> usize {
        let mask = self.slots.len() - 1;
        let mut idx = hash as usize & mask;
        loop {
            match &self.slots[idx] {
                None => return idx,
                Some(entry) if entry.hash == hash && entry.key.key_bytes() == key => return idx,
                Some(_) => idx = (idx + 1) & mask,
            }
        }
    }

    /// Doubles the slot array and redistributes every occupied entry.
    fn grow(&mut self) {
        let doubled = empty_slots(self.slots.len() * 2);
        let old = std::mem::replace(&mut self.slots, doubled);
        for entry in old.into_iter().flatten() {
            self.rehash(entry);
        }
    }

    /// Places an entry into the enlarged slot array.
    ///
    /// This is the raw path used only during [`grow`](Self::grow): it never
    /// checks the load factor, so redistributing entries cannot recurse into
    /// another growth.
    fn rehash(&mut self, entry: Entry<K, V>) {
        let mask = self.slots.len() - 1;
        let mut idx = entry.hash as usize & mask;
        while self.slots[idx].is_some() {
            idx = (idx + 1) & mask;
        }
        self.slots[idx] = Some(entry);
    }
}

impl<K: KeyBytes, V> Default for Table<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

fn empty_slots<K, V>(capacity: usize) -> Vec<Option<Entry<K, V>>> {
    debug_assert!(capacity.is_power_of_two());
    std::iter::repeat_with(|| None).take(capacity).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;
    use std::collections::HashMap;

    #[test]
    fn fnv1a_reference_vectors() {
        // Published FNV-1a 32-bit test vectors.
        assert_eq!(fnv1a_32(b""), 0x811c9dc5);
        assert_eq!(fnv1a_32(b"a"), 0xe40c292c);
        assert_eq!(fnv1a_32(b"foobar"), 0xbf9cf968);
    }

    #[test]
    fn insert_then_find() {
        let mut table: Table<&str, i32> = Table::new();
        table.insert("one", 1);
        table.insert("two", 2);

        assert_eq!(table.find(b"one"), Some(&1));
        assert_eq!(table.find(b"two"), Some(&2));
        assert_eq!(table.find(b"three"), None);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn insert_overwrites() {
        let mut table: Table<&str, i32> = Table::new();
        table.insert("x", 1);
        table.insert("x", 2);

        assert_eq!(table.find(b"x"), Some(&2));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn reserved_entry_reads_as_absent() {
        let mut table: Table<&str, i32> = Table::new();
        table.find_or_reserve("pending");

        assert_eq!(table.len(), 1);
        assert_eq!(table.find(b"pending"), None);
        assert!(!table.has_key(b"pending"));

        table.find_or_reserve("pending").value = Some(7);
        assert_eq!(table.find(b"pending"), Some(&7));
        assert!(table.has_key(b"pending"));
    }

    #[test]
    fn find_key_returns_canonical_key() {
        let mut table: Table<Box<str>, bool> = Table::new();
        table.insert("canonical".into(), true);

        let lookup = String::from("canonical");
        let stored = table.find_key(lookup.as_bytes()).expect("key present");
        assert_eq!(&**stored, "canonical");
    }

    #[test]
    fn survives_rehash() {
        let mut table: Table<Box<str>, usize> = Table::new();
        for i in 0..1000 {
            table.insert(format!("key-{i}").into(), i);
        }

        assert_eq!(table.len(), 1000);
        assert!(table.capacity() >= 1000 * 4 / 3);
        assert!(table.capacity().is_power_of_two());
        for i in 0..1000 {
            assert_eq!(table.find(format!("key-{i}").as_bytes()), Some(&i));
        }
        assert_eq!(table.find(b"key-1000"), None);
    }

    #[test]
    fn load_factor_stays_below_three_quarters() {
        let mut table: Table<Box<str>, ()> = Table::new();
        for i in 0..100 {
            table.insert(format!("{i}").into(), ());
            assert!(table.len() * 4 <= table.capacity() * 3);
        }
    }

    #[test]
    fn colliding_keys_coexist() {
        // 24 keys in the initial 32 slots sits right at the load limit, so
        // probe chains form without triggering growth.
        let mut table: Table<Box<str>, usize> = Table::new();
        for i in 0..24 {
            table.insert(format!("k{i}").into(), i);
        }
        for i in 0..24 {
            assert_eq!(table.find(format!("k{i}").as_bytes()), Some(&i));
        }
    }

    #[quickcheck]
    fn agrees_with_std_hashmap(pairs: Vec<(String, u32)>) -> bool {
        let mut table: Table<Box<str>, u32> = Table::new();
        let mut model: HashMap<String, u32> = HashMap::new();

        for (key, value) in &pairs {
            table.insert(key.clone().into_boxed_str(), *value);
            model.insert(key.clone(), *value);
        }

        model
            .iter()
            .all(|(key, value)| table.find(key.as_bytes()) == Some(value))
            && table.len() == model.len()
    }
}
