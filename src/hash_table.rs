use alloc::vec::Vec;
use core::fmt::Debug;
use core::ops::Index;
use core::ops::IndexMut;

use crate::slot::FILLED_BIT;
use crate::slot::Slot;

/// Smallest bucket count allocated by the table.
const MIN_CAPACITY: usize = 8;

/// Largest population `capacity` buckets may hold, i.e. a 70% fill level.
#[inline(always)]
fn max_load(capacity: usize) -> usize {
    ((capacity as u128 * 7) / 10) as usize
}

/// Smallest power-of-two capacity reachable by doubling `from` (or
/// `MIN_CAPACITY` when nothing is allocated) that holds `required` entries.
fn capacity_for(required: usize, from: usize) -> usize {
    let mut capacity = if from == 0 { MIN_CAPACITY } else { from };
    while required > max_load(capacity) {
        let Some(doubled) = capacity.checked_mul(2) else {
            panic!("capacity overflow");
        };
        capacity = doubled;
    }
    capacity
}

#[inline(always)]
fn bucket(hash: u64, mask: usize) -> usize {
    hash as usize & mask
}

/// Circular distance from `home` to `current`, i.e. the probe sequence length
/// of an entry whose home bucket is `home` stored at `current`.
#[inline(always)]
fn displacement(current: usize, home: usize, mask: usize) -> usize {
    current.wrapping_sub(home) & mask
}

fn allocate<V>(capacity: usize) -> Vec<Slot<V>> {
    debug_assert!(capacity.is_power_of_two());
    let mut slots = Vec::with_capacity(capacity + 1);
    slots.resize_with(capacity + 1, Slot::empty);
    slots[capacity].set_end();
    slots
}

/// A handle to a slot of a [`HashTable`].
///
/// Positions play the role of cursors: they are plain indices and never
/// borrow the table. Each position remembers the allocation it was taken
/// from, so a position that outlived a resize is detected instead of
/// silently pointing at unrelated data. Positions are also moved by
/// insertions and removals that shift entries; re-fetch them after mutating.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Position {
    index: usize,
    generation: usize,
}

/// Statistics about the distribution of probe sequence lengths.
///
/// Bin `n` counts the entries stored `n` buckets away from their home bucket.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeHistogram {
    bins: Vec<usize>,
}

#[cfg(any(test, feature = "stats"))]
impl ProbeHistogram {
    /// The per-displacement entry counts.
    pub fn bins(&self) -> &[usize] {
        &self.bins
    }

    /// The longest probe sequence in the table, if any entry is present.
    pub fn max_probe_length(&self) -> Option<usize> {
        self.bins.iter().rposition(|&count| count != 0)
    }

    /// Pretty-prints the histogram horizontally using stdout.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        let max = *self.bins.iter().max().unwrap_or(&0);
        if max == 0 {
            println!("probe histogram: empty");
            return;
        }

        let max_bar = 60usize;
        let total_units = max_bar * 8;
        println!(
            "probe histogram ({} entries):",
            self.bins.iter().sum::<usize>()
        );

        let make_bar = |count: usize| -> alloc::string::String {
            if count == 0 {
                return alloc::string::String::new();
            }
            let units = ((count as u128 * total_units as u128).div_ceil(max as u128)) as usize;
            let full = units / 8;
            let rem = units % 8;
            let mut bar = "█".repeat(full);
            if rem > 0 {
                let ch = match rem {
                    1 => '▏',
                    2 => '▎',
                    3 => '▍',
                    4 => '▌',
                    5 => '▋',
                    6 => '▊',
                    _ => '▉',
                };
                bar.push(ch);
            }
            bar
        };

        for (psl, &count) in self.bins.iter().enumerate() {
            println!("{:>3} | {} ({})", psl, make_bar(count), count);
        }
    }
}

/// Debug statistics for hash table analysis.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of elements currently in the table
    pub populated: usize,
    /// Number of buckets
    pub capacity: usize,
    /// Maximum population before the next insert resizes
    pub max_load: usize,
    /// Load factor (populated / capacity)
    pub load_factor: f64,
    /// Longest probe sequence length
    pub max_probe_length: usize,
    /// Average probe sequence length over all entries
    pub mean_probe_length: f64,
    /// Total memory in bytes used by the slot array
    pub total_bytes: usize,
    /// Memory in bytes held by empty buckets
    pub wasted_bytes: usize,
}

#[cfg(any(test, feature = "stats"))]
impl DebugStats {
    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Hash Table Debug Statistics ===");
        println!(
            "Population: {}/{} ({:.2}% load factor, resize above {})",
            self.populated,
            self.capacity,
            self.load_factor * 100.0,
            self.max_load
        );
        println!(
            "Probe Length: max {}, mean {:.3}",
            self.max_probe_length, self.mean_probe_length
        );
        println!("Total Allocated: {} bytes", self.total_bytes);
        println!(
            "Memory: {} bytes wasted ({:.02}%)",
            self.wasted_bytes,
            if self.total_bytes == 0 {
                0.0
            } else {
                (self.wasted_bytes as f64 / self.total_bytes as f64) * 100.0
            }
        );
    }
}

/// An open-addressing hash table using Robin Hood hashing.
///
/// `HashTable<V>` stores values of type `V` in a single power-of-two array of
/// buckets followed by an end sentinel. It does not hash anything itself:
/// every operation takes the hash of the value it is looking for and an
/// equality predicate.
///
/// On collision the entry that is further from its home bucket keeps the
/// slot ("robs" it), which keeps probe sequences short and lets lookups stop
/// as soon as they have travelled further than the resident entry. Removal
/// shifts the following displaced entries back by one slot instead of
/// leaving tombstones.
///
/// The table never fills beyond 70% of its buckets; the insert that would
/// cross that bound doubles the capacity first.
///
/// ## Example
///
/// ```rust
/// # use core::hash::Hash;
/// # use core::hash::Hasher;
/// #
/// # use robin_map::hash_table::HashTable;
/// # use siphasher::sip::SipHasher;
/// #
/// # #[derive(Debug, PartialEq)]
/// # struct Person {
/// #     id: u64,
/// #     name: String,
/// # }
/// #
/// # fn hash_id(id: u64) -> u64 {
/// #     let mut hasher = SipHasher::new();
/// #     id.hash(&mut hasher);
/// #     hasher.finish()
/// # }
///
/// let mut table = HashTable::new();
/// let hash = hash_id(123);
///
/// let (position, inserted) = table.insert(
///     hash,
///     Person {
///         id: 123,
///         name: "Alice".to_string(),
///     },
///     |p: &Person| p.id == 123,
/// );
/// assert!(inserted);
/// assert_eq!(table[position].name, "Alice");
///
/// // Inserting the same key again leaves the table untouched.
/// let (_, inserted) = table.insert(
///     hash,
///     Person {
///         id: 123,
///         name: "Bob".to_string(),
///     },
///     |p: &Person| p.id == 123,
/// );
/// assert!(!inserted);
/// assert_eq!(table.find(hash, |p| p.id == 123).unwrap().name, "Alice");
/// ```
#[derive(Clone)]
pub struct HashTable<V> {
    slots: Vec<Slot<V>>,
    populated: usize,
    generation: usize,
}

impl<V> Debug for HashTable<V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        use alloc::format;
        use alloc::string::ToString;

        if self.slots.is_empty() {
            return f
                .debug_struct("HashTable")
                .field("layout", &"unallocated")
                .field("populated", &self.populated)
                .field("capacity", &0usize)
                .finish();
        }

        let mask = self.capacity() - 1;
        f.debug_struct("HashTable")
            .field(
                "layout",
                &self
                    .slots
                    .iter()
                    .enumerate()
                    .map(|(index, slot)| {
                        if slot.is_end() {
                            "END".to_string()
                        } else if slot.is_filled() {
                            let home = bucket(slot.hash(), mask);
                            format!("{home}+{}", displacement(index, home, mask))
                        } else {
                            "..".to_string()
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(", "),
            )
            .field("populated", &self.populated)
            .field("capacity", &self.capacity())
            .finish()
    }
}

impl<V> Default for HashTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> HashTable<V> {
    /// Creates an empty table without allocating.
    ///
    /// The first insert allocates the minimum number of buckets.
    ///
    /// ```rust
    /// # use robin_map::hash_table::HashTable;
    /// #
    /// let table: HashTable<u32> = HashTable::new();
    /// assert_eq!(table.capacity(), 0);
    /// assert_eq!(table.begin(), table.end());
    /// ```
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            populated: 0,
            generation: 0,
        }
    }

    /// Creates a table able to hold at least `capacity` values without
    /// resizing.
    ///
    /// A `capacity` of zero does not allocate.
    ///
    /// ```rust
    /// # use robin_map::hash_table::HashTable;
    /// #
    /// let table: HashTable<String> = HashTable::with_capacity(100);
    /// assert_eq!(table.capacity(), 256);
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        let mut table = Self::new();
        table.reserve(capacity);
        table
    }

    /// Returns the number of buckets. Always zero or a power of two.
    pub fn capacity(&self) -> usize {
        self.slots.len().saturating_sub(1)
    }

    /// Returns the number of elements in the table.
    pub fn len(&self) -> usize {
        self.populated
    }

    /// Returns `true` if the table contains no elements.
    pub fn is_empty(&self) -> bool {
        self.populated == 0
    }

    /// Removes all elements from the table, keeping its buckets.
    ///
    /// Positions taken before the call remain usable but no longer refer to
    /// any entry.
    pub fn clear(&mut self) {
        if self.populated == 0 {
            return;
        }

        if let Some((_, buckets)) = self.slots.split_last_mut() {
            buckets.iter_mut().for_each(Slot::set_empty);
        }
        self.populated = 0;
    }

    /// Reserves room for at least `additional` more elements.
    ///
    /// Grows by doubling until `len + additional` fits under the 70% fill
    /// level. Does nothing if that already holds.
    ///
    /// ```rust
    /// # use robin_map::hash_table::HashTable;
    /// #
    /// let mut table: HashTable<u64> = HashTable::new();
    /// table.reserve(6);
    /// assert_eq!(table.capacity(), 16);
    ///
    /// table.reserve(5);
    /// assert_eq!(table.capacity(), 16);
    /// ```
    pub fn reserve(&mut self, additional: usize) {
        let required = self.populated.saturating_add(additional);
        if required > max_load(self.capacity()) {
            self.grow(additional);
        }
    }

    /// Shrinks the table to the smallest capacity holding its elements.
    ///
    /// An empty table releases its buckets entirely and returns to the
    /// unallocated state.
    pub fn shrink_to_fit(&mut self) {
        if self.populated == 0 {
            if !self.slots.is_empty() {
                self.slots = Vec::new();
                self.generation = self.generation.wrapping_add(1);
            }
            return;
        }

        let capacity = capacity_for(self.populated, MIN_CAPACITY);
        if capacity < self.capacity() {
            self.rehash(capacity);
        }
    }

    /// Inserts `value` unless an equal value is already present.
    ///
    /// `eq` is used to detect a resident equal to `value`. Returns the
    /// position of the value with the given hash after the call and whether
    /// `value` was inserted. When an equal value already exists the table is
    /// left unchanged and `value` is dropped.
    ///
    /// ```rust
    /// # use robin_map::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// let (first, inserted) = table.insert(7, "seven", |&s| s == "seven");
    /// assert!(inserted);
    ///
    /// let (second, inserted) = table.insert(7, "seven", |&s| s == "seven");
    /// assert!(!inserted);
    /// assert_eq!(first, second);
    /// assert_eq!(table.len(), 1);
    /// ```
    pub fn insert(&mut self, hash: u64, value: V, eq: impl Fn(&V) -> bool) -> (Position, bool) {
        self.reserve_for_insert();
        let (index, inserted) = self.insert_impl(hash, value, eq);
        (self.position(index), inserted)
    }

    /// Gets an entry for the given hash and equality predicate.
    ///
    /// The table makes room for one more element before looking the value
    /// up, so a vacant entry can always be filled without resizing.
    ///
    /// ```rust
    /// # use robin_map::hash_table::Entry;
    /// # use robin_map::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    ///
    /// match table.entry(3, |&(k, _)| k == 3) {
    ///     Entry::Vacant(entry) => {
    ///         entry.insert((3, "three"));
    ///     }
    ///     Entry::Occupied(_) => unreachable!(),
    /// }
    ///
    /// let value = table.entry(3, |&(k, _)| k == 3).or_insert((3, "other"));
    /// assert_eq!(value.1, "three");
    /// ```
    pub fn entry(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Entry<'_, V> {
        self.reserve_for_insert();
        match self.find_index(hash, eq) {
            Some(index) => Entry::Occupied(OccupiedEntry { table: self, index }),
            None => Entry::Vacant(VacantEntry { table: self, hash }),
        }
    }

    /// Returns a reference to the value matching `hash` and `eq`.
    pub fn find(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&V> {
        let index = self.find_index(hash, eq)?;
        // SAFETY: `find_index` only returns filled slots.
        Some(unsafe { self.slots.get_unchecked(index).value_unchecked() })
    }

    /// Returns a mutable reference to the value matching `hash` and `eq`.
    ///
    /// The part of the value that `eq` and `hash` are derived from must not
    /// be changed through this reference.
    pub fn find_mut(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&mut V> {
        let index = self.find_index(hash, eq)?;
        // SAFETY: `find_index` only returns filled slots.
        Some(unsafe { self.slots.get_unchecked_mut(index).value_unchecked_mut() })
    }

    /// Returns the position of the value matching `hash` and `eq`.
    pub fn find_position(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<Position> {
        self.find_index(hash, eq).map(|index| self.position(index))
    }

    /// Removes and returns the value matching `hash` and `eq`.
    ///
    /// ```rust
    /// # use robin_map::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// table.insert(42, 42u64, |&n| n == 42);
    ///
    /// assert_eq!(table.remove(42, |&n| n == 42), Some(42));
    /// assert!(table.is_empty());
    /// assert_eq!(table.remove(42, |&n| n == 42), None);
    /// ```
    pub fn remove(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<V> {
        let index = self.find_index(hash, eq)?;
        Some(self.remove_index(index))
    }

    /// Position of the first element, or [`HashTable::end`] when empty.
    pub fn begin(&self) -> Position {
        if self.slots.is_empty() {
            return self.end();
        }
        self.position(self.scan(0))
    }

    /// Position of the end sentinel, one past the last element.
    pub fn end(&self) -> Position {
        self.position(self.capacity())
    }

    /// Position of the element following `position`.
    ///
    /// The end position is its own successor.
    ///
    /// # Panics
    ///
    /// Panics if `position` was taken before the table was reallocated.
    pub fn next(&self, position: Position) -> Position {
        self.check_position(position);
        if position.index >= self.capacity() {
            return self.end();
        }
        self.position(self.scan(position.index + 1))
    }

    /// Returns the value at `position`.
    ///
    /// Returns `None` for the end position, for a slot that has been emptied,
    /// and for positions taken before the table was reallocated.
    pub fn get_at(&self, position: Position) -> Option<&V> {
        if position.generation != self.generation {
            return None;
        }
        self.slots.get(position.index)?.value()
    }

    /// Mutable counterpart of [`HashTable::get_at`].
    pub fn get_at_mut(&mut self, position: Position) -> Option<&mut V> {
        if position.generation != self.generation {
            return None;
        }
        self.slots.get_mut(position.index)?.value_mut()
    }

    /// Removes the value at `position` and returns the position of the next
    /// element.
    ///
    /// Because removal shifts displaced successors backwards, the returned
    /// position may equal `position`. A run that wraps past the last bucket
    /// is shifted across the wrap as well, so an entry at the front of the
    /// table can move behind a cursor that already passed it.
    ///
    /// # Panics
    ///
    /// Panics if `position` holds no value or was taken before the table was
    /// reallocated.
    pub fn erase_at(&mut self, position: Position) -> Position {
        self.check_position(position);
        assert!(
            position.index < self.capacity() && self.slots[position.index].is_filled(),
            "erase_at called with a position that holds no entry"
        );

        self.remove_index(position.index);
        self.position(self.scan(position.index))
    }

    /// Removes every value from `first` up to, but excluding, `last`.
    ///
    /// Only the entries stored in the range when the call is made are
    /// removed; successors that compaction shifts into the range survive.
    /// Returns the position of the first surviving entry after the erased
    /// ones, or `last` if the range held nothing.
    ///
    /// # Panics
    ///
    /// Panics if either position was taken before the table was reallocated.
    pub fn erase_range(&mut self, first: Position, last: Position) -> Position {
        self.check_position(first);
        self.check_position(last);

        if first.index >= last.index {
            return last;
        }
        let mut remaining = self.slots[first.index..last.index]
            .iter()
            .filter(|slot| slot.is_filled())
            .count();
        if remaining == 0 {
            return last;
        }

        // Backward shifts keep the order of the run, so the range's own
        // entries are always the next ones reached from `current`.
        let mut current = self.position(self.scan(first.index));
        while remaining > 0 {
            current = self.erase_at(current);
            remaining -= 1;
        }
        current
    }

    /// Returns an iterator over all values in the table.
    ///
    /// The iteration order is unspecified.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            slots: &self.slots,
            index: 0,
            remaining: self.populated,
        }
    }

    /// Returns an iterator yielding mutable references to all values.
    pub fn iter_mut(&mut self) -> IterMut<'_, V> {
        IterMut {
            inner: self.slots.iter_mut(),
            remaining: self.populated,
        }
    }

    /// Returns an iterator that removes and yields all values from the table.
    ///
    /// The buckets are kept. Values not consumed before the iterator is
    /// dropped are dropped with it.
    pub fn drain(&mut self) -> Drain<'_, V> {
        Drain {
            table: self,
            index: 0,
        }
    }

    /// Computes a histogram of probe sequence lengths.
    #[cfg(any(test, feature = "stats"))]
    pub fn probe_histogram(&self) -> ProbeHistogram {
        let mut bins = Vec::new();
        if self.populated == 0 {
            return ProbeHistogram { bins };
        }

        let mask = self.capacity() - 1;
        for (index, slot) in self.slots.iter().enumerate() {
            if !slot.is_filled() {
                continue;
            }
            let psl = displacement(index, bucket(slot.hash(), mask), mask);
            if bins.len() <= psl {
                bins.resize(psl + 1, 0);
            }
            bins[psl] += 1;
        }

        ProbeHistogram { bins }
    }

    /// Returns detailed utilization statistics for debugging.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> DebugStats {
        let histogram = self.probe_histogram();
        let total_probe: usize = histogram
            .bins()
            .iter()
            .enumerate()
            .map(|(psl, count)| psl * count)
            .sum();
        let capacity = self.capacity();
        let slot_size = core::mem::size_of::<Slot<V>>();

        DebugStats {
            populated: self.populated,
            capacity,
            max_load: max_load(capacity),
            load_factor: if capacity == 0 {
                0.0
            } else {
                self.populated as f64 / capacity as f64
            },
            max_probe_length: histogram.max_probe_length().unwrap_or(0),
            mean_probe_length: if self.populated == 0 {
                0.0
            } else {
                total_probe as f64 / self.populated as f64
            },
            total_bytes: self.slots.len() * slot_size,
            wasted_bytes: (self.slots.len() - self.populated) * slot_size,
        }
    }

    #[inline(always)]
    fn position(&self, index: usize) -> Position {
        Position {
            index,
            generation: self.generation,
        }
    }

    #[inline]
    fn check_position(&self, position: Position) {
        assert!(
            position.generation == self.generation,
            "position used after the table was reallocated"
        );
    }

    /// Skips empty buckets starting at `from`, stopping at the first filled
    /// slot or at the end sentinel.
    ///
    /// Must only be called on an allocated table with `from <= capacity`.
    #[inline]
    fn scan(&self, from: usize) -> usize {
        let mut index = from;
        while self.slots[index].is_empty() {
            index += 1;
        }
        index
    }

    #[inline]
    fn reserve_for_insert(&mut self) {
        if self.slots.is_empty() || self.populated + 1 > max_load(self.capacity()) {
            self.grow(1);
        }
    }

    #[cold]
    fn grow(&mut self, additional: usize) {
        let Some(required) = self.populated.checked_add(additional) else {
            panic!("capacity overflow");
        };
        let capacity = capacity_for(required, self.capacity());
        if capacity != self.capacity() {
            self.rehash(capacity);
        }
    }

    /// Moves every entry into a freshly allocated array of `capacity`
    /// buckets, reusing the cached hashes.
    fn rehash(&mut self, capacity: usize) {
        let old = core::mem::replace(&mut self.slots, allocate(capacity));
        self.generation = self.generation.wrapping_add(1);
        self.populated = 0;

        for mut slot in old {
            if let Some((hash, value)) = slot.take() {
                self.insert_impl(hash, value, |_| false);
            }
        }
    }

    /// Robin Hood insertion walk.
    ///
    /// Requires room for one more entry. Returns the index where `value`
    /// settled, or the index of the resident matched by `eq`.
    fn insert_impl(&mut self, hash: u64, value: V, eq: impl Fn(&V) -> bool) -> (usize, bool) {
        debug_assert!(self.populated < self.capacity());

        let mask = self.capacity() - 1;
        let mut hash = hash | FILLED_BIT;
        let mut value = value;
        let mut home = bucket(hash, mask);
        let mut current = home;
        // Index claimed by the inserted value once it robbed a slot. From then
        // on the carried entries were already resident and can't be
        // duplicates.
        let mut settled = None;

        loop {
            let slot = &mut self.slots[current];
            if !slot.is_filled() {
                slot.set_filled(hash, value);
                self.populated += 1;
                return (settled.unwrap_or(current), true);
            }

            if settled.is_none() && slot.hash() == hash {
                // SAFETY: The slot is filled.
                if eq(unsafe { slot.value_unchecked() }) {
                    return (current, false);
                }
            }

            let resident_home = bucket(slot.hash(), mask);
            if displacement(current, home, mask) > displacement(current, resident_home, mask) {
                settled.get_or_insert(current);
                // SAFETY: The slot is filled and `hash` carries the filled bit.
                unsafe { slot.swap(&mut hash, &mut value) };
                home = resident_home;
            }

            current = (current + 1) & mask;
        }
    }

    fn find_index(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<usize> {
        if self.populated == 0 {
            return None;
        }

        let mask = self.capacity() - 1;
        let hash = hash | FILLED_BIT;
        let home = bucket(hash, mask);
        let mut current = home;

        loop {
            let slot = &self.slots[current];
            if !slot.is_filled() {
                return None;
            }

            // SAFETY: The slot is filled.
            if slot.hash() == hash && eq(unsafe { slot.value_unchecked() }) {
                return Some(current);
            }

            // A resident closer to home than we are would have been robbed by
            // the value we're looking for, so it can't be further along.
            if displacement(current, home, mask)
                > displacement(current, bucket(slot.hash(), mask), mask)
            {
                return None;
            }

            current = (current + 1) & mask;
        }
    }

    /// Removes the entry at `index` and closes the gap by shifting displaced
    /// successors back one bucket.
    fn remove_index(&mut self, index: usize) -> V {
        let mask = self.capacity() - 1;
        let (_, value) = match self.slots[index].take() {
            Some(entry) => entry,
            None => panic!("no entry at slot {index}"),
        };

        let mut hole = index;
        loop {
            let next = (hole + 1) & mask;
            let slot = &mut self.slots[next];
            if !slot.is_filled() || displacement(next, bucket(slot.hash(), mask), mask) == 0 {
                break;
            }

            if let Some((hash, moved)) = slot.take() {
                self.slots[hole].set_filled(hash, moved);
            }
            hole = next;
        }

        self.populated -= 1;
        value
    }
}

impl<V> Index<Position> for HashTable<V> {
    type Output = V;

    /// # Panics
    ///
    /// Panics if `position` holds no value.
    fn index(&self, position: Position) -> &V {
        match self.get_at(position) {
            Some(value) => value,
            None => panic!("no entry at {position:?}"),
        }
    }
}

impl<V> IndexMut<Position> for HashTable<V> {
    fn index_mut(&mut self, position: Position) -> &mut V {
        match self.get_at_mut(position) {
            Some(value) => value,
            None => panic!("no entry at {position:?}"),
        }
    }
}

impl<'a, V> IntoIterator for &'a HashTable<V> {
    type Item = &'a V;
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, V> IntoIterator for &'a mut HashTable<V> {
    type Item = &'a mut V;
    type IntoIter = IterMut<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<V> IntoIterator for HashTable<V> {
    type Item = V;
    type IntoIter = IntoIter<V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            remaining: self.populated,
            inner: self.slots.into_iter(),
        }
    }
}

/// A view into a single entry in the hash table, which may be vacant or
/// occupied.
///
/// This enum is constructed from the [`entry`] method on [`HashTable`].
///
/// [`entry`]: HashTable::entry
pub enum Entry<'a, V> {
    /// A vacant entry - the value is not present in the table
    Vacant(VacantEntry<'a, V>),
    /// An occupied entry - the value is present in the table
    Occupied(OccupiedEntry<'a, V>),
}

impl<'a, V> Entry<'a, V> {
    /// Inserts `default` if the entry is vacant and returns a mutable
    /// reference to the value in the entry.
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts the result of `default` if the entry is vacant and returns a
    /// mutable reference to the value in the entry.
    ///
    /// `default` is not called for an occupied entry.
    pub fn or_insert_with(self, default: impl FnOnce() -> V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Applies `f` to the value of an occupied entry and returns it. Returns
    /// `None` without inserting anything if the entry is vacant.
    pub fn and_modify(self, f: impl FnOnce(&mut V)) -> Option<&'a mut V> {
        match self {
            Entry::Occupied(entry) => {
                let value = entry.into_mut();
                f(&mut *value);
                Some(value)
            }
            Entry::Vacant(_) => None,
        }
    }

    /// Inserts `V::default()` if the entry is vacant and returns a mutable
    /// reference to the value in the entry.
    pub fn or_default(self) -> &'a mut V
    where
        V: Default,
    {
        self.or_insert_with(V::default)
    }
}

/// A view into a vacant entry in a [`HashTable`].
///
/// The table already has room for the value, so inserting never resizes.
pub struct VacantEntry<'a, V> {
    table: &'a mut HashTable<V>,
    hash: u64,
}

impl<'a, V> VacantEntry<'a, V> {
    /// Inserts `value` and returns a mutable reference to it.
    pub fn insert(self, value: V) -> &'a mut V {
        self.insert_entry(value).into_mut()
    }

    /// Inserts `value` and returns an occupied entry pointing at it.
    pub fn insert_entry(self, value: V) -> OccupiedEntry<'a, V> {
        let (index, _) = self.table.insert_impl(self.hash, value, |_| false);
        OccupiedEntry {
            table: self.table,
            index,
        }
    }
}

/// A view into an occupied entry in a [`HashTable`].
pub struct OccupiedEntry<'a, V> {
    table: &'a mut HashTable<V>,
    index: usize,
}

impl<'a, V> OccupiedEntry<'a, V> {
    /// Gets a reference to the value in the entry.
    pub fn get(&self) -> &V {
        // SAFETY: The entry was created for a filled slot and holds the only
        // borrow of the table.
        unsafe { self.table.slots.get_unchecked(self.index).value_unchecked() }
    }

    /// Gets a mutable reference to the value in the entry.
    pub fn get_mut(&mut self) -> &mut V {
        // SAFETY: See `get`.
        unsafe {
            self.table
                .slots
                .get_unchecked_mut(self.index)
                .value_unchecked_mut()
        }
    }

    /// Converts the entry into a mutable reference bound to the table's
    /// lifetime.
    pub fn into_mut(self) -> &'a mut V {
        // SAFETY: See `get`.
        unsafe {
            self.table
                .slots
                .get_unchecked_mut(self.index)
                .value_unchecked_mut()
        }
    }

    /// The position of the entry.
    pub fn position(&self) -> Position {
        self.table.position(self.index)
    }

    /// Removes the value from the table and returns it.
    pub fn remove(self) -> V {
        self.table.remove_index(self.index)
    }
}

/// An iterator over the values of a [`HashTable`].
///
/// Created by [`HashTable::iter`].
pub struct Iter<'a, V> {
    slots: &'a [Slot<V>],
    index: usize,
    remaining: usize,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let slots = self.slots;
        while let Some(slot) = slots.get(self.index) {
            if slot.is_end() {
                break;
            }
            self.index += 1;
            if let Some(value) = slot.value() {
                self.remaining -= 1;
                return Some(value);
            }
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}

impl<V> Clone for Iter<'_, V> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots,
            index: self.index,
            remaining: self.remaining,
        }
    }
}

/// A mutable iterator over the values of a [`HashTable`].
///
/// Created by [`HashTable::iter_mut`].
pub struct IterMut<'a, V> {
    inner: core::slice::IterMut<'a, Slot<V>>,
    remaining: usize,
}

impl<'a, V> Iterator for IterMut<'a, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        for slot in self.inner.by_ref() {
            if let Some(value) = slot.value_mut() {
                self.remaining -= 1;
                return Some(value);
            }
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for IterMut<'_, V> {}

/// An owning iterator over the values of a [`HashTable`].
pub struct IntoIter<V> {
    inner: alloc::vec::IntoIter<Slot<V>>,
    remaining: usize,
}

impl<V> Iterator for IntoIter<V> {
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        for mut slot in self.inner.by_ref() {
            if let Some((_, value)) = slot.take() {
                self.remaining -= 1;
                return Some(value);
            }
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for IntoIter<V> {}

/// A draining iterator over the values of a [`HashTable`].
///
/// Created by [`HashTable::drain`].
pub struct Drain<'a, V> {
    table: &'a mut HashTable<V>,
    index: usize,
}

impl<V> Drop for Drain<'_, V> {
    fn drop(&mut self) {
        for _ in &mut *self {}
    }
}

impl<V> Iterator for Drain<'_, V> {
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        if self.table.populated == 0 {
            return None;
        }

        while self.index < self.table.capacity() {
            let slot = &mut self.table.slots[self.index];
            self.index += 1;
            if let Some((_, value)) = slot.take() {
                self.table.populated -= 1;
                return Some(value);
            }
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.table.populated, Some(self.table.populated))
    }
}

impl<V> ExactSizeIterator for Drain<'_, V> {}
