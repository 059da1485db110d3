// HashMap model-based property tests.
//
// Property 1: the map behaves like std's HashMap under a random mix of
// operations, with `insert` keeping existing values.
//  - Operations: insert, emplace, get_or_default, erase, erase by position,
//    at, reserve, shrink_to_fit, clear.
//  - At each step: len matches, every probed key agrees, and the fill ratio
//    stays at or below 70%.
//
// Property 2: a low-entropy hasher piles keys into few buckets, stressing
// long Robin Hood runs, wrap-around and backward-shift deletion.
use std::collections::HashMap as ModelMap;
use std::hash::BuildHasher;
use std::hash::Hasher;

use proptest::prelude::*;
use robin_map::Error;
use robin_map::HashMap;

/// Keeps only the low four bits of the key: at most 16 distinct hashes.
#[derive(Clone, Default)]
struct CrowdedState;

#[derive(Default)]
struct CrowdedHasher(u64);

impl Hasher for CrowdedHasher {
    fn finish(&self) -> u64 {
        self.0 & 0xF
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = self.0.rotate_left(8) ^ u64::from(b);
        }
    }
}

impl BuildHasher for CrowdedState {
    type Hasher = CrowdedHasher;

    fn build_hasher(&self) -> Self::Hasher {
        CrowdedHasher::default()
    }
}

#[derive(Debug, Clone)]
enum Op {
    Insert(u16, u32),
    Emplace(u16, u32),
    Bump(u16),
    Erase(u16),
    EraseAt(u16),
    At(u16),
    Reserve(u8),
    ShrinkToFit,
    Clear,
}

fn op_strategy(key_space: u16) -> impl Strategy<Value = Op> {
    prop_oneof![
        8 => (0..key_space, any::<u32>()).prop_map(|(k, v)| Op::Insert(k, v)),
        2 => (0..key_space, any::<u32>()).prop_map(|(k, v)| Op::Emplace(k, v)),
        2 => (0..key_space).prop_map(Op::Bump),
        5 => (0..key_space).prop_map(Op::Erase),
        2 => (0..key_space).prop_map(Op::EraseAt),
        3 => (0..key_space).prop_map(Op::At),
        1 => any::<u8>().prop_map(Op::Reserve),
        1 => Just(Op::ShrinkToFit),
        1 => Just(Op::Clear),
    ]
}

fn run_against_model<S: BuildHasher>(
    mut map: HashMap<u16, u32, S>,
    ops: Vec<Op>,
) -> Result<(), TestCaseError> {
    let mut model: ModelMap<u16, u32> = ModelMap::new();

    for op in ops {
        match op {
            Op::Insert(k, v) => {
                let (position, inserted) = map.insert(k, v);
                prop_assert_eq!(inserted, !model.contains_key(&k));
                let expected = *model.entry(k).or_insert(v);
                prop_assert_eq!(map.get_at(position), Some((&k, &expected)));
            }
            Op::Emplace(k, v) => {
                let mut called = false;
                let (_, inserted) = map.emplace(k, || {
                    called = true;
                    v
                });
                prop_assert_eq!(inserted, called);
                prop_assert_eq!(inserted, !model.contains_key(&k));
                model.entry(k).or_insert(v);
            }
            Op::Bump(k) => {
                let value = map.get_or_default(k);
                *value = value.wrapping_add(1);
                let expected = model.entry(k).or_default();
                *expected = expected.wrapping_add(1);
            }
            Op::Erase(k) => {
                let removed = map.erase(&k);
                prop_assert_eq!(removed, usize::from(model.remove(&k).is_some()));
            }
            Op::EraseAt(k) => {
                if let Some(position) = map.find(&k) {
                    let before = map.len();
                    map.erase_at(position);
                    prop_assert_eq!(map.len(), before - 1);
                    prop_assert!(model.remove(&k).is_some());
                } else {
                    prop_assert!(!model.contains_key(&k));
                }
            }
            Op::At(k) => match model.get(&k) {
                Some(v) => prop_assert_eq!(map.at(&k), Ok(v)),
                None => prop_assert_eq!(map.at(&k), Err(Error::NotFound)),
            },
            Op::Reserve(n) => {
                map.reserve(usize::from(n));
                prop_assert!((map.len() + usize::from(n)) * 10 <= map.capacity() * 7);
            }
            Op::ShrinkToFit => {
                map.shrink_to_fit();
                if map.is_empty() {
                    prop_assert_eq!(map.capacity(), 0);
                }
            }
            Op::Clear => {
                let capacity = map.capacity();
                map.clear();
                model.clear();
                prop_assert_eq!(map.capacity(), capacity);
            }
        }

        prop_assert_eq!(map.len(), model.len());
        prop_assert!(map.len() * 10 <= map.capacity() * 7);
        let capacity = map.capacity();
        prop_assert!(capacity == 0 || (capacity >= 8 && capacity.is_power_of_two()));
    }

    for (k, v) in &model {
        prop_assert_eq!(map.get(k), Some(v));
    }
    prop_assert_eq!(map.iter().count(), model.len());

    let mut walked = 0;
    let mut position = map.begin();
    while position != map.end() {
        let (k, v) = map.get_at(position).unwrap();
        prop_assert_eq!(model.get(k), Some(v));
        walked += 1;
        position = map.next(position);
    }
    prop_assert_eq!(walked, model.len());

    Ok(())
}

proptest! {
    #[test]
    fn prop_matches_std_model(ops in proptest::collection::vec(op_strategy(200), 1..400)) {
        run_against_model(HashMap::<u16, u32>::new(), ops)?;
    }

    #[test]
    fn prop_matches_std_model_crowded(ops in proptest::collection::vec(op_strategy(64), 1..300)) {
        run_against_model(HashMap::<u16, u32, CrowdedState>::new(), ops)?;
    }

    #[test]
    fn prop_equality_ignores_insertion_order(keys in proptest::collection::hash_set(any::<u32>(), 0..200)) {
        let forward: HashMap<u32, u32> = keys.iter().map(|&k| (k, !k)).collect();
        let mut reversed: Vec<u32> = keys.iter().copied().collect();
        reversed.reverse();
        let mut backward: HashMap<u32, u32> = HashMap::with_capacity(reversed.len() * 3);
        backward.extend(reversed.into_iter().map(|k| (k, !k)));

        prop_assert_eq!(&forward, &backward);
        prop_assert_eq!(forward.len(), keys.len());
    }
}
