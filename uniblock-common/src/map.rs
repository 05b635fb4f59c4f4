/// Fast hash map type for small string-keyed sets.
pub type FastHashMap<K, V> =
    std::collections::HashMap<K, V, core::hash::BuildHasherDefault<rustc_hash::FxHasher>>;

pub use rustc_hash;
