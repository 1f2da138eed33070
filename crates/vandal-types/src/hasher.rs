//! default hashing types with a faster non-cryptographic hasher

use rustc_hash::{FxHashMap, FxHashSet};

/// FastHashMap using fx hash
pub type FastHashMap<K, V> = FxHashMap<K, V>;
/// FastHashSet using fx hash
pub type FastHashSet<V> = FxHashSet<V>;
