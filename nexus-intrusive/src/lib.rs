//! Intrusive collections over caller-owned storage.
//!
//! Elements live in a [`Storage`] arena that the caller owns. Each element
//! embeds one link struct per structure it can join. Structures hold only
//! indices into the arena and rewrite those link fields. Nothing is
//! allocated or freed on insert or remove, and indices stay valid for as
//! long as the element stays in storage.
//!
//! ```text
//! Storage (BoxedStorage, slab::Slab) - owns elements, hands out stable indices
//! Heap/Tree/Table/Set/...            - thread indices through embedded links
//! ```
//!
//! An element can be in several structures at once, including several of
//! the same kind, as long as each uses its own link field. An [`Adapter`]
//! zero-sized type picks the field, and for ordered structures a
//! [`Keyed`] adapter also picks the key. The [`adapter!`] macro writes
//! both.
//!
//! # Example
//!
//! One element sits in a hash table by name and in a min-heap by cost.
//!
//! ```
//! use nexus_intrusive::{adapter, BoxedStorage, Heap, HeapLink, Storage, Table, TableLink};
//!
//! struct Route {
//!     name: &'static str,
//!     cost: u32,
//!     by_name: TableLink<u32>,
//!     by_cost: HeapLink<u32>,
//! }
//!
//! adapter! {
//!     struct ByName: Route => by_name: TableLink<u32>, key name: &'static str;
//! }
//! adapter! {
//!     struct ByCost: Route => by_cost: HeapLink<u32>, key cost: u32;
//! }
//!
//! let mut storage: BoxedStorage<Route> = BoxedStorage::with_capacity(16);
//! let mut names: Table<u32, ByName> = Table::with_buckets(8);
//! let mut costs: Heap<u32, ByCost> = Heap::new();
//!
//! for (name, cost) in [("north", 7), ("south", 3), ("east", 5)] {
//!     let r = storage
//!         .try_insert(Route { name, cost, by_name: TableLink::new(), by_cost: HeapLink::new() })
//!         .unwrap();
//!     names.set(&mut storage, r);
//!     costs.inhume(&mut storage, r);
//! }
//!
//! let east = names.get(&mut storage, &"east").unwrap();
//! storage.get_mut(east).unwrap().cost = 1;
//! costs.churn(&mut storage, east);
//! assert_eq!(costs.peek(), Some(east));
//!
//! costs.clear(&mut storage);
//! names.clear(&mut storage);
//! ```
//!
//! # Same storage, always
//!
//! A structure must always be used with the storage its elements came
//! from. Indices from a different arena resolve to unrelated elements. An
//! index that does not resolve at all panics with `invalid index`.
//!
//! # Unbinding before drop
//!
//! Every link panics in debug builds if it is dropped while still bound.
//! Call `clear` (or `dissolve`, `polish`, ...) on each structure before
//! dropping the storage or removing an element that is still linked.
//!
//! # Data Structures
//!
//! | Structure | Kind | Key Operations |
//! |-----------|------|----------------|
//! | [`Heap`] | Pairing heap | O(1) inhume/meld, O(log n) amortized exhume, decrease-key |
//! | [`Tree`] | Red-black tree | O(log n) graft/prune/find, duplicates kept in order |
//! | [`Table`] | Chained hash table | O(1) expected set/get with move-to-front, rehash |
//! | [`Set`] | Union-find | near-O(1) archetype/conjoin, member enumeration |
//! | [`Queue`] | FIFO | O(1) enqueue/dequeue/chain, stable merge sort |
//! | [`Stack`] | LIFO | O(1) push/pop |
//! | [`List`] | Circular ring | O(1) insert/remove anywhere, rotation |
//! | [`Order`] | Sorted list | O(n) insert, O(n + m) merge |
//!
//! # Feature Flags
//!
//! - `slab` - [`Storage`] impl for `slab::Slab`
//! - `validate` - walk the full structure invariants after every heap and
//!   tree mutation in debug builds

/// Checks an invariant walk after a mutation when the `validate` feature is
/// on in a debug build.
macro_rules! debug_validate {
    ($e:expr) => {
        #[cfg(all(debug_assertions, feature = "validate"))]
        assert!($e, "structure invariants violated");
    };
}

pub mod error;
pub mod heap;
pub mod index;
pub mod key;
pub mod link;
pub mod list;
pub mod order;
pub mod queue;
pub mod set;
pub mod stack;
pub mod storage;
pub mod table;
pub mod tree;

pub use error::{Error, Result};
pub use heap::{Heap, HeapLink};
pub use index::Index;
pub use key::{Ascending, Compare, Descending, Fnv1a, FnvHasher, KeyHash};
pub use link::{Adapter, Keyed, Link, TaggedLink};
pub use list::{List, ListLink};
pub use order::{Order, OrderLink};
pub use queue::{Queue, QueueLink};
pub use set::{Set, SetLink};
pub use stack::{Stack, StackLink};
pub use storage::{BoxedStorage, Full, Storage};
pub use table::{Bucket, Table, TableLink};
pub use tree::{PruneBias, Tree, TreeLink};
