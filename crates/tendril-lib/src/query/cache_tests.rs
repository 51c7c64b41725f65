use std::sync::Arc;

use super::{Pattern, cache};

// One test drives the whole lifecycle: the cache is process-wide, so
// splitting this up would let parallel tests race each other.
#[test]
fn cache_hits_and_evicts_in_insertion_order() {
    cache::clear();

    let a = Pattern::cached("[1 2 3]").unwrap();
    let b = Pattern::cached("[1 2 3]").unwrap();
    assert!(Arc::ptr_eq(&a.ast, &b.ast), "second lookup should hit");

    // Overflow the cache with distinct patterns.
    for i in 0..(cache::capacity() + 8) {
        Pattern::cached(&format!("[{i}]")).unwrap();
    }
    assert!(cache::len() <= cache::capacity());

    // The earliest entry has been evicted and recompiles fresh.
    let c = Pattern::cached("[1 2 3]").unwrap();
    assert!(!Arc::ptr_eq(&a.ast, &c.ast), "evicted entry must recompile");

    // Cached and uncached compilation agree.
    let direct = Pattern::compile("[1 2 3]").unwrap();
    assert_eq!(format!("{:?}", direct.ast), format!("{:?}", c.ast));
}
