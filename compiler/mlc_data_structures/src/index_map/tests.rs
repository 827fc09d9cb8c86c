// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::IndexMap;
use expect_test::expect;

#[test]
fn get_returns_the_inserted_value() {
    let mut map = IndexMap::new();
    map.insert(3usize, "three");
    assert_eq!(map.get(3usize), Some(&"three"));
    assert_eq!(map.get(1usize), None);
    assert!(map.contains_key(3usize));
    assert!(!map.contains_key(4usize));
}

#[test]
fn insert_overwrites_and_remove_takes() {
    let mut map = IndexMap::new();
    map.insert(0usize, 10);
    map.insert(0usize, 20);
    assert_eq!(map.get(0usize), Some(&20));
    assert_eq!(map.remove(0usize), Some(20));
    assert!(map.is_empty());
}

#[test]
fn iteration_skips_absent_slots() {
    let mut map = IndexMap::new();
    map.insert(0usize, 'a');
    map.insert(2usize, 'c');
    let entries: Vec<(usize, char)> = map.iter().map(|(k, v)| (k, *v)).collect();
    expect![[r#"
        [
            (
                0,
                'a',
            ),
            (
                2,
                'c',
            ),
        ]
    "#]]
    .assert_debug_eq(&entries);
}
