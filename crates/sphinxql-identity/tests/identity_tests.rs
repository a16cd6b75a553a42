use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use proptest::prelude::*;
use tempfile::TempDir;

use sphinxql_core::traits::IdentityStore;
use sphinxql_core::types::{DocumentId, EntityRef};
use sphinxql_core::Error;
use sphinxql_identity::SqliteIdentityStore;

fn store() -> SqliteIdentityStore { SqliteIdentityStore::open_in_memory().expect("in-memory store") }

#[test]
fn get_or_create_is_idempotent() {
    let s = store();
    let post = EntityRef::new("blog.post", 1);
    let first = s.get_or_create(&post).unwrap();
    let second = s.get_or_create(&post).unwrap();
    assert_eq!(first, second);
    assert_eq!(s.count(&[]).unwrap(), 1);
}

#[test]
fn same_primary_key_in_two_kinds_gets_two_ids() {
    let s = store();
    let post = s.get_or_create(&EntityRef::new("blog.post", 42)).unwrap();
    let comment = s.get_or_create(&EntityRef::new("blog.comment", 42)).unwrap();
    assert_ne!(post, comment);
    assert_eq!(s.resolve(post).unwrap(), EntityRef::new("blog.post", 42));
    assert_eq!(s.resolve(comment).unwrap(), EntityRef::new("blog.comment", 42));
}

#[test]
fn integer_and_text_keys_stay_distinct() {
    let s = store();
    let int_key = s.get_or_create(&EntityRef::new("shop.item", 7)).unwrap();
    let text_key = s.get_or_create(&EntityRef::new("shop.item", "7")).unwrap();
    assert_ne!(int_key, text_key);
    assert_eq!(s.resolve(text_key).unwrap(), EntityRef::new("shop.item", "7"));
}

#[test]
fn resolve_missing_id_is_not_found() {
    let s = store();
    assert!(matches!(s.resolve(DocumentId(99)), Err(Error::NotFound(DocumentId(99)))));
}

#[test]
fn delete_is_safe_to_retry() {
    let s = store();
    let post = EntityRef::new("blog.post", 5);
    s.get_or_create(&post).unwrap();
    assert!(s.delete(&post).unwrap());
    assert!(!s.delete(&post).unwrap(), "second delete is a no-op");
    assert_eq!(s.find(&post).unwrap(), None);
}

#[test]
fn ids_are_not_reused_after_delete() {
    let s = store();
    let a = EntityRef::new("blog.post", 1);
    let first = s.get_or_create(&a).unwrap();
    s.delete(&a).unwrap();
    let again = s.get_or_create(&a).unwrap();
    assert!(again > first, "{again} should be above {first}");
}

#[test]
fn delete_batch_tolerates_overlap() {
    let s = store();
    let ids: Vec<DocumentId> = (0..10).map(|i| s.get_or_create(&EntityRef::new("blog.post", i)).unwrap()).collect();
    assert_eq!(s.delete_batch(&ids[..4]).unwrap(), 4);
    assert_eq!(s.delete_batch(&ids).unwrap(), 6, "already-deleted ids are skipped");
    assert_eq!(s.delete_batch(&ids).unwrap(), 0);
    assert_eq!(s.count(&[]).unwrap(), 0);
}

#[test]
fn page_is_ordered_and_scoped() {
    let s = store();
    for i in 0..5 {
        s.get_or_create(&EntityRef::new("blog.post", i)).unwrap();
        s.get_or_create(&EntityRef::new("blog.comment", i)).unwrap();
    }
    let all = s.page(&[], 100).unwrap();
    assert_eq!(all.len(), 10);
    assert!(all.windows(2).all(|w| w[0] < w[1]));

    let posts = s.page(&["blog.post".to_string()], 3).unwrap();
    assert_eq!(posts.len(), 3);
    for id in posts {
        assert_eq!(s.resolve(id).unwrap().kind, "blog.post");
    }
    assert_eq!(s.count(&["blog.comment".to_string()]).unwrap(), 5);
}

#[test]
fn records_survive_reopen() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("nested/identity.db");
    let id = {
        let s = SqliteIdentityStore::open(&path).expect("open");
        s.get_or_create(&EntityRef::new("blog.post", "slug-a")).unwrap()
    };
    let s = SqliteIdentityStore::open(&path).expect("reopen");
    assert_eq!(s.find(&EntityRef::new("blog.post", "slug-a")).unwrap(), Some(id));
}

#[test]
fn concurrent_workers_share_one_id() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("identity.db");
    SqliteIdentityStore::open(&path).expect("create schema");

    let path = Arc::new(path);
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let path = Arc::clone(&path);
            thread::spawn(move || {
                let s = SqliteIdentityStore::open(&path).expect("open");
                (0..25).map(|i| s.get_or_create(&EntityRef::new("blog.post", i)).unwrap()).collect::<Vec<_>>()
            })
        })
        .collect();
    let results: Vec<Vec<DocumentId>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for r in &results[1..] {
        assert_eq!(r, &results[0]);
    }
    let unique: HashSet<_> = results[0].iter().collect();
    assert_eq!(unique.len(), 25);
}

proptest! {
    #[test]
    fn get_or_create_twice_returns_same_id(kind in "[a-z]{1,8}\\.[a-z]{1,8}", id in any::<i64>()) {
        let s = store();
        let entity = EntityRef::new(kind, id);
        let a = s.get_or_create(&entity).unwrap();
        let b = s.get_or_create(&entity).unwrap();
        prop_assert_eq!(a, b);
        prop_assert_eq!(s.resolve(a).unwrap(), entity);
    }
}
