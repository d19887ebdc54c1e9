//! Integration Tests for the Global Cache
//!
//! Kept to a single test: the global cache lives for the whole test binary,
//! so splitting these steps would make them depend on execution order.

use std::time::Duration;

use mini_cache::{global, CacheConfig, CacheError, StoreKind};

#[derive(Debug, Clone, PartialEq)]
struct Session {
    user: String,
    visits: u32,
}

#[test]
fn test_global_cache_lifecycle() {
    // == First init wins ==
    let first = global::init(CacheConfig::default().with_capacity(2)).unwrap();
    let second = global::init(CacheConfig::default().with_capacity(100)).unwrap();
    assert!(std::ptr::eq(first, second));
    assert_eq!(global::global().store_kind(), StoreKind::Lru { capacity: 2 });

    // == Typed set and get ==
    global::set("answer", 42u32);
    global::set(
        "session",
        Session {
            user: "alice".to_string(),
            visits: 3,
        },
    );

    assert_eq!(global::get::<u32>("answer").unwrap(), Some(42));
    let session = global::get_arc::<Session>("session").unwrap().unwrap();
    assert_eq!(session.user, "alice");
    assert_eq!(session.visits, 3);
    assert_eq!(global::get::<u32>("missing").unwrap(), None);

    // == Type mismatch ==
    let err = global::get::<String>("answer").unwrap_err();
    assert_eq!(
        err,
        CacheError::TypeMismatch {
            key: "answer".to_string(),
            expected: std::any::type_name::<String>(),
        }
    );

    // == Capacity applies to the global cache ==
    assert!(global::get_arc::<Session>("session").unwrap().is_some());
    global::set("third", 3u8);
    assert_eq!(global::global().count(), 2);
    assert_eq!(global::get::<u32>("answer").unwrap(), None, "Evicted as least recently used");

    // == Delete ==
    assert!(global::delete("third"));
    assert!(!global::delete("third"));
    assert_eq!(global::get::<u8>("third").unwrap(), None);

    // == Zero TTL ==
    global::set_with_ttl("gone", 1u8, Some(Duration::ZERO));
    assert_eq!(global::get::<u8>("gone").unwrap(), None);
}
