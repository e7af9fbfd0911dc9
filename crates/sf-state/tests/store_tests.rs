//! Store behaviour across threads and nested writes
//!
//! - Concurrent optimistic-lock writers: exactly one wins per version
//! - Reentrant subscriber chains settle in commit order
//! - Checkpoint rollback after interleaved writes

use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use serde_json::json;
use sf_state::{StateStore, UpdateOptions, WILDCARD};

fn game_store() -> Arc<StateStore> {
    Arc::new(StateStore::with_initial(json!({
        "game": { "credits": 1000, "lastWin": 0, "isSpinning": false, "spinCount": 0 },
        "features": { "cascade": { "count": 0, "multiplier": 1 } },
        "ui": { "message": null }
    })))
}

#[test]
fn test_concurrent_expected_version_writers() {
    let store = game_store();
    let version = store.version();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                store
                    .update("game.credits", json!(900 + i), UpdateOptions::expecting(version))
                    .is_ok()
            })
        })
        .collect();

    let wins = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();

    assert_eq!(wins, 1);
    assert_eq!(store.version(), version + 1);
}

#[test]
fn test_versions_strictly_increase_under_contention() {
    let store = game_store();
    let seen = Arc::new(Mutex::new(Vec::new()));
    {
        let seen = Arc::clone(&seen);
        let reader = Arc::clone(&store);
        store
            .subscribe(WILDCARD, move |_, _, _| {
                seen.lock().push(reader.version());
                Ok(())
            })
            .unwrap();
    }

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for n in 0..25 {
                    store
                        .update(
                            "game.spinCount",
                            json!(t * 1000 + n + 1),
                            UpdateOptions::default(),
                        )
                        .unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(store.version(), 100);
    assert_eq!(seen.lock().len(), 100);
}

#[test]
fn test_reentrant_chain_settles_in_order() {
    let store = game_store();
    let order = Arc::new(Mutex::new(Vec::new()));

    // credits change -> write lastWin -> write ui.message
    {
        let writer = Arc::clone(&store);
        store
            .subscribe("game.credits", move |_, _, _| {
                writer.update("game.lastWin", json!(50), UpdateOptions::default())?;
                Ok(())
            })
            .unwrap();
    }
    {
        let writer = Arc::clone(&store);
        store
            .subscribe("game.lastWin", move |new, _, _| {
                writer.update(
                    "ui.message",
                    json!(format!("WIN {}", new)),
                    UpdateOptions::default(),
                )?;
                Ok(())
            })
            .unwrap();
    }
    {
        let order = Arc::clone(&order);
        store
            .subscribe(WILDCARD, move |_, _, path| {
                order.lock().push(path.to_string());
                Ok(())
            })
            .unwrap();
    }

    store
        .update("game.credits", json!(1050), UpdateOptions::default())
        .unwrap();

    assert_eq!(
        *order.lock(),
        vec!["game.credits", "game.lastWin", "ui.message"]
    );
    assert_eq!(store.select(Some("ui.message")), json!("WIN 50"));
    assert_eq!(store.version(), 3);
}

#[test]
fn test_rollback_after_partial_spin() {
    let store = game_store();
    let checkpoint = store
        .create_checkpoint(
            "spin-1",
            &["game.credits", "game.isSpinning", "features.cascade"],
        )
        .unwrap();

    store
        .update_many(
            [("game.credits", json!(990)), ("game.isSpinning", json!(true))],
            UpdateOptions::default(),
        )
        .unwrap();
    store
        .update("features.cascade.count", json!(2), UpdateOptions::default())
        .unwrap();
    store
        .update("ui.message", json!("Spinning"), UpdateOptions::default())
        .unwrap();

    let calls = Arc::new(Mutex::new(0));
    {
        let calls = Arc::clone(&calls);
        store
            .subscribe("game", move |_, _, _| {
                *calls.lock() += 1;
                Ok(())
            })
            .unwrap();
    }

    assert!(store.restore_checkpoint(&checkpoint).unwrap());
    assert_eq!(store.get::<i64>("game.credits"), Some(1000));
    assert_eq!(store.get::<bool>("game.isSpinning"), Some(false));
    assert_eq!(store.get::<i64>("features.cascade.count"), Some(0));
    // outside the checkpoint
    assert_eq!(store.select(Some("ui.message")), json!("Spinning"));
    assert_eq!(*calls.lock(), 1);
}
