//! Transaction semantics across the buffer pool and lock manager: commit
//! isolation, abort rollback, durability, and strict two-phase release.

mod common;

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use common::{fields_of, int_string_desc, row, setup};
use strata::{PageId, Permission, TransactionId};

#[test]
fn reader_blocks_on_writer_and_sees_the_commit() {
    let db = setup(50);
    let table = db.create_table("t", int_string_desc());

    // T1 writes page 0 and holds the exclusive lock.
    let writer = TransactionId::new();
    let mut tuple = row(1, "committed");
    db.pool.insert_tuple(writer, table, &mut tuple).unwrap();
    let pid = tuple.record_id().unwrap().page_id;

    // T2 tries to read the page and must park until T1 commits.
    let (sender, receiver) = mpsc::channel();
    let pool = std::sync::Arc::clone(&db.pool);
    let handle = thread::spawn(move || {
        let reader = TransactionId::new();
        let page = pool.get_page(reader, pid, Permission::ReadOnly).unwrap();
        let rows = page.read().unwrap().iter().count();
        sender.send(rows).unwrap();
        pool.transaction_complete(reader, true).unwrap();
    });

    assert!(
        receiver.recv_timeout(Duration::from_millis(200)).is_err(),
        "reader must block while the writer holds the page"
    );

    db.pool.transaction_complete(writer, true).unwrap();
    let rows = receiver.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(rows, 1, "the reader observes the committed write");
    handle.join().unwrap();
}

#[test]
fn abort_restores_the_on_disk_image() {
    let db = setup(50);
    let table = db.create_table("t", int_string_desc());

    let seeder = TransactionId::new();
    for (a, b) in [(1, "a"), (2, "b"), (3, "c")] {
        let mut tuple = row(a, b);
        db.pool.insert_tuple(seeder, table, &mut tuple).unwrap();
    }
    db.pool.transaction_complete(seeder, true).unwrap();

    let data_path = db.dir.path().join("t.dat");
    let before = std::fs::read(&data_path).unwrap();

    // T1 writes the page, then aborts.
    let aborter = TransactionId::new();
    let mut doomed = row(99, "doomed");
    db.pool.insert_tuple(aborter, table, &mut doomed).unwrap();
    db.pool.transaction_complete(aborter, false).unwrap();

    let after = std::fs::read(&data_path).unwrap();
    assert_eq!(before, after, "an aborted transaction leaves no trace on disk");

    // A later reader sees only the committed rows.
    let reader = TransactionId::new();
    let file = db.catalog.file(table).unwrap();
    let mut iter = file.iter(&db.pool, reader);
    iter.open().unwrap();
    let mut values = Vec::new();
    while let Some(tuple) = iter.next().unwrap() {
        values.push(fields_of(&tuple).0);
    }
    iter.close();
    db.pool.transaction_complete(reader, true).unwrap();
    assert_eq!(values, vec![1, 2, 3]);
}

#[test]
fn committed_pages_are_durable_on_disk() {
    let db = setup(50);
    let table = db.create_table("t", int_string_desc());

    let writer = TransactionId::new();
    let mut tuple = row(7, "durable");
    db.pool.insert_tuple(writer, table, &mut tuple).unwrap();
    let pid = tuple.record_id().unwrap().page_id;
    db.pool.transaction_complete(writer, true).unwrap();

    // Drop the cached copy; the data must come back from disk.
    db.pool.discard_page(pid);
    let page = db.catalog.file(table).unwrap().read_page(pid).unwrap();
    let rows: Vec<_> = page.iter().map(fields_of).collect();
    assert_eq!(rows, vec![(7, "durable".to_string())]);
}

#[test]
fn completion_releases_every_lock() {
    let db = setup(50);
    let table = db.create_table("t", int_string_desc());

    let tid = TransactionId::new();
    let mut tuple = row(1, "x");
    db.pool.insert_tuple(tid, table, &mut tuple).unwrap();
    let pid = tuple.record_id().unwrap().page_id;
    db.pool
        .get_page(tid, PageId::new(table, 0), Permission::ReadOnly)
        .unwrap();
    assert!(db.pool.holds_lock(tid, pid));

    db.pool.transaction_complete(tid, true).unwrap();
    assert!(!db.pool.holds_lock(tid, pid));
    assert!(
        db.pool.lock_manager().pages_held(tid).is_none(),
        "no lock record may reference a completed transaction"
    );

    // The page is free for the next writer.
    let next = TransactionId::new();
    db.pool.get_page(next, pid, Permission::ReadWrite).unwrap();
    db.pool.transaction_complete(next, true).unwrap();
}
