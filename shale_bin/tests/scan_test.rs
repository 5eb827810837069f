//! Insert-and-scan scenarios: record id assignment is deterministic and
//! deleted slots are the first to be refilled.

mod common;

use common::{fields_of, int_string_desc, row, setup};
use shale_bin::executor::{OpIterator, SeqScan};
use strata::TransactionId;

#[test]
fn insert_then_scan_yields_rows_in_insertion_order() {
    let db = setup(50);
    let table = db.create_table("t", int_string_desc());

    let writer = TransactionId::new();
    for (a, b) in [(1, "a"), (2, "b"), (3, "c")] {
        let mut tuple = row(a, b);
        db.pool.insert_tuple(writer, table, &mut tuple).unwrap();
    }
    db.pool.transaction_complete(writer, true).unwrap();

    let reader = TransactionId::new();
    let mut scan = SeqScan::new(&db.catalog, &db.pool, reader, table, "t").unwrap();
    scan.open().unwrap();
    let mut seen = Vec::new();
    while let Some(tuple) = scan.next().unwrap() {
        let rid = tuple.record_id().unwrap();
        let (a, b) = fields_of(&tuple);
        seen.push((a, b, rid.page_id.page_no, rid.slot));
    }
    scan.close();
    db.pool.transaction_complete(reader, true).unwrap();

    assert_eq!(
        seen,
        vec![
            (1, "a".to_string(), 0, 0),
            (2, "b".to_string(), 0, 1),
            (3, "c".to_string(), 0, 2),
        ]
    );
}

#[test]
fn delete_reopens_the_slot_for_the_next_insert() {
    let db = setup(50);
    let table = db.create_table("t", int_string_desc());

    let writer = TransactionId::new();
    for (a, b) in [(1, "a"), (2, "b"), (3, "c")] {
        let mut tuple = row(a, b);
        db.pool.insert_tuple(writer, table, &mut tuple).unwrap();
    }
    db.pool.transaction_complete(writer, true).unwrap();

    // Delete the tuple in slot 1.
    let deleter = TransactionId::new();
    let mut scan = SeqScan::new(&db.catalog, &db.pool, deleter, table, "t").unwrap();
    scan.open().unwrap();
    let mut victim = None;
    while let Some(tuple) = scan.next().unwrap() {
        if tuple.record_id().unwrap().slot == 1 {
            victim = Some(tuple);
        }
    }
    scan.close();
    db.pool.delete_tuple(deleter, &victim.expect("slot 1 tuple")).unwrap();
    db.pool.transaction_complete(deleter, true).unwrap();

    // The next insert reuses the freed slot.
    let writer = TransactionId::new();
    let mut fresh = row(4, "d");
    db.pool.insert_tuple(writer, table, &mut fresh).unwrap();
    db.pool.transaction_complete(writer, true).unwrap();

    let rid = fresh.record_id().unwrap();
    assert_eq!(rid.page_id.page_no, 0);
    assert_eq!(rid.slot, 1);

    // Survivors kept their slots.
    let reader = TransactionId::new();
    let mut scan = SeqScan::new(&db.catalog, &db.pool, reader, table, "t").unwrap();
    scan.open().unwrap();
    let mut seen = Vec::new();
    while let Some(tuple) = scan.next().unwrap() {
        let (a, _) = fields_of(&tuple);
        seen.push((tuple.record_id().unwrap().slot, a));
    }
    scan.close();
    db.pool.transaction_complete(reader, true).unwrap();
    assert_eq!(seen, vec![(0, 1), (1, 4), (2, 3)]);
}

#[test]
fn scan_descriptor_is_alias_prefixed() {
    let db = setup(50);
    let table = db.create_table("people", int_string_desc());
    let tid = TransactionId::new();
    let scan = SeqScan::new(&db.catalog, &db.pool, tid, table, "p").unwrap();
    let desc = scan.tuple_desc();
    assert_eq!(desc.field_name(0), Some("p.a"));
    assert_eq!(desc.field_name(1), Some("p.b"));
    assert_eq!(scan.table_name().unwrap(), "people");
    assert_eq!(scan.alias(), "p");
}
