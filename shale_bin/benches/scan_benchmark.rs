use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;

use shale_bin::executor::{OpIterator, SeqScan};
use shale_bin::predicate::{Predicate, PredicateOp};
use strata::{
    BufferPool, Catalog, Field, FieldType, HeapFile, LockManager, TransactionId, Tuple, TupleDesc,
};
use tempfile::TempDir;

fn setup_test_db() -> (TempDir, Arc<Catalog>, Arc<BufferPool>, u32) {
    let dir = TempDir::new().unwrap();
    let catalog = Arc::new(Catalog::new());
    let lock_manager = Arc::new(LockManager::new());
    let pool = Arc::new(BufferPool::new(50, Arc::clone(&catalog), lock_manager));

    let desc = TupleDesc::new(vec![
        (FieldType::Int, Some("id".to_string())),
        (FieldType::Str, Some("name".to_string())),
    ]);
    let file = Arc::new(HeapFile::open(dir.path().join("bench.dat"), desc.clone()).unwrap());
    let table_id = file.id();
    catalog.add_table(file, "bench", "id");

    let tid = TransactionId::new();
    for i in 0..1000 {
        let mut tuple = Tuple::new(
            desc.clone(),
            vec![Field::Int(i), Field::Str(format!("name{}", i))],
        );
        pool.insert_tuple(tid, table_id, &mut tuple).unwrap();
    }
    pool.transaction_complete(tid, true).unwrap();

    (dir, catalog, pool, table_id)
}

fn benchmark_seq_scan(c: &mut Criterion) {
    let (_dir, catalog, pool, table_id) = setup_test_db();

    c.bench_function("seq_scan_1000_rows", |b| {
        b.iter(|| {
            let tid = TransactionId::new();
            let mut scan = SeqScan::new(&catalog, &pool, tid, table_id, "b").unwrap();
            scan.open().unwrap();
            let mut rows = 0;
            while let Some(tuple) = scan.next().unwrap() {
                black_box(&tuple);
                rows += 1;
            }
            scan.close();
            pool.transaction_complete(tid, true).unwrap();
            assert_eq!(rows, 1000);
        })
    });
}

fn benchmark_filtered_scan(c: &mut Criterion) {
    let (_dir, catalog, pool, table_id) = setup_test_db();

    c.bench_function("filtered_scan_1000_rows", |b| {
        b.iter(|| {
            let tid = TransactionId::new();
            let scan = SeqScan::new(&catalog, &pool, tid, table_id, "b").unwrap();
            let predicate = Predicate::new(0, PredicateOp::GreaterThanOrEq, Field::Int(900));
            let mut filter = shale_bin::executor::Filter::new(predicate, Box::new(scan));
            filter.open().unwrap();
            let mut rows = 0;
            while let Some(tuple) = filter.next().unwrap() {
                black_box(&tuple);
                rows += 1;
            }
            filter.close();
            pool.transaction_complete(tid, true).unwrap();
            assert_eq!(rows, 100);
        })
    });
}

criterion_group!(benches, benchmark_seq_scan, benchmark_filtered_scan);
criterion_main!(benches);
