//! End-to-end group keyspace scenarios over the in-memory engine:
//! clustering, projection, subtree deletion, and scan invalidation on a
//! three-level Customer→Order→Item group.

use std::sync::Arc;

use grove_codec::{Tuple, Value, ValueKind};
use grove_common::config::ScanConfig;
use grove_common::error::GroveError;
use grove_store::{
    ColumnDef, GroupDef, GroupLayout, KvEngine, MemoryEngine, PartialRow, RowBuffer, RowCollector,
    RowData, ScanStrategy, TableDef,
};

struct Fixture {
    layout: GroupLayout,
    customer: Arc<TableDef>,
    order: Arc<TableDef>,
    item: Arc<TableDef>,
}

fn fixture() -> Fixture {
    let customer = Arc::new(
        TableDef::new(
            "customer",
            1,
            vec![
                ColumnDef::not_null("cid", ValueKind::BigInt),
                ColumnDef::nullable("name", ValueKind::String),
            ],
        )
        .with_primary_key(vec![0]),
    );
    let order = Arc::new(
        TableDef::new(
            "order",
            2,
            vec![
                ColumnDef::not_null("cid", ValueKind::BigInt),
                ColumnDef::not_null("oid", ValueKind::BigInt),
                ColumnDef::nullable("note", ValueKind::String),
            ],
        )
        .with_primary_key(vec![0, 1])
        .with_parent(customer.clone(), vec![0]),
    );
    let item = Arc::new(
        TableDef::new(
            "item",
            3,
            vec![
                ColumnDef::not_null("cid", ValueKind::BigInt),
                ColumnDef::not_null("oid", ValueKind::BigInt),
                ColumnDef::not_null("iid", ValueKind::BigInt),
                ColumnDef::nullable("sku", ValueKind::String),
            ],
        )
        .with_primary_key(vec![0, 1, 2])
        .with_parent(order.clone(), vec![0, 1]),
    );
    let group =
        Arc::new(GroupDef::new(vec![customer.clone(), order.clone(), item.clone()]).unwrap());
    Fixture {
        layout: GroupLayout::new(group),
        customer,
        order,
        item,
    }
}

fn customer_row(fixture: &Fixture, cid: i64, name: &str) -> RowData {
    RowData::new(
        fixture.customer.clone(),
        Tuple::new(vec![Value::bigint(cid), Value::string(name)]),
    )
}

fn order_row(fixture: &Fixture, cid: i64, oid: i64, note: &str) -> RowData {
    RowData::new(
        fixture.order.clone(),
        Tuple::new(vec![
            Value::bigint(cid),
            Value::bigint(oid),
            Value::string(note),
        ]),
    )
}

fn item_row(fixture: &Fixture, cid: i64, oid: i64, iid: i64, sku: &str) -> RowData {
    RowData::new(
        fixture.item.clone(),
        Tuple::new(vec![
            Value::bigint(cid),
            Value::bigint(oid),
            Value::bigint(iid),
            Value::string(sku),
        ]),
    )
}

/// One customer with two orders of three items each, plus a second
/// customer subtree that every test expects to stay untouched.
fn seed(fixture: &Fixture, engine: &MemoryEngine) {
    let rows = [
        customer_row(fixture, 1, "Ada"),
        order_row(fixture, 1, 1, "first"),
        item_row(fixture, 1, 1, 1, "sku-a"),
        item_row(fixture, 1, 1, 2, "sku-b"),
        item_row(fixture, 1, 1, 3, "sku-c"),
        order_row(fixture, 1, 2, "second"),
        item_row(fixture, 1, 2, 4, "sku-d"),
        item_row(fixture, 1, 2, 5, "sku-e"),
        item_row(fixture, 1, 2, 6, "sku-f"),
        customer_row(fixture, 2, "Grace"),
        order_row(fixture, 2, 1, "other"),
        item_row(fixture, 2, 1, 7, "sku-z"),
    ];
    for row in rows {
        fixture.layout.store_row(engine, &row).unwrap();
    }
}

fn drain(collector: &mut RowCollector<'_>) -> Vec<RowData> {
    collector.open().unwrap();
    let mut buffer = RowBuffer::new(64);
    let mut rows = Vec::new();
    loop {
        let appended = collector.collect_next_row(&mut buffer).unwrap();
        if !appended {
            rows.extend(buffer.take_rows());
            if !collector.has_more() {
                break;
            }
        }
    }
    collector.close();
    rows
}

fn table_names(rows: &[RowData]) -> Vec<&str> {
    rows.iter().map(|row| row.table().name()).collect()
}

#[test]
fn clustered_branch_scan_returns_subtree_contiguously() {
    let fixture = fixture();
    let engine = MemoryEngine::new();
    seed(&fixture, &engine);

    let strategy = ScanStrategy::Branch {
        row: customer_row(&fixture, 1, "Ada"),
    };
    let mut collector = fixture
        .layout
        .scan(
            &engine,
            &strategy,
            fixture.layout.table_bitmap_all(),
            fixture.layout.column_bitmap_all(),
            ScanConfig::default(),
        )
        .unwrap();
    let rows = drain(&mut collector);

    // 1 customer + 2 orders + 6 items, every order's items contiguous
    // behind it
    assert_eq!(rows.len(), 9);
    assert_eq!(
        table_names(&rows),
        vec![
            "customer", "order", "item", "item", "item", "order", "item", "item", "item"
        ]
    );
    assert_eq!(rows[1].get(2), Some(&Value::string("first")));
    assert_eq!(rows[5].get(2), Some(&Value::string("second")));
    assert_eq!(rows[6].get(3), Some(&Value::string("sku-d")));
}

#[test]
fn full_group_scan_keeps_customer_subtrees_apart() {
    let fixture = fixture();
    let engine = MemoryEngine::new();
    seed(&fixture, &engine);

    let mut collector = fixture
        .layout
        .scan(
            &engine,
            &ScanStrategy::FullGroup,
            fixture.layout.table_bitmap_all(),
            fixture.layout.column_bitmap_all(),
            ScanConfig::default(),
        )
        .unwrap();
    let rows = drain(&mut collector);

    assert_eq!(rows.len(), 12);
    // customer 2's whole subtree follows customer 1's
    assert_eq!(rows[9].get(1), Some(&Value::string("Grace")));
    assert_eq!(
        table_names(&rows[9..]),
        vec!["customer", "order", "item"]
    );
}

#[test]
fn table_bitmap_skips_unwanted_tables_in_order() {
    let fixture = fixture();
    let engine = MemoryEngine::new();
    seed(&fixture, &engine);

    let strategy = ScanStrategy::Branch {
        row: customer_row(&fixture, 1, "Ada"),
    };
    let tables = fixture
        .layout
        .table_bitmap(&[fixture.item.as_ref()])
        .unwrap();
    let mut collector = fixture
        .layout
        .scan(
            &engine,
            &strategy,
            tables,
            fixture.layout.column_bitmap_all(),
            ScanConfig::default(),
        )
        .unwrap();
    let rows = drain(&mut collector);

    let skus: Vec<&Value> = rows.iter().map(|row| row.get(3).unwrap()).collect();
    assert_eq!(
        skus,
        vec![
            &Value::string("sku-a"),
            &Value::string("sku-b"),
            &Value::string("sku-c"),
            &Value::string("sku-d"),
            &Value::string("sku-e"),
            &Value::string("sku-f"),
        ]
    );
}

#[test]
fn column_projection_nulls_unselected_columns() {
    let fixture = fixture();
    let engine = MemoryEngine::new();
    seed(&fixture, &engine);

    // only customer.name and item.sku
    let columns = fixture
        .layout
        .column_bitmap_for(&[(fixture.customer.ordinal(), 1), (fixture.item.ordinal(), 3)])
        .unwrap();
    let tables = fixture.layout.projected_tables(&columns);
    let strategy = ScanStrategy::Branch {
        row: customer_row(&fixture, 1, "Ada"),
    };
    let mut collector = fixture
        .layout
        .scan(&engine, &strategy, tables, columns, ScanConfig::default())
        .unwrap();
    let rows = drain(&mut collector);

    // orders were not projected at all
    assert_eq!(rows.len(), 7);
    let customer = &rows[0];
    assert_eq!(customer.get(0), Some(&Value::Null));
    assert_eq!(customer.get(1), Some(&Value::string("Ada")));

    for item in &rows[1..] {
        assert_eq!(item.table().name(), "item");
        assert_eq!(item.get(0), Some(&Value::Null));
        assert_eq!(item.get(2), Some(&Value::Null));
        assert!(!item.get(3).unwrap().is_null());
        // shape preserved
        assert_eq!(item.num_columns(), 4);
    }
}

#[test]
fn partial_row_range_selects_one_customer() {
    let fixture = fixture();
    let engine = MemoryEngine::new();
    seed(&fixture, &engine);

    let bound = PartialRow::new(fixture.customer.clone()).with_value(0, Value::bigint(1));
    let strategy = ScanStrategy::TableRange {
        start: bound.clone(),
        end: bound,
    };
    let mut collector = fixture
        .layout
        .scan(
            &engine,
            &strategy,
            fixture.layout.table_bitmap_all(),
            fixture.layout.column_bitmap_all(),
            ScanConfig::default(),
        )
        .unwrap();
    let rows = drain(&mut collector);

    assert_eq!(rows.len(), 9);
    assert!(rows
        .iter()
        .all(|row| row.get(0) == Some(&Value::bigint(1))));
}

#[test]
fn scan_limit_caps_delivered_rows() {
    let fixture = fixture();
    let engine = MemoryEngine::new();
    seed(&fixture, &engine);

    let mut collector = fixture
        .layout
        .scan(
            &engine,
            &ScanStrategy::FullGroup,
            fixture.layout.table_bitmap_all(),
            fixture.layout.column_bitmap_all(),
            ScanConfig::default().with_row_limit(4),
        )
        .unwrap();
    let rows = drain(&mut collector);

    assert_eq!(rows.len(), 4);
}

#[test]
fn small_buffer_backpressure_loses_nothing() {
    let fixture = fixture();
    let engine = MemoryEngine::new();
    seed(&fixture, &engine);

    let strategy = ScanStrategy::Branch {
        row: customer_row(&fixture, 1, "Ada"),
    };
    let mut collector = fixture
        .layout
        .scan(
            &engine,
            &strategy,
            fixture.layout.table_bitmap_all(),
            fixture.layout.column_bitmap_all(),
            ScanConfig::default(),
        )
        .unwrap();

    collector.open().unwrap();
    let mut buffer = RowBuffer::new(2);
    let mut batches = 0;
    let mut total = 0;
    loop {
        let appended = collector.collect_next_row(&mut buffer).unwrap();
        if !appended {
            if !buffer.is_empty() {
                batches += 1;
                total += buffer.take_rows().len();
            }
            if !collector.has_more() {
                break;
            }
        }
    }
    collector.close();

    assert_eq!(total, 9);
    assert!(batches >= 5, "expected many flushes, got {batches}");
}

#[test]
fn empty_range_opens_exhausted() {
    let fixture = fixture();
    let engine = MemoryEngine::new();

    let strategy = ScanStrategy::Branch {
        row: customer_row(&fixture, 42, "nobody"),
    };
    let mut collector = fixture
        .layout
        .scan(
            &engine,
            &strategy,
            fixture.layout.table_bitmap_all(),
            fixture.layout.column_bitmap_all(),
            ScanConfig::default(),
        )
        .unwrap();
    collector.open().unwrap();

    assert!(!collector.has_more());
    let mut buffer = RowBuffer::new(4);
    assert!(!collector.collect_next_row(&mut buffer).unwrap());
    assert!(buffer.is_empty());
}

#[test]
fn point_fetch_and_delete() {
    let fixture = fixture();
    let engine = MemoryEngine::new();
    seed(&fixture, &engine);

    let fetched = fixture
        .layout
        .fetch_row(
            &engine,
            &fixture.item,
            &[Value::bigint(1), Value::bigint(2), Value::bigint(5)],
        )
        .unwrap()
        .expect("item exists");
    assert_eq!(fetched.get(3), Some(&Value::string("sku-e")));

    let missing = fixture
        .layout
        .fetch_row(
            &engine,
            &fixture.item,
            &[Value::bigint(1), Value::bigint(2), Value::bigint(99)],
        )
        .unwrap();
    assert!(missing.is_none());

    assert!(fixture
        .layout
        .delete_row(
            &engine,
            &fixture.item,
            &[Value::bigint(1), Value::bigint(1), Value::bigint(2)],
        )
        .unwrap());

    let strategy = ScanStrategy::Branch {
        row: customer_row(&fixture, 1, "Ada"),
    };
    let mut collector = fixture
        .layout
        .scan(
            &engine,
            &strategy,
            fixture.layout.table_bitmap_all(),
            fixture.layout.column_bitmap_all(),
            ScanConfig::default(),
        )
        .unwrap();
    assert_eq!(drain(&mut collector).len(), 8);
}

#[test]
fn drop_subtree_requires_children_and_removes_exactly_the_tables() {
    let fixture = fixture();
    let engine = MemoryEngine::new();
    seed(&fixture, &engine);

    // dropping order without item must fail and leave everything intact
    let err = fixture
        .layout
        .drop_subtree(&engine, &[fixture.order.ordinal()])
        .unwrap_err();
    assert!(matches!(err, GroveError::DependentTable { .. }));
    assert_eq!(engine.len(), 12);

    // dropping order with item removes all orders and items, only
    // customer rows remain
    let removed = fixture
        .layout
        .drop_subtree(&engine, &[fixture.order.ordinal(), fixture.item.ordinal()])
        .unwrap();
    assert_eq!(removed, 10);

    let mut collector = fixture
        .layout
        .scan(
            &engine,
            &ScanStrategy::FullGroup,
            fixture.layout.table_bitmap_all(),
            fixture.layout.column_bitmap_all(),
            ScanConfig::default(),
        )
        .unwrap();
    let rows = drain(&mut collector);
    assert_eq!(table_names(&rows), vec!["customer", "customer"]);
}

#[test]
fn drop_of_root_deletes_whole_group_range() {
    let fixture = fixture();
    let engine = MemoryEngine::new();
    seed(&fixture, &engine);

    let removed = fixture
        .layout
        .drop_subtree(
            &engine,
            &[
                fixture.customer.ordinal(),
                fixture.order.ordinal(),
                fixture.item.ordinal(),
            ],
        )
        .unwrap();
    assert_eq!(removed, 12);
    assert!(engine.is_empty());
}

#[test]
fn concurrent_key_change_invalidates_open_scan() {
    let fixture = fixture();
    let engine = MemoryEngine::new();
    seed(&fixture, &engine);

    let strategy = ScanStrategy::Branch {
        row: customer_row(&fixture, 1, "Ada"),
    };
    let mut collector = fixture
        .layout
        .scan(
            &engine,
            &strategy,
            fixture.layout.table_bitmap_all(),
            fixture.layout.column_bitmap_all(),
            ScanConfig::default(),
        )
        .unwrap();
    collector.open().unwrap();

    let mut buffer = RowBuffer::new(16);
    assert!(collector.collect_next_row(&mut buffer).unwrap());

    // a new row changes the key structure under the open scan
    fixture
        .layout
        .store_row(&engine, &item_row(&fixture, 1, 1, 8, "sku-late"))
        .unwrap();

    let err = collector.collect_next_row(&mut buffer).unwrap_err();
    assert!(matches!(err, GroveError::ConcurrentModification { .. }));
    assert!(!collector.has_more());

    // close is still safe after the error
    collector.close();
}

#[test]
fn value_overwrite_does_not_invalidate_scan() {
    let fixture = fixture();
    let engine = MemoryEngine::new();
    seed(&fixture, &engine);

    let strategy = ScanStrategy::Branch {
        row: customer_row(&fixture, 1, "Ada"),
    };
    let mut collector = fixture
        .layout
        .scan(
            &engine,
            &strategy,
            fixture.layout.table_bitmap_all(),
            fixture.layout.column_bitmap_all(),
            ScanConfig::default(),
        )
        .unwrap();
    collector.open().unwrap();

    let mut buffer = RowBuffer::new(16);
    assert!(collector.collect_next_row(&mut buffer).unwrap());

    // same key, new payload: no key-structure change, scan continues
    fixture
        .layout
        .store_row(&engine, &item_row(&fixture, 1, 1, 2, "sku-b2"))
        .unwrap();

    let mut remaining = 1;
    while collector.collect_next_row(&mut buffer).unwrap() {
        remaining += 1;
    }
    assert_eq!(remaining, 9);
}
