//! Read pipeline tests: producer/consumer wiring, ordering, errors and
//! cancellation.

mod test_data_gen;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use colwire_core::config::Settings;
use colwire_core::types::Scalar;
use colwire_exec::streamer::Filled;
use colwire_exec::{
    value_stream_read, CancelToken, ChunkSource, ExecError, SequenceGate, StageState, Streamer,
};
use colwire_io::Format;
use colwire_mem::{Pool, PoolRegistry, TextBatch};

use test_data_gen::{cfg, column_values, csv_rows, read_blocks, sample};

#[test]
fn test_one_block_per_batch() {
    let input = "1,a\n2,b\n3,c\n";

    let (blocks, total) = read_blocks(
        Format::Csv,
        input,
        "id UInt64, name String",
        &Settings::new(),
        &cfg(3, 1),
    );
    assert_eq!(total.unwrap(), 3);
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].num_rows(), 3);

    let (blocks, total) = read_blocks(
        Format::Csv,
        input,
        "id UInt64, name String",
        &Settings::new(),
        &cfg(1, 1),
    );
    assert_eq!(total.unwrap(), 3);
    assert_eq!(blocks.len(), 3);
    assert!(blocks.iter().all(|b| b.num_rows() == 1));
    assert_eq!(
        column_values(&blocks, 1),
        vec![Scalar::from("a"), Scalar::from("b"), Scalar::from("c")]
    );
}

#[test]
fn test_typed_text_conversion() {
    let input = "1, 2024-03-01 ,\\N,[1,2],true\n";
    let (blocks, total) = read_blocks(
        Format::Csv,
        input,
        "id Int32, day Date, note Nullable(String), xs Array(UInt8), ok Bool",
        &Settings::new(),
        &cfg(8, 1),
    );
    assert_eq!(total.unwrap(), 1);
    let row = blocks[0].row(0);
    assert_eq!(row[0], Scalar::Int(1));
    assert_eq!(row[1].to_string(), "2024-03-01");
    assert_eq!(row[2], Scalar::Null);
    assert_eq!(row[3], Scalar::Array(vec![Scalar::UInt(1), Scalar::UInt(2)]));
    assert_eq!(row[4], Scalar::Bool(true));
}

#[test]
fn test_empty_cells_take_type_defaults() {
    let (blocks, total) = read_blocks(
        Format::Json,
        r#"[{"id": 5}]"#,
        "id UInt64, n Int16, s String",
        &Settings::new(),
        &cfg(8, 1),
    );
    assert_eq!(total.unwrap(), 1);
    assert_eq!(
        blocks[0].row(0),
        vec![Scalar::UInt(5), Scalar::Int(0), Scalar::from("")]
    );
}

#[test]
fn test_parallel_conversion_preserves_order() {
    let input = csv_rows(1000);
    let (blocks, total) = read_blocks(
        Format::Csv,
        &input,
        "id UInt64, name String",
        &Settings::new(),
        &cfg(7, 4),
    );
    assert_eq!(total.unwrap(), 1000);
    assert_eq!(blocks.len(), 143);
    let ids = column_values(&blocks, 0);
    let expected: Vec<Scalar> = (0..1000u64).map(Scalar::UInt).collect();
    assert_eq!(ids, expected);
}

#[test]
fn test_empty_input_yields_no_blocks() {
    let (blocks, total) = read_blocks(
        Format::Csv,
        "",
        "id UInt64",
        &Settings::new(),
        &cfg(4, 2),
    );
    assert_eq!(total.unwrap(), 0);
    assert!(blocks.is_empty());
}

#[test]
fn test_conversion_error_reports_absolute_row() {
    let input = "0,a\n1,b\nx,c\n3,d\n";
    let (blocks, total) = read_blocks(
        Format::Csv,
        input,
        "id UInt64, name String",
        &Settings::new(),
        &cfg(2, 2),
    );
    // The block before the failing batch is still delivered.
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].num_rows(), 2);
    match total.unwrap_err() {
        ExecError::Convert {
            row,
            column,
            name,
            text,
            ..
        } => {
            assert_eq!(row, 2);
            assert_eq!(column, 0);
            assert_eq!(name, "id");
            assert_eq!(text, "x");
        }
        other => panic!("expected Convert, got {other:?}"),
    }
}

#[test]
fn test_first_error_in_stream_order_wins() {
    // Rows 3 and 9 are both bad; with many workers the later batch may fail
    // first, but the reported error must be the earliest.
    let mut input = csv_rows(12);
    input = input.replace("3,name_3", "bad,name_3");
    input = input.replace("9,name_9", "bad,name_9");
    let (blocks, total) = read_blocks(
        Format::Csv,
        &input,
        "id UInt64, name String",
        &Settings::new(),
        &cfg(2, 6),
    );
    assert_eq!(blocks.len(), 1);
    assert!(matches!(total.unwrap_err(), ExecError::Convert { row: 3, .. }));
}

#[test]
fn test_parse_error_keeps_earlier_blocks() {
    let (blocks, total) = read_blocks(
        Format::Csv,
        "0,a\n1,b\n2\n",
        "id UInt64, name String",
        &Settings::new(),
        &cfg(2, 1),
    );
    assert_eq!(blocks.len(), 1);
    match total.unwrap_err() {
        ExecError::Read { row, source } => {
            assert_eq!(row, 2);
            assert_eq!(source.column(), Some(0));
        }
        other => panic!("expected Read, got {other:?}"),
    }
}

#[test]
fn test_producer_state_after_drain() {
    let pools = Arc::new(PoolRegistry::new());
    let reader = Format::Csv
        .reader(std::io::Cursor::new(b"1\n2\n".to_vec()), &Settings::new())
        .unwrap();
    let (rx, handle) = colwire_exec::block_stream_read(
        reader,
        &sample("id UInt64"),
        &cfg(1, 1),
        pools,
        &CancelToken::new(),
    )
    .unwrap();
    let blocks: Vec<_> = rx.iter().collect();
    assert_eq!(blocks.len(), 2);
    assert_eq!(handle.producer_state(), StageState::Completed);
    assert_eq!(handle.wait().unwrap(), 2);

    let reader = Format::Csv
        .reader(std::io::Cursor::new(b"1\n\"x\n".to_vec()), &Settings::new())
        .unwrap();
    let (rx, handle) = colwire_exec::block_stream_read(
        reader,
        &sample("id UInt64"),
        &cfg(1, 1),
        Arc::new(PoolRegistry::new()),
        &CancelToken::new(),
    )
    .unwrap();
    let _: Vec<_> = rx.iter().collect();
    assert_eq!(handle.producer_state(), StageState::Failed);
    assert!(handle.wait().is_err());
}

fn endless_rows() -> impl Iterator<Item = Vec<Scalar>> + Send + 'static {
    (0u64..).map(|i| vec![Scalar::UInt(i)])
}

#[test]
fn test_cancel_stops_both_stages() {
    let (rx, handle) = value_stream_read(
        endless_rows(),
        &sample("id UInt64"),
        &cfg(10, 2),
        Arc::new(PoolRegistry::new()),
        &CancelToken::new(),
    )
    .unwrap();
    let first = rx.recv().unwrap();
    assert_eq!(first.num_rows(), 10);

    handle.cancel("stop");
    let _rest: Vec<_> = rx.iter().collect();
    match handle.wait().unwrap_err() {
        ExecError::Canceled(reason) => assert_eq!(reason, "stop"),
        other => panic!("expected Canceled, got {other:?}"),
    }
}

#[test]
fn test_deadline_cancels_stalled_pipeline() {
    let root = CancelToken::new();
    let token = root.with_timeout(Duration::from_millis(50));
    let (rx, handle) = value_stream_read(
        endless_rows(),
        &sample("id UInt64"),
        &cfg(10, 1),
        Arc::new(PoolRegistry::new()),
        &token,
    )
    .unwrap();

    // Nobody drains the receiver, so the pipeline stalls until the deadline.
    let err = handle.wait().unwrap_err();
    drop(rx);
    assert!(err.is_canceled());
    assert!(err.to_string().contains("deadline exceeded"));
    assert!(token.is_canceled());
    assert!(!root.is_canceled());
}

#[test]
fn test_parent_cancel_reaches_pipeline() {
    let root = CancelToken::new();
    root.cancel("shutdown");
    let (rx, handle) = value_stream_read(
        endless_rows(),
        &sample("id UInt64"),
        &cfg(10, 1),
        Arc::new(PoolRegistry::new()),
        &root,
    )
    .unwrap();
    let _: Vec<_> = rx.iter().collect();
    let err = handle.wait().unwrap_err();
    assert!(err.is_canceled());
}

#[test]
fn test_typed_values_are_coerced() {
    let rows = vec![
        vec![
            Scalar::UInt(1),
            Scalar::from("a"),
            Scalar::Array(vec![Scalar::UInt(1), Scalar::UInt(2)]),
        ],
        vec![Scalar::Int(2), Scalar::Null, Scalar::Array(vec![])],
    ];
    let (rx, handle) = value_stream_read(
        rows,
        &sample("id UInt8, name Nullable(String), tags Array(UInt16)"),
        &cfg(16, 1),
        Arc::new(PoolRegistry::new()),
        &CancelToken::new(),
    )
    .unwrap();
    let blocks: Vec<_> = rx.iter().collect();
    assert_eq!(handle.wait().unwrap(), 2);
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].value(1, 0), Scalar::UInt(2));
    assert_eq!(blocks[0].value(0, 1), Scalar::from("a"));
    assert_eq!(blocks[0].value(1, 1), Scalar::Null);
}

#[test]
fn test_typed_value_out_of_range() {
    let rows: Vec<Vec<Scalar>> = [1i64, 2, 3, 300, 5]
        .into_iter()
        .map(|v| vec![Scalar::Int(v)])
        .collect();
    let (rx, handle) = value_stream_read(
        rows,
        &sample("v UInt8"),
        &cfg(2, 1),
        Arc::new(PoolRegistry::new()),
        &CancelToken::new(),
    )
    .unwrap();
    let blocks: Vec<_> = rx.iter().collect();
    assert_eq!(blocks.len(), 1);
    match handle.wait().unwrap_err() {
        ExecError::Value { row, column, name, .. } => {
            assert_eq!(row, 3);
            assert_eq!(column, 0);
            assert_eq!(name, "v");
        }
        other => panic!("expected Value, got {other:?}"),
    }
}

#[test]
fn test_typed_row_width_mismatch() {
    let rows = vec![vec![Scalar::UInt(1)], vec![Scalar::UInt(2), Scalar::UInt(3)]];
    let (rx, handle) = value_stream_read(
        rows,
        &sample("v UInt8"),
        &cfg(8, 1),
        Arc::new(PoolRegistry::new()),
        &CancelToken::new(),
    )
    .unwrap();
    let blocks: Vec<_> = rx.iter().collect();
    // The valid row before the bad one is still delivered.
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].num_rows(), 1);
    assert!(matches!(
        handle.wait().unwrap_err(),
        ExecError::SchemaMismatch(_)
    ));
}

#[test]
fn test_zero_sized_config_is_rejected() {
    let err = value_stream_read(
        Vec::<Vec<Scalar>>::new(),
        &sample("v UInt8"),
        &cfg(0, 1),
        Arc::new(PoolRegistry::new()),
        &CancelToken::new(),
    )
    .err()
    .unwrap();
    assert!(matches!(err, ExecError::Core(_)));
}

#[test]
fn test_text_batches_are_recycled() {
    let pools = Arc::new(PoolRegistry::new());
    let reader = Format::Csv
        .reader(
            std::io::Cursor::new(csv_rows(10).into_bytes()),
            &Settings::new(),
        )
        .unwrap();
    let (rx, handle) = colwire_exec::block_stream_read(
        reader,
        &sample("id UInt64, name String"),
        &cfg(2, 1),
        Arc::clone(&pools),
        &CancelToken::new(),
    )
    .unwrap();
    let blocks: Vec<_> = rx.iter().collect();
    assert_eq!(handle.wait().unwrap(), 10);
    assert_eq!(blocks.len(), 5);
    assert!(pools.text_batches.stats().hits >= 1);
}

#[test]
fn test_pool_reuse_has_no_residual_data() {
    let pool: Pool<TextBatch> = Pool::new(2);
    let mut batch = pool.get(2, 3);
    batch.push_row(&["a", "b"]);
    batch.push_row(&["c", "d"]);
    pool.put(batch);

    let batch = pool.get(2, 2);
    assert_eq!(batch.num_rows(), 0);
    assert!(batch.column(0).is_empty());
    let stats = pool.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
}

#[test]
fn test_pool_hands_larger_container_to_smaller_request() {
    let pool: Pool<TextBatch> = Pool::new(2);
    let mut batch = pool.get(2, 3);
    batch.push_row(&["a", "b"]);
    batch.push_row(&["c", "d"]);
    batch.push_row(&["e", "f"]);
    pool.put(batch);

    let mut batch = pool.get(2, 1);
    assert_eq!(batch.num_rows(), 0);
    batch.push_row(&["x", "y"]);
    assert_eq!(batch.column(0), ["x"]);
    assert_eq!(batch.column(1), ["y"]);
    let stats = pool.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);

    // Wrong width never matches.
    pool.put(batch);
    let _ = pool.get(3, 1);
    assert_eq!(pool.stats().misses, 2);
}

#[test]
fn test_pool_drops_when_full() {
    let pool: Pool<TextBatch> = Pool::new(1);
    pool.put(TextBatch::new(1, 0));
    pool.put(TextBatch::new(1, 0));
    assert_eq!(pool.stats().dropped, 1);
    let _ = pool.get(1, 0);
    assert_eq!(pool.stats().hits, 1);
}

#[test]
fn test_sequence_gate_orders_waiters() {
    let gate = Arc::new(SequenceGate::new());
    assert!(gate.wait_turn(0));

    let waiter = {
        let gate = Arc::clone(&gate);
        thread::spawn(move || gate.wait_turn(1))
    };
    thread::sleep(Duration::from_millis(10));
    gate.advance();
    assert!(waiter.join().unwrap());
    assert_eq!(gate.next(), 1);

    let blocked = {
        let gate = Arc::clone(&gate);
        thread::spawn(move || gate.wait_turn(5))
    };
    gate.abort();
    assert!(!blocked.join().unwrap());
}

/// Counts up to `limit`, `max_rows` numbers per chunk.
struct Counter {
    next: u64,
    limit: u64,
    recycled: Arc<AtomicUsize>,
}

fn counter(limit: u64) -> (Counter, Arc<AtomicUsize>) {
    let recycled = Arc::new(AtomicUsize::new(0));
    let source = Counter {
        next: 0,
        limit,
        recycled: Arc::clone(&recycled),
    };
    (source, recycled)
}

impl ChunkSource for Counter {
    type Payload = Vec<u64>;

    fn fill(&mut self, _first: bool, max_rows: usize, _rows_before: u64) -> Filled<Vec<u64>> {
        let end = (self.next + max_rows as u64).min(self.limit);
        let payload: Vec<u64> = (self.next..end).collect();
        self.next = end;
        Filled {
            rows: payload.len(),
            payload,
            end: Ok(end == self.limit),
        }
    }

    fn recycle(&self, _payload: Vec<u64>) {
        self.recycled.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_streamer_numbers_chunks() {
    let (source, _) = counter(10);
    let streamer = Streamer::new(source, 4, 1);
    assert_eq!(streamer.state(), StageState::Idle);
    let (handle, rx) = streamer.start(CancelToken::new()).unwrap();
    let chunks: Vec<_> = rx.iter().collect();
    assert_eq!(handle.wait().unwrap(), 10);

    let seqs: Vec<u64> = chunks.iter().map(|c| c.seq).collect();
    let firsts: Vec<u64> = chunks.iter().map(|c| c.first_row).collect();
    let sizes: Vec<usize> = chunks.iter().map(|c| c.rows).collect();
    assert_eq!(seqs, vec![0, 1, 2]);
    assert_eq!(firsts, vec![0, 4, 8]);
    assert_eq!(sizes, vec![4, 4, 2]);
    assert_eq!(chunks[2].payload, vec![8, 9]);
}

#[test]
fn test_canceled_streamer_records_reason() {
    let token = CancelToken::new();
    let (source, recycled) = counter(u64::MAX);
    let streamer = Streamer::new(source, 1, 1);
    let (handle, rx) = streamer.start(token.clone()).unwrap();
    rx.recv().unwrap();
    // Let the producer fill the channel and block on the next send.
    while !rx.is_full() {
        thread::sleep(Duration::from_millis(1));
    }
    thread::sleep(Duration::from_millis(20));
    token.cancel("enough");

    let deadline = Instant::now() + Duration::from_secs(5);
    while handle.cancel_reason().is_none() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(handle.cancel_reason().as_deref(), Some("enough"));
    assert_eq!(handle.state(), StageState::Canceled);

    let err = handle.wait().unwrap_err();
    drop(rx);
    assert!(matches!(err, ExecError::Canceled(ref r) if r == "enough"));
    // The chunk that was waiting to be sent went back to its source.
    assert_eq!(recycled.load(Ordering::SeqCst), 1);
}

#[test]
fn test_dropped_child_tokens_leave_no_listeners() {
    let parent = CancelToken::new();
    for _ in 0..1000 {
        let _child = parent.child();
    }
    assert_eq!(parent.listeners(), 0);

    let child = parent.child();
    let grandchild = child.child();
    assert_eq!(parent.listeners(), 1);
    parent.cancel("stop");
    assert!(grandchild.is_canceled());
    assert_eq!(grandchild.reason().as_deref(), Some("stop"));
}

#[test]
fn test_dropped_deadline_token_releases_parent() {
    let parent = CancelToken::new();
    let token = parent.with_timeout(Duration::from_secs(60));
    assert_eq!(parent.listeners(), 1);
    drop(token);
    assert_eq!(parent.listeners(), 0);
    assert!(!parent.is_canceled());
}

#[test]
fn test_finished_pipelines_leave_no_listeners() {
    let token = CancelToken::new();
    for _ in 0..20 {
        let rows = (0..5u64).map(|i| vec![Scalar::UInt(i)]);
        let (rx, handle) = value_stream_read(
            rows,
            &sample("id UInt64"),
            &cfg(2, 2),
            Arc::new(PoolRegistry::new()),
            &token,
        )
        .unwrap();
        let blocks: Vec<_> = rx.iter().collect();
        assert_eq!(blocks.len(), 3);
        assert_eq!(handle.wait().unwrap(), 5);
    }
    assert_eq!(token.listeners(), 0);
}
