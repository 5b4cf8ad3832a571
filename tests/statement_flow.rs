//! End-to-end statement flows against a scripted in-memory backend.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{int_rows, DataSet, Script, ScriptedBackend};
use stmtkit::{
    ConfigAction, Extraction, RowLimit, Session, Statement, StatementError, StorageKind, Value,
};
use tokio::sync::Mutex;

type Shared = Arc<Mutex<ScriptedBackend>>;

fn session_over(backend: ScriptedBackend) -> (Shared, Session) {
    let backend = Arc::new(Mutex::new(backend));
    let session = Session::from_shared(backend.clone());
    (backend, session)
}

#[tokio::test]
async fn test_paged_retrieval_until_done() {
    let (_, session) =
        session_over(ScriptedBackend::new().script_rows(&["n"], int_rows(&[1, 2, 3, 4, 5])));

    let values = Extraction::new(0);
    let mut stmt = session.statement_with("SELECT n FROM t");
    stmt.set_limit(RowLimit::Rows(2));
    stmt.add_extract(values.clone()).unwrap();

    let mut steps = 0;
    let mut total = 0;
    while !stmt.done() {
        total += stmt.execute(true).await.unwrap();
        steps += 1;
    }

    assert_eq!(steps, 3);
    assert_eq!(total, 5);
    assert_eq!(stmt.sub_total_row_count(None), 5);
    assert_eq!(stmt.rows_extracted(None), 1);
    // reset = true recycles per step: only the final window remains.
    assert_eq!(values.rows(), vec![Value::Int(5)]);
}

#[tokio::test]
async fn test_append_mode_accumulates_rows() {
    let (_, session) =
        session_over(ScriptedBackend::new().script_rows(&["n"], int_rows(&[1, 2, 3])));

    let values = Extraction::new(0);
    let mut stmt = session.statement_with("SELECT n FROM t");
    stmt.set_limit(RowLimit::Rows(1));
    stmt.add_extract(values.clone()).unwrap();

    while !stmt.done() {
        stmt.execute(false).await.unwrap();
    }
    assert_eq!(
        values.rows(),
        vec![Value::Int(1), Value::Int(2), Value::Int(3)]
    );
}

#[tokio::test]
async fn test_multiple_data_sets() {
    let (_, session) = session_over(ScriptedBackend::new().script(Script::ResultSets(vec![
        DataSet::new(&["id"], int_rows(&[1, 2])),
        DataSet::new(&["total"], int_rows(&[10])),
    ])));

    let ids = Extraction::new(0);
    let totals = Extraction::new(0);
    let mut stmt = session.statement_with("SELECT id FROM a; SELECT total FROM b");
    stmt.set_extraction_table(vec![vec![ids.clone()], vec![totals.clone()]])
        .unwrap();

    assert_eq!(stmt.execute(true).await.unwrap(), 2);
    assert!(stmt.done());
    assert_eq!(stmt.data_set_count(), 2);
    assert!(stmt.has_more_data_sets());
    assert_eq!(ids.rows(), vec![Value::Int(1), Value::Int(2)]);

    // The second set has pending rows: moving onto it re-arms the statement.
    stmt.next_data_set().unwrap();
    assert!(stmt.paused());
    assert_eq!(stmt.execute(true).await.unwrap(), 1);
    assert!(stmt.done());
    assert_eq!(totals.rows(), vec![Value::Int(10)]);
    assert_eq!(stmt.columns_extracted(Some(0)), 1);
    assert_eq!(stmt.sub_total_row_count(Some(0)), 2);
    assert_eq!(stmt.sub_total_row_count(Some(1)), 1);

    assert!(stmt.next_data_set().is_err());
}

#[tokio::test]
async fn test_wait_timeout_leaves_result_retrievable() {
    let (_, session) = session_over(
        ScriptedBackend::new()
            .with_delay(Duration::from_millis(100))
            .script_affected(7),
    );

    let mut stmt = session.statement_with("DELETE FROM t");
    stmt.execute_async(true).await.unwrap();

    let err = stmt.wait(Some(Duration::from_millis(5))).await.unwrap_err();
    assert!(matches!(err, StatementError::WaitTimeout { .. }));

    // The execution is still pending; an unbounded wait collects it.
    assert_eq!(stmt.wait(None).await.unwrap(), 7);
    assert_eq!(stmt.affected_row_count(), 7);
}

#[tokio::test]
async fn test_detached_execution_completes_after_drop() {
    let (backend, session) = session_over(
        ScriptedBackend::new()
            .with_delay(Duration::from_millis(20))
            .script_affected(1),
    );

    let mut stmt = session.statement_with("DELETE FROM t");
    stmt.execute_async(true).await.unwrap();
    drop(stmt);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(backend.lock().await.executed, vec!["DELETE FROM t"]);
}

#[cfg(feature = "sql-parser")]
#[tokio::test]
async fn test_implicit_transaction_only_for_mutating_text() {
    let (backend, session) = session_over(
        ScriptedBackend::new()
            .with_autocommit(false)
            .script_rows(&["n"], int_rows(&[1]))
            .script_affected(1)
            .script_affected(1),
    );

    let mut select = session.statement_with("SELECT n FROM t");
    select.execute(true).await.unwrap();
    assert_eq!(backend.lock().await.transactions_begun, 0);

    let mut delete = session.statement_with("DELETE FROM t");
    delete.execute(true).await.unwrap();
    assert_eq!(backend.lock().await.transactions_begun, 1);
    assert!(session.in_transaction().await);

    // Already inside a transaction: no second begin.
    let mut update = session.statement_with("UPDATE t SET n = 0");
    update.execute(true).await.unwrap();
    assert_eq!(backend.lock().await.transactions_begun, 1);

    session.commit().await.unwrap();
    assert!(!session.in_transaction().await);
}

#[cfg(feature = "sql-parser")]
#[tokio::test]
async fn test_unparseable_text_skips_transaction_but_records_error() {
    let (backend, session) = session_over(
        ScriptedBackend::new()
            .with_autocommit(false)
            .script_affected(0),
    );

    let mut stmt = session.statement_with("SELEKT banana FROM t");
    stmt.execute(true).await.unwrap();

    assert_eq!(backend.lock().await.transactions_begun, 0);
    assert!(!stmt.parse_error().is_empty());
    assert_eq!(stmt.is_select(), None);
}

#[tokio::test]
async fn test_session_transaction_passthrough() {
    let (_, session) = session_over(ScriptedBackend::new().with_autocommit(false));
    assert!(!session.is_autocommit().await);
    assert!(!session.in_transaction().await);

    session.begin().await.unwrap();
    assert!(session.in_transaction().await);
    session.rollback().await.unwrap();
    assert!(!session.in_transaction().await);
}

#[tokio::test]
async fn test_fresh_run_from_done_reexecutes() {
    let (backend, session) = session_over(
        ScriptedBackend::new()
            .script_affected(1)
            .script_affected(2),
    );

    let mut stmt = session.statement_with("DELETE FROM t");
    assert_eq!(stmt.execute(true).await.unwrap(), 1);
    assert!(stmt.done());
    assert_eq!(stmt.execute(true).await.unwrap(), 2);
    assert_eq!(backend.lock().await.executed.len(), 2);
}

#[tokio::test]
async fn test_execute_direct_replaces_text() {
    let (backend, session) = session_over(ScriptedBackend::new().script_affected(1));

    let mut stmt = session.statement_with("SELECT replaced");
    stmt.execute_direct("DELETE FROM t WHERE id = 9")
        .await
        .unwrap();
    assert_eq!(
        backend.lock().await.executed,
        vec!["DELETE FROM t WHERE id = 9"]
    );
    assert_eq!(stmt.to_sql(), "DELETE FROM t WHERE id = 9");
}

#[tokio::test]
async fn test_interpolated_text_reaches_backend() {
    let (backend, session) = session_over(ScriptedBackend::new().script_rows(&["n"], vec![]));

    let mut stmt = session.statement_with("SELECT n FROM t LIMIT {} OFFSET {}");
    stmt.arg(10i32).arg(20i32);
    stmt.execute(true).await.unwrap();
    assert_eq!(
        backend.lock().await.executed,
        vec!["SELECT n FROM t LIMIT 10 OFFSET 20"]
    );
}

#[tokio::test]
async fn test_backend_failure_propagates_and_statement_is_reusable() {
    let (_, session) = session_over(
        ScriptedBackend::new()
            .script(Script::Fail("no such table".to_string()))
            .script_affected(3),
    );

    let mut stmt = session.statement_with("DELETE FROM t");
    let err = stmt.execute(true).await.unwrap_err();
    assert!(err.to_string().contains("no such table"));
    assert!(stmt.initialized());

    // Retrying the same statement works.
    assert_eq!(stmt.execute(true).await.unwrap(), 3);
}

#[tokio::test]
async fn test_storage_switch_via_config_actions() {
    let (_, session) =
        session_over(ScriptedBackend::new().script_rows(&["n"], int_rows(&[1])));

    let mut stmt = session.statement_with("SELECT n FROM t");
    stmt.apply(ConfigAction::StorageList).await.unwrap();
    assert_eq!(stmt.storage(), StorageKind::List);

    let values = Extraction::new(0);
    stmt.add_extract(values.clone()).unwrap();
    assert_eq!(values.storage(), StorageKind::List);

    // Registered buffers pin the storage kind.
    assert!(stmt.apply(ConfigAction::StorageVector).await.is_err());

    stmt.execute(true).await.unwrap();
    assert_eq!(values.rows(), vec![Value::Int(1)]);
}

#[tokio::test]
async fn test_shared_statement_copies() {
    let (_, session) = session_over(
        ScriptedBackend::new()
            .script_affected(2)
            .script_affected(4),
    );

    let mut stmt: Statement = session.statement();
    stmt.add("DELETE FROM t");
    stmt.execute(true).await.unwrap();

    let mut copy = stmt.try_clone().await.unwrap();
    assert_eq!(copy.to_sql(), "DELETE FROM t");
    assert_eq!(copy.affected_row_count(), 2);

    // The copy runs a fresh step on the shared record.
    assert_eq!(copy.execute(true).await.unwrap(), 4);
    assert_eq!(stmt.affected_row_count(), 4);
}
