use super::*;
use crate::config::SqlLogConfig;
use crate::executor::ExecResult;
use crate::order::Order;
use crate::testing::{
    CallKind, Membership, Reply, ScriptedExecutor, User, UserSearch, scalar_row, user_row,
};

fn kinds(exec: &ScriptedExecutor) -> Vec<CallKind> {
    exec.calls().into_iter().map(|c| c.kind).collect()
}

#[tokio::test]
async fn selective_insert_writes_non_empty_fields_and_returns_identity() {
    let exec = ScriptedExecutor::new(Dialect::MsSql).rows(vec![scalar_row(42.0)]);
    let access = Access::new(&exec);

    let user = User {
        id: 0,
        name: "x".into(),
        active: false,
    };
    let id = access.insert_selective(&user).await.unwrap();

    assert_eq!(id, 42);
    let calls = exec.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].kind, CallKind::Query);
    assert_eq!(
        calls[0].sql,
        "INSERT INTO users (name) VALUES (@p1); SELECT SCOPE_IDENTITY()"
    );
    assert_eq!(calls[0].args, vec![Value::Text("x".into())]);
}

#[tokio::test]
async fn insert_uses_returning_on_postgres() {
    let exec = ScriptedExecutor::new(Dialect::Postgres).rows(vec![scalar_row(7)]);
    let access = Access::new(&exec);

    let id = access.insert(&User::default()).await.unwrap();

    assert_eq!(id, 7);
    assert_eq!(
        exec.sql(),
        ["INSERT INTO users (name, active) VALUES ($1, $2) RETURNING id"]
    );
    assert_eq!(
        exec.calls()[0].args,
        vec![Value::Text(String::new()), Value::Bool(false)]
    );
}

#[tokio::test]
async fn insert_reads_driver_reported_id_on_mysql() {
    let exec = ScriptedExecutor::new(Dialect::MySql).reply(Reply::Exec(ExecResult {
        rows_affected: 1,
        last_insert_id: Some(19),
    }));
    let access = Access::new(&exec);

    let id = access.insert(&User::default()).await.unwrap();

    assert_eq!(id, 19);
    assert_eq!(kinds(&exec), [CallKind::Execute]);
    assert_eq!(exec.sql(), ["INSERT INTO users (name, active) VALUES (?, ?)"]);
}

#[tokio::test]
async fn insert_without_auto_column_prepares_and_reports_zero() {
    let exec = ScriptedExecutor::new(Dialect::Postgres).affected(1);
    let access = Access::new(&exec);

    let member = Membership {
        org_id: 1,
        user_id: 2,
        role: None,
    };
    let id = access.insert(&member).await.unwrap();

    assert_eq!(id, 0);
    assert_eq!(kinds(&exec), [CallKind::Prepare, CallKind::ExecutePrepared]);
    let calls = exec.calls();
    assert_eq!(
        calls[1].sql,
        "INSERT INTO auth.memberships (org_id, user_id, role) VALUES ($1, $2, $3)"
    );
    assert_eq!(
        calls[1].args,
        vec![Value::Int(1), Value::Int(2), Value::Null]
    );
}

#[tokio::test]
async fn insert_with_appends_extra_columns() {
    let exec = ScriptedExecutor::new(Dialect::Postgres).rows(vec![scalar_row(3)]);
    let access = Access::new(&exec);

    let extra = [FieldDescriptor::new("created_by", "admin")];
    access.insert_with(&User::default(), &extra).await.unwrap();

    assert_eq!(
        exec.sql(),
        ["INSERT INTO users (name, active, created_by) VALUES ($1, $2, $3) RETURNING id"]
    );
}

#[tokio::test]
async fn update_by_primary_key_probes_when_nothing_changed() {
    let exec = ScriptedExecutor::new(Dialect::Postgres)
        .affected(0)
        .rows(vec![scalar_row(0)]);
    let access = Access::new(&exec);

    let user = User {
        id: 404,
        name: "ghost".into(),
        active: true,
    };
    let affected = access.update_by_primary_key(&user).await.unwrap();

    assert_eq!(affected, 0);
    assert_eq!(
        kinds(&exec),
        [CallKind::Prepare, CallKind::ExecutePrepared, CallKind::Query]
    );
    let calls = exec.calls();
    assert_eq!(
        calls[1].sql,
        "UPDATE users SET name = $1, active = $2 WHERE id = $3"
    );
    assert_eq!(calls[2].sql, "SELECT COUNT(*) FROM users WHERE id = $1");
    assert_eq!(calls[2].args, vec![Value::Int(404)]);
}

#[tokio::test]
async fn update_by_primary_key_reports_probe_count() {
    let exec = ScriptedExecutor::new(Dialect::MySql)
        .affected(0)
        .rows(vec![scalar_row(1)]);
    let access = Access::new(&exec);

    let affected = access
        .update_by_primary_key(&User {
            id: 5,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(affected, 1);
}

#[tokio::test]
async fn update_by_primary_key_without_key_is_mapping_error() {
    let exec = ScriptedExecutor::new(Dialect::Postgres);
    let access = Access::new(&exec);

    let err = access
        .update_by_primary_key(&UserSearch::default())
        .await
        .unwrap_err();

    assert!(err.is_mapping());
    assert!(exec.calls().is_empty());
}

#[tokio::test]
async fn selective_update_by_composite_key() {
    let exec = ScriptedExecutor::new(Dialect::Postgres).affected(1);
    let access = Access::new(&exec);

    let member = Membership {
        org_id: 10,
        user_id: 20,
        role: Some("admin".into()),
    };
    let affected = access
        .update_selective_by_primary_key(&member)
        .await
        .unwrap();

    assert_eq!(affected, 1);
    let calls = exec.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(
        calls[1].sql,
        "UPDATE auth.memberships SET role = $1 WHERE org_id = $2 AND user_id = $3"
    );
}

#[tokio::test]
async fn update_with_nothing_to_set_fails() {
    let exec = ScriptedExecutor::new(Dialect::Postgres);
    let access = Access::new(&exec);

    let only_key = User {
        id: 3,
        ..Default::default()
    };
    let err = access.update_selective(&only_key, &[]).await.unwrap_err();
    assert!(err.is_mapping());
    assert!(exec.calls().is_empty());
}

#[tokio::test]
async fn update_applies_filters() {
    let exec = ScriptedExecutor::new(Dialect::MsSql).affected(4);
    let access = Access::new(&exec);

    let patch = User {
        active: true,
        ..Default::default()
    };
    let probe = User {
        name: "a%".into(),
        ..Default::default()
    };
    let affected = access
        .update_selective(&patch, &[Filter::new(&probe)])
        .await
        .unwrap();

    assert_eq!(affected, 4);
    assert_eq!(
        exec.calls()[1].sql,
        "UPDATE users SET active = @p1 WHERE (name like @p2)"
    );
}

#[tokio::test]
async fn delete_with_filters() {
    let exec = ScriptedExecutor::new(Dialect::Postgres).affected(1);
    let access = Access::new(&exec);

    let probe = User {
        id: 9,
        ..Default::default()
    };
    let deleted = access
        .delete(&User::default(), &[Filter::new(&probe)])
        .await
        .unwrap();

    assert_eq!(deleted, 1);
    assert_eq!(exec.calls()[1].sql, "DELETE FROM users WHERE (id = $1)");
}

#[tokio::test]
async fn select_count_shares_filter_composition() {
    let exec = ScriptedExecutor::new(Dialect::Postgres).rows(vec![scalar_row(5)]);
    let access = Access::new(&exec);

    let probe = User {
        active: true,
        ..Default::default()
    };
    let n = access
        .select_count(&User::default(), &[Filter::new(&probe)])
        .await
        .unwrap();

    assert_eq!(n, 5);
    assert_eq!(
        exec.sql(),
        ["SELECT COUNT(*) FROM users WHERE (active = $1)"]
    );
}

#[tokio::test]
async fn select_one_hydrates_or_reports_no_rows() {
    let exec = ScriptedExecutor::new(Dialect::Postgres)
        .rows(vec![user_row(2, "b", true)])
        .rows(Vec::new());
    let access = Access::new(&exec);

    let probe = User {
        id: 2,
        ..Default::default()
    };
    let mut user = User::default();
    access
        .select_one(&mut user, &[Filter::new(&probe)])
        .await
        .unwrap();
    assert_eq!(
        user,
        User {
            id: 2,
            name: "b".into(),
            active: true
        }
    );
    assert_eq!(
        exec.sql()[0],
        "SELECT id, name, active FROM users WHERE (id = $1)"
    );

    let err = access.select_one(&mut user, &[]).await.unwrap_err();
    assert!(err.is_no_rows());
}

#[tokio::test]
async fn select_list_stops_when_callback_says_so() {
    let rows = vec![user_row(1, "a", true), user_row(2, "b", true), user_row(3, "c", true)];
    let exec = ScriptedExecutor::new(Dialect::Postgres).rows(rows);
    let access = Access::new(&exec);

    let order = vec![Order::desc("id", 1)];
    let mut seen = Vec::new();
    let mut user = User::default();
    access
        .select_list(&mut user, Some(&order), &[], |idx, u| {
            seen.push((idx, u.id));
            if idx == 1 {
                RowControl::Stop
            } else {
                RowControl::Continue
            }
        })
        .await
        .unwrap();

    assert_eq!(seen, [(0, 1), (1, 2)]);
    assert_eq!(
        exec.sql(),
        ["SELECT id, name, active FROM users order by id DESC"]
    );
}

#[tokio::test]
async fn select_list_abort_surfaces_callback_error() {
    let rows = vec![user_row(1, "a", true), user_row(2, "b", true)];
    let exec = ScriptedExecutor::new(Dialect::Postgres).rows(rows);
    let access = Access::new(&exec);

    let mut calls = 0;
    let mut user = User::default();
    let err = access
        .select_list(&mut user, None, &[], |_, _| {
            calls += 1;
            RowControl::Abort(DbError::Other("enough".into()))
        })
        .await
        .unwrap_err();

    assert_eq!(calls, 1);
    assert!(matches!(err, DbError::Other(ref m) if m == "enough"));
}

#[tokio::test]
async fn select_list_fails_on_bad_row() {
    let bad = Row::from_values(vec![
        Value::Text("nope".into()),
        Value::Text("b".into()),
        Value::Bool(true),
    ]);
    let exec = ScriptedExecutor::new(Dialect::Postgres).rows(vec![user_row(1, "a", true), bad]);
    let access = Access::new(&exec);

    let mut user = User::default();
    let mut seen = 0;
    let err = access
        .select_list(&mut user, None, &[], |_, _| {
            seen += 1;
            RowControl::Continue
        })
        .await
        .unwrap_err();

    assert_eq!(seen, 1);
    assert!(matches!(err, DbError::Decode { ref column, .. } if column == "id"));
}

#[tokio::test]
async fn select_distinct_and_select_all() {
    let exec = ScriptedExecutor::new(Dialect::Sqlite)
        .rows(vec![user_row(1, "a", false)])
        .rows(vec![user_row(1, "a", false), user_row(2, "b", true)]);
    let access = Access::new(&exec);

    let mut user = User::default();
    access
        .select_distinct(&mut user, None, &[], |_, _| RowControl::Continue)
        .await
        .unwrap();
    let all = access.select_all(&mut user, None, &[]).await.unwrap();

    assert_eq!(all.len(), 2);
    assert_eq!(all[1].name, "b");
    let sql = exec.sql();
    assert_eq!(sql[0], "SELECT DISTINCT id, name, active FROM users");
    assert_eq!(sql[1], "SELECT id, name, active FROM users");
}

#[tokio::test]
async fn select_page_clamps_and_falls_back_to_primary_key_order() {
    let exec = ScriptedExecutor::new(Dialect::Postgres)
        .rows(vec![scalar_row(25)])
        .rows(vec![user_row(21, "u", true)]);
    let access = Access::new(&exec);

    let mut user = User::default();
    let page = access
        .select_page(&mut user, 10, 99, None, &[], |_, _| RowControl::Continue)
        .await
        .unwrap();

    assert_eq!(
        page,
        Pagination {
            total: 25,
            page_count: 3,
            page_size: 10,
            page_index: 3
        }
    );
    assert_eq!(
        exec.sql(),
        [
            "SELECT COUNT(*) FROM users",
            "SELECT id, name, active FROM users order by id ASC LIMIT 10 OFFSET 20",
        ]
    );
    assert_eq!(user.id, 21);
}

#[tokio::test]
async fn select_page_uses_row_number_on_legacy_engines() {
    let exec = ScriptedExecutor::new(Dialect::MsSql)
        .with_capabilities(Capabilities::from_mssql_version(2008))
        .rows(vec![scalar_row(12)])
        .rows(Vec::new());
    let access = Access::new(&exec);

    let probe = User {
        active: true,
        ..Default::default()
    };
    let order = vec![Order::asc("name", 1)];
    let mut user = User::default();
    access
        .select_page(&mut user, 5, 2, Some(&order), &[Filter::new(&probe)], |_, _| {
            RowControl::Continue
        })
        .await
        .unwrap();

    let calls = exec.calls();
    assert_eq!(calls[0].sql, "SELECT COUNT(*) FROM users WHERE (active = @p1)");
    assert_eq!(
        calls[1].sql,
        "SELECT id, name, active FROM (SELECT id, name, active, \
         ROW_NUMBER() OVER(order by name ASC) AS [RowNumber] FROM users \
         WHERE (active = @p1)) t WHERE [RowNumber] BETWEEN 6 AND 10"
    );
    assert_eq!(calls[1].args, vec![Value::Bool(true)]);
}

#[tokio::test]
async fn configured_capabilities_override_executor() {
    let exec = ScriptedExecutor::new(Dialect::MsSql)
        .rows(vec![scalar_row(1)])
        .rows(Vec::new());
    let config = AccessConfig::new()
        .capabilities(Capabilities::LEGACY)
        .log(SqlLogConfig::disabled());
    let access = Access::with_config(&exec, config);

    let mut user = User::default();
    access
        .select_page(&mut user, 10, 1, None, &[], |_, _| RowControl::Continue)
        .await
        .unwrap();

    assert!(exec.sql()[1].contains("ROW_NUMBER() OVER(order by id ASC)"));
}

#[tokio::test]
async fn select_page_skips_page_query_when_empty() {
    let exec = ScriptedExecutor::new(Dialect::Postgres).rows(vec![scalar_row(0)]);
    let access = Access::new(&exec);

    let mut user = User::default();
    let page = access
        .select_page(&mut user, 10, 3, None, &[], |_, _| RowControl::Continue)
        .await
        .unwrap();

    assert_eq!(page.total, 0);
    assert_eq!(page.page_index, 1);
    assert_eq!(exec.calls().len(), 1);
}

#[tokio::test]
async fn execution_errors_pass_through() {
    let exec =
        ScriptedExecutor::new(Dialect::Postgres).reply(Reply::Fail("relation missing".into()));
    let access = Access::new(&exec);

    let err = access
        .select_count(&User::default(), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Execution(ref m) if m == "relation missing"));
}

#[tokio::test]
async fn query_result_keys_rows_by_column_id() {
    let exec = ScriptedExecutor::new(Dialect::Postgres)
        .rows(vec![user_row(1, "a", true), user_row(2, "b", false)]);
    let access = Access::new(&exec);

    let result = access
        .query_result("SELECT id, name, active FROM users WHERE id > $1", &[Value::Int(0)])
        .await
        .unwrap();

    assert_eq!(result.len(), 2);
    assert_eq!(result.columns[2].id, "col00003");
    assert_eq!(result.rows[0]["col00002"], Value::Text("a".into()));
    assert_eq!(exec.calls()[0].args, vec![Value::Int(0)]);
}

#[tokio::test]
async fn stalled_result_set_times_out() {
    let limit = std::time::Duration::from_millis(20);
    let exec = ScriptedExecutor::new(Dialect::Postgres)
        .reply(Reply::Stall(vec![user_row(1, "a", true)]));
    let access = Access::with_config(&exec, AccessConfig::new().query_timeout(limit));

    let mut seen = Vec::new();
    let outcome = tokio::time::timeout(
        std::time::Duration::from_secs(2),
        access.select_list(&mut User::default(), None, &[], |_, u| {
            seen.push(u.id);
            RowControl::Continue
        }),
    )
    .await
    .expect("row pull must honour the query timeout");

    assert!(matches!(outcome, Err(DbError::Timeout(d)) if d == limit));
    assert_eq!(seen, [1]);
}

#[tokio::test]
async fn stalled_ad_hoc_query_times_out() {
    let limit = std::time::Duration::from_millis(20);
    let exec = ScriptedExecutor::new(Dialect::Postgres).reply(Reply::Stall(Vec::new()));
    let access = Access::with_config(&exec, AccessConfig::new().query_timeout(limit));

    let outcome = tokio::time::timeout(
        std::time::Duration::from_secs(2),
        access.query_result("SELECT 1", &[]),
    )
    .await
    .expect("row pull must honour the query timeout");
    assert!(outcome.unwrap_err().is_timeout());
}
