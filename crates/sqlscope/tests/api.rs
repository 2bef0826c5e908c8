use std::collections::{BTreeSet, HashMap};

use sqlscope::{
    Analyzer, AnalyzerConfig, ErrorKind, LineageReport, Schema, SchemaColumn, SourceColumn,
    TableOrder,
};

fn sorted() -> Analyzer {
    Analyzer::new(AnalyzerConfig::default().with_table_order(TableOrder::Sorted))
}

fn mapping(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect()
}

fn pairs(items: &[(&str, &str)]) -> BTreeSet<SourceColumn> {
    items.iter().map(|(t, c)| SourceColumn::new(*t, *c)).collect()
}

// ── extract_tables ──────────────────────────────────────────────────────

#[test]
fn test_extract_nested_subqueries() {
    let sql = "
        select *
        from table1
        join (
            select *
            from (
                select *
                from table2
            ) t2
        ) t3
            using(a)";
    assert_eq!(sorted().extract_tables(sql, "bigquery").unwrap(), vec!["table1", "table2"]);
}

#[test]
fn test_extract_repeated_aliases_in_separate_scopes() {
    let sql = "
        select *
        from table1
        join (select * from (select * from table2) t2) t2 using(a)
        join (select * from (select * from table3) t2) t3 using(b)";
    assert_eq!(
        sorted().extract_tables(sql, "bigquery").unwrap(),
        vec!["table1", "table2", "table3"]
    );
}

#[test]
fn test_extract_ctes_joined_with_using() {
    let sql = "
        with t1 as (select * from table1 join table2 using(a)),
             t2 as (select * from table2 left join table1 using(a))
        select t1.*, t2.b as b2, t2.c as c2
        from t1
        join t2 using(a)";
    assert_eq!(sorted().extract_tables(sql, "bigquery").unwrap(), vec!["table1", "table2"]);
}

#[test]
fn test_extract_many_joins_sorted() {
    let sql = "SELECT *
from raw.Bookings as bookings
    inner join raw.Sessions as sessions on bookings.SessionId = sessions.Id
    inner join dashboard.users as coaches on Coaches.Id = bookings.CoachId
    inner join raw.Languages as languages on bookings.LanguageId = languages.Id
    inner join raw.Programmes as programmes on Bookings.ProgrammeId = Programmes.Id
    inner join dashboard.organizations as organizations on Programmes.OrganizationId = Organizations.Id
    left join dashboard.users as users on Users.Id = bookings.UserId
    left join raw.Teams teams on teams.Id = bookings.TeamId";
    assert_eq!(
        sorted().extract_tables(sql, "bigquery").unwrap(),
        vec![
            "dashboard.organizations",
            "dashboard.users",
            "raw.Bookings",
            "raw.Languages",
            "raw.Programmes",
            "raw.Sessions",
            "raw.Teams",
        ]
    );
}

#[test]
fn test_extract_transaction_script() {
    let sql = "BEGIN TRANSACTION;
DROP TABLE IF EXISTS public.example;
CREATE TABLE public.example AS SELECT 1 as id, 'Spain' as country, 'Juan' as name
union all
SELECT 2 as id, 'Germany' as country, 'Markus' as name
union all
SELECT 3 as id, 'France' as country, 'Antoine' as name;
COMMIT;";
    assert_eq!(sqlscope::extract_tables(sql, "bigquery").unwrap(), vec!["public.example"]);
}

#[test]
fn test_extract_first_seen_order_by_default() {
    assert_eq!(
        sqlscope::extract_tables("SELECT * FROM zeta, alpha", "snowflake").unwrap(),
        vec!["zeta", "alpha"]
    );
}

#[test]
fn test_deeply_nested_input_is_a_parse_error() {
    let sql = format!("SELECT {}1{}", "(".repeat(10_000), ")".repeat(10_000));
    let empty = HashMap::new();
    let errors = [
        sqlscope::extract_tables(&sql, "postgres").err(),
        sqlscope::rename_tables(&sql, "postgres", &empty).err(),
        sqlscope::add_limit(&sql, "postgres", 1).err(),
        sqlscope::is_single_select(&sql, "postgres").err(),
        sqlscope::column_lineage(&sql, "postgres", &Schema::new()).err(),
    ];
    for err in errors {
        assert_eq!(err.map(|e| e.kind()), Some(ErrorKind::ParseError));
    }
}

#[test]
fn test_extract_quoted_names_keep_case() {
    assert_eq!(
        sqlscope::extract_tables(r#"SELECT * FROM "Foo" f JOIN foo g ON f.id = g.id"#, "postgres")
            .unwrap(),
        vec!["Foo", "foo"]
    );
    assert_eq!(
        sqlscope::extract_tables(r#"SELECT * FROM "Foo", foo"#, "postgres").unwrap(),
        vec!["Foo", "foo"]
    );
}

#[test]
fn test_extract_select_into_and_for_update() {
    assert_eq!(
        sqlscope::extract_tables("SELECT id INTO dbo.staged FROM dbo.orders", "tsql").unwrap(),
        vec!["dbo.staged", "dbo.orders"]
    );
    assert_eq!(
        sqlscope::extract_tables("SELECT * FROM jobs FOR UPDATE SKIP LOCKED", "postgres").unwrap(),
        vec!["jobs"]
    );
}

// ── rename_tables ───────────────────────────────────────────────────────

#[test]
fn test_rename_schema_only() {
    assert_eq!(
        sqlscope::rename_tables(
            "SELECT * FROM raw.items",
            "bigquery",
            &mapping(&[("raw.items", "raw_dev.items")]),
        )
        .unwrap(),
        "SELECT * FROM raw_dev.items"
    );
}

#[test]
fn test_rename_then_extract() {
    let sql = "SELECT i.id FROM items i JOIN orders o ON o.item_id = i.id";
    let renamed = sqlscope::rename_tables(
        sql,
        "postgres",
        &mapping(&[("items", "staging.items_v2")]),
    )
    .unwrap();
    assert_eq!(
        renamed,
        "SELECT i.id FROM staging.items_v2 i JOIN orders o ON o.item_id = i.id"
    );
    assert_eq!(
        sqlscope::extract_tables(&renamed, "postgres").unwrap(),
        vec!["staging.items_v2", "orders"]
    );
}

#[test]
fn test_rename_collision_is_duplicate_alias() {
    let err = sqlscope::rename_tables(
        "SELECT * FROM a JOIN b ON a.id = b.id",
        "ansi",
        &mapping(&[("a", "b")]),
    );
    assert_eq!(err.map_err(|e| e.kind()), Err(ErrorKind::ResolutionError));
}

// ── add_limit ───────────────────────────────────────────────────────────

#[test]
fn test_add_limit_joins() {
    assert_eq!(
        sqlscope::add_limit(
            "SELECT a.*, b.name FROM table_a AS a JOIN table_b AS b ON a.id = b.id",
            "snowflake",
            15,
        )
        .unwrap(),
        "SELECT a.*, b.name FROM table_a AS a JOIN table_b AS b ON a.id = b.id LIMIT 15"
    );
}

#[test]
fn test_add_limit_function_only_query() {
    assert_eq!(
        sqlscope::add_limit(
            "SELECT CONVERT_TIMEZONE('CET', '2025-05-20T00:00:00Z')",
            "snowflake",
            10,
        )
        .unwrap(),
        "SELECT CONVERT_TIMEZONE('CET', '2025-05-20T00:00:00Z') LIMIT 10"
    );
}

#[test]
fn test_add_limit_keeps_existing_limit() {
    for dialect in ["bigquery", ""] {
        assert_eq!(
            sqlscope::add_limit("SELECT id, name FROM users LIMIT 20", dialect, 5).unwrap(),
            "SELECT id, name FROM users LIMIT 20"
        );
    }
}

#[test]
fn test_add_limit_invalid_sql() {
    let err = sqlscope::add_limit("SELECT * FROM", "snowflake", 10);
    assert_eq!(err.map_err(|e| e.kind()), Err(ErrorKind::ParseError));
}

#[test]
fn test_add_limit_tsql_top() {
    assert_eq!(
        sqlscope::add_limit("SELECT name FROM sys.tables", "mssql", 3).unwrap(),
        "SELECT TOP 3 name FROM sys.tables"
    );
}

// ── is_single_select ────────────────────────────────────────────────────

#[test]
fn test_single_select_shapes() {
    assert!(sqlscope::is_single_select("WITH x AS (SELECT 1) SELECT * FROM x", "duckdb").unwrap());
    assert!(!sqlscope::is_single_select("SELECT 1 UNION SELECT 2", "duckdb").unwrap());
    assert!(!sqlscope::is_single_select("", "duckdb").unwrap());
    assert!(!sqlscope::is_single_select("UPDATE t SET a = 1", "duckdb").unwrap());
    assert!(!sqlscope::is_single_select("(SELECT 1 UNION SELECT 2)", "duckdb").unwrap());
    assert!(sqlscope::is_single_select("SELECT * FROM t FOR UPDATE", "postgres").unwrap());
}

// ── column_lineage ──────────────────────────────────────────────────────

fn lineage(sql: &str, dialect: &str, schema: &Schema) -> LineageReport {
    sqlscope::column_lineage(sql, dialect, schema).unwrap()
}

#[test]
fn test_lineage_join_scenario() {
    let schema = Schema::new()
        .with_table("orders", ["id", "customer_id"])
        .with_table("customers", ["id", "name"]);
    let report = lineage(
        "SELECT c.name FROM orders o JOIN customers c ON o.customer_id = c.id",
        "ansi",
        &schema,
    );
    assert_eq!(report.columns.len(), 1);
    assert_eq!(report.columns[0].name, "name");
    assert_eq!(report.columns[0].sources, pairs(&[("customers", "name")]));
    assert_eq!(
        report.non_selected_columns,
        pairs(&[("orders", "customer_id"), ("customers", "id")])
    );
}

#[test]
fn test_lineage_aggregate_with_group_by() {
    let schema = Schema::new().with_table(
        "sales",
        [
            SchemaColumn::typed("region", "STRING"),
            SchemaColumn::typed("amount", "NUMERIC"),
            SchemaColumn::typed("sold_on", "DATE"),
        ],
    );
    let report = lineage(
        "SELECT region, SUM(amount) AS total
         FROM sales
         WHERE sold_on >= '2024-01-01'
         GROUP BY region
         HAVING total > 10",
        "bigquery",
        &schema,
    );
    let region = &report.columns[0];
    assert_eq!(region.data_type.as_deref(), Some("STRING"));
    assert_eq!(report.columns[1].name, "total");
    assert_eq!(report.columns[1].sources, pairs(&[("sales", "amount")]));
    assert_eq!(report.non_selected_columns, pairs(&[("sales", "sold_on")]));
    assert!(report.errors.is_empty(), "{:?}", report.errors);
}

#[test]
fn test_lineage_schema_from_json() {
    let schema: Schema =
        serde_json::from_str(r#"{"shop.orders": [{"name": "id", "type": "INT64"}, "total"]}"#)
            .unwrap();
    let report = lineage("SELECT * FROM orders", "bigquery", &schema);
    let names: Vec<&str> = report.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["id", "total"]);
    assert_eq!(report.columns[0].sources, pairs(&[("shop.orders", "id")]));
    assert_eq!(report.columns[0].data_type.as_deref(), Some("INT64"));
}

#[test]
fn test_lineage_create_table_as_select() {
    let schema = Schema::new().with_table("src", ["a", "b"]);
    let report = lineage("CREATE TABLE dst AS SELECT a, b + 1 AS c FROM src", "snowflake", &schema);
    assert_eq!(report.columns[0].sources, pairs(&[("src", "a")]));
    assert_eq!(report.columns[1].sources, pairs(&[("src", "b")]));
}

#[test]
fn test_lineage_insert_target_is_not_a_source() {
    let schema = Schema::new()
        .with_table("orders", ["id"])
        .with_table("archive", ["id", "nope"]);
    let report = lineage("INSERT INTO archive SELECT nope FROM orders", "ansi", &schema);
    assert!(report.columns[0].sources.is_empty());
    assert!(report.columns[0].error.is_some());
}

#[test]
fn test_lineage_parse_errors_are_fatal() {
    let err = sqlscope::column_lineage("SELECT a FROM (", "ansi", &Schema::new());
    assert_eq!(err.map_err(|e| e.kind()), Err(ErrorKind::ParseError));
}
