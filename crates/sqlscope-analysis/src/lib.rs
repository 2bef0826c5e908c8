// SQL Analysis
//
// Scope resolution over the parsed AST and the analyses built on it: table
// extraction, table renaming, LIMIT injection, statement classification, and
// column lineage.

pub mod classify;
pub mod lineage;
pub mod rewrite;
pub mod schema;
pub mod scope;
pub mod tables;
pub mod visit;

pub use classify::is_single_select;
pub use lineage::{column_lineage, LineageEntry, LineageReport, SourceColumn};
pub use rewrite::{add_limit, rename_tables};
pub use schema::{Schema, SchemaColumn};
pub use scope::{
    Binding, BindingSource, ResolvedStatement, Resolver, Scope, ScopeId, ScopeKind, ScopeTree,
    TableRole, TableSite,
};
pub use tables::{extract_tables, TableOrder};
