use proptest::prelude::*;

use sphinxql_backend::SphinxQueryCompiler;
use sphinxql_core::query::{FieldFilter, FilterKind, QuerySpec, SortField};
use sphinxql_core::traits::QueryCompiler;
use sphinxql_core::types::DaemonValue;
use sphinxql_core::Error;

fn field() -> impl Strategy<Value = String> { "[a-z][a-z0-9_]{0,10}" }

proptest! {
    #[test]
    fn mixed_directions_never_compile(
        asc in proptest::collection::vec(field(), 1..4),
        desc in proptest::collection::vec(field(), 1..4),
        desc_first in any::<bool>(),
    ) {
        let mut sort: Vec<SortField> = asc.into_iter().map(SortField::asc).collect();
        let descending: Vec<SortField> = desc.into_iter().map(SortField::desc).collect();
        if desc_first {
            sort.splice(0..0, descending);
        } else {
            sort.extend(descending);
        }
        let spec = QuerySpec { text: Some("x".into()), sort, ..QuerySpec::default() };
        let result = SphinxQueryCompiler::new("documents").unwrap().compile(&spec);
        let mixed = matches!(result, Err(Error::MixedSortDirection { .. }));
        prop_assert!(mixed);
    }

    #[test]
    fn offset_without_limit_never_compiles(offset in 1u64..1_000_000) {
        let spec = QuerySpec::matching("x").offset(offset);
        let result = SphinxQueryCompiler::new("documents").unwrap().compile(&spec);
        let invalid = matches!(result, Err(Error::InvalidPagination { offset: o }) if o == offset);
        prop_assert!(invalid);
    }

    #[test]
    fn filter_values_stay_out_of_statement_text(value in "\\PC{0,30}[a-z]") {
        let spec = QuerySpec::new().filter("title", FilterKind::Contains, value.clone());
        let compiled = SphinxQueryCompiler::new("documents").unwrap().compile(&spec).unwrap();
        prop_assert_eq!(compiled.statement, "SELECT * FROM documents WHERE MATCH(?)");
        let expected = SphinxQueryCompiler::new("documents")
            .unwrap()
            .fragment(&FieldFilter::new("title", FilterKind::Contains, value))
            .unwrap();
        prop_assert_eq!(compiled.params, vec![DaemonValue::Text(expected)]);
    }
}
