use cnf_normalizer::cnf::{
    eliminate_epsilon, eliminate_inaccessible, eliminate_non_productive,
    eliminate_unit_productions, nullable_set,
};
use cnf_normalizer::language::{bounded_language, equivalent_up_to};
use cnf_normalizer::{
    CnfConverter, ConversionConfig, Grammar, GrammarError, Stage, Symbol,
};
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::Write;

fn reference_grammar() -> Grammar {
    Grammar::from_pairs(
        [
            ("S", vec!["a", "B"]),
            ("S", vec!["A", "C"]),
            ("A", vec!["a"]),
            ("A", vec!["A", "C", "S", "C"]),
            ("A", vec!["B", "C"]),
            ("B", vec!["b"]),
            ("B", vec!["a", "A"]),
            ("C", vec!["B", "A"]),
            ("C", vec!["ε"]),
            ("E", vec!["b", "B"]),
        ],
        Some("S"),
    )
    .unwrap()
}

fn nullable_start_grammar() -> Grammar {
    Grammar::from_pairs(
        [
            ("S", vec!["A", "S", "B"]),
            ("S", vec!["ε"]),
            ("A", vec!["a"]),
            ("A", vec!["ε"]),
            ("B", vec!["S", "b", "S"]),
            ("B", vec!["A"]),
        ],
        None,
    )
    .unwrap()
}

fn dead_symbol_grammar() -> Grammar {
    Grammar::from_pairs(
        [
            ("S", vec!["a", "S"]),
            ("S", vec!["D", "b"]),
            ("S", vec!["c", "X", "c"]),
            ("X", vec!["x"]),
            ("X", vec!["S"]),
            ("D", vec!["d", "D"]),
        ],
        None,
    )
    .unwrap()
}

/// Every production is `A → a`, `A → B C`, or `S → ε` on an unreferenced start
fn assert_cnf_shape(grammar: &Grammar) {
    for (lhs, production) in grammar.iter_productions() {
        match production.symbols.as_slice() {
            [Symbol::Terminal(t)] => assert!(grammar.terminals().contains(t)),
            [Symbol::Nonterminal(b), Symbol::Nonterminal(c)] => {
                assert!(grammar.has_non_terminal(b), "{} → {}", lhs, production);
                assert!(grammar.has_non_terminal(c), "{} → {}", lhs, production);
            }
            [] => {
                assert_eq!(lhs, grammar.start_symbol());
                assert!(!grammar.is_referenced(lhs));
            }
            _ => panic!("production not in CNF: {} → {}", lhs, production),
        }
    }
}

#[test]
fn test_reference_grammar_end_to_end() {
    let grammar = reference_grammar();
    let cnf = CnfConverter::new().convert(grammar.clone()).unwrap();

    assert_cnf_shape(&cnf);
    assert!(cnf.is_cnf());
    assert!(cnf.validate().is_ok());
    assert_eq!(cnf.start_symbol(), "S");

    // no epsilon and no unit productions
    assert!(cnf.iter_productions().all(|(_, p)| !p.is_epsilon()));
    assert!(cnf.iter_productions().all(|(_, p)| p.unit_target().is_none()));
    assert!(cnf.iter_productions().all(|(_, p)| p.len() == 1 || p.len() == 2));

    // E is unreachable from S and leaves no trace
    assert!(!cnf.has_non_terminal("E"));
    assert!(!cnf.is_referenced("E"));
    assert!(!cnf.to_string().contains('E'));

    assert!(equivalent_up_to(&grammar, &cnf, 7));
}

#[test]
fn test_reference_nullable_set() {
    let nullable = nullable_set(&reference_grammar());
    assert_eq!(nullable.iter().collect::<Vec<_>>(), ["C"]);
}

#[test]
fn test_language_preserved_by_every_stage() {
    for grammar in [reference_grammar(), nullable_start_grammar(), dead_symbol_grammar()] {
        let conversion = CnfConverter::new()
            .convert_with_trace(grammar.clone())
            .unwrap();
        let expected = bounded_language(&grammar, 6);

        for step in &conversion.steps {
            assert_eq!(
                bounded_language(&step.grammar, 6),
                expected,
                "language changed by stage `{}`",
                step.stage
            );
        }
    }
}

#[test]
fn test_stages_do_not_touch_their_input() {
    let grammar = nullable_start_grammar();
    let snapshot = grammar.clone();

    let after_epsilon = eliminate_epsilon(grammar.clone());
    let after_unit = eliminate_unit_productions(after_epsilon.clone());

    assert_eq!(grammar, snapshot);
    assert_ne!(after_epsilon, snapshot);
    assert_ne!(after_unit, after_epsilon);
}

#[test]
fn test_nullable_start_keeps_empty_string() {
    let grammar = nullable_start_grammar();
    let cnf = CnfConverter::new().convert(grammar.clone()).unwrap();

    assert_eq!(cnf.start_symbol(), "S'");
    assert_cnf_shape(&cnf);
    assert!(bounded_language(&cnf, 0).contains(&Vec::new()));

    let empties: Vec<_> = cnf
        .iter_productions()
        .filter(|(_, p)| p.is_epsilon())
        .map(|(lhs, _)| lhs)
        .collect();
    assert_eq!(empties, ["S'"]);
}

#[test]
fn test_unit_elimination_is_idempotent() {
    for grammar in [reference_grammar(), nullable_start_grammar()] {
        let once = eliminate_unit_productions(eliminate_epsilon(grammar));
        assert!(once.iter_productions().all(|(_, p)| p.unit_target().is_none()));
        assert_eq!(eliminate_unit_productions(once.clone()), once);
    }
}

#[test]
fn test_dead_symbol_and_its_users_are_removed() {
    let grammar = dead_symbol_grammar();
    let pruned = eliminate_non_productive(eliminate_inaccessible(grammar.clone()));

    assert!(!pruned.has_non_terminal("D"));
    assert!(!pruned.is_referenced("D"));
    assert_eq!(pruned.productions_of("S").len(), 2);

    let cnf = CnfConverter::new().convert(grammar).unwrap();
    assert!(!cnf.has_non_terminal("D"));
    assert_cnf_shape(&cnf);
}

#[test]
fn test_prunings_commute_on_language() {
    let grammar = dead_symbol_grammar();
    let reach_first = eliminate_non_productive(eliminate_inaccessible(grammar.clone()));
    let productive_first = eliminate_inaccessible(eliminate_non_productive(grammar));
    assert!(equivalent_up_to(&reach_first, &productive_first, 6));
}

#[test]
fn test_fresh_names_are_unique() {
    let grammar = Grammar::from_pairs(
        [
            ("S", vec!["N0", "x", "T_x", "N1"]),
            ("S", vec!["x", "y", "x", "y"]),
            ("N0", vec!["n", "N0"]),
            ("N0", vec!["n"]),
            ("T_x", vec!["t"]),
            ("N1", vec!["x", "S"]),
            ("N1", vec!["y"]),
        ],
        None,
    )
    .unwrap();
    let cnf = CnfConverter::new().convert(grammar.clone()).unwrap();

    let introduced: Vec<&String> = cnf
        .nonterminals()
        .iter()
        .filter(|nt| !grammar.has_non_terminal(nt))
        .collect();
    let distinct: BTreeSet<&String> = introduced.iter().copied().collect();

    assert!(!introduced.is_empty());
    assert_eq!(distinct.len(), introduced.len());
    for name in &introduced {
        assert!(!grammar.terminals().contains(*name));
    }
    assert_cnf_shape(&cnf);
    assert!(equivalent_up_to(&grammar, &cnf, 6));
}

#[test]
fn test_concurrent_conversions_are_independent() {
    let converter = CnfConverter::new();
    let expected = converter.convert(reference_grammar()).unwrap();

    let results: Vec<Grammar> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| converter.convert(reference_grammar()).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for result in results {
        assert_eq!(result, expected);
    }
}

#[test]
fn test_reprune_yields_smaller_grammar() {
    let grammar = Grammar::from_pairs(
        [
            ("S", vec!["a"]),
            ("S", vec!["A", "B"]),
            ("A", vec!["a", "b", "a"]),
            ("B", vec!["B", "b"]),
        ],
        None,
    )
    .unwrap();
    let plain = CnfConverter::new().convert(grammar.clone()).unwrap();
    let repruned = CnfConverter::with_config(ConversionConfig {
        reprune_after_productivity: true,
        ..ConversionConfig::default()
    })
    .convert(grammar.clone())
    .unwrap();

    assert!(repruned.nonterminals().len() < plain.nonterminals().len());
    assert!(equivalent_up_to(&plain, &repruned, 5));
    assert!(equivalent_up_to(&grammar, &repruned, 5));
}

#[test]
fn test_empty_language_converts() {
    let grammar = Grammar::from_pairs([("S", vec!["a", "S"]), ("S", vec!["S", "S"])], None)
        .unwrap();
    let cnf = CnfConverter::new().convert(grammar).unwrap();

    assert_eq!(cnf.nonterminals().iter().collect::<Vec<_>>(), ["S"]);
    assert_eq!(cnf.production_count(), 0);
    assert!(bounded_language(&cnf, 5).is_empty());
}

#[test]
fn test_load_from_file_and_convert() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let grammar_content = r#"
        # Test comment
        <S> ::= [a, <B>]
          | [<A>, <C>]
        <A> ::= [a]
        <A> ::= [<A>, <C>, <S>, <C>]
        <A> ::= [<B>, <C>]
        <B> ::= [b]
        <B> ::= [a, <A>]
        <C> ::= [<B>, <A>]
        <C> ::= [ε]
        <E> ::= [b, <B>]
        "#;
    file.write_all(grammar_content.as_bytes()).unwrap();

    let grammar = Grammar::from_file(file.path(), None).unwrap();
    assert_eq!(grammar, reference_grammar());

    let trace = CnfConverter::new().convert_with_trace(grammar).unwrap();
    assert_eq!(
        trace.after(Stage::InaccessibleElimination).map(|g| g.has_non_terminal("E")),
        Some(false)
    );
    assert_cnf_shape(trace.result());
}

#[test]
fn test_load_json_with_start_override() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grammar.json");
    let mut file = File::create(&path).unwrap();
    write!(
        file,
        r#"{{"start": "S", "productions": [["S", ["T", "+", "S"]], ["S", ["T"]], ["T", ["x"]]]}}"#
    )
    .unwrap();
    drop(file);

    let json = std::fs::read_to_string(&path).unwrap();
    let from_s = Grammar::from_json(&json, None).unwrap();
    let from_t = Grammar::from_json(&json, Some("T")).unwrap();

    assert_eq!(from_s.start_symbol(), "S");
    assert_eq!(from_t.start_symbol(), "T");

    let cnf = CnfConverter::new().convert(from_t).unwrap();
    assert_eq!(cnf.nonterminals().iter().collect::<Vec<_>>(), ["T"]);
    assert_eq!(cnf.terminals().iter().collect::<Vec<_>>(), ["x"]);
}

#[test]
fn test_malformed_grammar_aborts_before_conversion() {
    let err = Grammar::from_text("<S> ::= [a, <Missing>]\n", None).unwrap_err();
    match err {
        GrammarError::MalformedGrammar { production, reason } => {
            assert!(production.contains("S"));
            assert!(reason.contains("Missing"));
        }
        other => panic!("Expected MalformedGrammar, got {:?}", other),
    }

    let err = Grammar::from_pairs([("A", vec!["a"])], Some("S")).unwrap_err();
    assert!(err.is_user_error());
    assert!(err.to_string().contains("start symbol"));
}

#[test]
fn test_rendering_of_converted_grammar() {
    let grammar = Grammar::from_pairs([("S", vec!["a", "S", "b"]), ("S", vec!["a", "b"])], None)
        .unwrap();
    let cnf = CnfConverter::new().convert(grammar).unwrap();

    let expected = "\
G = (VN, VT, P, S)
VN = {S, T_a, T_b, N0}
VT = {a, b}
Start Symbol = S
Productions:
1. S → N0T_b
2. S → T_aT_b
3. T_a → a
4. T_b → b
5. N0 → T_aS
";
    assert_eq!(cnf.to_string(), expected);
}
