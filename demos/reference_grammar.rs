use cnf_normalizer::language::equivalent_up_to;
use cnf_normalizer::{CnfConverter, Grammar};
use std::error::Error;

/// Convert the reference grammar step by step and check the result
fn main() -> Result<(), Box<dyn Error>> {
    let productions = [
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
    ];

    let grammar = Grammar::from_pairs(productions, Some("S"))?;
    println!("Input is a {}\n", grammar.classify());

    let conversion = CnfConverter::new().convert_with_trace(grammar.clone())?;
    println!("{}", conversion);

    let cnf = conversion.result();
    println!(
        "Languages agree on strings up to length 6: {}",
        equivalent_up_to(&grammar, cnf, 6)
    );

    Ok(())
}
