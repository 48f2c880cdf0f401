use crate::builtin;
use crate::domain::{Eval, FiniteSet, TypeSet, Types};
use crate::evaluator::Evaluator;
use crate::model::{Arguments, Function, FunctionId, Method, MethodKind, Node, Program, Value};
use crate::specializer::Specializer;
use crate::Error;
use std::collections::{BTreeMap, BTreeSet};

fn truth() -> Node {
    Node::literal(Value::Boolean(true))
}

fn binop(builtin: crate::model::BuiltinMethod, a: Node, b: Node) -> Node {
    Node::builtin(builtin, vec![("a", a), ("b", b)])
}

fn abstract_arguments<V>(values: Vec<(&str, V)>) -> BTreeMap<String, V> {
    values
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

fn incr(program: &mut Program) -> FunctionId {
    program.add(Function::new(
        Some("incr"),
        vec![("value", Value::integer(1))],
        vec![Method::new(
            truth(),
            binop(builtin::i_add(), Node::variable("number"), Node::variable("value")),
        )
        .into()],
    ))
}

fn mul_if_less(program: &mut Program) -> FunctionId {
    let number = Node::variable("number");
    let constant = Node::variable("const");
    program.add(Function::new(
        Some("mul_if_less"),
        vec![("const", Value::integer(10))],
        vec![
            Method::new(
                binop(builtin::i_lt(), number.clone(), constant.clone()),
                binop(builtin::i_mul(), number.clone(), constant.clone()),
            )
            .into(),
            Method::new(
                binop(builtin::i_ge(), number.clone(), constant),
                Node::builtin(builtin::load(), vec![("a", number)]),
            )
            .into(),
        ],
    ))
}

/// Element-wise sum of two vectors.
fn vector_sum(program: &mut Program) -> FunctionId {
    let body = program.add(Function::new(
        Some("add_append"),
        vec![],
        vec![Method::new(
            truth(),
            binop(
                builtin::append(),
                Node::variable("acc"),
                binop(builtin::i_add(), Node::variable("a"), Node::variable("b")),
            ),
        )
        .into()],
    ));

    program.add(Function::new(
        Some("vector_sum"),
        vec![],
        vec![Method::new(
            truth(),
            Node::reduce(
                body,
                ("acc", Node::literal(Value::tuple(vec![]))),
                vec![("a", Node::variable("avector")), ("b", Node::variable("bvector"))],
                vec![],
            ),
        )
        .into()],
    ))
}

/// `factorial(n) = if n <= 1 then 1 else n * factorial(n - 1)`
fn factorial(program: &mut Program) -> FunctionId {
    let id = program.declare();
    let n = Node::variable("n");
    let one = Node::variable("one");
    program
        .define(
            id,
            Function::new(
                Some("factorial"),
                vec![("one", Value::integer(1))],
                vec![
                    Method::new(binop(builtin::i_le(), n.clone(), one.clone()), one.clone()).into(),
                    Method::new(
                        binop(builtin::i_gt(), n.clone(), one.clone()),
                        binop(
                            builtin::i_mul(),
                            n.clone(),
                            Node::call(id, vec![("n", binop(builtin::i_sub(), n, one))]),
                        ),
                    )
                    .into(),
                ],
            ),
        )
        .unwrap();
    id
}

/// Progressive taxation, with the upper bracket recursing into the lower.
fn progressive_tax(program: &mut Program) -> FunctionId {
    let id = program.declare();
    let income = Node::variable("income");
    let x1 = Node::variable("x1");
    program
        .define(
            id,
            Function::new(
                Some("tax"),
                vec![
                    ("x1", Value::real(300000.0)),
                    ("x2", Value::real(0.60)),
                    ("x3", Value::real(0.40)),
                ],
                vec![
                    Method::new(
                        binop(builtin::r_le(), income.clone(), x1.clone()),
                        binop(builtin::r_mul(), income.clone(), Node::variable("x3")),
                    )
                    .into(),
                    Method::new(
                        binop(builtin::r_gt(), income.clone(), x1.clone()),
                        binop(
                            builtin::r_add(),
                            binop(
                                builtin::r_mul(),
                                binop(builtin::r_sub(), income, x1.clone()),
                                Node::variable("x2"),
                            ),
                            Node::call(id, vec![("income", x1)]),
                        ),
                    )
                    .into(),
                ],
            ),
        )
        .unwrap();
    id
}

#[test]
fn incr_concrete() {
    let mut program = Program::new();
    let incr = incr(&mut program);
    let evaluator = Evaluator::new(&program, Eval);

    for (number, expected) in vec![(2, 3), (10, 11)] {
        let arguments = Arguments::from(vec![("number", Value::integer(number))]);
        assert_eq!(
            evaluator.evaluate(incr, &arguments).unwrap(),
            Some(Value::integer(expected))
        );
    }
}

#[test]
fn incr_from_json() {
    let mut program = Program::new();
    let incr = incr(&mut program);
    let evaluator = Evaluator::new(&program, Eval);

    let arguments = Arguments::from_json(r#"{"number": 41}"#).unwrap();
    assert_eq!(
        evaluator.evaluate(incr, &arguments).unwrap(),
        Some(Value::integer(42))
    );
}

#[test]
fn mul_if_less_concrete() {
    let mut program = Program::new();
    let mul_if_less = mul_if_less(&mut program);
    let evaluator = Evaluator::new(&program, Eval);

    let cases = vec![
        (Value::integer(2), Value::integer(20)),
        (Value::real(2.0), Value::real(20.0)),
        (Value::integer(10), Value::integer(10)),
    ];
    for (number, expected) in cases {
        let arguments = Arguments::from(vec![("number", number)]);
        assert_eq!(
            evaluator.evaluate(mul_if_less, &arguments).unwrap(),
            Some(expected)
        );
    }
}

#[test]
fn mul_if_less_types() {
    let mut program = Program::new();
    let mul_if_less = mul_if_less(&mut program);
    let evaluator = Evaluator::new(&program, TypeSet);

    assert_eq!(
        evaluator
            .evaluate_abstract(mul_if_less, abstract_arguments(vec![("number", Types::INTEGER)]))
            .unwrap(),
        Types::INTEGER
    );
    assert_eq!(
        evaluator
            .evaluate_abstract(mul_if_less, abstract_arguments(vec![("number", Types::REAL)]))
            .unwrap(),
        Types::empty()
    );
}

#[test]
fn mul_if_less_finite_sets() {
    let mut program = Program::new();
    let mul_if_less = mul_if_less(&mut program);
    let evaluator = Evaluator::new(&program, FiniteSet);

    let numbers: BTreeSet<Value> = vec![Value::integer(2)].into_iter().collect();
    let result = evaluator
        .evaluate_abstract(mul_if_less, abstract_arguments(vec![("number", numbers)]))
        .unwrap();
    let expected: BTreeSet<Value> = vec![Value::integer(20)].into_iter().collect();
    assert_eq!(result, expected);

    // Neither guard is certain, so neither method contributes.
    let numbers: BTreeSet<Value> = vec![Value::integer(2), Value::integer(12)]
        .into_iter()
        .collect();
    let result = evaluator
        .evaluate_abstract(mul_if_less, abstract_arguments(vec![("number", numbers)]))
        .unwrap();
    assert!(result.is_empty());
}

#[test]
fn specialize_mul_if_less() {
    let mut program = Program::new();
    let mul_if_less = mul_if_less(&mut program);
    let specializer = Specializer::new(&program, FiniteSet);

    let specialized = specializer
        .specialize(mul_if_less, &Arguments::from(vec![("number", Value::integer(10))]))
        .unwrap();
    let methods = specialized.entry().unwrap().methods();
    assert_eq!(methods.len(), 1);
    match methods[0] {
        MethodKind::Guarded(ref method) => assert_eq!(
            method.statement(),
            &Node::builtin(builtin::load(), vec![("a", Node::variable("number"))])
        ),
        ref other => panic!("expected a guarded method, got {}", other),
    }

    let specialized = specializer
        .specialize(mul_if_less, &Arguments::from(vec![("number", Value::integer(9))]))
        .unwrap();
    let methods = specialized.entry().unwrap().methods();
    assert_eq!(methods.len(), 1);
    match methods[0] {
        MethodKind::Guarded(ref method) => assert_eq!(
            method.statement(),
            &binop(builtin::i_mul(), Node::variable("number"), Node::variable("const"))
        ),
        ref other => panic!("expected a guarded method, got {}", other),
    }
}

#[test]
fn specialize_is_idempotent() {
    let mut program = Program::new();
    let mul_if_less = mul_if_less(&mut program);
    let arguments = Arguments::from(vec![("number", Value::integer(3))]);

    let once = Specializer::new(&program, FiniteSet)
        .specialize(mul_if_less, &arguments)
        .unwrap();
    let twice = Specializer::new(once.program(), FiniteSet)
        .specialize(once.function(), &arguments)
        .unwrap();
    assert_eq!(once, twice);
}

#[test]
fn specialize_without_admissible_methods() {
    let mut program = Program::new();
    let mul_if_less = mul_if_less(&mut program);
    let specializer = Specializer::new(&program, TypeSet);

    assert!(matches!(
        specializer.specialize_abstract(
            mul_if_less,
            abstract_arguments(vec![("number", Types::REAL)])
        ),
        Err(Error::FunctionNotValid(_))
    ));
}

#[test]
fn bad_bound() {
    let mut program = Program::new();
    let incr = incr(&mut program);
    let evaluator = Evaluator::new(&program, Eval);

    let arguments = Arguments::from(vec![
        ("number", Value::integer(1)),
        ("extra", Value::integer(2)),
    ]);
    assert!(matches!(
        evaluator.evaluate(incr, &arguments),
        Err(Error::BadBound { .. })
    ));
}

#[test]
fn vector_sum_concrete() {
    let mut program = Program::new();
    let vector_sum = vector_sum(&mut program);
    let evaluator = Evaluator::new(&program, Eval);

    let integers =
        |values: Vec<i64>| Value::tuple(values.into_iter().map(Value::integer).collect());

    let arguments = Arguments::from(vec![
        ("avector", integers(vec![1, 2, 3])),
        ("bvector", integers(vec![5, 0, -1])),
    ]);
    assert_eq!(
        evaluator.evaluate(vector_sum, &arguments).unwrap(),
        Some(integers(vec![6, 2, 2]))
    );

    let empty = Arguments::from(vec![("avector", integers(vec![])), ("bvector", integers(vec![]))]);
    assert_eq!(
        evaluator.evaluate(vector_sum, &empty).unwrap(),
        Some(integers(vec![]))
    );
}

#[test]
fn vector_sum_finite_sets() {
    let mut program = Program::new();
    let vector_sum = vector_sum(&mut program);
    let evaluator = Evaluator::new(&program, FiniteSet);

    let arguments =
        Arguments::from_json(r#"{"avector": [1, 2, 3], "bvector": [5, 0, -1]}"#).unwrap();
    let expected: BTreeSet<Value> = vec![Value::tuple(vec![
        Value::integer(6),
        Value::integer(2),
        Value::integer(2),
    ])]
    .into_iter()
    .collect();
    assert_eq!(evaluator.evaluate(vector_sum, &arguments).unwrap(), expected);
}

#[test]
fn vector_sum_types() {
    let mut program = Program::new();
    let vector_sum = vector_sum(&mut program);
    let evaluator = Evaluator::new(&program, TypeSet);

    let arguments = abstract_arguments(vec![("avector", Types::TUPLE), ("bvector", Types::TUPLE)]);
    assert_eq!(
        evaluator.evaluate_abstract(vector_sum, arguments).unwrap(),
        Types::TUPLE
    );
}

#[test]
fn specialize_vector_sum() {
    let mut program = Program::new();
    let vector_sum = vector_sum(&mut program);
    let specializer = Specializer::new(&program, Eval);

    let arguments = Arguments::from_json(r#"{"avector": [1, 2], "bvector": [3, 4]}"#).unwrap();
    let specialized = specializer.specialize(vector_sum, &arguments).unwrap();
    // The entry and one residual body, shared by every step of the fold.
    assert_eq!(specialized.program().len(), 2);

    let evaluator = Evaluator::new(specialized.program(), Eval);
    assert_eq!(
        evaluator.evaluate(specialized.function(), &arguments).unwrap(),
        Some(Value::tuple(vec![Value::integer(4), Value::integer(6)]))
    );

    // Empty collections never reach the body, which is copied whole.
    let empty = Arguments::from_json(r#"{"avector": [], "bvector": []}"#).unwrap();
    let specialized = specializer.specialize(vector_sum, &empty).unwrap();
    assert_eq!(specialized.program().len(), 2);
}

#[test]
fn recursion_matches_direct_computation() {
    let mut program = Program::new();
    let factorial = factorial(&mut program);
    let evaluator = Evaluator::new(&program, Eval);

    for n in 0..10i64 {
        let expected: i64 = (1..=n).product();
        let arguments = Arguments::from(vec![("n", Value::integer(n))]);
        assert_eq!(
            evaluator.evaluate(factorial, &arguments).unwrap(),
            Some(Value::integer(expected))
        );
    }
}

#[test]
fn recursion_reaches_fixed_point_within_lattice_height() {
    let mut program = Program::new();
    let factorial = factorial(&mut program);
    let evaluator = Evaluator::new(&program, TypeSet);

    let (result, statistics) = evaluator
        .run(factorial, abstract_arguments(vec![("n", Types::INTEGER)]))
        .unwrap();
    assert_eq!(result, Types::INTEGER);
    assert!(statistics.iterations <= 3);
}

#[test]
fn tax() {
    let mut program = Program::new();
    let tax = progressive_tax(&mut program);

    let evaluator = Evaluator::new(&program, Eval);
    for (income, expected) in vec![(200000.0, 80000.0), (400000.0, 180000.0)] {
        let arguments = Arguments::from(vec![("income", Value::real(income))]);
        assert_eq!(
            evaluator.evaluate(tax, &arguments).unwrap(),
            Some(Value::real(expected))
        );
    }

    let evaluator = Evaluator::new(&program, TypeSet);
    assert_eq!(
        evaluator
            .evaluate_abstract(tax, abstract_arguments(vec![("income", Types::REAL)]))
            .unwrap(),
        Types::REAL
    );

    // Above the lower bracket, both methods are needed: one directly and one
    // through the recursive call.
    let specialized = Specializer::new(&program, Eval)
        .specialize(tax, &Arguments::from(vec![("income", Value::real(400000.0))]))
        .unwrap();
    assert_eq!(specialized.program().len(), 2);
    let entry = specialized.entry().unwrap();
    assert_eq!(entry.methods().len(), 1);
}

#[test]
fn separately_built_subgraphs_are_shared() {
    fn doubling(depth: usize) -> Node {
        let mut node = Node::variable("x");
        for _ in 0..depth {
            node = binop(builtin::i_add(), node.clone(), node);
        }
        node
    }

    let mut program = Program::new();
    let difference = program.add(Function::new(
        Some("difference"),
        vec![],
        vec![Method::new(truth(), binop(builtin::i_sub(), doubling(64), doubling(64))).into()],
    ));

    let evaluator = Evaluator::new(&program, Eval);
    let result = evaluator
        .evaluate(difference, &Arguments::from(vec![("x", Value::integer(1))]))
        .unwrap();
    assert_eq!(result, Some(Value::integer(0)));
}
