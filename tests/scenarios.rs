#[cfg(test)]
mod tests {
    use symtree::{Expression, Inputs, Number, SymError, Tree, VarKind};

    fn x() -> Expression {
        Expression::variable("x")
    }

    #[test]
    fn integer_sum_folds() {
        let mut e = Expression::sum([Expression::integer(10), Expression::integer(1)]);
        e.simplify().unwrap();
        assert!(matches!(e.as_number(), Some(Number::Integer(11))));
    }

    #[test]
    fn repeated_factor_collects_to_power() {
        let mut e = Expression::product([x(), x(), x()]);
        e.collect().unwrap();
        assert_eq!(e, Expression::pow(x(), Expression::integer(3)));
    }

    #[test]
    fn integer_power_folds() {
        let e = Expression::pow(Expression::integer(2), Expression::integer(10))
            .simplified()
            .unwrap();
        assert!(matches!(e.as_number(), Some(Number::Integer(1024))));
    }

    #[test]
    fn logarithm_of_power_to_same_base() {
        let y = Expression::variable("y");
        let e = Expression::log(Expression::pow(x(), y.clone()), x())
            .simplified()
            .unwrap();
        assert_eq!(e, y);
    }

    #[test]
    fn satisfied_equation_has_zero_slack() {
        let mut e = Expression::equal(x(), x());
        // Without inputs the slot of x cannot be read.
        e.put_indexes();
        assert!(matches!(
            e.evaluate(&Inputs::default()),
            Err(SymError::IndexOutOfRange { slot: 0, len: 0, .. })
        ));
        assert_eq!(e.evaluate(&Inputs::reals(&[-2.5])).unwrap(), 0.0);
        assert!(e.truth().unwrap());
    }

    #[test]
    fn repeated_int_variable_shares_slot() {
        let n = Expression::typed_variable("n", VarKind::Int);
        let mut e = Expression::sum([
            Expression::product([n.clone(), x()]),
            Expression::sin(n),
        ]);
        let slots = e.put_indexes();
        assert_eq!(slots.slot(VarKind::Int, "n"), Some(0));
        assert_eq!(slots.len(VarKind::Int), 1);

        let mut seen = Vec::new();
        e.preorder(&mut |node| {
            if let Some(v) = node.as_variable() {
                if v.kind() == VarKind::Int {
                    seen.push(v.slot());
                }
            }
        });
        assert_eq!(seen, vec![Some(0), Some(0)]);
    }

    #[test]
    fn parsed_rastrigin_round_trip() {
        let mut e: Expression =
            "(+ 20 (pow x 2) (* -10 (cos (* 2 pi x))) (pow y 2) (* -10 (cos (* 2 pi y))))"
                .parse()
                .unwrap();
        e.put_indexes();
        assert_eq!(e.evaluate(&Inputs::reals(&[0.0, 0.0])).unwrap(), 0.0);
        let json = serde_json::to_string(&e).unwrap();
        let back: Expression = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
        assert_eq!(back.evaluate(&Inputs::reals(&[0.0, 0.0])).unwrap(), 0.0);
    }
}
