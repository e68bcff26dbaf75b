//! Control-flow protocol tests: loops, non-local transfers, and
//! `try`/`catch`/`finally`.

use super::build::*;
use crate::Value;

mod loops {
    use super::*;
    use lode_ir::{AssignOp, BinaryOp};
    use pretty_assertions::assert_eq;

    #[test]
    fn while_with_a_false_test_never_runs() {
        let b = Builder::new();
        let result = b.run_number(vec![
            b.set("x", num(0.0)),
            while_loop(truth(false), vec![b.set("x", num(1.0))]),
            ret(b.ident("x")),
        ]);
        assert_eq!(result, 0.0);
    }

    #[test]
    fn while_runs_until_the_test_fails() {
        let b = Builder::new();
        let result = b.run_number(vec![
            b.set("i", num(0.0)),
            while_loop(
                binary(b.ident("i"), BinaryOp::Lt, num(5.0)),
                vec![expr(assign(b.ident("i"), AssignOp::AddAssign, num(1.0)))],
            ),
            ret(b.ident("i")),
        ]);
        assert_eq!(result, 5.0);
    }

    #[test]
    fn loop_statements_complete_with_nil() {
        let b = Builder::new();
        assert_eq!(b.run_ok(vec![while_loop(truth(false), vec![])]), Value::Nil);
        assert_eq!(
            b.run_ok(vec![while_loop(truth(true), vec![brk()])]),
            Value::Nil
        );
    }

    #[test]
    fn do_while_runs_the_body_at_least_once() {
        let b = Builder::new();
        let result = b.run_number(vec![
            b.set("x", num(0.0)),
            do_while(
                vec![expr(assign(b.ident("x"), AssignOp::AddAssign, num(1.0)))],
                truth(false),
            ),
            ret(b.ident("x")),
        ]);
        assert_eq!(result, 1.0);
    }

    #[test]
    fn break_exits_a_do_while_before_the_test() {
        let b = Builder::new();
        let result = b.run_number(vec![
            b.set("x", num(0.0)),
            do_while(
                vec![
                    expr(assign(b.ident("x"), AssignOp::AddAssign, num(1.0))),
                    brk(),
                ],
                truth(true),
            ),
            ret(b.ident("x")),
        ]);
        assert_eq!(result, 1.0);
    }

    #[test]
    fn for_loop_threads_init_test_and_update() {
        let b = Builder::new();
        let result = b.run_number(vec![
            b.set("s", num(0.0)),
            for_loop(
                assign(b.ident("i"), AssignOp::Assign, num(0.0)),
                binary(b.ident("i"), BinaryOp::Lt, num(5.0)),
                assign(b.ident("i"), AssignOp::AddAssign, num(1.0)),
                vec![expr(assign(
                    b.ident("s"),
                    AssignOp::AddAssign,
                    b.ident("i"),
                ))],
            ),
            ret(b.ident("s")),
        ]);
        assert_eq!(result, 10.0);
    }

    #[test]
    fn for_init_binding_is_loop_local() {
        let b = Builder::new();
        let message = b.run_err(vec![
            for_loop(
                assign(b.ident("i"), AssignOp::Assign, num(0.0)),
                binary(b.ident("i"), BinaryOp::Lt, num(3.0)),
                assign(b.ident("i"), AssignOp::AddAssign, num(1.0)),
                vec![],
            ),
            ret(b.ident("i")),
        ]);
        assert!(message.starts_with("ReferenceError"), "got: {message}");
    }

    #[test]
    fn break_stops_the_innermost_loop_only() {
        let b = Builder::new();
        let inner = for_loop(
            assign(b.ident("j"), AssignOp::Assign, num(0.0)),
            binary(b.ident("j"), BinaryOp::Lt, num(3.0)),
            assign(b.ident("j"), AssignOp::AddAssign, num(1.0)),
            vec![
                if_then(binary(b.ident("j"), BinaryOp::Eq, num(1.0)), vec![brk()]),
                expr(assign(b.ident("count"), AssignOp::AddAssign, num(1.0))),
            ],
        );
        let result = b.run_number(vec![
            b.set("count", num(0.0)),
            for_loop(
                assign(b.ident("i"), AssignOp::Assign, num(0.0)),
                binary(b.ident("i"), BinaryOp::Lt, num(3.0)),
                assign(b.ident("i"), AssignOp::AddAssign, num(1.0)),
                vec![inner],
            ),
            ret(b.ident("count")),
        ]);
        assert_eq!(result, 3.0);
    }

    #[test]
    fn continue_skips_the_rest_of_the_iteration() {
        let b = Builder::new();
        let result = b.run_number(vec![
            b.set("i", num(0.0)),
            b.set("s", num(0.0)),
            while_loop(
                binary(b.ident("i"), BinaryOp::Lt, num(5.0)),
                vec![
                    expr(assign(b.ident("i"), AssignOp::AddAssign, num(1.0))),
                    if_then(binary(b.ident("i"), BinaryOp::Eq, num(2.0)), vec![cont()]),
                    expr(assign(b.ident("s"), AssignOp::AddAssign, b.ident("i"))),
                ],
            ),
            ret(b.ident("s")),
        ]);
        assert_eq!(result, 13.0);
    }

    #[test]
    fn continue_in_a_for_loop_still_runs_the_update() {
        let b = Builder::new();
        let result = b.run_number(vec![
            b.set("s", num(0.0)),
            for_loop(
                assign(b.ident("i"), AssignOp::Assign, num(0.0)),
                binary(b.ident("i"), BinaryOp::Lt, num(3.0)),
                assign(b.ident("i"), AssignOp::AddAssign, num(1.0)),
                vec![
                    if_then(binary(b.ident("i"), BinaryOp::Eq, num(0.0)), vec![cont()]),
                    expr(assign(b.ident("s"), AssignOp::AddAssign, num(1.0))),
                ],
            ),
            ret(b.ident("s")),
        ]);
        assert_eq!(result, 2.0);
    }

    #[test]
    fn return_inside_a_loop_exits_the_function() {
        let b = Builder::new();
        let result = b.run_number(vec![
            b.function(
                "f",
                &[],
                vec![
                    while_loop(truth(true), vec![ret(num(7.0))]),
                    ret(num(8.0)),
                ],
            ),
            ret(b.call("f", vec![])),
        ]);
        assert_eq!(result, 7.0);
    }
}

mod exceptions {
    use super::*;
    use crate::{Cell, ExceptionKind};
    use lode_ir::{AssignOp, BinaryOp};
    use pretty_assertions::assert_eq;

    #[test]
    fn catch_binds_the_thrown_value() {
        let b = Builder::new();
        let result = b.run_number(vec![try_catch(
            vec![throw(num(42.0))],
            b.catch("e", vec![ret(b.ident("e"))]),
        )]);
        assert_eq!(result, 42.0);
    }

    #[test]
    fn uncaught_throw_reports_the_payload() {
        let b = Builder::new();
        assert_eq!(b.run_err(vec![throw(num(1.0))]), "1");
    }

    #[test]
    fn catch_may_rethrow() {
        let b = Builder::new();
        let message = b.run_err(vec![try_catch(
            vec![throw(num(1.0))],
            b.catch("e", vec![throw(num(2.0))]),
        )]);
        assert_eq!(message, "2");
    }

    #[test]
    fn operator_faults_are_catchable() {
        let b = Builder::new();
        let result = b.run_number(vec![try_catch(
            vec![expr(binary(num(1.0), BinaryOp::Add, text("x")))],
            b.catch("e", vec![ret(num(99.0))]),
        )]);
        assert_eq!(result, 99.0);
    }

    #[test]
    fn runtime_faults_carry_exception_objects() {
        let b = Builder::new();
        let mut interpreter = b.interpreter();
        let result = interpreter.run(&program(vec![try_catch(
            vec![expr(b.ident("q"))],
            b.catch("e", vec![ret(b.ident("e"))]),
        )]));
        let value = match result {
            Ok(value) => value,
            Err(e) => panic!("expected the handler to run, got: {e}"),
        };
        let exception = value
            .as_handle()
            .and_then(|h| interpreter.heap().get(h))
            .and_then(Cell::as_exception);
        match exception {
            Some(cell) => assert_eq!(cell.kind, ExceptionKind::Reference),
            None => panic!("expected an exception object, got {value:?}"),
        }
    }

    #[test]
    fn catch_parameter_scope_is_fresh() {
        let b = Builder::new();
        let message = b.run_err(vec![
            try_catch(vec![throw(num(1.0))], b.catch("e", vec![expr(num(0.0))])),
            ret(b.ident("e")),
        ]);
        assert!(message.starts_with("ReferenceError"), "got: {message}");
    }

    #[test]
    fn finally_runs_on_normal_completion() {
        let b = Builder::new();
        let result = b.run_number(vec![
            b.set("x", num(0.0)),
            try_finally(
                vec![b.set("x", num(1.0))],
                vec![expr(assign(b.ident("x"), AssignOp::AddAssign, num(10.0)))],
            ),
            ret(b.ident("x")),
        ]);
        assert_eq!(result, 11.0);
    }

    #[test]
    fn finally_runs_after_the_handler() {
        let b = Builder::new();
        let result = b.run_number(vec![
            b.set("x", num(0.0)),
            try_full(
                vec![throw(num(1.0))],
                b.catch("e", vec![b.set("x", num(5.0))]),
                vec![expr(assign(b.ident("x"), AssignOp::AddAssign, num(1.0)))],
            ),
            ret(b.ident("x")),
        ]);
        assert_eq!(result, 6.0);
    }

    #[test]
    fn finally_runs_while_a_throw_is_in_flight() {
        let b = Builder::new();
        let mut interpreter = b.interpreter();
        let result = interpreter.run(&program(vec![
            b.set("x", num(0.0)),
            try_finally(vec![throw(num(5.0))], vec![b.set("x", num(1.0))]),
        ]));
        match result {
            Err(e) => assert_eq!(e.message, "5"),
            Ok(value) => panic!("expected the throw to escape, got {value:?}"),
        }
        let check = interpreter.run(&program(vec![ret(b.ident("x"))]));
        assert!(matches!(check, Ok(Value::Number(n)) if n == 1.0));
    }

    #[test]
    fn finally_return_overrides_the_try_return() {
        let b = Builder::new();
        let result = b.run_number(vec![
            b.function(
                "f",
                &[],
                vec![try_finally(vec![ret(num(1.0))], vec![ret(num(2.0))])],
            ),
            ret(b.call("f", vec![])),
        ]);
        assert_eq!(result, 2.0);
    }

    #[test]
    fn finally_throw_overrides_the_handler_outcome() {
        let b = Builder::new();
        let message = b.run_err(vec![try_full(
            vec![throw(num(1.0))],
            b.catch("e", vec![expr(num(99.0))]),
            vec![throw(num(2.0))],
        )]);
        assert_eq!(message, "2");
    }
}

mod stray_signals {
    use super::*;

    #[test]
    fn top_level_break_is_a_syntax_error() {
        let b = Builder::new();
        let message = b.run_err(vec![brk()]);
        assert!(message.starts_with("SyntaxError"), "got: {message}");
    }

    #[test]
    fn break_at_a_function_boundary_is_a_syntax_error() {
        let b = Builder::new();
        let message = b.run_err(vec![
            b.function("f", &[], vec![brk()]),
            expr(b.call("f", vec![])),
        ]);
        assert_eq!(message, "SyntaxError: break outside of a loop");
    }

    #[test]
    fn continue_at_a_function_boundary_is_a_syntax_error() {
        let b = Builder::new();
        let message = b.run_err(vec![
            b.function("f", &[], vec![cont()]),
            expr(b.call("f", vec![])),
        ]);
        assert_eq!(message, "SyntaxError: continue outside of a loop");
    }
}
