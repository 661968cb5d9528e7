//! Set statements read back by the interpreter.

use serde_json::json;
use std::sync::Arc;

use ssify::core::RequestContext;
use ssify::directives::{echo_statement, if_statement, set_statement};
use ssify::interpreter::{Interpreter, NoDispatch};

fn interpret(document: &str) -> String {
    Interpreter::new(Arc::new(NoDispatch))
        .process(document, &RequestContext::new("/"))
        .unwrap()
}

const VALUES: &[&str] = &[
    "plain",
    "it's",
    r"back\slash",
    r"trailing\",
    r"\",
    r"\\",
    r"\\\",
    r"\'",
    "'quoted'",
    "",
    "multi\nline",
    "--> sneaky",
];

#[test]
fn escaped_values_round_trip() {
    for value in VALUES {
        let document = format!("{}{}", set_statement("va", &json!(value)), echo_statement("va"));
        assert_eq!(interpret(&document), *value, "{value:?}");
    }
}

#[test]
fn escaped_values_keep_following_directives() {
    for value in VALUES {
        let document = format!(
            "{}{}[{}]<{}>",
            set_statement("va", &json!(value)),
            set_statement("vb", &json!("x")),
            echo_statement("va"),
            echo_statement("vb"),
        );
        assert_eq!(interpret(&document), format!("[{value}]<x>"), "{value:?}");
    }
}

#[test]
fn non_string_values() {
    let document = format!(
        "{}{}|{}{}",
        set_statement("vn", &json!(42)),
        echo_statement("vn"),
        set_statement("vt", &json!(true)),
        echo_statement("vt"),
    );
    assert_eq!(interpret(&document), "42|true");
}

#[test]
fn conditional_on_set_value() {
    for (value, expected) in [("", "no"), ("1", "yes")] {
        let document = format!(
            "{}{}yes<!--#else-->no<!--#endif-->",
            set_statement("va", &json!(value)),
            if_statement("${va}")
        );
        assert_eq!(interpret(&document), expected);
    }
}
