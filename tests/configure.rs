use std::cell::RefCell;

use cdl::{compile, CdlError, CompiledTemplate, Configured, Configurator, EnumType, ErrorKind, Segment, Template};
use serde_json::{json, Value};

fn server() -> CompiledTemplate {
    compile(
        &Template::new()
            .with("/", "{}listen workers ratio? name? tags?* level?")
            .with("listen", "ipport")
            .with("workers", "integer")
            .with("ratio", "number")
            .with("name", "string")
            .with("tags", "string")
            .with("level", EnumType::new(["debug", "info", "warn"])),
    )
    .unwrap()
}

#[test]
fn destinations_receive_coerced_values() {
    let ct = server();
    let doc = json!({
        "listen": "127.0.0.1:9000",
        "workers": 8.0,
        "ratio": 2,
        "name": "edge",
        "level": "warn",
    });

    let mut listen = String::new();
    let mut workers = 0i64;
    let mut ratio = 0.0f64;
    let mut name = Value::Null;
    let own_levels = EnumType::new(["info", "warn"]);
    let mut level = own_levels.instantiate("info").unwrap();

    let mut configurator = Configurator::new()
        .assign("listen", &mut listen)
        .assign("workers", &mut workers)
        .assign("ratio", &mut ratio)
        .assign("name", &mut name)
        .assign("level", &mut level);
    ct.validate_and_configure(&doc, &mut configurator).unwrap();
    drop(configurator);

    assert_eq!(listen, "127.0.0.1:9000");
    assert_eq!(workers, 8);
    assert_eq!(ratio, 2.0);
    assert_eq!(name, json!("edge"));
    assert_eq!(level.as_str(), "warn");
}

#[test]
fn mismatched_destination_is_left_untouched() {
    let ct = server();
    let mut workers = String::from("unchanged");
    let err = ct
        .validate_and_configure(
            &json!({"listen": ":80", "workers": 3}),
            &mut Configurator::new().assign("workers", &mut workers),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadType);
    assert_eq!(err.supplementary(), Some("at configuration got i64 expected string"));
    assert_eq!(err.context(), [Segment::Key("workers".into())]);
    assert_eq!(workers, "unchanged");
}

#[test]
fn enum_destination_checks_its_own_type() {
    let ct = server();
    let own_levels = EnumType::new(["info", "warn"]);
    let mut level = own_levels.instantiate("info").unwrap();
    let err = ct
        .validate_and_configure(
            &json!({"listen": ":80", "workers": 1, "level": "debug"}),
            &mut Configurator::new().assign("level", &mut level),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadEnumValue);
    assert_eq!(level.as_str(), "info");
}

#[test]
fn enum_destination_takes_raw_tokens() {
    let ct = server();
    let colours = EnumType::new(["edge", "core"]);
    let mut role = colours.instantiate("core").unwrap();
    ct.validate_and_configure(
        &json!({"listen": ":80", "workers": 1, "name": "edge"}),
        &mut Configurator::new().assign("name", &mut role),
    )
    .unwrap();
    assert_eq!(role.as_str(), "edge");
}

#[test]
fn handlers_for_unknown_rules_are_rejected_up_front() {
    let ct = server();
    let fired = RefCell::new(0);
    let err = ct
        .validate_and_configure(
            &json!({"listen": ":80", "workers": 1}),
            &mut Configurator::new()
                .callback("workers", |_, _| {
                    *fired.borrow_mut() += 1;
                    Ok(())
                })
                .callback("threads", |_, _| Ok(())),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadConfigurator);
    assert_eq!(*fired.borrow(), 0);
}

#[test]
fn callbacks_fire_bottom_up_once_per_node() {
    let ct = compile(
        &Template::new()
            .with("/", "{}a b")
            .with("a", "{}c")
            .with("c", "string")
            .with("b", "[]d")
            .with("d", "integer"),
    )
    .unwrap();
    let seen = RefCell::new(Vec::<String>::new());
    let mut configurator = Configurator::new();
    for rule in ["/", "a", "b", "c", "d"] {
        let seen = &seen;
        configurator = configurator.callback(rule, move |value: Configured<'_>, path| {
            seen.borrow_mut().push(format!("{rule} {path} {}", value.to_value()));
            Ok(())
        });
    }
    ct.validate_and_configure(&json!({"a": {"c": "x"}, "b": [1, 2.0]}), &mut configurator)
        .unwrap();
    drop(configurator);

    assert_eq!(
        seen.into_inner(),
        [
            r#"c /a/c "x""#,
            r#"a /a {"c":"x"}"#,
            "d /b/0 1",
            "d /b/1 2",
            r#"b /b [1,2.0]"#,
            r#"/ / {"a":{"c":"x"},"b":[1,2.0]}"#,
        ]
    );
}

#[test]
fn map_child_arrays_configure_each_element() {
    let ct = server();
    let tags = RefCell::new(Vec::new());
    ct.validate_and_configure(
        &json!({"listen": ":80", "workers": 1, "tags": ["a", "b"]}),
        &mut Configurator::new().callback("tags", |value, path| {
            tags.borrow_mut().push((value.as_str().unwrap().to_string(), path.to_string()));
            Ok(())
        }),
    )
    .unwrap();
    assert_eq!(tags.into_inner(), [("a".to_string(), "/tags/0".to_string()), ("b".to_string(), "/tags/1".to_string())]);
}

#[test]
fn callback_errors_carry_context() {
    let ct = server();
    let err = ct
        .validate_and_configure(
            &json!({"listen": ":80", "workers": 1, "tags": ["a", "reserved"]}),
            &mut Configurator::new().callback("tags", |value, _| match value.as_str() {
                Some("reserved") => Err(CdlError::new(ErrorKind::BadValue).with_supplementary("reserved tag")),
                _ => Ok(()),
            }),
        )
        .unwrap_err();
    assert_eq!(err.to_string(), "Bad value; reserved tag (code ErrBadValue) near index 1 at 'tags'");
}

#[test]
fn configuration_stops_at_first_failure() {
    let ct = server();
    let mut workers = 0i64;
    let err = ct
        .validate_and_configure(
            &json!({"workers": 5, "listen": "nope"}),
            &mut Configurator::new().assign("workers", &mut workers),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadType);
    // workers came first in the document, so it was already written
    assert_eq!(workers, 5);
}
