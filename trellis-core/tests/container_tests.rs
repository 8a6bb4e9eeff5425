use std::sync::Arc;
use trellis_core::container::{Arguments, Binding, Injectable, Parameter};
use trellis_core::{Container, Error, Result, Value, abstract_class, injectable};

struct Logger {
    channel: String,
}

impl Injectable for Logger {
    const NAME: &'static str = "app::Logger";

    fn parameters() -> Vec<Parameter> {
        vec![Parameter::string("channel").with_default("app")]
    }

    fn construct(args: Arguments) -> Result<Self> {
        Ok(Logger {
            channel: args.string(0)?,
        })
    }
}

injectable!(Logger);

struct Mailer {
    logger: Arc<Logger>,
    transport: Option<Arc<Logger>>,
}

impl Injectable for Mailer {
    const NAME: &'static str = "app::Mailer";

    fn parameters() -> Vec<Parameter> {
        vec![
            Parameter::of::<Logger>("logger"),
            Parameter::class("transport", "app::Transport").optional(),
        ]
    }

    fn construct(args: Arguments) -> Result<Self> {
        Ok(Mailer {
            logger: args.object(0)?,
            transport: args.optional_object(1)?,
        })
    }
}

injectable!(Mailer);
abstract_class!("app::Transport");

struct Newsletter {
    mailer: Arc<Mailer>,
    transport: Arc<Logger>,
}

impl Injectable for Newsletter {
    const NAME: &'static str = "app::Newsletter";

    fn parameters() -> Vec<Parameter> {
        vec![
            Parameter::of::<Mailer>("mailer"),
            Parameter::class("transport", "app::Transport"),
        ]
    }

    fn construct(args: Arguments) -> Result<Self> {
        Ok(Newsletter {
            mailer: args.object(0)?,
            transport: args.object(1)?,
        })
    }
}

injectable!(Newsletter);

#[test]
fn test_auto_wiring_resolves_dependencies() {
    let container = Container::new();

    let mailer = container.get_as::<Mailer>(Mailer::NAME).unwrap();
    assert_eq!(mailer.logger.channel, "app");
    assert!(mailer.transport.is_none());

    // The dependency is shared through the instance cache
    let logger = container.get_as::<Logger>(Logger::NAME).unwrap();
    assert!(Arc::ptr_eq(&mailer.logger, &logger));
}

#[test]
fn test_get_new_builds_fresh_object_with_shared_dependencies() {
    let container = Container::new();

    let first = container.get_new_as::<Mailer>(Mailer::NAME).unwrap();
    let second = container.get_new_as::<Mailer>(Mailer::NAME).unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&first.logger, &second.logger));
    assert!(!container.has_instance(Mailer::NAME));
}

#[test]
fn test_abstract_dependency_without_binding_fails() {
    let container = Container::new();

    let err = container.get(Newsletter::NAME).unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "Key \"app::Transport\" could not be resolved.");
}

#[test]
fn test_abstract_dependency_bound_to_implementation() {
    let container = Container::new();
    container.set_factory("app::Transport", |_| {
        Ok(Logger {
            channel: "smtp".to_string(),
        })
    });

    let newsletter = container.get_as::<Newsletter>(Newsletter::NAME).unwrap();
    assert_eq!(newsletter.transport.channel, "smtp");
    assert!(newsletter.mailer.transport.is_some());
}

#[test]
fn test_class_binding_and_alias() {
    let container = Container::new();
    container.set_class("logger", Logger::NAME).alias("log", "logger");

    let logger = container.get_as::<Logger>("log").unwrap();
    assert_eq!(logger.channel, "app");
    assert!(Arc::ptr_eq(&logger, &container.get_as::<Logger>("logger").unwrap()));
    assert!(container.has("log"));

    container.unalias("log");
    assert!(!container.has("log"));
}

#[test]
fn test_set_value_accepts_objects_and_class_names() {
    let container = Container::new();

    container
        .set_value("named", Value::from(Logger::NAME))
        .unwrap();
    assert!(matches!(
        Binding::try_from(Value::from(Logger::NAME)).unwrap(),
        Binding::Class(_)
    ));
    assert_eq!(container.get_as::<Logger>("named").unwrap().channel, "app");

    let err = container.set_value("number", Value::from(5)).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[test]
fn test_dynamic_accessors() {
    let container = Container::new();
    container
        .call(
            "setSomeLogger",
            vec![Value::object(Logger {
                channel: "dyn".to_string(),
            })],
        )
        .unwrap();

    let value = container.call("getSomeLogger", vec![]).unwrap().unwrap();
    assert_eq!(value.downcast::<Logger>().unwrap().channel, "dyn");

    let err = container.call("setSomeLogger", vec![]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid argument count[0] for application setSomeLogger()"
    );
    assert!(matches!(
        container.call("fetchSomething", vec![]),
        Err(Error::BadMethodCall(_))
    ));
}

#[test]
fn test_clones_share_state() {
    let container = Container::new();
    let clone = container.clone();

    clone.set_instance("shared", Logger {
        channel: "clone".to_string(),
    });
    assert!(container.has("shared"));

    container.destroy_all_instances();
    assert!(!clone.has_instance(Logger::NAME));
}
