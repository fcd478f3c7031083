#![cfg(test)]

use std::cell::Cell;
use std::rc::Rc;

use crate::container::{Argument, ContainerError, ServiceDefinition};
use crate::http::Request;
use crate::kernel::error::Error;
use crate::logger::Logger;
use crate::kernel::constants::LOGGER_SERVICE;
use crate::tests::integration::common::{DemoApp, ROUTES, app_tree};

#[derive(Debug)]
struct Mailer {
    transport: String,
    logger: Option<Rc<Logger>>,
}

#[derive(Debug)]
struct TwigExtension(&'static str);

#[derive(Debug)]
struct Node;

#[test]
fn test_app_services_are_lazy_singletons() {
    let tree = app_tree(ROUTES);
    let built = Rc::new(Cell::new(0));
    let counter = built.clone();
    let mut kernel = DemoApp::new(tree.path())
        .with_services(move |container| {
            let counter = counter.clone();
            container.register(
                ServiceDefinition::new("mailer", move |args| {
                    counter.set(counter.get() + 1);
                    Ok(Mailer {
                        transport: args.string(0).unwrap_or("sendmail").to_string(),
                        logger: args.service::<Logger>(1)?,
                    })
                })
                .with_arguments(vec![Argument::config("mailer.transport"), Argument::service(LOGGER_SERVICE)]),
            );
            Ok(())
        })
        .kernel();
    kernel.boot().unwrap();
    assert_eq!(built.get(), 0, "services are built on first use");

    let container = kernel.container();
    let first = container.require::<Mailer>("mailer").unwrap();
    let second = container.require::<Mailer>("mailer").unwrap();
    assert!(Rc::ptr_eq(&first, &second));
    assert_eq!(built.get(), 1);
    assert_eq!(first.transport, "smtp");
    assert!(first.logger.as_ref().is_some_and(|logger| Rc::ptr_eq(logger, kernel.logger())));
}

#[test]
fn test_unknown_service_is_none() {
    let tree = app_tree(ROUTES);
    let mut kernel = DemoApp::new(tree.path()).kernel();
    kernel.boot().unwrap();

    assert!(kernel.container().get::<Mailer>("mailer").unwrap().is_none());
    assert!(kernel.container().get_service("nothing.at.all").unwrap().is_none());
}

#[test]
fn test_wildcard_collects_extensions() {
    let tree = app_tree(ROUTES);
    let mut kernel = DemoApp::new(tree.path())
        .with_services(|container| {
            container.register(ServiceDefinition::new("twig.extension.text", |_args| Ok(TwigExtension("text"))));
            container.register(ServiceDefinition::new("twig.loader", |_args| Ok(TwigExtension("loader"))));
            container.register(ServiceDefinition::new("twig.extension.intl", |_args| Ok(TwigExtension("intl"))));
            container.register(ServiceDefinition::new("twig.extension.debug.dump", |_args| Ok(TwigExtension("dump"))));
            Ok(())
        })
        .kernel();
    kernel.boot().unwrap();

    let extensions = kernel.container().get_matching_as::<TwigExtension>("twig.extension.*").unwrap();
    let names: Vec<&str> = extensions.iter().map(|extension| extension.0).collect();
    assert_eq!(names, vec!["text", "intl"]);
}

#[test]
fn test_circular_services_fail_the_request() {
    let tree = app_tree(ROUTES);
    let mut kernel = DemoApp::new(tree.path())
        .with_services(|container| {
            container.register(
                ServiceDefinition::new("node.a", |_args| Ok(Node)).with_arguments(vec![Argument::service("node.b")]),
            );
            container.register(
                ServiceDefinition::new("node.b", |_args| Ok(Node)).with_arguments(vec![Argument::service("node.a")]),
            );
            Ok(())
        })
        .kernel();
    kernel.handle(Request::create("/", "GET", &[])).unwrap();

    match kernel.container().get::<Node>("node.a") {
        Err(Error::Container(ContainerError::CircularReference { name })) => assert_eq!(name, "node.a"),
        other => panic!("Expected CircularReference, got {:?}", other),
    }
}
