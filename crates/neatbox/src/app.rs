//! The example application served by the `neatbox` binary.
use std::path::PathBuf;

use neatbox_core::container::ContainerAware;
use neatbox_core::event::types::{NoResponseEvent, ResponseEvent};
use neatbox_core::event::{EventDispatcher, EventPriority, EventResult};
use neatbox_core::kernel::constants::{EVENT_DISPATCHER_SERVICE, FRAMEWORK_NAME, FRAMEWORK_VERSION};
use neatbox_core::kernel::{ActionOutput, AppKernel, Controller, ControllerBase, ControllerRegistry, KernelHandle, Package};
use neatbox_core::{KernelError, Response};
use serde_json::{Value, json};

type Result<T> = std::result::Result<T, KernelError>;

/// Application rooted at a directory holding `resources/config/{config,routes}.yml`.
#[derive(Debug)]
pub struct ExampleApp {
    root: PathBuf,
}

impl ExampleApp {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AppKernel for ExampleApp {
    fn register_packages(&self) -> Vec<(String, PathBuf)> {
        vec![
            ("app".to_string(), self.root.clone()),
            ("example".to_string(), self.root.clone()),
        ]
    }

    fn bootable(&self) -> Vec<Box<dyn Package>> {
        vec![Box::new(ExamplePackage)]
    }
}

/// Registers [`DemoController`] and the example listeners.
#[derive(Debug)]
pub struct ExamplePackage;

impl Package for ExamplePackage {
    fn name(&self) -> &str {
        "example"
    }

    fn register_controllers(&self, registry: &mut ControllerRegistry) {
        registry.register("example", "DemoController", DemoController::default);
    }

    fn boot(&mut self, kernel: &KernelHandle) -> Result<()> {
        let dispatcher = kernel.container.require::<EventDispatcher>(EVENT_DISPATCHER_SERVICE)?;

        dispatcher.add_typed_listener::<ResponseEvent, _>(EventPriority::Normal, |event| {
            event.response.set_header("X-Powered-By", format!("{}/{}", FRAMEWORK_NAME, FRAMEWORK_VERSION));
            Ok(EventResult::Continue)
        });

        // Actions may return plain data, served as JSON
        dispatcher.add_typed_listener::<NoResponseEvent, _>(EventPriority::Low, |event| {
            if let ActionOutput::Value(value) = &event.original {
                if !value.is_null() {
                    let mut response = Response::new();
                    response.set_content_json(value)?;
                    event.set_response(response);
                }
            }
            Ok(EventResult::Continue)
        });
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct DemoController {
    base: ControllerBase,
}

fn arg_text(args: &[Value], index: usize) -> String {
    match args.get(index) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

impl DemoController {
    fn index(&self) -> Result<ActionOutput> {
        let config = self.base.config()?;
        let title = config.get_str("site.title").unwrap_or(FRAMEWORK_NAME);
        let routes = self.base.routes()?;
        let hello = routes.generate("hello", None, false);

        let mut response = Response::new();
        response.set_content(format!(
            "<h1>{}</h1>\n<p><a href=\"{}\">Say hello</a></p>\n",
            title, hello
        ));
        Ok(response.into())
    }

    fn hello(&self, name: &str) -> Result<ActionOutput> {
        let mut response = Response::with_content(format!("Hello {}!\n", name), 200);
        response.set_content_type("text", "UTF-8");
        Ok(response.into())
    }

    fn greeting(&self, name: &str) -> Result<ActionOutput> {
        let mut args = serde_json::Map::new();
        args.insert("name".to_string(), json!(name));
        self.base.redirect_response("hello", Some(&args)).map(ActionOutput::from)
    }

    fn status(&self) -> Result<ActionOutput> {
        let request = self.base.request()?;
        Ok(json!({
            "framework": FRAMEWORK_NAME,
            "version": FRAMEWORK_VERSION,
            "method": request.method(),
            "path": request.path(),
            "secure": request.is_secure(),
        })
        .into())
    }

    fn error404(&self) -> Result<ActionOutput> {
        let request = self.base.request()?;
        let mut response = Response::with_content(format!("No page at {}\n", request.path()), 404);
        response.set_content_type("text", "UTF-8");
        Ok(response.into())
    }
}

impl Controller for DemoController {
    fn container_aware(&mut self) -> Option<&mut dyn ContainerAware> {
        Some(&mut self.base)
    }

    fn has_action(&self, action: &str) -> bool {
        matches!(
            action,
            "indexAction" | "helloAction" | "greetingAction" | "statusAction" | "error404Action"
        )
    }

    fn call_action(&mut self, action: &str, args: &[Value]) -> Result<ActionOutput> {
        match action {
            "indexAction" => self.index(),
            "helloAction" => self.hello(&arg_text(args, 0)),
            "greetingAction" => self.greeting(&arg_text(args, 0)),
            "statusAction" => self.status(),
            "error404Action" => self.error404(),
            _ => Ok(ActionOutput::none()),
        }
    }
}
