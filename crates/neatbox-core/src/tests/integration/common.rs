#![cfg(test)]

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tempfile::{TempDir, tempdir};

use crate::container::{ContainerAware, ServiceContainer};
use crate::event::{EventDispatcher, EventResult, NoResponseEvent};
use crate::http::Response;
use crate::kernel::component::{AppKernel, KernelHandle, Package};
use crate::kernel::constants::EVENT_DISPATCHER_SERVICE;
use crate::kernel::controller::{ActionOutput, Controller, ControllerBase, ControllerRegistry};
use crate::kernel::error::{Error, Result};
use crate::kernel::Kernel;

pub const CONFIG: &str = r#"
snb:
  routes: "::routing.yml"
site:
  title: Neatbox
mailer:
  transport: smtp
"#;

pub const ROUTES: &str = r#"
home:
  url: /
  options:
    controller: "demo:Demo:index"
hello:
  url: /hello/{name}
  options:
    controller: "demo:Demo:hello"
hello_shadow:
  url: /hello/{name}
  options:
    controller: "demo:Demo:shadow"
blog:
  url: /blog/{page}/::{section}
  placeholders:
    page: int
    section: slug
  defaults:
    section: fish
  options:
    controller: "demo:Demo:blog"
contact:
  url: /contact
  options:
    controller: "demo:Demo:contact"
    method: POST
secure:
  url: /secure
  options:
    controller: "demo:Demo:index"
    protocol: https
data:
  url: /data
  options:
    controller: "demo:Demo:data"
"404":
  url: /not-found
  options:
    controller: "demo:Demo:error404"
"#;

/// An application tree with `config.yml` and the routes file it names.
pub fn app_tree(routes: &str) -> TempDir {
    let temp_dir = tempdir().expect("Failed to create temporary directory");
    let dir = temp_dir.path().join("resources").join("config");
    fs::create_dir_all(&dir).expect("Failed to create config directory");
    fs::write(dir.join("config.yml"), CONFIG).expect("Failed to write config");
    fs::write(dir.join("routing.yml"), routes).expect("Failed to write routes");
    temp_dir
}

#[derive(Debug, Default)]
pub struct DemoController {
    base: ControllerBase,
}

fn text(args: &[Value], index: usize) -> String {
    match args.get(index) {
        Some(Value::String(value)) => value.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

impl Controller for DemoController {
    fn container_aware(&mut self) -> Option<&mut dyn ContainerAware> {
        Some(&mut self.base)
    }

    fn has_action(&self, action: &str) -> bool {
        matches!(
            action,
            "indexAction" | "helloAction" | "shadowAction" | "blogAction" | "contactAction" | "dataAction" | "error404Action"
        )
    }

    fn call_action(&mut self, action: &str, args: &[Value]) -> Result<ActionOutput> {
        let response = match action {
            "indexAction" => {
                let config = self.base.config()?;
                Response::with_content(config.get_str("site.title").unwrap_or_default(), 200)
            }
            "helloAction" => Response::with_content(format!("Hello {}", text(args, 0)), 200),
            "shadowAction" => Response::with_content("shadowed", 200),
            "blogAction" => Response::with_content(format!("page {} section {}", text(args, 0), text(args, 1)), 200),
            "contactAction" => {
                let request = self.base.request()?;
                Response::with_content(format!("thanks {}", request.body.get("name", "stranger")), 200)
            }
            "dataAction" => return Ok(serde_json::json!({"items": [1, 2, 3]}).into()),
            "error404Action" => Response::with_content("Page not found", 404),
            other => return Err(Error::Other(format!("unexpected action {}", other))),
        };
        Ok(response.into())
    }
}

/// Registers the demo controller and, optionally, a listener turning plain
/// values into JSON responses.
#[derive(Debug)]
pub struct DemoPackage {
    json_responses: bool,
}

impl Package for DemoPackage {
    fn name(&self) -> &str {
        "demo"
    }

    fn register_controllers(&self, registry: &mut ControllerRegistry) {
        registry.register("demo", "Demo", DemoController::default);
    }

    fn boot(&mut self, kernel: &KernelHandle) -> Result<()> {
        if self.json_responses {
            let dispatcher = kernel.container.require::<EventDispatcher>(EVENT_DISPATCHER_SERVICE)?;
            dispatcher.add_typed_listener::<NoResponseEvent, _>(0, |event| {
                if let ActionOutput::Value(value) = &event.original {
                    let mut response = Response::new();
                    response.set_content_json(value)?;
                    event.set_response(response);
                }
                Ok(EventResult::Continue)
            });
        }
        Ok(())
    }
}

type ServiceSetup = Box<dyn Fn(&ServiceContainer) -> Result<()>>;

pub struct DemoApp {
    root: PathBuf,
    json_responses: bool,
    services: Option<ServiceSetup>,
}

impl fmt::Debug for DemoApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DemoApp").field("root", &self.root).finish()
    }
}

impl DemoApp {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            json_responses: false,
            services: None,
        }
    }

    pub fn with_json_responses(mut self) -> Self {
        self.json_responses = true;
        self
    }

    pub fn with_services(mut self, setup: impl Fn(&ServiceContainer) -> Result<()> + 'static) -> Self {
        self.services = Some(Box::new(setup));
        self
    }

    pub fn kernel(self) -> Kernel {
        Kernel::new(self, "test")
    }
}

impl AppKernel for DemoApp {
    fn register_packages(&self) -> Vec<(String, PathBuf)> {
        vec![("app".to_string(), self.root.clone()), ("demo".to_string(), self.root.clone())]
    }

    fn bootable(&self) -> Vec<Box<dyn Package>> {
        vec![Box::new(DemoPackage { json_responses: self.json_responses })]
    }

    fn register_services(&self, container: &ServiceContainer) -> Result<()> {
        match &self.services {
            Some(setup) => setup(container),
            None => Ok(()),
        }
    }
}
