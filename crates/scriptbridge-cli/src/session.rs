//! Manager setup and result rendering shared by the script commands

use scriptbridge_config::Config;
use scriptbridge_core::{BeanType, HostValue, Manager};
use scriptbridge_logger as logger;
use std::str::FromStr;

/// A manager with every bundled engine registered, honoring `config`.
pub fn open(config: &Config) -> Manager {
    let manager = Manager::from_config(config);
    scriptbridge_python::install(&manager);
    logger::debug(&format!(
        "Registered languages: {}",
        manager
            .languages()
            .iter()
            .map(|spec| spec.id.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    ));
    manager
}

/// A bean given on the command line as `NAME=VALUE` or `NAME:TYPE=VALUE`.
///
/// Without a type the bean is declared as a `String`.
#[derive(Debug, Clone)]
pub struct BeanArg {
    pub name: String,
    pub bean_type: BeanType,
    pub value: HostValue,
}

impl BeanArg {
    pub fn declare(&self, manager: &Manager) {
        logger::debug(&format!(
            "Declaring bean '{}' as {} = {}",
            self.name, self.bean_type, self.value
        ));
        manager.declare_bean(&self.name, self.value.clone(), self.bean_type);
    }
}

impl FromStr for BeanArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (head, raw) = s
            .split_once('=')
            .ok_or_else(|| format!("expected NAME[:TYPE]=VALUE, got '{}'", s))?;
        let (name, bean_type) = match head.split_once(':') {
            Some((name, ty)) => (name, ty.parse::<BeanType>().map_err(|e| e.to_string())?),
            None => (head, BeanType::String),
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(format!("missing bean name in '{}'", s));
        }
        let value = bean_type
            .coerce(&HostValue::Str(raw.to_string()))
            .map_err(|e| e.to_string())?;
        Ok(Self {
            name: name.to_string(),
            bean_type,
            value,
        })
    }
}

/// Text printed for a script result.
pub fn render(value: &HostValue, json: bool) -> String {
    if json {
        value.to_json().to_string()
    } else {
        value.to_string()
    }
}
