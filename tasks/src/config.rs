use std::{collections::BTreeMap, path::PathBuf};

use crate::env::{FlagPolicy, InvocationEnv};

/// The use-library token every generator that compiles schemas ends up depending on.
pub const USELIB: &str = "PROTOBUF";

/// A `printf`-like template with a single `%s` slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagTemplate(String);

impl FlagTemplate {
    pub fn new<S: Into<String>>(template: S) -> FlagTemplate {
        FlagTemplate(template.into())
    }

    pub fn render(&self, value: &str) -> String {
        if self.0.contains("%s") {
            self.0.replacen("%s", value, 1)
        } else {
            format!("{}{}", self.0, value)
        }
    }
}

/// Compiler and linker flags of a runtime library, as pkg-config would report them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UseLib {
    pub cflags: Vec<String>,
    pub libs: Vec<String>,
}

/// Values established once, before any schema is planned. Finding them is someone else's job.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub protoc: PathBuf,
    /// `PROTOC_ST`, applied to every include directory.
    pub include_template: FlagTemplate,
    /// `PROTOC_FL`, applied to every composed flag.
    pub flag_template: FlagTemplate,
    pub uselib: BTreeMap<String, UseLib>,
}

impl Configuration {
    pub fn new<P: Into<PathBuf>>(protoc: P) -> Configuration {
        let mut uselib = BTreeMap::new();
        uselib.insert(USELIB.to_owned(), UseLib::default());
        Configuration {
            protoc: protoc.into(),
            include_template: FlagTemplate::new("-I%s"),
            flag_template: FlagTemplate::new("%s"),
            uselib,
        }
    }

    pub fn with_uselib<S: Into<String>>(mut self, name: S, lib: UseLib) -> Configuration {
        self.uselib.insert(name.into(), lib);
        self
    }

    /// A fresh environment for one task generator.
    pub fn env(&self, policy: FlagPolicy) -> InvocationEnv {
        InvocationEnv::new(
            self.protoc.clone(),
            self.include_template.clone(),
            self.flag_template.clone(),
            policy,
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn templates() {
        assert_eq!(FlagTemplate::new("-I%s").render("proto"), "-Iproto");
        assert_eq!(FlagTemplate::new("%s").render("--cpp_out=."), "--cpp_out=.");
        assert_eq!(FlagTemplate::new("-I").render("x"), "-Ix");
        assert_eq!(FlagTemplate::new("%s%s").render("a"), "a%s");
    }

    #[test]
    fn defaults() {
        let config = Configuration::new("/usr/bin/protoc");
        assert_eq!(config.include_template, FlagTemplate::new("-I%s"));
        assert!(config.uselib.contains_key(USELIB));
        let config = config.with_uselib(
            USELIB,
            UseLib {
                cflags: vec!["-pthread".to_owned()],
                libs: vec!["-lprotobuf".to_owned()],
            },
        );
        assert_eq!(config.uselib[USELIB].libs, vec!["-lprotobuf".to_owned()]);
    }
}
